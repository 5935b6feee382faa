//! Sequential verse recitation.
//!
//! The controller never owns navigation state: the verse position lives in
//! the [`HydrationController`] and chapter changes go through its
//! `load_chapter`. Actual output is delegated to an [`AudioSink`].

use crate::hydrate::{ChapterLoad, HydrationController};
use crate::model::ChapterIndex;
use crate::remote::{DEFAULT_AUDIO_BASE, DEFAULT_RECITER};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Output device for verse recordings.
pub trait AudioSink {
    fn play(&mut self, url: &str);
    fn pause(&mut self);
    fn resume(&mut self);
    fn stop(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Playback {
    Stopped,
    Playing,
    Paused,
}

/// Transport bar text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioStatus {
    pub reciting: String,
    pub progress: String,
    pub playback: Playback,
}

/// Recording address for a verse; `number` is the global verse number.
pub fn verse_audio_url(number: u32) -> String {
    format!("{DEFAULT_AUDIO_BASE}/{DEFAULT_RECITER}/{number}")
}

pub struct AudioController<S> {
    sink: S,
    playback: Playback,
}

impl<S: AudioSink> AudioController<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            playback: Playback::Stopped,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn playback(&self) -> Playback {
        self.playback
    }

    pub fn is_active(&self) -> bool {
        self.playback != Playback::Stopped
    }

    /// Starts `verse` of the current chapter. Out-of-range positions are
    /// ignored and return false.
    pub fn play_verse(&mut self, reader: &HydrationController, verse: usize) -> bool {
        let Some(number) = reader.verse_number(verse) else {
            return false;
        };
        reader.set_current_verse(verse);
        self.sink.play(&verse_audio_url(number));
        self.playback = Playback::Playing;
        debug!(chapter = reader.current_chapter().number(), verse, "reciting verse");
        true
    }

    pub fn next_verse(&mut self, reader: &HydrationController) -> bool {
        self.play_verse(reader, reader.current_verse() + 1)
    }

    pub fn previous_verse(&mut self, reader: &HydrationController) -> bool {
        match reader.current_verse().checked_sub(1) {
            Some(verse) => self.play_verse(reader, verse),
            None => false,
        }
    }

    /// Play/pause button.
    pub fn toggle(&mut self, reader: &HydrationController) {
        match self.playback {
            Playback::Playing => {
                self.sink.pause();
                self.playback = Playback::Paused;
            }
            Playback::Paused => {
                self.sink.resume();
                self.playback = Playback::Playing;
            }
            Playback::Stopped => {
                self.play_verse(reader, reader.current_verse());
            }
        }
    }

    /// Stops output and rewinds to the first verse.
    pub fn stop(&mut self, reader: &HydrationController) {
        if self.is_active() {
            self.sink.stop();
        }
        self.playback = Playback::Stopped;
        reader.set_current_verse(0);
    }

    pub fn status(&self, reader: &HydrationController) -> Option<AudioStatus> {
        if !self.is_active() {
            return None;
        }
        let name = reader.chapter_english_name()?;
        Some(AudioStatus {
            reciting: format!("Reciting: {name}"),
            progress: format!(
                "Verse {} of {}",
                reader.current_verse() + 1,
                reader.verse_count()
            ),
            playback: self.playback,
        })
    }

    /// Natural end of the current recording: next verse, else the first verse
    /// of the next chapter, else stop.
    pub async fn on_verse_ended(&mut self, reader: &HydrationController) {
        if self.playback != Playback::Playing {
            return;
        }
        if self.next_verse(reader) {
            return;
        }
        let Some(next) = reader.current_chapter().next() else {
            info!("recitation finished");
            self.stop(reader);
            return;
        };
        match reader.load_chapter(next, true, true).await {
            Ok(ChapterLoad::Loaded { .. } | ChapterLoad::Unchanged(_)) => {
                self.play_verse(reader, 0);
            }
            Err(err) => {
                warn!(chapter = next.number(), error = %err, "auto-advance failed");
                self.stop(reader);
            }
        }
    }

    /// Applies the audio side of a chapter change made through navigation.
    pub fn on_chapter_changed(&mut self, reader: &HydrationController, load: ChapterLoad) {
        if let ChapterLoad::Loaded { stop_audio: true, .. } = load {
            self.stop(reader);
        }
    }

    /// List play button: stop anything playing and start `index` from verse 0.
    pub async fn play_chapter(
        &mut self,
        reader: &HydrationController,
        index: ChapterIndex,
    ) -> bool {
        self.stop(reader);
        match reader.load_chapter(index, true, false).await {
            Ok(_) => self.play_verse(reader, 0),
            Err(err) => {
                warn!(chapter = index.number(), error = %err, "chapter playback unavailable");
                false
            }
        }
    }
}
