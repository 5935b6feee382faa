//! The reader session a presentation adapter drives.
//!
//! Every user action maps to one method here. Navigation and data live in the
//! [`HydrationController`]; the session adds the search filter and keeps
//! playback consistent with chapter changes.

use crate::audio::{AudioController, AudioSink, AudioStatus};
use crate::error::Result;
use crate::hydrate::{ChapterLoad, HydrationController, Phase, ReaderView};
use crate::model::ChapterIndex;
use crate::view::ChapterListItem;
use std::sync::Arc;

pub struct Reader<S> {
    hydration: Arc<HydrationController>,
    audio: AudioController<S>,
    filter: String,
}

impl<S: AudioSink> Reader<S> {
    pub fn new(hydration: Arc<HydrationController>, sink: S) -> Self {
        Self {
            hydration,
            audio: AudioController::new(sink),
            filter: String::new(),
        }
    }

    pub fn hydration(&self) -> &Arc<HydrationController> {
        &self.hydration
    }

    pub fn audio(&self) -> &AudioController<S> {
        &self.audio
    }

    /// First paint followed by background completion. An empty startup has
    /// already tried completing during first paint, so a failure there waits
    /// for the next navigation.
    pub async fn boot(&mut self) -> ReaderView {
        let view = self.hydration.initial_view().await;
        if view.phase == Phase::Partial {
            self.hydration.complete_in_background().await;
        }
        view
    }

    pub fn view(&self) -> ReaderView {
        self.hydration.view()
    }

    /// Chapter list or search-result click.
    pub async fn select_chapter(&mut self, index: ChapterIndex) -> Result<ChapterLoad> {
        let load = self.hydration.load_chapter(index, false, false).await?;
        self.audio.on_chapter_changed(&self.hydration, load);
        Ok(load)
    }

    /// Previous/next pagination. Moving past either end leaves the reader
    /// where it is.
    pub async fn change_chapter(&mut self, delta: i64) -> Result<ChapterLoad> {
        let current = self.hydration.current_chapter();
        match current.offset(delta) {
            Some(target) => self.select_chapter(target).await,
            None => Ok(ChapterLoad::Unchanged(current)),
        }
    }

    /// Play button on a chapter list entry.
    pub async fn play_chapter(&mut self, index: ChapterIndex) -> bool {
        self.audio.play_chapter(&self.hydration, index).await
    }

    pub fn toggle_audio(&mut self) {
        self.audio.toggle(&self.hydration);
    }

    pub fn next_verse(&mut self) -> bool {
        self.audio.next_verse(&self.hydration)
    }

    pub fn previous_verse(&mut self) -> bool {
        self.audio.previous_verse(&self.hydration)
    }

    pub fn close_audio(&mut self) {
        self.audio.stop(&self.hydration);
    }

    pub async fn verse_ended(&mut self) {
        self.audio.on_verse_ended(&self.hydration).await;
    }

    pub fn audio_status(&self) -> Option<AudioStatus> {
        self.audio.status(&self.hydration)
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
    }

    pub fn chapter_list(&self) -> Vec<ChapterListItem> {
        self.hydration.chapter_list(&self.filter)
    }

    /// Current location for history sync.
    pub fn location(&self) -> String {
        self.hydration.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Playback;
    use crate::audio::tests::RecordingSink;
    use crate::bootstrap::{PageBootstrap, SsrBootstrap, StartupPayload};
    use crate::hydrate::tests::StubFetcher;
    use crate::model::fixtures;

    fn reader(index: i64) -> (Reader<RecordingSink>, Arc<StubFetcher>) {
        let data = fixtures::dataset();
        let index = ChapterIndex::new(index).unwrap();
        let bootstrap = PageBootstrap {
            payload: StartupPayload::Minimal(SsrBootstrap::for_chapter(&data, index)),
            injected_index: Some(index.get() as i64),
        };
        let fetcher = StubFetcher::new(true, true);
        let hydration = HydrationController::new(bootstrap, ChapterIndex::FIRST, fetcher.clone());
        (Reader::new(Arc::new(hydration), RecordingSink::default()), fetcher)
    }

    #[tokio::test]
    async fn boot_paints_then_completes() {
        let (mut reader, fetcher) = reader(17);
        let view = reader.boot().await;
        assert_eq!(view.phase, Phase::Partial);
        assert_eq!(view.chapter.unwrap().number, 18);
        assert_eq!(reader.view().phase, Phase::Complete);
        assert_eq!(fetcher.calls(), (1, 0));
    }

    #[tokio::test]
    async fn failed_empty_boot_waits_for_navigation() {
        let fetcher = StubFetcher::new(false, false);
        let hydration =
            HydrationController::new(PageBootstrap::absent(), ChapterIndex::FIRST, fetcher.clone());
        let mut reader = Reader::new(Arc::new(hydration), RecordingSink::default());
        let view = reader.boot().await;
        assert_eq!(view.phase, Phase::Empty);
        assert!(view.error.is_some());
        assert_eq!(fetcher.calls(), (1, 1));

        assert!(reader.change_chapter(1).await.is_err());
        assert_eq!(fetcher.calls(), (2, 2));
    }

    #[tokio::test]
    async fn empty_boot_fetches_once() {
        let fetcher = StubFetcher::new(true, true);
        let hydration =
            HydrationController::new(PageBootstrap::absent(), ChapterIndex::FIRST, fetcher.clone());
        let mut reader = Reader::new(Arc::new(hydration), RecordingSink::default());
        let view = reader.boot().await;
        assert_eq!(view.phase, Phase::Complete);
        assert_eq!(view.chapter.unwrap().number, 1);
        assert_eq!(fetcher.calls(), (1, 0));
    }

    #[tokio::test]
    async fn pagination_respects_bounds() {
        let (mut reader, _) = reader(0);
        assert_eq!(
            reader.change_chapter(-1).await,
            Ok(ChapterLoad::Unchanged(ChapterIndex::FIRST))
        );
        assert_eq!(reader.location(), "/quran.html");
        reader.change_chapter(1).await.unwrap();
        assert_eq!(reader.location(), "/quran/surah/2");
        reader.change_chapter(-1).await.unwrap();
        assert_eq!(reader.location(), "/quran.html");
    }

    #[tokio::test]
    async fn selecting_a_chapter_stops_audio() {
        let (mut reader, _) = reader(2);
        reader.toggle_audio();
        assert_eq!(reader.audio().playback(), Playback::Playing);
        reader.select_chapter(ChapterIndex::new(40).unwrap()).await.unwrap();
        assert_eq!(reader.audio().playback(), Playback::Stopped);
        assert_eq!(reader.audio_status(), None);
    }

    #[tokio::test]
    async fn reselecting_current_chapter_keeps_audio() {
        let (mut reader, fetcher) = reader(2);
        reader.toggle_audio();
        reader.next_verse();
        let load = reader.select_chapter(ChapterIndex::new(2).unwrap()).await.unwrap();
        assert_eq!(load, ChapterLoad::Unchanged(ChapterIndex::new(2).unwrap()));
        assert_eq!(reader.audio().playback(), Playback::Playing);
        assert_eq!(reader.hydration().current_verse(), 1);
        assert_eq!(fetcher.calls(), (0, 0));
    }

    #[tokio::test]
    async fn list_play_button_starts_from_first_verse() {
        let (mut reader, _) = reader(2);
        assert!(reader.play_chapter(ChapterIndex::new(50).unwrap()).await);
        let status = reader.audio_status().unwrap();
        assert_eq!(status.reciting, "Reciting: Surah-51");
        assert_eq!(status.progress, format!("Verse 1 of {}", fixtures::verse_count(50)));
        reader.close_audio();
        assert_eq!(reader.audio().playback(), Playback::Stopped);
    }

    #[test]
    fn search_filters_list() {
        let (mut reader, _) = reader(2);
        assert_eq!(reader.chapter_list().iter().filter(|item| item.visible).count(), 114);
        reader.set_filter("surah-11");
        let visible: Vec<u16> = reader
            .chapter_list()
            .iter()
            .filter(|item| item.visible)
            .map(|item| item.number)
            .collect();
        assert_eq!(visible, [11, 110, 111, 112, 113, 114]);
        assert!(reader.chapter_list()[2].active);
    }
}
