//! Framework-agnostic view models.
//!
//! Both the server page template and a client presentation adapter consume
//! these, so the invocation handling and pagination rules live in one place.

use crate::model::{CHAPTER_COUNT, Chapter, ChapterIndex, ChapterMeta};
use serde::Serialize;

/// The opening invocation rendered as a standalone header.
pub const BISMILLAH: &str = "بِسْمِ اللَّهِ الرَّحْمَٰنِ الرَّحِيمِ";

const CANONICAL_ROOT: &str = "/quran.html";

/// Chapter 1 carries the invocation as its first verse and chapter 9 omits it.
pub fn shows_bismillah_header(index: ChapterIndex) -> bool {
    index.get() != 0 && index.get() != 8
}

/// Site path for a chapter; chapter 1 maps to the canonical root.
pub fn chapter_path(index: ChapterIndex) -> String {
    if index.is_first() {
        CANONICAL_ROOT.to_string()
    } else {
        format!("/quran/surah/{}", index.number())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseView {
    pub number: u32,
    pub number_in_surah: u32,
    pub arabic: String,
    pub translation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationView {
    pub current: u16,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PaginationView {
    pub fn new(index: ChapterIndex) -> Self {
        Self {
            current: index.number(),
            total: CHAPTER_COUNT,
            has_previous: !index.is_first(),
            has_next: !index.is_last(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterView {
    pub index: usize,
    pub number: u16,
    pub title: String,
    pub name: String,
    pub english_name: String,
    pub english_name_translation: String,
    pub bismillah_header: Option<&'static str>,
    pub verses: Vec<VerseView>,
    pub pagination: PaginationView,
}

pub fn render_chapter(arabic: &Chapter, english: &Chapter, index: ChapterIndex) -> ChapterView {
    let header = shows_bismillah_header(index);
    let verses = arabic
        .ayahs
        .iter()
        .enumerate()
        .map(|(position, ayah)| {
            let text = if position == 0 && header {
                strip_bismillah(&ayah.text)
            } else {
                ayah.text.as_str()
            };
            VerseView {
                number: ayah.number,
                number_in_surah: ayah.number_in_surah,
                arabic: text.to_string(),
                translation: english
                    .ayahs
                    .get(position)
                    .map(|verse| verse.text.clone())
                    .unwrap_or_default(),
            }
        })
        .collect();
    ChapterView {
        index: index.get(),
        number: arabic.number,
        title: format!("{}. {}", arabic.number, arabic.english_name),
        name: arabic.name.clone(),
        english_name: arabic.english_name.clone(),
        english_name_translation: arabic.english_name_translation.clone(),
        bismillah_header: header.then_some(BISMILLAH),
        verses,
        pagination: PaginationView::new(index),
    }
}

fn strip_bismillah(text: &str) -> &str {
    text.strip_prefix(BISMILLAH).map(str::trim).unwrap_or(text)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterListItem {
    pub index: usize,
    pub number: u16,
    pub english_name: String,
    pub english_name_translation: String,
    pub name: String,
    pub href: String,
    pub active: bool,
    pub visible: bool,
}

/// Builds the sidebar list; `filter` hides entries whose text does not contain
/// it, ignoring case.
pub fn chapter_list<'a>(
    chapters: impl IntoIterator<Item = &'a ChapterMeta>,
    active: ChapterIndex,
    filter: &str,
) -> Vec<ChapterListItem> {
    let needle = filter.trim().to_lowercase();
    chapters
        .into_iter()
        .enumerate()
        .map(|(position, meta)| {
            let haystack = format!(
                "{}. {} {} {}",
                meta.number, meta.english_name, meta.english_name_translation, meta.name
            )
            .to_lowercase();
            ChapterListItem {
                index: position,
                number: meta.number,
                english_name: meta.english_name.clone(),
                english_name_translation: meta.english_name_translation.clone(),
                name: meta.name.clone(),
                href: chapter_path(ChapterIndex::clamped(position as i64)),
                active: position == active.get(),
                visible: needle.is_empty() || haystack.contains(&needle),
            }
        })
        .collect()
}
