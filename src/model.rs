use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of chapters in every edition.
pub const CHAPTER_COUNT: usize = 114;

/// Zero-based chapter position, always within `0..CHAPTER_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ChapterIndex(u8);

impl ChapterIndex {
    pub const FIRST: ChapterIndex = ChapterIndex(0);
    pub const LAST: ChapterIndex = ChapterIndex((CHAPTER_COUNT - 1) as u8);

    pub fn new(index: i64) -> Result<Self> {
        if (0..CHAPTER_COUNT as i64).contains(&index) {
            Ok(Self(index as u8))
        } else {
            Err(Error::OutOfRange(index))
        }
    }

    /// Clamps any integer into the valid range.
    pub fn clamped(index: i64) -> Self {
        Self(index.clamp(0, CHAPTER_COUNT as i64 - 1) as u8)
    }

    /// Converts an external 1-based chapter number.
    pub fn from_number(number: i64) -> Result<Self> {
        Self::new(number - 1)
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }

    pub fn number(self) -> u16 {
        self.0 as u16 + 1
    }

    pub fn is_first(self) -> bool {
        self == Self::FIRST
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    /// Moves by `delta` chapters, or `None` when that leaves the range.
    pub fn offset(self, delta: i64) -> Option<Self> {
        Self::new(self.0 as i64 + delta).ok()
    }

    pub fn next(self) -> Option<Self> {
        self.offset(1)
    }

    pub fn all() -> impl Iterator<Item = ChapterIndex> {
        (0..CHAPTER_COUNT as u8).map(ChapterIndex)
    }
}

impl fmt::Display for ChapterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verse {
    /// Sequential across the whole text; addresses the recitation audio.
    pub number: u32,
    pub number_in_surah: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub number: u16,
    pub name: String,
    pub english_name: String,
    pub english_name_translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revelation_type: Option<String>,
    #[serde(default)]
    pub ayahs: Vec<Verse>,
}

impl Chapter {
    /// A chapter whose verses have not been loaded yet.
    pub fn from_meta(meta: &ChapterMeta) -> Self {
        Self {
            number: meta.number,
            name: meta.name.clone(),
            english_name: meta.english_name.clone(),
            english_name_translation: meta.english_name_translation.clone(),
            revelation_type: None,
            ayahs: Vec::new(),
        }
    }

    pub fn meta(&self) -> ChapterMeta {
        ChapterMeta {
            number: self.number,
            name: self.name.clone(),
            english_name: self.english_name.clone(),
            english_name_translation: self.english_name_translation.clone(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        !self.ayahs.is_empty()
    }
}

/// Chapter identity and names without verse bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterMeta {
    pub number: u16,
    pub name: String,
    pub english_name: String,
    pub english_name_translation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditionId {
    Arabic,
    English,
}

impl EditionId {
    /// Edition identifier understood by the AlQuran Cloud API.
    pub fn slug(self) -> &'static str {
        match self {
            EditionId::Arabic => "quran-uthmani",
            EditionId::English => "en.sahih",
        }
    }
}

impl fmt::Display for EditionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// The two index-aligned editions, in the shape served by `/api/quran-data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuranData {
    pub quran_arabic: Vec<Chapter>,
    pub quran_english: Vec<Chapter>,
}

impl QuranData {
    /// Builds a dataset where every chapter is metadata only.
    pub fn from_meta(meta: &[ChapterMeta]) -> Self {
        let chapters: Vec<Chapter> = meta.iter().map(Chapter::from_meta).collect();
        Self {
            quran_arabic: chapters.clone(),
            quran_english: chapters,
        }
    }

    /// Checks that a fetched dataset is complete and aligned.
    pub fn validate(self) -> Result<Self> {
        for (label, edition) in [("arabic", &self.quran_arabic), ("english", &self.quran_english)] {
            if edition.len() != CHAPTER_COUNT {
                return Err(Error::malformed(format!(
                    "{label} edition has {} chapters, expected {CHAPTER_COUNT}",
                    edition.len()
                )));
            }
            if let Some((position, chapter)) = edition
                .iter()
                .enumerate()
                .find(|(position, chapter)| chapter.number as usize != position + 1)
            {
                return Err(Error::malformed(format!(
                    "{label} edition lists chapter {} at position {}",
                    chapter.number,
                    position + 1
                )));
            }
        }
        for (arabic, english) in self.quran_arabic.iter().zip(&self.quran_english) {
            if arabic.ayahs.is_empty() || arabic.ayahs.len() != english.ayahs.len() {
                return Err(Error::malformed(format!(
                    "chapter {} has {} arabic and {} english verses",
                    arabic.number,
                    arabic.ayahs.len(),
                    english.ayahs.len()
                )));
            }
        }
        Ok(self)
    }

    pub fn chapter_meta(&self) -> Vec<ChapterMeta> {
        self.quran_arabic.iter().map(Chapter::meta).collect()
    }

    pub fn pair(&self, index: ChapterIndex) -> Option<(&Chapter, &Chapter)> {
        let arabic = self.quran_arabic.get(index.get())?;
        let english = self.quran_english.get(index.get())?;
        Some((arabic, english))
    }

    /// True when both languages of the chapter have verses.
    pub fn is_loaded(&self, index: ChapterIndex) -> bool {
        self.pair(index)
            .is_some_and(|(arabic, english)| arabic.is_loaded() && english.is_loaded())
    }
}
