//! The startup payload embedded in served pages.
//!
//! Pages carry at most one of two globals: the minimal `__SSR_BOOTSTRAP`
//! (chapter metadata plus one full chapter) or the legacy `__SSR_DATA` (both
//! complete editions). `__INITIAL_SURAH_INDEX` accompanies either.

use crate::error::{Error, Result};
use crate::model::{CHAPTER_COUNT, Chapter, ChapterIndex, ChapterMeta, QuranData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const BOOTSTRAP_GLOBAL: &str = "window.__SSR_BOOTSTRAP";
pub const LEGACY_GLOBAL: &str = "window.__SSR_DATA";
pub const INDEX_GLOBAL: &str = "window.__INITIAL_SURAH_INDEX";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsrBootstrap {
    pub surah_meta: Vec<ChapterMeta>,
    #[serde(default)]
    pub initial_surah_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_surah_arabic: Option<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_surah_english: Option<Chapter>,
}

impl SsrBootstrap {
    /// Metadata for every chapter and verse bodies for `index` only.
    pub fn for_chapter(data: &QuranData, index: ChapterIndex) -> Self {
        let (arabic, english) = match data.pair(index) {
            Some((arabic, english)) => (Some(arabic.clone()), Some(english.clone())),
            None => (None, None),
        };
        Self {
            surah_meta: data.chapter_meta(),
            initial_surah_index: Some(index.get() as i64),
            initial_surah_arabic: arabic,
            initial_surah_english: english,
        }
    }

    /// The designated chapter with both languages, when the payload has it.
    pub fn initial_chapter(&self) -> Option<(&Chapter, &Chapter)> {
        match (&self.initial_surah_arabic, &self.initial_surah_english) {
            (Some(arabic), Some(english)) => Some((arabic, english)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupPayload {
    Minimal(SsrBootstrap),
    Legacy(QuranData),
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBootstrap {
    pub payload: StartupPayload,
    pub injected_index: Option<i64>,
}

impl PageBootstrap {
    pub fn absent() -> Self {
        Self {
            payload: StartupPayload::Absent,
            injected_index: None,
        }
    }

    /// Reads whatever startup state a served page carries; anything that does
    /// not parse is treated as absent.
    pub fn from_html(html: &str) -> Self {
        let injected_index = global_integer(html, INDEX_GLOBAL);
        let minimal = global_value::<SsrBootstrap>(html, BOOTSTRAP_GLOBAL)
            .filter(|bootstrap| bootstrap.surah_meta.len() == CHAPTER_COUNT);
        let payload = if let Some(bootstrap) = minimal {
            StartupPayload::Minimal(bootstrap)
        } else if let Some(data) = global_value::<QuranData>(html, LEGACY_GLOBAL) {
            match data.validate() {
                Ok(data) => StartupPayload::Legacy(data),
                Err(err) => {
                    warn!(error = %err, "ignoring embedded legacy dataset");
                    StartupPayload::Absent
                }
            }
        } else {
            StartupPayload::Absent
        };
        Self {
            payload,
            injected_index,
        }
    }
}

fn assigned_value<'a>(html: &'a str, global: &str) -> Option<&'a str> {
    let start = html.find(global)? + global.len();
    html[start..].trim_start().strip_prefix('=').map(str::trim_start)
}

fn global_integer(html: &str, global: &str) -> Option<i64> {
    let rest = assigned_value(html, global)?;
    let end = rest
        .char_indices()
        .find(|&(position, ch)| !(ch.is_ascii_digit() || (position == 0 && ch == '-')))
        .map_or(rest.len(), |(position, _)| position);
    rest[..end].parse().ok()
}

/// Parses the JSON object assigned to `global` in an inline script.
fn global_value<T: DeserializeOwned>(html: &str, global: &str) -> Option<T> {
    let rest = assigned_value(html, global)?;
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<T>();
    match values.next()? {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(global, error = %err, "embedded payload is malformed");
            None
        }
    }
}

/// The inline `<script>` carrying a minimal bootstrap.
pub fn bootstrap_script(bootstrap: &SsrBootstrap, index: ChapterIndex) -> Result<String> {
    let json = serde_json::to_string(bootstrap).map_err(|err| Error::malformed(err.to_string()))?;
    Ok(format!(
        "<script>\n{BOOTSTRAP_GLOBAL} = {};\n{INDEX_GLOBAL} = {};\n</script>",
        script_safe_json(&json),
        index.get()
    ))
}

/// Escapes characters that could end the enclosing script element. The
/// escapes are valid in both JSON strings and JavaScript.
pub fn script_safe_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;

    #[test]
    fn minimal_bootstrap_carries_one_chapter() {
        let data = fixtures::dataset();
        let index = ChapterIndex::new(4).unwrap();
        let bootstrap = SsrBootstrap::for_chapter(&data, index);
        assert_eq!(bootstrap.surah_meta.len(), CHAPTER_COUNT);
        let (arabic, english) = bootstrap.initial_chapter().unwrap();
        assert_eq!(arabic.number, 5);
        assert_eq!(english.ayahs.len(), arabic.ayahs.len());
        let json = serde_json::to_value(&bootstrap).unwrap();
        assert!(json["surahMeta"][0].get("ayahs").is_none());
        assert_eq!(json["initialSurahIndex"], 4);
    }

    #[test]
    fn script_round_trips_through_html() {
        let mut data = fixtures::dataset();
        data.quran_english[6].ayahs[0].text = "closing </script> tag & more".to_string();
        let index = ChapterIndex::new(6).unwrap();
        let script = bootstrap_script(&SsrBootstrap::for_chapter(&data, index), index).unwrap();
        assert!(!script.contains("</script> tag"));
        let page = format!("<html><body>{script}</body></html>");
        let parsed = PageBootstrap::from_html(&page);
        assert_eq!(parsed.injected_index, Some(6));
        let StartupPayload::Minimal(bootstrap) = parsed.payload else {
            panic!("expected minimal bootstrap");
        };
        let (_, english) = bootstrap.initial_chapter().unwrap();
        assert_eq!(english.ayahs[0].text, "closing </script> tag & more");
    }

    #[test]
    fn legacy_dataset_is_detected() {
        let data = fixtures::dataset();
        let json = serde_json::to_string(&data).unwrap();
        let page = format!("<script>{LEGACY_GLOBAL} = {json};</script>");
        let parsed = PageBootstrap::from_html(&page);
        assert_eq!(parsed.payload, StartupPayload::Legacy(data));
        assert_eq!(parsed.injected_index, None);
    }

    #[test]
    fn malformed_payload_is_absent() {
        let page = format!("<script>{BOOTSTRAP_GLOBAL} = {{\"surahMeta\": [1, 2</script>");
        assert_eq!(PageBootstrap::from_html(&page).payload, StartupPayload::Absent);
        assert_eq!(PageBootstrap::from_html("<html></html>"), PageBootstrap::absent());
    }

    #[test]
    fn partial_metadata_is_rejected() {
        let data = fixtures::dataset();
        let mut bootstrap = SsrBootstrap::for_chapter(&data, ChapterIndex::FIRST);
        bootstrap.surah_meta.truncate(10);
        let script = bootstrap_script(&bootstrap, ChapterIndex::FIRST).unwrap();
        assert_eq!(PageBootstrap::from_html(&script).payload, StartupPayload::Absent);
    }
}
