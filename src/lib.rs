//! RuhVerse: a server-rendered Quran reader.
//!
//! The library core (data model, view models, startup payload handling, the
//! hydration controller and the reader/audio session) carries no HTTP stack and
//! can drive a client build. The `http` feature adds the
//! reqwest-backed API clients and `server` adds the cache, page renderer and
//! axum router behind the `ruhverse` binary.

pub mod audio;
pub mod bootstrap;
pub mod error;
pub mod flight;
pub mod hydrate;
pub mod insights;
pub mod model;
pub mod prayer;
pub mod reader;
pub mod remote;
pub mod view;

#[cfg(feature = "server")]
pub mod cache;
#[cfg(feature = "server")]
pub mod render;
#[cfg(feature = "server")]
pub mod web;

pub use error::{Error, Result};
pub use hydrate::{ChapterLoad, HydrationController, Phase, ReaderView};
pub use model::{CHAPTER_COUNT, Chapter, ChapterIndex, ChapterMeta, EditionId, QuranData, Verse};
pub use reader::Reader;
