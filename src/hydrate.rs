//! Client-side reconciliation of embedded startup data with the live dataset.
//!
//! A [`HydrationController`] owns the edition pair and the navigation state.
//! It starts `Empty`, `Partial` or `Complete` depending on what the page
//! embedded, renders from whatever is local, and completes the dataset in the
//! background. The phase only ever moves forward.

use crate::bootstrap::{PageBootstrap, SsrBootstrap, StartupPayload};
use crate::error::{Error, Result};
use crate::flight::SingleFlight;
use crate::model::{ChapterIndex, ChapterMeta, QuranData};
use crate::remote::DatasetFetcher;
use crate::view::{ChapterListItem, ChapterView, chapter_list, chapter_path, render_chapter};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOADING_MESSAGE: &str = "Loading Surah...";
const LOAD_FAILED_MESSAGE: &str =
    "Unable to load Surah text right now. Check your connection and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Phase {
    Empty,
    Partial,
    Complete,
}

/// Result of a chapter navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterLoad {
    /// Already current and rendered; only list highlighting needs refreshing.
    Unchanged(ChapterIndex),
    Loaded {
        index: ChapterIndex,
        /// False when the caller asked to keep audio playing across the change.
        stop_audio: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReaderView {
    pub phase: Phase,
    pub location: String,
    pub current_verse: usize,
    /// Set while a chapter waits on dataset completion.
    pub loading: Option<&'static str>,
    pub error: Option<String>,
    /// `None` until the current chapter has verses.
    pub chapter: Option<ChapterView>,
}

struct ReaderState {
    phase: Phase,
    data: QuranData,
    current_chapter: ChapterIndex,
    current_verse: usize,
    location: String,
    loading: bool,
    error: Option<String>,
}

impl ReaderState {
    fn new(phase: Phase, data: QuranData, current_chapter: ChapterIndex) -> Self {
        Self {
            phase,
            data,
            current_chapter,
            current_verse: 0,
            location: chapter_path(current_chapter),
            loading: false,
            error: None,
        }
    }
}

/// Picks the chapter to open before any payload is inspected: an injected
/// index wins, then a `/quran/surah/{n}` path, then `?surah=n`, then chapter 1.
pub fn resolve_initial_index(injected: Option<i64>, path: &str, query: &str) -> ChapterIndex {
    if let Some(index) = injected {
        return ChapterIndex::clamped(index);
    }
    path_chapter(path)
        .or_else(|| query_chapter(query))
        .unwrap_or(ChapterIndex::FIRST)
}

fn path_chapter(path: &str) -> Option<ChapterIndex> {
    const MARKER: &str = "/quran/surah/";
    let lowered = path.to_ascii_lowercase();
    let start = lowered.find(MARKER)? + MARKER.len();
    let digits: String = lowered[start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    ChapterIndex::from_number(digits.parse().ok()?).ok()
}

fn query_chapter(query: &str) -> Option<ChapterIndex> {
    let value = query
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| pair.strip_prefix("surah="))?;
    ChapterIndex::from_number(value.parse().ok()?).ok()
}

pub struct HydrationController {
    fetcher: Arc<dyn DatasetFetcher>,
    state: RwLock<ReaderState>,
    completion: SingleFlight<Result<()>>,
}

impl HydrationController {
    /// Reconciles the startup payload into one reader state. `fallback` is the
    /// index resolved from the page location, used when the payload does not
    /// name one.
    pub fn new(
        bootstrap: PageBootstrap,
        fallback: ChapterIndex,
        fetcher: Arc<dyn DatasetFetcher>,
    ) -> Self {
        let fallback = bootstrap
            .injected_index
            .map_or(fallback, ChapterIndex::clamped);
        let state = match bootstrap.payload {
            StartupPayload::Minimal(minimal) => Self::partial_state(minimal, fallback),
            StartupPayload::Legacy(data) => ReaderState::new(Phase::Complete, data, fallback),
            StartupPayload::Absent => {
                ReaderState::new(Phase::Empty, QuranData::from_meta(&[]), fallback)
            }
        };
        info!(phase = ?state.phase, chapter = state.current_chapter.number(), "reader hydrated");
        Self {
            fetcher,
            state: RwLock::new(state),
            completion: SingleFlight::new(),
        }
    }

    /// Builds the controller straight from a served page.
    pub fn from_page(
        html: &str,
        path: &str,
        query: &str,
        fetcher: Arc<dyn DatasetFetcher>,
    ) -> Self {
        let bootstrap = PageBootstrap::from_html(html);
        let fallback = resolve_initial_index(bootstrap.injected_index, path, query);
        Self::new(bootstrap, fallback, fetcher)
    }

    fn partial_state(bootstrap: SsrBootstrap, fallback: ChapterIndex) -> ReaderState {
        let index = bootstrap
            .initial_surah_index
            .map_or(fallback, ChapterIndex::clamped);
        let mut data = QuranData::from_meta(&bootstrap.surah_meta);
        if let Some((arabic, english)) = bootstrap.initial_chapter() {
            // slot by the chapter's own number, not the (possibly clamped) index
            let position = usize::from(arabic.number).wrapping_sub(1);
            let aligned = arabic.number == english.number
                && arabic.ayahs.len() == english.ayahs.len();
            if aligned && position < data.quran_arabic.len() {
                data.quran_arabic[position] = arabic.clone();
                data.quran_english[position] = english.clone();
            } else {
                warn!(chapter = arabic.number, "ignoring inconsistent bootstrap chapter");
            }
        }
        ReaderState::new(Phase::Partial, data, index)
    }

    pub fn phase(&self) -> Phase {
        self.state.read().phase
    }

    pub fn has_full_dataset(&self) -> bool {
        self.phase() == Phase::Complete
    }

    pub fn current_chapter(&self) -> ChapterIndex {
        self.state.read().current_chapter
    }

    pub fn current_verse(&self) -> usize {
        self.state.read().current_verse
    }

    pub fn location(&self) -> String {
        self.state.read().location.clone()
    }

    /// Verses in the current chapter; zero until it is loaded.
    pub fn verse_count(&self) -> usize {
        let state = self.state.read();
        state
            .data
            .quran_arabic
            .get(state.current_chapter.get())
            .map_or(0, |chapter| chapter.ayahs.len())
    }

    /// Global verse number of a verse in the current chapter.
    pub fn verse_number(&self, verse: usize) -> Option<u32> {
        let state = self.state.read();
        let chapter = state.data.quran_arabic.get(state.current_chapter.get())?;
        chapter.ayahs.get(verse).map(|ayah| ayah.number)
    }

    pub fn chapter_english_name(&self) -> Option<String> {
        let state = self.state.read();
        state
            .data
            .quran_arabic
            .get(state.current_chapter.get())
            .map(|chapter| chapter.english_name.clone())
    }

    pub fn is_loaded(&self, index: ChapterIndex) -> bool {
        self.state.read().data.is_loaded(index)
    }

    pub(crate) fn set_current_verse(&self, verse: usize) {
        self.state.write().current_verse = verse;
    }

    pub fn chapter_meta(&self) -> Vec<ChapterMeta> {
        self.state.read().data.chapter_meta()
    }

    pub fn chapter_list(&self, filter: &str) -> Vec<ChapterListItem> {
        let state = self.state.read();
        let meta = state.data.chapter_meta();
        chapter_list(&meta, state.current_chapter, filter)
    }

    pub fn view(&self) -> ReaderView {
        let state = self.state.read();
        let index = state.current_chapter;
        let chapter = state
            .data
            .pair(index)
            .filter(|_| state.data.is_loaded(index))
            .map(|(arabic, english)| render_chapter(arabic, english, index));
        ReaderView {
            phase: state.phase,
            location: state.location.clone(),
            current_verse: state.current_verse,
            loading: state.loading.then_some(LOADING_MESSAGE),
            error: state.error.clone(),
            chapter,
        }
    }

    /// Completes the dataset. Idempotent: returns at once when complete, and
    /// concurrent callers share a single set of network requests.
    pub async fn ensure_full_dataset(&self) -> Result<()> {
        if self.has_full_dataset() {
            return Ok(());
        }
        self.completion
            .run(move || async move {
                if self.has_full_dataset() {
                    return Ok(());
                }
                let data = self.fetch_dataset().await?;
                self.install(data);
                Ok(())
            })
            .await
    }

    async fn fetch_dataset(&self) -> Result<QuranData> {
        match self.fetcher.fetch_from_origin().await.and_then(QuranData::validate) {
            Ok(data) => Ok(data),
            Err(err) => {
                debug!(error = %err, "dataset endpoint failed, fetching editions directly");
                self.fetcher
                    .fetch_from_upstream()
                    .await
                    .and_then(QuranData::validate)
            }
        }
    }

    fn install(&self, data: QuranData) {
        let mut state = self.state.write();
        state.data = data;
        state.phase = Phase::Complete;
        info!("full dataset loaded");
    }

    /// Best-effort completion after first paint; failures are logged only.
    pub async fn complete_in_background(&self) {
        if let Err(err) = self.ensure_full_dataset().await {
            warn!(error = %err, "background dataset completion failed");
        }
    }

    /// Brings the reader to `index`. A chapter whose verses are missing waits
    /// on [`Self::ensure_full_dataset`]; if that fails the previous chapter
    /// stays rendered and an inline error is set.
    pub async fn load_chapter(
        &self,
        index: ChapterIndex,
        keep_audio: bool,
        force_reload: bool,
    ) -> Result<ChapterLoad> {
        let loaded = {
            let state = self.state.read();
            if !force_reload && state.current_chapter == index && state.data.is_loaded(index) {
                return Ok(ChapterLoad::Unchanged(index));
            }
            state.data.is_loaded(index)
        };

        if !loaded {
            self.state.write().loading = true;
            let completed = self.ensure_full_dataset().await;
            let mut state = self.state.write();
            state.loading = false;
            if let Err(err) = completed {
                warn!(chapter = index.number(), error = %err, "chapter unavailable");
                state.error = Some(LOAD_FAILED_MESSAGE.to_string());
                return Err(err);
            }
            if !state.data.is_loaded(index) {
                state.error = Some(LOAD_FAILED_MESSAGE.to_string());
                return Err(Error::malformed(format!(
                    "chapter {} missing from dataset",
                    index.number()
                )));
            }
        }

        let mut state = self.state.write();
        state.current_chapter = index;
        state.current_verse = 0;
        state.location = chapter_path(index);
        state.error = None;
        debug!(chapter = index.number(), "chapter loaded");
        Ok(ChapterLoad::Loaded {
            index,
            stop_audio: !keep_audio,
        })
    }

    /// First render: with any bootstrap present this uses local data only;
    /// with nothing embedded it has to wait for the dataset.
    pub async fn initial_view(&self) -> ReaderView {
        let index = self.current_chapter();
        if !self.is_loaded(index) {
            if let Err(err) = self.load_chapter(index, false, true).await {
                warn!(phase = ?self.phase(), error = %err, "initial chapter unavailable");
            }
        }
        self.view()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::fixtures;
    use crate::remote::FetchFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory fetcher counting calls on each path.
    pub(crate) struct StubFetcher {
        pub origin_calls: AtomicUsize,
        pub upstream_calls: AtomicUsize,
        pub origin_ok: bool,
        pub upstream_ok: bool,
        pub origin_malformed: bool,
    }

    impl StubFetcher {
        pub fn new(origin_ok: bool, upstream_ok: bool) -> Arc<Self> {
            Arc::new(Self {
                origin_calls: AtomicUsize::new(0),
                upstream_calls: AtomicUsize::new(0),
                origin_ok,
                upstream_ok,
                origin_malformed: false,
            })
        }

        pub fn calls(&self) -> (usize, usize) {
            (
                self.origin_calls.load(Ordering::SeqCst),
                self.upstream_calls.load(Ordering::SeqCst),
            )
        }
    }

    impl DatasetFetcher for StubFetcher {
        fn fetch_from_origin(&self) -> FetchFuture<'_, QuranData> {
            Box::pin(async move {
                self.origin_calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.origin_malformed {
                    let mut data = fixtures::dataset();
                    data.quran_english.pop();
                    return Ok(data);
                }
                if self.origin_ok {
                    Ok(fixtures::dataset())
                } else {
                    Err(Error::upstream("origin status 502"))
                }
            })
        }

        fn fetch_from_upstream(&self) -> FetchFuture<'_, QuranData> {
            Box::pin(async move {
                self.upstream_calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.upstream_ok {
                    Ok(fixtures::dataset())
                } else {
                    Err(Error::upstream("upstream unreachable"))
                }
            })
        }
    }

    fn minimal_page(index: usize) -> PageBootstrap {
        let data = fixtures::dataset();
        let index = ChapterIndex::new(index as i64).unwrap();
        PageBootstrap {
            payload: StartupPayload::Minimal(SsrBootstrap::for_chapter(&data, index)),
            injected_index: Some(index.get() as i64),
        }
    }

    fn partial(index: usize, fetcher: Arc<StubFetcher>) -> HydrationController {
        HydrationController::new(minimal_page(index), ChapterIndex::FIRST, fetcher)
    }

    fn idx(index: i64) -> ChapterIndex {
        ChapterIndex::new(index).unwrap()
    }

    #[test]
    fn initial_index_priority() {
        assert_eq!(resolve_initial_index(Some(7), "/quran/surah/20", "?surah=30").get(), 7);
        assert_eq!(resolve_initial_index(Some(900), "/", "").get(), 113);
        assert_eq!(resolve_initial_index(Some(-3), "/", "").get(), 0);
        assert_eq!(resolve_initial_index(None, "/Quran/Surah/20", "?surah=30").get(), 19);
        assert_eq!(resolve_initial_index(None, "/quran.html", "?surah=30").get(), 29);
        assert_eq!(resolve_initial_index(None, "/quran/surah/200", "surah=3").get(), 2);
        assert_eq!(resolve_initial_index(None, "/quran.html", "?surah=0").get(), 0);
        assert_eq!(resolve_initial_index(None, "/quran.html", "").get(), 0);
    }

    #[tokio::test]
    async fn partial_bootstrap_renders_without_network() {
        let fetcher = StubFetcher::new(true, true);
        let controller = partial(5, fetcher.clone());
        assert_eq!(controller.phase(), Phase::Partial);
        assert_eq!(controller.current_chapter(), idx(5));

        let view = controller.initial_view().await;
        let chapter = view.chapter.expect("chapter rendered from bootstrap");
        assert_eq!(chapter.number, 6);
        assert_eq!(chapter.verses.len(), fixtures::verse_count(5));

        let load = controller.load_chapter(idx(5), false, false).await.unwrap();
        assert_eq!(load, ChapterLoad::Unchanged(idx(5)));
        assert_eq!(fetcher.calls(), (0, 0));
        assert!(!controller.is_loaded(idx(6)));
    }

    #[tokio::test]
    async fn loading_missing_chapter_completes_dataset_first() {
        let fetcher = StubFetcher::new(true, true);
        let controller = partial(5, fetcher.clone());
        let load = controller.load_chapter(idx(6), false, false).await.unwrap();
        assert_eq!(
            load,
            ChapterLoad::Loaded {
                index: idx(6),
                stop_audio: true
            }
        );
        assert_eq!(fetcher.calls(), (1, 0));
        assert_eq!(controller.phase(), Phase::Complete);
        let view = controller.view();
        assert_eq!(view.chapter.unwrap().number, 7);
        assert_eq!(view.location, "/quran/surah/7");
        assert_eq!(view.loading, None);
    }

    #[tokio::test]
    async fn loading_indicator_shows_while_waiting() {
        let controller = partial(5, StubFetcher::new(true, true));
        assert_eq!(controller.view().loading, None);
        let (load, during) = tokio::join!(controller.load_chapter(idx(6), false, false), async {
            controller.view().loading
        });
        load.unwrap();
        assert_eq!(during, Some(LOADING_MESSAGE));
        assert_eq!(controller.view().loading, None);
    }

    #[tokio::test]
    async fn loading_indicator_clears_after_failure() {
        let controller = partial(5, StubFetcher::new(false, false));
        let (load, during) = tokio::join!(controller.load_chapter(idx(6), false, false), async {
            controller.view().loading
        });
        assert!(load.is_err());
        assert_eq!(during, Some(LOADING_MESSAGE));
        let view = controller.view();
        assert_eq!(view.loading, None);
        assert_eq!(view.error.as_deref(), Some(LOAD_FAILED_MESSAGE));
    }

    #[tokio::test]
    async fn concurrent_completion_issues_one_request() {
        let fetcher = StubFetcher::new(true, true);
        let controller = partial(0, fetcher.clone());
        let (a, b) = tokio::join!(
            controller.ensure_full_dataset(),
            controller.ensure_full_dataset()
        );
        assert_eq!(a, Ok(()));
        assert_eq!(b, Ok(()));
        assert_eq!(fetcher.calls(), (1, 0));
        controller.ensure_full_dataset().await.unwrap();
        assert_eq!(fetcher.calls(), (1, 0));
    }

    #[tokio::test]
    async fn falls_back_to_upstream_on_malformed_origin() {
        let fetcher = Arc::new(StubFetcher {
            origin_calls: AtomicUsize::new(0),
            upstream_calls: AtomicUsize::new(0),
            origin_ok: true,
            upstream_ok: true,
            origin_malformed: true,
        });
        let controller = partial(0, fetcher.clone());
        controller.ensure_full_dataset().await.unwrap();
        assert_eq!(fetcher.calls(), (1, 1));
        assert_eq!(controller.phase(), Phase::Complete);
    }

    #[tokio::test]
    async fn completed_dataset_keeps_verse_counts_aligned() {
        let controller = partial(3, StubFetcher::new(false, true));
        controller.ensure_full_dataset().await.unwrap();
        let state = controller.state.read();
        for (arabic, english) in state.data.quran_arabic.iter().zip(&state.data.quran_english) {
            assert_eq!(arabic.ayahs.len(), english.ayahs.len());
            assert!(!arabic.ayahs.is_empty());
        }
    }

    #[tokio::test]
    async fn failed_completion_keeps_previous_chapter() {
        let fetcher = StubFetcher::new(false, false);
        let controller = partial(5, fetcher.clone());
        controller.complete_in_background().await;
        assert_eq!(controller.phase(), Phase::Partial);

        let err = controller.load_chapter(idx(10), false, false).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamFetch(_)));
        let view = controller.view();
        assert_eq!(view.chapter.unwrap().number, 6);
        assert_eq!(view.location, "/quran/surah/6");
        assert!(view.error.is_some());
        assert_eq!(fetcher.calls(), (2, 2));

        // no automatic retry: the next navigation needing data tries again
        let _ = controller.load_chapter(idx(10), false, false).await;
        assert_eq!(fetcher.calls(), (3, 3));
    }

    #[tokio::test]
    async fn legacy_payload_is_complete() {
        let fetcher = StubFetcher::new(true, true);
        let bootstrap = PageBootstrap {
            payload: StartupPayload::Legacy(fixtures::dataset()),
            injected_index: Some(41),
        };
        let controller = HydrationController::new(bootstrap, ChapterIndex::FIRST, fetcher.clone());
        assert_eq!(controller.phase(), Phase::Complete);
        controller.load_chapter(idx(80), false, false).await.unwrap();
        controller.complete_in_background().await;
        assert_eq!(fetcher.calls(), (0, 0));
        assert_eq!(controller.location(), "/quran/surah/81");
    }

    #[tokio::test]
    async fn empty_startup_fetches_before_first_paint() {
        let fetcher = StubFetcher::new(true, true);
        let controller =
            HydrationController::new(PageBootstrap::absent(), idx(2), fetcher.clone());
        assert_eq!(controller.phase(), Phase::Empty);
        assert!(controller.view().chapter.is_none());
        let view = controller.initial_view().await;
        assert_eq!(view.phase, Phase::Complete);
        assert_eq!(view.chapter.unwrap().number, 3);
        assert_eq!(fetcher.calls(), (1, 0));
    }

    #[tokio::test]
    async fn empty_startup_failure_is_visible() {
        let controller = HydrationController::new(
            PageBootstrap::absent(),
            ChapterIndex::FIRST,
            StubFetcher::new(false, false),
        );
        let view = controller.initial_view().await;
        assert_eq!(view.phase, Phase::Empty);
        assert!(view.chapter.is_none());
        assert!(view.error.is_some());
    }

    #[tokio::test]
    async fn first_chapter_maps_to_canonical_root() {
        let controller = partial(3, StubFetcher::new(true, true));
        controller.load_chapter(ChapterIndex::FIRST, false, false).await.unwrap();
        assert_eq!(controller.location(), "/quran.html");
    }

    #[test]
    fn served_page_hydrates_partially() {
        let data = fixtures::dataset();
        let index = idx(12);
        let bootstrap = SsrBootstrap::for_chapter(&data, index);
        let script = crate::bootstrap::bootstrap_script(&bootstrap, index).unwrap();
        let html = format!("<html><body><main></main>{script}</body></html>");
        let fetcher = StubFetcher::new(true, true);
        let controller = HydrationController::from_page(&html, "/quran/surah/40", "", fetcher);
        assert_eq!(controller.phase(), Phase::Partial);
        assert_eq!(controller.current_chapter(), index);
        assert!(controller.is_loaded(index));

        let fetcher = StubFetcher::new(true, true);
        let bare = HydrationController::from_page("<html></html>", "/quran/surah/40", "", fetcher);
        assert_eq!(bare.phase(), Phase::Empty);
        assert_eq!(bare.current_chapter(), idx(39));
    }

    #[test]
    fn bootstrap_index_is_clamped() {
        let mut page = minimal_page(4);
        page.injected_index = None;
        if let StartupPayload::Minimal(bootstrap) = &mut page.payload {
            bootstrap.initial_surah_index = Some(400);
        }
        let fetcher = StubFetcher::new(true, true);
        let controller = HydrationController::new(page, ChapterIndex::FIRST, fetcher);
        assert_eq!(controller.current_chapter(), ChapterIndex::LAST);
        assert!(!controller.is_loaded(ChapterIndex::LAST));
    }
}
