use crate::error::Result;
use crate::flight::SingleFlight;
use crate::model::{EditionId, QuranData};
use crate::remote::EditionSource;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_TTL: Duration = Duration::from_secs(6 * 60 * 60);

#[derive(Clone)]
struct CachedDataset {
    data: Arc<QuranData>,
    fetched_at: Instant,
}

/// Process-wide copy of both editions.
///
/// Readers take a snapshot of the current `Arc`; a refresh swaps in a new one
/// and never mutates a published dataset. Concurrent misses share a single
/// upstream fetch pair.
pub struct ServerCache {
    source: Arc<dyn EditionSource>,
    ttl: Duration,
    slot: RwLock<Option<CachedDataset>>,
    flight: SingleFlight<Result<Arc<QuranData>>>,
}

impl ServerCache {
    pub fn new(source: Arc<dyn EditionSource>) -> Self {
        Self::with_ttl(source, DEFAULT_TTL)
    }

    pub fn with_ttl(source: Arc<dyn EditionSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: RwLock::new(None),
            flight: SingleFlight::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn fresh(&self) -> Option<Arc<QuranData>> {
        let slot = self.slot.read();
        slot.as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.data.clone())
    }

    /// Last successfully fetched dataset, however old.
    pub fn stale(&self) -> Option<Arc<QuranData>> {
        self.slot.read().as_ref().map(|cached| cached.data.clone())
    }

    pub async fn get_full_dataset(&self) -> Result<Arc<QuranData>> {
        if let Some(data) = self.fresh() {
            debug!("dataset cache hit");
            return Ok(data);
        }
        self.flight
            .run(move || async move {
                if let Some(data) = self.fresh() {
                    return Ok(data);
                }
                self.refresh().await
            })
            .await
    }

    async fn refresh(&self) -> Result<Arc<QuranData>> {
        let started = Instant::now();
        let (arabic, english) = tokio::join!(
            self.source.fetch_edition(EditionId::Arabic),
            self.source.fetch_edition(EditionId::English)
        );
        let fetched = match (arabic, english) {
            (Ok(quran_arabic), Ok(quran_english)) => QuranData {
                quran_arabic,
                quran_english,
            }
            .validate(),
            (Err(err), _) | (_, Err(err)) => Err(err),
        };
        let data = match fetched {
            Ok(data) => Arc::new(data),
            Err(err) => {
                warn!(error = %err, stale = self.stale().is_some(), "dataset refresh failed");
                return Err(err);
            }
        };
        *self.slot.write() = Some(CachedDataset {
            data: data.clone(),
            fetched_at: Instant::now(),
        });
        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "dataset cached"
        );
        Ok(data)
    }
}
