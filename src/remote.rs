//! Access to the public data APIs.
//!
//! The traits are always available so the cache and the reader can be driven
//! by in-memory sources; the `http` feature adds the reqwest-backed clients.

use crate::error::Result;
use crate::model::{Chapter, EditionId, QuranData};
use std::future::Future;
use std::pin::Pin;

pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

pub const DEFAULT_API_BASE: &str = "https://api.alquran.cloud/v1";
pub const DEFAULT_AUDIO_BASE: &str = "https://cdn.alquran.cloud/media/audio/ayah";
pub const DEFAULT_RECITER: &str = "ar.alafasy";
pub const PRAYER_API_BASE: &str = "https://api.aladhan.com/v1";
/// University of Islamic Sciences, Karachi.
pub const PRAYER_METHOD: u8 = 1;

/// Server-side source of a single language edition.
pub trait EditionSource: Send + Sync {
    fn fetch_edition(&self, edition: EditionId) -> FetchFuture<'_, Vec<Chapter>>;
}

/// Client-side source of the complete dataset.
pub trait DatasetFetcher: Send + Sync {
    /// The same-origin `/api/quran-data` endpoint, normally served from cache.
    fn fetch_from_origin(&self) -> FetchFuture<'_, QuranData>;

    /// Both upstream editions, requested in parallel.
    fn fetch_from_upstream(&self) -> FetchFuture<'_, QuranData>;
}

#[cfg(feature = "http")]
pub use self::http::{AlQuranCloud, HttpDatasetFetcher, PrayerTimesClient};

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::error::Error;
    use crate::prayer::{Coordinates, PrayerTimes};
    use chrono::NaiveDate;
    use reqwest::{Client, Response};
    use serde::Deserialize;
    use serde::de::DeserializeOwned;
    use tracing::debug;

    #[derive(Debug, Deserialize)]
    struct Envelope<T> {
        data: T,
    }

    #[derive(Debug, Deserialize)]
    struct EditionBody {
        surahs: Vec<Chapter>,
    }

    #[derive(Debug, Deserialize)]
    struct TimingsBody {
        timings: PrayerTimes,
    }

    async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| Error::upstream(format!("{url}: {err}")))?;
        let response = ensure_success(url, response)?;
        response
            .json::<T>()
            .await
            .map_err(|err| Error::malformed(format!("{url}: {err}")))
    }

    fn ensure_success(url: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::upstream(format!("{url}: status {status}")))
        }
    }

    /// The AlQuran Cloud edition API.
    #[derive(Debug, Clone)]
    pub struct AlQuranCloud {
        client: Client,
        api_base: String,
    }

    impl Default for AlQuranCloud {
        fn default() -> Self {
            Self::new(Client::new(), DEFAULT_API_BASE)
        }
    }

    impl AlQuranCloud {
        pub fn new(client: Client, api_base: impl Into<String>) -> Self {
            Self {
                client,
                api_base: api_base.into().trim_end_matches('/').to_string(),
            }
        }

        pub fn edition_url(&self, edition: EditionId) -> String {
            format!("{}/quran/{}", self.api_base, edition.slug())
        }

        pub async fn fetch_dataset(&self) -> Result<QuranData> {
            let (arabic, english) = tokio::join!(
                self.fetch_edition(EditionId::Arabic),
                self.fetch_edition(EditionId::English)
            );
            QuranData {
                quran_arabic: arabic?,
                quran_english: english?,
            }
            .validate()
        }
    }

    impl EditionSource for AlQuranCloud {
        fn fetch_edition(&self, edition: EditionId) -> FetchFuture<'_, Vec<Chapter>> {
            Box::pin(async move {
                let url = self.edition_url(edition);
                debug!(%url, "fetching edition");
                let envelope: Envelope<EditionBody> = get_json(&self.client, &url).await?;
                Ok(envelope.data.surahs)
            })
        }
    }

    /// Fetcher used by the reader: same-origin endpoint first, upstream second.
    #[derive(Debug, Clone)]
    pub struct HttpDatasetFetcher {
        client: Client,
        origin_endpoint: String,
        upstream: AlQuranCloud,
    }

    impl HttpDatasetFetcher {
        /// `origin` is the site root, e.g. `https://ruhverse.online`.
        pub fn new(client: Client, origin: &str, upstream: AlQuranCloud) -> Self {
            Self {
                client,
                origin_endpoint: format!("{}/api/quran-data", origin.trim_end_matches('/')),
                upstream,
            }
        }
    }

    impl DatasetFetcher for HttpDatasetFetcher {
        fn fetch_from_origin(&self) -> FetchFuture<'_, QuranData> {
            Box::pin(async move {
                let data: QuranData = get_json(&self.client, &self.origin_endpoint).await?;
                data.validate()
            })
        }

        fn fetch_from_upstream(&self) -> FetchFuture<'_, QuranData> {
            Box::pin(self.upstream.fetch_dataset())
        }
    }

    /// Daily timings from the Aladhan API.
    #[derive(Debug, Clone)]
    pub struct PrayerTimesClient {
        client: Client,
        api_base: String,
    }

    impl Default for PrayerTimesClient {
        fn default() -> Self {
            Self::new(Client::new(), PRAYER_API_BASE)
        }
    }

    impl PrayerTimesClient {
        pub fn new(client: Client, api_base: impl Into<String>) -> Self {
            Self {
                client,
                api_base: api_base.into().trim_end_matches('/').to_string(),
            }
        }

        pub fn timings_url(&self, date: NaiveDate, at: Coordinates) -> String {
            format!(
                "{}/timings/{}?latitude={}&longitude={}&method={PRAYER_METHOD}",
                self.api_base,
                date.format("%d-%m-%Y"),
                at.latitude,
                at.longitude
            )
        }

        pub async fn fetch(&self, date: NaiveDate, at: Coordinates) -> Result<PrayerTimes> {
            let url = self.timings_url(date, at);
            let envelope: Envelope<TimingsBody> = get_json(&self.client, &url).await?;
            Ok(envelope.data.timings)
        }
    }

}
