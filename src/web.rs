use crate::cache::{DEFAULT_TTL, ServerCache};
use crate::insights::{Insight, daily_insights};
use crate::model::{CHAPTER_COUNT, ChapterIndex};
use crate::prayer::{Coordinates, Prayer, PrayerTimes, format_12h, format_countdown};
use crate::remote::{
    AlQuranCloud, DEFAULT_API_BASE, PRAYER_API_BASE, PRAYER_METHOD, PrayerTimesClient,
};
use crate::render::{PageRenderer, markup_escape};
use crate::view::chapter_path;
use askama::Template;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use chrono::{Local, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub renderer: PageRenderer,
    pub prayer: PrayerTimesClient,
}

impl AppState {
    pub fn new(renderer: PageRenderer, prayer: PrayerTimesClient) -> Self {
        Self { renderer, prayer }
    }

    fn base_url(&self) -> &str {
        self.renderer.base_url()
    }
}

#[derive(Clone, Debug)]
pub struct WebConfig {
    pub addr: SocketAddr,
    /// Public origin used for canonical links and the sitemap.
    pub base_url: String,
    pub cache_ttl: Duration,
    pub api_base: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            base_url: "https://ruhverse.online".to_string(),
            cache_ttl: DEFAULT_TTL,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn serve(config: WebConfig) -> Result<(), WebError> {
    let client = reqwest::Client::new();
    let source = Arc::new(AlQuranCloud::new(client.clone(), config.api_base.clone()));
    let cache = Arc::new(ServerCache::with_ttl(source, config.cache_ttl));
    let state = Arc::new(AppState::new(
        PageRenderer::new(cache, config.base_url.clone()),
        PrayerTimesClient::new(client, PRAYER_API_BASE),
    ));
    let router = build_router(state);
    info!(
        %config.addr,
        base = %config.base_url,
        api = %config.api_base,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/quran.html", get(first_chapter))
        .route("/quran", get(first_chapter))
        .route("/quran/surah/:number", get(chapter_by_number))
        .route("/api/quran-data", get(api_quran_data))
        .route("/api/insights", get(api_insights))
        .route("/api/prayer-times", get(api_prayer_times))
        .route("/healthz", get(health))
        .route("/sitemap.xml", get(sitemap_xml))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn home(State(state): State<SharedState>) -> Response {
    let today = Utc::now().date_naive();
    let template = HomeTemplate {
        canonical_url: format!("{}/", state.base_url()),
        json_ld: website_json_ld(state.base_url()),
        reader_href: chapter_path(ChapterIndex::FIRST),
        date: today.format("%A, %-d %B %Y").to_string(),
        insights: daily_insights(today),
    };
    page_or_error(template.render(), "/")
}

fn page_or_error(rendered: askama::Result<String>, path: &str) -> Response {
    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            warn!(path, error = %err, "page rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Html(render_error_page())).into_response()
        }
    }
}

async fn first_chapter(State(state): State<SharedState>, uri: Uri) -> impl IntoResponse {
    Html(state.renderer.render(ChapterIndex::FIRST, uri.path()).await)
}

async fn chapter_by_number(
    State(state): State<SharedState>,
    Path(number): Path<String>,
    uri: Uri,
) -> Response {
    let Some(index) = parse_chapter_number(&number) else {
        return (StatusCode::NOT_FOUND, Html(render_not_found_page(uri.path()))).into_response();
    };
    if index.is_first() {
        return (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, chapter_path(index))],
        )
            .into_response();
    }
    Html(state.renderer.render(index, uri.path()).await).into_response()
}

/// Only plain decimal digits name a chapter; `+5` or `05x` do not.
fn parse_chapter_number(raw: &str) -> Option<ChapterIndex> {
    if raw.is_empty() || !raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let number = raw.parse::<i64>().ok()?;
    ChapterIndex::from_number(number).ok()
}

async fn api_quran_data(State(state): State<SharedState>) -> Result<Response, ApiError> {
    let data = state
        .renderer
        .cache()
        .get_full_dataset()
        .await
        .map_err(|err| ApiError::bad_gateway(err.to_string()))?;
    Ok(Json(&*data).into_response())
}

async fn api_insights() -> impl IntoResponse {
    let today = Utc::now().date_naive();
    Json(json!({
        "date": today,
        "insights": daily_insights(today),
    }))
}

#[derive(Debug, Deserialize)]
struct PrayerParams {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl PrayerParams {
    fn coordinates(&self) -> Result<Coordinates, ApiError> {
        let fallback = Coordinates::default();
        let at = Coordinates {
            latitude: self.latitude.unwrap_or(fallback.latitude),
            longitude: self.longitude.unwrap_or(fallback.longitude),
        };
        if !(-90.0..=90.0).contains(&at.latitude) || !(-180.0..=180.0).contains(&at.longitude) {
            return Err(ApiError::bad_request(
                "`latitude` must be within -90..=90 and `longitude` within -180..=180",
            ));
        }
        Ok(at)
    }
}

async fn api_prayer_times(
    State(state): State<SharedState>,
    Query(params): Query<PrayerParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let at = params.coordinates()?;
    let now = Local::now().naive_local();
    let timings = state.prayer.fetch(now.date(), at).await.map_err(|err| {
        warn!(error = %err, "prayer times unavailable");
        ApiError::bad_gateway(err.to_string())
    })?;
    Ok(Json(prayer_times_body(now, at, &timings)))
}

/// Response body for the prayer widget, including the countdown to the next
/// prayer as seen at `now`.
fn prayer_times_body(
    now: NaiveDateTime,
    at: Coordinates,
    timings: &PrayerTimes,
) -> serde_json::Value {
    let active = timings.active_at(now.time());
    let display: Vec<_> = Prayer::ALL
        .iter()
        .map(|&prayer| {
            json!({
                "prayer": prayer,
                "time": timings.time(prayer).map(format_12h),
                "active": active == Some(prayer),
            })
        })
        .collect();
    let next = timings.next_after(now).map(|upcoming| {
        json!({
            "prayer": upcoming.prayer,
            "time": format_12h(upcoming.at.time()),
            "countdown": format_countdown(upcoming.remaining),
        })
    });
    json!({
        "date": now.date().format("%d-%m-%Y").to_string(),
        "latitude": at.latitude,
        "longitude": at.longitude,
        "method": PRAYER_METHOD,
        "timings": timings,
        "display": display,
        "next": next,
    })
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "ruhverse" }))
}

async fn sitemap_xml(State(state): State<SharedState>) -> impl IntoResponse {
    let mut body = String::with_capacity(128 * (CHAPTER_COUNT + 1));
    body.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    body.push_str(r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#);
    let mut push_url = |loc: String, priority: &str| {
        body.push_str("<url><loc>");
        body.push_str(&markup_escape(&loc));
        body.push_str("</loc><changefreq>weekly</changefreq><priority>");
        body.push_str(priority);
        body.push_str("</priority></url>");
    };
    push_url(format!("{}/", state.base_url()), "0.8");
    for index in ChapterIndex::all() {
        let priority = if index.is_first() { "0.9" } else { "0.7" };
        push_url(state.renderer.canonical_url(index), priority);
    }
    body.push_str("</urlset>");
    ([(header::CONTENT_TYPE, "application/xml")], body)
}

fn website_json_ld(base_url: &str) -> String {
    serde_json::to_string_pretty(&json!({
        "@context": "https://schema.org",
        "@type": "WebSite",
        "name": "RuhVerse",
        "url": format!("{base_url}/"),
        "hasPart": {
            "@type": "Book",
            "name": "The Holy Quran",
            "url": format!("{base_url}{}", chapter_path(ChapterIndex::FIRST)),
        }
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

fn render_error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Something went wrong - RuhVerse</title>
  </head>
  <body>
    <main>
      <h1>Something went wrong</h1>
      <p>This page could not be rendered. Please try again shortly.</p>
      <a href="/quran.html">Open the Quran reader</a>
    </main>
  </body>
</html>"#
        .to_string()
}

fn render_not_found_page(path: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Not found - RuhVerse</title>
  </head>
  <body>
    <main>
      <h1>Page not found</h1>
      <p>No page exists at {path}. Surahs are numbered 1 to {CHAPTER_COUNT}.</p>
      <a href="/quran.html">Open the Quran reader</a>
    </main>
  </body>
</html>"#,
        path = markup_escape(path),
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>RuhVerse - Read Quran Online</title>
    <meta name="description" content="Read the Quran with Arabic text and English translation, listen to recitation and check daily prayer times on RuhVerse." />
    <link rel="canonical" href="{{ canonical_url }}" />
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    <script type="application/ld+json">
{{ json_ld|safe }}
    </script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col items-center justify-start py-10 px-4">
      <div class="max-w-5xl w-full space-y-6">
        <div>
          <p class="uppercase tracking-wide text-sm text-slate-500">RuhVerse</p>
          <h1 class="text-4xl font-extrabold tracking-tight">Read, listen and reflect.</h1>
          <a href="{{ reader_href }}" class="inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors">Open the Quran</a>
        </div>
        <section id="insights" class="space-y-3">
          <h2 class="text-xl font-semibold">Insights for {{ date }}</h2>
          {% for insight in insights %}
          <article class="insight-card bg-white shadow rounded p-4">
            <h3 class="font-semibold">{{ insight.title }}</h3>
            <p class="text-slate-700">{{ insight.text }}</p>
          </article>
          {% endfor %}
        </section>
        <section id="prayer-times" class="bg-white shadow rounded p-4" data-endpoint="/api/prayer-times">
          <h2 class="text-xl font-semibold">Prayer times</h2>
          <p class="text-slate-600">Loading today's timings...</p>
        </section>
      </div>
    </main>
  </body>
</html>"#,
    ext = "html"
)]
struct HomeTemplate {
    canonical_url: String,
    json_ld: String,
    reader_href: String,
    date: String,
    insights: Vec<Insight>,
}
