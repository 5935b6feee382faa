use crate::bootstrap::{SsrBootstrap, bootstrap_script, script_safe_json};
use crate::cache::ServerCache;
use crate::model::{ChapterIndex, QuranData};
use crate::view::{ChapterListItem, ChapterView, chapter_list, chapter_path, render_chapter};
use askama::Template;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

const SITE_NAME: &str = "RuhVerse";
const DEGRADED_TITLE: &str = "Read Quran Online - RuhVerse";
const UNAVAILABLE_MESSAGE: &str =
    "Quran data is temporarily unavailable. Please check your connection and try again shortly.";

/// Server-side renderer for chapter pages.
#[derive(Clone)]
pub struct PageRenderer {
    cache: Arc<ServerCache>,
    base_url: String,
}

impl PageRenderer {
    pub fn new(cache: Arc<ServerCache>, base_url: impl Into<String>) -> Self {
        Self {
            cache,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn cache(&self) -> &Arc<ServerCache> {
        &self.cache
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn canonical_url(&self, index: ChapterIndex) -> String {
        format!("{}{}", self.base_url, chapter_path(index))
    }

    /// Always produces a complete document; upstream failures fall back to the
    /// last cached dataset, then to a placeholder page.
    pub async fn render(&self, index: ChapterIndex, request_path: &str) -> String {
        let data = match self.cache.get_full_dataset().await {
            Ok(data) => Some(data),
            Err(err) => match self.cache.stale() {
                Some(stale) => {
                    warn!(path = request_path, error = %err, "serving stale dataset");
                    Some(stale)
                }
                None => {
                    warn!(path = request_path, error = %err, "rendering degraded page");
                    None
                }
            },
        };
        match data {
            Some(data) => self.render_dataset(&data, index, request_path),
            None => self.render_degraded(index, request_path),
        }
    }

    /// Renders a chapter page from an already fetched dataset.
    pub fn render_dataset(
        &self,
        data: &QuranData,
        index: ChapterIndex,
        request_path: &str,
    ) -> String {
        let Some((arabic, english)) = data.pair(index) else {
            return self.render_degraded(index, request_path);
        };
        let chapter = render_chapter(arabic, english, index);
        let meta = data.chapter_meta();
        let bootstrap = match bootstrap_script(&SsrBootstrap::for_chapter(data, index), index) {
            Ok(script) => Some(script),
            Err(err) => {
                warn!(chapter = index.number(), error = %err, "omitting startup payload");
                None
            }
        };
        debug!(chapter = index.number(), path = request_path, "rendering chapter page");
        let template = ChapterPageTemplate {
            title: chapter_title(&chapter),
            description: chapter_description(&chapter),
            canonical_url: self.canonical_url(index),
            json_ld: script_safe_json(&self.chapter_json_ld(&chapter, index)),
            previous_href: index.offset(-1).map(chapter_path),
            next_href: index.next().map(chapter_path),
            chapters: chapter_list(&meta, index, ""),
            chapter: Some(&chapter),
            bootstrap,
            request_path,
            unavailable: UNAVAILABLE_MESSAGE,
        };
        self.finish(template, index, request_path)
    }

    fn render_degraded(&self, index: ChapterIndex, request_path: &str) -> String {
        let template = ChapterPageTemplate {
            title: DEGRADED_TITLE.to_string(),
            description: format!(
                "Read the Quran with Arabic text and English translation on {SITE_NAME}."
            ),
            canonical_url: self.canonical_url(index),
            json_ld: String::from("{}"),
            previous_href: None,
            next_href: None,
            chapters: Vec::new(),
            chapter: None,
            bootstrap: None,
            request_path,
            unavailable: UNAVAILABLE_MESSAGE,
        };
        self.finish(template, index, request_path)
    }

    fn finish(
        &self,
        template: ChapterPageTemplate<'_>,
        index: ChapterIndex,
        request_path: &str,
    ) -> String {
        template.render().unwrap_or_else(|err| {
            warn!(chapter = index.number(), error = %err, "template rendering failed");
            fallback_page(request_path)
        })
    }

    fn chapter_json_ld(&self, chapter: &ChapterView, index: ChapterIndex) -> String {
        let page_url = self.canonical_url(index);
        let book_url = self.canonical_url(ChapterIndex::FIRST);
        serde_json::to_string_pretty(&json!({
            "@context": "https://schema.org",
            "@graph": [
                {
                    "@type": "Chapter",
                    "@id": page_url,
                    "url": page_url,
                    "name": format!("Surah {}", chapter.english_name),
                    "alternateName": [chapter.name, chapter.english_name_translation],
                    "position": chapter.number,
                    "inLanguage": ["ar", "en"],
                    "isPartOf": { "@type": "Book", "name": "The Holy Quran", "url": book_url },
                },
                {
                    "@type": "BreadcrumbList",
                    "itemListElement": [
                        { "@type": "ListItem", "position": 1, "name": "Home", "item": format!("{}/", self.base_url) },
                        { "@type": "ListItem", "position": 2, "name": "Quran", "item": book_url },
                        { "@type": "ListItem", "position": 3, "name": chapter.title, "item": page_url }
                    ]
                }
            ]
        }))
        .unwrap_or_else(|_| "{}".to_string())
    }
}

fn chapter_title(chapter: &ChapterView) -> String {
    format!(
        "Surah {} ({}) - Read Quran Online - {SITE_NAME}",
        chapter.english_name, chapter.number
    )
}

fn chapter_description(chapter: &ChapterView) -> String {
    format!(
        "Read Surah {} ({}) with Arabic text and English translation on {SITE_NAME}.",
        chapter.english_name, chapter.number
    )
}

fn fallback_page(request_path: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head><meta charset="utf-8" /><title>{DEGRADED_TITLE}</title></head>
  <body><p class="data-unavailable">{UNAVAILABLE_MESSAGE}</p><a href="{}">Try again</a></body>
</html>"#,
        markup_escape(request_path)
    )
}

/// Escaping shared by the hand-written fallback page and the sitemap.
pub(crate) fn markup_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{{ title }}</title>
    <meta name="description" content="{{ description }}" />
    <link rel="canonical" href="{{ canonical_url }}" />
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
    <script type="application/ld+json">
{{ json_ld|safe }}
    </script>
  </head>
  <body class="bg-slate-50 text-slate-900">
    <main class="min-h-screen flex flex-col lg:flex-row gap-6 py-8 px-4">
      {% if !chapters.is_empty() %}
      <aside id="surah-list" class="lg:w-80 w-full space-y-2">
        <input id="surah-search" type="search" placeholder="Search Surah..." class="w-full rounded border border-slate-300 px-3 py-2" />
        <ul class="bg-white shadow rounded divide-y divide-slate-100 max-h-[80vh] overflow-y-auto">
          {% for item in chapters %}
          <li class="surah-item flex items-center justify-between px-3 py-2{% if item.active %} bg-emerald-50 font-semibold{% endif %}" data-index="{{ item.index }}">
            <a href="{{ item.href }}">{{ item.number }}. {{ item.english_name }} <span class="text-slate-500">{{ item.english_name_translation }}</span></a>
            <span class="arabic-name" lang="ar" dir="rtl">{{ item.name }}</span>
            <button type="button" class="play-surah" data-index="{{ item.index }}" aria-label="Play {{ item.english_name }}">&#9654;</button>
          </li>
          {% endfor %}
        </ul>
      </aside>
      {% endif %}
      <section id="reader" class="flex-1 max-w-4xl space-y-6">
        {% match chapter %}
        {% when Some with (chapter) %}
        <header class="space-y-1">
          <h1 id="surah-title" class="text-3xl font-extrabold tracking-tight">{{ chapter.title }}</h1>
          <p class="text-slate-600"><span lang="ar" dir="rtl">{{ chapter.name }}</span> &middot; {{ chapter.english_name_translation }}</p>
        </header>
        {% match chapter.bismillah_header %}
        {% when Some with (bismillah) %}
        <div id="bismillah" class="text-center text-2xl" lang="ar" dir="rtl">{{ bismillah }}</div>
        {% when None %}
        {% endmatch %}
        <ol id="verses" class="space-y-4">
          {% for verse in chapter.verses %}
          <li class="verse bg-white shadow rounded p-4" data-verse="{{ verse.number }}">
            <p class="arabic text-right text-2xl leading-loose" lang="ar" dir="rtl">{{ verse.arabic }} <span class="verse-number">({{ verse.number_in_surah }})</span></p>
            <p class="translation text-slate-700">{{ verse.number_in_surah }}. {{ verse.translation }}</p>
          </li>
          {% endfor %}
        </ol>
        <nav id="pagination" class="flex items-center justify-between">
          {% match previous_href %}
          {% when Some with (href) %}
          <a id="prev-surah" href="{{ href }}" class="rounded bg-slate-900 px-4 py-2 text-white">Previous</a>
          {% when None %}
          <span id="prev-surah" class="rounded bg-slate-300 px-4 py-2 text-white" aria-disabled="true">Previous</span>
          {% endmatch %}
          <span id="page-info">Chapter {{ chapter.pagination.current }} of {{ chapter.pagination.total }}</span>
          {% match next_href %}
          {% when Some with (href) %}
          <a id="next-surah" href="{{ href }}" class="rounded bg-slate-900 px-4 py-2 text-white">Next</a>
          {% when None %}
          <span id="next-surah" class="rounded bg-slate-300 px-4 py-2 text-white" aria-disabled="true">Next</span>
          {% endmatch %}
        </nav>
        {% when None %}
        <div id="verses" class="data-unavailable bg-white shadow rounded p-6 text-center">
          <p>{{ unavailable }}</p>
          <a href="{{ request_path }}" class="underline">Try again</a>
        </div>
        {% endmatch %}
      </section>
    </main>
    {% match bootstrap %}
    {% when Some with (script) %}
    {{ script|safe }}
    {% when None %}
    {% endmatch %}
  </body>
</html>"#,
    ext = "html"
)]
struct ChapterPageTemplate<'a> {
    title: String,
    description: String,
    canonical_url: String,
    json_ld: String,
    previous_href: Option<String>,
    next_href: Option<String>,
    chapters: Vec<ChapterListItem>,
    chapter: Option<&'a ChapterView>,
    bootstrap: Option<String>,
    request_path: &'a str,
    unavailable: &'static str,
}
