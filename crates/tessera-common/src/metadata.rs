//! Linked-page metadata (Open Graph title/description/image).

use std::future::Future;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::TesseraError;
use crate::sanitize::decode_cms_text;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl PageMetadata {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image.is_none()
    }
}

/// Source of metadata for linked pages.
pub trait PageMetadataSource {
    /// Never fails: unreachable pages yield [`PageMetadata::default`].
    fn fetch(&self, url: &str) -> impl Future<Output = PageMetadata>;
}

impl PageMetadataSource for () {
    async fn fetch(&self, _url: &str) -> PageMetadata {
        PageMetadata::default()
    }
}

fn meta_content(doc: &Html, name: &str) -> Option<String> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "meta")
        .find(|el| {
            el.value().attr("name") == Some(name) || el.value().attr("property") == Some(name)
        })
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn document_title(doc: &Html) -> Option<String> {
    doc.root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "title")
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Pull `og:title`/`<title>`, `og:description`/`description` and `og:image`
/// out of a page. Text values are entity-decoded.
pub fn parse_page_metadata(html: &str) -> PageMetadata {
    let doc = Html::parse_document(html);
    PageMetadata {
        title: meta_content(&doc, "og:title")
            .or_else(|| document_title(&doc))
            .map(|t| decode_cms_text(&t)),
        description: meta_content(&doc, "og:description")
            .or_else(|| meta_content(&doc, "description"))
            .map(|d| decode_cms_text(&d)),
        image: meta_content(&doc, "og:image"),
    }
}

/// Fetches linked pages over HTTP and caches what it finds.
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    base: Option<Url>,
    #[cfg(feature = "cache")]
    cache: crate::cache::TtlCache<String, PageMetadata>,
}

impl HttpMetadataFetcher {
    /// `base` resolves relative links; pass the current page URL.
    pub fn new(base: Option<&str>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.and_then(|b| Url::parse(b).ok()),
            #[cfg(feature = "cache")]
            cache: crate::cache::TtlCache::new(256, std::time::Duration::from_secs(10 * 60)),
        }
    }

    fn resolve(&self, link: &str) -> Result<Url, TesseraError> {
        match &self.base {
            Some(base) => Ok(base.join(link)?),
            None => Ok(Url::parse(link)?),
        }
    }

    async fn try_fetch(&self, link: &str) -> Result<PageMetadata, TesseraError> {
        let url = self.resolve(link)?;
        let resp = self.client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(TesseraError::fetch(url.as_str(), resp.status()));
        }
        let body = resp.text().await?;
        Ok(parse_page_metadata(&body))
    }
}

#[cfg(feature = "cache")]
impl HttpMetadataFetcher {
    fn cached(&self, url: &str) -> Option<PageMetadata> {
        self.cache.get(&url.to_owned())
    }

    fn remember(&self, url: &str, metadata: &PageMetadata) {
        self.cache.insert(url.to_owned(), metadata.clone());
    }
}

#[cfg(not(feature = "cache"))]
impl HttpMetadataFetcher {
    fn cached(&self, _url: &str) -> Option<PageMetadata> {
        None
    }

    fn remember(&self, _url: &str, _metadata: &PageMetadata) {}
}

impl PageMetadataSource for HttpMetadataFetcher {
    async fn fetch(&self, url: &str) -> PageMetadata {
        if let Some(hit) = self.cached(url) {
            return hit;
        }
        let metadata = match self.try_fetch(url).await {
            Ok(m) => m,
            Err(err) => {
                tracing::debug!(%url, error = %err, "page metadata unavailable");
                PageMetadata::default()
            }
        };
        self.remember(url, &metadata);
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_prefers_open_graph() {
        let html = r#"<!doctype html><html><head>
            <title>Plain title</title>
            <meta property="og:title" content="OG &amp; Title">
            <meta name="description" content="Fallback description">
            <meta property="og:image" content="https://cdn.example.com/og.png">
            </head><body></body></html>"#;
        assert_eq!(
            parse_page_metadata(html),
            PageMetadata {
                title: Some("OG & Title".into()),
                description: Some("Fallback description".into()),
                image: Some("https://cdn.example.com/og.png".into()),
            }
        );
    }

    #[test]
    fn test_falls_back_to_document_title() {
        let meta = parse_page_metadata("<html><head><title> Only </title></head></html>");
        assert_eq!(meta.title.as_deref(), Some("Only"));
        assert_eq!(meta.description, None);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_unresolvable_link_degrades_to_empty() {
        let fetcher = HttpMetadataFetcher::new(None);
        assert!(fetcher.fetch("not a url").await.is_empty());
    }
}
