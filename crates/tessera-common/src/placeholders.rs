//! Localised UI strings.
//!
//! Placeholders come from `{prefix}/placeholders.json`, a CMS spreadsheet
//! export shaped like `{"data": [{"Key": "...", "Text": "..."}]}`. Lookups
//! always have an English fallback, so a missing sheet only costs the
//! translation.

use std::collections::HashMap;
use std::future::Future;

use serde::Deserialize;
use tokio::sync::OnceCell;

use crate::error::TesseraError;

/// Keys used by the carousel block.
pub mod keys {
    pub const LINKED_PAGE_ARIA_LABEL: &str = "carouselLinkedPageAriaLabel";
    pub const GO_TO_ARIA_LABEL: &str = "carouselGoToAriaLabel";
    pub const SLIDE_ARIA_LABEL: &str = "carouselSlideAriaLabel";
    pub const SLIDE_ROLE: &str = "carouselSlideRole";
    pub const PREVIOUS_SLIDE_ARIA_LABEL: &str = "carouselPreviousSlideAriaLabel";
    pub const NEXT_SLIDE_ARIA_LABEL: &str = "carouselNextSlideAriaLabel";
    pub const GO_TO_SLIDE_ARIA_LABEL: &str = "carouselGoToSlideAriaLabel";
    pub const ARIA_LABEL: &str = "carouselAriaLabel";
    pub const ROLE: &str = "carouselRole";
    pub const PAUSE_VIDEO_ARIA_LABEL: &str = "carouselPauseVideoAriaLabel";
    pub const PLAY_VIDEO_ARIA_LABEL: &str = "carouselPlayVideoAriaLabel";
    pub const SLIDE_ANNOUNCEMENT: &str = "carouselSlideAnnouncement";
}

/// Resolved placeholder strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    entries: HashMap<String, String>,
}

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, text: &str) -> Self {
        self.entries.insert(key.to_owned(), text.to_owned());
        self
    }

    /// Text for `key`, or `fallback` when missing or blank.
    pub fn get_or<'a>(&'a self, key: &str, fallback: &'a str) -> &'a str {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(fallback)
    }

    /// Resolve `key` and substitute positional `{0}`, `{1}`, ... arguments.
    pub fn format(&self, key: &str, fallback: &str, args: &[&dyn std::fmt::Display]) -> String {
        format_template(self.get_or(key, fallback), args)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Replace the first occurrence of each `{n}` with its argument.
pub fn format_template(template: &str, args: &[&dyn std::fmt::Display]) -> String {
    let mut out = template.to_owned();
    for (i, arg) in args.iter().enumerate() {
        out = out.replacen(&format!("{{{i}}}"), &arg.to_string(), 1);
    }
    out
}

#[derive(Debug, Deserialize)]
struct PlaceholderSheet {
    #[serde(default)]
    data: Vec<PlaceholderRow>,
}

#[derive(Debug, Deserialize)]
struct PlaceholderRow {
    #[serde(rename = "Key", default)]
    key: String,
    #[serde(rename = "Text", default)]
    text: String,
}

/// Parse a placeholder sheet export.
pub fn parse_placeholder_sheet(json: &str) -> Result<Placeholders, TesseraError> {
    let sheet: PlaceholderSheet = serde_json::from_str(json)?;
    let entries = sheet
        .data
        .into_iter()
        .filter(|row| !row.key.is_empty())
        .map(|row| (row.key, row.text))
        .collect();
    Ok(Placeholders { entries })
}

/// Source of placeholder strings.
pub trait PlaceholderSource {
    /// Never fails: an unreachable sheet yields an empty set.
    fn placeholders(&self) -> impl Future<Output = Placeholders>;
}

impl PlaceholderSource for Placeholders {
    async fn placeholders(&self) -> Placeholders {
        self.clone()
    }
}

/// Fetches `{prefix}/placeholders.json` once and keeps the result, including
/// the empty result of a failed fetch.
pub struct HttpPlaceholders {
    client: reqwest::Client,
    url: String,
    cached: OnceCell<Placeholders>,
}

impl HttpPlaceholders {
    /// `base` is the site origin (e.g. `https://example.com`), `prefix` the
    /// locale path (e.g. `/ja`, or empty).
    pub fn new(base: &str, prefix: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: format!("{}{}/placeholders.json", base.trim_end_matches('/'), prefix),
            cached: OnceCell::new(),
        }
    }

    async fn fetch(&self) -> Result<Placeholders, TesseraError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(TesseraError::fetch(&self.url, resp.status()));
        }
        let body = resp.text().await?;
        parse_placeholder_sheet(&body)
    }
}

impl PlaceholderSource for HttpPlaceholders {
    async fn placeholders(&self) -> Placeholders {
        self.cached
            .get_or_init(|| async {
                match self.fetch().await {
                    Ok(p) => {
                        tracing::debug!(url = %self.url, count = p.len(), "placeholders loaded");
                        p
                    }
                    Err(err) => {
                        tracing::warn!(url = %self.url, error = %err, "failed to load placeholders");
                        Placeholders::default()
                    }
                }
            })
            .await
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sheet_and_fallbacks() {
        let p = parse_placeholder_sheet(
            r#"{"data":[{"Key":"carouselSlideAnnouncement","Text":"スライド {0} / {1}"},{"Key":"","Text":"x"},{"Key":"carouselRole","Text":" "}]}"#,
        )
        .unwrap();
        assert_eq!(p.len(), 2);
        assert_eq!(
            p.format(keys::SLIDE_ANNOUNCEMENT, "Slide {0} of {1}", &[&2, &5]),
            "スライド 2 / 5"
        );
        assert_eq!(p.get_or(keys::ROLE, "carousel"), "carousel");
        assert_eq!(p.get_or(keys::ARIA_LABEL, "Carousel"), "Carousel");
    }

    #[test]
    fn test_format_template_replaces_each_slot_once() {
        assert_eq!(format_template("Go to {0}", &[&"Products"]), "Go to Products");
        assert_eq!(format_template("{0}-{0}", &[&1]), "1-{0}");
    }

    #[test]
    fn test_sheet_without_data_is_empty() {
        assert!(parse_placeholder_sheet("{}").unwrap().is_empty());
        assert!(parse_placeholder_sheet("[").is_err());
    }
}
