//! Content sniffing for authored cells: media URLs and pasted embed code.

use std::sync::OnceLock;

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use regex::Regex;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
use regex_lite::Regex;

fn media_extension() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg|mp4|webm|mov|pdf)(\?|$)")
            .expect("static regex is valid")
    })
}

fn embed_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)<\s*(video|video-js|iframe|script)[\s>]").expect("static regex is valid")
    })
}

/// Whether `url` points straight at a media asset rather than a page.
pub fn is_media_url(url: &str) -> bool {
    media_extension().is_match(url)
}

/// Whether `text` looks like pasted video/iframe embed markup.
pub fn looks_like_embed_markup(text: &str) -> bool {
    embed_tag().is_match(text) || text.contains("&lt;video-js")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_urls() {
        assert!(is_media_url("https://cdn.example.com/a.JPG"));
        assert!(is_media_url("/media/clip.mp4?width=200"));
        assert!(!is_media_url("https://example.com/article"));
        assert!(!is_media_url("https://example.com/pdf-guide"));
    }

    #[test]
    fn test_embed_markup() {
        assert!(looks_like_embed_markup(r#"<video-js data-account="1">"#));
        assert!(looks_like_embed_markup("< iframe src=x>"));
        assert!(looks_like_embed_markup("&lt;video-js data-player=x&gt;"));
        assert!(!looks_like_embed_markup("a video about things"));
    }
}
