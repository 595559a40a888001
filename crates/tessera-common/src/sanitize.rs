//! Text and URL hygiene for authored content.

use std::sync::OnceLock;

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use regex::Regex;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
use regex_lite::Regex;

use crate::dom::Dom;

fn dangerous_scheme() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(javascript|data|vbscript):").expect("static regex is valid")
    })
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Trim `url` and reject `javascript:`, `data:` and `vbscript:` schemes.
///
/// Returns an empty string for rejected or blank input.
pub fn sanitize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() || dangerous_scheme().is_match(trimmed) {
        return String::new();
    }
    trimmed.to_owned()
}

/// Whether `url` survives [`sanitize_url`].
pub fn is_safe_url(url: &str) -> bool {
    !sanitize_url(url).is_empty()
}

/// Make `text` safe for insertion as HTML.
///
/// Plain mode escapes everything. Rich mode keeps markup but drops scripts,
/// styles, inline event handlers and unsafe link targets.
pub fn sanitize_text(text: &str, rich: bool) -> String {
    if text.is_empty() {
        return String::new();
    }
    if !rich {
        return html_escape::encode_text(text).into_owned();
    }

    let (mut dom, root) = Dom::from_fragment("div", text);
    for node in dom.find_all_tags(root, &["script", "style", "object", "embed"]) {
        dom.detach(node);
    }
    for node in dom.descendants(root) {
        let handlers: Vec<String> = dom
            .attrs(node)
            .iter()
            .filter(|(k, _)| k.starts_with("on"))
            .map(|(k, _)| k.clone())
            .collect();
        for name in handlers {
            dom.remove_attr(node, &name);
        }
        for name in ["href", "src", "action", "formaction"] {
            if let Some(value) = dom.attr(node, name) {
                if !is_safe_url(value) {
                    dom.remove_attr(node, name);
                }
            }
        }
    }
    dom.inner_html(root)
}

/// Decode HTML entities the way a `<textarea>` would.
pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Decode CMS-encoded text.
pub fn decode_cms_text(text: &str) -> String {
    decode_html_entities(text)
}

/// Collapse whitespace runs into single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    whitespace_run().replace_all(text.trim(), " ").into_owned()
}

/// Decode the entities CMS rich-text fields commonly escape embed code with,
/// then collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let decoded = text
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&#x2F;", "/")
        .replace("&#x27;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

/// Trim and collapse whitespace in alt text.
pub fn normalize_alt_text(alt: &str) -> String {
    collapse_whitespace(alt)
}

/// Remove tags from an HTML snippet, keeping the text.
pub fn strip_tags(html: &str) -> String {
    let (dom, root) = Dom::from_fragment("div", html);
    dom.text_content(root).trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_url_rejects_dangerous_schemes() {
        assert_eq!(sanitize_url("javascript:alert(1)"), "");
        assert_eq!(sanitize_url("  JavaScript:alert(1)"), "");
        assert_eq!(sanitize_url("data:text/html;base64,xx"), "");
        assert_eq!(sanitize_url("VBScript:msgbox"), "");
        assert_eq!(sanitize_url("   "), "");
    }

    #[test]
    fn test_sanitize_url_trims_safe_urls() {
        assert_eq!(sanitize_url("  https://example.com/a?b=c "), "https://example.com/a?b=c");
        assert_eq!(sanitize_url("/relative/path"), "/relative/path");
        assert!(is_safe_url("mailto:someone@example.com"));
    }

    #[test]
    fn test_sanitize_text_plain_escapes() {
        assert_eq!(sanitize_text("<b>hi</b>", false), "&lt;b&gt;hi&lt;/b&gt;");
    }

    #[test]
    fn test_sanitize_text_rich_strips_scripts_and_handlers() {
        let out = sanitize_text(
            r#"<strong onclick="x()">Bold</strong><script>bad()</script><a href="javascript:bad()">l</a>"#,
            true,
        );
        assert_eq!(out, "<strong>Bold</strong><a>l</a>");
    }

    #[test]
    fn test_sanitize_text_rich_keeps_icons() {
        let out = sanitize_text(r#"Shop <span class="icon icon-arrow"></span>"#, true);
        assert_eq!(out, r#"Shop <span class="icon icon-arrow"></span>"#);
    }

    #[test]
    fn test_normalize_text_decodes_embed_code() {
        assert_eq!(
            normalize_text("&lt;video-js  data-account=&quot;1&quot;&gt;\n&lt;/video-js&gt;"),
            r#"<video-js data-account="1"> </video-js>"#
        );
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_cms_text("Tom &amp; Jerry&#39;s"), "Tom & Jerry's");
        assert_eq!(normalize_alt_text("  a \n  b "), "a b");
        assert_eq!(strip_tags("<em>Hello</em> there"), "Hello there");
    }
}
