//! Icon spans and `:icon-name:` tokens.

use std::sync::OnceLock;

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
use regex::Regex;
#[cfg(all(target_family = "wasm", target_os = "unknown"))]
use regex_lite::Regex;

use crate::dom::{Dom, NodeId};

fn icon_token() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r":([a-z][a-z0-9-]*):").expect("static regex is valid"))
}

/// Name carried by a `span.icon.icon-{name}`.
pub fn icon_name(dom: &Dom, span: NodeId) -> Option<String> {
    dom.classes(span)
        .find_map(|c| c.strip_prefix("icon-"))
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
}

/// Give every `span.icon` under `root` its `<img>`.
///
/// Spans that already hold an image are left alone, so repeated calls are
/// harmless.
pub fn decorate_icons(dom: &mut Dom, root: NodeId, base_path: &str) {
    let spans = dom.find_all(root, |d, n| d.is_tag(n, "span") && d.has_class(n, "icon"));
    for span in spans {
        if dom.find_tag(span, &["img"]).is_some() {
            continue;
        }
        let Some(name) = icon_name(dom, span) else {
            continue;
        };
        let img = dom.create_element("img");
        dom.set_attr(img, "data-icon-name", &name);
        dom.set_attr(img, "src", &format!("{base_path}/icons/{name}.svg"));
        dom.set_attr(img, "alt", "");
        dom.set_attr(img, "loading", "lazy");
        dom.set_attr(img, "width", "16");
        dom.set_attr(img, "height", "16");
        dom.append_child(span, img);
    }
}

/// Replace `:name:` tokens in `html` with icon spans.
pub fn expand_icon_tokens(html: &str) -> String {
    icon_token()
        .replace_all(html, r#"<span class="icon icon-$1"></span>"#)
        .into_owned()
}

/// Turn icon spans back into `:name:` tokens, used for plain-text fields.
pub fn collapse_icon_spans(dom: &mut Dom, root: NodeId) {
    let spans = dom.find_all(root, |d, n| d.is_tag(n, "span") && d.has_class(n, "icon"));
    for span in spans {
        let Some(name) = icon_name(dom, span) else {
            continue;
        };
        dom.set_text(span, &format!(":{name}:"));
    }
}

/// Rich-text cell content after icon and link processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedContent {
    /// Inner HTML with icon tokens expanded.
    pub content: String,
    /// Target of the first link, if any.
    pub href: Option<String>,
    pub has_icon: bool,
}

/// Expand icon tokens in a rich-text cell and pull out its first link.
pub fn process_content_with_icons_and_link(html: &str) -> ProcessedContent {
    let expanded = expand_icon_tokens(html.trim());
    let (dom, root) = Dom::from_fragment("div", &expanded);
    let href = dom
        .find_tag(root, &["a"])
        .and_then(|a| dom.attr(a, "href"))
        .map(str::to_owned)
        .filter(|h| !h.is_empty());
    let has_icon = dom.find_class(root, "icon").is_some();
    ProcessedContent {
        content: dom.inner_html(root).trim().to_owned(),
        href,
        has_icon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_icons_is_idempotent() {
        let (mut dom, root) =
            Dom::from_fragment("div", r#"<button><span class="icon icon-arrow-forward"></span></button>"#);
        decorate_icons(&mut dom, root, "");
        decorate_icons(&mut dom, root, "");
        assert_eq!(
            dom.inner_html(root),
            r#"<button><span class="icon icon-arrow-forward"><img data-icon-name="arrow-forward" src="/icons/arrow-forward.svg" alt="" loading="lazy" width="16" height="16"></span></button>"#
        );
    }

    #[test]
    fn test_process_content_with_icons_and_link() {
        let processed =
            process_content_with_icons_and_link(r#" Read more :arrow: <a href="/next">here</a> "#);
        assert_eq!(processed.href.as_deref(), Some("/next"));
        assert!(processed.has_icon);
        assert_eq!(
            processed.content,
            r#"Read more <span class="icon icon-arrow"></span> <a href="/next">here</a>"#
        );
    }

    #[test]
    fn test_collapse_icon_spans() {
        let (mut dom, root) =
            Dom::from_fragment("div", r#"Logo <span class="icon icon-brand"></span>"#);
        collapse_icon_spans(&mut dom, root);
        assert_eq!(dom.text_content(root), "Logo :brand:");
    }
}
