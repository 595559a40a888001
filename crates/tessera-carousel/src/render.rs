//! Markup the carousel builds around its slides.

use tessera_common::dom::{Dom, NodeId};
use tessera_common::icons::decorate_icons;
use tessera_common::placeholders::{Placeholders, keys};
use tessera_common::sanitize::{sanitize_text, sanitize_url, strip_tags};

use crate::metadata::ItemMeta;
use crate::slide::{Cta, RichText};

/// `div.carousel-container > div.carousel-viewport > div.carousel-track`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselUi {
    pub container: NodeId,
    pub viewport: NodeId,
    pub track: NodeId,
}

fn element(dom: &mut Dom, tag: &str, class: &str) -> NodeId {
    let node = dom.create_element(tag);
    dom.set_attr(node, "class", class);
    node
}

pub fn create_ui(dom: &mut Dom) -> CarouselUi {
    let container = element(dom, "div", "carousel-container");
    let viewport = element(dom, "div", "carousel-viewport");
    let track = element(dom, "div", "carousel-track");
    dom.append_child(container, viewport);
    dom.append_child(viewport, track);
    CarouselUi {
        container,
        viewport,
        track,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrows {
    pub prev: NodeId,
    pub next: NodeId,
}

/// Previous/next buttons appended to `parent`.
pub fn create_arrows(dom: &mut Dom, parent: NodeId, placeholders: &Placeholders, icon_base: &str) -> Arrows {
    let mut arrow = |class: &str, icon: &str, key: &str, fallback: &str| {
        let button = element(dom, "button", class);
        dom.set_attr(button, "aria-label", placeholders.get_or(key, fallback));
        dom.set_inner_html(button, &format!(r#"<span class="icon icon-{icon}"></span>"#));
        dom.append_child(parent, button);
        decorate_icons(dom, button, icon_base);
        button
    };
    let prev = arrow(
        "carousel-nav carousel-prev",
        "arrow-backward",
        keys::PREVIOUS_SLIDE_ARIA_LABEL,
        "Previous slide",
    );
    let next = arrow(
        "carousel-nav carousel-next",
        "arrow-forward",
        keys::NEXT_SLIDE_ARIA_LABEL,
        "Next slide",
    );
    Arrows { prev, next }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dots {
    pub node: NodeId,
    pub buttons: Vec<NodeId>,
}

/// Pagination dots, detached. The caller places them.
pub fn create_dots(dom: &mut Dom, count: usize, placeholders: &Placeholders) -> Dots {
    let node = element(dom, "div", "carousel-dots");
    let buttons = (0..count)
        .map(|i| {
            let button = element(dom, "button", "carousel-dot");
            let label = placeholders.format(keys::GO_TO_SLIDE_ARIA_LABEL, "Go to slide {0}", &[&(i + 1)]);
            dom.set_attr(button, "aria-label", &label);
            dom.set_attr(button, "data-index", &i.to_string());
            dom.append_child(node, button);
            button
        })
        .collect();
    Dots { node, buttons }
}

/// Polite, atomic live region appended to `container`.
pub fn create_live_region(dom: &mut Dom, container: NodeId) -> NodeId {
    let region = element(dom, "div", "carousel-live-region");
    dom.set_attr(region, "aria-live", "polite");
    dom.set_attr(region, "aria-atomic", "true");
    dom.append_child(container, region);
    region
}

/// `Slide {0} of {1}`, plus the media label when there is one.
pub fn slide_label(placeholders: &Placeholders, index: usize, total: usize, media_label: Option<&str>) -> String {
    let base = placeholders.format(keys::SLIDE_ARIA_LABEL, "Slide {0} of {1}", &[&(index + 1), &total]);
    match media_label {
        Some(label) if !label.is_empty() => format!("{base}, {label}"),
        _ => base,
    }
}

/// Live-region text for `index`.
pub fn announcement(placeholders: &Placeholders, index: usize, total: usize, media_label: Option<&str>) -> String {
    let base = placeholders.format(keys::SLIDE_ANNOUNCEMENT, "Slide {0} of {1}", &[&(index + 1), &total]);
    match media_label {
        Some(label) if !label.is_empty() => format!("{base}, {label}"),
        _ => base,
    }
}

/// Set or clear one inline style declaration, keeping the others.
pub fn set_style(dom: &mut Dom, node: NodeId, property: &str, value: Option<&str>) {
    let mut declarations: Vec<String> = dom
        .attr(node, "style")
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            d.split_once(':')
                .is_none_or(|(name, _)| !name.trim().eq_ignore_ascii_case(property))
        })
        .map(str::to_owned)
        .collect();
    if let Some(value) = value {
        declarations.push(format!("{property}: {value}"));
    }
    if declarations.is_empty() {
        dom.remove_attr(node, "style");
    } else {
        let style = declarations.join("; ");
        dom.set_attr(node, "style", &style);
    }
}

/// Region semantics on the container. Carousels that rotate also describe
/// themselves with `aria-roledescription`.
pub fn apply_region(dom: &mut Dom, container: NodeId, placeholders: &Placeholders, label_fallback: &str, rotating: bool) {
    dom.set_attr(container, "role", "region");
    dom.set_attr(container, "aria-label", placeholders.get_or(keys::ARIA_LABEL, label_fallback));
    if rotating {
        dom.set_attr(
            container,
            "aria-roledescription",
            placeholders.get_or(keys::ROLE, "carousel"),
        );
    }
}

/// Overlay content of a slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub node: NodeId,
    pub title: RichText,
    pub description: RichText,
    pub cta: Option<Cta>,
    pub cta_node: Option<NodeId>,
}

/// `div.carousel-overlay` with title, description and CTA, detached.
pub fn build_overlay(dom: &mut Dom, meta: &ItemMeta) -> Overlay {
    let node = element(dom, "div", "carousel-overlay");

    let title = RichText::from_html(meta.title.as_deref().unwrap_or_default());
    if !title.is_empty() {
        let h3 = element(dom, "h3", "carousel-title");
        dom.set_inner_html(h3, &sanitize_text(&title.html, true));
        dom.append_child(node, h3);
    }

    let description = RichText::from_html(meta.description.as_deref().unwrap_or_default());
    if !description.is_empty() {
        let p = element(dom, "p", "carousel-description");
        dom.set_inner_html(p, &sanitize_text(&description.html, true));
        dom.append_child(node, p);
    }

    let cta_text = RichText::from_html(meta.cta_text.as_deref().unwrap_or_default());
    let cta_link = meta.cta_link.as_deref().map(sanitize_url).unwrap_or_default();
    let (cta, cta_node) = if !cta_text.is_empty() && !cta_link.is_empty() {
        let a = element(dom, "a", "button carousel-cta");
        dom.set_inner_html(a, &sanitize_text(&cta_text.html, true));
        dom.set_attr(a, "href", &cta_link);
        dom.set_attr(a, "role", "button");
        dom.set_attr(a, "tabindex", "0");
        dom.append_child(node, a);
        (
            Some(Cta {
                text: cta_text,
                link: cta_link,
            }),
            Some(a),
        )
    } else {
        (None, None)
    };

    Overlay {
        node,
        title,
        description,
        cta,
        cta_node,
    }
}

/// Full-slide link appended to `item`. `None` for missing or unsafe links.
pub fn create_slide_link(
    dom: &mut Dom,
    item: NodeId,
    link: &str,
    title: Option<&str>,
    placeholders: &Placeholders,
    tab_focusable: bool,
) -> Option<NodeId> {
    let href = sanitize_url(link);
    if href.is_empty() {
        return None;
    }
    let target = title
        .map(strip_tags)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| placeholders.get_or(keys::LINKED_PAGE_ARIA_LABEL, "linked page").to_owned());
    let label = placeholders.format(keys::GO_TO_ARIA_LABEL, "Go to {0}", &[&target]);

    let a = element(dom, "a", "carousel-slide-link");
    dom.set_attr(a, "href", &href);
    dom.set_attr(a, "aria-label", &label);
    dom.set_attr(a, "tabindex", if tab_focusable { "0" } else { "-1" });
    dom.append_child(item, a);
    Some(a)
}
