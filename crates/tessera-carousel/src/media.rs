//! Finding, configuring and lazily loading slide media.

use serde_json::{Map, Value};
use tessera_common::dom::{Dom, NodeId};
use tessera_common::ids::IdGenerator;
use tessera_common::sanitize::{decode_cms_text, decode_html_entities, normalize_text, sanitize_url};
use tessera_common::sniff::looks_like_embed_markup;

use crate::metadata::ItemMeta;
use crate::player::BootstrapRequest;
use crate::slide::{MediaRef, MediaTag, Slide};

/// Elements whose text may hold pasted embed code.
const CODE_CANDIDATES: &[&str] = &["div", "p", "pre", "code", "a"];

/// Media found for a slide, before configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMedia {
    pub node: NodeId,
    pub tag: MediaTag,
    /// Background wrapper already created for embed-derived media.
    pub wrapper: Option<NodeId>,
}

fn remove_player_scripts(dom: &mut Dom, root: NodeId) {
    for script in dom.find_all_tags(root, &["script"]) {
        if dom.attr(script, "src").is_some_and(|src| src.contains("brightcove")) {
            dom.detach(script);
        }
    }
}

fn background_wrapper(dom: &mut Dom, item: NodeId, media: NodeId) -> NodeId {
    let wrapper = dom.create_element("div");
    dom.set_attr(wrapper, "class", "carousel-media carousel-media-bg");
    dom.append_child(item, wrapper);
    dom.append_child(wrapper, media);
    wrapper
}

/// Parse embed markup and pull out the first player, video or iframe.
fn media_from_markup(dom: &mut Dom, html: &str) -> Option<(NodeId, MediaTag)> {
    let holder = dom.create_element("div");
    for node in dom.parse_fragment(html) {
        dom.append_child(holder, node);
    }
    let node = dom.find_tag(holder, &MediaTag::EMBEDDABLE)?;
    let tag = MediaTag::from_tag(dom.tag(node)?)?;
    dom.detach(node);
    Some((node, tag))
}

/// Locate the slide's media in the working copy `temp`.
///
/// Authored elements win, then embed code pasted as text, then the
/// `mediaVideo` metadata field, then a `mediaImage` URL rebuilt as a lazy
/// picture carrying the item's alt text.
pub fn resolve_media(dom: &mut Dom, temp: NodeId, item: NodeId, meta: &ItemMeta) -> Option<ResolvedMedia> {
    for tag in MediaTag::PRIORITY {
        if let Some(node) = dom.find_tag(temp, &[tag.tag_name()]) {
            dom.detach(node);
            remove_player_scripts(dom, temp);
            return Some(ResolvedMedia {
                node,
                tag,
                wrapper: None,
            });
        }
    }

    let code = dom
        .find_all_tags(temp, CODE_CANDIDATES)
        .into_iter()
        .find(|el| looks_like_embed_markup(&dom.text_content(*el)));
    if let Some(code) = code {
        let html = decode_html_entities(&dom.inner_html(code));
        dom.detach(code);
        remove_player_scripts(dom, temp);
        if let Some((node, tag)) = media_from_markup(dom, &html) {
            tracing::debug!(tag = tag.tag_name(), "media extracted from embed code");
            let wrapper = background_wrapper(dom, item, node);
            return Some(ResolvedMedia {
                node,
                tag,
                wrapper: Some(wrapper),
            });
        }
    }

    if let Some(markup) = meta.media_video.as_deref()
        && let Some((node, tag)) = media_from_markup(dom, &normalize_text(markup))
    {
        let wrapper = background_wrapper(dom, item, node);
        return Some(ResolvedMedia {
            node,
            tag,
            wrapper: Some(wrapper),
        });
    }

    let image = meta.media_image.as_deref().map(sanitize_url).unwrap_or_default();
    if !image.is_empty() {
        let picture = dom.create_element("picture");
        let img = dom.create_element("img");
        dom.set_attr(img, "src", &image);
        dom.set_attr(img, "alt", meta.alt_text.as_deref().unwrap_or_default());
        dom.set_attr(img, "loading", "lazy");
        dom.append_child(picture, img);
        return Some(ResolvedMedia {
            node: picture,
            tag: MediaTag::Picture,
            wrapper: None,
        });
    }
    None
}

/// Merge the background-video flags into a `data-setup` value. `None` when
/// the existing value already matches.
pub fn merge_data_setup(existing: Option<&str>, autoplay: bool) -> Option<String> {
    let mut setup: Map<String, Value> = existing
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .and_then(|v| match v {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();
    let desired = [
        ("autoplay", autoplay),
        ("muted", true),
        ("playsinline", true),
        ("loop", true),
        ("controls", false),
    ];
    if desired
        .iter()
        .all(|(key, value)| setup.get(*key) == Some(&Value::Bool(*value)))
    {
        return None;
    }
    for (key, value) in desired {
        setup.insert(key.to_owned(), Value::Bool(value));
    }
    Some(Value::Object(setup).to_string())
}

fn label_wrapper(dom: &mut Dom, wrapper: NodeId, alt_text: &str) {
    dom.set_attr(wrapper, "aria-label", alt_text);
    dom.set_attr(wrapper, "role", "img");
    dom.set_attr(wrapper, "tabindex", "0");
}

fn set_background_flags(dom: &mut Dom, media: NodeId, autoplay: bool) {
    if autoplay {
        dom.set_attr(media, "autoplay", "autoplay");
    } else {
        dom.remove_attr(media, "autoplay");
    }
    dom.set_attr(media, "muted", "muted");
    dom.set_attr(media, "playsinline", "playsinline");
    dom.set_attr(media, "loop", "loop");
    dom.remove_attr(media, "controls");
}

/// Label the media, give it a wrapper under `item` and set up video
/// playback. `alt_text` is already decoded.
pub fn configure_media(
    dom: &mut Dom,
    item: NodeId,
    resolved: ResolvedMedia,
    alt_text: &str,
    authoring: bool,
    ids: &IdGenerator,
) -> MediaRef {
    let ResolvedMedia { node, tag, wrapper } = resolved;

    if !alt_text.is_empty() {
        match tag {
            MediaTag::Img | MediaTag::Picture => {
                let img = if tag == MediaTag::Img {
                    Some(node)
                } else {
                    dom.find_tag(node, &["img"])
                };
                if let Some(img) = img {
                    dom.set_attr(img, "alt", alt_text);
                    dom.set_attr(img, "aria-label", alt_text);
                }
            }
            MediaTag::Video | MediaTag::VideoJs | MediaTag::Iframe => {
                dom.set_attr(node, "aria-label", alt_text);
                dom.set_attr(node, "title", alt_text);
            }
        }
    }

    let wrapper = wrapper.unwrap_or_else(|| {
        let wrapper = dom.create_element("div");
        dom.add_class(wrapper, "carousel-media");
        dom.append_child(item, wrapper);
        dom.append_child(wrapper, node);
        wrapper
    });

    match tag {
        MediaTag::Video => {
            dom.add_class(wrapper, "carousel-media-bg");
            set_background_flags(dom, node, !authoring);
            if !alt_text.is_empty() {
                label_wrapper(dom, wrapper, alt_text);
            }
        }
        MediaTag::VideoJs => {
            dom.add_class(wrapper, "carousel-media-bg");
            if let Some(setup) = merge_data_setup(dom.attr(node, "data-setup"), !authoring) {
                dom.set_attr(node, "data-setup", &setup);
            }
            set_background_flags(dom, node, !authoring);
            if !dom.has_attr(node, "id") {
                dom.set_attr(node, "id", &ids.next_id("carousel-video"));
            }
            if !alt_text.is_empty() {
                dom.set_attr(wrapper, "data-alt-text", alt_text);
                label_wrapper(dom, wrapper, alt_text);
            }
        }
        _ => {}
    }

    MediaRef { node, tag, wrapper }
}

/// Load the slide's media if it has not been loaded yet.
///
/// Returns a bootstrap request for `video-js` players; the caller owns the
/// asynchronous part. Repeated calls are no-ops.
pub fn load_slide_media(dom: &mut Dom, slide: &mut Slide, carousel_id: &str) -> Option<BootstrapRequest> {
    if slide.media_loaded {
        return None;
    }
    slide.media_loaded = true;
    slide.lazy_pending = false;

    let media = slide.media?;
    if media.tag != MediaTag::VideoJs {
        return None;
    }
    let video_id = dom.attr(media.node, "id")?.to_owned();
    slide.video_id = Some(video_id.clone());

    if !slide.alt_text.is_empty() {
        dom.set_attr(media.node, "data-alt-text", &slide.alt_text);
        dom.set_attr(media.wrapper, "data-alt-text", &slide.alt_text);
        label_wrapper(dom, media.wrapper, &slide.alt_text);
    }

    let attr = |name: &str| dom.attr(media.node, name).map(str::to_owned).filter(|s| !s.is_empty());
    let label = if slide.alt_text.is_empty() {
        None
    } else {
        Some(decode_cms_text(&slide.alt_text))
    };
    tracing::debug!(video_id, slide = slide.slide_index, "video slide loaded");
    Some(BootstrapRequest {
        carousel_id: carousel_id.to_owned(),
        slide_index: slide.slide_index,
        video_id,
        account: attr("data-account"),
        player: attr("data-player"),
        embed: attr("data-embed").unwrap_or_else(|| "default".to_owned()),
        label,
    })
}

/// Accessible description of the slide's media, if any.
pub fn media_label(dom: &Dom, slide: &Slide) -> Option<String> {
    let found = |value: Option<&str>| {
        value
            .map(|v| decode_html_entities(v).trim().to_owned())
            .filter(|v| !v.is_empty())
    };
    if let Some(label) = found(Some(&slide.alt_text)) {
        return Some(label);
    }
    let media = slide.media?;
    if media.tag.is_video() {
        found(dom.attr(media.node, "aria-label"))
            .or_else(|| found(dom.attr(media.wrapper, "aria-label")))
            .or_else(|| found(dom.attr(media.wrapper, "data-alt-text")))
    } else {
        let img = if media.tag == MediaTag::Img {
            Some(media.node)
        } else {
            dom.find_tag(media.node, &["img"])
        };
        img.and_then(|img| found(dom.attr(img, "alt")).or_else(|| found(dom.attr(img, "aria-label"))))
            .or_else(|| found(dom.attr(media.wrapper, "aria-label")))
    }
}
