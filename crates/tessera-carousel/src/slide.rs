//! The slide model.
//!
//! A [`Slide`] is the source of truth for one carousel item. The nodes it
//! references live in the carousel's [`Dom`](tessera_common::Dom) arena and
//! are only a projection of the fields here.

use tessera_common::dom::NodeId;
use tessera_common::sanitize::strip_tags;

use crate::video_controls::VideoControlState;

/// Media elements a slide can carry, in selection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaTag {
    VideoJs,
    Video,
    Iframe,
    Picture,
    Img,
}

impl MediaTag {
    pub const PRIORITY: [MediaTag; 5] = [
        MediaTag::VideoJs,
        MediaTag::Video,
        MediaTag::Iframe,
        MediaTag::Picture,
        MediaTag::Img,
    ];

    /// Tags that embed code may resolve to.
    pub const EMBEDDABLE: [&'static str; 3] = ["video-js", "video", "iframe"];

    pub fn tag_name(self) -> &'static str {
        match self {
            MediaTag::VideoJs => "video-js",
            MediaTag::Video => "video",
            MediaTag::Iframe => "iframe",
            MediaTag::Picture => "picture",
            MediaTag::Img => "img",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::PRIORITY
            .into_iter()
            .find(|t| t.tag_name().eq_ignore_ascii_case(tag))
    }

    /// Video-like media labelled through `aria-label` and `title`.
    pub fn is_video(self) -> bool {
        matches!(self, MediaTag::VideoJs | MediaTag::Video | MediaTag::Iframe)
    }

    pub fn kind(self) -> MediaKind {
        match self {
            MediaTag::VideoJs | MediaTag::Video => MediaKind::Video,
            MediaTag::Iframe => MediaKind::Embed,
            MediaTag::Picture | MediaTag::Img => MediaKind::Image,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MediaKind {
    #[default]
    None,
    Image,
    Video,
    Embed,
}

/// Resolved media element of a slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaRef {
    pub node: NodeId,
    pub tag: MediaTag,
    /// `div.carousel-media` holding the element.
    pub wrapper: NodeId,
}

/// Authored text kept both as sanitisable markup and as plain text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    pub plain: String,
    /// Markup with icon tokens expanded. Sanitised when rendered.
    pub html: String,
}

impl RichText {
    pub fn from_html(html: &str) -> Self {
        let html = html.trim().to_owned();
        Self {
            plain: strip_tags(&html),
            html,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.html.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cta {
    pub text: RichText,
    pub link: String,
}

/// The custom play/pause button of a video slide.
#[derive(Debug, Clone)]
pub struct VideoControl {
    pub button: NodeId,
    pub icon: NodeId,
    pub state: VideoControlState,
    /// Wired to a player. Unwired buttons are removed when the player never
    /// shows up.
    pub wired: bool,
}

#[derive(Debug, Clone)]
pub struct Slide {
    /// `div.carousel-item`.
    pub element: NodeId,
    /// The authored row the slide was built from.
    pub source_row: NodeId,
    pub media_kind: MediaKind,
    pub media: Option<MediaRef>,
    pub alt_text: String,
    pub title: RichText,
    pub description: RichText,
    pub link: Option<String>,
    pub cta: Option<Cta>,
    pub overlay: NodeId,
    pub cta_node: Option<NodeId>,
    pub link_node: Option<NodeId>,
    pub slide_index: usize,
    pub total_slides: usize,
    /// Flips to `true` once, when the media is attached and configured.
    pub media_loaded: bool,
    /// A `video-js` player is waiting for its bootstrap.
    pub lazy_pending: bool,
    /// Accessible description of the media, appended to slide labels.
    pub media_label: Option<String>,
    /// Element id of a `video-js` player.
    pub video_id: Option<String>,
    pub control: Option<VideoControl>,
}

impl Slide {
    pub fn is_video(&self) -> bool {
        self.media.is_some_and(|m| m.tag == MediaTag::VideoJs)
    }

    pub fn wrapper(&self) -> Option<NodeId> {
        self.media.map(|m| m.wrapper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_tag_priority_and_kinds() {
        assert_eq!(MediaTag::from_tag("VIDEO-JS"), Some(MediaTag::VideoJs));
        assert_eq!(MediaTag::from_tag("span"), None);
        assert!(MediaTag::Iframe.is_video());
        assert!(!MediaTag::Picture.is_video());
        assert_eq!(MediaTag::Iframe.kind(), MediaKind::Embed);
        assert_eq!(MediaTag::Img.kind(), MediaKind::Image);
    }

    #[test]
    fn test_rich_text_plain_strips_markup() {
        let text = RichText::from_html(" <strong>Big</strong> &amp; bold ");
        assert_eq!(text.plain, "Big & bold");
        assert_eq!(text.html, "<strong>Big</strong> &amp; bold");
        assert!(RichText::default().is_empty());
    }
}
