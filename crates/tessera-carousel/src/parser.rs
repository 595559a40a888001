//! Authored block rows into [`Slide`]s.
//!
//! The block's direct children are rows. An optional first row configures the
//! layout; every other row with content becomes one slide. Slides are built
//! in row order after the linked pages' metadata has been fetched in
//! parallel.

use n0_future::join_all;
use tessera_common::block::{BlockConfig, read_block_config};
use tessera_common::config::CarouselSettings;
use tessera_common::dom::{Dom, NodeId};
use tessera_common::ids::IdGenerator;
use tessera_common::metadata::{PageMetadata, PageMetadataSource};
use tessera_common::perf::TimingGuard;
use tessera_common::placeholders::{Placeholders, keys};
use tessera_common::sanitize::{decode_cms_text, sanitize_url};
use tessera_common::sniff::{is_media_url, looks_like_embed_markup};

use crate::layout::{CONFIG_KEYS, LayoutVariant, select_layout};
use crate::media::{configure_media, load_slide_media, media_label, resolve_media};
use crate::metadata::{
    copy_cells, extract_link_from_row, merge_page_metadata, parse_item_metadata,
};
use crate::player::BootstrapRequest;
use crate::render::{build_overlay, create_slide_link, set_style, slide_label};
use crate::slide::Slide;

/// Marks an authored row hidden because its layout cannot show it.
pub const FILTERED_ATTR: &str = "data-carousel-filtered";

const CONTENT_MEDIA: &[&str] = &["picture", "img", "video", "video-js", "iframe"];
const VIDEO_MEDIA: &[&str] = &["video", "video-js", "iframe"];

/// Block configuration, selected layout and the rows that become slides.
#[derive(Debug, Clone)]
pub struct CarouselConfig {
    pub config: BlockConfig,
    pub layout: LayoutVariant,
    pub rows: Vec<NodeId>,
}

fn is_config_row(dom: &Dom, row: NodeId) -> bool {
    let cells = dom.element_children(row);
    if cells.len() > 2 {
        return false;
    }
    let text = dom.text_content(row).trim().to_lowercase();
    CONFIG_KEYS.iter().any(|key| text.contains(key))
        || (cells.len() == 1 && LayoutVariant::from_name(&text).is_some())
}

/// A row holds text, media or a link in at least one cell.
pub fn row_has_content(dom: &Dom, row: NodeId) -> bool {
    dom.element_children(row).into_iter().any(|cell| {
        !dom.text_content(cell).trim().is_empty()
            || dom.find_tag(cell, CONTENT_MEDIA).is_some()
            || dom.find_tag(cell, &["a"]).is_some()
    })
}

/// A row carries video as an element, as pasted embed code, or through its
/// metadata.
pub fn row_has_video_content(dom: &mut Dom, row: NodeId, max_key_len: usize) -> bool {
    if dom.find_tag(row, VIDEO_MEDIA).is_some() {
        return true;
    }
    let has_code = dom
        .element_children(row)
        .into_iter()
        .any(|cell| looks_like_embed_markup(dom.text_content(cell).trim()));
    if has_code {
        return true;
    }
    let temp = copy_cells(dom, row);
    parse_item_metadata(dom, temp, max_key_len).declares_video()
}

pub fn parse_carousel_config(dom: &Dom, block: NodeId) -> CarouselConfig {
    let all_rows = dom.element_children(block);
    let config = read_block_config(dom, block);

    let first_cell = all_rows
        .first()
        .filter(|row| dom.element_children(**row).len() == 1)
        .map(|row| dom.text_content(*row).trim().to_lowercase());
    let layout = select_layout(first_cell.as_deref(), &config);

    let rows = all_rows
        .into_iter()
        .enumerate()
        .filter(|(i, row)| !(*i == 0 && is_config_row(dom, *row)))
        .filter(|(_, row)| row_has_content(dom, *row))
        .map(|(_, row)| row)
        .collect();

    CarouselConfig {
        config,
        layout,
        rows,
    }
}

/// Undo the marks left on rows hidden by an earlier decoration.
pub fn clear_filter_marks(dom: &mut Dom, rows: &[NodeId]) {
    for row in rows {
        if dom.has_attr(*row, FILTERED_ATTR) {
            set_style(dom, *row, "display", None);
            dom.remove_attr(*row, FILTERED_ATTR);
        }
    }
}

/// What building a slide needs from the carousel.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub settings: &'a CarouselSettings,
    pub layout: LayoutVariant,
    pub authoring: bool,
    pub placeholders: &'a Placeholders,
    pub ids: &'a IdGenerator,
}

fn strip_authoring_attrs(dom: &mut Dom, root: NodeId) {
    for node in dom.descendants(root) {
        dom.remove_attrs_with_prefix(node, "data-aue-");
    }
}

/// Build one slide from `row`. `None` when the row has nothing to show or
/// its content does not fit the layout.
///
/// In authoring mode the row is copied and left in place; otherwise its
/// cells are moved into the slide.
pub fn build_slide(
    dom: &mut Dom,
    row: NodeId,
    index: usize,
    total: usize,
    fetched: Option<&PageMetadata>,
    ctx: &BuildContext<'_>,
) -> Option<Slide> {
    if dom.element_children(row).is_empty() || !row_has_content(dom, row) {
        return None;
    }

    if ctx.layout.is_image_only()
        && row_has_video_content(dom, row, ctx.settings.meta_key_max_len)
    {
        if ctx.authoring {
            set_style(dom, row, "display", Some("none"));
            dom.set_attr(row, FILTERED_ATTR, "video-content");
        }
        tracing::debug!(layout = %ctx.layout, "video row skipped");
        return None;
    }

    let item = dom.create_element("div");
    dom.set_attr(item, "class", "carousel-item");

    let temp = if ctx.authoring {
        let temp = copy_cells(dom, row);
        strip_authoring_attrs(dom, temp);
        temp
    } else {
        let temp = dom.create_element("div");
        for child in dom.children(row).to_vec() {
            dom.append_child(temp, child);
        }
        temp
    };

    let mut meta = parse_item_metadata(dom, temp, ctx.settings.meta_key_max_len);
    let link = meta.link.clone();
    if let Some(fetched) = fetched {
        merge_page_metadata(&mut meta, fetched);
    }
    let alt_text = meta.alt_text.clone().unwrap_or_default();

    let media = resolve_media(dom, temp, item, &meta)
        .map(|resolved| configure_media(dom, item, resolved, &alt_text, ctx.authoring, ctx.ids));

    let overlay = build_overlay(dom, &meta);
    dom.append_child(item, overlay.node);

    let link_node = link.as_deref().and_then(|href| {
        create_slide_link(
            dom,
            item,
            href,
            meta.title.as_deref(),
            ctx.placeholders,
            ctx.layout.is_image_only(),
        )
    });

    dom.set_attr(item, "role", "group");
    dom.set_attr(
        item,
        "aria-roledescription",
        ctx.placeholders.get_or(keys::SLIDE_ROLE, "slide"),
    );

    let mut slide = Slide {
        element: item,
        source_row: row,
        media_kind: media.map(|m| m.tag.kind()).unwrap_or_default(),
        media,
        alt_text,
        title: overlay.title,
        description: overlay.description,
        link: link.map(|l| sanitize_url(&l)).filter(|l| !l.is_empty()),
        cta: overlay.cta,
        overlay: overlay.node,
        cta_node: overlay.cta_node,
        link_node,
        slide_index: index,
        total_slides: total,
        media_loaded: false,
        lazy_pending: false,
        media_label: None,
        video_id: None,
        control: None,
    };
    slide.media_label = media_label(dom, &slide);
    let label = slide_label(ctx.placeholders, index, total, slide.media_label.as_deref());
    dom.set_attr(item, "aria-label", &label);
    dom.set_attr(item, "data-slide-index", &index.to_string());
    dom.set_attr(item, "data-total-slides", &total.to_string());
    Some(slide)
}

/// Slides appended to the track, plus the player bootstraps of the slides
/// loaded eagerly.
#[derive(Debug, Default)]
pub struct BuiltSlides {
    pub slides: Vec<Slide>,
    pub bootstraps: Vec<BootstrapRequest>,
}

fn decoded(page: PageMetadata) -> PageMetadata {
    PageMetadata {
        title: page.title.map(|t| decode_cms_text(&t)),
        description: page.description.map(|d| decode_cms_text(&d)),
        image: page.image,
    }
}

/// Build every slide for `rows` into `track`.
///
/// The first surviving slide loads its media immediately, as does every
/// slide in authoring mode. The rest wait for navigation.
pub async fn build_slides<M>(
    dom: &mut Dom,
    track: NodeId,
    rows: &[NodeId],
    ctx: &BuildContext<'_>,
    carousel_id: &str,
    metadata: &M,
) -> BuiltSlides
where
    M: PageMetadataSource,
{
    let _timing = TimingGuard::new("carousel slides built");
    let max_key_len = ctx.settings.meta_key_max_len;
    let links: Vec<Option<String>> = rows
        .iter()
        .map(|row| extract_link_from_row(dom, *row, max_key_len))
        .collect();

    let fetched = join_all(links.iter().map(|link| async move {
        match link.as_deref() {
            Some(url) if !is_media_url(url) => Some(decoded(metadata.fetch(url).await)),
            _ => None,
        }
    }))
    .await;

    let mut built = BuiltSlides::default();
    for (row, page) in rows.iter().zip(&fetched) {
        let index = built.slides.len();
        let Some(mut slide) = build_slide(dom, *row, index, rows.len(), page.as_ref(), ctx) else {
            continue;
        };
        if index == 0 || ctx.authoring {
            built
                .bootstraps
                .extend(load_slide_media(dom, &mut slide, carousel_id));
        } else {
            slide.lazy_pending = slide.is_video();
        }
        dom.append_child(track, slide.element);
        built.slides.push(slide);
    }

    let total = built.slides.len();
    for slide in &mut built.slides {
        slide.total_slides = total;
        let label = slide_label(
            ctx.placeholders,
            slide.slide_index,
            total,
            slide.media_label.as_deref(),
        );
        dom.set_attr(slide.element, "aria-label", &label);
        dom.set_attr(slide.element, "data-total-slides", &total.to_string());
    }
    tracing::debug!(rows = rows.len(), slides = total, "carousel slides built");
    built
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Pages(HashMap<&'static str, PageMetadata>);

    impl PageMetadataSource for Pages {
        async fn fetch(&self, url: &str) -> PageMetadata {
            self.0.get(url).cloned().unwrap_or_default()
        }
    }

    fn ctx<'a>(
        settings: &'a CarouselSettings,
        placeholders: &'a Placeholders,
        ids: &'a IdGenerator,
        layout: LayoutVariant,
        authoring: bool,
    ) -> BuildContext<'a> {
        BuildContext {
            settings,
            layout,
            authoring,
            placeholders,
            ids,
        }
    }

    #[test]
    fn test_config_row_and_empty_rows_dropped() {
        let (dom, block) = Dom::from_fragment(
            "div",
            r#"<div><div>kao-home</div></div><div><div><p>One</p></div></div><div><div> </div></div><div><div><img src="b.png"></div></div>"#,
        );
        let parsed = parse_carousel_config(&dom, block);
        assert_eq!(parsed.layout, LayoutVariant::KaoHome);
        assert_eq!(parsed.rows.len(), 2);

        let (dom, block) = Dom::from_fragment(
            "div",
            r#"<div><div>Layout</div><div>image-only-large</div></div><div><div><p>One</p></div></div>"#,
        );
        let parsed = parse_carousel_config(&dom, block);
        assert_eq!(parsed.layout, LayoutVariant::ImageOnlyLarge);
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_video_rows_filtered_for_image_only_in_authoring() {
        let (mut dom, block) = Dom::from_fragment(
            "div",
            r#"<div><div><div>mediaType</div><div>video</div></div></div><div><div><p>Just text</p></div></div>"#,
        );
        let rows = dom.element_children(block);
        let settings = CarouselSettings::default();
        let placeholders = Placeholders::new();
        let ids = IdGenerator::new(1);
        let ctx = ctx(&settings, &placeholders, &ids, LayoutVariant::ImageOnlyMedium, true);

        assert!(build_slide(&mut dom, rows[0], 0, 2, None, &ctx).is_none());
        assert_eq!(dom.attr(rows[0], FILTERED_ATTR), Some("video-content"));
        assert_eq!(dom.attr(rows[0], "style"), Some("display: none"));
        assert!(build_slide(&mut dom, rows[1], 0, 2, None, &ctx).is_some());

        clear_filter_marks(&mut dom, &rows);
        assert!(!dom.has_attr(rows[0], FILTERED_ATTR));
        assert!(!dom.has_attr(rows[0], "style"));
    }

    #[test]
    fn test_authoring_copies_and_strips_editor_attributes() {
        let (mut dom, row) = Dom::from_fragment(
            "div",
            r#"<div data-aue-prop="image"><picture data-aue-type="media"><img src="x.jpg"></picture></div>"#,
        );
        let settings = CarouselSettings::default();
        let placeholders = Placeholders::new();
        let ids = IdGenerator::new(1);
        let ctx = ctx(&settings, &placeholders, &ids, LayoutVariant::FullGrid, true);
        let slide = build_slide(&mut dom, row, 0, 1, None, &ctx).unwrap();

        assert_eq!(dom.element_children(row).len(), 1);
        assert!(dom.outer_html(slide.element).contains("<picture>"));
        assert!(!dom.outer_html(slide.element).contains("data-aue-"));
        assert!(dom.outer_html(row).contains(r#"<picture data-aue-type="media">"#));
    }

    #[test]
    fn test_slide_markup() {
        let (mut dom, row) = Dom::from_fragment(
            "div",
            r#"<div><div>title</div><div>Summer</div></div><div><div>link</div><div><a href="/summer">/summer</a></div></div><div><div>altText</div><div>Beach &amp; sea</div></div><div><div><picture><img src="/s.jpg" alt=""></picture></div></div>"#,
        );
        let settings = CarouselSettings::default();
        let placeholders = Placeholders::new();
        let ids = IdGenerator::new(1);
        let ctx = ctx(&settings, &placeholders, &ids, LayoutVariant::FullGrid, false);
        let slide = build_slide(&mut dom, row, 1, 3, None, &ctx).unwrap();

        assert_eq!(slide.link.as_deref(), Some("/summer"));
        assert_eq!(slide.title.plain, "Summer");
        assert_eq!(slide.media_label.as_deref(), Some("Beach & sea"));
        assert!(dom.children(row).is_empty());
        insta::assert_snapshot!(dom.outer_html(slide.element), @r#"<div class="carousel-item" role="group" aria-roledescription="slide" aria-label="Slide 2 of 3, Beach &amp; sea" data-slide-index="1" data-total-slides="3"><div class="carousel-media"><picture><img src="/s.jpg" alt="Beach &amp; sea" aria-label="Beach &amp; sea"></picture></div><div class="carousel-overlay"><h3 class="carousel-title">Summer</h3></div><a class="carousel-slide-link" href="/summer" aria-label="Go to Summer" tabindex="-1"></a></div>"#);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_build_slides_fetches_metadata_and_renumbers() {
        let (mut dom, block) = Dom::from_fragment(
            "div",
            r#"<div><div><div>link</div><div><a href="/news">/news</a></div></div></div><div><div><div>mediaType</div><div>video</div></div></div><div><div><div>link</div><div><a href="/file.pdf">pdf</a></div></div></div>"#,
        );
        let rows = dom.element_children(block);
        let track = dom.create_element("div");
        let pages = Pages(HashMap::from([
            (
                "/news",
                PageMetadata {
                    title: Some("News &amp; views".into()),
                    description: Some("Content from: elsewhere".into()),
                    image: None,
                },
            ),
            (
                "/file.pdf",
                PageMetadata {
                    title: Some("never fetched".into()),
                    ..Default::default()
                },
            ),
        ]));
        let settings = CarouselSettings::default();
        let placeholders = Placeholders::new();
        let ids = IdGenerator::new(1);
        let ctx = ctx(&settings, &placeholders, &ids, LayoutVariant::ImageOnlyLarge, false);

        let built = build_slides(&mut dom, track, &rows, &ctx, "carousel-1", &pages).await;
        assert_eq!(built.slides.len(), 2);
        assert_eq!(built.slides[0].title.plain, "News & views");
        assert!(built.slides[0].description.is_empty());
        assert!(built.slides[1].title.is_empty());
        assert_eq!(built.slides[1].slide_index, 1);
        assert!(built.slides.iter().all(|s| s.total_slides == 2));
        assert_eq!(
            dom.attr(built.slides[1].element, "aria-label"),
            Some("Slide 2 of 2")
        );
        assert_eq!(dom.element_children(track).len(), 2);
        assert!(built.slides[0].media_loaded);
        assert!(!built.slides[1].media_loaded);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_only_first_video_bootstraps_eagerly() {
        let video = r#"<div><div><video-js data-account="1" data-player="p"></video-js></div></div>"#;
        let (mut dom, block) = Dom::from_fragment("div", &video.repeat(3));
        let rows = dom.element_children(block);
        let track = dom.create_element("div");
        let settings = CarouselSettings::default();
        let placeholders = Placeholders::new();
        let ids = IdGenerator::new(3);
        let publish = ctx(&settings, &placeholders, &ids, LayoutVariant::FullGrid, false);

        let built = build_slides(&mut dom, track, &rows, &publish, "c", &()).await;
        assert_eq!(built.bootstraps.len(), 1);
        assert_eq!(built.bootstraps[0].slide_index, 0);
        assert!(built.slides[1].lazy_pending);
        assert!(built.slides[2].lazy_pending);

        let (mut dom, block) = Dom::from_fragment("div", &video.repeat(3));
        let rows = dom.element_children(block);
        let track = dom.create_element("div");
        let authoring = ctx(&settings, &placeholders, &ids, LayoutVariant::FullGrid, true);
        let built = build_slides(&mut dom, track, &rows, &authoring, "c", &()).await;
        assert_eq!(built.bootstraps.len(), 3);
        assert!(built.slides.iter().all(|s| !s.lazy_pending && s.media_loaded));
    }
}
