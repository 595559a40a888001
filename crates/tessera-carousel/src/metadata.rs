//! Per-slide metadata read from the authored row.
//!
//! Two authoring formats exist. The table format is a run of leading
//! two-cell rows (`key | value`). The positional format is nine single-cell
//! rows in a fixed order. The table format always wins; positional parsing is
//! only attempted when no table row was found.

use tessera_common::block::{read_cell_value, to_class_name};
use tessera_common::dom::{Dom, NodeId};
use tessera_common::icons::{collapse_icon_spans, process_content_with_icons_and_link};
use tessera_common::metadata::PageMetadata;
use tessera_common::sanitize::{decode_cms_text, normalize_alt_text};

/// Rows required before the positional format is considered.
pub const POSITIONAL_ROWS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaField {
    MediaType,
    MediaImage,
    MediaVideo,
    AltText,
    Link,
    Title,
    Description,
    CtaLink,
    CtaText,
}

impl MetaField {
    /// Positional slots, row by row.
    pub const POSITIONAL: [MetaField; POSITIONAL_ROWS] = [
        MetaField::MediaType,
        MetaField::MediaImage,
        MetaField::MediaVideo,
        MetaField::AltText,
        MetaField::Link,
        MetaField::Title,
        MetaField::Description,
        MetaField::CtaLink,
        MetaField::CtaText,
    ];

    /// Map an authored key onto a field. `alt-text`, `altText` and `alttext`
    /// are the same key.
    pub fn from_key(key: &str) -> Option<Self> {
        let key = to_class_name(key).replace('-', "");
        Some(match key.as_str() {
            "mediatype" => MetaField::MediaType,
            "mediaimage" => MetaField::MediaImage,
            "mediavideo" => MetaField::MediaVideo,
            "alttext" => MetaField::AltText,
            "link" => MetaField::Link,
            "title" => MetaField::Title,
            "description" => MetaField::Description,
            "ctalink" | "ctabuttonlink" => MetaField::CtaLink,
            "ctatext" | "ctabuttontext" => MetaField::CtaText,
            _ => return None,
        })
    }

    /// Fields read as rich text with icon tokens.
    fn is_rich(self) -> bool {
        matches!(
            self,
            MetaField::Title | MetaField::Description | MetaField::CtaText
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MetaStrategy {
    #[default]
    None,
    Table,
    Positional,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemMeta {
    pub media_type: Option<String>,
    pub media_image: Option<String>,
    pub media_video: Option<String>,
    pub alt_text: Option<String>,
    pub link: Option<String>,
    /// Rich text with icon tokens expanded.
    pub title: Option<String>,
    pub description: Option<String>,
    pub cta_link: Option<String>,
    pub cta_text: Option<String>,
    pub strategy: MetaStrategy,
}

impl ItemMeta {
    fn slot(&mut self, field: MetaField) -> &mut Option<String> {
        match field {
            MetaField::MediaType => &mut self.media_type,
            MetaField::MediaImage => &mut self.media_image,
            MetaField::MediaVideo => &mut self.media_video,
            MetaField::AltText => &mut self.alt_text,
            MetaField::Link => &mut self.link,
            MetaField::Title => &mut self.title,
            MetaField::Description => &mut self.description,
            MetaField::CtaLink => &mut self.cta_link,
            MetaField::CtaText => &mut self.cta_text,
        }
    }

    /// Store `value`, dropping blanks.
    pub fn set(&mut self, field: MetaField, value: String) {
        let value = value.trim();
        if !value.is_empty() {
            *self.slot(field) = Some(value.to_owned());
        }
    }

    pub fn get(&self, field: MetaField) -> Option<&str> {
        match field {
            MetaField::MediaType => self.media_type.as_deref(),
            MetaField::MediaImage => self.media_image.as_deref(),
            MetaField::MediaVideo => self.media_video.as_deref(),
            MetaField::AltText => self.alt_text.as_deref(),
            MetaField::Link => self.link.as_deref(),
            MetaField::Title => self.title.as_deref(),
            MetaField::Description => self.description.as_deref(),
            MetaField::CtaLink => self.cta_link.as_deref(),
            MetaField::CtaText => self.cta_text.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        MetaField::POSITIONAL.iter().all(|f| self.get(*f).is_none())
    }

    /// Whether the metadata declares video content.
    pub fn declares_video(&self) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("video"))
            || self.media_video.is_some()
    }
}

/// Rich-text cell: icon tokens expanded, first link pulled out.
fn processed_text(dom: &Dom, cell: NodeId) -> String {
    let mut html = dom.inner_html(cell);
    if html.trim().is_empty() {
        html = dom.text_content(cell);
    }
    if html.trim().is_empty() {
        return String::new();
    }
    process_content_with_icons_and_link(&html).content
}

/// Alt text cell: icon spans back to `:name:` tokens, entities decoded,
/// whitespace collapsed. Works on a copy so the cell is untouched.
pub fn read_alt_text(dom: &mut Dom, cell: NodeId) -> String {
    let copy = dom.deep_clone(cell);
    collapse_icon_spans(dom, copy);
    normalize_alt_text(&decode_cms_text(&dom.text_content(copy)))
}

/// Alt text of the image inside a `mediaImage` cell.
fn authored_image_alt(dom: &Dom, cell: NodeId) -> Option<String> {
    let img = if dom.is_tag(cell, "img") {
        Some(cell)
    } else {
        dom.find_tag(cell, &["img"])
    };
    let alt = normalize_alt_text(&decode_cms_text(dom.attr(img?, "alt")?));
    (!alt.is_empty()).then_some(alt)
}

/// Plain field of a positional row: a link's target, else the text.
fn positional_value(dom: &Dom, cell: NodeId) -> String {
    let link = if dom.is_tag(cell, "a") {
        Some(cell)
    } else {
        dom.find_tag(cell, &["a"])
    };
    match link.and_then(|a| dom.attr(a, "href")) {
        Some(href) => href.to_owned(),
        None => dom.text_content(cell).trim().to_owned(),
    }
}

/// Leading rows that form a `key | value` table.
fn table_rows(dom: &Dom, rows: &[NodeId], max_key_len: usize) -> Vec<NodeId> {
    let mut table = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let cells = dom.element_children(*row);
        if cells.len() != 2 {
            break;
        }
        let key = dom.text_content(cells[0]);
        let key = key.trim();
        if key.is_empty() || key.chars().count() > max_key_len {
            tracing::debug!(row = i, key_len = key.chars().count(), "metadata table ends at invalid key");
            break;
        }
        table.push(*row);
    }
    table
}

/// Parse the metadata of a slide's working copy.
///
/// Table rows are detached from `temp` so they do not render as content.
pub fn parse_item_metadata(dom: &mut Dom, temp: NodeId, max_key_len: usize) -> ItemMeta {
    let rows = dom.element_children(temp);
    let table = table_rows(dom, &rows, max_key_len);

    let mut meta = ItemMeta::default();
    if !table.is_empty() {
        meta.strategy = MetaStrategy::Table;
        for row in &table {
            dom.detach(*row);
        }
        let mut image_alt = None;
        for row in table {
            let cells = dom.element_children(row);
            let (key_cell, value_cell) = (cells[0], cells[1]);
            let Some(field) = MetaField::from_key(&dom.text_content(key_cell)) else {
                continue;
            };
            if field == MetaField::MediaImage {
                image_alt = authored_image_alt(dom, value_cell);
            }
            let value = if field.is_rich() {
                processed_text(dom, value_cell)
            } else if field == MetaField::AltText {
                read_alt_text(dom, value_cell)
            } else {
                read_cell_value(dom, value_cell).as_text().to_owned()
            };
            meta.set(field, value);
        }
        // an `altText` row wins over the alt of the `mediaImage` picture
        if meta.alt_text.is_none()
            && let Some(alt) = image_alt
        {
            meta.set(MetaField::AltText, alt);
        }
        return meta;
    }

    if rows.len() >= POSITIONAL_ROWS {
        meta.strategy = MetaStrategy::Positional;
        for (field, row) in MetaField::POSITIONAL.into_iter().zip(rows) {
            let cell = dom.first_element_child(row).unwrap_or(row);
            let value = if field.is_rich() {
                processed_text(dom, cell)
            } else if field == MetaField::AltText {
                read_alt_text(dom, cell)
            } else {
                positional_value(dom, cell)
            };
            meta.set(field, value);
        }
    }
    meta
}

/// Link a row points at, read from a throwaway copy of its cells.
pub fn extract_link_from_row(dom: &mut Dom, row: NodeId, max_key_len: usize) -> Option<String> {
    let temp = copy_cells(dom, row);
    parse_item_metadata(dom, temp, max_key_len).link
}

/// Detached `div` holding deep copies of the row's children.
pub(crate) fn copy_cells(dom: &mut Dom, row: NodeId) -> NodeId {
    let temp = dom.create_element("div");
    for child in dom.children(row).to_vec() {
        let copy = dom.deep_clone(child);
        dom.append_child(temp, copy);
    }
    temp
}

fn acceptable_title(title: &str) -> bool {
    let title = title.trim();
    !title.is_empty()
        && title != "Article"
        && !title.to_lowercase().contains("article content")
        && !title.starts_with("Content from:")
}

fn acceptable_description(description: &str) -> bool {
    let description = description.trim();
    !description.is_empty() && !description.starts_with("Content from:")
}

/// Fill missing title/description from linked-page metadata. Authored values
/// always win and generic placeholder values are ignored.
pub fn merge_page_metadata(meta: &mut ItemMeta, fetched: &PageMetadata) {
    if meta.title.is_none()
        && let Some(title) = fetched.title.as_deref().filter(|t| acceptable_title(t))
    {
        meta.title = Some(title.trim().to_owned());
    }
    if meta.description.is_none()
        && let Some(description) = fetched
            .description
            .as_deref()
            .filter(|d| acceptable_description(d))
    {
        meta.description = Some(description.trim().to_owned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(html: &str) -> (Dom, NodeId, ItemMeta) {
        let (mut dom, temp) = Dom::from_fragment("div", html);
        let meta = parse_item_metadata(&mut dom, temp, 40);
        (dom, temp, meta)
    }

    #[test]
    fn test_key_aliases() {
        assert_eq!(MetaField::from_key("alt-text"), Some(MetaField::AltText));
        assert_eq!(MetaField::from_key("altText"), Some(MetaField::AltText));
        assert_eq!(MetaField::from_key(" AltText "), Some(MetaField::AltText));
        assert_eq!(MetaField::from_key("cta-button-link"), Some(MetaField::CtaLink));
        assert_eq!(MetaField::from_key("CTA Text"), Some(MetaField::CtaText));
        assert_eq!(MetaField::from_key("colour"), None);
    }

    #[test]
    fn test_table_strategy_wins_over_trailing_rows() {
        let mut html = String::from(
            r#"<div><div>title</div><div><p>Hello :star:</p></div></div>
               <div><div>link</div><div><a href="/offer">Offer</a></div></div>
               <div><div>alt-text</div><div>A &amp; B</div></div>"#,
        );
        for i in 0..9 {
            html.push_str(&format!("<div><p>row {i}</p></div>"));
        }
        let (dom, temp, meta) = parse(&html);

        assert_eq!(meta.strategy, MetaStrategy::Table);
        assert_eq!(
            meta.title.as_deref(),
            Some(r#"<p>Hello <span class="icon icon-star"></span></p>"#)
        );
        assert_eq!(meta.link.as_deref(), Some("/offer"));
        assert_eq!(meta.alt_text.as_deref(), Some("A & B"));
        assert_eq!(meta.cta_text, None);
        // the table rows are consumed, the trailing rows stay
        assert_eq!(dom.element_children(temp).len(), 9);
    }

    #[test]
    fn test_long_key_ends_table() {
        let long_key = "k".repeat(41);
        let html = format!(
            "<div><div>title</div><div>Kept</div></div>\
             <div><div>{long_key}</div><div>ignored</div></div>\
             <div><div>description</div><div>Dropped</div></div>"
        );
        let (_, _, meta) = parse(&html);
        assert_eq!(meta.title.as_deref(), Some("Kept"));
        assert_eq!(meta.description, None);
    }

    #[test]
    fn test_positional_strategy() {
        let html = r#"
            <div><p>image</p></div>
            <div><p><a href="/media/hero.jpg">hero</a></p></div>
            <div><p></p></div>
            <div><p>Two <span class="icon icon-leaf"></span> leaves</p></div>
            <div><p><a href="/article">article</a></p></div>
            <div><p>Spring :leaf:</p></div>
            <div><p>New season</p></div>
            <div><p><a href="/shop">shop</a></p></div>
            <div><p>Shop now</p></div>
            <div><p>trailing</p></div>"#;
        let (_, _, meta) = parse(html);
        assert_eq!(meta.strategy, MetaStrategy::Positional);
        assert_eq!(meta.media_type.as_deref(), Some("image"));
        assert_eq!(meta.media_image.as_deref(), Some("/media/hero.jpg"));
        assert_eq!(meta.media_video, None);
        assert_eq!(meta.alt_text.as_deref(), Some("Two :leaf: leaves"));
        assert_eq!(meta.link.as_deref(), Some("/article"));
        assert_eq!(
            meta.title.as_deref(),
            Some(r#"Spring <span class="icon icon-leaf"></span>"#)
        );
        assert_eq!(meta.description.as_deref(), Some("New season"));
        assert_eq!(meta.cta_link.as_deref(), Some("/shop"));
        assert_eq!(meta.cta_text.as_deref(), Some("Shop now"));
    }

    #[test]
    fn test_media_image_alt_fills_missing_alt_text() {
        for (alt, expected) in [("Second", "Second"), ("Two  alt", "Two alt"), ("Two&amp;alt", "Two&alt")] {
            let (_, _, meta) = parse(&format!(
                r#"<div><div>mediaImage</div><div><picture><img src="/two.jpg" alt="{alt}"></picture></div></div>"#
            ));
            assert_eq!(meta.media_image.as_deref(), Some("/two.jpg"));
            assert_eq!(meta.alt_text.as_deref(), Some(expected));
        }

        let (_, _, meta) = parse(
            r#"<div><div>mediaImage</div><div><img src="/two.jpg" alt="From image"></div></div>
               <div><div>altText</div><div>Authored</div></div>"#,
        );
        assert_eq!(meta.alt_text.as_deref(), Some("Authored"));

        let (_, _, meta) =
            parse(r#"<div><div>mediaImage</div><div><img src="/two.jpg" alt=""></div></div>"#);
        assert_eq!(meta.alt_text, None);
    }

    #[test]
    fn test_too_few_rows_yields_nothing() {
        let (_, _, meta) = parse("<div><p>one</p></div><div><p>two</p></div>");
        assert_eq!(meta.strategy, MetaStrategy::None);
        assert!(meta.is_empty());
    }

    #[test]
    fn test_extract_link_leaves_row_intact() {
        let (mut dom, row) = Dom::from_fragment(
            "div",
            r#"<div><div>link</div><div><a href="https://example.com/a">a</a></div></div>"#,
        );
        let before = dom.outer_html(row);
        assert_eq!(
            extract_link_from_row(&mut dom, row, 40).as_deref(),
            Some("https://example.com/a")
        );
        assert_eq!(dom.outer_html(row), before);
    }

    #[test]
    fn test_merge_rejects_generic_titles() {
        let mut meta = ItemMeta::default();
        merge_page_metadata(
            &mut meta,
            &PageMetadata {
                title: Some("Article Content".into()),
                description: Some("Content from: somewhere".into()),
                image: None,
            },
        );
        assert_eq!(meta.title, None);
        assert_eq!(meta.description, None);

        merge_page_metadata(
            &mut meta,
            &PageMetadata {
                title: Some(" Spring range ".into()),
                description: Some("All new".into()),
                image: None,
            },
        );
        assert_eq!(meta.title.as_deref(), Some("Spring range"));
        assert_eq!(meta.description.as_deref(), Some("All new"));

        let mut authored = ItemMeta {
            title: Some("Authored".into()),
            ..Default::default()
        };
        merge_page_metadata(
            &mut authored,
            &PageMetadata {
                title: Some("Fetched".into()),
                ..Default::default()
            },
        );
        assert_eq!(authored.title.as_deref(), Some("Authored"));
    }
}
