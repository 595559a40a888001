//! Block configuration tables.
//!
//! Authored blocks arrive as a `div` per row with one `div` per cell. A block
//! configured as a key/value table has the key in the first cell and the value
//! in the second.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dom::{Dom, NodeId};

/// Value of a configuration row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    List(Vec<String>),
}

impl ConfigValue {
    /// The single value, or the first entry of a list.
    pub fn as_text(&self) -> &str {
        match self {
            ConfigValue::Text(s) => s,
            ConfigValue::List(items) => items.first().map(String::as_str).unwrap_or(""),
        }
    }

    /// Render the value as one string, list entries joined by a space.
    pub fn joined(&self) -> String {
        match self {
            ConfigValue::Text(s) => s.clone(),
            ConfigValue::List(items) => items.join(" "),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlockConfig {
    pub values: BTreeMap<String, ConfigValue>,
}

impl BlockConfig {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(ConfigValue::as_text)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

/// Lowercase `name` and squash every run of non-alphanumerics into one `-`.
pub fn to_class_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_owned()
}

/// Read one value cell: link targets, then image sources, then paragraph
/// text, then the raw cell text.
pub fn read_cell_value(dom: &Dom, cell: NodeId) -> ConfigValue {
    let collect = |nodes: Vec<NodeId>, read: &dyn Fn(NodeId) -> String| -> ConfigValue {
        let mut values: Vec<String> = nodes.into_iter().map(read).collect();
        if values.len() == 1 {
            ConfigValue::Text(values.remove(0))
        } else {
            ConfigValue::List(values)
        }
    };

    let links = dom.find_all_tags(cell, &["a"]);
    if !links.is_empty() {
        return collect(links, &|a| dom.attr(a, "href").unwrap_or("").to_owned());
    }
    let images = dom.find_all_tags(cell, &["img"]);
    if !images.is_empty() {
        return collect(images, &|img| dom.attr(img, "src").unwrap_or("").to_owned());
    }
    let paragraphs = dom.find_all_tags(cell, &["p"]);
    if !paragraphs.is_empty() {
        return collect(paragraphs, &|p| dom.text_content(p));
    }
    ConfigValue::Text(dom.text_content(cell))
}

/// Read every two-cell `div` row directly under `block` as a config entry.
pub fn read_block_config(dom: &Dom, block: NodeId) -> BlockConfig {
    read_rows_config(dom, &dom.element_children(block))
}

/// Same as [`read_block_config`] over an explicit set of rows.
pub fn read_rows_config(dom: &Dom, rows: &[NodeId]) -> BlockConfig {
    let mut config = BlockConfig::default();
    for row in rows {
        if !dom.is_tag(*row, "div") {
            continue;
        }
        let cells = dom.element_children(*row);
        let (Some(key_cell), Some(value_cell)) = (cells.first(), cells.get(1)) else {
            continue;
        };
        let name = to_class_name(&dom.text_content(*key_cell));
        config.values.insert(name, read_cell_value(dom, *value_cell));
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_class_name() {
        assert_eq!(to_class_name("Alt Text"), "alt-text");
        assert_eq!(to_class_name("  CTA -- Button Text! "), "cta-button-text");
        assert_eq!(to_class_name("mediaVideo"), "mediavideo");
        assert_eq!(to_class_name("---"), "");
    }

    #[test]
    fn test_read_block_config_value_kinds() {
        let (dom, root) = Dom::from_fragment(
            "div",
            r#"
            <div><div>Link</div><div><a href="/a">A</a></div></div>
            <div><div>Images</div><div><img src="1.png"><img src="2.png"></div></div>
            <div><div>Title</div><div><p>Hello</p></div></div>
            <div><div>Layout</div><div>full-width</div></div>
            <div><div>lonely</div></div>
            "#,
        );
        let config = read_block_config(&dom, root);
        assert_eq!(config.text("link"), Some("/a"));
        assert_eq!(
            config.get("images"),
            Some(&ConfigValue::List(vec!["1.png".into(), "2.png".into()]))
        );
        assert_eq!(config.text("title"), Some("Hello"));
        assert_eq!(config.text("layout"), Some("full-width"));
        assert!(!config.contains_key("lonely"));
    }
}
