//! Layout variants and how a block selects one.

use std::fmt;

use tessera_common::block::{BlockConfig, to_class_name};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LayoutVariant {
    #[default]
    FullGrid,
    FullWidth,
    ImageOnlyMedium,
    ImageOnlyLarge,
    KaoHome,
}

/// Config keys that mark the first row as a configuration row.
pub const CONFIG_KEYS: &[&str] = &[
    "full-grid",
    "full-width",
    "image-only-medium",
    "image-only-large",
    "layout",
];

impl LayoutVariant {
    pub const ALL: [LayoutVariant; 5] = [
        LayoutVariant::FullGrid,
        LayoutVariant::FullWidth,
        LayoutVariant::ImageOnlyMedium,
        LayoutVariant::ImageOnlyLarge,
        LayoutVariant::KaoHome,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutVariant::FullGrid => "full-grid",
            LayoutVariant::FullWidth => "full-width",
            LayoutVariant::ImageOnlyMedium => "image-only-medium",
            LayoutVariant::ImageOnlyLarge => "image-only-large",
            LayoutVariant::KaoHome => "kao-home",
        }
    }

    /// Accepts kebab-case, camelCase and squashed spellings.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = squash(name);
        Self::ALL.into_iter().find(|v| squash(v.as_str()) == wanted)
    }

    pub fn class_name(self) -> String {
        format!("carousel-layout-{}", self.as_str())
    }

    /// Gallery layouts show every slide and scroll instead of fading. They
    /// never carry video.
    pub fn is_image_only(self) -> bool {
        matches!(
            self,
            LayoutVariant::ImageOnlyMedium | LayoutVariant::ImageOnlyLarge
        )
    }
}

impl fmt::Display for LayoutVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn squash(name: &str) -> String {
    to_class_name(name).replace('-', "")
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && !value.eq_ignore_ascii_case("false") && value != "0"
}

/// Pick the layout for a block.
///
/// A single-cell first row naming a variant wins, then the `layout` key, then
/// any variant key set to a truthy value (the last one listed wins). Unknown
/// names fall back to full-grid.
pub fn select_layout(first_row_cell: Option<&str>, config: &BlockConfig) -> LayoutVariant {
    if let Some(variant) = first_row_cell.and_then(LayoutVariant::from_name) {
        return variant;
    }

    if let Some(name) = config.text("layout").filter(|s| !s.trim().is_empty()) {
        return match LayoutVariant::from_name(name) {
            Some(variant) => variant,
            None => {
                tracing::warn!(layout = name, "unknown carousel layout, using full-grid");
                LayoutVariant::FullGrid
            }
        };
    }

    let mut selected = None;
    for variant in LayoutVariant::ALL {
        let flagged = config
            .values
            .iter()
            .any(|(key, value)| squash(key) == squash(variant.as_str()) && is_truthy(value.as_text()));
        if flagged {
            selected = Some(variant);
        }
    }
    selected.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::block::ConfigValue;

    fn config(entries: &[(&str, &str)]) -> BlockConfig {
        BlockConfig {
            values: entries
                .iter()
                .map(|(k, v)| (k.to_string(), ConfigValue::Text(v.to_string())))
                .collect(),
        }
    }

    #[test]
    fn test_from_name_spellings() {
        assert_eq!(
            LayoutVariant::from_name("imageOnlyLarge"),
            Some(LayoutVariant::ImageOnlyLarge)
        );
        assert_eq!(LayoutVariant::from_name(" Kao-Home "), Some(LayoutVariant::KaoHome));
        assert_eq!(LayoutVariant::from_name("grid"), None);
        assert_eq!(
            LayoutVariant::ImageOnlyMedium.class_name(),
            "carousel-layout-image-only-medium"
        );
    }

    #[test]
    fn test_selection_order() {
        let cfg = config(&[("layout", "full-width")]);
        assert_eq!(select_layout(Some("kao-home"), &cfg), LayoutVariant::KaoHome);
        assert_eq!(select_layout(Some("hello"), &cfg), LayoutVariant::FullWidth);
        assert_eq!(
            select_layout(None, &config(&[("layout", "sideways")])),
            LayoutVariant::FullGrid
        );
        assert_eq!(
            select_layout(None, &config(&[("image-only-medium", "true"), ("full-width", "")])),
            LayoutVariant::ImageOnlyMedium
        );
        assert_eq!(select_layout(None, &BlockConfig::default()), LayoutVariant::FullGrid);
    }
}
