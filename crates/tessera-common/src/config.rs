use miette::Result;
use miette::miette;
use serde::{Deserialize, Serialize};

use std::future::Future;

use crate::error::TesseraError;

/// Tunables for the carousel block. Every field has a default, so a partial
/// JSON/TOML document only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CarouselSettings {
    /// Time between automatic slide advances.
    pub autoplay_interval_ms: f64,
    /// Minimum horizontal travel for a touch swipe.
    pub swipe_threshold_px: f64,
    /// Viewports narrower than this are treated as mobile.
    pub mobile_breakpoint_px: f64,
    /// Fallback before autoplay re-arms when a slide has no CTA transition.
    pub cta_animation_ms: f64,
    /// Expansion fires when the block top reaches this fraction of the viewport.
    pub viewport_trigger_ratio: f64,
    /// `scrollY` below which an expanded full-grid carousel collapses.
    pub collapse_threshold_px: f64,
    pub collapse_debounce_ms: f64,
    /// Clears the collapsing state if no transition end ever arrives.
    pub collapse_fallback_ms: f64,
    /// Cross-fade cadence for the kao-home layout.
    pub crossfade_interval_ms: f64,
    pub crossfade_fallback_ms: f64,
    /// Frames between two serialized player bootstraps.
    pub settle_frames: u32,
    pub player_ready_timeout_ms: f64,
    pub player_pending_grace_ms: f64,
    pub player_settle_frames: u32,
    pub player_init_attempts: u32,
    pub player_wait_budget_ms: f64,
    pub player_wait_initial_ms: f64,
    pub player_wait_max_ms: f64,
    /// Frames the alt-text watch keeps re-applying labels.
    pub alt_text_watch_frames: u32,
    pub meta_key_max_len: usize,
    /// Gap assumed between gallery items when none is measured.
    pub gallery_gap_px: f64,
    pub gallery_edge_threshold_px: f64,
    /// Prefix for `/icons/{name}.svg`.
    pub icon_base_path: String,
    /// Locale prefix for `/placeholders.json`.
    pub placeholder_prefix: String,
}

impl Default for CarouselSettings {
    fn default() -> Self {
        Self {
            autoplay_interval_ms: 5000.0,
            swipe_threshold_px: 50.0,
            mobile_breakpoint_px: 800.0,
            cta_animation_ms: 3150.0,
            viewport_trigger_ratio: 0.5,
            collapse_threshold_px: 50.0,
            collapse_debounce_ms: 800.0,
            collapse_fallback_ms: 1200.0,
            crossfade_interval_ms: 5000.0,
            crossfade_fallback_ms: 1500.0,
            settle_frames: 5,
            player_ready_timeout_ms: 3000.0,
            player_pending_grace_ms: 1500.0,
            player_settle_frames: 7,
            player_init_attempts: 5,
            player_wait_budget_ms: 10_000.0,
            player_wait_initial_ms: 50.0,
            player_wait_max_ms: 1000.0,
            alt_text_watch_frames: 10,
            meta_key_max_len: 40,
            gallery_gap_px: 20.0,
            gallery_edge_threshold_px: 10.0,
            icon_base_path: String::new(),
            placeholder_prefix: String::new(),
        }
    }
}

impl CarouselSettings {
    /// Loads the settings from the provided loader.
    pub async fn load(loader: &impl Loader) -> Result<Self> {
        loader
            .load()
            .await
            .map_err(|e| miette!("Failed to load carousel settings: {e}"))
    }

    /// Loads settings, falling back to defaults on any error.
    pub async fn load_or_default(loader: &impl Loader) -> Self {
        match loader.load().await {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(error = %err, "using default carousel settings");
                Self::default()
            }
        }
    }
}

/// The trait for loading settings.
pub trait Loader {
    fn load(&self) -> impl Future<Output = Result<CarouselSettings, TesseraError>>;
}

/// Settings carried inline as JSON, e.g. from a page-level
/// `<script type="application/json">`.
pub struct JsonSource {
    json: String,
}

impl JsonSource {
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl Loader for JsonSource {
    async fn load(&self) -> Result<CarouselSettings, TesseraError> {
        Ok(serde_json::from_str(&self.json)?)
    }
}

/// An implementation of [`Loader`] that reads a `.json` or `.toml` file.
#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub struct FileStore {
    path: std::path::PathBuf,
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
impl FileStore {
    /// Create a new [`FileStore`] with the given path.
    pub fn new(path: impl AsRef<std::path::Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
impl Loader for FileStore {
    async fn load(&self) -> Result<CarouselSettings, TesseraError> {
        let raw = std::fs::read_to_string(&self.path)?;
        match self.path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&raw).map_err(|e| TesseraError::Toml(e.to_string())),
            Some("json") => Ok(serde_json::from_str(&raw)?),
            other => Err(TesseraError::Config(format!(
                "unsupported settings file extension: {other:?}"
            ))),
        }
    }
}
