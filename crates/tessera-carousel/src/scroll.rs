//! Scroll-driven expand/collapse of the block.
//!
//! Scroll events only mark a check as pending; the check itself runs once
//! per animation frame with fresh measurements.

use tessera_common::config::CarouselSettings;

/// Page measurements taken on the frame a check runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    /// Block top relative to the viewport.
    pub block_top: f64,
    pub viewport_height: f64,
    pub scroll_y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    /// Start the entrance animations.
    Expand,
    /// Drop back to the resting layout.
    Collapse,
}

#[derive(Debug, Clone)]
pub struct ScrollAnimator {
    /// `carousel-expanded` applies (full-grid outside grid columns).
    expandable: bool,
    /// Collapse applies at all (full-grid).
    collapsible: bool,
    trigger_ratio: f64,
    collapse_threshold: f64,
    collapse_debounce: f64,
    collapse_fallback: f64,
    started: bool,
    expanded: bool,
    user_scrolled: bool,
    check_pending: bool,
    collapsing_since: Option<f64>,
    last_collapse: Option<f64>,
}

impl ScrollAnimator {
    pub fn new(full_grid: bool, in_grid_columns: bool, settings: &CarouselSettings) -> Self {
        Self {
            expandable: full_grid && !in_grid_columns,
            collapsible: full_grid,
            trigger_ratio: settings.viewport_trigger_ratio,
            collapse_threshold: settings.collapse_threshold_px,
            collapse_debounce: settings.collapse_debounce_ms,
            collapse_fallback: settings.collapse_fallback_ms,
            started: false,
            expanded: false,
            user_scrolled: false,
            check_pending: false,
            collapsing_since: None,
            last_collapse: None,
        }
    }

    pub fn is_expandable(&self) -> bool {
        self.expandable
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_collapsing(&self) -> bool {
        self.collapsing_since.is_some()
    }

    /// Coalesce a scroll event into the next frame's check.
    pub fn on_scroll(&mut self) {
        self.user_scrolled = true;
        self.check_pending = true;
    }

    /// Request a check without counting it as user scrolling.
    pub fn request_check(&mut self) {
        self.check_pending = true;
    }

    pub fn needs_frame(&self) -> bool {
        self.check_pending || self.collapsing_since.is_some()
    }

    pub fn on_frame(&mut self, metrics: &ScrollMetrics, now: f64) -> Option<ScrollAction> {
        if let Some(since) = self.collapsing_since
            && now - since >= self.collapse_fallback
        {
            tracing::trace!("collapse fallback elapsed");
            self.collapsing_since = None;
        }

        if !std::mem::take(&mut self.check_pending) {
            return None;
        }

        let was_expanded = self.expanded;
        let collapsing = self.collapsing_since.is_some();

        if metrics.block_top <= metrics.viewport_height * self.trigger_ratio
            && !self.started
            && self.user_scrolled
            && !collapsing
        {
            self.started = true;
            self.expanded = self.expandable;
            return Some(ScrollAction::Expand);
        }

        let debounced = self
            .last_collapse
            .is_none_or(|last| now - last >= self.collapse_debounce);
        if metrics.scroll_y < self.collapse_threshold
            && self.collapsible
            && was_expanded
            && !collapsing
            && debounced
        {
            self.collapsing_since = Some(now);
            self.last_collapse = Some(now);
            self.expanded = false;
            self.started = false;
            return Some(ScrollAction::Collapse);
        }
        None
    }

    /// A transition on the block finished. Returns `true` when it ended the
    /// collapse.
    pub fn on_transition_end(&mut self, property: &str) -> bool {
        if self.collapsing_since.is_some() && matches!(property, "width" | "margin") {
            self.collapsing_since = None;
            return true;
        }
        false
    }
}
