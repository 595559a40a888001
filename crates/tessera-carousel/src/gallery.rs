//! Image-only gallery scrolling.
//!
//! The gallery keeps every slide visible and scrolls the track natively.
//! This module owns the arithmetic; measurements arrive from the browser.

use tessera_common::config::CarouselSettings;

use crate::navigation::wrap_index;

/// Frames without movement before a scroll counts as finished, for
/// browsers without `scrollend`.
const SETTLE_FRAMES: u8 = 3;

/// Measurements of the scrolling track.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackMetrics {
    pub scroll_left: f64,
    pub client_width: f64,
    pub scroll_width: f64,
    /// Width of the first item.
    pub item_width: f64,
    /// Computed column gap, when the style provides one.
    pub gap: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonStates {
    pub prev_disabled: bool,
    pub next_disabled: bool,
}

/// Result of an arrow press.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GalleryStep {
    pub target: usize,
    pub scroll_by: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryDirection {
    Prev,
    Next,
}

#[derive(Debug, Clone)]
pub struct Gallery {
    len: usize,
    default_gap: f64,
    edge_threshold: f64,
    programmatic: bool,
    last_index: usize,
    settle: Option<(f64, u8)>,
    last_dims: Option<(f64, f64)>,
    refresh_pending: bool,
}

impl Gallery {
    pub fn new(len: usize, settings: &CarouselSettings) -> Self {
        Self {
            len,
            default_gap: settings.gallery_gap_px,
            edge_threshold: settings.gallery_edge_threshold_px,
            programmatic: false,
            last_index: 0,
            settle: None,
            last_dims: None,
            // button states are computed on the first frame
            refresh_pending: true,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn last_index(&self) -> usize {
        self.last_index
    }

    pub fn scroll_amount(&self, m: &TrackMetrics) -> f64 {
        m.item_width + m.gap.unwrap_or(self.default_gap)
    }

    pub fn current_index(&self, m: &TrackMetrics) -> usize {
        let width = self.scroll_amount(m);
        if width <= 0.0 || self.len == 0 {
            return 0;
        }
        let index = (m.scroll_left / width).floor().max(0.0) as usize;
        index.min(self.len - 1)
    }

    pub fn button_states(&self, m: &TrackMetrics) -> ButtonStates {
        let max_scroll = m.scroll_width - m.client_width;
        ButtonStates {
            prev_disabled: m.scroll_left <= self.edge_threshold,
            next_disabled: m.scroll_left >= max_scroll - self.edge_threshold,
        }
    }

    /// Arrow press: the wrapped target index and how far to scroll.
    pub fn step(&mut self, direction: GalleryDirection, m: &TrackMetrics) -> Option<GalleryStep> {
        if self.len == 0 {
            return None;
        }
        let current = self.current_index(m) as isize;
        let amount = self.scroll_amount(m);
        let (target, scroll_by) = match direction {
            GalleryDirection::Prev => (wrap_index(current - 1, self.len), -amount),
            GalleryDirection::Next => (wrap_index(current + 1, self.len), amount),
        };
        self.programmatic = true;
        self.last_index = target;
        Some(GalleryStep { target, scroll_by })
    }

    /// A scroll finished. Returns the index to report as a swipe, if the
    /// user (not an arrow press) moved to a new slide.
    pub fn scroll_end(&mut self, m: &TrackMetrics) -> Option<usize> {
        self.settle = None;
        self.refresh_pending = true;
        let index = self.current_index(m);
        if std::mem::take(&mut self.programmatic) {
            self.last_index = index;
            return None;
        }
        if index != self.last_index {
            self.last_index = index;
            return Some(index);
        }
        None
    }

    /// Scroll event. Starts the settle counter used without `scrollend`.
    pub fn on_scroll(&mut self, m: &TrackMetrics, has_scroll_end: bool) {
        self.refresh_pending = true;
        if !has_scroll_end {
            self.settle = Some((m.scroll_left, 0));
        }
    }

    /// Dimensions changed. Returns `true` when buttons need refreshing.
    pub fn on_resize(&mut self, m: &TrackMetrics) -> bool {
        let dims = (m.client_width, m.scroll_width);
        if self.last_dims == Some(dims) {
            return false;
        }
        self.last_dims = Some(dims);
        self.refresh_pending = true;
        true
    }

    pub fn needs_frame(&self) -> bool {
        self.refresh_pending || self.settle.is_some()
    }

    /// Frame tick. Returns button states when they should be re-applied, and
    /// a swipe index when a settled scroll landed on a new slide.
    pub fn on_frame(&mut self, m: &TrackMetrics) -> (Option<ButtonStates>, Option<usize>) {
        let mut swipe = None;
        if let Some((left, stable)) = self.settle {
            if left == m.scroll_left {
                if stable + 1 >= SETTLE_FRAMES {
                    swipe = self.scroll_end(m);
                } else {
                    self.settle = Some((left, stable + 1));
                }
            } else {
                self.settle = Some((m.scroll_left, 0));
            }
        }
        let buttons = std::mem::take(&mut self.refresh_pending).then(|| self.button_states(m));
        (buttons, swipe)
    }

    /// Horizontal wheel gestures are swallowed so the page does not
    /// navigate back.
    pub fn wheel_should_prevent(dx: f64, dy: f64, shift: bool) -> bool {
        dx.abs() > dy.abs() || (shift && dy != 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(scroll_left: f64) -> TrackMetrics {
        TrackMetrics {
            scroll_left,
            client_width: 600.0,
            scroll_width: 1800.0,
            item_width: 280.0,
            gap: None,
        }
    }

    #[test]
    fn test_index_and_buttons() {
        let gallery = Gallery::new(6, &CarouselSettings::default());
        assert_eq!(gallery.scroll_amount(&track(0.0)), 300.0);
        assert_eq!(gallery.current_index(&track(0.0)), 0);
        assert_eq!(gallery.current_index(&track(650.0)), 2);
        assert_eq!(gallery.current_index(&track(9000.0)), 5);
        assert_eq!(
            gallery.button_states(&track(5.0)),
            ButtonStates {
                prev_disabled: true,
                next_disabled: false
            }
        );
        assert_eq!(
            gallery.button_states(&track(1195.0)),
            ButtonStates {
                prev_disabled: false,
                next_disabled: true
            }
        );
    }

    #[test]
    fn test_programmatic_scroll_is_not_a_swipe() {
        let mut gallery = Gallery::new(6, &CarouselSettings::default());
        let step = gallery.step(GalleryDirection::Next, &track(0.0));
        assert_eq!(
            step,
            Some(GalleryStep {
                target: 1,
                scroll_by: 300.0
            })
        );
        assert_eq!(gallery.scroll_end(&track(300.0)), None);
        assert_eq!(gallery.scroll_end(&track(900.0)), Some(3));
        assert_eq!(gallery.scroll_end(&track(950.0)), None);
        let back = gallery.step(GalleryDirection::Prev, &track(0.0));
        assert_eq!(back.map(|s| s.target), Some(5));
    }

    #[test]
    fn test_settle_counter_without_scrollend() {
        let mut gallery = Gallery::new(6, &CarouselSettings::default());
        gallery.on_scroll(&track(600.0), false);
        assert_eq!(gallery.on_frame(&track(600.0)).1, None);
        assert_eq!(gallery.on_frame(&track(600.0)).1, None);
        assert_eq!(gallery.on_frame(&track(600.0)).1, Some(2));
        assert!(!gallery.needs_frame());
    }

    #[test]
    fn test_wheel_and_resize() {
        assert!(Gallery::wheel_should_prevent(10.0, 2.0, false));
        assert!(Gallery::wheel_should_prevent(0.0, 5.0, true));
        assert!(!Gallery::wheel_should_prevent(0.0, 5.0, false));

        let mut gallery = Gallery::new(3, &CarouselSettings::default());
        assert!(gallery.on_resize(&track(0.0)));
        assert!(!gallery.on_resize(&track(100.0)));
    }
}
