//! Frame-driven autoplay timer.

/// Advances once `interval` has elapsed since the last advance or reset.
///
/// The timer is polled from the animation-frame loop rather than armed as a
/// plain timeout, so a backgrounded tab does not pile up advances.
#[derive(Debug, Clone)]
pub struct Autoplay {
    interval: f64,
    enabled: bool,
    armed_at: Option<f64>,
}

impl Autoplay {
    /// Carousels with a single slide never arm.
    pub fn new(slides: usize, interval: f64) -> Self {
        Self {
            interval,
            enabled: slides > 1,
            armed_at: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Re-arm the full interval from `now`.
    pub fn reset(&mut self, now: f64) {
        if self.enabled {
            self.armed_at = Some(now);
        }
    }

    /// Safe to call repeatedly or before the first reset.
    pub fn stop(&mut self) {
        self.armed_at = None;
    }

    /// `true` when the carousel should advance. Re-arms itself.
    pub fn tick(&mut self, now: f64) -> bool {
        match self.armed_at {
            Some(armed_at) if now - armed_at >= self.interval => {
                self.armed_at = Some(now);
                true
            }
            _ => false,
        }
    }
}
