//! Timing helpers for instrumentation.
//!
//! `now()` wraps `Performance.now()` in the browser and a monotonic clock
//! elsewhere, both in milliseconds.

#[cfg(all(target_family = "wasm", target_os = "unknown"))]
pub fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

#[cfg(not(all(target_family = "wasm", target_os = "unknown")))]
pub fn now() -> f64 {
    use std::time::Instant;
    static START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_secs_f64() * 1000.0
}

/// Logs elapsed time when dropped.
pub struct TimingGuard {
    label: &'static str,
    start: f64,
}

impl TimingGuard {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            start: now(),
        }
    }

    pub fn elapsed(&self) -> f64 {
        now() - self.start
    }
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.elapsed(), "{}", self.label);
    }
}
