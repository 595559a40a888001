//! Frame and timer capability.
//!
//! Everything in the carousel that waits does so through [`FrameClock`]: the
//! browser drives it with `requestAnimationFrame` and `setTimeout`, tests with
//! [`ManualClock`].

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;

/// Source of rendering frames and timers, in milliseconds.
pub trait FrameClock {
    /// Current time.
    fn now(&self) -> f64;

    /// Resolves on the next rendering frame with that frame's timestamp.
    fn next_frame(&self) -> impl Future<Output = f64>;

    /// Resolves once `ms` have elapsed.
    fn sleep(&self, ms: f64) -> impl Future<Output = ()>;

    /// Resolves after `n` rendering frames.
    fn frames(&self, n: u32) -> impl Future<Output = ()> {
        async move {
            for _ in 0..n {
                self.next_frame().await;
            }
        }
    }
}

impl<C: FrameClock> FrameClock for Rc<C> {
    fn now(&self) -> f64 {
        (**self).now()
    }

    fn next_frame(&self) -> impl Future<Output = f64> {
        (**self).next_frame()
    }

    fn sleep(&self, ms: f64) -> impl Future<Output = ()> {
        (**self).sleep(ms)
    }
}

/// Deterministic clock for tests and headless hosts.
///
/// Every awaited frame yields to the executor once and then advances the
/// shared time by `frame_ms`. Sleeping is a run of frames, so timers and
/// frame waits interleave the way they do under a real compositor.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
    frames: Rc<Cell<u64>>,
    frame_ms: f64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::with_frame_ms(16.0)
    }

    pub fn with_frame_ms(frame_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(0.0)),
            frames: Rc::new(Cell::new(0)),
            frame_ms,
        }
    }

    /// Move time forward without producing a frame.
    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    /// Frames produced so far, across all clones.
    pub fn frame_count(&self) -> u64 {
        self.frames.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    async fn next_frame(&self) -> f64 {
        n0_future::future::yield_now().await;
        self.frames.set(self.frames.get() + 1);
        self.advance(self.frame_ms);
        self.now.get()
    }

    async fn sleep(&self, ms: f64) {
        let until = self.now.get() + ms;
        while self.now.get() < until {
            self.next_frame().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "current_thread")]
    async fn test_manual_clock_frames_advance_time() {
        let clock = ManualClock::new();
        clock.frames(3).await;
        assert_eq!(clock.frame_count(), 3);
        assert_eq!(clock.now(), 48.0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_next_frame_yields_before_advancing() {
        let clock = ManualClock::new();
        let mut frame = std::pin::pin!(clock.next_frame());
        assert_eq!(n0_future::future::poll_once(frame.as_mut()).await, None);
        assert_eq!(clock.frame_count(), 0);
        assert_eq!(frame.await, 16.0);
        assert_eq!(clock.frame_count(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_sleep_rounds_up_to_whole_frames() {
        let clock = ManualClock::with_frame_ms(10.0);
        clock.sleep(25.0).await;
        assert_eq!(clock.now(), 30.0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_rc_clock_shares_time() {
        let clock = Rc::new(ManualClock::new());
        let other = clock.clone();
        clock.next_frame().await;
        assert_eq!(other.now(), 16.0);
    }
}
