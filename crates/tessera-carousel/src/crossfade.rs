//! Timed crossfade for the `kao-home` layout.

use tessera_common::config::CarouselSettings;

use crate::navigation::wrap_index;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossfadeStep {
    /// Loses `is-active`, gains `is-fading-out`.
    pub from: usize,
    /// Gains `is-active`.
    pub to: usize,
}

#[derive(Debug, Clone)]
pub struct Crossfade {
    len: usize,
    active: usize,
    interval: f64,
    fallback: f64,
    next_at: Option<f64>,
    fading: Vec<(usize, f64)>,
}

impl Crossfade {
    pub fn new(len: usize, settings: &CarouselSettings) -> Self {
        Self {
            len,
            active: 0,
            interval: settings.crossfade_interval_ms,
            fallback: settings.crossfade_fallback_ms,
            next_at: None,
            fading: Vec::new(),
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_fading(&self, slide: usize) -> bool {
        self.fading.iter().any(|(s, _)| *s == slide)
    }

    pub fn needs_frame(&self) -> bool {
        self.len > 1
    }

    /// Frame tick. The first tick starts the interval.
    pub fn tick(&mut self, now: f64) -> Option<CrossfadeStep> {
        if self.len <= 1 {
            return None;
        }
        let next_at = *self.next_at.get_or_insert(now + self.interval);
        if now < next_at {
            return None;
        }
        self.next_at = Some(now + self.interval);
        let from = self.active;
        let to = wrap_index(from as isize + 1, self.len);
        self.active = to;
        self.fading.retain(|(s, _)| *s != from);
        self.fading.push((from, now + self.fallback));
        Some(CrossfadeStep { from, to })
    }

    /// Slides whose fade-out fallback elapsed.
    pub fn expire(&mut self, now: f64) -> Vec<usize> {
        let (done, keep): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.fading)
                .into_iter()
                .partition(|(_, deadline)| now >= *deadline);
        self.fading = keep;
        done.into_iter().map(|(s, _)| s).collect()
    }

    /// A fade-out transition ended on `slide`.
    pub fn transition_end(&mut self, slide: usize) -> bool {
        let before = self.fading.len();
        self.fading.retain(|(s, _)| *s != slide);
        before != self.fading.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotates_every_interval() {
        let mut fade = Crossfade::new(3, &CarouselSettings::default());
        assert_eq!(fade.tick(1000.0), None);
        assert_eq!(fade.tick(5999.0), None);
        assert_eq!(fade.tick(6000.0), Some(CrossfadeStep { from: 0, to: 1 }));
        assert!(fade.is_fading(0));
        assert_eq!(fade.tick(11_000.0), Some(CrossfadeStep { from: 1, to: 2 }));
        assert_eq!(fade.tick(16_000.0), Some(CrossfadeStep { from: 2, to: 0 }));
    }

    #[test]
    fn test_fade_out_clears_on_transition_or_fallback() {
        let mut fade = Crossfade::new(2, &CarouselSettings::default());
        fade.tick(0.0);
        fade.tick(5000.0);
        assert!(fade.transition_end(0));
        assert!(!fade.transition_end(0));
        fade.tick(10_000.0);
        assert_eq!(fade.expire(11_000.0), Vec::<usize>::new());
        assert_eq!(fade.expire(11_500.0), vec![1]);
    }

    #[test]
    fn test_single_slide_never_fades() {
        let mut fade = Crossfade::new(1, &CarouselSettings::default());
        assert_eq!(fade.tick(0.0), None);
        assert_eq!(fade.tick(100_000.0), None);
    }
}
