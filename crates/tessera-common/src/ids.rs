//! Unique DOM id generation.

use std::cell::Cell;
use std::rc::Rc;

/// Monotonic id source shared by everything decorated in one page context.
///
/// Ids look like `{prefix}-{epoch}-{counter}`. The epoch is fixed when the
/// generator is created so ids stay unique across page loads sharing storage,
/// and the counter keeps them unique within one.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    epoch: u64,
    counter: Rc<Cell<u64>>,
}

impl IdGenerator {
    pub fn new(epoch: u64) -> Self {
        Self {
            epoch,
            counter: Rc::new(Cell::new(0)),
        }
    }

    /// Generator seeded from the wall clock.
    pub fn from_clock() -> Self {
        let epoch = web_time::SystemTime::now()
            .duration_since(web_time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Self::new(epoch)
    }

    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.get() + 1;
        self.counter.set(n);
        format!("{prefix}-{}-{n}", self.epoch)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::from_clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_across_clones() {
        let ids = IdGenerator::new(42);
        let shared = ids.clone();
        assert_eq!(ids.next_id("carousel"), "carousel-42-1");
        assert_eq!(shared.next_id("carousel-video"), "carousel-video-42-2");
        assert_eq!(ids.next_id("carousel"), "carousel-42-3");
    }
}
