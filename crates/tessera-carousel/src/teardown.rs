//! Composable cleanup.

use std::fmt;

/// Cleanup steps owned by one behaviour.
///
/// Steps run in reverse registration order, either through [`Teardown::run`]
/// or when the value is dropped. A parent absorbs its children with
/// [`Teardown::extend`], so releasing the parent releases everything.
#[derive(Default)]
#[must_use = "dropping a Teardown runs it immediately"]
pub struct Teardown {
    steps: Vec<Box<dyn FnOnce()>>,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fn(step: impl FnOnce() + 'static) -> Self {
        let mut teardown = Self::new();
        teardown.add(step);
        teardown
    }

    pub fn add(&mut self, step: impl FnOnce() + 'static) {
        self.steps.push(Box::new(step));
    }

    /// Take over `child`'s steps. They run before anything registered
    /// earlier on `self`.
    pub fn extend(&mut self, mut child: Teardown) {
        self.steps.append(&mut child.steps);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step now. Later calls are no-ops.
    pub fn run(&mut self) {
        while let Some(step) = self.steps.pop() {
            step();
        }
    }
}

impl Drop for Teardown {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for Teardown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Teardown")
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_runs_in_reverse_and_once() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut parent = Teardown::new();
        let l = log.clone();
        parent.add(move || l.borrow_mut().push("parent"));

        let mut child = Teardown::new();
        let l = log.clone();
        child.add(move || l.borrow_mut().push("child a"));
        let l = log.clone();
        child.add(move || l.borrow_mut().push("child b"));
        parent.extend(child);

        parent.run();
        parent.run();
        assert_eq!(*log.borrow(), vec!["child b", "child a", "parent"]);
    }

    #[test]
    fn test_drop_runs_steps() {
        let hit = Rc::new(RefCell::new(false));
        let h = hit.clone();
        drop(Teardown::from_fn(move || *h.borrow_mut() = true));
        assert!(*hit.borrow());
    }
}
