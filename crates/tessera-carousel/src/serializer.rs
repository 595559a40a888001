//! Cross-instance FIFO for video player bootstraps.
//!
//! The player library initialises through page-global hooks, so two carousels
//! bootstrapping at once can steal each other's uninitialised nodes. Every
//! bootstrap that runs after the library is loaded goes through one
//! [`InitSerializer`] shared by the whole page.
//!
//! Tickets are taken when [`InitSerializer::enqueue`] is called, not when the
//! returned future is first polled, so submission order is execution order.
//! A ticket is released when its task finishes (successfully or not) and the
//! settle frames have passed, or when its future is dropped.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::future::Future;
use std::rc::Rc;
use std::task::{Poll, Waker};

use crate::clock::FrameClock;

#[derive(Debug, Default)]
struct QueueState {
    next_ticket: u64,
    now_serving: u64,
    /// Tickets dropped before their turn came up.
    abandoned: BTreeSet<u64>,
    waiting: Vec<(u64, Waker)>,
}

impl QueueState {
    fn advance(&mut self) {
        self.now_serving += 1;
        while self.abandoned.remove(&self.now_serving) {
            self.now_serving += 1;
        }
        let serving = self.now_serving;
        let (ready, rest): (Vec<_>, Vec<_>) =
            self.waiting.drain(..).partition(|(t, _)| *t == serving);
        self.waiting = rest;
        for (_, waker) in ready {
            waker.wake();
        }
    }
}

/// Page-wide bootstrap queue. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct InitSerializer {
    state: Rc<RefCell<QueueState>>,
    settle_frames: u32,
}

struct Ticket {
    number: u64,
    state: Rc<RefCell<QueueState>>,
}

impl Ticket {
    async fn turn(&self) {
        std::future::poll_fn(|cx| {
            let mut state = self.state.borrow_mut();
            if state.now_serving == self.number {
                return Poll::Ready(());
            }
            match state.waiting.iter_mut().find(|(t, _)| *t == self.number) {
                Some((_, waker)) => waker.clone_from(cx.waker()),
                None => state.waiting.push((self.number, cx.waker().clone())),
            }
            Poll::Pending
        })
        .await
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.waiting.retain(|(t, _)| *t != self.number);
        if state.now_serving == self.number {
            state.advance();
        } else if self.number > state.now_serving {
            state.abandoned.insert(self.number);
        }
    }
}

impl InitSerializer {
    /// `settle_frames` rendering frames separate one task's completion from
    /// the next task's start.
    pub fn new(settle_frames: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(QueueState::default())),
            settle_frames,
        }
    }

    /// Queue `task`. The returned future resolves with the task's output once
    /// the task and the settle frames after it have completed.
    ///
    /// The ticket is taken immediately. Dropping the returned future gives up
    /// the place in the queue, or releases the queue if the task was running.
    pub fn enqueue<'a, C, F, Fut, T>(&self, clock: &'a C, task: F) -> impl Future<Output = T> + 'a
    where
        C: FrameClock,
        F: FnOnce() -> Fut + 'a,
        Fut: Future<Output = T> + 'a,
        T: 'a,
    {
        let ticket = {
            let mut state = self.state.borrow_mut();
            let number = state.next_ticket;
            state.next_ticket += 1;
            Ticket {
                number,
                state: self.state.clone(),
            }
        };
        let settle = self.settle_frames;
        tracing::trace!(ticket = ticket.number, "bootstrap queued");
        async move {
            ticket.turn().await;
            tracing::debug!(ticket = ticket.number, "bootstrap started");
            let output = task().await;
            clock.frames(settle).await;
            tracing::trace!(ticket = ticket.number, "bootstrap released");
            drop(ticket);
            output
        }
    }

    /// Tickets issued but not yet released.
    pub fn pending(&self) -> usize {
        let state = self.state.borrow();
        let outstanding = state.next_ticket - state.now_serving;
        outstanding as usize - state.abandoned.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }
}

impl Default for InitSerializer {
    fn default() -> Self {
        Self::new(5)
    }
}
