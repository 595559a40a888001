//! Active-slide state and screen-reader announcements.
//!
//! [`Navigator`] decides; the carousel applies its decisions to the DOM.
//! Announcements are only written while the user is interacting with this
//! carousel (focus within, or pointer over it), so several carousels on one
//! page never talk over each other. Within an interaction a slide is not
//! announced twice in a row unless the caller forces it.

/// Frames a deferred announcement waits so layout and paint have settled.
const ANNOUNCE_DELAY_FRAMES: u8 = 2;
/// Frames a pointer-leave waits before it is trusted.
const POINTER_LEAVE_FRAMES: u8 = 1;

/// `((k % n) + n) % n`.
pub fn wrap_index(k: isize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    k.rem_euclid(n as isize) as usize
}

/// How a slide change came about, as reported to analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    Prev,
    Next,
    Dot,
    Swipe,
    Auto,
}

impl NavigationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            NavigationAction::Prev => "prev",
            NavigationAction::Next => "next",
            NavigationAction::Dot => "dot",
            NavigationAction::Swipe => "swipe",
            NavigationAction::Auto => "auto",
        }
    }

    /// Autoplay advances are not user initiated.
    pub fn is_user_initiated(self) -> bool {
        self != NavigationAction::Auto
    }
}

/// A change of active slide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingAnnouncement {
    slide: usize,
    force: bool,
    frames: u8,
}

/// What a frame resolved to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavFrame {
    /// Slide whose announcement should be written now.
    pub announce: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    len: usize,
    active: usize,
    interacting: bool,
    has_focus: bool,
    last_announced: Option<usize>,
    pending: Option<PendingAnnouncement>,
    pointer_leave: Option<u8>,
}

impl Navigator {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            active: 0,
            interacting: false,
            has_focus: false,
            last_announced: None,
            pending: None,
            pointer_leave: None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    pub fn last_announced(&self) -> Option<usize> {
        self.last_announced
    }

    /// Select slide `k`, wrapping in both directions.
    pub fn select(&mut self, k: isize) -> Option<Transition> {
        if self.len == 0 {
            return None;
        }
        let to = wrap_index(k, self.len);
        let from = self.active;
        self.active = to;
        Some(Transition { from, to })
    }

    pub fn offset(&self, delta: isize) -> isize {
        self.active as isize + delta
    }

    /// Slides whose media should be ready when `index` is shown.
    pub fn neighbourhood(&self, index: usize) -> [usize; 3] {
        let i = index as isize;
        [
            index,
            wrap_index(i - 1, self.len),
            wrap_index(i + 1, self.len),
        ]
    }

    /// Decide whether `slide` is announced right now. Returns the slide when
    /// the caller should write its announcement.
    pub fn announce(&mut self, slide: usize, force: bool) -> Option<usize> {
        if !self.interacting {
            return None;
        }
        if !force && self.last_announced == Some(slide) {
            return None;
        }
        self.last_announced = Some(slide);
        Some(slide)
    }

    /// Announce `slide` after the deferral frames, replacing anything pending.
    pub fn schedule(&mut self, slide: usize, force: bool) {
        self.pending = Some(PendingAnnouncement {
            slide,
            force,
            frames: ANNOUNCE_DELAY_FRAMES,
        });
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn focus_in(&mut self) {
        self.has_focus = true;
        self.interacting = true;
        self.schedule(self.active, false);
    }

    /// Focus moved. Returns `true` when it left the carousel entirely and
    /// the live region should be cleared.
    pub fn focus_out(&mut self, still_inside: bool) -> bool {
        if still_inside {
            return false;
        }
        self.has_focus = false;
        self.interacting = false;
        self.last_announced = None;
        self.pending = None;
        self.pointer_leave = None;
        true
    }

    pub fn pointer_enter(&mut self) {
        self.interacting = true;
        self.pointer_leave = None;
        self.schedule(self.active, false);
    }

    pub fn pointer_leave(&mut self) {
        self.pointer_leave = Some(POINTER_LEAVE_FRAMES);
    }

    /// Pointer moved over `slide`: while interacting, announce it without
    /// changing the active slide.
    pub fn hover(&mut self, slide: usize) {
        if self.interacting && slide < self.len {
            self.schedule(slide, false);
        }
    }

    pub fn needs_frame(&self) -> bool {
        self.pending.is_some() || self.pointer_leave.is_some()
    }

    pub fn on_frame(&mut self) -> NavFrame {
        if let Some(frames) = self.pointer_leave.as_mut() {
            *frames -= 1;
            if *frames == 0 {
                self.pointer_leave = None;
                if !self.has_focus {
                    self.interacting = false;
                    self.last_announced = None;
                }
            }
        }

        let mut frame = NavFrame::default();
        if let Some(pending) = self.pending.as_mut() {
            pending.frames -= 1;
            if pending.frames == 0 {
                let PendingAnnouncement { slide, force, .. } = *pending;
                self.pending = None;
                frame.announce = self.announce(slide, force);
            }
        }
        frame
    }

    /// Drop pending work.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.pointer_leave = None;
    }
}
