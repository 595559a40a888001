//! Keyboard, touch and responsive input rules.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCommand {
    Prev,
    Next,
    First,
    Last,
}

/// Container-level navigation keys.
pub fn key_command(key: &str) -> Option<KeyCommand> {
    match key {
        "ArrowLeft" | "Left" => Some(KeyCommand::Prev),
        "ArrowRight" | "Right" => Some(KeyCommand::Next),
        "Home" => Some(KeyCommand::First),
        "End" => Some(KeyCommand::Last),
        _ => None,
    }
}

/// Keys that activate arrow and dot buttons.
pub fn is_activation_key(key: &str) -> bool {
    matches!(key, "Enter" | " ")
}

/// Keys that activate a CTA link styled as a button.
pub fn is_cta_activation_key(key: &str) -> bool {
    matches!(key, " " | "Spacebar")
}

/// User signals that re-arm autoplay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    PointerDown,
    TouchStart,
    MouseDown,
    Wheel,
    KeyDown,
}

impl Interaction {
    pub fn from_event(name: &str) -> Option<Self> {
        Some(match name {
            "pointerdown" => Interaction::PointerDown,
            "touchstart" => Interaction::TouchStart,
            "mousedown" => Interaction::MouseDown,
            "wheel" => Interaction::Wheel,
            "keydown" => Interaction::KeyDown,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Finger moved left.
    Next,
    Prev,
}

/// Horizontal swipe detection between touch start and end.
#[derive(Debug, Clone)]
pub struct SwipeTracker {
    threshold: f64,
    start: Option<(f64, f64)>,
}

impl SwipeTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            start: None,
        }
    }

    pub fn start(&mut self, x: f64, y: f64) {
        self.start = Some((x, y));
    }

    /// A swipe travels further than the threshold, and further horizontally
    /// than vertically.
    pub fn end(&mut self, x: f64, y: f64) -> Option<SwipeDirection> {
        let (start_x, start_y) = self.start.take()?;
        let dx = start_x - x;
        let dy = start_y - y;
        if dx.abs() > dy.abs() && dx.abs() > self.threshold {
            Some(if dx > 0.0 {
                SwipeDirection::Next
            } else {
                SwipeDirection::Prev
            })
        } else {
            None
        }
    }
}

/// Where the pagination dots live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotsPlacement {
    Container,
    /// Inside the active slide's media wrapper.
    ActiveMedia,
}

impl DotsPlacement {
    pub fn for_width(viewport_width: f64, mobile_breakpoint: f64) -> Self {
        if viewport_width < mobile_breakpoint {
            DotsPlacement::ActiveMedia
        } else {
            DotsPlacement::Container
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_commands() {
        assert_eq!(key_command("Left"), Some(KeyCommand::Prev));
        assert_eq!(key_command("ArrowRight"), Some(KeyCommand::Next));
        assert_eq!(key_command("End"), Some(KeyCommand::Last));
        assert_eq!(key_command("Enter"), None);
        assert!(is_activation_key(" "));
        assert!(!is_activation_key("Spacebar"));
        assert!(is_cta_activation_key("Spacebar"));
        assert!(!is_cta_activation_key("Enter"));
    }

    #[test]
    fn test_swipe_rules() {
        let mut swipe = SwipeTracker::new(50.0);
        swipe.start(200.0, 100.0);
        assert_eq!(swipe.end(120.0, 110.0), Some(SwipeDirection::Next));
        swipe.start(100.0, 100.0);
        assert_eq!(swipe.end(170.0, 100.0), Some(SwipeDirection::Prev));
        // too short
        swipe.start(100.0, 100.0);
        assert_eq!(swipe.end(140.0, 100.0), None);
        // mostly vertical
        swipe.start(100.0, 100.0);
        assert_eq!(swipe.end(30.0, 200.0), None);
        // no start
        assert_eq!(swipe.end(0.0, 0.0), None);
    }

    #[test]
    fn test_dots_placement() {
        assert_eq!(DotsPlacement::for_width(799.0, 800.0), DotsPlacement::ActiveMedia);
        assert_eq!(DotsPlacement::for_width(800.0, 800.0), DotsPlacement::Container);
    }
}
