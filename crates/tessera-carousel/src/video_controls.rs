//! Play/pause button for background videos.

use tessera_common::dom::{Dom, NodeId};
use tessera_common::placeholders::{Placeholders, keys};

use crate::player::VideoPlayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCommand {
    Play,
    Pause,
}

/// What the button shows for a given state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlView {
    pub icon_class: &'static str,
    pub label_key: &'static str,
    pub label_fallback: &'static str,
    pub pressed: &'static str,
}

/// Background videos autoplay, so the button starts out as "pause".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoControlState {
    playing: bool,
}

impl Default for VideoControlState {
    fn default() -> Self {
        Self { playing: true }
    }
}

impl VideoControlState {
    pub fn is_playing(self) -> bool {
        self.playing
    }

    pub fn update(&mut self, playing: bool) {
        self.playing = playing;
    }

    pub fn view(self) -> ControlView {
        if self.playing {
            ControlView {
                icon_class: "carousel-video-control-icon carousel-video-control-pause",
                label_key: keys::PAUSE_VIDEO_ARIA_LABEL,
                label_fallback: "Pause video",
                pressed: "true",
            }
        } else {
            ControlView {
                icon_class: "carousel-video-control-icon carousel-video-control-play",
                label_key: keys::PLAY_VIDEO_ARIA_LABEL,
                label_fallback: "Play video",
                pressed: "false",
            }
        }
    }

    /// The command a click issues.
    pub fn toggle_command(self) -> VideoCommand {
        if self.playing {
            VideoCommand::Pause
        } else {
            VideoCommand::Play
        }
    }
}

/// Build `button.carousel-video-control` with its icon span. Returns
/// `(button, icon)`, both detached.
pub fn create_control_button(dom: &mut Dom, placeholders: &Placeholders) -> (NodeId, NodeId) {
    let button = dom.create_element("button");
    dom.add_class(button, "carousel-video-control");
    dom.set_attr(button, "type", "button");
    dom.set_attr(
        button,
        "aria-label",
        placeholders.get_or(keys::PAUSE_VIDEO_ARIA_LABEL, "Pause video"),
    );
    dom.set_attr(button, "aria-pressed", "false");

    let icon = dom.create_element("span");
    dom.set_attr(
        icon,
        "class",
        "carousel-video-control-icon carousel-video-control-pause",
    );
    dom.set_attr(icon, "aria-hidden", "true");
    dom.append_child(button, icon);
    (button, icon)
}

pub fn apply_view(
    dom: &mut Dom,
    button: NodeId,
    icon: NodeId,
    state: VideoControlState,
    placeholders: &Placeholders,
) {
    let view = state.view();
    dom.set_attr(icon, "class", view.icon_class);
    dom.set_attr(
        button,
        "aria-label",
        placeholders.get_or(view.label_key, view.label_fallback),
    );
    dom.set_attr(button, "aria-pressed", view.pressed);
}

/// Issue `command`. Player failures are logged and otherwise ignored.
pub fn run_command(player: &dyn VideoPlayer, command: VideoCommand) {
    let result = match command {
        VideoCommand::Play => player.play(),
        VideoCommand::Pause => player.pause(),
    };
    if let Err(error) = result {
        tracing::warn!(?command, %error, "video control failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_views_and_toggle() {
        let mut state = VideoControlState::default();
        assert!(state.is_playing());
        assert_eq!(state.toggle_command(), VideoCommand::Pause);
        assert_eq!(state.view().label_fallback, "Pause video");
        state.update(false);
        assert_eq!(state.toggle_command(), VideoCommand::Play);
        assert_eq!(state.view().pressed, "false");
        assert!(state.view().icon_class.ends_with("carousel-video-control-play"));
    }

    #[test]
    fn test_button_markup_follows_state() {
        let mut dom = Dom::new();
        let placeholders = Placeholders::new().with(keys::PLAY_VIDEO_ARIA_LABEL, "Wiedergeben");
        let (button, icon) = create_control_button(&mut dom, &placeholders);
        insta::assert_snapshot!(dom.outer_html(button), @r#"<button class="carousel-video-control" type="button" aria-label="Pause video" aria-pressed="false"><span class="carousel-video-control-icon carousel-video-control-pause" aria-hidden="true"></span></button>"#);

        let mut state = VideoControlState::default();
        state.update(false);
        apply_view(&mut dom, button, icon, state, &placeholders);
        assert_eq!(dom.attr(button, "aria-label"), Some("Wiedergeben"));
        assert_eq!(dom.attr(button, "aria-pressed"), Some("false"));
        assert!(dom.has_class(icon, "carousel-video-control-play"));
    }
}
