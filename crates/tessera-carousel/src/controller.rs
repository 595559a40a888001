//! Runtime behaviour of a decorated [`Carousel`].
//!
//! Every handler takes event targets as [`NodeId`]s of the carousel's DOM.
//! Handlers that return `bool` report whether the host should call
//! `preventDefault` on the event.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;
use tessera_common::analytics::{InteractionEvent, sanitize_url_for_analytics};
use tessera_common::config::CarouselSettings;
use tessera_common::dom::NodeId;

use crate::carousel::{Behaviour, Carousel, CtaGate, Effect, FrameInput, Standard, place_dots};
use crate::clock::FrameClock;
use crate::gallery::{Gallery, GalleryDirection, TrackMetrics};
use crate::input::{
    DotsPlacement, Interaction, KeyCommand, SwipeDirection, is_activation_key,
    is_cta_activation_key, key_command,
};
use crate::media::{load_slide_media, media_label};
use crate::navigation::{NavigationAction, Transition};
use crate::player::{BootstrapRequest, PlayerEvent, PlayerHost, PlayerWait, VideoPlayer, bootstrap_player};
use crate::render::{announcement, set_style};
use crate::scroll::ScrollAction;
use crate::serializer::InitSerializer;
use crate::slide::Slide;
use crate::teardown::Teardown;
use crate::video_controls::{VideoCommand, apply_view};

/// Which button of the standard controls an event landed on.
enum ControlHit {
    Prev,
    Next,
    Dot(usize),
}

impl Carousel {
    /// Advance one animation frame.
    pub fn on_frame(&mut self, input: &FrameInput) {
        if self.destroyed {
            return;
        }
        let resized = std::mem::take(&mut self.resize_pending);
        match self.behaviour {
            Behaviour::Standard(_) => self.standard_frame(input, resized),
            Behaviour::Gallery { .. } => self.gallery_frame(&input.track, resized),
            Behaviour::Crossfade(_) => self.crossfade_frame(input.now),
        }
    }

    /// A click anywhere in the carousel.
    pub fn click(&mut self, target: NodeId, track: &TrackMetrics) -> bool {
        if self.destroyed {
            return false;
        }
        self.track_cta_click(target);

        if let Behaviour::Gallery { gallery, arrows } = &mut self.behaviour {
            let direction = if self.dom.contains(arrows.prev, target) {
                GalleryDirection::Prev
            } else if self.dom.contains(arrows.next, target) {
                GalleryDirection::Next
            } else {
                return false;
            };
            let Some(step) = gallery.step(direction, track) else {
                return true;
            };
            let action = match direction {
                GalleryDirection::Prev => NavigationAction::Prev,
                GalleryDirection::Next => NavigationAction::Next,
            };
            self.track_slide_index(action, step.target, String::new());
            self.effects.push(Effect::ScrollTrackBy {
                left: step.scroll_by,
            });
            return true;
        }

        let Some((hit, button)) = self.control_hit(target) else {
            return false;
        };
        self.activate(hit);
        self.effects.push(Effect::Blur(button));
        false
    }

    /// A keydown anywhere in the carousel.
    pub fn key_down(&mut self, target: NodeId, key: &str, now: f64) -> bool {
        if self.destroyed {
            return false;
        }
        let mut prevent = false;
        if is_cta_activation_key(key)
            && let Some(cta) = self.slides.iter().find_map(|s| s.cta_node.filter(|c| *c == target))
        {
            self.effects.push(Effect::Click(cta));
            prevent = true;
        }

        if self.controls().is_none() {
            return prevent;
        }
        self.interaction(Interaction::KeyDown, now);

        if is_activation_key(key)
            && let Some((hit, _)) = self.control_hit(target)
        {
            self.activate(hit);
            return true;
        }

        let Some(command) = key_command(key) else {
            return prevent;
        };
        let len = self.slides.len() as isize;
        match command {
            KeyCommand::Prev => self.step(-1, NavigationAction::Prev),
            KeyCommand::Next => self.step(1, NavigationAction::Next),
            KeyCommand::First => self.go_to(0, NavigationAction::Dot),
            KeyCommand::Last => self.go_to(len - 1, NavigationAction::Dot),
        }
        true
    }

    /// Pointer, touch, wheel or key activity that re-arms autoplay.
    pub fn interaction(&mut self, kind: Interaction, now: f64) {
        if let Some(standard) = self.standard_mut()
            && standard.controls.is_some()
        {
            tracing::trace!(?kind, "autoplay reset");
            standard.autoplay.reset(now);
        }
    }

    pub fn focus_in(&mut self) {
        if let Some(standard) = self.navigable_mut() {
            standard.nav.focus_in();
        }
    }

    /// Focus left an element. `still_inside` tells whether it moved to
    /// another element of the carousel.
    pub fn focus_out(&mut self, still_inside: bool) {
        let cleared = self
            .navigable_mut()
            .is_some_and(|standard| standard.nav.focus_out(still_inside));
        if cleared && let Some(region) = self.live_region() {
            self.dom.set_text(region, "");
        }
    }

    pub fn pointer_enter(&mut self) {
        if let Some(standard) = self.navigable_mut() {
            standard.nav.pointer_enter();
        }
    }

    pub fn pointer_leave(&mut self) {
        if let Some(standard) = self.navigable_mut() {
            standard.nav.pointer_leave();
        }
    }

    /// The pointer moved over `target`.
    pub fn pointer_over(&mut self, target: NodeId) {
        let Some(index) = self.slide_containing(target) else {
            return;
        };
        if let Some(standard) = self.navigable_mut() {
            standard.nav.hover(index);
        }
    }

    pub fn touch_start(&mut self, x: f64, y: f64) {
        if let Some(swipe) = self.standard_mut().and_then(|s| s.swipe.as_mut()) {
            swipe.start(x, y);
        }
    }

    pub fn touch_end(&mut self, x: f64, y: f64) {
        let direction = self
            .standard_mut()
            .and_then(|s| s.swipe.as_mut())
            .and_then(|swipe| swipe.end(x, y));
        match direction {
            Some(SwipeDirection::Next) => self.step(1, NavigationAction::Swipe),
            Some(SwipeDirection::Prev) => self.step(-1, NavigationAction::Swipe),
            None => {}
        }
    }

    /// Window scroll. Checked on the next frame.
    pub fn scroll(&mut self) {
        if let Some(standard) = self.standard_mut() {
            standard.scroll.on_scroll();
        }
    }

    /// Window or track resize. Handled on the next frame.
    pub fn resize(&mut self) {
        self.resize_pending = true;
    }

    /// A CSS transition ended on `target`.
    pub fn transition_end(&mut self, target: NodeId, property: &str, now: f64) {
        let block = self.block;
        if let Behaviour::Standard(standard) = &mut self.behaviour {
            if target == block && standard.scroll.on_transition_end(property) {
                tracing::debug!(property, "carousel collapse finished");
            }
            if property == "opacity" && standard.cta_gate == Some(CtaGate::Transition(target)) {
                standard.cta_gate = None;
                standard.autoplay.reset(now);
            }
            return;
        }

        let Some(index) = self.slide_containing(target) else {
            return;
        };
        let element = self.slides[index].element;
        if let Behaviour::Crossfade(crossfade) = &mut self.behaviour
            && crossfade.transition_end(index)
        {
            self.dom.remove_class(element, "is-fading-out");
        }
    }

    /// Gallery track scrolled. Without `scrollend` support the carousel
    /// watches for the position to settle.
    pub fn gallery_scroll(&mut self, track: &TrackMetrics, has_scroll_end: bool) {
        if let Behaviour::Gallery { gallery, .. } = &mut self.behaviour {
            gallery.on_scroll(track, has_scroll_end);
        }
    }

    pub fn gallery_scroll_end(&mut self, track: &TrackMetrics) {
        let landed = match &mut self.behaviour {
            Behaviour::Gallery { gallery, .. } => gallery.scroll_end(track),
            _ => None,
        };
        if let Some(index) = landed {
            self.track_slide_index(NavigationAction::Swipe, index, String::new());
        }
    }

    /// Horizontal wheel gestures over the gallery are swallowed.
    pub fn gallery_wheel(&self, dx: f64, dy: f64, shift: bool) -> bool {
        matches!(self.behaviour, Behaviour::Gallery { .. })
            && Gallery::wheel_should_prevent(dx, dy, shift)
    }

    /// The command a click on a video control issues, with the player to
    /// issue it to. The host runs it with
    /// [`run_command`](crate::video_controls::run_command) after releasing
    /// its borrow of the carousel, since players may report state changes
    /// synchronously.
    pub fn video_command(&self, target: NodeId) -> Option<(Rc<dyn VideoPlayer>, VideoCommand)> {
        if self.destroyed {
            return None;
        }
        let (index, control) = self.slides.iter().enumerate().find_map(|(i, slide)| {
            slide
                .control
                .as_ref()
                .filter(|c| c.wired && self.dom.contains(c.button, target))
                .map(|c| (i, c))
        })?;
        let player = self.players.get(&index)?.clone();
        Some((player, control.state.toggle_command()))
    }

    /// Go to slide `k`, wrapping in both directions.
    pub fn go_to(&mut self, k: isize, action: NavigationAction) {
        let Some(standard) = self.standard_mut() else {
            return;
        };
        let Some(Transition { from, to }) = standard.nav.select(k) else {
            return;
        };
        let neighbourhood = standard.nav.neighbourhood(to);
        for index in neighbourhood {
            self.load_media(index);
        }

        if let Some(previous) = self.slides.get(from) {
            self.dom.remove_class(previous.element, "is-active");
            self.dom.set_attr(previous.element, "aria-hidden", "true");
        }
        if let Some(target) = self.slides.get(to) {
            self.dom.add_class(target.element, "is-active");
            self.dom.set_attr(target.element, "aria-hidden", "false");
        }
        self.update_controls(to);

        let announce = self
            .standard_mut()
            .and_then(|s| s.nav.announce(to, action.is_user_initiated()));
        if let Some(index) = announce {
            self.write_announcement(index);
        }
        let title = self
            .slides
            .get(to)
            .map(|slide| slide_title(&self.dom, slide))
            .unwrap_or_default();
        self.track_slide_index(action, to, title);
    }

    fn step(&mut self, delta: isize, action: NavigationAction) {
        if let Some(k) = self.standard_mut().map(|s| s.nav.offset(delta)) {
            self.go_to(k, action);
        }
    }

    fn activate(&mut self, hit: ControlHit) {
        match hit {
            ControlHit::Prev => self.step(-1, NavigationAction::Prev),
            ControlHit::Next => self.step(1, NavigationAction::Next),
            ControlHit::Dot(index) => self.go_to(index as isize, NavigationAction::Dot),
        }
    }

    fn control_hit(&self, target: NodeId) -> Option<(ControlHit, NodeId)> {
        let controls = self.controls()?;
        let arrows = controls.arrows;
        if self.dom.contains(arrows.prev, target) {
            return Some((ControlHit::Prev, arrows.prev));
        }
        if self.dom.contains(arrows.next, target) {
            return Some((ControlHit::Next, arrows.next));
        }
        controls
            .dots
            .buttons
            .iter()
            .position(|dot| self.dom.contains(*dot, target))
            .map(|i| (ControlHit::Dot(i), controls.dots.buttons[i]))
    }

    fn standard_mut(&mut self) -> Option<&mut Standard> {
        match &mut self.behaviour {
            Behaviour::Standard(standard) => Some(standard),
            _ => None,
        }
    }

    /// Standard behaviour with navigation controls.
    fn navigable_mut(&mut self) -> Option<&mut Standard> {
        self.standard_mut().filter(|s| s.controls.is_some())
    }

    fn slide_containing(&self, target: NodeId) -> Option<usize> {
        self.slides
            .iter()
            .position(|slide| self.dom.contains(slide.element, target))
    }

    fn load_media(&mut self, index: usize) {
        let Some(slide) = self.slides.get_mut(index) else {
            return;
        };
        if let Some(request) = load_slide_media(&mut self.dom, slide, &self.id) {
            self.queue_bootstrap(request);
        }
    }

    /// Dots follow the active slide, arrows are re-enabled.
    fn update_controls(&mut self, active: usize) {
        let Behaviour::Standard(standard) = &self.behaviour else {
            return;
        };
        let Some(controls) = &standard.controls else {
            return;
        };
        place_dots(&mut self.dom, controls, self.ui.container, self.slides.get(active));
        for (i, dot) in controls.dots.buttons.iter().enumerate() {
            self.dom.toggle_class(*dot, "is-active", i == active);
        }
        self.dom.remove_attr(controls.arrows.prev, "disabled");
        self.dom.remove_attr(controls.arrows.next, "disabled");
    }

    fn write_announcement(&mut self, index: usize) {
        let Some(region) = self.live_region() else {
            return;
        };
        let Some(slide) = self.slides.get(index) else {
            return;
        };
        let label = media_label(&self.dom, slide);
        let text = announcement(&self.placeholders, index, self.slides.len(), label.as_deref());
        self.dom.set_text(region, &text);
    }

    fn track_slide_index(&self, action: NavigationAction, index: usize, title: String) {
        self.track(
            "carousel-slide",
            json!({
                "navigationAction": action.as_str(),
                "currentSlide": index,
                "slideTitle": title,
                "totalSlides": self.slides.len(),
            }),
        );
    }

    fn track_cta_click(&self, target: NodeId) {
        let Some((slide, cta)) = self.slides.iter().find_map(|slide| {
            slide
                .cta_node
                .filter(|cta| self.dom.contains(*cta, target))
                .map(|cta| (slide, cta))
        }) else {
            return;
        };
        let text = self.dom.text_content(cta).trim().to_owned();
        let href = sanitize_url_for_analytics(
            self.dom.attr(cta, "href").unwrap_or_default(),
            &self.env.origin,
        );
        self.tracker.track(
            InteractionEvent::new("carousel-cta-click", "carousel")
                .id(self.id.clone())
                .text(text.clone())
                .href(href)
                .data(json!({
                    "slideIndex": slide.slide_index,
                    "ctaText": text,
                    "totalSlides": slide.total_slides,
                })),
        );
    }

    fn standard_frame(&mut self, input: &FrameInput, resized: bool) {
        let now = input.now;
        let Some(standard) = self.standard_mut() else {
            return;
        };
        let frame = standard.nav.on_frame();
        let reactivate = standard.reactivate.take();
        if let Some(CtaGate::Until(deadline)) = standard.cta_gate
            && now >= deadline
        {
            standard.cta_gate = None;
            standard.autoplay.reset(now);
        }
        let scroll = standard.scroll.on_frame(&input.scroll, now);
        let advance = standard.autoplay.tick(now);

        if let Some(index) = frame.announce {
            self.write_announcement(index);
        }
        if resized {
            self.update_dots_placement(input.viewport_width);
        }
        if let Some(index) = reactivate {
            self.reactivate(index, now);
        }
        match scroll {
            Some(ScrollAction::Expand) => self.expand(now),
            Some(ScrollAction::Collapse) => {
                tracing::debug!(id = %self.id, "carousel collapsing");
                self.dom.remove_class(self.block, "carousel-expanded");
            }
            None => {}
        }
        if advance {
            self.step(1, NavigationAction::Auto);
        }
    }

    fn update_dots_placement(&mut self, viewport_width: f64) {
        let breakpoint = self.settings.mobile_breakpoint_px;
        let active = self.active_index();
        let Behaviour::Standard(standard) = &mut self.behaviour else {
            return;
        };
        let Some(controls) = standard.controls.as_mut() else {
            return;
        };
        let placement = DotsPlacement::for_width(viewport_width, breakpoint);
        if placement == controls.placement {
            return;
        }
        controls.placement = placement;
        place_dots(&mut self.dom, controls, self.ui.container, self.slides.get(active));
    }

    /// Scroll expansion: only the active slide stays shown. A slide that was
    /// not active replays its entrance on the next frame.
    fn expand(&mut self, now: f64) {
        let Some(standard) = self.standard_mut() else {
            return;
        };
        let expanded = standard.scroll.is_expanded();
        let active = standard.nav.active();
        tracing::debug!(id = %self.id, expanded, active, "carousel animations started");
        if expanded {
            self.dom.add_class(self.block, "carousel-expanded");
        }
        let Some(current) = self.slides.get(active).map(|s| s.element) else {
            return;
        };
        for slide in &self.slides {
            if slide.element != current {
                self.dom.remove_class(slide.element, "is-active");
                self.dom.set_attr(slide.element, "aria-hidden", "true");
            }
        }

        let already_active = self.dom.has_class(current, "is-active");
        if already_active {
            self.dom.set_attr(current, "aria-hidden", "false");
        }
        let multi = self.slides.len() > 1;
        let Some(standard) = self.standard_mut() else {
            return;
        };
        if !already_active {
            standard.reactivate = Some(active);
        } else if multi {
            standard.autoplay.reset(now);
        }
    }

    fn reactivate(&mut self, index: usize, now: f64) {
        let Some(slide) = self.slides.get(index) else {
            return;
        };
        let (element, cta) = (slide.element, slide.cta_node);
        self.dom.add_class(element, "is-active");
        self.dom.set_attr(element, "aria-hidden", "false");
        let multi = self.slides.len() > 1;
        let delay = self.settings.cta_animation_ms;
        if let Some(standard) = self.standard_mut()
            && multi
        {
            standard.cta_gate = Some(match cta {
                Some(cta) => CtaGate::Transition(cta),
                None => CtaGate::Until(now + delay),
            });
        }
    }

    fn gallery_frame(&mut self, track: &TrackMetrics, resized: bool) {
        let Behaviour::Gallery { gallery, arrows } = &mut self.behaviour else {
            return;
        };
        if resized {
            gallery.on_resize(track);
        }
        let arrows = *arrows;
        let (buttons, swipe) = gallery.on_frame(track);
        if let Some(states) = buttons {
            for (button, disabled) in [
                (arrows.prev, states.prev_disabled),
                (arrows.next, states.next_disabled),
            ] {
                if disabled {
                    self.dom.set_attr(button, "disabled", "");
                } else {
                    self.dom.remove_attr(button, "disabled");
                }
                set_style(
                    &mut self.dom,
                    button,
                    "opacity",
                    Some(if disabled { "0.2" } else { "1" }),
                );
            }
        }
        if let Some(index) = swipe {
            self.track_slide_index(NavigationAction::Swipe, index, String::new());
        }
    }

    fn crossfade_frame(&mut self, now: f64) {
        let Behaviour::Crossfade(crossfade) = &mut self.behaviour else {
            return;
        };
        let expired = crossfade.expire(now);
        let step = crossfade.tick(now);
        for index in expired {
            if let Some(slide) = self.slides.get(index) {
                self.dom.remove_class(slide.element, "is-fading-out");
            }
        }
        if let Some(step) = step {
            tracing::trace!(from = step.from, to = step.to, "crossfade");
            if let Some(from) = self.slides.get(step.from) {
                self.dom.remove_class(from.element, "is-active");
                self.dom.add_class(from.element, "is-fading-out");
            }
            if let Some(to) = self.slides.get(step.to) {
                self.dom.add_class(to.element, "is-active");
            }
        }
    }

    /// Reflect a player's play state on the slide's control button.
    pub(crate) fn set_video_playing(&mut self, slide: usize, playing: bool) {
        let Some(control) = self.slides.get_mut(slide).and_then(|s| s.control.as_mut()) else {
            return;
        };
        control.state.update(playing);
        apply_view(
            &mut self.dom,
            control.button,
            control.icon,
            control.state,
            &self.placeholders,
        );
    }

    /// The player never showed up: the control button goes away.
    pub(crate) fn remove_video_control(&mut self, slide: usize) {
        if let Some(control) = self.slides.get_mut(slide).and_then(|s| s.control.take()) {
            self.dom.detach(control.button);
        }
    }
}

/// `.carousel-title` text, else the slide's aria-label.
fn slide_title(dom: &tessera_common::dom::Dom, slide: &Slide) -> String {
    dom.find_class(slide.element, "carousel-title")
        .map(|title| dom.text_content(title).trim().to_owned())
        .filter(|title| !title.is_empty())
        .or_else(|| {
            dom.attr(slide.element, "aria-label")
                .map(|label| label.trim().to_owned())
        })
        .unwrap_or_default()
}

/// Bootstrap the player `request` asks for and wire it to the slide's
/// control button.
///
/// The carousel is only borrowed between awaits. When it was destroyed in
/// the meantime the player subscriptions are released right away.
pub async fn start_video<H, C>(
    carousel: &Rc<RefCell<Carousel>>,
    host: &H,
    clock: &C,
    serializer: &InitSerializer,
    request: BootstrapRequest,
    settings: &CarouselSettings,
) where
    H: PlayerHost,
    C: FrameClock,
{
    let wait = bootstrap_player(host, clock, serializer, &request, settings).await;
    match wait {
        PlayerWait::Found(player) => attach_player(carousel, request.slide_index, player),
        PlayerWait::TimedOut => {
            tracing::warn!(video_id = %request.video_id, "video player never became ready");
            match carousel.try_borrow_mut() {
                Ok(mut carousel) => carousel.remove_video_control(request.slide_index),
                Err(_) => tracing::warn!("carousel busy, video control left in place"),
            }
        }
    }
}

fn attach_player<P: VideoPlayer + 'static>(carousel: &Rc<RefCell<Carousel>>, slide: usize, player: P) {
    let player: Rc<dyn VideoPlayer> = Rc::new(player);
    let playing = match player.paused() {
        Ok(paused) => !paused,
        Err(error) => {
            // background videos autoplay
            tracing::warn!(%error, "could not read initial player state");
            true
        }
    };

    let mut subscriptions = Teardown::new();
    for (event, playing) in [(PlayerEvent::Play, true), (PlayerEvent::Pause, false)] {
        let weak = Rc::downgrade(carousel);
        subscriptions.extend(player.on(
            event,
            Box::new(move || {
                let Some(carousel) = weak.upgrade() else {
                    return;
                };
                match carousel.try_borrow_mut() {
                    Ok(mut carousel) => carousel.set_video_playing(slide, playing),
                    Err(_) => tracing::trace!(event = event.as_str(), "carousel busy, state dropped"),
                };
            }),
        ));
    }

    let Ok(mut carousel) = carousel.try_borrow_mut() else {
        tracing::warn!("carousel busy, video control not wired");
        return;
    };
    if carousel.destroyed {
        return;
    }
    carousel.set_video_playing(slide, playing);
    let Some(control) = carousel.slides.get_mut(slide).and_then(|s| s.control.as_mut()) else {
        return;
    };
    control.wired = true;
    carousel.players.insert(slide, player);
    carousel.add_teardown(subscriptions);
    tracing::debug!(slide, "video control wired");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carousel::{DecorateContext, Environment};
    use crate::scroll::ScrollMetrics;
    use tessera_common::analytics::MemoryTracker;
    use tessera_common::dom::Dom;
    use tessera_common::ids::IdGenerator;
    use tessera_common::placeholders::Placeholders;

    use pretty_assertions::assert_eq;

    fn row(title: &str, cta: bool) -> String {
        let cta = if cta {
            r#"<div><div>cta-link</div><div>/shop?token=abc</div></div><div><div>cta-text</div><div>Shop now</div></div>"#
        } else {
            ""
        };
        format!(
            r#"<div><div><div>mediaImage</div><div><picture><img src="/{title}.jpg" alt="{title} alt"></picture></div></div><div><div>title</div><div>{title}</div></div>{cta}</div>"#
        )
    }

    async fn decorate_with(html: &str, env: Environment, tracker: &MemoryTracker) -> Carousel {
        let (dom, block) = Dom::from_fragment("div", html);
        let settings = CarouselSettings::default();
        let ids = IdGenerator::new(3);
        let ctx = DecorateContext {
            settings: &settings,
            env,
            ids: &ids,
            metadata: &(),
            placeholders: &Placeholders::new(),
            tracker: Rc::new(tracker.clone()),
        };
        Carousel::decorate(dom, block, ctx).await.unwrap()
    }

    fn desktop() -> Environment {
        Environment {
            viewport_width: 1280.0,
            origin: "https://example.com".into(),
            ..Default::default()
        }
    }

    async fn three(tracker: &MemoryTracker) -> Carousel {
        let html = [row("One", true), row("Two", false), row("Three", false)].concat();
        decorate_with(&html, desktop(), tracker).await
    }

    fn frame(now: f64) -> FrameInput {
        FrameInput {
            now,
            viewport_width: 1280.0,
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_arrows_wrap_and_track() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let arrows = carousel.arrows().unwrap();
        carousel.take_patches();

        assert!(!carousel.click(arrows.prev, &TrackMetrics::default()));
        assert_eq!(carousel.active_index(), 2);
        assert_eq!(carousel.take_effects(), vec![Effect::Blur(arrows.prev)]);
        let slides = carousel.slides();
        assert!(carousel.dom().has_class(slides[2].element, "is-active"));
        assert!(!carousel.dom().has_class(slides[0].element, "is-active"));
        assert_eq!(carousel.dom().attr(slides[0].element, "aria-hidden"), Some("true"));
        assert!(!carousel.take_patches().is_empty());

        let events = tracker.named("carousel-slide");
        assert_eq!(
            events[0].additional_data,
            json!({
                "navigationAction": "prev",
                "currentSlide": 2,
                "slideTitle": "Three",
                "totalSlides": 3,
            })
        );

        carousel.click(arrows.next, &TrackMetrics::default());
        carousel.click(arrows.next, &TrackMetrics::default());
        assert_eq!(carousel.active_index(), 1);
        let dots = carousel.dots().unwrap().clone();
        assert!(carousel.dom().has_class(dots.buttons[1], "is-active"));
        assert!(!carousel.dom().has_class(dots.buttons[0], "is-active"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_keyboard_navigation() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let container = carousel.ui().container;

        assert!(carousel.key_down(container, "End", 0.0));
        assert_eq!(carousel.active_index(), 2);
        assert!(carousel.key_down(container, "ArrowRight", 0.0));
        assert_eq!(carousel.active_index(), 0);
        assert!(carousel.key_down(container, "Left", 0.0));
        assert_eq!(carousel.active_index(), 2);
        assert!(carousel.key_down(container, "Home", 0.0));
        assert_eq!(carousel.active_index(), 0);
        assert!(!carousel.key_down(container, "a", 0.0));

        let dot = carousel.dots().unwrap().buttons[1];
        assert!(carousel.key_down(dot, "Enter", 0.0));
        assert_eq!(carousel.active_index(), 1);

        let actions: Vec<_> = tracker
            .named("carousel-slide")
            .into_iter()
            .map(|e| e.additional_data["navigationAction"].as_str().unwrap_or_default().to_owned())
            .collect();
        assert_eq!(actions, ["dot", "next", "prev", "dot", "dot"]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_keydown_rearms_autoplay() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        assert!(!carousel.is_autoplay_armed());
        carousel.key_down(carousel.ui().container, "Tab", 100.0);
        assert!(carousel.is_autoplay_armed());

        carousel.on_frame(&frame(5000.0));
        assert_eq!(carousel.active_index(), 0);
        carousel.on_frame(&frame(5100.0));
        assert_eq!(carousel.active_index(), 1);
        let auto = tracker.named("carousel-slide");
        assert_eq!(auto[0].additional_data["navigationAction"], "auto");
        // not interacting, so nothing is announced
        assert_eq!(carousel.announcement(), "");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_announcements_follow_interaction() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let arrows = carousel.arrows().unwrap();

        carousel.click(arrows.next, &TrackMetrics::default());
        assert_eq!(carousel.announcement(), "");

        carousel.focus_in();
        carousel.on_frame(&frame(0.0));
        carousel.on_frame(&frame(16.0));
        assert_eq!(carousel.announcement(), "Slide 2 of 3, Two alt");

        carousel.click(arrows.next, &TrackMetrics::default());
        assert_eq!(carousel.announcement(), "Slide 3 of 3, Three alt");

        carousel.focus_out(true);
        assert_eq!(carousel.announcement(), "Slide 3 of 3, Three alt");
        carousel.focus_out(false);
        assert_eq!(carousel.announcement(), "");
        assert!(!carousel.is_interacting());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hover_announces_without_navigating() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let third = carousel.slides()[2].element;

        carousel.pointer_over(third);
        carousel.on_frame(&frame(0.0));
        carousel.on_frame(&frame(16.0));
        assert_eq!(carousel.announcement(), "");

        carousel.pointer_enter();
        carousel.pointer_over(third);
        carousel.on_frame(&frame(32.0));
        carousel.on_frame(&frame(48.0));
        assert_eq!(carousel.announcement(), "Slide 3 of 3, Three alt");
        assert_eq!(carousel.active_index(), 0);

        carousel.pointer_leave();
        carousel.on_frame(&frame(64.0));
        assert!(!carousel.is_interacting());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_swipe_only_on_narrow_viewports() {
        let tracker = MemoryTracker::new();
        let html = [row("One", false), row("Two", false)].concat();
        let mut wide = decorate_with(&html, desktop(), &tracker).await;
        wide.touch_start(300.0, 10.0);
        wide.touch_end(100.0, 12.0);
        assert_eq!(wide.active_index(), 0);

        let narrow = Environment {
            viewport_width: 375.0,
            ..desktop()
        };
        let mut carousel = decorate_with(&html, narrow, &tracker).await;
        carousel.touch_start(300.0, 10.0);
        carousel.touch_end(100.0, 12.0);
        assert_eq!(carousel.active_index(), 1);
        carousel.touch_start(100.0, 10.0);
        carousel.touch_end(120.0, 200.0);
        assert_eq!(carousel.active_index(), 1);
        let swipes = tracker.named("carousel-slide");
        assert_eq!(swipes.len(), 1);
        assert_eq!(swipes[0].additional_data["navigationAction"], "swipe");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_resize_moves_dots() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let dots = carousel.dots().unwrap().node;
        let container = carousel.ui().container;
        carousel.click(carousel.arrows().unwrap().next, &TrackMetrics::default());

        carousel.resize();
        assert!(carousel.needs_frame());
        carousel.on_frame(&FrameInput {
            viewport_width: 500.0,
            ..frame(0.0)
        });
        let wrapper = carousel.slides()[1].wrapper();
        assert_eq!(carousel.dom().parent(dots), wrapper);

        carousel.click(carousel.arrows().unwrap().next, &TrackMetrics::default());
        assert_eq!(carousel.dom().parent(dots), carousel.slides()[2].wrapper());

        carousel.resize();
        carousel.on_frame(&frame(16.0));
        assert_eq!(carousel.dom().parent(dots), Some(container));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_cta_click_and_space() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let cta = carousel.slides()[0].cta_node.unwrap();

        assert!(carousel.key_down(cta, " ", 0.0));
        assert_eq!(carousel.take_effects(), vec![Effect::Click(cta)]);

        carousel.click(cta, &TrackMetrics::default());
        let clicks = tracker.named("carousel-cta-click");
        assert_eq!(clicks.len(), 1);
        assert_eq!(clicks[0].element_text.as_deref(), Some("Shop now"));
        assert_eq!(clicks[0].element_href.as_deref(), Some("https://example.com/shop"));
        assert_eq!(
            clicks[0].additional_data,
            json!({ "slideIndex": 0, "ctaText": "Shop now", "totalSlides": 3 })
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_scroll_expansion_rearms_after_cta_transition() {
        let tracker = MemoryTracker::new();
        let mut carousel = three(&tracker).await;
        let block = carousel.block();
        let first = carousel.slides()[0].element;
        let cta = carousel.slides()[0].cta_node.unwrap();
        let in_view = ScrollMetrics {
            block_top: 100.0,
            viewport_height: 800.0,
            scroll_y: 400.0,
        };

        // the initial check does not count as scrolling
        carousel.on_frame(&FrameInput {
            scroll: in_view,
            ..frame(0.0)
        });
        assert!(!carousel.dom().has_class(block, "carousel-expanded"));

        carousel.scroll();
        carousel.on_frame(&FrameInput {
            scroll: in_view,
            ..frame(16.0)
        });
        assert!(carousel.dom().has_class(block, "carousel-expanded"));
        // the first slide was already active
        assert!(carousel.dom().has_class(first, "is-active"));
        assert!(carousel.is_autoplay_armed());
        assert!(carousel.slides().len() > 1);

        // back at the top: collapse, and navigate so expansion re-activates
        carousel.scroll();
        carousel.on_frame(&FrameInput {
            scroll: ScrollMetrics {
                scroll_y: 0.0,
                ..in_view
            },
            ..frame(1000.0)
        });
        assert!(!carousel.dom().has_class(block, "carousel-expanded"));
        carousel.transition_end(block, "width", 1100.0);

        carousel.dom.remove_class(first, "is-active");
        carousel.scroll();
        carousel.on_frame(&FrameInput {
            scroll: in_view,
            ..frame(1200.0)
        });
        assert!(!carousel.dom().has_class(first, "is-active"));
        carousel.on_frame(&frame(1216.0));
        assert!(carousel.dom().has_class(first, "is-active"));
        assert_eq!(carousel.dom().attr(first, "aria-hidden"), Some("false"));

        carousel.transition_end(cta, "transform", 1300.0);
        assert!(matches!(
            &carousel.behaviour,
            Behaviour::Standard(s) if s.cta_gate == Some(CtaGate::Transition(cta))
        ));
        carousel.transition_end(cta, "opacity", 1400.0);
        assert!(matches!(&carousel.behaviour, Behaviour::Standard(s) if s.cta_gate.is_none()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_gallery_arrows_scroll_the_track() {
        let tracker = MemoryTracker::new();
        let html = [
            "<div><div>image-only-large</div></div>".to_owned(),
            row("One", false),
            row("Two", false),
            row("Three", false),
        ]
        .concat();
        let mut carousel = decorate_with(&html, desktop(), &tracker).await;
        let arrows = carousel.arrows().unwrap();
        let track = TrackMetrics {
            scroll_left: 0.0,
            client_width: 600.0,
            scroll_width: 900.0,
            item_width: 280.0,
            gap: Some(20.0),
        };

        carousel.on_frame(&FrameInput { track, ..frame(0.0) });
        assert!(carousel.dom().has_attr(arrows.prev, "disabled"));
        assert_eq!(carousel.dom().attr(arrows.prev, "style"), Some("opacity: 0.2"));
        assert_eq!(carousel.dom().attr(arrows.next, "style"), Some("opacity: 1"));

        assert!(carousel.click(arrows.next, &track));
        assert_eq!(carousel.take_effects(), vec![Effect::ScrollTrackBy { left: 300.0 }]);
        let settled = TrackMetrics {
            scroll_left: 300.0,
            ..track
        };
        carousel.gallery_scroll_end(&settled);
        carousel.on_frame(&FrameInput {
            track: settled,
            ..frame(16.0)
        });
        assert!(carousel.dom().has_attr(arrows.next, "disabled"));

        // a user scroll back to the start is a swipe
        carousel.gallery_scroll_end(&track);
        let events = tracker.named("carousel-slide");
        let actions: Vec<_> = events
            .iter()
            .map(|e| (e.additional_data["navigationAction"].clone(), e.additional_data["currentSlide"].clone()))
            .collect();
        assert_eq!(actions, vec![(json!("next"), json!(1)), (json!("swipe"), json!(0))]);
        assert_eq!(events[0].additional_data["slideTitle"], "");

        assert!(carousel.gallery_wheel(30.0, 2.0, false));
        assert!(!carousel.gallery_wheel(0.0, 30.0, false));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_crossfade_cycles() {
        let tracker = MemoryTracker::new();
        let html = [
            "<div><div>kao-home</div></div>".to_owned(),
            row("One", false),
            row("Two", false),
        ]
        .concat();
        let mut carousel = decorate_with(&html, desktop(), &tracker).await;
        let first = carousel.slides()[0].element;
        let second = carousel.slides()[1].element;

        carousel.on_frame(&frame(0.0));
        carousel.on_frame(&frame(5000.0));
        assert!(carousel.dom().has_class(second, "is-active"));
        assert!(carousel.dom().has_class(first, "is-fading-out"));
        assert!(!carousel.dom().has_class(first, "is-active"));

        carousel.transition_end(first, "opacity", 5200.0);
        assert!(!carousel.dom().has_class(first, "is-fading-out"));

        carousel.on_frame(&frame(10_000.0));
        assert!(carousel.dom().has_class(first, "is-active"));
        assert!(carousel.dom().has_class(second, "is-fading-out"));
        carousel.on_frame(&frame(11_600.0));
        assert!(!carousel.dom().has_class(second, "is-fading-out"));
    }
}
