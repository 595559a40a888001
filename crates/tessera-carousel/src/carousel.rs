//! A decorated carousel block.
//!
//! [`Carousel::decorate`] turns the authored rows of a block into slides and
//! navigation markup inside the carousel's own [`Dom`]. From then on the host
//! drives it: DOM events and animation frames go in through the handlers in
//! [`crate::controller`]; DOM [`Patch`]es, player [`BootstrapRequest`]s and
//! [`Effect`]s come out.
//!
//! Three behaviours share the markup:
//!
//! - full-grid and full-width carousels show one slide at a time, with
//!   arrows, dots, keyboard and swipe navigation, autoplay, and the
//!   scroll-triggered expansion;
//! - image-only layouts are a horizontally scrolling gallery;
//! - kao-home crossfades on a timer with no controls.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::json;
use tessera_common::analytics::{InteractionEvent, InteractionTracker};
use tessera_common::config::CarouselSettings;
use tessera_common::dom::{Dom, NodeId, Patch};
use tessera_common::icons::decorate_icons;
use tessera_common::ids::IdGenerator;
use tessera_common::metadata::PageMetadataSource;
use tessera_common::placeholders::{PlaceholderSource, Placeholders};

use crate::autoplay::Autoplay;
use crate::crossfade::Crossfade;
use crate::gallery::Gallery;
use crate::input::{DotsPlacement, SwipeTracker};
use crate::layout::LayoutVariant;
use crate::navigation::Navigator;
use crate::parser::{
    BuildContext, CarouselConfig, build_slides, clear_filter_marks, parse_carousel_config,
};
use crate::player::{BootstrapRequest, VideoPlayer};
use crate::render::{
    Arrows, CarouselUi, Dots, apply_region, create_arrows, create_dots, create_live_region,
    create_ui,
};
use crate::scroll::ScrollAnimator;
use crate::slide::{Slide, VideoControl};
use crate::teardown::Teardown;
use crate::video_controls::{VideoControlState, create_control_button};

/// Set on the block once decorated. A second decoration is a no-op.
pub const DECORATED_ATTR: &str = "data-carousel-decorated";

/// Page facts a carousel is decorated against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    /// The page is open in the visual editor (`html.adobe-ue-edit`).
    pub authoring: bool,
    pub viewport_width: f64,
    /// The block sits inside `.grid-columns`.
    pub in_grid_columns: bool,
    /// Page origin, used to absolutise analytics URLs.
    pub origin: String,
}

/// Collaborators for [`Carousel::decorate`].
pub struct DecorateContext<'a, M, P> {
    pub settings: &'a CarouselSettings,
    pub env: Environment,
    pub ids: &'a IdGenerator,
    pub metadata: &'a M,
    pub placeholders: &'a P,
    pub tracker: Rc<dyn InteractionTracker>,
}

/// Something only the host can do.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Smooth-scroll the gallery track horizontally.
    ScrollTrackBy { left: f64 },
    /// Drop focus from a button after a pointer click.
    Blur(NodeId),
    /// Dispatch a native click, for CTAs activated from the keyboard.
    Click(NodeId),
}

/// Host measurements for one animation frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub now: f64,
    pub viewport_width: f64,
    pub scroll: crate::scroll::ScrollMetrics,
    pub track: crate::gallery::TrackMetrics,
}

#[derive(Debug, Clone)]
pub(crate) struct Controls {
    pub(crate) arrows: Arrows,
    pub(crate) dots: Dots,
    pub(crate) live_region: NodeId,
    pub(crate) placement: DotsPlacement,
}

/// What re-arms autoplay after the scroll expansion re-activated a slide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CtaGate {
    /// The CTA's `opacity` transition.
    Transition(NodeId),
    /// A fixed delay, for slides without a CTA.
    Until(f64),
}

#[derive(Debug, Clone)]
pub(crate) struct Standard {
    pub(crate) nav: Navigator,
    pub(crate) autoplay: Autoplay,
    pub(crate) scroll: ScrollAnimator,
    /// Only on viewports that were narrow at decoration time.
    pub(crate) swipe: Option<SwipeTracker>,
    /// Absent for single-slide carousels.
    pub(crate) controls: Option<Controls>,
    /// Slide to re-activate on the next frame.
    pub(crate) reactivate: Option<usize>,
    pub(crate) cta_gate: Option<CtaGate>,
}

#[derive(Debug, Clone)]
pub(crate) enum Behaviour {
    Standard(Box<Standard>),
    Gallery { gallery: Gallery, arrows: Arrows },
    Crossfade(Crossfade),
}

pub struct Carousel {
    pub(crate) dom: Dom,
    pub(crate) block: NodeId,
    pub(crate) id: String,
    pub(crate) layout: LayoutVariant,
    pub(crate) env: Environment,
    pub(crate) settings: CarouselSettings,
    pub(crate) placeholders: Placeholders,
    pub(crate) tracker: Rc<dyn InteractionTracker>,
    pub(crate) ui: CarouselUi,
    pub(crate) slides: Vec<Slide>,
    pub(crate) behaviour: Behaviour,
    pub(crate) resize_pending: bool,
    pub(crate) bootstraps: Vec<BootstrapRequest>,
    pub(crate) effects: Vec<Effect>,
    pub(crate) players: HashMap<usize, Rc<dyn VideoPlayer>>,
    pub(crate) teardown: Teardown,
    pub(crate) destroyed: bool,
}

impl fmt::Debug for Carousel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Carousel")
            .field("id", &self.id)
            .field("layout", &self.layout)
            .field("slides", &self.slides.len())
            .field("behaviour", &self.behaviour)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl Carousel {
    /// Decorate `block`, which must live in `dom`.
    ///
    /// Returns `None` when the block was decorated before. Mutations made
    /// here are part of the initial markup; the journal starts afterwards,
    /// so [`Carousel::take_patches`] only reports later changes.
    pub async fn decorate<M, P>(
        mut dom: Dom,
        block: NodeId,
        ctx: DecorateContext<'_, M, P>,
    ) -> Option<Self>
    where
        M: PageMetadataSource,
        P: PlaceholderSource,
    {
        if dom.has_attr(block, DECORATED_ATTR) {
            tracing::debug!("block already decorated");
            return None;
        }
        dom.set_attr(block, DECORATED_ATTR, "true");

        let id = ctx.ids.next_id("carousel");
        let placeholders = ctx.placeholders.placeholders().await;
        let CarouselConfig { layout, rows, .. } = parse_carousel_config(&dom, block);
        clear_filter_marks(&mut dom, &rows);

        let authoring = ctx.env.authoring;
        if !authoring {
            for child in dom.children(block).to_vec() {
                dom.detach(child);
            }
        }
        dom.add_class(block, "carousel");
        dom.add_class(block, &layout.class_name());

        let ui = create_ui(&mut dom);
        dom.set_attr(ui.container, "data-carousel-id", &id);

        let build = BuildContext {
            settings: ctx.settings,
            layout,
            authoring,
            placeholders: &placeholders,
            ids: ctx.ids,
        };
        let built = build_slides(&mut dom, ui.track, &rows, &build, &id, ctx.metadata).await;
        let slides = built.slides;

        dom.append_child(block, ui.container);
        decorate_icons(&mut dom, block, &ctx.settings.icon_base_path);

        if authoring {
            // the rows stay for the editor but must not be read twice
            for row in &rows {
                dom.set_attr(*row, "aria-hidden", "true");
                dom.set_attr(*row, "inert", "");
            }
        }

        let setup = Setup {
            ui,
            slides: &slides,
            placeholders: &placeholders,
            settings: ctx.settings,
            env: &ctx.env,
        };
        let (behaviour, init) = if layout.is_image_only() {
            setup.gallery(&mut dom)
        } else if layout == LayoutVariant::KaoHome {
            setup.crossfade(&mut dom)
        } else {
            setup.standard(&mut dom, layout)
        };

        let mut carousel = Carousel {
            dom,
            block,
            id,
            layout,
            env: ctx.env,
            settings: ctx.settings.clone(),
            placeholders,
            tracker: ctx.tracker,
            ui,
            slides,
            behaviour,
            resize_pending: false,
            bootstraps: Vec::new(),
            effects: Vec::new(),
            players: HashMap::new(),
            teardown: Teardown::new(),
            destroyed: false,
        };
        for request in built.bootstraps {
            carousel.queue_bootstrap(request);
        }

        carousel.track("carousel-init", init);
        carousel.dom.start_journal();
        tracing::debug!(
            id = %carousel.id,
            %layout,
            slides = carousel.slides.len(),
            "carousel decorated"
        );
        Some(carousel)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn block(&self) -> NodeId {
        self.block
    }

    pub fn layout(&self) -> LayoutVariant {
        self.layout
    }

    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    pub fn ui(&self) -> CarouselUi {
        self.ui
    }

    pub fn slides(&self) -> &[Slide] {
        &self.slides
    }

    pub fn settings(&self) -> &CarouselSettings {
        &self.settings
    }

    pub fn active_index(&self) -> usize {
        match &self.behaviour {
            Behaviour::Standard(standard) => standard.nav.active(),
            Behaviour::Gallery { gallery, .. } => gallery.last_index(),
            Behaviour::Crossfade(crossfade) => crossfade.active(),
        }
    }

    pub fn is_interacting(&self) -> bool {
        match &self.behaviour {
            Behaviour::Standard(standard) => standard.nav.is_interacting(),
            _ => false,
        }
    }

    pub fn is_autoplay_armed(&self) -> bool {
        match &self.behaviour {
            Behaviour::Standard(standard) => standard.autoplay.is_armed(),
            Behaviour::Crossfade(crossfade) => crossfade.needs_frame(),
            Behaviour::Gallery { .. } => false,
        }
    }

    pub fn arrows(&self) -> Option<Arrows> {
        match &self.behaviour {
            Behaviour::Standard(standard) => standard.controls.as_ref().map(|c| c.arrows),
            Behaviour::Gallery { arrows, .. } => Some(*arrows),
            Behaviour::Crossfade(_) => None,
        }
    }

    pub fn dots(&self) -> Option<&Dots> {
        self.controls().map(|c| &c.dots)
    }

    pub fn live_region(&self) -> Option<NodeId> {
        self.controls().map(|c| c.live_region)
    }

    /// Current live-region text, empty when there is none.
    pub fn announcement(&self) -> String {
        self.live_region()
            .map(|region| self.dom.text_content(region))
            .unwrap_or_default()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The host should keep requesting animation frames.
    pub fn needs_frame(&self) -> bool {
        if self.destroyed {
            return false;
        }
        match &self.behaviour {
            Behaviour::Standard(standard) => {
                self.resize_pending
                    || standard.nav.needs_frame()
                    || standard.reactivate.is_some()
                    || matches!(standard.cta_gate, Some(CtaGate::Until(_)))
                    || standard.scroll.needs_frame()
                    || standard.autoplay.is_armed()
            }
            Behaviour::Gallery { gallery, .. } => self.resize_pending || gallery.needs_frame(),
            Behaviour::Crossfade(crossfade) => crossfade.needs_frame(),
        }
    }

    /// DOM mutations since the last call.
    pub fn take_patches(&mut self) -> Vec<Patch> {
        self.dom.take_patches()
    }

    /// Player bootstraps the host should start.
    pub fn take_bootstraps(&mut self) -> Vec<BootstrapRequest> {
        std::mem::take(&mut self.bootstraps)
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    /// Hand a host resource to the carousel so [`Carousel::destroy`]
    /// releases it.
    pub fn add_teardown(&mut self, teardown: Teardown) {
        if self.destroyed {
            drop(teardown);
            return;
        }
        self.teardown.extend(teardown);
    }

    /// Release every listener, timer and player subscription. Idempotent.
    pub fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        match &mut self.behaviour {
            Behaviour::Standard(standard) => {
                standard.autoplay.stop();
                standard.nav.cancel();
                standard.reactivate = None;
                standard.cta_gate = None;
            }
            Behaviour::Gallery { .. } | Behaviour::Crossfade(_) => {}
        }
        self.teardown.run();
        self.players.clear();
        self.bootstraps.clear();
        self.effects.clear();
        tracing::debug!(id = %self.id, "carousel destroyed");
    }

    pub(crate) fn controls(&self) -> Option<&Controls> {
        match &self.behaviour {
            Behaviour::Standard(standard) => standard.controls.as_ref(),
            _ => None,
        }
    }

    /// Queue a player bootstrap and give its slide a play/pause button.
    pub(crate) fn queue_bootstrap(&mut self, request: BootstrapRequest) {
        if let Some(slide) = self.slides.get_mut(request.slide_index)
            && slide.control.is_none()
            && let Some(wrapper) = slide.wrapper()
        {
            let (button, icon) = create_control_button(&mut self.dom, &self.placeholders);
            self.dom.append_child(wrapper, button);
            slide.control = Some(VideoControl {
                button,
                icon,
                state: VideoControlState::default(),
                wired: false,
            });
        }
        self.bootstraps.push(request);
    }

    pub(crate) fn track(&self, event: &str, data: serde_json::Value) {
        self.tracker.track(
            InteractionEvent::new(event, "carousel")
                .id(self.id.clone())
                .data(data),
        );
    }
}

/// Everything the behaviour setups read.
struct Setup<'a> {
    ui: CarouselUi,
    slides: &'a [Slide],
    placeholders: &'a Placeholders,
    settings: &'a CarouselSettings,
    env: &'a Environment,
}

impl Setup<'_> {
    fn gallery(&self, dom: &mut Dom) -> (Behaviour, serde_json::Value) {
        for slide in self.slides {
            dom.add_class(slide.element, "is-active");
        }
        let arrows = create_arrows(
            dom,
            self.ui.container,
            self.placeholders,
            &self.settings.icon_base_path,
        );
        let buttons = dom.create_element("div");
        dom.set_attr(buttons, "class", "carousel-buttons");
        dom.prepend_child(self.ui.container, buttons);
        dom.append_child(buttons, arrows.prev);
        dom.append_child(buttons, arrows.next);

        // slide links take the tab stops
        apply_region(dom, self.ui.container, self.placeholders, "Image Gallery", false);
        dom.set_attr(self.ui.viewport, "tabindex", "-1");
        dom.set_attr(self.ui.track, "tabindex", "-1");

        let gallery = Gallery::new(self.slides.len(), self.settings);
        let init = json!({ "totalSlides": self.slides.len(), "autoPlay": false });
        (Behaviour::Gallery { gallery, arrows }, init)
    }

    fn crossfade(&self, dom: &mut Dom) -> (Behaviour, serde_json::Value) {
        if let Some(first) = self.slides.first() {
            dom.add_class(first.element, "is-active");
        }
        apply_region(dom, self.ui.container, self.placeholders, "Carousel", true);
        let crossfade = Crossfade::new(self.slides.len(), self.settings);
        let init = json!({
            "totalSlides": self.slides.len(),
            "autoPlay": true,
            "layout": LayoutVariant::KaoHome.as_str(),
        });
        (Behaviour::Crossfade(crossfade), init)
    }

    fn standard(&self, dom: &mut Dom, layout: LayoutVariant) -> (Behaviour, serde_json::Value) {
        let len = self.slides.len();
        if let Some(first) = self.slides.first() {
            dom.add_class(first.element, "is-active");
        }

        let multi = len > 1;
        let controls = multi.then(|| {
            let arrows = create_arrows(
                dom,
                self.ui.container,
                self.placeholders,
                &self.settings.icon_base_path,
            );
            let dots = create_dots(dom, len, self.placeholders);
            let placement =
                DotsPlacement::for_width(self.env.viewport_width, self.settings.mobile_breakpoint_px);
            let parent = dots_parent(placement, self.ui.container, self.slides.first());
            dom.append_child(parent, dots.node);
            let live_region = create_live_region(dom, self.ui.container);
            Controls {
                arrows,
                dots,
                live_region,
                placement,
            }
        });

        if let Some(controls) = &controls {
            for (i, slide) in self.slides.iter().enumerate() {
                dom.set_attr(slide.element, "aria-hidden", if i == 0 { "false" } else { "true" });
            }
            dom.add_class(controls.dots.buttons[0], "is-active");
        }

        let swipe = (multi && self.env.viewport_width < self.settings.mobile_breakpoint_px)
            .then(|| SwipeTracker::new(self.settings.swipe_threshold_px));
        let mut scroll = ScrollAnimator::new(
            layout == LayoutVariant::FullGrid,
            self.env.in_grid_columns,
            self.settings,
        );
        // the block may already be in view
        scroll.request_check();

        dom.set_attr(self.ui.container, "tabindex", "0");
        apply_region(dom, self.ui.container, self.placeholders, "Carousel", true);

        let standard = Standard {
            nav: Navigator::new(len),
            autoplay: Autoplay::new(len, self.settings.autoplay_interval_ms),
            scroll,
            swipe,
            controls,
            reactivate: None,
            cta_gate: None,
        };
        let init = json!({ "totalSlides": len, "autoPlay": multi });
        (Behaviour::Standard(Box::new(standard)), init)
    }
}

/// Narrow viewports show the dots inside the active slide's media, when it
/// has any.
fn dots_parent(placement: DotsPlacement, container: NodeId, active: Option<&Slide>) -> NodeId {
    match placement {
        DotsPlacement::ActiveMedia => active.and_then(Slide::wrapper).unwrap_or(container),
        DotsPlacement::Container => container,
    }
}

/// Move the dots where the current placement wants them.
pub(crate) fn place_dots(dom: &mut Dom, controls: &Controls, container: NodeId, active: Option<&Slide>) {
    let parent = dots_parent(controls.placement, container, active);
    if dom.parent(controls.dots.node) != Some(parent) {
        dom.append_child(parent, controls.dots.node);
    }
}
