//! Wires a decorated carousel to the live page.
//!
//! The [`Host`] owns the carousel and its [`DomMirror`]. Browser events are
//! translated into controller calls; after each one the journaled patches are
//! replayed, effects run, queued player bootstraps are spawned, and the frame
//! loop is started when the carousel asks for frames.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use gloo_events::{EventListener, EventListenerOptions};
use js_sys::Reflect;
use tessera_carousel::{
    Carousel, DECORATED_ATTR, DecorateContext, Effect, Environment, FrameClock, FrameInput,
    Interaction, ScrollMetrics, Teardown, TrackMetrics, run_command, start_video,
};
use tessera_common::dom::NodeId;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    Element, Event, EventTarget, FocusEvent, HtmlElement, KeyboardEvent, ScrollBehavior,
    ScrollToOptions, TouchEvent, TransitionEvent, WheelEvent,
};

use crate::mirror::{self, DomMirror};
use crate::page::Page;

/// Set on the live block while decoration is in flight.
const DECORATING_ATTR: &str = "data-carousel-decorating";

thread_local! {
    static HOSTS: RefCell<Vec<Host>> = const { RefCell::new(Vec::new()) };
}

struct Inner {
    page: Rc<Page>,
    carousel: Rc<RefCell<Carousel>>,
    mirror: RefCell<DomMirror>,
    ui: tessera_carousel::render::CarouselUi,
    frames_running: Cell<bool>,
    has_scroll_end: bool,
}

#[derive(Clone)]
pub struct Host {
    inner: Rc<Inner>,
}

impl Host {
    /// Decorate a live block and start driving it.
    ///
    /// `None` when the block was decorated before, or when decoration left
    /// nothing to show.
    pub async fn decorate(page: Rc<Page>, block: Element) -> Option<Host> {
        if block.has_attribute(DECORATED_ATTR) || block.has_attribute(DECORATING_ATTR) {
            tracing::debug!("block already decorated");
            return None;
        }
        let _ = block.set_attribute(DECORATING_ATTR, "");
        let carousel = Self::decorate_arena(&page, &block).await;
        let _ = block.remove_attribute(DECORATING_ATTR);
        let carousel = carousel?;

        let mirror = DomMirror::mount(
            page.document.clone(),
            block,
            carousel.dom(),
            carousel.block(),
        );
        let has_scroll_end = Reflect::has(&page.window, &JsValue::from_str("onscrollend"))
            .unwrap_or(false);
        let host = Host {
            inner: Rc::new(Inner {
                page,
                ui: carousel.ui(),
                carousel: Rc::new(RefCell::new(carousel)),
                mirror: RefCell::new(mirror),
                frames_running: Cell::new(false),
                has_scroll_end,
            }),
        };
        let listeners = host.listen();
        host.inner.carousel.borrow_mut().add_teardown(listeners);
        HOSTS.with(|hosts| hosts.borrow_mut().push(host.clone()));
        host.flush();
        Some(host)
    }

    async fn decorate_arena(page: &Page, block: &Element) -> Option<Carousel> {
        let _timing = tessera_common::perf::TimingGuard::new("carousel decorate");
        let (dom, root) = mirror::import(block);
        let env = Environment {
            authoring: page
                .document
                .document_element()
                .is_some_and(|html| html.class_list().contains("adobe-ue-edit")),
            viewport_width: page
                .window
                .inner_width()
                .ok()
                .and_then(|w| w.as_f64())
                .unwrap_or(0.0),
            in_grid_columns: block.closest(".grid-columns").ok().flatten().is_some(),
            origin: page.origin(),
        };
        let ctx = DecorateContext {
            settings: &page.settings,
            env,
            ids: &page.ids,
            metadata: &page.metadata,
            placeholders: &page.placeholders,
            tracker: page.tracker.clone(),
        };
        Carousel::decorate(dom, root, ctx).await
    }

    pub fn carousel(&self) -> &Rc<RefCell<Carousel>> {
        &self.inner.carousel
    }

    /// Tear the carousel down and forget it.
    pub fn destroy(&self) {
        match self.inner.carousel.try_borrow_mut() {
            Ok(mut carousel) => carousel.destroy(),
            Err(_) => {
                tracing::warn!("carousel busy, destroy skipped");
                return;
            }
        }
        self.flush();
        HOSTS.with(|hosts| {
            hosts
                .borrow_mut()
                .retain(|h| !Rc::ptr_eq(&h.inner, &self.inner))
        });
    }

    /// Run `f` against the carousel, then sync the page.
    pub fn with_carousel<R>(&self, f: impl FnOnce(&mut Carousel) -> R) -> Option<R> {
        let result = {
            let Ok(mut carousel) = self.inner.carousel.try_borrow_mut() else {
                tracing::trace!("carousel busy, event dropped");
                return None;
            };
            f(&mut carousel)
        };
        self.flush();
        Some(result)
    }

    /// Replay patches, run effects, spawn bootstraps, keep frames coming.
    pub fn flush(&self) {
        let (patches, effects, bootstraps) = {
            let Ok(mut carousel) = self.inner.carousel.try_borrow_mut() else {
                return;
            };
            (
                carousel.take_patches(),
                carousel.take_effects(),
                carousel.take_bootstraps(),
            )
        };
        if !patches.is_empty()
            && let Ok(carousel) = self.inner.carousel.try_borrow()
        {
            self.inner.mirror.borrow_mut().apply(carousel.dom(), patches);
        }
        for effect in effects {
            self.run_effect(effect);
        }
        for request in bootstraps {
            let host = self.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let page = host.inner.page.clone();
                start_video(
                    &host.inner.carousel,
                    &*page.players,
                    &*page.clock,
                    &page.serializer,
                    request,
                    &page.settings,
                )
                .await;
                host.flush();
            });
        }
        self.ensure_frames();
    }

    fn run_effect(&self, effect: Effect) {
        let mirror = self.inner.mirror.borrow();
        match effect {
            Effect::ScrollTrackBy { left } => {
                if let Some(track) = mirror.element(self.inner.ui.track) {
                    let options = ScrollToOptions::new();
                    options.set_left(left);
                    options.set_behavior(ScrollBehavior::Smooth);
                    track.scroll_by_with_scroll_to_options(&options);
                }
            }
            Effect::Blur(node) => {
                if let Some(el) = html_element(&mirror, node) {
                    let _ = el.blur();
                }
            }
            Effect::Click(node) => {
                if let Some(el) = html_element(&mirror, node) {
                    el.click();
                }
            }
        }
    }

    fn needs_frame(&self) -> bool {
        self.inner
            .carousel
            .try_borrow()
            .is_ok_and(|carousel| carousel.needs_frame())
    }

    fn ensure_frames(&self) {
        if self.inner.frames_running.get() || !self.needs_frame() {
            return;
        }
        self.inner.frames_running.set(true);
        let weak = Rc::downgrade(&self.inner);
        let clock = self.inner.page.clock.clone();
        wasm_bindgen_futures::spawn_local(async move {
            loop {
                let now = clock.next_frame().await;
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let host = Host { inner };
                let input = host.measure(now);
                let ran = host.with_carousel(|carousel| carousel.on_frame(&input));
                if ran.is_some() && !host.needs_frame() {
                    host.inner.frames_running.set(false);
                    return;
                }
            }
        });
    }

    fn measure(&self, now: f64) -> FrameInput {
        let window = &self.inner.page.window;
        let px = |v: Result<JsValue, JsValue>| v.ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
        let mirror = self.inner.mirror.borrow();
        FrameInput {
            now,
            viewport_width: px(window.inner_width()),
            scroll: ScrollMetrics {
                block_top: mirror.root().get_bounding_client_rect().top(),
                viewport_height: px(window.inner_height()),
                scroll_y: window.scroll_y().unwrap_or(0.0),
            },
            track: self.track_metrics(&mirror),
        }
    }

    fn track_metrics(&self, mirror: &DomMirror) -> TrackMetrics {
        let Some(track) = mirror.element(self.inner.ui.track) else {
            return TrackMetrics::default();
        };
        let gap = self
            .inner
            .page
            .window
            .get_computed_style(&track)
            .ok()
            .flatten()
            .and_then(|style| style.get_property_value("column-gap").ok())
            .and_then(|gap| gap.trim().trim_end_matches("px").parse::<f64>().ok());
        TrackMetrics {
            scroll_left: track.scroll_left() as f64,
            client_width: track.client_width() as f64,
            scroll_width: track.scroll_width() as f64,
            item_width: track
                .first_element_child()
                .map(|item| item.get_bounding_client_rect().width())
                .unwrap_or(0.0),
            gap,
        }
    }

    fn resolve(&self, event: &Event) -> Option<NodeId> {
        let target = event.target()?;
        self.inner.mirror.borrow().resolve(&target)
    }

    // === Listeners ===

    fn listen(&self) -> Teardown {
        let mirror = self.inner.mirror.borrow();
        let block: EventTarget = mirror.root().clone().into();
        let container = mirror.element(self.inner.ui.container).map(EventTarget::from);
        let viewport = mirror.element(self.inner.ui.viewport).map(EventTarget::from);
        let track = mirror.element(self.inner.ui.track).map(EventTarget::from);
        let window: EventTarget = self.inner.page.window.clone().into();
        drop(mirror);

        let mut listeners = Vec::new();
        let active = EventListenerOptions::enable_prevent_default();

        if let Some(container) = &container {
            listeners.push(self.on(container, "click", active, Host::on_click));
            listeners.push(self.on(container, "keydown", active, Host::on_key_down));
            listeners.push(self.on(container, "focusin", passive(), |h, _| {
                h.with_carousel(Carousel::focus_in);
            }));
            listeners.push(self.on(container, "focusout", passive(), Host::on_focus_out));
            listeners.push(self.on(container, "pointerenter", passive(), |h, _| {
                h.with_carousel(Carousel::pointer_enter);
            }));
            listeners.push(self.on(container, "pointerleave", passive(), |h, _| {
                h.with_carousel(Carousel::pointer_leave);
            }));
            listeners.push(self.on(container, "pointerover", passive(), |h, e| {
                if let Some(target) = h.resolve(e) {
                    h.with_carousel(|c| c.pointer_over(target));
                }
            }));
            for name in ["pointerdown", "mousedown", "wheel"] {
                listeners.push(self.on(container, name, passive(), Host::on_interaction));
            }
        }
        if let Some(viewport) = &viewport {
            listeners.push(self.on(viewport, "touchstart", passive(), Host::on_touch_start));
            listeners.push(self.on(viewport, "touchend", passive(), Host::on_touch_end));
        }
        if let Some(track) = &track {
            listeners.push(self.on(track, "scroll", passive(), |h, _| {
                let metrics = h.track_metrics(&h.inner.mirror.borrow());
                let has_scroll_end = h.inner.has_scroll_end;
                h.with_carousel(|c| c.gallery_scroll(&metrics, has_scroll_end));
            }));
            listeners.push(self.on(track, "scrollend", passive(), |h, _| {
                let metrics = h.track_metrics(&h.inner.mirror.borrow());
                h.with_carousel(|c| c.gallery_scroll_end(&metrics));
            }));
            listeners.push(self.on(track, "wheel", active, Host::on_track_wheel));
        }
        listeners.push(self.on(&window, "scroll", passive(), |h, _| {
            h.with_carousel(Carousel::scroll);
        }));
        listeners.push(self.on(&window, "resize", passive(), |h, _| {
            h.with_carousel(Carousel::resize);
        }));
        listeners.push(self.on(&block, "transitionend", passive(), Host::on_transition_end));

        tracing::debug!(count = listeners.len(), "carousel listeners attached");
        Teardown::from_fn(move || drop(listeners))
    }

    fn on(
        &self,
        target: &EventTarget,
        name: &'static str,
        options: EventListenerOptions,
        handler: impl Fn(&Host, &Event) + 'static,
    ) -> EventListener {
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        EventListener::new_with_options(target, name, options, move |event| {
            if let Some(inner) = weak.upgrade() {
                handler(&Host { inner }, event);
            }
        })
    }

    // === Handlers ===

    fn on_click(&self, event: &Event) {
        let Some(target) = self.resolve(event) else {
            return;
        };
        // players may report state synchronously, so no borrow while they run
        let command = self
            .inner
            .carousel
            .try_borrow()
            .ok()
            .and_then(|carousel| carousel.video_command(target));
        if let Some((player, command)) = command {
            event.prevent_default();
            run_command(&*player, command);
            self.flush();
            return;
        }
        let metrics = self.track_metrics(&self.inner.mirror.borrow());
        if self.with_carousel(|c| c.click(target, &metrics)) == Some(true) {
            event.prevent_default();
        }
    }

    fn on_key_down(&self, event: &Event) {
        let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let Some(target) = self.resolve(event) else {
            return;
        };
        let key = event.key();
        let now = tessera_common::perf::now();
        if self.with_carousel(|c| c.key_down(target, &key, now)) == Some(true) {
            event.prevent_default();
        }
    }

    fn on_focus_out(&self, event: &Event) {
        let still_inside = event
            .dyn_ref::<FocusEvent>()
            .and_then(|e| e.related_target())
            .and_then(|t| t.dyn_into::<web_sys::Node>().ok())
            .zip(self.inner.mirror.borrow().element(self.inner.ui.container))
            .is_some_and(|(node, container)| container.contains(Some(&node)));
        self.with_carousel(|c| c.focus_out(still_inside));
    }

    fn on_interaction(&self, event: &Event) {
        let Some(kind) = Interaction::from_event(&event.type_()) else {
            return;
        };
        let now = tessera_common::perf::now();
        self.with_carousel(|c| c.interaction(kind, now));
    }

    fn on_touch_start(&self, event: &Event) {
        let now = tessera_common::perf::now();
        let point = touch_point(event);
        self.with_carousel(|c| {
            c.interaction(Interaction::TouchStart, now);
            if let Some((x, y)) = point {
                c.touch_start(x, y);
            }
        });
    }

    fn on_touch_end(&self, event: &Event) {
        if let Some((x, y)) = touch_point(event) {
            self.with_carousel(|c| c.touch_end(x, y));
        }
    }

    fn on_track_wheel(&self, event: &Event) {
        let Some(wheel) = event.dyn_ref::<WheelEvent>() else {
            return;
        };
        let prevent = self
            .inner
            .carousel
            .try_borrow()
            .is_ok_and(|c| c.gallery_wheel(wheel.delta_x(), wheel.delta_y(), wheel.shift_key()));
        if prevent {
            event.prevent_default();
        }
    }

    fn on_transition_end(&self, event: &Event) {
        let Some(transition) = event.dyn_ref::<TransitionEvent>() else {
            return;
        };
        let Some(target) = self.resolve(event) else {
            return;
        };
        let property = transition.property_name();
        let now = tessera_common::perf::now();
        self.with_carousel(|c| c.transition_end(target, &property, now));
    }
}

fn passive() -> EventListenerOptions {
    EventListenerOptions::default()
}

fn html_element(mirror: &DomMirror, node: NodeId) -> Option<HtmlElement> {
    mirror.element(node)?.dyn_into::<HtmlElement>().ok()
}

fn touch_point(event: &Event) -> Option<(f64, f64)> {
    let touch = event.dyn_ref::<TouchEvent>()?.changed_touches().get(0)?;
    Some((touch.client_x() as f64, touch.client_y() as f64))
}

/// Sync every live carousel, after a player reported a state change.
pub(crate) fn flush_all() {
    let hosts = HOSTS.with(|hosts| hosts.borrow().clone());
    for host in hosts {
        host.flush();
    }
}

/// Decorated carousels still alive on the page.
pub fn live_count() -> usize {
    HOSTS.with(|hosts| hosts.borrow().len())
}
