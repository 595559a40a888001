//! Brightcove player host over `window.bc` and `window.videojs`.

use js_sys::{Array, Date, Function, Reflect};
use tessera_carousel::player::{BootstrapRequest, PlayerEvent, PlayerHost, VideoPlayer};
use tessera_carousel::teardown::Teardown;
use tessera_common::error::PlayerError;
use wasm_bindgen::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Window};

/// Marks a loader script whose `load` event fired.
const LOADED_ATTR: &str = "data-bc-loaded";
/// When a player element was embedded, in epoch milliseconds.
const DOM_TIME_ATTR: &str = "data-dom-time";
/// Assumed age of a player element that carries no timestamp.
const UNSTAMPED_AGE_MS: f64 = 2000.0;

fn call_error(err: JsValue) -> PlayerError {
    PlayerError::Call(
        err.as_string()
            .or_else(|| {
                err.dyn_ref::<js_sys::Error>()
                    .map(|e| String::from(e.message()))
            })
            .unwrap_or_else(|| format!("{err:?}")),
    )
}

/// Call `target[name](...args)`.
fn call_method(target: &JsValue, name: &str, args: &Array) -> Result<JsValue, PlayerError> {
    let method = Reflect::get(target, &JsValue::from_str(name)).map_err(call_error)?;
    let method = method
        .dyn_into::<Function>()
        .map_err(|_| PlayerError::Call(format!("{name} is not a function")))?;
    Reflect::apply(&method, target, args).map_err(call_error)
}

/// Escape a value for a double-quoted attribute selector.
fn escape_selector(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The player element already rendered its tech.
fn has_rendered(media: &Element) -> bool {
    media.query_selector("iframe").ok().flatten().is_some()
        || media.query_selector(".vjs-tech").ok().flatten().is_some()
        || media.class_list().contains("bc-player")
}

pub struct BrightcoveHost {
    window: Window,
    document: Document,
}

impl BrightcoveHost {
    pub fn new(window: Window, document: Document) -> Self {
        Self { window, document }
    }

    fn global(&self, name: &str) -> JsValue {
        Reflect::get(&self.window, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
    }

    fn videojs(&self) -> Option<Function> {
        self.global("videojs").dyn_into::<Function>().ok()
    }

    fn media(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn loader_script(&self, url: &str) -> Option<Element> {
        let selector = format!("script[src=\"{}\"]", escape_selector(url));
        self.document.query_selector(&selector).ok().flatten()
    }

    fn inject_loader(&self, url: &str) -> Result<(), PlayerError> {
        let script = self
            .document
            .create_element("script")
            .map_err(call_error)?
            .dyn_into::<web_sys::HtmlScriptElement>()
            .map_err(|_| PlayerError::Call("script element expected".into()))?;
        script.set_src(url);
        script.set_async(true);

        let loaded = script.clone();
        let window = self.window.clone();
        let onload = Closure::once_into_js(move || {
            let _ = loaded.set_attribute(LOADED_ATTR, "true");
            quiet_logging(&window);
            tracing::debug!("player library loaded");
        });
        script.set_onload(Some(onload.unchecked_ref()));

        let parent = self
            .document
            .head()
            .map(|h| h.unchecked_into::<Element>())
            .or_else(|| self.document.body().map(|b| b.unchecked_into::<Element>()))
            .ok_or_else(|| PlayerError::Call("document has no head or body".into()))?;
        parent.append_child(&script).map_err(call_error)?;
        Ok(())
    }
}

/// `videojs.log.level('error')`, when the library exposes it.
fn quiet_logging(window: &Window) {
    let log = Reflect::get(window, &JsValue::from_str("videojs"))
        .and_then(|vjs| Reflect::get(&vjs, &JsValue::from_str("log")));
    if let Ok(log) = log
        && log.is_truthy()
    {
        let _ = call_method(&log, "level", &Array::of1(&JsValue::from_str("error")));
    }
}

impl PlayerHost for BrightcoveHost {
    type Player = BrightcovePlayer;

    fn is_ready(&self) -> bool {
        self.global("bc").is_truthy() && self.videojs().is_some()
    }

    fn script_loaded(&self, script_url: Option<&str>) -> bool {
        match script_url.and_then(|url| self.loader_script(url)) {
            Some(script) => script.get_attribute(LOADED_ATTR).as_deref() == Some("true"),
            None => self.videojs().is_some(),
        }
    }

    fn has_pending_peers(&self, except_id: &str, grace_ms: f64) -> bool {
        let Ok(peers) = self.document.query_selector_all("video-js") else {
            return false;
        };
        let now = Date::now();
        (0..peers.length())
            .filter_map(|i| peers.item(i))
            .filter_map(|n| n.dyn_into::<Element>().ok())
            .filter(|el| el.id() != except_id && !has_rendered(el))
            .any(|el| {
                let age = match el
                    .get_attribute(DOM_TIME_ATTR)
                    .and_then(|t| t.parse::<f64>().ok())
                {
                    Some(stamp) => now - stamp,
                    None if el.parent_element().is_some() => UNSTAMPED_AGE_MS,
                    None => 0.0,
                };
                age < grace_ms
            })
    }

    fn load_embed(&self, request: &BootstrapRequest) -> Result<(), PlayerError> {
        let media = self
            .media(&request.video_id)
            .ok_or_else(|| PlayerError::Call(format!("no element #{}", request.video_id)))?;
        if !media.has_attribute(DOM_TIME_ATTR) {
            let _ = media.set_attribute(DOM_TIME_ATTR, &Date::now().to_string());
        }
        let url = request.script_url()?;
        match self.loader_script(&url) {
            Some(_) => Ok(()),
            None => {
                tracing::debug!(%url, "injecting player loader");
                self.inject_loader(&url)
            }
        }
    }

    fn is_initialized(&self, id: &str) -> bool {
        self.media(id).is_some_and(|media| has_rendered(&media))
    }

    fn init_player(&self, id: &str) -> Result<(), PlayerError> {
        let media = self
            .media(id)
            .ok_or_else(|| PlayerError::Call(format!("no element #{id}")))?;
        let bc = self.global("bc").dyn_into::<Function>().ok();
        let via_bc = bc.map(|bc| bc.call1(&JsValue::NULL, &media).map_err(call_error));
        match via_bc {
            Some(Ok(_)) => Ok(()),
            fallback => {
                if let Some(Err(error)) = fallback {
                    tracing::debug!(id, %error, "bc() failed, trying videojs()");
                }
                let vjs = self.videojs().ok_or(PlayerError::LibraryMissing)?;
                vjs.call1(&JsValue::NULL, &JsValue::from_str(id))
                    .map(|_| ())
                    .map_err(call_error)
            }
        }
    }

    fn get_player(&self, id: &str) -> Option<BrightcovePlayer> {
        let vjs = self.videojs()?;
        let player = call_method(&vjs, "getPlayer", &Array::of1(&JsValue::from_str(id))).ok()?;
        player.is_truthy().then(|| {
            quiet_logging(&self.window);
            BrightcovePlayer { inner: player }
        })
    }

    fn apply_label(&self, id: &str, label: &str) -> bool {
        let Some(media) = self.media(id) else {
            return false;
        };
        let iframe = media.query_selector("iframe").ok().flatten();
        if let Some(iframe) = &iframe {
            let _ = iframe.set_attribute("title", label);
            let _ = iframe.set_attribute("aria-label", label);
        }
        if !media.has_attribute("aria-label") {
            let _ = media.set_attribute("aria-label", label);
        }
        if let Ok(Some(wrapper)) = media.closest(".carousel-media") {
            let _ = wrapper.set_attribute("aria-label", label);
            let _ = wrapper.set_attribute("role", "img");
            let _ = wrapper.set_attribute("tabindex", "0");
        }
        iframe.is_some()
    }
}

/// A `videojs` player object.
pub struct BrightcovePlayer {
    inner: JsValue,
}

impl VideoPlayer for BrightcovePlayer {
    fn play(&self) -> Result<(), PlayerError> {
        // play() may hand back a promise; its rejection surfaces as a pause event
        call_method(&self.inner, "play", &Array::new()).map(|_| ())
    }

    fn pause(&self) -> Result<(), PlayerError> {
        call_method(&self.inner, "pause", &Array::new()).map(|_| ())
    }

    fn paused(&self) -> Result<bool, PlayerError> {
        let paused = call_method(&self.inner, "paused", &Array::new())?;
        paused
            .as_bool()
            .ok_or_else(|| PlayerError::Call("paused() did not return a boolean".into()))
    }

    fn on(&self, event: PlayerEvent, mut handler: Box<dyn FnMut()>) -> Teardown {
        // player events arrive outside any carousel handler; sync the page after
        let callback = Closure::<dyn FnMut()>::new(move || {
            handler();
            crate::host::flush_all();
        });
        let name = JsValue::from_str(event.as_str());
        if let Err(error) = call_method(
            &self.inner,
            "on",
            &Array::of2(&name, callback.as_ref()),
        ) {
            tracing::warn!(event = event.as_str(), %error, "could not subscribe to player");
            return Teardown::new();
        }
        let player = self.inner.clone();
        Teardown::from_fn(move || {
            let _ = call_method(
                &player,
                "off",
                &Array::of2(&name, callback.as_ref()),
            );
            drop(callback);
        })
    }
}
