//! Browser host for the tessera carousel.
//!
//! This crate assumes a `wasm32-unknown-unknown` target. It mounts decorated
//! carousels into the live document and drives them:
//!
//! - `mirror`: arena tree to live DOM, and event targets back to arena nodes
//! - `host`: event wiring, the animation-frame loop, effects and bootstraps
//! - `player`: the Brightcove / video.js [`PlayerHost`](tessera_carousel::PlayerHost)
//! - `tracker`: interaction events into the page data layer
//! - `page`: services shared by every carousel on the page
//! - `clock`: the [`FrameClock`](tessera_carousel::FrameClock) over
//!   `requestAnimationFrame`

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Element;

pub mod clock;
pub mod host;
pub mod mirror;
pub mod page;
pub mod player;
pub mod tracker;

pub use crate::clock::RafClock;
pub use crate::host::Host;
pub use crate::page::Page;
pub use crate::player::{BrightcoveHost, BrightcovePlayer};
pub use crate::tracker::DataLayerTracker;

/// Blocks picked up by [`decorate_all`].
const BLOCK_SELECTOR: &str = ".block.carousel";

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    tessera_common::telemetry::init(tessera_common::telemetry::TelemetryConfig::from_env(
        "tessera-carousel",
    ));
}

/// A decorated carousel, as seen from JavaScript.
#[wasm_bindgen]
pub struct CarouselHandle {
    host: Host,
}

#[wasm_bindgen]
impl CarouselHandle {
    #[wasm_bindgen(getter)]
    pub fn id(&self) -> String {
        self.host.carousel().borrow().id().to_owned()
    }

    #[wasm_bindgen(getter, js_name = activeIndex)]
    pub fn active_index(&self) -> usize {
        self.host.carousel().borrow().active_index()
    }

    #[wasm_bindgen(getter)]
    pub fn layout(&self) -> String {
        self.host.carousel().borrow().layout().to_string()
    }

    /// Navigate to `index`, wrapping around the ends.
    #[wasm_bindgen(js_name = goTo)]
    pub fn go_to(&self, index: i32) -> Result<(), JsError> {
        self.host
            .with_carousel(|c| {
                c.go_to(index as isize, tessera_carousel::NavigationAction::Dot)
            })
            .ok_or_else(|| JsError::new("carousel is busy"))
    }

    /// Release listeners, timers and players. Safe to call twice.
    pub fn destroy(&self) {
        self.host.destroy();
    }
}

/// Decorate one carousel block.
///
/// Resolves to `undefined` when the block was decorated before or has nothing
/// to show.
#[wasm_bindgen]
pub async fn decorate(block: Element) -> Result<Option<CarouselHandle>, JsError> {
    let page = page::Page::shared()
        .await
        .ok_or_else(|| JsError::new("no window or document"))?;
    Ok(Host::decorate(page, block)
        .await
        .map(|host| CarouselHandle { host }))
}

/// Decorate every carousel block under `root`. Resolves to how many were
/// decorated.
#[wasm_bindgen(js_name = decorateAll)]
pub async fn decorate_all(root: Element) -> Result<u32, JsError> {
    let page = page::Page::shared()
        .await
        .ok_or_else(|| JsError::new("no window or document"))?;
    let blocks = root
        .query_selector_all(BLOCK_SELECTOR)
        .map_err(|e| JsError::new(&format!("invalid selector: {e:?}")))?;
    let blocks: Vec<Element> = (0..blocks.length())
        .filter_map(|i| blocks.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect();
    let decorated = n0_future::join_all(
        blocks
            .into_iter()
            .map(|block| Host::decorate(page.clone(), block)),
    )
    .await;
    let count = decorated.iter().filter(|h| h.is_some()).count();
    tracing::debug!(count, "carousels decorated");
    Ok(count as u32)
}
