//! [`FrameClock`] over `requestAnimationFrame` and `setTimeout`.

use std::future::Future;

use gloo_timers::future::TimeoutFuture;
use js_sys::Promise;
use tessera_carousel::FrameClock;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

#[derive(Debug, Clone, Copy, Default)]
pub struct RafClock;

impl FrameClock for RafClock {
    fn now(&self) -> f64 {
        tessera_common::perf::now()
    }

    fn next_frame(&self) -> impl Future<Output = f64> {
        // the frame callback resolves the promise with its timestamp
        let promise = Promise::new(&mut |resolve, _reject| {
            let Some(window) = web_sys::window() else {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::from(0.0));
                return;
            };
            let callback = Closure::once_into_js(move |timestamp: f64| {
                let _ = resolve.call1(&JsValue::NULL, &JsValue::from(timestamp));
            });
            if window
                .request_animation_frame(callback.unchecked_ref())
                .is_err()
            {
                tracing::warn!("requestAnimationFrame unavailable");
            }
        });
        async move {
            match JsFuture::from(promise).await {
                Ok(value) => value.as_f64().unwrap_or_else(tessera_common::perf::now),
                Err(_) => tessera_common::perf::now(),
            }
        }
    }

    fn sleep(&self, ms: f64) -> impl Future<Output = ()> {
        TimeoutFuture::new(ms.max(0.0).round() as u32)
    }
}
