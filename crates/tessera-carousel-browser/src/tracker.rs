//! Interaction events into `window.adobeDataLayer`.

use js_sys::{Array, Reflect};
use serde::Serialize;
use tessera_common::analytics::{InteractionEvent, InteractionTracker};
use wasm_bindgen::{JsCast, JsValue};

/// Pushes every event onto the page's data layer, when there is one.
#[derive(Debug, Clone)]
pub struct DataLayerTracker {
    key: &'static str,
}

impl DataLayerTracker {
    pub fn new() -> Self {
        Self {
            key: "adobeDataLayer",
        }
    }

    fn layer(&self) -> Option<Array> {
        let window = web_sys::window()?;
        Reflect::get(&window, &JsValue::from_str(self.key))
            .ok()?
            .dyn_into::<Array>()
            .ok()
    }
}

impl Default for DataLayerTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionTracker for DataLayerTracker {
    fn track(&self, event: InteractionEvent) {
        let Some(layer) = self.layer() else {
            tracing::trace!(event = %event.event, "no data layer, event dropped");
            return;
        };
        // plain objects, not Maps: the data layer reads properties
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        match event.serialize(&serializer) {
            Ok(value) => {
                layer.push(&value);
            }
            Err(err) => tracing::debug!(event = %event.event, %err, "event not serialisable"),
        }
    }
}
