//! Interaction analytics.
//!
//! Events are fire-and-forget: trackers swallow their own failures so a
//! broken data layer never affects the block.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use url::Url;

/// Query parameters that must never reach analytics.
const SENSITIVE_PARAMS: &[&str] = &["token", "auth", "key", "secret", "password"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    pub event: String,
    pub element_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_href: Option<String>,
    pub additional_data: Value,
}

impl InteractionEvent {
    pub fn new(event: &str, element_type: &str) -> Self {
        Self {
            event: event.to_owned(),
            element_type: element_type.to_owned(),
            element_id: None,
            element_text: None,
            element_href: None,
            additional_data: Value::Object(Default::default()),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.element_id = Some(id.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.element_text = Some(text.into());
        self
    }

    pub fn href(mut self, href: impl Into<String>) -> Self {
        self.element_href = Some(href.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.additional_data = data;
        self
    }
}

/// Receives interaction events.
pub trait InteractionTracker {
    fn track(&self, event: InteractionEvent);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl InteractionTracker for NoopTracker {
    fn track(&self, _event: InteractionEvent) {}
}

/// Keeps events in memory. Useful for hosts that batch, and for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTracker {
    events: Rc<RefCell<Vec<InteractionEvent>>>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InteractionEvent> {
        self.events.borrow().clone()
    }

    pub fn named(&self, event: &str) -> Vec<InteractionEvent> {
        self.events
            .borrow()
            .iter()
            .filter(|e| e.event == event)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl InteractionTracker for MemoryTracker {
    fn track(&self, event: InteractionEvent) {
        tracing::trace!(event = %event.event, "tracked");
        self.events.borrow_mut().push(event);
    }
}

impl<T: InteractionTracker + ?Sized> InteractionTracker for Rc<T> {
    fn track(&self, event: InteractionEvent) {
        (**self).track(event)
    }
}

/// Absolutise `url` against `origin` and strip credential-like parameters.
///
/// Unparseable input is returned unchanged.
pub fn sanitize_url_for_analytics(url: &str, origin: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    let parsed = Url::parse(origin)
        .and_then(|base| base.join(url))
        .or_else(|_| Url::parse(url));
    let Ok(mut full) = parsed else {
        return url.to_owned();
    };
    let kept: Vec<(String, String)> = full
        .query_pairs()
        .filter(|(k, _)| !SENSITIVE_PARAMS.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        full.set_query(None);
    } else {
        full.query_pairs_mut().clear().extend_pairs(kept);
    }
    full.to_string()
}
