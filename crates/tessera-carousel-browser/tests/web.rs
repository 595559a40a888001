#![cfg(all(target_family = "wasm", target_os = "unknown"))]

//! WASM browser tests for tessera-carousel-browser.
//!
//! Run with: `wasm-pack test --headless --firefox` or `--chrome`

use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

use js_sys::{Array, Reflect};
use tessera_carousel::player::{BootstrapRequest, PlayerHost};
use tessera_carousel::FrameClock;
use tessera_carousel_browser::mirror::{self, DomMirror};
use tessera_carousel_browser::{BrightcoveHost, DataLayerTracker, RafClock};
use tessera_common::analytics::{InteractionEvent, InteractionTracker};
use web_sys::{Document, Element};

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn fixture(html: &str) -> Element {
    let doc = document();
    let div = doc.create_element("div").unwrap();
    div.set_inner_html(html);
    doc.body().unwrap().append_child(&div).unwrap();
    div
}

// === Mirror ===

#[wasm_bindgen_test]
fn test_import_copies_attributes_and_children() {
    let block = fixture("<div><p>One</p></div><div><p>Two</p></div>");
    block.set_attribute("class", "carousel full-width").unwrap();
    let (dom, root) = mirror::import(&block);
    assert_eq!(dom.attr(root, "class"), Some("carousel full-width"));
    assert_eq!(dom.element_children(root).len(), 2);
    assert_eq!(dom.text_content(root), "OneTwo");
    block.remove();
}

#[wasm_bindgen_test]
fn test_patches_replay_onto_live_nodes() {
    let block = fixture("<div class=\"row\"><p>Title</p></div>");
    let (mut dom, root) = mirror::import(&block);
    let mut live = DomMirror::mount(document(), block.clone(), &dom, root);
    dom.start_journal();

    let row = dom.first_element_child(root).unwrap();
    dom.add_class(row, "is-active");
    let badge = dom.create_element("span");
    dom.set_text(badge, "new");
    dom.append_child(row, badge);
    let title = dom.find_tag(row, &["p"]).unwrap();
    dom.set_text(title, "Renamed");
    let patches = dom.take_patches();
    live.apply(&dom, patches);

    assert_eq!(
        block.inner_html(),
        "<div class=\"row is-active\"><p>Renamed</p><span>new</span></div>"
    );

    dom.detach(badge);
    let patches = dom.take_patches();
    live.apply(&dom, patches);
    assert_eq!(
        block.inner_html(),
        "<div class=\"row is-active\"><p>Renamed</p></div>"
    );
    block.remove();
}

#[wasm_bindgen_test]
fn test_resolve_walks_up_to_mounted_node() {
    let block = fixture("<button class=\"carousel-dot\"><span>1</span></button>");
    let (dom, root) = mirror::import(&block);
    let live = DomMirror::mount(document(), block.clone(), &dom, root);
    let button = dom.first_element_child(root).unwrap();

    let span = block.query_selector("span").unwrap().unwrap();
    assert_eq!(live.resolve(&span), Some(button));
    // the block is mounted too, transitions on it must resolve
    assert_eq!(live.resolve(&block), Some(root));

    let stranger = document().create_element("em").unwrap();
    assert_eq!(live.resolve(&stranger), None);
    block.remove();
}

// === Analytics ===

#[wasm_bindgen_test]
fn test_events_reach_data_layer() {
    let window = web_sys::window().unwrap();
    let layer = Array::new();
    Reflect::set(&window, &JsValue::from_str("adobeDataLayer"), &layer).unwrap();

    DataLayerTracker::new().track(
        InteractionEvent::new("carousel-slide", "carousel")
            .id("carousel-1")
            .data(serde_json::json!({ "currentSlide": 2 })),
    );

    assert_eq!(layer.length(), 1);
    let pushed = layer.get(0);
    let event = Reflect::get(&pushed, &JsValue::from_str("event")).unwrap();
    assert_eq!(event.as_string().as_deref(), Some("carousel-slide"));
    let data = Reflect::get(&pushed, &JsValue::from_str("additionalData")).unwrap();
    let slide = Reflect::get(&data, &JsValue::from_str("currentSlide")).unwrap();
    assert_eq!(slide.as_f64(), Some(2.0));
}

#[wasm_bindgen_test]
fn test_tracker_without_data_layer_is_silent() {
    let window = web_sys::window().unwrap();
    Reflect::delete_property(window.unchecked_ref(), &JsValue::from_str("adobeDataLayer"))
        .unwrap();
    DataLayerTracker::new().track(InteractionEvent::new("carousel-init", "carousel"));
}

// === Player host ===

fn host() -> BrightcoveHost {
    let window = web_sys::window().unwrap();
    BrightcoveHost::new(window, document())
}

#[wasm_bindgen_test]
fn test_host_without_library() {
    let host = host();
    assert!(!host.is_ready());
    assert!(!host.script_loaded(None));
    assert!(host.get_player("nope").is_none());
    assert!(host.init_player("nope").is_err());
}

#[wasm_bindgen_test]
fn test_young_unrendered_peer_is_pending() {
    let now = js_sys::Date::now();
    let block = fixture(&format!(
        "<video-js id=\"young\" data-dom-time=\"{now}\"></video-js>\
         <video-js id=\"done\" class=\"bc-player\"></video-js>"
    ));
    let host = host();
    assert!(host.has_pending_peers("other", 1500.0));
    assert!(!host.has_pending_peers("young", 1500.0));
    block.remove();
}

#[wasm_bindgen_test]
fn test_label_lands_on_iframe_and_wrapper() {
    let block = fixture(
        "<div class=\"carousel-media\"><video-js id=\"clip\"></video-js></div>",
    );
    let host = host();
    assert!(!host.apply_label("clip", "Waves"));
    let wrapper = block.query_selector(".carousel-media").unwrap().unwrap();
    assert_eq!(wrapper.get_attribute("role").as_deref(), Some("img"));
    assert_eq!(wrapper.get_attribute("tabindex").as_deref(), Some("0"));

    let media = document().get_element_by_id("clip").unwrap();
    media.set_inner_html("<iframe></iframe>");
    assert!(host.apply_label("clip", "Waves"));
    let iframe = media.query_selector("iframe").unwrap().unwrap();
    assert_eq!(iframe.get_attribute("title").as_deref(), Some("Waves"));
    assert_eq!(media.get_attribute("aria-label").as_deref(), Some("Waves"));
    block.remove();
}

#[wasm_bindgen_test]
fn test_embed_injects_loader_once() {
    let block = fixture("<video-js id=\"embedded\"></video-js>");
    let host = host();
    let request = BootstrapRequest {
        carousel_id: "carousel-1".into(),
        slide_index: 0,
        video_id: "embedded".into(),
        account: Some("123".into()),
        player: Some("abc".into()),
        embed: String::new(),
        label: None,
    };
    host.load_embed(&request).unwrap();
    host.load_embed(&request).unwrap();
    let scripts = document()
        .query_selector_all("script[src=\"https://players.brightcove.net/123/abc_default/index.min.js\"]")
        .unwrap();
    assert_eq!(scripts.length(), 1);
    let media = document().get_element_by_id("embedded").unwrap();
    assert!(media.has_attribute("data-dom-time"));
    block.remove();
}

// === Clock ===

#[wasm_bindgen_test]
async fn test_frames_move_forward() {
    let clock = RafClock;
    let first = clock.next_frame().await;
    let second = clock.next_frame().await;
    assert!(second > first);
    let before = clock.now();
    clock.sleep(20.0).await;
    assert!(clock.now() - before >= 15.0);
}
