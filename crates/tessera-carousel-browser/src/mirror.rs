//! Live-DOM mirror of a carousel's arena tree.
//!
//! The block is imported into a [`Dom`] once, decorated there, and mounted
//! back. Afterwards every [`Patch`] the carousel journals is replayed against
//! the live nodes.

use std::collections::HashMap;

use js_sys::Reflect;
use tessera_common::dom::{Dom, NodeId, Patch};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Node};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Expando holding a mounted element's arena index.
const NODE_KEY: &str = "__tesseraNode";

/// Copy a live element and its subtree into a fresh arena.
pub fn import(element: &Element) -> (Dom, NodeId) {
    let tag = element.tag_name().to_ascii_lowercase();
    let (mut dom, root) = Dom::from_fragment(&tag, &element.inner_html());
    let names = element.get_attribute_names();
    for name in names.iter().filter_map(|n| n.as_string()) {
        if let Some(value) = element.get_attribute(&name) {
            dom.set_attr(root, &name, &value);
        }
    }
    (dom, root)
}

pub struct DomMirror {
    document: Document,
    root: Element,
    nodes: HashMap<NodeId, Node>,
    by_index: HashMap<usize, NodeId>,
}

impl DomMirror {
    /// Replace `live`'s attributes and children with the arena's `root`.
    pub fn mount(document: Document, live: Element, dom: &Dom, root: NodeId) -> Self {
        let mut mirror = Self {
            document,
            root: live.clone(),
            nodes: HashMap::new(),
            by_index: HashMap::new(),
        };
        for (name, value) in dom.attrs(root) {
            if let Err(err) = live.set_attribute(name, value) {
                tracing::debug!(name, ?err, "attribute rejected by the browser");
            }
        }
        live.set_inner_html("");
        mirror.bind(root, live.clone().into());
        for child in dom.children(root) {
            if let Some(node) = mirror.materialize(dom, *child, None) {
                let _ = live.append_child(&node);
            }
        }
        mirror
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn element(&self, id: NodeId) -> Option<Element> {
        self.nodes.get(&id).and_then(|n| n.dyn_ref::<Element>().cloned())
    }

    /// Nearest mounted arena node at or above a live event target.
    pub fn resolve(&self, target: &JsValue) -> Option<NodeId> {
        let mut current = target.dyn_ref::<Node>().cloned();
        while let Some(node) = current {
            if let Ok(index) = Reflect::get(&node, &JsValue::from_str(NODE_KEY))
                && let Some(index) = index.as_f64()
            {
                let hit = self
                    .by_index
                    .get(&(index as usize))
                    .filter(|id| self.nodes.get(id).is_some_and(|m| m.is_same_node(Some(&node))));
                if let Some(id) = hit {
                    return Some(*id);
                }
            }
            if self.root.is_same_node(Some(&node)) {
                return None;
            }
            current = node.parent_node();
        }
        None
    }

    /// Replay journaled mutations. Patches on nodes that never reached the
    /// live tree are skipped; they show up when an ancestor is inserted.
    pub fn apply(&mut self, dom: &Dom, patches: Vec<Patch>) {
        for patch in patches {
            match patch {
                Patch::SetAttribute { node, name, value } => {
                    if let Some(element) = self.element(node)
                        && let Err(err) = element.set_attribute(&name, &value)
                    {
                        tracing::debug!(%name, ?err, "attribute rejected by the browser");
                    }
                }
                Patch::RemoveAttribute { node, name } => {
                    if let Some(element) = self.element(node) {
                        let _ = element.remove_attribute(&name);
                    }
                }
                Patch::SetText { node, text } => {
                    let Some(live) = self.nodes.get(&node).cloned() else {
                        continue;
                    };
                    live.set_text_content(Some(text.as_str()));
                    // the arena made a fresh text child; adopt the browser's
                    if let (Some(&child), Some(first)) =
                        (dom.children(node).first(), live.first_child())
                    {
                        self.bind(child, first);
                    }
                }
                Patch::Insert {
                    parent,
                    child,
                    reference,
                } => {
                    let Some(live_parent) = self.nodes.get(&parent).cloned() else {
                        continue;
                    };
                    let ns = live_parent
                        .dyn_ref::<Element>()
                        .and_then(|e| e.namespace_uri())
                        .filter(|ns| ns == SVG_NS);
                    let Some(live_child) = self.materialize(dom, child, ns.as_deref()) else {
                        continue;
                    };
                    let live_reference = reference.and_then(|r| self.nodes.get(&r).cloned());
                    if let Err(err) = live_parent.insert_before(&live_child, live_reference.as_ref()) {
                        tracing::warn!(?err, ?child, "live insert failed");
                    }
                }
                Patch::Remove { node } => {
                    if let Some(live) = self.nodes.get(&node)
                        && let Some(parent) = live.parent_node()
                    {
                        let _ = parent.remove_child(live);
                    }
                }
            }
        }
    }

    fn bind(&mut self, id: NodeId, node: Node) {
        if node.is_instance_of::<Element>() {
            let _ = Reflect::set(
                &node,
                &JsValue::from_str(NODE_KEY),
                &JsValue::from_f64(id.index() as f64),
            );
        }
        self.by_index.insert(id.index(), id);
        self.nodes.insert(id, node);
    }

    /// Live node for `id`, created from the arena's current state when it
    /// was never mounted. Already mounted children are moved, not rebuilt.
    fn materialize(&mut self, dom: &Dom, id: NodeId, ns: Option<&str>) -> Option<Node> {
        if let Some(existing) = self.nodes.get(&id) {
            return Some(existing.clone());
        }
        if let Some(text) = dom.text(id) {
            let node: Node = self.document.create_text_node(text).into();
            self.bind(id, node.clone());
            return Some(node);
        }
        let tag = dom.tag(id)?;
        let ns = if tag == "svg" { Some(SVG_NS) } else { ns };
        let element = match ns {
            Some(ns) => self.document.create_element_ns(Some(ns), tag),
            None => self.document.create_element(tag),
        };
        let element = match element {
            Ok(element) => element,
            Err(err) => {
                tracing::warn!(tag, ?err, "could not create element");
                return None;
            }
        };
        for (name, value) in dom.attrs(id) {
            if let Err(err) = element.set_attribute(name, value) {
                tracing::debug!(name, ?err, "attribute rejected by the browser");
            }
        }
        let node: Node = element.into();
        self.bind(id, node.clone());
        for child in dom.children(id) {
            if let Some(live) = self.materialize(dom, *child, ns) {
                let _ = node.append_child(&live);
            }
        }
        Some(node)
    }
}
