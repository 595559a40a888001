//! Arena-backed HTML tree used by the block decorators.
//!
//! Blocks are decorated against this tree instead of the live document so the
//! decoration logic stays testable off the browser. The browser layer mounts
//! the tree once and afterwards replays the [`Patch`] journal to keep the live
//! DOM in step.

use scraper::{ElementRef, Html};

/// Handle to a node in a [`Dom`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// A mutation applied after journaling was switched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch {
    SetAttribute {
        node: NodeId,
        name: String,
        value: String,
    },
    RemoveAttribute {
        node: NodeId,
        name: String,
    },
    SetText {
        node: NodeId,
        text: String,
    },
    /// Insert `child` under `parent`, before `reference` or at the end.
    Insert {
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    },
    Remove {
        node: NodeId,
    },
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

#[derive(Debug, Clone, Default)]
pub struct Dom {
    nodes: Vec<Node>,
    journal: Option<Vec<Patch>>,
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `html` and wrap it in a detached `tag` element.
    pub fn from_fragment(tag: &str, html: &str) -> (Self, NodeId) {
        let mut dom = Self::new();
        let root = dom.create_element(tag);
        for child in dom.parse_fragment(html) {
            dom.append_child(root, child);
        }
        (dom, root)
    }

    // === Construction ===

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::Text(text.to_owned()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            data,
        });
        id
    }

    /// Parse an HTML fragment into detached top-level nodes.
    pub fn parse_fragment(&mut self, html: &str) -> Vec<NodeId> {
        let parsed = Html::parse_fragment(html);
        let root = parsed.root_element();
        let holder = self.create_element("template");
        self.import_children(holder, root);
        let children = self.nodes[holder.0].children.clone();
        for child in &children {
            self.nodes[child.0].parent = None;
        }
        self.nodes[holder.0].children.clear();
        children
    }

    fn import_children(&mut self, parent: NodeId, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                scraper::Node::Element(_) => {
                    let Some(child_el) = ElementRef::wrap(child) else {
                        continue;
                    };
                    let value = child_el.value();
                    let id = self.create_element(value.name());
                    if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
                        attrs.extend(value.attrs().map(|(k, v)| (k.to_owned(), v.to_owned())));
                    }
                    self.link(parent, id, None);
                    self.import_children(id, child_el);
                }
                scraper::Node::Text(text) => {
                    let id = self.create_text(&**text);
                    self.link(parent, id, None);
                }
                _ => {}
            }
        }
    }

    /// Copy `node` and its subtree. The copy is detached.
    pub fn deep_clone(&mut self, node: NodeId) -> NodeId {
        let data = self.nodes[node.0].data.clone();
        let copy = self.push(data);
        let children = self.nodes[node.0].children.clone();
        for child in children {
            let child_copy = self.deep_clone(child);
            self.link(copy, child_copy, None);
        }
        copy
    }

    // === Journal ===

    /// Start recording mutations as [`Patch`]es.
    pub fn start_journal(&mut self) {
        self.journal.get_or_insert_with(Vec::new);
    }

    pub fn take_patches(&mut self) -> Vec<Patch> {
        self.journal.as_mut().map(std::mem::take).unwrap_or_default()
    }

    fn record(&mut self, patch: Patch) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(patch);
        }
    }

    // === Structure ===

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.is_element(*c))
            .collect()
    }

    pub fn first_element_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0]
            .children
            .iter()
            .copied()
            .find(|c| self.is_element(*c))
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(self.nodes[node.0].data, NodeData::Element { .. })
    }

    /// Lowercase tag name, `None` for text nodes.
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Element { tag, .. } => Some(tag),
            NodeData::Text(_) => None,
        }
    }

    pub fn is_tag(&self, node: NodeId, name: &str) -> bool {
        self.tag(node) == Some(name)
    }

    /// Raw text of a text node.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].data {
            NodeData::Text(t) => Some(t),
            NodeData::Element { .. } => None,
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        self.nodes[child.0].parent = Some(parent);
        let siblings = &mut self.nodes[parent.0].children;
        match reference.and_then(|r| siblings.iter().position(|c| *c == r)) {
            Some(pos) => siblings.insert(pos, child),
            None => siblings.push(child),
        }
    }

    fn unlink(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.nodes[node.0].parent.take() else {
            return false;
        };
        self.nodes[parent.0].children.retain(|c| *c != node);
        true
    }

    /// Move `child` to the end of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_before(parent, child, None);
    }

    /// Move `child` before `reference` (or to the end when `reference` is not
    /// a child of `parent`).
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        if parent == child || self.is_ancestor(child, parent) {
            tracing::warn!(?parent, ?child, "refusing to insert a node into itself");
            return;
        }
        self.unlink(child);
        let reference = reference.filter(|r| self.nodes[r.0].parent == Some(parent));
        self.link(parent, child, reference);
        self.record(Patch::Insert {
            parent,
            child,
            reference,
        });
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        let first = self.nodes[parent.0].children.first().copied();
        self.insert_before(parent, child, first);
    }

    /// Detach `node` from its parent. The subtree stays in the arena.
    pub fn detach(&mut self, node: NodeId) {
        if self.unlink(node) {
            self.record(Patch::Remove { node });
        }
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.nodes[p.0].parent;
        }
        false
    }

    /// `node` itself or one of its ancestors.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.is_ancestor(ancestor, node)
    }

    // === Attributes ===

    pub fn attrs(&self, node: NodeId) -> &[(String, String)] {
        match &self.nodes[node.0].data {
            NodeData::Element { attrs, .. } => attrs,
            NodeData::Text(_) => &[],
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.attrs(node)
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, node: NodeId, name: &str) -> bool {
        self.attr(node, name).is_some()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data else {
            return;
        };
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) if v == value => return,
            Some((_, v)) => *v = value.to_owned(),
            None => attrs.push((name.to_owned(), value.to_owned())),
        }
        self.record(Patch::SetAttribute {
            node,
            name: name.to_owned(),
            value: value.to_owned(),
        });
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        let NodeData::Element { attrs, .. } = &mut self.nodes[node.0].data else {
            return;
        };
        let before = attrs.len();
        attrs.retain(|(k, _)| k != name);
        if attrs.len() != before {
            self.record(Patch::RemoveAttribute {
                node,
                name: name.to_owned(),
            });
        }
    }

    /// Remove every attribute whose name starts with `prefix`.
    pub fn remove_attrs_with_prefix(&mut self, node: NodeId, prefix: &str) {
        let names: Vec<String> = self
            .attrs(node)
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for name in names {
            self.remove_attr(node, &name);
        }
    }

    // === Classes ===

    pub fn classes(&self, node: NodeId) -> impl Iterator<Item = &str> {
        self.attr(node, "class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).any(|c| c == class)
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        if self.has_class(node, class) {
            return;
        }
        let mut value = self.attr(node, "class").unwrap_or("").trim().to_owned();
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(class);
        self.set_attr(node, "class", &value);
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        if !self.has_class(node, class) {
            return;
        }
        let value = self
            .classes(node)
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attr(node, "class", &value);
    }

    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    // === Text ===

    /// Concatenated text of the subtree.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(t) => out.push_str(t),
            NodeData::Element { .. } => {
                for child in &self.nodes[node.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Replace the children of `node` with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if self.text_content(node) == text && self.nodes[node.0].children.len() <= 1 {
            return;
        }
        let children = std::mem::take(&mut self.nodes[node.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            let id = self.create_text(text);
            self.link(node, id, None);
        }
        self.record(Patch::SetText {
            node,
            text: text.to_owned(),
        });
    }

    // === Serialisation ===

    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[node.0].children {
            self.write_html(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        match &self.nodes[node.0].data {
            NodeData::Text(t) => {
                let raw = self
                    .parent(node)
                    .and_then(|p| self.tag(p))
                    .is_some_and(|tag| RAW_TEXT_ELEMENTS.contains(&tag));
                if raw {
                    out.push_str(t);
                } else {
                    out.push_str(&html_escape::encode_text(t));
                }
            }
            NodeData::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &self.nodes[node.0].children {
                    self.write_html(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }

    /// Replace the children of `node` with the parsed `html`.
    pub fn set_inner_html(&mut self, node: NodeId, html: &str) {
        for child in self.nodes[node.0].children.clone() {
            self.detach(child);
        }
        for child in self.parse_fragment(html) {
            self.append_child(node, child);
        }
    }

    // === Queries ===

    /// Element descendants of `node` in document order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_descendants(node, &mut out);
        out
    }

    fn collect_descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for child in &self.nodes[node.0].children {
            if self.is_element(*child) {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    pub fn find_first(&self, node: NodeId, pred: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        self.descendants(node).into_iter().find(|n| pred(self, *n))
    }

    pub fn find_all(&self, node: NodeId, pred: impl Fn(&Dom, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|n| pred(self, *n))
            .collect()
    }

    /// First descendant whose tag is one of `tags`, in document order.
    pub fn find_tag(&self, node: NodeId, tags: &[&str]) -> Option<NodeId> {
        self.find_first(node, |dom, n| dom.tag(n).is_some_and(|t| tags.contains(&t)))
    }

    pub fn find_all_tags(&self, node: NodeId, tags: &[&str]) -> Vec<NodeId> {
        self.find_all(node, |dom, n| dom.tag(n).is_some_and(|t| tags.contains(&t)))
    }

    pub fn find_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.find_first(node, |dom, n| dom.has_class(n, class))
    }

    pub fn find_all_class(&self, node: NodeId, class: &str) -> Vec<NodeId> {
        self.find_all(node, |dom, n| dom.has_class(n, class))
    }

    /// Nearest inclusive ancestor matching `pred`.
    pub fn closest(&self, node: NodeId, pred: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_element(n) && pred(self, n) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_and_serialise_roundtrip() {
        let (dom, root) = Dom::from_fragment(
            "div",
            r#"<div class="a"><p>Hello &amp; <strong>world</strong></p><img src="x.png" alt="A"></div>"#,
        );
        assert_eq!(
            dom.inner_html(root),
            r#"<div class="a"><p>Hello &amp; <strong>world</strong></p><img src="x.png" alt="A"></div>"#
        );
        assert_eq!(dom.text_content(root), "Hello & world");
    }

    #[test]
    fn test_attributes_keep_source_order() {
        let html = r#"<a id="cta" href="/shop" title="Shop" class="button" role="button" tabindex="0" data-index="2" aria-label="Shop now">Shop</a>"#;
        for _ in 0..8 {
            let (dom, root) = Dom::from_fragment("div", html);
            assert_eq!(dom.inner_html(root), html);
        }
    }

    #[test]
    fn test_script_text_is_not_escaped() {
        let (dom, root) = Dom::from_fragment("div", "<script>if (a < b) {}</script>");
        assert_eq!(dom.inner_html(root), "<script>if (a < b) {}</script>");
    }

    #[test]
    fn test_append_moves_node() {
        let (mut dom, root) = Dom::from_fragment("div", "<p>one</p><section></section>");
        let children = dom.element_children(root);
        dom.append_child(children[1], children[0]);
        assert_eq!(dom.inner_html(root), "<section><p>one</p></section>");
        assert_eq!(dom.parent(children[0]), Some(children[1]));
    }

    #[test]
    fn test_class_helpers() {
        let mut dom = Dom::new();
        let el = dom.create_element("div");
        dom.add_class(el, "carousel-item");
        dom.add_class(el, "is-active");
        dom.add_class(el, "is-active");
        assert_eq!(dom.attr(el, "class"), Some("carousel-item is-active"));
        dom.toggle_class(el, "is-active", false);
        assert_eq!(dom.attr(el, "class"), Some("carousel-item"));
        assert!(dom.has_class(el, "carousel-item"));
    }

    #[test]
    fn test_journal_records_only_changes() {
        let mut dom = Dom::new();
        let el = dom.create_element("div");
        dom.set_attr(el, "role", "group");
        dom.start_journal();
        dom.set_attr(el, "role", "group");
        dom.set_attr(el, "aria-hidden", "true");
        dom.remove_attr(el, "missing");
        assert_eq!(
            dom.take_patches(),
            vec![Patch::SetAttribute {
                node: el,
                name: "aria-hidden".into(),
                value: "true".into()
            }]
        );
        assert!(dom.take_patches().is_empty());
    }

    #[test]
    fn test_deep_clone_is_detached_copy() {
        let (mut dom, root) = Dom::from_fragment("div", r#"<div data-aue-prop="x"><p>t</p></div>"#);
        let row = dom.element_children(root)[0];
        let copy = dom.deep_clone(row);
        assert_eq!(dom.parent(copy), None);
        dom.remove_attrs_with_prefix(copy, "data-aue-");
        assert_eq!(dom.outer_html(copy), "<div><p>t</p></div>");
        assert_eq!(dom.attr(row, "data-aue-prop"), Some("x"));
    }

    #[test]
    fn test_closest_and_find() {
        let (dom, root) = Dom::from_fragment(
            "div",
            r#"<div class="grid-columns"><div><picture><img src="a.jpg"></picture></div></div>"#,
        );
        let img = dom.find_tag(root, &["img"]).unwrap();
        let grid = dom.closest(img, |d, n| d.has_class(n, "grid-columns"));
        assert!(grid.is_some());
        assert_eq!(dom.find_tag(root, &["video", "picture"]).and_then(|n| dom.tag(n)), Some("picture"));
    }

    #[test]
    fn test_refuses_cycles() {
        let (mut dom, root) = Dom::from_fragment("div", "<div><p></p></div>");
        let outer = dom.element_children(root)[0];
        let inner = dom.element_children(outer)[0];
        dom.append_child(inner, outer);
        assert_eq!(dom.parent(outer), Some(root));
    }
}
