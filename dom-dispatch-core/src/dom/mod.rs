//! Arena-backed document tree
//!
//! The document is the in-process stand-in for a browser DOM. Nodes live in a
//! slot arena and are addressed by generational [`NodeId`]s, so a handle to a
//! freed node never aliases a node allocated later.
//!
//! Besides the tree itself the document tracks the pieces of browser state the
//! renderer depends on:
//!
//! - the active (focused) element
//! - live values of form controls, separate from their `value` attribute
//! - selection ranges of text controls, counted in characters

mod parse;
mod serialize;

pub use serialize::{escape_attribute, escape_html};

/// Handle to a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// Kind of a document node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
}

/// Selection range of a text control, in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// A collapsed selection (caret) at `offset`
    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    fn clamped(self, len: usize) -> Self {
        let end = self.end.min(len);
        Self {
            start: self.start.min(end),
            end,
        }
    }
}

#[derive(Debug, Clone)]
struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    live_value: Option<String>,
    selection: Option<Selection>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Elements that never have children
pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// A document tree rooted at a `<body>` element
#[derive(Debug)]
pub struct Document {
    slots: Vec<Slot>,
    free: Vec<u32>,
    body: NodeId,
    active: Option<NodeId>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only `<body>`
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            free: Vec::new(),
            body: NodeId {
                index: 0,
                generation: 0,
            },
            active: None,
        };
        doc.body = doc.create_element("body");
        doc
    }

    /// Create a document and parse `markup` into its body
    pub fn from_markup(markup: &str) -> Self {
        let mut doc = Self::new();
        let body = doc.body;
        doc.set_inner_html(body, markup);
        doc
    }

    /// The root `<body>` element
    pub fn body(&self) -> NodeId {
        self.body
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let node = Node {
            data,
            parent: None,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.generation = slot.generation.wrapping_add(1);
                slot.node = Some(node);
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeId {
                    index,
                    generation: 0,
                }
            }
        }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.node(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.node_mut(id)?.data {
            NodeData::Element(el) => Some(el),
            NodeData::Text(_) => None,
        }
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(NodeData::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            live_value: None,
            selection: None,
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()))
    }

    /// Whether `id` still refers to an allocated node
    pub fn is_alive(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|node| match node.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
        })
    }

    /// Tag name of an element (lowercase)
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|el| el.tag.as_str())
    }

    /// Data of a text node
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element(_) => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)?
            .attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        self.element(id)
            .map(|el| el.attributes.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let Some(el) = self.element_mut(id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        let value = value.into();
        match el.attributes.iter_mut().find(|(attr, _)| *attr == name) {
            Some((_, existing)) => *existing = value,
            None => el.attributes.push((name, value)),
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) {
        if let Some(el) = self.element_mut(id) {
            el.attributes.retain(|(attr, _)| attr != name);
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// First child that is an element
    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&child| self.kind(child) == Some(NodeKind::Element))
    }

    /// Remove `id` from its parent's child list, keeping it allocated
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).and_then(|node| node.parent) else {
            return;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.retain(|&child| child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
        self.drop_focus_outside_document();
    }

    /// Append `child` to `parent`, moving it out of its current parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.is_alive(parent) || !self.is_alive(child) || self.contains(child, parent) {
            return;
        }
        self.detach(child);
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Detach `child` from `parent`; returns false if it was not a child
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// Put `new` in the position of `old` under `parent`, detaching `old`
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> bool {
        if self.parent(old) != Some(parent) || !self.is_alive(new) || self.contains(new, parent) {
            return false;
        }
        self.detach(new);
        let Some(position) = self
            .children(parent)
            .iter()
            .position(|&child| child == old)
        else {
            return false;
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children[position] = new;
        }
        if let Some(node) = self.node_mut(new) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(old) {
            node.parent = None;
        }
        self.drop_focus_outside_document();
        true
    }

    /// Detach and deallocate `id` with its whole subtree
    ///
    /// Returns the ids that were freed so owners of per-node data can forget
    /// them.
    pub fn free(&mut self, id: NodeId) -> Vec<NodeId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        self.detach(id);
        let freed = self.descendants(id);
        for &node in &freed {
            if let Some(slot) = self.slots.get_mut(node.index as usize) {
                slot.node = None;
                self.free.push(node.index);
            }
        }
        if self.active.is_some_and(|active| freed.contains(&active)) {
            self.active = None;
        }
        freed
    }

    /// Free every child of `id`
    pub fn clear_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = self.children(id).to_vec();
        children
            .into_iter()
            .flat_map(|child| self.free(child))
            .collect()
    }

    /// Whether `node` is `ancestor` or one of its descendants
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Whether `id` is reachable from `<body>`
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_alive(id) && self.contains(self.body, id)
    }

    /// `root` and all of its descendants in document order
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.is_alive(id) {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Connected element whose `id` attribute equals `element_id`
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .find(|&id| self.attribute(id, "id") == Some(element_id))
    }

    /// Elements under `root` (inclusive) carrying `name`, optionally with `value`
    pub fn query_attribute(&self, root: NodeId, name: &str, value: Option<&str>) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| match (self.attribute(id, name), value) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect()
    }

    /// Parse `markup` into detached top-level nodes
    pub fn parse_fragment(&mut self, markup: &str) -> Vec<NodeId> {
        parse::parse_fragment(self, markup)
    }

    /// Replace the children of `id` with the nodes parsed from `markup`
    ///
    /// Returns the ids freed by removing the previous children.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Vec<NodeId> {
        if !self.is_alive(id) {
            return Vec::new();
        }
        let freed = self.clear_children(id);
        for node in self.parse_fragment(markup) {
            self.append_child(id, node);
        }
        freed
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            serialize::write_node(self, child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        serialize::write_node(self, id, &mut out);
        out
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    /// Whether `id` is an editable text control (`input` or `textarea`)
    pub fn is_editable(&self, id: NodeId) -> bool {
        matches!(self.tag(id), Some("input" | "textarea"))
    }

    fn is_focusable(&self, id: NodeId) -> bool {
        matches!(
            self.tag(id),
            Some("input" | "textarea" | "select" | "button")
        ) || self.has_attribute(id, "tabindex")
    }

    /// Move focus to `id`; returns false if it cannot take focus
    pub fn focus(&mut self, id: NodeId) -> bool {
        if !self.is_connected(id) || !self.is_focusable(id) {
            return false;
        }
        if self.is_editable(id) && self.selection(id).is_none() {
            let len = self.value_len(id);
            if let Some(el) = self.element_mut(id) {
                el.selection = Some(Selection::caret(len));
            }
        }
        self.active = Some(id);
        true
    }

    pub fn blur(&mut self) {
        self.active = None;
    }

    /// The focused element, if any
    pub fn active_element(&self) -> Option<NodeId> {
        self.active.filter(|&id| self.is_connected(id))
    }

    fn drop_focus_outside_document(&mut self) {
        if self.active.is_some_and(|id| !self.is_connected(id)) {
            self.active = None;
        }
    }

    /// Current value of a form control
    ///
    /// Text controls report their live value, falling back to the default
    /// (the `value` attribute for `input`, the text content for `textarea`).
    /// Other elements report their `value` attribute.
    pub fn value(&self, id: NodeId) -> Option<String> {
        let el = self.element(id)?;
        match el.tag.as_str() {
            "input" => Some(
                el.live_value
                    .clone()
                    .or_else(|| self.attribute(id, "value").map(str::to_string))
                    .unwrap_or_default(),
            ),
            "textarea" => Some(
                el.live_value
                    .clone()
                    .unwrap_or_else(|| self.text_content(id)),
            ),
            _ => self.attribute(id, "value").map(str::to_string),
        }
    }

    fn value_len(&self, id: NodeId) -> usize {
        self.value(id).map(|v| v.chars().count()).unwrap_or(0)
    }

    /// Set the live value of a text control; the caret moves to the end
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) {
        if !self.is_editable(id) {
            return;
        }
        let value = value.into();
        let len = value.chars().count();
        if let Some(el) = self.element_mut(id) {
            el.live_value = Some(value);
            el.selection = Some(Selection::caret(len));
        }
    }

    pub fn selection(&self, id: NodeId) -> Option<Selection> {
        self.element(id)?.selection
    }

    /// Set the selection range of a text control, clamped to its value
    pub fn set_selection_range(&mut self, id: NodeId, start: usize, end: usize) {
        if !self.is_editable(id) {
            return;
        }
        let len = self.value_len(id);
        if let Some(el) = self.element_mut(id) {
            el.selection = Some(Selection { start, end }.clamped(len));
        }
    }

    /// Replace the current selection of a text control with `text`
    pub fn insert_text(&mut self, id: NodeId, text: &str) {
        let Some(current) = self.value(id).filter(|_| self.is_editable(id)) else {
            return;
        };
        let len = current.chars().count();
        let selection = self
            .selection(id)
            .unwrap_or(Selection::caret(len))
            .clamped(len);

        let mut next: String = current.chars().take(selection.start).collect();
        next.push_str(text);
        next.extend(current.chars().skip(selection.end));

        let caret = selection.start + text.chars().count();
        if let Some(el) = self.element_mut(id) {
            el.live_value = Some(next);
            el.selection = Some(Selection::caret(caret));
        }
    }
}
