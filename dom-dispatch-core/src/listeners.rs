//! Declarative listener binding
//!
//! Markup names handlers through `data-on*` attributes:
//!
//! ```text
//! <button data-onclick="incrementCounter">Increment</button>
//! ```
//!
//! The [`ListenerBinder`] scans subtrees for those attributes, resolves the
//! names in its [`HandlerRegistry`] and records one attachment per
//! `(node, event type, handler name)`. Scanning the same subtree again is a
//! no-op for bindings that are already attached.

use std::collections::HashMap;
use std::rc::Rc;

use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::event::{DomEvent, EventType};
use crate::runtime::Runtime;

/// Handler invoked for a bound event
///
/// Receives the runtime (to update state or touch the document), the event
/// and a snapshot of the state taken before the call.
pub type Handler<S> = Rc<dyn Fn(&mut Runtime<S>, &DomEvent, &S) -> Result<()>>;

/// Named event handlers available to markup
pub struct HandlerRegistry<S> {
    handlers: HashMap<String, Handler<S>>,
}

impl<S> Default for HandlerRegistry<S> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<S> std::fmt::Debug for HandlerRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

impl<S> HandlerRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a handler under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut Runtime<S>, &DomEvent, &S) -> Result<()> + 'static,
    {
        self.handlers.insert(name.into(), Rc::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler<S>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

struct Attachment<S> {
    kind: EventType,
    handler_name: String,
    handler: Handler<S>,
}

/// Attaches registry handlers to nodes carrying binding attributes
pub struct ListenerBinder<S> {
    handlers: HandlerRegistry<S>,
    attached: HashMap<NodeId, Vec<Attachment<S>>>,
}

impl<S> std::fmt::Debug for ListenerBinder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerBinder")
            .field("handlers", &self.handlers)
            .field("attached_nodes", &self.attached.len())
            .finish()
    }
}

impl<S> ListenerBinder<S> {
    pub fn new(handlers: HandlerRegistry<S>) -> Self {
        Self {
            handlers,
            attached: HashMap::new(),
        }
    }

    pub fn handlers(&self) -> &HandlerRegistry<S> {
        &self.handlers
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry<S> {
        &mut self.handlers
    }

    /// Attach handlers for every binding in `root`'s subtree
    ///
    /// Nodes inside `exclude` (typically the focused element) are skipped.
    /// Returns the number of newly attached listeners.
    pub fn scan(&mut self, doc: &Document, root: NodeId, exclude: Option<NodeId>) -> usize {
        let mut added = 0;
        for node in doc.descendants(root) {
            if exclude.is_some_and(|excluded| doc.contains(excluded, node)) {
                continue;
            }
            for kind in EventType::ALL {
                let Some(name) = doc
                    .attribute(node, kind.binding_attribute())
                    .filter(|name| !name.is_empty())
                else {
                    continue;
                };
                if self.is_attached(node, kind, name) {
                    continue;
                }
                let Some(handler) = self.handlers.get(name) else {
                    tracing::warn!(
                        handler = name,
                        attribute = kind.binding_attribute(),
                        tag = doc.tag(node).unwrap_or_default(),
                        "Handler function not found"
                    );
                    continue;
                };
                self.attached.entry(node).or_default().push(Attachment {
                    kind,
                    handler_name: name.to_string(),
                    handler,
                });
                added += 1;
            }
        }
        if added > 0 {
            tracing::trace!(added, "Attached listeners");
        }
        added
    }

    pub fn is_attached(&self, node: NodeId, kind: EventType, handler_name: &str) -> bool {
        self.attached.get(&node).is_some_and(|list| {
            list.iter()
                .any(|a| a.kind == kind && a.handler_name == handler_name)
        })
    }

    /// Number of listeners attached to `node`
    pub fn attached_count(&self, node: NodeId) -> usize {
        self.attached.get(&node).map_or(0, Vec::len)
    }

    /// Handlers attached to `node` for `kind`, in attachment order
    pub fn listeners(&self, node: NodeId, kind: EventType) -> Vec<(String, Handler<S>)> {
        self.attached
            .get(&node)
            .map(|list| {
                list.iter()
                    .filter(|a| a.kind == kind)
                    .map(|a| (a.handler_name.clone(), a.handler.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Drop attachments of nodes that were freed
    pub fn forget(&mut self, nodes: &[NodeId]) {
        for node in nodes {
            self.attached.remove(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binder() -> ListenerBinder<()> {
        let mut handlers = HandlerRegistry::new();
        handlers
            .register("inc", |_, _, _| Ok(()))
            .register("typed", |_, _, _| Ok(()));
        ListenerBinder::new(handlers)
    }

    #[test]
    fn test_scan_is_idempotent() {
        let doc = Document::from_markup(
            r#"<div data-onclick="inc"><button data-onclick="inc">+</button></div>"#,
        );
        let mut binder = binder();

        assert_eq!(binder.scan(&doc, doc.body(), None), 2);
        assert_eq!(binder.scan(&doc, doc.body(), None), 0);

        let div = doc.first_element_child(doc.body()).unwrap();
        assert_eq!(binder.attached_count(div), 1);
        assert_eq!(binder.listeners(div, EventType::Click).len(), 1);
    }

    #[test]
    fn test_scan_includes_root() {
        let mut doc = Document::new();
        let button = doc.parse_fragment(r#"<button data-onclick="inc">+</button>"#)[0];
        let mut binder = binder();

        assert_eq!(binder.scan(&doc, button, None), 1);
        assert!(binder.is_attached(button, EventType::Click, "inc"));
    }

    #[test]
    fn test_multiple_kinds_on_one_node() {
        let doc = Document::from_markup(
            r#"<input id="i" data-oninput="typed" data-onchange="typed" data-onclick="inc">"#,
        );
        let mut binder = binder();
        binder.scan(&doc, doc.body(), None);

        let input = doc.element_by_id("i").unwrap();
        assert_eq!(binder.attached_count(input), 3);
        assert!(binder.is_attached(input, EventType::Change, "typed"));
        assert!(binder.listeners(input, EventType::Submit).is_empty());
    }

    #[test]
    fn test_excluded_subtree_is_skipped() {
        let doc = Document::from_markup(
            r#"<div><label id="l" data-onclick="inc"><input id="i" data-oninput="typed"></label><button data-onclick="inc"></button></div>"#,
        );
        let label = doc.element_by_id("l").unwrap();
        let input = doc.element_by_id("i").unwrap();
        let mut binder = binder();

        assert_eq!(binder.scan(&doc, doc.body(), Some(label)), 1);
        assert_eq!(binder.attached_count(label), 0);
        assert_eq!(binder.attached_count(input), 0);
    }

    #[test]
    fn test_missing_handler_is_inert() {
        let doc = Document::from_markup(r#"<button data-onclick="nope">x</button>"#);
        let mut binder = binder();

        assert_eq!(binder.scan(&doc, doc.body(), None), 0);
        // still inert on rescan
        assert_eq!(binder.scan(&doc, doc.body(), None), 0);
    }

    #[test]
    fn test_forget_freed_nodes() {
        let mut doc = Document::from_markup(r#"<button data-onclick="inc">x</button>"#);
        let button = doc.first_element_child(doc.body()).unwrap();
        let mut binder = binder();
        binder.scan(&doc, doc.body(), None);

        let freed = doc.free(button);
        binder.forget(&freed);
        assert_eq!(binder.attached_count(button), 0);
    }
}
