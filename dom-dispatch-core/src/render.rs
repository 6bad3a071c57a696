//! Mounting and dependency-scoped, focus-preserving updates
//!
//! The renderer has two phases. The first render mounts every registered
//! component into the container; every later render is an update pass that
//! only re-renders components whose dependency set intersects the changed
//! state keys.
//!
//! Updates write the new markup into the existing component root in one of
//! two ways:
//!
//! - **full replace** when focus is elsewhere: the component's inner markup
//!   is compared and replaced wholesale if it differs
//! - **focus preserving** when a text control inside the component has focus:
//!   children are patched one level deep, position by position, and the
//!   focused control (and any child containing it) is left alone so the user
//!   keeps typing into the same node

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::component::ComponentRegistry;
use crate::dom::{Document, NodeId, NodeKind};
use crate::error::{Error, Result};
use crate::listeners::ListenerBinder;
use crate::store::KeySet;

/// Renderer configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Attribute tagging each mounted component root with its name
    pub marker_attribute: String,
    /// Reserved name of a container-only pseudo-component that is never mounted
    pub container_component: String,
    /// `data-oninput` handler name -> state field mirrored by that input
    input_bindings: HashMap<String, String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            marker_attribute: "data-component-type".to_string(),
            container_component: "App".to_string(),
            input_bindings: HashMap::new(),
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_marker_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.marker_attribute = attribute.into();
        self
    }

    pub fn with_container_component(mut self, name: impl Into<String>) -> Self {
        self.container_component = name.into();
        self
    }

    /// Declare that inputs bound to `handler` mirror the state field `field`
    ///
    /// While such an input has focus, update passes write the field's value
    /// into it (keeping the selection) instead of re-creating the element.
    pub fn bind_input(mut self, handler: impl Into<String>, field: impl Into<String>) -> Self {
        self.add_input_binding(handler, field);
        self
    }

    pub fn add_input_binding(&mut self, handler: impl Into<String>, field: impl Into<String>) {
        self.input_bindings.insert(handler.into(), field.into());
    }

    pub fn input_binding(&self, handler: &str) -> Option<&str> {
        self.input_bindings.get(handler).map(String::as_str)
    }
}

/// Renderer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// No mount has happened yet
    #[default]
    Uninitialized,
    /// Initial mount is done; every render is an update pass
    Mounted,
}

/// A mounted component root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedInstance {
    pub component: String,
    pub node: NodeId,
}

/// Counters describing one render call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Render functions invoked
    pub rendered: usize,
    /// Components skipped as unaffected
    pub skipped: usize,
    /// Instances whose content was replaced wholesale
    pub replaced: usize,
    /// Instances patched around a focused element
    pub patched: usize,
    /// Instances whose markup was already up to date
    pub unchanged: usize,
}

/// Whether a component with `dependencies` must re-render for `changed`
///
/// An unscoped render (`None`) affects every component. A component with no
/// dependencies is never affected by a scoped render.
pub fn is_affected(dependencies: &KeySet, changed: Option<&KeySet>) -> bool {
    match changed {
        None => true,
        Some(changed) => dependencies.intersects(changed),
    }
}

/// Text form of a state value, as written into a bound input
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Mounts components and applies update passes to a [`Document`]
#[derive(Debug, Default)]
pub struct Renderer {
    config: RenderConfig,
    phase: Phase,
    container: Option<NodeId>,
    instances: Vec<MountedInstance>,
}

impl Renderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RenderConfig {
        &mut self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn container(&self) -> Option<NodeId> {
        self.container
    }

    pub fn instances(&self) -> &[MountedInstance] {
        &self.instances
    }

    /// Connected root nodes of `component`
    pub fn instances_of<'a>(
        &'a self,
        doc: &'a Document,
        component: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.instances
            .iter()
            .filter(move |instance| instance.component == component)
            .map(|instance| instance.node)
            .filter(move |&node| doc.is_connected(node))
    }

    /// Look up the container by element id, once
    ///
    /// Later calls reuse the cached node as long as it is still allocated.
    pub fn resolve_container(&mut self, doc: &Document, container_id: &str) -> Result<NodeId> {
        if let Some(container) = self.container.filter(|&c| doc.is_alive(c)) {
            return Ok(container);
        }
        match doc.element_by_id(container_id) {
            Some(container) => {
                self.container = Some(container);
                Ok(container)
            }
            None => {
                tracing::error!(container_id, "Root element not found");
                Err(Error::MissingContainer(container_id.to_string()))
            }
        }
    }

    /// Render every component into `container` and bind listeners
    pub fn mount<S: 'static>(
        &mut self,
        doc: &mut Document,
        container: NodeId,
        registry: &ComponentRegistry<S>,
        state: &S,
        binder: &mut ListenerBinder<S>,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        let freed = doc.clear_children(container);
        binder.forget(&freed);
        self.instances.clear();

        for entry in registry.iter() {
            if entry.name() == self.config.container_component {
                continue;
            }
            tracing::debug!(component = entry.name(), "Initial render");
            let markup = entry.render(state);
            stats.rendered += 1;

            let fragment = doc.parse_fragment(markup.trim());
            let root = fragment
                .iter()
                .copied()
                .find(|&node| doc.kind(node) == Some(NodeKind::Element));

            match root {
                Some(root) => {
                    if !doc.has_attribute(root, &self.config.marker_attribute) {
                        doc.set_attribute(root, &self.config.marker_attribute, entry.name());
                    }
                    doc.append_child(container, root);
                    self.instances.push(MountedInstance {
                        component: entry.name().to_string(),
                        node: root,
                    });
                }
                None => {
                    tracing::warn!(
                        component = entry.name(),
                        "Component did not render a valid element"
                    );
                }
            }
            for node in fragment.into_iter().filter(|&node| Some(node) != root) {
                doc.free(node);
            }
        }

        binder.scan(doc, container, None);
        self.phase = Phase::Mounted;
        tracing::info!(components = self.instances.len(), "App mounted");
        stats
    }

    /// Re-render components affected by `changed` (all of them for `None`)
    pub fn update<S: 'static>(
        &mut self,
        doc: &mut Document,
        registry: &ComponentRegistry<S>,
        tree: &Map<String, Value>,
        state: &S,
        changed: Option<&KeySet>,
        binder: &mut ListenerBinder<S>,
    ) -> RenderStats {
        let mut stats = RenderStats::default();
        self.instances.retain(|instance| doc.is_alive(instance.node));

        for entry in registry.iter() {
            if entry.name() == self.config.container_component {
                continue;
            }
            if !is_affected(entry.dependencies(), changed) {
                stats.skipped += 1;
                continue;
            }

            let nodes: Vec<NodeId> = self.instances_of(doc, entry.name()).collect();
            for node in nodes {
                let markup = entry.render(state);
                stats.rendered += 1;
                self.patch_instance(doc, node, &markup, tree, binder, &mut stats);
                tracing::trace!(component = entry.name(), "Instance updated");
            }
        }

        tracing::debug!(
            rendered = stats.rendered,
            skipped = stats.skipped,
            replaced = stats.replaced,
            patched = stats.patched,
            "Update pass finished"
        );
        stats
    }

    fn patch_instance<S>(
        &self,
        doc: &mut Document,
        node: NodeId,
        markup: &str,
        tree: &Map<String, Value>,
        binder: &mut ListenerBinder<S>,
        stats: &mut RenderStats,
    ) {
        let fragment = doc.parse_fragment(markup.trim());
        let new_root = fragment
            .iter()
            .copied()
            .find(|&n| doc.kind(n) == Some(NodeKind::Element));

        let focused = doc
            .active_element()
            .filter(|&f| doc.is_editable(f) && doc.contains(node, f));

        match focused {
            Some(focused) => {
                self.sync_bound_input(doc, focused, tree);
                patch_children(doc, node, new_root, focused, binder);
                binder.scan(doc, node, Some(focused));
                stats.patched += 1;
            }
            None => {
                let new_inner = new_root.map(|r| doc.inner_html(r)).unwrap_or_default();
                if new_inner.trim() == doc.inner_html(node).trim() {
                    stats.unchanged += 1;
                } else {
                    let freed = doc.clear_children(node);
                    binder.forget(&freed);
                    if let Some(new_root) = new_root {
                        for child in doc.children(new_root).to_vec() {
                            doc.append_child(node, child);
                        }
                    }
                    binder.scan(doc, node, None);
                    stats.replaced += 1;
                }
            }
        }

        for leftover in fragment {
            doc.free(leftover);
        }
    }

    /// Write the bound state field into a focused input, keeping its selection
    fn sync_bound_input(&self, doc: &mut Document, focused: NodeId, tree: &Map<String, Value>) {
        if doc.tag(focused) != Some("input") {
            return;
        }
        let Some(field) = doc
            .attribute(focused, "data-oninput")
            .and_then(|handler| self.config.input_binding(handler))
        else {
            return;
        };
        let Some(expected) = tree.get(field).map(value_text) else {
            return;
        };
        if doc.value(focused).as_deref() == Some(expected.as_str()) {
            return;
        }

        let selection = doc.selection(focused);
        doc.set_value(focused, expected);
        if let Some(selection) = selection {
            doc.set_selection_range(focused, selection.start, selection.end);
        }
    }
}

/// Whether two nodes render differently
fn differs(doc: &Document, old: NodeId, new: NodeId) -> bool {
    match (doc.kind(old), doc.kind(new)) {
        (Some(NodeKind::Text), Some(NodeKind::Text)) => doc.text(old) != doc.text(new),
        (Some(NodeKind::Element), Some(NodeKind::Element)) => {
            doc.outer_html(old) != doc.outer_html(new)
        }
        _ => true,
    }
}

/// One-level positional patch of `node`'s children that never touches the
/// child holding `focused`
fn patch_children<S>(
    doc: &mut Document,
    node: NodeId,
    new_root: Option<NodeId>,
    focused: NodeId,
    binder: &mut ListenerBinder<S>,
) {
    let old_children = doc.children(node).to_vec();
    let new_children = new_root
        .map(|root| doc.children(root).to_vec())
        .unwrap_or_default();

    for i in 0..old_children.len().max(new_children.len()) {
        match (old_children.get(i).copied(), new_children.get(i).copied()) {
            (Some(old), None) => {
                if !doc.contains(old, focused) {
                    let freed = doc.free(old);
                    binder.forget(&freed);
                }
            }
            (None, Some(new)) => doc.append_child(node, new),
            (Some(old), Some(new)) => {
                if doc.contains(old, focused) || !differs(doc, old, new) {
                    continue;
                }
                doc.replace_child(node, new, old);
                let freed = doc.free(old);
                binder.forget(&freed);
            }
            (None, None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::FnComponent;
    use crate::dom::Selection;
    use crate::listeners::HandlerRegistry;
    use serde_json::json;

    struct Fixture {
        doc: Document,
        registry: ComponentRegistry<Value>,
        binder: ListenerBinder<Value>,
        renderer: Renderer,
        container: NodeId,
    }

    fn fixture(config: RenderConfig) -> Fixture {
        let doc = Document::from_markup(r#"<div id="app"></div>"#);
        let mut renderer = Renderer::new(config);
        let container = renderer.resolve_container(&doc, "app").unwrap();
        let mut handlers = HandlerRegistry::new();
        handlers.register("updateMirrorText", |_, _, _| Ok(()));
        Fixture {
            doc,
            registry: ComponentRegistry::new(),
            binder: ListenerBinder::new(handlers),
            renderer,
            container,
        }
    }

    impl Fixture {
        fn mount(&mut self, state: &Value) -> RenderStats {
            self.renderer.mount(
                &mut self.doc,
                self.container,
                &self.registry,
                state,
                &mut self.binder,
            )
        }

        fn update(&mut self, state: &Value, changed: Option<&KeySet>) -> RenderStats {
            let tree = state.as_object().cloned().unwrap_or_default();
            self.renderer.update(
                &mut self.doc,
                &self.registry,
                &tree,
                state,
                changed,
                &mut self.binder,
            )
        }

        fn html(&self) -> String {
            self.doc.inner_html(self.container)
        }
    }

    fn mirror() -> FnComponent<impl Fn(&Value) -> String> {
        FnComponent::new("Mirror", ["mirror"], |s: &Value| {
            let text = s["mirror"].as_str().unwrap_or_default();
            format!(
                r#"<div><input id="m" value="{text}" data-oninput="updateMirrorText"><p>{text}</p></div>"#
            )
        })
    }

    #[test]
    fn test_missing_container() {
        let doc = Document::new();
        let mut renderer = Renderer::default();
        assert!(matches!(
            renderer.resolve_container(&doc, "app"),
            Err(Error::MissingContainer(id)) if id == "app"
        ));
    }

    #[test]
    fn test_mount_tags_and_orders_components() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry
            .register(FnComponent::new("B", ["b"], |_: &Value| "<p>b</p>".into()))
            .unwrap();
        fx.registry
            .register(FnComponent::new("App", ["a"], |_: &Value| "<main></main>".into()))
            .unwrap();
        fx.registry
            .register(FnComponent::new("A", ["a"], |_: &Value| {
                r#"<p data-component-type="Custom">a</p>"#.into()
            }))
            .unwrap();
        fx.registry
            .register(FnComponent::new("Empty", ["a"], |_: &Value| "just text".into()))
            .unwrap();

        let stats = fx.mount(&json!({}));

        assert_eq!(
            fx.html(),
            r#"<p data-component-type="B">b</p><p data-component-type="Custom">a</p>"#
        );
        assert_eq!(stats.rendered, 3);
        assert_eq!(fx.renderer.phase(), Phase::Mounted);
        assert_eq!(fx.renderer.instances().len(), 2);
    }

    #[test]
    fn test_scoped_update_skips_unaffected() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry
            .register(FnComponent::new("Counter", ["counter"], |s: &Value| {
                format!("<p>{}</p>", s["counter"])
            }))
            .unwrap();
        fx.registry
            .register(FnComponent::new("Label", ["label"], |s: &Value| {
                format!("<p>{}</p>", s["label"].as_str().unwrap_or_default())
            }))
            .unwrap();
        fx.registry
            .register(FnComponent::new("Static", Vec::<String>::new(), |s: &Value| {
                format!("<p>{}</p>", s["counter"])
            }))
            .unwrap();
        fx.mount(&json!({ "counter": 0, "label": "x" }));

        let state = json!({ "counter": 1, "label": "x" });
        let stats = fx.update(&state, Some(&KeySet::from_iter(["counter"])));

        assert_eq!(stats.rendered, 1);
        assert_eq!(stats.skipped, 2);
        assert_eq!(stats.replaced, 1);
        // empty dependency set: stale until an unscoped render
        assert!(fx.html().ends_with(r#"<p data-component-type="Static">0</p>"#));

        let stats = fx.update(&state, None);
        assert_eq!(stats.rendered, 3);
        assert_eq!(stats.unchanged, 2);
        assert!(fx.html().ends_with(r#"<p data-component-type="Static">1</p>"#));
    }

    #[test]
    fn test_identical_markup_is_not_rewritten() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry.register(mirror()).unwrap();
        let state = json!({ "mirror": "a" });
        fx.mount(&state);
        let input = fx.doc.element_by_id("m").unwrap();

        let stats = fx.update(&state, None);
        assert_eq!(stats.unchanged, 1);
        // same node survives
        assert_eq!(fx.doc.element_by_id("m"), Some(input));
    }

    #[test]
    fn test_full_replace_recreates_unfocused_input() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry.register(mirror()).unwrap();
        fx.mount(&json!({ "mirror": "a" }));
        let input = fx.doc.element_by_id("m").unwrap();

        let stats = fx.update(&json!({ "mirror": "b" }), Some(&KeySet::from_iter(["mirror"])));
        assert_eq!(stats.replaced, 1);
        assert!(!fx.doc.is_alive(input));
        let new_input = fx.doc.element_by_id("m").unwrap();
        assert!(fx.binder.is_attached(
            new_input,
            crate::event::EventType::Input,
            "updateMirrorText"
        ));
    }

    #[test]
    fn test_focused_input_survives_update() {
        let mut fx = fixture(RenderConfig::default().bind_input("updateMirrorText", "mirror"));
        fx.registry.register(mirror()).unwrap();
        fx.mount(&json!({ "mirror": "" }));

        let input = fx.doc.element_by_id("m").unwrap();
        assert!(fx.doc.focus(input));
        fx.doc.insert_text(input, "abc");

        let stats = fx.update(&json!({ "mirror": "abc" }), Some(&KeySet::from_iter(["mirror"])));

        assert_eq!(stats.patched, 1);
        assert_eq!(fx.doc.active_element(), Some(input));
        assert_eq!(fx.doc.value(input).as_deref(), Some("abc"));
        assert_eq!(fx.doc.selection(input), Some(Selection::caret(3)));
        // sibling content still follows the state
        assert!(fx.html().contains("<p>abc</p>"));
    }

    #[test]
    fn test_bound_input_takes_state_value_and_keeps_selection() {
        let mut fx = fixture(RenderConfig::default().bind_input("updateMirrorText", "mirror"));
        fx.registry.register(mirror()).unwrap();
        fx.mount(&json!({ "mirror": "hello" }));

        let input = fx.doc.element_by_id("m").unwrap();
        fx.doc.focus(input);
        fx.doc.set_selection_range(input, 1, 3);

        fx.update(&json!({ "mirror": "HELLO!" }), Some(&KeySet::from_iter(["mirror"])));

        assert_eq!(fx.doc.value(input).as_deref(), Some("HELLO!"));
        assert_eq!(fx.doc.selection(input), Some(Selection { start: 1, end: 3 }));
        assert_eq!(fx.doc.active_element(), Some(input));
    }

    #[test]
    fn test_focus_patch_adds_and_removes_children() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry
            .register(FnComponent::new("List", ["items"], |s: &Value| {
                let items: String = s["items"]
                    .as_array()
                    .into_iter()
                    .flatten()
                    .map(|item| format!("<li>{}</li>", item.as_str().unwrap_or_default()))
                    .collect();
                format!(r#"<div><input id="new">{items}</div>"#)
            }))
            .unwrap();
        fx.mount(&json!({ "items": ["a", "b"] }));
        let input = fx.doc.element_by_id("new").unwrap();
        fx.doc.focus(input);

        fx.update(&json!({ "items": ["a", "c", "d"] }), None);
        assert_eq!(
            fx.html(),
            r#"<div data-component-type="List"><input id="new"><li>a</li><li>c</li><li>d</li></div>"#
        );

        fx.update(&json!({ "items": [] }), None);
        assert_eq!(
            fx.html(),
            r#"<div data-component-type="List"><input id="new"></div>"#
        );
        assert_eq!(fx.doc.active_element(), Some(input));
    }

    #[test]
    fn test_focus_nested_in_child_is_preserved() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry
            .register(FnComponent::new("Form", ["n"], |s: &Value| {
                format!(r#"<div><label><input id="q" value="{}"></label><p>{}</p></div>"#, s["n"], s["n"])
            }))
            .unwrap();
        fx.mount(&json!({ "n": 1 }));
        let input = fx.doc.element_by_id("q").unwrap();
        fx.doc.focus(input);

        fx.update(&json!({ "n": 2 }), None);

        assert_eq!(fx.doc.active_element(), Some(input));
        assert!(fx.html().contains("<p>2</p>"));
    }

    #[test]
    fn test_removed_instance_is_skipped() {
        let mut fx = fixture(RenderConfig::default());
        fx.registry
            .register(FnComponent::new("Gone", ["x"], |_: &Value| "<p>x</p>".into()))
            .unwrap();
        fx.mount(&json!({ "x": 1 }));
        let node = fx.renderer.instances()[0].node;
        fx.doc.free(node);

        let stats = fx.update(&json!({ "x": 2 }), None);
        assert_eq!(stats.rendered, 0);
        assert!(fx.renderer.instances().is_empty());
    }
}
