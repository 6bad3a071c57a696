//! Test utilities for dom-dispatch applications
//!
//! - [`TestHarness`]: a runtime mounted into `<div id="app">` with helpers to
//!   find bound elements, drive interactions and inspect markup
//! - Assertion macros for checking rendered markup
//!
//! # Example
//!
//! ```
//! use dom_dispatch_core::testing::TestHarness;
//! use dom_dispatch_core::{assert_html_contains, patch, FnComponent};
//! use serde_json::{json, Value};
//!
//! let mut harness = TestHarness::new(json!({ "counter": 0 }))
//!     .component(FnComponent::new("Counter", ["counter"], |s: &Value| {
//!         format!(r#"<div><b>{}</b><button data-onclick="inc">+</button></div>"#, s["counter"])
//!     }))
//!     .handler("inc", |rt, _, s| {
//!         let next = s["counter"].as_i64().unwrap_or(0) + 1;
//!         rt.set_state(patch!({ "counter": next }))
//!     })
//!     .mount();
//!
//! harness.click("inc");
//! assert_html_contains!(harness, "<b>1</b>");
//! ```

use std::ops::{Deref, DerefMut};

use crate::component::Component;
use crate::dom::{Document, NodeId};
use crate::error::Result;
use crate::event::{DomEvent, EventType};
use crate::runtime::Runtime;
use crate::store::State;

/// Id of the container element the harness mounts into
pub const CONTAINER_ID: &str = "app";

/// A runtime over a fresh `<div id="app">` document
///
/// Derefs to [`Runtime`], so every runtime method is available directly.
/// Helper methods panic on failure, which is what tests want.
pub struct TestHarness<S> {
    runtime: Runtime<S>,
}

impl<S: State> TestHarness<S> {
    /// # Panics
    ///
    /// Panics if `initial` does not serialize to a JSON object.
    pub fn new(initial: S) -> Self {
        let document = Document::from_markup(&format!(r#"<div id="{CONTAINER_ID}"></div>"#));
        let runtime = Runtime::new(initial, document)
            .unwrap_or_else(|e| panic!("invalid initial state: {e}"));
        Self { runtime }
    }

    /// Register a component
    ///
    /// # Panics
    ///
    /// Panics if the registry rejects the component.
    pub fn component(mut self, component: impl Component<S>) -> Self {
        if let Err(e) = self.runtime.register_component(component) {
            panic!("component registration failed: {e}");
        }
        self
    }

    pub fn handler<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut Runtime<S>, &DomEvent, &S) -> Result<()> + 'static,
    {
        self.runtime.register_handler(name, handler);
        self
    }

    pub fn bind_input(mut self, handler: &str, field: &str) -> Self {
        self.runtime.bind_input(handler, field);
        self
    }

    /// Mount into the container
    ///
    /// # Panics
    ///
    /// Panics if mounting fails.
    pub fn mount(mut self) -> Self {
        if let Err(e) = self.runtime.render_app(CONTAINER_ID) {
            panic!("mount failed: {e}");
        }
        self
    }

    pub fn runtime(&self) -> &Runtime<S> {
        &self.runtime
    }

    pub fn into_runtime(self) -> Runtime<S> {
        self.runtime
    }

    fn container(&self) -> NodeId {
        self.runtime
            .element_by_id(CONTAINER_ID)
            .unwrap_or_else(|| panic!("container #{CONTAINER_ID} is gone"))
    }

    /// Inner markup of the container
    pub fn html(&self) -> String {
        self.runtime.document().inner_html(self.container())
    }

    /// Outer markup of the first mounted instance of `component`
    ///
    /// # Panics
    ///
    /// Panics if the component has no mounted instance.
    pub fn component_html(&self, component: &str) -> String {
        let node = self
            .runtime
            .component_nodes(component)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("component {component:?} is not mounted"));
        self.runtime.document().outer_html(node)
    }

    /// First element bound to `handler` for `kind`
    ///
    /// # Panics
    ///
    /// Panics if no element carries the binding.
    pub fn binding(&self, kind: EventType, handler: &str) -> NodeId {
        self.runtime.find_binding(kind, handler).unwrap_or_else(|| {
            panic!("no element with {}={handler:?}", kind.binding_attribute())
        })
    }

    /// Element with id `element_id`
    ///
    /// # Panics
    ///
    /// Panics if it does not exist.
    pub fn by_id(&self, element_id: &str) -> NodeId {
        self.runtime
            .element_by_id(element_id)
            .unwrap_or_else(|| panic!("no element with id {element_id:?}"))
    }

    /// Text content of the element with id `element_id`
    pub fn text_of(&self, element_id: &str) -> String {
        self.runtime.document().text_content(self.by_id(element_id))
    }

    /// Click the first element bound to `handler`
    pub fn click(&mut self, handler: &str) -> usize {
        let node = self.binding(EventType::Click, handler);
        self.runtime
            .click(node)
            .unwrap_or_else(|e| panic!("click on {handler:?} failed: {e}"))
    }

    /// Type into the first element bound to `handler` for `input`
    pub fn type_into(&mut self, handler: &str, text: &str) -> NodeId {
        let node = self.binding(EventType::Input, handler);
        if let Err(e) = self.runtime.type_text(node, text) {
            panic!("typing into {handler:?} failed: {e}");
        }
        node
    }

    /// Set the value of the element with id `element_id` (fires input and change)
    pub fn set_value_of(&mut self, element_id: &str, value: &str) {
        let node = self.by_id(element_id);
        if let Err(e) = self.runtime.set_value(node, value) {
            panic!("setting #{element_id} failed: {e}");
        }
    }
}

impl<S> Deref for TestHarness<S> {
    type Target = Runtime<S>;

    fn deref(&self) -> &Self::Target {
        &self.runtime
    }
}

impl<S> DerefMut for TestHarness<S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.runtime
    }
}

/// Assert that the harness markup contains a snippet.
///
/// # Example
///
/// ```ignore
/// assert_html_contains!(harness, "<strong>2</strong>");
/// ```
#[macro_export]
macro_rules! assert_html_contains {
    ($harness:expr, $snippet:expr) => {{
        let html = $harness.html();
        assert!(
            html.contains($snippet),
            "Expected markup to contain {:?}\nmarkup: {}",
            $snippet,
            html
        );
    }};
}

/// Assert that the harness markup does NOT contain a snippet.
#[macro_export]
macro_rules! assert_html_not_contains {
    ($harness:expr, $snippet:expr) => {{
        let html = $harness.html();
        assert!(
            !html.contains($snippet),
            "Expected markup NOT to contain {:?}\nmarkup: {}",
            $snippet,
            html
        );
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::FnComponent;
    use crate::patch;
    use serde_json::{json, Value};

    fn mirror() -> TestHarness<Value> {
        TestHarness::new(json!({ "mirror_text": "" }))
            .component(FnComponent::new("Mirror", ["mirror_text"], |s: &Value| {
                let text = s["mirror_text"].as_str().unwrap_or_default();
                format!(
                    r#"<div><input id="mirrorInput" value="{text}" data-oninput="updateMirrorText"><p id="mirrorOut">{text}</p></div>"#
                )
            }))
            .handler("updateMirrorText", |rt, event, _| {
                rt.set_state(patch!({ "mirror_text": event.value() }))
            })
            .bind_input("updateMirrorText", "mirror_text")
            .mount()
    }

    #[test]
    fn test_type_into_keeps_focus() {
        let mut harness = mirror();
        let input = harness.type_into("updateMirrorText", "hey");

        assert_eq!(harness.text_of("mirrorOut"), "hey");
        assert_eq!(harness.document().active_element(), Some(input));
        assert_html_contains!(harness, r#"data-component-type="Mirror""#);
    }

    #[test]
    fn test_set_value_of_fires_input() {
        let mut harness = mirror();
        harness.set_value_of("mirrorInput", "abc");
        assert_eq!(harness.state()["mirror_text"], json!("abc"));
        assert_html_not_contains!(harness, "<p id=\"mirrorOut\"></p>");
    }

    #[test]
    #[should_panic(expected = "not mounted")]
    fn test_component_html_panics_for_unknown() {
        mirror().component_html("Nope");
    }
}
