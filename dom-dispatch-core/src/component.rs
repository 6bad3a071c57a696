//! Components and the component registry

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::store::KeySet;

/// A pure UI element rendered from state
///
/// Components follow these rules:
/// 1. `render` is a pure function of the state, returning markup
/// 2. `dependencies` names the top-level state fields `render` reads
/// 3. state changes go through handlers, never through `render`
///
/// Use `#[component]` from `dom-dispatch-macros` to derive the dependency set
/// from the render function body, or [`FnComponent`] to declare it by hand.
///
/// # Example
///
/// ```
/// use dom_dispatch_core::{Component, KeySet};
///
/// struct Counter;
///
/// impl Component<serde_json::Value> for Counter {
///     fn name(&self) -> &str {
///         "Counter"
///     }
///
///     fn dependencies(&self) -> KeySet {
///         KeySet::from_iter(["counter"])
///     }
///
///     fn render(&self, state: &serde_json::Value) -> String {
///         format!("<div><strong>{}</strong></div>", state["counter"])
///     }
/// }
/// ```
pub trait Component<S>: 'static {
    /// Unique registry name, also written to the component marker attribute
    fn name(&self) -> &str;

    /// Top-level state fields this component reads
    ///
    /// Queried once at registration. An empty set means the component is
    /// never refreshed by scoped updates.
    fn dependencies(&self) -> KeySet {
        KeySet::new()
    }

    /// Render the component to markup
    fn render(&self, state: &S) -> String;
}

/// A closure-backed component with an explicit dependency list
pub struct FnComponent<F> {
    name: String,
    dependencies: KeySet,
    render: F,
}

impl<F> FnComponent<F> {
    pub fn new<I, K>(name: impl Into<String>, dependencies: I, render: F) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            name: name.into(),
            dependencies: dependencies.into_iter().collect(),
            render,
        }
    }
}

impl<S, F> Component<S> for FnComponent<F>
where
    F: Fn(&S) -> String + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> KeySet {
        self.dependencies.clone()
    }

    fn render(&self, state: &S) -> String {
        (self.render)(state)
    }
}

impl<F> std::fmt::Debug for FnComponent<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnComponent")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// A registered component with its dependency set
pub struct Registered<S> {
    name: String,
    dependencies: KeySet,
    component: Box<dyn Component<S>>,
}

impl<S: 'static> Registered<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &KeySet {
        &self.dependencies
    }

    pub fn render(&self, state: &S) -> String {
        self.component.render(state)
    }
}

/// Insertion-ordered registry of uniquely named components
pub struct ComponentRegistry<S> {
    entries: Vec<Registered<S>>,
    index: HashMap<String, usize>,
}

impl<S> Default for ComponentRegistry<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<S> std::fmt::Debug for ComponentRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|entry| &entry.name))
            .finish()
    }
}

impl<S: 'static> ComponentRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component, computing its dependency set once
    pub fn register(&mut self, component: impl Component<S>) -> Result<()> {
        let name = component.name().to_string();
        if name.is_empty() {
            return Err(Error::EmptyComponentName);
        }
        if self.index.contains_key(&name) {
            return Err(Error::DuplicateComponent(name));
        }

        let dependencies = component.dependencies();
        if dependencies.is_empty() {
            tracing::warn!(
                component = %name,
                "Component has no inferred dependencies; scoped updates will skip it"
            );
        }
        tracing::info!(component = %name, deps = %dependencies, "Registering component");

        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(Registered {
            name,
            dependencies,
            component: Box::new(component),
        });
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Registered<S>> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// Dependency set recorded at registration
    pub fn dependencies(&self, name: &str) -> Option<&KeySet> {
        self.get(name).map(Registered::dependencies)
    }

    /// Components in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Registered<S>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
