//! State store with deep-merge updates and change detection
//!
//! The store owns the state as a JSON object tree and keeps a typed snapshot
//! `S` in sync with it. Updates are partial patches: the store works out which
//! top-level keys actually changed, merges the patch and reports the changed
//! keys so the renderer can skip unaffected components.
//!
//! # Example
//! ```
//! use dom_dispatch_core::{patch, StateStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct AppState {
//!     counter: i64,
//! }
//!
//! let mut store = StateStore::new(AppState { counter: 0 }).unwrap();
//! let changed = store.apply(patch!({ "counter": 1 })).unwrap();
//! assert!(changed.unwrap().contains("counter"));
//!
//! // same value again: nothing to do
//! assert!(store.apply(patch!({ "counter": 1 })).unwrap().is_none());
//! ```

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Bounds required of an application state type
///
/// The state must serialize to a JSON object; field names are the keys used
/// by patches and dependency sets.
pub trait State: Serialize + DeserializeOwned + Clone + 'static {}

impl<T> State for T where T: Serialize + DeserializeOwned + Clone + 'static {}

/// Ordered set of top-level state field names
///
/// Used both for component dependency sets and for the keys changed by an
/// update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySet(BTreeSet<String>);

impl KeySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        self.0.insert(key.into())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether any key is in both sets
    pub fn intersects(&self, other: &KeySet) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|key| large.contains(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<K: Into<String>> FromIterator<K> for KeySet {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl std::fmt::Display for KeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, key) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(key)?;
        }
        f.write_str("}")
    }
}

/// A partial state: top-level keys mapped to their new values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch(Map<String, Value>);

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a patch from a JSON value
    ///
    /// Anything other than an object yields an empty patch, which the store
    /// treats as a no-op.
    pub fn object(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                tracing::warn!(value = %other, "Ignoring non-object state patch");
                Self::default()
            }
        }
    }

    /// Build a patch by serializing `value`, which must produce an object
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        match serde_json::to_value(value)? {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(Error::StateNotObject),
        }
    }

    /// Set a top-level key
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Patch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Build a [`Patch`] from JSON object syntax
///
/// ```
/// use dom_dispatch_core::patch;
///
/// let p = patch!({ "counter": 2, "calculator": { "display": "0" } });
/// assert_eq!(p.get("counter"), Some(&serde_json::json!(2)));
/// ```
#[macro_export]
macro_rules! patch {
    ($($json:tt)+) => {
        $crate::Patch::object($crate::serde_json::json!($($json)+))
    };
}

/// A state update: a literal patch or a function of the current state
pub enum Update<S> {
    Patch(Patch),
    With(Box<dyn FnOnce(&S) -> Patch>),
}

impl<S> Update<S> {
    /// Derive the patch from the current state at apply time
    pub fn with(f: impl FnOnce(&S) -> Patch + 'static) -> Self {
        Self::With(Box::new(f))
    }

    pub(crate) fn resolve(self, state: &S) -> Patch {
        match self {
            Update::Patch(patch) => patch,
            Update::With(f) => f(state),
        }
    }
}

impl<S> From<Patch> for Update<S> {
    fn from(patch: Patch) -> Self {
        Update::Patch(patch)
    }
}

impl<S> std::fmt::Debug for Update<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Update::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Update::With(_) => f.write_str("With(..)"),
        }
    }
}

/// Keys of `patch` whose value is absent from, or differs from, `current`
pub fn changed_keys(current: &Map<String, Value>, patch: &Patch) -> KeySet {
    patch
        .0
        .iter()
        .filter(|&(key, value)| current.get(key) != Some(value))
        .map(|(key, _)| key.clone())
        .collect()
}

/// Merge `source` into `target`
///
/// Where both sides hold an object the merge recurses; any other value
/// (including arrays and `null`) replaces the target value.
pub fn merge_deep(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match value {
            Value::Object(incoming) => match target.get_mut(&key) {
                Some(Value::Object(existing)) => merge_deep(existing, incoming),
                _ => {
                    target.insert(key, Value::Object(incoming));
                }
            },
            value => {
                target.insert(key, value);
            }
        }
    }
}

fn to_tree<S: Serialize>(state: &S) -> Result<Map<String, Value>> {
    match serde_json::to_value(state)? {
        Value::Object(map) => Ok(map),
        _ => Err(Error::StateNotObject),
    }
}

/// Single owner of the application state
#[derive(Debug, Clone)]
pub struct StateStore<S> {
    tree: Map<String, Value>,
    snapshot: S,
}

impl<S> StateStore<S>
where
    S: Serialize + DeserializeOwned + Clone,
{
    /// Create a store holding `initial`
    pub fn new(initial: S) -> Result<Self> {
        Ok(Self {
            tree: to_tree(&initial)?,
            snapshot: initial,
        })
    }

    /// Replace the state wholesale, without change detection
    pub fn set_initial_state(&mut self, state: S) -> Result<()> {
        self.tree = to_tree(&state)?;
        self.snapshot = state;
        Ok(())
    }

    /// Borrow the typed state
    pub fn state(&self) -> &S {
        &self.snapshot
    }

    /// Copy of the typed state
    pub fn get_state(&self) -> S {
        self.snapshot.clone()
    }

    /// The raw state tree
    pub fn tree(&self) -> &Map<String, Value> {
        &self.tree
    }

    /// Apply an update
    ///
    /// Returns the changed top-level keys when the state changed and a render
    /// pass is due, `None` when the update was a no-op. A patch whose merge
    /// would no longer deserialize into `S` is rejected and leaves the state
    /// untouched.
    pub fn apply(&mut self, update: impl Into<Update<S>>) -> Result<Option<KeySet>> {
        let patch = update.into().resolve(&self.snapshot);

        let changed = changed_keys(&self.tree, &patch);
        if changed.is_empty() {
            tracing::debug!("State update skipped (no effective changes in patch)");
            return Ok(None);
        }

        let mut merged = self.tree.clone();
        merge_deep(&mut merged, patch.into_map());
        if merged == self.tree {
            tracing::debug!(keys = %changed, "State update skipped (state unchanged after merge)");
            return Ok(None);
        }

        let snapshot: S = serde_json::from_value(Value::Object(merged.clone()))?;
        self.tree = merged;
        self.snapshot = snapshot;
        tracing::debug!(keys = %changed, "State updated");
        Ok(Some(changed))
    }
}

/// Observer around every `set_state`
///
/// `before` sees the resolved patch; `after` sees the top-level keys the
/// patch actually changed. Both run once per update, in that order.
pub trait Middleware {
    /// Called with the resolved patch before it is merged
    fn before(&mut self, patch: &Patch);

    /// Called with the changed keys
    ///
    /// `None` when the patch changed nothing or was rejected by the store.
    fn after(&mut self, changed: Option<&KeySet>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl Middleware for NoopMiddleware {
    fn before(&mut self, _patch: &Patch) {}
    fn after(&mut self, _changed: Option<&KeySet>) {}
}

/// Traces patch keys and the changed-key set at `debug`
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Trace the patch's top-level keys as it arrives
    pub log_patches: bool,
    /// Trace which keys the patch changed
    pub log_changes: bool,
    patch_keys: Vec<String>,
}

impl LoggingMiddleware {
    /// Changed keys only
    pub fn new() -> Self {
        Self {
            log_patches: false,
            log_changes: true,
            patch_keys: Vec::new(),
        }
    }

    /// Patch keys and changed keys
    pub fn verbose() -> Self {
        Self {
            log_patches: true,
            ..Self::new()
        }
    }
}

impl Middleware for LoggingMiddleware {
    fn before(&mut self, patch: &Patch) {
        self.patch_keys = patch.keys().map(str::to_string).collect();
        if self.log_patches {
            tracing::debug!(patch_keys = ?self.patch_keys, "set_state");
        }
    }

    fn after(&mut self, changed: Option<&KeySet>) {
        let patch_keys = std::mem::take(&mut self.patch_keys);
        if !self.log_changes {
            return;
        }
        match changed {
            Some(changed) => tracing::debug!(
                %changed,
                count = changed.len(),
                "set_state changed keys"
            ),
            None => tracing::debug!(?patch_keys, unchanged = true, "set_state left state as is"),
        }
    }
}

/// Middleware layers run as one
///
/// `before` runs first-added first; `after` unwinds in reverse, so the first
/// layer added wraps every other.
#[derive(Default)]
pub struct ComposedMiddleware {
    layers: Vec<Box<dyn Middleware>>,
}

impl std::fmt::Debug for ComposedMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComposedMiddleware")
            .field("layers", &self.layers.len())
            .finish()
    }
}

impl ComposedMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an innermost layer
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.layers.push(Box::new(middleware));
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Middleware for ComposedMiddleware {
    fn before(&mut self, patch: &Patch) {
        for layer in &mut self.layers {
            layer.before(patch);
        }
    }

    fn after(&mut self, changed: Option<&KeySet>) {
        for layer in self.layers.iter_mut().rev() {
            layer.after(changed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestState {
        counter: i64,
        label: String,
    }

    fn store() -> StateStore<TestState> {
        StateStore::new(TestState {
            counter: 0,
            label: "a".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_apply_reports_changed_keys() {
        let mut store = store();
        let changed = store
            .apply(patch!({ "counter": 1, "label": "a" }))
            .unwrap()
            .unwrap();

        assert_eq!(changed, KeySet::from_iter(["counter"]));
        assert_eq!(store.state().counter, 1);
    }

    #[test]
    fn test_equal_values_are_noop() {
        let mut store = store();
        assert!(store.apply(patch!({ "counter": 0 })).unwrap().is_none());
        assert!(store.apply(Patch::new()).unwrap().is_none());
    }

    #[test]
    fn test_update_fn_sees_current_state() {
        let mut store = store();
        store
            .apply(Update::with(|s: &TestState| {
                patch!({ "counter": s.counter + 5 })
            }))
            .unwrap();
        store
            .apply(Update::with(|s: &TestState| {
                patch!({ "counter": s.counter * 2 })
            }))
            .unwrap();
        assert_eq!(store.state().counter, 10);
    }

    #[test]
    fn test_objects_merge_and_arrays_replace() {
        let mut store = StateStore::new(json!({ "a": {}, "b": [] })).unwrap();

        store.apply(patch!({ "a": { "x": 1 } })).unwrap();
        store.apply(patch!({ "a": { "y": 2 } })).unwrap();
        assert_eq!(store.state()["a"], json!({ "x": 1, "y": 2 }));

        store.apply(patch!({ "b": [1, 2] })).unwrap();
        store.apply(patch!({ "b": [3] })).unwrap();
        assert_eq!(store.state()["b"], json!([3]));
    }

    #[test]
    fn test_merge_is_recursive() {
        let mut tree = json!({ "a": { "b": { "c": 1, "d": 2 } } })
            .as_object()
            .cloned()
            .unwrap();
        let source = json!({ "a": { "b": { "c": 9 } } })
            .as_object()
            .cloned()
            .unwrap();
        merge_deep(&mut tree, source);
        assert_eq!(Value::Object(tree), json!({ "a": { "b": { "c": 9, "d": 2 } } }));
    }

    #[test]
    fn test_changed_key_with_unchanged_merge_is_skipped() {
        let mut store = StateStore::new(json!({ "a": { "x": 1 } })).unwrap();
        // {} differs from {"x":1} as a value, but merging it changes nothing
        assert!(store.apply(patch!({ "a": {} })).unwrap().is_none());
        assert_eq!(store.state()["a"], json!({ "x": 1 }));
    }

    #[test]
    fn test_new_key_counts_as_changed() {
        let mut store = StateStore::new(json!({})).unwrap();
        let changed = store.apply(patch!({ "fresh": null })).unwrap().unwrap();
        assert!(changed.contains("fresh"));
    }

    #[test]
    fn test_schema_violation_is_rejected() {
        let mut store = store();
        let err = store.apply(patch!({ "counter": "nope" })).unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
        assert_eq!(store.state().counter, 0);
        assert_eq!(store.tree()["counter"], json!(0));
    }

    #[test]
    fn test_non_object_state_is_rejected() {
        assert!(matches!(
            StateStore::new(json!([1, 2])).unwrap_err(),
            Error::StateNotObject
        ));
        assert!(Patch::object(json!(3)).is_empty());
    }

    #[test]
    fn test_key_set_intersects() {
        let deps = KeySet::from_iter(["counter", "items"]);
        assert!(deps.intersects(&KeySet::from_iter(["items"])));
        assert!(!deps.intersects(&KeySet::from_iter(["label"])));
        assert!(!deps.intersects(&KeySet::new()));
        assert_eq!(deps.to_string(), "{counter, items}");
    }

    struct RecordingMiddleware {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Middleware for RecordingMiddleware {
        fn before(&mut self, _patch: &Patch) {
            self.log.borrow_mut().push(format!("before:{}", self.name));
        }

        fn after(&mut self, changed: Option<&KeySet>) {
            let outcome = if changed.is_some() { "changed" } else { "noop" };
            self.log
                .borrow_mut()
                .push(format!("after:{}:{}", self.name, outcome));
        }
    }

    #[test]
    fn test_composed_middleware_nests() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut composed = ComposedMiddleware::new();
        composed.add(RecordingMiddleware {
            name: "outer",
            log: log.clone(),
        });
        composed.add(LoggingMiddleware::verbose());
        composed.add(RecordingMiddleware {
            name: "inner",
            log: log.clone(),
        });

        composed.before(&patch!({ "counter": 1 }));
        composed.after(Some(&KeySet::from_iter(["counter"])));
        composed.after(None);

        assert_eq!(
            *log.borrow(),
            vec![
                "before:outer",
                "before:inner",
                "after:inner:changed",
                "after:outer:changed",
                "after:inner:noop",
                "after:outer:noop",
            ]
        );
    }

    #[test]
    fn test_logging_middleware_forgets_patch_keys_after_update() {
        let mut logging = LoggingMiddleware::verbose();
        logging.before(&patch!({ "counter": 1, "label": "b" }));
        assert_eq!(logging.patch_keys, vec!["counter", "label"]);

        logging.after(None);
        assert!(logging.patch_keys.is_empty());
        assert!(logging.log_patches && logging.log_changes);
        assert!(!LoggingMiddleware::new().log_patches);
    }
}
