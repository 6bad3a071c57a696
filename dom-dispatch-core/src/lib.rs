//! Core traits and types for dom-dispatch
//!
//! This crate provides the reconciliation engine behind dom-dispatch: a single
//! state store, components rendered from that state, declarative event
//! bindings and a renderer that only touches what a state change affects.
//!
//! # Core Concepts
//!
//! - **Document**: headless arena DOM with focus, form values and selections
//! - **StateStore**: single state tree with deep-merge patches and change detection
//! - **Component**: pure render function plus the state fields it reads
//! - **ListenerBinder**: attaches named handlers to `data-on*` attributes
//! - **Renderer**: dependency-scoped updates that keep focused inputs alive
//! - **Runtime**: the application object tying everything together
//!
//! # Basic Example
//!
//! ```
//! use dom_dispatch_core::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Default, Serialize, Deserialize)]
//! struct AppState {
//!     counter: i64,
//! }
//!
//! let doc = Document::from_markup(r#"<div id="app"></div>"#);
//! let mut runtime = Runtime::new(AppState::default(), doc).unwrap();
//! runtime
//!     .register_component(FnComponent::new("Counter", ["counter"], |s: &AppState| {
//!         format!(r#"<div><strong>{}</strong><button data-onclick="inc">+</button></div>"#, s.counter)
//!     }))
//!     .unwrap();
//! runtime.register_handler("inc", |rt, _event, s: &AppState| {
//!     rt.set_state(patch!({ "counter": s.counter + 1 }))
//! });
//! runtime.render_app("app").unwrap();
//! ```
//!
//! # Async Collaborators
//!
//! Network calls and timers run as tokio tasks and send [`Deferred`] closures
//! back to the application loop, which applies them to the runtime one at a
//! time:
//!
//! ```ignore
//! let sender = runtime.deferred_sender();
//! tokio::spawn(async move {
//!     let user = fetch_user(&login).await;
//!     sender.send(move |rt: &mut Runtime<AppState>| rt.set_state(user_patch(user)));
//! });
//!
//! let mut deferred = runtime.take_deferred_receiver().unwrap();
//! loop {
//!     tokio::select! {
//!         Some(work) = deferred.recv() => runtime.apply_deferred(work)?,
//!         // ... input handling
//!     }
//! }
//! ```

pub mod component;
pub mod dom;
pub mod error;
pub mod event;
pub mod listeners;
pub mod render;
pub mod runtime;
pub mod store;
#[cfg(feature = "tasks")]
pub mod tasks;
pub mod testing;

// Used by the `patch!` macro
#[doc(hidden)]
pub use serde_json;

// Core exports
pub use component::{Component, ComponentRegistry, FnComponent, Registered};
pub use dom::{escape_attribute, escape_html, Document, NodeId, NodeKind, Selection};
pub use error::{Error, Result};
pub use event::{DomEvent, EventType};
pub use listeners::{Handler, HandlerRegistry, ListenerBinder};
pub use render::{MountedInstance, Phase, RenderConfig, RenderStats, Renderer};
pub use runtime::{Deferred, DeferredReceiver, DeferredSender, Runtime};

// Store exports
pub use store::{
    changed_keys, merge_deep, ComposedMiddleware, KeySet, LoggingMiddleware, Middleware,
    NoopMiddleware, Patch, State, StateStore, Update,
};

// Task exports (requires "tasks" feature)
#[cfg(feature = "tasks")]
pub use tasks::{TaskKey, TaskManager};

// Testing exports
pub use testing::TestHarness;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::component::{Component, FnComponent};
    pub use crate::dom::{escape_attribute, escape_html, Document, NodeId};
    pub use crate::error::{Error, Result};
    pub use crate::event::{DomEvent, EventType};
    pub use crate::patch;
    pub use crate::render::RenderConfig;
    pub use crate::runtime::{Deferred, DeferredSender, Runtime};
    pub use crate::store::{
        ComposedMiddleware, KeySet, LoggingMiddleware, Middleware, NoopMiddleware, Patch, State,
        Update,
    };
    #[cfg(feature = "tasks")]
    pub use crate::tasks::{TaskKey, TaskManager};
}
