//! dom-dispatch: dependency-scoped UI reconciliation for Rust
//!
//! Components are pure functions from state to markup. State lives in one
//! store and changes through partial patches; after each change only the
//! components that read a changed field re-render, and a focused text input
//! survives the update with its value and caret intact.
//!
//! # Example
//! ```
//! use dom_dispatch::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Default, Serialize, Deserialize)]
//! struct AppState {
//!     counter: i64,
//! }
//!
//! #[component]
//! fn counter(state: &AppState) -> String {
//!     format!(
//!         r#"<div><strong>{}</strong><button data-onclick="incrementCounter">+</button></div>"#,
//!         state.counter
//!     )
//! }
//!
//! let doc = Document::from_markup(r#"<div id="app"></div>"#);
//! let mut runtime = Runtime::new(AppState::default(), doc).unwrap();
//! runtime.register_component(Counter).unwrap();
//! runtime.register_handler("incrementCounter", |rt, _, s: &AppState| {
//!     rt.set_state(patch!({ "counter": s.counter + 1 }))
//! });
//! runtime.render_app("app").unwrap();
//! assert_eq!(Counter::DEPENDENCIES, &["counter"]);
//! ```

// Re-export everything from core
pub use dom_dispatch_core::*;

// Re-export the component macro
pub use dom_dispatch_macros::component;

/// Prelude for convenient imports
pub mod prelude {
    pub use dom_dispatch_core::prelude::*;

    // Component macro
    pub use dom_dispatch_macros::component;
}
