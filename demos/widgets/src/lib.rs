//! Widget board built on dom-dispatch
//!
//! A dozen small widgets (counter, list, calculator, GitHub lookup, timer and
//! friends) sharing one [`AppState`]. The board runs headless: a line-based
//! driver clicks and types into the in-memory document and prints markup.

pub mod app;
pub mod calculator;
pub mod commands;
pub mod components;
pub mod github;
pub mod handlers;
pub mod notes;
pub mod state;

pub use app::{App, AppConfig};
pub use state::AppState;
