//! Error type shared by the store, registry, renderer and handlers

/// Errors surfaced by the runtime
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The mount container could not be found
    #[error("root element with id '{0}' not found")]
    MissingContainer(String),

    #[error("component name must not be empty")]
    EmptyComponentName,

    #[error("component '{0}' is already registered")]
    DuplicateComponent(String),

    /// State (or a state patch) did not serialize to a JSON object
    #[error("state must serialize to a JSON object")]
    StateNotObject,

    /// The merged state no longer fits the typed state schema
    #[error("state does not match its schema: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("initial state cannot be replaced after the app is mounted")]
    AlreadyMounted,

    /// Application-level failure raised by an event handler
    #[error("handler failed: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap an application error raised inside a handler
    pub fn handler(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Handler(err.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
