//! App assembly: page document, runtime, components and handlers

use std::path::PathBuf;

use dom_dispatch::{escape_attribute, Document, LoggingMiddleware, RenderStats, Runtime};

use crate::components;
use crate::github::{self, GithubClient, DEFAULT_API};
use crate::handlers::{self, Services};
use crate::notes::NoteStore;
use crate::state::{AppState, NOTE_PLACEHOLDER};

/// Default mount container id
pub const DEFAULT_CONTAINER: &str = "app";

/// Startup configuration
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Id of the element the widgets mount into
    pub container: String,
    /// Base URL of the GitHub REST API
    pub github_api: String,
    /// User fetched at startup, if any
    pub initial_user: Option<String>,
    /// Where the note widget persists its text; `None` keeps it in memory
    pub note_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            github_api: DEFAULT_API.to_string(),
            initial_user: Some("torvalds".to_string()),
            note_file: NoteStore::default_path(),
        }
    }
}

/// The page the board mounts into
pub fn page(container: &str) -> Document {
    Document::from_markup(&format!(
        r#"<header><h1>dom-dispatch widgets</h1></header>
<main><div id="{}" class="widget-board"></div></main>"#,
        escape_attribute(container)
    ))
}

/// The widget board: a runtime wired with every widget and handler
pub struct App {
    runtime: Runtime<AppState>,
    services: Services,
    config: AppConfig,
}

impl App {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let services = Services {
            github: GithubClient::new(config.github_api.clone())?,
            notes: config.note_file.clone().map(NoteStore::new),
        };

        let initial = AppState {
            note: services
                .notes
                .as_ref()
                .and_then(NoteStore::load)
                .unwrap_or_else(|| NOTE_PLACEHOLDER.to_string()),
            ..AppState::default()
        };

        let mut runtime = Runtime::new(initial, page(&config.container))?
            .with_middleware(LoggingMiddleware::new());
        components::register_all(&mut runtime)?;
        handlers::register(&mut runtime, &services);

        Ok(Self {
            runtime,
            services,
            config,
        })
    }

    /// Kick off the initial fetch and mount the board
    ///
    /// The fetch runs as a task, so this must be called inside a tokio
    /// runtime when an initial user is configured.
    pub fn start(&mut self) -> dom_dispatch::Result<RenderStats> {
        if let Some(login) = &self.config.initial_user {
            github::start_fetch(&mut self.runtime, &self.services.github, login)?;
        }
        let stats = self.runtime.render_app(&self.config.container)?;
        tracing::info!(
            components = self.runtime.components().len(),
            rendered = stats.rendered,
            "Widget board mounted"
        );
        Ok(stats)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime<AppState> {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime<AppState> {
        &mut self.runtime
    }

    /// Markup of the mount container
    pub fn html(&self) -> String {
        self.runtime
            .element_by_id(&self.config.container)
            .map(|node| self.runtime.document().inner_html(node))
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("mounted", &self.runtime.is_mounted())
            .finish()
    }
}
