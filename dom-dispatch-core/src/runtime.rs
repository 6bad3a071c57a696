//! Application runtime: owns the store, registry, binder, renderer and document
//!
//! ```
//! use dom_dispatch_core::{patch, Document, FnComponent, Runtime};
//! use serde_json::json;
//!
//! let doc = Document::from_markup(r#"<div id="app"></div>"#);
//! let mut runtime = Runtime::new(json!({ "counter": 0 }), doc).unwrap();
//! runtime
//!     .register_component(FnComponent::new("Counter", ["counter"], |s: &serde_json::Value| {
//!         format!(r#"<div><b>{}</b><button data-onclick="inc">+</button></div>"#, s["counter"])
//!     }))
//!     .unwrap();
//! runtime.register_handler("inc", |rt, _event, state| {
//!     let next = state["counter"].as_i64().unwrap_or(0) + 1;
//!     rt.set_state(patch!({ "counter": next }))
//! });
//! runtime.render_app("app").unwrap();
//!
//! let button = runtime.find_binding(dom_dispatch_core::EventType::Click, "inc").unwrap();
//! runtime.click(button).unwrap();
//! assert_eq!(runtime.state()["counter"], json!(1));
//! ```

use tokio::sync::mpsc;

use crate::component::{Component, ComponentRegistry};
use crate::dom::{Document, NodeId};
use crate::error::{Error, Result};
use crate::event::{DomEvent, EventType};
use crate::listeners::{HandlerRegistry, ListenerBinder};
use crate::render::{Phase, RenderConfig, RenderStats, Renderer};
use crate::store::{ComposedMiddleware, KeySet, Middleware, State, StateStore, Update};
#[cfg(feature = "tasks")]
use crate::tasks::TaskManager;

/// Work produced off the application loop, applied to the runtime in its own turn
pub type Deferred<S> = Box<dyn FnOnce(&mut Runtime<S>) -> Result<()> + Send>;

/// Sending half of the deferred queue; cheap to clone and `Send`
pub struct DeferredSender<S> {
    tx: mpsc::UnboundedSender<Deferred<S>>,
}

impl<S> Clone for DeferredSender<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for DeferredSender<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeferredSender")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S> DeferredSender<S> {
    /// Queue `work`; returns false once the runtime is gone
    pub fn send<F>(&self, work: F) -> bool
    where
        F: FnOnce(&mut Runtime<S>) -> Result<()> + Send + 'static,
    {
        self.send_boxed(Box::new(work))
    }

    pub fn send_boxed(&self, work: Deferred<S>) -> bool {
        self.tx.send(work).is_ok()
    }
}

/// Receiving half of the deferred queue
pub type DeferredReceiver<S> = mpsc::UnboundedReceiver<Deferred<S>>;

/// The application object
///
/// Holds everything a running app needs. State changes go through
/// [`Runtime::set_state`], which triggers a dependency-scoped update pass once
/// the app is mounted.
pub struct Runtime<S> {
    store: StateStore<S>,
    registry: ComponentRegistry<S>,
    binder: ListenerBinder<S>,
    renderer: Renderer,
    document: Document,
    middleware: ComposedMiddleware,
    deferred_tx: mpsc::UnboundedSender<Deferred<S>>,
    deferred_rx: Option<DeferredReceiver<S>>,
    #[cfg(feature = "tasks")]
    tasks: TaskManager<S>,
    render_passes: usize,
    last_render: Option<RenderStats>,
}

impl<S> std::fmt::Debug for Runtime<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("components", &self.registry)
            .field("binder", &self.binder)
            .field("phase", &self.renderer.phase())
            .field("render_passes", &self.render_passes)
            .finish()
    }
}

impl<S: State> Runtime<S> {
    /// Create a runtime over `document` with `initial` state
    pub fn new(initial: S, document: Document) -> Result<Self> {
        let (deferred_tx, deferred_rx) = mpsc::unbounded_channel();
        Ok(Self {
            store: StateStore::new(initial)?,
            registry: ComponentRegistry::new(),
            binder: ListenerBinder::new(HandlerRegistry::new()),
            renderer: Renderer::default(),
            document,
            middleware: ComposedMiddleware::new(),
            #[cfg(feature = "tasks")]
            tasks: TaskManager::new(DeferredSender {
                tx: deferred_tx.clone(),
            }),
            deferred_tx,
            deferred_rx: Some(deferred_rx),
            render_passes: 0,
            last_render: None,
        })
    }

    /// Replace the renderer configuration (before mounting)
    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.renderer = Renderer::new(config);
        self
    }

    /// Add a store middleware
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.add(middleware);
        self
    }

    pub fn register_component(&mut self, component: impl Component<S>) -> Result<()> {
        self.registry.register(component)
    }

    /// Register (or replace) a named event handler
    ///
    /// Bindings already scanned keep the handler they resolved to.
    pub fn register_handler<F>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&mut Runtime<S>, &DomEvent, &S) -> Result<()> + 'static,
    {
        self.binder.handlers_mut().register(name, handler);
        self
    }

    /// Mirror state field `field` into inputs bound to `handler` while they have focus
    pub fn bind_input(&mut self, handler: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.renderer.config_mut().add_input_binding(handler, field);
        self
    }

    pub fn components(&self) -> &ComponentRegistry<S> {
        &self.registry
    }

    pub fn binder(&self) -> &ListenerBinder<S> {
        &self.binder
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn is_mounted(&self) -> bool {
        self.renderer.phase() == Phase::Mounted
    }

    // ===== State =====

    /// Replace the state wholesale; only allowed before the first mount
    pub fn set_initial_state(&mut self, state: S) -> Result<()> {
        if self.is_mounted() {
            return Err(Error::AlreadyMounted);
        }
        self.store.set_initial_state(state)
    }

    pub fn state(&self) -> &S {
        self.store.state()
    }

    pub fn get_state(&self) -> S {
        self.store.get_state()
    }

    pub fn store(&self) -> &StateStore<S> {
        &self.store
    }

    /// Apply a patch (or patch function) and re-render affected components
    ///
    /// Returns without rendering when the update changes nothing or the app
    /// is not mounted yet.
    pub fn set_state(&mut self, update: impl Into<Update<S>>) -> Result<()> {
        let patch = update.into().resolve(self.store.state());
        self.middleware.before(&patch);
        let changed = match self.store.apply(patch) {
            Ok(changed) => changed,
            Err(e) => {
                self.middleware.after(None);
                return Err(e);
            }
        };
        self.middleware.after(changed.as_ref());

        let Some(changed) = changed else {
            return Ok(());
        };
        if !self.is_mounted() {
            tracing::debug!(keys = %changed, "State updated before mount; render deferred");
            return Ok(());
        }
        self.update_pass(Some(&changed));
        Ok(())
    }

    // ===== Rendering =====

    /// Mount the app into the element with id `container_id`
    ///
    /// The first call mounts every component; later calls run an unscoped
    /// update pass.
    pub fn render_app(&mut self, container_id: &str) -> Result<RenderStats> {
        let container = self
            .renderer
            .resolve_container(&self.document, container_id)?;
        let stats = match self.renderer.phase() {
            Phase::Uninitialized => {
                let stats = self.renderer.mount(
                    &mut self.document,
                    container,
                    &self.registry,
                    self.store.state(),
                    &mut self.binder,
                );
                self.render_passes += 1;
                stats
            }
            Phase::Mounted => self.update_pass(None),
        };
        self.last_render = Some(stats);
        Ok(stats)
    }

    fn update_pass(&mut self, changed: Option<&KeySet>) -> RenderStats {
        let stats = self.renderer.update(
            &mut self.document,
            &self.registry,
            self.store.tree(),
            self.store.state(),
            changed,
            &mut self.binder,
        );
        self.render_passes += 1;
        self.last_render = Some(stats);
        stats
    }

    /// Number of mount and update passes run so far
    pub fn render_passes(&self) -> usize {
        self.render_passes
    }

    pub fn last_render(&self) -> Option<RenderStats> {
        self.last_render
    }

    // ===== Queries =====

    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.document.element_by_id(element_id)
    }

    /// First connected element bound to `handler` for `kind`
    pub fn find_binding(&self, kind: EventType, handler: &str) -> Option<NodeId> {
        self.document
            .query_attribute(
                self.document.body(),
                kind.binding_attribute(),
                Some(handler),
            )
            .into_iter()
            .next()
    }

    /// Connected root nodes of a mounted component
    pub fn component_nodes(&self, component: &str) -> Vec<NodeId> {
        self.renderer
            .instances_of(&self.document, component)
            .collect()
    }

    // ===== Interaction =====

    /// Fire `kind` at `target`, bubbling through its ancestors
    ///
    /// Returns the number of handlers invoked. A node that left the document
    /// (for example, replaced by a handler further down the path) is skipped.
    /// Disabled form controls receive no events.
    pub fn dispatch(&mut self, target: NodeId, kind: EventType) -> Result<usize> {
        if !self.document.is_connected(target) {
            tracing::trace!(event = %kind, "Event target is not in the document");
            return Ok(0);
        }
        if self.is_disabled_control(target) {
            tracing::trace!(event = %kind, "Event target is a disabled control");
            return Ok(0);
        }
        let value = self.document.value(target);

        let mut path = Vec::new();
        let mut current = Some(target);
        while let Some(node) = current {
            path.push(node);
            current = self.document.parent(node);
        }

        let mut invoked = 0;
        for node in path {
            for (name, handler) in self.binder.listeners(node, kind) {
                if !self.document.is_connected(node) {
                    tracing::trace!(handler = %name, "Ignoring event on detached node");
                    continue;
                }
                let event = DomEvent {
                    kind,
                    target,
                    current_target: node,
                    value: value.clone(),
                };
                let snapshot = self.store.get_state();
                tracing::debug!(handler = %name, event = %kind, "Invoking handler");
                handler(self, &event, &snapshot)?;
                invoked += 1;
            }
        }
        Ok(invoked)
    }

    fn is_disabled_control(&self, node: NodeId) -> bool {
        matches!(
            self.document.tag(node),
            Some("button" | "input" | "select" | "textarea")
        ) && self.document.has_attribute(node, "disabled")
    }

    pub fn click(&mut self, target: NodeId) -> Result<usize> {
        self.dispatch(target, EventType::Click)
    }

    pub fn submit(&mut self, target: NodeId) -> Result<usize> {
        self.dispatch(target, EventType::Submit)
    }

    /// Focus `target`; returns false if it cannot take focus
    pub fn focus(&mut self, target: NodeId) -> bool {
        self.document.focus(target)
    }

    pub fn blur(&mut self) {
        self.document.blur();
    }

    /// Type `text` into a text control, one `input` event per character
    ///
    /// The control is focused first and characters are inserted at its
    /// selection. Typing stops if the control leaves the document.
    pub fn type_text(&mut self, target: NodeId, text: &str) -> Result<()> {
        if !self.document.is_editable(target) || !self.focus(target) {
            tracing::debug!("Typing target is not an editable, connected control");
            return Ok(());
        }
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            if !self.document.is_connected(target) {
                break;
            }
            self.document.insert_text(target, ch.encode_utf8(&mut buf));
            self.dispatch(target, EventType::Input)?;
        }
        Ok(())
    }

    /// Replace a control's value, then fire `input` and `change`
    pub fn set_value(&mut self, target: NodeId, value: &str) -> Result<()> {
        self.document.set_value(target, value);
        self.dispatch(target, EventType::Input)?;
        self.dispatch(target, EventType::Change)?;
        Ok(())
    }

    // ===== Deferred work =====

    pub fn deferred_sender(&self) -> DeferredSender<S> {
        DeferredSender {
            tx: self.deferred_tx.clone(),
        }
    }

    /// Take the receiving half to drive it from an async loop
    ///
    /// Afterwards [`Runtime::run_pending`] has nothing to drain.
    pub fn take_deferred_receiver(&mut self) -> Option<DeferredReceiver<S>> {
        self.deferred_rx.take()
    }

    /// Apply one piece of deferred work
    pub fn apply_deferred(&mut self, work: Deferred<S>) -> Result<()> {
        work(self)
    }

    /// Apply all queued deferred work; returns how many ran
    pub fn run_pending(&mut self) -> Result<usize> {
        let mut ran = 0;
        loop {
            let next = match self.deferred_rx.as_mut() {
                Some(rx) => rx.try_recv().ok(),
                None => None,
            };
            let Some(work) = next else {
                break;
            };
            work(self)?;
            ran += 1;
        }
        Ok(ran)
    }

    #[cfg(feature = "tasks")]
    pub fn tasks(&self) -> &TaskManager<S> {
        &self.tasks
    }

    #[cfg(feature = "tasks")]
    pub fn tasks_mut(&mut self) -> &mut TaskManager<S> {
        &mut self.tasks
    }
}
