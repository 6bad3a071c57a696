//! Task manager for async collaborators
//!
//! Tasks run on tokio and hand their results back as [`Deferred`] work, which
//! the application loop applies to the runtime. Supports:
//! - Automatic cancellation when spawning with the same key
//! - Debounced execution
//! - Fixed-period intervals
//! - Manual cancellation
//!
//! # Example
//!
//! ```ignore
//! use dom_dispatch::tasks::TaskKey;
//! use std::time::Duration;
//!
//! // Spawn a task - any existing task with the same key is cancelled
//! runtime.tasks_mut().spawn("github", async move {
//!     let result = fetch_user(&login).await;
//!     Box::new(move |rt: &mut Runtime<AppState>| rt.set_state(user_patch(result))) as Deferred<_>
//! });
//!
//! // Tick once per second until cancelled
//! runtime.tasks_mut().interval("countdown", Duration::from_secs(1), || {
//!     Box::new(|rt: &mut Runtime<AppState>| tick(rt)) as Deferred<_>
//! });
//!
//! runtime.tasks_mut().cancel(&TaskKey::new("countdown"));
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};

use crate::runtime::{Deferred, DeferredSender};

/// Identifies a task for cancellation and replacement.
///
/// Tasks with the same key are mutually exclusive - spawning a new task
/// with a key that's already running will cancel the existing task.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TaskKey(String);

impl TaskKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for TaskKey {
    fn from(s: &'static str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TaskKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Manages async task lifecycle with automatic cancellation.
///
/// When a new task is spawned with a key that already exists, the existing
/// task is aborted before the new one starts.
pub struct TaskManager<S> {
    tasks: HashMap<TaskKey, AbortHandle>,
    sender: DeferredSender<S>,
}

impl<S> std::fmt::Debug for TaskManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskManager")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl<S: 'static> TaskManager<S> {
    /// Create a task manager delivering results through `sender`
    pub fn new(sender: DeferredSender<S>) -> Self {
        Self {
            tasks: HashMap::new(),
            sender,
        }
    }

    /// Spawn a task, cancelling any existing task with the same key.
    ///
    /// The work the future resolves to is queued when it completes. A task
    /// cancelled before completion queues nothing.
    pub fn spawn<F>(&mut self, key: impl Into<TaskKey>, future: F) -> &mut Self
    where
        F: Future<Output = Deferred<S>> + Send + 'static,
    {
        let key = key.into();
        self.cancel(&key);

        let sender = self.sender.clone();
        let handle: JoinHandle<()> = tokio::spawn(async move {
            let work = future.await;
            sender.send_boxed(work);
        });

        tracing::debug!(task = key.name(), "Task spawned");
        self.tasks.insert(key, handle.abort_handle());
        self
    }

    /// Spawn a task that waits `duration` first.
    ///
    /// Calling again with the same key before the duration expires cancels
    /// the previous task and resets the timer.
    pub fn debounce<F>(
        &mut self,
        key: impl Into<TaskKey>,
        duration: Duration,
        future: F,
    ) -> &mut Self
    where
        F: Future<Output = Deferred<S>> + Send + 'static,
    {
        self.spawn(key, async move {
            tokio::time::sleep(duration).await;
            future.await
        })
    }

    /// Queue `tick()` every `period`, starting one period from now.
    ///
    /// Runs until cancelled or until the runtime is dropped.
    pub fn interval<F>(&mut self, key: impl Into<TaskKey>, period: Duration, mut tick: F) -> &mut Self
    where
        F: FnMut() -> Deferred<S> + Send + 'static,
    {
        let key = key.into();
        self.cancel(&key);

        let sender = self.sender.clone();
        let handle: JoinHandle<()> = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if !sender.send_boxed(tick()) {
                    break;
                }
            }
        });

        tracing::debug!(task = key.name(), ?period, "Interval started");
        self.tasks.insert(key, handle.abort_handle());
        self
    }

    /// Cancel a task by key; no-op for unknown keys
    pub fn cancel(&mut self, key: &TaskKey) {
        if let Some(handle) = self.tasks.remove(key) {
            handle.abort();
            tracing::debug!(task = key.name(), "Task cancelled");
        }
    }

    /// Cancel all tasks, e.g. on shutdown
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    /// Whether a task is registered under `key` (until cancelled)
    pub fn is_running(&self, key: &TaskKey) -> bool {
        self.tasks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn running_keys(&self) -> impl Iterator<Item = &TaskKey> {
        self.tasks.keys()
    }
}

impl<S> Drop for TaskManager<S> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::patch;
    use crate::runtime::Runtime;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn runtime() -> Runtime<Value> {
        Runtime::new(json!({ "n": 0 }), Document::new()).unwrap()
    }

    fn set_n(n: i64) -> Deferred<Value> {
        Box::new(move |rt: &mut Runtime<Value>| rt.set_state(patch!({ "n": n })))
    }

    async fn next(rx: &mut crate::runtime::DeferredReceiver<Value>, ms: u64) -> Option<Deferred<Value>> {
        tokio::time::timeout(Duration::from_millis(ms), rx.recv())
            .await
            .ok()
            .flatten()
    }

    #[test]
    fn test_task_key() {
        let k1 = TaskKey::new("test");
        let k2 = TaskKey::from("test");
        let k3: TaskKey = "test".into();

        assert_eq!(k1, k2);
        assert_eq!(k2, k3);
        assert_eq!(k1.name(), "test");
    }

    #[tokio::test]
    async fn test_spawn_delivers_work() {
        let mut rt = runtime();
        let mut rx = rt.take_deferred_receiver().unwrap();

        rt.tasks_mut().spawn("fetch", async { set_n(42) });

        let work = next(&mut rx, 100).await.expect("no work delivered");
        rt.apply_deferred(work).unwrap();
        assert_eq!(rt.state()["n"], json!(42));
    }

    #[tokio::test]
    async fn test_spawn_cancels_previous() {
        let mut rt = runtime();
        let mut rx = rt.take_deferred_receiver().unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        let c1 = counter.clone();
        rt.tasks_mut().spawn("fetch", async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            c1.fetch_add(1, Ordering::SeqCst);
            set_n(1)
        });
        let c2 = counter.clone();
        rt.tasks_mut().spawn("fetch", async move {
            c2.fetch_add(10, Ordering::SeqCst);
            set_n(2)
        });

        let work = next(&mut rx, 200).await.expect("no work delivered");
        rt.apply_deferred(work).unwrap();
        assert_eq!(rt.state()["n"], json!(2));
        assert!(next(&mut rx, 150).await.is_none());
        assert_eq!(counter.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_debounce_resets() {
        let mut rt = runtime();
        let mut rx = rt.take_deferred_receiver().unwrap();

        rt.tasks_mut()
            .debounce("search", Duration::from_millis(50), async { set_n(1) });
        tokio::time::sleep(Duration::from_millis(30)).await;
        rt.tasks_mut()
            .debounce("search", Duration::from_millis(50), async { set_n(2) });

        assert!(next(&mut rx, 30).await.is_none());
        let work = next(&mut rx, 100).await.expect("no work delivered");
        rt.apply_deferred(work).unwrap();
        assert_eq!(rt.state()["n"], json!(2));
    }

    #[tokio::test]
    async fn test_interval_ticks_until_cancelled() {
        let mut rt = runtime();
        let mut rx = rt.take_deferred_receiver().unwrap();
        let ticks = Arc::new(AtomicUsize::new(0));

        let t = ticks.clone();
        rt.tasks_mut()
            .interval("timer", Duration::from_millis(20), move || {
                let n = t.fetch_add(1, Ordering::SeqCst) as i64 + 1;
                set_n(n)
            });

        for _ in 0..2 {
            let work = next(&mut rx, 200).await.expect("no tick");
            rt.apply_deferred(work).unwrap();
        }
        assert_eq!(rt.state()["n"], json!(2));

        rt.tasks_mut().cancel(&TaskKey::new("timer"));
        assert!(!rt.tasks().is_running(&TaskKey::new("timer")));
        // drain a tick that may have raced the cancel
        let _ = next(&mut rx, 5).await;
        let before = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), before);
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let mut rt = runtime();
        let tasks = rt.tasks_mut();

        tasks.spawn("a", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            set_n(1)
        });
        tasks.spawn("b", async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            set_n(2)
        });
        assert_eq!(tasks.len(), 2);

        tasks.cancel_all();
        assert!(tasks.is_empty());
    }
}
