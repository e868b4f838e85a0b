//! Tracked background work
//!
//! UI actions often start work nobody awaits (a button press kicking off a
//! login, a popup asking to close itself). [`BackgroundTasks`] keeps those
//! tasks visible: every failure or panic is logged with the task name, and
//! the set can be drained or aborted as a whole.

use parking_lot::Mutex;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::task::{AbortHandle, JoinHandle};

struct TrackedTask {
    name: String,
    supervisor: JoinHandle<()>,
    work: AbortHandle,
}

/// Set of detached tasks whose failures are routed to the log
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    tasks: Arc<Mutex<Vec<TrackedTask>>>,
}

impl BackgroundTasks {
    /// Create an empty task set
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a fallible task
    ///
    /// An `Err` result or a panic is logged at error level; neither is
    /// returned to the caller.
    pub fn spawn<F, E>(&self, name: impl Into<String>, fut: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let name = name.into();
        let work = tokio::spawn(fut);
        let abort = work.abort_handle();

        let task_name = name.clone();
        let supervisor = tokio::spawn(async move {
            match work.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(task = %task_name, "Background task failed: {}", e);
                }
                Err(join_err) if join_err.is_panic() => {
                    tracing::error!(task = %task_name, "Background task panicked");
                }
                Err(_) => {
                    tracing::debug!(task = %task_name, "Background task aborted");
                }
            }
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.supervisor.is_finished());
        tasks.push(TrackedTask {
            name,
            supervisor,
            work: abort,
        });
    }

    /// Number of tasks that have not finished yet
    pub fn len(&self) -> usize {
        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.supervisor.is_finished());
        tasks.len()
    }

    /// Whether no task is in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until every task spawned so far (and any they spawn) has finished
    pub async fn wait_idle(&self) {
        loop {
            let pending: Vec<TrackedTask> = std::mem::take(&mut *self.tasks.lock());
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if task.supervisor.await.is_err() {
                    tracing::debug!(task = %task.name, "Supervisor ended early");
                }
            }
        }
    }

    /// Abort every in-flight task
    pub fn shutdown(&self) {
        let tasks: Vec<TrackedTask> = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            tracing::debug!(task = %task.name, "Aborting background task");
            task.work.abort();
        }
    }
}

impl std::fmt::Debug for BackgroundTasks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTasks")
            .field("in_flight", &self.tasks.lock().len())
            .finish()
    }
}
