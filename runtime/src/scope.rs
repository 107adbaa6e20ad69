//! Owning scope for orchestrated runs.
//!
//! A [`Scope`] stands in for the lifetime of the presentation-tier component
//! that issues requests: every run spawned on it descends from its
//! cancellation token, and dropping (or cancelling) the scope tears all of
//! them down. Supervision, not propagation — one run failing never cancels
//! its siblings, because failures are converted into error envelopes inside
//! the run and nothing escapes the task.

use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Cancellable task group owning every run spawned on it.
///
/// # Examples
///
/// ```no_run
/// use opcast_runtime::Scope;
///
/// # async fn example() {
/// let scope = Scope::new();
/// // ... spawn runs through an Orchestrator bound to this scope ...
/// scope.cancel();        // tears down every in-flight run
/// scope.join().await;    // waits for the tasks to wind down
/// # }
/// ```
#[derive(Debug)]
pub struct Scope {
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scope {
    /// Creates a fresh scope with its own cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Derives the cancellation token for one run.
    ///
    /// Child tokens cancel when the scope cancels, but cancelling a child
    /// (say, from a dialog's cancel button) tears down only that run.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Cancels every run spawned on this scope.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the scope has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Spawns one supervised run task.
    pub(crate) fn spawn(&self, future: impl Future<Output = ()> + Send + 'static) {
        let handle = tokio::spawn(future);
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        self.tasks.lock().unwrap().push(handle);
    }

    /// Waits for every spawned run to finish.
    ///
    /// A panicking run is logged and does not disturb the others; combine
    /// with [`cancel`](Scope::cancel) for a prompt teardown.
    pub async fn join(&self) {
        loop {
            let drained: Vec<JoinHandle<()>> = {
                #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
                let mut tasks = self.tasks.lock().unwrap();
                if tasks.is_empty() {
                    break;
                }
                tasks.drain(..).collect()
            };

            for handle in drained {
                if let Err(error) = handle.await {
                    if error.is_panic() {
                        tracing::error!(%error, "run task panicked");
                    }
                }
            }
        }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // The scope is the component lifetime; going away cancels its runs.
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn cancel_reaches_child_tokens() {
        let scope = Scope::new();
        let child = scope.child_token();

        scope.cancel();
        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn child_cancel_does_not_cancel_the_scope() {
        let scope = Scope::new();
        let child = scope.child_token();

        child.cancel();
        assert!(!scope.is_cancelled());
        assert!(!scope.child_token().is_cancelled());
    }

    #[tokio::test]
    async fn join_waits_for_spawned_tasks() {
        let scope = Scope::new();
        let done = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&done);
        scope.spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
        });

        scope.join().await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn dropping_the_scope_cancels_its_runs() {
        let scope = Scope::new();
        let child = scope.child_token();

        drop(scope);
        assert!(child.is_cancelled());
    }
}
