//! The orchestration engine.
//!
//! [`Orchestrator::run`] turns a [`RequestDescriptor`] into one supervised,
//! cancellable task plus a multicast channel of result envelopes. The caller
//! gets the channel back immediately — before the producer has done anything
//! — and subscribers may attach at any point before, during, or after the
//! run.
//!
//! Per run, the engine guarantees:
//!
//! - loading visibility toggles at most twice (shown at start, hidden at the
//!   terminal edge), however many results the producer emits;
//! - exactly one terminal event: clean completion, or a single
//!   `Envelope::Error` mapped through [`Status::from_error`];
//! - cancellation is scope teardown, not a failure — it never produces an
//!   error envelope and never fires the error-path signaling;
//! - no retries, ever: a producer that wants retry semantics encodes them
//!   itself (a polling loop is just a multi-emission producer).

use crate::multicast::{self, MulticastHandle, MulticastReceiver, MulticastSender};
use crate::scope::Scope;
use futures::StreamExt;
use opcast_core::{
    Envelope, LoadingPolicy, LoadingSignal, PageState, Producer, RequestDescriptor, Status, UiSink,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Multicast channel of envelopes for one run.
///
/// Cheap to clone; every [`subscribe`](MulticastHandle::subscribe) yields an
/// independent subscriber.
pub type Results<T> = MulticastHandle<Envelope<T>>;

/// One subscriber's view of a run's envelopes.
pub type ResultsReceiver<T> = MulticastReceiver<Envelope<T>>;

/// Executes request descriptors on an owning [`Scope`].
///
/// The orchestrator itself is stateless between runs; it only carries the
/// injected [`UiSink`] the runs publish their loading/page signals to.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use opcast_core::{LoadingPolicy, RequestDescriptor, StaticMessages};
/// use opcast_runtime::{Orchestrator, Scope, SlotSink};
///
/// # async fn example() -> anyhow::Result<()> {
/// let orchestrator = Orchestrator::new(Arc::new(SlotSink::new()));
/// let scope = Scope::new();
/// let messages = StaticMessages::default();
///
/// let descriptor = RequestDescriptor::builder(&messages)
///     .once(|_token| async { Ok("signed in".to_owned()) })
///     .loading_policy(LoadingPolicy::Dialog)
///     .build()?;
///
/// let results = orchestrator.run(&scope, descriptor);
/// let mut subscriber = results.subscribe();
/// while let Some(envelope) = subscriber.recv().await {
///     // dispatch Success / Error to the UI
/// }
/// # Ok(())
/// # }
/// ```
pub struct Orchestrator {
    ui: Arc<dyn UiSink>,
}

impl Orchestrator {
    /// Creates an orchestrator publishing UI signals to the given sink.
    #[must_use]
    pub fn new(ui: Arc<dyn UiSink>) -> Self {
        Self { ui }
    }

    /// Starts one run and returns its result channel immediately.
    ///
    /// The run executes on a task spawned on `scope`; cancelling the scope
    /// (or the child token carried by the shown [`LoadingSignal`]) cancels
    /// exactly this producer. Already-pushed envelopes stay in the channel
    /// for existing subscribers to drain.
    #[must_use]
    pub fn run<T>(&self, scope: &Scope, descriptor: RequestDescriptor<T>) -> Results<T>
    where
        T: Send + 'static,
    {
        let policy = descriptor.loading_policy();
        let message = descriptor.loading_message().to_owned();
        let (sender, results) =
            multicast::channel(descriptor.replay(), descriptor.extra_buffer());

        let span = tracing::debug_span!(
            "run",
            policy = ?policy,
            replay = descriptor.replay(),
            extra_buffer = descriptor.extra_buffer(),
        );

        let token = scope.child_token();
        let producer = descriptor.into_producer();
        let ui = Arc::clone(&self.ui);

        scope.spawn(execute(ui, token, producer, policy, message, sender).instrument(span));

        results
    }
}

/// Body of one run task.
async fn execute<T>(
    ui: Arc<dyn UiSink>,
    token: CancellationToken,
    producer: Producer<T>,
    policy: LoadingPolicy,
    message: String,
    sender: MulticastSender<Envelope<T>>,
) where
    T: Send + 'static,
{
    if token.is_cancelled() {
        tracing::debug!("scope already cancelled, run skipped");
        return;
    }

    if policy.is_visible() {
        tracing::debug!("loading shown");
        ui.loading(LoadingSignal::shown(policy, message.as_str(), token.clone()));
    }

    // Outer failure layer: the producer future can fail before any stream
    // exists (constructing the request, resolving a dependency).
    let mut stream = tokio::select! {
        () = token.cancelled() => {
            tracing::debug!("cancelled before the producer started");
            return;
        }
        built = producer(token.clone()) => match built {
            Ok(stream) => stream,
            Err(error) => {
                report_failure(&*ui, &token, policy, &message, error, &sender).await;
                return;
            }
        },
    };

    // Stream failure layer: caught at the point of observation, value by
    // value, so a mid-stream fault after k emissions still reports.
    loop {
        let item = tokio::select! {
            () = token.cancelled() => {
                tracing::debug!("cancelled while draining the producer");
                return;
            }
            item = stream.next() => item,
        };

        match item {
            Some(Ok(value)) => {
                // Backpressured push, still cancellable while parked.
                tokio::select! {
                    () = token.cancelled() => return,
                    () = sender.send(Envelope::Success(value)) => {}
                }
            }
            Some(Err(error)) => {
                report_failure(&*ui, &token, policy, &message, error, &sender).await;
                return;
            }
            None => {
                if policy.is_visible() {
                    tracing::debug!("loading hidden");
                    ui.loading(LoadingSignal::hidden(policy, message.as_str()));
                }
                if policy == LoadingPolicy::FullPage {
                    ui.page_state(PageState::Content);
                }
                sender.close();
                return;
            }
        }
    }
}

/// Terminal failure path, shared by both catch layers.
///
/// Cancellation is exempt: a fault observed after the token fired is scope
/// teardown noise, not a reportable status.
async fn report_failure<T>(
    ui: &dyn UiSink,
    token: &CancellationToken,
    policy: LoadingPolicy,
    message: &str,
    error: anyhow::Error,
    sender: &MulticastSender<Envelope<T>>,
) {
    if token.is_cancelled() {
        tracing::debug!("failure observed after cancellation, not reported");
        return;
    }

    if policy.is_visible() {
        ui.loading(LoadingSignal::hidden(policy, message));
    }

    let status = Status::from_error(error, policy);
    tracing::warn!(code = status.code(), status = %status, "run failed");

    if policy == LoadingPolicy::FullPage {
        ui.page_state(PageState::Error(status.clone()));
    }

    tokio::select! {
        () = token.cancelled() => {}
        () = sender.send(Envelope::Error(status)) => {}
    }
    sender.close();
}
