//! Request descriptor — declarative configuration for one orchestrated run.
//!
//! A descriptor pins down three things before any execution happens: the
//! producer to run, the loading presentation around it, and the
//! replay/buffering its subscribers get. It is built through
//! [`RequestBuilder`], which validates at `build()` time — a descriptor with
//! no producer cannot exist, so the engine never discovers a misconfigured
//! request mid-run.

use crate::loading::LoadingPolicy;
use crate::messages::MessageSource;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Lazy sequence of results yielded by a producer.
///
/// An `Err` item is the run's mid-stream terminal failure; the engine stops
/// draining after it.
pub type ProducerStream<T> = BoxStream<'static, anyhow::Result<T>>;

/// Future resolving to a producer's result stream.
///
/// An `Err` here is the outer-level failure path: the producer failed before
/// its stream ever began.
pub type ProducerFuture<T> = BoxFuture<'static, anyhow::Result<ProducerStream<T>>>;

/// The caller-supplied asynchronous operation.
///
/// `FnOnce` by construction: a producer is invoked at most once per run and
/// the engine never retries it. The [`CancellationToken`] it receives is the
/// run's own child token; long-lived producers should observe it.
pub type Producer<T> = Box<dyn FnOnce(CancellationToken) -> ProducerFuture<T> + Send>;

/// Descriptor configuration errors, raised at build time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// `build()` was called without a producer.
    ///
    /// This is a programming error at the call site, surfaced loudly here
    /// instead of deferred to run time.
    #[error("request descriptor has no producer")]
    MissingProducer,
}

/// Immutable-after-build configuration for one orchestrated operation.
///
/// Consumed by a single run; the `FnOnce` producer makes reuse impossible
/// rather than merely discouraged.
///
/// # Examples
///
/// ```
/// use opcast_core::{LoadingPolicy, RequestDescriptor, StaticMessages};
///
/// let messages = StaticMessages::default();
/// let descriptor = RequestDescriptor::builder(&messages)
///     .once(|_token| async { Ok(42_u32) })
///     .loading_policy(LoadingPolicy::Inline)
///     .build()
///     .unwrap();
///
/// assert_eq!(descriptor.replay(), 1);
/// ```
pub struct RequestDescriptor<T> {
    producer: Producer<T>,
    loading_policy: LoadingPolicy,
    loading_message: String,
    replay: usize,
    extra_buffer: usize,
}

impl<T> std::fmt::Debug for RequestDescriptor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("loading_policy", &self.loading_policy)
            .field("loading_message", &self.loading_message)
            .field("replay", &self.replay)
            .field("extra_buffer", &self.extra_buffer)
            .finish_non_exhaustive()
    }
}

impl<T: Send + 'static> RequestDescriptor<T> {
    /// Starts a builder.
    ///
    /// The default loading message is resolved from `messages` once, here,
    /// so the descriptor never consults a hidden global later.
    #[must_use]
    pub fn builder(messages: &dyn MessageSource) -> RequestBuilder<T> {
        RequestBuilder {
            producer: None,
            loading_policy: LoadingPolicy::None,
            loading_message: messages.loading_message(),
            replay: 1,
            extra_buffer: 0,
        }
    }
}

impl<T> RequestDescriptor<T> {
    /// The loading presentation policy for this run.
    #[must_use]
    pub const fn loading_policy(&self) -> LoadingPolicy {
        self.loading_policy
    }

    /// The message shown while the run is in flight.
    #[must_use]
    pub fn loading_message(&self) -> &str {
        &self.loading_message
    }

    /// Number of most-recent envelopes replayed to a late subscriber.
    #[must_use]
    pub const fn replay(&self) -> usize {
        self.replay
    }

    /// Pending-envelope buffer beyond the replay suffix.
    #[must_use]
    pub const fn extra_buffer(&self) -> usize {
        self.extra_buffer
    }

    /// Consumes the descriptor, surrendering the producer to the runtime.
    #[must_use]
    pub fn into_producer(self) -> Producer<T> {
        self.producer
    }
}

/// Builder for [`RequestDescriptor`].
///
/// Defaults: no loading UI, the injected loading message, `replay = 1`
/// (a re-attaching observer sees the latest result), `extra_buffer = 0`.
pub struct RequestBuilder<T> {
    producer: Option<Producer<T>>,
    loading_policy: LoadingPolicy,
    loading_message: String,
    replay: usize,
    extra_buffer: usize,
}

impl<T: Send + 'static> RequestBuilder<T> {
    /// Sets the producer as a stream-returning operation.
    ///
    /// The returned future's failure is the outer-level error path; an `Err`
    /// item in the stream is the mid-stream error path.
    #[must_use]
    pub fn producer<F, Fut>(mut self, producer: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<ProducerStream<T>>> + Send + 'static,
    {
        self.producer = Some(Box::new(move |token| producer(token).boxed()));
        self
    }

    /// Sets the producer as a single-result operation.
    ///
    /// The common presentation-tier case — one network call, one result —
    /// wrapped into a one-item stream. The operation runs as the stream's
    /// only item, so its failure takes the mid-stream error path.
    #[must_use]
    pub fn once<F, Fut>(self, operation: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        self.producer(move |token| async move {
            Ok(stream::once(operation(token)).boxed())
        })
    }

    /// Sets the loading presentation policy.
    #[must_use]
    pub const fn loading_policy(mut self, policy: LoadingPolicy) -> Self {
        self.loading_policy = policy;
        self
    }

    /// Overrides the loading message for this descriptor.
    #[must_use]
    pub fn loading_message(mut self, message: impl Into<String>) -> Self {
        self.loading_message = message.into();
        self
    }

    /// Sets how many most-recent envelopes a late subscriber receives.
    #[must_use]
    pub const fn replay(mut self, replay: usize) -> Self {
        self.replay = replay;
        self
    }

    /// Sets the pending-envelope buffer beyond the replay suffix.
    ///
    /// When `replay + extra_buffer` undelivered envelopes are outstanding,
    /// further emission suspends the producer until a subscriber drains —
    /// backpressure, not an error.
    #[must_use]
    pub const fn extra_buffer(mut self, extra_buffer: usize) -> Self {
        self.extra_buffer = extra_buffer;
        self
    }

    /// Finalizes the descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`DescriptorError::MissingProducer`] when no producer was
    /// set.
    pub fn build(self) -> Result<RequestDescriptor<T>, DescriptorError> {
        let producer = self.producer.ok_or(DescriptorError::MissingProducer)?;

        Ok(RequestDescriptor {
            producer,
            loading_policy: self.loading_policy,
            loading_message: self.loading_message,
            replay: self.replay,
            extra_buffer: self.extra_buffer,
        })
    }
}
