//! # Opcast Testing
//!
//! Testing utilities and mock collaborators for the opcast
//! request-orchestration layer.
//!
//! This crate provides:
//! - [`RecordingSink`]: a [`UiSink`] that captures every loading and
//!   page-state signal in order, where the production sink keeps only the
//!   latest
//! - Scripted producers for the common test shapes: emit then complete,
//!   emit then fail, fail before the stream starts, emit then hang
//! - [`test_messages`]: a fixed [`MessageSource`](opcast_core::MessageSource)
//!   for deterministic descriptor defaults
//!
//! ## Example
//!
//! ```
//! use opcast_core::RequestDescriptor;
//! use opcast_testing::{producers, test_messages};
//!
//! let descriptor = RequestDescriptor::builder(&test_messages())
//!     .producer(producers::emit_then_complete(vec![1_u32, 2, 3]))
//!     .build()
//!     .unwrap();
//! # let _ = descriptor;
//! ```

use opcast_core::StaticMessages;

/// Mock signal sinks.
pub mod sinks {
    use opcast_core::{LoadingSignal, PageState, UiSink};
    use std::sync::{Arc, Mutex};

    /// [`UiSink`] that records every signal in publish order.
    ///
    /// The production slot sink conflates to the latest value; tests need
    /// the full sequence to assert the at-most-two-loading-events contract.
    #[derive(Debug, Default)]
    pub struct RecordingSink {
        loading: Mutex<Vec<LoadingSignal>>,
        page: Mutex<Vec<PageState>>,
    }

    impl RecordingSink {
        /// Creates an empty recording sink.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Creates a shared recording sink, ready to hand to an engine.
        #[must_use]
        pub fn arc() -> Arc<Self> {
            Arc::new(Self::new())
        }

        /// Every loading signal recorded so far, in publish order.
        #[must_use]
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        pub fn loading_events(&self) -> Vec<LoadingSignal> {
            self.loading.lock().unwrap().clone()
        }

        /// Every page-state transition recorded so far, in publish order.
        #[must_use]
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        pub fn page_events(&self) -> Vec<PageState> {
            self.page.lock().unwrap().clone()
        }

        /// The `visible` flags of the recorded loading signals, in order.
        ///
        /// The usual assertion is `vec![true, false]` (one run, visible
        /// policy) or `vec![]` (policy `None`, or a cancelled run that never
        /// reached its terminal edge).
        #[must_use]
        pub fn visibility_sequence(&self) -> Vec<bool> {
            self.loading_events()
                .iter()
                .map(|signal| signal.visible)
                .collect()
        }
    }

    impl UiSink for RecordingSink {
        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        fn loading(&self, signal: LoadingSignal) {
            self.loading.lock().unwrap().push(signal);
        }

        #[allow(clippy::unwrap_used)] // Mutex poison is unrecoverable
        fn page_state(&self, state: PageState) {
            self.page.lock().unwrap().push(state);
        }
    }
}

/// Scripted producers for engine tests.
///
/// Each helper returns a closure that fits straight into
/// [`RequestBuilder::producer`](opcast_core::RequestBuilder::producer).
pub mod producers {
    use futures::FutureExt;
    use futures::stream::{self, StreamExt};
    use opcast_core::{Failure, ProducerFuture};
    use tokio_util::sync::CancellationToken;

    /// Producer that emits every value, then completes cleanly.
    #[must_use]
    pub fn emit_then_complete<T: Send + 'static>(
        values: Vec<T>,
    ) -> impl FnOnce(CancellationToken) -> ProducerFuture<T> + Send + 'static {
        move |_token| {
            async move {
                let items: Vec<anyhow::Result<T>> = values.into_iter().map(Ok).collect();
                Ok(stream::iter(items).boxed())
            }
            .boxed()
        }
    }

    /// Producer that emits every value, then fails with the given failure.
    #[must_use]
    pub fn emit_then_fail<T: Send + 'static>(
        values: Vec<T>,
        failure: Failure,
    ) -> impl FnOnce(CancellationToken) -> ProducerFuture<T> + Send + 'static {
        move |_token| {
            async move {
                let mut items: Vec<anyhow::Result<T>> = values.into_iter().map(Ok).collect();
                items.push(Err(failure.into()));
                Ok(stream::iter(items).boxed())
            }
            .boxed()
        }
    }

    /// Producer whose future fails before any stream exists — the
    /// outer-level error path.
    #[must_use]
    pub fn fail_before_stream<T: Send + 'static>(
        failure: Failure,
    ) -> impl FnOnce(CancellationToken) -> ProducerFuture<T> + Send + 'static {
        move |_token| async move { Err(failure.into()) }.boxed()
    }

    /// Producer that emits every value, then never completes.
    ///
    /// The run only ends through cancellation — the shape for
    /// cancellation-path tests.
    #[must_use]
    pub fn emit_then_hang<T: Send + 'static>(
        values: Vec<T>,
    ) -> impl FnOnce(CancellationToken) -> ProducerFuture<T> + Send + 'static {
        move |_token| {
            async move {
                let items: Vec<anyhow::Result<T>> = values.into_iter().map(Ok).collect();
                Ok(stream::iter(items).chain(stream::pending()).boxed())
            }
            .boxed()
        }
    }
}

/// Fixed message source for deterministic descriptor defaults.
#[must_use]
pub fn test_messages() -> StaticMessages {
    StaticMessages::new("Loading…")
}

// Re-export commonly used items
pub use sinks::RecordingSink;
