//! # Opcast Core
//!
//! Core types and collaborator traits for the opcast request-orchestration
//! layer.
//!
//! Presentation-tier code describes one asynchronous operation as a
//! [`RequestDescriptor`]: the producer to run, how to present progress while
//! it runs, and how much replay/buffering its subscribers get. The runtime
//! crate executes descriptors on a cancellable scope and multicasts every
//! emitted value as an [`Envelope`] — either `Success(value)` or a terminal
//! `Error(status)` normalized through [`Status::from_error`].
//!
//! ## Core Concepts
//!
//! - **Descriptor**: immutable-after-build configuration for one run
//! - **Producer**: the caller-supplied async operation yielding a lazy
//!   sequence of results
//! - **Envelope**: the Success/Error wrapper delivered to subscribers
//! - **Status**: the normalized failure entity (code, message, cause)
//! - **Collaborator seams**: [`UiSink`] (loading/page signals) and
//!   [`MessageSource`] (string lookup) are injected traits, never globals
//!
//! ## Example
//!
//! ```
//! use opcast_core::{LoadingPolicy, RequestDescriptor, StaticMessages};
//!
//! let messages = StaticMessages::default();
//! let descriptor = RequestDescriptor::builder(&messages)
//!     .once(|_token| async { Ok("profile".to_owned()) })
//!     .loading_policy(LoadingPolicy::Dialog)
//!     .replay(1)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.loading_policy(), LoadingPolicy::Dialog);
//! # let _ = descriptor;
//! ```

/// Request descriptor and its validating builder.
pub mod descriptor;

/// The Success/Error result envelope delivered to subscribers.
pub mod envelope;

/// Loading policy, loading signal, and full-page state types.
pub mod loading;

/// Injected string lookup for default display messages.
pub mod messages;

/// UI signal sink — the collaborator seam for loading/page-state delivery.
pub mod sink;

/// Status entity, structured failure type, and the status mapper.
pub mod status;

pub use descriptor::{
    DescriptorError, Producer, ProducerFuture, ProducerStream, RequestBuilder, RequestDescriptor,
};
pub use envelope::Envelope;
pub use loading::{LoadingPolicy, LoadingSignal, PageState};
pub use messages::{MessageSource, StaticMessages};
pub use sink::UiSink;
pub use status::{Failure, Status, code};
