//! # Opcast Runtime
//!
//! Execution layer for the opcast request-orchestration architecture.
//!
//! This crate provides everything that actually runs: the [`Orchestrator`]
//! that turns a request descriptor into a supervised task, the [`Scope`]
//! that bounds run lifetimes to their owning component, the multicast result
//! channel with bounded replay and producer backpressure, and the
//! watch-backed [`SlotSink`] the UI layer observes.
//!
//! ## Core Components
//!
//! - **Orchestrator**: spawns one cancellable task per run, forwards every
//!   emitted value and the single terminal failure into the run's channel,
//!   and drives loading visibility around the run's lifetime
//! - **Scope**: cancellation token + task group; supervision without
//!   failure propagation between sibling runs
//! - **Multicast channel**: independent subscribers, bounded replay for late
//!   attachers, suspension (never loss) under backpressure
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use opcast_core::{Envelope, LoadingPolicy, RequestDescriptor, StaticMessages};
//! use opcast_runtime::{Orchestrator, Scope, SlotSink};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let sink = Arc::new(SlotSink::new());
//! let orchestrator = Orchestrator::new(sink);
//! let scope = Scope::new();
//! let messages = StaticMessages::default();
//!
//! let descriptor = RequestDescriptor::builder(&messages)
//!     .once(|_token| async { Ok(41 + 1) })
//!     .loading_policy(LoadingPolicy::Inline)
//!     .build()?;
//!
//! let mut subscriber = orchestrator.run(&scope, descriptor).subscribe();
//! match subscriber.recv().await {
//!     Some(Envelope::Success(value)) => assert_eq!(value, 42),
//!     Some(Envelope::Error(status)) => eprintln!("failed: {status}"),
//!     None => {}
//! }
//! # Ok(())
//! # }
//! ```

/// The orchestration engine.
pub mod engine;

/// Multicast result channel with replay and backpressure.
pub mod multicast;

/// Owning scope for orchestrated runs.
pub mod scope;

/// Watch-backed UI signal slots.
pub mod slot;

pub use engine::{Orchestrator, Results, ResultsReceiver};
pub use multicast::{MulticastHandle, MulticastReceiver, MulticastSender, TryRecvError};
pub use scope::Scope;
pub use slot::SlotSink;
