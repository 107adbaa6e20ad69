//! Failure normalization.
//!
//! Producers fail with an opaque [`anyhow::Error`]. Before a failure reaches
//! a subscriber it is mapped — totally, without ever raising — into a
//! [`Status`]: a stable numeric code, a display message, the loading policy
//! of the run that failed, and the original cause for diagnostics.
//!
//! Repositories that want a specific code on the wire raise a structured
//! [`Failure`]; anything else maps to [`code::UNKNOWN`].

use crate::loading::LoadingPolicy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Well-known status codes used by the presentation tier.
///
/// The set is deliberately small: producers attach precise codes via
/// [`Failure`]; these constants only name the ones the engine and common
/// repositories need.
pub mod code {
    /// Operation exceeded its time budget.
    pub const TIMEOUT: u16 = 408;

    /// Failure carried no structured code.
    pub const UNKNOWN: u16 = 520;
}

/// Structured failure raised by producers that know their status code.
///
/// `Failure` travels inside an [`anyhow::Error`]; the status mapper
/// downcasts to it to recover the code/message pair.
///
/// # Examples
///
/// ```
/// use opcast_core::{Failure, code};
///
/// let failure = Failure::timeout("profile fetch timed out");
/// assert_eq!(failure.code(), code::TIMEOUT);
/// ```
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} (code {code})")]
pub struct Failure {
    code: u16,
    message: String,
}

impl Failure {
    /// Creates a failure with an explicit status code.
    #[must_use]
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a timeout failure ([`code::TIMEOUT`]).
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(code::TIMEOUT, message)
    }

    /// The status code this failure carries.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// The display message this failure carries.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Normalized failure entity delivered inside an error envelope.
///
/// Created by [`Status::from_error`] exactly once per failed run. The
/// original cause is retained behind an [`Arc`] so every subscriber's clone
/// shares it; it is skipped during serialization since an arbitrary error
/// chain has no stable wire form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    code: u16,
    message: String,
    policy: LoadingPolicy,
    #[serde(skip)]
    cause: Option<Arc<anyhow::Error>>,
}

impl Status {
    /// Maps an arbitrary failure into a status.
    ///
    /// Pure and total: a [`Failure`] anywhere it can be downcast from
    /// supplies the code/message pair, anything else becomes
    /// [`code::UNKNOWN`] with the error's display text. The original error
    /// is always kept as the cause. Cancellation never reaches this mapper —
    /// the engine filters it out before reporting.
    #[must_use]
    pub fn from_error(error: anyhow::Error, policy: LoadingPolicy) -> Self {
        let (code, message) = match error.downcast_ref::<Failure>() {
            Some(failure) => (failure.code(), failure.message().to_owned()),
            None => (code::UNKNOWN, error.to_string()),
        };

        Self {
            code,
            message,
            policy,
            cause: Some(Arc::new(error)),
        }
    }

    /// The normalized status code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        self.code
    }

    /// The display message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The loading policy of the run that produced this status.
    ///
    /// Lets the UI layer pick the right error surface (inline, dialog,
    /// full page) without tracking the run separately.
    #[must_use]
    pub const fn policy(&self) -> LoadingPolicy {
        self.policy
    }

    /// The original cause, when one was captured.
    #[must_use]
    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}
