//! Result envelope delivered to subscribers.
//!
//! Every value a producer emits — and every terminal failure — is wrapped in
//! an [`Envelope`] before it is pushed into the multicast result channel. An
//! envelope is created once, pushed once, and never mutated afterwards; each
//! subscriber receives its own clone.

use crate::status::Status;
use serde::{Deserialize, Serialize};

/// Discriminated Success/Error wrapper around one emitted result.
///
/// A run pushes any number of `Success` envelopes (including zero) followed
/// by at most one terminal `Error` envelope. Cancellation pushes nothing.
///
/// # Examples
///
/// ```
/// use opcast_core::{Envelope, Failure, LoadingPolicy, Status};
///
/// let ok: Envelope<u32> = Envelope::Success(7);
/// assert!(ok.is_success());
///
/// let status = Status::from_error(Failure::new(404, "not found").into(), LoadingPolicy::None);
/// let err: Envelope<u32> = Envelope::Error(status);
/// assert_eq!(err.status().map(Status::code), Some(404));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Envelope<T> {
    /// A value emitted by the producer.
    Success(T),

    /// The run's terminal failure, normalized into a [`Status`].
    Error(Status),
}

impl<T> Envelope<T> {
    /// Returns `true` for a `Success` envelope.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` for an `Error` envelope.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Borrows the success value, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Borrows the error status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<&Status> {
        match self {
            Self::Success(_) => None,
            Self::Error(status) => Some(status),
        }
    }

    /// Consumes the envelope, returning the success value if present.
    #[must_use]
    pub fn into_value(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Maps the success value, leaving an error envelope untouched.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        match self {
            Self::Success(value) => Envelope::Success(f(value)),
            Self::Error(status) => Envelope::Error(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::LoadingPolicy;
    use crate::status::Failure;

    #[test]
    fn success_accessors() {
        let envelope = Envelope::Success(42_u32);
        assert!(envelope.is_success());
        assert!(!envelope.is_error());
        assert_eq!(envelope.value(), Some(&42));
        assert!(envelope.status().is_none());
        assert_eq!(envelope.into_value(), Some(42));
    }

    #[test]
    fn error_accessors() {
        let status =
            Status::from_error(Failure::new(500, "boom").into(), LoadingPolicy::Dialog);
        let envelope: Envelope<u32> = Envelope::Error(status);
        assert!(envelope.is_error());
        assert!(envelope.value().is_none());
        assert_eq!(envelope.status().map(Status::code), Some(500));
    }

    #[test]
    fn map_preserves_variant() {
        let mapped = Envelope::Success(2_u32).map(|n| n * 10);
        assert_eq!(mapped.into_value(), Some(20));

        let status = Status::from_error(Failure::new(400, "bad").into(), LoadingPolicy::None);
        let mapped: Envelope<u32> = Envelope::<u32>::Error(status).map(|n| n * 10);
        assert!(mapped.is_error());
    }
}
