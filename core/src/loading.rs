//! Loading presentation types.
//!
//! A run announces progress through at most two [`LoadingSignal`]s — shown
//! before the first producer activity, hidden at the terminal edge — plus,
//! for full-page runs, a [`PageState`] transition. How a policy is rendered
//! is entirely the UI layer's business; these types only carry the decision.

use crate::status::Status;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// How a run presents progress while it executes.
///
/// Fixed per descriptor; every dispatch on it is matched exhaustively so a
/// new variant cannot be silently ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadingPolicy {
    /// No loading UI at all; the run is invisible until it emits.
    None,

    /// A small indicator inline with the content being refreshed.
    Inline,

    /// A modal progress dialog with a cancel affordance.
    Dialog,

    /// A full-page state view: progress while running, then a dedicated
    /// success or error page driven by [`PageState`].
    FullPage,
}

impl LoadingPolicy {
    /// Whether this policy emits loading signals at all.
    #[must_use]
    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One show/hide progress event emitted around a run's lifetime.
///
/// The visibility toggles at most twice per run regardless of how many
/// results the producer emits, so a polling producer never flickers the
/// indicator. The `scope` token is present on the show signal so a UI cancel
/// affordance (a dialog's cancel button) can tear down exactly that run.
#[derive(Debug, Clone)]
pub struct LoadingSignal {
    /// The presentation policy of the emitting run.
    pub policy: LoadingPolicy,

    /// Display message for the indicator.
    pub message: String,

    /// `true` at run start, `false` at the terminal edge.
    pub visible: bool,

    /// Cancellation handle for the emitting run; absent on hide signals.
    pub scope: Option<CancellationToken>,
}

impl LoadingSignal {
    /// The show signal published before the first producer activity.
    #[must_use]
    pub fn shown(policy: LoadingPolicy, message: impl Into<String>, scope: CancellationToken) -> Self {
        Self {
            policy,
            message: message.into(),
            visible: true,
            scope: Some(scope),
        }
    }

    /// The hide signal published at the run's terminal edge.
    #[must_use]
    pub fn hidden(policy: LoadingPolicy, message: impl Into<String>) -> Self {
        Self {
            policy,
            message: message.into(),
            visible: false,
            scope: None,
        }
    }
}

/// Terminal page transition for [`LoadingPolicy::FullPage`] runs.
///
/// Published exactly once per full-page run: `Content` on clean completion,
/// `Error` with the normalized status on failure. Cancelled runs publish
/// nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PageState {
    /// The run completed; show the content view.
    Content,

    /// The run failed; show the full-page error view.
    Error(Status),
}

impl PageState {
    /// Returns `true` for the content transition.
    #[must_use]
    pub const fn is_content(&self) -> bool {
        matches!(self, Self::Content)
    }

    /// Borrows the error status, if any.
    #[must_use]
    pub const fn status(&self) -> Option<&Status> {
        match self {
            Self::Content => None,
            Self::Error(status) => Some(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_none_is_invisible() {
        assert!(!LoadingPolicy::None.is_visible());
        assert!(LoadingPolicy::Inline.is_visible());
        assert!(LoadingPolicy::Dialog.is_visible());
        assert!(LoadingPolicy::FullPage.is_visible());
    }

    #[test]
    fn shown_carries_the_scope() {
        let token = CancellationToken::new();
        let signal = LoadingSignal::shown(LoadingPolicy::Dialog, "Loading…", token.clone());

        assert!(signal.visible);
        assert!(signal.scope.is_some());

        // Cancelling through the signal reaches the run's token.
        if let Some(scope) = &signal.scope {
            scope.cancel();
        }
        assert!(token.is_cancelled());
    }

    #[test]
    fn hidden_has_no_scope() {
        let signal = LoadingSignal::hidden(LoadingPolicy::Inline, "Loading…");
        assert!(!signal.visible);
        assert!(signal.scope.is_none());
    }
}
