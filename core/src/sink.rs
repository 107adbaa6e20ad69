//! UI signal sink — the seam between the engine and the UI layer.

use crate::loading::{LoadingSignal, PageState};

/// Receiver of loading and page-state signals.
///
/// The engine publishes through this trait and never knows how (or whether)
/// signals are rendered. Implementations must be prepared for a hide signal
/// without a preceding show — defensive, not a case the engine produces,
/// since the policy is fixed per descriptor.
///
/// Both methods are synchronous fire-and-forget: a sink must not block the
/// publishing run. The production implementation writes each signal into a
/// single-value watch slot; the testing implementation records every signal
/// in order.
pub trait UiSink: Send + Sync {
    /// Publishes a show/hide loading event.
    fn loading(&self, signal: LoadingSignal);

    /// Publishes a full-page state transition.
    fn page_state(&self, state: PageState);
}
