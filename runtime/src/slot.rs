//! Watch-backed UI signal slots.

use opcast_core::{LoadingSignal, PageState, UiSink};
use tokio::sync::watch;

/// Production [`UiSink`]: one single-value slot per signal kind.
///
/// Each publish replaces the slot's current value — last writer wins. That
/// is the right shape for a UI layer that only ever renders the latest
/// state, but it is also a documented hazard: two concurrent runs on the
/// same scope share the loading slot, so the first to finish hides the
/// indicator for both. Callers who run overlapping loading-visible requests
/// should give each its own sink (or scope) rather than expect the engine to
/// referee.
///
/// # Examples
///
/// ```
/// use opcast_core::{LoadingPolicy, LoadingSignal, UiSink};
/// use opcast_runtime::SlotSink;
/// use tokio_util::sync::CancellationToken;
///
/// let sink = SlotSink::new();
/// let slot = sink.loading_slot();
///
/// sink.loading(LoadingSignal::shown(
///     LoadingPolicy::Dialog,
///     "Loading…",
///     CancellationToken::new(),
/// ));
///
/// assert!(slot.borrow().as_ref().is_some_and(|signal| signal.visible));
/// ```
#[derive(Debug)]
pub struct SlotSink {
    loading: watch::Sender<Option<LoadingSignal>>,
    page: watch::Sender<Option<PageState>>,
}

impl SlotSink {
    /// Creates a sink with both slots empty.
    #[must_use]
    pub fn new() -> Self {
        let (loading, _) = watch::channel(None);
        let (page, _) = watch::channel(None);
        Self { loading, page }
    }

    /// Watch side of the loading slot, for the UI layer to observe.
    #[must_use]
    pub fn loading_slot(&self) -> watch::Receiver<Option<LoadingSignal>> {
        self.loading.subscribe()
    }

    /// Watch side of the page-state slot.
    #[must_use]
    pub fn page_slot(&self) -> watch::Receiver<Option<PageState>> {
        self.page.subscribe()
    }
}

impl Default for SlotSink {
    fn default() -> Self {
        Self::new()
    }
}

impl UiSink for SlotSink {
    fn loading(&self, signal: LoadingSignal) {
        let _ = self.loading.send_replace(Some(signal));
    }

    fn page_state(&self, state: PageState) {
        let _ = self.page.send_replace(Some(state));
    }
}
