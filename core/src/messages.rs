//! Injected display-string lookup.
//!
//! The default loading message comes from whatever localization machinery
//! the host application uses. That machinery is abstracted behind
//! [`MessageSource`] and passed into the descriptor builder explicitly — the
//! descriptor layer never reaches into a process-wide resource table.

/// String-resolution seam for display messages.
///
/// Implementations are expected to be cheap to call; the builder resolves
/// the default loading message once per descriptor.
///
/// # Examples
///
/// ```
/// use opcast_core::{MessageSource, StaticMessages};
///
/// let messages = StaticMessages::new("Bitte warten…");
/// assert_eq!(messages.loading_message(), "Bitte warten…");
/// ```
pub trait MessageSource: Send + Sync {
    /// The localized "loading" string shown while a run is in flight.
    fn loading_message(&self) -> String;
}

/// Fixed-string [`MessageSource`] for applications without localization
/// (and for tests).
#[derive(Debug, Clone)]
pub struct StaticMessages {
    loading: String,
}

impl StaticMessages {
    /// Creates a source that always resolves to the given loading message.
    #[must_use]
    pub fn new(loading: impl Into<String>) -> Self {
        Self {
            loading: loading.into(),
        }
    }
}

impl Default for StaticMessages {
    fn default() -> Self {
        Self::new("Loading…")
    }
}

impl MessageSource for StaticMessages {
    fn loading_message(&self) -> String {
        self.loading.clone()
    }
}
