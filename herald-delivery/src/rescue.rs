//! Ordered error-rescue chain.
//!
//! A composer declares `(matcher, handler)` pairs at definition time.
//! The chain is consulted in declaration order, first match wins, and an
//! unmatched error is left for the caller to re-propagate. The same
//! chain serves the synchronous delivery path and the job executor.

use std::sync::Arc;

use crate::error::DeliveryError;

/// Predicate deciding whether a handler applies to an error.
pub type Matcher = Arc<dyn Fn(&DeliveryError) -> bool + Send + Sync>;

/// Handler invoked for a matched error.
pub type Handler = Arc<dyn Fn(&DeliveryError) + Send + Sync>;

/// Ordered list of `(matcher, handler)` pairs.
#[derive(Clone, Default)]
pub struct RescueChain {
    entries: Vec<(Matcher, Handler)>,
}

impl std::fmt::Debug for RescueChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RescueChain")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl RescueChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `(matcher, handler)` pair.
    pub fn push<M, H>(&mut self, matcher: M, handler: H)
    where
        M: Fn(&DeliveryError) -> bool + Send + Sync + 'static,
        H: Fn(&DeliveryError) + Send + Sync + 'static,
    {
        self.entries.push((Arc::new(matcher), Arc::new(handler)));
    }

    /// Run the first handler whose matcher accepts `error`.
    ///
    /// Returns `true` if a handler ran; `false` means the error is
    /// unhandled and the caller must propagate it unchanged.
    #[must_use]
    pub fn handle(&self, error: &DeliveryError) -> bool {
        for (matcher, handler) in &self.entries {
            if matcher(error) {
                handler(error);
                return true;
            }
        }
        false
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
