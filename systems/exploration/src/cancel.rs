//! Cooperative cancellation of running episodes.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Shared flag that asks a running episode to stop.
///
/// The controller checks the flag before every action, so a cancelled
/// episode never leaves the map halfway through a step.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Reports whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
