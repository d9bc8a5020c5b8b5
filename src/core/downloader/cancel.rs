use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::error::{LauncherError, LauncherResult};

/// Cooperative cancellation flag, polled before each unit of work.
/// In-flight transfers finish; the next poll point stops.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Poll point: `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> LauncherResult<()> {
        if self.is_cancelled() {
            Err(LauncherError::Cancelled)
        } else {
            Ok(())
        }
    }
}
