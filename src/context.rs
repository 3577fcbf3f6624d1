//! Cooperative cancellation
//!
//! A [`Context`] is handed to every archive, extract and traversal call.
//! Long-running operations poll it at entry boundaries, never in the middle
//! of writing an entry, so a cancelled archive never contains a truncated
//! record. Clones share the same flag: cancel from any thread and every
//! operation holding a clone stops at its next boundary.
//!
//! ```rust
//! use archives::Context;
//!
//! let ctx = Context::new();
//! let handle = ctx.clone();
//! assert!(ctx.check().is_ok());
//!
//! handle.cancel();
//! assert!(ctx.is_cancelled());
//! assert!(ctx.check().unwrap_err().is_cancelled());
//! ```

use crate::error::{ArchiveError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// Create a context that is not cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of every operation using this context
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`ArchiveError::Cancelled`] if cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ArchiveError::Cancelled)
        } else {
            Ok(())
        }
    }
}
