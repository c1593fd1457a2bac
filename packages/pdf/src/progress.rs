//! Page progress reporting.
//!
//! [`ProgressCallback`] keeps the parser independent of how progress is
//! shown. The CLI plugs in `indicatif` bars; library callers that don't
//! care pass [`null_progress()`].

use std::sync::Arc;

/// Receives page-level progress while a document is parsed.
///
/// Shared as `Arc<dyn ProgressCallback>` and called from the blocking
/// decode thread, hence `Send + Sync`.
pub trait ProgressCallback: Send + Sync {
    /// Called once the page count is known.
    fn set_total(&self, pages: u64);

    /// Called after each page is processed.
    fn inc(&self, pages: u64);

    /// Replaces the status message.
    fn set_message(&self, msg: String);

    /// Called when the document is done, with a summary.
    fn finish(&self, msg: String);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _pages: u64) {}
    fn inc(&self, _pages: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Returns a shared [`NullProgress`].
#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}
