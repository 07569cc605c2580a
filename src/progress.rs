//! Progress-callback trait for per-source generation events.
//!
//! Inject an [`Arc<dyn GenerationProgressCallback>`] via
//! [`crate::config::GenerationConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a job's source files.
//!
//! # Example
//!
//! ```rust
//! use fulltext_generation::{GenerationConfig, GenerationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl GenerationProgressCallback for PageCounter {
//!     fn on_source_complete(&self, _index: usize, _total: usize, _name: &str, pages: usize) {
//!         self.pages.fetch_add(pages, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = GenerationConfig::builder()
//!     .progress_callback(counter as Arc<dyn GenerationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the orchestrator as it processes each source file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Sources are processed one after another, but
/// `run_async` calls the methods from a blocking-pool thread, hence
/// `Send + Sync`.
pub trait GenerationProgressCallback: Send + Sync {
    /// Called once after the source directory was listed.
    ///
    /// # Arguments
    /// * `total_sources` — number of files found, including ones that will
    ///   be skipped
    fn on_run_start(&self, total_sources: usize) {
        let _ = total_sources;
    }

    /// Called before a PDF or EPUB source is handled.
    ///
    /// # Arguments
    /// * `index` — 1-indexed position in the listing
    /// * `total` — total files in the listing
    /// * `name`  — file name of the source
    fn on_source_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a source was handled successfully.
    ///
    /// # Arguments
    /// * `pages` — pages the page counter advanced by (0 for EPUB sources)
    fn on_source_complete(&self, index: usize, total: usize, name: &str, pages: usize) {
        let _ = (index, total, name, pages);
    }

    /// Called when a file is not a PDF or EPUB.
    fn on_source_skipped(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a source fails, fatal or not.
    fn on_source_error(&self, index: usize, total: usize, name: &str, error: &str) {
        let _ = (index, total, name, error);
    }

    /// Called once after the last source when the run did not abort.
    ///
    /// # Arguments
    /// * `total_sources`   — files in the listing
    /// * `handled_sources` — PDF and EPUB sources handled without error
    fn on_run_complete(&self, total_sources: usize, handled_sources: usize) {
        let _ = (total_sources, handled_sources);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl GenerationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::GenerationConfig`].
pub type ProgressCallback = Arc<dyn GenerationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        skipped: AtomicUsize,
        errors: AtomicUsize,
        pages: AtomicUsize,
    }

    impl GenerationProgressCallback for TrackingCallback {
        fn on_source_start(&self, _index: usize, _total: usize, _name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_source_complete(&self, _index: usize, _total: usize, _name: &str, pages: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.pages.fetch_add(pages, Ordering::SeqCst);
        }

        fn on_source_skipped(&self, _index: usize, _total: usize, _name: &str) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }

        fn on_source_error(&self, _index: usize, _total: usize, _name: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(3);
        cb.on_source_start(1, 3, "a.pdf");
        cb.on_source_complete(1, 3, "a.pdf", 12);
        cb.on_source_skipped(2, 3, "notes.docx");
        cb.on_source_error(3, 3, "b.epub", "launch failed");
        cb.on_run_complete(3, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_source_start(1, 3, "a.pdf");
        tracker.on_source_complete(1, 3, "a.pdf", 4);
        tracker.on_source_skipped(2, 3, "scan.docx");
        tracker.on_source_start(3, 3, "b.epub");
        tracker.on_source_error(3, 3, "b.epub", "not found");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.pages.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_source_start(1, 10, "x.pdf");
    }
}
