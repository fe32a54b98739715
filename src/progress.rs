//! Progress reporting for per-page conversion events.
//!
//! Two channels exist. [`ConversionProgressCallback`] is the push side:
//! inject an `Arc<dyn ConversionProgressCallback>` via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! about every page. [`JobProgress`] is the pull side: the controller reads
//! it to build the `Converting page k of N...` status line while a job runs
//! on a blocking worker.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2img::{ConversionConfig, ConversionProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! /// Keeps the sizes of encoded pages, in page order.
//! #[derive(Default)]
//! struct PageSizes(Mutex<Vec<usize>>);
//!
//! impl ConversionProgressCallback for PageSizes {
//!     fn on_page_complete(&self, _page: usize, _total: usize, encoded_len: usize) {
//!         if let Ok(mut sizes) = self.0.lock() {
//!             sizes.push(encoded_len);
//!         }
//!     }
//! }
//!
//! let sizes = Arc::new(PageSizes::default());
//! let config = ConversionConfig::builder()
//!     .progress_callback(sizes.clone())
//!     .build()
//!     .unwrap();
//! assert!(config.progress_callback.is_some());
//! ```

use crate::error::PageError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Per-page events from a running conversion job.
///
/// Pages are rendered strictly in order on a single blocking worker, so
/// events arrive in page order and never concurrently for one job. The trait
/// is still `Send + Sync` because that worker is not the caller's thread.
/// All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after the document is decoded, before page 1 renders.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before page `page_num` (1-based) is rasterised.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page has been rendered and encoded into `encoded_len`
    /// bytes.
    fn on_page_complete(&self, page_num: usize, total_pages: usize, encoded_len: usize) {
        let _ = (page_num, total_pages, encoded_len);
    }

    /// Called when a page fails. The batch is aborted right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &PageError) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page converted successfully.
    fn on_conversion_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// Ignores every event.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// How a callback is stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Shared page counters for an in-flight job.
///
/// Written by the worker, read by the controller. `page` is the page
/// currently being rendered (0 before the first page starts).
#[derive(Debug, Default)]
pub struct JobProgress {
    page: AtomicUsize,
    total: AtomicUsize,
}

impl JobProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_total(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
    }

    pub(crate) fn set_page(&self, page: usize) {
        self.page.store(page, Ordering::SeqCst);
    }

    /// `(current_page, total_pages)`; both 0 until the document is decoded.
    pub fn snapshot(&self) -> (usize, usize) {
        (
            self.page.load(Ordering::SeqCst),
            self.total.load(Ordering::SeqCst),
        )
    }

    /// Human-readable status for the current position.
    pub fn status(&self) -> String {
        match self.snapshot() {
            (page, total) if page > 0 && total > 0 => {
                format!("Converting page {page} of {total}...")
            }
            _ => "Converting...".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Overrides only the failure hook; everything else uses the defaults.
    #[derive(Default)]
    struct FailureLog(Mutex<Vec<PageError>>);

    impl ConversionProgressCallback for FailureLog {
        fn on_page_error(&self, _page_num: usize, _total_pages: usize, error: &PageError) {
            self.0.lock().unwrap().push(error.clone());
        }
    }

    fn render_failure(page: usize) -> PageError {
        PageError::RenderFailed {
            page,
            detail: "bad content stream".into(),
        }
    }

    #[test]
    fn default_hooks_are_silent() {
        let log = FailureLog::default();
        log.on_conversion_start(2);
        log.on_page_start(1, 2);
        log.on_page_complete(1, 2, 512);
        log.on_page_error(2, 2, &render_failure(2));
        log.on_conversion_complete(2);
        assert_eq!(*log.0.lock().unwrap(), vec![render_failure(2)]);

        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_page_error(1, 1, &render_failure(1));
    }

    #[test]
    fn job_progress_status() {
        let p = JobProgress::new();
        assert_eq!(p.status(), "Converting...");
        p.set_total(4);
        assert_eq!(p.status(), "Converting...");
        p.set_page(2);
        assert_eq!(p.status(), "Converting page 2 of 4...");
        assert_eq!(p.snapshot(), (2, 4));
    }

    #[test]
    fn job_progress_is_visible_across_threads() {
        let p = JobProgress::new();
        let worker = Arc::clone(&p);
        std::thread::spawn(move || {
            worker.set_total(3);
            for page in 1..=3 {
                worker.set_page(page);
            }
        })
        .join()
        .unwrap();
        assert_eq!(p.status(), "Converting page 3 of 3...");
    }
}
