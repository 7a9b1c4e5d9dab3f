//! Progress-callback trait for per-page batch events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] with
//! [`crate::convert::BatchConverter::with_progress`] to receive events as the
//! loop works through the page range. The CLI renders them as an indicatif
//! progress bar; library callers can forward them anywhere.
//!
//! Pages are processed strictly in order, so events for page `n` always
//! arrive before any event for page `n + 1`.
//!
//! # Example
//!
//! ```rust
//! use pdf_ocr_batch::ConversionProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, page_num: usize, last_page: usize, text: &str, elapsed: Duration) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {page_num}/{last_page}: {} chars in {elapsed:?}", text.len());
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

/// Called by the batch loop as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once after validation, before the first page is rendered.
    ///
    /// # Arguments
    /// * `selected_pages`: number of pages in the resolved range
    fn on_conversion_start(&self, selected_pages: usize) {
        let _ = selected_pages;
    }

    /// Called before a page is rendered.
    ///
    /// # Arguments
    /// * `page_num`:  1-indexed page number
    /// * `last_page`: last page of the resolved range
    fn on_page_start(&self, page_num: usize, last_page: usize) {
        let _ = (page_num, last_page);
    }

    /// Called when the OCR process returned text for a page.
    fn on_page_complete(&self, page_num: usize, last_page: usize, text: &str, elapsed: Duration) {
        let _ = (page_num, last_page, text, elapsed);
    }

    /// Called when a page failed to render or OCR.
    fn on_page_error(&self, page_num: usize, last_page: usize, error: &str, elapsed: Duration) {
        let _ = (page_num, last_page, error, elapsed);
    }

    /// Called once after the loop ends, whether it finished or was interrupted.
    ///
    /// # Arguments
    /// * `attempted_pages`: pages that produced a result
    /// * `success_count`:   pages that produced text
    fn on_conversion_complete(&self, attempted_pages: usize, success_count: usize) {
        let _ = (attempted_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the shared callback handle.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
