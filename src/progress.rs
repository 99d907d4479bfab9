//! Progress-callback trait for per-page ingestion events.
//!
//! Inject an [`Arc<dyn IngestProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to observe OCR
//! as it runs. The CLI uses this to drive its progress bar; a server could
//! forward the events to a websocket instead.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdfqa::{AnalyzerConfig, IngestProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     recognised: AtomicUsize,
//! }
//!
//! impl IngestProgressCallback for CountingCallback {
//!     fn on_page_recognized(&self, page_num: usize, total_pages: usize, text_len: usize) {
//!         self.recognised.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} recognised ({} chars)", page_num, total_pages, text_len);
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { recognised: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the ingestion pipeline as it recognises each page.
///
/// Pages are recognised concurrently (`ocr_concurrency`), so `on_page_*`
/// methods may be called from several threads at once and out of page order.
/// All methods default to no-ops.
pub trait IngestProgressCallback: Send + Sync {
    /// Called once the PDF is rasterised and the page count is known.
    fn on_ingest_start(&self, filename: &str, total_pages: usize) {
        let _ = (filename, total_pages);
    }

    /// Called just before a page is handed to the OCR engine.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when a page's text has been extracted.
    ///
    /// `text_len` is the byte length of the cleaned page text.
    fn on_page_recognized(&self, page_num: usize, total_pages: usize, text_len: usize) {
        let _ = (page_num, total_pages, text_len);
    }

    /// Called when a page fails after all retries; ingestion aborts right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once every page has been recognised and the document is stored.
    fn on_ingest_complete(&self, filename: &str, total_pages: usize) {
        let _ = (filename, total_pages);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl IngestProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn IngestProgressCallback>;
