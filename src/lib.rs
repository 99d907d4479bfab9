//! # edgequake-pdfqa
//!
//! Ask questions about scanned PDFs.
//!
//! A PDF is ingested once under a filename: every page is rasterised with
//! pdfium, read by an OCR engine and kept in memory as plain text. A question
//! about that filename then goes through a language model twice: once to pick
//! the pertinent pages, then once per picked page with a prompt chosen by a
//! keyword router (diagram, table or general). The per-page answers are
//! joined into one labelled response.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ingest_pdf(filename, base64)
//!  ├─ 1. Decode   base64 → bytes, check %PDF magic
//!  ├─ 2. Render   rasterise pages via pdfium (spawn_blocking)
//!  ├─ 3. OCR      tesseract per page, bounded concurrency, retries
//!  ├─ 4. Clean    whitespace normalisation
//!  └─ 5. Store    insert-if-absent under filename
//!
//! query_pdf(filename, question)
//!  ├─ 1. Select   LLM picks relevant page numbers
//!  ├─ 2. Route    "diagram" / "table" / general template
//!  ├─ 3. Analyse  one LLM call per page, bounded concurrency
//!  └─ 4. Join     **Page N Analysis** blocks
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdfqa::{AnalyzerConfig, PdfAnalyzer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let analyzer = PdfAnalyzer::from_config(AnalyzerConfig::default())?;
//!     let bytes = std::fs::read("report.pdf")?;
//!     analyzer.ingest("report.pdf", bytes).await?;
//!     let answer = analyzer.query("report.pdf", "explain the table on page 2").await?;
//!     println!("{}", answer.response);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on (via `cli`) | axum HTTP front end for the JSON envelope protocol |
//! | `cli`    | on      | Enables the `pdfqa` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable default features when using only the library:
//! ```toml
//! edgequake-pdfqa = { version = "0.1", default-features = false }
//! ```
//!
//! ## External tools
//!
//! OCR shells out to the `tesseract` binary, which must be on `PATH` with the
//! configured language pack installed. pdfium is loaded from
//! `PDFIUM_LIB_PATH` or the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ingest;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod protocol;
pub mod query;
#[cfg(feature = "server")]
pub mod server;
pub mod service;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalyzerConfig, AnalyzerConfigBuilder};
pub use error::{AnalyzerError, ErrorKind};
pub use output::{IngestOutcome, PageAnalysis, QueryResult};
pub use pipeline::llm::{LlmGenerator, TextGenerator};
pub use pipeline::ocr::{OcrEngine, TesseractOcr};
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use pipeline::route::AnalysisType;
pub use progress::{IngestProgressCallback, NoopProgressCallback, ProgressCallback};
pub use protocol::{dispatch, Operation, Request, Response, Status};
pub use service::PdfAnalyzer;
pub use store::{Document, DocumentStore};
