//! Pipeline stages for ingestion and question answering.
//!
//! Each submodule implements one step and can be tested on its own with
//! fake engines.
//!
//! ## Data Flow
//!
//! ```text
//! ingest:  input ──▶ render ──▶ ocr ──▶ postprocess ──▶ store
//!          (bytes)   (pdfium)  (tesseract) (cleanup)
//!
//! query:   store ──▶ relevance ──▶ route ──▶ analyze ──▶ aggregate
//!                    (LLM)        (keywords) (LLM/page)  (labelled text)
//! ```
//!
//! 1. [`input`]: decode base64 payloads, read files or download URLs
//! 2. [`render`]: rasterise every page; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`ocr`]: recognise page images with timeout and retry
//! 4. [`postprocess`]: deterministic whitespace cleanup of OCR output
//! 5. [`relevance`]: ask the model which pages matter and validate its answer
//! 6. [`route`]: pick the diagram / table / general template
//! 7. [`analyze`]: one model call per selected page
//! 8. [`aggregate`]: join non-empty analyses into the final response
//!
//! [`llm`] and [`retry`] are shared by the model-facing and OCR stages.

pub mod aggregate;
pub mod analyze;
pub mod input;
pub mod llm;
pub mod ocr;
pub mod postprocess;
pub mod relevance;
pub mod render;
pub mod retry;
pub mod route;
