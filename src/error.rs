//! Error types for the edgequake-pdfqa library.
//!
//! Every failure is an [`AnalyzerError`]. The enum is deliberately detailed
//! (which page failed, which provider, which URL) so log lines are useful,
//! while [`AnalyzerError::kind`] folds the variants into the small, stable
//! taxonomy exposed to protocol clients:
//!
//! | [`ErrorKind`]          | Raised for |
//! |------------------------|------------|
//! | `decode_error`         | malformed base64, not a PDF, corrupt/encrypted PDF |
//! | `ocr_failure`          | rasterisation or text recognition failed |
//! | `model_invocation_error` | LLM call failed, timed out, or no provider |
//! | `not_ingested_error`   | query against an unknown filename |
//! | `invalid_operation_error` | unrecognised operation name |
//! | `invalid_request`      | missing or mistyped envelope field, unreadable input |
//! | `unknown_error`        | everything else |
//!
//! Ingestion and query are fail-fast: the first error aborts the whole
//! operation and nothing partial is stored or returned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-pdfqa library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Decode errors ─────────────────────────────────────────────────────
    /// The `file` payload is not valid base64.
    #[error("Invalid base64 payload: {detail}")]
    InvalidBase64 { detail: String },

    /// The decoded bytes are not a PDF.
    #[error("Payload is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF is corrupt: {detail}")]
    CorruptPdf { detail: String },

    /// PDF requires a password but none was configured.
    #[error("PDF is encrypted and requires a password")]
    PasswordRequired,

    /// A password was configured but it is wrong.
    #[error("Wrong password for encrypted PDF")]
    WrongPassword,

    // ── OCR errors ────────────────────────────────────────────────────────
    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The OCR engine ran but could not extract text.
    #[error("OCR failed for page {page}: {detail}")]
    OcrFailed { page: usize, detail: String },

    /// The OCR engine is not installed or cannot be started.
    #[error("OCR engine unavailable: {hint}")]
    OcrEngineUnavailable { hint: String },

    /// OCR of a single page exceeded the configured timeout.
    #[error("OCR timed out after {secs}s on page {page}")]
    OcrTimeout { page: usize, secs: u64 },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// A single LLM call timed out.
    #[error("LLM call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    /// The whole query exceeded its deadline.
    #[error("Query timed out after {secs}s")]
    QueryTimeout { secs: u64 },

    /// The whole ingestion exceeded its deadline.
    #[error("Ingestion timed out after {secs}s")]
    IngestTimeout { secs: u64 },

    // ── Store / protocol errors ───────────────────────────────────────────
    /// Query against a filename that has no stored document.
    #[error("PDF not ingested: '{filename}'")]
    NotIngested { filename: String },

    /// The operation name is not one of the supported operations.
    #[error("Invalid operation: '{operation}'")]
    InvalidOperation { operation: String },

    /// A required request field is missing or has the wrong type.
    #[error("Invalid request: {detail}")]
    InvalidRequest { detail: String },

    // ── Input errors (CLI) ────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Stable error classes reported in the `kind` field of error envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DecodeError,
    OcrFailure,
    ModelInvocationError,
    NotIngestedError,
    InvalidOperationError,
    InvalidRequest,
    UnknownError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DecodeError => "decode_error",
            ErrorKind::OcrFailure => "ocr_failure",
            ErrorKind::ModelInvocationError => "model_invocation_error",
            ErrorKind::NotIngestedError => "not_ingested_error",
            ErrorKind::InvalidOperationError => "invalid_operation_error",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::UnknownError => "unknown_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AnalyzerError {
    /// The protocol-level class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalyzerError::InvalidBase64 { .. }
            | AnalyzerError::NotAPdf { .. }
            | AnalyzerError::CorruptPdf { .. }
            | AnalyzerError::PasswordRequired
            | AnalyzerError::WrongPassword => ErrorKind::DecodeError,

            AnalyzerError::RasterisationFailed { .. }
            | AnalyzerError::OcrFailed { .. }
            | AnalyzerError::OcrEngineUnavailable { .. }
            | AnalyzerError::OcrTimeout { .. }
            | AnalyzerError::PdfiumBindingFailed(_)
            | AnalyzerError::IngestTimeout { .. } => ErrorKind::OcrFailure,

            AnalyzerError::ProviderNotConfigured { .. }
            | AnalyzerError::LlmApiError { .. }
            | AnalyzerError::ApiTimeout { .. }
            | AnalyzerError::QueryTimeout { .. } => ErrorKind::ModelInvocationError,

            AnalyzerError::NotIngested { .. } => ErrorKind::NotIngestedError,
            AnalyzerError::InvalidOperation { .. } => ErrorKind::InvalidOperationError,

            AnalyzerError::InvalidRequest { .. }
            | AnalyzerError::FileNotFound { .. }
            | AnalyzerError::PermissionDenied { .. }
            | AnalyzerError::DownloadFailed { .. }
            | AnalyzerError::DownloadTimeout { .. } => ErrorKind::InvalidRequest,

            AnalyzerError::InvalidConfig(_) | AnalyzerError::Internal(_) => ErrorKind::UnknownError,
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only failures of the external capabilities (OCR engine, LLM API) are
    /// transient; everything about the input or configuration is permanent.
    /// An OCR timeout is final because the stalled attempt is not cancelled.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalyzerError::OcrFailed { .. }
                | AnalyzerError::LlmApiError { .. }
                | AnalyzerError::ApiTimeout { .. }
        )
    }
}
