//! Input handling: turn a protocol payload, local path or URL into PDF bytes.
//!
//! The service never touches the file system for documents: PDFs arrive as
//! base64 inside the request envelope and stay in memory. The CLI additionally
//! accepts a local path or an HTTP/HTTPS URL and reads it into memory here.
//! Every entry point finishes with [`validate_pdf`] so a non-PDF upload is
//! rejected as a decode error before pdfium is ever loaded.

use crate::error::AnalyzerError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// PDF bytes plus the name the document will be stored under.
#[derive(Debug, Clone)]
pub struct LoadedPdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Decode the base64 `file` payload of an `ingest_pdf` request.
///
/// Surrounding whitespace and embedded line breaks (as produced by MIME
/// encoders) are tolerated.
pub fn decode_base64_pdf(encoded: &str) -> Result<Vec<u8>, AnalyzerError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| AnalyzerError::InvalidBase64 {
            detail: e.to_string(),
        })?;
    validate_pdf(&bytes)?;
    debug!("Decoded {} PDF bytes from base64", bytes.len());
    Ok(bytes)
}

/// Verify the `%PDF` magic bytes.
pub fn validate_pdf(bytes: &[u8]) -> Result<(), AnalyzerError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(AnalyzerError::NotAPdf {
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}

/// Read a local file or download a URL into memory.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<LoadedPdf, AnalyzerError> {
    let loaded = if is_url(input) {
        download_url(input, timeout_secs).await?
    } else {
        read_local(Path::new(input)).await?
    };
    validate_pdf(&loaded.bytes)?;
    Ok(loaded)
}

async fn read_local(path: &Path) -> Result<LoadedPdf, AnalyzerError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => AnalyzerError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => AnalyzerError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    Ok(LoadedPdf { filename, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<LoadedPdf, AnalyzerError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AnalyzerError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AnalyzerError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| AnalyzerError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!("Downloaded {} bytes", bytes.len());
    Ok(LoadedPdf {
        filename: filename_from_url(url),
        bytes: bytes.to_vec(),
    })
}

/// The last path segment of the URL, or `downloaded.pdf`.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}
