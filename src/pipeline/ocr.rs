//! Optical character recognition: page image → page text.
//!
//! The default engine shells out to the `tesseract` binary, the most widely
//! packaged OCR engine. Each page is written to a scratch PNG in a
//! [`TempDir`] that is removed as soon as recognition returns. The child
//! process is killed once the per-page deadline passes.
//!
//! OCR is blocking and slow (seconds per page), so [`recognize_page`] runs
//! the engine on tokio's blocking pool, bounds it with a per-page timeout and
//! retries transient failures with exponential backoff. A timed-out page is
//! not retried: the abandoned attempt may still be running.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::retry::with_retry;
use image::DynamicImage;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Extracts text from one rendered page.
///
/// Implementations are blocking; `page_num` is 1-indexed and only used for
/// error reporting.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, AnalyzerError>;
}

/// Tesseract OCR via the command-line binary.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    language: String,
    binary: String,
    timeout: Duration,
}

/// Poll interval while waiting for the tesseract child.
const WAIT_POLL: Duration = Duration::from_millis(25);

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            binary: "tesseract".to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.ocr_language.clone()).with_timeout(config.ocr_timeout())
    }

    /// Kill tesseract if one page takes longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Use a specific tesseract executable instead of the one on `PATH`.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn run_tesseract(&self, page_num: usize, image_path: &Path) -> Result<String, AnalyzerError> {
        let failed = |detail: String| AnalyzerError::OcrFailed {
            page: page_num,
            detail,
        };
        let scratch = image_path.parent().unwrap_or_else(|| Path::new("."));
        let out_base = scratch.join(format!("page-{page_num:04}"));
        let stderr_path = scratch.join(format!("page-{page_num:04}.err"));
        let stderr = File::create(&stderr_path).map_err(|e| failed(format!("stderr file: {e}")))?;

        // Output goes to files so a chatty child can never block on a full pipe.
        let spawned = Command::new(&self.binary)
            .arg(image_path)
            .arg(&out_base)
            .args(["-l", &self.language])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr))
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalyzerError::OcrEngineUnavailable {
                    hint: format!(
                        "'{}' not found (install tesseract-ocr, e.g. apt install tesseract-ocr)",
                        self.binary
                    ),
                });
            }
            Err(e) => return Err(failed(e.to_string())),
        };

        let status = self.wait_with_deadline(page_num, &mut child)?;
        if !status.success() {
            let stderr = std::fs::read_to_string(&stderr_path).unwrap_or_default();
            return Err(failed(format!(
                "tesseract exited with {}: {}",
                status,
                stderr.trim()
            )));
        }

        let text_path = out_base.with_extension("txt");
        let bytes = std::fs::read(&text_path)
            .map_err(|e| failed(format!("could not read {}: {e}", text_path.display())))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn wait_with_deadline(
        &self,
        page_num: usize,
        child: &mut Child,
    ) -> Result<ExitStatus, AnalyzerError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    warn!("Page {}: tesseract killed after {:?}", page_num, self.timeout);
                    return Err(AnalyzerError::OcrTimeout {
                        page: page_num,
                        secs: self.timeout.as_secs(),
                    });
                }
                Ok(None) => std::thread::sleep(WAIT_POLL),
                Err(e) => {
                    let _ = child.kill();
                    return Err(AnalyzerError::OcrFailed {
                        page: page_num,
                        detail: format!("waiting for tesseract: {e}"),
                    });
                }
            }
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, AnalyzerError> {
        let start = Instant::now();
        let scratch = TempDir::new().map_err(|e| AnalyzerError::OcrFailed {
            page: page_num,
            detail: format!("scratch dir: {e}"),
        })?;
        let image_path = scratch.path().join(format!("page-{page_num:04}.png"));
        image
            .save_with_format(&image_path, image::ImageFormat::Png)
            .map_err(|e| AnalyzerError::OcrFailed {
                page: page_num,
                detail: format!("could not write page image: {e}"),
            })?;

        let text = self.run_tesseract(page_num, &image_path)?;
        debug!(
            "Page {}: tesseract returned {} chars in {:?}",
            page_num,
            text.len(),
            start.elapsed()
        );
        Ok(text)
    }
}

/// Recognise one page on the blocking pool with timeout and retries.
///
/// On timeout the blocking task is abandoned, not cancelled, so
/// [`AnalyzerError::OcrTimeout`] ends the retry loop.
pub async fn recognize_page(
    engine: &Arc<dyn OcrEngine>,
    page_num: usize,
    image: Arc<DynamicImage>,
    config: &AnalyzerConfig,
) -> Result<String, AnalyzerError> {
    let limit = config.ocr_timeout();
    let label = format!("OCR page {page_num}");
    with_retry(&label, &config.retry_policy(), || {
        let engine = Arc::clone(engine);
        let image = Arc::clone(&image);
        async move {
            let task = tokio::task::spawn_blocking(move || engine.recognize(page_num, &image));
            match timeout(limit, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join)) => Err(AnalyzerError::Internal(format!(
                    "OCR task for page {page_num} panicked: {join}"
                ))),
                Err(_) => Err(AnalyzerError::OcrTimeout {
                    page: page_num,
                    secs: limit.as_secs(),
                }),
            }
        }
    })
    .await
}
