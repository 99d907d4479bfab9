//! Ingestion pipeline: PDF bytes → cleaned per-page text.
//!
//! Validation, rasterisation and OCR run here; storing the result is the
//! caller's job (see [`crate::service::PdfAnalyzer::ingest`]). Any page that
//! still fails after retries fails the whole run, so the caller never sees a
//! partial page list.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::input::validate_pdf;
use crate::pipeline::ocr::{recognize_page, OcrEngine};
use crate::pipeline::postprocess::clean_ocr_text;
use crate::pipeline::render::{self, PageRasterizer};
use crate::progress::{IngestProgressCallback, NoopProgressCallback};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Recognise every page of `pdf`, returning one cleaned text per page.
pub async fn extract_pages(
    filename: &str,
    pdf: Vec<u8>,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    config: &AnalyzerConfig,
) -> Result<Vec<String>, AnalyzerError> {
    let start = Instant::now();
    validate_pdf(&pdf)?;

    let images = render::rasterize(rasterizer, pdf).await?;
    let total = images.len();
    if total == 0 {
        return Err(AnalyzerError::CorruptPdf {
            detail: "document has no pages".to_string(),
        });
    }
    info!("Ingesting '{}': {} pages", filename, total);

    let noop = NoopProgressCallback;
    let progress: &dyn IngestProgressCallback = match config.progress_callback {
        Some(ref cb) => cb.as_ref(),
        None => &noop,
    };
    progress.on_ingest_start(filename, total);

    let concurrency = config.ocr_concurrency.max(1);
    let ocr = &ocr;
    let pages: Vec<String> = stream::iter(images.into_iter().enumerate())
        .map(|(idx, image)| {
            let page_num = idx + 1;
            let image = Arc::new(image);
            async move {
                progress.on_page_start(page_num, total);
                match recognize_page(ocr, page_num, image, config).await {
                    Ok(raw) => {
                        let text = clean_ocr_text(&raw);
                        progress.on_page_recognized(page_num, total, text.len());
                        Ok(text)
                    }
                    Err(e) => {
                        warn!("Page {} failed: {}", page_num, e);
                        progress.on_page_error(page_num, total, &e.to_string());
                        Err(e)
                    }
                }
            }
        })
        .buffered(concurrency)
        .try_collect()
        .await?;

    progress.on_ingest_complete(filename, total);
    info!(
        "Ingested '{}': {} pages in {:.1}s",
        filename,
        total,
        start.elapsed().as_secs_f64()
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::DynamicImage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Pages(usize);

    impl PageRasterizer for Pages {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, AnalyzerError> {
            // Width encodes the page number so the OCR fake can tell pages apart.
            Ok((1..=self.0)
                .map(|n| DynamicImage::new_rgb8(n as u32, 1))
                .collect())
        }
    }

    struct WidthOcr {
        fail_page: Option<usize>,
    }

    impl OcrEngine for WidthOcr {
        fn recognize(&self, page_num: usize, image: &DynamicImage) -> Result<String, AnalyzerError> {
            if Some(page_num) == self.fail_page {
                return Err(AnalyzerError::OcrFailed {
                    page: page_num,
                    detail: "unreadable".into(),
                });
            }
            Ok(format!("text of page {}\r\n\n\n\n", image.width()))
        }
    }

    fn config() -> AnalyzerConfig {
        AnalyzerConfig::builder()
            .max_retries(0)
            .ocr_concurrency(3)
            .build()
            .unwrap()
    }

    const PDF: &[u8] = b"%PDF-1.7 fake";

    #[tokio::test]
    async fn pages_come_back_cleaned_and_in_order() {
        let pages = extract_pages(
            "doc.pdf",
            PDF.to_vec(),
            Arc::new(Pages(5)),
            Arc::new(WidthOcr { fail_page: None }),
            &config(),
        )
        .await
        .unwrap();
        assert_eq!(pages.len(), 5);
        for (idx, text) in pages.iter().enumerate() {
            assert_eq!(text, &format!("text of page {}", idx + 1));
        }
    }

    #[tokio::test]
    async fn non_pdf_is_rejected_before_rendering() {
        let err = extract_pages(
            "x.pdf",
            b"hello".to_vec(),
            Arc::new(Pages(1)),
            Arc::new(WidthOcr { fail_page: None }),
            &config(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::NotAPdf { .. }));
    }

    #[tokio::test]
    async fn zero_pages_is_a_decode_error() {
        let err = extract_pages(
            "empty.pdf",
            PDF.to_vec(),
            Arc::new(Pages(0)),
            Arc::new(WidthOcr { fail_page: None }),
            &config(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::CorruptPdf { .. }));
    }

    #[tokio::test]
    async fn one_failing_page_fails_the_run() {
        let err = extract_pages(
            "bad.pdf",
            PDF.to_vec(),
            Arc::new(Pages(4)),
            Arc::new(WidthOcr { fail_page: Some(3) }),
            &config(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AnalyzerError::OcrFailed { page: 3, .. }));
    }

    #[derive(Default)]
    struct Recorder {
        started: Mutex<Option<(String, usize)>>,
        recognised: AtomicUsize,
        completed: AtomicUsize,
    }

    impl IngestProgressCallback for Recorder {
        fn on_ingest_start(&self, filename: &str, total_pages: usize) {
            *self.started.lock().unwrap() = Some((filename.to_string(), total_pages));
        }
        fn on_page_recognized(&self, _page_num: usize, _total: usize, _len: usize) {
            self.recognised.fetch_add(1, Ordering::SeqCst);
        }
        fn on_ingest_complete(&self, _filename: &str, _total: usize) {
            self.completed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn progress_callback_sees_every_page() {
        let recorder = Arc::new(Recorder::default());
        let config = AnalyzerConfig::builder()
            .max_retries(0)
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        extract_pages(
            "cb.pdf",
            PDF.to_vec(),
            Arc::new(Pages(3)),
            Arc::new(WidthOcr { fail_page: None }),
            &config,
        )
        .await
        .unwrap();

        assert_eq!(
            *recorder.started.lock().unwrap(),
            Some(("cb.pdf".to_string(), 3))
        );
        assert_eq!(recorder.recognised.load(Ordering::SeqCst), 3);
        assert_eq!(recorder.completed.load(Ordering::SeqCst), 1);
    }
}
