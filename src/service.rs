//! The analyzer service: one shared store plus the three injected engines.
//!
//! Build a [`PdfAnalyzer`] once at startup and share it behind an `Arc`;
//! every method takes `&self`.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::ingest::extract_pages;
use crate::output::{IngestOutcome, QueryResult};
use crate::pipeline::input::{decode_base64_pdf, load_input};
use crate::pipeline::llm::{LlmGenerator, TextGenerator};
use crate::pipeline::ocr::{OcrEngine, TesseractOcr};
use crate::pipeline::render::{PageRasterizer, PdfiumRasterizer};
use crate::query::answer;
use crate::store::DocumentStore;
use std::fmt;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::info;

/// Ingests PDFs by filename and answers questions about them.
pub struct PdfAnalyzer {
    store: DocumentStore,
    rasterizer: Arc<dyn PageRasterizer>,
    ocr: Arc<dyn OcrEngine>,
    generator: Arc<dyn TextGenerator>,
    config: AnalyzerConfig,
}

impl fmt::Debug for PdfAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfAnalyzer")
            .field("documents", &self.store.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PdfAnalyzer {
    /// Assemble an analyzer from explicit engines.
    pub fn new(
        config: AnalyzerConfig,
        rasterizer: Arc<dyn PageRasterizer>,
        ocr: Arc<dyn OcrEngine>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            store: DocumentStore::new(),
            rasterizer,
            ocr,
            generator,
            config,
        }
    }

    /// Assemble an analyzer with pdfium, the tesseract CLI and the LLM
    /// provider resolved from `config` / the environment.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let generator = LlmGenerator::from_config(&config)?;
        let rasterizer = PdfiumRasterizer::new(&config);
        let ocr = TesseractOcr::from_config(&config);
        Ok(Self::new(
            config,
            Arc::new(rasterizer),
            Arc::new(ocr),
            Arc::new(generator),
        ))
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Ingest raw PDF bytes under `filename`.
    ///
    /// If `filename` is already stored the bytes are ignored, even when they
    /// differ. Otherwise the PDF is rasterised and OCR'd; on any failure
    /// nothing is stored.
    pub async fn ingest(
        &self,
        filename: &str,
        pdf: Vec<u8>,
    ) -> Result<IngestOutcome, AnalyzerError> {
        if let Some(doc) = self.store.get(filename) {
            info!("'{}' already ingested ({} pages)", filename, doc.page_count());
            return Ok(IngestOutcome::AlreadyIngested {
                page_count: doc.page_count(),
            });
        }

        let limit = self.config.ingest_timeout();
        let run = self.store.get_or_ingest(filename, || {
            extract_pages(
                filename,
                pdf,
                Arc::clone(&self.rasterizer),
                Arc::clone(&self.ocr),
                &self.config,
            )
        });
        let (doc, ran) = timeout(limit, run)
            .await
            .map_err(|_| AnalyzerError::IngestTimeout {
                secs: limit.as_secs(),
            })??;

        let page_count = doc.page_count();
        Ok(if ran {
            IngestOutcome::Ingested { page_count }
        } else {
            IngestOutcome::AlreadyIngested { page_count }
        })
    }

    /// Ingest a base64-encoded PDF under `filename`.
    ///
    /// An already stored filename short-circuits before the payload is
    /// decoded.
    pub async fn ingest_base64(
        &self,
        filename: &str,
        encoded: &str,
    ) -> Result<IngestOutcome, AnalyzerError> {
        if let Some(doc) = self.store.get(filename) {
            return Ok(IngestOutcome::AlreadyIngested {
                page_count: doc.page_count(),
            });
        }
        let bytes = decode_base64_pdf(encoded)?;
        self.ingest(filename, bytes).await
    }

    /// Read a local path or download a URL, then ingest it under its file
    /// name. Returns the name used as the store key.
    pub async fn ingest_input(
        &self,
        input: &str,
    ) -> Result<(String, IngestOutcome), AnalyzerError> {
        let loaded = load_input(input, self.config.download_timeout_secs).await?;
        let outcome = self.ingest(&loaded.filename, loaded.bytes).await?;
        Ok((loaded.filename, outcome))
    }

    /// Answer `question` about the document stored under `filename`.
    pub async fn query(
        &self,
        filename: &str,
        question: &str,
    ) -> Result<QueryResult, AnalyzerError> {
        let document = self.store.document(filename)?;
        let limit = self.config.query_timeout();
        timeout(
            limit,
            answer(self.generator.as_ref(), &document, question, &self.config),
        )
        .await
        .map_err(|_| AnalyzerError::QueryTimeout {
            secs: limit.as_secs(),
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::DynamicImage;

    struct OnePage;

    impl PageRasterizer for OnePage {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, AnalyzerError> {
            Ok(vec![DynamicImage::new_rgb8(2, 2)])
        }
    }

    struct StaticOcr;

    impl OcrEngine for StaticOcr {
        fn recognize(&self, _page: usize, _image: &DynamicImage) -> Result<String, AnalyzerError> {
            Ok("hello".into())
        }
    }

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _prompt: &str) -> Result<String, AnalyzerError> {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            Ok("1".into())
        }
    }

    fn analyzer(config: AnalyzerConfig) -> PdfAnalyzer {
        PdfAnalyzer::new(
            config,
            Arc::new(OnePage),
            Arc::new(StaticOcr),
            Arc::new(Slow),
        )
    }

    #[tokio::test]
    async fn query_on_unknown_file_is_not_ingested() {
        let a = analyzer(AnalyzerConfig::default());
        let err = a.query("missing.pdf", "q").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::NotIngested { .. }));
    }

    #[tokio::test]
    async fn bad_base64_is_a_decode_error_and_stores_nothing() {
        let a = analyzer(AnalyzerConfig::default());
        let err = a.ingest_base64("x.pdf", "@@not base64@@").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidBase64 { .. }));
        assert!(!a.store().exists("x.pdf"));
    }

    #[tokio::test]
    async fn stored_filename_skips_decoding() {
        let a = analyzer(AnalyzerConfig::default());
        a.ingest("x.pdf", b"%PDF-1.4".to_vec()).await.unwrap();
        let outcome = a.ingest_base64("x.pdf", "@@not base64@@").await.unwrap();
        assert_eq!(outcome, IngestOutcome::AlreadyIngested { page_count: 1 });
    }

    #[tokio::test(start_paused = true)]
    async fn query_timeout_is_reported() {
        let config = AnalyzerConfig::builder()
            .query_timeout_secs(1)
            .api_timeout_secs(60)
            .max_retries(0)
            .build()
            .unwrap();
        let a = analyzer(config);
        a.store().put("slow.pdf", vec!["hello".into()]);
        let err = a.query("slow.pdf", "q").await.unwrap_err();
        assert!(matches!(err, AnalyzerError::QueryTimeout { secs: 1 }));
    }
}
