//! PDF rasterisation: render every page to a `DynamicImage` for OCR.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which is CPU-bound
//! and not async-aware. [`rasterize`] moves the whole render onto tokio's
//! blocking pool so request-handling workers never stall on a large scan.
//!
//! Rasterisation sits behind the [`PageRasterizer`] trait so the ingestion
//! pipeline can be exercised without a native pdfium library.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Turns PDF bytes into one image per page, in page order.
///
/// Implementations are blocking; callers run them on a blocking thread.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, AnalyzerError>;
}

/// Rasteriser backed by pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRasterizer {
    dpi: u32,
    max_pixels: u32,
    password: Option<String>,
    library: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            dpi: config.dpi,
            max_pixels: config.max_rendered_pixels,
            password: config.password.clone(),
            library: config
                .pdfium_library
                .clone()
                .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from)),
        }
    }

    fn bind(&self) -> Result<Pdfium, AnalyzerError> {
        let bindings = match &self.library {
            Some(path) => Pdfium::bind_to_library(path.to_string_lossy().to_string()),
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| AnalyzerError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }

    fn load_error(&self, e: PdfiumError) -> AnalyzerError {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if self.password.is_some() {
                AnalyzerError::WrongPassword
            } else {
                AnalyzerError::PasswordRequired
            }
        } else {
            AnalyzerError::CorruptPdf { detail: err_str }
        }
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>, AnalyzerError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, self.password.as_deref())
            .map_err(|e| self.load_error(e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        // PDF user space is 72 units per inch.
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(self.dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let mut images = Vec::with_capacity(total_pages);
        for (idx, page) in pages.iter().enumerate() {
            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                AnalyzerError::RasterisationFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                }
            })?;
            let image = bitmap.as_image();
            debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            );
            images.push(image);
        }

        Ok(images)
    }
}

/// Rasterise `pdf` on the blocking pool.
pub async fn rasterize(
    rasterizer: Arc<dyn PageRasterizer>,
    pdf: Vec<u8>,
) -> Result<Vec<DynamicImage>, AnalyzerError> {
    tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf))
        .await
        .map_err(|e| AnalyzerError::Internal(format!("Render task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BlankPages(usize);

    impl PageRasterizer for BlankPages {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, AnalyzerError> {
            Ok((0..self.0).map(|_| DynamicImage::new_rgb8(4, 4)).collect())
        }
    }

    #[tokio::test]
    async fn rasterize_runs_on_blocking_pool_and_keeps_page_count() {
        let images = rasterize(Arc::new(BlankPages(3)), b"%PDF".to_vec())
            .await
            .unwrap();
        assert_eq!(images.len(), 3);
    }

    #[test]
    fn password_errors_are_classified() {
        let config = AnalyzerConfig::default();
        let r = PdfiumRasterizer::new(&config);
        let err = r.load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(err, AnalyzerError::PasswordRequired));

        let with_pwd = PdfiumRasterizer::new(
            &AnalyzerConfig::builder().password("secret").build().unwrap(),
        );
        let err = with_pwd.load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ));
        assert!(matches!(err, AnalyzerError::WrongPassword));
    }

    #[test]
    fn other_load_errors_are_corrupt_pdf() {
        let r = PdfiumRasterizer::new(&AnalyzerConfig::default());
        let err = r.load_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::FormatError,
        ));
        assert!(matches!(err, AnalyzerError::CorruptPdf { .. }));
        assert_eq!(err.kind(), crate::error::ErrorKind::DecodeError);
    }
}
