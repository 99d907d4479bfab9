//! HTTP front end (feature `server`).
//!
//! | Route         | Method | Body |
//! |---------------|--------|------|
//! | `/mcp`, `/mcp/` | POST | request envelope → response envelope |
//! | `/health`     | GET    | `{"status":"ok","documents":N}` |
//!
//! Every request to `/mcp` is answered with an envelope; success or failure
//! travels in its `status`. Parse and validation failures use HTTP 200. A
//! body that cannot be read (too large, broken stream) keeps its 4xx code
//! but still carries an `invalid_request` envelope.

use crate::error::AnalyzerError;
use crate::protocol::{dispatch_bytes, Response};
use crate::service::PdfAnalyzer;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Map;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Default request body limit in MiB; base64 inflates PDFs by a third.
pub const DEFAULT_MAX_BODY_MB: usize = 64;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    documents: usize,
}

async fn health(State(analyzer): State<Arc<PdfAnalyzer>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        documents: analyzer.store().len(),
    })
}

async fn mcp(
    State(analyzer): State<Arc<PdfAnalyzer>>,
    body: Result<Bytes, BytesRejection>,
) -> (StatusCode, Json<Response>) {
    match body {
        Ok(bytes) => (StatusCode::OK, Json(dispatch_bytes(&analyzer, &bytes).await)),
        Err(rejection) => {
            let err = AnalyzerError::InvalidRequest {
                detail: rejection.body_text(),
            };
            warn!("Unreadable request body: {}", err);
            (rejection.status(), Json(Response::error(&err, Map::new())))
        }
    }
}

/// Build the router around a shared analyzer.
pub fn create_router(analyzer: Arc<PdfAnalyzer>, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/mcp", post(mcp))
        .route("/mcp/", post(mcp))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(analyzer)
}

/// Bind `addr` and serve until Ctrl+C / SIGTERM.
pub async fn serve(
    analyzer: Arc<PdfAnalyzer>,
    addr: SocketAddr,
    max_body_bytes: usize,
) -> std::io::Result<()> {
    let app = create_router(analyzer, max_body_bytes);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("pdfqa listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;
    use crate::error::AnalyzerError;
    use crate::pipeline::llm::TextGenerator;
    use crate::pipeline::ocr::OcrEngine;
    use crate::pipeline::render::PageRasterizer;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use image::DynamicImage;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct NoPages;

    impl PageRasterizer for NoPages {
        fn rasterize(&self, _pdf: &[u8]) -> Result<Vec<DynamicImage>, AnalyzerError> {
            Ok(Vec::new())
        }
    }

    struct NoOcr;

    impl OcrEngine for NoOcr {
        fn recognize(&self, _page: usize, _image: &DynamicImage) -> Result<String, AnalyzerError> {
            Ok(String::new())
        }
    }

    struct Silent;

    #[async_trait]
    impl TextGenerator for Silent {
        async fn generate(&self, _prompt: &str) -> Result<String, AnalyzerError> {
            Ok(String::new())
        }
    }

    fn router() -> Router {
        router_with_limit(DEFAULT_MAX_BODY_MB * 1024 * 1024)
    }

    fn router_with_limit(max_body_bytes: usize) -> Router {
        let analyzer = PdfAnalyzer::new(
            AnalyzerConfig::default(),
            Arc::new(NoPages),
            Arc::new(NoOcr),
            Arc::new(Silent),
        );
        create_router(Arc::new(analyzer), max_body_bytes)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_document_count() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok", "documents": 0}));
    }

    #[tokio::test]
    async fn unknown_operation_is_enveloped_with_context() {
        for path in ["/mcp", "/mcp/"] {
            let body = json!({
                "operation": "summarise_pdf",
                "payload": {},
                "context": {"filename": "a.pdf", "request_id": 7}
            });
            let response = router()
                .oneshot(
                    Request::post(path)
                        .header("content-type", "application/json")
                        .body(Body::from(body.to_string()))
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let value = body_json(response).await;
            assert_eq!(value["status"], "error");
            assert_eq!(value["result"]["kind"], "invalid_operation_error");
            assert_eq!(value["context"]["request_id"], 7);
        }
    }

    #[tokio::test]
    async fn envelope_without_operation_is_invalid_request() {
        let response = router()
            .oneshot(
                Request::post("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"context": {"filename": "a.pdf"}}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let value = body_json(response).await;
        assert_eq!(value["result"]["kind"], "invalid_request");
        assert_eq!(value["context"]["filename"], "a.pdf");
    }

    #[tokio::test]
    async fn malformed_json_is_enveloped() {
        let response = router()
            .oneshot(
                Request::post("/mcp/")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"operation": "query_pdf", "#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["status"], "error");
        assert_eq!(value["result"]["kind"], "invalid_request");
        assert_eq!(value["context"], json!({}));
    }

    #[tokio::test]
    async fn missing_content_type_is_still_dispatched() {
        let body = json!({
            "operation": "query_pdf",
            "payload": {"question": "q"},
            "context": {"filename": "ghost.pdf"}
        });
        let response = router()
            .oneshot(Request::post("/mcp").body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let value = body_json(response).await;
        assert_eq!(value["result"]["kind"], "not_ingested_error");
        assert_eq!(value["context"]["filename"], "ghost.pdf");
    }

    #[tokio::test]
    async fn oversized_body_is_enveloped() {
        let body = json!({"operation": "ingest_pdf", "payload": {"file": "A".repeat(4096)}});
        let response = router_with_limit(1024)
            .oneshot(
                Request::post("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let value = body_json(response).await;
        assert_eq!(value["status"], "error");
        assert_eq!(value["result"]["kind"], "invalid_request");
    }
}
