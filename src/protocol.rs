//! Request/response envelope and operation dispatch.
//!
//! ```text
//! request:  { "operation": "ingest_pdf" | "query_pdf", "payload": {..}, "context": {..} }
//! response: { "status": "success" | "error", "result": {..}, "context": {..} }
//! ```
//!
//! `context` is echoed back unchanged on every response, including errors.
//! Failures never escape [`dispatch`]; they become an error envelope whose
//! result is `{ "error": <message>, "kind": <error class> }`.

use crate::error::AnalyzerError;
use crate::output::NO_RELEVANT_PAGES_MESSAGE;
use crate::service::PdfAnalyzer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// The operations a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    IngestPdf,
    QueryPdf,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::IngestPdf => "ingest_pdf",
            Operation::QueryPdf => "query_pdf",
        }
    }
}

impl FromStr for Operation {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ingest_pdf" => Ok(Operation::IngestPdf),
            "query_pdf" => Ok(Operation::QueryPdf),
            other => Err(AnalyzerError::InvalidOperation {
                operation: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incoming envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub operation: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub context: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Outgoing envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub result: Map<String, Value>,
    pub context: Map<String, Value>,
}

impl Response {
    pub fn success(result: Value, context: Map<String, Value>) -> Self {
        Self {
            status: Status::Success,
            result: into_map(result),
            context,
        }
    }

    pub fn error(err: &AnalyzerError, context: Map<String, Value>) -> Self {
        Self {
            status: Status::Error,
            result: into_map(json!({
                "error": err.to_string(),
                "kind": err.kind(),
            })),
            context,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Parse a raw request body and dispatch it.
///
/// Bytes that are not JSON get an `invalid_request` envelope with an empty
/// context.
pub async fn dispatch_bytes(analyzer: &PdfAnalyzer, body: &[u8]) -> Response {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => dispatch_value(analyzer, value).await,
        Err(e) => {
            let err = AnalyzerError::InvalidRequest {
                detail: format!("body is not valid JSON: {e}"),
            };
            warn!("Rejected request: {}", err);
            Response::error(&err, Map::new())
        }
    }
}

/// Decode a JSON body and dispatch it.
///
/// A body that is not a valid envelope gets an `invalid_request` error; if
/// it still carries an object `context`, that context is echoed.
pub async fn dispatch_value(analyzer: &PdfAnalyzer, body: Value) -> Response {
    let context = body
        .get("context")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    match serde_json::from_value::<Request>(body) {
        Ok(request) => dispatch(analyzer, request).await,
        Err(e) => {
            let err = AnalyzerError::InvalidRequest {
                detail: e.to_string(),
            };
            warn!("Rejected request: {}", err);
            Response::error(&err, context)
        }
    }
}

/// Run one request against the analyzer.
pub async fn dispatch(analyzer: &PdfAnalyzer, request: Request) -> Response {
    let Request {
        operation,
        payload,
        context,
    } = request;
    match run(analyzer, &operation, &payload, &context).await {
        Ok(result) => Response::success(result, context),
        Err(err) => {
            warn!("{} failed: {} ({})", operation, err, err.kind());
            Response::error(&err, context)
        }
    }
}

async fn run(
    analyzer: &PdfAnalyzer,
    operation: &str,
    payload: &Map<String, Value>,
    context: &Map<String, Value>,
) -> Result<Value, AnalyzerError> {
    let op: Operation = operation.parse()?;
    let filename = string_field(context, "context", "filename")?;
    debug!("Dispatching {} for '{}'", op, filename);

    match op {
        Operation::IngestPdf => {
            let file = string_field(payload, "payload", "file")?;
            let outcome = analyzer.ingest_base64(filename, file).await?;
            Ok(json!({
                "message": outcome.message(),
                "pages": outcome.page_count(),
            }))
        }
        Operation::QueryPdf => {
            let question = string_field(payload, "payload", "question")?;
            let result = analyzer.query(filename, question).await?;
            if result.has_relevant_pages() {
                Ok(json!({
                    "response": result.response,
                    "pages": result.pages,
                }))
            } else {
                Ok(json!({ "response": NO_RELEVANT_PAGES_MESSAGE }))
            }
        }
    }
}

fn string_field<'a>(
    map: &'a Map<String, Value>,
    section: &str,
    key: &str,
) -> Result<&'a str, AnalyzerError> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(AnalyzerError::InvalidRequest {
            detail: format!("{section}.{key} must be a string"),
        }),
        None => Err(AnalyzerError::InvalidRequest {
            detail: format!("missing {section}.{key}"),
        }),
    }
}
