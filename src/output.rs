//! Result types returned by ingestion and queries.

use crate::pipeline::route::AnalysisType;
use serde::{Deserialize, Serialize};

/// Message returned when a new document was stored.
pub const INGESTED_MESSAGE: &str = "PDF ingested successfully";

/// Message returned when the filename was already stored.
pub const ALREADY_INGESTED_MESSAGE: &str = "PDF already ingested in memory";

/// Response text used by the protocol layer when no page was selected.
pub const NO_RELEVANT_PAGES_MESSAGE: &str = "No relevant pages found";

/// Outcome of an ingest call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// OCR ran and the document was stored by this call.
    Ingested { page_count: usize },
    /// The filename was already stored; nothing was recomputed.
    AlreadyIngested { page_count: usize },
}

impl IngestOutcome {
    pub fn page_count(&self) -> usize {
        match self {
            IngestOutcome::Ingested { page_count }
            | IngestOutcome::AlreadyIngested { page_count } => *page_count,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            IngestOutcome::Ingested { .. } => INGESTED_MESSAGE,
            IngestOutcome::AlreadyIngested { .. } => ALREADY_INGESTED_MESSAGE,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, IngestOutcome::Ingested { .. })
    }
}

/// The model's analysis of one page for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageAnalysis {
    /// 1-indexed page number.
    pub page: usize,
    pub kind: AnalysisType,
    /// Trimmed completion; empty means the model had nothing to say.
    pub text: String,
}

impl PageAnalysis {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Answer to one question.
///
/// Two "nothing" cases are kept apart:
/// * `pages` empty: no page was relevant, nothing was analysed;
/// * `pages` non-empty but `response` empty: pages were analysed and the
///   model found nothing to say on any of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Labelled per-page blocks joined together.
    pub response: String,
    /// Validated page numbers in the order the relevance step returned them.
    pub pages: Vec<usize>,
    /// Per-page analyses in the same order as `pages`.
    pub analyses: Vec<PageAnalysis>,
}

impl QueryResult {
    pub fn no_relevant_pages() -> Self {
        Self::default()
    }

    pub fn has_relevant_pages(&self) -> bool {
        !self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_messages() {
        assert_eq!(
            IngestOutcome::Ingested { page_count: 3 }.message(),
            "PDF ingested successfully"
        );
        assert_eq!(
            IngestOutcome::AlreadyIngested { page_count: 3 }.message(),
            "PDF already ingested in memory"
        );
        assert_eq!(IngestOutcome::AlreadyIngested { page_count: 7 }.page_count(), 7);
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let json = serde_json::to_value(IngestOutcome::Ingested { page_count: 2 }).unwrap();
        assert_eq!(json["status"], "ingested");
        assert_eq!(json["page_count"], 2);
    }

    #[test]
    fn empty_answer_is_distinct_from_no_pages() {
        let none = QueryResult::no_relevant_pages();
        assert!(!none.has_relevant_pages());

        let nothing_found = QueryResult {
            response: String::new(),
            pages: vec![2],
            analyses: vec![PageAnalysis {
                page: 2,
                kind: AnalysisType::General,
                text: String::new(),
            }],
        };
        assert!(nothing_found.has_relevant_pages());
        assert!(nothing_found.response.is_empty());
    }
}
