//! Query pipeline: stored page texts + question → aggregated answer.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::QueryResult;
use crate::pipeline::aggregate::aggregate;
use crate::pipeline::analyze::analyze_page;
use crate::pipeline::llm::TextGenerator;
use crate::pipeline::relevance::{select_pages, validate_pages};
use crate::pipeline::route::AnalysisType;
use crate::store::Document;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::time::Instant;
use tracing::info;

/// Answer `question` against `document`.
///
/// One relevance call picks the pages; the question is routed once; every
/// selected page is analysed (up to `config.concurrency` at a time) and the
/// non-empty analyses are joined in selection order. The first failed model
/// call fails the whole query.
pub async fn answer(
    generator: &dyn TextGenerator,
    document: &Document,
    question: &str,
    config: &AnalyzerConfig,
) -> Result<QueryResult, AnalyzerError> {
    let start = Instant::now();
    let selected = select_pages(generator, &document.pages, question, config).await?;
    let pages = validate_pages(&selected, document.page_count());
    if pages.is_empty() {
        info!("Query on '{}': no relevant pages", document.filename);
        return Ok(QueryResult::no_relevant_pages());
    }

    let kind = AnalysisType::classify(question);
    info!(
        "Query on '{}': {} analysis of pages {:?}",
        document.filename, kind, pages
    );

    let analyses: Vec<_> = stream::iter(pages.iter().copied())
        .map(|page| {
            // validate_pages guarantees the index is in range.
            let text = document.page(page).unwrap_or_default();
            analyze_page(generator, page, text, question, kind, config)
        })
        .buffered(config.concurrency.max(1))
        .try_collect()
        .await?;

    let response = aggregate(&analyses);
    info!(
        "Query on '{}' answered in {:.1}s ({} chars)",
        document.filename,
        start.elapsed().as_secs_f64(),
        response.len()
    );
    Ok(QueryResult {
        response,
        pages,
        analyses,
    })
}
