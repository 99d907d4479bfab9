//! Per-page analysis: render the routed template and ask the model.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::PageAnalysis;
use crate::pipeline::llm::{complete, TextGenerator};
use crate::pipeline::route::AnalysisType;
use tracing::debug;

/// Analyse one page for `question` using the template of `kind`.
///
/// An empty (after trimming) completion is returned as an empty
/// [`PageAnalysis`], not an error. A failed model call is an error and the
/// caller aborts the whole query.
pub async fn analyze_page(
    generator: &dyn TextGenerator,
    page: usize,
    page_text: &str,
    question: &str,
    kind: AnalysisType,
    config: &AnalyzerConfig,
) -> Result<PageAnalysis, AnalyzerError> {
    let prompt = kind.render(question, page_text);
    let label = format!("page {page}");
    let completion = complete(generator, &label, &prompt, config).await?;
    let text = completion.trim().to_string();
    debug!("Page {}: {} analysis, {} chars", page, kind, text.len());
    Ok(PageAnalysis { page, kind, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Fixed(&'static str);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _prompt: &str) -> Result<String, AnalyzerError> {
            Ok(self.0.to_string())
        }
    }

    struct PromptEcho;

    #[async_trait]
    impl TextGenerator for PromptEcho {
        async fn generate(&self, prompt: &str) -> Result<String, AnalyzerError> {
            Ok(prompt.to_string())
        }
    }

    #[tokio::test]
    async fn completion_is_trimmed() {
        let a = analyze_page(
            &Fixed("\n  The table lists revenue.  \n"),
            2,
            "Table 1",
            "explain the table",
            AnalysisType::Table,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(a.page, 2);
        assert_eq!(a.kind, AnalysisType::Table);
        assert_eq!(a.text, "The table lists revenue.");
    }

    #[tokio::test]
    async fn whitespace_completion_is_empty_not_error() {
        let a = analyze_page(
            &Fixed("   \n\t"),
            5,
            "text",
            "anything?",
            AnalysisType::General,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();
        assert!(a.is_empty());
    }

    #[tokio::test]
    async fn prompt_uses_routed_template_and_page_text() {
        let a = analyze_page(
            &PromptEcho,
            3,
            "Figure 2: pump → valve",
            "explain the diagram",
            AnalysisType::Diagram,
            &AnalyzerConfig::default(),
        )
        .await
        .unwrap();
        assert!(a.text.contains("Figure 2: pump → valve"));
        assert!(a.text.contains("Question: explain the diagram"));
        assert!(a.text.contains("component label"));
    }
}
