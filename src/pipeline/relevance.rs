//! Page selection: ask the model which pages are pertinent to a question.
//!
//! The model's answer is untrusted free text. [`parse_page_numbers`] keeps
//! only comma-separated tokens that are plain non-negative integers, and
//! [`validate_pages`] then drops numbers outside `[1, page_count]` before
//! anything indexes into the stored page texts. Order and duplicates are
//! preserved: the analysis step follows the model's ranking as returned.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::llm::{complete, TextGenerator};
use crate::prompts::relevance_prompt;
use tracing::{debug, warn};

/// Ask the model for the pages relevant to `question`.
///
/// Returns the raw parsed list; run it through [`validate_pages`] before use.
pub async fn select_pages(
    generator: &dyn TextGenerator,
    pages: &[String],
    question: &str,
    config: &AnalyzerConfig,
) -> Result<Vec<usize>, AnalyzerError> {
    let prompt = relevance_prompt(question, pages);
    let raw = complete(generator, "relevance", &prompt, config).await?;
    let selected = parse_page_numbers(&raw);
    debug!("Relevance: model answered {:?} → {:?}", raw.trim(), selected);
    Ok(selected)
}

/// Parse a comma-separated list of page numbers.
///
/// Tokens are trimmed; anything that is not a plain run of ASCII digits
/// (empty, signed, decimal, words, or too large for `usize`) is dropped.
///
/// ```rust
/// use edgequake_pdfqa::pipeline::relevance::parse_page_numbers;
///
/// assert_eq!(parse_page_numbers("1, 2,x,4"), vec![1, 2, 4]);
/// assert!(parse_page_numbers("").is_empty());
/// ```
pub fn parse_page_numbers(raw: &str) -> Vec<usize> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|token| token.parse::<usize>().ok())
        .collect()
}

/// Keep only page numbers inside `[1, page_count]`, preserving order.
pub fn validate_pages(selected: &[usize], page_count: usize) -> Vec<usize> {
    selected
        .iter()
        .copied()
        .filter(|&page| {
            let valid = (1..=page_count).contains(&page);
            if !valid {
                warn!(
                    "Relevance: dropping page {} (document has {} pages)",
                    page, page_count
                );
            }
            valid
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn parses_mixed_list() {
        assert_eq!(parse_page_numbers("1, 2,x,4"), vec![1, 2, 4]);
    }

    #[test]
    fn empty_and_non_numeric_yield_nothing() {
        assert!(parse_page_numbers("").is_empty());
        assert!(parse_page_numbers("none, n/a ,").is_empty());
        assert!(parse_page_numbers("No relevant pages.").is_empty());
    }

    #[test]
    fn keeps_order_and_duplicates() {
        assert_eq!(parse_page_numbers("5,3,5"), vec![5, 3, 5]);
    }

    #[test]
    fn rejects_signed_decimal_and_embedded_tokens() {
        assert_eq!(parse_page_numbers("-1, +2, 3.0, page 4, 5\n"), vec![5]);
    }

    #[test]
    fn zero_is_parsed_but_not_valid() {
        let parsed = parse_page_numbers("0, 1");
        assert_eq!(parsed, vec![0, 1]);
        assert_eq!(validate_pages(&parsed, 3), vec![1]);
    }

    #[test]
    fn overflowing_numbers_are_dropped() {
        assert_eq!(parse_page_numbers("99999999999999999999999, 2"), vec![2]);
    }

    #[test]
    fn validate_drops_out_of_range_and_keeps_order() {
        assert_eq!(validate_pages(&[4, 2, 7, 2, 1], 4), vec![4, 2, 2, 1]);
        assert!(validate_pages(&[1, 2], 0).is_empty());
    }

    struct Recording {
        answer: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Recording {
        async fn generate(&self, prompt: &str) -> Result<String, AnalyzerError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.answer.clone())
        }
    }

    #[tokio::test]
    async fn select_pages_embeds_every_page_and_parses_answer() {
        let generator = Recording {
            answer: " 3, 1 ".into(),
            prompts: Mutex::new(Vec::new()),
        };
        let pages = vec!["cover".to_string(), "toc".to_string(), "table 1".to_string()];
        let selected = select_pages(&generator, &pages, "show table 1", &AnalyzerConfig::default())
            .await
            .unwrap();
        assert_eq!(selected, vec![3, 1]);

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("show table 1"));
        assert!(prompts[0].contains("[Page 3]\ntable 1"));
    }
}
