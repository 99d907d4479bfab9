//! Response aggregation: join per-page analyses into one labelled answer.

use crate::output::PageAnalysis;

/// Concatenate non-empty analyses, in the given order, as
/// `**Page N Analysis**:` blocks separated by a blank line.
///
/// Returns an empty string when every analysis is empty.
pub fn aggregate(analyses: &[PageAnalysis]) -> String {
    let mut out = String::new();
    for analysis in analyses.iter().filter(|a| !a.is_empty()) {
        out.push_str(&format!(
            "**Page {} Analysis**:\n{}\n\n",
            analysis.page, analysis.text
        ));
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::route::AnalysisType;

    fn analysis(page: usize, text: &str) -> PageAnalysis {
        PageAnalysis {
            page,
            kind: AnalysisType::General,
            text: text.to_string(),
        }
    }

    #[test]
    fn joins_blocks_in_input_order() {
        let out = aggregate(&[analysis(4, "four"), analysis(2, "two")]);
        assert_eq!(
            out,
            "**Page 4 Analysis**:\nfour\n\n**Page 2 Analysis**:\ntwo"
        );
    }

    #[test]
    fn skips_empty_analyses() {
        let out = aggregate(&[analysis(1, ""), analysis(3, "three")]);
        assert_eq!(out, "**Page 3 Analysis**:\nthree");
        assert!(!out.contains("Page 1"));
    }

    #[test]
    fn all_empty_gives_empty_string() {
        assert_eq!(aggregate(&[analysis(1, ""), analysis(2, "")]), "");
        assert_eq!(aggregate(&[]), "");
    }

    #[test]
    fn duplicate_pages_produce_duplicate_blocks() {
        let out = aggregate(&[analysis(2, "a"), analysis(2, "b")]);
        assert_eq!(out.matches("**Page 2 Analysis**").count(), 2);
    }
}
