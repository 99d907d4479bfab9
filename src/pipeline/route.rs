//! Answer routing: pick the analysis type (and so the prompt template) for a
//! question by keyword.
//!
//! Matching is a case-insensitive substring test on the raw question, in a
//! fixed order: `diagram`, then `table`, then the `general` fallback. A
//! question mentioning both a diagram and a table is a diagram question.

use crate::prompts::{render_template, DIAGRAM_TEMPLATE, GENERAL_TEMPLATE, TABLE_TEMPLATE};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of analysis requested for each relevant page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    Diagram,
    Table,
    General,
}

impl AnalysisType {
    /// Classify a question. Order of the checks is the tie-break.
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        if q.contains("diagram") {
            AnalysisType::Diagram
        } else if q.contains("table") {
            AnalysisType::Table
        } else {
            AnalysisType::General
        }
    }

    /// The prompt template carried by this type.
    pub fn template(self) -> &'static str {
        match self {
            AnalysisType::Diagram => DIAGRAM_TEMPLATE,
            AnalysisType::Table => TABLE_TEMPLATE,
            AnalysisType::General => GENERAL_TEMPLATE,
        }
    }

    /// Render this type's template for one page.
    pub fn render(self, question: &str, page_text: &str) -> String {
        render_template(self.template(), question, page_text)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::Diagram => "diagram",
            AnalysisType::Table => "table",
            AnalysisType::General => "general",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagram_wins_over_table() {
        assert_eq!(
            AnalysisType::classify("explain the diagram and table"),
            AnalysisType::Diagram
        );
        assert_eq!(
            AnalysisType::classify("the table next to the diagram"),
            AnalysisType::Diagram
        );
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(AnalysisType::classify("Show the TABLE"), AnalysisType::Table);
        assert_eq!(AnalysisType::classify("DIAGRAM 3?"), AnalysisType::Diagram);
    }

    #[test]
    fn substring_match_includes_longer_words() {
        assert_eq!(AnalysisType::classify("list the timetables"), AnalysisType::Table);
    }

    #[test]
    fn everything_else_is_general() {
        assert_eq!(AnalysisType::classify("who wrote this?"), AnalysisType::General);
        assert_eq!(AnalysisType::classify(""), AnalysisType::General);
    }

    #[test]
    fn each_type_renders_its_own_template() {
        let table = AnalysisType::Table.render("give the table", "Table 2 | a | b");
        assert!(table.contains("Please provide only the table"));
        assert!(table.contains("Table 2 | a | b"));

        let diagram = AnalysisType::Diagram.render("explain the diagram", "Fig 1");
        assert!(diagram.contains("component label"));

        let general = AnalysisType::General.render("what is it?", "text");
        assert!(general.contains("direct answer"));
    }

    #[test]
    fn serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&AnalysisType::Diagram).unwrap(),
            "\"diagram\""
        );
        assert_eq!(AnalysisType::General.to_string(), "general");
    }
}
