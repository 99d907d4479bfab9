//! Prompt templates for page selection and per-page analysis.
//!
//! Every prompt the service sends lives here so wording changes touch one
//! file and tests can inspect prompts without a live model.
//!
//! Analysis templates use two placeholders, `{question}` and `{page_text}`,
//! substituted by [`render_template`] in a single pass: a question that
//! happens to contain the literal text `{page_text}` is inserted verbatim and
//! never expanded.

/// Template for questions about diagrams, graphs and figures.
pub const DIAGRAM_TEMPLATE: &str = r#"Question: {question}
Page text:
"""{page_text}"""
Please provide an explanation related to the question in the following steps:
1. Describe each component label and its role in short, and the connections between them in the diagram or graph.
2. Provide a full interpretation of the diagram or graph in short.
If the concept is only a part of the page, explain only that concept and ignore the other concepts on the same page.
Do not give any basic representation.
Never give page 1 and 2 analysis for any question."#;

/// Template for questions about tables.
pub const TABLE_TEMPLATE: &str = r#"Question: {question}
Page text:
"""{page_text}"""
Please provide only the table related to the question without any additional explanation.
If the user asks to give the table, give only the table without merging any columns; if the user asks to explain the table, only explain the table. If there is no explicit table name, do not give that table.
If the concept is only a part of the page, answer only about that concept and ignore the other concepts on the same page.
Never give page 1 and 2 analysis for any question."#;

/// Template for every other question.
pub const GENERAL_TEMPLATE: &str = r#"Question: {question}
Page text:
"""{page_text}"""
Please provide a direct answer to the question based on the text provided.
If the concept is only a part of the page, answer only about that concept and ignore the other concepts on the same page.
Never give page 1 and 2 analysis for any question."#;

/// Substitute `{question}` and `{page_text}` in `template`.
///
/// Unknown `{...}` sequences are copied through untouched.
pub fn render_template(template: &str, question: &str, page_text: &str) -> String {
    let mut out = String::with_capacity(template.len() + question.len() + page_text.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{question}") {
            out.push_str(question);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{page_text}") {
            out.push_str(page_text);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Build the page-selection prompt embedding every page of the document.
///
/// Pages are labelled with their 1-indexed number so the model can answer
/// with numbers that map directly onto the stored page texts.
pub fn relevance_prompt(question: &str, pages: &[String]) -> String {
    let mut prompt = String::from("Given these document pages and this question:\n");
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\nPages:\n");
    for (idx, text) in pages.iter().enumerate() {
        prompt.push_str(&format!("[Page {}]\n{}\n", idx + 1, text.trim_end()));
    }
    prompt.push_str(
        "Return the relevant page numbers (1-indexed) as a comma-separated list, \
         numbers only, e.g. `2, 5`:",
    );
    prompt
}
