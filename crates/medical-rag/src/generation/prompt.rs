//! Prompt templates for RAG generation

use crate::types::RetrievedRecord;

/// Prompt builder for chat queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunk texts, best first, separated by blank lines
    pub fn build_context(records: &[RetrievedRecord]) -> String {
        records
            .iter()
            .map(|record| record.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// System instruction with the retrieved context appended
    pub fn system_prompt(context: &str) -> String {
        format!(
            r#"You are a medical assistant for question-answering tasks.
Use the following pieces of retrieved context to answer the question.
If you don't know the answer, say that you don't know.
Use three sentences maximum and keep the answer concise.

{context}"#,
            context = context
        )
    }
}
