//! The single question-answering prompt sent to the chat model.

use crate::models::ScoredChunk;

/// Reply the model is told to give when the context lacks the answer.
pub const NOT_IN_CONTEXT: &str = "answer is not available in the context";

/// Separator placed between retrieved passages in the context slot.
pub const PASSAGE_SEPARATOR: &str = "\n\n";

/// Both slots of the template. Neither can be left out when building one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPrompt<'a> {
    pub context: &'a str,
    pub question: &'a str,
}

impl<'a> QaPrompt<'a> {
    pub fn new(context: &'a str, question: &'a str) -> Self {
        Self { context, question }
    }

    pub fn render(&self) -> String {
        format!(
            "Answer the question as detailed as possible from the provided context, \
             make sure to provide all the details, if the answer is not in provided context \
             just say, \"{sentinel}\", don't provide the wrong answer\n\n\
             Context:\n{context}\n\n\
             Question:\n{question}\n\n\
             Answer:\n",
            sentinel = NOT_IN_CONTEXT,
            context = self.context,
            question = self.question,
        )
    }
}

/// Join retrieved passages, nearest first, into the context slot.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(PASSAGE_SEPARATOR)
}
