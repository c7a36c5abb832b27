// Splice an assembled context block into the outgoing conversation
use crate::errors::{PipelineError, Result};
use crate::rag::context::ContextBlock;
use crate::types::messages::{last_user_index, ChatMessage};

/// Grounding instruction placed ahead of the context block
pub const GROUNDING_INSTRUCTION: &str = "Answer ONLY using the provided context. \
If the information is not present in the context, say you don't know. \
Cite sources as [doc_name:doc_id:chunk_index].\n\n";

/// Label between the context block and the user's own words
const QUESTION_LABEL: &str = "\n\nQuestion: ";

/// Return a copy of `messages` with `context` prepended to the last user message.
///
/// Fails with `NoUserMessage` when there is no user message. An empty context
/// leaves every message as it was.
pub fn inject_context(messages: &[ChatMessage], context: &ContextBlock) -> Result<Vec<ChatMessage>> {
    let target = last_user_index(messages).ok_or(PipelineError::NoUserMessage)?;

    let mut injected = messages.to_vec();
    if context.is_empty() {
        return Ok(injected);
    }

    let original = &messages[target].content;
    injected[target].content = format!(
        "{}{}{}{}",
        GROUNDING_INSTRUCTION, context.text, QUESTION_LABEL, original
    );

    Ok(injected)
}
