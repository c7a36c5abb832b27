// Citation-annotated context block under a character budget
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::ScoredPassage;

/// Fixed prefix of every non-empty context block; counts against the budget
pub const CONTEXT_HEADER: &str = "CONTEXT:\n\n";

/// Blank line between passages
const PASSAGE_SEPARATOR: &str = "\n\n";

/// Assembled context for prompt injection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextBlock {
    /// The formatted context text
    pub text: String,
    /// Length of `text` in characters
    pub char_count: usize,
    /// Passages that made it in, a prefix of the input
    pub passages_included: Vec<ScoredPassage>,
    /// True when some passage was dropped or the first one overran the budget
    pub truncated: bool,
}

impl ContextBlock {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            char_count: 0,
            passages_included: Vec::new(),
            truncated: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Builds context blocks from ordered passages
#[derive(Debug, Clone, Copy)]
pub struct ContextAssembler {
    max_chars: usize,
}

impl ContextAssembler {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Assemble passages in the order given.
    ///
    /// Stops at the first passage that would overrun `max_chars`; that passage
    /// and all later ones are left out whole. The first passage is always kept,
    /// even when it alone is over budget.
    pub fn assemble(&self, passages: &[ScoredPassage]) -> ContextBlock {
        if passages.is_empty() {
            return ContextBlock::empty();
        }

        let mut parts: Vec<String> = Vec::with_capacity(passages.len());
        let mut total_chars = CONTEXT_HEADER.chars().count();
        let mut truncated = false;

        for (idx, passage) in passages.iter().enumerate() {
            let entry = format_passage(passage);
            let separator = if idx == 0 { 0 } else { PASSAGE_SEPARATOR.len() };
            let cost = entry.chars().count() + separator;

            if total_chars + cost > self.max_chars {
                truncated = true;
                if idx > 0 {
                    debug!(
                        included = idx,
                        dropped = passages.len() - idx,
                        max_chars = self.max_chars,
                        "context budget reached"
                    );
                    break;
                }
                debug!(
                    passage_chars = cost,
                    max_chars = self.max_chars,
                    "first passage exceeds context budget, keeping it whole"
                );
            }

            parts.push(entry);
            total_chars += cost;
        }

        let included = parts.len();
        let text = format!("{}{}", CONTEXT_HEADER, parts.join(PASSAGE_SEPARATOR));

        ContextBlock {
            char_count: text.chars().count(),
            text,
            passages_included: passages[..included].to_vec(),
            truncated,
        }
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(8000)
    }
}

/// `<text> [<name_or_id>:<document_id>:<chunk_index>]`
fn format_passage(passage: &ScoredPassage) -> String {
    format!("{} {}", passage.text, passage.citation())
}
