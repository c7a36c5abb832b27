//! Type definitions module
//!
//! Core data shared by every pipeline stage.

pub mod messages;
pub mod passage;

// Re-export commonly used types
pub use messages::{ChatMessage, Role};
pub use passage::ScoredPassage;
