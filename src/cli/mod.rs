//! CLI module for citerag
//!
//! Handles command-line argument parsing and result display.

pub mod args;
pub mod display;

pub use args::{Args, AskArgs, Commands, Verbosity};
