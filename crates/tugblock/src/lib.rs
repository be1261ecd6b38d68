//! Tugblock - block-graph program model with Python code emission.
//!
//! This crate provides the CLI binary for tugblock documents.
//!
//! ## Modules
//!
//! - `cli` - CLI command implementations

pub mod cli;

// Re-export core types for convenience
pub use tugblock_core::error::{OutputErrorCode, TugBlockError};
pub use tugblock_core::output::{ErrorInfo, ErrorResponse, SCHEMA_VERSION};
pub use tugblock_core::{BlockDocument, BlockGraph, GraphCommand, NumberingMode};
