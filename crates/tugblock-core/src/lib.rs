//! Core infrastructure for tugblock.
//!
//! This crate provides the block-graph program model:
//! - Block entities, kinds and edges
//! - Graph arena with linking, traversal and code emission
//! - Cascading deletion and optional branches
//! - Tree document persistence
//! - Editing commands with undo/redo
//! - Lints, configuration, error types and JSON output types

pub mod block;
pub mod command;
pub mod config;
pub mod document;
pub mod edit;
pub mod error;
pub mod graph;
pub mod lint;
pub mod output;
pub mod render;

pub use block::{Block, BlockId, BlockKind, BranchKind, CanvasPos, Edge};
pub use command::{CommandOutcome, EditHistory, GraphCommand};
pub use document::BlockDocument;
pub use error::{DocumentError, GraphError, TugBlockError};
pub use graph::{BlockGraph, EmitOptions, NumberingMode, Traversal};
