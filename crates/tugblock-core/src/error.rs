//! Error types and error code constants for tugblock.
//!
//! Each subsystem owns a `thiserror` enum:
//!
//! - [`GraphError`]: structural violations on the block graph
//! - [`DocumentError`]: malformed persisted documents
//! - [`ConfigError`]: unreadable or unparsable `tugblock.toml`
//!
//! [`TugBlockError`] bridges all of them into one type for CLI output, and
//! [`OutputErrorCode`] maps that type onto stable exit codes:
//!
//! - `2`: Invalid arguments (bad input, unreadable config)
//! - `3`: Structure errors (an edit the graph refuses)
//! - `4`: Document errors (malformed or inconsistent document)
//! - `10`: Internal errors (I/O, unexpected state)

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::block::{BlockId, BranchKind, Edge};

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output and process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed request).
    InvalidArguments = 2,
    /// The graph rejected a structural edit.
    StructureError = 3,
    /// The persisted document is malformed.
    DocumentError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Graph Errors
// ============================================================================

/// Structural errors raised by [`BlockGraph`](crate::graph::BlockGraph).
///
/// Every mutation validates before it writes, so an `Err` leaves the graph
/// exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("block not found: {id}")]
    BlockNotFound { id: BlockId },

    #[error("block already registered: {id}")]
    DuplicateBlock { id: BlockId },

    #[error("invalid {edge} edge on {parent}: {reason}")]
    InvalidEdge {
        parent: BlockId,
        edge: Edge,
        reason: String,
    },

    #[error("{branch} cannot be attached to {header_kind} block {header}")]
    BranchNotApplicable {
        header: BlockId,
        header_kind: &'static str,
        branch: BranchKind,
    },

    #[error("{header} already has a {branch} branch")]
    AlreadyAttached { header: BlockId, branch: BranchKind },

    #[error("{header} has no {branch} branch")]
    BranchNotAttached { header: BlockId, branch: BranchKind },

    #[error("{branch} is not in the branch chain of {header}")]
    NotInBranchChain { header: BlockId, branch: BlockId },

    #[error("holder {id} is removed with its header, not on its own")]
    HolderNotDeletable { id: BlockId },

    #[error("cannot create a {kind} block: {reason}")]
    InvalidKind { kind: &'static str, reason: String },

    #[error("cannot change {id} from {expected} to {found}")]
    KindMismatch {
        id: BlockId,
        expected: &'static str,
        found: &'static str,
    },
}

impl GraphError {
    pub(crate) fn invalid_edge(parent: BlockId, edge: Edge, reason: impl Into<String>) -> Self {
        GraphError::InvalidEdge {
            parent,
            edge,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Document Errors
// ============================================================================

/// Errors raised while turning a persisted document back into a graph.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document schema version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("duplicate block id in document: {id}")]
    DuplicateId { id: BlockId },

    #[error("holder node {id} must not appear in a document")]
    UnexpectedHolder { id: BlockId },

    #[error("invalid structure at {id}: {reason}")]
    InvalidStructure { id: BlockId, reason: String },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DocumentError {
    pub(crate) fn invalid_structure(id: BlockId, reason: impl Into<String>) -> Self {
        DocumentError::InvalidStructure {
            id,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Config Errors
// ============================================================================

/// Errors raised while loading `tugblock.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum TugBlockError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// Graph refused a structural edit.
    #[error(transparent)]
    Structure(#[from] GraphError),

    /// Malformed document.
    #[error("document error: {message}")]
    Document { message: String },

    /// Config could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Internal error (bug, I/O failure, unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&TugBlockError> for OutputErrorCode {
    fn from(err: &TugBlockError) -> Self {
        match err {
            TugBlockError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            TugBlockError::FileNotFound { .. } => OutputErrorCode::InvalidArguments,
            TugBlockError::Structure(_) => OutputErrorCode::StructureError,
            TugBlockError::Document { .. } => OutputErrorCode::DocumentError,
            TugBlockError::Config(_) => OutputErrorCode::InvalidArguments,
            TugBlockError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<TugBlockError> for OutputErrorCode {
    fn from(err: TugBlockError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridge: DocumentError -> TugBlockError
// ============================================================================

impl From<DocumentError> for TugBlockError {
    fn from(err: DocumentError) -> Self {
        // A document that links blocks illegally is still a document problem.
        TugBlockError::Document {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl TugBlockError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        TugBlockError::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        TugBlockError::FileNotFound { path: path.into() }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        TugBlockError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================
