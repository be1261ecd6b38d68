//! JSON output types and serialization for CLI responses.
//!
//! Every response puts `status` first and carries `schema_version`, so
//! consumers can branch on success before reading the payload. Output is
//! deterministic: the same graph always produces the same bytes.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::command::CommandOutcome;
use crate::error::{OutputErrorCode, TugBlockError};
use crate::graph::{NumberInfo, NumberingMode};
use crate::lint::Diagnostic;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

/// Error details carried by [`ErrorResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code, equal to the process exit code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
}

impl ErrorInfo {
    /// Create from a TugBlockError.
    pub fn from_error(err: &TugBlockError) -> Self {
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
        }
    }
}

/// Response for the check command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Registered blocks, Holders excluded.
    pub block_count: usize,
    /// Lint findings in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckResponse {
    pub fn new(block_count: usize, diagnostics: Vec<Diagnostic>) -> Self {
        CheckResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            block_count,
            diagnostics,
        }
    }
}

/// Response for the renumber command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenumberResponse {
    pub status: String,
    pub schema_version: String,
    pub mode: NumberingMode,
    pub numbers: Vec<NumberInfo>,
}

impl RenumberResponse {
    pub fn new(mode: NumberingMode, numbers: Vec<NumberInfo>) -> Self {
        RenumberResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            mode,
            numbers,
        }
    }
}

/// Response for the apply command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResponse {
    pub status: String,
    pub schema_version: String,
    /// One outcome per command, in order.
    pub outcomes: Vec<CommandOutcome>,
    /// Where the resulting document was written, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub written: Option<String>,
}

impl ApplyResponse {
    pub fn new(outcomes: Vec<CommandOutcome>, written: Option<String>) -> Self {
        ApplyResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            outcomes,
            written,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a TugBlockError.
    pub fn from_error(err: &TugBlockError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockId;
    use crate::error::GraphError;
    use crate::lint::DiagnosticKind;

    #[test]
    fn status_is_first_field() {
        let response = CheckResponse::new(0, vec![]);
        let mut out = Vec::new();
        emit_response(&response, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("{\n  \"status\": \"ok\""));
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn check_response_carries_diagnostics() {
        let response = CheckResponse::new(
            2,
            vec![Diagnostic {
                block: BlockId::new(1),
                kind: DiagnosticKind::Incomplete,
                message: "code block is missing code".to_string(),
            }],
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["schema_version"], "1");
        assert_eq!(value["diagnostics"][0]["kind"], "incomplete");
        assert_eq!(value["diagnostics"][0]["block"], 1);
    }

    #[test]
    fn error_response_uses_error_code() {
        let err: TugBlockError = GraphError::BlockNotFound { id: BlockId::new(3) }.into();
        let value = serde_json::to_value(ErrorResponse::from_error(&err)).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["code"], 3);
        assert_eq!(value["error"]["message"], "block not found: blk_3");
    }

    #[test]
    fn apply_response_omits_missing_path() {
        let value = serde_json::to_value(ApplyResponse::new(vec![CommandOutcome::Linked], None)).unwrap();
        assert!(value.get("written").is_none());
        assert_eq!(value["outcomes"][0]["outcome"], "linked");
    }
}
