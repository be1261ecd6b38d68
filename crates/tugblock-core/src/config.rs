//! Configuration handling for tugblock

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::graph::{EmitOptions, DEFAULT_HEADER, DEFAULT_INDENT, DEFAULT_ITERATION_CAP};
use crate::lint::{LintOptions, DEFAULT_MAX_DEPTH};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "tugblock.toml";

/// Tugblock configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Code emission settings
    #[serde(default)]
    pub emit: EmitConfig,

    /// Traversal and editing limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Code emission configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmitConfig {
    /// Indentation unit repeated once per depth level
    #[serde(default = "default_indent")]
    pub indent: String,

    /// Comment line placed above the generated code; empty disables it
    #[serde(default = "default_header")]
    pub header: String,
}

/// Limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum visits per traversal before it aborts
    #[serde(default = "default_iteration_cap")]
    pub iteration_cap: usize,

    /// Deepest nesting accepted without a lint
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Undo steps kept by the edit history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_indent() -> String {
    DEFAULT_INDENT.to_string()
}

fn default_header() -> String {
    DEFAULT_HEADER.to_string()
}

fn default_iteration_cap() -> usize {
    DEFAULT_ITERATION_CAP
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_history_limit() -> usize {
    100
}

impl Default for EmitConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            header: default_header(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            iteration_cap: default_iteration_cap(),
            max_depth: default_max_depth(),
            history_limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a file if it exists, defaults otherwise
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn emit_options(&self) -> EmitOptions {
        EmitOptions {
            indent: self.emit.indent.clone(),
            header: self.emit.header.clone(),
        }
    }

    pub fn lint_options(&self) -> LintOptions {
        LintOptions {
            max_depth: self.limits.max_depth,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.emit.indent, "    ");
        assert_eq!(config.emit.header, "# Auto-Generated by tugblock");
        assert_eq!(config.limits.iteration_cap, 10_000);
        assert_eq!(config.limits.max_depth, 6);
        assert_eq!(config.limits.history_limit, 100);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[emit]
indent = "  "

[limits]
max_depth = 3
"#,
        )
        .unwrap();
        assert_eq!(config.emit.indent, "  ");
        assert_eq!(config.emit.header, "# Auto-Generated by tugblock");
        assert_eq!(config.limits.max_depth, 3);
        assert_eq!(config.limits.iteration_cap, 10_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[emit]\nheader = \"\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.emit.header, "");
        assert_eq!(config.emit_options().indent, "    ");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_or_default(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.lint_options().max_depth, 6);
    }

    #[test]
    fn test_load_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[limits]\nmax_depth = \"deep\"\n").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
