//! CLI front door for persisted block documents.
//!
//! Provides the command implementations behind the `tugblock` binary:
//! - `emit` - Generate source text from a document
//! - `check` - Run lints and report diagnostics as JSON
//! - `renumber` - Compute display numbers as JSON
//! - `apply` - Run a JSON command script against a document
//!
//! ## Error Handling
//!
//! All functions return `Result<T, TugBlockError>`, which carries a stable
//! exit code for `main.rs` to report.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info, warn};
use tugblock_core::config::{Config, CONFIG_FILE_NAME};
use tugblock_core::error::TugBlockError;
use tugblock_core::lint;
use tugblock_core::output::{ApplyResponse, CheckResponse, RenumberResponse};
use tugblock_core::{BlockGraph, EditHistory, GraphCommand, NumberingMode};

/// Load the explicit config file, or `tugblock.toml` from the working
/// directory when present.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, TugBlockError> {
    let config = match explicit {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(Path::new(CONFIG_FILE_NAME))?,
    };
    Ok(config)
}

fn read_file(path: &Path) -> Result<String, TugBlockError> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => TugBlockError::file_not_found(path.display().to_string()),
        _ => TugBlockError::internal(format!("failed to read {}: {}", path.display(), e)),
    })
}

fn write_file(path: &Path, content: &str) -> Result<(), TugBlockError> {
    fs::write(path, content)
        .map_err(|e| TugBlockError::internal(format!("failed to write {}: {}", path.display(), e)))
}

/// Read a document and rebuild its graph with the configured limits.
pub fn load_graph(doc: &Path, config: &Config) -> Result<BlockGraph, TugBlockError> {
    let json = read_file(doc)?;
    let mut graph = BlockGraph::from_json(&json)?;
    graph.set_iteration_cap(config.limits.iteration_cap);
    debug!(path = %doc.display(), blocks = graph.len(), "loaded document");
    Ok(graph)
}

/// Generate source text for a document.
pub fn run_emit(doc: &Path, config: &Config) -> Result<String, TugBlockError> {
    let graph = load_graph(doc, config)?;
    Ok(graph.emit_with(&config.emit_options()))
}

/// Lint a document.
pub fn run_check(doc: &Path, config: &Config) -> Result<CheckResponse, TugBlockError> {
    let graph = load_graph(doc, config)?;
    let diagnostics = lint::check(&graph, &config.lint_options());
    let block_count = graph.blocks().filter(|b| !b.kind().is_holder()).count();
    Ok(CheckResponse::new(block_count, diagnostics))
}

/// Compute display numbers for a document.
pub fn run_renumber(
    doc: &Path,
    config: &Config,
    mode: NumberingMode,
) -> Result<RenumberResponse, TugBlockError> {
    let mut graph = load_graph(doc, config)?;
    let numbers = graph.renumber(mode);
    Ok(RenumberResponse::new(mode, numbers))
}

/// Apply a command script and write the resulting document.
///
/// A missing document starts from an empty canvas. Nothing is written unless
/// every command succeeds. The result goes to `output`, or back to `doc`.
pub fn run_apply(
    doc: &Path,
    commands: &Path,
    output: Option<&Path>,
    config: &Config,
) -> Result<ApplyResponse, TugBlockError> {
    let graph = if doc.exists() {
        load_graph(doc, config)?
    } else {
        BlockGraph::new().with_iteration_cap(config.limits.iteration_cap)
    };

    let script: Vec<GraphCommand> = serde_json::from_str(&read_file(commands)?)
        .map_err(|e| TugBlockError::invalid_args(format!("invalid command script: {}", e)))?;

    let mut history = EditHistory::new(graph, config.limits.history_limit);
    let mut outcomes = Vec::with_capacity(script.len());
    for (index, command) in script.iter().enumerate() {
        let outcome = history.apply(command).inspect_err(|e| {
            warn!(index, command = command.name(), error = %e, "command failed");
        })?;
        outcomes.push(outcome);
    }
    debug!(undo_depth = history.undo_depth(), "script applied");

    let target = output.unwrap_or(doc);
    let json = history.graph().to_json_pretty()?;
    write_file(target, &format!("{json}\n"))?;
    info!(path = %target.display(), commands = script.len(), "wrote document");

    Ok(ApplyResponse::new(
        outcomes,
        Some(target.display().to_string()),
    ))
}

/// Write emitted text to `output`.
pub fn write_emit(output: &Path, text: &str) -> Result<(), TugBlockError> {
    write_file(output, text)
}
