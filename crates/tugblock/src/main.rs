//! Binary entry point for the tugblock CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Build or edit a document from a command script
//! tugblock apply program.json --commands edits.json
//!
//! # Generate Python source
//! tugblock emit program.json --output program.py
//!
//! # Lint and number blocks (JSON on stdout)
//! tugblock check program.json
//! tugblock renumber program.json --sticky
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use tugblock::cli::{load_config, run_apply, run_check, run_emit, run_renumber, write_emit};
use tugblock_core::error::{OutputErrorCode, TugBlockError};
use tugblock_core::output::{emit_response, ErrorResponse};
use tugblock_core::NumberingMode;

// ============================================================================
// CLI Structure
// ============================================================================

/// Block-graph documents to Python source.
///
/// Text output (emit) goes to stdout or a file; every other command prints
/// JSON. Errors are JSON on stdout with a matching exit code.
#[derive(Parser, Debug)]
#[command(name = "tugblock", version, about = "Block-graph documents to Python source")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Config file (default: tugblock.toml in the current directory, if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// CLI subcommands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Generate Python source from a document.
    Emit {
        /// Document to read.
        doc: PathBuf,
        /// Write the source here instead of stdout.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Lint a document.
    Check {
        /// Document to read.
        doc: PathBuf,
    },
    /// Compute display numbers for every block.
    Renumber {
        /// Document to read.
        doc: PathBuf,
        /// Keep existing numbers and number only new blocks.
        #[arg(long)]
        sticky: bool,
    },
    /// Apply a JSON command script to a document.
    ///
    /// A missing document starts from an empty canvas.
    Apply {
        /// Document to edit.
        doc: PathBuf,
        /// JSON array of commands.
        #[arg(long)]
        commands: PathBuf,
        /// Write the result here instead of back to the document.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), TugBlockError> {
    let config = load_config(cli.global.config.as_deref())?;
    match cli.command {
        Command::Emit { doc, output } => {
            let text = run_emit(&doc, &config)?;
            match output {
                Some(path) => write_emit(&path, &text),
                None => {
                    let mut stdout = io::stdout();
                    stdout
                        .write_all(text.as_bytes())
                        .and_then(|()| stdout.flush())
                        .map_err(|e| TugBlockError::internal(e.to_string()))
                }
            }
        }
        Command::Check { doc } => print_json(&run_check(&doc, &config)?),
        Command::Renumber { doc, sticky } => {
            let mode = if sticky {
                NumberingMode::Sticky
            } else {
                NumberingMode::Sequential
            };
            print_json(&run_renumber(&doc, &config, mode)?)
        }
        Command::Apply {
            doc,
            commands,
            output,
        } => print_json(&run_apply(&doc, &commands, output.as_deref(), &config)?),
    }
}

fn print_json<T: Serialize>(response: &T) -> Result<(), TugBlockError> {
    emit_response(response, &mut io::stdout()).map_err(|e| TugBlockError::internal(e.to_string()))?;
    let _ = io::stdout().flush();
    Ok(())
}
