//! # Folio CLI Module
//!
//! ## Available Commands
//!
//! - `inspect` - Show document metrics
//! - `check` - Audit links and numbering
//! - `convert` - Rewrite a document as JSON save file or binary snapshot
//! - `renumber` - Renumber pages and steps
//! - `hash` - Checksum and BLAKE3 digest of a document
//! - `new` - Create a blank document

mod commands;

use crate::config::{Config, TextOrJson};
use clap::{Parser, Subcommand, ValueEnum};
use folio_core::FolioError;
use std::path::PathBuf;
use std::process::ExitCode;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Folio - instruction book document tool
///
/// Inspects, audits and converts instruction book documents.
#[derive(Parser, Debug)]
#[command(name = "folio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long = "json", global = true)]
    pub json_mode: bool,

    /// Config file (defaults to ./folio.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// On-disk document encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DocFormat {
    /// Versioned JSON save file
    Json,
    /// Binary snapshot with `FOLI` header
    Binary,
}

impl DocFormat {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::Json => Self::Binary,
            Self::Binary => Self::Json,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show item counts and structure metrics
    Inspect {
        /// Document to read
        file: PathBuf,
    },

    /// Audit parent/child links and numbering; exits 2 on violations
    Check {
        /// Document to read
        file: PathBuf,
    },

    /// Convert between the JSON save file and the binary snapshot
    Convert {
        /// Document to read (format is detected)
        input: PathBuf,

        /// Output file path
        output: PathBuf,

        /// Output format (defaults to the other format)
        #[arg(short = 't', long)]
        to: Option<DocFormat>,
    },

    /// Renumber pages and all step scopes
    Renumber {
        /// Document to renumber
        file: PathBuf,

        /// Write here instead of in place
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute checksum and BLAKE3 hash of a document
    Hash {
        /// Document to read
        file: PathBuf,
    },

    /// Create a blank document of one-step pages
    New {
        /// Output file path
        output: PathBuf,

        /// Number of pages (one step each)
        #[arg(short, long, default_value = "1")]
        steps: usize,

        /// Split into books of this many pages (overrides config)
        #[arg(long)]
        pages_per_book: Option<usize>,

        /// Output format
        #[arg(short = 't', long, default_value = "json")]
        to: DocFormat,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// How commands print their reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputMode {
    pub json: bool,
    pub indent: usize,
}

impl OutputMode {
    #[must_use]
    pub fn new(cli: &Cli, config: &Config) -> Self {
        Self {
            json: cli.json_mode || config.output.format == TextOrJson::Json,
            indent: config.output.json_indent,
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
///
/// `check` reports violations through the exit code; every other command
/// succeeds with `ExitCode::SUCCESS` or fails with an error.
pub fn execute(cli: Cli, config: &Config) -> Result<ExitCode, FolioError> {
    let out = OutputMode::new(&cli, config);

    match cli.command {
        Commands::Inspect { file } => cmd_inspect(&file, out).map(|()| ExitCode::SUCCESS),
        Commands::Check { file } => {
            let violations = cmd_check(&file, out)?;
            Ok(if violations == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Commands::Convert { input, output, to } => {
            cmd_convert(&input, &output, to, out).map(|()| ExitCode::SUCCESS)
        }
        Commands::Renumber { file, output } => {
            cmd_renumber(&file, output.as_deref(), out).map(|()| ExitCode::SUCCESS)
        }
        Commands::Hash { file } => cmd_hash(&file, out).map(|()| ExitCode::SUCCESS),
        Commands::New {
            output,
            steps,
            pages_per_book,
            to,
            force,
        } => {
            let opts = NewDocument {
                pages: steps,
                pages_per_book: pages_per_book.unwrap_or(config.document.pages_per_book),
                page_width: config.document.page_width,
                page_height: config.document.page_height,
            };
            cmd_new(&output, &opts, to, force, out).map(|()| ExitCode::SUCCESS)
        }
    }
}
