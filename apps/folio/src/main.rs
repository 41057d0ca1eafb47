//! # Folio - instruction book document tool
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │              apps/folio (THE BINARY)          │
//! │                                               │
//! │   ┌─────────────┐        ┌────────────────┐   │
//! │   │    CLI      │        │  folio.toml    │   │
//! │   │   (clap)    │        │  (toml/serde)  │   │
//! │   └──────┬──────┘        └───────┬────────┘   │
//! │          └───────────┬───────────┘            │
//! │                      ▼                        │
//! │              ┌───────────────┐                │
//! │              │  folio-core   │                │
//! │              │  (THE STORE)  │                │
//! │              └───────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! folio new book.json --steps 40 --pages-per-book 20
//! folio check book.json
//! folio convert book.json book.folio
//! folio --json inspect book.folio
//! ```

use clap::Parser;
use folio::cli::{self, Cli};
use folio::config::{Config, TextOrJson};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are reported after logging is up, with default settings.
    let (config, config_error) = match Config::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_tracing(&cli, &config);

    if let Some(e) = config_error {
        tracing::error!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match cli::execute(cli, &config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// FOLIO_LOG_FORMAT=json (or `[logging] format = "json"`) switches to
/// machine-parseable logs. RUST_LOG overrides the level flags.
fn init_tracing(cli: &Cli, config: &Config) {
    let json = match std::env::var("FOLIO_LOG_FORMAT") {
        Ok(format) => format == "json",
        Err(_) => config.logging.format == TextOrJson::Json,
    };

    let default_level = if cli.verbose {
        "folio=debug,folio_core=debug"
    } else if cli.quiet {
        "folio=warn,folio_core=warn"
    } else {
        "folio=info,folio_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_level.into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
