//! # Configuration
//!
//! Optional `folio.toml`, read from `--config` or the working directory.
//! Every key has a default, so an empty file (or no file) is valid.
//!
//! ```toml
//! [output]
//! format = "json"
//! json_indent = 4
//!
//! [document]
//! page_width = 1200
//! page_height = 800
//! pages_per_book = 20
//!
//! [logging]
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "folio.toml";

mod defaults {
    pub fn json_indent() -> usize {
        2
    }
    pub fn page_width() -> f64 {
        900.0
    }
    pub fn page_height() -> f64 {
        700.0
    }
    pub fn pages_per_book() -> usize {
        0
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config file '{path}': {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid configuration for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOrJson {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Report format when `--json` is not given.
    #[serde(default)]
    pub format: TextOrJson,

    /// Indent of written save files and JSON reports.
    #[serde(default = "defaults::json_indent")]
    pub json_indent: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: TextOrJson::Text,
            json_indent: defaults::json_indent(),
        }
    }
}

/// Settings for documents created by `folio new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentConfig {
    #[serde(default = "defaults::page_width")]
    pub page_width: f64,

    #[serde(default = "defaults::page_height")]
    pub page_height: f64,

    /// 0 keeps the document in one piece.
    #[serde(default = "defaults::pages_per_book")]
    pub pages_per_book: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            page_width: defaults::page_width(),
            page_height: defaults::page_height(),
            pages_per_book: defaults::pages_per_book(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Overridden by `FOLIO_LOG_FORMAT`.
    #[serde(default)]
    pub format: TextOrJson,
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub document: DocumentConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from `path`, or from `folio.toml` in the working directory.
    ///
    /// An explicit path must exist. Without one, a missing `folio.toml`
    /// yields the defaults.
    ///
    /// # Errors
    ///
    /// `Read` / `Parse` for unreadable or malformed files, `InvalidValue`
    /// for out-of-range settings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_toml_file(path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_toml_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let (page_width, page_height) = (self.document.page_width, self.document.page_height);
        if !(page_width.is_finite() && page_width > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "document.page_width",
                reason: format!("must be a positive number, got {page_width}"),
            });
        }
        if !(page_height.is_finite() && page_height > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "document.page_height",
                reason: format!("must be a positive number, got {page_height}"),
            });
        }
        Ok(())
    }
}
