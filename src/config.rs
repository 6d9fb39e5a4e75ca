//! Run configuration, read from an optional JSON file.

use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::query::ExecutionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Delimited text options for loading datasets and writing results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: char,
    /// Without a header row columns are named `column_1`, `column_2`, ...
    pub has_headers: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_headers: true,
        }
    }
}

impl CsvOptions {
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::InvalidValue(format!(
                "delimiter {:?} must be a single ASCII character",
                self.delimiter
            )))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub execution: ExecutionConfig,
    pub csv: CsvOptions,
    /// One of trace, debug, info, warn, error
    pub log_level: String,
    /// Prometheus listener; metrics stay in-process when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            execution: ExecutionConfig::default(),
            csv: CsvOptions::default(),
            log_level: "info".to_string(),
            metrics_addr: None,
        }
    }
}

impl AppConfig {
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidValue(format!("unknown log level {}", self.log_level)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.csv.delimiter_byte()?;
        self.level()?;
        if self.execution.count_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "count_column cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}
