use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::dataset::{DataError, Dataset};
use crate::query::QueryError;

/// Errors that can occur during parsing
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Invalid input format: {0}")]
    InvalidFormat(String),
    #[error("Invalid field type: {0}")]
    InvalidFieldType(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset error: {0}")]
    Data(#[from] DataError),
    #[error("Specification error: {0}")]
    Query(#[from] QueryError),
    #[error("Batch processing error: {0}")]
    BatchError(String),
}

/// Result type for parser operations
pub type ParserResult<T> = Result<T, ParserError>;

/// Trait for parsing raw input into a dataset
pub trait DatasetParser {
    /// Parses a single input into a dataset
    fn parse(&self, input: &[u8]) -> ParserResult<Dataset>;

    /// Parses several inputs that share a header and concatenates them
    fn parse_batch(&self, inputs: &[&[u8]]) -> ParserResult<Dataset> {
        let mut result: Option<Dataset> = None;
        let mut errors = Vec::new();

        for (i, input) in inputs.iter().enumerate() {
            let parsed = match self.parse(input) {
                Ok(dataset) => dataset,
                Err(e) => {
                    errors.push((i, e));
                    continue;
                }
            };
            match result.as_mut() {
                None => result = Some(parsed),
                Some(acc) => {
                    if let Err(e) = acc.append(parsed) {
                        errors.push((i, e.into()));
                    }
                }
            }
        }

        if !errors.is_empty() {
            let error_msg = errors
                .into_iter()
                .map(|(i, e)| format!("Input {}: {}", i, e))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ParserError::BatchError(error_msg));
        }

        result.ok_or_else(|| ParserError::BatchError("No inputs given".to_string()))
    }

    /// Reads and parses a file
    fn parse_file(&self, path: &Path) -> ParserResult<Dataset> {
        let bytes = fs::read(path)?;
        self.parse(&bytes)
    }

    /// Returns the supported input formats
    fn supported_formats(&self) -> Vec<&'static str>;
}
