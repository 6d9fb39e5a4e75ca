use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use super::formats::{CsvParser, JsonRowsParser};
use super::parser::{DatasetParser, ParserError, ParserResult};
use crate::dataset::Dataset;

/// Errors that can occur during parser registration and lookup
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No parser found for format: {0}")]
    NoParserFound(String),
    #[error("Invalid format specified: {0}")]
    InvalidFormat(String),
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Priority level for parser registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 50,
    High = 100,
}

/// ParserEntry combines a parser with its priority
struct ParserEntry {
    parser: Arc<dyn DatasetParser + Send + Sync>,
    priority: Priority,
}

/// ParserRegistry picks a dataset parser by format name or file extension
#[derive(Default)]
pub struct ParserRegistry {
    /// Map from format name to parser entries, highest priority first
    parsers: HashMap<String, Vec<ParserEntry>>,
    /// Parsers to try in order when the format is unknown
    default_parsers: Vec<ParserEntry>,
}

impl ParserRegistry {
    /// Creates a new, empty parser registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in CSV and JSON row parsers. JSON is tried
    /// first during autodiscovery since nearly any text parses as CSV.
    pub fn with_defaults(csv_delimiter: u8, has_headers: bool) -> Self {
        let mut registry = Self::new();
        registry.insert(Arc::new(JsonRowsParser::new()), Priority::High);
        registry.insert(
            Arc::new(CsvParser::with_delimiter(csv_delimiter).with_headers(has_headers)),
            Priority::Normal,
        );
        if csv_delimiter != b'\t' {
            registry.insert(
                Arc::new(CsvParser::with_delimiter(b'\t').with_headers(has_headers)),
                Priority::Low,
            );
        }
        registry
    }

    /// Register a parser for its formats with a given priority
    pub fn register<P>(&mut self, parser: Arc<P>, priority: Priority) -> RegistryResult<()>
    where
        P: DatasetParser + Send + Sync + 'static,
    {
        if parser.supported_formats().is_empty() {
            return Err(RegistryError::InvalidFormat(
                "Parser doesn't support any formats".to_string(),
            ));
        }
        self.insert(parser, priority);
        Ok(())
    }

    fn insert(&mut self, parser: Arc<dyn DatasetParser + Send + Sync>, priority: Priority) {
        for format in parser.supported_formats() {
            let entries = self.parsers.entry(format.to_lowercase()).or_default();
            entries.push(ParserEntry {
                parser: parser.clone(),
                priority,
            });
            entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        }

        self.default_parsers.push(ParserEntry { parser, priority });
        self.default_parsers.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Get the highest priority parser for a format
    pub fn get_parser(&self, format: &str) -> RegistryResult<Arc<dyn DatasetParser + Send + Sync>> {
        self.parsers
            .get(&format.to_lowercase())
            .and_then(|entries| entries.first())
            .map(|entry| Arc::clone(&entry.parser))
            .ok_or_else(|| RegistryError::NoParserFound(format.to_string()))
    }

    /// Get the parser matching a file's extension
    pub fn parser_for_path(&self, path: &Path) -> RegistryResult<Arc<dyn DatasetParser + Send + Sync>> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| RegistryError::NoParserFound(path.display().to_string()))?;
        self.get_parser(extension)
    }

    /// Parse data with autodiscovery (tries each parser until one succeeds)
    pub fn parse_with_autodiscovery(&self, input: &[u8]) -> ParserResult<Dataset> {
        if self.default_parsers.is_empty() {
            return Err(ParserError::InvalidFormat("No parsers registered".to_string()));
        }

        let mut last_error = None;
        for entry in &self.default_parsers {
            match entry.parser.parse(input) {
                Ok(dataset) => return Ok(dataset),
                Err(err) => last_error = Some(err),
            }
        }

        Err(last_error
            .unwrap_or_else(|| ParserError::InvalidFormat("All parsers failed".to_string())))
    }

    /// Loads a file, choosing the parser by extension and falling back to
    /// autodiscovery for unknown extensions
    pub fn load_file(&self, path: &Path) -> ParserResult<Dataset> {
        match self.parser_for_path(path) {
            Ok(parser) => parser.parse_file(path),
            Err(_) => self.parse_with_autodiscovery(&std::fs::read(path)?),
        }
    }

    /// List all registered formats
    pub fn list_formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.parsers.keys().cloned().collect();
        formats.sort();
        formats
    }
}
