//! Ingestion module for scos-extract
//! Loads simulator output and specifications from their serialized forms.

pub mod formats;
pub mod parser;
pub mod registry;

pub use formats::{read_scos_document, CsvParser, JsonRowsParser};
pub use parser::{DatasetParser, ParserError, ParserResult};
pub use registry::{ParserRegistry, Priority, RegistryError};
