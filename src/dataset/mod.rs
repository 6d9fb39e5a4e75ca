//! Dataset module for scos-extract
//! In-memory tables of simulator output that queries run against.

pub mod table;

pub use table::{parse_number, DataError, Dataset, Row, Value};
