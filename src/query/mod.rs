//! Query module for scos-extract
//! Turns a simulator count output specification into a typed plan, then
//! filters and aggregates a dataset with it.

pub mod spec;
pub mod validator;
pub mod planner;
pub mod filter;
pub mod aggregate;
pub mod executor;

use thiserror::Error;

use crate::dataset::DataError;

pub use spec::{Bounds, Constraint, OutputOptions, RangeBin, RangeVariable, Scos, Variable};
pub use executor::{ExecutionConfig, OverlapPolicy, ScosExecutor};

/// Error type for query operations
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("Missing axis column: {0}")]
    MissingAxisColumn(String),
    #[error("Invalid count value: {0}")]
    InvalidCount(String),
    #[error("Dataset error: {0}")]
    Data(#[from] DataError),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
