//! scos-extract - Simulator count output extraction
//!
//! This crate filters and aggregates epidemiological simulation output
//! according to a simulator count output specification (SCOS): categorical
//! and numeric-range constraints select rows, output axes group them, and
//! counts are summed per group.

pub mod dataset;
pub mod ingestion;
pub mod query;
pub mod output;
pub mod config;
pub mod metrics;
