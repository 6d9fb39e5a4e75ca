//! Result table sinks.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use thiserror::Error;

use crate::dataset::Dataset;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type OutputResult<T> = Result<T, OutputError>;

/// Writes the header then every row. Nulls become empty fields.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W, delimiter: u8) -> OutputResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    writer.write_record(dataset.columns())?;
    for row in dataset.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_csv_file(dataset: &Dataset, path: &Path, delimiter: u8) -> OutputResult<()> {
    let file = File::create(path)?;
    write_csv(dataset, file, delimiter)
}
