use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DataError {
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("Invalid column name: {0}")]
    InvalidColumnName(String),
    #[error("Row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Column mismatch: expected [{expected}], got [{actual}]")]
    ColumnMismatch { expected: String, actual: String },
}

/// A single cell of a dataset.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Parses a string as a number, rejecting NaN.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

impl Value {
    /// Types a raw text cell: empty is `Null`, then integer, then float,
    /// anything else stays text.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Value::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Value::from(f),
            _ => Value::Text(raw.to_string()),
        }
    }

    /// Numeric view of the cell. Text is accepted when it parses as a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => parse_number(s),
            Value::Null => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    /// Negative zero is stored as zero so it groups with `0`.
    fn from(f: f64) -> Self {
        Value::Float(f + 0.0)
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (a, b) if a.rank() == 1 && b.rank() == 1 => {
                // Mixed integer/float comparison, -0.0 equals 0.0
                let (x, y) = (a.as_number().unwrap_or(0.0), b.as_number().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or_else(|| x.total_cmp(&y))
            }
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
        }
    }
}

/// One row, aligned with the owning dataset's columns.
pub type Row = Vec<Value>;

/// An in-memory, row oriented table with named columns.
///
/// Every transformation returns a new `Dataset`; nothing mutates the input
/// table in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Creates an empty dataset with the given columns
    pub fn new(columns: Vec<String>) -> Result<Self, DataError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if column.trim().is_empty() {
                return Err(DataError::InvalidColumnName(
                    "Column name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(DataError::DuplicateColumn(column.clone()));
            }
        }

        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Creates a dataset and fills it with rows
    pub fn from_rows(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, DataError> {
        let mut dataset = Self::new(columns)?;
        for row in rows {
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends a row, checking its width against the header
    pub fn push_row(&mut self, row: Row) -> Result<(), DataError> {
        if row.len() != self.columns.len() {
            return Err(DataError::RowWidth {
                row: self.rows.len(),
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Looks up a single cell by row position and column name
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Returns a new dataset holding only the rows accepted by `keep`
    pub fn filter_rows<F>(&self, keep: F) -> Dataset
    where
        F: Fn(&[Value]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    /// Returns a copy with `name` set to `value` on every row. The column is
    /// appended when missing and overwritten when present.
    pub fn with_constant_column(&self, name: &str, value: Value) -> Dataset {
        let mut out = self.clone();
        match out.column_index(name) {
            Some(idx) => {
                for row in &mut out.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                out.columns.push(name.to_string());
                for row in &mut out.rows {
                    row.push(value.clone());
                }
            }
        }
        out
    }

    /// Concatenates the rows of `other`, which must have identical columns
    pub fn append(&mut self, other: Dataset) -> Result<(), DataError> {
        if self.columns != other.columns {
            return Err(DataError::ColumnMismatch {
                expected: self.columns.join(","),
                actual: other.columns.join(","),
            });
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &rendered {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.len());
            }
        }

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect();
        writeln!(f, "{}", header.join("  ").trim_end())?;

        for row in &rendered {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:<width$}", c, width = w))
                .collect();
            writeln!(f, "{}", line.join("  ").trim_end())?;
        }

        write!(f, "({} rows)", self.rows.len())
    }
}
