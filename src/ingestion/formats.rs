use serde_json::{Map, Value as JsonValue};

use super::parser::{DatasetParser, ParserError, ParserResult};
use crate::dataset::{Dataset, Value};
use crate::query::spec::{Bounds, Constraint, RangeBin, Scos};
use crate::query::QueryError;

/// Parser for delimited text line listings. Without a header row the
/// columns are named `column_1`, `column_2`, ...
pub struct CsvParser {
    delimiter: u8,
    has_headers: bool,
}

impl CsvParser {
    /// Creates a comma separated parser expecting a header row
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: true,
        }
    }

    /// Creates a parser for a custom single-byte delimiter
    pub fn with_delimiter(delimiter: u8) -> Self {
        Self {
            delimiter,
            ..Self::new()
        }
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetParser for CsvParser {
    fn parse(&self, input: &[u8]) -> ParserResult<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .has_headers(self.has_headers)
            .from_reader(input);

        let headers: Option<Vec<String>> = if self.has_headers {
            Some(reader.headers()?.iter().map(|h| h.to_string()).collect())
        } else {
            None
        };
        let mut records = reader.records().peekable();
        let columns = match headers {
            Some(headers) => headers,
            None => match records.peek() {
                Some(Ok(first)) => (1..=first.len()).map(|i| format!("column_{}", i)).collect(),
                _ => Vec::new(),
            },
        };
        if columns.is_empty() {
            return Err(ParserError::InvalidFormat("Missing header row".to_string()));
        }

        let mut dataset = Dataset::new(columns)?;
        for record in records {
            let record = record?;
            dataset.push_row(record.iter().map(Value::parse_cell).collect())?;
        }
        Ok(dataset)
    }

    fn supported_formats(&self) -> Vec<&'static str> {
        if self.delimiter == b'\t' {
            vec!["text/tab-separated-values", "tsv"]
        } else {
            vec!["text/csv", "csv"]
        }
    }
}

/// Parser for a JSON array of flat row objects. Column order is the order
/// keys are first seen; keys missing from a row read as null.
pub struct JsonRowsParser;

impl JsonRowsParser {
    pub fn new() -> Self {
        Self
    }

    fn cell(key: &str, value: &JsonValue) -> ParserResult<Value> {
        match value {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::Bool(b) => Ok(Value::Text(b.to_string())),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Ok(Value::Integer(i)),
                None => n.as_f64().map(Value::from).ok_or_else(|| {
                    ParserError::InvalidFieldType(format!("{} is not a representable number", key))
                }),
            },
            JsonValue::String(s) => Ok(Value::Text(s.clone())),
            _ => Err(ParserError::InvalidFieldType(format!(
                "{} must be a scalar",
                key
            ))),
        }
    }
}

impl Default for JsonRowsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetParser for JsonRowsParser {
    fn parse(&self, input: &[u8]) -> ParserResult<Dataset> {
        let value: JsonValue = serde_json::from_slice(input)
            .map_err(|e| ParserError::InvalidFormat(e.to_string()))?;

        let objects: Vec<&Map<String, JsonValue>> = match &value {
            JsonValue::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_object().ok_or_else(|| {
                        ParserError::InvalidFormat("Rows must be JSON objects".to_string())
                    })
                })
                .collect::<ParserResult<_>>()?,
            JsonValue::Object(obj) => vec![obj],
            _ => {
                return Err(ParserError::InvalidFormat(
                    "Input must be a JSON object or array".to_string(),
                ))
            }
        };

        let mut columns: Vec<String> = Vec::new();
        for obj in &objects {
            for key in obj.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }

        let mut dataset = Dataset::new(columns.clone())?;
        for obj in objects {
            let row = columns
                .iter()
                .map(|c| match obj.get(c) {
                    Some(v) => Self::cell(c, v),
                    None => Ok(Value::Null),
                })
                .collect::<ParserResult<Vec<_>>>()?;
            dataset.push_row(row)?;
        }
        Ok(dataset)
    }

    fn supported_formats(&self) -> Vec<&'static str> {
        vec!["application/json", "json"]
    }
}

const VARIABLES_KEYS: [&str; 2] = ["simulator_count_variables", "variables"];

/// Reads one specification or an array of them from JSON.
///
/// Bins keep document order. Bounds may be numbers, `null` (open) or the
/// strings `"-inf"` / `"inf"`.
pub fn read_scos_document(input: &[u8]) -> ParserResult<Vec<Scos>> {
    let value: JsonValue = serde_json::from_slice(input)
        .map_err(|e| ParserError::InvalidFormat(e.to_string()))?;

    match &value {
        JsonValue::Array(items) => items.iter().map(scos_from_json).collect(),
        JsonValue::Object(_) => Ok(vec![scos_from_json(&value)?]),
        _ => Err(ParserError::InvalidFormat(
            "Specification must be a JSON object or array".to_string(),
        )),
    }
}

fn scos_from_json(value: &JsonValue) -> ParserResult<Scos> {
    let obj = value.as_object().ok_or_else(|| {
        ParserError::InvalidFormat("Specification must be a JSON object".to_string())
    })?;

    let mut scos = Scos::new();

    if let Some(variables) = VARIABLES_KEYS.iter().find_map(|k| obj.get(*k)) {
        let variables = variables.as_object().ok_or_else(|| {
            ParserError::InvalidFieldType("variables must be an object".to_string())
        })?;
        for (name, constraint) in variables {
            scos = scos.with_variable(name.clone(), constraint_from_json(name, constraint)?);
        }
    }

    if let Some(options) = obj.get("output_options") {
        let axes = match options.get("axes") {
            None | Some(JsonValue::Null) => Vec::new(),
            Some(JsonValue::Array(items)) => items
                .iter()
                .map(|a| {
                    a.as_str().map(str::to_string).ok_or_else(|| {
                        ParserError::InvalidFieldType("axes must be strings".to_string())
                    })
                })
                .collect::<ParserResult<Vec<_>>>()?,
            Some(JsonValue::String(axis)) => vec![axis.clone()],
            Some(_) => {
                return Err(ParserError::InvalidFieldType(
                    "axes must be an array of strings".to_string(),
                ))
            }
        };
        scos = scos.with_axes(axes);
    }

    Ok(scos)
}

fn constraint_from_json(name: &str, value: &JsonValue) -> ParserResult<Constraint> {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .map(|v| JsonRowsParser::cell(name, v))
            .collect::<ParserResult<Vec<_>>>()
            .map(Constraint::Categorical),
        JsonValue::Object(entries) => {
            let all_scalar = entries
                .values()
                .all(|v| !matches!(v, JsonValue::Array(_) | JsonValue::Object(_)));
            if all_scalar && !entries.is_empty() {
                interval_from_json(name, entries).map(Constraint::Interval)
            } else {
                entries
                    .iter()
                    .map(|(bin, v)| bin_from_json(name, bin, v))
                    .collect::<ParserResult<Vec<_>>>()
                    .map(Constraint::Bins)
            }
        }
        JsonValue::Null => Err(ParserError::InvalidFieldType(format!(
            "{} has no constraint",
            name
        ))),
        scalar => Ok(Constraint::Categorical(vec![JsonRowsParser::cell(name, scalar)?])),
    }
}

/// `{"min": 30, "max": 40}`; prefixed keys such as `min_age` also count
fn interval_from_json(name: &str, entries: &Map<String, JsonValue>) -> ParserResult<Bounds> {
    let mut bounds = Bounds::unbounded();
    for (key, value) in entries {
        if key.starts_with("min") {
            bounds.min = bound_from_json(name, value, f64::NEG_INFINITY)?;
        } else if key.starts_with("max") {
            bounds.max = bound_from_json(name, value, f64::INFINITY)?;
        } else {
            return Err(QueryError::InvalidRange(format!(
                "{}: unexpected interval key {}",
                name, key
            ))
            .into());
        }
    }
    Ok(bounds)
}

/// Accepts `[min, max]`, `{"range": [min, max]}` or `{"min": .., "max": ..}`
fn bin_from_json(variable: &str, bin: &str, value: &JsonValue) -> ParserResult<RangeBin> {
    let context = format!("{}.{}", variable, bin);
    let bounds = match value {
        JsonValue::Array(pair) => pair_from_json(&context, pair)?,
        JsonValue::Object(obj) => match obj.get("range") {
            Some(JsonValue::Array(pair)) => pair_from_json(&context, pair)?,
            Some(_) => {
                return Err(QueryError::InvalidRange(format!(
                    "{}: range must be a [min, max] pair",
                    context
                ))
                .into())
            }
            None => interval_from_json(&context, obj)?,
        },
        _ => {
            return Err(QueryError::InvalidRange(format!(
                "{}: expected [min, max]",
                context
            ))
            .into())
        }
    };
    Ok(RangeBin {
        name: bin.to_string(),
        bounds,
    })
}

fn pair_from_json(context: &str, pair: &[JsonValue]) -> ParserResult<Bounds> {
    match pair {
        [min, max] => Ok(Bounds::new(
            bound_from_json(context, min, f64::NEG_INFINITY)?,
            bound_from_json(context, max, f64::INFINITY)?,
        )),
        _ => Err(QueryError::InvalidRange(format!(
            "{}: expected 2 bounds, got {}",
            context,
            pair.len()
        ))
        .into()),
    }
}

fn bound_from_json(context: &str, value: &JsonValue, open: f64) -> ParserResult<f64> {
    let bound = match value {
        JsonValue::Null => Some(open),
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok().filter(|b| !b.is_nan()),
        _ => None,
    };
    bound.ok_or_else(|| {
        QueryError::InvalidRange(format!("{}: bound {} is not numeric", context, value)).into()
    })
}
