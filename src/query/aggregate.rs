//! Aggregator: the SELECT half of a specification. Groups rows by the full
//! axis tuple and sums the count column per group.

use std::collections::BTreeMap;

use crate::dataset::{Dataset, Row, Value};
use super::{QueryError, QueryResult};

/// Running count total. Stays integral until a float shows up.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Sum {
    Integer(i64),
    Float(f64),
}

impl Sum {
    fn add(self, value: &Value, row: usize) -> QueryResult<Sum> {
        let sum = match (self, value) {
            (sum, Value::Null) => sum,
            (Sum::Integer(acc), Value::Integer(i)) => match acc.checked_add(*i) {
                Some(total) => Sum::Integer(total),
                None => Sum::Float(acc as f64 + *i as f64),
            },
            (Sum::Integer(acc), Value::Float(f)) => Sum::Float(acc as f64 + f),
            (Sum::Float(acc), Value::Integer(i)) => Sum::Float(acc + *i as f64),
            (Sum::Float(acc), Value::Float(f)) => Sum::Float(acc + f),
            (sum, Value::Text(s)) => match Value::parse_cell(s) {
                typed @ (Value::Integer(_) | Value::Float(_)) => sum.add(&typed, row)?,
                _ => {
                    return Err(QueryError::InvalidCount(format!(
                        "row {} has non-numeric count {:?}",
                        row, s
                    )))
                }
            },
        };
        Ok(sum)
    }

    fn into_value(self) -> Value {
        match self {
            Sum::Integer(i) => Value::Integer(i),
            Sum::Float(f) => Value::Float(f),
        }
    }
}

fn column_index(dataset: &Dataset, column: &str) -> QueryResult<usize> {
    dataset
        .column_index(column)
        .ok_or_else(|| QueryError::MissingAxisColumn(column.to_string()))
}

/// Groups `dataset` by `axes` and sums `count_column` per group.
///
/// The result has the axis columns in the given order followed by the count
/// column. With no axes the result is a single row holding the grand total,
/// even for an empty input. When `sort` is set, groups come out ordered by
/// axis tuple, otherwise in first-seen order.
pub fn aggregate(
    dataset: &Dataset,
    axes: &[String],
    count_column: &str,
    sort: bool,
) -> QueryResult<Dataset> {
    let axis_indexes = axes
        .iter()
        .map(|axis| column_index(dataset, axis))
        .collect::<QueryResult<Vec<_>>>()?;
    let count_index = column_index(dataset, count_column)?;
    if axes.iter().any(|axis| axis == count_column) {
        return Err(QueryError::InvalidCount(format!(
            "count column {} cannot be an output axis",
            count_column
        )));
    }

    let mut groups: Vec<(Row, Sum)> = Vec::new();
    let mut lookup: BTreeMap<Row, usize> = BTreeMap::new();

    if axes.is_empty() {
        groups.push((Vec::new(), Sum::Integer(0)));
        lookup.insert(Vec::new(), 0);
    }

    for (row_number, row) in dataset.rows().iter().enumerate() {
        let key: Row = axis_indexes.iter().map(|&i| row[i].clone()).collect();
        let slot = match lookup.get(&key) {
            Some(&slot) => slot,
            None => {
                groups.push((key.clone(), Sum::Integer(0)));
                lookup.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        let entry = &mut groups[slot];
        entry.1 = entry.1.add(&row[count_index], row_number)?;
    }

    if sort {
        groups.sort_by(|a, b| a.0.cmp(&b.0));
    }

    let mut columns = axes.to_vec();
    columns.push(count_column.to_string());
    let mut result = Dataset::new(columns)?;
    for (mut key, sum) in groups {
        key.push(sum.into_value());
        result.push_row(key)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn filtered() -> Dataset {
        let columns = axes(&["sex", "simulator_time", "age_range", "count"]);
        let rows = vec![
            vec![Value::from("M"), Value::Integer(1), Value::from("voting_age"), Value::Integer(5)],
            vec![Value::from("F"), Value::Integer(1), Value::from("voting_age"), Value::Integer(3)],
            vec![Value::from("M"), Value::Integer(2), Value::from("voting_age"), Value::Integer(7)],
            vec![Value::from("M"), Value::Integer(1), Value::from("driving_age"), Value::Integer(5)],
            vec![Value::from("F"), Value::Integer(2), Value::from("driving_age"), Value::Null],
        ];
        Dataset::from_rows(columns, rows).unwrap()
    }

    fn total(ds: &Dataset) -> f64 {
        let idx = ds.column_index("count").unwrap();
        ds.rows().iter().filter_map(|r| r[idx].as_number()).sum()
    }

    #[test]
    fn test_group_by_single_axis() {
        let out = aggregate(&filtered(), &axes(&["sex"]), "count", true).unwrap();
        assert_eq!(out.columns(), &axes(&["sex", "count"])[..]);
        assert_eq!(
            out.rows(),
            &[
                vec![Value::from("F"), Value::Integer(3)],
                vec![Value::from("M"), Value::Integer(17)],
            ][..]
        );
    }

    #[test]
    fn test_signed_zero_shares_a_group() {
        let ds = Dataset::from_rows(
            axes(&["x", "count"]),
            vec![
                vec![Value::parse_cell("-0.0"), Value::Integer(2)],
                vec![Value::parse_cell("0"), Value::Integer(1)],
            ],
        )
        .unwrap();
        let out = aggregate(&ds, &axes(&["x"]), "count", true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.value(0, "count"), Some(&Value::Integer(3)));
        assert_eq!(out.value(0, "x").map(|v| v.to_string()), Some("0".to_string()));
    }

    #[test]
    fn test_count_column_as_axis_is_rejected() {
        assert!(matches!(
            aggregate(&filtered(), &axes(&["sex", "count"]), "count", true),
            Err(QueryError::InvalidCount(_))
        ));
    }

    #[test]
    fn test_first_seen_order_when_unsorted() {
        let out = aggregate(&filtered(), &axes(&["sex"]), "count", false).unwrap();
        assert_eq!(out.value(0, "sex"), Some(&Value::from("M")));
        assert_eq!(out.value(1, "sex"), Some(&Value::from("F")));
    }

    #[test]
    fn test_count_is_conserved() {
        let input = filtered();
        for axis_set in [
            axes(&[]),
            axes(&["sex"]),
            axes(&["age_range", "sex"]),
            axes(&["simulator_time", "age_range", "sex"]),
        ] {
            let out = aggregate(&input, &axis_set, "count", true).unwrap();
            assert_eq!(total(&out), total(&input), "axes {:?}", axis_set);
        }
    }

    #[test]
    fn test_axis_column_order_follows_request() {
        let out = aggregate(&filtered(), &axes(&["age_range", "sex"]), "count", true).unwrap();
        assert_eq!(out.columns(), &axes(&["age_range", "sex", "count"])[..]);
        assert_eq!(out.len(), 4);
        assert_eq!(
            out.rows()[0],
            vec![Value::from("driving_age"), Value::from("F"), Value::Integer(0)]
        );
    }

    #[test]
    fn test_empty_axes_single_row() {
        let out = aggregate(&filtered(), &[], "count", true).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.columns(), &axes(&["count"])[..]);
        assert_eq!(out.rows()[0], vec![Value::Integer(20)]);

        let empty = filtered().filter_rows(|_| false);
        let out = aggregate(&empty, &[], "count", true).unwrap();
        assert_eq!(out.rows()[0], vec![Value::Integer(0)]);
    }

    #[test]
    fn test_empty_input_with_axes_has_no_rows() {
        let empty = filtered().filter_rows(|_| false);
        let out = aggregate(&empty, &axes(&["sex"]), "count", true).unwrap();
        assert!(out.is_empty());
        assert_eq!(out.columns(), &axes(&["sex", "count"])[..]);
    }

    #[test]
    fn test_missing_axis_column() {
        let result = aggregate(&filtered(), &axes(&["integer_age"]), "count", true);
        assert!(matches!(
            result,
            Err(QueryError::MissingAxisColumn(a)) if a == "integer_age"
        ));

        let result = aggregate(&filtered(), &axes(&["sex"]), "n", true);
        assert!(matches!(result, Err(QueryError::MissingAxisColumn(a)) if a == "n"));
    }

    #[test]
    fn test_float_counts_and_bad_counts() {
        let ds = Dataset::from_rows(
            axes(&["sex", "count"]),
            vec![
                vec![Value::from("M"), Value::Integer(1)],
                vec![Value::from("M"), Value::Float(0.5)],
                vec![Value::from("M"), Value::from("2")],
            ],
        )
        .unwrap();
        let out = aggregate(&ds, &axes(&["sex"]), "count", true).unwrap();
        assert_eq!(out.rows()[0][1], Value::Float(3.5));

        let bad = Dataset::from_rows(
            axes(&["sex", "count"]),
            vec![vec![Value::from("M"), Value::from("many")]],
        )
        .unwrap();
        assert!(matches!(
            aggregate(&bad, &axes(&["sex"]), "count", true),
            Err(QueryError::InvalidCount(_))
        ));
    }
}
