use std::collections::HashSet;

use crate::dataset::{parse_number, Dataset, Value};
use super::spec::{Bounds, Constraint, RangeBin, RangeVariable, Scos};
use super::validator::{Schema, ScosValidator};
use super::{QueryError, QueryResult};

/// Allowed values of a categorical constraint. Members that read as numbers
/// compare numerically, the rest compare as exact strings.
#[derive(Debug, Clone, Default)]
pub struct MemberSet {
    numbers: Vec<f64>,
    texts: HashSet<String>,
    null: bool,
}

impl MemberSet {
    pub fn from_values(values: &[Value]) -> Self {
        let mut set = Self::default();
        for value in values {
            match value {
                Value::Null => set.null = true,
                Value::Integer(i) => set.numbers.push(*i as f64),
                Value::Float(f) => set.numbers.push(*f),
                Value::Text(s) => match parse_number(s) {
                    Some(n) => set.numbers.push(n),
                    None => {
                        set.texts.insert(s.clone());
                    }
                },
            }
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty() && self.texts.is_empty() && !self.null
    }

    pub fn contains(&self, value: &Value) -> bool {
        match value {
            Value::Null => self.null,
            Value::Text(s) if self.texts.contains(s) => true,
            other => other
                .as_number()
                .map_or(false, |n| self.numbers.iter().any(|m| *m == n)),
        }
    }
}

/// Typed row predicate over a single column
#[derive(Debug, Clone)]
pub enum Predicate {
    In {
        column: String,
        index: usize,
        members: MemberSet,
    },
    Between {
        column: String,
        index: usize,
        bounds: Bounds,
    },
}

impl Predicate {
    pub fn column(&self) -> &str {
        match self {
            Predicate::In { column, .. } | Predicate::Between { column, .. } => column,
        }
    }

    pub fn matches(&self, row: &[Value]) -> bool {
        match self {
            Predicate::In { index, members, .. } => {
                row.get(*index).map_or(false, |v| members.contains(v))
            }
            Predicate::Between { index, bounds, .. } => in_bounds(row.get(*index), bounds),
        }
    }
}

/// A fully unbounded interval keeps every row, numeric or not.
pub fn in_bounds(value: Option<&Value>, bounds: &Bounds) -> bool {
    if bounds.is_unbounded() {
        return true;
    }
    value
        .and_then(Value::as_number)
        .map_or(false, |n| bounds.contains(n))
}

/// Range-set filtering for the single active range variable
#[derive(Debug, Clone)]
pub struct RangePlan {
    pub variable: String,
    pub source_column: String,
    pub source_index: usize,
    pub label_column: String,
    pub bins: Vec<RangeBin>,
}

impl RangePlan {
    /// Bounding interval of all bins, `None` when there are no bins
    pub fn span(&self) -> Option<Bounds> {
        self.bins
            .iter()
            .map(|b| b.bounds)
            .reduce(|acc, b| acc.hull(&b))
    }
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    pub range: Option<RangePlan>,
    pub axes: Vec<String>,
    pub count_column: String,
}

impl QueryPlan {
    /// Columns present after filtering
    pub fn output_columns(&self, input: &Dataset) -> Vec<String> {
        let mut columns = input.columns().to_vec();
        if let Some(range) = &self.range {
            if !columns.contains(&range.label_column) {
                columns.push(range.label_column.clone());
            }
        }
        columns
    }
}

pub struct QueryPlanner {
    range_variables: Vec<RangeVariable>,
    count_column: String,
}

impl QueryPlanner {
    pub fn new(range_variables: Vec<RangeVariable>, count_column: impl Into<String>) -> Self {
        Self {
            range_variables,
            count_column: count_column.into(),
        }
    }

    pub fn plan_query(&self, scos: &Scos, dataset: &Dataset) -> QueryResult<QueryPlan> {
        ScosValidator::new(self.range_variables.clone())
            .with_schema(Schema::from_dataset(dataset))
            .with_count_column(self.count_column.clone())
            .validate(scos)?;

        let mut predicates = Vec::new();
        let mut range = None;

        for variable in &scos.variables {
            if let Some(rv) = self.range_variables.iter().find(|r| r.variable == variable.name) {
                if let Constraint::Bins(bins) = &variable.constraint {
                    range = Some(RangePlan {
                        variable: variable.name.clone(),
                        source_column: rv.source_column.clone(),
                        source_index: column_index(dataset, &rv.source_column)?,
                        label_column: rv.label_column.clone(),
                        bins: bins.clone(),
                    });
                }
                continue;
            }

            let index = column_index(dataset, &variable.name)?;
            let predicate = match &variable.constraint {
                Constraint::Categorical(values) => Predicate::In {
                    column: variable.name.clone(),
                    index,
                    members: MemberSet::from_values(values),
                },
                Constraint::Interval(bounds) => Predicate::Between {
                    column: variable.name.clone(),
                    index,
                    bounds: *bounds,
                },
                Constraint::Bins(_) => {
                    return Err(QueryError::InvalidRange(format!(
                        "{} is not a range variable",
                        variable.name
                    )))
                }
            };
            predicates.push(predicate);
        }

        Ok(QueryPlan {
            predicates,
            range,
            axes: dedup_axes(&scos.output_options.axes),
            count_column: self.count_column.clone(),
        })
    }
}

fn column_index(dataset: &Dataset, column: &str) -> QueryResult<usize> {
    dataset
        .column_index(column)
        .ok_or_else(|| QueryError::UnknownColumn(column.to_string()))
}

/// Keeps first occurrence order
pub(crate) fn dedup_axes(axes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    axes.iter()
        .filter(|a| seen.insert(a.as_str()))
        .cloned()
        .collect()
}
