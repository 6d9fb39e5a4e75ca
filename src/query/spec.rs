use serde::{Deserialize, Serialize};

use crate::dataset::Value;
use super::{QueryError, QueryResult};

/// Inclusive numeric interval. Open ends are stored as infinities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn at_least(min: f64) -> Self {
        Self::new(min, f64::INFINITY)
    }

    pub fn at_most(max: f64) -> Self {
        Self::new(f64::NEG_INFINITY, max)
    }

    pub fn unbounded() -> Self {
        Self::new(f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Smallest interval covering both
    pub fn hull(&self, other: &Bounds) -> Bounds {
        Bounds::new(self.min.min(other.min), self.max.max(other.max))
    }

    /// Checks `min <= max` with no NaN bound
    pub fn validate(&self, context: &str) -> QueryResult<()> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(QueryError::InvalidRange(format!(
                "{}: bounds must be numeric",
                context
            )));
        }
        if self.min > self.max {
            return Err(QueryError::InvalidRange(format!(
                "{}: min {} is greater than max {}",
                context, self.min, self.max
            )));
        }
        Ok(())
    }
}

/// A named interval within a range set, e.g. `driving_age = [16, 999]`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeBin {
    pub name: String,
    pub bounds: Bounds,
}

impl RangeBin {
    pub fn new(name: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            bounds: Bounds::new(min, max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Row matches when the column value is one of these
    Categorical(Vec<Value>),
    /// Row matches when the source column falls in any bin; bins keep
    /// declaration order
    Bins(Vec<RangeBin>),
    /// Plain inclusive range on the identically named column, no tagging
    Interval(Bounds),
}

impl Constraint {
    pub fn kind(&self) -> &'static str {
        match self {
            Constraint::Categorical(_) => "categorical",
            Constraint::Bins(_) => "range set",
            Constraint::Interval(_) => "interval",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub constraint: Constraint,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputOptions {
    pub axes: Vec<String>,
}

/// A simulator count output specification: which rows to keep and how to
/// group what survives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scos {
    pub variables: Vec<Variable>,
    pub output_options: OutputOptions,
}

impl Scos {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the constraint for `name`
    pub fn with_variable(mut self, name: impl Into<String>, constraint: Constraint) -> Self {
        let name = name.into();
        match self.variables.iter_mut().find(|v| v.name == name) {
            Some(existing) => existing.constraint = constraint,
            None => self.variables.push(Variable { name, constraint }),
        }
        self
    }

    pub fn with_categorical<V: Into<Value>>(
        self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with_variable(name, Constraint::Categorical(values))
    }

    pub fn with_bins(self, name: impl Into<String>, bins: Vec<RangeBin>) -> Self {
        self.with_variable(name, Constraint::Bins(bins))
    }

    pub fn with_interval(self, name: impl Into<String>, bounds: Bounds) -> Self {
        self.with_variable(name, Constraint::Interval(bounds))
    }

    pub fn with_axes<S: Into<String>>(mut self, axes: impl IntoIterator<Item = S>) -> Self {
        self.output_options.axes = axes.into_iter().map(Into::into).collect();
        self
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }
}

/// Maps a reserved SCOS variable onto the numeric column it filters and the
/// column that receives bin labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeVariable {
    pub variable: String,
    pub source_column: String,
    pub label_column: String,
}

impl RangeVariable {
    pub fn new(
        variable: impl Into<String>,
        source_column: impl Into<String>,
        label_column: impl Into<String>,
    ) -> Self {
        Self {
            variable: variable.into(),
            source_column: source_column.into(),
            label_column: label_column.into(),
        }
    }
}

pub fn default_range_variables() -> Vec<RangeVariable> {
    vec![
        RangeVariable::new("age_range", "integer_age", "age_range"),
        RangeVariable::new(
            "household_median_income",
            "household_median_income",
            "household_median_income",
        ),
    ]
}
