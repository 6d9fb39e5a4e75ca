use std::collections::HashSet;

use crate::dataset::Dataset;
use super::spec::{Constraint, RangeVariable, Scos, Variable};
use super::{QueryError, QueryResult};

/// Column information for validation
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub columns: HashSet<String>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            columns: dataset.columns().iter().cloned().collect(),
        }
    }

    pub fn add_column(&mut self, column: String) {
        self.columns.insert(column);
    }

    pub fn validate_column(&self, column: &str) -> QueryResult<()> {
        if !self.columns.contains(column) {
            return Err(QueryError::UnknownColumn(column.to_string()));
        }
        Ok(())
    }
}

/// Checks a specification against a dataset schema before anything runs.
/// A malformed specification aborts instead of silently skipping a filter.
pub struct ScosValidator {
    range_variables: Vec<RangeVariable>,
    schema: Schema,
    count_column: Option<String>,
}

impl ScosValidator {
    pub fn new(range_variables: Vec<RangeVariable>) -> Self {
        Self {
            range_variables,
            schema: Schema::new(),
            count_column: None,
        }
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// The measure column is summed, so it cannot also be an axis
    pub fn with_count_column(mut self, column: impl Into<String>) -> Self {
        self.count_column = Some(column.into());
        self
    }

    pub fn range_variable(&self, name: &str) -> Option<&RangeVariable> {
        self.range_variables.iter().find(|r| r.variable == name)
    }

    pub fn validate(&self, scos: &Scos) -> QueryResult<()> {
        let mut active_range: Option<&str> = None;

        for variable in &scos.variables {
            match self.range_variable(&variable.name) {
                Some(range) => {
                    if let Some(other) = active_range {
                        return Err(QueryError::InvalidRange(format!(
                            "only one range variable may be active, got {} and {}",
                            other, variable.name
                        )));
                    }
                    active_range = Some(variable.name.as_str());
                    self.validate_range_variable(variable, range)?;
                }
                None => self.validate_column_variable(variable)?,
            }
        }

        self.validate_axes(scos, active_range)
    }

    fn validate_range_variable(&self, variable: &Variable, range: &RangeVariable) -> QueryResult<()> {
        let bins = match &variable.constraint {
            Constraint::Bins(bins) => bins,
            other => {
                return Err(QueryError::InvalidRange(format!(
                    "{} expects a range set, got a {} constraint",
                    variable.name,
                    other.kind()
                )))
            }
        };

        self.schema.validate_column(&range.source_column)?;

        let mut names = HashSet::new();
        for bin in bins {
            bin.bounds
                .validate(&format!("{}.{}", variable.name, bin.name))?;
            if !names.insert(bin.name.as_str()) {
                return Err(QueryError::InvalidRange(format!(
                    "{} declares bin {} twice",
                    variable.name, bin.name
                )));
            }
        }
        Ok(())
    }

    fn validate_column_variable(&self, variable: &Variable) -> QueryResult<()> {
        match &variable.constraint {
            Constraint::Bins(_) => Err(QueryError::InvalidRange(format!(
                "{} is not a range variable and cannot take named bins",
                variable.name
            ))),
            Constraint::Interval(bounds) => {
                self.schema.validate_column(&variable.name)?;
                bounds.validate(&variable.name)
            }
            // An empty value set is allowed and matches nothing
            Constraint::Categorical(_) => self.schema.validate_column(&variable.name),
        }
    }

    /// Axes must exist once filtering is done, which includes the label
    /// column of the active range variable.
    fn validate_axes(&self, scos: &Scos, active_range: Option<&str>) -> QueryResult<()> {
        let label = active_range
            .and_then(|name| self.range_variable(name))
            .map(|r| r.label_column.as_str());

        for axis in &scos.output_options.axes {
            if Some(axis.as_str()) == self.count_column.as_deref() {
                return Err(QueryError::InvalidCount(format!(
                    "count column {} cannot be an output axis",
                    axis
                )));
            }
            if !self.schema.columns.contains(axis) && Some(axis.as_str()) != label {
                return Err(QueryError::MissingAxisColumn(axis.clone()));
            }
        }
        Ok(())
    }
}
