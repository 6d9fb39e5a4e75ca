use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::Dataset;
use crate::metrics;
use super::aggregate::aggregate;
use super::filter::{filter_rows, FilterOptions};
use super::planner::{dedup_axes, QueryPlan, QueryPlanner};
use super::spec::{default_range_variables, RangeVariable, Scos};
use super::QueryResult;

pub use super::filter::OverlapPolicy;

/// Configuration for query execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Column holding the count measure
    pub count_column: String,
    /// Restrict to the bounding interval of all bins before per-bin filtering
    pub span_prepass: bool,
    /// Tagging of rows that fall into several bins
    pub overlap: OverlapPolicy,
    /// Order result rows by axis tuple
    pub sort_output: bool,
    /// Reserved range variables and the columns they read and write
    pub range_variables: Vec<RangeVariable>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            count_column: "count".to_string(),
            span_prepass: true,
            overlap: OverlapPolicy::Duplicate,
            sort_output: true,
            range_variables: default_range_variables(),
        }
    }
}

/// Runs specifications against datasets: filter, then aggregate.
#[derive(Debug, Clone, Default)]
pub struct ScosExecutor {
    config: ExecutionConfig,
}

impl ScosExecutor {
    pub fn new(config: ExecutionConfig) -> Self {
        Self { config }
    }

    /// Validates `scos` against `dataset` and compiles it into predicates
    pub fn plan(&self, scos: &Scos, dataset: &Dataset) -> QueryResult<QueryPlan> {
        QueryPlanner::new(
            self.config.range_variables.clone(),
            self.config.count_column.clone(),
        )
        .plan_query(scos, dataset)
    }

    /// Applies the WHERE half and returns the filtered, bin-labelled table
    pub fn filter(&self, scos: &Scos, dataset: &Dataset) -> QueryResult<Dataset> {
        let plan = self.plan(scos, dataset)?;
        self.filter_with_plan(&plan, dataset)
    }

    fn filter_with_plan(&self, plan: &QueryPlan, dataset: &Dataset) -> QueryResult<Dataset> {
        let options = FilterOptions {
            span_prepass: self.config.span_prepass,
            overlap: self.config.overlap,
        };
        let filtered = filter_rows(dataset, plan, options)?;
        metrics::record_rows_kept("filter", filtered.len() as u64);
        Ok(filtered)
    }

    /// Applies the SELECT half to an already filtered table
    pub fn aggregate(&self, scos: &Scos, filtered: &Dataset) -> QueryResult<Dataset> {
        self.aggregate_axes(&dedup_axes(&scos.output_options.axes), filtered)
    }

    fn aggregate_axes(&self, axes: &[String], filtered: &Dataset) -> QueryResult<Dataset> {
        let result = aggregate(
            filtered,
            axes,
            &self.config.count_column,
            self.config.sort_output,
        )?;
        metrics::record_groups(result.len() as u64);
        Ok(result)
    }

    /// Filter then aggregate
    pub fn execute(&self, scos: &Scos, dataset: &Dataset) -> QueryResult<Dataset> {
        let start = Instant::now();

        let plan = self.plan(scos, dataset)?;
        debug!(
            "planned {} predicates, range variable {:?}, axes {:?}",
            plan.predicates.len(),
            plan.range.as_ref().map(|r| r.variable.as_str()),
            plan.axes
        );

        let filtered = self.filter_with_plan(&plan, dataset)?;
        info!("Filter kept {} of {} rows", filtered.len(), dataset.len());
        if filtered.is_empty() {
            warn!("No rows matched the constraints");
        }

        let result = self.aggregate_axes(&plan.axes, &filtered)?;
        let elapsed = start.elapsed().as_secs_f64() * 1000.0;
        metrics::record_query(elapsed);
        info!("Aggregated into {} groups in {:.2} ms", result.len(), elapsed);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::query::spec::RangeBin;
    use crate::query::QueryError;

    fn line_listing() -> Dataset {
        let columns = ["sex", "infection_state", "integer_age", "count"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = vec![
            vec![Value::from("M"), Value::from("LATENT"), Value::Integer(20), Value::Integer(5)],
            vec![Value::from("F"), Value::from("LATENT"), Value::Integer(20), Value::Integer(3)],
            vec![Value::from("M"), Value::from("SUSCEPTIBLE"), Value::Integer(70), Value::Integer(10)],
        ];
        Dataset::from_rows(columns, rows).unwrap()
    }

    fn all_sick_by_sex() -> Scos {
        Scos::new()
            .with_categorical("infection_state", ["LATENT", "INFECTIOUS"])
            .with_categorical("sex", ["M", "F"])
            .with_axes(["sex"])
    }

    fn all_sick_by_age_range() -> Scos {
        Scos::new()
            .with_categorical("infection_state", ["LATENT", "INFECTIOUS", "SUSCEPTIBLE"])
            .with_bins(
                "age_range",
                vec![
                    RangeBin::new("driving_age", 16.0, 999.0),
                    RangeBin::new("voting_age", 18.0, 999.0),
                    RangeBin::new("retirement_age", 65.0, 999.0),
                ],
            )
            .with_axes(["age_range"])
    }

    #[test]
    fn test_end_to_end_by_sex() {
        let executor = ScosExecutor::default();
        let ds = line_listing();

        let filtered = executor.filter(&all_sick_by_sex(), &ds).unwrap();
        assert_eq!(filtered.rows(), &ds.rows()[..2]);

        let result = executor.execute(&all_sick_by_sex(), &ds).unwrap();
        assert_eq!(result.len(), 2);
        let count_for = |sex: &str| {
            result
                .rows()
                .iter()
                .find(|r| r[0] == Value::from(sex))
                .map(|r| r[1].clone())
        };
        assert_eq!(count_for("M"), Some(Value::Integer(5)));
        assert_eq!(count_for("F"), Some(Value::Integer(3)));
    }

    #[test]
    fn test_end_to_end_by_age_range() {
        let executor = ScosExecutor::default();
        let result = executor.execute(&all_sick_by_age_range(), &line_listing()).unwrap();

        assert_eq!(
            result.rows(),
            &[
                vec![Value::from("driving_age"), Value::Integer(18)],
                vec![Value::from("retirement_age"), Value::Integer(10)],
                vec![Value::from("voting_age"), Value::Integer(18)],
            ][..]
        );
    }

    #[test]
    fn test_filter_then_aggregate_matches_execute() {
        let executor = ScosExecutor::default();
        let ds = line_listing();
        let scos = all_sick_by_age_range();

        let filtered = executor.filter(&scos, &ds).unwrap();
        let staged = executor.aggregate(&scos, &filtered).unwrap();
        assert_eq!(staged, executor.execute(&scos, &ds).unwrap());
    }

    #[test]
    fn test_first_match_config() {
        let executor = ScosExecutor::new(ExecutionConfig {
            overlap: OverlapPolicy::FirstMatch,
            ..ExecutionConfig::default()
        });
        let result = executor.execute(&all_sick_by_age_range(), &line_listing()).unwrap();
        assert_eq!(
            result.rows(),
            &[vec![Value::from("driving_age"), Value::Integer(18)]][..]
        );
    }

    #[test]
    fn test_custom_count_column() {
        let ds = Dataset::from_rows(
            vec!["sex".to_string(), "n".to_string()],
            vec![
                vec![Value::from("M"), Value::Integer(2)],
                vec![Value::from("M"), Value::Integer(3)],
            ],
        )
        .unwrap();
        let executor = ScosExecutor::new(ExecutionConfig {
            count_column: "n".to_string(),
            ..ExecutionConfig::default()
        });
        let result = executor.execute(&Scos::new().with_axes(["sex"]), &ds).unwrap();
        assert_eq!(result.columns(), &["sex".to_string(), "n".to_string()][..]);
        assert_eq!(result.rows()[0][1], Value::Integer(5));
    }

    #[test]
    fn test_errors_abort_the_run() {
        let executor = ScosExecutor::default();
        let ds = line_listing();

        let unknown = Scos::new().with_categorical("species", ["human"]);
        assert!(matches!(
            executor.execute(&unknown, &ds),
            Err(QueryError::UnknownColumn(_))
        ));

        let missing_axis = Scos::new().with_axes(["age_range"]);
        assert!(matches!(
            executor.execute(&missing_axis, &ds),
            Err(QueryError::MissingAxisColumn(_))
        ));

        // aggregating a table filtered without a range constraint
        let filtered = executor.filter(&all_sick_by_sex(), &ds).unwrap();
        assert!(matches!(
            executor.aggregate(&all_sick_by_age_range(), &filtered),
            Err(QueryError::MissingAxisColumn(_))
        ));
    }

    #[test]
    fn test_income_bins_replace_income_values() {
        let ds = Dataset::from_rows(
            vec!["household_median_income".to_string(), "count".to_string()],
            vec![
                vec![Value::Integer(25000), Value::Integer(1)],
                vec![Value::Integer(60000), Value::Integer(2)],
                vec![Value::from("unknown"), Value::Integer(4)],
            ],
        )
        .unwrap();
        let scos = Scos::new()
            .with_bins(
                "household_median_income",
                vec![
                    RangeBin::new("low", 0.0, 30000.0),
                    RangeBin::new("any", 0.0, 1e9),
                ],
            )
            .with_axes(["household_median_income"]);
        let executor = ScosExecutor::default();

        let filtered = executor.filter(&scos, &ds).unwrap();
        assert_eq!(filtered.columns(), ds.columns());
        assert_eq!(filtered.len(), 3);
        assert!(filtered
            .rows()
            .iter()
            .all(|r| r[0] == Value::from("low") || r[0] == Value::from("any")));

        let result = executor.execute(&scos, &ds).unwrap();
        assert_eq!(
            result.rows(),
            &[
                vec![Value::from("any"), Value::Integer(3)],
                vec![Value::from("low"), Value::Integer(1)],
            ][..]
        );
    }

    #[test]
    fn test_signed_zero_members_group_together() {
        use crate::ingestion::DatasetParser;

        let ds = crate::ingestion::CsvParser::new()
            .parse(b"x,count\n0,1\n-0.0,2\n1,8\n")
            .unwrap();
        let scos = Scos::new().with_categorical("x", ["0"]).with_axes(["x"]);
        let result = ScosExecutor::default().execute(&scos, &ds).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.value(0, "count"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_count_column_axis_is_a_spec_error() {
        let scos = Scos::new().with_axes(["count"]);
        assert!(matches!(
            ScosExecutor::default().execute(&scos, &line_listing()),
            Err(QueryError::InvalidCount(_))
        ));
    }

    #[test]
    fn test_empty_result_is_not_an_error() {
        let executor = ScosExecutor::default();
        let scos = Scos::new()
            .with_categorical("infection_state", ["RECOVERED"])
            .with_axes(["sex"]);
        let result = executor.execute(&scos, &line_listing()).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.columns(), &["sex".to_string(), "count".to_string()][..]);
    }
}
