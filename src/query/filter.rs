//! Row filter: the WHERE half of a specification.
//!
//! Categorical and interval predicates are applied as a conjunction. The
//! active range variable, if any, then keeps rows inside the union of its
//! bins and stamps each surviving row with the bin it fell into. With the
//! default [`OverlapPolicy::Duplicate`] a row inside several overlapping
//! bins is emitted once per bin, each copy tagged differently.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{Dataset, Value};
use super::planner::{in_bounds, Predicate, QueryPlan, RangePlan};
use super::QueryResult;

/// How rows inside more than one bin are tagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// One copy per matching bin
    #[default]
    Duplicate,
    /// Only the first matching bin in declaration order
    FirstMatch,
}

#[derive(Debug, Clone, Copy)]
pub struct FilterOptions {
    pub span_prepass: bool,
    pub overlap: OverlapPolicy,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            span_prepass: true,
            overlap: OverlapPolicy::Duplicate,
        }
    }
}

/// Keeps rows satisfying every predicate. Order of predicates does not
/// affect the result.
pub fn apply_predicates(dataset: &Dataset, predicates: &[Predicate]) -> Dataset {
    dataset.filter_rows(|row| predicates.iter().all(|p| p.matches(row)))
}

/// Keeps rows inside the union of the plan's bins and labels them
pub fn apply_range(
    dataset: &Dataset,
    range: &RangePlan,
    options: FilterOptions,
) -> QueryResult<Dataset> {
    let idx = range.source_index;

    let limited = match (options.span_prepass, range.span()) {
        (true, Some(span)) => {
            debug!(
                "{} span is {} to {}",
                range.variable, span.min, span.max
            );
            dataset.filter_rows(|row| in_bounds(row.get(idx), &span))
        }
        _ => dataset.clone(),
    };

    // Empty result that already carries the label column
    let mut out = limited
        .filter_rows(|_| false)
        .with_constant_column(&range.label_column, Value::Null);

    for (position, bin) in range.bins.iter().enumerate() {
        debug!(
            "{} bin is {} to {}",
            bin.name, bin.bounds.min, bin.bounds.max
        );
        let earlier = &range.bins[..position];
        let matched = limited.filter_rows(|row| {
            let value = row.get(idx);
            if !in_bounds(value, &bin.bounds) {
                return false;
            }
            match options.overlap {
                OverlapPolicy::Duplicate => true,
                OverlapPolicy::FirstMatch => !earlier.iter().any(|b| in_bounds(value, &b.bounds)),
            }
        });
        debug!("{} bin kept {} rows", bin.name, matched.len());

        let tagged = matched.with_constant_column(&range.label_column, Value::from(bin.name.as_str()));
        out.append(tagged)?;
    }

    Ok(out)
}

/// Runs the whole row filter for a plan
pub fn filter_rows(dataset: &Dataset, plan: &QueryPlan, options: FilterOptions) -> QueryResult<Dataset> {
    let filtered = apply_predicates(dataset, &plan.predicates);
    debug!(
        "categorical filters kept {} of {} rows",
        filtered.len(),
        dataset.len()
    );

    match &plan.range {
        Some(range) => apply_range(&filtered, range, options),
        None => Ok(filtered),
    }
}
