//! Predicate-driven aggregation over in-memory record collections.
//!
//! Records are usually [`Value`]s (scalars, lists and string-keyed records, typically loaded from
//! JSON), but every aggregation is generic over the record type. Counting, pivots, pivot matrices
//! and value-frequency tables all run on a crate-local fork-join pool when the `parallel` feature
//! is enabled; results are identical at every [`Parallelism`] level.
//!
//! ```
//! use formula_analytics::{
//!     field_equals, is_record, pivot_matrix, Parallelism, PivotFn, PivotSpec, PivotValues, Value,
//! };
//! use serde_json::json;
//!
//! let logs: Vec<Value> = vec![
//!     json!({"method": "GET", "status": 200}).into(),
//!     json!({"method": "GET", "status": 500}).into(),
//!     json!({"method": "GET", "status": 200}).into(),
//! ];
//! let by = |key: &'static str| PivotFn::single(move |v: &Value| field_equals(key, v.clone()));
//! let spec = PivotSpec::matrix(
//!     "log",
//!     vec![is_record()],
//!     vec![by("method"), by("status")],
//!     vec![PivotValues::single(["GET"]), PivotValues::single([200, 500])],
//! );
//!
//! let result = pivot_matrix(&logs, &spec, Parallelism::Matrix).unwrap();
//! assert_eq!(
//!     result.to_pairs(),
//!     vec![("log-pivots_[GET|200]", &2), ("log-pivots_[GET|500]", &1)]
//! );
//! ```

#![forbid(unsafe_code)]

mod compare;
mod count;
mod error;
mod evaluate;
mod frequency;
mod group;
mod matrix;
mod options;
mod parallel;
pub mod predicate;
mod result;
mod value;

pub use crate::error::{AnalyticsError, AnalyticsResult};
pub use crate::options::{
    EvalOptions, Parallelism, DEFAULT_PARTITION_LEN, PARALLELISM_ENV, PARTITION_LEN_ENV,
};
pub use crate::parallel::Merge;
pub use crate::value::{Record, Value};

pub use crate::predicate::{
    all, any, field, field_equals, integer, is_bool, is_even, is_integer, is_list, is_null,
    is_number, is_odd, is_record, is_text, none, not, number, path, take_until, text, until,
    Predicate,
};

pub use crate::count::{collect_with, count_with, count_with_by};
pub use crate::frequency::{
    collect_value_frequencies, collect_value_frequencies_for, merge_value_frequencies,
    sort_value_frequencies, value_frequencies, FrequencyMap, KeyFilter, Tally,
};

pub use crate::group::{
    build_pivot_group, combine_with_base, LabelStyle, NamedPredicate, PivotFn, PivotGroup,
    PivotMeta, PivotValues,
};
pub use crate::matrix::{build_matrix, build_pivot_groups_matrix, PivotMatrix, PivotSpec};

pub use crate::evaluate::{
    evaluate_matrix, get_result_set_from_matrix, pivot, pivot_matrix, pivot_matrix_sets, MatchSet,
};
pub use crate::result::{filter_pivots, filter_pivots_by, ResultEntry, ResultMap};

pub use crate::compare::{compare_map_with, difference, pivot_compare, ratio};
/// Comparing pivot matrices is the same operation as comparing single pivots.
pub use crate::compare::pivot_compare as pivot_matrix_compare;
