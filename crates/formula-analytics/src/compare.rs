//! Comparing the same pivot specification across two collections.
//!
//! Comparator outputs only need to be [`Ord`]. Ratios and other floating point scores go through
//! [`OrderedFloat`]; [`ratio`] and [`difference`] cover the common cases.

use crate::error::AnalyticsResult;
use crate::evaluate::evaluate_matrix;
use crate::matrix::PivotSpec;
use crate::options::EvalOptions;
use crate::result::{ResultEntry, ResultMap};
use ordered_float::OrderedFloat;

/// `a / b`. A zero denominator yields `+inf` for a positive numerator and `0` when both are zero.
pub fn ratio(a: u64, b: u64) -> OrderedFloat<f64> {
    match (a, b) {
        (0, 0) => OrderedFloat(0.0),
        (_, 0) => OrderedFloat(f64::INFINITY),
        (a, b) => OrderedFloat(a as f64 / b as f64),
    }
}

/// `a - b`, saturating at the bounds of `i64`.
pub fn difference(a: u64, b: u64) -> i64 {
    (i128::from(a) - i128::from(b)).clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64
}

/// Applies `compare_fn(a, b)` to every label present in either map.
///
/// A label missing from one side contributes `A::default()` (a count of 0) for that side. Entries
/// keep the pivot metadata of the map they were found in first (`a`, then `b`), and the result is
/// sorted descending by comparator output.
pub fn compare_map_with<A, V, F>(
    a: &ResultMap<A>,
    b: &ResultMap<A>,
    compare_fn: F,
) -> ResultMap<V>
where
    A: Copy + Default,
    V: Ord,
    F: Fn(A, A) -> V,
{
    let mut out = ResultMap::with_capacity(a.len().max(b.len()));
    let mut push = |entry: &ResultEntry<A>, value: V| {
        out.insert(ResultEntry {
            label: entry.label.clone(),
            value,
            pivot_values: entry.pivot_values.clone(),
            coordinates: entry.coordinates.clone(),
            ordinal: entry.ordinal,
        });
    };

    for entry in a.iter() {
        let other = b.value(&entry.label).copied().unwrap_or_default();
        push(entry, compare_fn(entry.value, other));
    }
    for entry in b.iter().filter(|e| !a.contains(&e.label)) {
        push(entry, compare_fn(A::default(), entry.value));
    }

    out.sorted()
}

/// Evaluates `spec` on both collections and compares the counts label by label.
///
/// The matrix is built once and shared by both evaluations, so identical labels always denote
/// identical predicates.
pub fn pivot_compare<R, V, F>(
    collection_a: &[R],
    collection_b: &[R],
    spec: &PivotSpec<R>,
    compare_fn: F,
    options: impl Into<EvalOptions>,
) -> AnalyticsResult<ResultMap<V>>
where
    R: Sync + 'static,
    V: Ord,
    F: Fn(u64, u64) -> V,
{
    let options = options.into();
    let matrix = spec.build()?;
    log::debug!(
        "comparing pivot {} over {} and {} records",
        matrix.label(),
        collection_a.len(),
        collection_b.len()
    );
    let a = evaluate_matrix(collection_a, &matrix, options);
    let b = evaluate_matrix(collection_b, &matrix, options);
    Ok(compare_map_with(&a, &b, compare_fn))
}
