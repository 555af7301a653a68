//! Evaluating pivots and pivot matrices against a collection.
//!
//! Result maps carry counts only, so memory stays bounded for large matrices; the records behind
//! an entry are recovered on demand with [`get_result_set_from_matrix`].
//!
//! Three strategies are available (see [`Parallelism`]) and all of them produce the same, sorted
//! [`ResultMap`]:
//! - `Sequential`: entries are enumerated and counted on the calling thread.
//! - `PerPredicate`: entries are enumerated in order, each count is partitioned over the pool.
//! - `Matrix`: entry ordinals are partitioned over the pool, each worker counts in parallel too,
//!   and the partial maps are merged key-wise.

use crate::count::{collect_with, count_with};
use crate::error::{AnalyticsError, AnalyticsResult};
use crate::group::{NamedPredicate, PivotFn, PivotValues};
use crate::matrix::{PivotMatrix, PivotSpec};
use crate::options::{EvalOptions, Parallelism};
use crate::parallel::fork_join_range;
use crate::predicate::Predicate;
use crate::result::{ResultEntry, ResultMap};
use crate::value::Value;
use std::ops::Range;

/// Matrix entries handed to a worker at once under [`Parallelism::Matrix`]. Each entry is a full
/// pass over the collection, so small batches balance better than the record partition length.
const MATRIX_BATCH_LEN: usize = 8;

/// A matrix entry together with the records it matched.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSet<'a, R = Value> {
    pub label: String,
    pub pivot_values: Vec<Value>,
    pub ordinal: usize,
    pub records: Vec<&'a R>,
}

impl<R> MatchSet<'_, R> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Counts a single pivot: one entry per pivot value, labelled `"{label}-{value}"`.
pub fn pivot<R>(
    collection: &[R],
    label: &str,
    base: Vec<Predicate<R>>,
    pivot_fn: PivotFn<R>,
    pivot_values: PivotValues,
    options: impl Into<EvalOptions>,
) -> AnalyticsResult<ResultMap>
where
    R: Sync + 'static,
{
    pivot_matrix(
        collection,
        &PivotSpec::pivot(label, base, pivot_fn, pivot_values),
        options,
    )
}

/// Builds the matrix described by `spec` and counts every entry.
pub fn pivot_matrix<R>(
    collection: &[R],
    spec: &PivotSpec<R>,
    options: impl Into<EvalOptions>,
) -> AnalyticsResult<ResultMap>
where
    R: Sync + 'static,
{
    let matrix = spec.build()?;
    Ok(evaluate_matrix(collection, &matrix, options))
}

fn count_range<R>(
    collection: &[R],
    matrix: &PivotMatrix<R>,
    ordinals: Range<usize>,
    options: EvalOptions,
) -> ResultMap
where
    R: Sync + 'static,
{
    let mut out = ResultMap::with_capacity(ordinals.len());
    for ordinal in ordinals {
        let Some(entry) = matrix.get(ordinal) else {
            continue;
        };
        let count = count_with(collection, &entry.predicate, options);
        out.insert(ResultEntry::from_named(entry, count, ordinal));
    }
    out
}

/// Counts every entry of `matrix`; the result is sorted descending by count.
pub fn evaluate_matrix<R>(
    collection: &[R],
    matrix: &PivotMatrix<R>,
    options: impl Into<EvalOptions>,
) -> ResultMap
where
    R: Sync + 'static,
{
    let options = options.into();
    log::debug!(
        "evaluating pivot matrix {} ({} entries) over {} records at level {}",
        matrix.label(),
        matrix.len(),
        collection.len(),
        options.parallelism.level()
    );

    let result = match options.parallelism {
        Parallelism::Sequential | Parallelism::PerPredicate => {
            count_range(collection, matrix, 0..matrix.len(), options)
        }
        Parallelism::Matrix => fork_join_range(matrix.len(), MATRIX_BATCH_LEN, |ordinals| {
            log::trace!("counting matrix entries {ordinals:?}");
            count_range(collection, matrix, ordinals, options)
        }),
    };
    result.sorted()
}

fn collect_range<'a, R>(
    collection: &'a [R],
    matrix: &PivotMatrix<R>,
    ordinals: Range<usize>,
    options: EvalOptions,
) -> Vec<MatchSet<'a, R>>
where
    R: Sync + 'static,
{
    ordinals
        .filter_map(|ordinal| {
            let entry = matrix.get(ordinal)?;
            let records = collect_with(collection, &entry.predicate, options);
            Some(MatchSet {
                label: entry.label.clone(),
                pivot_values: entry.pivot_values().to_vec(),
                ordinal,
                records,
            })
        })
        .collect()
}

/// Like [`evaluate_matrix`], but keeps the matched records of every entry.
///
/// Sets are ordered by size, largest first, ties by ordinal. Within a set, records are in
/// collection order.
pub fn pivot_matrix_sets<'a, R>(
    collection: &'a [R],
    matrix: &PivotMatrix<R>,
    options: impl Into<EvalOptions>,
) -> Vec<MatchSet<'a, R>>
where
    R: Sync + 'static,
{
    let options = options.into();
    let mut sets = match options.parallelism {
        Parallelism::Sequential | Parallelism::PerPredicate => {
            collect_range(collection, matrix, 0..matrix.len(), options)
        }
        Parallelism::Matrix => fork_join_range(matrix.len(), MATRIX_BATCH_LEN, |ordinals| {
            collect_range(collection, matrix, ordinals, options)
        }),
    };
    sets.sort_by(|a, b| b.len().cmp(&a.len()).then(a.ordinal.cmp(&b.ordinal)));
    sets
}

/// Re-evaluates the entry labelled `label` and returns the records it matches, in collection
/// order.
///
/// The entry is located through the coordinates recorded in `result_map` when available, and by
/// scanning the matrix labels otherwise.
pub fn get_result_set_from_matrix<'a, R, V>(
    collection: &'a [R],
    matrix: &PivotMatrix<R>,
    result_map: &ResultMap<V>,
    label: &str,
) -> AnalyticsResult<Vec<&'a R>>
where
    R: Sync + 'static,
{
    let recalled = result_map
        .get(label)
        .and_then(|entry| matrix.get_at(&entry.coordinates))
        .filter(|entry| entry.label == label);

    let entry: NamedPredicate<R> = match recalled {
        Some(entry) => entry,
        None => matrix
            .find(label)
            .ok_or_else(|| AnalyticsError::UnknownLabel(label.to_string()))?,
    };

    Ok(collect_with(collection, &entry.predicate, Parallelism::Sequential))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{field, field_equals, is_record, number};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn logs() -> Vec<Value> {
        [
            json!({"method": "GET", "status": 200, "ms": 12}),
            json!({"method": "GET", "status": 200, "ms": 40}),
            json!({"method": "GET", "status": 500, "ms": 900}),
            json!({"method": "POST", "status": 200, "ms": 30}),
            json!({"method": "POST", "status": 500, "ms": 700}),
            json!({"method": "POST", "status": 500, "ms": 650}),
            json!({"method": "PUT", "status": 200, "ms": 5}),
            json!("malformed line"),
        ]
        .into_iter()
        .map(Value::from)
        .collect()
    }

    fn field_pivot(key: &'static str) -> PivotFn {
        PivotFn::single(move |v: &Value| field_equals(key, v.clone()))
    }

    fn spec() -> PivotSpec {
        PivotSpec::matrix(
            "log",
            vec![is_record()],
            vec![field_pivot("method"), field_pivot("status")],
            vec![
                PivotValues::single(["GET", "POST", "PUT"]),
                PivotValues::single([200, 500]),
            ],
        )
    }

    #[test]
    fn counts_are_sorted_descending_with_stable_ties() {
        let result = pivot_matrix(&logs(), &spec(), Parallelism::Sequential).unwrap();
        assert_eq!(
            result.to_pairs(),
            vec![
                ("log-pivots_[GET|200]", &2),
                ("log-pivots_[POST|500]", &2),
                ("log-pivots_[GET|500]", &1),
                ("log-pivots_[POST|200]", &1),
                ("log-pivots_[PUT|200]", &1),
                ("log-pivots_[PUT|500]", &0),
            ]
        );
        let top = result.iter().next().unwrap();
        assert_eq!(top.pivot_values, vec![Value::from("GET"), Value::from(200)]);
        assert_eq!(top.coordinates, vec![0, 0]);
    }

    #[test]
    fn all_levels_agree() {
        let logs = logs();
        let expected = pivot_matrix(&logs, &spec(), Parallelism::Sequential).unwrap();
        for level in [Parallelism::PerPredicate, Parallelism::Matrix] {
            let options = EvalOptions::new(level).with_partition_len(2);
            assert_eq!(pivot_matrix(&logs, &spec(), options).unwrap(), expected);
        }
    }

    #[test]
    fn legacy_pivot_labels() {
        let result = pivot(
            &logs(),
            "method",
            vec![field("ms", number(|ms| ms < 100.0))],
            field_pivot("method"),
            PivotValues::single(["GET", "POST", "PUT"]),
            Parallelism::Sequential,
        )
        .unwrap();
        assert_eq!(
            result.to_pairs(),
            vec![("method-GET", &2), ("method-POST", &1), ("method-PUT", &1)]
        );
    }

    #[test]
    fn result_sets_are_recalled_by_label() {
        let logs = logs();
        let matrix = spec().build().unwrap();
        let result = evaluate_matrix(&logs, &matrix, Parallelism::Sequential);

        let slow_posts =
            get_result_set_from_matrix(&logs, &matrix, &result, "log-pivots_[POST|500]").unwrap();
        assert_eq!(slow_posts, vec![&logs[4], &logs[5]]);

        // Labels missing from the result map are still found in the matrix.
        let empty = ResultMap::<u64>::new();
        let puts =
            get_result_set_from_matrix(&logs, &matrix, &empty, "log-pivots_[PUT|200]").unwrap();
        assert_eq!(puts, vec![&logs[6]]);

        assert_eq!(
            get_result_set_from_matrix(&logs, &matrix, &result, "log-pivots_[PATCH|200]"),
            Err(AnalyticsError::UnknownLabel("log-pivots_[PATCH|200]".to_string()))
        );
    }

    #[test]
    fn match_sets_follow_counts() {
        let logs = logs();
        let matrix = spec().build().unwrap();
        let counts = evaluate_matrix(&logs, &matrix, Parallelism::Sequential);

        for level in [Parallelism::Sequential, Parallelism::Matrix] {
            let sets = pivot_matrix_sets(&logs, &matrix, level);
            let summary: Vec<(&str, u64)> = sets
                .iter()
                .map(|s| (s.label.as_str(), s.len() as u64))
                .collect();
            let expected: Vec<(&str, u64)> =
                counts.iter().map(|e| (e.label.as_str(), e.value)).collect();
            assert_eq!(summary, expected);
        }
    }

    #[test]
    fn arity_mismatch_is_reported_before_evaluation() {
        let mut spec = spec();
        spec.pivot_fns.pop();
        assert_eq!(
            pivot_matrix(&logs(), &spec, Parallelism::Matrix),
            Err(AnalyticsError::ArityMismatch {
                pivot_fns: 1,
                value_lists: 2,
            })
        );
    }
}
