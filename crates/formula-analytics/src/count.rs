//! Counting and collecting matches over a collection.

use crate::options::EvalOptions;
use crate::parallel::{fork_join, fork_join_merge};
use crate::predicate::Predicate;
use std::ops::Add;

/// Number of elements of `collection` satisfying `predicate`.
pub fn count_with<R>(
    collection: &[R],
    predicate: &Predicate<R>,
    options: impl Into<EvalOptions>,
) -> u64
where
    R: Sync,
{
    count_with_by(collection, predicate, 0u64, |total, _| total + 1, options)
}

/// Folds `incrementer` over the elements satisfying `predicate`, starting from `initial`.
///
/// Partitioned evaluation folds every partition from `T::default()`, sums the partials and adds
/// `initial` once, so it agrees with the sequential fold whenever `incrementer` has the shape
/// `total + f(element)`.
pub fn count_with_by<R, T, F>(
    collection: &[R],
    predicate: &Predicate<R>,
    initial: T,
    incrementer: F,
    options: impl Into<EvalOptions>,
) -> T
where
    R: Sync,
    T: Add<Output = T> + Default + Send,
    F: Fn(T, &R) -> T + Sync + Send,
{
    let options = options.into();
    let fold = |init: T, chunk: &[R]| {
        chunk.iter().fold(init, |total, record| {
            if predicate.test(record) {
                incrementer(total, record)
            } else {
                total
            }
        })
    };

    if !options.parallelism.splits_collection() {
        return fold(initial, collection);
    }

    let partial = fork_join(
        collection,
        options.chunk_len(collection.len()),
        |chunk| fold(T::default(), chunk),
        T::default,
        |a, b| a + b,
    );
    initial + partial
}

/// The elements of `collection` satisfying `predicate`.
///
/// Partitioned evaluation concatenates per-partition matches. Callers must only rely on the
/// multiset of returned elements, not on their order.
pub fn collect_with<'a, R>(
    collection: &'a [R],
    predicate: &Predicate<R>,
    options: impl Into<EvalOptions>,
) -> Vec<&'a R>
where
    R: Sync,
{
    let options = options.into();
    let matches = |chunk: &'a [R]| -> Vec<&'a R> {
        chunk.iter().filter(|r| predicate.test(r)).collect()
    };

    if !options.parallelism.splits_collection() {
        return matches(collection);
    }

    fork_join_merge(collection, options.chunk_len(collection.len()), matches)
}
