//! Fork-join helpers: partition, map each partition, reduce the partial results.
//!
//! Partial results are combined with a pure merge function whose identity element is explicit
//! (see [`Merge`]), so the same code path serves sequential folds and Rayon's tree reductions,
//! which may invoke the reducer with the identity on either side.

use std::ops::Range;

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::prelude::*;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use rayon::ThreadPool;
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
use std::sync::OnceLock;

/// An associative, commutative combination with an identity element.
///
/// Implementations must satisfy, for all `a`, `b`, `c`:
/// - `Self::empty().merge(a) == a` and `a.merge(Self::empty()) == a`
/// - `a.merge(b) == b.merge(a)` (up to entry order for ordered containers)
/// - `a.merge(b).merge(c) == a.merge(b.merge(c))`
pub trait Merge: Sized {
    fn empty() -> Self;

    fn merge(self, other: Self) -> Self;

    /// Folds any number of partial results, including none at all.
    fn merge_all<I: IntoIterator<Item = Self>>(parts: I) -> Self {
        parts.into_iter().fold(Self::empty(), Self::merge)
    }
}

impl<T> Merge for Vec<T> {
    fn empty() -> Self {
        Vec::new()
    }

    fn merge(mut self, mut other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        self.append(&mut other);
        self
    }
}

/// Best-effort Rayon thread pool for use inside the analytics engine.
///
/// We build and use a crate-local pool instead of Rayon's global one so pool construction
/// failures can be handled: if no pool can be created, callers fall back to single-threaded
/// execution.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
static RAYON_POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn desired_rayon_threads() -> usize {
    let from_env = std::env::var("RAYON_NUM_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|&n| n > 0);
    from_env.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    })
}

#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn build_rayon_pool() -> Option<ThreadPool> {
    let requested = desired_rayon_threads().max(1);
    let try_build = |n| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("formula-analytics-{i}"))
            .build()
    };

    match try_build(requested) {
        Ok(pool) => Some(pool),
        Err(err) if requested > 1 => {
            log::warn!(
                "failed to build a {requested}-thread pool ({err}); retrying with one thread"
            );
            try_build(1).ok()
        }
        Err(err) => {
            log::warn!("failed to build a thread pool ({err}); evaluating sequentially");
            None
        }
    }
}

/// Returns the crate-local Rayon thread pool, if one could be created.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
fn rayon_pool() -> Option<&'static ThreadPool> {
    RAYON_POOL.get_or_init(build_rayon_pool).as_ref()
}

/// Splits `items` into chunks of `chunk_len`, maps every chunk and reduces the partials.
///
/// Falls back to a sequential left fold when the `parallel` feature is off or no pool exists.
pub(crate) fn fork_join<'a, T, A, M, I, R>(
    items: &'a [T],
    chunk_len: usize,
    map: M,
    identity: I,
    reduce: R,
) -> A
where
    T: Sync,
    A: Send,
    M: Fn(&'a [T]) -> A + Sync + Send,
    I: Fn() -> A + Sync + Send,
    R: Fn(A, A) -> A + Sync + Send,
{
    let chunk_len = chunk_len.max(1);

    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if let Some(pool) = rayon_pool() {
            return pool.install(|| {
                items
                    .par_chunks(chunk_len)
                    .map(&map)
                    .reduce(&identity, &reduce)
            });
        }
    }

    items.chunks(chunk_len).map(map).fold(identity(), reduce)
}

/// [`fork_join`] over partial results that implement [`Merge`].
pub(crate) fn fork_join_merge<'a, T, A, M>(items: &'a [T], chunk_len: usize, map: M) -> A
where
    T: Sync,
    A: Merge + Send,
    M: Fn(&'a [T]) -> A + Sync + Send,
{
    fork_join(items, chunk_len, map, A::empty, A::merge)
}

/// Like [`fork_join_merge`], but partitions the index range `0..len` instead of a slice.
///
/// Used when the work items are generated on demand (e.g. pivot matrix entries).
pub(crate) fn fork_join_range<A, M>(len: usize, chunk_len: usize, map: M) -> A
where
    A: Merge + Send,
    M: Fn(Range<usize>) -> A + Sync + Send,
{
    let chunk_len = chunk_len.max(1);
    let chunks = len.div_ceil(chunk_len);
    let bounds = move |chunk: usize| chunk * chunk_len..((chunk + 1) * chunk_len).min(len);

    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if let Some(pool) = rayon_pool() {
            return pool.install(|| {
                (0..chunks)
                    .into_par_iter()
                    .map(|chunk| map(bounds(chunk)))
                    .reduce(A::empty, A::merge)
            });
        }
    }

    (0..chunks)
        .map(|chunk| map(bounds(chunk)))
        .fold(A::empty(), A::merge)
}
