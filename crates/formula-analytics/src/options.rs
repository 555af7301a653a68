//! Evaluation options.
//!
//! Every aggregation entry point accepts `impl Into<EvalOptions>`, so callers can pass either a
//! bare [`Parallelism`] level or a fully configured [`EvalOptions`].

use crate::error::{AnalyticsError, AnalyticsResult};

/// Environment variable overriding the default [`Parallelism`] (`1`, `2` or `3`).
pub const PARALLELISM_ENV: &str = "FORMULA_ANALYTICS_PARALLELISM";

/// Environment variable overriding the default partition length.
pub const PARTITION_LEN_ENV: &str = "FORMULA_ANALYTICS_PARTITION_LEN";

pub const DEFAULT_PARTITION_LEN: usize = 1024;

/// Execution strategy for an aggregation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Parallelism {
    /// Level 1: everything runs on the calling thread.
    #[default]
    Sequential,
    /// Level 2: matrix entries are enumerated sequentially, but each pass over the collection is
    /// partitioned across the pool.
    PerPredicate,
    /// Level 3: matrix entries are themselves partitioned across the pool, and every worker also
    /// counts in parallel.
    Matrix,
}

impl Parallelism {
    pub fn level(self) -> u8 {
        match self {
            Parallelism::Sequential => 1,
            Parallelism::PerPredicate => 2,
            Parallelism::Matrix => 3,
        }
    }

    /// Whether a single pass over a collection should be partitioned.
    pub fn splits_collection(self) -> bool {
        !matches!(self, Parallelism::Sequential)
    }
}

impl TryFrom<u8> for Parallelism {
    type Error = AnalyticsError;

    fn try_from(level: u8) -> AnalyticsResult<Self> {
        match level {
            1 => Ok(Parallelism::Sequential),
            2 => Ok(Parallelism::PerPredicate),
            3 => Ok(Parallelism::Matrix),
            other => Err(AnalyticsError::InvalidParallelism(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalOptions {
    pub parallelism: Parallelism,
    /// Number of items handed to a worker at once when a pass is partitioned.
    pub partition_len: usize,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            parallelism: Parallelism::Sequential,
            partition_len: DEFAULT_PARTITION_LEN,
        }
    }
}

impl From<Parallelism> for EvalOptions {
    fn from(parallelism: Parallelism) -> Self {
        Self {
            parallelism,
            ..Self::default()
        }
    }
}

impl EvalOptions {
    pub fn new(parallelism: Parallelism) -> Self {
        parallelism.into()
    }

    pub fn with_partition_len(mut self, partition_len: usize) -> Self {
        self.partition_len = partition_len.max(1);
        self
    }

    /// Defaults overridden by [`PARALLELISM_ENV`] and [`PARTITION_LEN_ENV`].
    ///
    /// Malformed values are ignored rather than reported: the options only tune execution, they
    /// never change results.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(parallelism) = lookup(PARALLELISM_ENV)
            .and_then(|v| v.trim().parse::<u8>().ok())
            .and_then(|level| Parallelism::try_from(level).ok())
        {
            options.parallelism = parallelism;
        }

        if let Some(len) = lookup(PARTITION_LEN_ENV)
            .and_then(|v| v.trim().replace('_', "").parse::<usize>().ok())
            .filter(|&len| len > 0)
        {
            options.partition_len = len;
        }

        options
    }

    /// Partition length actually used for `len` items: never zero, never larger than needed.
    pub(crate) fn chunk_len(&self, len: usize) -> usize {
        self.partition_len.max(1).min(len.max(1))
    }
}
