use thiserror::Error;

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("pivot arity mismatch: {pivot_fns} pivot functions but {value_lists} value lists")]
    ArityMismatch { pivot_fns: usize, value_lists: usize },

    #[error("pivot {index} pairs a {function} function with {values} values")]
    PivotShapeMismatch {
        index: usize,
        function: &'static str,
        values: &'static str,
    },

    #[error("invalid parallelism level {0} (expected 1, 2 or 3)")]
    InvalidParallelism(u8),

    #[error("pivot entries {first} and {second} share the label {label}")]
    DuplicateLabel {
        label: String,
        first: usize,
        second: usize,
    },

    #[error("pivot matrix of shape {shape:?} has more entries than fit in usize")]
    MatrixTooLarge { shape: Vec<usize> },

    #[error("unknown pivot label: {0}")]
    UnknownLabel(String),
}
