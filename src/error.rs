//! Error types for neuroglm.
//!
//! Variants fall into three groups: configuration errors (a request that
//! does not fit the declared trial table), data-integrity errors (inputs that
//! contradict each other) and unsupported features. Data-quality problems
//! that can be recovered per trial are not errors; see
//! [`crate::trials::NormalizeWarning`].

use thiserror::Error;

/// Neuroglm error type
#[derive(Debug, Error)]
pub enum GlmError {
    /// A column kind string outside `timing` / `continuous` / `value`.
    #[error("unknown kind {kind:?} declared for column {column:?}")]
    UnknownColumnKind { column: String, kind: String },

    /// A trial-table column with no entry in the kind map.
    #[error("column {0:?} has no declared kind")]
    UndeclaredColumn(String),

    /// A column referenced by name that the trial table does not have.
    #[error("column {0:?} not found in trial table")]
    UnknownColumn(String),

    /// A column used in a way its declared kind does not allow.
    #[error("column {column:?} is {actual}, expected {expected}")]
    WrongColumnKind {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A column whose values do not have the shape its kind requires.
    #[error("column {column:?}: {reason}")]
    ColumnShape { column: String, reason: String },

    /// A bin width that is zero, negative or not finite.
    #[error("binwidth must be a positive finite number of seconds, got {0}")]
    InvalidBinwidth(f64),

    /// Registration of a label that already exists, under `DuplicateLabels::Reject`.
    #[error("covariate {0:?} is already registered")]
    DuplicateLabel(String),

    /// Spike times and cluster ids of different lengths.
    #[error("spike times ({times}) and cluster ids ({clusters}) differ in length")]
    SpikeLengthMismatch { times: usize, clusters: usize },

    /// Spike times not sorted in non-decreasing order.
    #[error("spike times are not sorted (first violation at index {0})")]
    UnsortedSpikes(usize),

    /// `trial_start` and `trial_end` of different lengths.
    #[error("trial_start ({starts}) and trial_end ({ends}) differ in length")]
    TrialBoundsMismatch { starts: usize, ends: usize },

    /// Trial whose end precedes its start.
    #[error("trial {trial} ends ({end}) before it starts ({start})")]
    InvertedTrial { trial: usize, start: f64, end: f64 },

    /// Regressor vectors whose length differs from the trial bin count.
    #[error("covariate {label:?}: regressor length does not match bin count on trials {trials:?}")]
    RegressorLength { label: String, trials: Vec<usize> },

    /// Per-trial data labelled with trials that differ from the trial table.
    #[error("{what}: trial ids do not match the trial table")]
    IndexMismatch { what: String },

    /// Event times falling outside their trial.
    #[error("covariate {label:?}: event outside trial on trials {trials:?}")]
    EventOutOfRange { label: String, trials: Vec<usize> },

    /// Array shapes that cannot be combined.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// A basis matrix with no time steps or no columns.
    #[error("covariate {0:?}: basis matrix is empty")]
    EmptyBasis(String),

    /// Feature that exists in the API but is not implemented yet.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

pub type Result<T> = std::result::Result<T, GlmError>;
