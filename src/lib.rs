//! # neuroglm — design matrices for Poisson GLMs of spiking activity
//!
//! `neuroglm` turns a behavioural trial table and a session's spike trains
//! into the sparse design matrix of an encoding model: every trial is cut
//! into fixed-width bins, every registered covariate (event impulses,
//! boxcar windows, explicit regressors) is convolved with its temporal
//! basis, and the per-trial blocks are stacked into one CSR matrix ready for
//! an external Poisson-regression solver.
//!
//! ## Pipeline overview
//!
//! ```text
//! trial table + spike_times + spike_clusters
//!   │
//!   ├─ trials::normalize      kinds checked, NaN trials dropped,
//!   │                         spikes sliced per trial, units filtered
//!   ├─ CovariateBuilder       add_covariate_timing / _boxcar / add_covariate
//!   │    └─ build()           → immutable CovariateSet (column ranges fixed)
//!   ├─ design::compile        per trial: zero block, convbasis per covariate,
//!   │                         compress to CSR; stack in trial order
//!   └─ response               spike counts per bin, row-aligned
//!        │
//!        └─→ DesignMatrix { CSR, row_trial, column ranges }  +  BinnedSpikes
//! ```
//!
//! ## Quick start
//!
//! ```
//! use std::collections::BTreeMap;
//! use neuroglm::{Amplitude, ColumnValues, CovariateOptions, GlmConfig, NeuralGlm, TrialTable};
//! use neuroglm::basis::nonlinear_raised_cosine;
//!
//! let table = TrialTable::new(vec![0.0, 1.5, 3.0], vec![1.2, 2.9, 4.1])
//!     .with_column("stimOn_times", ColumnValues::Scalars(vec![0.20, 0.31, 0.18]))
//!     .with_column("contrast",     ColumnValues::Scalars(vec![1.0, 0.25, 0.5]));
//! let vartypes: BTreeMap<String, String> = [
//!     ("stimOn_times".to_string(), "timing".to_string()),
//!     ("contrast".to_string(),     "value".to_string()),
//! ].into_iter().collect();
//!
//! let spike_times = [0.25, 0.3, 1.9, 3.4];
//! let spike_clusters = [2, 2, 2, 5];
//! let cfg = GlmConfig { min_trials: 1, ..GlmConfig::default() };
//! let glm = NeuralGlm::new(&table, &vartypes, &spike_times, &spike_clusters, cfg).unwrap();
//!
//! let bases = nonlinear_raised_cosine(5, 0.02, (0.0, 0.3), 0.05);
//! let mut covs = glm.covariates();
//! covs.add_covariate_timing(
//!     "stimOn", "stimOn_times", bases, Amplitude::Column("contrast".into()),
//!     CovariateOptions::default().description("stimulus onset, contrast-scaled"),
//! ).unwrap();
//! let set = covs.build();
//!
//! let dm = glm.compile(&set).unwrap();
//! assert_eq!(dm.n_columns(), 5);
//! assert_eq!(dm.n_rows(), glm.binned_spikes().counts.nrows());
//! ```

pub mod basis;
pub mod config;
pub mod convolve;
pub mod covariate;
pub mod design;
pub mod error;
pub mod io;
pub mod model;
pub mod response;
pub mod sparse;
pub mod trials;

// ── Crate-root re-exports ─────────────────────────────────────────────────

// config
pub use config::{DuplicateLabels, GlmConfig};

// error
pub use error::{GlmError, Result};

// trials
pub use trials::{
    normalize, ColumnKind, ColumnValues, NormalizeWarning, Trial, TrialField, TrialSet,
    TrialTable, UnitSummary,
};

// covariates
pub use covariate::{
    Amplitude, Covariate, CovariateBuilder, CovariateOptions, CovariateSet, Regressor,
    ValidTrials, Validity,
};

// convolution + assembly
pub use convolve::{conv_full, convbasis, denseconv};
pub use design::{compile, DesignMatrix};
pub use sparse::CsrMatrix;

// model + response
pub use model::NeuralGlm;
pub use response::{binned_spikes, BinnedSpikes};

// io
pub use io::{write_design, SessionFile, StWriter};
