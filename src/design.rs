//! Design-matrix assembly.
//!
//! # Algorithm
//! For every trial, independently:
//! 1. Allocate a zero block of `n_bins × n_columns`.
//! 2. For every covariate valid on this trial, write its contribution into
//!    its column range: the raw regressor for covariates without a basis,
//!    otherwise [`convbasis`] of the regressor with the basis.
//! 3. Compress the block to CSR.
//!
//! Blocks are then stacked in trial-table order. Because trials have
//! different bin counts, the row → trial mapping is carried explicitly
//! alongside the matrix.
//!
//! With the `parallel` feature the per-trial work runs on the rayon pool;
//! blocks are still stacked in trial order, so the result is identical.
use std::ops::Range;

use ndarray::{s, Array2, Axis};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::config::GlmConfig;
use crate::convolve::convbasis;
use crate::covariate::CovariateSet;
use crate::error::{GlmError, Result};
use crate::sparse::CsrMatrix;
use crate::trials::{Trial, TrialSet};

/// Compiled design matrix with its row and column bookkeeping.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    matrix: CsrMatrix,
    row_trial: Vec<usize>,
    trial_rows: Vec<(usize, Range<usize>)>,
    columns: Vec<(String, Range<usize>)>,
}

impl DesignMatrix {
    /// The sparse matrix, `total bins × total columns`.
    pub fn matrix(&self) -> &CsrMatrix {
        &self.matrix
    }

    pub fn n_rows(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.matrix.ncols()
    }

    /// Trial id of every row.
    pub fn row_trial(&self) -> &[usize] {
        &self.row_trial
    }

    /// `(trial id, row range)` per trial, in row order.
    pub fn trial_rows(&self) -> &[(usize, Range<usize>)] {
        &self.trial_rows
    }

    /// `(label, column range)` per covariate, in registration order.
    pub fn columns(&self) -> &[(String, Range<usize>)] {
        &self.columns
    }

    /// Column range of covariate `label`.
    pub fn columns_of(&self, label: &str) -> Option<Range<usize>> {
        self.columns.iter().find(|(l, _)| l == label).map(|(_, r)| r.clone())
    }

    /// Row range of trial `id`.
    pub fn rows_of(&self, id: usize) -> Option<Range<usize>> {
        self.trial_rows.iter().find(|(t, _)| *t == id).map(|(_, r)| r.clone())
    }

    /// Dense copy of trial `id`'s block.
    pub fn trial_block(&self, id: usize) -> Option<Array2<f64>> {
        self.rows_of(id).map(|rows| self.matrix.dense_rows(rows))
    }

    pub fn into_matrix(self) -> CsrMatrix {
        self.matrix
    }
}

/// Build the design matrix for `covariates` over `trials`.
///
/// # Errors
///
/// [`GlmError::InvalidBinwidth`] for a bad `cfg`;
/// [`GlmError::IndexMismatch`] when `covariates` was built against a
/// different trial set; [`GlmError::RegressorLength`], listing every
/// affected trial, when `cfg` bins the trials differently from the
/// configuration used at registration. Nothing is returned on error.
pub fn compile(trials: &TrialSet, covariates: &CovariateSet, cfg: &GlmConfig) -> Result<DesignMatrix> {
    cfg.validate()?;
    if !trials.ids().eq(covariates.trial_ids().iter().copied()) {
        return Err(GlmError::IndexMismatch { what: "covariate set".into() });
    }
    for cov in covariates.iter() {
        let bad: Vec<usize> = trials
            .trials()
            .iter()
            .enumerate()
            .filter(|&(pos, trial)| {
                !matches!(cov.regressor.at(pos),
                    Some((id, reg)) if id == trial.id && reg.len() == cfg.bin_count(trial.duration))
            })
            .map(|(_, trial)| trial.id)
            .collect();
        if !bad.is_empty() {
            return Err(GlmError::RegressorLength { label: cov.label.clone(), trials: bad });
        }
    }
    let n_cols = covariates.n_columns();

    #[cfg(feature = "parallel")]
    let blocks: Vec<CsrMatrix> = trials
        .trials()
        .par_iter()
        .enumerate()
        .map(|(pos, trial)| compile_trial(pos, trial, covariates, cfg))
        .collect::<Result<_>>()?;
    #[cfg(not(feature = "parallel"))]
    let blocks: Vec<CsrMatrix> = trials
        .trials()
        .iter()
        .enumerate()
        .map(|(pos, trial)| compile_trial(pos, trial, covariates, cfg))
        .collect::<Result<_>>()?;

    let mut row_trial = Vec::new();
    let mut trial_rows = Vec::with_capacity(blocks.len());
    for (trial, block) in trials.trials().iter().zip(&blocks) {
        let start = row_trial.len();
        row_trial.extend(std::iter::repeat(trial.id).take(block.nrows()));
        trial_rows.push((trial.id, start..row_trial.len()));
    }

    let matrix = CsrMatrix::vstack(n_cols, &blocks)?;
    log::debug!(
        "compiled design matrix {}x{} ({} non-zeros) from {} trials",
        matrix.nrows(),
        matrix.ncols(),
        matrix.nnz(),
        blocks.len()
    );

    Ok(DesignMatrix {
        matrix,
        row_trial,
        trial_rows,
        columns: covariates.column_ranges(),
    })
}

/// Dense block of one trial, compressed. `pos` is the trial's position in the table.
fn compile_trial(
    pos: usize,
    trial: &Trial,
    covariates: &CovariateSet,
    cfg: &GlmConfig,
) -> Result<CsrMatrix> {
    let n_bins = cfg.bin_count(trial.duration);
    let mut block = Array2::<f64>::zeros((n_bins, covariates.n_columns()));

    for cov in covariates.iter() {
        if !cov.valid.contains(trial.id) {
            continue;
        }
        let reg = match cov.regressor.at(pos) {
            Some((id, reg)) if id == trial.id && reg.len() == n_bins => reg,
            _ => {
                return Err(GlmError::RegressorLength {
                    label: cov.label.clone(),
                    trials: vec![trial.id],
                })
            }
        };
        match &cov.bases {
            None => block.column_mut(cov.columns.start).assign(reg),
            Some(bases) => {
                let x = reg.view().insert_axis(Axis(1));
                let conv = convbasis(x, bases.view(), cov.offset, None)?;
                block.slice_mut(s![.., cov.columns.clone()]).assign(&conv);
            }
        }
    }
    Ok(CsrMatrix::from_dense(block.view()))
}
