//! The [`NeuralGlm`] model object.
//!
//! Owns the normalized trial set and configuration. Covariates are
//! registered on a builder borrowed from the model and compiled from the
//! frozen set it produces:
//!
//! ```text
//! NeuralGlm::new ──► glm.covariates() ──add_*──► .build() ──► glm.compile(&set)
//!  (normalize)         CovariateBuilder           CovariateSet     DesignMatrix
//! ```
use std::collections::BTreeMap;

use crate::config::GlmConfig;
use crate::covariate::{CovariateBuilder, CovariateSet};
use crate::design::{compile, DesignMatrix};
use crate::error::Result;
use crate::response::{binned_spikes, BinnedSpikes};
use crate::trials::{normalize, NormalizeWarning, TrialSet, TrialTable, UnitSummary};

/// Poisson GLM of spiking activity, up to design-matrix production.
#[derive(Debug, Clone)]
pub struct NeuralGlm {
    cfg: GlmConfig,
    trials: TrialSet,
    warnings: Vec<NormalizeWarning>,
}

impl NeuralGlm {
    /// Ingest a trial table and spike arrays.
    ///
    /// See [`crate::trials::normalize`] for the checks performed. Trials
    /// dropped for NaN bounds are reported by [`Self::warnings`].
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use neuroglm::{Amplitude, ColumnValues, GlmConfig, NeuralGlm, TrialTable};
    /// use neuroglm::basis::boxcar_basis;
    ///
    /// let table = TrialTable::new(vec![0.0, 2.0], vec![1.0, 3.0])
    ///     .with_column("stimOn_times", ColumnValues::Scalars(vec![0.1, 0.3]));
    /// let vartypes: BTreeMap<String, String> =
    ///     [("stimOn_times".into(), "timing".into())].into_iter().collect();
    /// let cfg = GlmConfig { binwidth: 0.1, min_trials: 0, ..GlmConfig::default() };
    ///
    /// let glm = NeuralGlm::new(&table, &vartypes, &[0.15, 2.5], &[7, 7], cfg).unwrap();
    /// let mut covs = glm.covariates();
    /// covs.add_covariate_timing("stim", "stimOn_times", boxcar_basis(3, 1),
    ///                           Amplitude::Unit, Default::default()).unwrap();
    /// let set = covs.build();
    ///
    /// let dm = glm.compile(&set).unwrap();
    /// assert_eq!(dm.matrix().shape(), (20, 3));
    /// ```
    pub fn new(
        table: &TrialTable,
        vartypes: &BTreeMap<String, String>,
        spike_times: &[f64],
        spike_clusters: &[u32],
        cfg: GlmConfig,
    ) -> Result<Self> {
        let (trials, warnings) = normalize(table, vartypes, spike_times, spike_clusters, &cfg)?;
        Ok(Self { cfg, trials, warnings })
    }

    pub fn config(&self) -> &GlmConfig {
        &self.cfg
    }

    pub fn trials(&self) -> &TrialSet {
        &self.trials
    }

    /// Every unit in the spike arrays with its trial count and inclusion flag.
    pub fn units(&self) -> &[UnitSummary] {
        self.trials.units()
    }

    /// Data-quality warnings raised while ingesting the trial table.
    pub fn warnings(&self) -> &[NormalizeWarning] {
        &self.warnings
    }

    /// Start registering covariates.
    pub fn covariates(&self) -> CovariateBuilder<'_> {
        CovariateBuilder::new(&self.trials, &self.cfg)
    }

    /// Assemble the design matrix for a frozen covariate set.
    pub fn compile(&self, covariates: &CovariateSet) -> Result<DesignMatrix> {
        compile(&self.trials, covariates, &self.cfg)
    }

    /// Spike counts of the included units, row-aligned with [`Self::compile`].
    pub fn binned_spikes(&self) -> BinnedSpikes {
        binned_spikes(&self.trials, &self.cfg)
    }
}
