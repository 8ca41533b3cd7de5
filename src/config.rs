//! Model configuration.
//!
//! [`GlmConfig`] holds every tunable parameter used while normalizing the
//! trial table and registering covariates. All fields have defaults that
//! match the IBL encoding-model settings.
use crate::error::{GlmError, Result};

/// Relative slack applied when converting times to bin counts / indices,
/// so exact multiples of the bin width are not pushed across a bin edge by
/// floating-point rounding (`1.0 / 0.02 = 50.000000000000004`).
const BIN_EPS: f64 = 1e-9;

/// What happens when a covariate label is registered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateLabels {
    /// Replace the earlier covariate. Its columns stay allocated (all zero)
    /// and are reported by [`crate::CovariateSet::orphaned_columns`].
    #[default]
    Overwrite,
    /// Fail with [`crate::GlmError::DuplicateLabel`].
    Reject,
}

/// Configuration for building a GLM design matrix.
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use neuroglm::GlmConfig;
///
/// let cfg = GlmConfig {
///     binwidth:   0.01,   // 10 ms bins
///     min_trials: 20,
///     ..GlmConfig::default()
/// };
/// assert_eq!(cfg.bin_count(1.0), 100);
/// ```
#[derive(Debug, Clone)]
pub struct GlmConfig {
    /// Width of one time bin in seconds.
    ///
    /// Each trial of duration `d` is discretized into `ceil(d / binwidth)`
    /// bins; this is also the number of design-matrix rows it contributes.
    ///
    /// Default: `0.02` s.
    pub binwidth: f64,

    /// Minimum number of trials a unit must fire in to be kept.
    ///
    /// A unit is included when the number of distinct trials with at least
    /// one of its spikes is **strictly greater** than this value.
    ///
    /// Default: `100`.
    pub min_trials: usize,

    /// Policy for re-registering an existing covariate label.
    ///
    /// Default: [`DuplicateLabels::Overwrite`].
    pub duplicate_labels: DuplicateLabels,
}

impl Default for GlmConfig {
    /// 20 ms bins · 100 trial minimum · overwrite duplicates.
    fn default() -> Self {
        Self {
            binwidth: 0.02,
            min_trials: 100,
            duplicate_labels: DuplicateLabels::Overwrite,
        }
    }
}

impl GlmConfig {
    /// Check the parameters: `binwidth` must be positive and finite.
    ///
    /// Called by [`crate::trials::normalize`] and [`crate::design::compile`].
    pub fn validate(&self) -> Result<()> {
        if !(self.binwidth > 0.0 && self.binwidth.is_finite()) {
            return Err(GlmError::InvalidBinwidth(self.binwidth));
        }
        Ok(())
    }

    /// Number of bins covering `duration` seconds: `ceil(duration / binwidth)`.
    ///
    /// Negative or NaN durations give zero bins.
    ///
    /// ```
    /// use neuroglm::GlmConfig;
    /// let cfg = GlmConfig { binwidth: 0.5, ..GlmConfig::default() };
    /// assert_eq!(cfg.bin_count(1.0), 2);
    /// assert_eq!(cfg.bin_count(1.1), 3);
    /// ```
    pub fn bin_count(&self, duration: f64) -> usize {
        let x = duration / self.binwidth;
        if !(x > 0.0) {
            return 0;
        }
        (x - x * BIN_EPS).ceil() as usize
    }

    /// Index of the bin containing time `t` (seconds from trial start):
    /// `floor(t / binwidth)`. Returns `None` for NaN, infinite or negative times.
    pub fn bin_index(&self, t: f64) -> Option<usize> {
        let x = t / self.binwidth;
        if !x.is_finite() || x < 0.0 {
            return None;
        }
        Some((x + x * BIN_EPS).floor() as usize)
    }
}
