//! Binned spike counts, row-aligned with the design matrix.
//!
//! `counts[row, u]` is the number of spikes unit `units[u]` fired in design
//! row `row`. Only units that pass the minimum-trial threshold get a column.
use ndarray::Array2;

use crate::config::GlmConfig;
use crate::trials::TrialSet;

/// Spike counts for every bin of every trial.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedSpikes {
    /// `total bins × units.len()`.
    pub counts: Array2<f64>,
    /// Unit id of each column, ascending.
    pub units: Vec<u32>,
    /// Trial id of each row.
    pub row_trial: Vec<usize>,
}

/// Count the spikes of every included unit in every bin.
///
/// A spike at relative time `t` falls in bin `floor(t / binwidth)`, clipped
/// to the trial's last bin.
pub fn binned_spikes(trials: &TrialSet, cfg: &GlmConfig) -> BinnedSpikes {
    let units = trials.included_units();
    let n_rows: usize = trials.trials().iter().map(|t| cfg.bin_count(t.duration)).sum();

    let mut counts = Array2::<f64>::zeros((n_rows, units.len()));
    let mut row_trial = Vec::with_capacity(n_rows);

    for trial in trials.trials() {
        let first = row_trial.len();
        let n_bins = cfg.bin_count(trial.duration);
        row_trial.extend(std::iter::repeat(trial.id).take(n_bins));
        if n_bins == 0 {
            continue;
        }
        for (&t, clu) in trial.spike_times.iter().zip(&trial.spike_clusters) {
            let Ok(col) = units.binary_search(clu) else {
                continue;
            };
            let bin = cfg.bin_index(t).unwrap_or(0).min(n_bins - 1);
            counts[[first + bin, col]] += 1.0;
        }
    }

    BinnedSpikes { counts, units, row_trial }
}
