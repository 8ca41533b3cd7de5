//! Covariate registry.
//!
//! Covariates are accumulated on a [`CovariateBuilder`] that borrows the
//! normalized [`TrialSet`]; [`CovariateBuilder::build`] freezes them into an
//! immutable [`CovariateSet`], which is what the design-matrix assembler
//! consumes. A new registration after that means a new builder and a new
//! set, so a compiled design matrix can never silently fall out of date.
//!
//! Column ranges are handed out from a counter that only grows, in
//! registration order: a covariate with an `M`-column basis claims `M`
//! columns, a raw covariate claims one.
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use log::{debug, warn};
use ndarray::{Array1, Array2};

use crate::config::{DuplicateLabels, GlmConfig};
use crate::error::{GlmError, Result};
use crate::trials::{ColumnKind, Trial, TrialSet};

// ── Regressors ──────────────────────────────────────────────────────────────

/// Per-trial regressor: `(trial id, signal)` pairs in trial-table order.
///
/// Each signal has one entry per bin of its trial.
#[derive(Debug, Clone, PartialEq)]
pub struct Regressor {
    entries: Vec<(usize, Array1<f64>)>,
}

impl Regressor {
    pub fn new(entries: Vec<(usize, Array1<f64>)>) -> Self {
        Self { entries }
    }

    /// Build a regressor by evaluating `f` on every trial of `trials`.
    pub fn from_trials(trials: &TrialSet, mut f: impl FnMut(&Trial) -> Array1<f64>) -> Self {
        Self {
            entries: trials.trials().iter().map(|t| (t.id, f(t))).collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Array1<f64>)> {
        self.entries.iter().map(|(id, v)| (*id, v))
    }

    /// Signal of trial `id`.
    pub fn get(&self, id: usize) -> Option<&Array1<f64>> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, v)| v)
    }

    /// Signal at position `pos` (trial-table order).
    pub fn at(&self, pos: usize) -> Option<(usize, &Array1<f64>)> {
        self.entries.get(pos).map(|(id, v)| (*id, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn trial_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }
}

// ── Registration options ────────────────────────────────────────────────────

/// Which trials a covariate applies to.
#[derive(Default)]
pub enum Validity {
    /// Every trial.
    #[default]
    All,
    /// Only the listed trial ids. Ids missing from the trial set (dropped
    /// or mistyped) are logged and ignored.
    Trials(BTreeSet<usize>),
    /// Trials for which the predicate returns `true`. Evaluated once, at registration.
    Predicate(Box<dyn Fn(&Trial) -> bool>),
}

impl Validity {
    pub fn trials(ids: impl IntoIterator<Item = usize>) -> Self {
        Self::Trials(ids.into_iter().collect())
    }

    pub fn predicate(f: impl Fn(&Trial) -> bool + 'static) -> Self {
        Self::Predicate(Box::new(f))
    }
}

impl fmt::Debug for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::Trials(ids) => f.debug_tuple("Trials").field(ids).finish(),
            Self::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

/// Validity resolved against a concrete trial set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidTrials {
    All,
    Only(BTreeSet<usize>),
}

impl ValidTrials {
    pub fn contains(&self, id: usize) -> bool {
        match self {
            Self::All => true,
            Self::Only(ids) => ids.contains(&id),
        }
    }
}

/// Height of an impulse or boxcar.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Amplitude {
    /// 1.0 on every trial.
    #[default]
    Unit,
    /// Per-trial value read from a `timing` or `value` column (gain modulation).
    Column(String),
    /// Explicit `(trial id, value)` pairs; ids must match the trial table.
    PerTrial(Vec<(usize, f64)>),
}

/// Offset, validity and description shared by every registration call.
#[derive(Debug, Default)]
pub struct CovariateOptions {
    /// Shift of the convolved response in bins; positive delays it.
    pub offset: isize,
    pub validity: Validity,
    pub description: String,
}

impl CovariateOptions {
    pub fn offset(mut self, offset: isize) -> Self {
        self.offset = offset;
        self
    }

    pub fn validity(mut self, validity: Validity) -> Self {
        self.validity = validity;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

// ── Covariates ──────────────────────────────────────────────────────────────

/// One registered model component.
#[derive(Debug, Clone)]
pub struct Covariate {
    pub label: String,
    pub description: String,
    pub regressor: Regressor,
    /// `TB × M` basis; `None` uses the regressor as a single raw column.
    pub bases: Option<Array2<f64>>,
    pub offset: isize,
    pub valid: ValidTrials,
    /// Design-matrix columns owned by this covariate.
    pub columns: Range<usize>,
}

/// Frozen covariates, ready for [`crate::design::compile`].
#[derive(Debug, Clone)]
pub struct CovariateSet {
    covariates: Vec<Covariate>,
    n_columns: usize,
    trial_ids: Vec<usize>,
    orphaned: Vec<Range<usize>>,
}

impl CovariateSet {
    /// Covariates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Covariate> {
        self.covariates.iter()
    }

    pub fn get(&self, label: &str) -> Option<&Covariate> {
        self.covariates.iter().find(|c| c.label == label)
    }

    pub fn len(&self) -> usize {
        self.covariates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covariates.is_empty()
    }

    /// Design-matrix width.
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// `(label, column range)` of every covariate, in registration order.
    pub fn column_ranges(&self) -> Vec<(String, Range<usize>)> {
        self.covariates.iter().map(|c| (c.label.clone(), c.columns.clone())).collect()
    }

    /// Column ranges left behind by overwritten labels. They stay zero.
    pub fn orphaned_columns(&self) -> &[Range<usize>] {
        &self.orphaned
    }

    /// Ids of the trials this set was built against.
    pub fn trial_ids(&self) -> &[usize] {
        &self.trial_ids
    }
}

// ── Builder ─────────────────────────────────────────────────────────────────

/// Accumulates covariate registrations against a trial set.
pub struct CovariateBuilder<'a> {
    trials: &'a TrialSet,
    cfg: &'a GlmConfig,
    covariates: Vec<Covariate>,
    orphaned: Vec<Range<usize>>,
    next_col: usize,
}

impl<'a> CovariateBuilder<'a> {
    pub fn new(trials: &'a TrialSet, cfg: &'a GlmConfig) -> Self {
        Self {
            trials,
            cfg,
            covariates: Vec::new(),
            orphaned: Vec::new(),
            next_col: 0,
        }
    }

    /// Columns claimed so far.
    pub fn n_columns(&self) -> usize {
        self.next_col
    }

    /// Register a covariate from an explicit per-trial regressor.
    ///
    /// Returns the column range assigned to it.
    ///
    /// # Errors
    ///
    /// * [`GlmError::EmptyBasis`] for a basis with no rows or columns.
    /// * [`GlmError::IndexMismatch`] when the regressor's trial ids are not
    ///   exactly the trial table's, in order.
    /// * [`GlmError::RegressorLength`] listing every trial whose signal length
    ///   differs from its bin count.
    /// * [`GlmError::DuplicateLabel`] under [`DuplicateLabels::Reject`].
    pub fn add_covariate(
        &mut self,
        label: &str,
        regressor: Regressor,
        bases: Option<Array2<f64>>,
        opts: CovariateOptions,
    ) -> Result<Range<usize>> {
        if let Some(b) = &bases {
            if b.is_empty() {
                return Err(GlmError::EmptyBasis(label.to_string()));
            }
        }
        if !regressor.trial_ids().eq(self.trials.ids()) {
            return Err(GlmError::IndexMismatch {
                what: format!("covariate {label:?} regressor"),
            });
        }
        let bad: Vec<usize> = self
            .trials
            .trials()
            .iter()
            .zip(regressor.iter())
            .filter(|(trial, (_, v))| v.len() != self.cfg.bin_count(trial.duration))
            .map(|(trial, _)| trial.id)
            .collect();
        if !bad.is_empty() {
            return Err(GlmError::RegressorLength { label: label.to_string(), trials: bad });
        }

        if let Some(pos) = self.covariates.iter().position(|c| c.label == label) {
            match self.cfg.duplicate_labels {
                DuplicateLabels::Reject => {
                    return Err(GlmError::DuplicateLabel(label.to_string()));
                }
                DuplicateLabels::Overwrite => {
                    let old = self.covariates.remove(pos);
                    warn!(
                        "covariate {label:?} re-registered; columns {:?} are orphaned",
                        old.columns
                    );
                    self.orphaned.push(old.columns);
                }
            }
        }

        let valid = match opts.validity {
            Validity::All => ValidTrials::All,
            Validity::Trials(mut ids) => {
                let unknown: Vec<usize> =
                    ids.iter().copied().filter(|&id| self.trials.get(id).is_none()).collect();
                if !unknown.is_empty() {
                    warn!("covariate {label:?}: validity names trials {unknown:?} not in the trial set; ignored");
                    ids.retain(|id| !unknown.contains(id));
                }
                ValidTrials::Only(ids)
            }
            Validity::Predicate(f) => ValidTrials::Only(
                self.trials.trials().iter().filter(|t| f(t)).map(|t| t.id).collect(),
            ),
        };

        let width = bases.as_ref().map_or(1, |b| b.ncols());
        let columns = self.next_col..self.next_col + width;
        self.next_col += width;

        debug!("registered covariate {label:?} -> columns {columns:?}");
        self.covariates.push(Covariate {
            label: label.to_string(),
            description: opts.description,
            regressor,
            bases,
            offset: opts.offset,
            valid,
            columns: columns.clone(),
        });
        Ok(columns)
    }

    /// Register an event-timing covariate.
    ///
    /// Each trial's regressor is zero except for the bin containing the event
    /// time of `event_column`, which holds the trial's amplitude. A NaN event
    /// time, or a NaN or infinite amplitude, leaves the trial's regressor all
    /// zero.
    ///
    /// # Errors
    ///
    /// Configuration errors when `event_column` is missing or not a `timing`
    /// column, or when the amplitude column is unusable;
    /// [`GlmError::EventOutOfRange`] listing every trial whose event falls
    /// outside the trial; plus everything [`Self::add_covariate`] checks.
    pub fn add_covariate_timing(
        &mut self,
        label: &str,
        event_column: &str,
        bases: Array2<f64>,
        amplitude: Amplitude,
        opts: CovariateOptions,
    ) -> Result<Range<usize>> {
        self.expect_kind(event_column, &[ColumnKind::Timing], "timing")?;
        let amps = self.resolve_amplitude(label, &amplitude)?;

        let mut out_of_range = Vec::new();
        let mut entries = Vec::with_capacity(self.trials.len());
        for (trial, amp) in self.trials.trials().iter().zip(amps) {
            let n_bins = self.cfg.bin_count(trial.duration);
            let mut vec = Array1::<f64>::zeros(n_bins);
            let t = trial.timing(event_column).unwrap_or(f64::NAN);
            if !t.is_nan() {
                match self.cfg.bin_index(t) {
                    Some(idx) if idx < n_bins => vec[idx] = amp.unwrap_or(0.0),
                    _ => out_of_range.push(trial.id),
                }
            }
            entries.push((trial.id, vec));
        }
        if !out_of_range.is_empty() {
            return Err(GlmError::EventOutOfRange {
                label: label.to_string(),
                trials: out_of_range,
            });
        }

        self.add_covariate(label, Regressor::new(entries), Some(bases), opts)
    }

    /// Register a boxcar covariate: `height` on the bins from the start
    /// column's time up to the end column's time, zero elsewhere.
    ///
    /// The window covers bins `floor(start / bw) .. ceil(end / bw)`, clipped
    /// to the trial; a NaN bound or a non-finite height leaves the trial at
    /// zero. The regressor is used raw (one column, no basis), so the offset
    /// in `opts` has no effect.
    pub fn add_covariate_boxcar(
        &mut self,
        label: &str,
        start_column: &str,
        end_column: &str,
        height: Amplitude,
        opts: CovariateOptions,
    ) -> Result<Range<usize>> {
        let scalar_kinds = [ColumnKind::Timing, ColumnKind::Value];
        self.expect_kind(start_column, &scalar_kinds, "timing or value")?;
        self.expect_kind(end_column, &scalar_kinds, "timing or value")?;
        let heights = self.resolve_amplitude(label, &height)?;

        let cfg = self.cfg;
        let entries = self
            .trials
            .trials()
            .iter()
            .zip(heights)
            .map(|(trial, h)| {
                let n_bins = cfg.bin_count(trial.duration);
                let mut vec = Array1::<f64>::zeros(n_bins);
                let start = trial.scalar(start_column).unwrap_or(f64::NAN);
                let end = trial.scalar(end_column).unwrap_or(f64::NAN);
                match h {
                    Some(h) if !start.is_nan() && !end.is_nan() => {
                        let lo = cfg.bin_index(start.max(0.0)).unwrap_or(0).min(n_bins);
                        let hi = cfg.bin_count(end).min(n_bins);
                        if lo < hi {
                            vec.slice_mut(ndarray::s![lo..hi]).fill(h);
                        }
                    }
                    _ => {}
                }
                (trial.id, vec)
            })
            .collect();

        self.add_covariate(label, Regressor::new(entries), None, opts)
    }

    /// Register a continuous column as a raw covariate. Not implemented.
    pub fn add_covariate_raw(
        &mut self,
        label: &str,
        column: &str,
        _opts: CovariateOptions,
    ) -> Result<Range<usize>> {
        Err(GlmError::Unsupported(format!(
            "raw covariate {label:?} from column {column:?}: raw covariates are not supported yet"
        )))
    }

    /// End the accumulation phase.
    pub fn build(self) -> CovariateSet {
        CovariateSet {
            covariates: self.covariates,
            n_columns: self.next_col,
            trial_ids: self.trials.ids().collect(),
            orphaned: self.orphaned,
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn expect_kind(&self, column: &str, allowed: &[ColumnKind], expected: &'static str) -> Result<()> {
        let kind = self
            .trials
            .kind(column)
            .ok_or_else(|| GlmError::UnknownColumn(column.to_string()))?;
        if !allowed.contains(&kind) {
            return Err(GlmError::WrongColumnKind {
                column: column.to_string(),
                expected,
                actual: kind.as_str(),
            });
        }
        Ok(())
    }

    /// Per-trial amplitude, in trial-table order. NaN or infinite values
    /// come back as `None` and are logged.
    fn resolve_amplitude(&self, label: &str, amplitude: &Amplitude) -> Result<Vec<Option<f64>>> {
        let values: Vec<f64> = match amplitude {
            Amplitude::Unit => vec![1.0; self.trials.len()],
            Amplitude::Column(column) => {
                self.expect_kind(column, &[ColumnKind::Timing, ColumnKind::Value], "timing or value")?;
                self.trials
                    .trials()
                    .iter()
                    .map(|t| t.scalar(column).unwrap_or(f64::NAN))
                    .collect()
            }
            Amplitude::PerTrial(pairs) => {
                if !pairs.iter().map(|(id, _)| *id).eq(self.trials.ids()) {
                    return Err(GlmError::IndexMismatch { what: "amplitude values".into() });
                }
                pairs.iter().map(|(_, v)| *v).collect()
            }
        };

        let unusable: Vec<usize> = self
            .trials
            .ids()
            .zip(&values)
            .filter(|(_, v)| !v.is_finite())
            .map(|(id, _)| id)
            .collect();
        if !unusable.is_empty() {
            warn!("covariate {label:?}: no finite amplitude on trials {unusable:?}; left at zero");
        }
        Ok(values.into_iter().map(|v| v.is_finite().then_some(v)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trials::{normalize, ColumnValues, TrialTable};
    use ndarray::array;
    use std::collections::BTreeMap;

    fn cfg() -> GlmConfig {
        GlmConfig { binwidth: 0.5, min_trials: 0, ..GlmConfig::default() }
    }

    fn session(cfg: &GlmConfig) -> TrialSet {
        // durations 1.0, 0.5, 2.0 s -> 2, 1, 4 bins at 0.5 s
        let table = TrialTable::new(vec![0.0, 2.0, 3.0], vec![1.0, 2.5, 5.0])
            .with_column("stimOn_times", ColumnValues::Scalars(vec![0.2, 0.1, 1.1]))
            .with_column("contrast", ColumnValues::Scalars(vec![0.25, 1.0, 0.5]))
            .with_column(
                "wheel",
                ColumnValues::Samples(vec![Array2::zeros((0, 2)); 3]),
            );
        let vartypes: BTreeMap<String, String> = [
            ("stimOn_times", "timing"),
            ("contrast", "value"),
            ("wheel", "continuous"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        normalize(&table, &vartypes, &[], &[], cfg).unwrap().0
    }

    #[test]
    fn columns_are_assigned_in_registration_order() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        let a = b
            .add_covariate_timing("a", "stimOn_times", array![[1.0]], Amplitude::Unit, Default::default())
            .unwrap();
        let bb = b
            .add_covariate_timing("b", "stimOn_times", Array2::ones((2, 3)), Amplitude::Unit, Default::default())
            .unwrap();
        let c = b
            .add_covariate_boxcar("c", "stimOn_times", "stimOn_times", Amplitude::Unit, Default::default())
            .unwrap();
        assert_eq!((a, bb, c), (0..1, 1..4, 4..5));
        assert_eq!(b.build().n_columns(), 5);
    }

    #[test]
    fn length_mismatch_reports_every_trial() {
        let cfg = cfg();
        let trials = session(&cfg);
        let reg = Regressor::new(vec![
            (0, Array1::zeros(2)),
            (1, Array1::zeros(3)),
            (2, Array1::zeros(1)),
        ]);
        let err = CovariateBuilder::new(&trials, &cfg)
            .add_covariate("x", reg, None, Default::default())
            .unwrap_err();
        match err {
            GlmError::RegressorLength { trials, .. } => assert_eq!(trials, vec![1, 2]),
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn regressor_ids_must_match_table() {
        let cfg = cfg();
        let trials = session(&cfg);
        let reg = Regressor::new(vec![
            (0, Array1::zeros(2)),
            (2, Array1::zeros(4)),
            (1, Array1::zeros(1)),
        ]);
        let err = CovariateBuilder::new(&trials, &cfg).add_covariate("x", reg, None, Default::default());
        assert!(matches!(err, Err(GlmError::IndexMismatch { .. })));
    }

    #[test]
    fn timing_requires_a_timing_column() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        let opts = || CovariateOptions::default();
        assert!(matches!(
            b.add_covariate_timing("x", "missing", array![[1.0]], Amplitude::Unit, opts()),
            Err(GlmError::UnknownColumn(_))
        ));
        assert!(matches!(
            b.add_covariate_timing("x", "contrast", array![[1.0]], Amplitude::Unit, opts()),
            Err(GlmError::WrongColumnKind { .. })
        ));
        assert!(matches!(
            b.add_covariate_timing("x", "stimOn_times", array![[1.0]], Amplitude::Column("wheel".into()), opts()),
            Err(GlmError::WrongColumnKind { .. })
        ));
        assert_eq!(b.n_columns(), 0);
    }

    #[test]
    fn gain_modulation_scales_the_impulse() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        b.add_covariate_timing(
            "stim",
            "stimOn_times",
            array![[1.0]],
            Amplitude::Column("contrast".into()),
            Default::default(),
        )
        .unwrap();
        let set = b.build();
        let reg = &set.get("stim").unwrap().regressor;
        assert_eq!(reg.get(0).unwrap().to_vec(), vec![0.25, 0.0]);
        assert_eq!(reg.get(1).unwrap().to_vec(), vec![1.0]);
        assert_eq!(reg.get(2).unwrap().to_vec(), vec![0.0, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn explicit_amplitudes_must_cover_the_table() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        let amp = Amplitude::PerTrial(vec![(0, 2.0), (1, 3.0)]);
        assert!(matches!(
            b.add_covariate_timing("x", "stimOn_times", array![[1.0]], amp, Default::default()),
            Err(GlmError::IndexMismatch { .. })
        ));
    }

    #[test]
    fn validity_predicate_is_resolved_at_registration() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        let opts = CovariateOptions::default()
            .validity(Validity::predicate(|t| t.scalar("contrast").unwrap_or(0.0) >= 0.5));
        b.add_covariate_timing("x", "stimOn_times", array![[1.0]], Amplitude::Unit, opts)
            .unwrap();
        let set = b.build();
        let valid = &set.get("x").unwrap().valid;
        assert_eq!(*valid, ValidTrials::Only([1, 2].into_iter().collect()));
        assert!(!valid.contains(0));
    }

    #[test]
    fn validity_ids_outside_the_trial_set_are_ignored() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        let opts = CovariateOptions::default().validity(Validity::trials([0, 2, 7]));
        b.add_covariate_timing("x", "stimOn_times", array![[1.0]], Amplitude::Unit, opts)
            .unwrap();
        let set = b.build();
        assert_eq!(set.get("x").unwrap().valid, ValidTrials::Only([0, 2].into_iter().collect()));
    }

    #[test]
    fn non_finite_amplitude_leaves_the_trial_at_zero() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        let amp = Amplitude::PerTrial(vec![(0, f64::NAN), (1, 2.0), (2, f64::INFINITY)]);
        b.add_covariate_timing("stim", "stimOn_times", array![[1.0]], amp.clone(), Default::default())
            .unwrap();
        b.add_covariate_boxcar("box", "stimOn_times", "contrast", amp, Default::default())
            .unwrap();
        let set = b.build();
        for label in ["stim", "box"] {
            let reg = &set.get(label).unwrap().regressor;
            assert_eq!(reg.get(0).unwrap().to_vec(), vec![0.0, 0.0], "{label}");
            assert_eq!(reg.get(1).unwrap().to_vec(), vec![2.0], "{label}");
            assert!(reg.get(2).unwrap().iter().all(|&v| v == 0.0), "{label}");
        }
    }

    #[test]
    fn boxcar_window_and_height() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        // window from stimulus onset to the time held in the contrast column
        b.add_covariate_boxcar(
            "box",
            "stimOn_times",
            "contrast",
            Amplitude::PerTrial(vec![(0, 2.0), (1, 2.0), (2, 3.0)]),
            Default::default(),
        )
        .unwrap();
        let set = b.build();
        let cov = set.get("box").unwrap();
        assert!(cov.bases.is_none());
        // trial 2: start 1.1 -> bin 2, end 0.5 -> ceil 1: empty window
        assert_eq!(cov.regressor.get(2).unwrap().to_vec(), vec![0.0; 4]);
        // trial 1: start 0.1 -> bin 0, end 1.0 -> 2 clipped to 1 bin
        assert_eq!(cov.regressor.get(1).unwrap().to_vec(), vec![2.0]);
        // trial 0: start 0.2 -> bin 0, end 0.25 -> ceil(0.5) = 1
        assert_eq!(cov.regressor.get(0).unwrap().to_vec(), vec![2.0, 0.0]);
    }

    #[test]
    fn event_past_trial_end_is_rejected() {
        let cfg = cfg();
        let table = TrialTable::new(vec![0.0, 1.0], vec![1.0, 2.0])
            .with_column("feedback_times", ColumnValues::Scalars(vec![1.0, f64::NAN]));
        let vt: BTreeMap<String, String> =
            [("feedback_times".to_string(), "timing".to_string())].into_iter().collect();
        let (trials, _) = normalize(&table, &vt, &[], &[], &cfg).unwrap();
        let err = CovariateBuilder::new(&trials, &cfg)
            .add_covariate_timing("fb", "feedback_times", array![[1.0]], Amplitude::Unit, Default::default())
            .unwrap_err();
        match err {
            GlmError::EventOutOfRange { trials, .. } => assert_eq!(trials, vec![0]),
            e => panic!("unexpected error {e}"),
        }
    }

    #[test]
    fn raw_covariates_are_unsupported() {
        let cfg = cfg();
        let trials = session(&cfg);
        let err = CovariateBuilder::new(&trials, &cfg).add_covariate_raw("w", "wheel", Default::default());
        assert!(matches!(err, Err(GlmError::Unsupported(_))));
    }

    #[test]
    fn duplicate_labels() {
        let cfg = cfg();
        let trials = session(&cfg);
        let mut b = CovariateBuilder::new(&trials, &cfg);
        b.add_covariate_timing("x", "stimOn_times", Array2::ones((1, 2)), Amplitude::Unit, Default::default())
            .unwrap();
        let again = b
            .add_covariate_timing("x", "stimOn_times", array![[1.0]], Amplitude::Unit, Default::default())
            .unwrap();
        assert_eq!(again, 2..3);
        let set = b.build();
        assert_eq!(set.len(), 1);
        assert_eq!(set.n_columns(), 3);
        assert_eq!(set.orphaned_columns(), &[0..2]);

        let strict = GlmConfig { duplicate_labels: DuplicateLabels::Reject, ..cfg };
        let mut b = CovariateBuilder::new(&trials, &strict);
        b.add_covariate_timing("x", "stimOn_times", array![[1.0]], Amplitude::Unit, Default::default())
            .unwrap();
        assert!(matches!(
            b.add_covariate_timing("x", "stimOn_times", array![[1.0]], Amplitude::Unit, Default::default()),
            Err(GlmError::DuplicateLabel(_))
        ));
    }
}
