//! Trial table normalization.
//!
//! Turns the external trial table plus the flat spike arrays into a
//! [`TrialSet`]: one [`Trial`] per surviving row, each carrying its own
//! spikes (relative to trial start) and its covariate fields.
//!
//! # Algorithm
//! 1. Validate the declared column kinds and the column shapes.
//! 2. Validate the spike arrays (equal lengths, globally sorted).
//! 3. Walk the trials in table order. Each trial's spikes are the slice of
//!    the sorted spike array inside `[start, end)`, located with two binary
//!    searches that start at a cursor left by the previous trial.
//! 4. Trials with a NaN bound are dropped with a warning.
//! 5. Count, per unit, the distinct trials it fired in; units firing in more
//!    than `min_trials` trials are marked included.
use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use ndarray::Array2;

use crate::config::GlmConfig;
use crate::error::{GlmError, Result};

// ── Input table ─────────────────────────────────────────────────────────────

/// Kind of a trial-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Event time in seconds relative to trial start (e.g. stimulus onset).
    Timing,
    /// Signal sampled throughout the trial, stored as `N × 2`
    /// `(value, time from trial start)` rows.
    Continuous,
    /// One scalar per trial (e.g. contrast).
    Value,
}

impl ColumnKind {
    /// Parse the kind string declared for `column`.
    pub fn parse(column: &str, kind: &str) -> Result<Self> {
        match kind {
            "timing" => Ok(Self::Timing),
            "continuous" => Ok(Self::Continuous),
            "value" => Ok(Self::Value),
            _ => Err(GlmError::UnknownColumnKind {
                column: column.to_string(),
                kind: kind.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timing => "timing",
            Self::Continuous => "continuous",
            Self::Value => "value",
        }
    }
}

/// Raw per-trial values of one column, before kinds are applied.
#[derive(Debug, Clone)]
pub enum ColumnValues {
    /// One number per trial (`timing` and `value` columns). NaN marks a
    /// missing entry.
    Scalars(Vec<f64>),
    /// One `N × 2` sample array per trial (`continuous` columns).
    Samples(Vec<Array2<f64>>),
}

impl ColumnValues {
    fn len(&self) -> usize {
        match self {
            Self::Scalars(v) => v.len(),
            Self::Samples(v) => v.len(),
        }
    }
}

/// Trial table as delivered by the extraction pipeline.
#[derive(Debug, Clone, Default)]
pub struct TrialTable {
    /// Trial start times in seconds.
    pub trial_start: Vec<f64>,
    /// Trial end times in seconds.
    pub trial_end: Vec<f64>,
    /// Covariate columns in table order.
    pub columns: Vec<(String, ColumnValues)>,
}

impl TrialTable {
    pub fn new(trial_start: Vec<f64>, trial_end: Vec<f64>) -> Self {
        Self { trial_start, trial_end, columns: Vec::new() }
    }

    /// Append a column (builder style).
    pub fn with_column(mut self, name: impl Into<String>, values: ColumnValues) -> Self {
        self.columns.push((name.into(), values));
        self
    }

    /// Number of rows (trials) before normalization.
    pub fn n_rows(&self) -> usize {
        self.trial_start.len()
    }
}

// ── Normalized trials ───────────────────────────────────────────────────────

/// Value of one covariate column for one trial.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialField {
    Timing(f64),
    Value(f64),
    Continuous(Array2<f64>),
}

/// One behavioural trial after normalization.
#[derive(Debug, Clone)]
pub struct Trial {
    /// Row index in the original trial table. Preserved when earlier rows are dropped.
    pub id: usize,
    pub start: f64,
    pub end: f64,
    /// `end - start`, seconds.
    pub duration: f64,
    /// Spike times in seconds relative to `start`, ascending.
    pub spike_times: Vec<f64>,
    /// Cluster id of each spike in `spike_times`.
    pub spike_clusters: Vec<u32>,
    pub fields: BTreeMap<String, TrialField>,
}

impl Trial {
    /// Event time of a `timing` column.
    pub fn timing(&self, column: &str) -> Option<f64> {
        match self.fields.get(column)? {
            TrialField::Timing(t) => Some(*t),
            _ => None,
        }
    }

    /// Scalar of a `timing` or `value` column.
    pub fn scalar(&self, column: &str) -> Option<f64> {
        match self.fields.get(column)? {
            TrialField::Timing(v) | TrialField::Value(v) => Some(*v),
            TrialField::Continuous(_) => None,
        }
    }

    /// Sample array of a `continuous` column.
    pub fn continuous(&self, column: &str) -> Option<&Array2<f64>> {
        match self.fields.get(column)? {
            TrialField::Continuous(a) => Some(a),
            _ => None,
        }
    }
}

/// Per-unit trial participation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSummary {
    pub id: u32,
    /// Number of distinct trials with at least one spike from this unit.
    pub n_trials: usize,
    /// `n_trials > min_trials`.
    pub included: bool,
}

/// Recoverable data-quality problem found during normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeWarning {
    /// Trial with a NaN start or end, removed from every downstream structure.
    DroppedTrial { trial: usize, start: f64, end: f64 },
}

impl fmt::Display for NormalizeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DroppedTrial { trial, start, end } => write!(
                f,
                "NaN values found in trial start or end at trial number {trial} \
                 (start={start}, end={end}); trial discarded"
            ),
        }
    }
}

/// Normalized trial table: the surviving trials plus unit statistics.
#[derive(Debug, Clone)]
pub struct TrialSet {
    trials: Vec<Trial>,
    kinds: BTreeMap<String, ColumnKind>,
    units: Vec<UnitSummary>,
}

impl TrialSet {
    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// Trial ids in table order.
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.trials.iter().map(|t| t.id)
    }

    /// Look up a trial by its id.
    pub fn get(&self, id: usize) -> Option<&Trial> {
        // ids are strictly increasing
        self.trials
            .binary_search_by_key(&id, |t| t.id)
            .ok()
            .map(|i| &self.trials[i])
    }

    /// Declared kind of a column.
    pub fn kind(&self, column: &str) -> Option<ColumnKind> {
        self.kinds.get(column).copied()
    }

    /// Every unit seen in the spike arrays, ascending by id.
    pub fn units(&self) -> &[UnitSummary] {
        &self.units
    }

    /// Ids of the units that pass the minimum-trial threshold.
    pub fn included_units(&self) -> Vec<u32> {
        self.units.iter().filter(|u| u.included).map(|u| u.id).collect()
    }
}

// ── Normalizer ──────────────────────────────────────────────────────────────

/// Validate and restructure a trial table.
///
/// `vartypes` maps every column name in `table.columns` to its kind string
/// (`"timing"`, `"continuous"` or `"value"`). Entries for columns the table
/// does not have are allowed, but their kind must still be one of the three.
///
/// # Errors
///
/// [`GlmError::InvalidBinwidth`] for a bad `cfg`; configuration errors for
/// undeclared or unknown column kinds and for
/// columns whose shape contradicts their kind; data-integrity errors for
/// mismatched or unsorted spike arrays, mismatched bound arrays and inverted
/// trials. NaN trial bounds are not errors: the trial is dropped and a
/// [`NormalizeWarning`] returned.
pub fn normalize(
    table: &TrialTable,
    vartypes: &BTreeMap<String, String>,
    spike_times: &[f64],
    spike_clusters: &[u32],
    cfg: &GlmConfig,
) -> Result<(TrialSet, Vec<NormalizeWarning>)> {
    cfg.validate()?;
    let n_rows = table.n_rows();
    if table.trial_end.len() != n_rows {
        return Err(GlmError::TrialBoundsMismatch {
            starts: n_rows,
            ends: table.trial_end.len(),
        });
    }

    let kinds = column_kinds(table, vartypes)?;

    if spike_times.len() != spike_clusters.len() {
        return Err(GlmError::SpikeLengthMismatch {
            times: spike_times.len(),
            clusters: spike_clusters.len(),
        });
    }
    if let Some(i) = spike_times.windows(2).position(|w| w[1] < w[0]) {
        return Err(GlmError::UnsortedSpikes(i + 1));
    }

    let mut trials = Vec::with_capacity(n_rows);
    let mut warnings = Vec::new();
    let mut cursor = 0_usize;

    for (i, (&start, &end)) in table.trial_start.iter().zip(&table.trial_end).enumerate() {
        if start.is_nan() || end.is_nan() {
            let w = NormalizeWarning::DroppedTrial { trial: i, start, end };
            warn!("{w}");
            warnings.push(w);
            continue;
        }
        if start > end {
            return Err(GlmError::InvertedTrial { trial: i, start, end });
        }

        let rest = &spike_times[cursor..];
        let lo = cursor + rest.partition_point(|&t| t < start);
        let hi = cursor + rest.partition_point(|&t| t < end);
        cursor = hi;

        let fields = table
            .columns
            .iter()
            .map(|(name, values)| {
                let field = match (kinds[name], values) {
                    (ColumnKind::Timing, ColumnValues::Scalars(v)) => TrialField::Timing(v[i]),
                    (ColumnKind::Value, ColumnValues::Scalars(v)) => TrialField::Value(v[i]),
                    (ColumnKind::Continuous, ColumnValues::Samples(v)) => {
                        TrialField::Continuous(v[i].clone())
                    }
                    // shapes were checked by `column_kinds`
                    _ => unreachable!("column {name} shape/kind checked"),
                };
                (name.clone(), field)
            })
            .collect();

        trials.push(Trial {
            id: i,
            start,
            end,
            duration: end - start,
            spike_times: spike_times[lo..hi].iter().map(|&t| t - start).collect(),
            spike_clusters: spike_clusters[lo..hi].to_vec(),
            fields,
        });
    }

    let units = count_units(&trials, spike_clusters, cfg.min_trials);
    log::debug!(
        "normalized {} of {} trials, {} of {} units included",
        trials.len(),
        n_rows,
        units.iter().filter(|u| u.included).count(),
        units.len()
    );

    Ok((TrialSet { trials, kinds, units }, warnings))
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Resolve and check the declared kind of every column.
fn column_kinds(
    table: &TrialTable,
    vartypes: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, ColumnKind>> {
    for (name, declared) in vartypes {
        ColumnKind::parse(name, declared)?;
    }

    let n_rows = table.n_rows();
    let mut kinds = BTreeMap::new();
    for (name, values) in &table.columns {
        let declared = vartypes
            .get(name)
            .ok_or_else(|| GlmError::UndeclaredColumn(name.clone()))?;
        let kind = ColumnKind::parse(name, declared)?;

        if values.len() != n_rows {
            return Err(GlmError::ColumnShape {
                column: name.clone(),
                reason: format!("{} entries for {n_rows} trials", values.len()),
            });
        }
        match (kind, values) {
            (ColumnKind::Continuous, ColumnValues::Samples(arrays)) => {
                if let Some(bad) = arrays.iter().position(|a| a.ncols() != 2) {
                    return Err(GlmError::ColumnShape {
                        column: name.clone(),
                        reason: format!("trial {bad}: samples must be N x 2 (value, time)"),
                    });
                }
            }
            (ColumnKind::Continuous, ColumnValues::Scalars(_)) => {
                return Err(GlmError::ColumnShape {
                    column: name.clone(),
                    reason: "continuous column holds scalars".into(),
                });
            }
            (_, ColumnValues::Samples(_)) => {
                return Err(GlmError::ColumnShape {
                    column: name.clone(),
                    reason: format!("{} column holds sample arrays", kind.as_str()),
                });
            }
            _ => {}
        }
        kinds.insert(name.clone(), kind);
    }
    Ok(kinds)
}

/// Distinct-trial spike counts per unit.
fn count_units(trials: &[Trial], all_clusters: &[u32], min_trials: usize) -> Vec<UnitSummary> {
    let mut counts: BTreeMap<u32, usize> = all_clusters.iter().map(|&c| (c, 0)).collect();
    let mut seen: Vec<u32> = Vec::new();
    for trial in trials {
        seen.clear();
        seen.extend_from_slice(&trial.spike_clusters);
        seen.sort_unstable();
        seen.dedup();
        for c in &seen {
            *counts.entry(*c).or_insert(0) += 1;
        }
    }
    counts
        .into_iter()
        .map(|(id, n_trials)| UnitSummary { id, n_trials, included: n_trials > min_trials })
        .collect()
}
