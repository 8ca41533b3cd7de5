//! Session input and design-matrix export.
//!
//! Reader: [`SessionFile`], a JSON description of one session (trial table,
//! column kinds, spikes) as written by the extraction scripts. JSON has no
//! NaN, so missing values are `null`.
//!
//! Writer: [`StWriter`], a minimal safetensors writer, and [`write_design`],
//! which stores a compiled design matrix in CSR form together with its row
//! provenance, column ranges and (optionally) the binned spike counts.
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use ndarray::Array2;
use serde::Deserialize;

use crate::design::DesignMatrix;
use crate::response::BinnedSpikes;
use crate::trials::{ColumnValues, TrialTable};

// ── Session JSON ──────────────────────────────────────────────────────────────

/// One column of the session file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ColumnJson {
    /// `timing` / `value` column: one number (or `null`) per trial.
    Scalars(Vec<Option<f64>>),
    /// `continuous` column: per trial, a list of `[value, time]` samples.
    Samples(Vec<Vec<[f64; 2]>>),
}

/// Session description: everything [`crate::NeuralGlm::new`] needs.
///
/// ```json
/// {
///   "trial_start":    [0.0, 2.1, null],
///   "trial_end":      [1.9, 4.0, 6.2],
///   "columns":        { "stimOn_times": [0.3, 0.25, 0.4],
///                       "contrast":     [1.0, 0.25, 0.0] },
///   "vartypes":       { "stimOn_times": "timing", "contrast": "value" },
///   "spike_times":    [0.01, 0.35, 2.5],
///   "spike_clusters": [4, 4, 12]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SessionFile {
    pub trial_start: Vec<Option<f64>>,
    pub trial_end: Vec<Option<f64>>,
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnJson>,
    #[serde(default)]
    pub vartypes: BTreeMap<String, String>,
    #[serde(default)]
    pub spike_times: Vec<f64>,
    #[serde(default)]
    pub spike_clusters: Vec<u32>,
}

impl SessionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading session file {}", path.display()))?;
        serde_json::from_slice(&bytes).context("failed to parse session JSON")
    }

    /// Split into `(table, vartypes, spike_times, spike_clusters)`, mapping
    /// `null` to NaN.
    pub fn into_parts(self) -> Result<(TrialTable, BTreeMap<String, String>, Vec<f64>, Vec<u32>)> {
        let nan = |v: Option<f64>| v.unwrap_or(f64::NAN);
        let mut table = TrialTable::new(
            self.trial_start.into_iter().map(nan).collect(),
            self.trial_end.into_iter().map(nan).collect(),
        );
        for (name, column) in self.columns {
            let values = match column {
                ColumnJson::Scalars(v) => ColumnValues::Scalars(v.into_iter().map(nan).collect()),
                ColumnJson::Samples(trials) => {
                    let mut arrays = Vec::with_capacity(trials.len());
                    for samples in trials {
                        let n = samples.len();
                        let flat: Vec<f64> = samples.into_iter().flatten().collect();
                        arrays.push(
                            Array2::from_shape_vec((n, 2), flat)
                                .with_context(|| format!("column {name:?}"))?,
                        );
                    }
                    ColumnValues::Samples(arrays)
                }
            };
            table.columns.push((name, values));
        }
        Ok((table, self.vartypes, self.spike_times, self.spike_clusters))
    }
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer for F64 and I64 tensors plus string metadata.
///
/// Usage:
/// ```rust,no_run
/// use neuroglm::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("weights", &[1.0, 2.0, 3.0], &[1, 3]);
/// w.add_i64("rows", &[0, 0, 1], &[3]);
/// w.set_metadata("binwidth", "0.02");
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
    metadata: BTreeMap<String, String>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_i64(&mut self, name: &str, data: &[i64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I64", shape.to_vec()));
    }

    /// Add a `__metadata__` entry.
    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        if !self.metadata.is_empty() {
            header_map.insert("__metadata__".into(), serde_json::to_value(&self.metadata)?);
        }
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            if header_map.contains_key(name) {
                bail!("duplicate tensor name {name:?}");
            }
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

// ── Design-matrix writer ──────────────────────────────────────────────────────

/// Write a design matrix to `path` as safetensors.
///
/// Keys:
///   dm_data     [nnz]        f64  CSR values
///   dm_indices  [nnz]        i64  CSR column indices
///   dm_indptr   [rows + 1]   i64  CSR row pointers
///   dm_shape    [2]          i64  (rows, columns)
///   row_trial   [rows]       i64  trial id of each row
///   counts      [rows, U]    f64  binned spikes (only with `spikes`)
///   units       [U]          i64  unit id of each `counts` column
///
/// Metadata `columns` holds the JSON object `{label: [start, end]}`.
pub fn write_design(dm: &DesignMatrix, spikes: Option<&BinnedSpikes>, path: &Path) -> Result<()> {
    let as_i64 = |v: &[usize]| v.iter().map(|&x| x as i64).collect::<Vec<i64>>();
    let m = dm.matrix();

    let mut w = StWriter::new();
    w.add_f64("dm_data", m.data(), &[m.nnz()]);
    w.add_i64("dm_indices", &as_i64(m.indices()), &[m.nnz()]);
    w.add_i64("dm_indptr", &as_i64(m.indptr()), &[m.nrows() + 1]);
    w.add_i64("dm_shape", &[m.nrows() as i64, m.ncols() as i64], &[2]);
    w.add_i64("row_trial", &as_i64(dm.row_trial()), &[dm.n_rows()]);

    if let Some(s) = spikes {
        if s.row_trial != dm.row_trial() {
            bail!("binned spikes are not row-aligned with the design matrix");
        }
        w.add_f64_arr2("counts", &s.counts);
        let units: Vec<i64> = s.units.iter().map(|&u| u as i64).collect();
        w.add_i64("units", &units, &[units.len()]);
    }

    let columns: serde_json::Map<String, serde_json::Value> = dm
        .columns()
        .iter()
        .map(|(label, r)| (label.clone(), serde_json::json!([r.start, r.end])))
        .collect();
    w.set_metadata("columns", serde_json::to_string(&columns)?);
    w.write(path)
}
