/// Shared helpers: synthetic sessions and safetensors read-back.
use ndarray::{Array, IxDyn};
use neuroglm::{ColumnValues, TrialTable};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

#[allow(unused)]
/// Column-kind map from `(name, kind)` pairs.
pub fn vartypes(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[allow(unused)]
/// The three-trial session used throughout: durations 1.0, 0.5, 2.0 s and
/// stimulus onsets 0.2, 0.1, 1.1 s after trial start.
pub fn three_trials() -> (TrialTable, BTreeMap<String, String>) {
    let table = TrialTable::new(vec![0.0, 1.5, 2.5], vec![1.0, 2.0, 4.5])
        .with_column("stimOn_times", ColumnValues::Scalars(vec![0.2, 0.1, 1.1]))
        .with_column("feedback_times", ColumnValues::Scalars(vec![0.8, 0.4, 1.9]))
        .with_column("contrast", ColumnValues::Scalars(vec![1.0, 0.0625, 0.5]));
    let vt = vartypes(&[
        ("stimOn_times", "timing"),
        ("feedback_times", "timing"),
        ("contrast", "value"),
    ]);
    (table, vt)
}

#[allow(unused)]
/// `n` back-to-back 1 s trials separated by 0.5 s gaps, with stimulus onset
/// drifting through the trial and one spike per trial for every unit in
/// `units`, plus a spike in every gap that must never be assigned.
pub fn regular_session(n: usize, units: &[u32]) -> (TrialTable, BTreeMap<String, String>, Vec<f64>, Vec<u32>) {
    let starts: Vec<f64> = (0..n).map(|i| i as f64 * 1.5).collect();
    let ends: Vec<f64> = starts.iter().map(|s| s + 1.0).collect();
    let stim: Vec<f64> = (0..n).map(|i| 0.1 + 0.7 * ((i * 37) % 100) as f64 / 100.0).collect();

    let mut times = Vec::new();
    let mut clusters = Vec::new();
    for (i, &s) in starts.iter().enumerate() {
        for (k, &u) in units.iter().enumerate() {
            times.push(s + 0.05 + 0.01 * k as f64 + 0.3 * (i % 3) as f64);
            clusters.push(u);
        }
        times.push(s + 1.2);
        clusters.push(999);
    }
    // keep the global array sorted
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by(|&a, &b| times[a].total_cmp(&times[b]));
    let times: Vec<f64> = order.iter().map(|&i| times[i]).collect();
    let clusters: Vec<u32> = order.iter().map(|&i| clusters[i]).collect();

    let table = TrialTable::new(starts, ends)
        .with_column("stimOn_times", ColumnValues::Scalars(stim));
    (table, vartypes(&[("stimOn_times", "timing")]), times, clusters)
}

#[allow(unused)]
/// Read every tensor of a safetensors file, converted to f64, plus its metadata.
/// Handles F32, F64, I32, I64.
pub fn load_tensors_f64(path: &Path) -> (HashMap<String, Array<f64, IxDyn>>, BTreeMap<String, String>) {
    let bytes = std::fs::read(path)
        .unwrap_or_else(|_| panic!("tensor file not found: {}", path.display()));

    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header: serde_json::Value = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
    let data_start = 8 + n;

    let mut out = HashMap::new();
    let mut metadata = BTreeMap::new();
    for (key, val) in header.as_object().unwrap() {
        if key == "__metadata__" {
            for (k, v) in val.as_object().unwrap() {
                metadata.insert(k.clone(), v.as_str().unwrap().to_string());
            }
            continue;
        }
        let dtype = val["dtype"].as_str().unwrap();
        let offsets = val["data_offsets"].as_array().unwrap();
        let s = offsets[0].as_u64().unwrap() as usize;
        let e = offsets[1].as_u64().unwrap() as usize;
        let raw = &bytes[data_start + s..data_start + e];
        let shape: Vec<usize> = val["shape"].as_array().unwrap()
            .iter().map(|v| v.as_u64().unwrap() as usize).collect();

        let vals: Vec<f64> = match dtype {
            "F32" => raw.chunks_exact(4)
                .map(|b| f32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "F64" => raw.chunks_exact(8)
                .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
                .collect(),
            "I32" => raw.chunks_exact(4)
                .map(|b| i32::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            "I64" => raw.chunks_exact(8)
                .map(|b| i64::from_le_bytes(b.try_into().unwrap()) as f64)
                .collect(),
            _ => continue,
        };

        let arr = Array::from_shape_vec(IxDyn(&shape), vals).unwrap();
        out.insert(key.clone(), arr);
    }
    (out, metadata)
}
