//! Basis-function convolution.
//!
//! Every regressor column is convolved with every (masked-in) basis column
//! and the full linear convolution, of length `T + TB - 1`, is cut back to
//! the trial's `T` bins:
//!
//! ```text
//! full[n] = Σ_i x[i] · b[n - i]            n = 0 .. T + TB - 2
//! out[t]  = full[t - offset]               t = 0 .. T - 1   (0 outside full)
//! ```
//!
//! A positive offset delays the response by `offset` bins, a negative one
//! advances it. This is the same as zero-padding the regressor by `|offset|`
//! bins on one edge, convolving, and slicing `T` rows back out.
//!
//! Sparse regressors and short kernels are summed directly; the rest go
//! through an FFT (`rustfft`, `f64`). Both paths produce the same result up
//! to rounding and agree exactly on where it is zero.
use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};

use crate::error::{GlmError, Result};

/// Convolutions where either input has at most this many non-zero samples
/// are computed by direct summation.
pub const DIRECT_MAX_TAPS: usize = 64;

/// Full discrete linear convolution of `x` and `h` (length `len(x) + len(h) - 1`).
///
/// Returns an empty vector when either input is empty.
pub fn conv_full(x: &[f64], h: &[f64]) -> Vec<f64> {
    conv_full_with(&mut FftPlanner::new(), x, h)
}

/// [`conv_full`] drawing FFT plans from `planner`.
///
/// Inputs with at most [`DIRECT_MAX_TAPS`] non-zero samples (impulse trains,
/// boxcars) or kernels that short are summed directly; the rest go through
/// the FFT.
fn conv_full_with(planner: &mut FftPlanner<f64>, x: &[f64], h: &[f64]) -> Vec<f64> {
    if x.is_empty() || h.is_empty() {
        return vec![];
    }
    let nnz = |v: &[f64]| v.iter().filter(|&&a| a != 0.0).count();
    if nnz(x).min(nnz(h)) <= DIRECT_MAX_TAPS {
        conv_direct(x, h)
    } else {
        conv_fft_with(planner, x, h)
    }
}

/// Direct-summation convolution.
pub fn conv_direct(x: &[f64], h: &[f64]) -> Vec<f64> {
    if x.is_empty() || h.is_empty() {
        return vec![];
    }
    let mut out = vec![0.0_f64; x.len() + h.len() - 1];
    for (i, &xi) in x.iter().enumerate() {
        // impulse and boxcar regressors are mostly zero
        if xi == 0.0 {
            continue;
        }
        for (o, &hj) in out[i..].iter_mut().zip(h) {
            *o += xi * hj;
        }
    }
    out
}

/// FFT convolution: zero-pad both inputs to a power of two ≥ `len(x) + len(h) - 1`,
/// multiply the spectra and transform back.
///
/// Samples outside the support of the true result,
/// `first_nz(x) + first_nz(h) ..= last_nz(x) + last_nz(h)`, are exactly zero;
/// inside it the values carry FFT rounding.
pub fn conv_fft(x: &[f64], h: &[f64]) -> Vec<f64> {
    conv_fft_with(&mut FftPlanner::new(), x, h)
}

fn conv_fft_with(planner: &mut FftPlanner<f64>, x: &[f64], h: &[f64]) -> Vec<f64> {
    if x.is_empty() || h.is_empty() {
        return vec![];
    }
    let n_out = x.len() + h.len() - 1;
    let (Some(sx), Some(sh)) = (support(x), support(h)) else {
        return vec![0.0; n_out];
    };
    let n_fft = n_out.next_power_of_two();

    let fft_fwd = planner.plan_fft_forward(n_fft);
    let fft_inv = planner.plan_fft_inverse(n_fft);

    let mut xb = padded_complex(x, n_fft);
    let mut hb = padded_complex(h, n_fft);
    fft_fwd.process(&mut xb);
    fft_fwd.process(&mut hb);

    for (a, &b) in xb.iter_mut().zip(hb.iter()) {
        *a *= b;
    }
    fft_inv.process(&mut xb);

    let (lo, hi) = (sx.0 + sh.0, sx.1 + sh.1);
    let inv_scale = 1.0 / n_fft as f64;
    xb[..n_out]
        .iter()
        .enumerate()
        .map(|(n, c)| if (lo..=hi).contains(&n) { c.re * inv_scale } else { 0.0 })
        .collect()
}

/// Convolve each column of `x` (`T × dx`) with each basis in `bases`
/// (`TB × M`), keeping the first `T` samples.
///
/// `mask` (`dx × M`) selects which (column, basis) pairs are computed; `None`
/// computes all of them. Output columns are grouped by regressor column in
/// ascending order, then by basis index, so the result is
/// `T × (number of selected pairs)`.
pub fn denseconv(
    x: ArrayView2<'_, f64>,
    bases: ArrayView2<'_, f64>,
    mask: Option<ArrayView2<'_, bool>>,
) -> Result<Array2<f64>> {
    convbasis(x, bases, 0, mask)
}

/// [`denseconv`] with a temporal offset in bins (positive = delay).
pub fn convbasis(
    x: ArrayView2<'_, f64>,
    bases: ArrayView2<'_, f64>,
    offset: isize,
    mask: Option<ArrayView2<'_, bool>>,
) -> Result<Array2<f64>> {
    let (n_t, n_x) = x.dim();
    let n_b = bases.ncols();

    if let Some(m) = mask {
        if m.dim() != (n_x, n_b) {
            return Err(GlmError::ShapeMismatch {
                expected: vec![n_x, n_b],
                actual: m.shape().to_vec(),
            });
        }
    }
    let selected = |k: usize, j: usize| mask.map_or(true, |m| m[[k, j]]);
    let n_out = (0..n_x)
        .map(|k| (0..n_b).filter(|&j| selected(k, j)).count())
        .sum();

    let basis_cols: Vec<Vec<f64>> = bases.columns().into_iter().map(|c| c.to_vec()).collect();
    let mut planner = FftPlanner::new();
    let mut out = Array2::<f64>::zeros((n_t, n_out));
    let mut col = 0;

    for k in 0..n_x {
        let xk = x.column(k).to_vec();
        for (j, b) in basis_cols.iter().enumerate() {
            if !selected(k, j) {
                continue;
            }
            let full = conv_full_with(&mut planner, &xk, b);
            for (t, o) in out.column_mut(col).iter_mut().enumerate() {
                *o = shifted(&full, t, offset);
            }
            col += 1;
        }
    }
    Ok(out)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// `full[t - offset]`, or 0 outside `full`.
#[inline]
fn shifted(full: &[f64], t: usize, offset: isize) -> f64 {
    let src = t as isize - offset;
    if src < 0 {
        return 0.0;
    }
    full.get(src as usize).copied().unwrap_or(0.0)
}

/// First and last index of a non-zero sample.
fn support(v: &[f64]) -> Option<(usize, usize)> {
    let first = v.iter().position(|&a| a != 0.0)?;
    let last = v.iter().rposition(|&a| a != 0.0)?;
    Some((first, last))
}

fn padded_complex(v: &[f64], n: usize) -> Vec<Complex<f64>> {
    v.iter()
        .map(|&re| Complex { re, im: 0.0 })
        .chain(std::iter::repeat(Complex::default()))
        .take(n)
        .collect()
}
