//! Temporal basis functions.
//!
//! Each constructor returns a `TB × M` matrix: `TB` time bins by `M` basis
//! functions, ready to pass to [`crate::CovariateBuilder::add_covariate_timing`].
//!
//! - [`raised_cosine`]: evenly spaced raised-cosine bumps.
//! - [`nonlinear_raised_cosine`]: raised cosines on a log-stretched time
//!   axis (Pillow et al. 2008), narrow near the event and wide later.
//! - [`boxcar_basis`]: consecutive non-overlapping boxes.
//! - [`impulse`]: the 1 × 1 identity; convolution leaves the regressor unchanged.
use std::f64::consts::PI;

use ndarray::Array2;

/// Raised cosine `(cos(clamp(x, -π, π)) + 1) / 2`.
#[inline]
fn bump(x: f64) -> f64 {
    (x.clamp(-PI, PI).cos() + 1.0) / 2.0
}

/// `n_bases` raised cosines tiling `n_bins` bins with linearly spaced centres.
///
/// Each bump reaches zero at its neighbours' centres, so rows sum to 1.
pub fn raised_cosine(n_bases: usize, n_bins: usize) -> Array2<f64> {
    if n_bases == 0 || n_bins == 0 {
        return Array2::zeros((n_bins, n_bases));
    }
    let last = (n_bins - 1) as f64;
    let spacing = if n_bases > 1 { last / (n_bases - 1) as f64 } else { last.max(1.0) };
    Array2::from_shape_fn((n_bins, n_bases), |(t, j)| {
        let centre = j as f64 * spacing;
        bump((t as f64 - centre) * PI / spacing)
    })
}

/// Log-stretched raised-cosine basis.
///
/// * `binwidth`   – bin width in seconds.
/// * `end_points` – centres of the first and last bump, in seconds.
/// * `nl_offset`  – offset added before taking the log (seconds); larger
///   values make the stretching closer to linear.
///
/// The basis extends until the last bump has decayed to zero, so `TB`
/// depends on the arguments.
pub fn nonlinear_raised_cosine(
    n_bases: usize,
    binwidth: f64,
    end_points: (f64, f64),
    nl_offset: f64,
) -> Array2<f64> {
    let nlin = |x: f64| (x + 1e-20).ln();
    let invnl = |x: f64| x.exp() - 1e-20;

    if n_bases == 0 {
        return Array2::zeros((0, 0));
    }
    let y0 = nlin(end_points.0 + nl_offset);
    let y1 = nlin(end_points.1 + nl_offset);
    let db = if n_bases > 1 { (y1 - y0) / (n_bases - 1) as f64 } else { (y1 - y0).max(1.0) };

    let max_t = invnl(y1 + 2.0 * db) - nl_offset;
    let n_bins = (max_t / binwidth).ceil().max(1.0) as usize;

    Array2::from_shape_fn((n_bins, n_bases), |(t, j)| {
        let y = nlin(t as f64 * binwidth + nl_offset);
        let centre = y0 + db * j as f64;
        bump((y - centre) * PI / db / 2.0)
    })
}

/// `n_bases` boxes of height 1, each `width_bins` wide, one after another.
///
/// ```
/// use neuroglm::basis::boxcar_basis;
/// let b = boxcar_basis(2, 1);
/// assert_eq!(b, ndarray::array![[1.0, 0.0], [0.0, 1.0]]);
/// ```
pub fn boxcar_basis(n_bases: usize, width_bins: usize) -> Array2<f64> {
    Array2::from_shape_fn((n_bases * width_bins, n_bases), |(t, j)| {
        if t / width_bins == j { 1.0 } else { 0.0 }
    })
}

/// The `1 × 1` identity basis.
pub fn impulse() -> Array2<f64> {
    Array2::ones((1, 1))
}
