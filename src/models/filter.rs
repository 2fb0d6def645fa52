//! Discrete rational transfer-function evaluation and pole diagnostics.
//!
//! The fitter relies on three primitive operations:
//!
//! - evaluate a real-coefficient polynomial at `z = e^{jω}` (in negative
//!   powers, i.e. `Σ c_k e^{-jωk}`)
//! - evaluate the rational response `B/A` over a frequency grid, with or
//!   without delay compensation
//! - compute denominator poles for stability diagnostics
//!
//! Poles are obtained as eigenvalues of the companion matrix of the
//! denominator polynomial.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::domain::FittedFilter;

/// Floor applied before taking logarithms in dB conversion.
const DB_FLOOR: f64 = 1e-300;

/// Evaluate `Σ c_k e^{-jωk}` by Horner's rule.
///
/// This is the value of the polynomial `c` (in `z^{-1}`) on the unit
/// circle at normalized angular frequency `ω`.
pub fn eval_poly(coeffs: &[f64], omega: f64) -> Complex64 {
    let z = Complex64::from_polar(1.0, -omega);
    let mut acc = Complex64::new(0.0, 0.0);
    for &c in coeffs.iter().rev() {
        acc = acc * z + c;
    }
    acc
}

/// Frequency response `B(e^{jω}) / A(e^{jω})` at the given normalized
/// angular frequencies (radians/sample).
pub fn freq_response(b: &[f64], a: &[f64], omegas: &[f64]) -> Vec<Complex64> {
    omegas
        .iter()
        .map(|&w| eval_poly(b, w) / eval_poly(a, w))
        .collect()
}

/// Response of a fitted filter with its delay compensated.
///
/// The fitted rational part absorbs `tau` samples of delay; multiplying
/// by `e^{+jωτ}` aligns its phase with the original target response.
pub fn compensated_response(filter: &FittedFilter, omegas: &[f64]) -> Vec<Complex64> {
    omegas
        .iter()
        .map(|&w| {
            let h = eval_poly(&filter.b, w) / eval_poly(&filter.a, w);
            h * Complex64::from_polar(1.0, w * filter.tau)
        })
        .collect()
}

/// z-plane poles of a denominator polynomial `a0..a_na` (with `a0 != 0`).
///
/// Returns the roots of `a0·z^na + a1·z^(na-1) + ... + a_na`, computed as
/// the complex eigenvalues of the monic companion matrix. An order-zero
/// denominator has no poles.
pub fn poles(a: &[f64]) -> Vec<Complex64> {
    let na = a.len().saturating_sub(1);
    if na == 0 {
        return Vec::new();
    }

    let a0 = a[0];
    let mut companion = DMatrix::<f64>::zeros(na, na);
    for m in 1..=na {
        companion[(0, m - 1)] = -a[m] / a0;
    }
    for i in 1..na {
        companion[(i, i - 1)] = 1.0;
    }

    companion.complex_eigenvalues().iter().copied().collect()
}

/// Largest pole magnitude of a denominator polynomial (`0` when there
/// are no poles).
pub fn max_pole_radius(a: &[f64]) -> f64 {
    poles(a).iter().map(|p| p.norm()).fold(0.0, f64::max)
}

/// Whether all denominator poles lie strictly inside the unit circle.
pub fn is_stable(a: &[f64]) -> bool {
    max_pole_radius(a) < 1.0
}

/// Magnitude response in decibels: `20·log10(|H|)`, floored to avoid
/// `-inf` at exact zeros.
pub fn magnitude_db(h: &[Complex64]) -> Vec<f64> {
    h.iter().map(|v| 20.0 * v.norm().max(DB_FLOOR).log10()).collect()
}

/// Wrapped phase response in radians.
pub fn phase(h: &[Complex64]) -> Vec<f64> {
    h.iter().map(|v| v.arg()).collect()
}
