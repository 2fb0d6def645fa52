//! Delay estimation from the phase difference between target and fit.
//!
//! The rational part of a fitted filter cannot represent a pure linear
//! phase term cheaply; instead the engine separates it out as a scalar
//! delay `tau` (in samples). If the fitted response satisfies
//! `B/A ≈ e^{-jωτ}·H`, then:
//!
//! ```text
//! arg(H) - arg(B/A) ≈ ω·τ
//! ```
//!
//! so the slope of the unwrapped phase difference against `ω` is the
//! delay itself.

use num_complex::Complex64;

use crate::math::{linear_slope, unwrap_phase};

/// Estimate the pure delay (in samples) separating `target` from `fitted`.
///
/// Both responses must be sampled at the same normalized angular
/// frequencies `omegas`. When the grid is too degenerate for a slope
/// estimate (fewer than two usable points, or no spread in `ω`), the
/// previous estimate `fallback` is returned unchanged.
pub fn estimate_delay(
    target: &[Complex64],
    fitted: &[Complex64],
    omegas: &[f64],
    fallback: f64,
) -> f64 {
    let diff: Vec<f64> = target
        .iter()
        .zip(fitted.iter())
        .map(|(h, g)| h.arg() - g.arg())
        .collect();
    let unwrapped = unwrap_phase(&diff);

    match linear_slope(omegas, &unwrapped) {
        Some(slope) if slope.is_finite() => slope,
        _ => fallback,
    }
}
