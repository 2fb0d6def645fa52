//! Side-by-side response comparison.
//!
//! After a fit, the typical verification step re-evaluates both the
//! reference model and the fitted filter on a denser frequency grid and
//! compares magnitude (dB) and phase. This module computes those curves;
//! presentation (plotting, printing) is left to the caller.

use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::FittedFilter;
use crate::error::FitError;
use crate::models::{compensated_response, magnitude_db, phase, SecondOrderSystem};

/// Magnitude/phase curves of one system over a shared grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCurve {
    /// Magnitude in dB (`20·log10|H|`).
    pub magnitude_db: Vec<f64>,
    /// Wrapped phase in radians; `math::unwrap_phase` is available if a
    /// continuous phase is wanted.
    pub phase_rad: Vec<f64>,
}

/// Reference vs fitted curves, co-indexed with `freqs_hz`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseComparison {
    pub freqs_hz: Vec<f64>,
    pub reference: ResponseCurve,
    pub fitted: ResponseCurve,
}

/// Evaluate reference model and delay-compensated fitted filter over a
/// frequency grid (Hz).
///
/// The same Nyquist bound as the fitting engine applies: `fs` must
/// exceed twice the largest grid frequency for the discrete evaluation
/// to be meaningful.
pub fn compare(
    system: &SecondOrderSystem,
    filter: &FittedFilter,
    freqs_hz: &[f64],
    fs: f64,
) -> Result<ResponseComparison, FitError> {
    if freqs_hz.is_empty() {
        return Err(FitError::invalid_configuration("Comparison grid is empty."));
    }
    if !fs.is_finite() || fs <= 0.0 {
        return Err(FitError::invalid_configuration(format!(
            "Sample rate must be finite and positive, got {fs}."
        )));
    }
    if freqs_hz.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(FitError::invalid_configuration(
            "Comparison frequencies must be finite and non-negative.",
        ));
    }
    let f_max = freqs_hz.iter().copied().fold(0.0, f64::max);
    if fs <= 2.0 * f_max {
        return Err(FitError::invalid_configuration(format!(
            "Sample rate {fs} Hz must exceed twice the largest grid frequency ({} Hz).",
            2.0 * f_max
        )));
    }

    // Comparison grids are typically much denser than fitting grids;
    // points are independent, so evaluate them in parallel.
    let h_ref = freqs_hz
        .par_iter()
        .map(|&f| system.response_at(f))
        .collect::<Vec<_>>();
    let omegas: Vec<f64> = freqs_hz.iter().map(|&f| 2.0 * PI * f / fs).collect();
    let h_fit = compensated_response(filter, &omegas);

    Ok(ResponseComparison {
        freqs_hz: freqs_hz.to_vec(),
        reference: ResponseCurve {
            magnitude_db: magnitude_db(&h_ref),
            phase_rad: phase(&h_ref),
        },
        fitted: ResponseCurve {
            magnitude_db: magnitude_db(&h_fit),
            phase_rad: phase(&h_fit),
        },
    })
}
