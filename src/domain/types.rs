//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported by callers (JSON/CSV) without conversion glue
//! - reloaded later for evaluation or comparisons
//!
//! The frequency grid and the target response themselves are plain slices
//! (`&[f64]` / `&[Complex64]`): they are constructed fresh per fitting run,
//! consumed by the engine, and never mutated by it.

use serde::{Deserialize, Serialize};

/// Target numerator/denominator orders for a fit.
///
/// `na` is the denominator order, `nb` the numerator order. A filter of
/// order `(na, nb)` has `na + 1` denominator and `nb + 1` numerator
/// coefficients, of which the leading denominator coefficient is pinned
/// to 1, leaving `na + nb + 1` free parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOrder {
    pub na: usize,
    pub nb: usize,
}

impl FilterOrder {
    pub fn new(na: usize, nb: usize) -> Self {
        Self { na, nb }
    }

    /// Number of free parameters solved for (`a1..a_na`, `b0..b_nb`).
    pub fn unknowns(&self) -> usize {
        self.na + self.nb + 1
    }
}

/// A fitted IIR filter: coefficient polynomials plus a pure time delay.
///
/// Invariants (established by the fitting engine):
/// - `a.len() == na + 1` with `a[0] == 1.0`
/// - `b.len() == nb + 1`
/// - `tau` is the delay in samples absorbed by the filter; compensating
///   the filter's response with `e^{+jωτ}` recovers the target's phase.
///
/// Immutable once produced; owned solely by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFilter {
    /// Numerator coefficients `b0..b_nb`.
    pub b: Vec<f64>,
    /// Denominator coefficients `a0..a_na`, normalized so `a[0] == 1`.
    pub a: Vec<f64>,
    /// Estimated pure time delay in samples.
    pub tau: f64,
}

impl FittedFilter {
    /// The orders this filter was fit with.
    pub fn order(&self) -> FilterOrder {
        FilterOrder::new(self.a.len() - 1, self.b.len() - 1)
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    /// Final weighted sum-of-squares equation error.
    pub residual: f64,
    /// Reweighting iterations actually performed.
    pub iterations: usize,
    /// Whether the coefficient update met the convergence tolerance.
    pub converged: bool,
    /// Largest denominator pole magnitude (`0` for an all-zero filter).
    /// Values below 1 mean the filter is stable.
    pub max_pole_radius: f64,
    /// Number of frequency samples fit against.
    pub n: usize,
}

/// Fit output: the filter together with its quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub filter: FittedFilter,
    pub quality: FitQuality,
}
