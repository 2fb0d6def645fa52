//! Least-squares IIR fitting from frequency-response samples.
//!
//! Given a target complex response `H_k` at frequencies `f_k` (Hz), orders
//! `(na, nb)` and a sample rate `fs`, we solve for real coefficients of
//!
//! ```text
//! B(z)/A(z) ≈ e^{-jωτ} · H(ω),   ω = 2π f / fs
//! ```
//!
//! i.e. the filter absorbs a pure delay of `τ` samples on top of its
//! rational response. Each pass:
//!
//! - delays the target by the current `τ`
//! - builds the stacked real equation-error system
//!   `A(e^{jω})·G_k - B(e^{jω}) ≈ 0` (two rows per sample, one for the
//!   real and one for the imaginary part), each row scaled by the
//!   previous pass's `1/|A(e^{jω})|` weight
//! - solves it by SVD least squares
//! - re-estimates `τ` from the unwrapped phase-difference slope
//!
//! The `1/|A|` reweighting linearizes the rational approximation problem
//! (equation error → output error) and is recomputed in full between
//! passes; the passes themselves are strictly sequential. Row
//! construction inside a pass is per-frequency independent and runs in
//! parallel.

use std::f64::consts::PI;

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rayon::prelude::*;

use crate::domain::{FilterOrder, FitQuality, FitResult, FittedFilter};
use crate::error::FitError;
use crate::fit::delay::estimate_delay;
use crate::math::solve_least_squares;
use crate::models::{eval_poly, freq_response, max_pole_radius};

/// Guard against division by a vanishing `|A(e^{jω})|` when reweighting.
const WEIGHT_FLOOR: f64 = 1e-12;

/// Options controlling the iterative fit.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Upper bound on reweighting passes. Reaching it without meeting
    /// the tolerance is reported as `NumericalInstability`.
    pub max_iterations: usize,
    /// Relative convergence tolerance on the coefficient update:
    /// the fit converges once `‖Δx‖∞ ≤ tolerance · (1 + ‖x‖∞)`.
    pub tolerance: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            tolerance: 1e-6,
        }
    }
}

/// Fit an IIR filter (and pure delay) to a sampled frequency response.
///
/// # Arguments
/// - `hvals`: target complex response, co-indexed with `freqs_hz`
/// - `order`: denominator/numerator orders `(na, nb)`
/// - `freqs_hz`: frequencies of the samples, in Hz
/// - `fs`: sample rate in Hz; must exceed twice the largest frequency
/// - `opts`: iteration cap and convergence tolerance
///
/// Returns the fitted coefficients (`a[0]` normalized to 1), the delay in
/// samples, and quality diagnostics. Caller-supplied slices are never
/// mutated.
pub fn lsiir(
    hvals: &[Complex64],
    order: FilterOrder,
    freqs_hz: &[f64],
    fs: f64,
    opts: &FitOptions,
) -> Result<FitResult, FitError> {
    validate(hvals, order, freqs_hz, fs, opts)?;

    let n = freqs_hz.len();
    let omegas: Vec<f64> = freqs_hz.iter().map(|&f| 2.0 * PI * f / fs).collect();

    let mut tau = 0.0;
    let mut weights = vec![1.0; n];
    let mut x_prev: Option<DVector<f64>> = None;
    let mut coeffs: Option<(Vec<f64>, Vec<f64>)> = None;
    let mut converged = false;
    let mut iterations = 0;

    for _ in 0..opts.max_iterations {
        iterations += 1;

        // Delay the target by the current tau estimate; the rational part
        // is then fit against this shifted response.
        let delayed: Vec<Complex64> = hvals
            .iter()
            .zip(omegas.iter())
            .map(|(h, &w)| h * Complex64::from_polar(1.0, -w * tau))
            .collect();

        let (xw, yw) = build_system(&delayed, &omegas, order, &weights);
        let x = solve_least_squares(&xw, &yw).ok_or_else(|| {
            FitError::singular_system(format!(
                "Least-squares system is rank-deficient ({} samples, {} unknowns); \
                 near-duplicate frequencies or excessive filter orders.",
                n,
                order.unknowns()
            ))
        })?;

        let done = x_prev
            .as_ref()
            .is_some_and(|prev| (&x - prev).amax() <= opts.tolerance * (1.0 + x.amax()));

        let (a, b) = split_coefficients(&x, order);

        // Update state for the next pass (and for the final diagnostics):
        // new tau from the undelayed target vs the current rational fit,
        // new weights from the current denominator.
        let fitted = freq_response(&b, &a, &omegas);
        tau = estimate_delay(hvals, &fitted, &omegas, tau);
        if !tau.is_finite() {
            return Err(FitError::numerical_instability(
                "Delay estimate became non-finite during iteration.",
            ));
        }
        weights = sk_weights(&a, &omegas);

        x_prev = Some(x);
        coeffs = Some((a, b));

        if done {
            converged = true;
            break;
        }
    }

    let Some((a, b)) = coeffs else {
        return Err(FitError::numerical_instability(
            "No iterations produced a coefficient estimate.",
        ));
    };

    if !converged {
        return Err(FitError::numerical_instability(format!(
            "Coefficient update did not meet tolerance {} within {} iterations.",
            opts.tolerance, opts.max_iterations
        )));
    }

    let residual = weighted_equation_error(hvals, &omegas, &a, &b, tau, &weights);
    if !residual.is_finite() {
        return Err(FitError::numerical_instability(
            "Residual became non-finite after convergence.",
        ));
    }

    let pole_radius = max_pole_radius(&a);
    Ok(FitResult {
        filter: FittedFilter { b, a, tau },
        quality: FitQuality {
            residual,
            iterations,
            converged,
            max_pole_radius: pole_radius,
            n,
        },
    })
}

fn validate(
    hvals: &[Complex64],
    order: FilterOrder,
    freqs_hz: &[f64],
    fs: f64,
    opts: &FitOptions,
) -> Result<(), FitError> {
    if freqs_hz.len() != hvals.len() {
        return Err(FitError::invalid_configuration(format!(
            "Frequency grid and response must be co-indexed: {} frequencies vs {} samples.",
            freqs_hz.len(),
            hvals.len()
        )));
    }
    if freqs_hz.is_empty() {
        return Err(FitError::invalid_configuration("Frequency grid is empty."));
    }
    if order.na == 0 && order.nb == 0 {
        return Err(FitError::invalid_configuration(
            "Nothing to fit: na and nb are both zero.",
        ));
    }
    if !fs.is_finite() || fs <= 0.0 {
        return Err(FitError::invalid_configuration(format!(
            "Sample rate must be finite and positive, got {fs}."
        )));
    }
    if freqs_hz.iter().any(|f| !f.is_finite() || *f < 0.0) {
        return Err(FitError::invalid_configuration(
            "Frequencies must be finite and non-negative.",
        ));
    }
    if hvals.iter().any(|h| !h.re.is_finite() || !h.im.is_finite()) {
        return Err(FitError::invalid_configuration(
            "Target response contains non-finite values.",
        ));
    }

    let f_max = freqs_hz.iter().copied().fold(0.0, f64::max);
    if fs <= 2.0 * f_max {
        return Err(FitError::invalid_configuration(format!(
            "Sample rate {fs} Hz must exceed twice the largest grid frequency ({} Hz).",
            2.0 * f_max
        )));
    }

    if opts.max_iterations == 0 {
        return Err(FitError::invalid_configuration(
            "Iteration cap must be at least 1.",
        ));
    }
    if !opts.tolerance.is_finite() || opts.tolerance <= 0.0 {
        return Err(FitError::invalid_configuration(format!(
            "Convergence tolerance must be finite and positive, got {}.",
            opts.tolerance
        )));
    }

    // Two real rows per sample, but we require at least as many samples
    // as unknowns so the imaginary rows (identically zero at DC) cannot
    // leave the system underdetermined.
    if freqs_hz.len() < order.unknowns() {
        return Err(FitError::singular_system(format!(
            "Fewer frequency samples ({}) than unknown coefficients ({}).",
            freqs_hz.len(),
            order.unknowns()
        )));
    }

    Ok(())
}

/// One sample's contribution to the stacked system: the real and
/// imaginary parts of its weighted equation, plus the right-hand side.
struct RowPair {
    re: Vec<f64>,
    im: Vec<f64>,
    rhs_re: f64,
    rhs_im: f64,
}

/// Build the weighted stacked system for `A(e^{jω})·G - B(e^{jω}) ≈ 0`.
///
/// Moving the known `a0·G` term (with `a0 = 1`) to the right-hand side
/// leaves columns for `a1..a_na` of `G·e^{-jωm}` and for `b0..b_nb` of
/// `-e^{-jωn}`, with RHS `-G`. Rows are independent per frequency and
/// built in parallel.
fn build_system(
    delayed: &[Complex64],
    omegas: &[f64],
    order: FilterOrder,
    weights: &[f64],
) -> (DMatrix<f64>, DVector<f64>) {
    let n = omegas.len();
    let p = order.unknowns();

    let rows: Vec<RowPair> = omegas
        .par_iter()
        .enumerate()
        .map(|(k, &w)| {
            let g = delayed[k];
            let sw = weights[k];
            let mut re = vec![0.0; p];
            let mut im = vec![0.0; p];

            for m in 1..=order.na {
                let c = g * Complex64::from_polar(sw, -w * m as f64);
                re[m - 1] = c.re;
                im[m - 1] = c.im;
            }
            for j in 0..=order.nb {
                let c = Complex64::from_polar(sw, -w * j as f64);
                re[order.na + j] = -c.re;
                im[order.na + j] = -c.im;
            }

            let rhs = -g * sw;
            RowPair {
                re,
                im,
                rhs_re: rhs.re,
                rhs_im: rhs.im,
            }
        })
        .collect();

    let mut xw = DMatrix::<f64>::zeros(2 * n, p);
    let mut yw = DVector::<f64>::zeros(2 * n);
    for (k, row) in rows.iter().enumerate() {
        for j in 0..p {
            xw[(2 * k, j)] = row.re[j];
            xw[(2 * k + 1, j)] = row.im[j];
        }
        yw[2 * k] = row.rhs_re;
        yw[2 * k + 1] = row.rhs_im;
    }
    (xw, yw)
}

/// Split the solved unknown vector back into `(a, b)` with `a[0] = 1`.
fn split_coefficients(x: &DVector<f64>, order: FilterOrder) -> (Vec<f64>, Vec<f64>) {
    let mut a = Vec::with_capacity(order.na + 1);
    a.push(1.0);
    for m in 0..order.na {
        a.push(x[m]);
    }
    let b: Vec<f64> = (0..=order.nb).map(|j| x[order.na + j]).collect();
    (a, b)
}

/// Sanathanan–Koerner weights for the next pass: `1/|A(e^{jω})|`.
fn sk_weights(a: &[f64], omegas: &[f64]) -> Vec<f64> {
    omegas
        .iter()
        .map(|&w| 1.0 / eval_poly(a, w).norm().max(WEIGHT_FLOOR))
        .collect()
}

/// Weighted sum-of-squares equation error at the final iterate.
fn weighted_equation_error(
    hvals: &[Complex64],
    omegas: &[f64],
    a: &[f64],
    b: &[f64],
    tau: f64,
    weights: &[f64],
) -> f64 {
    hvals
        .iter()
        .zip(omegas.iter())
        .zip(weights.iter())
        .map(|((h, &w), &wt)| {
            let g = h * Complex64::from_polar(1.0, -w * tau);
            let e = eval_poly(a, w) * g - eval_poly(b, w);
            let scaled = wt * e.norm();
            scaled * scaled
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linspace;
    use crate::models::{compensated_response, is_stable, magnitude_db, SecondOrderSystem};

    /// Evaluate a known filter's response to use as a fitting target.
    fn rational_target(b: &[f64], a: &[f64], freqs_hz: &[f64], fs: f64) -> Vec<Complex64> {
        let omegas: Vec<f64> = freqs_hz.iter().map(|&f| 2.0 * PI * f / fs).collect();
        freq_response(b, a, &omegas)
    }

    #[test]
    fn round_trip_recovers_known_filter() {
        let b_true = [0.3, -0.1];
        let a_true = [1.0, -0.6];
        let fs = 1000.0;
        let freqs = linspace(0.0, 400.0, 20);
        let hvals = rational_target(&b_true, &a_true, &freqs, fs);

        let fit = lsiir(
            &hvals,
            FilterOrder::new(1, 1),
            &freqs,
            fs,
            &FitOptions::default(),
        )
        .unwrap();

        assert_eq!(fit.filter.a.len(), 2);
        assert_eq!(fit.filter.b.len(), 2);
        assert!((fit.filter.a[0] - 1.0).abs() < 1e-15);
        for (got, want) in fit.filter.a.iter().zip(a_true.iter()) {
            assert!((got - want).abs() < 1e-6, "a: {got} vs {want}");
        }
        for (got, want) in fit.filter.b.iter().zip(b_true.iter()) {
            assert!((got - want).abs() < 1e-6, "b: {got} vs {want}");
        }
        assert!(fit.filter.tau.abs() < 1e-6, "tau: {}", fit.filter.tau);
        assert!(fit.quality.converged);
        assert!(fit.quality.residual < 1e-10);
    }

    #[test]
    fn round_trip_second_order() {
        // A resonant two-pole two-zero filter.
        let b_true = [0.05, 0.1, 0.05];
        let a_true = [1.0, -1.2, 0.5];
        let fs = 100.0;
        let freqs = linspace(0.0, 45.0, 25);
        let hvals = rational_target(&b_true, &a_true, &freqs, fs);

        let fit = lsiir(
            &hvals,
            FilterOrder::new(2, 2),
            &freqs,
            fs,
            &FitOptions::default(),
        )
        .unwrap();

        for (got, want) in fit.filter.a.iter().zip(a_true.iter()) {
            assert!((got - want).abs() < 1e-5, "a: {got} vs {want}");
        }
        for (got, want) in fit.filter.b.iter().zip(b_true.iter()) {
            assert!((got - want).abs() < 1e-5, "b: {got} vs {want}");
        }
    }

    #[test]
    fn identical_inputs_give_identical_outputs() {
        let sys = SecondOrderSystem::new(0.5, 0.1, 50.0);
        let freqs = linspace(0.0, 120.0, 15);
        let hvals = sys.frequency_response(&freqs);
        let fs = 1000.0;

        let one = lsiir(&hvals, FilterOrder::new(2, 2), &freqs, fs, &FitOptions::default()).unwrap();
        let two = lsiir(&hvals, FilterOrder::new(2, 2), &freqs, fs, &FitOptions::default()).unwrap();

        assert_eq!(one.filter, two.filter);
        assert_eq!(one.quality.iterations, two.quality.iterations);
        assert_eq!(one.quality.residual, two.quality.residual);
    }

    #[test]
    fn all_zero_fit_without_denominator() {
        // na = 0: pure FIR fit of an FIR target.
        let b_true = [0.5, 0.25, -0.125];
        let a_true = [1.0];
        let fs = 200.0;
        let freqs = linspace(0.0, 90.0, 12);
        let hvals = rational_target(&b_true, &a_true, &freqs, fs);

        let fit = lsiir(
            &hvals,
            FilterOrder::new(0, 2),
            &freqs,
            fs,
            &FitOptions::default(),
        )
        .unwrap();

        assert_eq!(fit.filter.a, vec![1.0]);
        assert_eq!(fit.filter.b.len(), 3);
        for (got, want) in fit.filter.b.iter().zip(b_true.iter()) {
            assert!((got - want).abs() < 1e-7, "b: {got} vs {want}");
        }
        assert_eq!(fit.quality.max_pole_radius, 0.0);
    }

    #[test]
    fn all_pole_fit_without_numerator_zeros() {
        // nb = 0: single-coefficient numerator against an all-pole target.
        let b_true = [0.4];
        let a_true = [1.0, -0.5, 0.25];
        let fs = 200.0;
        let freqs = linspace(0.0, 90.0, 12);
        let hvals = rational_target(&b_true, &a_true, &freqs, fs);

        let fit = lsiir(
            &hvals,
            FilterOrder::new(2, 0),
            &freqs,
            fs,
            &FitOptions::default(),
        )
        .unwrap();

        assert_eq!(fit.filter.b.len(), 1);
        assert!((fit.filter.b[0] - 0.4).abs() < 1e-6);
        for (got, want) in fit.filter.a.iter().zip(a_true.iter()) {
            assert!((got - want).abs() < 1e-6, "a: {got} vs {want}");
        }
    }

    #[test]
    fn both_orders_zero_is_invalid() {
        let freqs = linspace(0.0, 10.0, 5);
        let hvals = vec![Complex64::new(1.0, 0.0); 5];
        let err = lsiir(&hvals, FilterOrder::new(0, 0), &freqs, 100.0, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)), "{err}");
    }

    #[test]
    fn too_few_samples_is_singular() {
        // 4 samples for 4+4+1 = 9 unknowns.
        let freqs = linspace(0.0, 10.0, 4);
        let hvals = vec![Complex64::new(1.0, 0.0); 4];
        let err = lsiir(&hvals, FilterOrder::new(4, 4), &freqs, 100.0, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::SingularSystem(_)), "{err}");
    }

    #[test]
    fn nyquist_violation_is_invalid() {
        // Grid reaches 80 kHz, so fs must exceed 160 kHz.
        let freqs = linspace(0.0, 80e3, 30);
        let sys = SecondOrderSystem::new(0.124, 0.0055, 36e3);
        let hvals = sys.frequency_response(&freqs);

        let err = lsiir(&hvals, FilterOrder::new(4, 4), &freqs, 150e3, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)), "{err}");
    }

    #[test]
    fn mismatched_lengths_are_invalid() {
        let freqs = linspace(0.0, 10.0, 6);
        let hvals = vec![Complex64::new(1.0, 0.0); 5];
        let err = lsiir(&hvals, FilterOrder::new(1, 1), &freqs, 100.0, &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)), "{err}");
    }

    #[test]
    fn zero_iteration_cap_is_invalid() {
        let freqs = linspace(0.0, 10.0, 6);
        let hvals = vec![Complex64::new(1.0, 0.0); 6];
        let opts = FitOptions {
            max_iterations: 0,
            ..FitOptions::default()
        };
        let err = lsiir(&hvals, FilterOrder::new(1, 1), &freqs, 100.0, &opts).unwrap_err();
        assert!(matches!(err, FitError::InvalidConfiguration(_)), "{err}");
    }

    #[test]
    fn second_order_sensor_scenario() {
        // The reference scenario: an underdamped sensor resonance at
        // 36 kHz fit with a 4/4 filter at fs = 500 kHz.
        let sys = SecondOrderSystem::new(0.124, 0.0055, 36e3);
        let fs = 500e3;
        let freqs = linspace(0.0, 80e3, 30);
        let hvals = sys.frequency_response(&freqs);

        let fit = lsiir(
            &hvals,
            FilterOrder::new(4, 4),
            &freqs,
            fs,
            &FitOptions::default(),
        )
        .unwrap();

        assert_eq!(fit.filter.a.len(), 5);
        assert_eq!(fit.filter.b.len(), 5);
        assert!((fit.filter.a[0] - 1.0).abs() < 1e-15);
        assert!(fit.quality.converged);
        assert!(is_stable(&fit.filter.a), "max pole radius {}", fit.quality.max_pole_radius);

        // Magnitude must track the reference within a few dB around the
        // resonance peak.
        let dense = linspace(20e3, 50e3, 121);
        let omegas: Vec<f64> = dense.iter().map(|&f| 2.0 * PI * f / fs).collect();
        let ref_db = magnitude_db(&sys.frequency_response(&dense));
        let fit_db = magnitude_db(&compensated_response(&fit.filter, &omegas));
        for ((&f, &r), &m) in dense.iter().zip(ref_db.iter()).zip(fit_db.iter()) {
            assert!((r - m).abs() < 5.0, "at {f} Hz: reference {r} dB vs fit {m} dB");
        }
    }

    #[test]
    fn noisy_target_still_recovers_coefficients() {
        use rand::prelude::*;
        use rand::rngs::StdRng;
        use rand_distr::Normal;

        let b_true = [0.3, -0.1];
        let a_true = [1.0, -0.6];
        let fs = 1000.0;
        let freqs = linspace(0.0, 400.0, 40);
        let clean = rational_target(&b_true, &a_true, &freqs, fs);

        let mut rng = StdRng::seed_from_u64(17);
        let normal = Normal::new(0.0, 1e-4).expect("valid sigma");
        let noisy: Vec<Complex64> = clean
            .iter()
            .map(|h| h + Complex64::new(normal.sample(&mut rng), normal.sample(&mut rng)))
            .collect();

        let fit = lsiir(
            &noisy,
            FilterOrder::new(1, 1),
            &freqs,
            fs,
            &FitOptions::default(),
        )
        .unwrap();

        for (got, want) in fit.filter.a.iter().zip(a_true.iter()) {
            assert!((got - want).abs() < 1e-2, "a: {got} vs {want}");
        }
        for (got, want) in fit.filter.b.iter().zip(b_true.iter()) {
            assert!((got - want).abs() < 1e-2, "b: {got} vs {want}");
        }
    }
}
