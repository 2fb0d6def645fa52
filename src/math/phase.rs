//! Phase utilities: unwrapping and linear-trend estimation.
//!
//! The delay estimator needs two primitives:
//!
//! - unwrap a wrapped phase sequence so a linear trend becomes visible
//! - fit the slope of that trend against angular frequency
//!
//! Both operate on plain slices and make no assumptions beyond finiteness
//! of the inputs they actually use.

use std::f64::consts::PI;

/// Unwrap a phase sequence (radians).
///
/// Successive differences are shifted by multiples of `2π` so that each
/// step lies in `(-π, π]`. The first element is returned unchanged.
pub fn unwrap_phase(phase: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(phase.len());
    let mut offset = 0.0;
    for (i, &p) in phase.iter().enumerate() {
        if i > 0 {
            let mut d = p + offset - out[i - 1];
            while d > PI {
                offset -= 2.0 * PI;
                d -= 2.0 * PI;
            }
            while d <= -PI {
                offset += 2.0 * PI;
                d += 2.0 * PI;
            }
        }
        out.push(p + offset);
    }
    out
}

/// Least-squares slope of `y` against `x` (centered formulation).
///
/// Returns `None` when fewer than two usable points remain or the `x`
/// spread is degenerate. Non-finite pairs are skipped rather than
/// poisoning the estimate.
pub fn linear_slope(x: &[f64], y: &[f64]) -> Option<f64> {
    let mut n = 0.0;
    let mut sx = 0.0;
    let mut sy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if xi.is_finite() && yi.is_finite() {
            n += 1.0;
            sx += xi;
            sy += yi;
        }
    }
    if n < 2.0 {
        return None;
    }
    let xbar = sx / n;
    let ybar = sy / n;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        if xi.is_finite() && yi.is_finite() {
            let dx = xi - xbar;
            cov += dx * (yi - ybar);
            var += dx * dx;
        }
    }
    if var <= 1e-18 || !cov.is_finite() {
        return None;
    }
    Some(cov / var)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_recovers_linear_phase() {
        // A steep linear phase wraps many times over [0, π); unwrapping
        // must restore the straight line.
        let slope = -7.5;
        let omegas: Vec<f64> = (0..100).map(|i| i as f64 * PI / 100.0).collect();
        let wrapped: Vec<f64> = omegas
            .iter()
            .map(|&w| {
                let p = slope * w;
                (p.sin()).atan2(p.cos())
            })
            .collect();

        let unwrapped = unwrap_phase(&wrapped);
        for (&w, &p) in omegas.iter().zip(unwrapped.iter()) {
            assert!((p - slope * w).abs() < 1e-9, "at ω={w}: {p} vs {}", slope * w);
        }
    }

    #[test]
    fn unwrap_leaves_smooth_phase_untouched() {
        let phase = [0.0, 0.2, 0.5, 0.4, 0.1];
        let unwrapped = unwrap_phase(&phase);
        for (a, b) in phase.iter().zip(unwrapped.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn linear_slope_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let s = linear_slope(&x, &y).unwrap();
        assert!((s - 2.0).abs() < 1e-12);
    }

    #[test]
    fn linear_slope_degenerate_x_is_none() {
        let x = [2.0, 2.0, 2.0];
        let y = [1.0, 2.0, 3.0];
        assert!(linear_slope(&x, &y).is_none());
    }
}
