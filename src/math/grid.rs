//! Frequency grid helpers.

/// `n` evenly spaced points from `start` to `stop`, inclusive.
///
/// `n == 0` yields an empty grid and `n == 1` yields `[start]`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
