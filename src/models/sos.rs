//! Canonical second-order reference system.
//!
//! Many measuring systems (accelerometers, hydrophones, force sensors)
//! are well described by a single resonance:
//!
//! ```text
//! H(f) = S0 · f0² / (f0² − f² + j·2·δ·f0·f)
//! ```
//!
//! with static gain `S0`, damping ratio `δ` and resonance frequency `f0`
//! in Hz. The response is defined for all real `f` and evaluation has no
//! error conditions; it is a pure function of the parameters.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Parameters of a canonical second-order dynamic system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondOrderSystem {
    /// Static gain `S0` (response at `f = 0`).
    pub gain: f64,
    /// Damping ratio `δ`; `0 < δ < 1` gives underdamped behavior.
    pub damping: f64,
    /// Resonance frequency `f0` in Hz.
    pub resonance_hz: f64,
}

impl SecondOrderSystem {
    pub fn new(gain: f64, damping: f64, resonance_hz: f64) -> Self {
        Self {
            gain,
            damping,
            resonance_hz,
        }
    }

    /// Complex response at a single frequency (Hz).
    pub fn response_at(&self, f_hz: f64) -> Complex64 {
        let f0 = self.resonance_hz;
        let numer = Complex64::new(self.gain * f0 * f0, 0.0);
        let denom = Complex64::new(f0 * f0 - f_hz * f_hz, 2.0 * self.damping * f0 * f_hz);
        numer / denom
    }

    /// Complex response over a whole frequency grid (Hz).
    pub fn frequency_response(&self, freqs_hz: &[f64]) -> Vec<Complex64> {
        freqs_hz.iter().map(|&f| self.response_at(f)).collect()
    }
}
