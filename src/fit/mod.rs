//! IIR fitting engine.
//!
//! Responsibilities:
//!
//! - validate inputs before any solve (distinct error kinds)
//! - build the stacked real design matrix per reweighting pass (parallel)
//! - iterate weighted least squares with delay re-estimation
//!
//! The delay estimator lives in `delay`; the loop itself in `fitter`.

pub mod delay;
pub mod fitter;

pub use delay::*;
pub use fitter::*;
