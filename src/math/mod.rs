//! Mathematical utilities: least squares, phase handling, and grids.

pub mod grid;
pub mod ols;
pub mod phase;

pub use grid::*;
pub use ols::*;
pub use phase::*;
