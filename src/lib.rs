//! `lsiir` library crate.
//!
//! Fits IIR digital filters to sampled complex frequency responses using
//! iteratively reweighted least squares, with a pure time delay separated
//! out from the rational part of the response.
//!
//! The crate is organized as:
//!
//! - `domain`: shared result/config types (orders, fitted filter, quality)
//! - `fit`: the fitting engine (design matrix, reweighting loop, delay)
//! - `models`: reference second-order system + discrete filter evaluation
//! - `math`: least squares, phase unwrapping, grid helpers
//! - `report`: side-by-side response comparison for a fitted filter

pub mod domain;
pub mod error;
pub mod fit;
pub mod math;
pub mod models;
pub mod report;
