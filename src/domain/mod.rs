//! Shared domain types for fitting inputs and outputs.

pub mod types;

pub use types::*;
