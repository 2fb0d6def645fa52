//! Response models.
//!
//! Two kinds of model live here:
//!
//! - the closed-form second-order reference system used to generate
//!   fitting targets (`sos`)
//! - evaluation of discrete rational transfer functions on the unit
//!   circle, plus pole diagnostics (`filter`)

pub mod filter;
pub mod sos;

pub use filter::*;
pub use sos::*;
