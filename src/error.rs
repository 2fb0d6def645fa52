//! Error taxonomy for the fitting engine.
//!
//! Every failure surfaces as one of three recoverable kinds:
//!
//! - `InvalidConfiguration`: the caller supplied inconsistent inputs
//!   (bad orders, Nyquist violation, mismatched sequence lengths, ...)
//! - `SingularSystem`: the least-squares system is underdetermined or
//!   rank-deficient
//! - `NumericalInstability`: the reweighting loop failed to converge
//!   within its iteration cap, or produced non-finite values
//!
//! There is no retry policy here; callers decide whether to adjust the
//! filter orders or the sample grid and re-invoke.

#[derive(Clone, PartialEq, Eq)]
pub enum FitError {
    InvalidConfiguration(String),
    SingularSystem(String),
    NumericalInstability(String),
}

impl FitError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        FitError::InvalidConfiguration(message.into())
    }

    pub fn singular_system(message: impl Into<String>) -> Self {
        FitError::SingularSystem(message.into())
    }

    pub fn numerical_instability(message: impl Into<String>) -> Self {
        FitError::NumericalInstability(message.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            FitError::InvalidConfiguration(_) => "invalid configuration",
            FitError::SingularSystem(_) => "singular system",
            FitError::NumericalInstability(_) => "numerical instability",
        }
    }

    fn message(&self) -> &str {
        match self {
            FitError::InvalidConfiguration(m)
            | FitError::SingularSystem(m)
            | FitError::NumericalInstability(m) => m,
        }
    }
}

impl std::fmt::Display for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::fmt::Debug for FitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitError")
            .field("kind", &self.kind())
            .field("message", &self.message())
            .finish()
    }
}

impl std::error::Error for FitError {}
