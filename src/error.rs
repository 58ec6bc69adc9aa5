use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PhError>;

/// Entries this far below zero are treated as floating-point noise.
pub const NEGATIVE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhError {
    /// Missing, conflicting or out-of-range arguments.
    #[error("parameter error: {0}")]
    Parameter(String),
    /// The (alpha, A) pair is not a valid transient phase-type representation.
    #[error("invalid phase-type distribution: {0}")]
    DistributionConfiguration(String),
    #[error("dimension mismatch in {context}: expected {expected}, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },
    /// The ODE solver could not reach the end of the horizon.
    #[error("integration error: {0}")]
    Integration(String),
    /// The model produced inputs with no meaningful answer (e.g. no final-size root).
    #[error("modeling error: {0}")]
    Modeling(String),
}

impl PhError {
    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::DistributionConfiguration(msg.into())
    }
}

/// A probability or rate that came out slightly negative.
///
/// Never fatal: the value is kept as computed and the warning travels with the
/// result so callers can decide whether to reject it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericalWarning {
    pub quantity: String,
    pub index: Option<usize>,
    pub value: f64,
}

impl std::fmt::Display for NumericalWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}] = {:e}", self.quantity, i, self.value),
            None => write!(f, "{} = {:e}", self.quantity, self.value),
        }
    }
}

/// Collects a warning for every entry of `values` below `-NEGATIVE_TOLERANCE`.
pub fn scan_negative(quantity: &str, values: impl IntoIterator<Item = f64>) -> Vec<NumericalWarning> {
    let mut out = Vec::new();
    for (i, v) in values.into_iter().enumerate() {
        if v < -NEGATIVE_TOLERANCE {
            tracing::warn!(quantity, index = i, value = v, "negative value from numerical noise");
            out.push(NumericalWarning { quantity: quantity.to_string(), index: Some(i), value: v });
        }
    }
    out
}
