use nalgebra::RowDVector;

use crate::error::{PhError, Result};
use crate::phase::{ContinuousDistribution, PhaseType};

/// Reproduction number of the SIR-PH model under per-phase contact rates:
/// `R0 = (pi·beta) / gamma`, with `pi` the equilibrium phase occupancy and
/// `gamma = 1/mean`.
pub fn effective_r0(pi: &RowDVector<f64>, beta: &[f64], gamma: f64) -> Result<f64> {
    if pi.len() != beta.len() {
        return Err(PhError::DimensionMismatch { context: "effective r0", expected: pi.len(), found: beta.len() });
    }
    let contact: f64 = pi.iter().zip(beta).map(|(p, b)| p * b).sum();
    Ok(contact / gamma)
}

/// Scalar contact rate giving a target reproduction number for `dist`.
/// R0 = (pi·1) * beta / gamma => beta = R0 * gamma / (pi·1)
pub fn beta_from_r0(dist: &PhaseType, r0: f64) -> Result<f64> {
    if !(r0.is_finite() && r0 >= 0.0) {
        return Err(PhError::parameter(format!("reproduction number must be finite and >= 0, got {r0}")));
    }
    let occupancy = dist.equilibrium_pi()?.sum().max(1e-12);
    let gamma = 1.0 / dist.mean();
    Ok(r0 * gamma / occupancy)
}
