use crate::error::{PhError, Result};
use crate::math::roots::find_root;

/// Expected fraction of the population ever infected in a mean-field epidemic.
///
/// Returns the root `z` in `(0, 1)` of the final-size relation
/// `z = 1 - s0·exp(-r0·z)`, where `s0` is the initial susceptible fraction.
/// With `s0 = 1` a positive root exists only when `r0 > 1`.
pub fn total_infected(r0: f64, s0: f64) -> Result<f64> {
    if !(r0.is_finite() && r0 >= 0.0) {
        return Err(PhError::Modeling(format!("reproduction number must be finite and >= 0, got {r0}")));
    }
    if !(s0 > 0.0 && s0 <= 1.0) {
        return Err(PhError::Modeling(format!("initial susceptible fraction must be in (0, 1], got {s0}")));
    }
    // written with expm1 so the s0 = 1 case stays accurate near z = 0
    let f = |z: f64| (1.0 - s0) - s0 * (-r0 * z).exp_m1() - z;
    let lo = if s0 < 1.0 { 0.0 } else { 1e-12 };
    if f(lo) <= 0.0 {
        return Err(PhError::Modeling(format!(
            "final-size equation has no root in (0, 1) for r0={r0}, s0={s0}"
        )));
    }
    find_root(f, lo, 1.0, 1e-14)
}
