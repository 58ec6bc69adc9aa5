use crate::error::{PhError, Result};

const MAX_ITER: usize = 200;

/// Finds a root of `f` in `[lo, hi]`, which must bracket a sign change.
///
/// Regula falsi with the Illinois modification; converges superlinearly and
/// never leaves the bracket.
pub fn find_root<F>(mut f: F, mut lo: f64, mut hi: f64, tol: f64) -> Result<f64>
where
    F: FnMut(f64) -> f64,
{
    let mut f_lo = f(lo);
    let mut f_hi = f(hi);
    if f_lo == 0.0 {
        return Ok(lo);
    }
    if f_hi == 0.0 {
        return Ok(hi);
    }
    if !(f_lo.is_finite() && f_hi.is_finite()) || f_lo.signum() == f_hi.signum() {
        return Err(PhError::Modeling(format!(
            "no sign change on [{lo}, {hi}] (f={f_lo:e}, {f_hi:e})"
        )));
    }

    let mut side = 0i8;
    let mut prev = f64::NAN;
    for _ in 0..MAX_ITER {
        let mid = (lo * f_hi - hi * f_lo) / (f_hi - f_lo);
        let f_mid = f(mid);
        if f_mid == 0.0 || (hi - lo).abs() < tol || (mid - prev).abs() < tol {
            return Ok(mid);
        }
        prev = mid;
        if f_mid.signum() == f_hi.signum() {
            hi = mid;
            f_hi = f_mid;
            if side == -1 {
                f_lo *= 0.5;
            }
            side = -1;
        } else {
            lo = mid;
            f_lo = f_mid;
            if side == 1 {
                f_hi *= 0.5;
            }
            side = 1;
        }
        if (hi - lo).abs() < tol {
            return Ok(0.5 * (lo + hi));
        }
    }
    Err(PhError::Modeling(format!("root finder did not converge on [{lo}, {hi}]")))
}
