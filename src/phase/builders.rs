use nalgebra::{DMatrix, RowDVector};
use serde::{Deserialize, Serialize};

use crate::error::{PhError, Result};
use crate::math::linalg::{block_upper, concat_rows};
use crate::phase::PhaseType;

/// Largest chain the builders will assemble. Generators are dense.
pub const MAX_PHASES: usize = 1000;

/// How the time scale of a primitive distribution is given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scale {
    /// Rate of each phase.
    Rate(f64),
    /// Mean of the whole distribution.
    Mean(f64),
}

impl Scale {
    /// Exactly one of `rate` and `mean` must be given.
    pub fn from_options(rate: Option<f64>, mean: Option<f64>) -> Result<Self> {
        match (rate, mean) {
            (Some(r), None) => Ok(Scale::Rate(r)),
            (None, Some(m)) => Ok(Scale::Mean(m)),
            (None, None) => Err(PhError::parameter("provide one of rate or mean")),
            (Some(_), Some(_)) => Err(PhError::parameter("provide only one of rate or mean")),
        }
    }

    /// Per-phase rate of an `n`-phase Erlang chain.
    fn phase_rate(self, n: usize) -> Result<f64> {
        let rate = match self {
            Scale::Rate(r) => r,
            Scale::Mean(m) => {
                if !(m.is_finite() && m > 0.0) {
                    return Err(PhError::parameter(format!("mean must be finite and > 0, got {m}")));
                }
                n as f64 / m
            }
        };
        if !(rate.is_finite() && rate > 0.0) {
            return Err(PhError::parameter(format!("rate must be finite and > 0, got {rate}")));
        }
        Ok(rate)
    }
}

pub fn exponential(scale: Scale) -> Result<PhaseType> {
    erlang(1, scale)
}

/// Erlang(n): `n` phases in series, each left at the same rate.
/// `Scale::Mean(m)` gives each phase rate `n / m`.
pub fn erlang(n: usize, scale: Scale) -> Result<PhaseType> {
    if n == 0 {
        return Err(PhError::parameter("erlang order must be >= 1"));
    }
    if n > MAX_PHASES {
        return Err(PhError::parameter(format!("erlang order {n} exceeds {MAX_PHASES} phases")));
    }
    let rate = scale.phase_rate(n)?;
    let mut a = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        a[(i, i)] = -rate;
        if i + 1 < n {
            a[(i, i + 1)] = rate;
        }
    }
    let mut alpha = RowDVector::zeros(n);
    alpha[0] = 1.0;
    PhaseType::new(alpha, a)
}

/// Convolution: run `first` to absorption, then start `second`.
///
/// Mass `first` places at zero (`1 - alpha1·1`) starts `second` immediately,
/// so for a proper `alpha1` the initial vector is `[alpha1, 0]`.
pub fn sum(first: &PhaseType, second: &PhaseType) -> Result<PhaseType> {
    let p1 = first.params();
    let p2 = second.params();
    let alpha = concat_rows(p1.alpha, &(p2.alpha * (1.0 - p1.alpha.sum()).max(0.0)));
    let coupling = p1.exit * p2.alpha;
    let a = block_upper(p1.generator, &coupling, p2.generator)?;
    PhaseType::new(alpha, a)
}

/// Probabilistic choice: `first` with probability `p`, otherwise `second`.
pub fn mix(first: &PhaseType, second: &PhaseType, p: f64) -> Result<PhaseType> {
    if !(0.0..=1.0).contains(&p) {
        return Err(PhError::parameter(format!("mixing probability must be in [0, 1], got {p}")));
    }
    let p1 = first.params();
    let p2 = second.params();
    let alpha = concat_rows(&(p1.alpha * p), &(p2.alpha * (1.0 - p)));
    let zeros = DMatrix::<f64>::zeros(p1.n, p2.n);
    let a = block_upper(p1.generator, &zeros, p2.generator)?;
    PhaseType::new(alpha, a)
}

/// Two-moment fit with the given mean and coefficient of variation.
///
/// - `cv = 1`: exponential.
/// - `cv < 1`: Erlang(k-1)/Erlang(k) mixture with a common rate, `k = ⌈1/cv²⌉`,
///   at most [`MAX_PHASES`].
/// - `cv > 1`: two-phase hyperexponential with balanced means.
pub fn from_mean_cv(mean: f64, cv: f64) -> Result<PhaseType> {
    if !(mean.is_finite() && mean > 0.0) {
        return Err(PhError::parameter(format!("mean must be finite and > 0, got {mean}")));
    }
    if !(cv.is_finite() && cv > 0.0) {
        return Err(PhError::parameter(format!("cv must be finite and > 0, got {cv}")));
    }
    let cv2 = cv * cv;
    if (cv2 - 1.0).abs() < 1e-12 {
        return exponential(Scale::Mean(mean));
    }
    if cv2 < 1.0 {
        let kf = (1.0 / cv2 - 1e-12).ceil().max(2.0);
        if kf > MAX_PHASES as f64 {
            return Err(PhError::parameter(format!(
                "cv={cv} needs {kf} Erlang phases, more than {MAX_PHASES}"
            )));
        }
        let k = kf as usize;
        let p = (kf * cv2 - (kf * (1.0 + cv2) - kf * kf * cv2).max(0.0).sqrt()) / (1.0 + cv2);
        let p = p.clamp(0.0, 1.0);
        let rate = (kf - p) / mean;
        if p == 0.0 {
            return erlang(k, Scale::Rate(rate));
        }
        if p == 1.0 {
            return erlang(k - 1, Scale::Rate(rate));
        }
        return mix(&erlang(k - 1, Scale::Rate(rate))?, &erlang(k, Scale::Rate(rate))?, p);
    }
    let p = 0.5 * (1.0 + ((cv2 - 1.0) / (cv2 + 1.0)).sqrt());
    let fast = exponential(Scale::Rate(2.0 * p / mean))?;
    let slow = exponential(Scale::Rate(2.0 * (1.0 - p) / mean))?;
    mix(&fast, &slow, p)
}
