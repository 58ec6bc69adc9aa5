//! Phase-type distributions.
//!
//! A phase-type distribution `PH(alpha, A)` is the time to absorption of a
//! continuous-time Markov chain with `n` transient phases, started in phase `i`
//! with probability `alpha_i`. `A` is the sub-generator restricted to the
//! transient phases and `a = -A·1` holds the absorption (exit) rates.
//!
//! Every quantity involving `A⁻¹` is obtained through a linear solve against an
//! LU factorisation computed once at construction.

pub mod builders;
pub mod config;

use std::fmt;
use std::sync::OnceLock;

use nalgebra::{DMatrix, DVector, RowDVector, LU};

use crate::error::{scan_negative, PhError, Result, NEGATIVE_TOLERANCE};
use crate::math::linalg::{exit_rates, LeftSolver};

pub use builders::{erlang, exponential, from_mean_cv, mix, sum, Scale, MAX_PHASES};
pub use config::DistributionConfig;

/// Capabilities shared by every infectious-duration distribution.
pub trait ContinuousDistribution {
    fn cdf(&self, x: f64) -> f64;

    fn pdf(&self, x: f64) -> f64;

    fn sf(&self, x: f64) -> f64 {
        1.0 - self.cdf(x)
    }

    fn mean(&self) -> f64;

    /// Raw moment `E[X^k]`, `k >= 1`.
    fn moment(&self, k: usize) -> Result<f64>;

    fn variance(&self) -> Result<f64> {
        let m = self.mean();
        Ok(self.moment(2)? - m * m)
    }

    fn std_dev(&self) -> Result<f64> {
        Ok(self.variance()?.sqrt())
    }
}

/// Mean, variance, skewness and excess kurtosis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

/// Read-only view of a distribution's parameters.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTypeParams<'a> {
    pub alpha: &'a RowDVector<f64>,
    pub generator: &'a DMatrix<f64>,
    pub exit: &'a DVector<f64>,
    pub n: usize,
}

#[derive(Debug, Clone)]
pub struct PhaseType {
    alpha: RowDVector<f64>,
    generator: DMatrix<f64>,
    exit: DVector<f64>,
    solver: LeftSolver,
    // alpha·A⁻¹
    alpha_ai: RowDVector<f64>,
    residual: OnceLock<Result<Box<PhaseType>>>,
    pi: OnceLock<Result<RowDVector<f64>>>,
}

impl PhaseType {
    /// Builds `PH(alpha, A)`, rejecting anything that is not a transient
    /// sub-generator with a sub-stochastic initial vector.
    pub fn new(alpha: RowDVector<f64>, generator: DMatrix<f64>) -> Result<Self> {
        let n = generator.nrows();
        if n == 0 {
            return Err(PhError::config("a phase-type distribution needs at least one phase"));
        }
        if generator.ncols() != n {
            return Err(PhError::DimensionMismatch { context: "sub-generator", expected: n, found: generator.ncols() });
        }
        if alpha.len() != n {
            return Err(PhError::DimensionMismatch { context: "initial vector", expected: n, found: alpha.len() });
        }
        if alpha.iter().chain(generator.iter()).any(|v| !v.is_finite()) {
            return Err(PhError::config("parameters must be finite"));
        }
        if let Some(i) = alpha.iter().position(|&p| p < -NEGATIVE_TOLERANCE) {
            return Err(PhError::config(format!("alpha[{i}] = {} is negative", alpha[i])));
        }
        let mass = alpha.sum();
        if mass > 1.0 + NEGATIVE_TOLERANCE {
            return Err(PhError::config(format!("alpha sums to {mass} > 1")));
        }
        if mass <= NEGATIVE_TOLERANCE {
            return Err(PhError::config(format!(
                "alpha sums to {mass}; the distribution is a point mass at zero"
            )));
        }
        for i in 0..n {
            if generator[(i, i)] >= 0.0 {
                return Err(PhError::config(format!("A[{i},{i}] = {} must be negative", generator[(i, i)])));
            }
            for j in 0..n {
                if i != j && generator[(i, j)] < -NEGATIVE_TOLERANCE {
                    return Err(PhError::config(format!("A[{i},{j}] = {} is negative", generator[(i, j)])));
                }
            }
        }
        let exit = exit_rates(&generator);
        let scale = generator.iter().fold(1.0f64, |m, v| m.max(v.abs()));
        if let Some(i) = exit.iter().position(|&r| r < -NEGATIVE_TOLERANCE * scale) {
            return Err(PhError::config(format!("row {i} of A sums to {} > 0", -exit[i])));
        }
        let solver = LeftSolver::new(&generator)?;
        Self::from_validated(alpha, generator, exit, solver)
    }

    /// Convenience constructor from plain slices, `rows[i][j] = A[i,j]`.
    pub fn from_rows(alpha: &[f64], rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(PhError::DimensionMismatch { context: "sub-generator", expected: n, found: bad.len() });
        }
        let generator = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        Self::new(RowDVector::from_row_slice(alpha), generator)
    }

    fn from_validated(
        alpha: RowDVector<f64>,
        generator: DMatrix<f64>,
        exit: DVector<f64>,
        solver: LeftSolver,
    ) -> Result<Self> {
        let alpha_ai = solver.solve(&alpha)?;
        let mean = -alpha_ai.sum();
        if !(mean.is_finite() && mean > 0.0) {
            return Err(PhError::config(format!("mean must be finite and > 0, got {mean}")));
        }
        Ok(Self {
            alpha,
            generator,
            exit,
            solver,
            alpha_ai,
            residual: OnceLock::new(),
            pi: OnceLock::new(),
        })
    }

    /// Number of phases.
    pub fn dim(&self) -> usize {
        self.alpha.len()
    }

    pub fn params(&self) -> PhaseTypeParams<'_> {
        PhaseTypeParams { alpha: &self.alpha, generator: &self.generator, exit: &self.exit, n: self.dim() }
    }

    pub fn alpha(&self) -> &RowDVector<f64> {
        &self.alpha
    }

    pub fn generator(&self) -> &DMatrix<f64> {
        &self.generator
    }

    pub fn exit_rates(&self) -> &DVector<f64> {
        &self.exit
    }

    /// `alpha·A⁻¹`, computed once by a linear solve.
    pub fn alpha_ai(&self) -> &RowDVector<f64> {
        &self.alpha_ai
    }

    /// First `k` raw moments via `v_i = -i · v_{i-1}·A⁻¹`, `v_0 = alpha`,
    /// with `E[X^i] = v_i·1`.
    pub fn moments(&self, k: usize) -> Result<Vec<f64>> {
        let mut moms = Vec::with_capacity(k);
        let mut left = self.alpha.clone();
        for i in 1..=k {
            left = self.solver.solve(&left)? * -(i as f64);
            moms.push(left.sum());
        }
        Ok(moms)
    }

    pub fn stats(&self) -> Result<Stats> {
        let mut raw = vec![1.0];
        raw.extend(self.moments(4)?);
        let mean = raw[1];
        let central = |n: usize| -> f64 {
            (0..=n)
                .map(|k| binomial(n, k) * raw[k] * (-mean).powi((n - k) as i32))
                .sum()
        };
        let variance = central(2);
        let sd = variance.sqrt();
        Ok(Stats {
            mean,
            variance,
            skewness: central(3) / sd.powi(3),
            kurtosis: central(4) / (variance * variance) - 3.0,
        })
    }

    pub fn cv(&self) -> Result<f64> {
        Ok(self.std_dev()? / self.mean())
    }

    /// Stationary forward-recurrence-time distribution
    /// `PH(-alpha·A⁻¹ / mean, A)`.
    pub fn equilibrium_residual(&self) -> Result<&PhaseType> {
        self.residual
            .get_or_init(|| {
                let gamma = 1.0 / self.mean();
                let alpha = &self.alpha_ai * -gamma;
                scan_negative("equilibrium residual alpha", alpha.iter().copied());
                // same sub-generator, so the factorisation is reused
                Self::from_validated(alpha, self.generator.clone(), self.exit.clone(), self.solver.clone())
                    .map(Box::new)
            })
            .as_ref()
            .map(|erd| erd.as_ref())
            .map_err(Clone::clone)
    }

    /// First-order loss function `E[(X - x)^+] = mean · P(R > x)` where `R` is
    /// the equilibrium residual.
    pub fn loss1(&self, x: f64) -> Result<f64> {
        Ok(self.mean() * self.equilibrium_residual()?.sf(x))
    }

    /// Long-run phase occupancy when every absorption immediately restarts the
    /// chain according to `alpha`.
    ///
    /// Solves `pi·(A + a·alpha + J) = 1` with `J` the all-ones matrix: the
    /// balance equations `pi·(A + a·alpha) = 0` are singular on their own, and
    /// adding `J` folds `pi·1 = 1` into the same nonsingular system.
    pub fn equilibrium_pi(&self) -> Result<RowDVector<f64>> {
        self.pi
            .get_or_init(|| {
                let n = self.dim();
                let matrix = &self.generator + &self.exit * &self.alpha + DMatrix::from_element(n, n, 1.0);
                let ones = DVector::from_element(n, 1.0);
                let pi = LU::new(matrix.transpose())
                    .solve(&ones)
                    .map(|v| v.transpose())
                    .ok_or_else(|| PhError::config("regenerative phase chain has no unique stationary vector"))?;
                scan_negative("equilibrium pi", pi.iter().copied());
                Ok(pi)
            })
            .clone()
    }

    /// Forces every lazily computed cache so the value can be shared read-only.
    pub fn precompute(&self) -> Result<()> {
        self.equilibrium_residual()?;
        self.equilibrium_pi()?;
        Ok(())
    }

    fn survival_row(&self, x: f64) -> RowDVector<f64> {
        &self.alpha * (&self.generator * x).exp()
    }
}

impl ContinuousDistribution for PhaseType {
    /// `1 - alpha·exp(A x)·1`; zero for negative `x`.
    fn cdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        1.0 - self.survival_row(x).sum()
    }

    /// `alpha·exp(A x)·a`; zero for negative `x`.
    fn pdf(&self, x: f64) -> f64 {
        if x < 0.0 {
            return 0.0;
        }
        self.survival_row(x).transpose().dot(&self.exit)
    }

    /// `-alpha·A⁻¹·1`.
    fn mean(&self) -> f64 {
        -self.alpha_ai.sum()
    }

    fn moment(&self, k: usize) -> Result<f64> {
        if k == 0 {
            return Ok(self.alpha.sum());
        }
        self.moments(k)?
            .pop()
            .ok_or_else(|| PhError::parameter("moment order must be >= 1"))
    }
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1.0, |acc, i| acc * (n - i) as f64 / (i + 1) as f64)
}

fn fmt_row<'a>(values: impl Iterator<Item = &'a f64>) -> String {
    let cells: Vec<String> = values.map(|v| format!("{v:.2}")).collect();
    format!("[{}]", cells.join(", "))
}

impl fmt::Display for PhaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PhaseType:")?;
        writeln!(f, "  alpha = {}", fmt_row(self.alpha.iter()))?;
        let n = self.dim();
        for i in 0..n {
            let row = fmt_row(self.generator.row(i).iter());
            let open = if i == 0 { "  A     = [" } else { "           " };
            let close = if i + 1 == n { "]" } else { "," };
            if i + 1 == n {
                write!(f, "{open}{row}{close}")?;
            } else {
                writeln!(f, "{open}{row}{close}")?;
            }
        }
        Ok(())
    }
}
