//! SIR-PH: a mean-field SIR model whose infectious period is phase-type.
//!
//! State layout (normalised by population):
//! `S | x_0..x_{n-1} | r_0..r_{n-1}`
//! where `x_i` is the infected fraction currently in phase `i` and `r_i`
//! accumulates recoveries out of phase `i`.
//!
//! ```text
//! dS/dt = -S (x·beta)
//! dx/dt =  S (x·beta) alpha + x A
//! dr/dt =  a ⊙ x
//! ```

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::calibration::{beta_from_r0, effective_r0};
use crate::error::{scan_negative, NumericalWarning, PhError, Result, NEGATIVE_TOLERANCE};
use crate::math::ode::{integrate_on_grid, OdeSystem, SolverConfig};
use crate::model::final_size::total_infected;
use crate::model::trajectory::{PhaseColumns, Trajectory};
use crate::model::{check_population, day_grid, fine_grid, resample_columns};
use crate::phase::{ContinuousDistribution, PhaseType};

const MASS_DRIFT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SirPhConfig {
    pub population: f64,
    /// Contact rate, applied to every phase.
    pub beta: f64,
    pub initial_infected: f64,
    pub initial_recovered: f64,
    pub num_days: usize,
    /// Internal integration grid points per day.
    pub grid_per_day: usize,
    /// Add per-phase `I-Phase{i}` / `R-Phase{i}` columns to the trajectory.
    pub report_phases: bool,
    pub solver: SolverConfig,
}

impl Default for SirPhConfig {
    fn default() -> Self {
        Self {
            population: 1000.0,
            beta: 0.2,
            initial_infected: 1.0,
            initial_recovered: 0.0,
            num_days: 160,
            grid_per_day: 10,
            report_phases: false,
            solver: SolverConfig::default(),
        }
    }
}

impl SirPhConfig {
    pub fn check(&self) -> Result<()> {
        check_population(
            self.population,
            self.initial_infected,
            self.initial_recovered,
            self.num_days,
            self.grid_per_day,
        )?;
        if !(self.beta.is_finite() && self.beta >= 0.0) {
            return Err(PhError::parameter(format!("beta must be finite and >= 0, got {}", self.beta)));
        }
        self.solver.check()
    }

    /// Replaces `beta` with the contact rate that yields reproduction number `r0`.
    pub fn with_reproduction_number(mut self, dist: &PhaseType, r0: f64) -> Result<Self> {
        self.beta = beta_from_r0(dist, r0)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SirPhResult {
    pub trajectory: Trajectory,
    pub effective_r0: f64,
    /// Expected fraction of the population ever infected.
    pub total_infected: f64,
    pub initial_susceptible: f64,
    pub phases: usize,
    pub warnings: Vec<NumericalWarning>,
}

/// A validated SIR-PH setup. The config is fixed at construction so the
/// cached contact rates always match it.
pub struct SirPhModel {
    cfg: SirPhConfig,
    dist: PhaseType,
    n: usize,
    alpha: Vec<f64>,
    generator: DMatrix<f64>,
    exit: Vec<f64>,
    beta: Vec<f64>,
}

impl SirPhModel {
    pub fn new(cfg: SirPhConfig, dist: PhaseType) -> Result<Self> {
        cfg.check()?;
        let params = dist.params();
        let n = params.n;
        let alpha = params.alpha.iter().copied().collect();
        let generator = params.generator.clone();
        let exit = params.exit.iter().copied().collect();
        let beta = vec![cfg.beta; n];
        Ok(Self { cfg, dist, n, alpha, generator, exit, beta })
    }

    pub fn cfg(&self) -> &SirPhConfig {
        &self.cfg
    }

    pub fn dist(&self) -> &PhaseType {
        &self.dist
    }

    pub fn initial_susceptible(&self) -> f64 {
        let c = &self.cfg;
        1.0 - c.initial_infected / c.population - c.initial_recovered / c.population
    }

    /// Normalised initial state.
    ///
    /// Infected individuals present at `t = 0` are spread over the phases as
    /// if they had been infected at a steady rate in the past:
    /// `x0 = -(I0/N)·gamma·alpha·A⁻¹`, not `(I0/N)·alpha`. Initial recovered
    /// are split evenly over the phases.
    pub fn initial_state(&self) -> Vec<f64> {
        let c = &self.cfg;
        let n = self.n;
        let i0 = c.initial_infected / c.population;
        let r0 = c.initial_recovered / c.population;
        let gamma = 1.0 / self.dist.mean();

        let mut y = Vec::with_capacity(1 + 2 * n);
        y.push(self.initial_susceptible());
        y.extend(self.dist.alpha_ai().iter().map(|v| -i0 * gamma * v));
        y.extend(std::iter::repeat(r0 / n as f64).take(n));
        y
    }

    pub fn simulate(&self) -> Result<SirPhResult> {
        let cfg = &self.cfg;
        let n = self.n;
        tracing::info!(num_days = cfg.num_days, phases = n, "computing SIR-PH model");

        // x0 is the residual alpha scaled by I0/N, so scan it before scaling
        let residual = self.dist.equilibrium_residual()?;
        let mut warnings = scan_negative("equilibrium residual alpha", residual.alpha().iter().copied());
        let y0 = self.initial_state();

        let grid = fine_grid(cfg.num_days, cfg.grid_per_day);
        let states = integrate_on_grid(self, &y0, &grid, &cfg.solver)?;

        let s_col: Vec<f64> = states.iter().map(|y| y[0]).collect();
        let i_col: Vec<f64> = states.iter().map(|y| y[1..=n].iter().sum()).collect();
        let r_col: Vec<f64> = states.iter().map(|y| y[n + 1..].iter().sum()).collect();

        // with alpha·1 < 1 some infections recover instantly and leave the books
        let proper = self.alpha.iter().sum::<f64>() >= 1.0 - NEGATIVE_TOLERANCE;
        warnings.extend(state_warnings(&states, 1 + 2 * n, proper));

        let days = day_grid(cfg.num_days);
        let mut totals = resample_columns(&grid, &[s_col, i_col, r_col], &days, cfg.population)?.into_iter();
        let (s, i, r) = match (totals.next(), totals.next(), totals.next()) {
            (Some(s), Some(i), Some(r)) => (s, i, r),
            _ => return Err(PhError::Integration("missing compartments in SIR-PH output".into())),
        };
        let phases = if cfg.report_phases {
            let x_cols: Vec<Vec<f64>> = (1..=n).map(|c| states.iter().map(|y| y[c]).collect()).collect();
            let r_cols: Vec<Vec<f64>> = (n + 1..=2 * n).map(|c| states.iter().map(|y| y[c]).collect()).collect();
            Some(PhaseColumns {
                infected: resample_columns(&grid, &x_cols, &days, cfg.population)?,
                recovered: resample_columns(&grid, &r_cols, &days, cfg.population)?,
            })
        } else {
            None
        };

        let pi = self.dist.equilibrium_pi()?;
        warnings.extend(scan_negative("equilibrium pi", pi.iter().copied()));
        let gamma = 1.0 / self.dist.mean();
        let r_eff = effective_r0(&pi, &self.beta, gamma)?;
        let s0 = self.initial_susceptible();
        let total = total_infected(r_eff, s0)?;
        tracing::info!(effective_r0 = r_eff, total_infected = total, "SIR-PH done");

        Ok(SirPhResult {
            trajectory: Trajectory { day: days, s, i, r, phases },
            effective_r0: r_eff,
            total_infected: total,
            initial_susceptible: s0,
            phases: n,
            warnings,
        })
    }
}

/// Per-component minima of the state below `-NEGATIVE_TOLERANCE`, plus the
/// largest departure of `S + Σx + Σr` from 1 when mass must be conserved.
fn state_warnings(states: &[Vec<f64>], ndim: usize, conserved: bool) -> Vec<NumericalWarning> {
    let mut lowest = vec![f64::INFINITY; ndim];
    let mut drift: f64 = 0.0;
    for y in states {
        for (lo, v) in lowest.iter_mut().zip(y) {
            *lo = lo.min(*v);
        }
        drift = drift.max((y.iter().sum::<f64>() - 1.0).abs());
    }
    let mut warnings = scan_negative("state", lowest);
    if conserved && drift > MASS_DRIFT_TOLERANCE {
        tracing::warn!(drift, "SIR-PH mass not conserved");
        warnings.push(NumericalWarning { quantity: "mass drift".into(), index: None, value: drift });
    }
    warnings
}

impl OdeSystem for SirPhModel {
    fn ndim(&self) -> usize {
        1 + 2 * self.n
    }

    fn deriv(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        let n = self.n;
        let s = y[0];
        let x = &y[1..=n];

        let mut x_beta = 0.0;
        for i in 0..n {
            x_beta += x[i] * self.beta[i];
        }
        let infections = s * x_beta;
        dy[0] = -infections;

        for j in 0..n {
            let mut flow = 0.0;
            for i in 0..n {
                flow += x[i] * self.generator[(i, j)];
            }
            dy[1 + j] = infections * self.alpha[j] + flow;
            dy[1 + n + j] = self.exit[j] * x[j];
        }
    }
}
