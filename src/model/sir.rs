use serde::{Deserialize, Serialize};

use crate::error::{PhError, Result};
use crate::math::ode::{integrate_on_grid, OdeSystem, SolverConfig};
use crate::model::trajectory::Trajectory;
use crate::model::{check_population, day_grid, fine_grid, resample_columns};

/// Classical SIR with exponentially distributed infectious periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SirConfig {
    pub population: f64,
    pub initial_infected: f64,
    pub initial_recovered: f64,
    pub reproductive_factor: f64,
    pub infectious_period_mean: f64, // days
    pub num_days: usize,
    pub grid_per_day: usize,
    pub solver: SolverConfig,
}

impl Default for SirConfig {
    fn default() -> Self {
        Self {
            population: 1_000_000.0,
            initial_infected: 1.0,
            initial_recovered: 0.0,
            reproductive_factor: 2.25,
            infectious_period_mean: 4.4,
            num_days: 100,
            grid_per_day: 10,
            solver: SolverConfig::default(),
        }
    }
}

impl SirConfig {
    pub fn check(&self) -> Result<()> {
        check_population(
            self.population,
            self.initial_infected,
            self.initial_recovered,
            self.num_days,
            self.grid_per_day,
        )?;
        if !(self.reproductive_factor.is_finite() && self.reproductive_factor >= 0.0) {
            return Err(PhError::parameter("reproductive_factor must be finite and >= 0"));
        }
        if !(self.infectious_period_mean.is_finite() && self.infectious_period_mean > 0.0) {
            return Err(PhError::parameter("infectious_period_mean must be finite and > 0"));
        }
        self.solver.check()
    }
}

pub struct SirModel {
    cfg: SirConfig,
    beta: f64,
    gamma: f64,
}

impl SirModel {
    pub fn new(cfg: SirConfig) -> Result<Self> {
        cfg.check()?;
        let gamma = 1.0 / cfg.infectious_period_mean;
        let beta = cfg.reproductive_factor * gamma;
        Ok(Self { cfg, beta, gamma })
    }

    pub fn cfg(&self) -> &SirConfig {
        &self.cfg
    }

    /// Integrates in population fractions and reports counts per day.
    pub fn simulate(&self) -> Result<Trajectory> {
        let cfg = &self.cfg;
        let n = cfg.population;
        let i0 = cfg.initial_infected / n;
        let r0 = cfg.initial_recovered / n;
        let y0 = [1.0 - i0 - r0, i0, r0];

        tracing::debug!(num_days = cfg.num_days, beta = self.beta, gamma = self.gamma, "computing classical SIR");
        let grid = fine_grid(cfg.num_days, cfg.grid_per_day);
        let states = integrate_on_grid(self, &y0, &grid, &cfg.solver)?;

        let columns: Vec<Vec<f64>> = (0..3).map(|c| states.iter().map(|y| y[c]).collect()).collect();
        let days = day_grid(cfg.num_days);
        let mut cols = resample_columns(&grid, &columns, &days, n)?.into_iter();
        let (s, i, r) = match (cols.next(), cols.next(), cols.next()) {
            (Some(s), Some(i), Some(r)) => (s, i, r),
            _ => return Err(PhError::Integration("missing compartments in SIR output".into())),
        };
        Ok(Trajectory { day: days, s, i, r, phases: None })
    }
}

impl OdeSystem for SirModel {
    fn ndim(&self) -> usize {
        3
    }

    fn deriv(&self, _t: f64, y: &[f64], dy: &mut [f64]) {
        let (s, i) = (y[0], y[1]);
        let infections = self.beta * s * i;
        let recoveries = self.gamma * i;
        dy[0] = -infections;
        dy[1] = infections - recoveries;
        dy[2] = recoveries;
    }
}
