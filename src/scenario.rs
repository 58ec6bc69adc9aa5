//! Experiment drivers: classical SIR against SIR-PH, and a sweep over the
//! coefficient of variation of the infectious period.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::math::ode::SolverConfig;
use crate::model::sir::{SirConfig, SirModel};
use crate::model::sir_ph::{SirPhConfig, SirPhModel, SirPhResult};
use crate::model::trajectory::{Deviation, Trajectory};
use crate::phase::{from_mean_cv, ContinuousDistribution, DistributionConfig, PhaseType};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub population: f64,
    pub initial_infected: f64,
    pub reproductive_factor: f64,
    pub num_days: usize,
    pub grid_per_day: usize,
    pub report_phases: bool,
    pub solver: SolverConfig,
    pub distribution: DistributionConfig,
    /// Coefficients of variation for `variance_analysis`; empty skips it.
    pub variance_cvs: Vec<f64>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "DIVOC".to_string(),
            population: 1_000_000.0,
            initial_infected: 1.0,
            reproductive_factor: 2.25,
            num_days: 100,
            grid_per_day: 10,
            report_phases: false,
            solver: SolverConfig::default(),
            distribution: DistributionConfig::default(),
            variance_cvs: vec![0.5, 1.0, 2.0],
        }
    }
}

impl Scenario {
    pub fn sir_config(&self, infectious_period_mean: f64) -> SirConfig {
        SirConfig {
            population: self.population,
            initial_infected: self.initial_infected,
            initial_recovered: 0.0,
            reproductive_factor: self.reproductive_factor,
            infectious_period_mean,
            num_days: self.num_days,
            grid_per_day: self.grid_per_day,
            solver: self.solver,
        }
    }

    /// SIR-PH config for `dist`, with `beta` calibrated to the scenario's R0.
    pub fn sir_ph_config(&self, dist: &PhaseType, num_days: usize) -> Result<SirPhConfig> {
        SirPhConfig {
            population: self.population,
            beta: 0.0,
            initial_infected: self.initial_infected,
            initial_recovered: 0.0,
            num_days,
            grid_per_day: self.grid_per_day,
            report_phases: self.report_phases,
            solver: self.solver,
        }
        .with_reproduction_number(dist, self.reproductive_factor)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Comparison {
    pub name: String,
    pub classical: Trajectory,
    pub phase_type: SirPhResult,
    /// Largest per-day gap between the two models, as population fractions.
    pub deviation: Deviation,
}

pub fn compare_models(scenario: &Scenario) -> Result<Comparison> {
    let dist = scenario.distribution.build()?;
    tracing::info!(name = %scenario.name, phases = dist.dim(), mean = dist.mean(), "comparing SIR and SIR-PH");

    let classical = SirModel::new(scenario.sir_config(dist.mean()))?.simulate()?;
    log_summary(&format!("{}:SIR", scenario.name), &classical, scenario.population);

    let cfg = scenario.sir_ph_config(&dist, scenario.num_days)?;
    let phase_type = SirPhModel::new(cfg, dist)?.simulate()?;
    log_summary(&format!("{}:SIR-PH", scenario.name), &phase_type.trajectory, scenario.population);

    let raw = phase_type.trajectory.max_abs_difference(&classical)?;
    let n = scenario.population;
    let deviation = Deviation { s: raw.s / n, i: raw.i / n, r: raw.r / n };
    tracing::info!(s = deviation.s, i = deviation.i, r = deviation.r, "max abs error (fraction of population)");

    Ok(Comparison { name: scenario.name.clone(), classical, phase_type, deviation })
}

#[derive(Debug, Clone, Serialize)]
pub struct VarianceRun {
    pub cv: f64,
    pub result: SirPhResult,
}

/// Runs SIR-PH for each of `scenario.variance_cvs` at a fixed infectious-period
/// mean. Higher-variance runs get a longer horizon, `round(num_days·max(1, cv))`.
pub fn variance_analysis(scenario: &Scenario, mean: f64) -> Result<Vec<VarianceRun>> {
    let mut runs = Vec::with_capacity(scenario.variance_cvs.len());
    for &cv in &scenario.variance_cvs {
        let dist = from_mean_cv(mean, cv)?;
        let num_days = (scenario.num_days as f64 * cv.max(1.0)).round() as usize;
        tracing::info!(cv, phases = dist.dim(), num_days, "running variance analysis case");
        let cfg = scenario.sir_ph_config(&dist, num_days)?;
        let result = SirPhModel::new(cfg, dist)?.simulate()?;
        log_summary(&format!("ph-cv{cv:.2}"), &result.trajectory, scenario.population);
        runs.push(VarianceRun { cv, result });
    }
    Ok(runs)
}

fn log_summary(name: &str, trajectory: &Trajectory, population: f64) {
    if let Some(s) = trajectory.summary() {
        tracing::info!(
            model = name,
            peak_day = s.peak_day,
            peak_infected_pct = 100.0 * s.peak_infected / population,
            final_recovered_pct = 100.0 * s.final_recovered / population,
            "summary"
        );
    }
}
