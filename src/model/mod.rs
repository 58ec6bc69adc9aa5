pub mod final_size;
pub mod sir;
pub mod sir_ph;
pub mod trajectory;

use crate::error::{PhError, Result};
use crate::math::interp::interp_linear;

/// `grid_per_day` equally spaced points per day on `[0, num_days]`.
///
/// Integer days fall exactly on grid points.
pub(crate) fn fine_grid(num_days: usize, grid_per_day: usize) -> Vec<f64> {
    let steps = num_days * grid_per_day;
    (0..=steps).map(|k| k as f64 / grid_per_day as f64).collect()
}

pub(crate) fn day_grid(num_days: usize) -> Vec<f64> {
    (0..=num_days).map(|d| d as f64).collect()
}

/// Resamples each fine-grid column onto integer days and multiplies by `scale`.
pub(crate) fn resample_columns(
    grid: &[f64],
    columns: &[Vec<f64>],
    days: &[f64],
    scale: f64,
) -> Result<Vec<Vec<f64>>> {
    columns
        .iter()
        .map(|col| Ok(interp_linear(grid, col, days)?.into_iter().map(|v| v * scale).collect()))
        .collect()
}

/// Validation shared by both epidemic models.
pub(crate) fn check_population(
    population: f64,
    initial_infected: f64,
    initial_recovered: f64,
    num_days: usize,
    grid_per_day: usize,
) -> Result<()> {
    if !(population.is_finite() && population > 0.0) {
        return Err(PhError::parameter(format!("population must be > 0, got {population}")));
    }
    if !(initial_infected >= 0.0 && initial_recovered >= 0.0) {
        return Err(PhError::parameter("initial infected/recovered counts must be >= 0"));
    }
    if initial_infected + initial_recovered > population {
        return Err(PhError::parameter(format!(
            "initial infected + recovered ({}) exceeds population ({population})",
            initial_infected + initial_recovered
        )));
    }
    if num_days == 0 {
        return Err(PhError::parameter("num_days must be >= 1"));
    }
    if grid_per_day == 0 {
        return Err(PhError::parameter("grid_per_day must be >= 1"));
    }
    Ok(())
}
