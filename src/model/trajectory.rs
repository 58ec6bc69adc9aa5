use serde::Serialize;

use crate::error::{PhError, Result};

/// Per-phase infected and recovered columns, indexed `[phase][day]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseColumns {
    pub infected: Vec<Vec<f64>>,
    pub recovered: Vec<Vec<f64>>,
}

/// One point per integer day, in population counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    pub day: Vec<f64>,
    pub s: Vec<f64>,
    pub i: Vec<f64>,
    pub r: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phases: Option<PhaseColumns>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DayRecord {
    pub day: f64,
    pub s: f64,
    pub i: f64,
    pub r: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Summary {
    pub peak_day: f64,
    pub peak_infected: f64,
    pub final_susceptible: f64,
    pub final_infected: f64,
    pub final_recovered: f64,
}

/// Largest absolute gap between two trajectories, per compartment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Deviation {
    pub s: f64,
    pub i: f64,
    pub r: f64,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.day.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut cols: Vec<String> = ["Day", "S", "I", "R"].iter().map(|c| c.to_string()).collect();
        if let Some(ph) = &self.phases {
            cols.extend((0..ph.infected.len()).map(|k| format!("I-Phase{k}")));
            cols.extend((0..ph.recovered.len()).map(|k| format!("R-Phase{k}")));
        }
        cols
    }

    /// Row `k` in `column_names()` order.
    pub fn row(&self, k: usize) -> Option<Vec<f64>> {
        if k >= self.len() {
            return None;
        }
        let mut row = vec![self.day[k], self.s[k], self.i[k], self.r[k]];
        if let Some(ph) = &self.phases {
            row.extend(ph.infected.iter().map(|col| col[k]));
            row.extend(ph.recovered.iter().map(|col| col[k]));
        }
        Some(row)
    }

    pub fn record(&self, k: usize) -> Option<DayRecord> {
        (k < self.len()).then(|| DayRecord { day: self.day[k], s: self.s[k], i: self.i[k], r: self.r[k] })
    }

    /// Day and size of the infection peak.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.i
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(k, &v)| (self.day[k], v))
    }

    pub fn summary(&self) -> Option<Summary> {
        let (peak_day, peak_infected) = self.peak()?;
        let last = self.record(self.len().checked_sub(1)?)?;
        Some(Summary {
            peak_day,
            peak_infected,
            final_susceptible: last.s,
            final_infected: last.i,
            final_recovered: last.r,
        })
    }

    /// Maximum absolute difference against `other` over the shared day grid.
    pub fn max_abs_difference(&self, other: &Trajectory) -> Result<Deviation> {
        if self.len() != other.len() {
            return Err(PhError::DimensionMismatch {
                context: "trajectory comparison",
                expected: self.len(),
                found: other.len(),
            });
        }
        let gap = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f64::max);
        Ok(Deviation { s: gap(&self.s, &other.s), i: gap(&self.i, &other.i), r: gap(&self.r, &other.r) })
    }
}
