use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::phase::{builders, PhaseType, Scale};

/// Declarative description of an infectious-duration distribution, as read
/// from a scenario file.
///
/// ```json
/// {"kind": "mix", "p": 0.4,
///  "first": {"kind": "exponential", "rate": 4.0},
///  "second": {"kind": "erlang", "phases": 3, "mean": 6.0}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistributionConfig {
    Exponential {
        rate: Option<f64>,
        mean: Option<f64>,
    },
    Erlang {
        phases: usize,
        rate: Option<f64>,
        mean: Option<f64>,
    },
    MeanCv {
        mean: f64,
        cv: f64,
    },
    Sum {
        first: Box<DistributionConfig>,
        second: Box<DistributionConfig>,
    },
    Mix {
        first: Box<DistributionConfig>,
        second: Box<DistributionConfig>,
        p: f64,
    },
    Explicit {
        alpha: Vec<f64>,
        generator: Vec<Vec<f64>>,
    },
}

impl Default for DistributionConfig {
    fn default() -> Self {
        DistributionConfig::MeanCv { mean: 4.5, cv: 1.0 / 4.5 }
    }
}

impl DistributionConfig {
    pub fn build(&self) -> Result<PhaseType> {
        match self {
            DistributionConfig::Exponential { rate, mean } => {
                builders::exponential(Scale::from_options(*rate, *mean)?)
            }
            DistributionConfig::Erlang { phases, rate, mean } => {
                builders::erlang(*phases, Scale::from_options(*rate, *mean)?)
            }
            DistributionConfig::MeanCv { mean, cv } => builders::from_mean_cv(*mean, *cv),
            DistributionConfig::Sum { first, second } => builders::sum(&first.build()?, &second.build()?),
            DistributionConfig::Mix { first, second, p } => {
                builders::mix(&first.build()?, &second.build()?, *p)
            }
            DistributionConfig::Explicit { alpha, generator } => PhaseType::from_rows(alpha, generator),
        }
    }

    /// Short label used in logs and output file names.
    pub fn label(&self) -> String {
        match self {
            DistributionConfig::Exponential { .. } => "expon".to_string(),
            DistributionConfig::Erlang { phases, .. } => format!("erlang{phases}"),
            DistributionConfig::MeanCv { mean, cv } => format!("ph-m{mean:.2}-cv{cv:.2}"),
            DistributionConfig::Sum { first, second } => format!("({}+{})", first.label(), second.label()),
            DistributionConfig::Mix { first, second, p } => {
                format!("({:.2}*{}|{})", p, first.label(), second.label())
            }
            DistributionConfig::Explicit { alpha, .. } => format!("ph{}", alpha.len()),
        }
    }
}
