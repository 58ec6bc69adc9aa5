use anyhow::Context;
use tracing_subscriber::EnvFilter;

use epiphase::io::{write_run_log, write_trajectory_csv};
use epiphase::phase::ContinuousDistribution;
use epiphase::scenario::{compare_models, variance_analysis, Scenario};

fn load_scenario() -> anyhow::Result<Scenario> {
    match std::env::var("EPIPHASE_SCENARIO") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read scenario file: {}", path))?;
            serde_json::from_str(&raw).with_context(|| format!("Failed to parse scenario file: {}", path))
        }
        Err(_) => Ok(Scenario::default()),
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let out_dir = std::env::var("EPIPHASE_OUT_DIR").unwrap_or_else(|_| "out".to_string());
    let scenario = load_scenario()?;
    let dist = scenario.distribution.build().context("invalid distribution")?;
    println!("{}", dist);

    let cmp = compare_models(&scenario)?;
    write_trajectory_csv(format!("{}/{}-SIR.csv", out_dir, cmp.name), &cmp.classical)?;
    write_trajectory_csv(format!("{}/{}-SIR-PH.csv", out_dir, cmp.name), &cmp.phase_type.trajectory)?;
    let log = write_run_log(&out_dir, &cmp.name, &scenario.distribution.label(), scenario.population, &cmp.phase_type)?;
    tracing::info!(path = %log.display(), "run log written");

    for run in variance_analysis(&scenario, dist.mean())? {
        let name = format!("{}-cv{:.2}", cmp.name, run.cv);
        write_trajectory_csv(format!("{}/{}.csv", out_dir, name), &run.result.trajectory)?;
    }

    println!(
        "{}",
        serde_json::json!({
            "name": cmp.name,
            "effective_r0": cmp.phase_type.effective_r0,
            "total_infected": cmp.phase_type.total_infected,
            "max_abs_error": cmp.deviation,
            "warnings": cmp.phase_type.warnings,
        })
    );
    Ok(())
}
