use anyhow::Context;

use crate::model::sir_ph::SirPhResult;

/// Writes a plain-text log of one SIR-PH run: a `key=value` header followed by
/// the daily S/I/R counts.
pub fn write_run_log(
    out_dir: impl AsRef<std::path::Path>,
    run_id: &str,
    distribution: &str,
    population: f64,
    result: &SirPhResult,
) -> anyhow::Result<std::path::PathBuf> {
    use std::io::Write;

    std::fs::create_dir_all(out_dir.as_ref()).context("create logs dir failed")?;
    let path = out_dir.as_ref().join(format!("sirph_{}.txt", run_id));
    let mut f = std::fs::File::create(&path)
        .with_context(|| format!("create run log file failed (path={:?})", path))?;

    let traj = &result.trajectory;
    writeln!(f, "run_id={}", run_id)?;
    writeln!(f, "distribution={}", distribution)?;
    writeln!(f, "phases={}", result.phases)?;
    writeln!(f, "population={:.0}", population)?;
    writeln!(f, "num_days={}", traj.len().saturating_sub(1))?;
    writeln!(f, "effective_r0={:.6}", result.effective_r0)?;
    writeln!(f, "total_infected={:.6}", result.total_infected)?;
    writeln!(f, "warnings={}", result.warnings.len())?;
    for w in &result.warnings {
        writeln!(f, "warning: {}", w)?;
    }
    writeln!(f)?;
    writeln!(f, "day,susceptible,infected,recovered")?;

    for k in 0..traj.len() {
        writeln!(f, "{:.0},{:.0},{:.0},{:.0}", traj.day[k], traj.s[k], traj.i[k], traj.r[k])?;
    }

    Ok(path)
}
