use std::time::Instant;

use epiphase::scenario::{variance_analysis, Scenario};

fn main() -> anyhow::Result<()> {
    let scenario = Scenario { variance_cvs: vec![0.25, 0.5, 1.0, 2.0, 4.0], ..Scenario::default() };

    let t_start = Instant::now();
    let runs = variance_analysis(&scenario, 4.4)?;
    let elapsed_ms = t_start.elapsed().as_secs_f64() * 1000.0;

    println!("cv,phases,peak_day,peak_infected,total_infected");
    for run in &runs {
        let (peak_day, peak) = run.result.trajectory.peak().unwrap_or((0.0, 0.0));
        println!(
            "{:.2},{},{:.0},{:.0},{:.4}",
            run.cv, run.result.phases, peak_day, peak, run.result.total_infected
        );
    }
    println!("elapsed_ms={:.3}", elapsed_ms);
    Ok(())
}
