use anyhow::Context;

use crate::model::trajectory::Trajectory;

/// Writes `trajectory` as CSV with a header row from `column_names()`.
pub fn write_trajectory_csv(path: impl AsRef<std::path::Path>, trajectory: &Trajectory) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create output dir failed (path={:?})", dir))?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create trajectory CSV: {}", path.display()))?;

    wtr.write_record(trajectory.column_names())?;
    for k in 0..trajectory.len() {
        if let Some(row) = trajectory.row(k) {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
    }
    wtr.flush().context("flush trajectory CSV failed")?;
    Ok(())
}

/// Reads back a trajectory written by [`write_trajectory_csv`]. Phase columns
/// are recovered from their `I-Phase*` / `R-Phase*` headers.
pub fn read_trajectory_csv(path: impl AsRef<std::path::Path>) -> anyhow::Result<Trajectory> {
    let path = path.as_ref();
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open trajectory CSV: {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    anyhow::ensure!(
        headers.len() >= 4 && &headers[0] == "Day" && &headers[1] == "S" && &headers[2] == "I" && &headers[3] == "R",
        "unexpected trajectory header: {:?}",
        headers
    );
    let n_inf = headers.iter().filter(|h| h.starts_with("I-Phase")).count();
    let n_rec = headers.iter().filter(|h| h.starts_with("R-Phase")).count();
    anyhow::ensure!(headers.len() == 4 + n_inf + n_rec, "unexpected columns in {:?}", headers);

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for result in rdr.records() {
        let record = result?;
        anyhow::ensure!(record.len() == headers.len(), "ragged row in trajectory CSV");
        for (col, field) in columns.iter_mut().zip(record.iter()) {
            col.push(field.trim().parse::<f64>().with_context(|| format!("bad number '{}'", field))?);
        }
    }

    let mut cols = columns.into_iter();
    let mut next = || cols.next().unwrap_or_default();
    let (day, s, i, r) = (next(), next(), next(), next());
    let phases = if n_inf + n_rec > 0 {
        let infected = (0..n_inf).map(|_| next()).collect();
        let recovered = (0..n_rec).map(|_| next()).collect();
        Some(crate::model::trajectory::PhaseColumns { infected, recovered })
    } else {
        None
    };
    Ok(Trajectory { day, s, i, r, phases })
}
