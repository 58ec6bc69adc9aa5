use epiphase::io::{read_trajectory_csv, write_run_log, write_trajectory_csv};
use epiphase::phase::{exponential, from_mean_cv, DistributionConfig, Scale};
use epiphase::{SirPhConfig, SirPhModel};

#[test]
fn run_log_snapshot_without_transmission() -> anyhow::Result<()> {
    // beta = 0: infected simply recover at rate 0.25
    let dist = exponential(Scale::Rate(0.25))?;
    let cfg = SirPhConfig {
        population: 1_000_000.0,
        beta: 0.0,
        initial_infected: 1000.0,
        num_days: 4,
        ..SirPhConfig::default()
    };
    let result = SirPhModel::new(cfg, dist)?.simulate()?;

    let tmp = tempfile::tempdir()?;
    let path = write_run_log(tmp.path(), "TEST", "expon", 1_000_000.0, &result)?;
    assert_eq!(path.file_name().and_then(|s| s.to_str()), Some("sirph_TEST.txt"));

    let s = std::fs::read_to_string(&path)?;
    let (header, rows) = s.split_once("\n\n").expect("blank line between header and table");
    insta::assert_snapshot!(header, @r"
    run_id=TEST
    distribution=expon
    phases=1
    population=1000000
    num_days=4
    effective_r0=0.000000
    total_infected=0.001000
    warnings=0
    ");
    insta::assert_snapshot!(rows.trim_end(), @r"
    day,susceptible,infected,recovered
    0,999000,1000,0
    1,999000,779,221
    2,999000,607,393
    3,999000,472,528
    4,999000,368,632
    ");
    Ok(())
}

#[test]
fn trajectory_csv_round_trip_with_phases() -> anyhow::Result<()> {
    let dist = from_mean_cv(4.4, 0.6)?;
    let cfg = SirPhConfig { population: 10_000.0, num_days: 20, report_phases: true, ..SirPhConfig::default() }
        .with_reproduction_number(&dist, 2.0)?;
    let traj = SirPhModel::new(cfg, dist)?.simulate()?.trajectory;

    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("nested").join("sirph.csv");
    write_trajectory_csv(&path, &traj)?;

    let header = std::fs::read_to_string(&path)?.lines().next().unwrap_or_default().to_string();
    assert!(header.starts_with("Day,S,I,R,I-Phase0"), "{header}");

    let back = read_trajectory_csv(&path)?;
    assert_eq!(back, traj);
    Ok(())
}

#[test]
fn malformed_csv_is_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bad.csv");
    std::fs::write(&path, "Day,S,X,R\n0,1,2,3\n")?;
    assert!(read_trajectory_csv(&path).is_err());

    std::fs::write(&path, "Day,S,I,R\n0,1,two,3\n")?;
    assert!(read_trajectory_csv(&path).is_err());
    Ok(())
}

#[test]
fn distribution_config_from_json() -> anyhow::Result<()> {
    let cfg: DistributionConfig = serde_json::from_str(
        r#"{"kind": "sum",
            "first": {"kind": "exponential", "rate": 0.5},
            "second": {"kind": "erlang", "phases": 2, "mean": 3.0}}"#,
    )?;
    let dist = cfg.build()?;
    assert_eq!(dist.dim(), 3);
    assert!((epiphase::ContinuousDistribution::mean(&dist) - 5.0).abs() < 1e-12);

    let ambiguous: DistributionConfig =
        serde_json::from_str(r#"{"kind": "exponential", "rate": 0.5, "mean": 2.0}"#)?;
    assert!(matches!(ambiguous.build(), Err(epiphase::PhError::Parameter(_))));
    Ok(())
}
