use epiphase::error::{scan_negative, NEGATIVE_TOLERANCE};
use epiphase::phase::{
    erlang, exponential, from_mean_cv, mix, sum, ContinuousDistribution, PhaseType, Scale, MAX_PHASES,
};
use epiphase::PhError;

fn close(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol * b.abs().max(1.0)
}

#[test]
fn exponential_matches_closed_form() {
    let r = 0.25;
    let d = exponential(Scale::Rate(r)).expect("exponential");
    assert_eq!(d.dim(), 1);
    assert!(close(d.mean(), 1.0 / r, 1e-12));
    assert!(close(d.variance().unwrap(), 1.0 / (r * r), 1e-10));
    for &x in &[0.0, 0.5, 1.0, 4.0, 10.0, 25.0] {
        assert!((d.cdf(x) - (1.0 - (-r * x).exp())).abs() < 1e-12, "cdf at {x}");
        assert!((d.pdf(x) - r * (-r * x).exp()).abs() < 1e-12, "pdf at {x}");
    }
}

#[test]
fn negative_arguments_have_no_mass() {
    let d = erlang(3, Scale::Mean(4.0)).unwrap();
    assert_eq!(d.cdf(-1.0), 0.0);
    assert_eq!(d.pdf(-0.5), 0.0);
    assert_eq!(d.sf(-2.0), 1.0);
}

#[test]
fn erlang_mean_and_variance() {
    let d = erlang(4, Scale::Rate(2.0)).unwrap();
    assert!(close(d.mean(), 2.0, 1e-12));
    assert!(close(d.variance().unwrap(), 1.0, 1e-10));

    // a mean-parameterised Erlang puts rate n/mean on each phase
    let m = erlang(5, Scale::Mean(10.0)).unwrap();
    assert!(close(m.mean(), 10.0, 1e-12));
    assert!((m.generator()[(0, 0)] + 0.5).abs() < 1e-15);
    assert!((m.generator()[(0, 1)] - 0.5).abs() < 1e-15);
}

#[test]
fn erlang_two_cdf_matches_gamma() {
    let lam: f64 = 20.0;
    let d = erlang(2, Scale::Rate(lam)).unwrap();
    for &x in &[0.01, 0.05, 0.1, 0.3] {
        let expected = 1.0 - (-lam * x).exp() * (1.0 + lam * x);
        assert!((d.cdf(x) - expected).abs() < 1e-12);
    }
}

#[test]
fn raw_moments_and_shape_of_exponential() {
    let d = exponential(Scale::Rate(2.0)).unwrap();
    let m = d.moments(4).unwrap();
    // E[X^k] = k! / rate^k
    let expected = [0.5, 0.5, 0.75, 1.5];
    for (got, want) in m.iter().zip(expected) {
        assert!(close(*got, want, 1e-12), "{got} vs {want}");
    }
    assert!(close(d.moment(3).unwrap(), 0.75, 1e-12));

    let stats = d.stats().unwrap();
    assert!(close(stats.mean, 0.5, 1e-12));
    assert!(close(stats.variance, 0.25, 1e-10));
    assert!(close(stats.skewness, 2.0, 1e-8));
    assert!(close(stats.kurtosis, 6.0, 1e-8));
}

#[test]
fn erlang_skewness() {
    let n = 4.0_f64;
    let stats = erlang(4, Scale::Rate(1.5)).unwrap().stats().unwrap();
    assert!(close(stats.skewness, 2.0 / n.sqrt(), 1e-8));
    assert!(close(stats.kurtosis, 6.0 / n, 1e-8));
}

#[test]
fn loss_function_of_exponential() {
    let lambd = 0.5;
    let d = exponential(Scale::Rate(lambd)).unwrap();
    for &x in &[0.0, 1.0, 2.5, 5.0] {
        let expected = (-lambd * x).exp() / lambd;
        assert!((d.loss1(x).unwrap() - expected).abs() < 1e-10, "loss1 at {x}");
    }
}

#[test]
fn loss_at_zero_is_the_mean() {
    let dists = vec![
        exponential(Scale::Mean(4.0)).unwrap(),
        erlang(3, Scale::Mean(6.0)).unwrap(),
        from_mean_cv(4.4, 2.0).unwrap(),
        from_mean_cv(4.4, 0.3).unwrap(),
    ];
    for d in &dists {
        assert!(close(d.loss1(0.0).unwrap(), d.mean(), 1e-9));
    }
}

#[test]
fn equilibrium_residual_of_erlang_two() {
    // forward recurrence of Erlang(2, rate) starts in either phase with probability 1/2
    let d = erlang(2, Scale::Rate(3.0)).unwrap();
    let erd = d.equilibrium_residual().unwrap();
    assert!((erd.alpha()[0] - 0.5).abs() < 1e-12);
    assert!((erd.alpha()[1] - 0.5).abs() < 1e-12);
    assert_eq!(erd.generator(), d.generator());
}

#[test]
fn equilibrium_pi_of_erlang_is_uniform() {
    for n in 1..=6 {
        let d = erlang(n, Scale::Mean(3.0)).unwrap();
        let pi = d.equilibrium_pi().unwrap();
        assert_eq!(pi.len(), n);
        for p in pi.iter() {
            assert!((p - 1.0 / n as f64).abs() < 1e-12, "pi entry {p} for n={n}");
        }
    }
}

#[test]
fn equilibrium_pi_of_hyperexponential() {
    let d = mix(
        &exponential(Scale::Rate(4.0)).unwrap(),
        &exponential(Scale::Rate(2.0)).unwrap(),
        0.4,
    )
    .unwrap();
    let pi = d.equilibrium_pi().unwrap();
    assert!((pi.sum() - 1.0).abs() < 1e-12);
    assert!(pi.iter().all(|&p| p >= 0.0));
    // occupancy is proportional to p_i / rate_i
    let w = [0.4 / 4.0, 0.6 / 2.0];
    let total = w[0] + w[1];
    assert!((pi[0] - w[0] / total).abs() < 1e-12);
    assert!((pi[1] - w[1] / total).abs() < 1e-12);
}

#[test]
fn mean_cv_fit_is_exact() {
    for &cv in &[0.2, 0.3, 0.5, 0.7, 1.0, 1.5, 2.0, 3.0] {
        let d = from_mean_cv(4.4, cv).unwrap();
        assert!(close(d.mean(), 4.4, 1e-9), "mean for cv={cv}");
        assert!(close(d.cv().unwrap(), cv, 1e-7), "cv for cv={cv}");
    }
    assert_eq!(from_mean_cv(4.4, 0.5).unwrap().dim(), 4);
    assert_eq!(from_mean_cv(4.4, 2.0).unwrap().dim(), 2);
}

#[test]
fn scale_requires_exactly_one_of_rate_and_mean() {
    assert!(matches!(Scale::from_options(None, None), Err(PhError::Parameter(_))));
    assert!(matches!(Scale::from_options(Some(1.0), Some(2.0)), Err(PhError::Parameter(_))));
    assert_eq!(Scale::from_options(Some(1.0), None).unwrap(), Scale::Rate(1.0));
    assert_eq!(Scale::from_options(None, Some(2.0)).unwrap(), Scale::Mean(2.0));
    assert!(matches!(erlang(0, Scale::Rate(1.0)), Err(PhError::Parameter(_))));
    assert!(matches!(exponential(Scale::Mean(-3.0)), Err(PhError::Parameter(_))));
    assert!(matches!(exponential(Scale::Rate(0.0)), Err(PhError::Parameter(_))));
}

#[test]
fn invalid_generators_are_rejected() {
    // row sums to a positive number
    let r = PhaseType::from_rows(&[1.0, 0.0], &[vec![-1.0, 2.0], vec![0.0, -1.0]]);
    assert!(matches!(r, Err(PhError::DistributionConfiguration(_))));

    // non-negative diagonal
    let r = PhaseType::from_rows(&[1.0], &[vec![0.0]]);
    assert!(matches!(r, Err(PhError::DistributionConfiguration(_))));

    // conservative generator: rows sum to zero, so A is singular
    let r = PhaseType::from_rows(&[1.0, 0.0], &[vec![-1.0, 1.0], vec![1.0, -1.0]]);
    assert!(matches!(r, Err(PhError::DistributionConfiguration(_))));

    // alpha carries more than unit mass
    let r = PhaseType::from_rows(&[0.7, 0.7], &[vec![-1.0, 0.0], vec![0.0, -1.0]]);
    assert!(matches!(r, Err(PhError::DistributionConfiguration(_))));

    let r = PhaseType::from_rows(&[1.0, 0.0, 0.0], &[vec![-1.0, 0.0], vec![0.0, -1.0]]);
    assert!(matches!(r, Err(PhError::DimensionMismatch { .. })));

    let r = PhaseType::from_rows(&[1.0, 0.0], &[vec![-1.0, 0.0], vec![0.0]]);
    assert!(matches!(r, Err(PhError::DimensionMismatch { .. })));
}

#[test]
fn massless_alpha_is_rejected() {
    // alpha = 0 is a point mass at zero: mean 0 and no residual distribution
    let r = PhaseType::from_rows(&[0.0], &[vec![-1.0]]);
    assert!(matches!(r, Err(PhError::DistributionConfiguration(_))), "{r:?}");

    let r = PhaseType::from_rows(&[1e-12, 0.0], &[vec![-1.0, 1.0], vec![0.0, -1.0]]);
    assert!(matches!(r, Err(PhError::DistributionConfiguration(_))), "{r:?}");

    // a defective alpha with real mass is still a distribution
    let d = PhaseType::from_rows(&[0.25], &[vec![-1.0]]).unwrap();
    assert!(close(d.loss1(0.0).unwrap(), d.mean(), 1e-12));
    assert!((d.mean() - 0.25).abs() < 1e-15);
}

#[test]
fn phase_count_is_capped() {
    assert!(matches!(from_mean_cv(4.4, 1e-3), Err(PhError::Parameter(_))));
    assert!(matches!(erlang(MAX_PHASES + 1, Scale::Rate(1.0)), Err(PhError::Parameter(_))));
}

/// Off-diagonal entries within tolerance of zero are accepted, and a slow
/// second phase amplifies them into visibly negative residual mass.
fn noisy_two_phase() -> PhaseType {
    PhaseType::from_rows(&[1.0, 0.0], &[vec![-1.0, -0.9e-9], vec![0.0, -1e-4]]).unwrap()
}

#[test]
fn negative_noise_is_kept_not_clamped() {
    let d = noisy_two_phase();
    let erd = d.equilibrium_residual().unwrap();
    // -gamma * alpha A^-1 = [1, -9e-6] / mean, mean = 1 - 9e-6
    let expected = -9e-6 / (1.0 - 9e-6);
    assert!((erd.alpha()[1] - expected).abs() < 1e-12, "{}", erd.alpha()[1]);
    assert!((erd.alpha().sum() - 1.0).abs() < 1e-12);

    let pi = d.equilibrium_pi().unwrap();
    assert!(pi[1] < -NEGATIVE_TOLERANCE);
    assert!((pi.sum() - 1.0).abs() < 1e-12);

    let warnings = scan_negative("equilibrium pi", pi.iter().copied());
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].index, Some(1));
    assert_eq!(warnings[0].value, pi[1]);
}

#[test]
fn scan_reports_only_values_beyond_tolerance() {
    let warnings = scan_negative("rates", [0.5, -1e-12, -2e-6, 0.0, -3.0]);
    let found: Vec<(Option<usize>, f64)> = warnings.iter().map(|w| (w.index, w.value)).collect();
    assert_eq!(found, vec![(Some(2), -2e-6), (Some(4), -3.0)]);
    assert!(warnings.iter().all(|w| w.quantity == "rates"));
    assert_eq!(warnings[1].to_string(), "rates[4] = -3e0");
}

#[test]
fn mixing_probability_out_of_range() {
    let e = exponential(Scale::Rate(1.0)).unwrap();
    assert!(matches!(mix(&e, &e, 1.5), Err(PhError::Parameter(_))));
    assert!(matches!(mix(&e, &e, -0.1), Err(PhError::Parameter(_))));
}

#[test]
fn sum_of_two_exponentials_is_erlang() {
    let e = exponential(Scale::Rate(3.0)).unwrap();
    let s = sum(&e, &e).unwrap();
    let g = erlang(2, Scale::Rate(3.0)).unwrap();
    assert_eq!(s.generator(), g.generator());
    assert_eq!(s.alpha(), g.alpha());
}

#[test]
fn sum_routes_mass_at_zero_into_second_stage() {
    // 30% of the first stage is skipped
    let first = PhaseType::from_rows(&[0.7], &[vec![-1.0]]).unwrap();
    let second = exponential(Scale::Rate(2.0)).unwrap();
    let s = sum(&first, &second).unwrap();
    assert!((s.alpha().sum() - 1.0).abs() < 1e-15);
    assert!(close(s.mean(), first.mean() + second.mean(), 1e-12));
}

#[test]
fn caches_can_be_forced_and_shared() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<PhaseType>();

    let d = from_mean_cv(4.4, 0.5).unwrap();
    d.precompute().unwrap();
    let d = std::sync::Arc::new(d);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let d = d.clone();
            std::thread::spawn(move || d.equilibrium_pi().unwrap().sum())
        })
        .collect();
    for h in handles {
        assert!((h.join().unwrap() - 1.0).abs() < 1e-12);
    }
}

#[test]
fn display_shows_alpha_and_generator() {
    let d = erlang(2, Scale::Rate(2.0)).unwrap();
    insta::assert_snapshot!(d.to_string(), @r"
    PhaseType:
      alpha = [1.00, 0.00]
      A     = [[-2.00, 2.00],
               [0.00, -2.00]]
    ");
}
