//! Standard errors and covariance from the local backends.

use approx::assert_relative_eq;
use eisfit_rs::{Algorithm, Circuit, FitConfig, FitResult, Fitter, FreeParameterList};

use crate::test_helpers::{noisy_rc_spectrum, rc_params};

fn fit_noisy_rc(config: FitConfig) -> FitResult {
    let spectrum = noisy_rc_spectrum(0.02, 19);
    Fitter::new(Circuit::by_name("rc").unwrap(), config)
        .fit(
            &spectrum,
            &rc_params(70.0, 1.4e-6),
            &FreeParameterList::new(["r", "c"]).unwrap(),
        )
        .unwrap()
}

#[test]
fn test_trust_region_uncertainties_are_positive() {
    let result = fit_noisy_rc(FitConfig::default());
    assert!(result.success, "{}", result.message);

    for name in ["r", "c"] {
        let unc = result.uncertainty(name).unwrap();
        let stderr = unc.stderr().unwrap();
        assert!(stderr > 0.0 && stderr.is_finite());
        // 2% noise on 50 points pins both values well below 5%
        assert!(unc.percent().unwrap() < 5.0);
    }

    let corr = result.correlation().unwrap();
    assert_relative_eq!(corr[[0, 0]], 1.0, epsilon = 1e-12);
    assert_relative_eq!(corr[[1, 1]], 1.0, epsilon = 1e-12);
    assert!(corr[[0, 1]].abs() <= 1.0);
}

#[test]
fn test_normalized_mode_gives_the_same_relative_errors() {
    let raw = fit_noisy_rc(FitConfig::default());
    let normalized = fit_noisy_rc(FitConfig::new().with_normalized(true));

    for name in ["r", "c"] {
        assert_relative_eq!(
            raw.value(name).unwrap(),
            normalized.value(name).unwrap(),
            max_relative = 1e-4
        );
        assert_relative_eq!(
            raw.uncertainty(name).unwrap().percent().unwrap(),
            normalized.uncertainty(name).unwrap().percent().unwrap(),
            max_relative = 1e-2
        );
    }
}

#[test]
fn test_jacobian_backends_agree_on_errors() {
    let trust_region = fit_noisy_rc(FitConfig::new().with_normalized(true));
    let classic = fit_noisy_rc(
        FitConfig::new()
            .with_algorithm(Algorithm::LevenbergMarquardt)
            .with_normalized(true),
    );

    for name in ["r", "c"] {
        let a = trust_region.uncertainty(name).unwrap().stderr().unwrap();
        let b = classic.uncertainty(name).unwrap().stderr().unwrap();
        assert_relative_eq!(a, b, max_relative = 5e-2);
    }
}

#[test]
fn test_quasi_newton_reports_covariance() {
    let result = fit_noisy_rc(
        FitConfig::new()
            .with_algorithm(Algorithm::QuasiNewton)
            .with_normalized(true),
    );

    assert_relative_eq!(result.value("r").unwrap(), 100.0, max_relative = 5e-2);
    if let Some(covariance) = result.covariance.as_ref() {
        assert_eq!(covariance.dim(), (2, 2));
        assert!(result.uncertainties.iter().all(|u| u.is_available()));
    } else {
        assert!(!result.success);
    }
}
