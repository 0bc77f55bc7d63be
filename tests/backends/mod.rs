//! End-to-end fits of a parallel RC spectrum with every backend.

use approx::assert_relative_eq;
use eisfit_rs::{
    Algorithm, Circuit, EisFitError, FitConfig, Fitter, FreeParameterList, ParameterSet,
};

use crate::test_helpers::{noisy_rc_spectrum, rc_params, rc_spectrum, RC_C, RC_R};

fn rc_fitter(config: FitConfig) -> Fitter {
    Fitter::new(Circuit::by_name("rc").unwrap(), config)
}

fn rc_free() -> FreeParameterList {
    FreeParameterList::new(["r", "c"]).unwrap()
}

#[test]
fn test_trust_region_recovers_rc() {
    let spectrum = rc_spectrum();
    let result = rc_fitter(FitConfig::default())
        .fit(&spectrum, &rc_params(50.0, 5e-7), &rc_free())
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.algorithm, Algorithm::TrustRegion);
    assert_relative_eq!(result.value("r").unwrap(), RC_R, max_relative = 1e-2);
    assert_relative_eq!(result.value("c").unwrap(), RC_C, max_relative = 1e-2);
    assert!(result.redchi < 1e-6);
    assert_relative_eq!(result.redchi * (50.0 - 2.0), result.chisqr, max_relative = 1e-12);
    assert!(result.nfev > 0);
    assert_eq!(result.predicted.len(), spectrum.len());
}

#[test]
fn test_levenberg_marquardt_recovers_rc() {
    let config = FitConfig::new()
        .with_algorithm(Algorithm::LevenbergMarquardt)
        .with_normalized(true);
    let result = rc_fitter(config)
        .fit(&rc_spectrum(), &rc_params(50.0, 5e-7), &rc_free())
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_relative_eq!(result.value("r").unwrap(), RC_R, max_relative = 1e-2);
    assert_relative_eq!(result.value("c").unwrap(), RC_C, max_relative = 1e-2);
}

#[test]
fn test_quasi_newton_recovers_rc() {
    let config = FitConfig::new()
        .with_algorithm(Algorithm::QuasiNewton)
        .with_normalized(true);
    let result = rc_fitter(config)
        .fit(&rc_spectrum(), &rc_params(80.0, 8e-7), &rc_free())
        .unwrap();

    assert_relative_eq!(result.value("r").unwrap(), RC_R, max_relative = 1e-2);
    assert_relative_eq!(result.value("c").unwrap(), RC_C, max_relative = 1e-2);
}

#[test]
fn test_differential_evolution_recovers_rc_from_noisy_data() {
    let spectrum = noisy_rc_spectrum(0.01, 7);
    let config = FitConfig::new()
        .with_algorithm(Algorithm::DifferentialEvolution)
        .with_normalized(true)
        .with_max_evaluations(2000);
    let result = rc_fitter(config)
        .fit(&spectrum, &rc_params(50.0, 5e-7), &rc_free())
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_relative_eq!(result.value("r").unwrap(), RC_R, max_relative = 2e-2);
    assert_relative_eq!(result.value("c").unwrap(), RC_C, max_relative = 2e-2);
    // Global search reports no covariance
    assert!(result.covariance.is_none());
    assert!(result.uncertainties.iter().all(|u| !u.is_available()));
}

#[test]
fn test_differential_evolution_is_deterministic_for_a_seed() {
    let spectrum = noisy_rc_spectrum(0.01, 11);
    let config = FitConfig::new()
        .with_algorithm(Algorithm::DifferentialEvolution)
        .with_normalized(true)
        .with_max_evaluations(200)
        .with_seed(42);
    let fitter = rc_fitter(config);
    let params = rc_params(50.0, 5e-7);

    let first = fitter.fit(&spectrum, &params, &rc_free()).unwrap();
    let second = fitter.fit(&spectrum, &params, &rc_free()).unwrap();

    assert_eq!(first.parameters, second.parameters);
    assert_eq!(first.nfev, second.nfev);
    assert_eq!(first.chisqr, second.chisqr);
}

#[test]
fn test_fixed_parameter_is_untouched() {
    let spectrum = rc_spectrum();
    let free = FreeParameterList::new(["r"]).unwrap();
    let result = rc_fitter(FitConfig::default())
        .fit(&spectrum, &rc_params(60.0, RC_C), &free)
        .unwrap();

    assert_eq!(result.value("c").unwrap(), RC_C);
    assert_relative_eq!(result.value("r").unwrap(), RC_R, max_relative = 1e-6);
    assert_eq!(result.uncertainties.len(), 1);
    assert!(result.uncertainty("c").is_none());
}

#[test]
fn test_every_backend_reports_its_algorithm() {
    let spectrum = noisy_rc_spectrum(0.005, 3);
    for algorithm in Algorithm::ALL {
        let config = FitConfig::new()
            .with_algorithm(algorithm)
            .with_normalized(true)
            .with_max_evaluations(300);
        let result = rc_fitter(config)
            .fit(&spectrum, &rc_params(90.0, 1.1e-6), &rc_free())
            .unwrap();
        assert_eq!(result.algorithm, algorithm);
        assert!(result.chisqr.is_finite());
        assert!(result.to_string().contains(algorithm.name()));
    }
}

#[test]
fn test_configuration_errors() {
    let spectrum = rc_spectrum();
    let fitter = rc_fitter(FitConfig::default());

    let missing = ParameterSet::from_pairs([("r", 100.0)]);
    assert!(matches!(
        fitter.fit(&spectrum, &missing, &rc_free()),
        Err(EisFitError::MissingParameter(_))
    ));

    let empty = FreeParameterList::new(Vec::<&str>::new()).unwrap();
    assert!(matches!(
        fitter.fit(&spectrum, &rc_params(50.0, 5e-7), &empty),
        Err(EisFitError::InvalidInput(_))
    ));

    let normalized = rc_fitter(FitConfig::new().with_normalized(true));
    assert!(matches!(
        normalized.fit(&spectrum, &rc_params(0.0, 5e-7), &rc_free()),
        Err(EisFitError::InvalidInput(_))
    ));
}

#[test]
fn test_too_few_points_is_degenerate() {
    let spectrum = rc_spectrum().select(&[0, 1]);
    let result = rc_fitter(FitConfig::default()).fit(&spectrum, &rc_params(50.0, 5e-7), &rc_free());
    assert!(matches!(
        result,
        Err(EisFitError::DegenerateDof { n_points: 2, n_free: 2 })
    ));
}
