//! Parameter tables and configuration round trips.

use approx::assert_relative_eq;
use eisfit_rs::parameters::{parse_parameter_entries, parse_parameter_table};
use eisfit_rs::{Algorithm, Circuit, FitConfig, Fitter, FreeParameterList, Weighting};

use crate::test_helpers::{noisy_rc_spectrum, rc_params};

#[test]
fn test_fit_result_table_round_trip() {
    let circuit = Circuit::by_name("rc").unwrap();
    let mut params = rc_params(80.0, 1.2e-6);
    params.insert("unused", 3.5);
    let free = FreeParameterList::new(["r", "c"]).unwrap();

    let result = Fitter::new(circuit, FitConfig::default())
        .fit(&noisy_rc_spectrum(0.01, 5), &params, &free)
        .unwrap();
    let (header, values) = result.to_table();
    assert!(header.starts_with("C,C_error,C_error %,"));

    let (parsed, parsed_free) = parse_parameter_table(&header, &values).unwrap();
    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed_free.names(), &["c".to_string(), "r".to_string()]);
    assert_relative_eq!(
        parsed.get("r").unwrap(),
        result.value("r").unwrap(),
        max_relative = 1e-6
    );
    assert_eq!(parsed.get("unused").unwrap(), 3.5);

    let entries = parse_parameter_entries(&header, &values).unwrap();
    let r_entry = entries.iter().find(|e| e.name == "r").unwrap();
    let r_unc = result.uncertainty("r").unwrap();
    assert_relative_eq!(r_entry.error.unwrap(), r_unc.stderr().unwrap(), max_relative = 1e-6);
    assert_relative_eq!(
        r_entry.error_percent.unwrap(),
        r_unc.percent().unwrap(),
        max_relative = 1e-6
    );
}

#[test]
fn test_fit_config_json_accepts_method_aliases() {
    let config = FitConfig::from_json(
        r#"{"algorithm": "leastsq", "weighting": "data_modulus", "normalized": true}"#,
    )
    .unwrap();
    assert_eq!(config.algorithm, Algorithm::LevenbergMarquardt);
    assert_eq!(config.weighting, Weighting::DataModulus);
    assert!(config.normalized);
    // Everything else keeps its default
    assert_eq!(config.max_evaluations, 100_000);
    assert!(config.restrict_negative_imag);

    let json = config.to_json().unwrap();
    assert_eq!(FitConfig::from_json(&json).unwrap(), config);
}

#[test]
fn test_algorithm_names_parse() {
    for algorithm in Algorithm::ALL {
        assert_eq!(algorithm.name().parse::<Algorithm>().unwrap(), algorithm);
    }
    assert!("nelder_mead".parse::<Algorithm>().is_err());
}
