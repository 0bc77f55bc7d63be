//! Circuit evaluation, cost construction and derived quantities.

use approx::assert_relative_eq;
use eisfit_rs::cost::{cost_vector, PENALTY};
use eisfit_rs::derived::DerivedSpectrum;
use eisfit_rs::models::{simulate, AVAILABLE_MODELS};
use eisfit_rs::{
    Circuit, EisFitError, FitConfig, Fitter, FreeParameterList, Model, Weighting,
};
use ndarray::{array, Array1};
use std::f64::consts::PI;

use crate::test_helpers::{
    all_model_params, full_cell_params, model_spectrum, rc_frequencies, rc_params, rc_spectrum,
    RC_C, RC_R,
};

#[test]
fn test_empty_frequency_series_gives_empty_prediction() {
    let params = all_model_params();
    let freqs = Array1::<f64>::zeros(0);
    for name in AVAILABLE_MODELS {
        let circuit = Circuit::by_name(name).unwrap();
        let z = simulate(&circuit, &params, &freqs).unwrap();
        assert!(z.is_empty(), "model {}", name);
    }
}

#[test]
fn test_full_cell_simulation_is_finite() {
    let circuit = Circuit::by_name("PHY_EIS").unwrap();
    assert_eq!(circuit.name(), "phy-eis");

    let z = simulate(&circuit, &full_cell_params(), &rc_frequencies()).unwrap();
    assert_eq!(z.len(), 50);
    assert!(z.iter().all(|v| v.re.is_finite() && v.im.is_finite()));
    // Low frequencies are dominated by capacitive behavior
    assert!(z[0].im < 0.0);
}

#[test]
fn test_unknown_model_name() {
    assert!(matches!(
        Circuit::by_name("randles"),
        Err(EisFitError::UnknownModel(_))
    ));
}

#[test]
fn test_half_cell_fit_recovers_resistances() {
    let circuit = Circuit::by_name("half-cell").unwrap();
    let truth = full_cell_params();
    let spectrum = model_spectrum(&circuit, &truth);

    let mut guess = truth.clone();
    guess.insert("rm", 1.3);
    guess.insert("rct", 7.0);
    let free = FreeParameterList::new(["rm", "rct"]).unwrap();

    let result = Fitter::new(circuit, FitConfig::new().with_normalized(true))
        .fit(&spectrum, &guess, &free)
        .unwrap();

    assert_relative_eq!(result.value("rm").unwrap(), 1.0, max_relative = 1e-3);
    assert_relative_eq!(result.value("rct").unwrap(), 10.0, max_relative = 1e-3);
    assert_eq!(result.value("rd").unwrap(), 50.0);
}

#[test]
fn test_cost_vector_layout_and_penalty() {
    let circuit = Circuit::by_name("rc").unwrap();
    let spectrum = rc_spectrum();
    let free = FreeParameterList::new(["r", "c"]).unwrap();
    let params = rc_params(RC_R, RC_C);

    let exact = cost_vector(
        &array![RC_R, RC_C],
        &spectrum,
        Weighting::Unit,
        &circuit,
        &free,
        &params,
        None,
    )
    .unwrap();
    assert_eq!(exact.len(), 2 * spectrum.len());
    assert!(exact.iter().all(|r| r.abs() < 1e-12));

    let rejected = cost_vector(
        &array![-1.0, RC_C],
        &spectrum,
        Weighting::DataModulus,
        &circuit,
        &free,
        &params,
        None,
    )
    .unwrap();
    assert!(rejected.iter().all(|&r| r == PENALTY));
}

#[test]
fn test_stray_resistance_may_go_negative() {
    let circuit = Circuit::by_name("bpl-planar").unwrap();
    let params = full_cell_params();
    let spectrum = model_spectrum(&circuit, &params);
    let free = FreeParameterList::new(["r_str"]).unwrap();

    let residuals = cost_vector(
        &array![-0.1],
        &spectrum,
        Weighting::Unit,
        &circuit,
        &free,
        &params,
        None,
    )
    .unwrap();
    assert!(residuals.iter().all(|&r| r != PENALTY));
}

#[test]
fn test_derived_quantities_of_rc() {
    let spectrum = rc_spectrum();
    let derived = DerivedSpectrum::from_spectrum(&spectrum).unwrap();

    // Conductance of a parallel RC is flat at 1/R
    for &g in derived.admittance.iter() {
        assert_relative_eq!(g, 1.0 / RC_R, max_relative = 1e-9);
    }
    for &c in derived.capacitance.iter() {
        assert_relative_eq!(c, RC_C, max_relative = 1e-9);
    }

    let back = derived.to_spectrum().unwrap();
    for (a, b) in back.impedance().iter().zip(spectrum.impedance().iter()) {
        assert_relative_eq!(a.re, b.re, max_relative = 1e-9);
        assert_relative_eq!(a.im, b.im, max_relative = 1e-9);
    }
}

#[test]
fn test_fit_result_derived_spectrum() {
    let circuit = Circuit::by_name("rc").unwrap();
    let result = Fitter::new(circuit, FitConfig::default())
        .fit(
            &rc_spectrum(),
            &rc_params(70.0, 2e-6),
            &FreeParameterList::new(["r", "c"]).unwrap(),
        )
        .unwrap();

    let derived = result.derived().unwrap();
    let omega = 2.0 * PI * derived.frequencies[10];
    let expected_abs_c = {
        let z = result.predicted.impedance()[10];
        z.im.abs() / (omega * z.norm_sqr())
    };
    assert_relative_eq!(derived.abs_capacitance[10], expected_abs_c, max_relative = 1e-9);
}
