//! Background fit and simulation jobs.

use approx::assert_relative_eq;
use eisfit_rs::{
    Algorithm, Circuit, Completion, FitConfig, FitWorker, Fitter, FreeParameterList, JobStatus,
    Model,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::test_helpers::{full_cell_params, model_spectrum, noisy_rc_spectrum, rc_params};

#[test]
fn test_running_global_search_can_be_cancelled() {
    let circuit = Circuit::by_name("half-cell").unwrap();
    let params = full_cell_params();
    let spectrum = model_spectrum(&circuit, &params);
    let free = FreeParameterList::new(["rm", "rct", "rd", "cpe_b_t", "cdl_c0", "cd_c0"]).unwrap();

    // A zero tolerance never triggers, so only cancellation ends the search
    let config = FitConfig::new()
        .with_algorithm(Algorithm::DifferentialEvolution)
        .with_normalized(true)
        .with_global_tolerance(0.0)
        .with_max_evaluations(1_000_000);
    let handle = FitWorker::spawn_fit(Fitter::new(circuit, config), spectrum, params, free);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.status(), JobStatus::Running);
    handle.cancel();

    match handle.wait() {
        Completion::Cancelled => {}
        other => panic!("Expected Cancelled, got {:?}", other),
    }
}

#[test]
fn test_concurrent_fits_share_one_model() {
    let model: Arc<dyn Model> = Arc::new(Circuit::by_name("rc").unwrap());
    let free = FreeParameterList::new(["r", "c"]).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|seed| {
            let fitter = Fitter::with_shared_model(Arc::clone(&model), FitConfig::default());
            FitWorker::spawn_fit(
                fitter,
                noisy_rc_spectrum(0.01, seed),
                rc_params(60.0, 2e-6),
                free.clone(),
            )
        })
        .collect();

    for handle in handles {
        match handle.wait() {
            Completion::Fitted(result) => {
                assert!(result.success, "{}", result.message);
                assert_relative_eq!(result.value("r").unwrap(), 100.0, max_relative = 2e-2);
            }
            other => panic!("Expected a fit, got {:?}", other),
        }
    }
}

#[test]
fn test_simulation_job_returns_prediction() {
    let model: Arc<dyn Model> = Arc::new(Circuit::by_name("phy-eis").unwrap());
    let freqs = ndarray::Array1::logspace(10.0, -2.0, 5.0, 30);
    let expected = model.evaluate(&full_cell_params(), &freqs).unwrap();

    let handle = FitWorker::spawn_simulation(Arc::clone(&model), full_cell_params(), freqs);
    match handle.wait() {
        Completion::Simulated(z) => assert_eq!(z, expected),
        other => panic!("Expected a simulation, got {:?}", other),
    }
}
