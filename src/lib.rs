//! # eisfit-rs
//!
//! `eisfit-rs` fits equivalent-circuit models of electrochemical impedance to
//! measured spectra and reports parameter uncertainties.
//!
//! The library provides:
//! - Closed-form circuit blocks (transmission line, diffusion, constant phase,
//!   separator, stray) composed into named models
//! - Weighted complex residuals with positivity and finiteness guards
//! - Four optimization backends behind one [`Fitter`]: trust-region least
//!   squares, classic Levenberg–Marquardt, BFGS and differential evolution
//! - Covariance-based standard errors, reduced chi-square and derived
//!   admittance/capacitance spectra
//! - Background execution with cooperative cancellation
//!
//! ## Basic Usage
//!
//! ```
//! use eisfit_rs::data::{log_spaced_frequencies, ImpedanceSpectrum};
//! use eisfit_rs::models::{simulate, Circuit};
//! use eisfit_rs::parameters::{FreeParameterList, ParameterSet};
//! use eisfit_rs::{FitConfig, Fitter};
//!
//! let circuit = Circuit::by_name("rc").unwrap();
//! let freqs = log_spaced_frequencies(0.1, 1e5, 50);
//! let truth = ParameterSet::from_pairs([("r", 100.0), ("c", 1e-6)]);
//! let spectrum = ImpedanceSpectrum::new(freqs.clone(), simulate(&circuit, &truth, &freqs).unwrap()).unwrap();
//!
//! let guess = ParameterSet::from_pairs([("r", 50.0), ("c", 5e-7)]);
//! let free = FreeParameterList::new(["r", "c"]).unwrap();
//! let result = Fitter::new(circuit, FitConfig::default())
//!     .fit(&spectrum, &guess, &free)
//!     .unwrap();
//!
//! assert!(result.success);
//! assert!((result.value("r").unwrap() - 100.0).abs() < 1.0);
//! ```

pub mod cancel;
pub mod cost;
pub mod data;
pub mod derived;
pub mod error;
pub mod fit;
pub mod global_opt;
pub mod lm;
pub mod models;
pub mod parameters;
pub mod problem;
pub mod quasi_newton;
pub mod uncertainty;
pub mod utils;
pub mod worker;

// Re-exports for convenience
pub use cancel::CancellationToken;
pub use cost::Weighting;
pub use data::ImpedanceSpectrum;
pub use error::{EisFitError, Result};
pub use fit::{Algorithm, FitConfig, FitResult, Fitter};
pub use models::{Circuit, Model};
pub use parameters::{FreeParameterList, ParameterSet};
pub use problem::Problem;
pub use uncertainty::Uncertainty;
pub use worker::{Completion, FitWorker, JobStatus, WorkerHandle};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
