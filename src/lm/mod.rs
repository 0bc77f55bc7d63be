//! Damped least-squares backends.
//!
//! Two residual-based optimizers live here: a trust-region Gauss–Newton
//! iteration with Marquardt scaling, and a classic Levenberg–Marquardt that
//! delegates to the `levenberg-marquardt` crate.

pub mod algorithm;
pub mod classic;
pub mod config;
pub mod convergence;
pub mod step;
pub mod trust_region;

pub use algorithm::{LmResult, TrustRegionLeastSquares};
pub use classic::ClassicLevenbergMarquardt;
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
pub use step::{LmStep, StepResult};
pub use trust_region::TrustRegion;
