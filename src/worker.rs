//! Background execution of fits and simulations.
//!
//! Each job runs on its own thread over private copies of its inputs and
//! publishes exactly one [`Completion`] once its result is fully built.
//! Cancellation is cooperative through the job's [`CancellationToken`].

use ndarray::Array1;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::cancel::CancellationToken;
use crate::data::ImpedanceSpectrum;
use crate::error::{EisFitError, Result};
use crate::fit::{FitResult, Fitter};
use crate::models::{simulate, Model};
use crate::parameters::{FreeParameterList, ParameterSet};

/// Job status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// The single outcome of a job.
#[derive(Debug)]
pub enum Completion {
    Fitted(Box<FitResult>),
    Simulated(Array1<Complex64>),
    Cancelled,
    Failed(EisFitError),
}

impl Completion {
    fn status(&self) -> JobStatus {
        match self {
            Completion::Fitted(_) | Completion::Simulated(_) => JobStatus::Completed,
            Completion::Cancelled => JobStatus::Cancelled,
            Completion::Failed(_) => JobStatus::Failed,
        }
    }

    fn from_outcome<T>(
        outcome: Result<T>,
        token: &CancellationToken,
        wrap: impl FnOnce(T) -> Completion,
    ) -> Self {
        match outcome {
            Ok(_) if token.is_cancelled() => Completion::Cancelled,
            Ok(value) => wrap(value),
            Err(EisFitError::Cancelled) => Completion::Cancelled,
            Err(e) => Completion::Failed(e),
        }
    }
}

/// Handle to a running job.
pub struct WorkerHandle {
    cancel: CancellationToken,
    status: Arc<Mutex<JobStatus>>,
    receiver: Receiver<Completion>,
    thread: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    /// Ask the job to stop at its next checkpoint.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the job's token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    pub fn status(&self) -> JobStatus {
        self.status.lock().map_or(JobStatus::Failed, |s| *s)
    }

    /// Take the completion if it has been published.
    ///
    /// The completion is delivered once: after this returns `Some`, a later
    /// [`WorkerHandle::wait`] reports `WorkerDisconnected`.
    pub fn try_completion(&mut self) -> Option<Completion> {
        let completion = self.receiver.try_recv().ok();
        if completion.is_some() {
            self.join();
        }
        completion
    }

    /// Block until the job publishes its completion.
    pub fn wait(mut self) -> Completion {
        let completion = self
            .receiver
            .recv()
            .unwrap_or(Completion::Failed(EisFitError::WorkerDisconnected));
        self.join();
        completion
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Worker thread panicked");
            }
        }
    }
}

/// Spawns fit and simulation jobs.
pub struct FitWorker;

impl FitWorker {
    /// Run a fit on a new thread.
    pub fn spawn_fit(
        fitter: Fitter,
        spectrum: ImpedanceSpectrum,
        params: ParameterSet,
        free: FreeParameterList,
    ) -> WorkerHandle {
        Self::spawn_fit_with_token(fitter, spectrum, params, free, CancellationToken::new())
    }

    /// Run a fit on a new thread, observing an existing token.
    pub fn spawn_fit_with_token(
        fitter: Fitter,
        spectrum: ImpedanceSpectrum,
        params: ParameterSet,
        free: FreeParameterList,
        token: CancellationToken,
    ) -> WorkerHandle {
        Self::spawn(token, move |token| {
            let outcome = fitter.fit_with_cancel(&spectrum, &params, &free, Some(token));
            Completion::from_outcome(outcome, token, |result| {
                Completion::Fitted(Box::new(result))
            })
        })
    }

    /// Evaluate a model once on a new thread.
    pub fn spawn_simulation(
        model: Arc<dyn Model>,
        params: ParameterSet,
        freqs: Array1<f64>,
    ) -> WorkerHandle {
        Self::spawn(CancellationToken::new(), move |token| {
            let outcome = simulate(model.as_ref(), &params, &freqs);
            Completion::from_outcome(outcome, token, Completion::Simulated)
        })
    }

    fn spawn<F>(token: CancellationToken, job: F) -> WorkerHandle
    where
        F: FnOnce(&CancellationToken) -> Completion + Send + 'static,
    {
        let (sender, receiver): (Sender<Completion>, Receiver<Completion>) = mpsc::channel();
        let status = Arc::new(Mutex::new(JobStatus::Running));

        let thread = {
            let token = token.clone();
            let status = Arc::clone(&status);
            thread::spawn(move || {
                let completion = if token.is_cancelled() {
                    Completion::Cancelled
                } else {
                    job(&token)
                };
                if let Ok(mut s) = status.lock() {
                    *s = completion.status();
                }
                if sender.send(completion).is_err() {
                    log::debug!("Job finished after its handle was dropped");
                }
            })
        };

        WorkerHandle {
            cancel: token,
            status,
            receiver,
            thread: Some(thread),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::log_spaced_frequencies;
    use crate::fit::FitConfig;
    use crate::models::Circuit;

    fn rc_inputs() -> (ImpedanceSpectrum, ParameterSet, FreeParameterList) {
        let circuit = Circuit::by_name("rc").unwrap();
        let freqs = log_spaced_frequencies(1.0, 1e5, 30);
        let truth = ParameterSet::from_pairs([("r", 100.0), ("c", 1e-6)]);
        let z = simulate(&circuit, &truth, &freqs).unwrap();
        let guess = ParameterSet::from_pairs([("r", 70.0), ("c", 8e-7)]);
        let free = FreeParameterList::new(["r", "c"]).unwrap();
        (ImpedanceSpectrum::new(freqs, z).unwrap(), guess, free)
    }

    #[test]
    fn test_fit_job_completes() {
        let (spectrum, guess, free) = rc_inputs();
        let fitter = Fitter::new(Circuit::by_name("rc").unwrap(), FitConfig::default());
        let handle = FitWorker::spawn_fit(fitter, spectrum, guess, free);

        match handle.wait() {
            Completion::Fitted(result) => {
                assert!(result.success);
                assert!((result.value("r").unwrap() - 100.0).abs() < 1.0);
            }
            other => panic!("Expected a fit, got {:?}", other),
        }
    }

    #[test]
    fn test_cancel_before_start() {
        let (spectrum, guess, free) = rc_inputs();
        let fitter = Fitter::new(Circuit::by_name("rc").unwrap(), FitConfig::default());
        let token = CancellationToken::new();
        token.cancel();

        let handle = FitWorker::spawn_fit_with_token(fitter, spectrum, guess, free, token);
        assert!(matches!(handle.wait(), Completion::Cancelled));
    }

    #[test]
    fn test_simulation_job_and_status() {
        let model: Arc<dyn Model> = Arc::new(Circuit::by_name("rc").unwrap());
        let params = ParameterSet::from_pairs([("r", 100.0), ("c", 1e-6)]);
        let mut handle = FitWorker::spawn_simulation(model, params, log_spaced_frequencies(1.0, 1e3, 4));

        let completion = loop {
            if let Some(completion) = handle.try_completion() {
                break completion;
            }
            std::thread::yield_now();
        };
        assert_eq!(handle.status(), JobStatus::Completed);
        assert!(handle.is_finished());
        match completion {
            Completion::Simulated(z) => assert_eq!(z.len(), 4),
            other => panic!("Expected a simulation, got {:?}", other),
        }
    }

    #[test]
    fn test_failed_simulation() {
        let model: Arc<dyn Model> = Arc::new(Circuit::by_name("rc").unwrap());
        let params = ParameterSet::from_pairs([("r", 100.0)]);
        let handle = FitWorker::spawn_simulation(model, params, Array1::zeros(3));

        assert!(matches!(
            handle.wait(),
            Completion::Failed(EisFitError::MissingParameter(_))
        ));
    }
}
