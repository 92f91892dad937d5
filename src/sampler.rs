//! Execution-collaborator boundary.
//!
//! Hardware (or simulator) access is not part of this crate: a
//! [`StateSampler`] is a black box that turns a candidate into a raw
//! [`StateSample`], with possibly high and variable latency, transient
//! failures and rate limits. [`SamplerHarness`] wraps every call with a
//! timeout, bounded retries with backoff, and a cancellation check, so one
//! slow or failing candidate never stalls its generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use num_complex::Complex;
use thiserror::Error;

use crate::circuit::CircuitCandidate;
use crate::metrics::CandidateError;

/// Raw state information returned by the execution collaborator.
#[derive(Debug, Clone)]
pub enum StateSample {
    /// Tomographic estimate: actual state vector, ideal reference state
    /// for the same candidate, and the purity Tr(ρ²) of the estimated
    /// density matrix. The evaluator derives all four observables from it.
    StateVector {
        amplitudes: Vec<Complex<f64>>,
        reference: Vec<Complex<f64>>,
        purity: f64,
    },
    /// Measurement-derived expectation values, already reduced to the four
    /// observables on the hardware side. The evaluator only validates
    /// ranges.
    Observables {
        lambda: f64,
        phi: f64,
        gamma: f64,
        e_throat: f64,
    },
}

/// A single sampling attempt's failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error("backend failure: {0}")]
    Backend(String),
    #[error("no response within {0} ms")]
    Timeout(u64),
    #[error("cancelled before dispatch")]
    Cancelled,
}

/// Black-box access to quantum hardware or a simulator.
pub trait StateSampler: Send + Sync {
    fn sample_state(&self, candidate: &CircuitCandidate) -> Result<StateSample, SampleError>;
}

/// Timeout/retry wrapper around a [`StateSampler`].
#[derive(Debug, Clone)]
pub struct SamplerHarness {
    /// Per-attempt wait bound.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff; attempt k sleeps k × backoff before retrying.
    pub backoff: Duration,
}

impl SamplerHarness {
    pub fn new(timeout: Duration, max_retries: u32, backoff: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            backoff,
        }
    }

    /// Sample a candidate's state with timeout, retries and cancellation.
    ///
    /// Each attempt runs on a helper thread and is awaited through a
    /// bounded channel with `recv_timeout`; a timed-out attempt's thread is
    /// abandoned (the collaborator call itself cannot be interrupted) and
    /// the harness stops waiting on it. The `cancel` flag is checked before
    /// every attempt. Exhausted retries surface as a per-candidate
    /// [`CandidateError::Execution`].
    pub fn sample(
        &self,
        sampler: &Arc<dyn StateSampler>,
        candidate: &CircuitCandidate,
        cancel: &AtomicBool,
    ) -> Result<StateSample, CandidateError> {
        let attempts = self.max_retries + 1;
        let mut last = SampleError::Cancelled;

        for attempt in 0..attempts {
            if cancel.load(Ordering::Relaxed) {
                return Err(CandidateError::Execution {
                    attempts: attempt,
                    source: SampleError::Cancelled,
                });
            }
            if attempt > 0 {
                thread::sleep(self.backoff * attempt);
            }

            let (tx, rx) = crossbeam_channel::bounded(1);
            let backend = Arc::clone(sampler);
            let job = candidate.clone();
            thread::spawn(move || {
                let _ = tx.send(backend.sample_state(&job));
            });

            match rx.recv_timeout(self.timeout) {
                Ok(Ok(sample)) => return Ok(sample),
                Ok(Err(err)) => {
                    log::warn!(
                        "sampling {} attempt {}/{} failed: {}",
                        candidate_label(&candidate),
                        attempt + 1,
                        attempts,
                        err
                    );
                    last = err;
                }
                Err(_) => {
                    let ms = self.timeout.as_millis() as u64;
                    log::warn!(
                        "sampling {} attempt {}/{} timed out after {} ms",
                        candidate_label(&candidate),
                        attempt + 1,
                        attempts,
                        ms
                    );
                    last = SampleError::Timeout(ms);
                }
            }
        }

        Err(CandidateError::Execution {
            attempts,
            source: last,
        })
    }
}

fn candidate_label(candidate: &CircuitCandidate) -> String {
    format!("{} (gen {})", candidate.id(), candidate.generation())
}
