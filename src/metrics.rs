//! State evaluation: the four observables and negentropic efficiency.
//!
//! Given a candidate and a raw [`StateSample`], the evaluator derives
//!
//! - Λ (coherence): squared overlap |⟨reference|actual⟩|² with the ideal
//!   reference state,
//! - Φ (integrated-information proxy): mutual information of the
//!   measurement distribution across the throat bipartition, normalized to
//!   [0, 1],
//! - Γ (decoherence): 1 − purity, strictly positive,
//! - E_throat (boundary entanglement): normalized Shannon entropy of the
//!   throat-side marginal,
//!
//! and Ξ = (Λ·Φ)/Γ. Out-of-range inputs fail loudly — nothing is silently
//! clamped — and Γ at or below the configured floor makes Ξ an explicit
//! error rather than an infinity.
//!
//! The formulas are opaque scoring functions; only the stated range and
//! divide-by-zero contracts are load-bearing.

use num_complex::Complex;
use thiserror::Error;

use crate::circuit::{CandidateId, CircuitCandidate};
use crate::constants::EvolutionConstants;
use crate::sampler::{SampleError, StateSample};

/// Absolute tolerance for float noise at range boundaries. Values within
/// this band are snapped to the boundary; beyond it they are errors.
const RANGE_TOL: f64 = 1e-9;

/// Tolerance on the normalization of supplied state vectors.
const NORM_TOL: f64 = 1e-6;

/// Per-candidate evaluation failure. All variants are recoverable at the
/// generation boundary: the candidate is dropped, its siblings continue.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CandidateError {
    #[error("{metric} = {value} outside its documented range")]
    MetricsOutOfRange { metric: &'static str, value: f64 },
    #[error("measured decoherence is zero")]
    ZeroDecoherenceAnomaly,
    #[error("efficiency undefined: gamma = {gamma} at or below floor {floor}")]
    DegenerateEfficiency { gamma: f64, floor: f64 },
    #[error("state sampling failed after {attempts} attempt(s): {source}")]
    Execution {
        attempts: u32,
        #[source]
        source: SampleError,
    },
}

/// The observables of one candidate for one generation. Owned by the
/// evaluation step that produced it; a candidate re-evaluated in a later
/// generation gets a fresh snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub candidate: CandidateId,
    pub generation: u32,
    pub lambda: f64,
    pub phi: f64,
    pub gamma: f64,
    pub e_throat: f64,
    pub xi: f64,
}

impl MetricsSnapshot {
    /// Γ above the critical threshold: the next mutation must be
    /// phase-conjugate.
    pub fn needs_healing(&self, constants: &EvolutionConstants) -> bool {
        self.gamma > constants.gamma_critical()
    }

    /// Φ above the integrated-information threshold.
    pub fn is_conscious(&self, constants: &EvolutionConstants) -> bool {
        self.phi > constants.phi_threshold()
    }
}

/// Squared overlap |⟨a|b⟩|² between two state vectors of equal length.
pub fn state_fidelity(a: &[Complex<f64>], b: &[Complex<f64>]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let inner: Complex<f64> = a.iter().zip(b.iter()).map(|(ai, bi)| ai.conj() * bi).sum();
    inner.norm_sqr()
}

/// Ξ = (Λ·Φ)/Γ. Fails when Γ is at or below `floor` — the ratio is never
/// allowed to become an infinity or NaN.
pub fn negentropic_efficiency(
    lambda: f64,
    phi: f64,
    gamma: f64,
    floor: f64,
) -> Result<f64, CandidateError> {
    if gamma <= floor {
        return Err(CandidateError::DegenerateEfficiency { gamma, floor });
    }
    Ok((lambda * phi) / gamma)
}

/// Evaluate a candidate's sample into a [`MetricsSnapshot`] for the given
/// generation. Pure function of its inputs plus the constant store.
pub fn evaluate(
    candidate: &CircuitCandidate,
    sample: &StateSample,
    constants: &EvolutionConstants,
    generation: u32,
) -> Result<MetricsSnapshot, CandidateError> {
    let (lambda, phi, gamma, e_throat) = match sample {
        StateSample::StateVector {
            amplitudes,
            reference,
            purity,
        } => derive_observables(candidate, amplitudes, reference, *purity)?,
        StateSample::Observables {
            lambda,
            phi,
            gamma,
            e_throat,
        } => {
            let lambda = bounded_unit("lambda", *lambda)?;
            let phi = bounded_unit("phi", *phi)?;
            let e_throat = bounded_unit("e_throat", *e_throat)?;
            let gamma = checked_gamma(*gamma)?;
            (lambda, phi, gamma, e_throat)
        }
    };

    let xi = negentropic_efficiency(lambda, phi, gamma, constants.gamma_floor())?;
    Ok(MetricsSnapshot {
        candidate: candidate.id(),
        generation,
        lambda,
        phi,
        gamma,
        e_throat,
        xi,
    })
}

fn derive_observables(
    candidate: &CircuitCandidate,
    amplitudes: &[Complex<f64>],
    reference: &[Complex<f64>],
    purity: f64,
) -> Result<(f64, f64, f64, f64), CandidateError> {
    let dim = 1usize << candidate.n_qubits();
    if amplitudes.len() != dim || reference.len() != dim {
        return Err(CandidateError::MetricsOutOfRange {
            metric: "state_dimension",
            value: amplitudes.len() as f64,
        });
    }
    let probs = measurement_distribution("amplitudes", amplitudes)?;
    // Reference must be a valid state too, or the overlap is meaningless.
    measurement_distribution("reference", reference)?;

    let lambda = bounded_unit("lambda", state_fidelity(reference, amplitudes))?;

    if !purity.is_finite() || !(0.0..=1.0 + RANGE_TOL).contains(&purity) {
        return Err(CandidateError::MetricsOutOfRange {
            metric: "purity",
            value: purity,
        });
    }
    let gamma = checked_gamma(1.0 - purity.min(1.0))?;

    let throat_bits = candidate.n_qubits() - candidate.throat().start;
    let lower_bits = candidate.n_qubits() - throat_bits;
    let (h_throat, h_lower, h_joint) = bipartition_entropies(&probs, lower_bits);

    let phi = if throat_bits.min(lower_bits) == 0 {
        // A single-qubit register has an empty lower partition; no
        // correlation is expressible across it.
        0.0
    } else {
        let mutual = (h_throat + h_lower - h_joint).max(0.0);
        bounded_unit("phi", mutual / throat_bits.min(lower_bits) as f64)?
    };

    let e_throat = if throat_bits == 0 {
        0.0
    } else {
        bounded_unit("e_throat", h_throat / throat_bits as f64)?
    };

    Ok((lambda, phi, gamma, e_throat))
}

/// |amp|² measurement distribution, validated to be normalized.
fn measurement_distribution(
    metric: &'static str,
    amplitudes: &[Complex<f64>],
) -> Result<Vec<f64>, CandidateError> {
    let probs: Vec<f64> = amplitudes.iter().map(|a| a.norm_sqr()).collect();
    let total: f64 = probs.iter().sum();
    if !total.is_finite() || (total - 1.0).abs() > NORM_TOL {
        return Err(CandidateError::MetricsOutOfRange {
            metric,
            value: total,
        });
    }
    Ok(probs)
}

/// Shannon entropies (bits) of the throat marginal, the lower marginal and
/// the joint distribution. Qubit q maps to bit q of the basis index; the
/// throat occupies the high bits.
fn bipartition_entropies(probs: &[f64], lower_bits: usize) -> (f64, f64, f64) {
    let lower_dim = 1usize << lower_bits;
    let throat_dim = probs.len() / lower_dim;

    let mut p_throat = vec![0.0; throat_dim];
    let mut p_lower = vec![0.0; lower_dim];
    for (idx, &p) in probs.iter().enumerate() {
        p_throat[idx >> lower_bits] += p;
        p_lower[idx & (lower_dim - 1)] += p;
    }

    (
        shannon_entropy(&p_throat),
        shannon_entropy(&p_lower),
        shannon_entropy(probs),
    )
}

fn shannon_entropy(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

/// Validate a [0, 1] observable, snapping sub-tolerance float noise to the
/// boundary and failing on anything further out.
fn bounded_unit(metric: &'static str, value: f64) -> Result<f64, CandidateError> {
    if !value.is_finite() || !(-RANGE_TOL..=1.0 + RANGE_TOL).contains(&value) {
        return Err(CandidateError::MetricsOutOfRange { metric, value });
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Validate Γ ∈ (0, 1]: zero is an anomaly in its own right, anything
/// negative or above one is out of range.
fn checked_gamma(gamma: f64) -> Result<f64, CandidateError> {
    if !gamma.is_finite() || gamma < -RANGE_TOL || gamma > 1.0 + RANGE_TOL {
        return Err(CandidateError::MetricsOutOfRange {
            metric: "gamma",
            value: gamma,
        });
    }
    let gamma = gamma.clamp(0.0, 1.0);
    if gamma == 0.0 {
        return Err(CandidateError::ZeroDecoherenceAnomaly);
    }
    Ok(gamma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EvolutionConstants, FundamentalConstants};

    fn constants() -> EvolutionConstants {
        EvolutionConstants::new(FundamentalConstants::default()).unwrap()
    }

    fn observables(lambda: f64, phi: f64, gamma: f64, e_throat: f64) -> StateSample {
        StateSample::Observables {
            lambda,
            phi,
            gamma,
            e_throat,
        }
    }

    #[test]
    fn xi_is_the_exact_ratio() {
        let xi = negentropic_efficiency(0.9, 0.8, 0.1, 1e-9).unwrap();
        assert!((xi - 7.2).abs() < 1e-9);
        assert!(xi >= 0.0);
    }

    #[test]
    fn xi_fails_at_or_below_floor_never_infinity() {
        for gamma in [0.0, 1e-10, 1e-9] {
            let err = negentropic_efficiency(0.9, 0.8, gamma, 1e-9).unwrap_err();
            assert!(matches!(err, CandidateError::DegenerateEfficiency { .. }));
        }
    }

    #[test]
    fn observables_sample_evaluates_directly() {
        let c = CircuitCandidate::seed(CandidateId(0), 4);
        let snap = evaluate(&c, &observables(0.9, 0.8, 0.1, 0.5), &constants(), 0).unwrap();
        assert!((snap.xi - 7.2).abs() < 1e-9);
        assert_eq!(snap.candidate, CandidateId(0));
        assert_eq!(snap.generation, 0);
        assert!(!snap.needs_healing(&constants()));
    }

    #[test]
    fn zero_gamma_is_an_anomaly_not_a_division() {
        let c = CircuitCandidate::seed(CandidateId(0), 4);
        let err = evaluate(&c, &observables(0.9, 0.8, 0.0, 0.5), &constants(), 0).unwrap_err();
        assert_eq!(err, CandidateError::ZeroDecoherenceAnomaly);
    }

    #[test]
    fn out_of_range_observables_fail_loudly() {
        let c = CircuitCandidate::seed(CandidateId(0), 4);
        let cs = constants();
        assert!(matches!(
            evaluate(&c, &observables(1.2, 0.8, 0.1, 0.5), &cs, 0),
            Err(CandidateError::MetricsOutOfRange {
                metric: "lambda",
                ..
            })
        ));
        assert!(matches!(
            evaluate(&c, &observables(0.9, -0.1, 0.1, 0.5), &cs, 0),
            Err(CandidateError::MetricsOutOfRange { metric: "phi", .. })
        ));
        assert!(matches!(
            evaluate(&c, &observables(0.9, 0.8, 1.5, 0.5), &cs, 0),
            Err(CandidateError::MetricsOutOfRange {
                metric: "gamma",
                ..
            })
        ));
    }

    #[test]
    fn bell_state_maximizes_phi_and_e_throat() {
        let amp = 1.0 / 2.0_f64.sqrt();
        let bell = vec![
            Complex::new(amp, 0.0),
            Complex::new(0.0, 0.0),
            Complex::new(0.0, 0.0),
            Complex::new(amp, 0.0),
        ];
        let c = CircuitCandidate::seed(CandidateId(1), 2);
        let sample = StateSample::StateVector {
            amplitudes: bell.clone(),
            reference: bell,
            purity: 0.9,
        };
        let snap = evaluate(&c, &sample, &constants(), 0).unwrap();
        assert!((snap.lambda - 1.0).abs() < 1e-9);
        assert!((snap.phi - 1.0).abs() < 1e-9);
        assert!((snap.e_throat - 1.0).abs() < 1e-9);
        assert!((snap.gamma - 0.1).abs() < 1e-9);
        assert!((snap.xi - 10.0).abs() < 1e-6);
    }

    #[test]
    fn product_state_has_no_correlation() {
        let mut zeros = vec![Complex::new(0.0, 0.0); 4];
        zeros[0] = Complex::new(1.0, 0.0);
        let c = CircuitCandidate::seed(CandidateId(2), 2);
        let sample = StateSample::StateVector {
            amplitudes: zeros.clone(),
            reference: zeros,
            purity: 0.95,
        };
        let snap = evaluate(&c, &sample, &constants(), 0).unwrap();
        assert!(snap.phi.abs() < 1e-12);
        assert!(snap.e_throat.abs() < 1e-12);
    }

    #[test]
    fn dimension_mismatch_is_out_of_range() {
        let c = CircuitCandidate::seed(CandidateId(3), 3);
        let two = vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)];
        let sample = StateSample::StateVector {
            amplitudes: two.clone(),
            reference: two,
            purity: 0.9,
        };
        assert!(matches!(
            evaluate(&c, &sample, &constants(), 0),
            Err(CandidateError::MetricsOutOfRange {
                metric: "state_dimension",
                ..
            })
        ));
    }

    #[test]
    fn unnormalized_amplitudes_are_rejected() {
        let c = CircuitCandidate::seed(CandidateId(4), 1);
        let big = vec![Complex::new(2.0, 0.0), Complex::new(0.0, 0.0)];
        let sample = StateSample::StateVector {
            amplitudes: big.clone(),
            reference: big,
            purity: 0.9,
        };
        assert!(matches!(
            evaluate(&c, &sample, &constants(), 0),
            Err(CandidateError::MetricsOutOfRange { .. })
        ));
    }

    #[test]
    fn perfect_purity_is_zero_decoherence_anomaly() {
        let one = vec![Complex::new(1.0, 0.0), Complex::new(0.0, 0.0)];
        let c = CircuitCandidate::seed(CandidateId(5), 1);
        let sample = StateSample::StateVector {
            amplitudes: one.clone(),
            reference: one,
            purity: 1.0,
        };
        assert_eq!(
            evaluate(&c, &sample, &constants(), 0).unwrap_err(),
            CandidateError::ZeroDecoherenceAnomaly
        );
    }

    #[test]
    fn evaluation_is_bit_identical_across_calls() {
        let amp = 1.0 / 2.0_f64.sqrt();
        let state = vec![
            Complex::new(amp, 0.0),
            Complex::new(0.1, 0.0),
            Complex::new(0.0, 0.1),
            Complex::new((amp * amp - 0.02).sqrt(), 0.0),
        ];
        let c = CircuitCandidate::seed(CandidateId(6), 2);
        let sample = StateSample::StateVector {
            amplitudes: state.clone(),
            reference: state,
            purity: 0.85,
        };
        let cs = constants();
        let a = evaluate(&c, &sample, &cs, 3).unwrap();
        let b = evaluate(&c, &sample, &cs, 3).unwrap();
        assert_eq!(a.lambda.to_bits(), b.lambda.to_bits());
        assert_eq!(a.phi.to_bits(), b.phi.to_bits());
        assert_eq!(a.gamma.to_bits(), b.gamma.to_bits());
        assert_eq!(a.e_throat.to_bits(), b.e_throat.to_bits());
        assert_eq!(a.xi.to_bits(), b.xi.to_bits());
    }

    #[test]
    fn healing_and_consciousness_predicates() {
        let cs = constants();
        let c = CircuitCandidate::seed(CandidateId(7), 4);
        let hot = evaluate(&c, &observables(0.9, 0.8, 0.35, 0.5), &cs, 0).unwrap();
        assert!(hot.needs_healing(&cs));
        assert!(hot.is_conscious(&cs));
        let cold = evaluate(&c, &observables(0.9, 0.5, 0.1, 0.5), &cs, 0).unwrap();
        assert!(!cold.needs_healing(&cs));
        assert!(!cold.is_conscious(&cs));
    }
}
