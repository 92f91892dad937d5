//! Fitness evaluation.
//!
//! Combines negentropic efficiency, boundary entanglement and structural
//! cost into one ranking scalar:
//!
//! ```text
//! F = Ξ · E_throat / (1 + depth/D₀ + gates/G₀ + penalty)
//! ```
//!
//! `penalty` is a fixed configured surcharge applied when Γ exceeds
//! Γ_critical, zero otherwise. The denominator is always ≥ 1, so F is
//! finite and non-negative for every valid snapshot. Higher is better.

use crate::circuit::CircuitCandidate;
use crate::constants::EvolutionConstants;
use crate::metrics::MetricsSnapshot;

/// Structural normalization constants and the decoherence surcharge.
#[derive(Debug, Clone)]
pub struct FitnessWeights {
    /// Depth normalization D₀.
    pub depth_norm: f64,
    /// Gate-count normalization G₀.
    pub gate_norm: f64,
    /// Fixed penalty added to the denominator when Γ > Γ_critical.
    pub decoherence_penalty: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            depth_norm: 16.0,
            gate_norm: 64.0,
            decoherence_penalty: 1.5,
        }
    }
}

/// The ranking scalar. Deterministic given a snapshot and the candidate's
/// structural attributes.
pub fn fitness(
    snapshot: &MetricsSnapshot,
    candidate: &CircuitCandidate,
    weights: &FitnessWeights,
    constants: &EvolutionConstants,
) -> f64 {
    let penalty = if snapshot.gamma > constants.gamma_critical() {
        weights.decoherence_penalty
    } else {
        0.0
    };
    let structural = 1.0
        + candidate.depth() as f64 / weights.depth_norm
        + candidate.gate_count() as f64 / weights.gate_norm
        + penalty;
    snapshot.xi * snapshot.e_throat / structural
}
