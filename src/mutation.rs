//! Mutation engine.
//!
//! Four operators transform a parent candidate into a descendant; parents
//! are never modified and the child records its lineage. The operator set
//! is a closed tagged variant so the self-healing rule can force a specific
//! variant unconditionally:
//!
//! - **PhaseConjugate** — deterministic RY(θ_PC) on every throat qubit.
//!   Both an exploratory move and the forced healing move.
//! - **Entangle** — thermofield-style coupling H·RY(θ_lock)·CX across the
//!   throat bipartition; raises expected E_throat.
//! - **Scramble** — one thermalizing layer of random RZ rotations plus the
//!   nearest-neighbour CX chain; grows depth and gate count.
//! - **Point** — small perturbation of one existing rotation angle; depth
//!   and gate count are unchanged.
//!
//! Operators never reject a candidate; fitness judgment happens only in the
//! evolution loop.

use rand::Rng;

use crate::circuit::{CandidateId, CircuitCandidate, Gate};
use crate::constants::EvolutionConstants;

/// Magnitude bound for scramble rotation angles.
const SCRAMBLE_SPREAD: f64 = 0.5;

/// Magnitude bound for point perturbations.
const POINT_SPREAD: f64 = 0.1;

/// The closed mutation operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    PhaseConjugate,
    Entangle,
    Scramble,
    Point,
}

/// Configured rule for the exploratory choice among Entangle/Scramble/Point
/// when self-healing does not apply.
#[derive(Debug, Clone)]
pub enum ExplorationPolicy {
    /// Cycle Entangle → Scramble → Point, driven by the loop's step counter.
    RoundRobin,
    /// Sample proportional to weights.
    Weighted {
        entangle: f64,
        scramble: f64,
        point: f64,
    },
}

impl ExplorationPolicy {
    /// Choose an exploratory operator. `step` is a monotonically increasing
    /// counter owned by the caller; it makes round-robin deterministic.
    pub fn choose<R: Rng>(&self, step: usize, rng: &mut R) -> MutationKind {
        match self {
            ExplorationPolicy::RoundRobin => match step % 3 {
                0 => MutationKind::Entangle,
                1 => MutationKind::Scramble,
                _ => MutationKind::Point,
            },
            ExplorationPolicy::Weighted {
                entangle,
                scramble,
                point,
            } => {
                let total = entangle + scramble + point;
                if total <= 0.0 {
                    return MutationKind::Entangle;
                }
                let r: f64 = rng.gen::<f64>() * total;
                if r < *entangle {
                    MutationKind::Entangle
                } else if r < entangle + scramble {
                    MutationKind::Scramble
                } else {
                    MutationKind::Point
                }
            }
        }
    }
}

/// The per-candidate operator decision. Γ above Γ_critical forces
/// phase-conjugate healing, overriding the exploratory policy; otherwise
/// the policy picks.
pub fn select_operator<R: Rng>(
    gamma: f64,
    constants: &EvolutionConstants,
    policy: &ExplorationPolicy,
    step: usize,
    rng: &mut R,
) -> MutationKind {
    if gamma > constants.gamma_critical() {
        MutationKind::PhaseConjugate
    } else {
        policy.choose(step, rng)
    }
}

/// Append RY(θ_PC) on every throat qubit. Deterministic; the time-reversal
/// move that heals supercritical decoherence.
pub fn phase_conjugate(
    parent: &CircuitCandidate,
    id: CandidateId,
    constants: &EvolutionConstants,
) -> CircuitCandidate {
    let mut gates = parent.gates().to_vec();
    for q in parent.throat() {
        gates.push(Gate::Ry {
            target: q,
            theta: constants.theta_pc_rad(),
        });
    }
    parent.derive(id, gates)
}

/// Append a thermofield coupling H(i)·RY(θ_lock)(i)·CX(i, i+n/2) for a
/// randomly chosen lower-half qubit i. The pair straddles the throat
/// bipartition. Registers with fewer than two qubits cannot be coupled and
/// yield an unchanged child.
pub fn entangle<R: Rng>(
    parent: &CircuitCandidate,
    id: CandidateId,
    constants: &EvolutionConstants,
    rng: &mut R,
) -> CircuitCandidate {
    let half = parent.n_qubits() / 2;
    if half == 0 {
        return parent.derive(id, parent.gates().to_vec());
    }
    let i = rng.gen_range(0..half);
    let mut gates = parent.gates().to_vec();
    gates.push(Gate::H { target: i });
    gates.push(Gate::Ry {
        target: i,
        theta: constants.theta_lock_rad(),
    });
    gates.push(Gate::Cx {
        control: i,
        target: i + half,
    });
    parent.derive(id, gates)
}

/// Append one thermalizing layer: a random RZ on every qubit, then the
/// nearest-neighbour CX chain.
pub fn scramble<R: Rng>(
    parent: &CircuitCandidate,
    id: CandidateId,
    rng: &mut R,
) -> CircuitCandidate {
    let n = parent.n_qubits();
    let mut gates = parent.gates().to_vec();
    for q in 0..n {
        gates.push(Gate::Rz {
            target: q,
            theta: rng.gen_range(-SCRAMBLE_SPREAD..SCRAMBLE_SPREAD),
        });
    }
    for q in 0..n.saturating_sub(1) {
        gates.push(Gate::Cx {
            control: q,
            target: q + 1,
        });
    }
    parent.derive(id, gates)
}

/// Perturb one randomly chosen rotation angle by a small delta. A candidate
/// with no parameterized gate yields an unchanged child.
pub fn point<R: Rng>(parent: &CircuitCandidate, id: CandidateId, rng: &mut R) -> CircuitCandidate {
    let parameterized: Vec<usize> = parent
        .gates()
        .iter()
        .enumerate()
        .filter(|(_, g)| g.parameter().is_some())
        .map(|(i, _)| i)
        .collect();

    let mut gates = parent.gates().to_vec();
    if let Some(&idx) = parameterized.get(rng.gen_range(0..parameterized.len().max(1))) {
        let delta = (rng.gen::<f64>() - 0.5) * 2.0 * POINT_SPREAD;
        // parameter() is Some by construction of `parameterized`.
        if let Some(theta) = gates[idx].parameter() {
            gates[idx] = gates[idx].with_parameter(theta + delta);
        }
    }
    parent.derive(id, gates)
}

/// Apply the chosen operator. Explicit dispatch over the closed set.
pub fn apply<R: Rng>(
    kind: MutationKind,
    parent: &CircuitCandidate,
    id: CandidateId,
    constants: &EvolutionConstants,
    rng: &mut R,
) -> CircuitCandidate {
    match kind {
        MutationKind::PhaseConjugate => phase_conjugate(parent, id, constants),
        MutationKind::Entangle => entangle(parent, id, constants, rng),
        MutationKind::Scramble => scramble(parent, id, rng),
        MutationKind::Point => point(parent, id, rng),
    }
}
