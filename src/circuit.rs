//! Circuit candidate data model.
//!
//! A candidate is an ordered gate sequence plus provenance: the generation
//! it was derived in and an id back-reference to its parent. Candidates are
//! immutable — mutation produces a new candidate, never edits one in place.
//!
//! Depth and gate count are always recomputed from the gate sequence, so
//! the cached-attribute/actual-structure divergence is unrepresentable.

use std::fmt;

use smallvec::{smallvec, SmallVec};

/// Unique candidate identifier within a run. Ids are handed out by the
/// evolution loop and are unique within any one generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CandidateId(pub u64);

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// One gate operation. Closed alphabet: H, RY(θ), RZ(θ), CX.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    H { target: usize },
    Ry { target: usize, theta: f64 },
    Rz { target: usize, theta: f64 },
    Cx { control: usize, target: usize },
}

impl Gate {
    /// Qubit indices this gate acts on.
    pub fn qubits(&self) -> SmallVec<[usize; 2]> {
        match *self {
            Gate::H { target } | Gate::Ry { target, .. } | Gate::Rz { target, .. } => {
                smallvec![target]
            }
            Gate::Cx { control, target } => smallvec![control, target],
        }
    }

    /// Rotation angle, if this gate is parameterized.
    pub fn parameter(&self) -> Option<f64> {
        match *self {
            Gate::Ry { theta, .. } | Gate::Rz { theta, .. } => Some(theta),
            Gate::H { .. } | Gate::Cx { .. } => None,
        }
    }

    /// Same gate with its angle replaced. Identity for unparameterized gates.
    pub fn with_parameter(&self, theta: f64) -> Gate {
        match *self {
            Gate::Ry { target, .. } => Gate::Ry { target, theta },
            Gate::Rz { target, .. } => Gate::Rz { target, theta },
            other => other,
        }
    }
}

/// An immutable circuit candidate under evolutionary evaluation.
#[derive(Debug, Clone)]
pub struct CircuitCandidate {
    id: CandidateId,
    n_qubits: usize,
    gates: Vec<Gate>,
    generation: u32,
    parent: Option<CandidateId>,
}

impl CircuitCandidate {
    /// A seed candidate with an empty gate sequence, generation 0.
    pub fn seed(id: CandidateId, n_qubits: usize) -> Self {
        Self::with_gates(id, n_qubits, Vec::new())
    }

    /// A seed candidate with a prescribed minimal gate sequence.
    pub fn with_gates(id: CandidateId, n_qubits: usize, gates: Vec<Gate>) -> Self {
        Self {
            id,
            n_qubits,
            gates,
            generation: 0,
            parent: None,
        }
    }

    /// Build a descendant carrying the full replacement gate sequence.
    /// Lineage: `generation = parent + 1`, parent id recorded as a
    /// non-owning back-reference.
    pub fn derive(&self, id: CandidateId, gates: Vec<Gate>) -> Self {
        Self {
            id,
            n_qubits: self.n_qubits,
            gates,
            generation: self.generation + 1,
            parent: Some(self.id),
        }
    }

    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn n_qubits(&self) -> usize {
        self.n_qubits
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn parent(&self) -> Option<CandidateId> {
        self.parent
    }

    /// Number of gates in the sequence.
    pub fn gate_count(&self) -> usize {
        self.gates.len()
    }

    /// Critical-path depth: longest chain of gates sharing qubits,
    /// recomputed from the sequence with per-qubit frontier counters.
    pub fn depth(&self) -> usize {
        let mut frontier = vec![0usize; self.n_qubits];
        let mut depth = 0;
        for gate in &self.gates {
            let layer = 1 + gate
                .qubits()
                .iter()
                .map(|&q| frontier[q])
                .max()
                .unwrap_or(0);
            for &q in gate.qubits().iter() {
                frontier[q] = layer;
            }
            depth = depth.max(layer);
        }
        depth
    }

    /// The designated boundary ("throat") qubits: the upper half of the
    /// register. The bipartition lower-half / upper-half is the one
    /// E_throat is measured across.
    pub fn throat(&self) -> std::ops::Range<usize> {
        self.n_qubits / 2..self.n_qubits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_empty_generation_zero() {
        let c = CircuitCandidate::seed(CandidateId(0), 4);
        assert_eq!(c.gate_count(), 0);
        assert_eq!(c.depth(), 0);
        assert_eq!(c.generation(), 0);
        assert_eq!(c.parent(), None);
    }

    #[test]
    fn depth_counts_critical_path_not_gate_count() {
        // H(0), H(1) are parallel (depth 1); CX(0,1) joins them (depth 2);
        // RZ(1) extends the chain (depth 3). 4 gates, depth 3.
        let gates = vec![
            Gate::H { target: 0 },
            Gate::H { target: 1 },
            Gate::Cx {
                control: 0,
                target: 1,
            },
            Gate::Rz {
                target: 1,
                theta: 0.1,
            },
        ];
        let c = CircuitCandidate::with_gates(CandidateId(1), 2, gates);
        assert_eq!(c.gate_count(), 4);
        assert_eq!(c.depth(), 3);
    }

    #[test]
    fn disjoint_gates_share_a_layer() {
        let gates = vec![
            Gate::H { target: 0 },
            Gate::H { target: 1 },
            Gate::H { target: 2 },
        ];
        let c = CircuitCandidate::with_gates(CandidateId(2), 3, gates);
        assert_eq!(c.depth(), 1);
    }

    #[test]
    fn derive_sets_lineage() {
        let parent = CircuitCandidate::seed(CandidateId(7), 4);
        let child = parent.derive(CandidateId(8), vec![Gate::H { target: 0 }]);
        assert_eq!(child.generation(), 1);
        assert_eq!(child.parent(), Some(CandidateId(7)));
        assert_eq!(child.gate_count(), 1);
        // Parent untouched.
        assert_eq!(parent.gate_count(), 0);
    }

    #[test]
    fn throat_is_upper_half() {
        let c = CircuitCandidate::seed(CandidateId(0), 10);
        assert_eq!(c.throat(), 5..10);
    }

    #[test]
    fn with_parameter_replaces_angle_only_on_rotations() {
        let ry = Gate::Ry {
            target: 1,
            theta: 0.5,
        };
        assert_eq!(ry.with_parameter(0.9).parameter(), Some(0.9));
        let cx = Gate::Cx {
            control: 0,
            target: 1,
        };
        assert_eq!(cx.with_parameter(0.9), cx);
        assert_eq!(cx.parameter(), None);
    }
}
