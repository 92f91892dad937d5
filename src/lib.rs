//! # circuit-evolution-sim
//!
//! Feedback-controlled evolution of quantum circuit candidates, scored
//! against derived scalar observables, with a deterministic self-healing
//! rule that overrides normal selection when decoherence crosses its
//! critical threshold.
//!
//! ```text
//! Constants Store (θ_lock, θ_PC, χ_pc, Γ_critical, …)
//!   ↓ read-only
//! State Evaluator (Λ, Φ, Γ, E_throat from a sampled state)
//!   ↓ Ξ = (Λ·Φ)/Γ
//! Fitness Evaluator (Ξ · E_throat / structural cost)
//!   ↓ ranked population
//! Evolution Loop (select → mutate → next generation)
//!   ↓ forced phase-conjugate when Γ > Γ_critical
//! Mutation Engine (phase-conjugate | entangle | scramble | point)
//! ```
//!
//! Hardware execution is a collaborator, not a component: the loop calls a
//! [`sampler::StateSampler`] black box and treats latency, transient
//! failure and rate limits as facts of life (timeout, bounded retries,
//! per-candidate isolation). The observable formulas are opaque scoring
//! functions — only their range and divide-by-zero contracts are
//! guaranteed, no physical claim is attached to them.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use circuit_evolution_sim::prelude::*;
//!
//! # struct MySampler;
//! # impl StateSampler for MySampler {
//! #     fn sample_state(&self, _: &CircuitCandidate) -> Result<StateSample, SampleError> {
//! #         Ok(StateSample::Observables { lambda: 0.9, phi: 0.8, gamma: 0.1, e_throat: 0.5 })
//! #     }
//! # }
//! let constants = EvolutionConstants::new(FundamentalConstants::default()).unwrap();
//! let sampler: Arc<dyn StateSampler> = Arc::new(MySampler);
//! let mut evo = EvolutionLoop::new(constants, EvolutionConfig::default(), sampler);
//! let report = evo.run(vec![CircuitCandidate::seed(CandidateId(0), 10)]).unwrap();
//! println!("best fitness: {:?}", report.best.map(|b| b.fitness));
//! ```

pub mod circuit;
pub mod constants;
pub mod evolution;
pub mod fitness;
pub mod metrics;
pub mod mutation;
pub mod sampler;

pub mod prelude {
    pub use crate::circuit::{CandidateId, CircuitCandidate, Gate};
    pub use crate::constants::{ConstantsError, EvolutionConstants, FundamentalConstants};
    pub use crate::evolution::{
        EvolutionConfig, EvolutionError, EvolutionLoop, EvolutionReport, LoopState, Population,
        Ranked, TerminationReason,
    };
    pub use crate::fitness::{fitness, FitnessWeights};
    pub use crate::metrics::{
        evaluate, negentropic_efficiency, state_fidelity, CandidateError, MetricsSnapshot,
    };
    pub use crate::mutation::{ExplorationPolicy, MutationKind};
    pub use crate::sampler::{SampleError, SamplerHarness, StateSample, StateSampler};
}
