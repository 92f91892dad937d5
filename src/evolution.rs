//! Evolution loop and self-healing controller.
//!
//! Drives generations through `Seeding → Evaluating → Selecting → Mutating
//! → … → Terminated`. Within a generation every candidate is evaluated
//! concurrently — evaluations share nothing but the read-only constant
//! store — and every per-candidate failure is isolated and recorded, never
//! allowed to abort its siblings. Selection is fully deterministic:
//! fitness descending, then gate count ascending, then generation
//! ascending, then id ascending.
//!
//! The self-healing rule takes precedence over the exploratory policy:
//! a survivor whose snapshot shows Γ > Γ_critical is mutated by
//! phase-conjugation, unconditionally.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::circuit::{CandidateId, CircuitCandidate};
use crate::constants::EvolutionConstants;
use crate::fitness::{fitness, FitnessWeights};
use crate::metrics::{self, CandidateError, MetricsSnapshot};
use crate::mutation::{self, ExplorationPolicy, MutationKind};
use crate::sampler::{SamplerHarness, StateSampler};

/// Loop parameters. Physical scalars live in [`EvolutionConstants`]; these
/// are the orchestration knobs.
#[derive(Debug, Clone)]
pub struct EvolutionConfig {
    /// Top-k candidates retained each generation.
    pub survivors: usize,
    /// Exploratory descendants per surviving candidate.
    pub descendants_per_survivor: usize,
    /// Hard generation limit.
    pub max_generations: u32,
    /// Best-fitness improvement below this counts as stagnant.
    pub stagnation_epsilon: f64,
    /// Consecutive stagnant generations before termination.
    pub stagnation_window: u32,
    /// Exploratory mutation choice when self-healing does not apply.
    pub policy: ExplorationPolicy,
    pub weights: FitnessWeights,
    /// Per-attempt bound on the external sampling call.
    pub sample_timeout: Duration,
    /// Retries after the first sampling attempt.
    pub max_retries: u32,
    pub retry_backoff: Duration,
    /// Seed for the loop's mutation rng; same seed, same run.
    pub rng_seed: u64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            survivors: 4,
            descendants_per_survivor: 2,
            max_generations: 32,
            stagnation_epsilon: 1e-6,
            stagnation_window: 5,
            policy: ExplorationPolicy::RoundRobin,
            weights: FitnessWeights::default(),
            sample_timeout: Duration::from_secs(30),
            max_retries: 2,
            retry_backoff: Duration::from_millis(250),
            rng_seed: 42,
        }
    }
}

/// One evaluated candidate: the triple the ranked population is made of.
#[derive(Debug, Clone)]
pub struct Ranked {
    pub candidate: CircuitCandidate,
    pub snapshot: MetricsSnapshot,
    pub fitness: f64,
}

/// One generation's evaluated population. Superseded generations are kept
/// in history, never mutated.
#[derive(Debug, Clone)]
pub struct Population {
    pub generation: u32,
    /// Fitness-ranked triples, best first.
    pub ranked: Vec<Ranked>,
    /// Candidates dropped this generation, with the error that dropped
    /// them. Nothing is lost silently.
    pub dropped: Vec<(CandidateId, CandidateError)>,
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Seeding,
    Evaluating,
    Selecting,
    Mutating,
    Terminated,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    GenerationLimit,
    Stagnation,
    Cancelled,
}

/// Final report: the stable read surface for downstream reporting, next to
/// [`EvolutionLoop::history`].
#[derive(Debug, Clone)]
pub struct EvolutionReport {
    pub reason: TerminationReason,
    pub generations_run: u32,
    /// Best triple observed across the whole run.
    pub best: Option<Ranked>,
    /// Total candidates dropped across all recorded generations.
    pub dropped_total: usize,
}

/// Fatal loop failure. Per-candidate errors never surface here; they are
/// recorded in the generation's `dropped` list instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvolutionError {
    #[error("population collapsed at generation {generation}: every candidate was dropped")]
    PopulationCollapse { generation: u32 },
}

/// The generation state machine. The only stateful component; everything
/// it calls is a pure function of its inputs plus the constant store.
pub struct EvolutionLoop {
    constants: EvolutionConstants,
    config: EvolutionConfig,
    sampler: Arc<dyn StateSampler>,
    harness: SamplerHarness,
    rng: StdRng,
    next_id: u64,
    mutation_step: usize,
    state: LoopState,
    history: Vec<Population>,
    cancel: Arc<AtomicBool>,
}

impl EvolutionLoop {
    pub fn new(
        constants: EvolutionConstants,
        config: EvolutionConfig,
        sampler: Arc<dyn StateSampler>,
    ) -> Self {
        let harness = SamplerHarness::new(
            config.sample_timeout,
            config.max_retries,
            config.retry_backoff,
        );
        let rng = StdRng::seed_from_u64(config.rng_seed);
        Self {
            constants,
            config,
            sampler,
            harness,
            rng,
            next_id: 0,
            mutation_step: 0,
            state: LoopState::Seeding,
            history: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared stop flag; set it from any thread to request termination.
    /// Checked at generation boundaries and before each sampling call.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// All recorded generations, oldest first.
    pub fn history(&self) -> &[Population] {
        &self.history
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run to termination from the given seed candidates.
    ///
    /// Per-candidate evaluation failures drop the candidate for that
    /// generation; an entirely dropped generation is fatal. On fatal
    /// errors the full history up to and including the collapsed
    /// generation stays available on `self` for diagnosis.
    pub fn run(
        &mut self,
        seeds: Vec<CircuitCandidate>,
    ) -> Result<EvolutionReport, EvolutionError> {
        self.state = LoopState::Seeding;
        self.next_id = seeds
            .iter()
            .map(|c| c.id().0 + 1)
            .max()
            .unwrap_or(0);

        let mut candidates = seeds;
        let mut generation: u32 = 0;
        let mut prev_best: Option<f64> = None;
        let mut stagnant: u32 = 0;
        let mut best: Option<Ranked> = None;

        let reason = loop {
            if self.cancel.load(Ordering::Relaxed) {
                break TerminationReason::Cancelled;
            }

            self.state = LoopState::Evaluating;
            let population = self.evaluate_generation(candidates, generation);
            if self.cancel.load(Ordering::Relaxed) {
                // Interrupted mid-evaluation: the partial generation is
                // discarded rather than recorded half-done.
                break TerminationReason::Cancelled;
            }

            log::info!(
                "generation {}: {} ranked, {} dropped, best fitness {:.6}",
                generation,
                population.ranked.len(),
                population.dropped.len(),
                population.ranked.first().map(|r| r.fitness).unwrap_or(f64::NAN),
            );

            if population.ranked.is_empty() {
                self.history.push(population);
                self.state = LoopState::Terminated;
                log::error!("population collapsed at generation {generation}");
                return Err(EvolutionError::PopulationCollapse { generation });
            }

            let generation_best = &population.ranked[0];
            if best
                .as_ref()
                .map(|b| generation_best.fitness > b.fitness)
                .unwrap_or(true)
            {
                best = Some(generation_best.clone());
            }

            let improvement = prev_best
                .map(|p| generation_best.fitness - p)
                .unwrap_or(f64::INFINITY);
            if improvement < self.config.stagnation_epsilon {
                stagnant += 1;
            } else {
                stagnant = 0;
            }
            prev_best = Some(generation_best.fitness);

            self.history.push(population);

            if generation + 1 >= self.config.max_generations {
                break TerminationReason::GenerationLimit;
            }
            if stagnant >= self.config.stagnation_window {
                log::info!(
                    "stagnated for {} generations (epsilon {})",
                    stagnant,
                    self.config.stagnation_epsilon
                );
                break TerminationReason::Stagnation;
            }

            self.state = LoopState::Selecting;
            let survivors = self.select();

            self.state = LoopState::Mutating;
            candidates = self.mutate(&survivors);
            generation += 1;
        };

        self.state = LoopState::Terminated;
        let dropped_total = self.history.iter().map(|p| p.dropped.len()).sum();
        Ok(EvolutionReport {
            reason,
            generations_run: self.history.len() as u32,
            best,
            dropped_total,
        })
    }

    /// Evaluate every candidate of one generation concurrently. Failures
    /// are isolated per candidate and collected, not propagated.
    fn evaluate_generation(
        &self,
        candidates: Vec<CircuitCandidate>,
        generation: u32,
    ) -> Population {
        let results: Vec<Result<Ranked, (CandidateId, CandidateError)>> = candidates
            .into_par_iter()
            .map(|candidate| {
                let sample = self
                    .harness
                    .sample(&self.sampler, &candidate, &self.cancel)
                    .map_err(|e| (candidate.id(), e))?;
                let snapshot =
                    metrics::evaluate(&candidate, &sample, &self.constants, generation)
                        .map_err(|e| (candidate.id(), e))?;
                let fitness = fitness(&snapshot, &candidate, &self.config.weights, &self.constants);
                Ok(Ranked {
                    candidate,
                    snapshot,
                    fitness,
                })
            })
            .collect();

        let mut ranked = Vec::new();
        let mut dropped = Vec::new();
        for result in results {
            match result {
                Ok(r) => ranked.push(r),
                Err((id, err)) => {
                    log::warn!("candidate {id} dropped in generation {generation}: {err}");
                    dropped.push((id, err));
                }
            }
        }
        rank(&mut ranked);

        Population {
            generation,
            ranked,
            dropped,
        }
    }

    /// Top-k of the latest recorded generation.
    fn select(&self) -> Vec<Ranked> {
        let latest = &self.history[self.history.len() - 1];
        latest
            .ranked
            .iter()
            .take(self.config.survivors)
            .cloned()
            .collect()
    }

    /// Produce the next generation: each survivor is carried forward and
    /// mutated. Supercritical Γ forces exactly one phase-conjugate
    /// descendant; otherwise the exploratory policy produces the configured
    /// number of descendants.
    fn mutate(&mut self, survivors: &[Ranked]) -> Vec<CircuitCandidate> {
        let mut next = Vec::new();
        for survivor in survivors {
            next.push(survivor.candidate.clone());

            if survivor.snapshot.needs_healing(&self.constants) {
                log::warn!(
                    "self-healing {}: gamma {:.4} > critical {:.4}, forcing phase-conjugate",
                    survivor.candidate.id(),
                    survivor.snapshot.gamma,
                    self.constants.gamma_critical()
                );
                let id = self.allocate_id();
                next.push(mutation::phase_conjugate(
                    &survivor.candidate,
                    id,
                    &self.constants,
                ));
                continue;
            }

            for _ in 0..self.config.descendants_per_survivor {
                let kind = mutation::select_operator(
                    survivor.snapshot.gamma,
                    &self.constants,
                    &self.config.policy,
                    self.mutation_step,
                    &mut self.rng,
                );
                debug_assert_ne!(kind, MutationKind::PhaseConjugate);
                self.mutation_step += 1;
                let id = self.allocate_id();
                log::debug!(
                    "mutating {} -> {} via {:?}",
                    survivor.candidate.id(),
                    id,
                    kind
                );
                next.push(mutation::apply(
                    kind,
                    &survivor.candidate,
                    id,
                    &self.constants,
                    &mut self.rng,
                ));
            }
        }
        next
    }

    fn allocate_id(&mut self) -> CandidateId {
        let id = CandidateId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Rank best-first: fitness descending, ties broken by gate count
/// ascending, then generation ascending, then id ascending.
fn rank(ranked: &mut [Ranked]) {
    ranked.sort_by(|a, b| {
        b.fitness
            .total_cmp(&a.fitness)
            .then_with(|| a.candidate.gate_count().cmp(&b.candidate.gate_count()))
            .then_with(|| a.candidate.generation().cmp(&b.candidate.generation()))
            .then_with(|| a.candidate.id().cmp(&b.candidate.id()))
    });
}
