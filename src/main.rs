//! Demo run against a synthetic deterministic sampler.
//!
//! No hardware is involved: the sampler models decoherence growing with
//! circuit depth, entangling gates raising boundary entanglement, and
//! phase-conjugate rotations pulling decoherence back down, so the
//! self-healing path is actually exercised.

use std::sync::Arc;

use circuit_evolution_sim::prelude::*;

/// Deterministic synthetic execution collaborator.
struct SyntheticSampler {
    constants: EvolutionConstants,
}

impl SyntheticSampler {
    /// Decoherence model: base rate plus structural load, healed by each
    /// phase-conjugate rotation via Γ ← Γ·(1 − χ_pc·min(1, Γ/0.5)),
    /// floored at the base rate.
    fn gamma(&self, candidate: &CircuitCandidate) -> f64 {
        let cs = &self.constants;
        let mut gamma = cs.gamma_fixed()
            + 0.03 * candidate.depth() as f64
            + 0.004 * candidate.gate_count() as f64;
        for gate in candidate.gates() {
            if let Gate::Ry { theta, .. } = gate {
                if (theta - cs.theta_pc_rad()).abs() < 1e-9 {
                    let h = (gamma / 0.5).min(1.0);
                    gamma = (gamma * (1.0 - cs.chi_pc() * h)).max(cs.gamma_fixed());
                }
            }
        }
        gamma.min(1.0)
    }

    fn cross_throat_couplings(&self, candidate: &CircuitCandidate) -> usize {
        let throat = candidate.throat();
        candidate
            .gates()
            .iter()
            .filter(|g| {
                matches!(g, Gate::Cx { control, target }
                    if throat.contains(target) && !throat.contains(control))
            })
            .count()
    }
}

impl StateSampler for SyntheticSampler {
    fn sample_state(&self, candidate: &CircuitCandidate) -> Result<StateSample, SampleError> {
        let gamma = self.gamma(candidate);
        let lambda = (self.constants.f_max() * (-0.02 * candidate.depth() as f64).exp())
            .clamp(0.0, 1.0);
        let couplings = self.cross_throat_couplings(candidate) as f64;
        let e_throat = 1.0 - (-0.6 * couplings).exp();
        let phi = (0.35 + 0.12 * couplings).min(0.95) * lambda;
        Ok(StateSample::Observables {
            lambda,
            phi,
            gamma,
            e_throat,
        })
    }
}

fn main() {
    env_logger::init();

    println!("╔════════════════════════════════════════════════════════════════════╗");
    println!("║        CIRCUIT EVOLUTION — autopoietic candidate population        ║");
    println!("║                                                                    ║");
    println!("║  Ξ = (Λ·Φ)/Γ fitness signal · phase-conjugate self-healing at      ║");
    println!("║  Γ > Γ_critical · synthetic deterministic sampler (no hardware)    ║");
    println!("╚════════════════════════════════════════════════════════════════════╝");
    println!();

    let constants = EvolutionConstants::new(FundamentalConstants::default())
        .expect("reference constants are valid");
    println!("━━━ Constant Store ━━━");
    println!();
    println!("  θ_lock:      {:>9.4} rad", constants.theta_lock_rad());
    println!("  θ_PC:        {:>9.4} rad (π − θ_lock)", constants.theta_pc_rad());
    println!("  χ_pc:        {:>9.4}  (χ_pc² = {:.4})", constants.chi_pc(), constants.chi_pc_squared());
    println!("  Γ_critical:  {:>9.4}", constants.gamma_critical());
    println!("  Φ_threshold: {:>9.4}", constants.phi_threshold());
    println!("  F_max:       {:>9.4}", constants.f_max());
    println!();

    let config = EvolutionConfig {
        survivors: 3,
        descendants_per_survivor: 3,
        max_generations: 12,
        ..EvolutionConfig::default()
    };
    let sampler = Arc::new(SyntheticSampler {
        constants: constants.clone(),
    });
    let mut evo = EvolutionLoop::new(constants.clone(), config, sampler);

    let seeds = vec![CircuitCandidate::seed(CandidateId(0), 10)];
    let report = match evo.run(seeds) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("evolution failed: {err}");
            std::process::exit(1);
        }
    };

    println!("━━━ Generations ━━━");
    println!();
    println!(
        "  {:>4}  {:>5}  {:>5}  {:>7}  {:>7}  {:>7}  {:>8}  {:>9}",
        "gen", "pop", "drop", "Λ", "Φ", "Γ", "Ξ", "fitness"
    );
    for population in evo.history() {
        let best = &population.ranked[0];
        let healing = if best.snapshot.needs_healing(&constants) {
            "  ← healing"
        } else {
            ""
        };
        println!(
            "  {:>4}  {:>5}  {:>5}  {:>7.4}  {:>7.4}  {:>7.4}  {:>8.4}  {:>9.5}{}",
            population.generation,
            population.ranked.len(),
            population.dropped.len(),
            best.snapshot.lambda,
            best.snapshot.phi,
            best.snapshot.gamma,
            best.snapshot.xi,
            best.fitness,
            healing,
        );
    }
    println!();

    println!("━━━ Report ━━━");
    println!();
    println!("  Termination:  {:?}", report.reason);
    println!("  Generations:  {}", report.generations_run);
    println!("  Dropped:      {}", report.dropped_total);
    if let Some(best) = &report.best {
        println!(
            "  Best:         {} (gen {}) — fitness {:.5}, {} gates, depth {}",
            best.candidate.id(),
            best.snapshot.generation,
            best.fitness,
            best.candidate.gate_count(),
            best.candidate.depth(),
        );
    }
}
