//! Immutable constant store.
//!
//! All coupling angles, rates and thresholds used by the evaluator and the
//! mutation engine live here. The fundamental set is supplied once by the
//! configuration source; derived values (θ_PC, τ_mem, F_max, χ_pc²) are
//! computed at construction and never change afterwards. Components receive
//! the store by reference — there is no ambient global state.
//!
//! # Derivations
//!
//! ```text
//! θ_PC   = π − θ_lock          (phase-conjugate / time-reversal angle)
//! τ_mem  = 1 / ΛΦ              (memory timescale)
//! F_max  = 1 − φ⁻⁸             (fidelity ceiling, φ = golden ratio)
//! χ_pc²                         (phase-conjugate recovery efficiency)
//! ```

use thiserror::Error;

/// Golden ratio φ = (1 + √5) / 2.
pub const GOLDEN_RATIO: f64 = 1.618033988749895;

/// Invalid or out-of-domain fundamental constant. Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstantsError {
    #[error("{name} = {value} is outside its domain ({domain})")]
    OutOfDomain {
        name: &'static str,
        value: f64,
        domain: &'static str,
    },
}

/// The fundamental constant set, as supplied by the configuration source.
///
/// `Default` carries the documented reference values; a deployment may
/// override any of them as long as the domains below hold.
#[derive(Debug, Clone)]
pub struct FundamentalConstants {
    /// Universal memory constant ΛΦ [s⁻¹]. Domain: finite, > 0.
    pub lambda_phi: f64,
    /// Lock angle θ_lock [degrees]. Domain: [0, 360).
    pub theta_lock_deg: f64,
    /// Integrated-information threshold Φ_threshold. Domain: [0, 1].
    pub phi_threshold: f64,
    /// Base decoherence rate Γ₀. Domain: (0, 1].
    pub gamma_fixed: f64,
    /// Critical decoherence threshold Γ_critical. Above it, the next
    /// mutation is forced to phase-conjugate. Domain: (0, 1].
    pub gamma_critical: f64,
    /// Phase-conjugate coupling χ_pc. Domain: [0, 1].
    pub chi_pc: f64,
    /// Epsilon floor below which Ξ = (ΛΦ)/Γ is undefined.
    /// Domain: (0, gamma_critical).
    pub gamma_floor: f64,
}

impl Default for FundamentalConstants {
    fn default() -> Self {
        Self {
            lambda_phi: 2.176435e-8,
            theta_lock_deg: 51.843,
            phi_threshold: 0.7734,
            gamma_fixed: 0.092,
            gamma_critical: 0.3,
            chi_pc: 0.946,
            gamma_floor: 1e-9,
        }
    }
}

/// Validated constant store: the fundamental set plus the derived values,
/// computed once. Read-only after construction.
#[derive(Debug, Clone)]
pub struct EvolutionConstants {
    fundamentals: FundamentalConstants,
    theta_lock_rad: f64,
    theta_pc_rad: f64,
    tau_mem: f64,
    f_max: f64,
    chi_pc_squared: f64,
}

impl EvolutionConstants {
    /// Validate the fundamental set and compute the derived values.
    pub fn new(fundamentals: FundamentalConstants) -> Result<Self, ConstantsError> {
        check(
            "lambda_phi",
            fundamentals.lambda_phi,
            "finite, > 0",
            fundamentals.lambda_phi.is_finite() && fundamentals.lambda_phi > 0.0,
        )?;
        check(
            "theta_lock_deg",
            fundamentals.theta_lock_deg,
            "[0, 360)",
            fundamentals.theta_lock_deg.is_finite()
                && (0.0..360.0).contains(&fundamentals.theta_lock_deg),
        )?;
        check(
            "phi_threshold",
            fundamentals.phi_threshold,
            "[0, 1]",
            fundamentals.phi_threshold.is_finite()
                && (0.0..=1.0).contains(&fundamentals.phi_threshold),
        )?;
        check(
            "gamma_fixed",
            fundamentals.gamma_fixed,
            "(0, 1]",
            fundamentals.gamma_fixed.is_finite()
                && fundamentals.gamma_fixed > 0.0
                && fundamentals.gamma_fixed <= 1.0,
        )?;
        check(
            "gamma_critical",
            fundamentals.gamma_critical,
            "(0, 1]",
            fundamentals.gamma_critical.is_finite()
                && fundamentals.gamma_critical > 0.0
                && fundamentals.gamma_critical <= 1.0,
        )?;
        check(
            "chi_pc",
            fundamentals.chi_pc,
            "[0, 1]",
            fundamentals.chi_pc.is_finite() && (0.0..=1.0).contains(&fundamentals.chi_pc),
        )?;
        check(
            "gamma_floor",
            fundamentals.gamma_floor,
            "(0, gamma_critical)",
            fundamentals.gamma_floor.is_finite()
                && fundamentals.gamma_floor > 0.0
                && fundamentals.gamma_floor < fundamentals.gamma_critical,
        )?;

        let theta_lock_rad = fundamentals.theta_lock_deg.to_radians();
        Ok(Self {
            theta_lock_rad,
            theta_pc_rad: std::f64::consts::PI - theta_lock_rad,
            tau_mem: 1.0 / fundamentals.lambda_phi,
            f_max: 1.0 - GOLDEN_RATIO.powi(-8),
            chi_pc_squared: fundamentals.chi_pc * fundamentals.chi_pc,
            fundamentals,
        })
    }

    /// Universal memory constant ΛΦ [s⁻¹].
    pub fn lambda_phi(&self) -> f64 {
        self.fundamentals.lambda_phi
    }

    /// Lock angle θ_lock [radians].
    pub fn theta_lock_rad(&self) -> f64 {
        self.theta_lock_rad
    }

    /// Phase-conjugate angle θ_PC = π − θ_lock [radians].
    pub fn theta_pc_rad(&self) -> f64 {
        self.theta_pc_rad
    }

    /// Integrated-information threshold Φ_threshold.
    pub fn phi_threshold(&self) -> f64 {
        self.fundamentals.phi_threshold
    }

    /// Base decoherence rate Γ₀.
    pub fn gamma_fixed(&self) -> f64 {
        self.fundamentals.gamma_fixed
    }

    /// Critical decoherence threshold Γ_critical.
    pub fn gamma_critical(&self) -> f64 {
        self.fundamentals.gamma_critical
    }

    /// Phase-conjugate coupling χ_pc.
    pub fn chi_pc(&self) -> f64 {
        self.fundamentals.chi_pc
    }

    /// Epsilon floor for the Ξ calculation.
    pub fn gamma_floor(&self) -> f64 {
        self.fundamentals.gamma_floor
    }

    /// Memory timescale τ_mem = 1/ΛΦ [s].
    pub fn tau_mem(&self) -> f64 {
        self.tau_mem
    }

    /// Fidelity ceiling F_max = 1 − φ⁻⁸.
    pub fn f_max(&self) -> f64 {
        self.f_max
    }

    /// Phase-conjugate recovery efficiency χ_pc².
    pub fn chi_pc_squared(&self) -> f64 {
        self.chi_pc_squared
    }
}

fn check(
    name: &'static str,
    value: f64,
    domain: &'static str,
    ok: bool,
) -> Result<(), ConstantsError> {
    if ok {
        Ok(())
    } else {
        Err(ConstantsError::OutOfDomain {
            name,
            value,
            domain,
        })
    }
}
