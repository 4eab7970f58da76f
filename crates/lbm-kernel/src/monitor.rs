//! Conservation monitoring for lattice Boltzmann runs.
//!
//! Closed domains (periodic or walled, no inlet/outlet, no body force) conserve
//! mass and momentum to round-off; the colour-gradient recolouring also conserves
//! the red mass. Tracking the drift against a baseline exposes boundary or
//! forcing errors long before a run diverges.

use nalgebra::Vector3;

use crate::solver::LatticeBoltzmann;

/// Baseline conserved quantities.
#[derive(Debug, Clone)]
pub struct ConservationState {
    pub baseline_mass: f64,
    pub baseline_momentum: Vector3<f64>,
    /// Red mass of two-phase sessions.
    pub baseline_red_mass: Option<f64>,
}

impl ConservationState {
    pub fn new(solver: &LatticeBoltzmann) -> Self {
        Self {
            baseline_mass: solver.total_mass(),
            baseline_momentum: solver.total_momentum(),
            baseline_red_mass: solver.red_mass().ok(),
        }
    }
}

/// Conservation errors at the current step.
#[derive(Debug, Clone)]
pub struct ConservationMonitor {
    /// Relative mass error: |M - M₀| / M₀
    pub mass_error: f64,
    /// Absolute momentum error: p - p₀
    pub momentum_error: Vector3<f64>,
    /// Relative red mass error (zero for single-phase sessions).
    pub red_mass_error: f64,
}

impl ConservationMonitor {
    /// Compare the current state of `solver` with `baseline`.
    pub fn check(baseline: &ConservationState, solver: &LatticeBoltzmann) -> Self {
        let red_mass_error = match (baseline.baseline_red_mass, solver.red_mass()) {
            (Some(red0), Ok(red)) => relative(red, red0),
            _ => 0.0,
        };

        Self {
            mass_error: relative(solver.total_mass(), baseline.baseline_mass),
            momentum_error: solver.total_momentum() - baseline.baseline_momentum,
            red_mass_error,
        }
    }

    /// Check whether mass (relative) or momentum (absolute) drifted beyond tolerance.
    pub fn is_violated(&self, mass_tol: f64, momentum_tol: f64) -> bool {
        self.mass_error > mass_tol
            || self.red_mass_error > mass_tol
            || self.momentum_error.norm() > momentum_tol
    }

    /// Maximum relative error across the tracked quantities (momentum normalised).
    pub fn max_relative_error(&self) -> f64 {
        let mom_rel = self.momentum_error.norm() / (1.0 + self.momentum_error.norm());
        self.mass_error.max(self.red_mass_error).max(mom_rel)
    }
}

fn relative(value: f64, baseline: f64) -> f64 {
    // Avoid division by zero
    if baseline.abs() > 1e-12 {
        (value - baseline).abs() / baseline.abs()
    } else {
        (value - baseline).abs()
    }
}
