//! Two-phase material model for the colour-gradient method.
//!
//! Each phase k keeps a rest fraction α_k so that the two phases share one pressure
//! across the interface despite different densities. The lighter phase uses
//! α = w_0; the denser phase uses α = 1 - (1 - w_0) ρ_light / ρ_dense. The resulting
//! direction weights are φ_0^k = α_k and φ_i^k = (1 - α_k) w_i / (1 - w_0).
//!
//! A rest fraction other than w_0 gives phase k the sound speed
//! c_k² = (1 - α_k) / (3 (1 - w_0)), which leaves the error stress
//! ν κ_k [u ⊗ ∇ρ_k + ∇ρ_k ⊗ u + (u·∇ρ_k) I] in the momentum equation with
//! κ_k = (α_k - w_0) / (1 - w_0). The ratio correction adds the mass- and
//! momentum-free term Φ_i = 9/2 w_i (c_i ⊗ c_i - I/3) : S to the equilibrium, whose
//! second moment S cancels that stress. It vanishes for the lighter phase and at
//! density ratio 1.

use lbm_lattice::{MomentTransform, VelocitySet};

use crate::config::{PhaseParameters, relaxation_frequency};

/// Precomputed per-phase constants.
#[derive(Debug, Clone)]
pub struct PhaseModel {
    params: PhaseParameters,
    lattice: VelocitySet,
    alpha_red: f64,
    alpha_blue: f64,
    phi_red: Vec<f64>,
    phi_blue: Vec<f64>,
    kappa_red: f64,
    kappa_blue: f64,
}

impl PhaseModel {
    pub fn new(lattice: &VelocitySet, params: &PhaseParameters) -> Self {
        let w0 = lattice.weight(0);
        let (light, dense) = if params.red_density <= params.blue_density {
            (params.red_density, params.blue_density)
        } else {
            (params.blue_density, params.red_density)
        };
        let alpha_dense = 1.0 - (1.0 - w0) * light / dense;
        let (alpha_red, alpha_blue) = if params.red_density >= params.blue_density {
            (alpha_dense, w0)
        } else {
            (w0, alpha_dense)
        };

        let table = |alpha: f64| -> Vec<f64> {
            (0..lattice.q())
                .map(|i| {
                    if i == 0 {
                        alpha
                    } else {
                        (1.0 - alpha) * lattice.weight(i) / (1.0 - w0)
                    }
                })
                .collect()
        };

        let kappa = |alpha: f64| {
            if params.ratio_correction {
                (alpha - w0) / (1.0 - w0)
            } else {
                0.0
            }
        };

        Self {
            params: params.clone(),
            lattice: lattice.clone(),
            alpha_red,
            alpha_blue,
            phi_red: table(alpha_red),
            phi_blue: table(alpha_blue),
            kappa_red: kappa(alpha_red),
            kappa_blue: kappa(alpha_blue),
        }
    }

    pub fn params(&self) -> &PhaseParameters {
        &self.params
    }

    pub fn alpha_red(&self) -> f64 {
        self.alpha_red
    }

    pub fn alpha_blue(&self) -> f64 {
        self.alpha_blue
    }

    /// Σ_k ρ_k φ_i^k, the velocity-independent part of the equilibrium.
    #[inline]
    pub fn rest_equilibrium(&self, i: usize, rho_red: f64, rho_blue: f64) -> f64 {
        rho_red * self.phi_red[i] + rho_blue * self.phi_blue[i]
    }

    /// Mixture equilibrium Σ_k ρ_k φ_i^k + ρ w_i (3c·u + 9/2 (c·u)² - 3/2 u²).
    pub fn equilibrium_into(&self, rho_red: f64, rho_blue: f64, u: [f64; 3], out: &mut [f64]) {
        let rho = rho_red + rho_blue;
        for (i, feq) in out.iter_mut().enumerate().take(self.lattice.q()) {
            *feq = self.rest_equilibrium(i, rho_red, rho_blue)
                + rho * self.lattice.weight(i) * velocity_terms(&self.lattice, i, u);
        }
    }

    /// Per-phase equilibria whose sum is [`Self::equilibrium_into`].
    pub fn split_equilibrium(
        &self,
        rho_red: f64,
        rho_blue: f64,
        u: [f64; 3],
        red: &mut [f64],
        blue: &mut [f64],
    ) {
        for i in 0..self.lattice.q() {
            let shape = self.lattice.weight(i) * velocity_terms(&self.lattice, i, u);
            red[i] = rho_red * (self.phi_red[i] + shape);
            blue[i] = rho_blue * (self.phi_blue[i] + shape);
        }
    }

    /// Whether [`Self::add_ratio_correction`] does anything.
    pub fn has_ratio_correction(&self) -> bool {
        self.kappa_red != 0.0 || self.kappa_blue != 0.0
    }

    /// Second moment S of the ratio correction for velocity `u`, phase density
    /// gradients and local kinematic viscosity.
    pub fn correction_stress(
        &self,
        u: [f64; 3],
        grad_red: [f64; 3],
        grad_blue: [f64; 3],
        viscosity: f64,
    ) -> [[f64; 3]; 3] {
        let axes = self.lattice.dimension().axes();
        let mut stress = [[0.0; 3]; 3];
        for (kappa, grad) in [(self.kappa_red, grad_red), (self.kappa_blue, grad_blue)] {
            if kappa == 0.0 {
                continue;
            }
            let advection: f64 = (0..axes).map(|a| u[a] * grad[a]).sum();
            for a in 0..axes {
                for b in 0..axes {
                    let mut s = u[a] * grad[b] + grad[a] * u[b];
                    if a == b {
                        s += advection;
                    }
                    stress[a][b] += viscosity * kappa * s;
                }
            }
        }
        stress
    }

    /// Add the density-ratio correction Φ_i to a mixture equilibrium.
    pub fn add_ratio_correction(
        &self,
        u: [f64; 3],
        grad_red: [f64; 3],
        grad_blue: [f64; 3],
        viscosity: f64,
        feq: &mut [f64],
    ) {
        if !self.has_ratio_correction() {
            return;
        }
        let stress = self.correction_stress(u, grad_red, grad_blue, viscosity);
        let axes = self.lattice.dimension().axes();
        let trace: f64 = (0..axes).map(|a| stress[a][a]).sum();
        for (i, f) in feq.iter_mut().enumerate().take(self.lattice.q()) {
            let c = self.lattice.c(i);
            let mut ccs = 0.0;
            for a in 0..axes {
                for b in 0..axes {
                    ccs += (c[a] * c[b]) as f64 * stress[a][b];
                }
            }
            *f += 4.5 * self.lattice.weight(i) * (ccs - trace / 3.0);
        }
    }

    /// Colour field ρ_N = (ρ_r/ρ_r⁰ - ρ_b/ρ_b⁰) / (ρ_r/ρ_r⁰ + ρ_b/ρ_b⁰).
    #[inline]
    pub fn color(&self, rho_red: f64, rho_blue: f64) -> f64 {
        let red = rho_red / self.params.red_density;
        let blue = rho_blue / self.params.blue_density;
        let sum = red + blue;
        if sum > 0.0 { (red - blue) / sum } else { 0.0 }
    }

    /// Red phase fraction (1 + ρ_N)/2, clamped to [0, 1].
    #[inline]
    pub fn phase_fraction(&self, color: f64) -> f64 {
        (0.5 * (1.0 + color)).clamp(0.0, 1.0)
    }

    /// Harmonic viscosity blend 1/ν = φ/ν_r + (1 - φ)/ν_b.
    #[inline]
    pub fn viscosity(&self, fraction: f64) -> f64 {
        1.0 / (fraction / self.params.red_viscosity + (1.0 - fraction) / self.params.blue_viscosity)
    }

    /// Shear and asymmetric relaxation frequencies for a local phase fraction.
    #[inline]
    pub fn relaxation(&self, fraction: f64) -> (f64, f64) {
        let omega = relaxation_frequency(self.viscosity(fraction));
        (omega, MomentTransform::magic_omega_a(omega))
    }
}

#[inline]
fn velocity_terms(lattice: &VelocitySet, i: usize, u: [f64; 3]) -> f64 {
    let cu = lattice.dot(i, u);
    let uu = u[0] * u[0] + u[1] * u[1] + u[2] * u[2];
    3.0 * cu + 4.5 * cu * cu - 1.5 * uu
}
