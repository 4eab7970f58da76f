//! Local collision: relaxation toward equilibrium plus forcing.
//!
//! BGK relaxes every population at ω. MRT maps the non-equilibrium part to moment
//! space, relaxes each moment at its own rate and maps back. A body force enters
//! through the Guo source
//!
//! S_i = (1 - ω/2) w_i [3(c_i - u) + 9 (c_i·u) c_i] · F
//!
//! (moment-space prefactor M⁻¹(I - S/2)M under MRT). Collision never reads a
//! neighbour, so the grid is processed in independent cell blocks.

use lbm_lattice::{MAX_Q, MomentTransform, VelocitySet};
use log::debug;
use rayon::prelude::*;

use crate::config::{CollisionConfig, CollisionMode};
use crate::color_gradient::ColorGradient;
use crate::error::{KernelError, Result};
use crate::phase::PhaseModel;
use crate::state::{LatticeState, cell_blocks};

/// Cells per parallel work item.
const BLOCK: usize = 4096;

#[derive(Debug, Clone)]
pub struct CollisionOperator {
    lattice: VelocitySet,
    mode: CollisionMode,
    omega: f64,
    omega_a: f64,
    transform: Option<MomentTransform>,
    body_force: Option<[f64; 3]>,
}

impl CollisionOperator {
    /// Build the operator; the MRT transform is assembled here.
    pub fn new(
        lattice: &VelocitySet,
        config: &CollisionConfig,
        body_force: Option<[f64; 3]>,
    ) -> Result<Self> {
        let omega = config.omega();
        let omega_a = config.omega_a();
        let transform = match config.mode {
            CollisionMode::Bgk => None,
            CollisionMode::Mrt => Some(MomentTransform::new(lattice, omega, omega_a)?),
        };
        debug!(
            "collision operator: {:?}, omega = {omega:.4}, omega_a = {omega_a:.4}",
            config.mode
        );
        Ok(Self {
            lattice: lattice.clone(),
            mode: config.mode,
            omega,
            omega_a,
            transform,
            body_force,
        })
    }

    pub fn mode(&self) -> CollisionMode {
        self.mode
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn omega_a(&self) -> f64 {
        self.omega_a
    }

    pub fn transform(&self) -> Option<&MomentTransform> {
        self.transform.as_ref()
    }

    pub fn body_force(&self) -> Option<[f64; 3]> {
        self.body_force
    }

    /// Relax `f` toward `feq` with the given frequencies.
    #[inline]
    pub fn relax(&self, f: &mut [f64], feq: &[f64], omega: f64, omega_a: f64) {
        match &self.transform {
            Some(transform) => transform.relax_with(f, feq, omega, omega_a),
            None => {
                for (fi, e) in f.iter_mut().zip(feq) {
                    *fi -= omega * (*fi - e);
                }
            }
        }
    }

    /// Add the Guo source for force density `force` at velocity `u`.
    pub fn add_force(&self, f: &mut [f64], u: [f64; 3], force: [f64; 3], omega: f64, omega_a: f64) {
        let q = self.lattice.q();
        let mut source = [0.0; MAX_Q];
        for (i, s) in source.iter_mut().enumerate().take(q) {
            let c = self.lattice.c(i);
            let cu = self.lattice.dot(i, u);
            let mut term = 0.0;
            for a in 0..3 {
                term += (3.0 * (c[a] as f64 - u[a]) + 9.0 * cu * c[a] as f64) * force[a];
            }
            *s = self.lattice.weight(i) * term;
        }
        match &self.transform {
            Some(transform) => transform.scale_source(&mut source[..q], omega, omega_a),
            None => {
                for s in source.iter_mut().take(q) {
                    *s *= 1.0 - 0.5 * omega;
                }
            }
        }
        for (fi, s) in f.iter_mut().zip(&source[..q]) {
            *fi += s;
        }
    }

    /// Collide one single-phase cell in place.
    pub fn collide_cell(&self, f: &mut [f64], rho: f64, u: [f64; 3]) {
        let q = self.lattice.q();
        let mut feq = [0.0; MAX_Q];
        self.lattice.equilibrium_into(rho, u, &mut feq[..q]);
        self.relax(f, &feq[..q], self.omega, self.omega_a);
        if let Some(g) = self.body_force {
            self.add_force(f, u, g.map(|v| rho * v), self.omega, self.omega_a);
        }
    }

    /// Collide every cell of a single-phase state in place.
    pub fn collide(&self, state: &mut LatticeState) {
        let cells = state.cells();
        let q = self.lattice.q();
        let (components, fields, _) = state.collision_parts();
        let Some(buffers) = components.first_mut() else {
            return;
        };

        cell_blocks(buffers.current_mut(), cells, BLOCK)
            .into_par_iter()
            .for_each(|mut block| {
                let mut f = [0.0; MAX_Q];
                for local in 0..block.len() {
                    let cell = block.start + local;
                    for i in 0..q {
                        f[i] = block.dirs[i][local];
                    }
                    self.collide_cell(&mut f[..q], fields.density[cell], fields.velocity_at(cell));
                    for i in 0..q {
                        block.dirs[i][local] = f[i];
                    }
                }
            });
    }

    /// Collide every cell of a two-phase state, then apply the interface
    /// perturbation and recolour the result into the red and blue fields.
    ///
    /// Relaxation frequencies follow the locally blended viscosity; ω_a is the
    /// matching 8(2 - ω)/(8 - ω).
    pub fn collide_two_phase(
        &self,
        state: &mut LatticeState,
        model: &PhaseModel,
        color_gradient: &ColorGradient,
    ) -> Result<()> {
        let cells = state.cells();
        let q = self.lattice.q();
        let (components, fields, phase) = state.collision_parts();
        let (Some(phase), [red, blue]) = (phase, components) else {
            return Err(KernelError::NotTwoPhase);
        };

        let red_blocks = cell_blocks(red.current_mut(), cells, BLOCK);
        let blue_blocks = cell_blocks(blue.current_mut(), cells, BLOCK);
        red_blocks
            .into_par_iter()
            .zip(blue_blocks)
            .for_each(|(mut rb, mut bb)| {
                let mut f = [0.0; MAX_Q];
                let mut feq = [0.0; MAX_Q];
                let mut r = [0.0; MAX_Q];
                let mut b = [0.0; MAX_Q];
                for local in 0..rb.len() {
                    let cell = rb.start + local;
                    for i in 0..q {
                        f[i] = rb.dirs[i][local] + bb.dirs[i][local];
                    }
                    let rho_red = phase.red_density[cell];
                    let rho_blue = phase.blue_density[cell];
                    let rho = rho_red + rho_blue;
                    let u = fields.velocity_at(cell);
                    let gradient = phase.gradient_at(cell);
                    let fraction = phase.phase_fraction[cell];
                    let (omega, omega_a) = model.relaxation(fraction);

                    model.equilibrium_into(rho_red, rho_blue, u, &mut feq[..q]);
                    if model.has_ratio_correction() {
                        model.add_ratio_correction(
                            u,
                            phase.density_gradient_at(0, cell),
                            phase.density_gradient_at(1, cell),
                            model.viscosity(fraction),
                            &mut feq[..q],
                        );
                    }
                    self.relax(&mut f[..q], &feq[..q], omega, omega_a);
                    if let Some(g) = self.body_force {
                        self.add_force(&mut f[..q], u, g.map(|v| rho * v), omega, omega_a);
                    }
                    color_gradient.perturb(&mut f[..q], gradient);
                    color_gradient.recolor(
                        model,
                        &f[..q],
                        rho_red,
                        rho_blue,
                        gradient,
                        &mut r[..q],
                        &mut b[..q],
                    );

                    for i in 0..q {
                        rb.dirs[i][local] = r[i];
                        bb.dirs[i][local] = b[i];
                    }
                }
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseParameters;
    use approx::assert_abs_diff_eq;
    use lbm_lattice::Dimension;

    fn operators(body_force: Option<[f64; 3]>) -> Vec<CollisionOperator> {
        let mut ops = Vec::new();
        for dimension in [Dimension::D2, Dimension::D3] {
            let lattice = VelocitySet::for_dimension(dimension);
            for mode in [CollisionMode::Bgk, CollisionMode::Mrt] {
                let config = CollisionConfig::new(mode, 0.08);
                ops.push(CollisionOperator::new(&lattice, &config, body_force).unwrap());
            }
        }
        ops
    }

    #[test]
    fn test_equilibrium_is_fixed_point() {
        for op in operators(None) {
            let q = op.lattice.q();
            let u = [0.03, -0.01, if q == 19 { 0.02 } else { 0.0 }];
            let mut f = vec![0.0; q];
            op.lattice.equilibrium_into(1.07, u, &mut f);
            let before = f.clone();
            op.collide_cell(&mut f, 1.07, u);
            for i in 0..q {
                assert_abs_diff_eq!(f[i], before[i], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_collision_conserves_mass_and_momentum() {
        for op in operators(None) {
            let q = op.lattice.q();
            let mut f: Vec<f64> = (0..q)
                .map(|i| op.lattice.weight(i) * (1.0 + 0.05 * (i as f64).sin()))
                .collect();
            let (rho, j) = op.lattice.moments(&f);
            let u = j.map(|v| v / rho);
            op.collide_cell(&mut f, rho, u);
            let (rho1, j1) = op.lattice.moments(&f);
            assert_abs_diff_eq!(rho1, rho, epsilon = 1e-14);
            for a in 0..3 {
                assert_abs_diff_eq!(j1[a], j[a], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_guo_forcing_adds_exactly_f() {
        let g = [2e-5, -1e-5, 0.0];
        for op in operators(Some(g)) {
            let q = op.lattice.q();
            let rho = 1.1;
            let mut f = vec![0.0; q];
            op.lattice.equilibrium_into(rho, [0.01, 0.0, 0.0], &mut f);
            let (_, j) = op.lattice.moments(&f);

            // Velocity with the half-force shift
            let u = [j[0] / rho + 0.5 * g[0], j[1] / rho + 0.5 * g[1], j[2] / rho + 0.5 * g[2]];
            op.collide_cell(&mut f, rho, u);
            let (rho1, j1) = op.lattice.moments(&f);
            assert_abs_diff_eq!(rho1, rho, epsilon = 1e-14);
            for a in 0..3 {
                assert_abs_diff_eq!(j1[a] - j[a], rho * g[a], epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_mrt_matches_bgk_at_single_rate() {
        let lattice = VelocitySet::d2q9();
        let omega = 1.0 / (3.0 * 0.1 + 0.5);
        let bgk =
            CollisionOperator::new(&lattice, &CollisionConfig::new(CollisionMode::Bgk, 0.1), None)
                .unwrap();
        let mrt = CollisionOperator::new(
            &lattice,
            &CollisionConfig::new(CollisionMode::Mrt, 0.1).with_omega_a(omega),
            None,
        )
        .unwrap();
        let f0: Vec<f64> = (0..9).map(|i| lattice.weight(i) * (1.0 + 0.02 * i as f64)).collect();
        let (rho, j) = lattice.moments(&f0);
        let u = j.map(|v| v / rho);
        let mut a = f0.clone();
        let mut b = f0;
        bgk.collide_cell(&mut a, rho, u);
        mrt.collide_cell(&mut b, rho, u);
        for i in 0..9 {
            assert_abs_diff_eq!(a[i], b[i], epsilon = 1e-14);
        }
    }

    #[test]
    fn test_two_phase_requires_two_components() {
        let lattice = VelocitySet::d2q9();
        let op = CollisionOperator::new(&lattice, &CollisionConfig::default(), None).unwrap();
        let params = PhaseParameters::default();
        let model = PhaseModel::new(&lattice, &params);
        let cg = ColorGradient::new(&lattice, &params);
        let mut state = LatticeState::new(lattice, 4, false);
        assert!(matches!(
            op.collide_two_phase(&mut state, &model, &cg),
            Err(KernelError::NotTwoPhase)
        ));
    }
}
