//! Colour-gradient interface forcing and recolouring.
//!
//! Per step the colour gradient G = ∇ρ_N is evaluated from the colour field with a
//! finite-difference stencil. Cells with |G| above the sharpness limit are interface
//! cells: they receive the surface-tension perturbation
//!
//! Δf_i = (A/2) |G| [w_i (G·c_i)² / |G|² - B_i]
//!
//! and their post-collision populations are recoloured so that red is pushed along
//! G and blue against it:
//!
//! r_i = (ρ_r/ρ) f_i + β (ρ_r ρ_b / ρ²) cos θ_i Σ_k ρ_k φ_i^k,  b_i = f_i - r_i
//!
//! Red populations are clamped into [0, f_i], which keeps the phase fraction in [0, 1].

use lbm_lattice::{GradientStencil, VelocitySet, perturbation_weights};
use rayon::prelude::*;

use crate::config::PhaseParameters;
use crate::geometry::Grid;
use crate::phase::PhaseModel;
use crate::state::PhaseFields;

#[derive(Debug, Clone)]
pub struct ColorGradient {
    lattice: VelocitySet,
    stencil: GradientStencil,
    perturbation: Vec<f64>,
    surface_tension: f64,
    segregation: f64,
    sharpness_limit: f64,
    density_gradients: bool,
}

impl ColorGradient {
    pub fn new(lattice: &VelocitySet, params: &PhaseParameters) -> Self {
        Self {
            lattice: lattice.clone(),
            stencil: GradientStencil::for_dimension(
                lattice.dimension(),
                params.higher_order_gradient,
            ),
            perturbation: perturbation_weights(lattice),
            surface_tension: params.surface_tension,
            segregation: params.segregation,
            sharpness_limit: params.sharpness_limit,
            density_gradients: params.ratio_correction
                && params.red_density != params.blue_density,
        }
    }

    pub fn stencil(&self) -> &GradientStencil {
        &self.stencil
    }

    /// Colour gradient of one cell. Off-grid samples wrap on periodic axes and clamp
    /// to the edge cell otherwise.
    pub fn gradient_at(&self, grid: &Grid, color: &[f64], cell: usize) -> [f64; 3] {
        let coords = grid.coords(cell);
        self.stencil
            .apply(|offset| color[grid.neighbor_clamped(coords, offset)])
    }

    /// Refresh the gradient field from the colour field, and the phase density
    /// gradients when the ratio correction needs them.
    pub fn update(&self, grid: &Grid, phase: &mut PhaseFields) {
        let PhaseFields {
            color,
            red_density,
            blue_density,
            gradient,
            density_gradient,
            ..
        } = phase;
        self.fill_gradient(grid, color, gradient);
        if self.density_gradients {
            let [red_gradient, blue_gradient] = density_gradient;
            self.fill_gradient(grid, red_density, red_gradient);
            self.fill_gradient(grid, blue_density, blue_gradient);
        }
    }

    fn fill_gradient(&self, grid: &Grid, field: &[f64], out: &mut [Vec<f64>; 3]) {
        let [gx, gy, gz] = out;
        (gx.par_iter_mut(), gy.par_iter_mut(), gz.par_iter_mut())
            .into_par_iter()
            .enumerate()
            .for_each(|(cell, (gx, gy, gz))| {
                let g = self.gradient_at(grid, field, cell);
                *gx = g[0];
                *gy = g[1];
                *gz = g[2];
            });
    }

    #[inline]
    pub fn is_interface(&self, gradient: [f64; 3]) -> bool {
        norm(gradient) > self.sharpness_limit
    }

    /// Add the surface-tension perturbation to a post-collision population vector.
    ///
    /// Mass and momentum neutral: the B_i sum to 1/3 and every term is even in c.
    pub fn perturb(&self, f: &mut [f64], gradient: [f64; 3]) {
        let g = norm(gradient);
        if g <= self.sharpness_limit {
            return;
        }
        let amplitude = 0.5 * self.surface_tension * g;
        for (i, fi) in f.iter_mut().enumerate().take(self.lattice.q()) {
            let gc = self.lattice.dot(i, gradient);
            *fi += amplitude * (self.lattice.weight(i) * gc * gc / (g * g) - self.perturbation[i]);
        }
    }

    /// Split total populations `f` into red and blue.
    pub fn recolor(
        &self,
        model: &PhaseModel,
        f: &[f64],
        rho_red: f64,
        rho_blue: f64,
        gradient: [f64; 3],
        red: &mut [f64],
        blue: &mut [f64],
    ) {
        let q = self.lattice.q();
        let rho = rho_red + rho_blue;
        if rho <= 0.0 {
            red[..q].fill(0.0);
            blue[..q].copy_from_slice(&f[..q]);
            return;
        }

        let g = norm(gradient);
        let interface = g > self.sharpness_limit;
        let share = rho_red / rho;
        let segregation = self.segregation * rho_red * rho_blue / (rho * rho);

        for i in 0..q {
            let mut r = share * f[i];
            if interface && i > 0 {
                let cos = self.lattice.dot(i, gradient) / (g * self.lattice.norm(i));
                r += segregation * cos * model.rest_equilibrium(i, rho_red, rho_blue);
            }
            // A negative total stays with blue rather than being amplified
            let r = r.clamp(0.0, f[i].max(0.0));
            red[i] = r;
            blue[i] = f[i] - r;
        }
    }
}

#[inline]
fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LatticeGeometry;
    use crate::state::LatticeState;
    use approx::assert_abs_diff_eq;
    use lbm_lattice::Dimension;

    fn params() -> PhaseParameters {
        PhaseParameters {
            red_density: 1.0,
            blue_density: 1.0,
            surface_tension: 0.01,
            segregation: 0.7,
            ..PhaseParameters::default()
        }
    }

    #[test]
    fn test_perturbation_conserves_mass_and_momentum() {
        for lattice in [VelocitySet::d2q9(), VelocitySet::d3q19()] {
            let cg = ColorGradient::new(&lattice, &params());
            let mut feq = vec![0.0; lattice.q()];
            lattice.equilibrium_into(1.0, [0.01, 0.02, 0.0], &mut feq);
            let gz = if lattice.dimension() == Dimension::D3 { 0.12 } else { 0.0 };
            let mut f = feq.clone();
            cg.perturb(&mut f, [0.3, -0.4, gz]);

            let (rho0, j0) = lattice.moments(&feq);
            let (rho1, j1) = lattice.moments(&f);
            assert_abs_diff_eq!(rho1, rho0, epsilon = 1e-15);
            for a in 0..3 {
                assert_abs_diff_eq!(j1[a], j0[a], epsilon = 1e-15);
            }
            assert!(f.iter().zip(&feq).any(|(a, b)| (a - b).abs() > 1e-6));
        }
    }

    #[test]
    fn test_bulk_cells_untouched() {
        let lattice = VelocitySet::d2q9();
        let cg = ColorGradient::new(&lattice, &params());
        let mut f = vec![0.1; 9];
        cg.perturb(&mut f, [1e-9, 0.0, 0.0]);
        assert!(f.iter().all(|&v| v == 0.1));
        assert!(!cg.is_interface([1e-9, 0.0, 0.0]));
        assert!(cg.is_interface([1e-3, 0.0, 0.0]));
    }

    #[test]
    fn test_recolor_conserves_colour_mass() {
        let lattice = VelocitySet::d2q9();
        let p = params();
        let model = PhaseModel::new(&lattice, &p);
        let cg = ColorGradient::new(&lattice, &p);

        let (rho_r, rho_b) = (0.6, 0.4);
        let mut f = [0.0; 9];
        model.equilibrium_into(rho_r, rho_b, [0.0; 3], &mut f);
        let mut red = [0.0; 9];
        let mut blue = [0.0; 9];
        cg.recolor(&model, &f, rho_r, rho_b, [0.2, 0.1, 0.0], &mut red, &mut blue);

        assert_abs_diff_eq!(red.iter().sum::<f64>(), rho_r, epsilon = 1e-14);
        assert_abs_diff_eq!(blue.iter().sum::<f64>(), rho_b, epsilon = 1e-14);
        // Red is pushed along +x
        assert!(red[1] > red[3]);
        assert!(blue[3] > blue[1]);
        for i in 0..9 {
            assert!(red[i] >= 0.0 && red[i] <= f[i]);
        }
    }

    #[test]
    fn test_recolor_clamps_to_populations() {
        let lattice = VelocitySet::d2q9();
        let p = PhaseParameters {
            segregation: 1.0,
            ..params()
        };
        let model = PhaseModel::new(&lattice, &p);
        let cg = ColorGradient::new(&lattice, &p);

        let mut f = [0.0; 9];
        model.equilibrium_into(0.5, 0.5, [0.0; 3], &mut f);
        // A near-empty direction forces the segregation term past f_i
        f[1] = 1e-6;
        let mut red = [0.0; 9];
        let mut blue = [0.0; 9];
        cg.recolor(&model, &f, 0.5, 0.5, [1.0, 0.0, 0.0], &mut red, &mut blue);
        assert_abs_diff_eq!(red[1], f[1], epsilon = 1e-18);
        assert_abs_diff_eq!(blue[1], 0.0, epsilon = 1e-18);
        assert!(red.iter().zip(&f).all(|(r, fi)| *r >= 0.0 && r <= fi));
    }

    #[test]
    fn test_recolor_negative_population_never_splits_below_total() {
        let lattice = VelocitySet::d2q9();
        let p = PhaseParameters {
            segregation: 1.0,
            ..params()
        };
        let model = PhaseModel::new(&lattice, &p);
        let cg = ColorGradient::new(&lattice, &p);

        let mut f = [0.0; 9];
        model.equilibrium_into(0.5, 0.5, [0.0; 3], &mut f);
        // Undershoot against the gradient: the segregation term would push red above 0
        f[1] = -1e-4;
        let mut red = [0.0; 9];
        let mut blue = [0.0; 9];
        cg.recolor(&model, &f, 0.5, 0.5, [1.0, 0.0, 0.0], &mut red, &mut blue);

        assert_eq!(red[1], 0.0);
        assert_eq!(blue[1], f[1]);
        for i in 0..9 {
            assert_abs_diff_eq!(red[i] + blue[i], f[i], epsilon = 1e-18);
            if f[i] >= 0.0 {
                assert!(red[i] >= 0.0 && blue[i] >= 0.0, "direction {i}");
            }
        }
    }

    #[test]
    fn test_gradient_of_planar_interface() {
        let geometry = LatticeGeometry::new_2d(16, 4).with_periodic([false, true, false]);
        let grid = Grid::new(Dimension::D2, &geometry);
        let lattice = VelocitySet::d2q9();

        // Linear colour ramp along x
        let color: Vec<f64> = (0..grid.cell_count())
            .map(|cell| 0.1 * grid.coords(cell)[0] as f64)
            .collect();
        for higher_order in [false, true] {
            let p = PhaseParameters {
                higher_order_gradient: higher_order,
                ..params()
            };
            let cg = ColorGradient::new(&lattice, &p);
            let g = cg.gradient_at(&grid, &color, grid.index(8, 1, 0));
            assert_abs_diff_eq!(g[0], 0.1, epsilon = 1e-14);
            assert_abs_diff_eq!(g[1], 0.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_update_fills_density_gradients_for_unequal_phases() {
        let geometry = LatticeGeometry::new_2d(12, 4).with_periodic([false, true, false]);
        let grid = Grid::new(Dimension::D2, &geometry);
        let lattice = VelocitySet::d2q9();

        for (red_density, expected) in [(10.0, 0.5), (1.0, 0.0)] {
            let p = PhaseParameters {
                red_density,
                ratio_correction: true,
                ..params()
            };
            let cg = ColorGradient::new(&lattice, &p);
            let mut state = LatticeState::new(lattice.clone(), grid.cell_count(), true);
            let phase = state.phase_mut().unwrap();
            for cell in 0..grid.cell_count() {
                let x = grid.coords(cell)[0] as f64;
                phase.red_density[cell] = 0.5 * x;
                phase.blue_density[cell] = 1.0 - 0.05 * x;
            }
            cg.update(&grid, phase);

            let cell = grid.index(6, 2, 0);
            assert_abs_diff_eq!(phase.density_gradient_at(0, cell)[0], expected, epsilon = 1e-14);
            assert_abs_diff_eq!(
                phase.density_gradient_at(1, cell)[0],
                -expected / 10.0,
                epsilon = 1e-14
            );
            assert_abs_diff_eq!(phase.density_gradient_at(0, cell)[1], 0.0, epsilon = 1e-14);
        }
    }
}
