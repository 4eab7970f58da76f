//! Population storage and macroscopic fields.
//!
//! Populations are stored one array per direction: population (i, cell) lives at
//! `i * cell_count + cell`. Each population field owns two such buffers; the
//! `current` index says which one holds the state of the present step. Collision
//! works in place on the current slot, streaming reads it and writes the other slot,
//! and [`PopulationBuffers::swap`] flips the roles at the end of a step.

use lbm_lattice::{MAX_Q, VelocitySet};
use nalgebra::Vector3;
use rayon::prelude::*;

use crate::phase::PhaseModel;

/// Double-buffered population field.
#[derive(Debug, Clone)]
pub struct PopulationBuffers {
    slots: [Vec<f64>; 2],
    current: usize,
    q: usize,
    cells: usize,
}

impl PopulationBuffers {
    pub fn new(q: usize, cells: usize) -> Self {
        Self {
            slots: [vec![0.0; q * cells], vec![0.0; q * cells]],
            current: 0,
            q,
            cells,
        }
    }

    pub fn q(&self) -> usize {
        self.q
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    /// Index of the slot holding the current populations.
    pub fn current_slot(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> &[f64] {
        &self.slots[self.current]
    }

    pub fn current_mut(&mut self) -> &mut [f64] {
        &mut self.slots[self.current]
    }

    pub fn next(&self) -> &[f64] {
        &self.slots[1 - self.current]
    }

    /// Lend the current slot for reading and the next slot for writing.
    pub fn split(&mut self) -> (&[f64], &mut [f64]) {
        let [a, b] = &mut self.slots;
        if self.current == 0 {
            (a.as_slice(), b.as_mut_slice())
        } else {
            (b.as_slice(), a.as_mut_slice())
        }
    }

    /// Make the next slot current.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
    }

    #[inline]
    pub fn get(&self, i: usize, cell: usize) -> f64 {
        self.slots[self.current][i * self.cells + cell]
    }

    #[inline]
    pub fn set(&mut self, i: usize, cell: usize, value: f64) {
        let cells = self.cells;
        self.slots[self.current][i * cells + cell] = value;
    }

    /// Gather the populations of one cell from the current slot.
    pub fn cell(&self, cell: usize) -> [f64; MAX_Q] {
        let mut f = [0.0; MAX_Q];
        for (i, fi) in f.iter_mut().enumerate().take(self.q) {
            *fi = self.get(i, cell);
        }
        f
    }

    pub fn set_cell(&mut self, cell: usize, values: &[f64]) {
        for (i, &v) in values.iter().enumerate().take(self.q) {
            self.set(i, cell, v);
        }
    }

    /// Σ_i f_i over the current slot.
    pub fn total(&self) -> f64 {
        self.current().par_iter().sum()
    }
}

/// Contiguous run of cells with one mutable slice per direction.
pub(crate) struct CellBlock<'a> {
    pub start: usize,
    pub dirs: Vec<&'a mut [f64]>,
}

impl CellBlock<'_> {
    pub fn len(&self) -> usize {
        self.dirs.first().map_or(0, |d| d.len())
    }
}

/// Split a direction-major buffer into disjoint blocks of `block` cells so that
/// every block can be updated on its own thread.
pub(crate) fn cell_blocks(buf: &mut [f64], cells: usize, block: usize) -> Vec<CellBlock<'_>> {
    let q = buf.len() / cells.max(1);
    let mut blocks: Vec<CellBlock<'_>> = (0..cells.div_ceil(block))
        .map(|b| CellBlock {
            start: b * block,
            dirs: Vec::with_capacity(q),
        })
        .collect();
    for dir in buf.chunks_mut(cells.max(1)) {
        for (blk, chunk) in blocks.iter_mut().zip(dir.chunks_mut(block)) {
            blk.dirs.push(chunk);
        }
    }
    blocks
}

/// Density and velocity per cell.
#[derive(Debug, Clone)]
pub struct MacroscopicFields {
    pub density: Vec<f64>,
    /// Velocity components [x, y, z]; z stays zero in 2D.
    pub velocity: [Vec<f64>; 3],
}

impl MacroscopicFields {
    fn new(cells: usize) -> Self {
        Self {
            density: vec![0.0; cells],
            velocity: [vec![0.0; cells], vec![0.0; cells], vec![0.0; cells]],
        }
    }

    #[inline]
    pub fn velocity_at(&self, cell: usize) -> [f64; 3] {
        [
            self.velocity[0][cell],
            self.velocity[1][cell],
            self.velocity[2][cell],
        ]
    }
}

/// Two-phase fields.
#[derive(Debug, Clone)]
pub struct PhaseFields {
    pub red_density: Vec<f64>,
    pub blue_density: Vec<f64>,
    /// Colour field ρ_N in [-1, 1].
    pub color: Vec<f64>,
    /// Red phase fraction in [0, 1].
    pub phase_fraction: Vec<f64>,
    /// Colour gradient ∇ρ_N per component.
    pub gradient: [Vec<f64>; 3],
    /// ∇ρ_r and ∇ρ_b, refreshed only while the ratio correction is active.
    pub density_gradient: [[Vec<f64>; 3]; 2],
}

impl PhaseFields {
    fn new(cells: usize) -> Self {
        Self {
            red_density: vec![0.0; cells],
            blue_density: vec![0.0; cells],
            color: vec![0.0; cells],
            phase_fraction: vec![0.0; cells],
            gradient: [vec![0.0; cells], vec![0.0; cells], vec![0.0; cells]],
            density_gradient: std::array::from_fn(|_| {
                [vec![0.0; cells], vec![0.0; cells], vec![0.0; cells]]
            }),
        }
    }

    #[inline]
    pub fn gradient_at(&self, cell: usize) -> [f64; 3] {
        [
            self.gradient[0][cell],
            self.gradient[1][cell],
            self.gradient[2][cell],
        ]
    }

    /// ∇ρ_k of component `k` (0 red, 1 blue).
    #[inline]
    pub fn density_gradient_at(&self, k: usize, cell: usize) -> [f64; 3] {
        let g = &self.density_gradient[k];
        [g[0][cell], g[1][cell], g[2][cell]]
    }
}

/// Everything that changes from step to step.
///
/// Single-phase runs carry one population field; two-phase runs carry a red field
/// (component 0) and a blue field (component 1) whose sum is the total.
#[derive(Debug, Clone)]
pub struct LatticeState {
    lattice: VelocitySet,
    cells: usize,
    components: Vec<PopulationBuffers>,
    fields: MacroscopicFields,
    phase: Option<PhaseFields>,
}

impl LatticeState {
    pub fn new(lattice: VelocitySet, cells: usize, two_phase: bool) -> Self {
        let count = if two_phase { 2 } else { 1 };
        let q = lattice.q();
        Self {
            lattice,
            cells,
            components: (0..count).map(|_| PopulationBuffers::new(q, cells)).collect(),
            fields: MacroscopicFields::new(cells),
            phase: two_phase.then(|| PhaseFields::new(cells)),
        }
    }

    pub fn lattice(&self) -> &VelocitySet {
        &self.lattice
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn is_two_phase(&self) -> bool {
        self.phase.is_some()
    }

    pub fn components(&self) -> &[PopulationBuffers] {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut [PopulationBuffers] {
        &mut self.components
    }

    pub fn fields(&self) -> &MacroscopicFields {
        &self.fields
    }

    pub fn phase(&self) -> Option<&PhaseFields> {
        self.phase.as_ref()
    }

    pub(crate) fn phase_mut(&mut self) -> Option<&mut PhaseFields> {
        self.phase.as_mut()
    }

    /// Populations of the collision step together with the fields they read.
    pub(crate) fn collision_parts(
        &mut self,
    ) -> (&mut [PopulationBuffers], &MacroscopicFields, Option<&PhaseFields>) {
        (&mut self.components, &self.fields, self.phase.as_ref())
    }

    /// One population field with the matching component density of the last
    /// recompute (the total density in single-phase runs).
    pub(crate) fn component_parts(&mut self, k: usize) -> (&mut PopulationBuffers, &[f64]) {
        let density = match (&self.phase, k) {
            (Some(phase), 0) => &phase.red_density,
            (Some(phase), _) => &phase.blue_density,
            (None, _) => &self.fields.density,
        };
        (&mut self.components[k], density)
    }

    /// Total population (summed over components) in the current slot.
    pub fn population(&self, i: usize, cell: usize) -> f64 {
        self.components.iter().map(|c| c.get(i, cell)).sum()
    }

    pub fn swap(&mut self) {
        for component in &mut self.components {
            component.swap();
        }
    }

    /// Write the single-phase equilibrium of (ρ, u) into the current slot.
    pub fn set_equilibrium(&mut self, cell: usize, rho: f64, u: [f64; 3]) {
        let mut feq = [0.0; MAX_Q];
        let q = self.lattice.q();
        self.lattice.equilibrium_into(rho, u, &mut feq[..q]);
        let last = self.components.len() - 1;
        for (k, component) in self.components.iter_mut().enumerate() {
            // Two-phase sessions receive a pure blue fluid.
            if k == last {
                component.set_cell(cell, &feq[..q]);
            } else {
                component.set_cell(cell, &[0.0; MAX_Q][..q]);
            }
        }
    }

    /// Write the two-phase equilibrium of (ρ_r, ρ_b, u) into the current slot.
    pub fn set_phase_equilibrium(
        &mut self,
        cell: usize,
        model: &PhaseModel,
        rho_red: f64,
        rho_blue: f64,
        u: [f64; 3],
    ) {
        let q = self.lattice.q();
        let mut red = [0.0; MAX_Q];
        let mut blue = [0.0; MAX_Q];
        model.split_equilibrium(rho_red, rho_blue, u, &mut red[..q], &mut blue[..q]);
        if let [r, b] = self.components.as_mut_slice() {
            r.set_cell(cell, &red[..q]);
            b.set_cell(cell, &blue[..q]);
        }
    }

    /// Recompute density, velocity and (two-phase) colour fields from the current slot.
    ///
    /// With a body acceleration g the velocity carries the half-force shift
    /// u = Σ f c / ρ + g / 2.
    pub fn recompute(&mut self, acceleration: Option<[f64; 3]>, model: Option<&PhaseModel>) {
        let lattice = &self.lattice;
        let components = &self.components;
        let n = self.cells;
        let q = lattice.q();
        let half = acceleration.map_or([0.0; 3], |g| g.map(|v| 0.5 * v));

        let [ux, uy, uz] = &mut self.fields.velocity;
        (
            self.fields.density.par_iter_mut(),
            ux.par_iter_mut(),
            uy.par_iter_mut(),
            uz.par_iter_mut(),
        )
            .into_par_iter()
            .enumerate()
            .for_each(|(cell, (rho, ux, uy, uz))| {
                let mut r = 0.0;
                let mut j = [0.0; 3];
                for component in components {
                    let f = component.current();
                    for i in 0..q {
                        let v = f[i * n + cell];
                        let c = lattice.c(i);
                        r += v;
                        j[0] += v * c[0] as f64;
                        j[1] += v * c[1] as f64;
                        j[2] += v * c[2] as f64;
                    }
                }
                *rho = r;
                if r > 0.0 {
                    *ux = j[0] / r + half[0];
                    *uy = j[1] / r + half[1];
                    *uz = j[2] / r + half[2];
                } else {
                    *ux = 0.0;
                    *uy = 0.0;
                    *uz = 0.0;
                }
            });

        let (Some(phase), Some(model), [red, blue]) =
            (&mut self.phase, model, self.components.as_slice())
        else {
            return;
        };
        let (red, blue) = (red.current(), blue.current());
        (
            phase.red_density.par_iter_mut(),
            phase.blue_density.par_iter_mut(),
            phase.color.par_iter_mut(),
            phase.phase_fraction.par_iter_mut(),
        )
            .into_par_iter()
            .enumerate()
            .for_each(|(cell, (rr, rb, color, fraction))| {
                *rr = (0..q).map(|i| red[i * n + cell]).sum();
                *rb = (0..q).map(|i| blue[i * n + cell]).sum();
                *color = model.color(*rr, *rb);
                *fraction = model.phase_fraction(*color);
            });
    }

    /// First cell whose density is non-positive or not finite.
    pub fn find_divergence(&self) -> Option<(usize, f64)> {
        let density = &self.fields.density;
        density
            .par_iter()
            .position_first(|r| !(r.is_finite() && *r > 0.0))
            .map(|cell| (cell, density[cell]))
    }

    pub fn total_mass(&self) -> f64 {
        self.fields.density.par_iter().sum()
    }

    /// Σ ρu over the grid.
    pub fn total_momentum(&self) -> Vector3<f64> {
        let [ux, uy, uz] = &self.fields.velocity;
        let j = (
            self.fields.density.par_iter(),
            ux.par_iter(),
            uy.par_iter(),
            uz.par_iter(),
        )
            .into_par_iter()
            .map(|(r, x, y, z)| [r * x, r * y, r * z])
            .reduce(|| [0.0; 3], |a, b| [a[0] + b[0], a[1] + b[1], a[2] + b[2]]);
        Vector3::new(j[0], j[1], j[2])
    }

    pub fn kinetic_energy(&self) -> f64 {
        let [ux, uy, uz] = &self.fields.velocity;
        (
            self.fields.density.par_iter(),
            ux.par_iter(),
            uy.par_iter(),
            uz.par_iter(),
        )
            .into_par_iter()
            .map(|(r, x, y, z)| 0.5 * r * (x * x + y * y + z * z))
            .sum()
    }

    pub fn max_velocity(&self) -> f64 {
        let [ux, uy, uz] = &self.fields.velocity;
        (ux.par_iter(), uy.par_iter(), uz.par_iter())
            .into_par_iter()
            .map(|(x, y, z)| (x * x + y * y + z * z).sqrt())
            .reduce(|| 0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhaseParameters;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_split_and_swap() {
        let mut buffers = PopulationBuffers::new(9, 4);
        buffers.set(2, 3, 1.5);
        {
            let (current, next) = buffers.split();
            assert_eq!(current[2 * 4 + 3], 1.5);
            next[2 * 4 + 3] = 2.5;
        }
        assert_eq!(buffers.current_slot(), 0);
        buffers.swap();
        assert_eq!(buffers.current_slot(), 1);
        assert_eq!(buffers.get(2, 3), 2.5);
        assert_eq!(buffers.next()[2 * 4 + 3], 1.5);
    }

    #[test]
    fn test_cell_blocks_cover_every_population_once() {
        let cells = 10;
        let mut buf: Vec<f64> = vec![0.0; 3 * cells];
        {
            let blocks = cell_blocks(&mut buf, cells, 4);
            assert_eq!(blocks.len(), 3);
            assert_eq!(blocks[2].start, 8);
            assert_eq!(blocks[2].len(), 2);
            for mut block in blocks {
                for (i, dir) in block.dirs.iter_mut().enumerate() {
                    for (local, v) in dir.iter_mut().enumerate() {
                        *v += (i * cells + block.start + local) as f64;
                    }
                }
            }
        }
        for (k, v) in buf.iter().enumerate() {
            assert_eq!(*v, k as f64);
        }
    }

    #[test]
    fn test_recompute_from_equilibrium() {
        let lattice = VelocitySet::d2q9();
        let mut state = LatticeState::new(lattice, 6, false);
        for cell in 0..6 {
            state.set_equilibrium(cell, 1.0 + 0.01 * cell as f64, [0.02, -0.01, 0.0]);
        }
        state.recompute(None, None);
        for cell in 0..6 {
            assert_abs_diff_eq!(
                state.fields().density[cell],
                1.0 + 0.01 * cell as f64,
                epsilon = 1e-14
            );
            assert_abs_diff_eq!(state.fields().velocity[0][cell], 0.02, epsilon = 1e-14);
            assert_abs_diff_eq!(state.fields().velocity[1][cell], -0.01, epsilon = 1e-14);
        }
        assert!(state.find_divergence().is_none());

        // Half-force shift
        state.recompute(Some([1e-4, 0.0, 0.0]), None);
        assert_abs_diff_eq!(state.fields().velocity[0][0], 0.02 + 5e-5, epsilon = 1e-14);
    }

    #[test]
    fn test_two_phase_recompute() {
        let lattice = VelocitySet::d2q9();
        let params = PhaseParameters {
            red_density: 1.0,
            blue_density: 0.5,
            ..PhaseParameters::default()
        };
        let model = PhaseModel::new(&lattice, &params);
        let mut state = LatticeState::new(lattice, 3, true);
        state.set_phase_equilibrium(0, &model, 1.0, 0.0, [0.0; 3]);
        state.set_phase_equilibrium(1, &model, 0.0, 0.5, [0.0; 3]);
        state.set_phase_equilibrium(2, &model, 0.5, 0.25, [0.0; 3]);
        state.recompute(None, Some(&model));

        let phase = state.phase().unwrap();
        assert_abs_diff_eq!(phase.red_density[0], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(phase.blue_density[1], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(phase.phase_fraction[0], 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(phase.phase_fraction[1], 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(phase.phase_fraction[2], 0.5, epsilon = 1e-14);
        assert_abs_diff_eq!(state.fields().density[2], 0.75, epsilon = 1e-14);
    }

    #[test]
    fn test_divergence_detected() {
        let mut state = LatticeState::new(VelocitySet::d2q9(), 4, false);
        for cell in 0..4 {
            state.set_equilibrium(cell, 1.0, [0.0; 3]);
        }
        state.components_mut()[0].set(0, 2, f64::NAN);
        state.recompute(None, None);
        let (cell, density) = state.find_divergence().unwrap();
        assert_eq!(cell, 2);
        assert!(density.is_nan());
    }

    #[test]
    fn test_totals() {
        let mut state = LatticeState::new(VelocitySet::d3q19(), 8, false);
        for cell in 0..8 {
            state.set_equilibrium(cell, 2.0, [0.0, 0.0, 0.05]);
        }
        state.recompute(None, None);
        assert_abs_diff_eq!(state.total_mass(), 16.0, epsilon = 1e-12);
        assert_abs_diff_eq!(state.total_momentum().z, 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(state.kinetic_energy(), 8.0 * 0.5 * 2.0 * 0.0025, epsilon = 1e-12);
        assert_abs_diff_eq!(state.max_velocity(), 0.05, epsilon = 1e-14);
    }
}
