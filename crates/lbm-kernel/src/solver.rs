//! Simulation session: owns the lattice state and runs whole timesteps.
//!
//! One step is
//!
//! ```text
//! collide (+ perturb, recolour) | stream | boundaries | swap | recompute | check | gradient
//! ```
//!
//! with a full barrier between the stages. Collision, streaming, recompute and the
//! gradient are parallel over the grid; boundaries run on the calling thread.

use lbm_lattice::VelocitySet;
use log::{debug, error, info, trace, warn};
use nalgebra::Vector3;

use crate::boundary::{BoundaryEnforcer, BoundaryKind};
use crate::collision::CollisionOperator;
use crate::color_gradient::ColorGradient;
use crate::config::{SimulationConfig, relaxation_frequency};
use crate::error::{KernelError, Result};
use crate::geometry::Grid;
use crate::phase::PhaseModel;
use crate::state::LatticeState;
use crate::streaming::StreamingOperator;

/// ω above which a run is close to the BGK stability limit.
const OMEGA_WARN: f64 = 1.95;
/// Lattice speed above which compressibility errors grow.
const INFLOW_WARN: f64 = 0.1;

#[derive(Debug, Clone)]
struct TwoPhase {
    model: PhaseModel,
    gradient: ColorGradient,
}

/// A lattice Boltzmann simulation in 2D (D2Q9) or 3D (D3Q19).
#[derive(Debug, Clone)]
pub struct LatticeBoltzmann {
    config: SimulationConfig,
    lattice: VelocitySet,
    grid: Grid,
    state: LatticeState,
    collision: CollisionOperator,
    streaming: StreamingOperator,
    boundaries: BoundaryEnforcer,
    two_phase: Option<TwoPhase>,
    body_force: Option<[f64; 3]>,
    steps: u64,
}

impl LatticeBoltzmann {
    /// Validate `config` and build every operator.
    ///
    /// The populations start at zero; call one of the `initialize_*` methods before
    /// stepping.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let lattice = VelocitySet::for_dimension(config.dimensions);
        let grid = Grid::new(config.dimensions, &config.geometry);
        let body_force = config.body_force();
        let collision = CollisionOperator::new(&lattice, &config.collision, body_force)?;
        let streaming = StreamingOperator::new(&lattice, &grid);
        let boundaries = BoundaryEnforcer::new(&grid, &lattice, &config.boundaries)?;
        let two_phase = config.two_phase.as_ref().map(|params| TwoPhase {
            model: PhaseModel::new(&lattice, params),
            gradient: ColorGradient::new(&lattice, params),
        });
        let state = LatticeState::new(lattice.clone(), grid.cell_count(), two_phase.is_some());

        let [nx, ny, nz] = grid.dims();
        info!(
            "lattice Boltzmann session: {nx}x{ny}x{nz} cells, D{}Q{}, {:?}, omega = {:.4}{}",
            config.dimensions.axes(),
            lattice.q(),
            collision.mode(),
            collision.omega(),
            if two_phase.is_some() { ", two-phase" } else { "" }
        );

        let mut omegas = vec![("omega", collision.omega())];
        if let Some(params) = &config.two_phase {
            omegas.push(("red omega", relaxation_frequency(params.red_viscosity)));
            omegas.push(("blue omega", relaxation_frequency(params.blue_viscosity)));
        }
        for (name, omega) in omegas {
            if omega > OMEGA_WARN {
                warn!("{name} = {omega:.4} is close to the stability limit of 2");
            }
        }
        for boundary in config.boundaries.iter() {
            if let BoundaryKind::Inlet(spec) = &boundary.kind {
                let speed = spec.velocity.iter().map(|v| v * v).sum::<f64>().sqrt();
                if speed > INFLOW_WARN {
                    warn!(
                        "inlet {} speed {speed:.4} exceeds {INFLOW_WARN}; compressibility errors will grow",
                        boundary.id
                    );
                }
            }
        }

        Ok(Self {
            config,
            lattice,
            grid,
            state,
            collision,
            streaming,
            boundaries,
            two_phase,
            body_force,
            steps: 0,
        })
    }

    /// Fill every cell with the equilibrium of (ρ, u). Two-phase sessions are filled
    /// with blue fluid.
    pub fn initialize_uniform(&mut self, rho: f64, u: [f64; 3]) {
        self.initialize_with(|_| (rho, u));
    }

    /// Fill every cell with the equilibrium of `init(position)`, where position is
    /// the physical cell centre.
    pub fn initialize_with(&mut self, init: impl Fn([f64; 3]) -> (f64, [f64; 3])) {
        for cell in 0..self.grid.cell_count() {
            let (rho, u) = init(self.grid.position(self.grid.coords(cell)));
            self.state.set_equilibrium(cell, rho, u);
        }
        self.steps = 0;
        self.refresh();
    }

    /// Place a red disk (2D) or sphere (3D) of the configured radius at the domain
    /// centre, surrounded by blue fluid at rest.
    pub fn initialize_droplet(&mut self) -> Result<()> {
        let params = self
            .config
            .two_phase
            .clone()
            .ok_or(KernelError::NotTwoPhase)?;
        let extent = self.grid.physical_extent();
        let centre = extent.map(|e| 0.5 * e);
        debug!("droplet of radius {} at {centre:?}", params.radius);

        self.initialize_phase(|p| {
            let r2: f64 = (0..3).map(|a| (p[a] - centre[a]).powi(2)).sum();
            if r2 < params.radius * params.radius {
                (params.red_density, 0.0, [0.0; 3])
            } else {
                (0.0, params.blue_density, [0.0; 3])
            }
        })
    }

    /// Fill every cell from `init(position) -> (ρ_red, ρ_blue, u)`.
    pub fn initialize_phase(
        &mut self,
        init: impl Fn([f64; 3]) -> (f64, f64, [f64; 3]),
    ) -> Result<()> {
        let phase = self.two_phase.as_ref().ok_or(KernelError::NotTwoPhase)?;
        for cell in 0..self.grid.cell_count() {
            let (rho_red, rho_blue, u) = init(self.grid.position(self.grid.coords(cell)));
            self.state
                .set_phase_equilibrium(cell, &phase.model, rho_red, rho_blue, u);
        }
        self.steps = 0;
        self.refresh();
        Ok(())
    }

    /// Advance one timestep.
    ///
    /// Returns [`KernelError::Divergence`] when any cell ends the step with a
    /// non-positive or non-finite density; the state is then unusable.
    pub fn step(&mut self) -> Result<()> {
        match &self.two_phase {
            Some(phase) => {
                self.collision
                    .collide_two_phase(&mut self.state, &phase.model, &phase.gradient)?
            }
            None => self.collision.collide(&mut self.state),
        }

        for buffers in self.state.components_mut() {
            self.streaming.stream(buffers);
        }
        self.boundaries.enforce(&mut self.state);
        self.state.swap();
        self.steps += 1;

        self.state
            .recompute(self.body_force, self.two_phase.as_ref().map(|p| &p.model));
        if let Some((cell, density)) = self.state.find_divergence() {
            error!(
                "divergence at step {}: cell {cell} {:?} has density {density}",
                self.steps,
                self.grid.coords(cell)
            );
            return Err(KernelError::Divergence {
                step: self.steps,
                cell,
                density,
            });
        }
        self.update_gradient();

        trace!(
            "step {}: mass = {:.6e}, max |u| = {:.4e}",
            self.steps,
            self.state.total_mass(),
            self.state.max_velocity()
        );
        Ok(())
    }

    /// Advance `n` timesteps, stopping at the first error.
    pub fn run(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        debug!("completed {} steps", self.steps);
        Ok(())
    }

    fn refresh(&mut self) {
        self.state
            .recompute(self.body_force, self.two_phase.as_ref().map(|p| &p.model));
        self.update_gradient();
    }

    fn update_gradient(&mut self) {
        if let Some(phase) = &self.two_phase {
            if let Some(fields) = self.state.phase_mut() {
                phase.gradient.update(&self.grid, fields);
            }
        }
    }

    // Outputs

    pub fn density(&self) -> &[f64] {
        &self.state.fields().density
    }

    /// One velocity component over the grid (axis 0, 1 or 2).
    pub fn velocity(&self, axis: usize) -> &[f64] {
        &self.state.fields().velocity[axis]
    }

    /// Red phase fraction per cell.
    pub fn phase_fraction(&self) -> Result<&[f64]> {
        self.state
            .phase()
            .map(|p| p.phase_fraction.as_slice())
            .ok_or(KernelError::NotTwoPhase)
    }

    pub fn density_at(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        self.cell_index(x, y, z)
            .map(|cell| self.state.fields().density[cell])
    }

    pub fn velocity_at(&self, x: usize, y: usize, z: usize) -> Option<[f64; 3]> {
        self.cell_index(x, y, z)
            .map(|cell| self.state.fields().velocity_at(cell))
    }

    fn cell_index(&self, x: usize, y: usize, z: usize) -> Option<usize> {
        let [nx, ny, nz] = self.grid.dims();
        (x < nx && y < ny && z < nz).then(|| self.grid.index(x, y, z))
    }

    pub fn total_mass(&self) -> f64 {
        self.state.total_mass()
    }

    pub fn total_momentum(&self) -> Vector3<f64> {
        self.state.total_momentum()
    }

    /// Σ ρ_red over the grid.
    pub fn red_mass(&self) -> Result<f64> {
        self.state
            .phase()
            .map(|p| p.red_density.iter().sum())
            .ok_or(KernelError::NotTwoPhase)
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.state.kinetic_energy()
    }

    pub fn max_velocity(&self) -> f64 {
        self.state.max_velocity()
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn boundary_id_at(&self, cell: usize) -> Option<u32> {
        self.boundaries.boundary_id_at(cell)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn lattice(&self) -> &VelocitySet {
        &self.lattice
    }

    pub fn state(&self) -> &LatticeState {
        &self.state
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn boundaries(&self) -> &BoundaryEnforcer {
        &self.boundaries
    }

    pub fn collision(&self) -> &CollisionOperator {
        &self.collision
    }

    pub fn phase_model(&self) -> Option<&PhaseModel> {
        self.two_phase.as_ref().map(|p| &p.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{Boundary, BoundaryConfig};
    use crate::config::{CollisionConfig, CollisionMode, LatticeGeometry, PhaseParameters};
    use crate::geometry::Face;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use lbm_lattice::Dimension;

    fn cavity(nx: usize, ny: usize, lid: f64) -> LatticeBoltzmann {
        let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(nx, ny))
            .boundary(Boundary::wall(0, vec![Face::West, Face::East, Face::South]))
            .boundary(Boundary::moving_wall(1, vec![Face::North], [lid, 0.0, 0.0]));
        LatticeBoltzmann::new(config).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(8, 8))
            .collision(CollisionConfig::new(CollisionMode::Bgk, -0.1))
            .boundaries(BoundaryConfig::enclosed(Dimension::D2));
        assert!(matches!(
            LatticeBoltzmann::new(config),
            Err(KernelError::Config(_))
        ));
    }

    #[test]
    fn test_initialize_uniform() {
        let mut lb = cavity(10, 8, 0.0);
        lb.initialize_uniform(1.2, [0.01, 0.0, 0.0]);
        assert_eq!(lb.steps(), 0);
        assert_abs_diff_eq!(lb.density_at(3, 4, 0).unwrap(), 1.2, epsilon = 1e-14);
        assert_abs_diff_eq!(lb.velocity_at(3, 4, 0).unwrap()[0], 0.01, epsilon = 1e-14);
        assert_relative_eq!(lb.total_mass(), 1.2 * 80.0, epsilon = 1e-12);
        assert!(lb.density_at(10, 0, 0).is_none());
    }

    #[test]
    fn test_lid_drives_flow() {
        let mut lb = cavity(16, 16, 0.05);
        lb.initialize_uniform(1.0, [0.0; 3]);
        let mass = lb.total_mass();
        lb.run(200).unwrap();

        assert_eq!(lb.steps(), 200);
        assert!(lb.kinetic_energy() > 0.0);
        // The top row follows the lid
        assert!(lb.velocity_at(8, 15, 0).unwrap()[0] > 0.0);
        // Lid corners exchange a little mass with the stationary side walls
        assert_relative_eq!(lb.total_mass(), mass, max_relative = 1e-3);
    }

    #[test]
    fn test_two_phase_only_operations() {
        let mut lb = cavity(8, 8, 0.0);
        assert!(matches!(lb.initialize_droplet(), Err(KernelError::NotTwoPhase)));
        assert!(matches!(lb.phase_fraction(), Err(KernelError::NotTwoPhase)));
        assert!(matches!(lb.red_mass(), Err(KernelError::NotTwoPhase)));
    }

    #[test]
    fn test_droplet_initialisation() {
        let params = PhaseParameters {
            radius: 4.0,
            ..PhaseParameters::default()
        };
        let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(16, 16))
            .boundaries(BoundaryConfig::enclosed(Dimension::D2))
            .two_phase(params);
        let mut lb = LatticeBoltzmann::new(config).unwrap();
        lb.initialize_droplet().unwrap();

        let fraction = lb.phase_fraction().unwrap();
        let grid = lb.grid();
        assert_eq!(fraction[grid.index(8, 8, 0)], 1.0);
        assert_eq!(fraction[grid.index(0, 0, 0)], 0.0);
        let red_cells = fraction.iter().filter(|&&f| f > 0.5).count();
        // Cells whose centre lies within radius 4 of (8, 8)
        assert_eq!(red_cells, 52);
        assert_relative_eq!(lb.red_mass().unwrap(), 52.0, epsilon = 1e-12);
    }

    #[test]
    fn test_boundary_ids_exposed() {
        let lb = cavity(6, 5, 0.02);
        let grid = lb.grid();
        assert_eq!(lb.boundary_id_at(grid.index(3, 4, 0)), Some(1));
        assert_eq!(lb.boundary_id_at(grid.index(0, 2, 0)), Some(0));
        // Top corners belong to the stationary side walls
        assert_eq!(lb.boundary_id_at(grid.index(0, 4, 0)), Some(0));
        assert_eq!(lb.boundary_id_at(grid.index(2, 2, 0)), None);
    }
}
