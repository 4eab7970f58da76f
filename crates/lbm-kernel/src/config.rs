//! Simulation configuration.
//!
//! Everything here is built once at setup and read-only afterwards. [`SimulationConfig::validate`]
//! performs every configuration check so that a session never starts from a bad setup.
//!
//! ```
//! use lbm_kernel::{
//!     BoundaryConfig, CollisionConfig, CollisionMode, LatticeGeometry, SimulationConfig,
//! };
//! use lbm_lattice::Dimension;
//!
//! let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(32, 16))
//!     .collision(CollisionConfig::new(CollisionMode::Mrt, 0.1))
//!     .boundaries(BoundaryConfig::enclosed(Dimension::D2));
//! assert!(config.validate().is_ok());
//! ```

use lbm_lattice::{Dimension, MomentTransform};
use serde::{Deserialize, Serialize};

use crate::boundary::{Boundary, BoundaryConfig};
use crate::error::ConfigError;

/// Relaxation frequency for a kinematic viscosity: ω = 1/(3ν + 1/2).
pub fn relaxation_frequency(viscosity: f64) -> f64 {
    1.0 / (3.0 * viscosity + 0.5)
}

pub(crate) fn check_omega(name: &'static str, omega: f64) -> Result<(), ConfigError> {
    if omega.is_finite() && omega > 0.0 && omega < 2.0 {
        Ok(())
    } else {
        Err(ConfigError::UnstableRelaxation { name, value: omega })
    }
}

fn check_viscosity(
    name: &'static str,
    omega_name: &'static str,
    viscosity: f64,
) -> Result<(), ConfigError> {
    if viscosity.is_finite() && viscosity > 0.0 {
        check_omega(omega_name, relaxation_frequency(viscosity))
    } else {
        Err(ConfigError::NonPositiveViscosity {
            name,
            value: viscosity,
        })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NegativeParameter { name, value })
    }
}

fn default_spacing() -> f64 {
    1.0
}

/// Grid extents in cells, uniform spacing and per-axis periodicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatticeGeometry {
    /// Cells along x.
    pub length: usize,
    /// Cells along y.
    pub depth: usize,
    /// Cells along z (3D only, ignored in 2D).
    #[serde(default)]
    pub height: Option<usize>,
    /// Physical size of one cell.
    #[serde(default = "default_spacing")]
    pub spacing: f64,
    /// Periodic wrap per axis [x, y, z].
    #[serde(default)]
    pub periodic: [bool; 3],
}

impl LatticeGeometry {
    pub fn new_2d(length: usize, depth: usize) -> Self {
        Self {
            length,
            depth,
            height: None,
            spacing: 1.0,
            periodic: [false; 3],
        }
    }

    pub fn new_3d(length: usize, depth: usize, height: usize) -> Self {
        Self {
            height: Some(height),
            ..Self::new_2d(length, depth)
        }
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_periodic(mut self, periodic: [bool; 3]) -> Self {
        self.periodic = periodic;
        self
    }

    /// Extent along an axis, 1 for z in 2D.
    pub fn extent(&self, dimension: Dimension, axis: usize) -> usize {
        match axis {
            0 => self.length,
            1 => self.depth,
            _ if dimension == Dimension::D3 => self.height.unwrap_or(0),
            _ => 1,
        }
    }

    pub fn validate(&self, dimension: Dimension) -> Result<(), ConfigError> {
        let counts = [
            ("length", self.length),
            ("depth", self.depth),
            ("height", self.extent(dimension, 2)),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigError::NonPositiveGeometry {
                    field,
                    value: value as f64,
                });
            }
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return Err(ConfigError::NonPositiveGeometry {
                field: "spacing",
                value: self.spacing,
            });
        }
        Ok(())
    }
}

/// Collision scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionMode {
    /// Single relaxation time.
    #[default]
    Bgk,
    /// Multiple relaxation times in moment space.
    Mrt,
}

/// Collision parameters of a single-phase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollisionConfig {
    #[serde(default)]
    pub mode: CollisionMode,
    /// Kinematic viscosity in lattice units.
    pub viscosity: f64,
    /// Asymmetric relaxation frequency for MRT. Defaults to 8(2-ω)/(8-ω).
    #[serde(default)]
    pub omega_a: Option<f64>,
    /// Constant body acceleration g; the force density is ρg.
    #[serde(default)]
    pub body_force: Option<[f64; 3]>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            mode: CollisionMode::Bgk,
            viscosity: 1.0 / 6.0,
            omega_a: None,
            body_force: None,
        }
    }
}

impl CollisionConfig {
    pub fn new(mode: CollisionMode, viscosity: f64) -> Self {
        Self {
            mode,
            viscosity,
            ..Self::default()
        }
    }

    pub fn with_omega_a(mut self, omega_a: f64) -> Self {
        self.omega_a = Some(omega_a);
        self
    }

    pub fn with_body_force(mut self, g: [f64; 3]) -> Self {
        self.body_force = Some(g);
        self
    }

    pub fn omega(&self) -> f64 {
        relaxation_frequency(self.viscosity)
    }

    pub fn omega_a(&self) -> f64 {
        self.omega_a
            .unwrap_or_else(|| MomentTransform::magic_omega_a(self.omega()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_viscosity("fluid", "omega", self.viscosity)?;
        if let Some(omega_a) = self.omega_a {
            check_omega("omega_a", omega_a)?;
        }
        Ok(())
    }
}

/// Colour-gradient two-phase parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseParameters {
    /// Reference density of the red (droplet) phase.
    pub red_density: f64,
    /// Reference density of the blue (surrounding) phase.
    pub blue_density: f64,
    pub red_viscosity: f64,
    pub blue_viscosity: f64,
    /// Surface-tension coefficient A of the perturbation operator.
    pub surface_tension: f64,
    /// Segregation strength β in [0, 1].
    pub segregation: f64,
    /// Colour-gradient magnitude below which a cell counts as bulk.
    pub sharpness_limit: f64,
    /// Initial droplet radius in physical units.
    pub radius: f64,
    /// Use the 25/105-point isotropic gradient stencil.
    #[serde(default)]
    pub higher_order_gradient: bool,
    /// Constant body acceleration g applied to both phases.
    #[serde(default)]
    pub body_force: Option<[f64; 3]>,
    /// Cancel the density-ratio error stress of the equilibrium. Needs a diffuse
    /// interface; a sharp dense-phase edge amplifies spurious currents.
    #[serde(default)]
    pub ratio_correction: bool,
}

impl Default for PhaseParameters {
    fn default() -> Self {
        Self {
            red_density: 1.0,
            blue_density: 1.0,
            red_viscosity: 1.0 / 6.0,
            blue_viscosity: 1.0 / 6.0,
            surface_tension: 0.01,
            segregation: 0.7,
            sharpness_limit: 1e-6,
            radius: 8.0,
            higher_order_gradient: false,
            body_force: None,
            ratio_correction: false,
        }
    }
}

impl PhaseParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("red", self.red_density), ("blue", self.blue_density)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositiveDensity {
                    name: name.to_string(),
                    value,
                });
            }
        }
        check_viscosity("red", "red omega", self.red_viscosity)?;
        check_viscosity("blue", "blue omega", self.blue_viscosity)?;
        if !(0.0..=1.0).contains(&self.segregation) {
            return Err(ConfigError::SegregationOutOfRange(self.segregation));
        }
        check_non_negative("surface tension", self.surface_tension)?;
        check_non_negative("sharpness limit", self.sharpness_limit)?;
        check_non_negative("radius", self.radius)?;
        Ok(())
    }
}

/// Complete setup of one simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// 2 or 3.
    pub dimensions: Dimension,
    pub geometry: LatticeGeometry,
    #[serde(default)]
    pub collision: CollisionConfig,
    #[serde(default)]
    pub boundaries: BoundaryConfig,
    /// Enables the colour-gradient extension.
    #[serde(default)]
    pub two_phase: Option<PhaseParameters>,
}

impl SimulationConfig {
    pub fn new(dimensions: Dimension, geometry: LatticeGeometry) -> Self {
        Self {
            dimensions,
            geometry,
            collision: CollisionConfig::default(),
            boundaries: BoundaryConfig::default(),
            two_phase: None,
        }
    }

    pub fn collision(mut self, collision: CollisionConfig) -> Self {
        self.collision = collision;
        self
    }

    /// Add one boundary.
    pub fn boundary(mut self, boundary: Boundary) -> Self {
        self.boundaries.push(boundary);
        self
    }

    /// Replace every boundary.
    pub fn boundaries(mut self, boundaries: BoundaryConfig) -> Self {
        self.boundaries = boundaries;
        self
    }

    pub fn two_phase(mut self, params: PhaseParameters) -> Self {
        self.two_phase = Some(params);
        self
    }

    /// Parse and validate a JSON description.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_two_phase(&self) -> bool {
        self.two_phase.is_some()
    }

    /// Body acceleration in effect, from whichever section configures it.
    pub fn body_force(&self) -> Option<[f64; 3]> {
        self.two_phase
            .as_ref()
            .and_then(|p| p.body_force)
            .or(self.collision.body_force)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.geometry.validate(self.dimensions)?;
        self.collision.validate()?;
        if let Some(phase) = &self.two_phase {
            phase.validate()?;
            if phase.body_force.is_some() && self.collision.body_force.is_some() {
                return Err(ConfigError::BodyForceConfiguredTwice);
            }
        }
        self.boundaries.validate(self.dimensions, &self.geometry)
    }
}
