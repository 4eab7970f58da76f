//! Per-timestep lattice Boltzmann kernel.
//!
//! Single-relaxation-time (BGK) and multiple-relaxation-time (MRT) collision on
//! D2Q9 and D3Q19 lattices, double-buffered streaming, wall/inlet/outlet boundary
//! enforcement and the colour-gradient two-phase extension with surface tension
//! and recolouring.
//!
//! # Example
//!
//! ```
//! use lbm_kernel::{Boundary, Face, LatticeBoltzmann, LatticeGeometry, SimulationConfig};
//! use lbm_lattice::Dimension;
//!
//! // Lid-driven cavity flow
//! let config = SimulationConfig::new(Dimension::D2, LatticeGeometry::new_2d(32, 32))
//!     .boundary(Boundary::wall(0, vec![Face::West, Face::East, Face::South]))
//!     .boundary(Boundary::moving_wall(1, vec![Face::North], [0.05, 0.0, 0.0]));
//!
//! let mut lbm = LatticeBoltzmann::new(config).unwrap();
//! lbm.initialize_uniform(1.0, [0.0; 3]);
//! lbm.run(100).unwrap();
//!
//! let u = lbm.velocity_at(16, 16, 0).unwrap();
//! println!("Center velocity: [{:.4}, {:.4}]", u[0], u[1]);
//! ```

pub mod boundary;
pub mod collision;
pub mod color_gradient;
pub mod config;
pub mod error;
pub mod geometry;
pub mod monitor;
pub mod phase;
pub mod solver;
pub mod state;
pub mod streaming;

pub use boundary::{
    Boundary, BoundaryConfig, BoundaryEnforcer, BoundaryKind, InletProfile, InletSpec,
    OutletProfile, WallKind,
};
pub use collision::CollisionOperator;
pub use color_gradient::ColorGradient;
pub use config::{
    CollisionConfig, CollisionMode, LatticeGeometry, PhaseParameters, SimulationConfig,
    relaxation_frequency,
};
pub use error::{ConfigError, KernelError, Result};
pub use geometry::{Face, Grid};
pub use lbm_lattice::{Dimension, VelocitySet};
pub use monitor::{ConservationMonitor, ConservationState};
pub use phase::PhaseModel;
pub use solver::LatticeBoltzmann;
pub use state::{LatticeState, MacroscopicFields, PhaseFields, PopulationBuffers};
pub use streaming::StreamingOperator;
