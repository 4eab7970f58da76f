//! Lattice constants for lattice Boltzmann solvers.
//!
//! Provides the D2Q9 and D3Q19 discrete velocity sets, the multiple-relaxation-time
//! moment transforms built on them, and the isotropic finite-difference stencils used
//! by the colour-gradient two-phase model.
//!
//! # Example
//!
//! ```
//! use lbm_lattice::{Dimension, MomentTransform, VelocitySet};
//!
//! let lattice = VelocitySet::for_dimension(Dimension::D2);
//! assert_eq!(lattice.q(), 9);
//!
//! // Relaxation frequency for ν = 0.1
//! let omega = 1.0 / (3.0 * 0.1 + 0.5);
//! let mrt = MomentTransform::new(&lattice, omega, MomentTransform::magic_omega_a(omega)).unwrap();
//! assert_eq!(mrt.q(), 9);
//! ```

pub mod dimension;
pub mod error;
pub mod moments;
pub mod stencil;
pub mod velocity_set;

pub use dimension::Dimension;
pub use error::{LatticeError, Result};
pub use moments::{MomentKind, MomentTransform};
pub use stencil::{GradientStencil, perturbation_weights};
pub use velocity_set::VelocitySet;

/// Lattice sound speed: c_s = 1/sqrt(3)
pub const C_S: f64 = 0.577350269189626;

/// Lattice sound speed squared
pub const C_S_SQ: f64 = 1.0 / 3.0;

/// Largest direction count of any supported velocity set.
pub const MAX_Q: usize = 19;
