//! Boundary conditions: configuration of walls, inlets and outlets, and the
//! enforcer that rebuilds the populations streaming leaves undefined.

pub mod enforcer;
pub mod profile;

pub use enforcer::{BoundaryEnforcer, Link, LinkRule};
pub use profile::{
    Boundary, BoundaryConfig, BoundaryKind, InletProfile, InletSpec, OutletProfile, WallKind,
};
