//! Error types for lbm-kernel.

use lbm_lattice::LatticeError;
use thiserror::Error;

use crate::geometry::Face;

/// Setup-time configuration problems. Always raised before the first step.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("geometry {field} must be positive, got {value}")]
    NonPositiveGeometry { field: &'static str, value: f64 },

    #[error("{name} = {value} is outside the stable range (0, 2)")]
    UnstableRelaxation { name: &'static str, value: f64 },

    #[error("{name} viscosity must be positive, got {value}")]
    NonPositiveViscosity { name: &'static str, value: f64 },

    #[error("{name} density must be positive, got {value}")]
    NonPositiveDensity { name: String, value: f64 },

    #[error("segregation strength {0} is outside [0, 1]")]
    SegregationOutOfRange(f64),

    #[error("{name} {value} is outside [0, 1]")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("{name} must be non-negative, got {value}")]
    NegativeParameter { name: &'static str, value: f64 },

    #[error("boundary {id}: invalid {axis} bounds [{min}, {max}]")]
    InvalidBounds {
        id: u32,
        axis: char,
        min: f64,
        max: f64,
    },

    #[error("unknown {kind} profile: {value}")]
    UnknownProfile { kind: &'static str, value: String },

    #[error("duplicate boundary id {0}")]
    DuplicateBoundaryId(u32),

    #[error("face {0} is assigned to more than one boundary")]
    FaceAssignedTwice(Face),

    #[error("face {0} has no boundary and its axis is not periodic")]
    UnassignedFace(Face),

    #[error("face {0} lies on a periodic axis and cannot carry a boundary")]
    PeriodicFaceAssigned(Face),

    #[error("face {0} does not exist in a 2D lattice")]
    FaceNotInDimension(Face),

    #[error("axis {axis} has {extent} cells, outlet extrapolation needs at least {required}")]
    GridTooSmall {
        axis: usize,
        extent: usize,
        required: usize,
    },

    #[error("body force configured in both collision and phase parameters")]
    BodyForceConfiguredTwice,

    #[error("lattice error: {0}")]
    Lattice(#[from] LatticeError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of a simulation session.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Unrecoverable instability. The run must be abandoned.
    #[error("divergence at step {step}: cell {cell} has density {density}")]
    Divergence { step: u64, cell: usize, density: f64 },

    #[error("link of direction {direction} into cell {cell} leaves the grid with no boundary rule")]
    GeometryMismatch { cell: usize, direction: usize },

    #[error("operation requires a two-phase session")]
    NotTwoPhase,
}

impl From<LatticeError> for KernelError {
    fn from(err: LatticeError) -> Self {
        KernelError::Config(ConfigError::Lattice(err))
    }
}

pub type Result<T> = std::result::Result<T, KernelError>;
