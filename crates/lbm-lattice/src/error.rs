//! Error types for lbm-lattice.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LatticeError {
    #[error("unsupported dimensionality: {0} (expected 2 or 3)")]
    UnsupportedDimension(usize),

    #[error("moment matrix for the {dimension}D velocity set is singular")]
    SingularMomentMatrix { dimension: usize },
}

pub type Result<T> = std::result::Result<T, LatticeError>;
