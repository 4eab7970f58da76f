//! Spatial dimensionality selector.

use serde::{Deserialize, Serialize};

use crate::error::LatticeError;

/// Number of spatial dimensions of the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub enum Dimension {
    /// Two-dimensional lattice (D2Q9).
    D2,
    /// Three-dimensional lattice (D3Q19).
    D3,
}

impl Dimension {
    /// Number of spatial axes.
    pub fn axes(self) -> usize {
        match self {
            Dimension::D2 => 2,
            Dimension::D3 => 3,
        }
    }

    /// Number of discrete velocities of the matching velocity set.
    pub fn direction_count(self) -> usize {
        match self {
            Dimension::D2 => 9,
            Dimension::D3 => 19,
        }
    }
}

impl TryFrom<usize> for Dimension {
    type Error = LatticeError;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Dimension::D2),
            3 => Ok(Dimension::D3),
            other => Err(LatticeError::UnsupportedDimension(other)),
        }
    }
}

impl From<Dimension> for usize {
    fn from(value: Dimension) -> Self {
        value.axes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_dimensions() {
        assert_eq!(Dimension::try_from(2).unwrap(), Dimension::D2);
        assert_eq!(Dimension::try_from(3).unwrap(), Dimension::D3);
        assert_eq!(Dimension::D3.direction_count(), 19);
    }

    #[test]
    fn test_unsupported_dimension_rejected() {
        assert_eq!(
            Dimension::try_from(1),
            Err(LatticeError::UnsupportedDimension(1))
        );
        assert!(Dimension::try_from(4).is_err());
    }
}
