//! Regular grid indexing.
//!
//! Cell (x, y, z) has linear index `x + nx * (y + ny * z)`; in 2D nz = 1. The
//! physical coordinate of a cell is its centre, `(index + 1/2) * spacing`, so the
//! half-way walls sit exactly on 0 and `extent * spacing`.

use std::fmt;

use lbm_lattice::Dimension;
use serde::{Deserialize, Serialize};

use crate::config::LatticeGeometry;

/// One side of the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Face {
    /// x = 0
    West,
    /// x = nx - 1
    East,
    /// y = 0
    South,
    /// y = ny - 1
    North,
    /// z = 0 (3D only)
    Bottom,
    /// z = nz - 1 (3D only)
    Top,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::West,
        Face::East,
        Face::South,
        Face::North,
        Face::Bottom,
        Face::Top,
    ];

    /// Axis normal to the face.
    pub fn axis(self) -> usize {
        match self {
            Face::West | Face::East => 0,
            Face::South | Face::North => 1,
            Face::Bottom | Face::Top => 2,
        }
    }

    /// Whether the face sits at the upper end of its axis.
    pub fn is_upper(self) -> bool {
        matches!(self, Face::East | Face::North | Face::Top)
    }

    pub fn from_axis(axis: usize, upper: bool) -> Face {
        match (axis, upper) {
            (0, false) => Face::West,
            (0, true) => Face::East,
            (1, false) => Face::South,
            (1, true) => Face::North,
            (_, false) => Face::Bottom,
            (_, true) => Face::Top,
        }
    }

    pub fn in_dimension(self, dimension: Dimension) -> bool {
        self.axis() < dimension.axes()
    }

    /// Unit offset pointing from the face into the domain.
    pub fn inward(self) -> [i32; 3] {
        let mut n = [0; 3];
        n[self.axis()] = if self.is_upper() { -1 } else { 1 };
        n
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Face::West => "west",
            Face::East => "east",
            Face::South => "south",
            Face::North => "north",
            Face::Bottom => "bottom",
            Face::Top => "top",
        };
        f.write_str(name)
    }
}

/// Cell layout of a validated geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    dimension: Dimension,
    dims: [usize; 3],
    spacing: f64,
    periodic: [bool; 3],
}

impl Grid {
    /// Build the layout. `geometry` is expected to have passed validation.
    pub fn new(dimension: Dimension, geometry: &LatticeGeometry) -> Self {
        let (nz, periodic_z) = match dimension {
            Dimension::D2 => (1, false),
            Dimension::D3 => (geometry.height.unwrap_or(1), geometry.periodic[2]),
        };
        Self {
            dimension,
            dims: [geometry.length, geometry.depth, nz],
            spacing: geometry.spacing,
            periodic: [geometry.periodic[0], geometry.periodic[1], periodic_z],
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    #[inline]
    pub fn extent(&self, axis: usize) -> usize {
        self.dims[axis]
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    #[inline]
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.periodic[axis]
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dims[0] * (y + self.dims[1] * z)
    }

    #[inline]
    pub fn coords(&self, cell: usize) -> [usize; 3] {
        let x = cell % self.dims[0];
        let rest = cell / self.dims[0];
        [x, rest % self.dims[1], rest / self.dims[1]]
    }

    /// Neighbour at `coords + offset`; wraps periodic axes, `None` outside the grid.
    pub fn neighbor(&self, coords: [usize; 3], offset: [i32; 3]) -> Option<usize> {
        let mut p = [0usize; 3];
        for axis in 0..3 {
            let n = self.dims[axis] as i64;
            let v = coords[axis] as i64 + offset[axis] as i64;
            p[axis] = if (0..n).contains(&v) {
                v as usize
            } else if self.periodic[axis] {
                v.rem_euclid(n) as usize
            } else {
                return None;
            };
        }
        Some(self.index(p[0], p[1], p[2]))
    }

    /// Neighbour at `coords + offset`; wraps periodic axes and clamps to the edge
    /// cell otherwise.
    pub fn neighbor_clamped(&self, coords: [usize; 3], offset: [i32; 3]) -> usize {
        let mut p = [0usize; 3];
        for axis in 0..3 {
            let n = self.dims[axis] as i64;
            let v = coords[axis] as i64 + offset[axis] as i64;
            p[axis] = if self.periodic[axis] {
                v.rem_euclid(n) as usize
            } else {
                v.clamp(0, n - 1) as usize
            };
        }
        self.index(p[0], p[1], p[2])
    }

    /// Physical coordinate of a cell centre.
    pub fn position(&self, coords: [usize; 3]) -> [f64; 3] {
        let mut p = [0.0; 3];
        for axis in 0..self.dimension.axes() {
            p[axis] = (coords[axis] as f64 + 0.5) * self.spacing;
        }
        p
    }

    /// Physical size of the domain along each axis (zero for z in 2D).
    pub fn physical_extent(&self) -> [f64; 3] {
        let mut e = [0.0; 3];
        for axis in 0..self.dimension.axes() {
            e[axis] = self.dims[axis] as f64 * self.spacing;
        }
        e
    }

    pub fn on_face(&self, coords: [usize; 3], face: Face) -> bool {
        let axis = face.axis();
        if axis >= self.dimension.axes() {
            return false;
        }
        if face.is_upper() {
            coords[axis] == self.dims[axis] - 1
        } else {
            coords[axis] == 0
        }
    }

    /// Faces that exist in this dimensionality.
    pub fn faces(&self) -> impl Iterator<Item = Face> + '_ {
        Face::ALL
            .into_iter()
            .filter(|f| f.in_dimension(self.dimension))
    }

    /// Linear indices of every cell on a face.
    pub fn face_cells(&self, face: Face) -> Vec<usize> {
        (0..self.cell_count())
            .filter(|&cell| self.on_face(self.coords(cell), face))
            .collect()
    }
}
