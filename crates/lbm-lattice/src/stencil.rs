//! Finite-difference gradient stencils for the colour-gradient model.
//!
//! A stencil approximates ∇φ(x) ≈ Σ_k w_k c_k φ(x + c_k). The base stencil reuses the
//! velocity set with weights 3w_i (second-order isotropic). The isotropic stencils span
//! [-2, 2]^d and are isotropic to eighth order: 25 points in 2D, 105 in 3D.

use crate::dimension::Dimension;
use crate::velocity_set::VelocitySet;

/// 2D shell weights keyed by |c|².
const ISO_2D: [(i32, f64); 5] = [
    (1, 4.0 / 21.0),
    (2, 4.0 / 45.0),
    (4, 1.0 / 60.0),
    (5, 2.0 / 315.0),
    (8, 1.0 / 5040.0),
];

/// 3D shell weights keyed by sorted absolute offset.
const ISO_3D: [([i32; 3], f64); 7] = [
    ([0, 0, 1], 257.0 / 2520.0),
    ([0, 1, 1], 5.0 / 126.0),
    ([1, 1, 1], 1.0 / 42.0),
    ([0, 0, 2], 19.0 / 2520.0),
    ([0, 1, 2], 23.0 / 5040.0),
    ([1, 1, 2], 1.0 / 1260.0),
    ([1, 2, 2], 1.0 / 10080.0),
];

/// Offsets and weights of a gradient stencil.
///
/// The centre point is included with weight zero so offset counts match the
/// conventional 9/19/25/105 sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientStencil {
    offsets: Vec<[i32; 3]>,
    weights: Vec<f64>,
}

impl GradientStencil {
    /// Stencil on the velocity set itself, weights 3w_i.
    pub fn base(lattice: &VelocitySet) -> Self {
        let offsets = lattice.directions().to_vec();
        let weights = lattice.weights().iter().map(|w| 3.0 * w).collect();
        Self { offsets, weights }
    }

    /// Eighth-order isotropic stencil over [-2, 2]^d.
    pub fn isotropic(dimension: Dimension) -> Self {
        let mut offsets = Vec::new();
        let mut weights = Vec::new();
        let z_range = match dimension {
            Dimension::D2 => 0..=0,
            Dimension::D3 => -2..=2,
        };

        for z in z_range {
            for y in -2..=2 {
                for x in -2..=2 {
                    let c = [x, y, z];
                    let weight = match dimension {
                        Dimension::D2 => shell_weight_2d(x * x + y * y),
                        Dimension::D3 => shell_weight_3d(c),
                    };
                    if let Some(w) = weight {
                        offsets.push(c);
                        weights.push(w);
                    }
                }
            }
        }
        Self { offsets, weights }
    }

    /// Stencil for a dimensionality; `higher_order` picks the isotropic variant.
    pub fn for_dimension(dimension: Dimension, higher_order: bool) -> Self {
        if higher_order {
            Self::isotropic(dimension)
        } else {
            Self::base(&VelocitySet::for_dimension(dimension))
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[[i32; 3]] {
        &self.offsets
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Largest per-axis offset (1 for base stencils, 2 for isotropic ones).
    pub fn reach(&self) -> i32 {
        self.offsets
            .iter()
            .flat_map(|c| c.iter().map(|v| v.abs()))
            .max()
            .unwrap_or(0)
    }

    /// Apply the stencil: Σ_k w_k c_k sample(c_k).
    pub fn apply(&self, mut sample: impl FnMut([i32; 3]) -> f64) -> [f64; 3] {
        let mut grad = [0.0; 3];
        for (c, &w) in self.offsets.iter().zip(&self.weights) {
            if w == 0.0 {
                continue;
            }
            let v = w * sample(*c);
            grad[0] += v * c[0] as f64;
            grad[1] += v * c[1] as f64;
            grad[2] += v * c[2] as f64;
        }
        grad
    }
}

fn shell_weight_2d(level: i32) -> Option<f64> {
    if level == 0 {
        return Some(0.0);
    }
    ISO_2D.iter().find(|(l, _)| *l == level).map(|(_, w)| *w)
}

fn shell_weight_3d(c: [i32; 3]) -> Option<f64> {
    let mut key = [c[0].abs(), c[1].abs(), c[2].abs()];
    key.sort_unstable();
    if key == [0, 0, 0] {
        return Some(0.0);
    }
    ISO_3D.iter().find(|(k, _)| *k == key).map(|(_, w)| *w)
}

/// Perturbation weights B_i of the interfacial-tension operator.
///
/// Chosen so that Σ_i B_i = Σ_i w_i (ĝ·c_i)² = 1/3, which makes the perturbation
/// mass-neutral for any gradient direction ĝ.
pub fn perturbation_weights(lattice: &VelocitySet) -> Vec<f64> {
    let by_level: [f64; 3] = match lattice.dimension() {
        Dimension::D2 => [-4.0 / 27.0, 2.0 / 27.0, 5.0 / 108.0],
        Dimension::D3 => [-2.0 / 9.0, 1.0 / 54.0, 1.0 / 27.0],
    };
    (0..lattice.q())
        .map(|i| by_level[lattice.level(i) as usize])
        .collect()
}
