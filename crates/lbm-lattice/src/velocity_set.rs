//! Discrete velocity sets (D2Q9, D3Q19).
//!
//! D2Q9 directions on the square lattice:
//! ```text
//!   6   2   5
//!    \  |  /
//!   3 - 0 - 1
//!    /  |  \
//!   7   4   8
//! ```
//!
//! D3Q19 directions on the cubic lattice:
//! - 1 rest (0)
//! - 6 face-centered (±x, ±y, ±z), stored as opposite pairs
//! - 12 edge-centered (±x±y, ±x±z, ±y±z), stored as opposite pairs

use crate::dimension::Dimension;

/// D2Q9 discrete velocities: [cx, cy, cz]
const D2Q9_C: [[i32; 3]; 9] = [
    [0, 0, 0],   // 0: rest
    [1, 0, 0],   // 1: east
    [0, 1, 0],   // 2: north
    [-1, 0, 0],  // 3: west
    [0, -1, 0],  // 4: south
    [1, 1, 0],   // 5: northeast
    [-1, 1, 0],  // 6: northwest
    [-1, -1, 0], // 7: southwest
    [1, -1, 0],  // 8: southeast
];

/// D2Q9 weights
const D2Q9_W: [f64; 9] = [
    4.0 / 9.0, // 0: rest
    1.0 / 9.0, // 1-4: cardinal
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 9.0,
    1.0 / 36.0, // 5-8: diagonal
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

/// D2Q9 opposite direction indices
const D2Q9_OPP: [usize; 9] = [0, 3, 4, 1, 2, 7, 8, 5, 6];

/// D3Q19 discrete velocities: [cx, cy, cz]
const D3Q19_C: [[i32; 3]; 19] = [
    [0, 0, 0], // 0: rest
    [1, 0, 0], // 1-6: face
    [-1, 0, 0],
    [0, 1, 0],
    [0, -1, 0],
    [0, 0, 1],
    [0, 0, -1],
    [1, 1, 0], // 7-18: edge
    [-1, -1, 0],
    [1, -1, 0],
    [-1, 1, 0],
    [1, 0, 1],
    [-1, 0, -1],
    [1, 0, -1],
    [-1, 0, 1],
    [0, 1, 1],
    [0, -1, -1],
    [0, 1, -1],
    [0, -1, 1],
];

/// D3Q19 weights
const D3Q19_W: [f64; 19] = [
    1.0 / 3.0,  // 0: rest
    1.0 / 18.0, // 1-6: face
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 18.0,
    1.0 / 36.0, // 7-18: edge
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
    1.0 / 36.0,
];

/// D3Q19 opposite direction indices
const D3Q19_OPP: [usize; 19] = [
    0, 2, 1, 4, 3, 6, 5, 8, 7, 10, 9, 12, 11, 14, 13, 16, 15, 18, 17,
];

/// Direction vectors, weights and opposite map of a lattice.
///
/// Immutable once built; cheap to clone.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocitySet {
    dimension: Dimension,
    c: &'static [[i32; 3]],
    w: &'static [f64],
    opp: &'static [usize],
}

impl VelocitySet {
    /// Nine-velocity 2D set.
    pub fn d2q9() -> Self {
        Self {
            dimension: Dimension::D2,
            c: &D2Q9_C,
            w: &D2Q9_W,
            opp: &D2Q9_OPP,
        }
    }

    /// Nineteen-velocity 3D set.
    pub fn d3q19() -> Self {
        Self {
            dimension: Dimension::D3,
            c: &D3Q19_C,
            w: &D3Q19_W,
            opp: &D3Q19_OPP,
        }
    }

    /// Velocity set matching a dimensionality.
    pub fn for_dimension(dimension: Dimension) -> Self {
        match dimension {
            Dimension::D2 => Self::d2q9(),
            Dimension::D3 => Self::d3q19(),
        }
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Number of discrete directions.
    #[inline]
    pub fn q(&self) -> usize {
        self.c.len()
    }

    /// Direction vector i (z component is zero in 2D).
    #[inline]
    pub fn c(&self, i: usize) -> [i32; 3] {
        self.c[i]
    }

    /// All direction vectors.
    pub fn directions(&self) -> &[[i32; 3]] {
        self.c
    }

    #[inline]
    pub fn weight(&self, i: usize) -> f64 {
        self.w[i]
    }

    pub fn weights(&self) -> &[f64] {
        self.w
    }

    /// Index of the direction pointing the opposite way.
    #[inline]
    pub fn opposite(&self, i: usize) -> usize {
        self.opp[i]
    }

    /// Direction offset level |c_i|².
    #[inline]
    pub fn level(&self, i: usize) -> i32 {
        let c = self.c[i];
        c[0] * c[0] + c[1] * c[1] + c[2] * c[2]
    }

    /// Euclidean length |c_i|.
    #[inline]
    pub fn norm(&self, i: usize) -> f64 {
        (self.level(i) as f64).sqrt()
    }

    /// Projection c_i · v.
    #[inline]
    pub fn dot(&self, i: usize, v: [f64; 3]) -> f64 {
        let c = self.c[i];
        c[0] as f64 * v[0] + c[1] as f64 * v[1] + c[2] as f64 * v[2]
    }

    /// Compute equilibrium distribution f_i^eq.
    ///
    /// f_i^eq = w_i ρ [1 + 3(c_i·u) + 9/2(c_i·u)² - 3/2(u·u)]
    #[inline]
    pub fn equilibrium(&self, i: usize, rho: f64, u: [f64; 3]) -> f64 {
        let cu = self.dot(i, u);
        let uu = u[0] * u[0] + u[1] * u[1] + u[2] * u[2];
        self.w[i] * rho * (1.0 + 3.0 * cu + 4.5 * cu * cu - 1.5 * uu)
    }

    /// Fill `out` with the equilibrium of every direction.
    pub fn equilibrium_into(&self, rho: f64, u: [f64; 3], out: &mut [f64]) {
        for (i, feq) in out.iter_mut().enumerate().take(self.q()) {
            *feq = self.equilibrium(i, rho, u);
        }
    }

    /// Density and momentum Σ f_i c_i of one population vector.
    pub fn moments(&self, f: &[f64]) -> (f64, [f64; 3]) {
        let mut rho = 0.0;
        let mut j = [0.0; 3];
        for (fi, c) in f.iter().zip(self.c) {
            rho += fi;
            j[0] += fi * c[0] as f64;
            j[1] += fi * c[1] as f64;
            j[2] += fi * c[2] as f64;
        }
        (rho, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sets() -> [VelocitySet; 2] {
        [VelocitySet::d2q9(), VelocitySet::d3q19()]
    }

    #[test]
    fn test_opposite_is_involution() {
        for set in sets() {
            assert_eq!(set.opposite(0), 0);
            for i in 0..set.q() {
                assert_eq!(set.opposite(set.opposite(i)), i);
                let c = set.c(i);
                let co = set.c(set.opposite(i));
                assert_eq!([c[0] + co[0], c[1] + co[1], c[2] + co[2]], [0, 0, 0]);
            }
        }
    }

    #[test]
    fn test_weights_sum_to_one() {
        for set in sets() {
            let total: f64 = set.weights().iter().sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_zero_net_momentum_and_isotropy() {
        for set in sets() {
            for a in 0..3 {
                let first: f64 = (0..set.q())
                    .map(|i| set.weight(i) * set.c(i)[a] as f64)
                    .sum();
                assert_abs_diff_eq!(first, 0.0, epsilon = 1e-15);
            }
            // Σ w c_x c_x = c_s² along every active axis
            for a in 0..set.dimension().axes() {
                let second: f64 = (0..set.q())
                    .map(|i| set.weight(i) * (set.c(i)[a] * set.c(i)[a]) as f64)
                    .sum();
                assert_abs_diff_eq!(second, crate::C_S_SQ, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_equilibrium_recovers_moments() {
        let u = [0.05, -0.02, 0.01];
        for set in sets() {
            let u = if set.dimension() == Dimension::D2 {
                [u[0], u[1], 0.0]
            } else {
                u
            };
            let mut feq = vec![0.0; set.q()];
            set.equilibrium_into(1.3, u, &mut feq);
            let (rho, j) = set.moments(&feq);
            assert_abs_diff_eq!(rho, 1.3, epsilon = 1e-13);
            for a in 0..3 {
                assert_abs_diff_eq!(j[a], 1.3 * u[a], epsilon = 1e-13);
            }
        }
    }

    #[test]
    fn test_equilibrium_rest() {
        let set = VelocitySet::d2q9();
        let feq = set.equilibrium(0, 1.0, [0.0; 3]);
        assert_abs_diff_eq!(feq, 4.0 / 9.0, epsilon = 1e-12);
    }
}
