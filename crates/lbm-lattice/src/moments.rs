//! Multiple-relaxation-time moment transforms.
//!
//! The forward map M projects populations onto an orthogonal polynomial moment basis
//! (Lallemand & Luo for D2Q9, d'Humières et al. for D3Q19). Collision relaxes each
//! moment at its own rate and maps back through M⁻¹:
//!
//! f* = f - M⁻¹ S M (f - f^eq)
//!
//! The product M⁻¹S (the "inverse-relaxed" map) is precomputed for the configured
//! rates; [`MomentTransform::relax_with`] handles rates that vary per cell.

use nalgebra::{DMatrix, DVector};

use crate::MAX_Q;
use crate::dimension::Dimension;
use crate::error::{LatticeError, Result};
use crate::velocity_set::VelocitySet;

/// Physical role of a moment row, which decides its relaxation rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MomentKind {
    /// Mass (conserved).
    Density,
    /// Momentum component (conserved).
    Momentum,
    /// Kinetic energy e (bulk viscosity).
    Energy,
    /// Energy square ε.
    EnergySquare,
    /// Energy flux q (odd, third order).
    EnergyFlux,
    /// Viscous stress components (shear viscosity).
    Stress,
    /// Fourth-order stress companions π (D3Q19).
    StressSquare,
    /// Antisymmetric third-order moments m (D3Q19).
    ThirdOrder,
}

impl MomentKind {
    /// Relaxation rate of this moment for shear frequency ω and asymmetric frequency ω_a.
    ///
    /// Odd non-conserved moments take ω_a, everything else ω. Conserved rows relax at
    /// ω as well so a Guo forcing term injects the full body force.
    #[inline]
    pub fn rate(self, omega: f64, omega_a: f64) -> f64 {
        match self {
            MomentKind::EnergyFlux | MomentKind::ThirdOrder => omega_a,
            _ => omega,
        }
    }
}

/// Forward, inverse and inverse-relaxed moment matrices (row-major, q×q).
#[derive(Debug, Clone)]
pub struct MomentTransform {
    q: usize,
    forward: Vec<f64>,
    inverse: Vec<f64>,
    inverse_relaxed: Vec<f64>,
    kinds: Vec<MomentKind>,
    omega: f64,
    omega_a: f64,
}

impl MomentTransform {
    /// Build the transform for `lattice` with shear frequency `omega` and asymmetric
    /// frequency `omega_a`.
    pub fn new(lattice: &VelocitySet, omega: f64, omega_a: f64) -> Result<Self> {
        let (rows, kinds) = basis(lattice);
        let q = lattice.q();
        debug_assert_eq!(rows.len(), q);
        let m = DMatrix::from_fn(q, q, |k, i| rows[k][i]);
        let m_inv = m
            .clone()
            .try_inverse()
            .ok_or(LatticeError::SingularMomentMatrix {
                dimension: lattice.dimension().axes(),
            })?;

        let s = DVector::from_iterator(q, kinds.iter().map(|k| k.rate(omega, omega_a)));
        let relaxed = &m_inv * DMatrix::from_diagonal(&s);

        Ok(Self {
            q,
            forward: row_major(&m),
            inverse: row_major(&m_inv),
            inverse_relaxed: row_major(&relaxed),
            kinds,
            omega,
            omega_a,
        })
    }

    /// ω_a = 8(2 - ω)/(8 - ω).
    ///
    /// Pairs with ω so that half-way bounce-back places the wall exactly between nodes
    /// for Poiseuille flow.
    pub fn magic_omega_a(omega: f64) -> f64 {
        8.0 * (2.0 - omega) / (8.0 - omega)
    }

    #[inline]
    pub fn q(&self) -> usize {
        self.q
    }

    /// Velocity space → moment space (M).
    pub fn forward(&self) -> &[f64] {
        &self.forward
    }

    /// Moment space → velocity space (M⁻¹).
    pub fn inverse(&self) -> &[f64] {
        &self.inverse
    }

    /// M⁻¹S for the rates the transform was built with.
    pub fn inverse_relaxed(&self) -> &[f64] {
        &self.inverse_relaxed
    }

    pub fn kinds(&self) -> &[MomentKind] {
        &self.kinds
    }

    /// Diagonal of S for the given frequencies.
    pub fn relaxation_rates(&self, omega: f64, omega_a: f64) -> Vec<f64> {
        self.kinds.iter().map(|k| k.rate(omega, omega_a)).collect()
    }

    /// m = M f
    pub fn to_moments(&self, f: &[f64], m: &mut [f64]) {
        for (k, mk) in m.iter_mut().enumerate().take(self.q) {
            let row = &self.forward[k * self.q..(k + 1) * self.q];
            *mk = row.iter().zip(f).map(|(a, b)| a * b).sum();
        }
    }

    /// Relax `f` toward `feq` with the precomputed rates.
    pub fn relax(&self, f: &mut [f64], feq: &[f64]) {
        let q = self.q;
        let mut dm = [0.0; MAX_Q];
        for (k, dmk) in dm.iter_mut().enumerate().take(q) {
            let row = &self.forward[k * q..(k + 1) * q];
            *dmk = (0..q).map(|i| row[i] * (f[i] - feq[i])).sum();
        }
        for (i, fi) in f.iter_mut().enumerate().take(q) {
            let row = &self.inverse_relaxed[i * q..(i + 1) * q];
            *fi -= (0..q).map(|k| row[k] * dm[k]).sum::<f64>();
        }
    }

    /// Relax `f` toward `feq` with per-call frequencies.
    pub fn relax_with(&self, f: &mut [f64], feq: &[f64], omega: f64, omega_a: f64) {
        if omega == self.omega && omega_a == self.omega_a {
            self.relax(f, feq);
            return;
        }
        let q = self.q;
        let mut dm = [0.0; MAX_Q];
        for (k, dmk) in dm.iter_mut().enumerate().take(q) {
            let row = &self.forward[k * q..(k + 1) * q];
            let diff: f64 = (0..q).map(|i| row[i] * (f[i] - feq[i])).sum();
            *dmk = self.kinds[k].rate(omega, omega_a) * diff;
        }
        for (i, fi) in f.iter_mut().enumerate().take(q) {
            let row = &self.inverse[i * q..(i + 1) * q];
            *fi -= (0..q).map(|k| row[k] * dm[k]).sum::<f64>();
        }
    }

    /// Map a velocity-space source through M⁻¹(I - S/2)M in place.
    ///
    /// This is the moment-space form of the Guo forcing prefactor (1 - ω/2).
    pub fn scale_source(&self, source: &mut [f64], omega: f64, omega_a: f64) {
        let q = self.q;
        let mut m = [0.0; MAX_Q];
        for (k, mk) in m.iter_mut().enumerate().take(q) {
            let row = &self.forward[k * q..(k + 1) * q];
            let projected: f64 = row.iter().zip(source.iter()).map(|(a, b)| a * b).sum();
            *mk = (1.0 - 0.5 * self.kinds[k].rate(omega, omega_a)) * projected;
        }
        for (i, si) in source.iter_mut().enumerate().take(q) {
            let row = &self.inverse[i * q..(i + 1) * q];
            *si = (0..q).map(|k| row[k] * m[k]).sum();
        }
    }
}

fn row_major(m: &DMatrix<f64>) -> Vec<f64> {
    (0..m.nrows())
        .flat_map(|r| (0..m.ncols()).map(move |c| m[(r, c)]))
        .collect()
}

/// Evaluate one polynomial of the moment basis on every direction.
fn row(lattice: &VelocitySet, poly: impl Fn(f64, f64, f64) -> f64) -> Vec<f64> {
    lattice
        .directions()
        .iter()
        .map(|c| poly(c[0] as f64, c[1] as f64, c[2] as f64))
        .collect()
}

/// Polynomial rows of M evaluated on every direction, with their kinds.
fn basis(lattice: &VelocitySet) -> (Vec<Vec<f64>>, Vec<MomentKind>) {
    use MomentKind::*;

    let l = lattice;
    let rows: Vec<(MomentKind, Vec<f64>)> = match lattice.dimension() {
        Dimension::D2 => {
            let c2 = |x: f64, y: f64| x * x + y * y;
            vec![
                (Density, row(l, |_, _, _| 1.0)),
                (Energy, row(l, |x, y, _| -4.0 + 3.0 * c2(x, y))),
                (
                    EnergySquare,
                    row(l, |x, y, _| 4.0 - 10.5 * c2(x, y) + 4.5 * c2(x, y) * c2(x, y)),
                ),
                (Momentum, row(l, |x, _, _| x)),
                (EnergyFlux, row(l, |x, y, _| (-5.0 + 3.0 * c2(x, y)) * x)),
                (Momentum, row(l, |_, y, _| y)),
                (EnergyFlux, row(l, |x, y, _| (-5.0 + 3.0 * c2(x, y)) * y)),
                (Stress, row(l, |x, y, _| x * x - y * y)),
                (Stress, row(l, |x, y, _| x * y)),
            ]
        }
        Dimension::D3 => {
            let c2 = |x: f64, y: f64, z: f64| x * x + y * y + z * z;
            vec![
                (Density, row(l, |_, _, _| 1.0)),
                (Energy, row(l, |x, y, z| 19.0 * c2(x, y, z) - 30.0)),
                (
                    EnergySquare,
                    row(l, |x, y, z| {
                        let s = c2(x, y, z);
                        (21.0 * s * s - 53.0 * s + 24.0) / 2.0
                    }),
                ),
                (Momentum, row(l, |x, _, _| x)),
                (EnergyFlux, row(l, |x, y, z| (5.0 * c2(x, y, z) - 9.0) * x)),
                (Momentum, row(l, |_, y, _| y)),
                (EnergyFlux, row(l, |x, y, z| (5.0 * c2(x, y, z) - 9.0) * y)),
                (Momentum, row(l, |_, _, z| z)),
                (EnergyFlux, row(l, |x, y, z| (5.0 * c2(x, y, z) - 9.0) * z)),
                (Stress, row(l, |x, y, z| 3.0 * x * x - c2(x, y, z))),
                (
                    StressSquare,
                    row(l, |x, y, z| {
                        (3.0 * c2(x, y, z) - 5.0) * (3.0 * x * x - c2(x, y, z))
                    }),
                ),
                (Stress, row(l, |_, y, z| y * y - z * z)),
                (
                    StressSquare,
                    row(l, |x, y, z| (3.0 * c2(x, y, z) - 5.0) * (y * y - z * z)),
                ),
                (Stress, row(l, |x, y, _| x * y)),
                (Stress, row(l, |_, y, z| y * z)),
                (Stress, row(l, |x, _, z| x * z)),
                (ThirdOrder, row(l, |x, y, z| x * (y * y - z * z))),
                (ThirdOrder, row(l, |x, y, z| y * (z * z - x * x))),
                (ThirdOrder, row(l, |x, y, z| z * (x * x - y * y))),
            ]
        }
    };

    rows.into_iter().map(|(kind, r)| (r, kind)).unzip()
}
