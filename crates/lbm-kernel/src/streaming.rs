//! Propagation of post-collision populations.
//!
//! Streaming is a pure permutation: population i of cell x moves to x + c_i. It is
//! evaluated per destination row by pulling from x - c_i, one direction per task.
//! Destinations whose source lies outside the grid on a non-periodic axis are left
//! for the boundary enforcer.

use lbm_lattice::VelocitySet;
use rayon::prelude::*;

use crate::geometry::Grid;
use crate::state::PopulationBuffers;

#[derive(Debug, Clone)]
pub struct StreamingOperator {
    lattice: VelocitySet,
    grid: Grid,
}

impl StreamingOperator {
    pub fn new(lattice: &VelocitySet, grid: &Grid) -> Self {
        Self {
            lattice: lattice.clone(),
            grid: grid.clone(),
        }
    }

    /// Stream the current slot of `buffers` into its next slot.
    pub fn stream(&self, buffers: &mut PopulationBuffers) {
        let cells = self.grid.cell_count();
        let (current, next) = buffers.split();
        next.par_chunks_mut(cells)
            .enumerate()
            .for_each(|(i, dst)| {
                let src = &current[i * cells..(i + 1) * cells];
                self.stream_direction(self.lattice.c(i), src, dst);
            });
    }

    /// Shift one direction array by `c`.
    pub fn stream_direction(&self, c: [i32; 3], src: &[f64], dst: &mut [f64]) {
        let [nx, ny, nz] = self.grid.dims();
        for z in 0..nz {
            let Some(sz) = self.source(2, z, c[2]) else {
                continue;
            };
            for y in 0..ny {
                let Some(sy) = self.source(1, y, c[1]) else {
                    continue;
                };
                let d0 = self.grid.index(0, y, z);
                let s0 = self.grid.index(0, sy, sz);
                self.shift_row(c[0], &src[s0..s0 + nx], &mut dst[d0..d0 + nx]);
            }
        }
    }

    fn shift_row(&self, cx: i32, src: &[f64], dst: &mut [f64]) {
        let n = src.len();
        let periodic = self.grid.is_periodic(0);
        match cx {
            0 => dst.copy_from_slice(src),
            1 => {
                dst[1..].copy_from_slice(&src[..n - 1]);
                if periodic {
                    dst[0] = src[n - 1];
                }
            }
            -1 => {
                dst[..n - 1].copy_from_slice(&src[1..]);
                if periodic {
                    dst[n - 1] = src[0];
                }
            }
            _ => {
                for (x, d) in dst.iter_mut().enumerate() {
                    if let Some(sx) = self.source(0, x, cx) {
                        *d = src[sx];
                    }
                }
            }
        }
    }

    /// Coordinate that feeds `coord` along `axis`, if any.
    #[inline]
    fn source(&self, axis: usize, coord: usize, c: i32) -> Option<usize> {
        let n = self.grid.extent(axis) as i64;
        let s = coord as i64 - c as i64;
        if (0..n).contains(&s) {
            Some(s as usize)
        } else if self.grid.is_periodic(axis) {
            Some(s.rem_euclid(n) as usize)
        } else {
            None
        }
    }
}
