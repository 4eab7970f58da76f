//! Boundary enforcement after streaming.
//!
//! At setup every population that streaming could not fill (its source lies off
//! the grid on a non-periodic axis) becomes a [`Link`]. A link is owned by the
//! boundary of the face it crosses; corner links that cross several faces go to the
//! wall first, then the inlet, then the outlet. Links are grouped per boundary and
//! applied in that priority order, so outlet extrapolation already sees completed
//! wall populations in its interior neighbour.
//!
//! Every outlet rebuilds its links by non-equilibrium extrapolation. A pressure outlet
//! imposes its ambient density. The extrapolating outlets carry the interior mass flux
//! across the face at zero gradient and close the boundary density from the cell's
//! own known populations, ρ_b = Σ_{c·n=0} f + 2 Σ_{c·n>0} f − j·n, so the mass that
//! leaves matches the mass that arrives.

use lbm_lattice::VelocitySet;
use log::debug;

use super::profile::{
    Boundary, BoundaryConfig, BoundaryKind, InletProfile, OutletProfile, WallKind,
};
use crate::error::{KernelError, Result};
use crate::geometry::{Face, Grid};
use crate::state::LatticeState;

/// How one missing population is rebuilt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkRule {
    /// f_i = f*_opp.
    BounceBack,
    /// f_i = f*_opp + ρ_k · weight, weight = 6 w_i c_i·u_w.
    MovingWall { weight: f64 },
    /// f_i = f*_opp + share_k · momentum, momentum = 6 w_i ρ_in c_i·u(x).
    Inlet { momentum: f64 },
    /// Non-equilibrium extrapolation to an ambient density.
    Pressure { density: f64, neighbor: usize },
    /// Zero-gradient mass flux with the neighbour's non-equilibrium part.
    FirstOrder { neighbor: usize, normal: [i32; 3] },
    /// Zero-gradient mass flux with linearly extrapolated non-equilibrium part.
    SecondOrder {
        neighbor: usize,
        second: usize,
        normal: [i32; 3],
    },
}

/// Mixture moments behind one outlet link, gathered before any component is
/// modified.
#[derive(Debug, Clone, Copy, Default)]
struct Closure {
    neighbor: (f64, [f64; 3]),
    second: (f64, [f64; 3]),
    /// Density and velocity imposed on the boundary cell.
    target: (f64, [f64; 3]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub cell: usize,
    pub direction: usize,
    pub rule: LinkRule,
}

#[derive(Debug, Clone)]
struct LinkGroup {
    id: u32,
    priority: u8,
    red_fraction: f64,
    outlet: bool,
    links: Vec<Link>,
}

#[derive(Debug, Clone)]
pub struct BoundaryEnforcer {
    lattice: VelocitySet,
    cells: usize,
    groups: Vec<LinkGroup>,
    cell_ids: Vec<Option<u32>>,
}

impl BoundaryEnforcer {
    /// Resolve every off-grid link against `config`.
    ///
    /// Fails with [`KernelError::GeometryMismatch`] when a link crosses a face that
    /// no boundary owns.
    pub fn new(grid: &Grid, lattice: &VelocitySet, config: &BoundaryConfig) -> Result<Self> {
        let mut groups: Vec<LinkGroup> = config
            .iter()
            .map(|b| LinkGroup {
                id: b.id,
                priority: b.kind.priority(),
                red_fraction: match &b.kind {
                    BoundaryKind::Inlet(spec) => spec.red_fraction,
                    _ => 1.0,
                },
                outlet: matches!(b.kind, BoundaryKind::Outlet(_)),
                links: Vec::new(),
            })
            .collect();
        groups.sort_by_key(|g| (g.priority, g.id));

        let extent = grid.physical_extent();
        let dims = grid.dims();
        let axes = grid.dimension().axes();
        let mut cell_ids = vec![None; grid.cell_count()];

        for cell in 0..grid.cell_count() {
            let coords = grid.coords(cell);
            let on_edge = (0..axes).any(|a| {
                !grid.is_periodic(a) && (coords[a] == 0 || coords[a] == dims[a] - 1)
            });
            if !on_edge {
                continue;
            }

            for i in 1..lattice.q() {
                let c = lattice.c(i);
                let mut crossed: Vec<Face> = Vec::new();
                for axis in 0..axes {
                    if grid.is_periodic(axis) {
                        continue;
                    }
                    let source = coords[axis] as i64 - c[axis] as i64;
                    if source < 0 {
                        crossed.push(Face::from_axis(axis, false));
                    } else if source >= dims[axis] as i64 {
                        crossed.push(Face::from_axis(axis, true));
                    }
                }
                if crossed.is_empty() {
                    continue;
                }

                let mut owner: Option<((u8, u32), &Boundary, Face)> = None;
                for &face in &crossed {
                    let boundary = config
                        .for_face(face)
                        .ok_or(KernelError::GeometryMismatch { cell, direction: i })?;
                    let key = (boundary.kind.priority(), boundary.id);
                    if owner.is_none_or(|(best, _, _)| key < best) {
                        owner = Some((key, boundary, face));
                    }
                }
                let Some(((_, id), boundary, face)) = owner else {
                    continue;
                };

                let inward = face.inward();
                let normal = inward.map(|v| -v);
                let step = |n: i32| grid.neighbor(coords, inward.map(|v| v * n));
                let mismatch = || KernelError::GeometryMismatch { cell, direction: i };

                let rule = match &boundary.kind {
                    BoundaryKind::Wall(WallKind::Stationary) => LinkRule::BounceBack,
                    BoundaryKind::Wall(WallKind::Moving { velocity }) => LinkRule::MovingWall {
                        weight: 6.0 * lattice.weight(i) * lattice.dot(i, *velocity),
                    },
                    BoundaryKind::Inlet(spec) if spec.profile == InletProfile::Disabled => {
                        LinkRule::BounceBack
                    }
                    BoundaryKind::Inlet(spec) => {
                        let u = spec.velocity_at(grid.position(coords), extent, grid.dimension());
                        LinkRule::Inlet {
                            momentum: 6.0 * lattice.weight(i) * spec.density * lattice.dot(i, u),
                        }
                    }
                    BoundaryKind::Outlet(OutletProfile::Pressure { density }) => {
                        LinkRule::Pressure {
                            density: *density,
                            neighbor: step(1).ok_or_else(mismatch)?,
                        }
                    }
                    BoundaryKind::Outlet(OutletProfile::FirstOrder) => LinkRule::FirstOrder {
                        neighbor: step(1).ok_or_else(mismatch)?,
                        normal,
                    },
                    BoundaryKind::Outlet(OutletProfile::SecondOrder) => LinkRule::SecondOrder {
                        neighbor: step(1).ok_or_else(mismatch)?,
                        second: step(2).ok_or_else(mismatch)?,
                        normal,
                    },
                };

                if let Some(group) = groups.iter_mut().find(|g| g.id == id) {
                    group.links.push(Link {
                        cell,
                        direction: i,
                        rule,
                    });
                }
            }
        }

        // A cell reports the highest-priority boundary among its links
        for group in &groups {
            for link in &group.links {
                cell_ids[link.cell].get_or_insert(group.id);
            }
        }

        for group in &groups {
            debug!("boundary {}: {} links", group.id, group.links.len());
        }

        Ok(Self {
            lattice: lattice.clone(),
            cells: grid.cell_count(),
            groups,
            cell_ids,
        })
    }

    /// Apply every boundary to the next slot of `state`.
    ///
    /// Must run after streaming and before the buffers swap.
    pub fn enforce(&self, state: &mut LatticeState) {
        for group in &self.groups {
            self.apply_group(group, state);
        }
    }

    /// Apply one boundary. Unknown ids leave the state untouched.
    pub fn apply_boundary(&self, id: u32, state: &mut LatticeState) {
        if let Some(group) = self.groups.iter().find(|g| g.id == id) {
            self.apply_group(group, state);
        }
    }

    /// Id of the boundary that rebuilds populations of `cell`, if any.
    pub fn boundary_id_at(&self, cell: usize) -> Option<u32> {
        self.cell_ids.get(cell).copied().flatten()
    }

    pub fn links(&self, id: u32) -> &[Link] {
        self.groups
            .iter()
            .find(|g| g.id == id)
            .map_or(&[], |g| g.links.as_slice())
    }

    pub fn link_count(&self) -> usize {
        self.groups.iter().map(|g| g.links.len()).sum()
    }

    fn apply_group(&self, group: &LinkGroup, state: &mut LatticeState) {
        let lattice = &self.lattice;
        let cells = self.cells;
        let q = lattice.q();

        let closures: Vec<Closure> = if group.outlet {
            group.links.iter().map(|link| self.closure(link, state)).collect()
        } else {
            Vec::new()
        };

        let two_phase = state.is_two_phase();
        for k in 0..state.components().len() {
            let share = match (two_phase, k) {
                (false, _) => 1.0,
                (true, 0) => group.red_fraction,
                (true, _) => 1.0 - group.red_fraction,
            };
            let (buffers, density) = state.component_parts(k);
            let (current, next) = buffers.split();

            // Component density and non-equilibrium part of population i at a neighbour
            let non_equilibrium = |i: usize, cell: usize, (rho, u): (f64, [f64; 3])| {
                let rho_k: f64 = (0..q).map(|d| next[d * cells + cell]).sum();
                let neq = next[i * cells + cell] - lattice.equilibrium(i, rho_k, u);
                let fraction = if rho > 0.0 { rho_k / rho } else { 0.0 };
                (fraction, neq)
            };

            let mut values = Vec::with_capacity(group.links.len());
            for (l, link) in group.links.iter().enumerate() {
                let i = link.direction;
                let reflected = current[lattice.opposite(i) * cells + link.cell];
                let value = match link.rule {
                    LinkRule::BounceBack => reflected,
                    LinkRule::MovingWall { weight } => reflected + weight * density[link.cell],
                    LinkRule::Inlet { momentum } => reflected + share * momentum,
                    LinkRule::Pressure { neighbor, .. } | LinkRule::FirstOrder { neighbor, .. } => {
                        let closure = closures[l];
                        let (fraction, neq) = non_equilibrium(i, neighbor, closure.neighbor);
                        let (rho_b, u_b) = closure.target;
                        lattice.equilibrium(i, fraction * rho_b, u_b) + neq
                    }
                    LinkRule::SecondOrder {
                        neighbor, second, ..
                    } => {
                        let closure = closures[l];
                        let (fraction, neq) = non_equilibrium(i, neighbor, closure.neighbor);
                        let (_, neq_second) = non_equilibrium(i, second, closure.second);
                        let (rho_b, u_b) = closure.target;
                        lattice.equilibrium(i, fraction * rho_b, u_b) + 2.0 * neq - neq_second
                    }
                };
                values.push(value);
            }

            for (link, value) in group.links.iter().zip(values) {
                next[link.direction * cells + link.cell] = value;
            }
        }
    }

    /// Mixture density and velocity over every component's next slot.
    fn mixture_at(&self, state: &LatticeState, cell: usize) -> (f64, [f64; 3]) {
        let mut rho = 0.0;
        let mut j = [0.0; 3];
        for component in state.components() {
            let next = component.next();
            for i in 0..self.lattice.q() {
                let v = next[i * self.cells + cell];
                let c = self.lattice.c(i);
                rho += v;
                for a in 0..3 {
                    j[a] += v * c[a] as f64;
                }
            }
        }
        let u = if rho > 0.0 { j.map(|v| v / rho) } else { [0.0; 3] };
        (rho, u)
    }

    /// Boundary density from the known populations of `cell` given the normal
    /// mass flux `flux` through the face with outward `normal`.
    fn face_density(&self, state: &LatticeState, cell: usize, normal: [i32; 3], flux: f64) -> f64 {
        let mut sum = 0.0;
        for component in state.components() {
            let next = component.next();
            for i in 0..self.lattice.q() {
                let c = self.lattice.c(i);
                let cn = c[0] * normal[0] + c[1] * normal[1] + c[2] * normal[2];
                let v = next[i * self.cells + cell];
                match cn {
                    0 => sum += v,
                    n if n > 0 => sum += 2.0 * v,
                    _ => {}
                }
            }
        }
        sum - flux
    }

    fn closure(&self, link: &Link, state: &LatticeState) -> Closure {
        let zero_gradient_flux = |neighbor: usize, normal: [i32; 3]| {
            let (rho_n, u_n) = self.mixture_at(state, neighbor);
            let j = u_n.map(|v| rho_n * v);
            let flux = j[0] * normal[0] as f64 + j[1] * normal[1] as f64 + j[2] * normal[2] as f64;
            let rho_b = self.face_density(state, link.cell, normal, flux);
            let target = if rho_b > 0.0 {
                (rho_b, j.map(|v| v / rho_b))
            } else {
                (rho_n, u_n)
            };
            ((rho_n, u_n), target)
        };

        match link.rule {
            LinkRule::Pressure { density, neighbor } => {
                let (rho_n, u_n) = self.mixture_at(state, neighbor);
                Closure {
                    neighbor: (rho_n, u_n),
                    target: (density, u_n),
                    ..Closure::default()
                }
            }
            LinkRule::FirstOrder { neighbor, normal } => {
                let (neighbor, target) = zero_gradient_flux(neighbor, normal);
                Closure {
                    neighbor,
                    target,
                    ..Closure::default()
                }
            }
            LinkRule::SecondOrder {
                neighbor,
                second,
                normal,
            } => {
                let (neighbor, target) = zero_gradient_flux(neighbor, normal);
                Closure {
                    neighbor,
                    second: self.mixture_at(state, second),
                    target,
                }
            }
            _ => Closure::default(),
        }
    }
}
