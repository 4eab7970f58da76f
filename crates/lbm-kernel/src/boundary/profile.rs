//! Inlet, outlet and wall parameterisation.

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use lbm_lattice::Dimension;
use serde::{Deserialize, Serialize};

use crate::config::LatticeGeometry;
use crate::error::ConfigError;
use crate::geometry::Face;

/// Shape of the prescribed inflow velocity across the inlet face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InletProfile {
    /// Constant velocity between the bounds.
    #[default]
    Uniform,
    /// Poiseuille shape 4s(1 - s) over the bounds (product over Y and Z in 3D).
    Parabolic,
    /// Closed inlet: no inflow, links bounce back.
    Disabled,
}

impl FromStr for InletProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "uniform" => Ok(InletProfile::Uniform),
            "parabolic" => Ok(InletProfile::Parabolic),
            "disabled" | "none" => Ok(InletProfile::Disabled),
            _ => Err(ConfigError::UnknownProfile {
                kind: "inlet",
                value: s.to_string(),
            }),
        }
    }
}

/// Outflow treatment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutletProfile {
    /// Fixed ambient density by non-equilibrium extrapolation from the interior.
    Pressure { density: f64 },
    /// Zero-gradient mass flux; the interior neighbour's non-equilibrium part is
    /// copied and the face density closes on the cell's known populations.
    FirstOrder,
    /// As [`OutletProfile::FirstOrder`] with the non-equilibrium part extrapolated
    /// linearly from the two interior neighbours.
    SecondOrder,
}

impl OutletProfile {
    /// Cells needed along the face normal.
    pub fn required_extent(&self) -> usize {
        match self {
            OutletProfile::Pressure { .. } | OutletProfile::FirstOrder => 2,
            OutletProfile::SecondOrder => 3,
        }
    }
}

impl FromStr for OutletProfile {
    type Err = ConfigError;

    /// `"pressure"` fixes the ambient density at 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pressure" => Ok(OutletProfile::Pressure { density: 1.0 }),
            "first-order" | "zero-gradient" => Ok(OutletProfile::FirstOrder),
            "second-order" => Ok(OutletProfile::SecondOrder),
            _ => Err(ConfigError::UnknownProfile {
                kind: "outlet",
                value: s.to_string(),
            }),
        }
    }
}

/// Solid wall behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WallKind {
    /// Half-way bounce-back.
    #[default]
    Stationary,
    /// Bounce-back with a wall velocity (driven lid).
    Moving { velocity: [f64; 3] },
}

impl FromStr for WallKind {
    type Err = ConfigError;

    /// `"stationary"`, or `"moving:ux,uy[,uz]"`; a moving wall needs its velocity.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigError::UnknownProfile {
            kind: "wall",
            value: s.to_string(),
        };
        let lower = s.trim().to_ascii_lowercase();
        if let Some(components) = lower.strip_prefix("moving:") {
            let parsed = components
                .split(',')
                .map(|v| v.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| unknown())?;
            if !(2..=3).contains(&parsed.len()) || parsed.iter().any(|v| !v.is_finite()) {
                return Err(unknown());
            }
            let mut velocity = [0.0; 3];
            velocity[..parsed.len()].copy_from_slice(&parsed);
            return Ok(WallKind::Moving { velocity });
        }
        match lower.as_str() {
            "stationary" | "no-slip" => Ok(WallKind::Stationary),
            _ => Err(unknown()),
        }
    }
}

fn full_fraction() -> f64 {
    1.0
}

/// Prescribed inflow state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InletSpec {
    #[serde(default)]
    pub profile: InletProfile,
    /// Inflow density.
    pub density: f64,
    /// Peak (parabolic) or constant (uniform) inflow velocity.
    pub velocity: [f64; 3],
    /// Physical Y range the profile spans; defaults to the whole face.
    #[serde(default)]
    pub y_bounds: Option<[f64; 2]>,
    /// Physical Z range (3D); defaults to the whole face.
    #[serde(default)]
    pub z_bounds: Option<[f64; 2]>,
    /// Share of the inflow carried by the red phase in two-phase runs.
    #[serde(default = "full_fraction")]
    pub red_fraction: f64,
}

impl InletSpec {
    pub fn uniform(density: f64, velocity: [f64; 3]) -> Self {
        Self {
            profile: InletProfile::Uniform,
            density,
            velocity,
            y_bounds: None,
            z_bounds: None,
            red_fraction: 1.0,
        }
    }

    pub fn parabolic(density: f64, velocity: [f64; 3]) -> Self {
        Self {
            profile: InletProfile::Parabolic,
            ..Self::uniform(density, velocity)
        }
    }

    pub fn with_y_bounds(mut self, min: f64, max: f64) -> Self {
        self.y_bounds = Some([min, max]);
        self
    }

    pub fn with_z_bounds(mut self, min: f64, max: f64) -> Self {
        self.z_bounds = Some([min, max]);
        self
    }

    pub fn with_red_fraction(mut self, fraction: f64) -> Self {
        self.red_fraction = fraction;
        self
    }

    /// Inflow velocity at a physical position on the inlet face.
    ///
    /// `extent` is the physical domain size; it supplies the default bounds.
    /// Positions outside the bounds receive zero velocity.
    pub fn velocity_at(
        &self,
        position: [f64; 3],
        extent: [f64; 3],
        dimension: Dimension,
    ) -> [f64; 3] {
        if self.profile == InletProfile::Disabled {
            return [0.0; 3];
        }

        let mut axes = vec![(1, self.y_bounds.unwrap_or([0.0, extent[1]]))];
        if dimension == Dimension::D3 {
            axes.push((2, self.z_bounds.unwrap_or([0.0, extent[2]])));
        }

        let mut scale = 1.0;
        for (axis, [min, max]) in axes {
            let s = (position[axis] - min) / (max - min);
            if !(0.0..=1.0).contains(&s) {
                return [0.0; 3];
            }
            if self.profile == InletProfile::Parabolic {
                scale *= 4.0 * s * (1.0 - s);
            }
        }
        self.velocity.map(|v| v * scale)
    }

    fn validate(&self, id: u32) -> Result<(), ConfigError> {
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ConfigError::NonPositiveDensity {
                name: format!("inlet {id}"),
                value: self.density,
            });
        }
        for (axis, bounds) in [('y', self.y_bounds), ('z', self.z_bounds)] {
            if let Some([min, max]) = bounds {
                if !(min.is_finite() && max.is_finite() && min < max) {
                    return Err(ConfigError::InvalidBounds { id, axis, min, max });
                }
            }
        }
        if !(0.0..=1.0).contains(&self.red_fraction) {
            return Err(ConfigError::FractionOutOfRange {
                name: "inlet red fraction",
                value: self.red_fraction,
            });
        }
        Ok(())
    }
}

/// Closed set of boundary behaviours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryKind {
    Wall(WallKind),
    Inlet(InletSpec),
    Outlet(OutletProfile),
}

impl BoundaryKind {
    /// Resolution order for links crossing several faces; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            BoundaryKind::Wall(_) => 0,
            BoundaryKind::Inlet(_) => 1,
            BoundaryKind::Outlet(_) => 2,
        }
    }
}

/// One boundary: an id, the faces it covers and its behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub id: u32,
    pub faces: Vec<Face>,
    pub kind: BoundaryKind,
}

impl Boundary {
    pub fn new(id: u32, faces: Vec<Face>, kind: BoundaryKind) -> Self {
        Self { id, faces, kind }
    }

    /// Stationary no-slip wall.
    pub fn wall(id: u32, faces: Vec<Face>) -> Self {
        Self::new(id, faces, BoundaryKind::Wall(WallKind::Stationary))
    }

    pub fn moving_wall(id: u32, faces: Vec<Face>, velocity: [f64; 3]) -> Self {
        Self::new(id, faces, BoundaryKind::Wall(WallKind::Moving { velocity }))
    }

    pub fn inlet(id: u32, faces: Vec<Face>, spec: InletSpec) -> Self {
        Self::new(id, faces, BoundaryKind::Inlet(spec))
    }

    pub fn outlet(id: u32, faces: Vec<Face>, profile: OutletProfile) -> Self {
        Self::new(id, faces, BoundaryKind::Outlet(profile))
    }
}

/// Every boundary of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    pub boundaries: Vec<Boundary>,
}

impl BoundaryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// A closed box: every face is a stationary wall with id 0.
    pub fn enclosed(dimension: Dimension) -> Self {
        let faces = Face::ALL
            .into_iter()
            .filter(|f| f.in_dimension(dimension))
            .collect();
        Self {
            boundaries: vec![Boundary::wall(0, faces)],
        }
    }

    pub fn push(&mut self, boundary: Boundary) {
        self.boundaries.push(boundary);
    }

    pub fn with(mut self, boundary: Boundary) -> Self {
        self.push(boundary);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &Boundary> {
        self.boundaries.iter()
    }

    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&Boundary> {
        self.boundaries.iter().find(|b| b.id == id)
    }

    /// Boundary that owns a face.
    pub fn for_face(&self, face: Face) -> Option<&Boundary> {
        self.boundaries.iter().find(|b| b.faces.contains(&face))
    }

    pub fn validate(
        &self,
        dimension: Dimension,
        geometry: &LatticeGeometry,
    ) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut owners: HashMap<Face, u32> = HashMap::new();

        for boundary in &self.boundaries {
            if !ids.insert(boundary.id) {
                return Err(ConfigError::DuplicateBoundaryId(boundary.id));
            }
            for &face in &boundary.faces {
                if !face.in_dimension(dimension) {
                    return Err(ConfigError::FaceNotInDimension(face));
                }
                if geometry.periodic[face.axis()] {
                    return Err(ConfigError::PeriodicFaceAssigned(face));
                }
                if owners.insert(face, boundary.id).is_some() {
                    return Err(ConfigError::FaceAssignedTwice(face));
                }
            }

            match &boundary.kind {
                BoundaryKind::Wall(_) => {}
                BoundaryKind::Inlet(spec) => spec.validate(boundary.id)?,
                BoundaryKind::Outlet(profile) => {
                    if let OutletProfile::Pressure { density } = *profile {
                        if !(density.is_finite() && density > 0.0) {
                            return Err(ConfigError::NonPositiveDensity {
                                name: format!("outlet {}", boundary.id),
                                value: density,
                            });
                        }
                    }
                    for face in &boundary.faces {
                        let extent = geometry.extent(dimension, face.axis());
                        if extent < profile.required_extent() {
                            return Err(ConfigError::GridTooSmall {
                                axis: face.axis(),
                                extent,
                                required: profile.required_extent(),
                            });
                        }
                    }
                }
            }
        }

        for face in Face::ALL.into_iter().filter(|f| f.in_dimension(dimension)) {
            if !geometry.periodic[face.axis()] && !owners.contains_key(&face) {
                return Err(ConfigError::UnassignedFace(face));
            }
        }
        Ok(())
    }
}
