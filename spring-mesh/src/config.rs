// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Simulation parameters
//!
//! [`SimParams`] is the single configuration aggregate shared by the force
//! accumulator, the integrators and the contact resolver. Editors mutate it
//! directly; the engine reads it at the start of every `advance()` and the
//! adaptive integrator writes the chosen time step back into it.

use crate::ecs::MassId;
use glam::DVec2;

/// Time step used when nothing else chooses one
pub const DEFAULT_TIME_STEP: f64 = 0.025;

/// Smallest step the adaptive integrator will take
pub const DT_MIN: f64 = 0.0001;

/// Largest step the adaptive integrator will take
pub const DT_MAX: f64 = 0.5;

/// The four configurable body forces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ForceKind {
    /// Uniform gravity; secondary parameter is the direction in degrees
    Gravity,
    /// Pull of the center of mass toward the force center; secondary is damping
    CenterOfMass,
    /// Inverse-power attraction toward the force center; secondary is the exponent
    PointAttraction,
    /// Inverse-power wall repulsion; secondary is the exponent
    Wall,
}

impl ForceKind {
    /// Every force kind in storage order
    pub const ALL: [ForceKind; 4] = [
        ForceKind::Gravity,
        ForceKind::CenterOfMass,
        ForceKind::PointAttraction,
        ForceKind::Wall,
    ];

    /// Storage (and file) index of this force
    pub fn index(self) -> usize {
        match self {
            ForceKind::Gravity => 0,
            ForceKind::CenterOfMass => 1,
            ForceKind::PointAttraction => 2,
            ForceKind::Wall => 3,
        }
    }

    /// Inverse of [`ForceKind::index`]
    pub fn from_index(index: usize) -> Option<ForceKind> {
        ForceKind::ALL.get(index).copied()
    }

    /// Allowed range of the primary magnitude
    pub fn magnitude_range(self) -> (f64, f64) {
        match self {
            ForceKind::Gravity => (0.0, 1e7),
            _ => (-1e7, 1e7),
        }
    }

    /// Allowed range of the secondary parameter
    pub fn parameter_range(self) -> (f64, f64) {
        match self {
            ForceKind::Gravity => (-360.0, 360.0),
            ForceKind::CenterOfMass => (0.0, 1e7),
            ForceKind::PointAttraction | ForceKind::Wall => (0.0, 1000.0),
        }
    }
}

/// Enable flag plus the two numbers that configure one body force
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSetting {
    /// Whether the force is applied
    pub enabled: bool,
    /// Primary magnitude
    pub magnitude: f64,
    /// Secondary parameter (direction, damping or exponent)
    pub parameter: f64,
}

impl ForceSetting {
    /// A disabled force with the given numbers
    pub const fn new(magnitude: f64, parameter: f64) -> Self {
        ForceSetting {
            enabled: false,
            magnitude,
            parameter,
        }
    }
}

/// Which of the four walls are present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Walls {
    /// Wall at `y = height`
    pub top: bool,
    /// Wall at `x = 0`
    pub left: bool,
    /// Wall at `x = width`
    pub right: bool,
    /// Wall at `y = 0`
    pub bottom: bool,
}

impl Walls {
    /// All four walls present
    pub const fn all() -> Self {
        Walls {
            top: true,
            left: true,
            right: true,
            bottom: true,
        }
    }

    /// No walls at all
    pub const fn none() -> Self {
        Walls {
            top: false,
            left: false,
            right: false,
            bottom: false,
        }
    }
}

impl Default for Walls {
    fn default() -> Self {
        Walls::all()
    }
}

/// Size of the box the walls enclose
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Distance between the left and right walls
    pub width: f64,
    /// Distance between the bottom and top walls
    pub height: f64,
}

impl Bounds {
    /// Create bounds of the given size
    pub fn new(width: f64, height: f64) -> Self {
        Bounds { width, height }
    }

    /// Middle of the box, the default force center
    pub fn center(&self) -> DVec2 {
        DVec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Global simulation parameters
///
/// # Examples
///
/// ```
/// use spring_mesh::config::{ForceKind, SimParams};
///
/// let params = SimParams::default()
///     .with_force(ForceKind::Gravity, 9.8, 0.0)
///     .with_viscosity(0.1);
/// assert!(params.force(ForceKind::Gravity).enabled);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    /// Mass given to newly placed masses
    pub default_mass: f64,
    /// Elasticity given to newly placed masses
    pub default_elasticity: f64,
    /// Stiffness given to newly attached springs
    pub default_ks: f64,
    /// Damping given to newly attached springs
    pub default_kd: f64,
    /// Whether newly placed masses are anchors
    pub fix_new_masses: bool,
    /// Whether springs are drawn
    pub show_springs: bool,
    /// Mass used as the force center, if any
    pub center: Option<MassId>,
    /// Body force settings indexed by [`ForceKind::index`]
    pub forces: [ForceSetting; 4],
    /// Isotropic viscous drag coefficient
    pub viscosity: f64,
    /// Wall stickiness coefficient
    pub stickiness: f64,
    /// Current time step; the adaptive integrator rewrites this
    pub time_step: f64,
    /// Error tolerance scale for adaptive stepping
    pub precision: f64,
    /// Use the error-controlled integrator when springs are present
    pub adaptive: bool,
    /// Snap placement to the grid
    pub grid_snap: bool,
    /// Grid spacing used by [`SimParams::snap`]
    pub grid_spacing: f64,
    /// Wall presence
    pub walls: Walls,
    /// Resolve pairwise mass collisions
    pub collide: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            default_mass: 1.0,
            default_elasticity: 1.0,
            default_ks: 1.0,
            default_kd: 1.0,
            fix_new_masses: false,
            show_springs: true,
            center: None,
            forces: [
                ForceSetting::new(10.0, 0.0),
                ForceSetting::new(5.0, 2.0),
                ForceSetting::new(10.0, 0.0),
                ForceSetting::new(10000.0, 1.0),
            ],
            viscosity: 0.0,
            stickiness: 0.0,
            time_step: DEFAULT_TIME_STEP,
            precision: 1.0,
            adaptive: false,
            grid_snap: false,
            grid_spacing: 20.0,
            walls: Walls::all(),
            collide: false,
        }
    }
}

impl SimParams {
    /// Restore every parameter to its default
    pub fn reset(&mut self) {
        *self = SimParams::default();
    }

    /// Settings of one body force
    pub fn force(&self, kind: ForceKind) -> &ForceSetting {
        &self.forces[kind.index()]
    }

    /// Mutable settings of one body force
    pub fn force_mut(&mut self, kind: ForceKind) -> &mut ForceSetting {
        &mut self.forces[kind.index()]
    }

    /// Enable a force with the given magnitude and secondary parameter
    pub fn with_force(mut self, kind: ForceKind, magnitude: f64, parameter: f64) -> Self {
        self.forces[kind.index()] = ForceSetting {
            enabled: true,
            magnitude,
            parameter,
        };
        self
    }

    /// Set the viscous drag coefficient
    pub fn with_viscosity(mut self, viscosity: f64) -> Self {
        self.viscosity = viscosity;
        self
    }

    /// Set the wall stickiness
    pub fn with_stickiness(mut self, stickiness: f64) -> Self {
        self.stickiness = stickiness;
        self
    }

    /// Set the time step
    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Enable adaptive stepping with the given precision
    pub fn with_adaptive(mut self, precision: f64) -> Self {
        self.adaptive = true;
        self.precision = precision;
        self
    }

    /// Choose which walls are present
    pub fn with_walls(mut self, walls: Walls) -> Self {
        self.walls = walls;
        self
    }

    /// Enable or disable pairwise collisions
    pub fn with_collisions(mut self, collide: bool) -> Self {
        self.collide = collide;
        self
    }

    /// Round a placement point to the nearest grid node when snapping is on
    pub fn snap(&self, point: DVec2) -> DVec2 {
        if !self.grid_snap || self.grid_spacing <= 0.0 {
            return point;
        }
        let g = self.grid_spacing;
        DVec2::new(
            ((point.x + g / 2.0) / g).floor() * g,
            ((point.y + g / 2.0) / g).floor() * g,
        )
    }

    /// Check the parameters for values the engine cannot work with
    pub fn validate(&self) -> Result<(), String> {
        if self.time_step <= 0.0 || !self.time_step.is_finite() {
            return Err(format!(
                "Invalid time step: {}. Must be positive and finite.",
                self.time_step
            ));
        }
        if self.precision <= 0.0 || !self.precision.is_finite() {
            return Err(format!(
                "Invalid precision: {}. Must be positive and finite.",
                self.precision
            ));
        }
        if self.default_mass <= 0.0 || !self.default_mass.is_finite() {
            return Err(format!("Invalid default mass: {}", self.default_mass));
        }
        if !self.default_elasticity.is_finite() {
            return Err(format!("Invalid default elasticity: {}", self.default_elasticity));
        }
        if !self.default_ks.is_finite() || !self.default_kd.is_finite() {
            return Err(format!(
                "Invalid default spring constants: ks {}, kd {}",
                self.default_ks, self.default_kd
            ));
        }
        if self.viscosity < 0.0 || !self.viscosity.is_finite() {
            return Err(format!("Invalid viscosity: {}", self.viscosity));
        }
        if self.stickiness < 0.0 || !self.stickiness.is_finite() {
            return Err(format!("Invalid stickiness: {}", self.stickiness));
        }
        if self.grid_snap && !(self.grid_spacing > 0.0 && self.grid_spacing.is_finite()) {
            return Err(format!("Invalid grid spacing: {}", self.grid_spacing));
        }
        for kind in ForceKind::ALL {
            let setting = self.force(kind);
            let (lo, hi) = kind.magnitude_range();
            if !(lo..=hi).contains(&setting.magnitude) {
                return Err(format!(
                    "{:?} magnitude {} outside [{}, {}]",
                    kind, setting.magnitude, lo, hi
                ));
            }
            let (lo, hi) = kind.parameter_range();
            if !(lo..=hi).contains(&setting.parameter) {
                return Err(format!(
                    "{:?} parameter {} outside [{}, {}]",
                    kind, setting.parameter, lo, hi
                ));
            }
        }
        Ok(())
    }
}
