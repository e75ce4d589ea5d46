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
//! Force accumulation
//!
//! One force pass overwrites the acceleration of every free mass with the sum
//! of the enabled body forces, then adds spring tension and damping pairwise.
//! Body forces are supplied by [`ForceProvider`]s registered with a
//! [`ForceAccumulator`]; [`ForceAccumulator::from_params`] registers the
//! providers that the simulation parameters enable.
//!
//! The accumulator keeps no state between passes. Integrators call
//! [`ForceAccumulator::accumulate`] once per stage because accelerations depend
//! on the provisional positions and velocities of that stage.

use crate::config::{Bounds, ForceKind, SimParams, Walls};
use crate::ecs::components::{screen_radius, Mass, Spring};
use crate::ecs::{Component, MassId};
use glam::DVec2;
use log::trace;

/// Radius of the force center seen by point attraction
const CENTER_RADIUS: f64 = 1.0;

/// Per-pass values shared by every provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceContext {
    /// Position the centering forces pull toward
    pub center: DVec2,
    /// Mass acting as the force center, if any
    pub center_id: Option<MassId>,
    /// Wall geometry
    pub bounds: Bounds,
}

impl ForceContext {
    /// Resolve the force center for the current positions
    ///
    /// The center is the designated mass if it is alive, otherwise the middle
    /// of the bounds.
    pub fn new(masses: &[Mass], center_id: Option<MassId>, bounds: Bounds) -> Self {
        let center_mass = center_id.and_then(|id| masses.get(id.index()).filter(|m| m.is_alive()));
        ForceContext {
            center: center_mass.map_or_else(|| bounds.center(), |m| m.position),
            center_id: center_mass.and(center_id),
            bounds,
        }
    }

    /// Whether the mass at `index` is the force center
    pub fn is_center(&self, index: usize) -> bool {
        self.center_id.map_or(false, |id| id.index() == index)
    }
}

/// A body force contributing acceleration to free masses
///
/// Providers see one mass at a time. Forces that depend on an aggregate of
/// all masses compute it in [`ForceProvider::begin_pass`].
pub trait ForceProvider: Send + Sync {
    /// Descriptive name used in diagnostics
    fn name(&self) -> &str;

    /// Called once per pass before any [`ForceProvider::acceleration`] call
    fn begin_pass(&mut self, _masses: &[Mass], _ctx: &ForceContext) {}

    /// Acceleration contributed to the free mass at `index`
    fn acceleration(&self, index: usize, mass: &Mass, ctx: &ForceContext) -> DVec2;
}

/// Uniform gravity at an angle from straight down
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gravity {
    acceleration: DVec2,
}

impl Gravity {
    /// Gravity of `magnitude` rotated `degrees` counter-clockwise from down
    pub fn new(magnitude: f64, degrees: f64) -> Self {
        let angle = degrees.to_radians();
        Gravity {
            acceleration: DVec2::new(magnitude * angle.sin(), -magnitude * angle.cos()),
        }
    }

    /// Acceleration applied to every free mass
    pub fn vector(&self) -> DVec2 {
        self.acceleration
    }
}

impl ForceProvider for Gravity {
    fn name(&self) -> &str {
        "Gravity"
    }

    fn acceleration(&self, _index: usize, _mass: &Mass, _ctx: &ForceContext) -> DVec2 {
        self.acceleration
    }
}

/// Spring-like pull of the center of mass toward the force center
///
/// The aggregate is taken over free masses other than the center mass, and
/// the resulting acceleration is shared by all of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CenterOfMassPull {
    magnitude: f64,
    damping: f64,
    pull: DVec2,
}

impl CenterOfMassPull {
    /// Create a pull with the given stiffness and velocity damping
    pub fn new(magnitude: f64, damping: f64) -> Self {
        CenterOfMassPull {
            magnitude,
            damping,
            pull: DVec2::ZERO,
        }
    }

    /// Acceleration computed by the last pass
    pub fn pull(&self) -> DVec2 {
        self.pull
    }
}

impl ForceProvider for CenterOfMassPull {
    fn name(&self) -> &str {
        "Center of mass"
    }

    fn begin_pass(&mut self, masses: &[Mass], ctx: &ForceContext) {
        let mut total = 0.0;
        let mut weighted_position = DVec2::ZERO;
        let mut weighted_velocity = DVec2::ZERO;

        for (i, mass) in masses.iter().enumerate() {
            if mass.is_free() && !ctx.is_center(i) {
                total += mass.mass;
                weighted_position += mass.mass * mass.position;
                weighted_velocity += mass.mass * mass.velocity;
            }
        }

        self.pull = if total != 0.0 {
            let offset = weighted_position / total - ctx.center;
            let drift = weighted_velocity / total;
            -(self.magnitude * offset + self.damping * drift) / total
        } else {
            DVec2::ZERO
        };
    }

    fn acceleration(&self, index: usize, _mass: &Mass, ctx: &ForceContext) -> DVec2 {
        if ctx.is_center(index) {
            DVec2::ZERO
        } else {
            self.pull
        }
    }
}

/// Isotropic drag proportional to velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViscousDrag {
    /// Drag coefficient
    pub viscosity: f64,
}

impl ForceProvider for ViscousDrag {
    fn name(&self) -> &str {
        "Viscous drag"
    }

    fn acceleration(&self, _index: usize, mass: &Mass, _ctx: &ForceContext) -> DVec2 {
        -self.viscosity * mass.velocity
    }
}

/// Inverse-power attraction toward the force center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointAttraction {
    /// Strength at unit distance
    pub magnitude: f64,
    /// Power of the distance in the denominator
    pub exponent: f64,
}

impl ForceProvider for PointAttraction {
    fn name(&self) -> &str {
        "Point attraction"
    }

    fn acceleration(&self, _index: usize, mass: &Mass, ctx: &ForceContext) -> DVec2 {
        let mut delta = ctx.center - mass.position;
        let mut distance = delta.length();

        // Closer than the touching distance counts as touching
        let min_distance = f64::from(mass.radius) + CENTER_RADIUS;
        if distance < min_distance {
            delta *= distance / min_distance;
            distance = min_distance;
        }

        let strength = self.magnitude / distance.powf(self.exponent);
        strength * delta / distance
    }
}

/// Inverse-power force from each present wall
///
/// Positive magnitudes repel. Clearance is measured from the mass's wall
/// radius and clamped to at least 1 unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallForce {
    /// Strength at unit clearance
    pub magnitude: f64,
    /// Power of the clearance in the denominator
    pub exponent: f64,
    /// Walls that push
    pub walls: Walls,
}

impl WallForce {
    fn falloff(&self, clearance: f64) -> Option<f64> {
        if clearance >= 0.0 {
            Some(clearance.max(1.0).powf(self.exponent))
        } else {
            None
        }
    }
}

impl ForceProvider for WallForce {
    fn name(&self) -> &str {
        "Wall force"
    }

    fn acceleration(&self, _index: usize, mass: &Mass, ctx: &ForceContext) -> DVec2 {
        let radius = f64::from(screen_radius(mass.radius));
        let pos = mass.position;
        let Bounds { width, height } = ctx.bounds;
        let mut accel = DVec2::ZERO;

        if self.walls.left {
            if let Some(d) = self.falloff(pos.x - radius) {
                accel.x += self.magnitude / d;
            }
        }
        if self.walls.right {
            if let Some(d) = self.falloff(width - radius - pos.x) {
                accel.x -= self.magnitude / d;
            }
        }
        if self.walls.top {
            if let Some(d) = self.falloff(height - radius - pos.y) {
                accel.y -= self.magnitude / d;
            }
        }
        if self.walls.bottom {
            if let Some(d) = self.falloff(pos.y - radius) {
                accel.y += self.magnitude / d;
            }
        }

        accel
    }
}

/// Acceleration one spring adds to each endpoint
///
/// Returns `None` for a zero-length spring.
pub fn spring_acceleration(spring: &Spring, m1: &Mass, m2: &Mass) -> Option<(DVec2, DVec2)> {
    let delta = m1.position - m2.position;
    if delta == DVec2::ZERO {
        return None;
    }
    let length = delta.length();

    let mut force = spring.ks * (spring.rest_length - length);
    if spring.kd != 0.0 {
        let closing = (m1.velocity - m2.velocity).dot(delta) / length;
        force -= spring.kd * closing;
    }
    let force = force / length * delta;

    Some((force / m1.mass, -force / m2.mass))
}

/// Computes accelerations for every free mass
///
/// # Examples
///
/// ```
/// use glam::DVec2;
/// use spring_mesh::config::{Bounds, ForceKind, SimParams};
/// use spring_mesh::ecs::components::Mass;
/// use spring_mesh::ecs::systems::ForceAccumulator;
///
/// let params = SimParams::default().with_force(ForceKind::Gravity, 10.0, 0.0);
/// let mut accumulator = ForceAccumulator::from_params(&params, Bounds::new(800.0, 600.0));
///
/// let mut masses = vec![Mass::new(1.0).with_position(DVec2::new(400.0, 300.0))];
/// accumulator.accumulate(&mut masses, &[]);
/// assert!((masses[0].acceleration.y + 10.0).abs() < 1e-12);
/// ```
pub struct ForceAccumulator {
    providers: Vec<Box<dyn ForceProvider>>,
    center_id: Option<MassId>,
    bounds: Bounds,
}

impl ForceAccumulator {
    /// Create an accumulator with no body forces
    pub fn new(center_id: Option<MassId>, bounds: Bounds) -> Self {
        ForceAccumulator {
            providers: Vec::new(),
            center_id,
            bounds,
        }
    }

    /// Create an accumulator with the providers the parameters enable
    pub fn from_params(params: &SimParams, bounds: Bounds) -> Self {
        let mut accumulator = Self::new(params.center, bounds);

        let gravity = params.force(ForceKind::Gravity);
        if gravity.enabled {
            accumulator.register_provider(Box::new(Gravity::new(gravity.magnitude, gravity.parameter)));
        }
        let pull = params.force(ForceKind::CenterOfMass);
        if pull.enabled {
            accumulator.register_provider(Box::new(CenterOfMassPull::new(pull.magnitude, pull.parameter)));
        }
        if params.viscosity != 0.0 {
            accumulator.register_provider(Box::new(ViscousDrag {
                viscosity: params.viscosity,
            }));
        }
        let point = params.force(ForceKind::PointAttraction);
        if point.enabled {
            accumulator.register_provider(Box::new(PointAttraction {
                magnitude: point.magnitude,
                exponent: point.parameter,
            }));
        }
        let wall = params.force(ForceKind::Wall);
        if wall.enabled {
            accumulator.register_provider(Box::new(WallForce {
                magnitude: wall.magnitude,
                exponent: wall.parameter,
                walls: params.walls,
            }));
        }

        accumulator
    }

    /// Register an additional body force
    pub fn register_provider(&mut self, provider: Box<dyn ForceProvider>) {
        self.providers.push(provider);
    }

    /// Get the number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Names of the registered providers in application order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Wall geometry used by the pass
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Run one force pass
    ///
    /// Overwrites the acceleration of every free mass. Fixed and dead masses
    /// are left untouched.
    pub fn accumulate(&mut self, masses: &mut [Mass], springs: &[Spring]) {
        let ctx = ForceContext::new(masses, self.center_id, self.bounds);

        for provider in &mut self.providers {
            provider.begin_pass(masses, &ctx);
        }

        for (i, mass) in masses.iter_mut().enumerate() {
            if !mass.is_free() {
                continue;
            }
            let mut accel = DVec2::ZERO;
            for provider in &self.providers {
                accel += provider.acceleration(i, mass, &ctx);
            }
            mass.acceleration = accel;
        }

        let mut applied = 0usize;
        for spring in springs.iter().filter(|s| s.is_alive()) {
            let (i1, i2) = (spring.m1.index(), spring.m2.index());
            let (m1, m2) = match (masses.get(i1), masses.get(i2)) {
                (Some(m1), Some(m2)) => (m1, m2),
                _ => continue,
            };
            if let Some((a1, a2)) = spring_acceleration(spring, m1, m2) {
                if masses[i1].is_free() {
                    masses[i1].acceleration += a1;
                }
                if masses[i2].is_free() {
                    masses[i2].acceleration += a2;
                }
                applied += 1;
            }
        }

        trace!(
            "Force pass: {} providers, {} springs applied, center {:?}",
            self.providers.len(),
            applied,
            ctx.center
        );
    }
}
