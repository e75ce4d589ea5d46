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
//! Mass and spring entities
//!
//! A [`Mass`] is a point body with position, velocity and the acceleration
//! computed by the last force pass. A [`Spring`] is a damped Hookean link
//! between two masses. Coordinates are y-up: the bottom wall sits at
//! `y = radius` and the top wall at `y = height - radius`.

use crate::ecs::{Component, MassId, SpringId, Status};
use glam::DVec2;

/// Collision radius used for fixed masses ("nails")
pub const NAIL_SIZE: f64 = 4.0;

/// Display radius for a body of the given mass
///
/// Grows logarithmically with mass and is clamped to `1..=64`.
pub fn mass_radius(mass: f64) -> i32 {
    let radius = (2.0 * (4.0 * mass + 1.0).ln()) as i32;
    radius.clamp(1, 64)
}

/// Sphere size bucket (0..=4) for a display radius
pub fn sphere_size(radius: i32) -> i32 {
    let rad = ((25 + 2 * radius) / 2).max(15);
    let size = if rad * 2 >= 30 { (rad * 2 - 30) / 10 } else { 0 };
    size.min(4)
}

/// Drawn radius of a sphere bucket
pub fn sphere_radius(size: i32) -> i32 {
    (size * 10 + 30) / 2
}

/// Radius the walls see for a mass with the given display radius
pub fn screen_radius(radius: i32) -> i32 {
    sphere_radius(sphere_size(radius))
}

/// Position and velocity of a mass at one instant
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionState {
    /// Position
    pub position: DVec2,
    /// Velocity
    pub velocity: DVec2,
}

impl MotionState {
    /// Create a motion state
    pub fn new(position: DVec2, velocity: DVec2) -> Self {
        MotionState { position, velocity }
    }

    /// Check if both vectors are finite
    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite()
    }
}

/// A point mass
///
/// # Examples
///
/// ```
/// use glam::DVec2;
/// use spring_mesh::ecs::components::Mass;
///
/// let mass = Mass::new(2.0).with_position(DVec2::new(100.0, 50.0));
/// assert!(mass.is_free());
/// assert_eq!(mass.position.x, 100.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Mass {
    /// Current position
    pub position: DVec2,
    /// Current velocity
    pub velocity: DVec2,
    /// Acceleration from the most recent force pass
    pub acceleration: DVec2,
    /// Inertial mass, always positive
    pub mass: f64,
    /// Coefficient of restitution used against walls and other masses
    pub elastic: f64,
    /// Display radius, see [`mass_radius`]
    pub radius: i32,
    pub(crate) parents: Vec<SpringId>,
    pub(crate) status: Status,
    pub(crate) previous: MotionState,
    pub(crate) trial: Option<MotionState>,
}

impl Mass {
    /// Create a live mass at the origin
    ///
    /// # Panics
    ///
    /// Panics if `mass` is not positive and finite.
    pub fn new(mass: f64) -> Self {
        assert!(mass > 0.0 && mass.is_finite(), "Mass must be positive and finite");
        Mass {
            position: DVec2::ZERO,
            velocity: DVec2::ZERO,
            acceleration: DVec2::ZERO,
            mass,
            elastic: 1.0,
            radius: mass_radius(mass),
            parents: Vec::new(),
            status: Status::alive(),
            previous: MotionState::default(),
            trial: None,
        }
    }

    /// Set the position
    pub fn with_position(mut self, position: DVec2) -> Self {
        self.position = position;
        self
    }

    /// Set the velocity
    pub fn with_velocity(mut self, velocity: DVec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the coefficient of restitution
    pub fn with_elasticity(mut self, elastic: f64) -> Self {
        self.elastic = elastic;
        self
    }

    /// Mark the mass as a fixed anchor
    pub fn fixed(mut self) -> Self {
        self.status.fixed = true;
        self
    }

    /// Change the mass value and recompute the display radius
    ///
    /// # Panics
    ///
    /// Panics if `mass` is not positive and finite.
    pub fn set_mass(&mut self, mass: f64) {
        assert!(mass > 0.0 && mass.is_finite(), "Mass must be positive and finite");
        self.mass = mass;
        self.radius = mass_radius(mass);
    }

    /// Alive and not fixed: subject to forces and integration
    pub fn is_free(&self) -> bool {
        self.status.is_free()
    }

    /// Whether the mass is an anchor
    pub fn is_fixed(&self) -> bool {
        self.status.fixed
    }

    /// Set or clear the anchor flag
    pub fn set_fixed(&mut self, fixed: bool) {
        self.status.fixed = fixed;
    }

    /// Whether the anchor flag was set temporarily during a drag
    pub fn is_temp_fixed(&self) -> bool {
        self.status.temp_fixed
    }

    /// Springs attached to this mass
    pub fn parents(&self) -> &[SpringId] {
        &self.parents
    }

    /// Current position and velocity
    pub fn motion(&self) -> MotionState {
        MotionState::new(self.position, self.velocity)
    }

    /// Overwrite position and velocity
    pub fn set_motion(&mut self, state: MotionState) {
        self.position = state.position;
        self.velocity = state.velocity;
    }

    /// State recorded at the start of the current `advance()`
    pub fn previous(&self) -> MotionState {
        self.previous
    }

    /// Result of the last trial integration, if one was requested
    pub fn trial(&self) -> Option<MotionState> {
        self.trial
    }

    /// Radius seen by the walls
    pub fn wall_radius(&self) -> f64 {
        f64::from(screen_radius(self.radius))
    }

    /// Radius used for pairwise collisions
    pub fn collision_radius(&self) -> f64 {
        if self.status.fixed {
            NAIL_SIZE
        } else {
            f64::from(self.radius)
        }
    }

    /// Check that position, velocity and acceleration are all finite
    pub fn is_valid(&self) -> bool {
        self.position.is_finite() && self.velocity.is_finite() && self.acceleration.is_finite()
    }

    /// Remember the current motion as the rollback point
    pub(crate) fn record_previous(&mut self) {
        self.previous = self.motion();
    }
}

impl Default for Mass {
    fn default() -> Self {
        Mass::new(1.0)
    }
}

impl Component for Mass {
    fn status(&self) -> &Status {
        &self.status
    }

    fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }
}

/// A damped spring between two masses
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    /// Stiffness
    pub ks: f64,
    /// Damping along the spring axis
    pub kd: f64,
    /// Length at which the spring exerts no force
    pub rest_length: f64,
    /// First endpoint
    pub m1: MassId,
    /// Second endpoint
    pub m2: MassId,
    pub(crate) status: Status,
}

impl Spring {
    /// Create a live spring
    pub fn new(m1: MassId, m2: MassId, ks: f64, kd: f64, rest_length: f64) -> Self {
        Spring {
            ks,
            kd,
            rest_length,
            m1,
            m2,
            status: Status::alive(),
        }
    }

    /// Both endpoints
    pub fn endpoints(&self) -> (MassId, MassId) {
        (self.m1, self.m2)
    }

    /// Whether the spring touches the given mass
    pub fn connects(&self, mass: MassId) -> bool {
        self.m1 == mass || self.m2 == mass
    }
}

impl Default for Spring {
    fn default() -> Self {
        Spring::new(MassId::new(0), MassId::new(0), 0.0, 0.0, 0.0)
    }
}

impl Component for Spring {
    fn status(&self) -> &Status {
        &self.status
    }

    fn status_mut(&mut self) -> &mut Status {
        &mut self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_radius_bounds() {
        assert_eq!(mass_radius(0.0), 1);
        assert_eq!(mass_radius(1.0), 3);
        assert_eq!(mass_radius(1e30), 64);
    }

    #[test]
    fn test_screen_radius_buckets() {
        // Small bodies all land in the smallest bucket
        assert_eq!(screen_radius(1), 15);
        assert_eq!(screen_radius(3), 15);
        assert_eq!(screen_radius(64), 35);
        for radius in 1..=64 {
            let r = screen_radius(radius);
            assert!((15..=35).contains(&r));
        }
    }

    #[test]
    fn test_mass_creation() {
        let mass = Mass::new(2.5)
            .with_position(DVec2::new(1.0, 2.0))
            .with_velocity(DVec2::new(3.0, 4.0))
            .with_elasticity(0.5);
        assert_eq!(mass.mass, 2.5);
        assert_eq!(mass.radius, mass_radius(2.5));
        assert_eq!(mass.velocity.length(), 5.0);
        assert!(mass.is_free());
        assert!(mass.is_valid());
        assert!(mass.parents().is_empty());
    }

    #[test]
    #[should_panic(expected = "Mass must be positive and finite")]
    fn test_zero_mass_panics() {
        Mass::new(0.0);
    }

    #[test]
    fn test_set_mass_updates_radius() {
        let mut mass = Mass::new(1.0);
        mass.set_mass(100.0);
        assert_eq!(mass.radius, mass_radius(100.0));
    }

    #[test]
    fn test_fixed_mass_uses_nail_radius() {
        let mass = Mass::new(50.0).fixed();
        assert!(!mass.is_free());
        assert_eq!(mass.collision_radius(), NAIL_SIZE);
    }

    #[test]
    fn test_invalid_mass_detection() {
        let mut mass = Mass::default();
        mass.acceleration = DVec2::new(f64::NAN, 0.0);
        assert!(!mass.is_valid());
        mass.acceleration = DVec2::ZERO;
        mass.position.y = f64::INFINITY;
        assert!(!mass.is_valid());
    }

    #[test]
    fn test_spring_endpoints() {
        let spring = Spring::new(MassId::new(1), MassId::new(2), 1.0, 0.5, 10.0);
        assert!(spring.is_alive());
        assert!(spring.connects(MassId::new(2)));
        assert!(!spring.connects(MassId::new(3)));
        assert_eq!(spring.endpoints(), (MassId::new(1), MassId::new(2)));
    }
}
