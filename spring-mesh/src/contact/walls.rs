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
//! Wall stick and bounce
//!
//! A mass that started the step at rest against a wall stays pinned while
//! its new velocity normal to that wall is below `stick_mag / mass`. A mass
//! that crossed a wall during the step is put back on it, its normal velocity
//! is reflected and both components are scaled by its elasticity; a rebound
//! weaker than the stickiness leaves it at rest.

use crate::config::{Bounds, Walls};
use crate::ecs::components::Mass;
use glam::DVec2;

/// Calibration of the stickiness parameter
///
/// A unit mass under unit gravity stays on a wall for stickiness above 1.
pub const STICK_MAG: f64 = 1.0;

/// Distance from a wall within which a resting mass counts as touching it
pub const REST_TOLERANCE: f64 = 0.5;

/// What happened to a mass at the walls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WallContact {
    /// No wall involved
    None,
    /// Held at its starting position
    Stuck,
    /// Clamped back onto at least one wall
    Bounced,
}

/// Wall configuration for one resolver pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallRules {
    /// Walls present
    pub walls: Walls,
    /// Wall geometry
    pub bounds: Bounds,
    /// Stickiness coefficient
    pub stickiness: f64,
    /// Step size the stick threshold is derived from
    pub dt: f64,
}

impl WallRules {
    /// Velocity threshold (times mass) below which a resting mass stays put
    pub fn stick_mag(&self) -> f64 {
        STICK_MAG * self.dt * self.stickiness
    }

    /// Apply stick and bounce rules to one free mass
    pub fn apply(&self, mass: &mut Mass) -> WallContact {
        let radius = mass.wall_radius();
        let old = mass.previous();
        let Bounds { width, height } = self.bounds;
        let walls = self.walls;
        let threshold = self.stick_mag() / mass.mass;

        if old.velocity == DVec2::ZERO {
            let on_side = (walls.left && (old.position.x - radius).abs() < REST_TOLERANCE)
                || (walls.right && (old.position.x - width + radius).abs() < REST_TOLERANCE);
            let on_floor = (walls.bottom && (old.position.y - radius).abs() < REST_TOLERANCE)
                || (walls.top && (old.position.y - height + radius).abs() < REST_TOLERANCE);

            let stuck = if on_side {
                mass.velocity.x.abs() < threshold
            } else if on_floor {
                mass.velocity.y.abs() < threshold
            } else {
                false
            };
            if stuck {
                mass.velocity = DVec2::ZERO;
                mass.position = old.position;
                return WallContact::Stuck;
            }
        }

        let release = STICK_MAG * self.stickiness / mass.mass;
        let mut bounced = false;

        if walls.left && mass.position.x < radius && old.position.x >= radius {
            mass.position.x = radius;
            bounce(&mut mass.velocity.x, &mut mass.velocity.y, mass.elastic, release, -1.0);
            bounced = true;
        } else if walls.right
            && mass.position.x > width - radius
            && old.position.x <= width - radius
        {
            mass.position.x = width - radius;
            bounce(&mut mass.velocity.x, &mut mass.velocity.y, mass.elastic, release, 1.0);
            bounced = true;
        }

        if walls.bottom && mass.position.y < radius && old.position.y >= radius {
            mass.position.y = radius;
            bounce(&mut mass.velocity.y, &mut mass.velocity.x, mass.elastic, release, -1.0);
            bounced = true;
        } else if walls.top
            && mass.position.y > height - radius
            && old.position.y <= height - radius
        {
            mass.position.y = height - radius;
            bounce(&mut mass.velocity.y, &mut mass.velocity.x, mass.elastic, release, 1.0);
            bounced = true;
        }

        if bounced {
            WallContact::Bounced
        } else {
            WallContact::None
        }
    }
}

/// Reflect `normal` if it points into the wall (`into` gives the sign of
/// that direction), then take `release` off the rebound
fn bounce(normal: &mut f64, tangent: &mut f64, elastic: f64, release: f64, into: f64) {
    if *normal * into <= 0.0 {
        return;
    }
    *normal = -*normal * elastic;
    *tangent *= elastic;

    // Rebound now points away from the wall, i.e. opposite to `into`
    if *normal * into < 0.0 {
        *normal += release * into;
        if *normal * into > 0.0 {
            *normal = 0.0;
            *tangent = 0.0;
        }
    }
}
