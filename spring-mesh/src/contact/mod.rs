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
//! Post-integration contact resolution
//!
//! Runs once per accepted step:
//!
//! 1. Masses whose position, velocity or acceleration stopped being finite
//!    are deleted (with their springs). The rest of the scene carries on.
//! 2. Free masses get the wall stick and bounce rules, see [`walls`].
//! 3. With collisions enabled, every overlapping and closing pair of live
//!    masses is resolved, see [`collision`].
//!
//! Contact resolution never fails; the [`ContactReport`] only counts what
//! happened.

pub mod collision;
pub mod walls;

pub use collision::{collide_pair, resolve_collisions};
pub use walls::{WallContact, WallRules, REST_TOLERANCE, STICK_MAG};

use crate::config::Bounds;
use crate::ecs::{Component, MassId, World};
use log::{trace, warn};

/// Summary of one resolver pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactReport {
    /// Masses deleted because their state exploded
    pub removed: Vec<MassId>,
    /// Masses held against a wall
    pub stuck: usize,
    /// Masses clamped back onto a wall
    pub bounced: usize,
    /// Colliding pairs resolved
    pub collisions: usize,
}

/// Applies walls and collisions after each step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactResolver {
    bounds: Bounds,
}

impl ContactResolver {
    /// Create a resolver for the given wall geometry
    pub fn new(bounds: Bounds) -> Self {
        ContactResolver { bounds }
    }

    /// Wall geometry in use
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Change the wall geometry (e.g. after a resize)
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// Resolve contacts for a step of size `dt`
    pub fn resolve(&self, world: &mut World, dt: f64) -> ContactReport {
        let mut report = ContactReport::default();

        let exploded: Vec<MassId> = world
            .masses()
            .iter_alive()
            .filter(|(_, m)| !m.is_valid())
            .map(|(i, _)| MassId::new(i))
            .collect();
        for id in exploded {
            warn!("Removing mass {} with non-finite state", id.index());
            world.delete_mass(id);
            report.removed.push(id);
        }

        let rules = WallRules {
            walls: world.params.walls,
            bounds: self.bounds,
            stickiness: world.params.stickiness,
            dt,
        };
        for mass in world.masses.iter_mut().filter(|m| m.is_free()) {
            match rules.apply(mass) {
                WallContact::Stuck => report.stuck += 1,
                WallContact::Bounced => report.bounced += 1,
                WallContact::None => {}
            }
        }

        if world.params.collide {
            report.collisions = resolve_collisions(world.masses.as_mut_slice());
        }

        trace!(
            "Contacts: {} removed, {} stuck, {} bounced, {} collisions",
            report.removed.len(),
            report.stuck,
            report.bounced,
            report.collisions
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimParams;
    use glam::DVec2;

    fn resolver() -> ContactResolver {
        ContactResolver::new(Bounds::new(800.0, 600.0))
    }

    #[test]
    fn test_exploded_mass_is_removed_with_springs() {
        let mut world = World::new();
        let a = world.add_mass(DVec2::new(100.0, 100.0));
        let b = world.add_mass(DVec2::new(200.0, 100.0));
        let s = world.add_spring(a, b).unwrap();
        for id in [a, b] {
            world.mass_mut(id).unwrap().record_previous();
        }
        world.mass_mut(a).unwrap().velocity = DVec2::new(f64::NAN, 0.0);

        let report = resolver().resolve(&mut world, 0.025);

        assert_eq!(report.removed, vec![a]);
        assert!(!world.mass(a).unwrap().is_alive());
        assert!(world.mass(b).unwrap().is_alive());
        assert!(!world.spring(s).unwrap().is_alive());
    }

    #[test]
    fn test_fixed_mass_ignores_walls() {
        let mut world = World::new();
        let a = world.add_mass(DVec2::new(100.0, 100.0));
        {
            let mass = world.mass_mut(a).unwrap();
            mass.set_fixed(true);
            mass.previous.position = DVec2::new(100.0, 100.0);
            mass.position = DVec2::new(-50.0, 100.0);
        }

        let report = resolver().resolve(&mut world, 0.025);
        assert_eq!(report.bounced, 0);
        assert_eq!(world.mass(a).unwrap().position.x, -50.0);
    }

    #[test]
    fn test_collisions_follow_flag() {
        let mut world = World::with_params(SimParams::default().with_walls(crate::config::Walls::none()));
        let a = world.add_mass(DVec2::new(100.0, 100.0));
        let b = world.add_mass(DVec2::new(104.0, 100.0));
        world.mass_mut(a).unwrap().velocity = DVec2::new(1.0, 0.0);
        world.mass_mut(b).unwrap().velocity = DVec2::new(-1.0, 0.0);
        for id in [a, b] {
            world.mass_mut(id).unwrap().record_previous();
        }

        assert_eq!(resolver().resolve(&mut world, 0.025).collisions, 0);

        world.params_mut().collide = true;
        assert_eq!(resolver().resolve(&mut world, 0.025).collisions, 1);
        assert!(world.mass(a).unwrap().velocity.x < 0.0);
    }
}
