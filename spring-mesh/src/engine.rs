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
//! The simulation step
//!
//! [`Physics::advance`] runs one logical step over a [`World`]:
//!
//! 1. Every free mass records its position and velocity as the rollback point.
//! 2. The integrator is chosen. Adaptive stepping is used only while at least
//!    one spring is alive; without springs the step falls back to
//!    [`DEFAULT_TIME_STEP`] under RK4.
//! 3. The integrator advances the free masses, calling a fresh
//!    [`ForceAccumulator`] once per stage.
//! 4. Contacts are resolved with the step size left in the parameters.
//! 5. The frame pacer decides whether a redraw is due.

use crate::config::{Bounds, DEFAULT_TIME_STEP};
use crate::contact::{ContactReport, ContactResolver};
use crate::ecs::systems::ForceAccumulator;
use crate::ecs::World;
use crate::integration::{Integrator, RK4Integrator, RKF45Integrator, StepReport};
use crate::pacer::FramePacer;
use log::debug;

/// Steps a [`World`] inside a rectangle of the given size
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use spring_mesh::engine::Physics;
/// use spring_mesh::ecs::World;
///
/// let mut world = World::new();
/// let a = world.add_mass(DVec2::new(100.0, 300.0));
/// let b = world.add_mass(DVec2::new(160.0, 300.0));
/// world.add_spring(a, b);
///
/// let mut physics = Physics::new(800.0, 600.0);
/// for _ in 0..10 {
///     physics.advance(&mut world);
/// }
/// assert_eq!(world.live_mass_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct Physics {
    bounds: Bounds,
    rk4: RK4Integrator,
    rkf45: RKF45Integrator,
    contacts: ContactResolver,
    pacer: FramePacer,
    last_step: Option<StepReport>,
    last_contacts: ContactReport,
}

impl Physics {
    /// Create an engine for a `width` × `height` area
    pub fn new(width: f64, height: f64) -> Self {
        let bounds = Bounds::new(width, height);
        Physics {
            bounds,
            rk4: RK4Integrator::new(),
            rkf45: RKF45Integrator::new(),
            contacts: ContactResolver::new(bounds),
            pacer: FramePacer::new(),
            last_step: None,
            last_contacts: ContactReport::default(),
        }
    }

    /// Use a custom retry limit for adaptive steps
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.rkf45 = RKF45Integrator::with_max_attempts(max_attempts);
        self
    }

    /// Area the walls enclose
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Resize the area
    pub fn set_bounds(&mut self, width: f64, height: f64) {
        self.bounds = Bounds::new(width, height);
        self.contacts.set_bounds(self.bounds);
    }

    /// Integrator report of the most recent step
    pub fn last_step(&self) -> Option<StepReport> {
        self.last_step
    }

    /// Contact report of the most recent step
    pub fn last_contacts(&self) -> &ContactReport {
        &self.last_contacts
    }

    /// Frame pacing state
    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    /// Advance the world by one step; returns whether a redraw is due
    pub fn advance(&mut self, world: &mut World) -> bool {
        world.validate_center();
        for mass in world.masses.iter_mut().filter(|m| m.is_free()) {
            mass.record_previous();
        }

        let adaptive = world.params.adaptive && world.any_spring_alive();
        if world.params.adaptive && !adaptive {
            world.params.time_step = DEFAULT_TIME_STEP;
        }

        let mut forces = ForceAccumulator::from_params(&world.params, self.bounds);
        let integrator: &mut dyn Integrator = if adaptive {
            &mut self.rkf45
        } else {
            &mut self.rk4
        };
        let (masses, springs, params) = world.parts_mut();
        let report = integrator.step(masses, springs, params, &mut forces);

        let dt = world.params.time_step;
        let contacts = self.contacts.resolve(world, dt);
        let redraw = self.pacer.tick(dt);

        debug!(
            "{}: dt {} (next {}), {} attempt(s), {} removed, redraw {}",
            integrator_name(adaptive),
            report.dt_used,
            report.next_dt,
            report.attempts,
            contacts.removed.len(),
            redraw
        );

        self.last_step = Some(report);
        self.last_contacts = contacts;
        redraw
    }
}

fn integrator_name(adaptive: bool) -> &'static str {
    if adaptive {
        "RKF45"
    } else {
        "RK4"
    }
}
