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
//! Runge-Kutta 4th order (RK4) integrator implementation
//!
//! # Algorithm
//!
//! With stage derivatives scaled by the step (`k = h·f`):
//!
//! ```text
//! k1 = h·f(y)
//! k2 = h·f(y + k1/2)
//! k3 = h·f(y + k2/2)
//! k4 = h·f(y + k3)
//! y' = y + (k1/2 + k2 + k3 + k4/2)/3
//! ```
//!
//! The final line is the usual `(k1 + 2·k2 + 2·k3 + k4)/6` weighting.
//! For the mass-spring system `f(x, v) = (v, a(x, v))`, where `a` comes from a
//! full force pass over all masses, so every stage moves all free masses
//! together before the next pass.
//!
//! # Properties
//!
//! - **Fourth-order accurate**: Local error O(dt⁵), global error O(dt⁴)
//! - **Not symplectic**: Energy may drift over long simulations
//! - **Four force passes per step**
//!
//! # References
//!
//! - Press, W. H., Teukolsky, S. A., Vetterling, W. T., & Flannery, B. P. (2007).
//!   Numerical Recipes: The Art of Scientific Computing (3rd ed.). Cambridge
//!   University Press. Section 17.1.

use super::{Integrator, StageBuffers, StepReport};
use crate::config::SimParams;
use crate::ecs::components::{Mass, MotionState, Spring};
use crate::ecs::systems::ForceAccumulator;
use log::trace;

/// Fixed-step Runge-Kutta 4th order integrator
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use spring_mesh::config::{Bounds, SimParams};
/// use spring_mesh::ecs::components::Mass;
/// use spring_mesh::ecs::systems::ForceAccumulator;
/// use spring_mesh::integration::{Integrator, RK4Integrator};
///
/// let mut params = SimParams::default().with_time_step(0.1);
/// let mut forces = ForceAccumulator::from_params(&params, Bounds::new(800.0, 600.0));
/// let mut masses = vec![Mass::new(1.0).with_velocity(DVec2::new(1.0, 0.0))];
///
/// let mut integrator = RK4Integrator::new();
/// integrator.step(&mut masses, &[], &mut params, &mut forces);
/// assert!((masses[0].position.x - 0.1).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct RK4Integrator {
    buffers: StageBuffers<4>,
}

impl RK4Integrator {
    /// Create a new RK4 integrator
    pub fn new() -> Self {
        RK4Integrator {
            buffers: StageBuffers::new(),
        }
    }

    /// Integrate with step `h`
    ///
    /// With `trial` set, the result is stored in [`Mass::trial`] and every
    /// free mass is returned to its starting state.
    pub fn integrate(
        &mut self,
        masses: &mut [Mass],
        springs: &[Spring],
        forces: &mut ForceAccumulator,
        h: f64,
        trial: bool,
    ) {
        let buffers = &mut self.buffers;

        forces.accumulate(masses, springs);
        buffers.begin(masses);
        buffers.sample(0, masses, h);
        buffers.set_provisional(masses, &[0.5]);

        forces.accumulate(masses, springs);
        buffers.sample(1, masses, h);
        buffers.set_provisional(masses, &[0.0, 0.5]);

        forces.accumulate(masses, springs);
        buffers.sample(2, masses, h);
        buffers.set_provisional(masses, &[0.0, 0.0, 1.0]);

        forces.accumulate(masses, springs);
        buffers.sample(3, masses, h);

        let next = |j: usize| {
            let start = buffers.start(j);
            let (k1, k2, k3, k4) = (
                buffers.stage(0)[j],
                buffers.stage(1)[j],
                buffers.stage(2)[j],
                buffers.stage(3)[j],
            );
            MotionState::new(
                start.position
                    + (k1.position / 2.0 + k2.position + k3.position + k4.position / 2.0) / 3.0,
                start.velocity
                    + (k1.velocity / 2.0 + k2.velocity + k3.velocity + k4.velocity / 2.0) / 3.0,
            )
        };

        if trial {
            for j in 0..buffers.free_count() {
                masses[buffers.index(j)].trial = Some(next(j));
            }
            buffers.restore(masses);
        } else {
            buffers.commit(masses, next);
        }

        trace!("RK4 step h={} over {} free masses", h, buffers.free_count());
    }
}

impl Default for RK4Integrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Integrator for RK4Integrator {
    fn name(&self) -> &str {
        "Runge-Kutta 4"
    }

    fn step(
        &mut self,
        masses: &mut [Mass],
        springs: &[Spring],
        params: &mut SimParams,
        forces: &mut ForceAccumulator,
    ) -> StepReport {
        let h = params.time_step;
        self.integrate(masses, springs, forces, h, false);
        StepReport::fixed(h)
    }
}
