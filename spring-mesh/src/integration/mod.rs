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
//! Numerical integration methods for the mass-spring network
//!
//! Both integrators advance every free mass by one step, calling the force
//! accumulator once per stage. Stage derivatives are stored pre-multiplied by
//! the step size (`k = h·f(y)`), so stage states read `y + Σ c·k`.
//!
//! # Integrators
//!
//! - **RK4**: classical fixed-step Runge-Kutta. Four force passes, no error
//!   estimate, never rejects a step.
//! - **RKF45**: embedded Runge-Kutta-Fehlberg (Cash-Karp coefficients). Six
//!   force passes, an error estimate against the precision target, and
//!   rollback with a smaller step when the estimate is too large. The
//!   accepted step size is grown for the next call.
//!
//! # Choosing an Integrator
//!
//! - **RK4**: cheap and predictable when there are no stiff springs.
//! - **RKF45**: stiff networks where a fixed step either wastes work or blows up.

use crate::config::SimParams;
use crate::ecs::components::{Mass, MotionState, Spring};
use crate::ecs::systems::ForceAccumulator;
use crate::ecs::Component;
use glam::DVec2;

mod rk4;
mod rkf45;

pub use rk4::RK4Integrator;
pub use rkf45::{RKF45Integrator, MAX_ATTEMPTS};

/// Kinetic energy of the free masses
///
/// KE = Σ ½·m·v²
pub fn kinetic_energy(masses: &[Mass]) -> f64 {
    masses
        .iter()
        .filter(|m| m.is_free())
        .map(|m| 0.5 * m.mass * m.velocity.length_squared())
        .sum()
}

/// Elastic energy stored in the live springs
///
/// PE = Σ ½·ks·(length − rest)²
pub fn spring_potential_energy(masses: &[Mass], springs: &[Spring]) -> f64 {
    springs
        .iter()
        .filter(|s| s.is_alive())
        .filter_map(|s| {
            let p1 = masses.get(s.m1.index())?.position;
            let p2 = masses.get(s.m2.index())?.position;
            let stretch = p1.distance(p2) - s.rest_length;
            Some(0.5 * s.ks * stretch * stretch)
        })
        .sum()
}

/// Kinetic plus spring energy; body-force potentials are not included
pub fn total_energy(masses: &[Mass], springs: &[Spring]) -> f64 {
    kinetic_energy(masses) + spring_potential_energy(masses, springs)
}

/// Outcome of one integrator call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Step size of the accepted attempt
    pub dt_used: f64,
    /// Step size stored for the next call
    pub next_dt: f64,
    /// Number of attempts, including the accepted one
    pub attempts: u32,
    /// Scaled error of the accepted attempt (adaptive stepping only)
    pub error_ratio: Option<f64>,
}

impl StepReport {
    /// Report for a fixed step of size `dt`
    pub fn fixed(dt: f64) -> Self {
        StepReport {
            dt_used: dt,
            next_dt: dt,
            attempts: 1,
            error_ratio: None,
        }
    }
}

/// Trait for numerical integration methods
///
/// Integrators move free masses only; fixed and dead masses keep their state.
/// The step size is taken from (and, for adaptive methods, written back to)
/// [`SimParams::time_step`].
pub trait Integrator: Send + Sync {
    /// Get the name of this integrator
    fn name(&self) -> &str;

    /// Advance every free mass by one step
    fn step(
        &mut self,
        masses: &mut [Mass],
        springs: &[Spring],
        params: &mut SimParams,
        forces: &mut ForceAccumulator,
    ) -> StepReport;
}

/// One stage derivative, scaled by the step size
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Derivative {
    /// Change in position (`h·v`)
    pub position: DVec2,
    /// Change in velocity (`h·a`)
    pub velocity: DVec2,
}

impl Derivative {
    /// Sample the current velocity and acceleration of a mass
    pub fn sample(mass: &Mass, h: f64) -> Self {
        Derivative {
            position: mass.velocity * h,
            velocity: mass.acceleration * h,
        }
    }
}

/// Per-step scratch shared by the Runge-Kutta integrators
///
/// Holds the free-mass indices, their state at the start of the attempt and
/// `N` stage derivatives. Buffers are reused across calls.
#[derive(Debug, Clone)]
pub(crate) struct StageBuffers<const N: usize> {
    free: Vec<usize>,
    start: Vec<MotionState>,
    k: [Vec<Derivative>; N],
}

impl<const N: usize> StageBuffers<N> {
    pub(crate) fn new() -> Self {
        StageBuffers {
            free: Vec::new(),
            start: Vec::new(),
            k: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Record the free masses and their starting state
    pub(crate) fn begin(&mut self, masses: &[Mass]) {
        self.free.clear();
        self.start.clear();
        for (i, mass) in masses.iter().enumerate() {
            if mass.is_free() {
                self.free.push(i);
                self.start.push(mass.motion());
            }
        }
        for stage in &mut self.k {
            stage.clear();
        }
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Store stage `stage` from the accelerations of the last force pass
    pub(crate) fn sample(&mut self, stage: usize, masses: &[Mass], h: f64) {
        let k = &mut self.k[stage];
        k.clear();
        k.extend(self.free.iter().map(|&i| Derivative::sample(&masses[i], h)));
    }

    pub(crate) fn stage(&self, stage: usize) -> &[Derivative] {
        &self.k[stage]
    }

    /// `start + Σ coeffs[i]·k[i]` for the `j`-th free mass
    pub(crate) fn combine(&self, j: usize, coeffs: &[f64]) -> MotionState {
        let mut state = self.start[j];
        for (c, k) in coeffs.iter().zip(&self.k) {
            state.position += *c * k[j].position;
            state.velocity += *c * k[j].velocity;
        }
        state
    }

    /// Move every free mass to a provisional stage state
    pub(crate) fn set_provisional(&self, masses: &mut [Mass], coeffs: &[f64]) {
        for (j, &i) in self.free.iter().enumerate() {
            masses[i].set_motion(self.combine(j, coeffs));
        }
    }

    /// Write an arbitrary per-mass state
    pub(crate) fn commit(&self, masses: &mut [Mass], mut state: impl FnMut(usize) -> MotionState) {
        for (j, &i) in self.free.iter().enumerate() {
            masses[i].set_motion(state(j));
        }
    }

    /// Return every free mass to its starting state
    pub(crate) fn restore(&self, masses: &mut [Mass]) {
        for (&i, start) in self.free.iter().zip(&self.start) {
            masses[i].set_motion(*start);
        }
    }

    pub(crate) fn start(&self, j: usize) -> MotionState {
        self.start[j]
    }

    pub(crate) fn index(&self, j: usize) -> usize {
        self.free[j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::MassId;

    #[test]
    fn test_kinetic_energy_skips_fixed() {
        let masses = vec![
            Mass::new(2.0).with_velocity(DVec2::new(3.0, 4.0)),
            Mass::new(5.0).with_velocity(DVec2::new(1.0, 0.0)).fixed(),
        ];
        assert!((kinetic_energy(&masses) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_spring_potential_energy() {
        let masses = vec![
            Mass::new(1.0),
            Mass::new(1.0).with_position(DVec2::new(13.0, 0.0)),
        ];
        let springs = vec![Spring::new(MassId::new(0), MassId::new(1), 4.0, 0.0, 10.0)];
        assert!((spring_potential_energy(&masses, &springs) - 18.0).abs() < 1e-12);
        assert!((total_energy(&masses, &springs) - 18.0).abs() < 1e-12);
    }

    #[test]
    fn test_stage_buffers_combine() {
        let mut masses = vec![
            Mass::new(1.0).with_velocity(DVec2::new(2.0, 0.0)),
            Mass::new(1.0).fixed(),
        ];
        masses[0].acceleration = DVec2::new(0.0, 4.0);

        let mut buffers = StageBuffers::<2>::new();
        buffers.begin(&masses);
        assert_eq!(buffers.free_count(), 1);

        buffers.sample(0, &masses, 0.5);
        assert_eq!(buffers.stage(0)[0].position, DVec2::new(1.0, 0.0));
        assert_eq!(buffers.stage(0)[0].velocity, DVec2::new(0.0, 2.0));

        buffers.set_provisional(&mut masses, &[0.5]);
        assert_eq!(masses[0].position, DVec2::new(0.5, 0.0));
        assert_eq!(masses[0].velocity, DVec2::new(2.0, 1.0));

        buffers.restore(&mut masses);
        assert_eq!(masses[0].position, DVec2::ZERO);
        assert_eq!(masses[0].velocity, DVec2::new(2.0, 0.0));
    }
}
