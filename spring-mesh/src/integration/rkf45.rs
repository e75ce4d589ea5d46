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
//! Adaptive Runge-Kutta-Fehlberg (4,5) integrator
//!
//! # Algorithm
//!
//! Six stages with the Cash-Karp tableau produce a fifth-order solution and
//! an embedded fourth-order one. Their difference, summed over position and
//! velocity components, is the error of a mass; the worst mass (floored at
//! 1e-5) divided by the precision target is the error ratio `r`.
//!
//! - `r < 1`: the step is accepted and the next step grows by `0.9·r^(-1/8)`.
//! - `r ≥ 1` and the step is still above [`DT_MIN`]: every free mass is
//!   rolled back, the step shrinks by `0.9·r^(-1/4)` and the attempt repeats.
//! - `r ≥ 1` at [`DT_MIN`]: the step is accepted, it cannot shrink further.
//!
//! The step is clamped to `[DT_MIN, DT_MAX]` before each attempt.
//!
//! # References
//!
//! - Cash, J. R., & Karp, A. H. (1990). A variable order Runge-Kutta method for
//!   initial value problems with rapidly varying right-hand sides. ACM
//!   Transactions on Mathematical Software, 16(3), 201-222.
//! - Press, W. H., et al. (1992). Numerical Recipes in C (2nd ed.), 719-720.

use super::{Integrator, StageBuffers, StepReport};
use crate::config::{SimParams, DT_MAX, DT_MIN};
use crate::ecs::components::{Mass, Spring};
use crate::ecs::systems::ForceAccumulator;
use log::{debug, trace, warn};

/// Attempts allowed before a step is accepted regardless of its error
///
/// Shrinking from [`DT_MAX`] reaches [`DT_MIN`] in at most 81 rejections, so
/// the cap only matters for non-finite error estimates.
pub const MAX_ATTEMPTS: u32 = 100;

/// Floor of the per-mass error before scaling by the precision target
const ERROR_FLOOR: f64 = 1e-5;

const A2: [f64; 1] = [0.2];
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [0.3, -0.9, 1.2];
const A5: [f64; 4] = [-11.0 / 54.0, 2.5, -70.0 / 27.0, 35.0 / 27.0];
const A6: [f64; 5] = [
    1631.0 / 55296.0,
    175.0 / 512.0,
    575.0 / 13824.0,
    44275.0 / 110592.0,
    253.0 / 4096.0,
];

/// Fifth-order weights
const B5: [f64; 6] = [37.0 / 378.0, 0.0, 250.0 / 621.0, 125.0 / 594.0, 0.0, 512.0 / 1771.0];

/// Fifth-order minus embedded fourth-order weights
const ERR: [f64; 6] = [
    37.0 / 378.0 - 2825.0 / 27648.0,
    0.0,
    250.0 / 621.0 - 18575.0 / 48384.0,
    125.0 / 594.0 - 13525.0 / 55296.0,
    -277.0 / 14336.0,
    512.0 / 1771.0 - 0.25,
];

/// Error-controlled Runge-Kutta-Fehlberg integrator
///
/// # Example
///
/// ```
/// use glam::DVec2;
/// use spring_mesh::config::{Bounds, SimParams};
/// use spring_mesh::ecs::components::{Mass, Spring};
/// use spring_mesh::ecs::systems::ForceAccumulator;
/// use spring_mesh::ecs::MassId;
/// use spring_mesh::integration::{Integrator, RKF45Integrator};
///
/// let mut params = SimParams::default().with_adaptive(1.0);
/// let mut forces = ForceAccumulator::from_params(&params, Bounds::new(800.0, 600.0));
/// let mut masses = vec![
///     Mass::new(1.0).fixed(),
///     Mass::new(1.0).with_position(DVec2::new(12.0, 0.0)),
/// ];
/// let springs = vec![Spring::new(MassId::new(0), MassId::new(1), 1.0, 0.0, 10.0)];
///
/// let report = RKF45Integrator::new().step(&mut masses, &springs, &mut params, &mut forces);
/// assert!(report.error_ratio.unwrap() < 1.0);
/// assert!(report.next_dt > report.dt_used);
/// ```
#[derive(Debug, Clone)]
pub struct RKF45Integrator {
    buffers: StageBuffers<6>,
    max_attempts: u32,
}

impl RKF45Integrator {
    /// Create an integrator with the default attempt cap
    pub fn new() -> Self {
        Self::with_max_attempts(MAX_ATTEMPTS)
    }

    /// Create an integrator that gives up shrinking after `max_attempts`
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        assert!(max_attempts > 0, "At least one attempt is required");
        RKF45Integrator {
            buffers: StageBuffers::new(),
            max_attempts,
        }
    }

    /// Attempt cap
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the six stages with step `h` and return the scaled error ratio
    fn attempt(
        &mut self,
        masses: &mut [Mass],
        springs: &[Spring],
        forces: &mut ForceAccumulator,
        h: f64,
        precision: f64,
    ) -> f64 {
        let buffers = &mut self.buffers;
        let tableau: [&[f64]; 5] = [&A2, &A3, &A4, &A5, &A6];

        for (stage, coeffs) in tableau.iter().enumerate() {
            forces.accumulate(masses, springs);
            buffers.sample(stage, masses, h);
            buffers.set_provisional(masses, coeffs);
        }
        forces.accumulate(masses, springs);
        buffers.sample(5, masses, h);

        let mut max_error = ERROR_FLOOR;
        for j in 0..buffers.free_count() {
            let mut err = glam::DVec2::ZERO;
            let mut err_v = glam::DVec2::ZERO;
            for (stage, c) in ERR.iter().enumerate() {
                let k = buffers.stage(stage)[j];
                err += *c * k.position;
                err_v += *c * k.velocity;
            }
            let total = err.x.abs() + err.y.abs() + err_v.x.abs() + err_v.y.abs();
            // NaN compares false and never lowers the maximum
            if total > max_error || total.is_nan() {
                max_error = total;
            }
        }

        trace!("RKF45 attempt h={} raw error {}", h, max_error);
        max_error / precision
    }
}

impl Default for RKF45Integrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Integrator for RKF45Integrator {
    fn name(&self) -> &str {
        "Runge-Kutta-Fehlberg 4(5)"
    }

    fn step(
        &mut self,
        masses: &mut [Mass],
        springs: &[Spring],
        params: &mut SimParams,
        forces: &mut ForceAccumulator,
    ) -> StepReport {
        self.buffers.begin(masses);
        let mut attempts = 0;

        let (h, ratio) = loop {
            attempts += 1;
            params.time_step = params.time_step.clamp(DT_MIN, DT_MAX);
            let h = params.time_step;
            let ratio = self.attempt(masses, springs, forces, h, params.precision);

            if ratio < 1.0 {
                params.time_step *= 0.9 * (-ratio.ln() / 8.0).exp();
                debug!("RKF45 accepted h={} ratio={:.3e} next={}", h, ratio, params.time_step);
                break (h, ratio);
            }
            if ratio.is_nan() {
                warn!("RKF45 error estimate is not finite, accepting h={}", h);
                break (h, ratio);
            }
            if h > DT_MIN {
                if attempts >= self.max_attempts {
                    warn!(
                        "RKF45 gave up after {} attempts at h={} ratio={:.3e}",
                        attempts, h, ratio
                    );
                    break (h, ratio);
                }
                self.buffers.restore(masses);
                params.time_step *= 0.9 * (-ratio.ln() / 4.0).exp();
                debug!("RKF45 rejected h={} ratio={:.3e} retry={}", h, ratio, params.time_step);
                continue;
            }
            debug!("RKF45 accepted h={} at the minimum step, ratio={:.3e}", h, ratio);
            break (h, ratio);
        };

        let buffers = &self.buffers;
        buffers.commit(masses, |j| buffers.combine(j, &B5));

        StepReport {
            dt_used: h,
            next_dt: params.time_step,
            attempts,
            error_ratio: Some(ratio),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bounds, ForceKind};
    use crate::ecs::MassId;
    use glam::DVec2;

    fn accumulator(params: &SimParams) -> ForceAccumulator {
        ForceAccumulator::from_params(params, Bounds::new(800.0, 600.0))
    }

    fn anchored_spring(ks: f64, stretch: f64) -> (Vec<Mass>, Vec<Spring>) {
        let masses = vec![
            Mass::new(1.0).fixed(),
            Mass::new(1.0).with_position(DVec2::new(10.0 + stretch, 0.0)),
        ];
        let springs = vec![Spring::new(MassId::new(0), MassId::new(1), ks, 0.0, 10.0)];
        (masses, springs)
    }

    #[test]
    fn test_weights_are_consistent() {
        assert!((B5.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(ERR.iter().sum::<f64>().abs() < 1e-12);
        let rows: [&[f64]; 5] = [&A2, &A3, &A4, &A5, &A6];
        for (row, c) in rows.iter().zip([0.2, 0.3, 0.6, 1.0, 0.875]) {
            assert!((row.iter().sum::<f64>() - c).abs() < 1e-12);
        }
    }

    #[test]
    fn test_free_motion_grows_step() {
        let mut params = SimParams::default().with_adaptive(1.0).with_time_step(0.01);
        let mut forces = accumulator(&params);
        let mut masses = vec![Mass::new(1.0).with_velocity(DVec2::new(1.0, 0.0))];

        let report = RKF45Integrator::new().step(&mut masses, &[], &mut params, &mut forces);

        assert_eq!(report.attempts, 1);
        assert_eq!(report.dt_used, 0.01);
        // Error floor gives the maximum growth factor
        let growth = 0.9 * (-(ERROR_FLOOR).ln() / 8.0).exp();
        assert!((report.next_dt - 0.01 * growth).abs() < 1e-12);
        assert!((masses[0].position.x - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_step_clamped_to_range() {
        let mut params = SimParams::default().with_adaptive(1.0).with_time_step(5.0);
        let mut forces = accumulator(&params);
        let mut masses = vec![Mass::new(1.0)];
        let report = RKF45Integrator::new().step(&mut masses, &[], &mut params, &mut forces);
        assert_eq!(report.dt_used, DT_MAX);

        params.time_step = 1e-9;
        let report = RKF45Integrator::new().step(&mut masses, &[], &mut params, &mut forces);
        assert_eq!(report.dt_used, DT_MIN);
    }

    #[test]
    fn test_stiff_spring_rejects_and_shrinks() {
        let (mut masses, springs) = anchored_spring(10000.0, 5.0);
        let mut params = SimParams::default().with_adaptive(1e-3).with_time_step(DT_MAX);
        let mut forces = accumulator(&params);

        let report = RKF45Integrator::new().step(&mut masses, &springs, &mut params, &mut forces);

        assert!(report.attempts > 1);
        assert!(report.dt_used < DT_MAX);
        let ratio = report.error_ratio.unwrap();
        assert!(ratio < 1.0 || report.dt_used == DT_MIN);
        assert!(masses[1].position.is_finite());
    }

    #[test]
    fn test_minimum_step_accepts_large_error() {
        // Tolerance so tight nothing passes; the step bottoms out at DT_MIN
        let (mut masses, springs) = anchored_spring(1.0e6, 5.0);
        let mut params = SimParams::default().with_adaptive(1e-30).with_time_step(DT_MAX);
        let mut forces = accumulator(&params);

        let report = RKF45Integrator::new().step(&mut masses, &springs, &mut params, &mut forces);

        assert_eq!(report.dt_used, DT_MIN);
        assert!(report.error_ratio.unwrap() >= 1.0);
        assert!(report.attempts <= MAX_ATTEMPTS);
    }

    #[test]
    fn test_attempt_cap() {
        let (mut masses, springs) = anchored_spring(1.0e4, 5.0);
        let mut params = SimParams::default().with_adaptive(1e-3).with_time_step(DT_MAX);
        let mut forces = accumulator(&params);

        let mut integrator = RKF45Integrator::with_max_attempts(1);
        assert_eq!(integrator.max_attempts(), 1);
        let report = integrator.step(&mut masses, &springs, &mut params, &mut forces);

        assert_eq!(report.attempts, 1);
        assert_eq!(report.dt_used, DT_MAX);
        assert!(report.error_ratio.unwrap() >= 1.0);
    }

    #[test]
    fn test_fixed_masses_untouched() {
        let mut params = SimParams::default()
            .with_adaptive(1.0)
            .with_force(ForceKind::Gravity, 10.0, 0.0);
        let mut forces = accumulator(&params);
        let (mut masses, springs) = anchored_spring(5.0, 1.0);

        let mut integrator = RKF45Integrator::new();
        for _ in 0..20 {
            integrator.step(&mut masses, &springs, &mut params, &mut forces);
        }
        assert_eq!(masses[0].position, DVec2::ZERO);
        assert_eq!(masses[0].velocity, DVec2::ZERO);
    }

    #[test]
    fn test_rkf45_tracks_oscillator() {
        let ks: f64 = 4.0;
        let (mut masses, springs) = anchored_spring(ks, 1.0);
        let mut params = SimParams::default().with_adaptive(1e-4).with_time_step(0.01);
        let mut forces = accumulator(&params);

        let mut integrator = RKF45Integrator::new();
        let mut t = 0.0;
        while t < 3.0 {
            t += integrator.step(&mut masses, &springs, &mut params, &mut forces).dt_used;
        }

        let expected = 10.0 + (ks.sqrt() * t).cos();
        assert!((masses[1].position.x - expected).abs() < 1e-2);
    }
}
