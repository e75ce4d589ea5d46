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
//! Pairwise oblique collisions
//!
//! Two live masses collide when their centers are closer than the sum of
//! their collision radii and their relative velocity closes along either
//! axis. The response uses a restitution ratio from the mean elasticity,
//! divided by `1 + m_self/m_other` unless the other mass is fixed. Fixed
//! masses act as infinitely heavy and are never updated.
//!
//! The tangential update divides by the x separation; an exactly vertical
//! contact uses a separation of 1e-10 instead.

use crate::ecs::components::Mass;
use crate::ecs::Component;
use glam::DVec2;

/// Substitute for a zero x separation
const MIN_DX: f64 = 1e-10;

/// Resolve one pair; returns whether velocities were updated
pub fn collide_pair(m1: &mut Mass, m2: &mut Mass) -> bool {
    let delta = m2.position - m1.position;
    let (mut dx, dy) = (delta.x, delta.y);
    let (dxq, dyq) = (dx * dx, dy * dy);
    let sum_sq = dxq + dyq;

    if sum_sq.sqrt() >= m1.collision_radius() + m2.collision_radius() {
        return false;
    }

    let (v1, v2) = (m1.velocity, m2.velocity);
    if !((v1.x - v2.x) * dx > 0.0 || (v1.y - v2.y) * dy > 0.0) {
        return false;
    }
    if dx == 0.0 {
        dx = MIN_DX;
    }

    let restitution = 1.0 + (m1.elastic + m2.elastic) / 2.0;
    let axes = Axes { dx, dy, dxq, dyq, sum_sq };

    if !m1.is_fixed() {
        let ratio = if m2.is_fixed() {
            restitution
        } else {
            restitution / (1.0 + m1.mass / m2.mass)
        };
        m1.velocity = axes.respond(v1, v2, ratio);
    }
    if !m2.is_fixed() {
        let ratio = if m1.is_fixed() {
            restitution
        } else {
            restitution / (1.0 + m2.mass / m1.mass)
        };
        m2.velocity = axes.respond(v2, v1, ratio);
    }
    true
}

#[derive(Clone, Copy)]
struct Axes {
    dx: f64,
    dy: f64,
    dxq: f64,
    dyq: f64,
    sum_sq: f64,
}

impl Axes {
    /// New velocity of a body moving at `v` hit by one moving at `other`
    fn respond(&self, v: DVec2, other: DVec2, ratio: f64) -> DVec2 {
        let Axes { dx, dy, dxq, dyq, sum_sq } = *self;
        let vx = (v.x - (v.x - other.x) * ratio) * (dxq / sum_sq) + v.x * (dyq / sum_sq)
            - (v.y - other.y) * ratio * (dx * dy / sum_sq);
        let vy = (vx - v.x) * (dy / dx) + v.y;
        DVec2::new(vx, vy)
    }
}

/// Resolve every colliding pair of live masses, lower index first
///
/// Returns the number of pairs resolved.
pub fn resolve_collisions(masses: &mut [Mass]) -> usize {
    let mut resolved = 0;
    for i in 0..masses.len() {
        let (head, tail) = masses.split_at_mut(i + 1);
        let m1 = &mut head[i];
        if !m1.is_alive() {
            continue;
        }
        for m2 in tail.iter_mut().filter(|m| m.is_alive()) {
            if collide_pair(m1, m2) {
                resolved += 1;
            }
        }
    }
    resolved
}
