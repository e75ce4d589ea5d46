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
//! Picking, selection and edits applied to the selection

use crate::ecs::components::{screen_radius, Mass};
use crate::ecs::{Component, MassId, SpringId, World};
use glam::DVec2;
use log::warn;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Squared pick distance for masses, measured outside the wall radius
const MASS_PROXIMITY_SQ: f64 = 64.0;

/// Pick distance for springs
const SPRING_PROXIMITY: f64 = 8.0;

/// Result of a pick query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Picked {
    /// A mass was hit
    Mass(MassId),
    /// A spring was hit
    Spring(SpringId),
}

fn mass_candidate(index: usize, mass: &Mass, point: DVec2, threshold: f64) -> Option<(f64, usize)> {
    if !mass.is_alive() {
        return None;
    }
    let radius = f64::from(screen_radius(mass.radius));
    let dist_sq = mass.position.distance_squared(point);
    if dist_sq - radius * radius < threshold {
        Some((dist_sq, index))
    } else {
        None
    }
}

fn closer(a: (f64, usize), b: (f64, usize)) -> (f64, usize) {
    if b.0 < a.0 || (b.0 == a.0 && b.1 < a.1) {
        b
    } else {
        a
    }
}

fn segment_distance(point: DVec2, p1: DVec2, p2: DVec2) -> Option<f64> {
    let lo = p1.min(p2) - SPRING_PROXIMITY;
    let hi = p1.max(p2) + SPRING_PROXIMITY;
    if point.x <= lo.x || point.x >= hi.x || point.y <= lo.y || point.y >= hi.y {
        return None;
    }
    let a = p2.y - p1.y;
    let b = p1.x - p2.x;
    let c = p1.y * p2.x - p2.y * p1.x;
    let norm = a.hypot(b);
    if norm == 0.0 {
        return Some(point.distance(p1));
    }
    Some(((point.x * a + point.y * b + c) / norm).abs())
}

impl World {
    /// Find the object under `point`
    ///
    /// Masses take priority: any live mass within the pick distance of its
    /// wall radius qualifies, and the one with the smallest center distance
    /// wins. Otherwise the live spring with the smallest perpendicular
    /// distance below the spring tolerance is returned. `masses_only` widens
    /// the mass tolerance sixfold and skips springs.
    pub fn nearest_object(&self, point: DVec2, masses_only: bool) -> Option<Picked> {
        let threshold = if masses_only {
            MASS_PROXIMITY_SQ * 36.0
        } else {
            MASS_PROXIMITY_SQ
        };
        let masses = self.masses.as_slice();

        #[cfg(feature = "parallel")]
        let best = masses
            .par_iter()
            .enumerate()
            .filter_map(|(i, m)| mass_candidate(i, m, point, threshold))
            .reduce_with(closer);

        #[cfg(not(feature = "parallel"))]
        let best = masses
            .iter()
            .enumerate()
            .filter_map(|(i, m)| mass_candidate(i, m, point, threshold))
            .reduce(closer);

        if let Some((_, index)) = best {
            return Some(Picked::Mass(MassId::new(index)));
        }
        if masses_only {
            return None;
        }

        let mut closest = None;
        let mut min_dist = SPRING_PROXIMITY;
        for (i, spring) in self.springs.iter_alive() {
            let (p1, p2) = match (self.mass(spring.m1), self.mass(spring.m2)) {
                (Some(m1), Some(m2)) => (m1.position, m2.position),
                _ => continue,
            };
            if let Some(dist) = segment_distance(point, p1, p2) {
                if dist < min_dist {
                    min_dist = dist;
                    closest = Some(Picked::Spring(SpringId::new(i)));
                }
            }
        }
        closest
    }

    /// Whether any mass or spring is selected
    pub fn anything_selected(&self) -> bool {
        self.masses.iter().any(|(_, m)| m.is_selected())
            || self.springs.iter().any(|(_, s)| s.is_selected())
    }

    /// Select a picked object, or flip its selection when `toggle` is set
    pub fn select_object(&mut self, picked: Picked, toggle: bool) {
        let status = match picked {
            Picked::Mass(id) => self.masses.get_mut(id.index()).map(|m| m.status_mut()),
            Picked::Spring(id) => self.springs.get_mut(id.index()).map(|s| s.status_mut()),
        };
        if let Some(status) = status {
            status.selected = if toggle { !status.selected } else { true };
        }
    }

    /// Select every live mass inside the rectangle spanned by two corners,
    /// and every live spring with both ends inside
    pub fn select_in_rect(&mut self, a: DVec2, b: DVec2) {
        let (lo, hi) = (a.min(b), a.max(b));
        let inside = |p: DVec2| lo.x <= p.x && p.x <= hi.x && lo.y <= p.y && p.y <= hi.y;

        for mass in self.masses.iter_mut() {
            if mass.is_alive() && inside(mass.position) {
                mass.set_selected(true);
            }
        }

        let hits: Vec<usize> = self
            .springs
            .iter_alive()
            .filter(|(_, s)| {
                let p1 = self.mass(s.m1).map(|m| m.position);
                let p2 = self.mass(s.m2).map(|m| m.position);
                matches!((p1, p2), (Some(p1), Some(p2)) if inside(p1) && inside(p2))
            })
            .map(|(i, _)| i)
            .collect();
        for i in hits {
            if let Some(spring) = self.springs.get_mut(i) {
                spring.set_selected(true);
            }
        }
    }

    /// Clear the selection
    pub fn unselect_all(&mut self) {
        for mass in self.masses.iter_mut() {
            mass.set_selected(false);
        }
        for spring in self.springs.iter_mut() {
            spring.set_selected(false);
        }
    }

    /// Select every live entity
    pub fn select_all(&mut self) {
        for mass in self.masses.iter_mut() {
            if mass.is_alive() {
                mass.set_selected(true);
            }
        }
        for spring in self.springs.iter_mut() {
            if spring.is_alive() {
                spring.set_selected(true);
            }
        }
    }

    /// Translate every selected mass
    pub fn move_selected(&mut self, delta: DVec2) {
        for mass in self.masses.iter_mut().filter(|m| m.is_selected()) {
            mass.position += delta;
        }
    }

    /// Set (or add to, when `relative`) the velocity of every selected mass
    pub fn set_selected_velocity(&mut self, velocity: DVec2, relative: bool) {
        for mass in self.masses.iter_mut().filter(|m| m.is_selected()) {
            if relative {
                mass.velocity += velocity;
            } else {
                mass.velocity = velocity;
            }
        }
    }

    /// Pin the selection for a drag, or release what the drag pinned
    ///
    /// With `store` set, every selected mass that is not already fixed becomes
    /// fixed and remembers that the fix is temporary. Without it, masses
    /// fixed that way are released.
    pub fn set_temp_fixed(&mut self, store: bool) {
        for mass in self.masses.iter_mut().filter(|m| m.is_selected()) {
            if store {
                mass.status.temp_fixed = false;
                if !mass.is_fixed() {
                    mass.status.temp_fixed = true;
                    mass.set_fixed(true);
                }
            } else if mass.is_temp_fixed() {
                mass.set_fixed(false);
            }
        }
    }

    /// Make the current length the rest length of every selected spring
    pub fn set_rest_length_of_selected(&mut self) {
        let masses = self.masses.as_slice();
        for spring in self.springs.iter_mut().filter(|s| s.is_selected()) {
            if let (Some(m1), Some(m2)) = (masses.get(spring.m1.index()), masses.get(spring.m2.index())) {
                spring.rest_length = m1.position.distance(m2.position);
            }
        }
    }

    /// Use the selected mass as the force center
    ///
    /// Clears the center when nothing is selected; does nothing when more
    /// than one mass is selected.
    pub fn set_center_from_selection(&mut self) {
        let mut selected = self.masses.iter().filter(|(_, m)| m.is_selected()).map(|(i, _)| i);
        match (selected.next(), selected.next()) {
            (Some(i), None) => self.params.center = Some(MassId::new(i)),
            (None, _) => self.params.center = None,
            _ => {}
        }
    }

    /// Copy values shared by the whole selection into the defaults
    ///
    /// A value is copied when every selected mass (or spring) agrees on it.
    /// Returns whether any default changed.
    pub fn eval_selection(&mut self) -> bool {
        let mut changed = false;

        let mut masses = self.masses.iter().map(|(_, m)| m).filter(|m| m.is_selected());
        if let Some(first) = masses.next() {
            let (mut same_mass, mut same_elastic, mut same_fixed) = (true, true, true);
            for m in masses {
                same_mass &= m.mass == first.mass;
                same_elastic &= m.elastic == first.elastic;
                same_fixed &= m.is_fixed() == first.is_fixed();
            }
            let (mass, elastic, fixed) = (first.mass, first.elastic, first.is_fixed());

            let params = &mut self.params;
            if same_mass && params.default_mass != mass {
                params.default_mass = mass;
                changed = true;
            }
            if same_elastic && params.default_elasticity != elastic {
                params.default_elasticity = elastic;
                changed = true;
            }
            if same_fixed && params.fix_new_masses != fixed {
                params.fix_new_masses = fixed;
                changed = true;
            }
        }

        let mut springs = self.springs.iter().map(|(_, s)| s).filter(|s| s.is_selected());
        if let Some(first) = springs.next() {
            let (mut same_ks, mut same_kd) = (true, true);
            for s in springs {
                same_ks &= s.ks == first.ks;
                same_kd &= s.kd == first.kd;
            }
            let (ks, kd) = (first.ks, first.kd);

            let params = &mut self.params;
            if same_ks && params.default_ks != ks {
                params.default_ks = ks;
                changed = true;
            }
            if same_kd && params.default_kd != kd {
                params.default_kd = kd;
                changed = true;
            }
        }

        changed
    }

    /// Set the mass of the selection and make it the default
    ///
    /// A mass that is not positive and finite is refused and nothing changes.
    /// Returns whether the value was applied.
    pub fn set_selected_mass(&mut self, mass: f64) -> bool {
        if !(mass > 0.0 && mass.is_finite()) {
            warn!("Refusing mass {}: must be positive and finite", mass);
            return false;
        }
        self.params.default_mass = mass;
        for m in self.masses.iter_mut().filter(|m| m.is_selected()) {
            m.set_mass(mass);
        }
        true
    }

    /// Set the elasticity of the selection and make it the default
    pub fn set_selected_elasticity(&mut self, elastic: f64) {
        self.params.default_elasticity = elastic;
        for m in self.masses.iter_mut().filter(|m| m.is_selected()) {
            m.elastic = elastic;
        }
    }

    /// Set the stiffness of the selected springs and make it the default
    pub fn set_selected_ks(&mut self, ks: f64) {
        self.params.default_ks = ks;
        for s in self.springs.iter_mut().filter(|s| s.is_selected()) {
            s.ks = ks;
        }
    }

    /// Set the damping of the selected springs and make it the default
    pub fn set_selected_kd(&mut self, kd: f64) {
        self.params.default_kd = kd;
        for s in self.springs.iter_mut().filter(|s| s.is_selected()) {
            s.kd = kd;
        }
    }
}
