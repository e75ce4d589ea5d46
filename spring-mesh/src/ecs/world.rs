//! World management
//!
//! The [`World`] owns every mass and spring together with the simulation
//! parameters. It is a plain value: cloning it (or taking a [`Snapshot`])
//! captures the complete scene, and restoring one replaces it wholesale.
//!
//! Slot 0 of each arena is reserved for the preview sentinels: a fixed,
//! never-alive mass that follows the cursor and a spring from it to the mass
//! being dragged, alive only while a preview is attached.

use crate::config::SimParams;
use crate::ecs::components::{Mass, Spring};
use crate::ecs::{Arena, Component, MassId, SpringId, Status};
use glam::DVec2;
use log::{debug, warn};

/// Handle of the preview (cursor) mass
pub const FAKE_MASS: MassId = MassId::new(0);

/// Handle of the preview spring
pub const FAKE_SPRING: SpringId = SpringId::new(0);

/// Association from external mass numbers to store handles
///
/// Built while copying masses (duplication, file loads) and used to remap
/// spring endpoints that still refer to the external numbering.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    from: Vec<i64>,
    to: Vec<MassId>,
}

impl IdMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that external number `from` became `to`
    pub fn insert(&mut self, from: i64, to: MassId) {
        self.from.push(from);
        self.to.push(to);
    }

    /// Resolve an external number; the first recorded match wins
    pub fn lookup(&self, from: i64) -> Option<MassId> {
        self.from
            .iter()
            .position(|&f| f == from)
            .map(|i| self.to[i])
    }

    /// Number of recorded associations
    pub fn len(&self) -> usize {
        self.from.len()
    }

    /// Check if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }
}

/// A spring whose endpoints use external mass numbers
#[derive(Debug, Clone, PartialEq)]
pub struct SpringRecord {
    /// External number of the spring, only used in diagnostics
    pub id: i64,
    /// External number of the first endpoint
    pub m1: i64,
    /// External number of the second endpoint
    pub m2: i64,
    /// Stiffness
    pub ks: f64,
    /// Damping
    pub kd: f64,
    /// Rest length
    pub rest_length: f64,
}

/// Entities to merge into a world in one go
#[derive(Debug, Clone, Default)]
pub struct EntityBatch {
    /// Masses keyed by their external number
    pub masses: Vec<(i64, Mass)>,
    /// Springs referring to the external numbers above
    pub springs: Vec<SpringRecord>,
}

/// What [`World::merge`] created
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    /// New masses in batch order
    pub masses: Vec<MassId>,
    /// New springs in batch order, minus dropped ones
    pub springs: Vec<SpringId>,
    /// Springs that could not be connected
    pub dropped_springs: usize,
    /// External number to handle association
    pub map: IdMap,
}

/// What [`World::duplicate_selected`] created
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Duplication {
    /// Copies of the selected masses
    pub masses: Vec<MassId>,
    /// Copies of the selected springs
    pub springs: Vec<SpringId>,
}

/// Deep copy of a world's entities and parameters
#[derive(Debug, Clone)]
pub struct Snapshot {
    masses: Arena<Mass>,
    springs: Arena<Spring>,
    params: SimParams,
}

impl Snapshot {
    /// Parameters captured in the snapshot
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Number of live masses captured
    pub fn live_mass_count(&self) -> usize {
        self.masses.alive_count()
    }
}

/// The entity store plus simulation parameters
#[derive(Debug, Clone)]
pub struct World {
    pub(crate) masses: Arena<Mass>,
    pub(crate) springs: Arena<Spring>,
    pub(crate) params: SimParams,
    saved: Option<Box<Snapshot>>,
}

impl World {
    /// Create an empty world with default parameters
    pub fn new() -> Self {
        Self::with_params(SimParams::default())
    }

    /// Create an empty world with the given parameters
    pub fn with_params(params: SimParams) -> Self {
        let mut world = World {
            masses: Arena::new(),
            springs: Arena::new(),
            params,
            saved: None,
        };
        world.init_objects();
        world
    }

    fn init_objects(&mut self) {
        let mut cursor = Mass::default();
        cursor.status = Status {
            fixed: true,
            ..Status::dead()
        };
        let mass = self.masses.push(cursor);

        let mut preview = Spring::new(MassId::new(mass), MassId::new(mass), 0.0, 0.0, 0.0);
        preview.status = Status::dead();
        let spring = self.springs.push(preview);
        debug_assert_eq!((mass, spring), (FAKE_MASS.index(), FAKE_SPRING.index()));

        self.add_mass_parent(FAKE_MASS, FAKE_SPRING);
    }

    /// Simulation parameters
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// Mutable simulation parameters
    pub fn params_mut(&mut self) -> &mut SimParams {
        &mut self.params
    }

    /// Mass slots, dead ones included
    pub fn masses(&self) -> &Arena<Mass> {
        &self.masses
    }

    /// Spring slots, dead ones included
    pub fn springs(&self) -> &Arena<Spring> {
        &self.springs
    }

    /// Split borrow used by the integrators
    pub fn parts_mut(&mut self) -> (&mut [Mass], &[Spring], &mut SimParams) {
        (
            self.masses.as_mut_slice(),
            self.springs.as_slice(),
            &mut self.params,
        )
    }

    /// Number of mass slots
    pub fn mass_count(&self) -> usize {
        self.masses.len()
    }

    /// Number of spring slots
    pub fn spring_count(&self) -> usize {
        self.springs.len()
    }

    /// Number of live masses
    pub fn live_mass_count(&self) -> usize {
        self.masses.alive_count()
    }

    /// Number of live springs
    pub fn live_spring_count(&self) -> usize {
        self.springs.alive_count()
    }

    /// Whether any spring is alive
    pub fn any_spring_alive(&self) -> bool {
        self.springs.iter_alive().next().is_some()
    }

    /// Get a mass by handle
    pub fn mass(&self, id: MassId) -> Option<&Mass> {
        self.masses.get(id.index())
    }

    /// Get a mutable mass by handle
    pub fn mass_mut(&mut self, id: MassId) -> Option<&mut Mass> {
        self.masses.get_mut(id.index())
    }

    /// Get a spring by handle
    pub fn spring(&self, id: SpringId) -> Option<&Spring> {
        self.springs.get(id.index())
    }

    /// Get a mutable spring by handle
    pub fn spring_mut(&mut self, id: SpringId) -> Option<&mut Spring> {
        self.springs.get_mut(id.index())
    }

    /// Whether the handle is the preview mass
    pub fn is_fake_mass(&self, id: MassId) -> bool {
        id == FAKE_MASS
    }

    /// Whether the handle is the preview spring
    pub fn is_fake_spring(&self, id: SpringId) -> bool {
        id == FAKE_SPRING
    }

    /// Append a live default mass and return its handle
    pub fn create_mass(&mut self) -> MassId {
        self.insert_mass(Mass::default())
    }

    /// Append a mass as given, resetting its bookkeeping
    pub fn insert_mass(&mut self, mut mass: Mass) -> MassId {
        mass.parents.clear();
        mass.status.alive = true;
        mass.trial = None;
        MassId::new(self.masses.push(mass))
    }

    /// Place a mass using the current default mass, elasticity and fix flag
    pub fn add_mass(&mut self, position: DVec2) -> MassId {
        let mut mass = Mass::new(self.params.default_mass)
            .with_position(position)
            .with_elasticity(self.params.default_elasticity);
        mass.set_fixed(self.params.fix_new_masses);
        self.insert_mass(mass)
    }

    /// Append an unconnected live spring and return its handle
    pub fn create_spring(&mut self) -> SpringId {
        SpringId::new(self.springs.push(Spring::default()))
    }

    /// Append a spring and register it with both endpoints
    ///
    /// Returns `None` if an endpoint is out of range.
    pub fn insert_spring(&mut self, mut spring: Spring) -> Option<SpringId> {
        if spring.m1.index() >= self.masses.len() || spring.m2.index() >= self.masses.len() {
            return None;
        }
        spring.status.alive = true;
        let (m1, m2) = spring.endpoints();
        let id = SpringId::new(self.springs.push(spring));
        self.add_mass_parent(m1, id);
        self.add_mass_parent(m2, id);
        Some(id)
    }

    /// Connect two live masses with the current default ks/kd
    ///
    /// The rest length is the present distance between the masses.
    pub fn add_spring(&mut self, m1: MassId, m2: MassId) -> Option<SpringId> {
        if m1 == m2 {
            return None;
        }
        let p1 = self.mass(m1).filter(|m| m.is_alive())?.position;
        let p2 = self.mass(m2).filter(|m| m.is_alive())?.position;
        let spring = Spring::new(
            m1,
            m2,
            self.params.default_ks,
            self.params.default_kd,
            p1.distance(p2),
        );
        self.insert_spring(spring)
    }

    pub(crate) fn add_mass_parent(&mut self, which: MassId, parent: SpringId) {
        if let Some(mass) = self.masses.get_mut(which.index()) {
            mass.parents.push(parent);
        }
    }

    fn remove_mass_parent(&mut self, which: MassId, parent: SpringId) {
        if let Some(mass) = self.masses.get_mut(which.index()) {
            if mass.is_alive() {
                if let Some(pos) = mass.parents.iter().position(|&p| p == parent) {
                    mass.parents.remove(pos);
                }
            }
        }
    }

    /// Delete a spring and unregister it from both endpoints
    pub fn delete_spring(&mut self, id: SpringId) {
        let endpoints = match self.springs.get_mut(id.index()) {
            Some(spring) if spring.is_alive() => {
                spring.status = Status::dead();
                spring.endpoints()
            }
            _ => return,
        };
        self.remove_mass_parent(endpoints.0, id);
        self.remove_mass_parent(endpoints.1, id);
    }

    /// Delete a mass together with every spring attached to it
    pub fn delete_mass(&mut self, id: MassId) {
        let parents = match self.masses.get_mut(id.index()) {
            Some(mass) if mass.is_alive() => {
                mass.status = Status::dead();
                mass.parents.clone()
            }
            Some(_) => Vec::new(),
            None => return,
        };
        for spring in parents {
            self.delete_spring(spring);
        }
        if self.params.center == Some(id) {
            self.params.center = None;
        }
    }

    /// Delete every selected mass (with its springs), then every selected spring
    pub fn delete_selected(&mut self) {
        for i in 0..self.masses.len() {
            if self.masses.as_slice()[i].is_selected() {
                self.delete_mass(MassId::new(i));
            }
        }
        for i in 0..self.springs.len() {
            if self.springs.as_slice()[i].is_selected() {
                self.delete_spring(SpringId::new(i));
            }
        }
    }

    /// Remove every entity, keeping the parameters
    ///
    /// All handles are invalidated; the preview sentinels are recreated.
    pub fn delete_all(&mut self) {
        self.masses.clear();
        self.springs.clear();
        self.params.center = None;
        self.init_objects();
    }

    /// Remove every entity and restore default parameters
    pub fn reset(&mut self) {
        self.delete_all();
        self.params.reset();
    }

    /// Rebuild every parent list from the live springs
    ///
    /// Dead springs are skipped: they are already unlinked from their
    /// endpoints and deleting them again is a no-op.
    pub fn reconnect_masses(&mut self) {
        for mass in self.masses.iter_mut() {
            mass.parents.clear();
        }
        let links: Vec<(SpringId, MassId, MassId)> = self
            .springs
            .iter_alive()
            .map(|(i, s)| (SpringId::new(i), s.m1, s.m2))
            .collect();
        for (spring, m1, m2) in links {
            self.add_mass_parent(m1, spring);
            self.add_mass_parent(m2, spring);
        }
        let linked = self
            .mass(FAKE_MASS)
            .map(|m| m.parents.contains(&FAKE_SPRING))
            .unwrap_or(true);
        if !linked {
            self.add_mass_parent(FAKE_MASS, FAKE_SPRING);
        }
    }

    /// Copy the selection
    ///
    /// Every selected mass is copied (unselected, unconnected). Every selected
    /// spring is copied with its endpoints remapped to the copies; an endpoint
    /// that was not copied keeps pointing at the original mass, and a spring
    /// with neither endpoint copied is dropped.
    pub fn duplicate_selected(&mut self) -> Duplication {
        let mut map = IdMap::new();
        let mut result = Duplication::default();

        for i in 0..self.masses.len() {
            let source = &self.masses.as_slice()[i];
            if !source.is_selected() {
                continue;
            }
            let mut copy = source.clone();
            copy.status.selected = false;
            copy.parents.clear();
            let to = MassId::new(self.masses.push(copy));
            map.insert(i as i64, to);
            result.masses.push(to);
        }

        let spring_start = self.springs.len();
        for i in 0..spring_start {
            let source = &self.springs.as_slice()[i];
            if !source.is_selected() {
                continue;
            }
            let m1 = map.lookup(source.m1.index() as i64);
            let m2 = map.lookup(source.m2.index() as i64);
            if m1.is_none() && m2.is_none() {
                debug!("Skipping copy of spring {} with no duplicated endpoint", i);
                continue;
            }
            let mut copy = source.clone();
            copy.status.selected = false;
            copy.m1 = m1.unwrap_or(copy.m1);
            copy.m2 = m2.unwrap_or(copy.m2);
            if let Some(id) = self.insert_spring(copy) {
                result.springs.push(id);
            }
        }

        result
    }

    /// Merge externally numbered entities into the world
    ///
    /// Spring endpoints are resolved through the masses of the same batch;
    /// a spring with an unresolved endpoint is dropped with a warning.
    /// Parent lists are rebuilt afterwards.
    pub fn merge(&mut self, batch: EntityBatch, select_new: bool) -> MergeReport {
        let mut report = MergeReport::default();

        for (external, mut mass) in batch.masses {
            mass.status.selected = select_new;
            let id = self.insert_mass(mass);
            report.map.insert(external, id);
            report.masses.push(id);
        }

        for record in batch.springs {
            match (report.map.lookup(record.m1), report.map.lookup(record.m2)) {
                (Some(m1), Some(m2)) => {
                    let mut spring = Spring::new(m1, m2, record.ks, record.kd, record.rest_length);
                    spring.status.selected = select_new;
                    report.springs.push(SpringId::new(self.springs.push(spring)));
                }
                _ => {
                    warn!(
                        "Spring {} not connected to existing mass ({} -> {}), dropping",
                        record.id, record.m1, record.m2
                    );
                    report.dropped_springs += 1;
                }
            }
        }

        self.reconnect_masses();
        report
    }

    /// Deep copy of entities and parameters
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            masses: self.masses.clone(),
            springs: self.springs.clone(),
            params: self.params.clone(),
        }
    }

    /// Replace entities and parameters with a snapshot
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.masses = snapshot.masses.clone();
        self.springs = snapshot.springs.clone();
        self.params = snapshot.params.clone();
    }

    /// Keep a snapshot inside the world for a later [`World::restore_state`]
    pub fn save_state(&mut self) {
        self.saved = Some(Box::new(self.snapshot()));
    }

    /// Return to the state kept by [`World::save_state`]
    ///
    /// Returns false if nothing was saved.
    pub fn restore_state(&mut self) -> bool {
        match self.saved.take() {
            Some(saved) => {
                self.restore(&saved);
                self.saved = Some(saved);
                true
            }
            None => false,
        }
    }

    /// Attach the preview spring from the cursor mass to `to`
    pub fn attach_fake_spring(&mut self, to: MassId) {
        if to.index() >= self.masses.len() || to == FAKE_MASS {
            return;
        }
        self.delete_spring(FAKE_SPRING);
        let (ks, kd) = (self.params.default_ks, self.params.default_kd);
        if let Some(spring) = self.springs.get_mut(FAKE_SPRING.index()) {
            spring.m1 = FAKE_MASS;
            spring.m2 = to;
            spring.ks = ks;
            spring.kd = kd;
            spring.rest_length = 0.0;
            spring.status = Status::alive();
        }
        if let Some(cursor) = self.masses.get(FAKE_MASS.index()) {
            if !cursor.parents.contains(&FAKE_SPRING) {
                self.add_mass_parent(FAKE_MASS, FAKE_SPRING);
            }
        }
        self.add_mass_parent(to, FAKE_SPRING);
    }

    /// Detach the preview spring
    pub fn kill_fake_spring(&mut self) {
        if let Some(spring) = self.springs.get_mut(FAKE_SPRING.index()) {
            if !spring.is_alive() {
                return;
            }
            spring.status = Status::dead();
            let to = spring.m2;
            self.remove_mass_parent(to, FAKE_SPRING);
        }
    }

    /// Move the cursor mass
    pub fn move_fake_mass(&mut self, position: DVec2) {
        if let Some(cursor) = self.masses.get_mut(FAKE_MASS.index()) {
            cursor.position = position;
        }
    }

    /// Clear the force center if its mass has died
    pub fn validate_center(&mut self) {
        if let Some(center) = self.params.center {
            let alive = self.mass(center).map(|m| m.is_alive()).unwrap_or(false);
            if !alive {
                self.params.center = None;
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
