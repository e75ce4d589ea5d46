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
//! Entity handles and status flags
//!
//! Masses and springs are addressed by stable integer handles. Slots are
//! never compacted, so a handle stays valid (possibly pointing at a dead
//! entity) until the whole store is cleared.

use std::fmt;

/// Stable handle of a mass in the entity store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MassId(usize);

impl MassId {
    /// Create a handle from a raw slot index
    pub const fn new(index: usize) -> Self {
        MassId(index)
    }

    /// Get the raw slot index
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for MassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mass({})", self.0)
    }
}

/// Stable handle of a spring in the entity store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpringId(usize);

impl SpringId {
    /// Create a handle from a raw slot index
    pub const fn new(index: usize) -> Self {
        SpringId(index)
    }

    /// Get the raw slot index
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SpringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spring({})", self.0)
    }
}

/// Lifecycle and editing flags carried by every entity
///
/// `fixed` and `temp_fixed` only have meaning for masses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    /// The entity takes part in the simulation
    pub alive: bool,
    /// The entity is part of the current editor selection
    pub selected: bool,
    /// The mass is an anchor and is never integrated
    pub fixed: bool,
    /// The mass was fixed only for the duration of a drag
    pub temp_fixed: bool,
}

impl Status {
    /// Status of a freshly created entity
    pub fn alive() -> Self {
        Status {
            alive: true,
            ..Status::default()
        }
    }

    /// Status with every flag cleared
    pub fn dead() -> Self {
        Status::default()
    }

    /// Alive and not fixed
    pub fn is_free(&self) -> bool {
        self.alive && !self.fixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_roundtrip() {
        let id = MassId::new(42);
        assert_eq!(id.index(), 42);
        assert_eq!(format!("{}", id), "Mass(42)");
        assert_eq!(format!("{}", SpringId::new(3)), "Spring(3)");
    }

    #[test]
    fn test_status_flags() {
        let mut status = Status::alive();
        assert!(status.is_free());

        status.fixed = true;
        assert!(!status.is_free());

        let dead = Status::dead();
        assert!(!dead.alive);
        assert!(!dead.is_free());
    }
}
