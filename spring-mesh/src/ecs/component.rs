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
//! Component storage
//!
//! Entities live in an [`Arena`]: a dense vector of slots that only ever
//! grows. Deleting an entity clears its `alive` flag and leaves a tombstone
//! behind, so indices held elsewhere (spring endpoints, parent lists, the
//! force center) stay valid for the whole lifetime of the store.

use crate::ecs::Status;

/// Trait implemented by everything stored in an [`Arena`]
pub trait Component: Clone + Send + Sync + 'static {
    /// Lifecycle and selection flags of this entity
    fn status(&self) -> &Status;

    /// Mutable access to the flags
    fn status_mut(&mut self) -> &mut Status;

    /// Whether the entity takes part in the simulation
    fn is_alive(&self) -> bool {
        self.status().alive
    }

    /// Whether the entity is part of the current selection
    fn is_selected(&self) -> bool {
        self.status().selected
    }

    /// Set or clear the selection flag
    fn set_selected(&mut self, selected: bool) {
        self.status_mut().selected = selected;
    }
}

/// Append-only slot storage with tombstoned deletion
#[derive(Debug, Clone)]
pub struct Arena<T: Component> {
    slots: Vec<T>,
}

impl<T: Component> Arena<T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an arena with room for `capacity` entities
    pub fn with_capacity(capacity: usize) -> Self {
        Arena {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Append an entity and return its slot index
    pub fn push(&mut self, component: T) -> usize {
        self.slots.push(component);
        self.slots.len() - 1
    }

    /// Get the entity in a slot, dead or alive
    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)
    }

    /// Get mutable access to the entity in a slot
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index)
    }

    /// Get mutable access to two distinct slots at once
    ///
    /// Returns `None` if the indices are equal or out of range.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut T, &mut T)> {
        if a == b || a >= self.slots.len() || b >= self.slots.len() {
            return None;
        }
        if a < b {
            let (head, tail) = self.slots.split_at_mut(b);
            Some((&mut head[a], &mut tail[0]))
        } else {
            let (head, tail) = self.slots.split_at_mut(a);
            Some((&mut tail[0], &mut head[b]))
        }
    }

    /// Number of slots, including tombstones
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the arena has no slots at all
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of live entities
    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|c| c.is_alive()).count()
    }

    /// Iterate over every slot with its index
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots.iter().enumerate()
    }

    /// Iterate over live entities with their index
    pub fn iter_alive(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.iter().filter(|(_, c)| c.is_alive())
    }

    /// Iterate mutably over every slot
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.slots.iter_mut()
    }

    /// Dense view of every slot
    pub fn as_slice(&self) -> &[T] {
        &self.slots
    }

    /// Dense mutable view of every slot
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.slots
    }

    /// Drop every slot, invalidating all handles
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl<T: Component> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
