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
//! # Spring Mesh
//!
//! A 2-D mass-spring simulation engine: point masses joined by damped
//! springs, moved by configurable body forces and kept inside a box by
//! sticky, bouncy walls.
//!
//! ## Features
//!
//! - **Entity Store**: Stable-handle arenas for masses and springs with cascading deletion
//! - **Force Accumulation**: Gravity, center-of-mass pull, drag, point attraction, wall forces and springs
//! - **Integration**: Fixed-step RK4 and error-controlled RKF45 with rollback
//! - **Contacts**: Wall stick/bounce and pairwise oblique collisions
//! - **Scenes**: Line-oriented text save, load and insert
//! - **Parallelization**: Optional Rayon search for picking
//!
//! ## Example
//!
//! ```rust
//! use glam::DVec2;
//! use spring_mesh::config::{ForceKind, SimParams};
//! use spring_mesh::{Physics, World};
//!
//! let params = SimParams::default().with_force(ForceKind::Gravity, 10.0, 0.0);
//! let mut world = World::with_params(params);
//! let anchor = world.add_mass(DVec2::new(400.0, 500.0));
//! let bob = world.add_mass(DVec2::new(400.0, 400.0));
//! world.mass_mut(anchor).unwrap().set_fixed(true);
//! world.add_spring(anchor, bob);
//!
//! let mut physics = Physics::new(800.0, 600.0);
//! for _ in 0..100 {
//!     physics.advance(&mut world);
//! }
//! assert!(world.mass(bob).unwrap().position.y < 400.0);
//! ```

#![warn(missing_docs)]

/// Simulation parameters
pub mod config;

/// Masses, springs and the world that owns them
pub mod ecs;

/// Numerical integration methods
pub mod integration;

/// Wall and collision handling after each step
pub mod contact;

/// Redraw pacing
pub mod pacer;

/// The step entry point
pub mod engine;

/// Scene text format
pub mod scene;

pub use config::SimParams;
pub use ecs::{MassId, SpringId, World};
pub use engine::Physics;
