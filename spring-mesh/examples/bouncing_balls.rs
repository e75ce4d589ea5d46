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
//! Bouncing Balls Example
//!
//! A grid of loose masses falls into the box, bouncing off the walls and
//! each other. Demonstrates:
//! - Wall bounces with per-mass elasticity
//! - Sticky floors
//! - Pairwise collisions and momentum bookkeeping
//! - Saving the final scene to disk
//!
//! Run with: `RUST_LOG=trace cargo run --example bouncing_balls`

use glam::DVec2;
use spring_mesh::config::{ForceKind, SimParams};
use spring_mesh::scene;
use spring_mesh::{Physics, World};

const ROWS: usize = 4;
const COLS: usize = 6;
const STEPS: usize = 2000;

fn total_momentum(world: &World) -> DVec2 {
    world
        .masses()
        .iter_alive()
        .filter(|(_, m)| m.is_free())
        .map(|(_, m)| m.velocity * m.mass)
        .sum()
}

fn main() {
    env_logger::init();

    println!("=== Bouncing Balls ===\n");

    let params = SimParams::default()
        .with_force(ForceKind::Gravity, 20.0, 0.0)
        .with_stickiness(2.0)
        .with_collisions(true);
    let mut world = World::with_params(params);

    for row in 0..ROWS {
        for col in 0..COLS {
            let position = DVec2::new(150.0 + 90.0 * col as f64, 320.0 + 60.0 * row as f64);
            let id = world.add_mass(position);
            if let Some(mass) = world.mass_mut(id) {
                mass.set_mass(1.0 + (row * COLS + col) as f64 % 3.0);
                mass.elastic = 0.6 + 0.1 * (col % 4) as f64;
                mass.velocity = DVec2::new(30.0 * (col as f64 - 2.5), 0.0);
            }
        }
    }
    println!("Spawned {} masses", world.live_mass_count());

    let mut physics = Physics::new(800.0, 600.0);
    let mut collisions = 0;
    let mut bounces = 0;
    let mut stuck = 0;

    for step in 0..STEPS {
        let redraw = physics.advance(&mut world);
        let contacts = physics.last_contacts();
        collisions += contacts.collisions;
        bounces += contacts.bounced;
        stuck = contacts.stuck;

        if redraw && step % 200 == 0 {
            let momentum = total_momentum(&world);
            println!(
                "step {:4}: momentum = ({:8.2}, {:8.2}), stuck = {}",
                step, momentum.x, momentum.y, stuck
            );
        }
    }

    println!("\nCollisions: {}", collisions);
    println!("Wall bounces: {}", bounces);
    println!("Stuck on last step: {}", stuck);
    println!("Survivors: {}", world.live_mass_count());

    let path = std::env::temp_dir().join("bouncing_balls");
    match scene::save(&world, &path) {
        Ok(saved) => println!("Saved final scene to {}", saved.display()),
        Err(err) => eprintln!("Could not save scene: {}", err),
    }
}
