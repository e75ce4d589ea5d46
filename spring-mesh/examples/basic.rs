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
//! Basic example demonstrating the entity store
//!
//! This example shows how to create a world, add masses and springs,
//! select and duplicate them, and delete a mass with its springs.
//!
//! ```bash
//! RUST_LOG=debug cargo run --example basic
//! ```

use glam::DVec2;
use spring_mesh::ecs::Picked;
use spring_mesh::scene;
use spring_mesh::World;

fn main() {
    env_logger::init();

    println!("Spring Mesh - Basic Example");
    println!("===========================\n");

    let mut world = World::new();
    println!("Created new world ({} slot for the drag cursor)", world.mass_count());

    let a = world.add_mass(DVec2::new(100.0, 300.0));
    let b = world.add_mass(DVec2::new(200.0, 300.0));
    let c = world.add_mass(DVec2::new(150.0, 380.0));
    println!("Added masses {}, {} and {}", a, b, c);

    let springs: Vec<_> = [(a, b), (b, c), (c, a)]
        .iter()
        .filter_map(|&(m1, m2)| world.add_spring(m1, m2))
        .collect();
    println!("Added {} springs:", springs.len());
    for id in &springs {
        if let Some(spring) = world.spring(*id) {
            let (m1, m2) = spring.endpoints();
            println!("  {} joins {} and {} (rest {:.1})", id, m1, m2, spring.rest_length);
        }
    }

    // Pick whatever lies nearest to a point
    let point = DVec2::new(152.0, 375.0);
    match world.nearest_object(point, false) {
        Some(Picked::Mass(id)) => println!("\nNearest to {:?}: mass {}", point, id),
        Some(Picked::Spring(id)) => println!("\nNearest to {:?}: spring {}", point, id),
        None => println!("\nNothing near {:?}", point),
    }

    world.select_all();
    let dup = world.duplicate_selected();
    println!(
        "Duplicated selection: {} masses, {} springs",
        dup.masses.len(),
        dup.springs.len()
    );

    world.delete_mass(a);
    println!("\nDeleted {}", a);
    println!("Live masses: {}", world.live_mass_count());
    println!("Live springs: {}", world.live_spring_count());
    for (index, mass) in world.masses().iter_alive() {
        println!(
            "  #{} at ({:.1}, {:.1}) with {} spring(s)",
            index,
            mass.position.x,
            mass.position.y,
            mass.parents().len()
        );
    }

    println!("\nScene text:\n{}", scene::to_text(&world));
    println!("Example completed successfully!");
}
