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
//! Integration tests verifying equilibrium, energy and momentum behavior

use glam::DVec2;
use spring_mesh::config::{SimParams, Walls};
use spring_mesh::integration::total_energy;
use spring_mesh::{MassId, Physics, World};

/// Two unit masses joined by an undamped spring, stretched by 10
fn stretched_pair(params: SimParams) -> (World, MassId, MassId) {
    let mut params = params.with_walls(Walls::none());
    params.default_kd = 0.0;
    let mut world = World::with_params(params);
    let a = world.add_mass(DVec2::new(300.0, 300.0));
    let b = world.add_mass(DVec2::new(360.0, 300.0));
    world.add_spring(a, b).unwrap();
    world.mass_mut(b).unwrap().position.x = 370.0;
    (world, a, b)
}

fn energy(world: &World) -> f64 {
    total_energy(world.masses().as_slice(), world.springs().as_slice())
}

fn momentum(world: &World) -> DVec2 {
    world
        .masses()
        .iter_alive()
        .map(|(_, m)| m.velocity * m.mass)
        .sum()
}

#[test]
fn test_force_free_masses_stay_put() {
    let mut world = World::new();
    let ids: Vec<MassId> = (0..5)
        .map(|i| world.add_mass(DVec2::new(100.0 + 50.0 * i as f64, 300.0)))
        .collect();
    let mut physics = Physics::new(800.0, 600.0);

    for _ in 0..200 {
        physics.advance(&mut world);
    }

    for (i, id) in ids.iter().enumerate() {
        let mass = world.mass(*id).unwrap();
        assert_eq!(mass.position, DVec2::new(100.0 + 50.0 * i as f64, 300.0));
        assert_eq!(mass.velocity, DVec2::ZERO);
    }
}

#[test]
fn test_rk4_energy_stays_bounded() {
    let (mut world, _, _) = stretched_pair(SimParams::default().with_time_step(0.01));
    let initial = energy(&world);
    assert!((initial - 50.0).abs() < 1e-9);

    let mut physics = Physics::new(800.0, 600.0);
    for _ in 0..5000 {
        physics.advance(&mut world);
        let e = energy(&world);
        assert!(e <= initial * (1.0 + 1e-6), "energy grew to {}", e);
    }
    assert!(energy(&world) > initial * 0.999);
}

#[test]
fn test_adaptive_energy_drift_is_small() {
    let (mut world, _, _) = stretched_pair(SimParams::default().with_adaptive(1e-4));
    let initial = energy(&world);
    let mut physics = Physics::new(800.0, 600.0);

    let mut elapsed = 0.0;
    while elapsed < 20.0 {
        physics.advance(&mut world);
        elapsed += physics.last_step().unwrap().dt_used;
    }

    let drift = (energy(&world) - initial).abs() / initial;
    assert!(drift < 2e-2, "relative drift {}", drift);
}

#[test]
fn test_spring_pair_conserves_momentum() {
    let (mut world, a, b) = stretched_pair(SimParams::default());
    world.mass_mut(a).unwrap().velocity = DVec2::new(0.0, 2.0);
    let initial = momentum(&world);
    let mut physics = Physics::new(800.0, 600.0);

    for _ in 0..500 {
        physics.advance(&mut world);
    }
    assert!((momentum(&world) - initial).length() < 1e-9);

    // Center of mass drifts at the initial 1 unit per time unit for 12.5 units
    let center = (world.mass(a).unwrap().position + world.mass(b).unwrap().position) / 2.0;
    assert!((center.y - 312.5).abs() < 1e-6);
}

#[test]
fn test_head_on_collision_conserves_momentum() {
    let params = SimParams::default()
        .with_walls(Walls::none())
        .with_collisions(true);
    let mut world = World::with_params(params);
    let a = world.add_mass(DVec2::new(300.0, 300.0));
    let b = world.add_mass(DVec2::new(320.0, 300.0));
    world.mass_mut(a).unwrap().velocity = DVec2::new(40.0, 0.0);
    world.mass_mut(b).unwrap().velocity = DVec2::new(-40.0, 0.0);
    let initial = momentum(&world);

    let mut physics = Physics::new(800.0, 600.0);
    let mut collided = false;
    for _ in 0..20 {
        physics.advance(&mut world);
        collided |= physics.last_contacts().collisions > 0;
        assert!((momentum(&world) - initial).length() < 1e-9);
    }

    assert!(collided);
    assert!(world.mass(a).unwrap().velocity.x < 0.0);
    assert!(world.mass(b).unwrap().velocity.x > 0.0);
}
