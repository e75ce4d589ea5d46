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
//! Edge case tests for degenerate geometry, invalid input and extreme values

use glam::DVec2;
use spring_mesh::config::{ForceKind, SimParams, Walls, DT_MIN};
use spring_mesh::ecs::{Component, FAKE_MASS};
use spring_mesh::{Physics, World};

#[test]
fn test_coincident_masses_stay_finite() {
    let mut world = World::with_params(SimParams::default().with_walls(Walls::none()));
    let a = world.add_mass(DVec2::new(200.0, 200.0));
    let b = world.add_mass(DVec2::new(200.0, 200.0));
    let s = world.add_spring(a, b).unwrap();
    world.spring_mut(s).unwrap().rest_length = 10.0;
    let mut physics = Physics::new(800.0, 600.0);

    for _ in 0..10 {
        physics.advance(&mut world);
    }

    // A zero-length spring contributes nothing
    assert_eq!(world.live_mass_count(), 2);
    assert_eq!(world.mass(a).unwrap().position, DVec2::new(200.0, 200.0));
    assert!(world.mass(b).unwrap().is_valid());
}

#[test]
fn test_spring_to_self_or_dead_mass_is_refused() {
    let mut world = World::new();
    let a = world.add_mass(DVec2::new(0.0, 0.0));
    let b = world.add_mass(DVec2::new(10.0, 0.0));
    assert!(world.add_spring(a, a).is_none());

    world.delete_mass(b);
    assert!(world.add_spring(a, b).is_none());
    assert!(world.add_spring(a, FAKE_MASS).is_none());
}

#[test]
fn test_repeated_deletion_is_harmless() {
    let mut world = World::new();
    let a = world.add_mass(DVec2::new(0.0, 0.0));
    let b = world.add_mass(DVec2::new(10.0, 0.0));
    let s = world.add_spring(a, b).unwrap();

    world.delete_spring(s);
    world.delete_spring(s);
    world.delete_mass(a);
    world.delete_mass(a);

    assert_eq!(world.live_mass_count(), 1);
    assert!(world.mass(b).unwrap().parents().is_empty());
}

#[test]
fn test_deleting_center_clears_it() {
    let params = SimParams::default().with_force(ForceKind::PointAttraction, 10.0, 1.0);
    let mut world = World::with_params(params);
    let a = world.add_mass(DVec2::new(100.0, 100.0));
    let b = world.add_mass(DVec2::new(300.0, 300.0));
    world.params_mut().center = Some(a);

    world.delete_mass(a);
    assert_eq!(world.params().center, None);

    let mut physics = Physics::new(800.0, 600.0);
    physics.advance(&mut world);
    assert!(world.mass(b).unwrap().is_valid());
}

#[test]
fn test_preview_cursor_is_never_integrated() {
    let params = SimParams::default().with_force(ForceKind::Gravity, 10.0, 0.0);
    let mut world = World::with_params(params);
    let a = world.add_mass(DVec2::new(100.0, 300.0));
    world.move_fake_mass(DVec2::new(150.0, 300.0));
    world.attach_fake_spring(a);
    let mut physics = Physics::new(800.0, 600.0);

    for _ in 0..20 {
        physics.advance(&mut world);
    }

    assert_eq!(world.mass(FAKE_MASS).unwrap().position, DVec2::new(150.0, 300.0));
    // The preview spring pulls the dragged mass towards the cursor
    assert!(world.mass(a).unwrap().position.x > 100.0);
}

#[test]
fn test_heavy_and_light_masses() {
    let mut params = SimParams::default().with_walls(Walls::none()).with_adaptive(1.0e-2);
    params.default_ks = 50.0;
    let mut world = World::with_params(params);
    let heavy = world.add_mass(DVec2::new(300.0, 300.0));
    world.mass_mut(heavy).unwrap().set_mass(1.0e6);
    let light = world.add_mass(DVec2::new(340.0, 300.0));
    world.mass_mut(light).unwrap().set_mass(1.0e-3);
    world.add_spring(heavy, light).unwrap();
    world.mass_mut(light).unwrap().position.x = 350.0;
    let mut physics = Physics::new(800.0, 600.0);

    for _ in 0..50 {
        physics.advance(&mut world);
        let report = physics.last_step().unwrap();
        assert!(report.error_ratio.unwrap() < 1.0 || report.dt_used <= DT_MIN);
    }
    assert_eq!(world.live_mass_count(), 2);
    assert!((world.mass(heavy).unwrap().position.x - 300.0).abs() < 1e-3);
}

#[test]
fn test_vertical_contacts_under_stress() {
    let params = SimParams::default()
        .with_force(ForceKind::Gravity, 50.0, 0.0)
        .with_collisions(true);
    let mut world = World::with_params(params);
    let ids: Vec<_> = (0..8)
        .map(|i| world.add_mass(DVec2::new(400.0, 40.0 + 5.0 * i as f64)))
        .collect();
    let mut physics = Physics::new(800.0, 600.0);

    for _ in 0..400 {
        physics.advance(&mut world);
    }

    // Anything that blew up was removed; survivors are where the walls allow
    for id in ids {
        let mass = world.mass(id).unwrap();
        if mass.is_alive() {
            assert!(mass.position.is_finite());
            assert!(mass.position.y >= mass.wall_radius());
        }
    }
}

#[test]
fn test_parameter_validation() {
    assert!(SimParams::default().validate().is_ok());
    assert!(SimParams::default().with_time_step(0.0).validate().is_err());
    assert!(SimParams::default().with_time_step(f64::NAN).validate().is_err());
    assert!(SimParams::default().with_viscosity(-1.0).validate().is_err());
    assert!(SimParams::default()
        .with_force(ForceKind::Gravity, -5.0, 0.0)
        .validate()
        .is_err());
    assert!(SimParams::default().with_adaptive(0.0).validate().is_err());
}

#[test]
fn test_physics_with_max_attempts_one_never_retries() {
    let mut params = SimParams::default()
        .with_adaptive(1.0e-3)
        .with_time_step(0.5)
        .with_walls(Walls::none());
    params.default_ks = 1.0e4;
    let mut world = World::with_params(params);
    let a = world.add_mass(DVec2::new(300.0, 300.0));
    let b = world.add_mass(DVec2::new(320.0, 300.0));
    world.add_spring(a, b).unwrap();
    world.mass_mut(b).unwrap().position.x = 330.0;

    let mut physics = Physics::new(800.0, 600.0).with_max_attempts(1);
    physics.advance(&mut world);

    let report = physics.last_step().unwrap();
    assert_eq!(report.attempts, 1);
    assert_eq!(report.dt_used, 0.5);
}
