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
//! Spring Pendulum Example
//!
//! A bob hangs from a nailed anchor by a stiff spring and swings under
//! gravity. It showcases:
//!
//! - Fixed-step RK4 versus error-controlled RKF45
//! - Energy tracking over simulated time
//! - Step size adaptation as the swing speeds up and slows down
//!
//! # Running
//!
//! ```bash
//! # Fixed step RK4
//! cargo run --example pendulum --release
//!
//! # Adaptive RKF45 with a given precision
//! cargo run --example pendulum --release -- --adaptive 0.001
//!
//! # Simulate for longer
//! cargo run --example pendulum --release -- --seconds 60
//! ```

use glam::DVec2;
use spring_mesh::config::{ForceKind, SimParams, Walls};
use spring_mesh::integration::{kinetic_energy, spring_potential_energy};
use spring_mesh::{MassId, Physics, World};
use std::env;

/// Height of the anchor above the floor
const ANCHOR_HEIGHT: f64 = 500.0;

/// Arm length at rest
const ARM: f64 = 150.0;

/// Gravity magnitude
const GRAVITY: f64 = 10.0;

struct Options {
    adaptive: Option<f64>,
    seconds: f64,
}

fn parse_args() -> Options {
    let mut options = Options {
        adaptive: None,
        seconds: 20.0,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--adaptive" if i + 1 < args.len() => {
                options.adaptive = args[i + 1].parse().ok();
                i += 1;
            }
            "--seconds" if i + 1 < args.len() => {
                if let Ok(seconds) = args[i + 1].parse() {
                    options.seconds = seconds;
                }
                i += 1;
            }
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }
    options
}

fn build(options: &Options) -> (World, MassId) {
    let mut params = SimParams::default()
        .with_force(ForceKind::Gravity, GRAVITY, 0.0)
        .with_walls(Walls::none());
    params.default_ks = 400.0;
    params.default_kd = 0.0;
    if let Some(precision) = options.adaptive {
        params = params.with_adaptive(precision);
    }

    let mut world = World::with_params(params);
    let anchor = world.add_mass(DVec2::new(400.0, ANCHOR_HEIGHT));
    if let Some(mass) = world.mass_mut(anchor) {
        mass.set_fixed(true);
    }
    // Start the bob off to the side, at the arm's rest length
    let bob = world.add_mass(DVec2::new(400.0 + ARM, ANCHOR_HEIGHT));
    world.add_spring(anchor, bob);
    (world, bob)
}

// Kinetic plus spring plus gravitational potential, floor at y = 0
fn energy(world: &World) -> f64 {
    let masses = world.masses().as_slice();
    let springs = world.springs().as_slice();
    let height: f64 = world
        .masses()
        .iter_alive()
        .filter(|(_, m)| m.is_free())
        .map(|(_, m)| m.mass * GRAVITY * m.position.y)
        .sum();
    kinetic_energy(masses) + spring_potential_energy(masses, springs) + height
}

fn main() {
    env_logger::init();
    let options = parse_args();

    println!("Spring Pendulum");
    println!("===============");
    match options.adaptive {
        Some(precision) => println!("Integrator: RKF45 (precision {})", precision),
        None => println!("Integrator: RK4"),
    }
    println!("Simulated time: {} s\n", options.seconds);

    let (mut world, bob) = build(&options);
    let mut physics = Physics::new(800.0, 600.0);
    let start_energy = energy(&world);

    let mut time = 0.0;
    let mut steps = 0u64;
    let mut rejected = 0u64;
    let mut redraws = 0u64;
    let mut next_report = 0.0;

    while time < options.seconds {
        if physics.advance(&mut world) {
            redraws += 1;
        }
        steps += 1;
        if let Some(report) = physics.last_step() {
            time += report.dt_used;
            rejected += u64::from(report.attempts - 1);
        }

        if time >= next_report {
            if let Some(mass) = world.mass(bob) {
                let drift = (energy(&world) - start_energy) / start_energy.abs();
                println!(
                    "t = {:6.2}s  bob = ({:7.2}, {:7.2})  dt = {:.5}  energy drift = {:+.3e}",
                    time,
                    mass.position.x,
                    mass.position.y,
                    world.params().time_step,
                    drift
                );
            }
            next_report += 1.0;
        }
    }

    println!("\nSteps taken: {}", steps);
    println!("Rejected attempts: {}", rejected);
    println!("Redraws requested: {}", redraws);
}
