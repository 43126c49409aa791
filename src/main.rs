//! Pinball physics demo
//!
//! Builds the demo table, launches a ball and works the flippers for a few
//! simulated seconds, then prints the final frame as JSON.
//!
//! Usage: `pinball-physics [settings.json]`

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::collections::BTreeMap;

    use glam::{Vec2, Vec3};
    use pinball_physics::sim::{PhysicsEvent, Simulation, demo_table};
    use pinball_physics::{PhysicsSettings, Result};

    /// Simulated run time
    const RUN_US: u64 = 5_000_000;
    /// Frame length of the pretend display
    const FRAME_US: u64 = 16_667;
    /// Flippers are held this long at the start of every second
    const FLIP_US: u64 = 150_000;

    fn label(event: &PhysicsEvent) -> &'static str {
        match event {
            PhysicsEvent::Hit { .. } => "hit",
            PhysicsEvent::Unhit { .. } => "unhit",
            PhysicsEvent::Collide { .. } => "collide",
            PhysicsEvent::EndOfStroke { .. } => "end of stroke",
            PhysicsEvent::BeginningOfStroke { .. } => "beginning of stroke",
            PhysicsEvent::Spin { .. } => "spin",
            PhysicsEvent::BallCollide { .. } => "ball collide",
            PhysicsEvent::BallDrained { .. } => "drained",
        }
    }

    pub fn run() -> Result<()> {
        let settings = match std::env::args().nth(1) {
            Some(path) => PhysicsSettings::load(path)?,
            None => PhysicsSettings::default(),
        };
        log::info!("Difficulty: {}", settings.difficulty.as_str());

        let demo = demo_table()?;
        let mut sim = Simulation::new(settings, demo.objects)?;
        let launch = sim.default_spawn(demo.launch).with_velocity(Vec3::new(2.0, 0.0, 0.0));
        sim.create_ball(launch);

        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut flipping = false;
        let mut time = 0;
        while time < RUN_US {
            time += FRAME_US;

            let want = time % 1_000_000 < FLIP_US;
            if want != flipping {
                sim.set_flipper_solenoid(demo.left_flipper, want)?;
                sim.set_flipper_solenoid(demo.right_flipper, want)?;
                flipping = want;
            }
            if time % 2_000_000 < FRAME_US {
                sim.nudge(Vec2::new(1.0, -1.0), 1.5);
            }

            sim.update_physics(time);

            for event in sim.drain_events() {
                *counts.entry(label(&event)).or_default() += 1;
                match event {
                    PhysicsEvent::Hit { item, .. } if item == demo.kicker => {
                        // spit the ball back toward the bumper
                        sim.kick(demo.kicker, 120.0, 12.0, 0.0)?;
                    }
                    PhysicsEvent::BallDrained { .. } => {
                        log::info!("Drained at {:.2} s, launching a new ball", time as f64 * 1e-6);
                        sim.create_ball(launch);
                    }
                    _ => {}
                }
            }
        }

        for (name, count) in &counts {
            log::info!("{count:>6} x {name}");
        }
        println!("{}", sim.snapshot().to_json()?);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("Pinball physics demo starting...");

    match demo::run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // the library is the product on the web, there is no demo
}
