//! Simulation context
//!
//! Everything a hit shape or mover may need besides its own state: gravity,
//! scatter tuning, the simulated clock, the random source and the event
//! queue. Owned by the simulation and passed down by reference.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::event::PhysicsEvent;
use super::state::BallId;
use crate::consts::DEFAULT_STEPTIME;
use crate::settings::PhysicsSettings;

/// Source of the two random choices the physics makes
///
/// Scatter angles and the static/dynamic query order draw from here, so a
/// stubbed source makes the whole simulation reproducible.
pub trait RandomSource {
    /// Uniform value in [0, 1)
    fn next_unit(&mut self) -> f32;

    /// Uniform value in [-1, 1)
    fn next_signed(&mut self) -> f32 {
        self.next_unit() * 2.0 - 1.0
    }

    fn coin_flip(&mut self) -> bool {
        self.next_unit() < 0.5
    }
}

/// Seeded PCG random source
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: Pcg32,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f32 {
        self.rng.random::<f32>()
    }
}

/// Random source that always returns the same value
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f32);

impl RandomSource for FixedRandom {
    fn next_unit(&mut self) -> f32 {
        self.0
    }
}

/// Per-simulation physics context
pub struct PhysicsContext {
    /// Gravity acceleration (table units per tick²)
    pub gravity: Vec3,
    /// Global scatter weight
    pub scatter_weight: f32,
    /// Scatter used by materials asking for the table default
    pub hard_scatter: f32,
    /// Time units covered by one fixed physics step
    pub step_factor: f32,
    /// Simulated time in milliseconds
    pub time_msec: u32,
    /// Flips every sub-step, picks which ball of a pair resolves the impact
    pub swap_ball_collision_handling: bool,
    pub rng: Box<dyn RandomSource>,
    events: Vec<PhysicsEvent>,
    destroy_requests: Vec<BallId>,
}

impl PhysicsContext {
    pub fn new(settings: &PhysicsSettings, rng: Box<dyn RandomSource>) -> Self {
        Self {
            gravity: settings.gravity(),
            scatter_weight: settings.scatter_weight,
            hard_scatter: settings.hard_scatter,
            step_factor: settings.step_time_us as f32 / DEFAULT_STEPTIME as f32,
            time_msec: 0,
            swap_ball_collision_handling: false,
            rng,
            events: Vec::new(),
            destroy_requests: Vec::new(),
        }
    }

    /// Queue an event for the caller
    pub fn fire(&mut self, event: PhysicsEvent) {
        self.events.push(event);
    }

    /// Take all queued events
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[PhysicsEvent] {
        &self.events
    }

    /// Ask the simulation to remove a ball once the current collide returns
    pub fn request_destroy(&mut self, ball: BallId) {
        if !self.destroy_requests.contains(&ball) {
            self.destroy_requests.push(ball);
        }
    }

    pub(crate) fn take_destroy_requests(&mut self) -> Vec<BallId> {
        std::mem::take(&mut self.destroy_requests)
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> PhysicsContext {
    let mut settings = PhysicsSettings::default();
    settings.scatter_weight = 0.0;
    PhysicsContext::new(&settings, Box::new(FixedRandom(0.5)))
}
