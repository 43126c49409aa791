//! Gate mover
//!
//! A gate is a flap hanging from a horizontal axis. Balls passing through
//! it swing it up, gravity brings it back. It can also be driven open and
//! closed by game logic, in which case it moves at a fixed speed and the
//! ball passes without touching it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::Mover;
use crate::consts::*;
use crate::sim::context::PhysicsContext;
use crate::sim::event::PhysicsEvent;
use crate::sim::state::ItemId;
use crate::{deg_to_rad, rad_to_deg};

/// Angular speed of a driven open or close (radians per tick)
const FORCED_SPEED: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Center of the gate line
    pub center: Vec2,
    /// Width of the flap
    pub length: f32,
    /// Orientation of the gate line (degrees)
    pub rotation: f32,
    /// Axis height above the playfield
    pub height: f32,
    /// Rest angle (degrees)
    pub angle_min: f32,
    /// Fully open angle (degrees)
    pub angle_max: f32,
    /// Velocity kept per 1 ms of simulated time
    pub damping: f32,
    /// Scale of the restoring gravity torque
    pub gravity_factor: f32,
    /// Swings both ways; a one-way gate blocks balls from the back
    pub two_way: bool,
    pub elasticity: f32,
    pub friction: f32,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            length: 100.0,
            rotation: 0.0,
            height: 50.0,
            angle_min: 0.0,
            angle_max: 90.0,
            damping: 0.985,
            gravity_factor: 0.25,
            two_way: false,
            elasticity: 0.3,
            friction: 0.02,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GateMover {
    pub item: ItemId,
    /// Flap angle, 0 hanging straight down
    pub angle: f32,
    pub angle_speed: f32,
    pub angle_min: f32,
    pub angle_max: f32,
    pub damping: f32,
    pub gravity_factor: f32,
    pub two_way: bool,
    /// Held open by game logic
    pub open: bool,
    /// Moving under game control, gravity is ignored until a stop is reached
    forced_move: bool,
}

impl GateMover {
    pub fn new(item: ItemId, config: &GateConfig) -> Self {
        let angle_min = deg_to_rad(config.angle_min);
        Self {
            item,
            angle: angle_min,
            angle_speed: 0.0,
            angle_min,
            angle_max: deg_to_rad(config.angle_max),
            damping: config.damping,
            gravity_factor: config.gravity_factor,
            two_way: config.two_way,
            open: false,
            forced_move: false,
        }
    }

    /// Drive the gate open or closed
    ///
    /// A gate already resting at the requested stop is left alone.
    pub fn set_open(&mut self, open: bool) {
        self.open = open;
        if open {
            if self.angle < self.angle_max {
                self.angle_speed = FORCED_SPEED;
                self.forced_move = true;
            }
        } else if self.angle.abs() > self.angle_min {
            self.angle_speed = -FORCED_SPEED * self.angle.signum();
            self.forced_move = true;
        }
    }

    fn limits(&self) -> (f32, f32) {
        if self.two_way {
            (-self.angle_max, self.angle_max)
        } else {
            (self.angle_min, self.angle_max)
        }
    }

    fn stop(&mut self) {
        self.angle_speed = 0.0;
        self.forced_move = false;
    }
}

impl Mover for GateMover {
    fn update_velocities(&mut self, ctx: &mut PhysicsContext) {
        if !self.forced_move && !self.open {
            // center of gravity below the axis pulls the flap back down
            self.angle_speed -= self.angle.sin() * self.gravity_factor * (ctx.step_factor / 8.0);
            self.angle_speed *= self.damping.powf(ctx.step_factor / PHYS_FACTOR);
        }
    }

    fn update_displacements(&mut self, dtime: f32, ctx: &mut PhysicsContext) {
        let (lo, hi) = self.limits();
        self.angle = (self.angle + self.angle_speed * dtime).clamp(lo, hi);

        let item = self.item;
        let speed = rad_to_deg(self.angle_speed).abs();
        if self.angle == hi && self.angle_speed > 0.0 {
            ctx.fire(PhysicsEvent::EndOfStroke { item, speed });
            self.stop();
        } else if self.angle == lo && self.angle_speed < 0.0 {
            if self.two_way {
                ctx.fire(PhysicsEvent::EndOfStroke { item, speed });
            } else {
                ctx.fire(PhysicsEvent::BeginningOfStroke { item, speed });
            }
            self.stop();
        }
    }
}
