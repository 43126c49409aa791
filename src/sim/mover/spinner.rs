//! Spinner mover
//!
//! A spinner is a plate on a horizontal axis that a passing ball sets
//! spinning. A free spinner turns full circles and reports every pass over
//! the top; a limited spinner swings between two stops and bounces off them.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::Mover;
use crate::consts::*;
use crate::sim::context::PhysicsContext;
use crate::sim::event::PhysicsEvent;
use crate::sim::state::ItemId;
use crate::{deg_to_rad, rad_to_deg, wrap_angle};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinnerConfig {
    pub center: Vec2,
    /// Width of the plate
    pub length: f32,
    /// Orientation of the spinner line (degrees)
    pub rotation: f32,
    /// Axis height above the playfield
    pub height: f32,
    /// Stops in degrees; equal values mean the spinner turns freely
    pub angle_min: f32,
    pub angle_max: f32,
    /// Velocity kept per tick
    pub damping: f32,
    /// Bounce off the stops of a limited spinner
    pub elasticity: f32,
}

impl Default for SpinnerConfig {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            length: 80.0,
            rotation: 0.0,
            height: 60.0,
            angle_min: 0.0,
            angle_max: 0.0,
            damping: 0.9879,
            elasticity: 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpinnerMover {
    pub item: ItemId,
    /// Plate angle, 0 hanging straight down
    pub angle: f32,
    pub angle_speed: f32,
    pub angle_min: f32,
    pub angle_max: f32,
    /// Velocity kept per 1 ms of simulated time
    pub damping: f32,
    pub elasticity: f32,
}

impl SpinnerMover {
    pub fn new(item: ItemId, config: &SpinnerConfig) -> Self {
        let angle_min = deg_to_rad(config.angle_min);
        let angle_max = deg_to_rad(config.angle_max);
        let limited = angle_min != angle_max;
        Self {
            item,
            angle: if limited { angle_min.max(0.0).min(angle_max) } else { 0.0 },
            angle_speed: 0.0,
            angle_min,
            angle_max,
            damping: config.damping.powf(PHYS_FACTOR),
            elasticity: config.elasticity,
        }
    }

    /// Limited spinners swing between stops instead of turning freely
    pub fn is_limited(&self) -> bool {
        self.angle_min != self.angle_max
    }

    fn bounce(&mut self) {
        self.angle_speed *= -0.005 - self.elasticity;
    }
}

impl Mover for SpinnerMover {
    fn update_velocities(&mut self, ctx: &mut PhysicsContext) {
        // center of gravity below the axis pulls the plate back down
        self.angle_speed -= self.angle.sin() * (0.0025 * ctx.step_factor);
        self.angle_speed *= self.damping.powf(ctx.step_factor / PHYS_FACTOR);
    }

    fn update_displacements(&mut self, dtime: f32, ctx: &mut PhysicsContext) {
        let item = self.item;

        if self.is_limited() {
            self.angle = (self.angle + self.angle_speed * dtime).clamp(self.angle_min, self.angle_max);
            let speed = rad_to_deg(self.angle_speed).abs();
            if self.angle == self.angle_max && self.angle_speed > 0.0 {
                ctx.fire(PhysicsEvent::EndOfStroke { item, speed });
                self.bounce();
            } else if self.angle == self.angle_min && self.angle_speed < 0.0 {
                ctx.fire(PhysicsEvent::BeginningOfStroke { item, speed });
                self.bounce();
            }
            return;
        }

        // the next pass over the top in the direction of travel
        let target = match (self.angle_speed > 0.0, self.angle < PI) {
            (true, true) => PI,
            (true, false) => 3.0 * PI,
            (false, true) => -PI,
            (false, false) => PI,
        };

        self.angle += self.angle_speed * dtime;

        let passed = if self.angle_speed > 0.0 {
            self.angle > target
        } else {
            self.angle < target
        };
        if passed {
            ctx.fire(PhysicsEvent::Spin { item });
        }

        self.angle = wrap_angle(self.angle);
        debug_assert!((0.0..TAU).contains(&self.angle));
    }
}
