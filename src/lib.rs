//! Pinball Physics - time-stepped ball physics for pinball tables
//!
//! Core modules:
//! - `math`: Vector/matrix re-exports, bounding boxes, root solving
//! - `sim`: Deterministic simulation (hit shapes, spatial indices, ball and
//!   mover integration, the sub-stepping collision loop)
//! - `settings`: Data-driven physics tuning (gravity, slope, materials)
//! - `error`: Error type for fallible public operations
//!
//! Units follow the classic table convention: distances in table units
//! (a standard ball has radius 25), time in 10 ms ticks. One physics step
//! is 1 ms, so every step integrates `consts::PHYS_FACTOR` time units.

pub mod error;
pub mod math;
pub mod settings;
pub mod sim;

pub use error::{PhysicsError, Result};
pub use settings::{DifficultyPreset, PhysicsSettings};
pub use sim::{BallId, BallSpawn, ItemId, PhysicsEvent, Simulation};

/// Physics tuning constants
pub mod consts {
    /// Duration of one fixed physics step in microseconds
    pub const PHYSICS_STEPTIME: u64 = 1000;
    /// Duration of one time unit (the unit velocities are expressed in)
    pub const DEFAULT_STEPTIME: u64 = 10000;
    /// Time units integrated per physics step
    pub const PHYS_FACTOR: f32 = PHYSICS_STEPTIME as f32 / DEFAULT_STEPTIME as f32;

    /// Earth gravity expressed in table units per time unit squared
    pub const GRAVITYCONST: f32 = 1.81751;

    /// Skin added around shapes when building bounding boxes
    pub const PHYS_SKIN: f32 = 0.25;
    /// Distance below which a ball counts as touching a surface
    pub const PHYS_TOUCH: f32 = 0.05;

    /// Normal velocity at or below which a touch is a resting contact
    pub const C_CONTACTVEL: f32 = 0.099;
    /// Normal velocity below which a ball is considered not moving along the normal
    pub const C_LOWNORMVEL: f32 = 0.0001;
    /// Penetration depth at which an embedded ball gets pushed out
    pub const C_EMBEDDED: f32 = 0.0;
    /// Synthetic approach speed applied to embedded balls
    pub const C_EMBEDSHOT: f32 = 0.05;
    /// Gain of the penetration correction
    pub const C_DISP_GAIN: f32 = 0.9875;
    /// Maximum penetration correction per collision
    pub const C_DISP_LIMIT: f32 = 5.0;
    /// Tolerance on line segment endpoints
    pub const C_TOL_ENDPNTS: f32 = 0.0;
    /// Rolling radius used by non-lateral line segments
    pub const C_TOL_RADIUS: f32 = 0.005;
    /// Slip speed separating static from dynamic friction
    pub const C_PRECISION: f32 = 0.01;
    /// Iteration cap for the flipper regula falsi search
    pub const C_INTERATIONS: u32 = 20;

    /// Minimum forward progress once the zero-time retry budget is used up
    pub const STATICTIME: f32 = 0.005;
    /// Zero-time events tolerated per cycle before forcing progress
    pub const STATICCNTS: i32 = 10;
    /// Sub-step count after which a cycle is considered runaway
    pub const MAX_CYCLE_ITERATIONS: u32 = 100_000;

    /// Restitution used for every ball-ball impact
    pub const BALL_BALL_RESTITUTION: f32 = 0.8;
    /// Ball defaults
    pub const BALL_RADIUS: f32 = 25.0;
    pub const BALL_MASS: f32 = 1.0;

    /// Minimum flipper collide interval between fired events (ms)
    pub const FLIPPER_EVENT_INTERVAL_MS: u32 = 250;
    /// Normal speed a ball must exceed to fire a collide event
    pub const COLLIDE_EVENT_SPEED: f32 = 0.25;
    /// Squared distance a ball must travel between two hit events
    pub const HIT_EVENT_MIN_DIST_SQ: f32 = 0.25;
}

/// Convert degrees to radians
#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * (std::f32::consts::PI / 180.0)
}

/// Convert radians to degrees
#[inline]
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * (180.0 / std::f32::consts::PI)
}

/// Normalized angle to [0, 2π)
#[inline]
pub fn wrap_angle(mut angle: f32) -> f32 {
    use std::f32::consts::TAU;
    while angle >= TAU {
        angle -= TAU;
    }
    while angle < 0.0 {
        angle += TAU;
    }
    angle
}
