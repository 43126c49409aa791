//! Kinematic movers
//!
//! Every moving item is advanced in two phases per physics step: forces
//! first (`update_velocities`, once per fixed step), then integration
//! (`update_displacements`, once per sub-step with the sub-step length).
//! Limit stops are applied during integration by clamping, and a stop event
//! fires when the clamped value equals the bound exactly.

pub mod flipper;
pub mod gate;
pub mod spinner;

pub use flipper::{FlipperConfig, FlipperMover};
pub use gate::{GateConfig, GateMover};
pub use spinner::{SpinnerConfig, SpinnerMover};

use super::context::PhysicsContext;

/// Shared integration contract for balls and moving items
pub trait Mover {
    /// Apply forces for one fixed physics step
    fn update_velocities(&mut self, ctx: &mut PhysicsContext);

    /// Integrate over `dtime` and apply limit stops
    fn update_displacements(&mut self, dtime: f32, ctx: &mut PhysicsContext);
}
