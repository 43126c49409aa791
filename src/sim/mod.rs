//! Deterministic physics simulation
//!
//! All ball and mover physics lives here. This module must be pure and
//! deterministic:
//! - Fixed timestep only
//! - Seeded (or injected) randomness only
//! - Stable iteration order (table order for objects, creation order for balls)
//! - No rendering or platform dependencies

pub mod ball;
pub mod context;
pub mod event;
pub mod hit;
pub mod kdtree;
pub mod mover;
pub mod quadtree;
pub mod snapshot;
pub mod state;
pub mod table;
pub mod world;

pub use ball::{Ball, BallSpawn};
pub use context::{FixedRandom, PhysicsContext, RandomSource, SeededRandom};
pub use event::{CollisionEvent, HitTarget, PhysicsEvent};
pub use hit::{HitKind, HitObject, HitShape};
pub use snapshot::{BallSnapshot, FrameSnapshot, MoverSnapshot};
pub use state::{BallId, HitId, ItemId};
pub use table::{DemoTable, TableBuilder, demo_table};
pub use world::{CycleStats, Simulation};
