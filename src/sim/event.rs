//! Collision results and outward physics events

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{BallId, HitId, ItemId};

/// What a ball is about to hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    /// A hit object from the static arena
    Object(HitId),
    /// Another ball
    Ball(BallId),
    /// The playfield plane
    Playfield,
    /// The glass plane
    Glass,
}

/// Result of one hit test, valid only within the sub-step that produced it
///
/// Each ball keeps the nearest hard collision found so far; contacts are
/// collected separately by the orchestrator.
#[derive(Debug, Clone, Copy)]
pub struct CollisionEvent {
    /// Ball the test was run for
    pub ball: BallId,
    /// Nearest target, `None` while nothing was found
    pub target: Option<HitTarget>,
    /// Time of impact within the sub-step budget
    pub time: f32,
    /// Surface normal at impact, pointing toward the ball
    pub normal: Vec3,
    /// Signed distance between ball surface and shape at test time
    pub distance: f32,
    /// Shape-specific flag: unhit for volumes, side for gates and spinners
    pub hit_flag: bool,
    /// Resting contact rather than an impact
    pub is_contact: bool,
    /// Normal velocity recorded for contacts
    pub org_normal_velocity: f32,
}

impl CollisionEvent {
    pub fn new(ball: BallId, time: f32) -> Self {
        Self {
            ball,
            target: None,
            time,
            normal: Vec3::ZERO,
            distance: 0.0,
            hit_flag: false,
            is_contact: false,
            org_normal_velocity: 0.0,
        }
    }

    /// Reset for a new sub-step with the given budget
    pub fn clear(&mut self, time: f32) {
        *self = Self::new(self.ball, time);
    }

    pub fn is_hit(&self) -> bool {
        self.target.is_some()
    }
}

/// Event raised by the physics for game logic to consume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhysicsEvent {
    /// Ball entered a volume or struck a wall hard enough
    Hit { item: ItemId, ball: BallId },
    /// Ball left a volume
    Unhit { item: ItemId, ball: BallId },
    /// Flipper struck by a ball
    Collide { item: ItemId, ball: BallId, speed: f32 },
    /// Mover reached its end stop (speed in degrees per tick)
    EndOfStroke { item: ItemId, speed: f32 },
    /// Mover returned to its start stop
    BeginningOfStroke { item: ItemId, speed: f32 },
    /// Spinner plate passed over the top
    Spin { item: ItemId },
    /// Two balls collided
    BallCollide { ball: BallId, other: BallId, speed: f32 },
    /// Ball swallowed by a draining kicker
    BallDrained { item: ItemId, ball: BallId },
}

impl PhysicsEvent {
    /// Item that raised the event, if any
    pub fn item(&self) -> Option<ItemId> {
        match *self {
            PhysicsEvent::Hit { item, .. }
            | PhysicsEvent::Unhit { item, .. }
            | PhysicsEvent::Collide { item, .. }
            | PhysicsEvent::EndOfStroke { item, .. }
            | PhysicsEvent::BeginningOfStroke { item, .. }
            | PhysicsEvent::Spin { item }
            | PhysicsEvent::BallDrained { item, .. } => Some(item),
            PhysicsEvent::BallCollide { .. } => None,
        }
    }
}
