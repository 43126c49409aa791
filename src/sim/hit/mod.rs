//! Hit objects
//!
//! Every collidable thing on the table is a [`HitObject`]: the data all
//! shapes share ([`HitCommon`]) plus one [`HitShape`] variant. Shapes answer
//! three questions for a ball:
//!
//! - `hit_test`: when, within the remaining sub-step budget, does the ball
//!   first touch me? Returns the time or -1 and fills a [`CollisionEvent`].
//! - `collide`: resolve the impact found by the hit test.
//! - `contact`: apply the sustained response of a resting contact.
//!
//! Hit tests never mutate anything, so the order they run in cannot change
//! the outcome.

mod bumper;
mod circle;
mod flipper;
mod gate;
mod kicker;
mod line_seg;
mod line_z;
mod plane;
mod point;
mod poly;
mod trigger;

pub use bumper::HitBumper;
pub use circle::HitCircle;
pub use flipper::HitFlipper;
pub use gate::{HitGate, HitSpinner};
pub use kicker::{HitKicker, KickerConfig};
pub use line_seg::LineSeg;
pub use line_z::{HitLine3D, HitLineZ};
pub use plane::HitPlane;
pub use point::HitPoint;
pub use poly::{Hit3DPoly, HitTriangle};
pub use trigger::{HitTrigger, TriggerAnimation, TriggerShape, polygon_contains};

use serde::{Deserialize, Serialize};

use super::ball::Ball;
use super::context::PhysicsContext;
use super::event::{CollisionEvent, HitTarget, PhysicsEvent};
use super::mover::Mover;
use super::state::ItemId;
use crate::math::BBox;
use crate::settings::Material;

/// How a segment or circle test treats the ball
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestMode {
    /// Ignore balls receding from the normal side
    pub direction: bool,
    /// Collide with the ball surface rather than its center
    pub lateral: bool,
    /// Solid obstacle; non-rigid shapes only report crossings
    pub rigid: bool,
    /// Edge-triggered membership for volumes owned by this item
    pub volume: Option<ItemId>,
    /// Swinging flap: the ball counts as through once its far side crosses
    pub swing: bool,
}

impl TestMode {
    /// One-sided solid wall
    pub const RIGID: TestMode = TestMode {
        direction: true,
        lateral: true,
        rigid: true,
        volume: None,
        swing: false,
    };

    /// Two-sided flap of a gate or spinner
    pub const SWING: TestMode = TestMode {
        direction: false,
        lateral: true,
        rigid: false,
        volume: None,
        swing: true,
    };

    /// Volume boundary crossed by the ball center
    pub fn volume(item: ItemId) -> TestMode {
        TestMode {
            direction: false,
            lateral: false,
            rigid: false,
            volume: Some(item),
            swing: false,
        }
    }
}

/// Type tag of a hit object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HitKind {
    Plane,
    Point,
    LineSeg,
    LineZ,
    Line3D,
    Circle,
    Poly,
    Triangle,
    Bumper,
    Trigger,
    Kicker,
    Flipper,
    Gate,
    Spinner,
}

/// State shared by every hit shape
#[derive(Debug, Clone)]
pub struct HitCommon {
    /// Bounds used by the static index
    pub bbox: BBox,
    pub material: Material,
    /// Normal speed an impact needs to fire a hit event
    pub threshold: f32,
    /// Disabled objects never report a hit
    pub enabled: bool,
    /// Game item the object belongs to
    pub item: Option<ItemId>,
    /// Whether impacts raise events at all
    pub fire_events: bool,
}

impl Default for HitCommon {
    fn default() -> Self {
        Self {
            bbox: BBox::EMPTY,
            material: Material::default(),
            threshold: 2.0,
            enabled: true,
            item: None,
            fire_events: true,
        }
    }
}

impl HitCommon {
    /// Raise a hit event unless the ball barely moved since the last one
    pub fn fire_hit_event(&self, ball: &mut Ball, ctx: &mut PhysicsContext) {
        if !self.fire_events {
            return;
        }
        let Some(item) = self.item else {
            return;
        };
        if ball.take_hit_event_slot() {
            ctx.fire(PhysicsEvent::Hit { item, ball: ball.id });
        }
    }

    /// Wall response shared by the rigid shapes
    pub fn collide_wall(&self, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        // must be measured before the impulse changes the velocity
        let dot = coll.normal.dot(ball.vel);
        ball.collide_3d_wall(coll.normal, coll.distance, &self.material, ctx);
        if dot <= -self.threshold {
            self.fire_hit_event(ball, ctx);
        }
    }
}

/// Geometry and behavior of one hit object
#[derive(Debug, Clone)]
pub enum HitShape {
    Plane(HitPlane),
    Point(HitPoint),
    LineSeg(LineSeg),
    LineZ(HitLineZ),
    Line3D(HitLine3D),
    Circle(HitCircle),
    Poly(Hit3DPoly),
    Triangle(HitTriangle),
    Bumper(HitBumper),
    Trigger(HitTrigger),
    Kicker(HitKicker),
    Flipper(HitFlipper),
    Gate(HitGate),
    Spinner(HitSpinner),
}

/// A collidable object owned by the simulation
#[derive(Debug, Clone)]
pub struct HitObject {
    pub common: HitCommon,
    pub shape: HitShape,
}

impl HitObject {
    pub fn new(shape: HitShape) -> Self {
        let mut obj = Self {
            common: HitCommon::default(),
            shape,
        };
        obj.calc_hit_bbox();
        obj
    }

    pub fn with_item(mut self, item: ItemId) -> Self {
        self.common.item = Some(item);
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.common.material = material;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.common.threshold = threshold;
        self
    }

    pub fn with_events(mut self, fire_events: bool) -> Self {
        self.common.fire_events = fire_events;
        self
    }

    pub fn kind(&self) -> HitKind {
        match self.shape {
            HitShape::Plane(_) => HitKind::Plane,
            HitShape::Point(_) => HitKind::Point,
            HitShape::LineSeg(_) => HitKind::LineSeg,
            HitShape::LineZ(_) => HitKind::LineZ,
            HitShape::Line3D(_) => HitKind::Line3D,
            HitShape::Circle(_) => HitKind::Circle,
            HitShape::Poly(_) => HitKind::Poly,
            HitShape::Triangle(_) => HitKind::Triangle,
            HitShape::Bumper(_) => HitKind::Bumper,
            HitShape::Trigger(_) => HitKind::Trigger,
            HitShape::Kicker(_) => HitKind::Kicker,
            HitShape::Flipper(_) => HitKind::Flipper,
            HitShape::Gate(_) => HitKind::Gate,
            HitShape::Spinner(_) => HitKind::Spinner,
        }
    }

    /// Recompute the bounds stored in the common data
    pub fn calc_hit_bbox(&mut self) {
        self.common.bbox = match &self.shape {
            HitShape::Plane(s) => s.calc_bbox(),
            HitShape::Point(s) => s.calc_bbox(),
            HitShape::LineSeg(s) => s.calc_bbox(),
            HitShape::LineZ(s) => s.calc_bbox(),
            HitShape::Line3D(s) => s.calc_bbox(),
            HitShape::Circle(s) => s.calc_bbox(),
            HitShape::Poly(s) => s.calc_bbox(),
            HitShape::Triangle(s) => s.calc_bbox(),
            HitShape::Bumper(s) => s.circle.calc_bbox(),
            HitShape::Trigger(s) => s.calc_bbox(),
            HitShape::Kicker(s) => s.circle.calc_bbox(),
            HitShape::Flipper(s) => s.calc_bbox(),
            HitShape::Gate(s) => s.calc_bbox(),
            HitShape::Spinner(s) => s.calc_bbox(),
        };
    }

    /// Earliest touch within `dtime`, or -1
    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        if !self.common.enabled || ball.frozen {
            return -1.0;
        }
        match &self.shape {
            HitShape::Plane(s) => s.hit_test(ball, dtime, coll),
            HitShape::Point(s) => s.hit_test(ball, dtime, coll),
            HitShape::LineSeg(s) => s.hit_test_basic(ball, dtime, coll, TestMode::RIGID),
            HitShape::LineZ(s) => s.hit_test(ball, dtime, coll),
            HitShape::Line3D(s) => s.hit_test(ball, dtime, coll),
            HitShape::Circle(s) => s.hit_test_basic_radius(ball, dtime, coll, TestMode::RIGID),
            HitShape::Poly(s) => s.hit_test(ball, dtime, coll),
            HitShape::Triangle(s) => s.hit_test(ball, dtime, coll),
            HitShape::Bumper(s) => s.circle.hit_test_basic_radius(ball, dtime, coll, TestMode::RIGID),
            HitShape::Trigger(s) => match self.common.item {
                Some(item) => s.hit_test(item, ball, dtime, coll),
                None => -1.0,
            },
            HitShape::Kicker(s) => match self.common.item {
                Some(item) => s.hit_test(item, ball, dtime, coll),
                None => -1.0,
            },
            HitShape::Flipper(s) => s.hit_test(ball, dtime, coll),
            HitShape::Gate(s) => s.hit_test(ball, dtime, coll),
            HitShape::Spinner(s) => s.hit_test(ball, dtime, coll),
        }
    }

    /// Resolve the impact found by `hit_test`
    pub fn collide(&mut self, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let common = &self.common;
        match &mut self.shape {
            HitShape::Plane(s) => s.collide(common, coll, ball, ctx),
            HitShape::Bumper(s) => s.collide(common, coll, ball, ctx),
            HitShape::Trigger(s) => s.collide(common, coll, ball, ctx),
            HitShape::Kicker(s) => s.collide(common, coll, ball, ctx),
            HitShape::Flipper(s) => s.collide(common, coll, ball, ctx),
            HitShape::Gate(s) => s.collide(common, coll, ball, ctx),
            HitShape::Spinner(s) => s.collide(coll, ball),
            HitShape::Point(_)
            | HitShape::LineSeg(_)
            | HitShape::LineZ(_)
            | HitShape::Line3D(_)
            | HitShape::Circle(_)
            | HitShape::Poly(_)
            | HitShape::Triangle(_) => common.collide_wall(coll, ball, ctx),
        }
    }

    /// Sustained response for a resting contact over `dtime`
    pub fn contact(&mut self, coll: &CollisionEvent, ball: &mut Ball, dtime: f32, ctx: &mut PhysicsContext) {
        match &mut self.shape {
            HitShape::Flipper(s) => s.contact(&self.common, coll, ball, dtime, ctx),
            _ => ball.handle_static_contact(coll, self.common.material.friction, dtime, ctx.gravity),
        }
    }

    /// The moving part of this object, if it has one
    pub fn mover_mut(&mut self) -> Option<&mut dyn Mover> {
        match &mut self.shape {
            HitShape::Flipper(s) => Some(&mut s.mover),
            HitShape::Gate(s) => Some(&mut s.mover),
            HitShape::Spinner(s) => Some(&mut s.mover),
            _ => None,
        }
    }

    /// Time until a flipper reaches its stop, or -1 for everything else
    pub fn flipper_hit_time(&self) -> f32 {
        match &self.shape {
            HitShape::Flipper(s) => s.mover.get_hit_time(),
            _ => -1.0,
        }
    }

    /// Advance visual-only state by `elapsed_ms`
    pub fn update_animation(&mut self, elapsed_ms: f32) {
        if let HitShape::Trigger(s) = &mut self.shape {
            s.animation.tick(elapsed_ms);
        }
    }
}

/// Run one hit test for `ball` and keep the result if it matters
///
/// A contact is appended to `contacts`; a proper hit replaces the ball's
/// nearest collision when it is not later than the current one.
pub fn do_hit_test(
    ball: &mut Ball,
    target: HitTarget,
    contacts: &mut Vec<CollisionEvent>,
    test: impl FnOnce(&Ball, f32, &mut CollisionEvent) -> f32,
) {
    let budget = ball.coll.time;
    let mut candidate = CollisionEvent::new(ball.id, budget);
    let newtime = test(ball, budget, &mut candidate);

    if !newtime.is_finite() || newtime < 0.0 {
        return;
    }

    candidate.target = Some(target);
    candidate.time = newtime;
    if candidate.is_contact {
        contacts.push(candidate);
    } else if newtime <= budget {
        ball.coll = candidate;
    }
}
