use glam::{Vec2, Vec3};

use super::{HitCircle, HitCommon, LineSeg, TestMode};
use crate::consts::*;
use crate::math::{BBox, xy};
use crate::sim::ball::Ball;
use crate::sim::context::PhysicsContext;
use crate::sim::event::{CollisionEvent, PhysicsEvent};
use crate::sim::state::ItemId;

/// Boundary of a trigger volume
///
/// Polygon triggers are built from one segment object per edge, all
/// sharing the item, so membership is tracked for the whole polygon.
#[derive(Debug, Clone)]
pub enum TriggerShape {
    Circle(HitCircle),
    /// One edge, normal pointing out of the polygon
    Segment(LineSeg),
}

/// Visual travel of the trigger wire or button
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerAnimation {
    /// Current depression, 0 released
    pub depth: f32,
    /// Depression when fully pressed
    pub travel: f32,
    /// Depression change per millisecond
    pub speed: f32,
    pub pressed: bool,
}

impl Default for TriggerAnimation {
    fn default() -> Self {
        Self {
            depth: 0.0,
            travel: 5.0,
            speed: 0.5,
            pressed: false,
        }
    }
}

impl TriggerAnimation {
    pub fn tick(&mut self, elapsed_ms: f32) {
        let target = if self.pressed { self.travel } else { 0.0 };
        let step = self.speed * elapsed_ms;
        if self.depth < target {
            self.depth = (self.depth + step).min(target);
        } else {
            self.depth = (self.depth - step).max(target);
        }
    }
}

/// Sensor reporting balls that enter and leave it
#[derive(Debug, Clone)]
pub struct HitTrigger {
    pub shape: TriggerShape,
    pub animation: TriggerAnimation,
}

impl HitTrigger {
    pub fn circle(center: Vec2, radius: f32, zlow: f32, zhigh: f32) -> Self {
        Self {
            shape: TriggerShape::Circle(HitCircle::new(center, radius, zlow, zhigh)),
            animation: TriggerAnimation::default(),
        }
    }

    pub fn segment(seg: LineSeg) -> Self {
        Self {
            shape: TriggerShape::Segment(seg),
            animation: TriggerAnimation::default(),
        }
    }

    pub fn calc_bbox(&self) -> BBox {
        match &self.shape {
            TriggerShape::Circle(c) => c.calc_bbox(),
            TriggerShape::Segment(s) => s.calc_bbox(),
        }
    }

    pub fn hit_test(&self, item: ItemId, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let mode = TestMode::volume(item);
        match &self.shape {
            TriggerShape::Circle(c) => c.hit_test_basic_radius(ball, dtime, coll, mode),
            TriggerShape::Segment(s) => s.hit_test_basic(ball, dtime, coll, mode),
        }
    }

    /// True when a ball center at `pos` lies inside a circular trigger
    ///
    /// Segment edges cannot answer this alone; the table resolves polygons.
    pub fn contains(&self, pos: Vec3) -> bool {
        match &self.shape {
            TriggerShape::Circle(c) => {
                (xy(pos) - c.center).length() < c.radius && pos.z >= c.zlow && pos.z <= c.zhigh
            }
            TriggerShape::Segment(_) => false,
        }
    }

    pub fn collide(&mut self, common: &HitCommon, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let Some(item) = common.item else {
            return;
        };

        // a leaving report only counts for members, an entering one only for others
        let inside = ball.in_volume(item);
        if coll.hit_flag != inside {
            return;
        }

        // carry the ball across the boundary so the crossing is not found again
        ball.pos += STATICTIME * ball.vel;

        if inside {
            ball.leave_volume(item);
            self.animation.pressed = false;
            if common.fire_events {
                ctx.fire(PhysicsEvent::Unhit { item, ball: ball.id });
            }
        } else {
            ball.enter_volume(item);
            self.animation.pressed = true;
            if common.fire_events {
                ctx.fire(PhysicsEvent::Hit { item, ball: ball.id });
            }
        }
    }
}

/// True when a ball center at `pos` lies inside the polygon the edges form
///
/// Even-odd rule, so the edges may come in any order and orientation.
pub fn polygon_contains<'a>(edges: impl IntoIterator<Item = &'a LineSeg>, pos: Vec3) -> bool {
    let p = xy(pos);
    let mut inside = false;
    for seg in edges {
        if pos.z < seg.zlow || pos.z > seg.zhigh {
            return false;
        }
        let (a, b) = (seg.v1, seg.v2);
        if (a.y > p.y) != (b.y > p.y) {
            let x = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x {
                inside = !inside;
            }
        }
    }
    inside
}
