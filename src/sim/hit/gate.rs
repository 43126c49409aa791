use glam::Vec2;

use super::{HitCommon, LineSeg, TestMode};
use crate::deg_to_rad;
use crate::error::Result;
use crate::math::{BBox, xy};
use crate::sim::ball::Ball;
use crate::sim::context::PhysicsContext;
use crate::sim::event::CollisionEvent;
use crate::sim::mover::{GateConfig, GateMover, SpinnerConfig, SpinnerMover};
use crate::sim::state::ItemId;

/// Front and back segments of a flap hanging across the ball's path
///
/// The front normal points to the front side. A ball coming from the front
/// is caught by the back segment and travels forward.
fn flap_segments(center: Vec2, length: f32, rotation: f32, height: f32) -> Result<(LineSeg, LineSeg)> {
    let dir = Vec2::from_angle(deg_to_rad(rotation)) * (length * 0.5);
    let a = center - dir;
    let b = center + dir;
    Ok((LineSeg::new(a, b, 0.0, height)?, LineSeg::new(b, a, 0.0, height)?))
}

/// Earliest touch of either flap side, `hit_flag` set when moving forward
fn flap_hit_test(front: &LineSeg, back: &LineSeg, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
    let mut from_front = CollisionEvent::new(ball.id, dtime);
    let t_back = back.hit_test_basic(ball, dtime, &mut from_front, TestMode::SWING);
    let mut from_back = CollisionEvent::new(ball.id, dtime);
    let t_front = front.hit_test_basic(ball, dtime, &mut from_back, TestMode::SWING);

    let (t, mut chosen, forward) = match (t_back >= 0.0, t_front >= 0.0) {
        (false, false) => return -1.0,
        (true, false) => (t_back, from_front, true),
        (false, true) => (t_front, from_back, false),
        (true, true) if t_back <= t_front => (t_back, from_front, true),
        (true, true) => (t_front, from_back, false),
    };
    chosen.hit_flag = forward;
    *coll = chosen;
    t
}

/// Angular speed a ball passing at `normal_speed` gives a flap hinged at `height`
fn flap_speed(normal_speed: f32, height: f32) -> f32 {
    let h = height * 0.5;
    if h.abs() > 1.0 {
        normal_speed.abs() / h
    } else {
        normal_speed.abs()
    }
}

/// Swinging gate
#[derive(Debug, Clone)]
pub struct HitGate {
    pub front: LineSeg,
    pub back: LineSeg,
    pub mover: GateMover,
    pub height: f32,
}

impl HitGate {
    pub fn new(item: ItemId, config: &GateConfig) -> Result<Self> {
        let (front, back) = flap_segments(config.center, config.length, config.rotation, config.height)?;
        Ok(Self {
            front,
            back,
            mover: GateMover::new(item, config),
            height: config.height,
        })
    }

    pub fn calc_bbox(&self) -> BBox {
        self.front.calc_bbox()
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        if self.mover.open {
            // held open, balls pass underneath
            return -1.0;
        }
        flap_hit_test(&self.front, &self.back, ball, dtime, coll)
    }

    pub fn collide(&mut self, common: &HitCommon, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let dot = xy(coll.normal).dot(xy(ball.vel));
        if dot < 0.0 {
            // the ball is leaving the flap
            return;
        }
        let forward = coll.hit_flag;
        if !forward && !self.mover.two_way {
            return;
        }

        let speed = flap_speed(dot, self.height);
        self.mover.angle_speed = if forward { speed } else { -speed };
        common.fire_hit_event(ball, ctx);
    }
}

/// Spinner plate
#[derive(Debug, Clone)]
pub struct HitSpinner {
    pub front: LineSeg,
    pub back: LineSeg,
    pub mover: SpinnerMover,
    pub height: f32,
}

impl HitSpinner {
    pub fn new(item: ItemId, config: &SpinnerConfig) -> Result<Self> {
        let (front, back) = flap_segments(config.center, config.length, config.rotation, config.height)?;
        Ok(Self {
            front,
            back,
            mover: SpinnerMover::new(item, config),
            height: config.height,
        })
    }

    pub fn calc_bbox(&self) -> BBox {
        self.front.calc_bbox()
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        flap_hit_test(&self.front, &self.back, ball, dtime, coll)
    }

    pub fn collide(&mut self, coll: &CollisionEvent, ball: &mut Ball) {
        let dot = xy(coll.normal).dot(xy(ball.vel));
        if dot < 0.0 {
            return;
        }
        let speed = flap_speed(dot, self.height) * self.mover.damping;
        self.mover.angle_speed = if coll.hit_flag { speed } else { -speed };
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::sim::ball::BallSpawn;
    use crate::sim::context::test_context;
    use crate::sim::event::PhysicsEvent;
    use crate::sim::hit::{HitObject, HitShape};
    use crate::sim::state::BallId;

    const ITEM: ItemId = ItemId(8);

    fn gate(two_way: bool) -> HitObject {
        let config = GateConfig {
            two_way,
            ..Default::default()
        };
        HitObject::new(HitShape::Gate(HitGate::new(ITEM, &config).unwrap())).with_item(ITEM)
    }

    fn spinner() -> HitObject {
        HitObject::new(HitShape::Spinner(HitSpinner::new(ITEM, &SpinnerConfig::default()).unwrap())).with_item(ITEM)
    }

    fn ball(y: f32, vy: f32) -> Ball {
        Ball::new(
            BallId(1),
            &BallSpawn::at(Vec3::new(0.0, y, 25.0)).with_velocity(Vec3::new(0.0, vy, 0.0)),
        )
    }

    fn pass(obj: &mut HitObject, b: &mut Ball, ctx: &mut PhysicsContext) -> CollisionEvent {
        let mut coll = CollisionEvent::new(b.id, 50.0);
        let t = obj.hit_test(b, 50.0, &mut coll);
        assert!(t >= 0.0, "expected the flap to be touched");
        b.pos += b.vel * t;
        obj.collide(&coll, b, ctx);
        coll
    }

    fn gate_speed(obj: &HitObject) -> f32 {
        match &obj.shape {
            HitShape::Gate(g) => g.mover.angle_speed,
            HitShape::Spinner(s) => s.mover.angle_speed,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_forward_pass_swings_gate() {
        let mut ctx = test_context();
        let mut obj = gate(false);
        let mut b = ball(100.0, -5.0);

        let mut coll = CollisionEvent::new(b.id, 50.0);
        let t = obj.hit_test(&b, 50.0, &mut coll);
        // leading surface reaches the gate line
        assert!((t - 15.0).abs() < 1e-4);
        assert!(coll.hit_flag);

        b.pos += b.vel * t;
        obj.collide(&coll, &mut b, &mut ctx);
        assert!((gate_speed(&obj) - 0.2).abs() < 1e-6);
        assert_eq!(ctx.events(), &[PhysicsEvent::Hit { item: ITEM, ball: b.id }]);
        // the ball itself is not deflected
        assert_eq!(b.vel, Vec3::new(0.0, -5.0, 0.0));
    }

    #[test]
    fn test_one_way_gate_ignores_back_swing() {
        let mut ctx = test_context();
        let mut obj = gate(false);
        let coll = pass(&mut obj, &mut ball(-100.0, 5.0), &mut ctx);
        assert!(!coll.hit_flag);
        assert_eq!(gate_speed(&obj), 0.0);
        assert!(ctx.events().is_empty());
    }

    #[test]
    fn test_two_way_gate_swings_back() {
        let mut ctx = test_context();
        let mut obj = gate(true);
        pass(&mut obj, &mut ball(-100.0, 5.0), &mut ctx);
        assert!((gate_speed(&obj) + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_open_gate_lets_ball_through() {
        let mut obj = gate(false);
        if let HitShape::Gate(g) = &mut obj.shape {
            g.mover.open = true;
        }
        let b = ball(100.0, -5.0);
        let mut coll = CollisionEvent::new(b.id, 50.0);
        assert_eq!(obj.hit_test(&b, 50.0, &mut coll), -1.0);
    }

    #[test]
    fn test_spinner_direction_follows_ball() {
        let mut ctx = test_context();
        let mut obj = spinner();
        pass(&mut obj, &mut ball(100.0, -6.0), &mut ctx);
        let expected = 6.0 / 30.0 * 0.9879f32.powf(crate::consts::PHYS_FACTOR);
        assert!((gate_speed(&obj) - expected).abs() < 1e-6);

        let mut obj = spinner();
        pass(&mut obj, &mut ball(-100.0, 6.0), &mut ctx);
        assert!((gate_speed(&obj) + expected).abs() < 1e-6);
    }

    #[test]
    fn test_leaving_the_flap_is_ignored() {
        let mut ctx = test_context();
        let mut obj = spinner();
        // already through, trailing surface about to clear the line
        let coll = pass(&mut obj, &mut ball(-10.0, -5.0), &mut ctx);
        assert!(xy(coll.normal).dot(Vec2::new(0.0, -5.0)) < 0.0);
        assert_eq!(gate_speed(&obj), 0.0);
    }
}
