use super::{HitCircle, HitCommon};
use crate::sim::ball::Ball;
use crate::sim::context::PhysicsContext;
use crate::sim::event::CollisionEvent;

/// Pop bumper: a post that kicks the ball away when struck hard enough
#[derive(Debug, Clone)]
pub struct HitBumper {
    pub circle: HitCircle,
    /// Speed added along the normal on a hit
    pub force: f32,
}

impl HitBumper {
    pub fn new(circle: HitCircle, force: f32) -> Self {
        Self { circle, force }
    }

    pub fn collide(&mut self, common: &HitCommon, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let dot = coll.normal.dot(ball.vel);
        ball.collide_3d_wall(coll.normal, coll.distance, &common.material, ctx);

        if dot <= -common.threshold {
            ball.vel += coll.normal * self.force;
            common.fire_hit_event(ball, ctx);
        }
    }
}
