use glam::Vec3;

use super::HitCommon;
use crate::consts::*;
use crate::math::BBox;
use crate::sim::ball::Ball;
use crate::sim::context::PhysicsContext;
use crate::sim::event::CollisionEvent;

/// Infinite plane `normal · p = d`, balls live on the side the normal points to
#[derive(Debug, Clone)]
pub struct HitPlane {
    pub normal: Vec3,
    pub d: f32,
}

impl HitPlane {
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self {
            normal: normal.normalize_or(Vec3::Z),
            d,
        }
    }

    /// Planes cover the whole table and are never put in the index
    pub fn calc_bbox(&self) -> BBox {
        BBox::new(-f32::MAX, -f32::MAX, f32::MAX, f32::MAX, -f32::MAX, f32::MAX)
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let bnv = self.normal.dot(ball.vel);
        if bnv > C_CONTACTVEL {
            // clearly receding
            return -1.0;
        }

        let bnd = self.normal.dot(ball.pos) - ball.radius() - self.d;
        if bnd < ball.radius() * -2.0 {
            // passed through the plane long ago
            return -1.0;
        }

        let hittime = if bnv.abs() <= C_CONTACTVEL {
            if bnd.abs() <= PHYS_TOUCH {
                coll.is_contact = true;
                coll.normal = self.normal;
                coll.org_normal_velocity = bnv;
                coll.distance = bnd;
                return 0.0;
            }
            if bnd <= 0.0 {
                // slow but embedded
                0.0
            } else {
                return -1.0;
            }
        } else {
            (bnd / -bnv).max(0.0)
        };

        if !hittime.is_finite() || hittime > dtime {
            return -1.0;
        }

        coll.normal = self.normal;
        coll.distance = bnd;
        hittime
    }

    pub fn collide(&self, common: &HitCommon, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        ball.collide_3d_wall(coll.normal, coll.distance, &common.material, ctx);

        // push a penetrating ball back to the surface
        let bnd = self.normal.dot(ball.pos) - ball.radius() - self.d;
        if bnd < 0.0 {
            ball.pos -= bnd * self.normal;
        }
    }
}
