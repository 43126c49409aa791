use glam::Vec3;

use crate::consts::*;
use crate::math::{BBox, pick_root, solve_quadratic};
use crate::sim::ball::Ball;
use crate::sim::event::CollisionEvent;

/// Isolated point, the corner of a 3D mesh
#[derive(Debug, Clone)]
pub struct HitPoint {
    pub p: Vec3,
}

impl HitPoint {
    pub fn new(p: Vec3) -> Self {
        Self { p }
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::from_corners(self.p, self.p)
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let dist = ball.pos - self.p;
        let bcddsq = dist.length_squared();
        let bcdd = bcddsq.sqrt();
        if bcdd <= 1.0e-6 {
            // no normal on the exact center
            return -1.0;
        }

        let b = dist.dot(ball.vel);
        let bnv = b / bcdd;
        if bnv > C_CONTACTVEL {
            return -1.0;
        }

        let bnd = bcdd - ball.radius();
        let mut is_contact = false;

        let hittime = if bnd < PHYS_TOUCH {
            if bnv.abs() <= C_CONTACTVEL {
                is_contact = true;
                0.0
            } else {
                (-bnd / bnv).max(0.0)
            }
        } else {
            let a = ball.vel.length_squared();
            if a < 1.0e-8 {
                return -1.0;
            }
            let Some((t1, t2)) = solve_quadratic(a, 2.0 * b, bcddsq - ball.radius() * ball.radius()) else {
                return -1.0;
            };
            pick_root(t1, t2)
        };

        if !hittime.is_finite() || hittime < 0.0 || hittime > dtime {
            return -1.0;
        }

        let hit_pos = ball.pos + hittime * ball.vel;
        coll.normal = (hit_pos - self.p).normalize_or(Vec3::Z);
        coll.is_contact = is_contact;
        if is_contact {
            coll.org_normal_velocity = bnv;
        }
        coll.distance = bnd;
        hittime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallSpawn;
    use crate::sim::state::BallId;

    #[test]
    fn test_head_on_point() {
        let point = HitPoint::new(Vec3::new(0.0, 0.0, 25.0));
        let b = Ball::new(
            BallId(1),
            &BallSpawn::at(Vec3::new(0.0, 75.0, 25.0)).with_velocity(Vec3::new(0.0, -10.0, 0.0)),
        );
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = point.hit_test(&b, 10.0, &mut coll);
        assert!((t - 5.0).abs() < 1e-4);
        assert!((coll.normal - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_glancing_miss() {
        let point = HitPoint::new(Vec3::new(0.0, 0.0, 25.0));
        let b = Ball::new(
            BallId(1),
            &BallSpawn::at(Vec3::new(30.0, 75.0, 25.0)).with_velocity(Vec3::new(0.0, -10.0, 0.0)),
        );
        let mut coll = CollisionEvent::new(b.id, 20.0);
        assert_eq!(point.hit_test(&b, 20.0, &mut coll), -1.0);
    }
}
