use glam::{Vec2, Vec3};

use super::TestMode;
use crate::consts::*;
use crate::math::{BBox, pick_root, solve_quadratic, xy};
use crate::sim::ball::Ball;
use crate::sim::event::CollisionEvent;

/// Vertical cylinder, the shape of posts, bumpers, kickers and round triggers
#[derive(Debug, Clone)]
pub struct HitCircle {
    pub center: Vec2,
    pub radius: f32,
    pub zlow: f32,
    pub zhigh: f32,
}

impl HitCircle {
    pub fn new(center: Vec2, radius: f32, zlow: f32, zhigh: f32) -> Self {
        Self {
            center,
            radius,
            zlow,
            zhigh,
        }
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::new(
            self.center.x - self.radius,
            self.center.y - self.radius,
            self.center.x + self.radius,
            self.center.y + self.radius,
            self.zlow,
            self.zhigh,
        )
    }

    /// Cylinder hit test parameterized by `mode`
    pub fn hit_test_basic_radius(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent, mode: TestMode) -> f32 {
        let dist = xy(ball.pos) - self.center;
        let dv = xy(ball.vel);

        let target_radius = if mode.lateral {
            self.radius + ball.radius()
        } else {
            self.radius
        };

        let bcddsq = dist.length_squared();
        let bcdd = bcddsq.sqrt();
        if bcdd <= 1.0e-6 {
            // no normal on the exact center
            return -1.0;
        }

        let b = dist.dot(dv);
        let bnv = b / bcdd;
        if mode.direction && bnv > C_LOWNORMVEL {
            return -1.0;
        }

        let bnd = bcdd - target_radius;
        let a = dv.length_squared();

        let mut is_contact = false;
        let mut unhit = false;

        let membership_stale = mode
            .volume
            .is_some_and(|item| (bnd < 0.0) != ball.in_volume(item));

        let hittime = if mode.rigid && bnd < PHYS_TOUCH {
            if bnd < -ball.radius() {
                return -1.0;
            }
            if bnv.abs() <= C_CONTACTVEL {
                is_contact = true;
                0.0
            } else {
                (-bnd / bnv).max(0.0)
            }
        } else if membership_stale {
            // inside without membership, or outside with it: report now
            unhit = bnd >= 0.0;
            0.0
        } else {
            if (!mode.rigid && bnd * bnv > 0.0) || a < 1.0e-8 {
                // moving away on the outside, toward the center on the inside,
                // or not moving at all
                return -1.0;
            }
            let Some((t1, t2)) = solve_quadratic(a, 2.0 * b, bcddsq - target_radius * target_radius) else {
                return -1.0;
            };
            unhit = t1 * t2 < 0.0;
            pick_root(t1, t2)
        };

        if !hittime.is_finite() || hittime < 0.0 || hittime > dtime {
            return -1.0;
        }

        let hitz = ball.pos.z + ball.vel.z * hittime;
        if hitz + ball.radius() * 0.5 < self.zlow || hitz - ball.radius() * 0.5 > self.zhigh {
            return -1.0;
        }

        let hit_xy = xy(ball.pos) + dv * hittime - self.center;
        let n = if hit_xy.length_squared() > 1.0e-8 {
            hit_xy.normalize()
        } else {
            // over the center, any direction will do
            Vec2::Y
        };
        coll.normal = Vec3::new(n.x, n.y, 0.0);

        if !mode.rigid {
            coll.hit_flag = unhit;
        }
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
    use crate::sim::state::{BallId, ItemId};

    fn ball(pos: Vec2, vel: Vec2) -> Ball {
        Ball::new(
            BallId(1),
            &BallSpawn::at(Vec3::new(pos.x, pos.y, 25.0)).with_velocity(Vec3::new(vel.x, vel.y, 0.0)),
        )
    }

    #[test]
    fn test_post_surface_hit() {
        let post = HitCircle::new(Vec2::ZERO, 25.0, 0.0, 50.0);
        let b = ball(Vec2::new(-100.0, 0.0), Vec2::new(10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = post.hit_test_basic_radius(&b, 10.0, &mut coll, TestMode::RIGID);
        assert!((t - 5.0).abs() < 1e-4);
        assert!((coll.normal - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_resting_against_post_is_contact() {
        let post = HitCircle::new(Vec2::ZERO, 25.0, 0.0, 50.0);
        let b = ball(Vec2::new(0.0, 50.02), Vec2::ZERO);
        let mut coll = CollisionEvent::new(b.id, 1.0);
        assert_eq!(post.hit_test_basic_radius(&b, 1.0, &mut coll, TestMode::RIGID), 0.0);
        assert!(coll.is_contact);
    }

    #[test]
    fn test_volume_enter_and_leave() {
        let item = ItemId(3);
        let zone = HitCircle::new(Vec2::ZERO, 30.0, 0.0, 50.0);
        let mode = TestMode::volume(item);

        // center enters the zone
        let b = ball(Vec2::new(-100.0, 0.0), Vec2::new(10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = zone.hit_test_basic_radius(&b, 10.0, &mut coll, mode);
        assert!((t - 7.0).abs() < 1e-4);
        assert!(!coll.hit_flag);

        // member on its way out
        let mut b = ball(Vec2::new(10.0, 0.0), Vec2::new(10.0, 0.0));
        b.enter_volume(item);
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = zone.hit_test_basic_radius(&b, 10.0, &mut coll, mode);
        assert!((t - 2.0).abs() < 1e-4);
        assert!(coll.hit_flag);
    }

    #[test]
    fn test_volume_stale_membership_reports_now() {
        let item = ItemId(3);
        let zone = HitCircle::new(Vec2::ZERO, 30.0, 0.0, 50.0);
        let mode = TestMode::volume(item);

        let b = ball(Vec2::new(10.0, 0.0), Vec2::ZERO);
        let mut coll = CollisionEvent::new(b.id, 1.0);
        assert_eq!(zone.hit_test_basic_radius(&b, 1.0, &mut coll, mode), 0.0);
        assert!(!coll.hit_flag);

        let mut b = ball(Vec2::new(80.0, 0.0), Vec2::ZERO);
        b.enter_volume(item);
        let mut coll = CollisionEvent::new(b.id, 1.0);
        assert_eq!(zone.hit_test_basic_radius(&b, 1.0, &mut coll, mode), 0.0);
        assert!(coll.hit_flag);
    }
}
