use glam::{Vec2, Vec3};

use super::TestMode;
use crate::consts::*;
use crate::error::{PhysicsError, Result};
use crate::math::{BBox, xy};
use crate::sim::ball::Ball;
use crate::sim::event::CollisionEvent;

/// Vertical wall segment between two points, extruded from `zlow` to `zhigh`
///
/// The solid side is the one the normal points away from: walking from `v1`
/// to `v2` (x right, y down), the normal points to the right.
#[derive(Debug, Clone)]
pub struct LineSeg {
    pub v1: Vec2,
    pub v2: Vec2,
    pub normal: Vec2,
    pub length: f32,
    pub zlow: f32,
    pub zhigh: f32,
}

impl LineSeg {
    pub fn new(v1: Vec2, v2: Vec2, zlow: f32, zhigh: f32) -> Result<Self> {
        let d = v2 - v1;
        let length = d.length();
        if !(length > 1e-6) {
            return Err(PhysicsError::InvalidShape(format!(
                "degenerate segment {v1} - {v2}"
            )));
        }
        Ok(Self {
            v1,
            v2,
            normal: Vec2::new(-d.y, d.x) / length,
            length,
            zlow,
            zhigh,
        })
    }

    /// Unit direction from `v1` to `v2`
    #[inline]
    pub fn tangent(&self) -> Vec2 {
        (self.v2 - self.v1) / self.length
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::new(
            self.v1.x.min(self.v2.x),
            self.v1.y.min(self.v2.y),
            self.v1.x.max(self.v2.x),
            self.v1.y.max(self.v2.y),
            self.zlow,
            self.zhigh,
        )
    }

    /// Segment hit test parameterized by `mode`
    pub fn hit_test_basic(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent, mode: TestMode) -> f32 {
        let vel = xy(ball.vel);
        let pos = xy(ball.pos);

        // positive when receding from the normal side
        let bnv = vel.dot(self.normal);
        let mut unhit = bnv > C_LOWNORMVEL;
        if mode.direction && unhit {
            return -1.0;
        }

        let rolling_radius = if mode.lateral { ball.radius() } else { C_TOL_RADIUS };
        let bcpd = (pos - self.v1).dot(self.normal);
        let bnd = if mode.swing {
            // a flap is passed once the ball's far side crosses it
            bcpd + rolling_radius
        } else {
            bcpd - rolling_radius
        };
        let inside = bnd <= 0.0;

        let hittime = if mode.rigid {
            if bnd < -ball.radius() || (mode.lateral && bcpd < 0.0) {
                // beyond the wall, not ours to push back
                return -1.0;
            }
            if mode.lateral && bnd <= PHYS_TOUCH {
                if inside || bnv.abs() > C_CONTACTVEL || bnd <= -PHYS_TOUCH {
                    0.0
                } else {
                    // slow touch: do not compete with fast zero-time events
                    bnd * (1.0 / (2.0 * PHYS_TOUCH)) + 0.5
                }
            } else if bnv.abs() > C_LOWNORMVEL {
                bnd / -bnv
            } else {
                return -1.0;
            }
        } else if bnv * bnd >= 0.0 {
            // outside and receding, or inside and approaching: only a volume
            // whose membership disagrees with the ball's side reports
            let Some(item) = mode.volume else {
                return -1.0;
            };
            if bnd.abs() >= ball.radius() * 0.5 || inside != !ball.in_volume(item) {
                return -1.0;
            }
            unhit = !inside;
            0.0
        } else {
            bnd / -bnv
        };

        if !hittime.is_finite() || hittime < 0.0 || hittime > dtime {
            return -1.0;
        }

        // tangential position at impact, measured from v1 along the segment
        let tangent = self.tangent();
        let btd = (pos - self.v1).dot(tangent) + vel.dot(tangent) * hittime;
        if btd < -C_TOL_ENDPNTS || btd > self.length + C_TOL_ENDPNTS {
            return -1.0;
        }

        // rolling point at impact must lie within the wall height
        let hitz = ball.pos.z + ball.vel.z * hittime;
        if hitz + ball.radius() * 0.5 < self.zlow || hitz - ball.radius() * 0.5 > self.zhigh {
            return -1.0;
        }

        if !mode.rigid {
            coll.hit_flag = unhit;
        }
        coll.normal = Vec3::new(self.normal.x, self.normal.y, 0.0);
        coll.distance = bnd;

        if bnv.abs() <= C_CONTACTVEL && bnd.abs() <= PHYS_TOUCH {
            coll.is_contact = true;
            coll.org_normal_velocity = bnv;
        }

        hittime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallSpawn;
    use crate::sim::state::{BallId, ItemId};

    fn seg() -> LineSeg {
        LineSeg::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0), 0.0, 50.0).unwrap()
    }

    fn ball(pos: Vec3, vel: Vec3) -> Ball {
        Ball::new(BallId(1), &BallSpawn::at(pos).with_velocity(vel))
    }

    #[test]
    fn test_normal_points_right_of_travel() {
        let s = seg();
        assert!((s.normal - Vec2::new(0.0, 1.0)).length() < 1e-6);
        assert!(LineSeg::new(Vec2::ONE, Vec2::ONE, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_rigid_hit_time() {
        let b = ball(Vec3::new(50.0, 45.0, 25.0), Vec3::new(0.0, -10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        let t = seg().hit_test_basic(&b, 5.0, &mut coll, TestMode::RIGID);
        assert!((t - 2.0).abs() < 1e-5);
        assert_eq!(coll.normal, Vec3::Y);
    }

    #[test]
    fn test_misses_past_endpoint() {
        let b = ball(Vec3::new(150.0, 45.0, 25.0), Vec3::new(0.0, -10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        assert_eq!(seg().hit_test_basic(&b, 5.0, &mut coll, TestMode::RIGID), -1.0);
    }

    #[test]
    fn test_back_side_ignored() {
        let b = ball(Vec3::new(50.0, -45.0, 25.0), Vec3::new(0.0, 10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        assert_eq!(seg().hit_test_basic(&b, 5.0, &mut coll, TestMode::RIGID), -1.0);
    }

    #[test]
    fn test_ball_over_wall_passes() {
        let b = ball(Vec3::new(50.0, 45.0, 120.0), Vec3::new(0.0, -10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        assert_eq!(seg().hit_test_basic(&b, 5.0, &mut coll, TestMode::RIGID), -1.0);
    }

    #[test]
    fn test_resting_against_wall_is_contact() {
        let b = ball(Vec3::new(50.0, 25.03, 25.0), Vec3::new(1.0, -0.01, 0.0));
        let mut coll = CollisionEvent::new(b.id, 1.0);
        let t = seg().hit_test_basic(&b, 1.0, &mut coll, TestMode::RIGID);
        assert!(t >= 0.0);
        assert!(coll.is_contact);
    }

    #[test]
    fn test_volume_edge_trigger() {
        let item = ItemId(5);
        let mode = TestMode::volume(item);
        // center just inside the volume side (behind the normal)
        let mut b = ball(Vec3::new(50.0, -0.001, 25.0), Vec3::new(0.0, -1.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 1.0);
        // inside but not a member yet: crossing reported now as a hit
        assert_eq!(seg().hit_test_basic(&b, 1.0, &mut coll, mode), 0.0);
        assert!(!coll.hit_flag);

        // membership matches the side: nothing to report
        b.enter_volume(item);
        let mut coll = CollisionEvent::new(b.id, 1.0);
        assert_eq!(seg().hit_test_basic(&b, 1.0, &mut coll, mode), -1.0);
    }

    #[test]
    fn test_volume_crossing_time() {
        let mode = TestMode::volume(ItemId(5));
        let b = ball(Vec3::new(50.0, 20.0, 25.0), Vec3::new(0.0, -10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        let t = seg().hit_test_basic(&b, 5.0, &mut coll, mode);
        // the center crosses the rolling radius band
        assert!((t - (20.0 - C_TOL_RADIUS) / 10.0).abs() < 1e-4);
        assert!(!coll.hit_flag);
    }

    #[test]
    fn test_swing_touch_time() {
        let b = ball(Vec3::new(50.0, -100.0, 25.0), Vec3::new(0.0, 10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 20.0);
        // the seg normal points +y, the ball arrives from -y
        let t = seg().hit_test_basic(&b, 20.0, &mut coll, TestMode::SWING);
        assert!((t - 7.5).abs() < 1e-4);
        assert_eq!(coll.normal, Vec3::Y);
    }
}
