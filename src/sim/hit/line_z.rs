use glam::{Mat3, Quat, Vec2, Vec3};

use crate::consts::*;
use crate::math::{BBox, pick_root, solve_quadratic, xy};
use crate::sim::ball::Ball;
use crate::sim::event::CollisionEvent;

/// Vertical edge at `xy`, between `zlow` and `zhigh`
#[derive(Debug, Clone)]
pub struct HitLineZ {
    pub xy: Vec2,
    pub zlow: f32,
    pub zhigh: f32,
}

impl HitLineZ {
    pub fn new(xy: Vec2, zlow: f32, zhigh: f32) -> Self {
        Self { xy, zlow, zhigh }
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::new(self.xy.x, self.xy.y, self.xy.x, self.xy.y, self.zlow, self.zhigh)
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        hit_test_z_axis(self.xy, self.zlow, self.zhigh, ball.pos, ball.vel, ball.radius(), dtime, coll)
    }
}

/// Arbitrary 3D edge from `v1` to `v2`
///
/// Tested by rotating the ball into a frame where the edge is vertical.
#[derive(Debug, Clone)]
pub struct HitLine3D {
    pub v1: Vec3,
    pub v2: Vec3,
    /// World to edge frame
    matrix: Mat3,
    local: HitLineZ,
}

impl HitLine3D {
    pub fn new(v1: Vec3, v2: Vec3) -> Self {
        let dir = (v2 - v1).normalize_or(Vec3::Z);
        let matrix = Mat3::from_quat(Quat::from_rotation_arc(dir, Vec3::Z));

        let t1 = matrix * v1;
        let t2z = (matrix * v2).z;
        Self {
            v1,
            v2,
            matrix,
            local: HitLineZ::new(xy(t1), t1.z.min(t2z), t1.z.max(t2z)),
        }
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::from_corners(self.v1, self.v2)
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let pos = self.matrix * ball.pos;
        let vel = self.matrix * ball.vel;
        let hittime = hit_test_z_axis(
            self.local.xy,
            self.local.zlow,
            self.local.zhigh,
            pos,
            vel,
            ball.radius(),
            dtime,
            coll,
        );
        if hittime >= 0.0 {
            // rotation inverse is its transpose
            coll.normal = self.matrix.transpose() * coll.normal;
        }
        hittime
    }
}

#[allow(clippy::too_many_arguments)]
fn hit_test_z_axis(
    line_xy: Vec2,
    zlow: f32,
    zhigh: f32,
    pos: Vec3,
    vel: Vec3,
    radius: f32,
    dtime: f32,
    coll: &mut CollisionEvent,
) -> f32 {
    let dist = xy(pos) - line_xy;
    let dv = xy(vel);

    let bcddsq = dist.length_squared();
    let bcdd = bcddsq.sqrt();
    if bcdd <= 1.0e-6 {
        return -1.0;
    }

    let b = dist.dot(dv);
    let bnv = b / bcdd;
    if bnv > C_CONTACTVEL {
        return -1.0;
    }

    let bnd = bcdd - radius;
    let mut is_contact = false;

    let hittime = if bnd < PHYS_TOUCH {
        if bnv.abs() <= C_CONTACTVEL {
            is_contact = true;
            0.0
        } else {
            (-bnd / bnv).max(0.0)
        }
    } else {
        let a = dv.length_squared();
        if a < 1.0e-8 {
            return -1.0;
        }
        let Some((t1, t2)) = solve_quadratic(a, 2.0 * b, bcddsq - radius * radius) else {
            return -1.0;
        };
        pick_root(t1, t2)
    };

    if !hittime.is_finite() || hittime < 0.0 || hittime > dtime {
        return -1.0;
    }

    let hitz = pos.z + hittime * vel.z;
    if hitz < zlow || hitz > zhigh {
        return -1.0;
    }

    let n = (xy(pos) + hittime * dv - line_xy).normalize_or(Vec2::Y);
    coll.normal = Vec3::new(n.x, n.y, 0.0);
    coll.is_contact = is_contact;
    if is_contact {
        coll.org_normal_velocity = bnv;
    }
    coll.distance = bnd;
    hittime
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::ball::BallSpawn;
    use crate::sim::state::BallId;

    fn ball(pos: Vec3, vel: Vec3) -> Ball {
        Ball::new(BallId(1), &BallSpawn::at(pos).with_velocity(vel))
    }

    #[test]
    fn test_post_hit() {
        let post = HitLineZ::new(Vec2::ZERO, 0.0, 50.0);
        let b = ball(Vec3::new(-45.0, 0.0, 25.0), Vec3::new(10.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        let t = post.hit_test(&b, 5.0, &mut coll);
        assert!((t - 2.0).abs() < 1e-4);
        assert!((coll.normal - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn test_post_too_low() {
        let post = HitLineZ::new(Vec2::ZERO, 0.0, 10.0);
        let b = ball(Vec3::new(-45.0, 0.0, 25.0), Vec3::new(10.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        assert_eq!(post.hit_test(&b, 5.0, &mut coll), -1.0);
    }

    #[test]
    fn test_embedded_ball_hits_now() {
        let post = HitLineZ::new(Vec2::ZERO, 0.0, 50.0);
        let b = ball(Vec3::new(-20.0, 0.0, 25.0), Vec3::new(1.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        assert_eq!(post.hit_test(&b, 5.0, &mut coll), 0.0);
        assert!(coll.distance < 0.0);
    }

    #[test]
    fn test_horizontal_rod_from_above() {
        let rod = HitLine3D::new(Vec3::new(0.0, 0.0, 50.0), Vec3::new(100.0, 0.0, 50.0));
        let b = ball(Vec3::new(50.0, 0.0, 100.0), Vec3::new(0.0, 0.0, -10.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        let t = rod.hit_test(&b, 5.0, &mut coll);
        assert!((t - 2.5).abs() < 1e-3);
        assert!((coll.normal - Vec3::Z).length() < 1e-4);
    }

    #[test]
    fn test_rod_end_is_open() {
        let rod = HitLine3D::new(Vec3::new(0.0, 0.0, 50.0), Vec3::new(100.0, 0.0, 50.0));
        let b = ball(Vec3::new(150.0, 0.0, 100.0), Vec3::new(0.0, 0.0, -10.0));
        let mut coll = CollisionEvent::new(b.id, 5.0);
        assert_eq!(rod.hit_test(&b, 5.0, &mut coll), -1.0);
    }
}
