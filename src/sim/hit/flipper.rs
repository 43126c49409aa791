use glam::{Vec2, Vec3};

use super::{HitCircle, HitCommon, TestMode};
use crate::consts::*;
use crate::math::{BBox, cross_z, xy};
use crate::sim::ball::{Ball, elasticity_with_falloff};
use crate::sim::context::PhysicsContext;
use crate::sim::event::{CollisionEvent, PhysicsEvent};
use crate::sim::mover::FlipperMover;

/// Flipper bat: two tapered faces between a base and an end circle
///
/// The faces and the end sweep with the bat, so their time of impact is
/// found by a root search over the bat angle along the sub-step.
#[derive(Debug, Clone)]
pub struct HitFlipper {
    pub mover: FlipperMover,
    pub zlow: f32,
    pub zhigh: f32,
    /// Simulated time of the last impact, for collide event rate limiting
    pub last_hit_time: Option<u32>,
}

/// Which flank of the bat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    /// Normal along +x with the bat at angle zero
    Right,
    Left,
}

impl HitFlipper {
    pub fn new(mover: FlipperMover, zlow: f32, zhigh: f32) -> Self {
        Self {
            mover,
            zlow,
            zhigh,
            last_hit_time: None,
        }
    }

    /// Bounds of the full sweep around the pivot
    pub fn calc_bbox(&self) -> BBox {
        let m = &self.mover;
        let reach = (m.length + m.end_radius).max(m.base_radius);
        BBox::new(
            m.center.x - reach,
            m.center.y - reach,
            m.center.x + reach,
            m.center.y + reach,
            self.zlow,
            self.zhigh,
        )
    }

    fn base_circle(&self) -> HitCircle {
        HitCircle::new(self.mover.center, self.mover.base_radius, self.zlow, self.zhigh)
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let mut best = -1.0;
        let mut candidates = [
            CollisionEvent::new(ball.id, dtime),
            CollisionEvent::new(ball.id, dtime),
            CollisionEvent::new(ball.id, dtime),
            CollisionEvent::new(ball.id, dtime),
        ];
        let times = [
            self.hit_test_face(ball, dtime, &mut candidates[0], Face::Right),
            self.hit_test_face(ball, dtime, &mut candidates[1], Face::Left),
            self.hit_test_end(ball, dtime, &mut candidates[2]),
            self.base_circle()
                .hit_test_basic_radius(ball, dtime, &mut candidates[3], TestMode::RIGID),
        ];

        for (t, candidate) in times.into_iter().zip(candidates) {
            if t >= 0.0 && (best < 0.0 || t < best) {
                best = t;
                *coll = candidate;
            }
        }
        best
    }

    /// Bat angle and effective angular speed `t` into the sub-step
    fn angle_at(&self, t: f32) -> (f32, f32) {
        let m = &self.mover;
        let angle = m.angle_cur + m.angle_speed * t;
        if angle >= m.angle_max {
            (m.angle_max, 0.0)
        } else if angle <= m.angle_min {
            (m.angle_min, 0.0)
        } else {
            (angle, m.angle_speed)
        }
    }

    /// Face normal and direction from base toward tip at `angle`
    fn face_frame(&self, face: Face, angle: f32) -> (Vec2, Vec2) {
        let n = self.mover.zero_ang_norm;
        let (normal, tangent) = match face {
            Face::Right => (n, Vec2::new(n.y, -n.x)),
            Face::Left => (Vec2::new(-n.x, n.y), Vec2::new(-n.y, -n.x)),
        };
        let rot = Vec2::from_angle(angle);
        (rot.rotate(normal), rot.rotate(tangent))
    }

    fn hit_test_face(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent, face: Face) -> f32 {
        let m = &self.mover;
        let r = ball.radius();
        let pos = xy(ball.pos) - m.center;
        let vel = xy(ball.vel);

        let distance_at = |t: f32| {
            let (angle, _) = self.angle_at(t);
            let (normal, _) = self.face_frame(face, angle);
            (pos + vel * t).dot(normal) - m.base_radius - r
        };
        let Some((t, bffnd)) = find_contact_time(dtime, r + m.end_radius, distance_at) else {
            return -1.0;
        };

        let (angle, speed) = self.angle_at(t);
        let (normal, tangent) = self.face_frame(face, angle);
        let ball_rel = pos + vel * t;

        // the face spans from the base tangent point to the end tangent point
        let face_len = m.length * m.zero_ang_norm.x;
        let bfftd = ball_rel.dot(tangent);
        if bfftd < -C_TOL_ENDPNTS || bfftd > face_len + C_TOL_ENDPNTS {
            return -1.0;
        }

        self.finish_hit(ball, t, normal, ball_rel, speed, bffnd, coll)
    }

    fn hit_test_end(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let m = &self.mover;
        let r = ball.radius();
        let pos = xy(ball.pos) - m.center;
        let vel = xy(ball.vel);
        let tip = Vec2::new(0.0, -m.length);

        let distance_at = |t: f32| {
            let (angle, _) = self.angle_at(t);
            let end = Vec2::from_angle(angle).rotate(tip);
            (pos + vel * t - end).length() - m.end_radius - r
        };
        let Some((t, bfend)) = find_contact_time(dtime, r + m.end_radius, distance_at) else {
            return -1.0;
        };

        let (angle, speed) = self.angle_at(t);
        let end = Vec2::from_angle(angle).rotate(tip);
        let ball_rel = pos + vel * t;
        let Some(normal) = (ball_rel - end).try_normalize() else {
            return -1.0;
        };

        self.finish_hit(ball, t, normal, ball_rel, speed, bfend, coll)
    }

    /// Shared height check and approach test of the moving parts
    #[allow(clippy::too_many_arguments)]
    fn finish_hit(
        &self,
        ball: &Ball,
        t: f32,
        normal: Vec2,
        ball_rel: Vec2,
        angle_speed: f32,
        distance: f32,
        coll: &mut CollisionEvent,
    ) -> f32 {
        let hitz = ball.pos.z + ball.vel.z * t;
        if hitz + ball.radius() * 1.5 < self.zlow || hitz + ball.radius() * 0.5 > self.zhigh {
            return -1.0;
        }

        // relative normal velocity against the bat point under the ball
        let surf = ball_rel - normal * ball.radius();
        let bat_vel = cross_z(angle_speed, Vec3::new(surf.x, surf.y, 0.0));
        let bnv = (xy(ball.vel) - xy(bat_vel)).dot(normal);

        let is_contact = bnv.abs() <= C_CONTACTVEL && distance <= PHYS_TOUCH;
        if !is_contact && bnv > C_LOWNORMVEL {
            return -1.0;
        }

        coll.normal = Vec3::new(normal.x, normal.y, 0.0);
        coll.distance = distance;
        coll.is_contact = is_contact;
        if is_contact {
            coll.org_normal_velocity = bnv;
        }
        t
    }

    /// Lever arms from the ball center and from the pivot to the impact point
    fn arms(&self, ball: &Ball, normal: Vec3) -> (Vec3, Vec3) {
        let r_ball = -ball.radius() * normal;
        let pivot = Vec3::new(self.mover.center.x, self.mover.center.y, ball.pos.z);
        (r_ball, ball.pos + r_ball - pivot)
    }

    pub fn collide(&mut self, common: &HitCommon, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let normal = coll.normal;
        let (r_b, r_f) = self.arms(ball, normal);

        let vrel = ball.surface_velocity(r_b) - self.mover.surface_velocity(r_f);
        let mut bnv = normal.dot(vrel);

        if bnv >= -C_LOWNORMVEL {
            if bnv > C_LOWNORMVEL {
                return;
            }
            if coll.distance < -C_EMBEDDED {
                bnv = -C_EMBEDSHOT;
            } else {
                return;
            }
        }

        let hdist = -C_DISP_GAIN * coll.distance;
        if hdist > 1.0e-4 {
            ball.pos += hdist.min(C_DISP_LIMIT) * normal;
        }

        let inertia = self.mover.inertia;
        let mut ang_resp = r_f.cross(normal);

        // a ball pushing the bat into its stop gets no energy out of it,
        // the bat only recoils a little
        let mut response_scaling = 1.0;
        if self.mover.is_in_contact && self.mover.contact_torque * -ang_resp.z >= 0.0 {
            ang_resp = Vec3::ZERO;
            response_scaling = 0.5;
        }

        let epsilon = elasticity_with_falloff(common.material.elasticity, common.material.elasticity_falloff, bnv);
        let mut impulse =
            -(1.0 + epsilon) * bnv / (ball.inv_mass() + normal.dot((ang_resp / inertia).cross(r_f)));
        let mut rot_i = r_f.cross(-(impulse * response_scaling) * normal);

        if self.mover.is_in_contact && rot_i.z * self.mover.contact_torque < 0.0 {
            // ticks the coil needs to cancel the push
            let recoil_time = -rot_i.z / self.mover.contact_torque;
            let bnv_after = bnv + impulse * ball.inv_mass();
            if recoil_time <= 0.5 || bnv_after > 0.0 {
                // treat the bat as static for this impact
                impulse = -(1.0 + epsilon) * bnv * ball.mass();
                rot_i = Vec3::ZERO;
            }
        }

        ball.vel += impulse * ball.inv_mass() * normal;
        self.mover.apply_impulse(rot_i);

        let tangent = vrel - vrel.dot(normal) * normal;
        let tangent_sp_sq = tangent.length_squared();
        if tangent_sp_sq > 1e-6 {
            let tangent = tangent / tangent_sp_sq.sqrt();
            let vt = vrel.dot(tangent);

            let cross = r_b.cross(tangent);
            let cross_f = r_f.cross(tangent);
            let kt = ball.inv_mass()
                + tangent.dot((cross / ball.inertia()).cross(r_b))
                + tangent.dot((cross_f / inertia).cross(r_f));

            let max_fric = common.material.friction * impulse;
            let jt = (-vt / kt).clamp(-max_fric.abs(), max_fric.abs());
            if jt.is_finite() {
                ball.apply_surface_impulse(jt * cross, jt * tangent);
                self.mover.apply_impulse(-jt * cross_f);
            }
        }

        let quiet = self
            .last_hit_time
            .is_some_and(|last| ctx.time_msec.wrapping_sub(last) <= FLIPPER_EVENT_INTERVAL_MS);
        if bnv < -COLLIDE_EVENT_SPEED && !quiet && common.fire_events {
            if let Some(item) = common.item {
                ctx.fire(PhysicsEvent::Collide {
                    item,
                    ball: ball.id,
                    speed: -bnv,
                });
            }
        }
        // keeps resetting until the bat has been idle long enough
        self.last_hit_time = Some(ctx.time_msec);
    }

    /// Hold a ball resting on the bat: normal force and friction over `dtime`
    pub fn contact(
        &mut self,
        common: &HitCommon,
        coll: &CollisionEvent,
        ball: &mut Ball,
        dtime: f32,
        ctx: &mut PhysicsContext,
    ) {
        let normal = coll.normal;
        let (r_b, r_f) = self.arms(ball, normal);
        let inertia = self.mover.inertia;

        let vrel = ball.surface_velocity(r_b) - self.mover.surface_velocity(r_f);
        let norm_vel = vrel.dot(normal);
        if norm_vel > C_CONTACTVEL {
            // an earlier collision already moved the ball off
            return;
        }

        let arel = ball.surface_acceleration(r_b, ctx.gravity) - self.mover.surface_acceleration(r_f);
        let normal_deriv = cross_z(self.mover.angle_speed, normal);
        let norm_acc = arel.dot(normal) + 2.0 * normal_deriv.dot(vrel);
        if norm_acc >= 0.0 {
            return;
        }

        // accelerations produced by a unit contact force along the normal
        let cross = r_f.cross(-normal);
        let a_bc = ball.inv_mass() * normal;
        let a_fc = cross_z(cross.z / inertia, r_f);
        let contact_force_acc = normal.dot(a_bc - a_fc);
        if contact_force_acc <= 0.0 {
            return;
        }

        let j = -norm_acc / contact_force_acc;
        ball.vel += (j * dtime * ball.inv_mass() - coll.org_normal_velocity) * normal;
        self.mover.apply_impulse(j * dtime * cross);

        let slip = vrel - norm_vel * normal;
        let max_fric = j * common.material.friction;
        let slip_speed = slip.length();

        let (slip_dir, numer) = if slip_speed < C_PRECISION {
            let slip_acc = arel - arel.dot(normal) * normal;
            let Some(dir) = slip_acc.try_normalize() else {
                return;
            };
            (dir, -dir.dot(arel))
        } else {
            let dir = slip / slip_speed;
            (dir, -dir.dot(vrel))
        };

        let cp = r_b.cross(slip_dir);
        let cross_f = r_f.cross(slip_dir);
        let denom = ball.inv_mass()
            + slip_dir.dot((cp / ball.inertia()).cross(r_b))
            + slip_dir.dot(cross_z(cross_f.z / inertia, r_f));
        let fric = (numer / denom).clamp(-max_fric, max_fric);

        if fric.is_finite() {
            ball.apply_surface_impulse((dtime * fric) * cp, (dtime * fric) * slip_dir);
            self.mover.apply_impulse(-(dtime * fric) * cross_f);
        }
    }
}

/// Modified regula falsi search for the first touch on [0, dtime]
///
/// `distance` gives the signed surface gap at a time. Returns the time and
/// the gap found there, time 0 when already touching, `None` when the gap
/// does not close within the budget or the ball is buried deeper than
/// `embed_limit`.
fn find_contact_time(dtime: f32, embed_limit: f32, mut distance: impl FnMut(f32) -> f32) -> Option<(f32, f32)> {
    let (mut t0, mut t1) = (0.0f32, 0.0f32);
    let (mut d0, mut d1) = (0.0f32, 0.0f32);
    let mut dp = 0.0f32;
    let mut t = 0.0f32;

    for k in 1..=C_INTERATIONS {
        let d = distance(t);
        if d.abs() <= C_PRECISION {
            return Some((t, d));
        }

        match k {
            1 => {
                if d < -embed_limit {
                    return None;
                }
                if d <= PHYS_TOUCH {
                    return Some((t, d));
                }
                // second pass looks at the end of the budget
                t0 = dtime;
                t1 = dtime;
                d0 = 0.0;
                d1 = d;
            }
            2 => {
                if dp * d > 0.0 {
                    return None;
                }
                t0 = 0.0;
                t1 = dtime;
                d0 = dp;
                d1 = d;
            }
            _ => {
                // Illinois: halve the stale end when the same side is kept twice
                if d * d0 <= 0.0 {
                    t1 = t;
                    d1 = d;
                    if dp * d > 0.0 {
                        d0 *= 0.5;
                    }
                } else {
                    t0 = t;
                    d0 = d;
                    if dp * d > 0.0 {
                        d1 *= 0.5;
                    }
                }
            }
        }

        t = t0 - d0 * (t1 - t0) / (d1 - d0);
        if !t.is_finite() || t < 0.0 || t > dtime {
            return None;
        }
        dp = d;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Material;
    use crate::sim::ball::BallSpawn;
    use crate::sim::context::test_context;
    use crate::sim::hit::{HitObject, HitShape};
    use crate::sim::mover::{FlipperConfig, Mover};
    use crate::sim::state::{BallId, ItemId};

    const ITEM: ItemId = ItemId(4);

    fn config() -> FlipperConfig {
        FlipperConfig {
            center: Vec2::ZERO,
            base_radius: 20.0,
            end_radius: 10.0,
            length: 100.0,
            start_angle: 0.0,
            end_angle: 60.0,
            ..Default::default()
        }
    }

    fn flipper() -> HitObject {
        let mover = FlipperMover::new(ITEM, &config());
        HitObject::new(HitShape::Flipper(HitFlipper::new(mover, 0.0, 50.0)))
            .with_item(ITEM)
            .with_material(Material::new(0.8, 0.0))
    }

    fn bat(obj: &mut HitObject) -> &mut HitFlipper {
        let HitShape::Flipper(f) = &mut obj.shape else {
            unreachable!()
        };
        f
    }

    fn ball(pos: Vec3, vel: Vec3) -> Ball {
        Ball::new(BallId(1), &BallSpawn::at(pos).with_velocity(vel))
    }

    /// Test, advance to the impact and collide
    fn strike(obj: &mut HitObject, b: &mut Ball, ctx: &mut PhysicsContext) -> CollisionEvent {
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = obj.hit_test(b, 10.0, &mut coll);
        assert!(t >= 0.0, "expected a hit");
        b.pos += b.vel * t;
        obj.collide(&coll, b, ctx);
        coll
    }

    #[test]
    fn test_face_hit_time() {
        let obj = flipper();
        let b = ball(Vec3::new(60.0, -50.0, 25.0), Vec3::new(-10.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = obj.hit_test(&b, 10.0, &mut coll);

        let fa = (10.0f32 / 100.0).asin();
        let n = Vec2::new(fa.cos(), -fa.sin());
        let gap = Vec2::new(60.0, -50.0).dot(n) - 45.0;
        let expected = gap / (10.0 * n.x);
        assert!((t - expected).abs() < 0.01, "t = {t}, expected {expected}");
        assert!((coll.normal - Vec3::new(n.x, n.y, 0.0)).length() < 1e-4);
        assert!(!coll.is_contact);
    }

    #[test]
    fn test_ball_past_tip_misses() {
        let obj = flipper();
        let b = ball(Vec3::new(60.0, -200.0, 25.0), Vec3::new(-10.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 10.0);
        assert_eq!(obj.hit_test(&b, 10.0, &mut coll), -1.0);
    }

    #[test]
    fn test_end_circle_hit() {
        let obj = flipper();
        // straight down onto the tip
        let b = ball(Vec3::new(0.0, -200.0, 25.0), Vec3::new(0.0, 10.0, 0.0));
        let mut coll = CollisionEvent::new(b.id, 10.0);
        let t = obj.hit_test(&b, 10.0, &mut coll);
        assert!((t - 6.5).abs() < 0.01, "t = {t}");
        assert!((coll.normal - Vec3::NEG_Y).length() < 1e-3);
    }

    #[test]
    fn test_swinging_bat_reaches_resting_ball() {
        let mut obj = flipper();
        bat(&mut obj).mover.angle_speed = 0.2;
        let b = ball(Vec3::new(50.0, -60.0, 25.0), Vec3::ZERO);
        let mut coll = CollisionEvent::new(b.id, 2.0);
        let t = obj.hit_test(&b, 2.0, &mut coll);
        assert!(t > 0.85 && t < 1.0, "t = {t}");
        assert!(coll.normal.x > 0.9);
    }

    #[test]
    fn test_resting_bat_reflects_fully() {
        let mut ctx = test_context();
        let mut obj = flipper();
        // settle against the start stop under the return spring
        bat(&mut obj).mover.update_velocities(&mut ctx);
        assert!(bat(&mut obj).mover.is_in_contact);

        let mut b = ball(Vec3::new(60.0, -50.0, 25.0), Vec3::new(-10.0, 0.0, 0.0));
        let coll = strike(&mut obj, &mut b, &mut ctx);
        let bnv_before = -10.0 * coll.normal.x;
        let bnv_after = b.vel.dot(coll.normal);
        assert!((bnv_after + 0.8 * bnv_before).abs() < 1e-3, "bnv after {bnv_after}");
    }

    #[test]
    fn test_free_bat_absorbs_part_of_impact() {
        let mut ctx = test_context();
        let mut obj = flipper();
        let mut b = ball(Vec3::new(60.0, -50.0, 25.0), Vec3::new(-10.0, 0.0, 0.0));
        let coll = strike(&mut obj, &mut b, &mut ctx);

        let bnv_after = b.vel.dot(coll.normal);
        let full = 0.8 * 10.0 * coll.normal.x;
        assert!(bnv_after > 0.0 && bnv_after < full - 0.1, "bnv after {bnv_after}");
        // pushed toward the start side
        assert!(bat(&mut obj).mover.angle_speed < 0.0);
    }

    #[test]
    fn test_collide_event_rate_limited() {
        let mut ctx = test_context();
        let mut obj = flipper();
        let shot = || ball(Vec3::new(60.0, -50.0, 25.0), Vec3::new(-10.0, 0.0, 0.0));
        let collides = |ctx: &mut PhysicsContext| {
            ctx.drain_events()
                .iter()
                .filter(|e| matches!(e, PhysicsEvent::Collide { item: ITEM, .. }))
                .count()
        };

        ctx.time_msec = 1000;
        strike(&mut obj, &mut shot(), &mut ctx);
        assert_eq!(collides(&mut ctx), 1);

        bat(&mut obj).mover.angle_speed = 0.0;
        ctx.time_msec = 1100;
        strike(&mut obj, &mut shot(), &mut ctx);
        assert_eq!(collides(&mut ctx), 0);

        bat(&mut obj).mover.angle_speed = 0.0;
        ctx.time_msec = 1400;
        strike(&mut obj, &mut shot(), &mut ctx);
        assert_eq!(collides(&mut ctx), 1);
    }

    #[test]
    fn test_contact_holds_ball_on_bat() {
        let mut ctx = test_context();
        let mut obj = flipper();
        bat(&mut obj).mover.update_velocities(&mut ctx);

        // ball lying against the right face, gravity pulling it into the bat
        let fa = (10.0f32 / 100.0).asin();
        let n2 = Vec2::new(fa.cos(), -fa.sin());
        let n = Vec3::new(n2.x, n2.y, 0.0);
        let p = Vec2::new(0.0, -50.0);
        let p = p + n2 * (45.0 - p.dot(n2));
        let mut b = ball(Vec3::new(p.x, p.y, 25.0), Vec3::ZERO);
        ctx.gravity = Vec3::new(-1.0, 0.0, 0.0);
        b.vel += PHYS_FACTOR * ctx.gravity;

        let mut coll = CollisionEvent::new(b.id, PHYS_FACTOR);
        coll.normal = n;
        coll.is_contact = true;
        coll.org_normal_velocity = b.vel.dot(n);
        obj.contact(&coll, &mut b, PHYS_FACTOR, &mut ctx);

        // the approach is cancelled
        assert!(b.vel.dot(n) > -1e-4, "still approaching: {}", b.vel.dot(n));
    }

    #[test]
    fn test_regula_falsi_linear_gap() {
        let (t, d) = find_contact_time(10.0, 35.0, |t| 20.0 - 4.0 * t).unwrap();
        assert!((t - 5.0).abs() < 1e-3);
        assert!(d.abs() <= C_PRECISION);
        assert!(find_contact_time(1.0, 35.0, |t| 20.0 - 4.0 * t).is_none());
        assert_eq!(find_contact_time(1.0, 35.0, |_| 0.02), Some((0.0, 0.02)));
        assert!(find_contact_time(1.0, 35.0, |_| -50.0).is_none());
    }

    #[test]
    fn test_bbox_covers_sweep() {
        let obj = flipper();
        assert!((obj.common.bbox.left + 110.0).abs() < 1e-4);
        assert!((obj.common.bbox.bottom - 110.0).abs() < 1e-4);
    }
}
