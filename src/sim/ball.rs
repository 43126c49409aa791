//! Ball rigid body
//!
//! A ball is the only fully dynamic body. Besides its own integration it
//! carries the two responses every shape reuses: the wall impulse with
//! restitution, friction and scatter, and the sustained contact response.
//! Ball-ball impacts are tested and resolved here as well.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use super::context::PhysicsContext;
use super::event::{CollisionEvent, PhysicsEvent};
use super::mover::Mover;
use super::state::{BallId, ItemId};
use crate::consts::*;
use crate::math::{BBox, orthonormalize, pick_root, skew_symmetric, solve_quadratic, valid_time};
use crate::settings::Material;

/// Where and how a new ball enters the table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BallSpawn {
    pub pos: Vec3,
    pub vel: Vec3,
    pub radius: f32,
    pub mass: f32,
}

impl BallSpawn {
    /// Standard ball at rest at `pos`
    pub fn at(pos: Vec3) -> Self {
        Self {
            pos,
            vel: Vec3::ZERO,
            radius: BALL_RADIUS,
            mass: BALL_MASS,
        }
    }

    pub fn with_velocity(mut self, vel: Vec3) -> Self {
        self.vel = vel;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }
}

/// A ball entity
#[derive(Debug, Clone)]
pub struct Ball {
    pub id: BallId,
    pub pos: Vec3,
    pub vel: Vec3,
    pub angular_momentum: Vec3,
    pub angular_velocity: Vec3,
    pub orientation: Mat3,
    /// Held in place (captured by a kicker); infinite mass for ball impacts
    pub frozen: bool,
    /// Items whose volume the ball is currently inside
    pub vol_objs: Vec<ItemId>,
    /// Swept bounds for the current step
    pub bbox: BBox,
    /// Nearest hard collision found in the current sub-step
    pub coll: CollisionEvent,
    /// Position at the last fired wall hit event
    pub last_event_pos: Vec3,
    radius: f32,
    mass: f32,
    inv_mass: f32,
    inertia: f32,
}

impl Ball {
    pub fn new(id: BallId, spawn: &BallSpawn) -> Self {
        assert!(spawn.radius > 0.0, "ball radius must be positive, got {}", spawn.radius);
        assert!(spawn.mass > 0.0, "ball mass must be positive, got {}", spawn.mass);

        let mut ball = Self {
            id,
            pos: spawn.pos,
            vel: spawn.vel,
            angular_momentum: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            orientation: Mat3::IDENTITY,
            frozen: false,
            vol_objs: Vec::new(),
            bbox: BBox::EMPTY,
            coll: CollisionEvent::new(id, 0.0),
            last_event_pos: Vec3::splat(-10000.0),
            radius: spawn.radius,
            mass: spawn.mass,
            inv_mass: 1.0 / spawn.mass,
            // solid sphere
            inertia: 0.4 * spawn.mass * spawn.radius * spawn.radius,
        };
        ball.calc_hit_bbox();
        ball
    }

    #[inline]
    pub fn radius(&self) -> f32 {
        self.radius
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    /// Recompute the swept bounds used by both spatial indices
    pub fn calc_hit_bbox(&mut self) {
        let extent = self.vel.length() + self.radius + PHYS_TOUCH;
        self.bbox = BBox::from_corners(self.pos - Vec3::splat(extent), self.pos + Vec3::splat(extent));
    }

    pub fn in_volume(&self, item: ItemId) -> bool {
        self.vol_objs.contains(&item)
    }

    pub(crate) fn enter_volume(&mut self, item: ItemId) {
        if !self.in_volume(item) {
            self.vol_objs.push(item);
        }
    }

    pub(crate) fn leave_volume(&mut self, item: ItemId) {
        self.vol_objs.retain(|&i| i != item);
    }

    /// Velocity of a point on the surface, relative to the center
    #[inline]
    pub fn surface_velocity(&self, surf_p: Vec3) -> Vec3 {
        self.vel + self.angular_velocity.cross(surf_p)
    }

    /// Acceleration of a point on the surface under gravity and spin
    #[inline]
    pub fn surface_acceleration(&self, surf_p: Vec3, gravity: Vec3) -> Vec3 {
        gravity + self.angular_velocity.cross(self.angular_velocity.cross(surf_p))
    }

    /// Apply a linear impulse and its angular counterpart together
    pub fn apply_surface_impulse(&mut self, rot_i: Vec3, impulse: Vec3) {
        self.vel += impulse * self.inv_mass;
        self.angular_momentum += rot_i;
        self.angular_velocity = self.angular_momentum / self.inertia;
    }

    /// True when a wall hit event may fire at the current position
    ///
    /// Repeated hits at nearly the same spot (a ball resting against a
    /// wall) are swallowed.
    pub(crate) fn take_hit_event_slot(&mut self) -> bool {
        let dist_sq = (self.last_event_pos - self.pos).length_squared();
        self.last_event_pos = self.pos;
        dist_sq > HIT_EVENT_MIN_DIST_SQ
    }

    /// Resolve an impact with a static wall
    ///
    /// `distance` is the surface distance reported by the hit test, negative
    /// when the ball is embedded.
    pub fn collide_3d_wall(
        &mut self,
        normal: Vec3,
        distance: f32,
        material: &Material,
        ctx: &mut PhysicsContext,
    ) {
        let mut dot = self.vel.dot(normal);

        if dot >= -C_LOWNORMVEL {
            if dot > C_LOWNORMVEL {
                return;
            }
            if distance < -C_EMBEDDED {
                dot = -C_EMBEDSHOT;
            } else {
                return;
            }
        }

        let hdist = -C_DISP_GAIN * distance;
        if hdist > 1.0e-4 {
            self.pos += hdist.min(C_DISP_LIMIT) * normal;
        }

        // impulse just sufficient to stop penetration, bounds friction
        let reaction_impulse = self.mass * dot.abs();

        let elasticity = elasticity_with_falloff(material.elasticity, material.elasticity_falloff, dot);
        let dot = dot * -(1.0 + elasticity);
        self.vel += dot * normal;

        let surf_p = -self.radius * normal;
        let surf_vel = self.surface_velocity(surf_p);
        let tangent = surf_vel - surf_vel.dot(normal) * normal;
        let tangent_sp_sq = tangent.length_squared();
        if tangent_sp_sq > 1e-6 {
            let tangent = tangent / tangent_sp_sq.sqrt();
            let vt = surf_vel.dot(tangent);

            let cross = surf_p.cross(tangent);
            let kt = self.inv_mass + tangent.dot((cross / self.inertia).cross(surf_p));

            // Coulomb friction cone
            let max_fric = material.friction * reaction_impulse;
            let jt = (-vt / kt).clamp(-max_fric, max_fric);
            if jt.is_finite() {
                self.apply_surface_impulse(jt * cross, jt * tangent);
            }
        }

        let mut scatter = material.scatter;
        if scatter < 0.0 {
            scatter = ctx.hard_scatter;
        }
        scatter *= ctx.scatter_weight;
        // no scatter at low velocity
        if dot > 1.0 && scatter > 1.0e-5 {
            let s = ctx.rng.next_signed();
            let angle = s * (1.0 - s * s) * 2.59808 * scatter;
            let (sin, cos) = angle.sin_cos();
            let (vx, vy) = (self.vel.x, self.vel.y);
            self.vel.x = vx * cos - vy * sin;
            self.vel.y = vy * cos + vx * sin;
        }
    }

    /// Sustained contact: cancel gravity along the normal and apply friction
    pub fn handle_static_contact(&mut self, coll: &CollisionEvent, friction: f32, dtime: f32, gravity: Vec3) {
        let norm_vel = self.vel.dot(coll.normal);

        // a collision earlier in the sub-step may have moved the ball away
        if norm_vel <= C_CONTACTVEL {
            let fe = self.mass * gravity.dot(coll.normal);
            let dp = -fe * dtime;
            if dp > 0.0 {
                self.apply_surface_impulse(Vec3::ZERO, dp * coll.normal);
            }
            self.apply_friction(coll.normal, dtime, friction, gravity);
        }
    }

    /// Friction for a ball pressed onto a surface over `dtime`
    pub fn apply_friction(&mut self, normal: Vec3, dtime: f32, friction: f32, gravity: Vec3) {
        let surf_p = -self.radius * normal;
        let surf_vel = self.surface_velocity(surf_p);
        let slip = surf_vel - surf_vel.dot(normal) * normal;

        let max_fric = friction * self.mass * -gravity.dot(normal);

        let slip_speed = slip.length();
        let (slip_dir, numer) = if slip_speed < C_PRECISION {
            // static friction
            let surf_acc = self.surface_acceleration(surf_p, gravity);
            let slip_acc = surf_acc - surf_acc.dot(normal) * normal;
            if slip_acc.length_squared() < 1e-6 {
                return;
            }
            let dir = slip_acc.normalize();
            (dir, -dir.dot(surf_acc))
        } else {
            let dir = slip / slip_speed;
            (dir, -dir.dot(surf_vel))
        };

        let cp = surf_p.cross(slip_dir);
        let denom = self.inv_mass + slip_dir.dot((cp / self.inertia).cross(surf_p));
        let fric = (numer / denom).clamp(-max_fric, max_fric);

        if fric.is_finite() {
            self.apply_surface_impulse((dtime * fric) * cp, (dtime * fric) * slip_dir);
        }
    }

    /// Time at which `ball` touches this ball, or -1
    ///
    /// On success the normal points from this ball toward `ball`.
    pub fn hit_test_ball(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let mut d = self.pos - ball.pos;
        let mut dv = self.vel - ball.vel;

        let mut bcddsq = d.length_squared();
        let mut bcdd = bcddsq.sqrt();

        if bcdd < 1.0e-8 {
            // centers coincide: pretend a unit vertical separation and a small
            // closing speed so the pair gets pushed apart
            d.z = -1.0;
            bcdd = 1.0;
            bcddsq = 1.0;
            dv.z = 0.1;
        }

        let b = dv.dot(d);
        let bnv = b / bcdd;
        if bnv > C_LOWNORMVEL {
            return -1.0;
        }

        let total_radius = self.radius + ball.radius;
        let bnd = bcdd - total_radius;

        let hittime = if bnd <= PHYS_TOUCH {
            if bnd < self.radius * -2.0 {
                return -1.0;
            }
            if bnv.abs() > C_CONTACTVEL || bnd <= -PHYS_TOUCH {
                0.0
            } else {
                // slow touch: do not compete with fast zero-time events
                bnd * (1.0 / (2.0 * PHYS_TOUCH)) + 0.5
            }
        } else {
            let a = dv.length_squared();
            if a < 1.0e-8 {
                return -1.0;
            }
            let Some((t1, t2)) = solve_quadratic(a, 2.0 * b, bcddsq - total_radius * total_radius) else {
                return -1.0;
            };
            pick_root(t1, t2)
        };

        if !valid_time(hittime, dtime) {
            return -1.0;
        }

        let separation = d + hittime * dv;
        coll.normal = (-separation).normalize_or(Vec3::Z);
        coll.distance = bnd;
        hittime
    }

    /// Resolve the impact of `ball` on this ball
    ///
    /// Both balls see the same impact, so only one side of the pair runs
    /// it: the ball id order decides, inverted every sub-step. A frozen
    /// obstacle never gets its own turn, so it always resolves here.
    pub fn collide_ball(&mut self, ball: &mut Ball, coll: &CollisionEvent, ctx: &mut PhysicsContext) {
        let skip = if ctx.swap_ball_collision_handling {
            ball.id >= self.id
        } else {
            ball.id <= self.id
        };
        if skip && !self.frozen {
            return;
        }

        let vrel = ball.vel - self.vel;
        let normal = coll.normal;
        let mut dot = vrel.dot(normal);

        if dot >= -C_LOWNORMVEL {
            if dot > C_LOWNORMVEL {
                return;
            }
            if coll.distance < -C_EMBEDDED {
                dot = -C_EMBEDSHOT;
            } else {
                return;
            }
        }

        let edist = -C_DISP_GAIN * coll.distance;
        if edist > 1.0e-4 {
            let mut edist = edist.min(C_DISP_LIMIT);
            if !self.frozen {
                edist *= 0.5;
                self.pos -= edist * normal;
            }
            ball.pos += edist * normal;
        }

        let my_inv_mass = if self.frozen { 0.0 } else { self.inv_mass };
        let impulse = -(1.0 + BALL_BALL_RESTITUTION) * dot / (my_inv_mass + ball.inv_mass);

        if !self.frozen {
            self.vel -= (impulse * my_inv_mass) * normal;
        }
        ball.vel += (impulse * ball.inv_mass) * normal;

        if dot < -COLLIDE_EVENT_SPEED {
            ctx.fire(PhysicsEvent::BallCollide {
                ball: ball.id,
                other: self.id,
                speed: -dot,
            });
        }
    }
}

impl Mover for Ball {
    fn update_velocities(&mut self, ctx: &mut PhysicsContext) {
        if self.frozen {
            self.vel = Vec3::ZERO;
        } else {
            self.vel += ctx.step_factor * ctx.gravity;
        }
        self.calc_hit_bbox();
    }

    fn update_displacements(&mut self, dtime: f32, _ctx: &mut PhysicsContext) {
        if !self.frozen {
            self.pos += self.vel * dtime;

            let spin = skew_symmetric(self.angular_velocity) * self.orientation;
            self.orientation = orthonormalize(self.orientation + spin * dtime);
            self.angular_velocity = self.angular_momentum / self.inertia;
        }
        self.calc_hit_bbox();
    }
}

/// Restitution reduced at high impact speed
#[inline]
pub fn elasticity_with_falloff(elasticity: f32, falloff: f32, vel: f32) -> f32 {
    if falloff > 0.0 {
        elasticity / (1.0 + falloff * vel.abs() * (1.0 / 18.53))
    } else {
        elasticity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::context::test_context;

    fn ball_at(id: u32, pos: Vec3, vel: Vec3) -> Ball {
        Ball::new(BallId(id), &BallSpawn::at(pos).with_velocity(vel))
    }

    #[test]
    fn test_elastic_wall_keeps_normal_speed() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::new(3.0, 0.0, -10.0));
        ball.collide_3d_wall(Vec3::Z, 0.0, &Material::new(1.0, 0.0), &mut ctx);
        assert!((ball.vel.z - 10.0).abs() < 1e-4);
        assert!((ball.vel.x - 3.0).abs() < 1e-4);
        assert_eq!(ball.angular_momentum, Vec3::ZERO);
    }

    #[test]
    fn test_restitution_quarter() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::new(0.0, 0.0, -8.0));
        ball.collide_3d_wall(Vec3::Z, 0.0, &Material::new(0.25, 0.0), &mut ctx);
        assert!((ball.vel.z - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_falloff_softens_hard_hits() {
        assert_eq!(elasticity_with_falloff(0.8, 0.0, 50.0), 0.8);
        let soft = elasticity_with_falloff(0.8, 0.5, 50.0);
        assert!(soft < 0.8 && soft > 0.0);
        assert!(elasticity_with_falloff(0.8, 0.5, 5.0) > soft);
    }

    #[test]
    fn test_receding_ball_is_untouched() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::new(0.0, 0.0, 4.0));
        ball.collide_3d_wall(Vec3::Z, 0.0, &Material::new(0.5, 0.5), &mut ctx);
        assert_eq!(ball.vel, Vec3::new(0.0, 0.0, 4.0));
    }

    #[test]
    fn test_embedded_ball_pushed_out() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(0.0, 0.0, 23.0), Vec3::ZERO);
        ball.collide_3d_wall(Vec3::Z, -2.0, &Material::new(0.0, 0.0), &mut ctx);
        assert!(ball.pos.z > 24.9);
        assert!(ball.vel.z > 0.0);
    }

    #[test]
    fn test_friction_spins_sliding_ball() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::new(10.0, 0.0, -5.0));
        let friction = 0.3;
        ball.collide_3d_wall(Vec3::Z, 0.0, &Material::new(0.0, friction), &mut ctx);
        // tangential speed reduced, but never by more than the friction cone allows
        assert!(ball.vel.x < 10.0);
        assert!(10.0 - ball.vel.x <= friction * 5.0 + 1e-4);
        assert!(ball.angular_velocity.length() > 0.0);
    }

    #[test]
    fn test_static_contact_cancels_gravity() {
        let ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::ZERO);
        ball.vel += PHYS_FACTOR * ctx.gravity;
        let vz_before = ball.vel.z;
        let mut coll = CollisionEvent::new(ball.id, PHYS_FACTOR);
        coll.normal = Vec3::Z;
        coll.is_contact = true;
        ball.vel.z = 0.0;
        ball.handle_static_contact(&coll, 0.0, PHYS_FACTOR, ctx.gravity);
        // one step of normal force exactly offsets one step of gravity
        assert!((ball.vel.z + vz_before).abs() < 1e-5);
    }

    #[test]
    fn test_head_on_pair_matches_impulse_exchange() {
        let mut ctx = test_context();
        let mut a = ball_at(2, Vec3::new(0.0, 0.0, 25.0), Vec3::new(5.0, 0.0, 0.0));
        let mut b = ball_at(1, Vec3::new(60.0, 0.0, 25.0), Vec3::new(-5.0, 0.0, 0.0));

        let mut coll = CollisionEvent::new(a.id, 2.0);
        let t = b.hit_test_ball(&a, 2.0, &mut coll);
        assert!((t - 1.0).abs() < 1e-4);
        assert!((coll.normal - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);

        a.pos += a.vel * t;
        b.pos += b.vel * t;
        ctx.swap_ball_collision_handling = false;
        b.collide_ball(&mut a, &coll, &mut ctx);

        // equal masses, restitution e: v' = mean -/+ e * (relative speed) / 2
        let e = BALL_BALL_RESTITUTION;
        let expected = e * 10.0 / 2.0;
        assert!((a.vel.x + expected).abs() < 1e-4);
        assert!((b.vel.x - expected).abs() < 1e-4);
        assert!(matches!(ctx.events()[0], PhysicsEvent::BallCollide { .. }));
    }

    #[test]
    fn test_pair_resolved_by_one_side_only() {
        let mut ctx = test_context();
        let mut a = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::new(5.0, 0.0, 0.0));
        let mut b = ball_at(2, Vec3::new(50.0, 0.0, 25.0), Vec3::new(-5.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(a.id, 1.0);
        coll.normal = Vec3::new(-1.0, 0.0, 0.0);

        // a has the lower id, so with the flag clear the b side must run it
        ctx.swap_ball_collision_handling = false;
        b.collide_ball(&mut a, &coll, &mut ctx);
        assert_eq!(a.vel.x, 5.0);

        ctx.swap_ball_collision_handling = true;
        b.collide_ball(&mut a, &coll, &mut ctx);
        assert!(a.vel.x < 0.0);
    }

    #[test]
    fn test_coincident_centers_do_not_mutate() {
        let a = ball_at(1, Vec3::new(10.0, 10.0, 25.0), Vec3::ZERO);
        let b = ball_at(2, Vec3::new(10.0, 10.0, 25.0), Vec3::ZERO);
        let mut coll = CollisionEvent::new(a.id, 1.0);
        let t = b.hit_test_ball(&a, 1.0, &mut coll);
        assert_eq!(t, 0.0);
        assert!((coll.normal - Vec3::Z).length() < 1e-5);
        assert_eq!(a.pos, b.pos);
        assert_eq!(a.vel, Vec3::ZERO);
        assert_eq!(b.vel, Vec3::ZERO);
    }

    #[test]
    fn test_separating_balls_never_hit() {
        let a = ball_at(1, Vec3::new(0.0, 0.0, 25.0), Vec3::new(-5.0, 0.0, 0.0));
        let b = ball_at(2, Vec3::new(60.0, 0.0, 25.0), Vec3::new(5.0, 0.0, 0.0));
        let mut coll = CollisionEvent::new(a.id, 10.0);
        assert_eq!(b.hit_test_ball(&a, 10.0, &mut coll), -1.0);
    }

    #[test]
    fn test_frozen_ball_stays_put() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::new(5.0, 5.0, 25.0), Vec3::new(1.0, 0.0, 0.0));
        ball.frozen = true;
        ball.update_velocities(&mut ctx);
        ball.update_displacements(PHYS_FACTOR, &mut ctx);
        assert_eq!(ball.pos, Vec3::new(5.0, 5.0, 25.0));
        assert_eq!(ball.vel, Vec3::ZERO);
    }

    #[test]
    fn test_displacement_and_spin_integration() {
        let mut ctx = test_context();
        let mut ball = ball_at(1, Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        ball.apply_surface_impulse(Vec3::new(0.0, 0.0, ball.inertia()), Vec3::ZERO);
        ball.update_displacements(0.5, &mut ctx);
        assert!((ball.pos.x - 1.0).abs() < 1e-6);
        assert!((ball.angular_velocity.z - 1.0).abs() < 1e-5);
        assert!((ball.orientation.determinant() - 1.0).abs() < 1e-4);
        assert!(ball.bbox.left < -ball.radius() && ball.bbox.right > 1.0 + ball.radius());
    }

    #[test]
    #[should_panic]
    fn test_zero_radius_is_rejected() {
        let _ = Ball::new(BallId(1), &BallSpawn::at(Vec3::ZERO).with_radius(0.0));
    }
}
