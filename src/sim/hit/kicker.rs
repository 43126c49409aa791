use std::f32::consts::TAU;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::{HitCircle, HitCommon, TestMode};
use crate::consts::*;
use crate::deg_to_rad;
use crate::math::xy;
use crate::sim::ball::Ball;
use crate::sim::context::PhysicsContext;
use crate::sim::event::{CollisionEvent, PhysicsEvent};
use crate::sim::state::{BallId, ItemId};

/// Points sampled around the cup rim
const RIM_SEGMENTS: usize = 16;
/// Upward tilt of the rim normals
const RIM_TILT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KickerConfig {
    pub center: Vec2,
    /// Cup radius
    pub radius: f32,
    /// Surface the kicker sits on
    pub zlow: f32,
    /// Height of the sensing volume
    pub hit_height: f32,
    /// Fraction of the rim height a ball must sink below to be grabbed
    pub hit_accuracy: f32,
    /// Grab every ball that reaches the inner circle, ignoring height
    pub legacy_mode: bool,
    /// Swallow captured balls instead of holding them
    pub drain: bool,
}

impl Default for KickerConfig {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            radius: 25.0,
            zlow: 0.0,
            hit_height: 40.0,
            hit_accuracy: 0.7,
            legacy_mode: true,
            drain: false,
        }
    }
}

/// Kicker hole: catches balls and kicks them back out on request
///
/// Balls arriving above the grab height (non-legacy only) bounce off the
/// cup rim instead, using the normal of the nearest rim point.
#[derive(Debug, Clone)]
pub struct HitKicker {
    pub circle: HitCircle,
    pub legacy_mode: bool,
    pub drain: bool,
    /// Ball held in the cup
    pub captured: Option<BallId>,
    /// Rim points and their outward normals
    mesh: Vec<(Vec3, Vec3)>,
    hit_accuracy: f32,
    /// Balls inside the volume after a rim bounce, never grabbed
    deflected: Vec<BallId>,
}

impl HitKicker {
    pub fn new(config: &KickerConfig) -> Self {
        let radius = if config.legacy_mode {
            config.radius * 0.6
        } else {
            config.radius
        };

        let mesh = (0..RIM_SEGMENTS)
            .map(|i| {
                let a = TAU * i as f32 / RIM_SEGMENTS as f32;
                let dir = Vec2::from_angle(a);
                let point = Vec3::new(
                    config.center.x + dir.x * config.radius,
                    config.center.y + dir.y * config.radius,
                    config.zlow,
                );
                let normal = Vec3::new(dir.x, dir.y, RIM_TILT).normalize();
                (point, normal)
            })
            .collect();

        Self {
            circle: HitCircle::new(config.center, radius, config.zlow, config.zlow + config.hit_height),
            legacy_mode: config.legacy_mode,
            drain: config.drain,
            captured: None,
            mesh,
            hit_accuracy: config.hit_accuracy,
            deflected: Vec::new(),
        }
    }

    pub fn hit_test(&self, item: ItemId, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        self.circle.hit_test_basic_radius(ball, dtime, coll, TestMode::volume(item))
    }

    /// True when a ball center at `pos` is inside the sensing volume
    pub fn contains(&self, pos: Vec3) -> bool {
        (xy(pos) - self.circle.center).length() < self.circle.radius
            && pos.z >= self.circle.zlow
            && pos.z <= self.circle.zhigh
    }

    pub fn collide(&mut self, common: &HitCommon, coll: &CollisionEvent, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let Some(item) = common.item else {
            return;
        };

        let inside = ball.in_volume(item);
        if coll.hit_flag != inside {
            return;
        }

        if self.legacy_mode {
            ball.pos += STATICTIME * ball.vel;
        }

        if inside {
            ball.leave_volume(item);
            if let Some(i) = self.deflected.iter().position(|&id| id == ball.id) {
                self.deflected.swap_remove(i);
            } else if common.fire_events {
                ctx.fire(PhysicsEvent::Unhit { item, ball: ball.id });
            }
            return;
        }

        if self.captured.is_some() {
            // the cup is taken, the ball rolls over it
            ball.enter_volume(item);
            self.deflected.push(ball.id);
            return;
        }

        let grab_height = (self.circle.zlow + ball.radius()) * self.hit_accuracy;
        if !self.legacy_mode && ball.pos.z >= grab_height {
            self.bounce_off_rim(common, ball, ctx);
            ball.enter_volume(item);
            self.deflected.push(ball.id);
            return;
        }

        ball.enter_volume(item);
        if common.fire_events {
            ctx.fire(PhysicsEvent::Hit { item, ball: ball.id });
        }

        if self.drain {
            log::debug!("kicker {:?} drained ball {:?}", item, ball.id);
            ctx.fire(PhysicsEvent::BallDrained { item, ball: ball.id });
            ctx.request_destroy(ball.id);
        } else {
            log::debug!("kicker {:?} captured ball {:?}", item, ball.id);
            self.hold(ball);
        }
    }

    fn bounce_off_rim(&self, common: &HitCommon, ball: &mut Ball, ctx: &mut PhysicsContext) {
        let nearest = self.mesh.iter().min_by(|a, b| {
            let da = (ball.pos - a.0).length_squared();
            let db = (ball.pos - b.0).length_squared();
            da.total_cmp(&db)
        });
        if let Some(&(point, normal)) = nearest {
            let distance = (ball.pos - point).dot(normal) - ball.radius();
            ball.collide_3d_wall(normal, distance.min(0.0), &common.material, ctx);
        }
    }

    fn hold(&mut self, ball: &mut Ball) {
        ball.frozen = true;
        ball.vel = Vec3::ZERO;
        ball.angular_momentum = Vec3::ZERO;
        ball.angular_velocity = Vec3::ZERO;
        ball.pos.x = self.circle.center.x;
        ball.pos.y = self.circle.center.y;
        self.captured = Some(ball.id);
    }

    /// Take a freshly created ball that starts in the cup, without events
    pub fn capture_new_ball(&mut self, item: ItemId, ball: &mut Ball) {
        ball.enter_volume(item);
        if self.captured.is_none() {
            self.hold(ball);
        } else {
            self.deflected.push(ball.id);
        }
    }

    /// Release the held ball
    ///
    /// `angle` is the yaw in degrees (0 kicks toward -y, clockwise
    /// positive), `inclination` the elevation in degrees.
    pub fn kick(&mut self, ball: &mut Ball, angle: f32, speed: f32, inclination: f32) {
        let yaw = deg_to_rad(angle);
        let pitch = deg_to_rad(inclination);

        let speed_z = pitch.sin() * speed;
        let speed_xy = if speed_z > 0.0 { speed * pitch.cos() } else { speed };

        ball.frozen = false;
        ball.angular_momentum = Vec3::ZERO;
        ball.angular_velocity = Vec3::ZERO;
        ball.vel = Vec3::new(yaw.sin() * speed_xy, -yaw.cos() * speed_xy, speed_z);
        ball.calc_hit_bbox();
        self.captured = None;
        log::debug!("kicked ball {:?} at {:.1} deg, speed {:.2}", ball.id, angle, speed);
    }

    /// Forget a ball that left the simulation
    pub fn release(&mut self, ball: BallId) {
        if self.captured == Some(ball) {
            self.captured = None;
        }
        self.deflected.retain(|&id| id != ball);
    }
}
