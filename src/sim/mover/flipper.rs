//! Flipper mover
//!
//! A flipper is a rotating bat driven by a solenoid torque. Pressing the
//! button ramps the torque up toward `strength`, releasing it lets a weaker
//! return spring pull the bat back. Near the end of the stroke the hold coil
//! takes over and the torque is damped. The stops are rigid: when the bat
//! reaches one it bounces back with a fraction of its momentum, and a
//! pressed solenoid then holds it there.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::Mover;
use crate::math::cross_z;
use crate::sim::context::PhysicsContext;
use crate::sim::event::PhysicsEvent;
use crate::sim::state::ItemId;
use crate::{deg_to_rad, rad_to_deg};

/// Fraction of angular momentum kept (reversed) when the bat hits a stop
const STOP_BOUNCE: f32 = -0.3;
/// Below this angular speed the bat is parked and stops are not processed
const MIN_STOP_SPEED: f32 = 0.0005;

/// Flipper geometry and coil tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlipperConfig {
    /// Pivot position
    pub center: Vec2,
    pub base_radius: f32,
    pub end_radius: f32,
    /// Pivot to tip center distance
    pub length: f32,
    /// Rest angle (degrees, 0 points toward -y, clockwise positive)
    pub start_angle: f32,
    /// Fully stroked angle (degrees)
    pub end_angle: f32,
    pub zlow: f32,
    pub zhigh: f32,
    pub mass: f32,
    /// Solenoid torque
    pub strength: f32,
    /// Return spring torque as a fraction of `strength`
    pub return_ratio: f32,
    /// Hold coil torque fraction at the end of the stroke
    pub torque_damping: f32,
    /// Angle before the end stop where the hold coil fades in (degrees)
    pub torque_damping_angle: f32,
    /// Ticks for the coil to reach full torque (0 = instant)
    pub ramp_up: f32,
    pub elasticity: f32,
    pub elasticity_falloff: f32,
    pub friction: f32,
    pub scatter: f32,
}

impl Default for FlipperConfig {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            base_radius: 21.5,
            end_radius: 13.0,
            length: 130.0,
            start_angle: 121.0,
            end_angle: 70.0,
            zlow: 0.0,
            zhigh: 50.0,
            mass: 1.0,
            strength: 2200.0,
            return_ratio: 0.058,
            torque_damping: 0.75,
            torque_damping_angle: 6.0,
            ramp_up: 3.0,
            elasticity: 0.8,
            elasticity_falloff: 0.43,
            friction: 0.6,
            scatter: 0.0,
        }
    }
}

/// Rotational state of one flipper
#[derive(Debug, Clone)]
pub struct FlipperMover {
    pub item: ItemId,
    pub center: Vec2,
    pub base_radius: f32,
    pub end_radius: f32,
    pub length: f32,

    pub angle_start: f32,
    pub angle_end: f32,
    pub angle_min: f32,
    pub angle_max: f32,

    pub angle_cur: f32,
    pub angle_speed: f32,
    pub angular_momentum: f32,
    pub angular_acceleration: f32,

    /// Face normal with the bat at angle zero (x sign flips for face 1)
    pub zero_ang_norm: Vec2,
    pub inertia: f32,

    pub cur_torque: f32,
    pub contact_torque: f32,
    /// Resting against a stop under coil or spring torque
    pub is_in_contact: bool,
    /// Button state
    pub solenoid: bool,

    strength: f32,
    return_ratio: f32,
    torque_damping: f32,
    torque_damping_angle: f32,
    ramp_up: f32,
    /// Pivot direction: true when the stroke increases the angle
    direction: bool,
    /// +1 arms the end of stroke event, -1 the beginning of stroke event
    enable_rotate_event: i8,
}

impl FlipperMover {
    pub fn new(item: ItemId, config: &FlipperConfig) -> Self {
        let angle_start = deg_to_rad(config.start_angle);
        let mut angle_end = deg_to_rad(config.end_angle);
        if angle_end == angle_start {
            // a zero stroke never reaches its stop
            angle_end += 0.0001;
        }

        // angle between face and center line
        let fa = ((config.base_radius - config.end_radius) / config.length).asin();
        let face_norm_offset = std::f32::consts::FRAC_PI_2 - fa;

        Self {
            item,
            center: config.center,
            base_radius: config.base_radius,
            end_radius: config.end_radius,
            length: config.length,
            angle_start,
            angle_end,
            angle_min: angle_start.min(angle_end),
            angle_max: angle_start.max(angle_end),
            angle_cur: angle_start,
            angle_speed: 0.0,
            angular_momentum: 0.0,
            angular_acceleration: 0.0,
            zero_ang_norm: Vec2::new(face_norm_offset.sin(), -face_norm_offset.cos()),
            inertia: (1.0 / 3.0) * config.mass * config.length * config.length,
            cur_torque: 0.0,
            contact_torque: 0.0,
            is_in_contact: false,
            solenoid: false,
            strength: config.strength,
            return_ratio: config.return_ratio,
            torque_damping: config.torque_damping,
            torque_damping_angle: deg_to_rad(config.torque_damping_angle),
            ramp_up: config.ramp_up,
            direction: angle_end >= angle_start,
            enable_rotate_event: 0,
        }
    }

    /// Press or release the button
    ///
    /// Arms the matching stroke event so it fires once when the stop is
    /// reached.
    pub fn set_solenoid(&mut self, on: bool) {
        self.enable_rotate_event = if on { 1 } else { -1 };
        self.solenoid = on;
    }

    /// Progress through the stroke, 0 at rest and 1 fully stroked
    pub fn stroke_ratio(&self) -> f32 {
        (self.angle_cur - self.angle_start) / (self.angle_end - self.angle_start)
    }

    /// Time until the bat reaches the stop it is moving toward, or -1
    pub fn get_hit_time(&self) -> f32 {
        if self.angle_speed == 0.0 {
            return -1.0;
        }

        let dist = if self.angle_speed > 0.0 {
            self.angle_max - self.angle_cur
        } else {
            self.angle_min - self.angle_cur
        };

        let hittime = dist / self.angle_speed;
        if !hittime.is_finite() || hittime < 0.0 {
            -1.0
        } else {
            hittime
        }
    }

    /// Velocity of a point given relative to the pivot
    #[inline]
    pub fn surface_velocity(&self, surf_p: Vec3) -> Vec3 {
        cross_z(self.angle_speed, surf_p)
    }

    /// Acceleration of a point given relative to the pivot
    pub fn surface_acceleration(&self, surf_p: Vec3) -> Vec3 {
        let tangential = cross_z(self.angular_acceleration, surf_p);
        let av2 = self.angle_speed * self.angle_speed;
        let centripetal = Vec3::new(-av2 * surf_p.x, -av2 * surf_p.y, 0.0);
        tangential + centripetal
    }

    /// Apply an angular impulse (only the z component turns the bat)
    pub fn apply_impulse(&mut self, rot_i: Vec3) {
        self.angular_momentum += rot_i.z;
        self.angle_speed = self.angular_momentum / self.inertia;
    }

    fn desired_torque(&self) -> f32 {
        let mut torque = self.strength;
        if !self.solenoid {
            torque *= -self.return_ratio;
        }

        // hold coil fades in near the end of the stroke
        let to_end = (self.angle_cur - self.angle_end).abs();
        if to_end < self.torque_damping_angle {
            let lerp = (to_end / self.torque_damping_angle).powi(4);
            torque *= lerp + self.torque_damping * (1.0 - lerp);
        }

        if self.direction { torque } else { -torque }
    }
}

impl Mover for FlipperMover {
    fn update_velocities(&mut self, ctx: &mut PhysicsContext) {
        let desired = self.desired_torque();

        let ramp_speed = if self.ramp_up <= 0.0 {
            1e6
        } else {
            (self.strength / self.ramp_up).min(1e6)
        };

        // coil hysteresis: move linearly toward the desired torque
        self.cur_torque = if desired >= self.cur_torque {
            (self.cur_torque + ramp_speed * ctx.step_factor).min(desired)
        } else {
            (self.cur_torque - ramp_speed * ctx.step_factor).max(desired)
        };

        let mut torque = self.cur_torque;
        self.is_in_contact = false;
        if self.angle_speed.abs() <= 1e-2 {
            let at_max = self.angle_cur >= self.angle_max - 1e-2 && torque > 0.0;
            let at_min = self.angle_cur <= self.angle_min + 1e-2 && torque < 0.0;
            if at_max || at_min {
                self.angle_cur = if at_max { self.angle_max } else { self.angle_min };
                self.is_in_contact = true;
                self.contact_torque = torque;
                self.angular_momentum = 0.0;
                torque = 0.0;
            }
        }

        self.angular_momentum += ctx.step_factor * torque;
        self.angle_speed = self.angular_momentum / self.inertia;
        self.angular_acceleration = torque / self.inertia;
    }

    fn update_displacements(&mut self, dtime: f32, ctx: &mut PhysicsContext) {
        self.angle_cur = (self.angle_cur + self.angle_speed * dtime).clamp(self.angle_min, self.angle_max);

        if self.angle_speed.abs() < MIN_STOP_SPEED {
            return;
        }

        let hit_stop = (self.angle_cur == self.angle_max && self.angle_speed > 0.0)
            || (self.angle_cur == self.angle_min && self.angle_speed < 0.0);
        if !hit_stop {
            return;
        }

        let speed = rad_to_deg(self.angle_speed).abs();
        self.angular_momentum *= STOP_BOUNCE;
        self.angle_speed = self.angular_momentum / self.inertia;

        let item = self.item;
        match self.enable_rotate_event {
            1 => ctx.fire(PhysicsEvent::EndOfStroke { item, speed }),
            -1 => ctx.fire(PhysicsEvent::BeginningOfStroke { item, speed }),
            _ => {}
        }
        if self.enable_rotate_event != 0 {
            log::trace!("flipper {:?} reached stop at {:.1} deg/tick", item, speed);
        }
        self.enable_rotate_event = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::PHYS_FACTOR;
    use crate::sim::context::test_context;

    fn up_flipper() -> FlipperMover {
        let config = FlipperConfig {
            start_angle: 0.0,
            end_angle: 60.0,
            ..Default::default()
        };
        FlipperMover::new(ItemId(7), &config)
    }

    fn step(mover: &mut FlipperMover, ctx: &mut PhysicsContext) {
        mover.update_velocities(ctx);
        mover.update_displacements(PHYS_FACTOR, ctx);
    }

    #[test]
    fn test_geometry_from_config() {
        let m = up_flipper();
        assert_eq!(m.angle_min, 0.0);
        assert!((m.angle_max - deg_to_rad(60.0)).abs() < 1e-6);
        assert!((m.inertia - 130.0 * 130.0 / 3.0).abs() < 1e-2);
        // face normal tilts toward the tip because the bat tapers
        assert!(m.zero_ang_norm.x > 0.0 && m.zero_ang_norm.y < 0.0);
        assert!((m.zero_ang_norm.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_equal_angles_still_move() {
        let config = FlipperConfig {
            start_angle: 30.0,
            end_angle: 30.0,
            ..Default::default()
        };
        let m = FlipperMover::new(ItemId(1), &config);
        assert!(m.angle_max > m.angle_min);
    }

    #[test]
    fn test_stroke_reaches_end_once() {
        let mut ctx = test_context();
        let mut m = up_flipper();
        m.set_solenoid(true);

        let mut last = m.angle_cur;
        let mut reached = false;
        for _ in 0..300 {
            step(&mut m, &mut ctx);
            assert!(m.angle_cur <= m.angle_max);
            if !reached {
                assert!(m.angle_cur >= last, "rising stroke went backward");
                reached = m.angle_cur == m.angle_max;
            }
            last = m.angle_cur;
        }

        assert!(reached);
        assert!((m.angle_cur - m.angle_max).abs() < 1e-4);
        let eos = ctx
            .events()
            .iter()
            .filter(|e| matches!(e, PhysicsEvent::EndOfStroke { item: ItemId(7), .. }))
            .count();
        assert_eq!(eos, 1);
        assert!(m.is_in_contact);
    }

    #[test]
    fn test_release_returns_to_start() {
        let mut ctx = test_context();
        let mut m = up_flipper();
        m.set_solenoid(true);
        for _ in 0..300 {
            step(&mut m, &mut ctx);
        }
        ctx.drain_events();

        m.set_solenoid(false);
        for _ in 0..3000 {
            step(&mut m, &mut ctx);
        }
        assert!((m.angle_cur - m.angle_min).abs() < 1e-4);
        assert!(
            ctx.events()
                .iter()
                .any(|e| matches!(e, PhysicsEvent::BeginningOfStroke { .. }))
        );
        assert!(
            !ctx.events()
                .iter()
                .any(|e| matches!(e, PhysicsEvent::EndOfStroke { .. }))
        );
    }

    #[test]
    fn test_reversed_stroke_direction() {
        let mut ctx = test_context();
        let config = FlipperConfig {
            start_angle: 121.0,
            end_angle: 70.0,
            ..Default::default()
        };
        let mut m = FlipperMover::new(ItemId(2), &config);
        m.set_solenoid(true);
        for _ in 0..300 {
            step(&mut m, &mut ctx);
        }
        assert!((m.angle_cur - deg_to_rad(70.0)).abs() < 1e-4);
        assert!(matches!(ctx.events()[0], PhysicsEvent::EndOfStroke { .. }));
    }

    #[test]
    fn test_hit_time_to_stop() {
        let mut m = up_flipper();
        assert_eq!(m.get_hit_time(), -1.0);
        m.angle_speed = 0.1;
        let expected = deg_to_rad(60.0) / 0.1;
        assert!((m.get_hit_time() - expected).abs() < 1e-4);
        m.angle_speed = -0.1;
        assert_eq!(m.get_hit_time(), 0.0);
    }

    #[test]
    fn test_impulse_changes_speed() {
        let mut m = up_flipper();
        m.apply_impulse(Vec3::new(5.0, 5.0, m.inertia));
        assert!((m.angle_speed - 1.0).abs() < 1e-5);
        let v = m.surface_velocity(Vec3::new(0.0, -100.0, 0.0));
        assert!((v - Vec3::new(100.0, 0.0, 0.0)).length() < 1e-3);
    }
}
