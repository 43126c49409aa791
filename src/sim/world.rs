//! Simulation orchestrator
//!
//! Owns every ball, hit object and both spatial indices, and drives the
//! fixed-step loop: once per physics step the movers get their forces, then
//! the step is cut into sub-steps at each nearest impact. Per sub-step the
//! nearest collision of every ball is searched, everything moves up to it,
//! the colliding balls are resolved and resting contacts are applied.

use glam::{Quat, Vec2, Vec3};

use super::ball::{Ball, BallSpawn};
use super::context::{PhysicsContext, RandomSource, SeededRandom};
use super::event::{CollisionEvent, HitTarget, PhysicsEvent};
use super::hit::{HitObject, HitPlane, HitShape, LineSeg, TriggerShape, do_hit_test, polygon_contains};
use super::kdtree::KdTree;
use super::mover::Mover;
use super::quadtree::QuadTree;
use super::snapshot::{BallSnapshot, FrameSnapshot, MoverSnapshot};
use super::state::{BallId, BallIdAllocator, HitId, ItemId};
use crate::consts::*;
use crate::error::{PhysicsError, Result};
use crate::settings::{Material, PhysicsSettings};

/// Bookkeeping of one `physics_simulate_cycle` call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleStats {
    /// Sub-steps the cycle was cut into
    pub sub_steps: u32,
    /// Sum of all sub-step lengths
    pub consumed: f32,
    /// Zero-time hits overridden by the static-time floor
    pub forced: u32,
}

/// A running table
pub struct Simulation {
    settings: PhysicsSettings,
    ctx: PhysicsContext,
    objects: Vec<HitObject>,
    quadtree: QuadTree,
    kdtree: KdTree,
    playfield: HitObject,
    glass: HitObject,
    balls: Vec<Ball>,
    ball_ids: BallIdAllocator,
    /// Objects with a mover, in table order
    movers: Vec<HitId>,
    flippers: Vec<HitId>,
    contacts: Vec<CollisionEvent>,
    /// Start of the next physics step (µs)
    time_us: u64,
    step_count: u64,
}

impl Simulation {
    /// Simulation seeded from `settings.seed`
    pub fn new(settings: PhysicsSettings, objects: Vec<HitObject>) -> Result<Self> {
        let rng = Box::new(SeededRandom::new(settings.seed));
        Self::with_random(settings, objects, rng)
    }

    /// Simulation drawing its random choices from `rng`
    pub fn with_random(settings: PhysicsSettings, objects: Vec<HitObject>, rng: Box<dyn RandomSource>) -> Result<Self> {
        settings.validate()?;

        let playfield = HitObject::new(HitShape::Plane(HitPlane::new(Vec3::Z, settings.playfield_height)))
            .with_material(settings.playfield);
        let glass = HitObject::new(HitShape::Plane(HitPlane::new(Vec3::NEG_Z, -settings.glass_height)))
            .with_material(Material::new(settings.glass_elasticity, 0.0));

        let quadtree = QuadTree::build(
            objects
                .iter()
                .enumerate()
                .map(|(i, obj)| (HitId(i as u32), obj.common.bbox)),
        );

        let mut movers = Vec::new();
        let mut flippers = Vec::new();
        for (i, obj) in objects.iter().enumerate() {
            match obj.shape {
                HitShape::Flipper(_) => {
                    movers.push(HitId(i as u32));
                    flippers.push(HitId(i as u32));
                }
                HitShape::Gate(_) | HitShape::Spinner(_) => movers.push(HitId(i as u32)),
                _ => {}
            }
        }

        log::info!(
            "Simulation ready: {} hit objects ({} quadtree nodes), {} movers",
            objects.len(),
            quadtree.node_count(),
            movers.len()
        );

        Ok(Self {
            ctx: PhysicsContext::new(&settings, rng),
            settings,
            objects,
            quadtree,
            kdtree: KdTree::new(),
            playfield,
            glass,
            balls: Vec::new(),
            ball_ids: BallIdAllocator::default(),
            movers,
            flippers,
            contacts: Vec::new(),
            time_us: 0,
            step_count: 0,
        })
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    /// Simulated time in microseconds
    pub fn time_us(&self) -> u64 {
        self.time_us
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn ball(&self, id: BallId) -> Option<&Ball> {
        self.balls.iter().find(|b| b.id == id)
    }

    pub fn objects(&self) -> &[HitObject] {
        &self.objects
    }

    fn ball_index(&self, id: BallId) -> Option<usize> {
        self.balls.iter().position(|b| b.id == id)
    }

    /// Spawn description using the configured ball size
    pub fn default_spawn(&self, pos: Vec3) -> BallSpawn {
        BallSpawn::at(pos)
            .with_radius(self.settings.ball_radius)
            .with_mass(self.settings.ball_mass)
    }

    /// Add a ball to the table
    ///
    /// A ball starting inside a trigger is already counted as inside it; one
    /// starting in a kicker cup is caught without an event.
    pub fn create_ball(&mut self, spawn: BallSpawn) -> BallId {
        let id = self.ball_ids.next_id();
        let mut ball = Ball::new(id, &spawn);

        for i in 0..self.objects.len() {
            let Some(item) = self.objects[i].common.item else {
                continue;
            };
            if ball.in_volume(item) {
                continue;
            }
            let inside = match &self.objects[i].shape {
                HitShape::Trigger(t) => match t.shape {
                    TriggerShape::Circle(_) => t.contains(ball.pos),
                    TriggerShape::Segment(_) => polygon_contains(self.trigger_edges(item), ball.pos),
                },
                HitShape::Kicker(k) => k.contains(ball.pos),
                _ => false,
            };
            if !inside {
                continue;
            }
            match &mut self.objects[i].shape {
                HitShape::Kicker(k) => k.capture_new_ball(item, &mut ball),
                _ => ball.enter_volume(item),
            }
        }

        log::info!("Ball {:?} created at {}", id, ball.pos);
        self.balls.push(ball);
        id
    }

    /// Edges of a polygon trigger
    fn trigger_edges(&self, item: ItemId) -> impl Iterator<Item = &LineSeg> {
        self.objects.iter().filter_map(move |obj| match &obj.shape {
            HitShape::Trigger(t) if obj.common.item == Some(item) => match &t.shape {
                TriggerShape::Segment(seg) => Some(seg),
                TriggerShape::Circle(_) => None,
            },
            _ => None,
        })
    }

    /// Remove a ball from the table
    pub fn destroy_ball(&mut self, id: BallId) -> Result<()> {
        if !self.remove_ball(id) {
            return Err(PhysicsError::UnknownBall(id));
        }
        Ok(())
    }

    fn remove_ball(&mut self, id: BallId) -> bool {
        let Some(index) = self.ball_index(id) else {
            return false;
        };
        self.balls.remove(index);
        for obj in &mut self.objects {
            if let HitShape::Kicker(k) = &mut obj.shape {
                k.release(id);
            }
        }
        log::info!("Ball {:?} destroyed", id);
        true
    }

    /// Apply the removals collide handlers asked for
    ///
    /// Ball indices shift; the kd-tree is rebuilt before the next query.
    fn apply_destroy_requests(&mut self) {
        for id in self.ctx.take_destroy_requests() {
            self.remove_ball(id);
        }
    }

    /// Run `act` on every hit object of `item`
    ///
    /// `act` reports whether the object supports the action; `what` names
    /// it in the error when none of them does.
    fn actuate(&mut self, item: ItemId, what: &'static str, mut act: impl FnMut(&mut HitObject) -> bool) -> Result<()> {
        let mut known = false;
        let mut handled = false;
        for obj in self.objects.iter_mut().filter(|o| o.common.item == Some(item)) {
            known = true;
            handled |= act(obj);
        }
        match (known, handled) {
            (_, true) => Ok(()),
            (true, false) => Err(PhysicsError::Unsupported(item, what)),
            (false, false) => Err(PhysicsError::UnknownItem(item)),
        }
    }

    /// Press or release a flipper button
    pub fn set_flipper_solenoid(&mut self, item: ItemId, on: bool) -> Result<()> {
        self.actuate(item, "a solenoid", |obj| match &mut obj.shape {
            HitShape::Flipper(f) => {
                f.mover.set_solenoid(on);
                true
            }
            _ => false,
        })
    }

    /// Hold a gate open or let it close; a one-way gate's blocker follows
    pub fn set_gate_open(&mut self, item: ItemId, open: bool) -> Result<()> {
        self.actuate(item, "opening", |obj| match &mut obj.shape {
            HitShape::Gate(g) => {
                g.mover.set_open(open);
                true
            }
            HitShape::LineSeg(_) => {
                obj.common.enabled = !open;
                false
            }
            _ => false,
        })
    }

    /// Kick the ball held by a kicker
    ///
    /// Returns the released ball, or `None` when the cup was empty.
    pub fn kick(&mut self, item: ItemId, angle: f32, speed: f32, inclination: f32) -> Result<Option<BallId>> {
        let mut held = None;
        self.actuate(item, "kicking", |obj| match &obj.shape {
            HitShape::Kicker(k) => {
                held = held.or(k.captured);
                true
            }
            _ => false,
        })?;

        let Some(id) = held else {
            return Ok(None);
        };
        let Some(index) = self.ball_index(id) else {
            return Ok(None);
        };
        let ball = &mut self.balls[index];
        for obj in self.objects.iter_mut().filter(|o| o.common.item == Some(item)) {
            if let HitShape::Kicker(k) = &mut obj.shape {
                if k.captured == Some(id) {
                    k.kick(ball, angle, speed, inclination);
                }
            }
        }
        Ok(Some(id))
    }

    /// Shake the table: push every free ball along `dir`
    pub fn nudge(&mut self, dir: Vec2, strength: f32) {
        let impulse = (dir.normalize_or_zero() * strength).extend(0.0);
        for ball in self.balls.iter_mut().filter(|b| !b.frozen) {
            ball.vel += impulse;
            ball.calc_hit_bbox();
        }
        log::debug!("Nudge {} x {:.2}", dir, strength);
    }

    /// Take the events raised since the last call
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        self.ctx.drain_events()
    }

    /// Current state of all balls and movers
    pub fn snapshot(&self) -> FrameSnapshot {
        let balls = self
            .balls
            .iter()
            .map(|b| BallSnapshot {
                id: b.id,
                pos: b.pos,
                vel: b.vel,
                orientation: Quat::from_mat3(&b.orientation),
                radius: b.radius(),
                frozen: b.frozen,
            })
            .collect();

        let movers = self
            .movers
            .iter()
            .filter_map(|&id| {
                let obj = &self.objects[id.index()];
                let angle = match &obj.shape {
                    HitShape::Flipper(f) => f.mover.angle_cur,
                    HitShape::Gate(g) => g.mover.angle,
                    HitShape::Spinner(s) => s.mover.angle,
                    _ => return None,
                };
                Some(MoverSnapshot {
                    item: obj.common.item?,
                    kind: obj.kind(),
                    angle,
                })
            })
            .collect();

        FrameSnapshot {
            time_us: self.time_us,
            balls,
            movers,
        }
    }

    /// Run fixed physics steps until simulated time reaches `target_us`
    ///
    /// Returns the number of steps taken.
    pub fn update_physics(&mut self, target_us: u64) -> u32 {
        let step_us = self.settings.step_time_us;
        // forces and integration share one step length
        let dtime = self.ctx.step_factor;
        let anim_interval = u64::from(self.settings.animation_interval_steps.max(1));
        let anim_ms = (anim_interval * step_us) as f32 / 1000.0;

        let mut steps = 0;
        while self.time_us < target_us {
            self.ctx.time_msec = (self.time_us / 1000) as u32;

            // forces on integral step boundaries only
            for &id in &self.movers {
                if let Some(mover) = self.objects[id.index()].mover_mut() {
                    mover.update_velocities(&mut self.ctx);
                }
            }
            for ball in &mut self.balls {
                ball.update_velocities(&mut self.ctx);
            }

            self.physics_simulate_cycle(dtime);

            self.time_us += step_us;
            self.step_count += 1;
            steps += 1;

            if self.step_count % anim_interval == 0 {
                for obj in &mut self.objects {
                    obj.update_animation(anim_ms);
                }
            }
        }
        steps
    }

    /// Advance everything by `dtime` time units, resolving every impact
    pub fn physics_simulate_cycle(&mut self, dtime: f32) -> CycleStats {
        let mut stats = CycleStats::default();
        let mut remaining = dtime;
        let mut static_cnts = STATICCNTS;

        while remaining > 0.0 {
            stats.sub_steps += 1;
            assert!(
                stats.sub_steps <= MAX_CYCLE_ITERATIONS,
                "physics cycle did not converge: {} sub-steps, {} time left",
                stats.sub_steps,
                remaining
            );

            // collides of the last sub-step changed some swept bounds
            self.kdtree.rebuild(self.balls.iter().map(|b| b.bbox));

            let mut hittime = remaining;

            // a flipper reaching its stop ends the sub-step too
            for &id in &self.flippers {
                let fliphit = self.objects[id.index()].flipper_hit_time();
                if fliphit > 0.0 && fliphit <= hittime {
                    hittime = fliphit;
                }
            }

            self.contacts.clear();
            for i in 0..self.balls.len() {
                self.balls[i].coll.clear(hittime);
                if self.balls[i].frozen {
                    continue;
                }
                self.find_nearest_collision(i);

                let coll = &self.balls[i].coll;
                if coll.is_hit() && coll.time <= hittime {
                    hittime = coll.time;
                    if hittime < STATICTIME {
                        static_cnts -= 1;
                        if static_cnts < 0 {
                            // out of zero-time retries, force progress
                            static_cnts = 0;
                            hittime = STATICTIME.min(remaining);
                            stats.forced += 1;
                        }
                    }
                }
            }

            if hittime > STATICTIME {
                static_cnts = STATICCNTS;
            }

            for &id in &self.movers {
                if let Some(mover) = self.objects[id.index()].mover_mut() {
                    mover.update_displacements(hittime, &mut self.ctx);
                }
            }
            for ball in &mut self.balls {
                ball.update_displacements(hittime, &mut self.ctx);
            }

            self.resolve_collisions(hittime);
            self.apply_contacts(hittime);

            log::trace!(
                "sub-step {}: {:.5} of {:.5}, {} contacts",
                stats.sub_steps,
                hittime,
                remaining,
                self.contacts.len()
            );
            self.contacts.clear();

            remaining -= hittime;
            stats.consumed += hittime;
            self.ctx.swap_ball_collision_handling = !self.ctx.swap_ball_collision_handling;
        }
        stats
    }

    /// Nearest impact of ball `i` within its current budget
    fn find_nearest_collision(&mut self, i: usize) {
        let Self {
            ctx,
            objects,
            quadtree,
            kdtree,
            playfield,
            glass,
            balls,
            contacts,
            ..
        } = self;

        do_hit_test(&mut balls[i], HitTarget::Playfield, contacts, |b, dt, c| {
            playfield.hit_test(b, dt, c)
        });
        do_hit_test(&mut balls[i], HitTarget::Glass, contacts, |b, dt, c| glass.hit_test(b, dt, c));

        let bbox = balls[i].bbox;
        let test_static = |balls: &mut Vec<Ball>, contacts: &mut Vec<CollisionEvent>| {
            quadtree.query(&bbox, |hid| {
                let obj = &objects[hid.index()];
                do_hit_test(&mut balls[i], HitTarget::Object(hid), contacts, |b, dt, c| obj.hit_test(b, dt, c));
            });
        };
        let test_dynamic = |balls: &mut Vec<Ball>, contacts: &mut Vec<CollisionEvent>| {
            kdtree.query(&bbox, |j| {
                if j == i {
                    return;
                }
                let (ball, other) = pair_mut(balls, i, j);
                let other = &*other;
                do_hit_test(ball, HitTarget::Ball(other.id), contacts, |b, dt, c| other.hit_test_ball(b, dt, c));
            });
        };

        // neither index may always win ties
        if ctx.rng.coin_flip() {
            test_dynamic(balls, contacts);
            test_static(balls, contacts);
        } else {
            test_static(balls, contacts);
            test_dynamic(balls, contacts);
        }
    }

    /// Collide every ball whose impact falls within `hittime`
    fn resolve_collisions(&mut self, hittime: f32) {
        let order: Vec<BallId> = self.balls.iter().map(|b| b.id).collect();
        for id in order {
            // an earlier collide may have removed it
            let Some(i) = self.ball_index(id) else {
                continue;
            };
            let coll = self.balls[i].coll;
            let Some(target) = coll.target else {
                continue;
            };
            if coll.time > hittime {
                continue;
            }
            self.balls[i].coll.target = None;

            match target {
                HitTarget::Object(hid) => {
                    self.objects[hid.index()].collide(&coll, &mut self.balls[i], &mut self.ctx);
                }
                HitTarget::Playfield => self.playfield.collide(&coll, &mut self.balls[i], &mut self.ctx),
                HitTarget::Glass => self.glass.collide(&coll, &mut self.balls[i], &mut self.ctx),
                HitTarget::Ball(other) => {
                    if let Some(j) = self.ball_index(other) {
                        let (this, ball) = pair_mut(&mut self.balls, j, i);
                        this.collide_ball(ball, &coll, &mut self.ctx);
                        this.calc_hit_bbox();
                    }
                }
            }

            self.apply_destroy_requests();
            if let Some(i) = self.ball_index(id) {
                self.balls[i].calc_hit_bbox();
            }
        }
    }

    /// Apply resting contacts, in random order
    fn apply_contacts(&mut self, dtime: f32) {
        let forward = self.ctx.rng.coin_flip();
        let contacts = std::mem::take(&mut self.contacts);
        if forward {
            for c in &contacts {
                self.apply_contact(c, dtime);
            }
        } else {
            for c in contacts.iter().rev() {
                self.apply_contact(c, dtime);
            }
        }
        self.contacts = contacts;
    }

    fn apply_contact(&mut self, coll: &CollisionEvent, dtime: f32) {
        let Some(i) = self.ball_index(coll.ball) else {
            return;
        };
        let ball = &mut self.balls[i];
        match coll.target {
            Some(HitTarget::Object(hid)) => self.objects[hid.index()].contact(coll, ball, dtime, &mut self.ctx),
            Some(HitTarget::Playfield) => self.playfield.contact(coll, ball, dtime, &mut self.ctx),
            Some(HitTarget::Glass) => self.glass.contact(coll, ball, dtime, &mut self.ctx),
            Some(HitTarget::Ball(_)) | None => {}
        }
    }
}

/// Two distinct balls borrowed at once
fn pair_mut(balls: &mut [Ball], a: usize, b: usize) -> (&mut Ball, &mut Ball) {
    assert_ne!(a, b, "a ball cannot pair with itself");
    if a < b {
        let (lo, hi) = balls.split_at_mut(b);
        (&mut lo[a], &mut hi[0])
    } else {
        let (lo, hi) = balls.split_at_mut(a);
        (&mut hi[0], &mut lo[b])
    }
}
