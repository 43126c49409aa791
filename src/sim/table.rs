//! Table building
//!
//! Turns item descriptions (walls, posts, bumpers, flippers, ...) into the
//! hit objects the simulation runs on. Every builder call allocates a fresh
//! [`ItemId`] and returns it so game logic can address the item later.

use glam::{Vec2, Vec3};

use super::hit::{
    Hit3DPoly, HitBumper, HitCircle, HitFlipper, HitGate, HitKicker, HitLine3D, HitLineZ, HitObject, HitPoint,
    HitShape, HitSpinner, HitTriangle, HitTrigger, KickerConfig, LineSeg,
};
use super::mover::{FlipperConfig, FlipperMover, GateConfig, SpinnerConfig};
use super::state::ItemId;
use crate::error::{PhysicsError, Result};
use crate::settings::Material;

/// Collects hit objects for a table
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    objects: Vec<HitObject>,
    next_item: u32,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_item(&mut self) -> ItemId {
        let id = ItemId(self.next_item);
        self.next_item += 1;
        id
    }

    fn push(&mut self, obj: HitObject) {
        self.objects.push(obj);
    }

    /// Number of hit objects so far
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Add a prebuilt hit object under a new item
    pub fn add_object(&mut self, obj: HitObject) -> ItemId {
        let item = self.alloc_item();
        self.push(obj.with_item(item));
        item
    }

    /// Open wall along a polyline
    ///
    /// The ball side is to the right of the direction of travel (x right,
    /// y down). Every vertex gets a vertical edge so corners stay round.
    pub fn add_wall(&mut self, points: &[Vec2], height: f32, material: Material) -> Result<ItemId> {
        if points.len() < 2 {
            return Err(PhysicsError::InvalidShape(format!(
                "wall needs at least 2 points, got {}",
                points.len()
            )));
        }
        let item = self.alloc_item();
        for pair in points.windows(2) {
            let seg = LineSeg::new(pair[0], pair[1], 0.0, height)?;
            self.push(HitObject::new(HitShape::LineSeg(seg)).with_item(item).with_material(material));
        }
        for &p in points {
            self.push(
                HitObject::new(HitShape::LineZ(HitLineZ::new(p, 0.0, height)))
                    .with_item(item)
                    .with_material(material),
            );
        }
        Ok(item)
    }

    /// Closed solid obstacle, balls bounce off its outside
    pub fn add_block(&mut self, points: &[Vec2], height: f32, material: Material) -> Result<ItemId> {
        let ring = outward_ring(points)?;
        self.add_wall(&ring, height, material)
    }

    /// Round post
    pub fn add_post(&mut self, center: Vec2, radius: f32, height: f32, material: Material) -> ItemId {
        let item = self.alloc_item();
        self.push(
            HitObject::new(HitShape::Circle(HitCircle::new(center, radius, 0.0, height)))
                .with_item(item)
                .with_material(material),
        );
        item
    }

    pub fn add_bumper(&mut self, center: Vec2, radius: f32, height: f32, force: f32, threshold: f32) -> ItemId {
        let item = self.alloc_item();
        let circle = HitCircle::new(center, radius, 0.0, height);
        self.push(
            HitObject::new(HitShape::Bumper(HitBumper::new(circle, force)))
                .with_item(item)
                .with_material(Material::new(0.7, 0.0))
                .with_threshold(threshold),
        );
        item
    }

    /// Round rollover or button sensor
    pub fn add_trigger_circle(&mut self, center: Vec2, radius: f32, height: f32) -> ItemId {
        let item = self.alloc_item();
        self.push(HitObject::new(HitShape::Trigger(HitTrigger::circle(center, radius, 0.0, height))).with_item(item));
        item
    }

    /// Polygon sensor, one edge object per side sharing the item
    pub fn add_trigger_polygon(&mut self, points: &[Vec2], height: f32) -> Result<ItemId> {
        let ring = outward_ring(points)?;
        let item = self.alloc_item();
        for pair in ring.windows(2) {
            let seg = LineSeg::new(pair[0], pair[1], 0.0, height)?;
            self.push(HitObject::new(HitShape::Trigger(HitTrigger::segment(seg))).with_item(item));
        }
        Ok(item)
    }

    pub fn add_kicker(&mut self, config: &KickerConfig) -> ItemId {
        let item = self.alloc_item();
        self.push(HitObject::new(HitShape::Kicker(HitKicker::new(config))).with_item(item));
        item
    }

    pub fn add_flipper(&mut self, config: &FlipperConfig) -> ItemId {
        let item = self.alloc_item();
        let mover = FlipperMover::new(item, config);
        let material = Material::new(config.elasticity, config.friction)
            .with_falloff(config.elasticity_falloff)
            .with_scatter(config.scatter);
        self.push(
            HitObject::new(HitShape::Flipper(HitFlipper::new(mover, config.zlow, config.zhigh)))
                .with_item(item)
                .with_material(material),
        );
        item
    }

    /// Gate; a one-way gate also gets a solid wall facing its back side
    pub fn add_gate(&mut self, config: &GateConfig) -> Result<ItemId> {
        let item = self.alloc_item();
        let gate = HitGate::new(item, config)?;
        let material = Material::new(config.elasticity, config.friction);
        if !config.two_way {
            let blocker = gate.back.clone();
            self.push(HitObject::new(HitShape::LineSeg(blocker)).with_item(item).with_material(material).with_events(false));
        }
        self.push(HitObject::new(HitShape::Gate(gate)).with_item(item).with_material(material));
        Ok(item)
    }

    pub fn add_spinner(&mut self, config: &SpinnerConfig) -> Result<ItemId> {
        let item = self.alloc_item();
        let spinner = HitSpinner::new(item, config)?;
        self.push(HitObject::new(HitShape::Spinner(spinner)).with_item(item));
        Ok(item)
    }

    /// Planar polygon such as a ramp floor; the ball side follows the
    /// right-hand rule over the vertex order
    pub fn add_polygon(&mut self, vertices: Vec<Vec3>, material: Material) -> Result<ItemId> {
        let poly = Hit3DPoly::new(vertices)?;
        Ok(self.add_object(HitObject::new(HitShape::Poly(poly)).with_material(material)))
    }

    pub fn add_triangle(&mut self, vertices: [Vec3; 3], material: Material) -> Result<ItemId> {
        let tri = HitTriangle::new(vertices)?;
        Ok(self.add_object(HitObject::new(HitShape::Triangle(tri)).with_material(material)))
    }

    /// Free 3D edge, e.g. the lip of a ramp
    pub fn add_edge(&mut self, v1: Vec3, v2: Vec3, material: Material) -> ItemId {
        self.add_object(HitObject::new(HitShape::Line3D(HitLine3D::new(v1, v2))).with_material(material))
    }

    /// Single corner point
    pub fn add_point(&mut self, p: Vec3, material: Material) -> ItemId {
        self.add_object(HitObject::new(HitShape::Point(HitPoint::new(p))).with_material(material))
    }

    pub fn build(self) -> Vec<HitObject> {
        log::info!("Table built: {} items, {} hit objects", self.next_item, self.objects.len());
        self.objects
    }
}

/// Close a polygon and order it so every edge normal points outward
fn outward_ring(points: &[Vec2]) -> Result<Vec<Vec2>> {
    if points.len() < 3 {
        return Err(PhysicsError::InvalidShape(format!(
            "polygon needs at least 3 points, got {}",
            points.len()
        )));
    }
    let mut ring = points.to_vec();
    if signed_area(&ring) > 0.0 {
        ring.reverse();
    }
    ring.push(ring[0]);
    Ok(ring)
}

/// Twice the shoelace area; positive when the normals of the
/// unmodified ring would point inward
fn signed_area(points: &[Vec2]) -> f32 {
    points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum()
}

/// Items of the built-in demo table that game logic drives
#[derive(Debug, Clone)]
pub struct DemoTable {
    pub objects: Vec<HitObject>,
    pub left_flipper: ItemId,
    pub right_flipper: ItemId,
    pub kicker: ItemId,
    pub drain: ItemId,
    pub gate: ItemId,
    pub spinner: ItemId,
    pub rollover: ItemId,
    /// Where new balls enter
    pub launch: Vec3,
}

/// Small 1000 x 2000 table with one of each interactive item
pub fn demo_table() -> Result<DemoTable> {
    let mut table = TableBuilder::new();
    let wall = Material::new(0.3, 0.3);

    // outline with a funnel into the drain
    table.add_wall(
        &[
            Vec2::new(470.0, 2000.0),
            Vec2::new(0.0, 1800.0),
            Vec2::new(0.0, 0.0),
            Vec2::new(1000.0, 0.0),
            Vec2::new(1000.0, 1800.0),
            Vec2::new(530.0, 2000.0),
        ],
        60.0,
        wall,
    )?;
    // inlane guides ending at the flipper pivots
    table.add_wall(&[Vec2::new(280.0, 1680.0), Vec2::new(0.0, 1540.0)], 60.0, wall)?;
    table.add_wall(&[Vec2::new(1000.0, 1540.0), Vec2::new(720.0, 1680.0)], 60.0, wall)?;

    table.add_block(
        &[Vec2::new(150.0, 1300.0), Vec2::new(150.0, 1450.0), Vec2::new(230.0, 1500.0)],
        50.0,
        Material::new(0.8, 0.2),
    )?;
    table.add_post(Vec2::new(700.0, 1000.0), 12.0, 50.0, Material::new(0.9, 0.2));
    table.add_bumper(Vec2::new(500.0, 600.0), 45.0, 50.0, 12.0, 1.0);

    let left_flipper = table.add_flipper(&FlipperConfig {
        center: Vec2::new(300.0, 1700.0),
        ..Default::default()
    });
    let right_flipper = table.add_flipper(&FlipperConfig {
        center: Vec2::new(700.0, 1700.0),
        start_angle: -121.0,
        end_angle: -70.0,
        ..Default::default()
    });

    let kicker = table.add_kicker(&KickerConfig {
        center: Vec2::new(200.0, 450.0),
        ..Default::default()
    });
    let drain = table.add_kicker(&KickerConfig {
        center: Vec2::new(500.0, 1990.0),
        radius: 40.0,
        drain: true,
        ..Default::default()
    });
    let gate = table.add_gate(&GateConfig {
        center: Vec2::new(880.0, 300.0),
        ..Default::default()
    })?;
    let spinner = table.add_spinner(&SpinnerConfig {
        center: Vec2::new(850.0, 900.0),
        ..Default::default()
    })?;
    let rollover = table.add_trigger_circle(Vec2::new(150.0, 1150.0), 25.0, 50.0);

    Ok(DemoTable {
        objects: table.build(),
        left_flipper,
        right_flipper,
        kicker,
        drain,
        gate,
        spinner,
        rollover,
        launch: Vec3::new(500.0, 200.0, 25.0),
    })
}
