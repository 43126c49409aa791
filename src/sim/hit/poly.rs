use glam::{Vec2, Vec3};

use crate::consts::*;
use crate::error::{PhysicsError, Result};
use crate::math::BBox;
use crate::sim::ball::Ball;
use crate::sim::event::CollisionEvent;

/// Planar polygon in 3D, solid on the side opposite its normal
///
/// The normal follows the right-hand rule over the vertex order.
#[derive(Debug, Clone)]
pub struct Hit3DPoly {
    pub vertices: Vec<Vec3>,
    pub normal: Vec3,
}

impl Hit3DPoly {
    pub fn new(vertices: Vec<Vec3>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::InvalidShape(format!(
                "polygon needs at least 3 vertices, got {}",
                vertices.len()
            )));
        }

        // Newell's method, robust for slightly non-planar input
        let mut n = Vec3::ZERO;
        for (i, a) in vertices.iter().enumerate() {
            let b = vertices[(i + 1) % vertices.len()];
            n.x += (a.y - b.y) * (a.z + b.z);
            n.y += (a.z - b.z) * (a.x + b.x);
            n.z += (a.x - b.x) * (a.y + b.y);
        }
        let normal = n.try_normalize().ok_or_else(|| {
            PhysicsError::InvalidShape("polygon has no area".into())
        })?;

        Ok(Self { vertices, normal })
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::from_points(self.vertices.iter().copied())
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let Some(face) = face_hit(self.normal, self.vertices[0], ball, dtime) else {
            return -1.0;
        };
        if !point_in_polygon(face.point, &self.vertices, self.normal) {
            return -1.0;
        }
        face.fill(self.normal, coll)
    }
}

/// Triangle, solid on the side opposite its normal
#[derive(Debug, Clone)]
pub struct HitTriangle {
    pub vertices: [Vec3; 3],
    pub normal: Vec3,
}

impl HitTriangle {
    pub fn new(vertices: [Vec3; 3]) -> Result<Self> {
        let normal = (vertices[1] - vertices[0])
            .cross(vertices[2] - vertices[0])
            .try_normalize()
            .ok_or_else(|| PhysicsError::InvalidShape("degenerate triangle".into()))?;
        Ok(Self { vertices, normal })
    }

    pub fn calc_bbox(&self) -> BBox {
        BBox::from_points(self.vertices)
    }

    pub fn hit_test(&self, ball: &Ball, dtime: f32, coll: &mut CollisionEvent) -> f32 {
        let Some(face) = face_hit(self.normal, self.vertices[0], ball, dtime) else {
            return -1.0;
        };

        // barycentric coordinates of the contact point
        let [a, b, c] = self.vertices;
        let v0 = c - a;
        let v1 = b - a;
        let v2 = face.point - a;
        let dot00 = v0.dot(v0);
        let dot01 = v0.dot(v1);
        let dot02 = v0.dot(v2);
        let dot11 = v1.dot(v1);
        let dot12 = v1.dot(v2);
        let inv_denom = 1.0 / (dot00 * dot11 - dot01 * dot01);
        let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
        let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

        if u >= 0.0 && v >= 0.0 && u + v <= 1.0 {
            face.fill(self.normal, coll)
        } else {
            -1.0
        }
    }
}

/// Time and place where the ball surface reaches a face plane
struct FaceHit {
    time: f32,
    /// Contact point on the ball at `time`
    point: Vec3,
    bnd: f32,
    bnv: f32,
}

impl FaceHit {
    fn fill(&self, normal: Vec3, coll: &mut CollisionEvent) -> f32 {
        coll.normal = normal;
        coll.distance = self.bnd;
        if self.bnv.abs() <= C_CONTACTVEL && self.bnd.abs() <= PHYS_TOUCH {
            coll.is_contact = true;
            coll.org_normal_velocity = self.bnv;
        }
        self.time
    }
}

fn face_hit(normal: Vec3, origin: Vec3, ball: &Ball, dtime: f32) -> Option<FaceHit> {
    let bnv = normal.dot(ball.vel);
    if bnv > C_LOWNORMVEL {
        return None;
    }

    // nearest point of the ball to the plane
    let point = ball.pos - ball.radius() * normal;
    let bnd = normal.dot(point - origin);

    let time = if bnd < -ball.radius() {
        return None;
    } else if bnd <= PHYS_TOUCH {
        if bnd <= 0.0 || bnv.abs() > C_CONTACTVEL || bnd <= -PHYS_TOUCH {
            0.0
        } else {
            // slow touch: do not compete with fast zero-time events
            bnd * (1.0 / (2.0 * PHYS_TOUCH)) + 0.5
        }
    } else if bnv.abs() > C_LOWNORMVEL {
        bnd / -bnv
    } else {
        return None;
    };

    if !time.is_finite() || time < 0.0 || time > dtime {
        return None;
    }

    Some(FaceHit {
        time,
        point: point + time * ball.vel,
        bnd,
        bnv,
    })
}

/// Crossing test after projecting onto the plane the polygon is flattest in
fn point_in_polygon(p: Vec3, vertices: &[Vec3], normal: Vec3) -> bool {
    let a = normal.abs();
    let project = |v: Vec3| -> Vec2 {
        if a.z >= a.x && a.z >= a.y {
            Vec2::new(v.x, v.y)
        } else if a.y >= a.x {
            Vec2::new(v.z, v.x)
        } else {
            Vec2::new(v.y, v.z)
        }
    };

    let p = project(p);
    let mut inside = false;
    let mut prev = project(vertices[vertices.len() - 1]);
    for &v in vertices {
        let cur = project(v);
        if (cur.y > p.y) != (prev.y > p.y) {
            let x = (prev.x - cur.x) * (p.y - cur.y) / (prev.y - cur.y) + cur.x;
            if p.x < x {
                inside = !inside;
            }
        }
        prev = cur;
    }
    inside
}
