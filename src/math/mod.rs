//! Math primitives
//!
//! Vectors and matrices come from `glam` (float32 throughout). This module
//! adds the few pieces the collision code needs on top: bounding boxes,
//! the quadratic time-of-impact solver and rotation helpers.

mod bbox;
mod solve;

pub use bbox::BBox;
pub use glam::{Mat3, Quat, Vec2, Vec3};
pub use solve::{pick_root, solve_quadratic, valid_time};

/// Cross product of a pure z-axis rotation `(0, 0, rz)` with `v`
#[inline]
pub fn cross_z(rz: f32, v: Vec3) -> Vec3 {
    Vec3::new(-rz * v.y, rz * v.x, 0.0)
}

/// Matrix `S` such that `S * u == v.cross(u)`
#[inline]
pub fn skew_symmetric(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// Re-orthonormalize a rotation matrix that drifted through integration
pub fn orthonormalize(m: Mat3) -> Mat3 {
    let x = m.x_axis.normalize_or(Vec3::X);
    let y = (m.y_axis - x * x.dot(m.y_axis)).normalize_or(Vec3::Y);
    let z = x.cross(y);
    Mat3::from_cols(x, y, z)
}

/// The xy part of a 3D vector
#[inline]
pub fn xy(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skew_matches_cross() {
        let v = Vec3::new(1.0, -2.0, 0.5);
        let u = Vec3::new(0.3, 4.0, -1.0);
        let a = skew_symmetric(v) * u;
        let b = v.cross(u);
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_cross_z_matches_cross() {
        let v = Vec3::new(3.0, -1.0, 7.0);
        let a = cross_z(2.0, v);
        let b = Vec3::new(0.0, 0.0, 2.0).cross(v);
        assert!((a - b).length() < 1e-5);
    }

    #[test]
    fn test_orthonormalize_repairs_drift() {
        let drifted = Mat3::from_cols(
            Vec3::new(1.01, 0.02, 0.0),
            Vec3::new(0.01, 0.98, 0.03),
            Vec3::new(0.0, 0.0, 1.2),
        );
        let m = orthonormalize(drifted);
        assert!((m.x_axis.length() - 1.0).abs() < 1e-5);
        assert!((m.y_axis.length() - 1.0).abs() < 1e-5);
        assert!(m.x_axis.dot(m.y_axis).abs() < 1e-5);
        assert!((m.determinant() - 1.0).abs() < 1e-4);
    }
}
