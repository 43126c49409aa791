use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned 3D box in table coordinates
///
/// `top` is the smaller y, `bottom` the larger (y grows toward the player).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub zlow: f32,
    pub zhigh: f32,
}

impl Default for BBox {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl BBox {
    /// Inverted box, the identity for `extend`
    pub const EMPTY: BBox = BBox {
        left: f32::MAX,
        top: f32::MAX,
        right: -f32::MAX,
        bottom: -f32::MAX,
        zlow: f32::MAX,
        zhigh: -f32::MAX,
    };

    pub fn new(left: f32, top: f32, right: f32, bottom: f32, zlow: f32, zhigh: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            zlow,
            zhigh,
        }
    }

    /// Box spanning two corners given in any order
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        let min = a.min(b);
        let max = a.max(b);
        Self::new(min.x, min.y, max.x, max.y, min.z, max.z)
    }

    /// Smallest box holding every point
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut bbox = Self::EMPTY;
        for p in points {
            bbox.extend_point(p);
        }
        bbox
    }

    pub fn is_empty(&self) -> bool {
        self.left > self.right || self.top > self.bottom || self.zlow > self.zhigh
    }

    pub fn extend(&mut self, other: &BBox) {
        self.left = self.left.min(other.left);
        self.top = self.top.min(other.top);
        self.zlow = self.zlow.min(other.zlow);
        self.right = self.right.max(other.right);
        self.bottom = self.bottom.max(other.bottom);
        self.zhigh = self.zhigh.max(other.zhigh);
    }

    pub fn extend_point(&mut self, p: Vec3) {
        self.left = self.left.min(p.x);
        self.top = self.top.min(p.y);
        self.zlow = self.zlow.min(p.z);
        self.right = self.right.max(p.x);
        self.bottom = self.bottom.max(p.y);
        self.zhigh = self.zhigh.max(p.z);
    }

    /// Grow on every side by `d`
    pub fn expanded(&self, d: f32) -> Self {
        Self::new(
            self.left - d,
            self.top - d,
            self.right + d,
            self.bottom + d,
            self.zlow - d,
            self.zhigh + d,
        )
    }

    /// Overlap test, touching faces count as overlapping
    #[inline]
    pub fn intersects(&self, other: &BBox) -> bool {
        self.right >= other.left
            && self.bottom >= other.top
            && self.left <= other.right
            && self.top <= other.bottom
            && self.zlow <= other.zhigh
            && self.zhigh >= other.zlow
    }

    /// True when `other` lies entirely inside `self`
    pub fn contains(&self, other: &BBox) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.top >= self.top
            && other.bottom <= self.bottom
            && other.zlow >= self.zlow
            && other.zhigh <= self.zhigh
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.left, self.top, self.zlow)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.right, self.bottom, self.zhigh)
    }

    pub fn center(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extend_from_empty() {
        let mut b = BBox::EMPTY;
        assert!(b.is_empty());
        b.extend_point(Vec3::new(1.0, 2.0, 3.0));
        b.extend_point(Vec3::new(-1.0, 5.0, 0.0));
        assert_eq!(b, BBox::new(-1.0, 2.0, 1.0, 5.0, 0.0, 3.0));
    }

    #[test]
    fn test_intersects_touching_and_separated() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0, 0.0, 10.0);
        let touching = BBox::new(10.0, 5.0, 20.0, 6.0, 1.0, 2.0);
        let apart = BBox::new(10.5, 5.0, 20.0, 6.0, 1.0, 2.0);
        let above = BBox::new(1.0, 1.0, 2.0, 2.0, 11.0, 12.0);
        assert!(a.intersects(&touching));
        assert!(!a.intersects(&apart));
        assert!(!a.intersects(&above));
    }

    #[test]
    fn test_contains() {
        let outer = BBox::new(0.0, 0.0, 10.0, 10.0, 0.0, 10.0);
        assert!(outer.contains(&BBox::new(1.0, 1.0, 9.0, 9.0, 1.0, 9.0)));
        assert!(!outer.contains(&BBox::new(-1.0, 1.0, 9.0, 9.0, 1.0, 9.0)));
    }
}
