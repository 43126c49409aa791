//! Static quadtree over the table's hit objects
//!
//! Built once when the table is loaded. Each node splits its bounds at the
//! center into four quadrants; an object whose box lies wholly inside one
//! quadrant moves down, an object straddling a split line stays at the node.
//! Nothing is ever stored twice.

use super::state::HitId;
use crate::math::BBox;

/// Objects at or below this count are not split further
const MAX_LEAF_OBJECTS: usize = 4;
/// Consecutive levels that failed to separate objects before giving up
const MAX_EMPTY_LEVELS: u32 = 8;
/// Hard depth ceiling
const MAX_DEPTH: u32 = 42;

#[derive(Debug, Clone)]
struct QuadNode {
    /// Objects retained at this node, with their bounds
    objects: Vec<(HitId, BBox)>,
    /// Split point, meaningful only when `children` is set
    center_x: f32,
    center_y: f32,
    /// Node indices of the quadrants: top-left, top-right, bottom-left, bottom-right
    children: Option<[usize; 4]>,
}

impl QuadNode {
    fn leaf(objects: Vec<(HitId, BBox)>) -> Self {
        Self {
            objects,
            center_x: 0.0,
            center_y: 0.0,
            children: None,
        }
    }
}

/// Quadtree of static hit objects
#[derive(Debug, Clone)]
pub struct QuadTree {
    nodes: Vec<QuadNode>,
    bounds: BBox,
}

impl QuadTree {
    /// Build the tree over every object and its bounds
    pub fn build(objects: impl IntoIterator<Item = (HitId, BBox)>) -> Self {
        let objects: Vec<(HitId, BBox)> = objects.into_iter().collect();
        let mut bounds = BBox::EMPTY;
        for (_, bbox) in &objects {
            bounds.extend(bbox);
        }

        let count = objects.len();
        let mut tree = Self {
            nodes: vec![QuadNode::leaf(objects)],
            bounds,
        };
        if count > 0 {
            tree.split(0, bounds, 0, 0);
        }
        log::debug!("Quadtree built: {} objects in {} nodes", count, tree.nodes.len());
        tree
    }

    /// Union of all object bounds
    pub fn bounds(&self) -> BBox {
        self.bounds
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn split(&mut self, node: usize, bounds: BBox, level: u32, mut empty_levels: u32) {
        if self.nodes[node].objects.len() <= MAX_LEAF_OBJECTS {
            return;
        }

        let cx = (bounds.left + bounds.right) * 0.5;
        let cy = (bounds.top + bounds.bottom) * 0.5;

        let mut quadrants: [Vec<(HitId, BBox)>; 4] = Default::default();
        let mut remain = Vec::new();
        for (id, bbox) in std::mem::take(&mut self.nodes[node].objects) {
            let col = if bbox.right < cx {
                Some(0)
            } else if bbox.left > cx {
                Some(1)
            } else {
                None
            };
            let row = if bbox.bottom < cy {
                Some(0)
            } else if bbox.top > cy {
                Some(2)
            } else {
                None
            };
            match (col, row) {
                (Some(c), Some(r)) => quadrants[c | r].push((id, bbox)),
                _ => remain.push((id, bbox)),
            }
        }

        // a level that kept everything together in one place made no progress
        let occupied = quadrants.iter().filter(|q| !q.is_empty()).count() + usize::from(!remain.is_empty());
        if occupied <= 1 {
            empty_levels += 1;
        } else {
            empty_levels = 0;
        }

        let first = self.nodes.len();
        for objects in quadrants {
            self.nodes.push(QuadNode::leaf(objects));
        }
        let n = &mut self.nodes[node];
        n.objects = remain;
        n.center_x = cx;
        n.center_y = cy;
        n.children = Some([first, first + 1, first + 2, first + 3]);

        if cx - bounds.left > 1.0e-4 && empty_levels <= MAX_EMPTY_LEVELS && level + 1 < MAX_DEPTH {
            for i in 0..4 {
                let child = BBox::new(
                    if i & 1 != 0 { cx } else { bounds.left },
                    if i & 2 != 0 { cy } else { bounds.top },
                    if i & 1 != 0 { bounds.right } else { cx },
                    if i & 2 != 0 { bounds.bottom } else { cy },
                    bounds.zlow,
                    bounds.zhigh,
                );
                self.split(first + i, child, level + 1, empty_levels);
            }
        }
    }

    /// Visit every object whose bounds overlap `bbox`
    ///
    /// May visit objects that only overlap loosely; never skips one that
    /// overlaps.
    pub fn query(&self, bbox: &BBox, mut visit: impl FnMut(HitId)) {
        self.query_node(0, bbox, &mut visit);
    }

    fn query_node(&self, node: usize, bbox: &BBox, visit: &mut impl FnMut(HitId)) {
        let n = &self.nodes[node];
        for (id, obj_box) in &n.objects {
            if bbox.intersects(obj_box) {
                visit(*id);
            }
        }

        let Some(children) = n.children else {
            return;
        };
        let left = bbox.left <= n.center_x;
        let right = bbox.right >= n.center_x;
        if bbox.top <= n.center_y {
            if left {
                self.query_node(children[0], bbox, visit);
            }
            if right {
                self.query_node(children[1], bbox, visit);
            }
        }
        if bbox.bottom >= n.center_y {
            if left {
                self.query_node(children[2], bbox, visit);
            }
            if right {
                self.query_node(children[3], bbox, visit);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn square(x: f32, y: f32, size: f32) -> BBox {
        BBox::new(x, y, x + size, y + size, 0.0, 50.0)
    }

    fn grid(n: u32) -> Vec<(HitId, BBox)> {
        (0..n * n)
            .map(|i| (HitId(i), square((i % n) as f32 * 100.0, (i / n) as f32 * 100.0, 20.0)))
            .collect()
    }

    fn collect(tree: &QuadTree, bbox: &BBox) -> Vec<HitId> {
        let mut found = Vec::new();
        tree.query(bbox, |id| found.push(id));
        found.sort();
        found
    }

    #[test]
    fn test_empty_tree() {
        let tree = QuadTree::build(Vec::new());
        assert!(collect(&tree, &square(0.0, 0.0, 10.0)).is_empty());
    }

    #[test]
    fn test_small_set_stays_in_root() {
        let tree = QuadTree::build(grid(2));
        assert_eq!(tree.node_count(), 1);
        assert_eq!(collect(&tree, &square(-10.0, -10.0, 500.0)).len(), 4);
    }

    #[test]
    fn test_grid_splits_and_finds_neighbours() {
        let tree = QuadTree::build(grid(8));
        assert!(tree.node_count() > 1);
        // touches the objects at (100,100) and (200,100)
        let found = collect(&tree, &BBox::new(110.0, 105.0, 205.0, 115.0, 0.0, 50.0));
        assert_eq!(found, vec![HitId(9), HitId(10)]);
    }

    #[test]
    fn test_straddler_stays_at_root() {
        let mut objects = grid(4);
        // spans the whole table, can never descend
        objects.push((HitId(99), BBox::new(0.0, 0.0, 320.0, 320.0, 0.0, 50.0)));
        let tree = QuadTree::build(objects);
        let found = collect(&tree, &square(5.0, 5.0, 1.0));
        assert!(found.contains(&HitId(99)));
        assert!(found.contains(&HitId(0)));
    }

    #[test]
    fn test_coincident_objects_terminate() {
        // identical boxes can never be separated
        let objects: Vec<_> = (0..50).map(|i| (HitId(i), square(10.0, 10.0, 5.0))).collect();
        let tree = QuadTree::build(objects);
        assert_eq!(collect(&tree, &square(12.0, 12.0, 1.0)).len(), 50);
    }

    #[test]
    fn test_z_range_is_respected() {
        let tree = QuadTree::build(grid(3));
        let above = BBox::new(0.0, 0.0, 20.0, 20.0, 60.0, 80.0);
        assert!(collect(&tree, &above).is_empty());
    }

    fn arb_box() -> impl Strategy<Value = BBox> {
        (0.0f32..1000.0, 0.0f32..2000.0, 0.5f32..150.0, 0.5f32..150.0, 0.0f32..50.0)
            .prop_map(|(x, y, w, h, z)| BBox::new(x, y, x + w, y + h, z, z + 20.0))
    }

    proptest! {
        #[test]
        fn test_query_has_no_false_negatives(
            boxes in prop::collection::vec(arb_box(), 0..80),
            query in arb_box(),
        ) {
            let objects: Vec<_> = boxes.iter().enumerate().map(|(i, b)| (HitId(i as u32), *b)).collect();
            let tree = QuadTree::build(objects);
            let found = collect(&tree, &query);
            for (i, b) in boxes.iter().enumerate() {
                if b.intersects(&query) {
                    prop_assert!(found.contains(&HitId(i as u32)), "missed object {}", i);
                }
            }
            // and nothing is reported twice
            let mut dedup = found.clone();
            dedup.dedup();
            prop_assert_eq!(dedup.len(), found.len());
        }
    }
}
