//! Dynamic kd-tree over the balls
//!
//! Rebuilt at the start of every physics cycle from the balls' swept
//! bounds. Items are addressed by their index in the caller's ball list;
//! the tree only permutes its own index array, never the balls.

use crate::math::BBox;

const MAX_LEAF_ITEMS: usize = 4;
const MAX_DEPTH: u32 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn at_depth(level: u32) -> Self {
        if level % 2 == 0 { Axis::X } else { Axis::Y }
    }

    /// Lower and upper extent of a box along this axis
    fn span(self, bbox: &BBox) -> (f32, f32) {
        match self {
            Axis::X => (bbox.left, bbox.right),
            Axis::Y => (bbox.top, bbox.bottom),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct KdNode {
    /// Items kept at this node: `order[start..start + count]`
    start: usize,
    count: usize,
    axis: Axis,
    split: f32,
    children: Option<(usize, usize)>,
}

/// Kd-tree of ball bounds
#[derive(Debug, Clone, Default)]
pub struct KdTree {
    bboxes: Vec<BBox>,
    /// Indirection into `bboxes`, grouped by node
    order: Vec<usize>,
    scratch: Vec<usize>,
    nodes: Vec<KdNode>,
}

impl KdTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from scratch; item `i` is the `i`-th box
    pub fn rebuild(&mut self, bboxes: impl IntoIterator<Item = BBox>) {
        self.bboxes.clear();
        self.bboxes.extend(bboxes);
        self.order.clear();
        self.order.extend(0..self.bboxes.len());
        self.nodes.clear();

        if self.bboxes.is_empty() {
            return;
        }

        let mut bounds = BBox::EMPTY;
        for bbox in &self.bboxes {
            bounds.extend(bbox);
        }
        self.nodes.push(KdNode {
            start: 0,
            count: self.bboxes.len(),
            axis: Axis::X,
            split: 0.0,
            children: None,
        });
        self.split(0, bounds, 0);
    }

    pub fn len(&self) -> usize {
        self.bboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bboxes.is_empty()
    }

    fn split(&mut self, node: usize, bounds: BBox, level: u32) {
        let KdNode { start, count, .. } = self.nodes[node];
        if count <= MAX_LEAF_ITEMS || level >= MAX_DEPTH {
            return;
        }

        let axis = Axis::at_depth(level);
        let (lo, hi) = axis.span(&bounds);
        if hi - lo < 1.0e-4 {
            return;
        }
        let split = (lo + hi) * 0.5;

        // straddlers are compacted in place at the front, the two sides
        // gathered in scratch and copied back behind them
        self.scratch.clear();
        let mut kept = start;
        let mut left = Vec::new();
        for i in start..start + count {
            let item = self.order[i];
            let (a, b) = axis.span(&self.bboxes[item]);
            if b < split {
                left.push(item);
            } else if a > split {
                self.scratch.push(item);
            } else {
                self.order[kept] = item;
                kept += 1;
            }
        }
        let left_count = left.len();
        let right_count = self.scratch.len();
        if left_count + right_count == 0 {
            return;
        }
        self.order[kept..kept + left_count].copy_from_slice(&left);
        self.order[kept + left_count..kept + left_count + right_count].copy_from_slice(&self.scratch);

        let left_node = self.nodes.len();
        self.nodes.push(KdNode {
            start: kept,
            count: left_count,
            axis: Axis::X,
            split: 0.0,
            children: None,
        });
        self.nodes.push(KdNode {
            start: kept + left_count,
            count: right_count,
            axis: Axis::X,
            split: 0.0,
            children: None,
        });
        let n = &mut self.nodes[node];
        n.count = kept - start;
        n.axis = axis;
        n.split = split;
        n.children = Some((left_node, left_node + 1));

        let (mut left_bounds, mut right_bounds) = (bounds, bounds);
        match axis {
            Axis::X => {
                left_bounds.right = split;
                right_bounds.left = split;
            }
            Axis::Y => {
                left_bounds.bottom = split;
                right_bounds.top = split;
            }
        }
        self.split(left_node, left_bounds, level + 1);
        self.split(left_node + 1, right_bounds, level + 1);
    }

    /// Visit the index of every item whose bounds overlap `bbox`
    pub fn query(&self, bbox: &BBox, mut visit: impl FnMut(usize)) {
        if !self.nodes.is_empty() {
            self.query_node(0, bbox, &mut visit);
        }
    }

    fn query_node(&self, node: usize, bbox: &BBox, visit: &mut impl FnMut(usize)) {
        let n = &self.nodes[node];
        for &item in &self.order[n.start..n.start + n.count] {
            if bbox.intersects(&self.bboxes[item]) {
                visit(item);
            }
        }

        if let Some((left, right)) = n.children {
            let (lo, hi) = n.axis.span(bbox);
            if lo <= n.split {
                self.query_node(left, bbox, visit);
            }
            if hi >= n.split {
                self.query_node(right, bbox, visit);
            }
        }
    }
}
