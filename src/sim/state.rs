//! Identity handles for simulation entities
//!
//! Hit objects and balls refer to each other through these ids rather than
//! through pointers, so the simulation owns every object exactly once.

use serde::{Deserialize, Serialize};

/// Ball handle, monotonically increasing and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BallId(pub u32);

/// Handle of the game item that owns one or more hit objects
///
/// Supplied by whoever builds the table. Events name the item, and volume
/// sets store items so all segments of one trigger share a membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u32);

/// Index of a hit object in the simulation's static arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HitId(pub u32);

impl HitId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ball id allocator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallIdAllocator {
    next_id: u32,
}

impl Default for BallIdAllocator {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl BallIdAllocator {
    /// Allocate a new ball id
    pub fn next_id(&mut self) -> BallId {
        let id = self.next_id;
        self.next_id += 1;
        BallId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let mut alloc = BallIdAllocator::default();
        let a = alloc.next_id();
        let b = alloc.next_id();
        let c = alloc.next_id();
        assert!(a < b && b < c);
        assert_eq!(a, BallId(1));
    }
}
