//! Per-frame neighbor bookkeeping written by the quadtree driver

use crate::render::indices::{Side, SideSizes};

/// Grid sizes of the side neighbors as seen this frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NeighborSides {
    pub side_size: SideSizes,
    /// Sides the driver has visited this frame; cleared after every draw
    pub has_neighbor: [bool; 4],
}

impl NeighborSides {
    pub fn new(grid_size: u32) -> Self {
        Self {
            side_size: SideSizes::uniform(grid_size),
            has_neighbor: [false; 4],
        }
    }

    /// Record the neighbor across `side`
    pub fn set_side(&mut self, side: Side, grid_size: u32) {
        self.side_size.set(side, grid_size);
        self.has_neighbor[side as usize] = true;
    }

    pub fn clear_has_neighbor(&mut self) {
        self.has_neighbor = [false; 4];
    }

    /// Forget neighbor sizes, assuming every side matches `grid_size`
    pub fn reset(&mut self, grid_size: u32) {
        *self = Self::new(grid_size);
    }
}
