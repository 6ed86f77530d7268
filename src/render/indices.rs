//! Triangle index lists for segment lattices
//!
//! Indices address a `(n + 1)²` row-major lattice (north row first). Triangles
//! are counter-clockwise when the lattice is viewed from outside the planet,
//! i.e. in `(col, -row)` plane coordinates.
//!
//! Uniform lattices split every cell along its top-right/bottom-left diagonal.
//! When a neighbor is coarser, the border ring is re-triangulated so the edge
//! only uses every `n / side_size`-th vertex and meets the neighbor's edge
//! without T-junctions.

/// Cardinal side of a segment
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    North = 0,
    East = 1,
    South = 2,
    West = 3,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::North, Side::East, Side::South, Side::West];
}

/// Neighbor grid size per side, in N, E, S, W order
///
/// Zero means the neighbor's size is unknown and the side is treated as
/// matching the segment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SideSizes(pub [u32; 4]);

impl SideSizes {
    pub fn uniform(grid_size: u32) -> Self {
        Self([grid_size; 4])
    }

    pub fn get(&self, side: Side) -> u32 {
        self.0[side as usize]
    }

    pub fn set(&mut self, side: Side, size: u32) {
        self.0[side as usize] = size;
    }

    /// True when no side needs stitching for a lattice of `grid_size`
    pub fn is_uniform(&self, grid_size: u32) -> bool {
        Side::ALL.iter().all(|&s| edge_step(grid_size, self.get(s)) == 1)
    }
}

/// Vertex stride along an edge shared with a neighbor of `side_size`
fn edge_step(grid_size: u32, side_size: u32) -> u32 {
    if side_size > 0 && side_size < grid_size && grid_size % side_size == 0 {
        grid_size / side_size
    } else {
        1
    }
}

/// Index count of the uniform triangulation
pub fn uniform_index_count(grid_size: u32) -> usize {
    grid_size as usize * grid_size as usize * 6
}

/// Uniform triangulation of the whole lattice
pub fn uniform_indexes(grid_size: u32) -> Vec<u32> {
    let n = grid_size;
    let mut indices = Vec::with_capacity(uniform_index_count(n));
    for r in 0..n {
        for c in 0..n {
            push_cell(&mut indices, n, r, c);
        }
    }
    indices
}

fn push_cell(indices: &mut Vec<u32>, n: u32, r: u32, c: u32) {
    let side = n + 1;
    let tl = r * side + c;
    let tr = tl + 1;
    let bl = tl + side;
    let br = bl + 1;
    indices.extend_from_slice(&[tl, bl, tr, tr, bl, br]);
}

/// Index list for a lattice whose neighbors have the given sizes
///
/// Falls back to the uniform triangulation when every side matches.
pub fn segment_indexes(grid_size: u32, sides: SideSizes) -> Vec<u32> {
    if grid_size < 2 || sides.is_uniform(grid_size) {
        uniform_indexes(grid_size)
    } else {
        stitched_indexes(grid_size, sides)
    }
}

/// Interior cells plus one zipper strip per side
pub fn stitched_indexes(grid_size: u32, sides: SideSizes) -> Vec<u32> {
    let n = grid_size;
    if n < 2 {
        return uniform_indexes(n);
    }

    let mut indices = Vec::with_capacity(uniform_index_count(n));
    for r in 1..n - 1 {
        for c in 1..n - 1 {
            push_cell(&mut indices, n, r, c);
        }
    }

    for side in Side::ALL {
        zip_side(&mut indices, n, side, edge_step(n, sides.get(side)));
    }
    indices
}

/// Lattice `(row, col)` of position `along` on the outer edge or the inner ring line of `side`
fn side_point(n: u32, side: Side, along: u32, outer: bool) -> (u32, u32) {
    match (side, outer) {
        (Side::North, true) => (0, along),
        (Side::North, false) => (1, along),
        (Side::South, true) => (n, along),
        (Side::South, false) => (n - 1, along),
        (Side::West, true) => (along, 0),
        (Side::West, false) => (along, 1),
        (Side::East, true) => (along, n),
        (Side::East, false) => (along, n - 1),
    }
}

/// Triangulate the strip between a side's edge and the ring one line inside it
fn zip_side(indices: &mut Vec<u32>, n: u32, side: Side, step: u32) {
    let outer: Vec<u32> = (0..=n / step).map(|k| k * step).collect();
    let inner: Vec<u32> = (1..n).collect();

    // Ties pick the order that reproduces the uniform diagonal on that side
    let outer_first = matches!(side, Side::North | Side::West);

    let vertex = |along: u32, is_outer: bool| {
        let (r, c) = side_point(n, side, along, is_outer);
        (r, c, r * (n + 1) + c)
    };

    let (mut i, mut j) = (0, 0);
    while i + 1 < outer.len() || j + 1 < inner.len() {
        let advance_outer = if j + 1 == inner.len() {
            true
        } else if i + 1 == outer.len() {
            false
        } else if outer[i + 1] == inner[j + 1] {
            outer_first
        } else {
            outer[i + 1] < inner[j + 1]
        };

        let o = vertex(outer[i], true);
        let p = vertex(inner[j], false);
        if advance_outer {
            let o_next = vertex(outer[i + 1], true);
            push_ccw(indices, o, o_next, p);
            i += 1;
        } else {
            let p_next = vertex(inner[j + 1], false);
            push_ccw(indices, o, p_next, p);
            j += 1;
        }
    }
}

/// Twice the signed area of a lattice triangle in `(col, -row)` coordinates
fn signed_area2(a: (u32, u32), b: (u32, u32), c: (u32, u32)) -> i64 {
    let (ax, ay) = (a.1 as i64, -(a.0 as i64));
    let (bx, by) = (b.1 as i64, -(b.0 as i64));
    let (cx, cy) = (c.1 as i64, -(c.0 as i64));
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

fn push_ccw(indices: &mut Vec<u32>, a: (u32, u32, u32), b: (u32, u32, u32), c: (u32, u32, u32)) {
    if signed_area2((a.0, a.1), (b.0, b.1), (c.0, c.1)) >= 0 {
        indices.extend_from_slice(&[a.2, b.2, c.2]);
    } else {
        indices.extend_from_slice(&[a.2, c.2, b.2]);
    }
}
