//! Elevation compositing
//!
//! Merges a row-major elevation raster of side `file_grid_size + 1` into a
//! plain vertex lattice of side `grid_size + 1`. Rasters at least as fine as
//! the lattice are sampled by stride; coarser rasters are interpolated across
//! the two triangles of each raster cell.

use crate::core::error::Error;
use crate::core::types::{DVec3, Result};
use crate::geo::Ellipsoid;
use crate::math::Aabb;

use super::lattice::{vertex_count, Bounds};

/// Displaced lattice and its bounds
#[derive(Clone, Debug)]
pub struct ComposedTerrain {
    pub grid_size: u32,
    pub vertices: Vec<DVec3>,
    pub bounds: Bounds,
}

/// Raster grid size implied by a square sample count, if the count is square
pub fn infer_file_grid_size(sample_count: usize) -> Option<u32> {
    let side = (sample_count as f64).sqrt().round() as usize;
    if side >= 2 && side * side == sample_count {
        Some(side as u32 - 1)
    } else {
        None
    }
}

/// Resample raster heights onto a `grid_size` lattice (unscaled, row-major)
pub fn resample_heights(elevations: &[f32], file_grid_size: u32, grid_size: u32) -> Result<Vec<f64>> {
    if grid_size == 0 {
        return Err(Error::InvalidGrid(grid_size));
    }
    if file_grid_size == 0 {
        return Err(Error::InvalidGrid(file_grid_size));
    }
    if elevations.len() != vertex_count(file_grid_size) {
        return Err(Error::Terrain(format!(
            "raster has {} samples, expected {} for grid {}",
            elevations.len(),
            vertex_count(file_grid_size),
            file_grid_size
        )));
    }

    if file_grid_size >= grid_size {
        if file_grid_size % grid_size != 0 {
            return Err(Error::Terrain(format!(
                "raster grid {file_grid_size} is not a multiple of lattice grid {grid_size}"
            )));
        }
        Ok(downsample(elevations, file_grid_size, grid_size))
    } else {
        if grid_size % file_grid_size != 0 {
            return Err(Error::Terrain(format!(
                "lattice grid {grid_size} is not a multiple of raster grid {file_grid_size}"
            )));
        }
        Ok(upsample(elevations, file_grid_size, grid_size))
    }
}

fn downsample(elevations: &[f32], file_grid_size: u32, grid_size: u32) -> Vec<f64> {
    let gs = grid_size as usize + 1;
    let fs = file_grid_size as usize + 1;
    let dgs = (file_grid_size / grid_size) as usize;

    let mut heights = Vec::with_capacity(gs * gs);
    for i in 0..gs {
        for j in 0..gs {
            heights.push(elevations[i * dgs * fs + j * dgs] as f64);
        }
    }
    heights
}

/// Position of lattice line `k` inside its raster cell: (offset, cell index)
///
/// The last lattice line belongs to the last cell at full offset rather than
/// starting a cell past the raster edge.
fn cell_position(k: usize, last: usize, one_size: usize) -> (usize, usize) {
    if k == last {
        (one_size, k / one_size - 1)
    } else {
        (k % one_size, k / one_size)
    }
}

fn upsample(elevations: &[f32], file_grid_size: u32, grid_size: u32) -> Vec<f64> {
    let gs = grid_size as usize + 1;
    let fs = file_grid_size as usize + 1;
    let one_size = (grid_size / file_grid_size) as usize;
    let one = one_size as f64;

    let mut heights = Vec::with_capacity(gs * gs);
    for i in 0..gs {
        let (inside_i, v_i) = cell_position(i, gs - 1, one_size);
        for j in 0..gs {
            let (inside_j, v_j) = cell_position(j, gs - 1, one_size);

            let lt = elevations[v_i * fs + v_j] as f64;
            let rt = elevations[v_i * fs + v_j + 1] as f64;
            let lb = elevations[(v_i + 1) * fs + v_j] as f64;
            let rb = elevations[(v_i + 1) * fs + v_j + 1] as f64;

            let ti = inside_i as f64 / one;
            let tj = inside_j as f64 / one;

            // Upper-left triangle blends from lt, lower-right from rb
            let h = if inside_i + inside_j < one_size {
                lt + tj * (rt - lt) + ti * (lb - lt)
            } else {
                rb + (1.0 - tj) * (lb - rb) + (1.0 - ti) * (rt - rb)
            };
            heights.push(h);
        }
    }
    heights
}

/// Move each plain vertex along its ellipsoid normal by `height_factor × height`
pub fn displace(
    plain: &[DVec3],
    heights: &[f64],
    height_factor: f64,
    ellipsoid: &Ellipsoid,
) -> (Vec<DVec3>, Bounds) {
    let mut aabb = Aabb::empty();
    let vertices = plain
        .iter()
        .zip(heights)
        .map(|(&p, &h)| {
            let v = p + ellipsoid.surface_normal(p) * (h * height_factor);
            aabb.expand(v);
            v
        })
        .collect();
    (vertices, Bounds::from_aabb(aabb))
}

/// Full compositing pass over a plain lattice
pub fn composite_elevations(
    plain: &[DVec3],
    grid_size: u32,
    elevations: &[f32],
    file_grid_size: u32,
    height_factor: f64,
    ellipsoid: &Ellipsoid,
) -> Result<ComposedTerrain> {
    if plain.len() != vertex_count(grid_size) {
        return Err(Error::Terrain(format!(
            "plain lattice has {} vertices, expected {} for grid {}",
            plain.len(),
            vertex_count(grid_size),
            grid_size
        )));
    }

    let heights = resample_heights(elevations, file_grid_size, grid_size)?;
    let (vertices, bounds) = displace(plain, &heights, height_factor, ellipsoid);

    Ok(ComposedTerrain {
        grid_size,
        vertices,
        bounds,
    })
}

/// Reduce a lattice to its corners, edge midpoints and center (grid size 2)
///
/// Returns `None` when the lattice has no midpoints to keep.
pub fn collapse_to_minimal_lattice(vertices: &[DVec3], grid_size: u32) -> Option<Vec<DVec3>> {
    if grid_size < 2 || grid_size % 2 != 0 || vertices.len() != vertex_count(grid_size) {
        return None;
    }

    let n = grid_size as usize;
    let side = n + 1;
    let half = n / 2;

    let mut out = Vec::with_capacity(9);
    for row in [0, half, n] {
        for col in [0, half, n] {
            out.push(vertices[row * side + col]);
        }
    }
    Some(out)
}
