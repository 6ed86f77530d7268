//! Projected vertex lattice and bounding volumes for a tile
//!
//! A lattice of grid size `n` has `(n + 1)²` vertices stored row-major,
//! north row first, west to east within a row.

use rayon::prelude::*;

use crate::core::error::Error;
use crate::core::types::{DVec3, Result};
use crate::geo::mercator::inverse_mercator;
use crate::geo::{Ellipsoid, Extent};
use crate::math::{Aabb, BoundingSphere};

/// Box and sphere enclosing a vertex set
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub aabb: Aabb,
    pub sphere: BoundingSphere,
}

impl Bounds {
    pub fn from_aabb(aabb: Aabb) -> Self {
        Self {
            aabb,
            sphere: BoundingSphere::from_aabb(&aabb),
        }
    }

    /// True when every point lies inside both volumes (with a relative tolerance on the sphere)
    pub fn encloses(&self, points: &[DVec3]) -> bool {
        let slack = self.sphere.radius * 1e-12;
        points.iter().all(|&p| {
            self.aabb.contains_point(p) && self.sphere.center.distance(p) <= self.sphere.radius + slack
        })
    }
}

/// Number of vertices in a lattice of `grid_size` cells per side
pub fn vertex_count(grid_size: u32) -> usize {
    let side = grid_size as usize + 1;
    side * side
}

/// Coordinate of lattice line `k` of `n` between `start` and `end`, exact at both ends
fn lattice_coord(start: f64, end: f64, k: usize, n: usize) -> f64 {
    if k == n {
        end
    } else {
        start + (end - start) * (k as f64 / n as f64)
    }
}

/// Project a `(grid_size + 1)²` lattice spanning `extent` onto the ellipsoid
pub fn project_extent_to_vertices(
    extent: &Extent,
    grid_size: u32,
    ellipsoid: &Ellipsoid,
) -> Result<Vec<DVec3>> {
    if grid_size == 0 {
        return Err(Error::InvalidGrid(grid_size));
    }

    let n = grid_size as usize;
    let side = n + 1;
    let west = extent.south_west.lon;
    let east = extent.north_east.lon;
    let north = extent.north_east.lat;
    let south = extent.south_west.lat;

    let mut vertices = vec![DVec3::ZERO; side * side];
    vertices
        .par_chunks_mut(side)
        .enumerate()
        .for_each(|(i, row)| {
            let y = lattice_coord(north, south, i, n);
            for (j, vertex) in row.iter_mut().enumerate() {
                let x = lattice_coord(west, east, j, n);
                *vertex = ellipsoid.lonlat_to_cartesian(inverse_mercator(x, y));
            }
        });

    Ok(vertices)
}

/// Fast bound from the four extent corners only
pub fn bounds_from_extent(extent: &Extent, ellipsoid: &Ellipsoid) -> Bounds {
    let aabb = Aabb::from_points(
        extent
            .corners()
            .iter()
            .map(|c| ellipsoid.lonlat_to_cartesian(inverse_mercator(c.lon, c.lat))),
    );
    Bounds::from_aabb(aabb)
}

/// Exact bound of a vertex set
pub fn bounds_from_vertices(vertices: &[DVec3]) -> Bounds {
    Bounds::from_aabb(Aabb::from_points(vertices.iter().copied()))
}

/// Flatten positions to `f32` triples for upload
pub fn flatten_positions(vertices: &[DVec3]) -> Vec<f32> {
    vertices
        .iter()
        .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_count() {
        assert_eq!(vertex_count(1), 4);
        assert_eq!(vertex_count(4), 25);
        assert_eq!(vertex_count(32), 33 * 33);
    }

    #[test]
    fn test_lattice_size_and_finite() {
        let ellipsoid = Ellipsoid::wgs84();
        for &(zoom, x, y) in &[(0, 0, 0), (2, 1, 3), (9, 300, 170)] {
            let extent = Extent::from_tile(zoom, x, y);
            for grid in [1, 2, 5, 16] {
                let vertices = project_extent_to_vertices(&extent, grid, &ellipsoid).unwrap();
                assert_eq!(vertices.len(), vertex_count(grid));
                assert_eq!(flatten_positions(&vertices).len(), vertex_count(grid) * 3);
                assert!(vertices.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn test_corners_match_direct_projection() {
        let ellipsoid = Ellipsoid::wgs84();
        let extent = Extent::from_tile(4, 9, 5);
        let grid = 8u32;
        let side = grid as usize + 1;
        let vertices = project_extent_to_vertices(&extent, grid, &ellipsoid).unwrap();

        let project = |lon: f64, lat: f64| ellipsoid.lonlat_to_cartesian(inverse_mercator(lon, lat));
        let sw = extent.south_west;
        let ne = extent.north_east;

        assert_eq!(vertices[0], project(sw.lon, ne.lat));
        assert_eq!(vertices[side - 1], project(ne.lon, ne.lat));
        assert_eq!(vertices[(side - 1) * side], project(sw.lon, sw.lat));
        assert_eq!(vertices[side * side - 1], project(ne.lon, sw.lat));
    }

    #[test]
    fn test_zero_grid_rejected() {
        let extent = Extent::from_tile(1, 0, 0);
        let err = project_extent_to_vertices(&extent, 0, &Ellipsoid::wgs84()).unwrap_err();
        assert!(matches!(err, Error::InvalidGrid(0)));
    }

    #[test]
    fn test_vertex_bounds_enclose_lattice() {
        let ellipsoid = Ellipsoid::wgs84();
        let extent = Extent::from_tile(3, 2, 2);
        let vertices = project_extent_to_vertices(&extent, 8, &ellipsoid).unwrap();
        let bounds = bounds_from_vertices(&vertices);
        assert!(bounds.encloses(&vertices));
    }

    #[test]
    fn test_extent_bounds_contain_corners() {
        let ellipsoid = Ellipsoid::wgs84();
        let extent = Extent::from_tile(6, 40, 20);
        let bounds = bounds_from_extent(&extent, &ellipsoid);
        for c in extent.corners() {
            let p = ellipsoid.lonlat_to_cartesian(inverse_mercator(c.lon, c.lat));
            assert!(bounds.aabb.contains_point(p));
        }
    }
}
