//! Terrain provider interface

use crate::core::config::TerrainConfig;

/// XYZ address of a tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub zoom: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    pub fn new(zoom: u32, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

/// Outcome of one elevation fetch
#[derive(Clone, Debug, PartialEq)]
pub enum TerrainResult {
    /// Row-major raster, `(file_grid_size + 1)²` samples, north row first
    Elevations(Vec<f32>),
    /// The tile has no elevation data
    NoData,
    /// The fetch failed; segments treat this like missing data
    Failed(String),
}

/// A finished fetch, ready for `Segment::apply_terrain`
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainResponse {
    pub tile: TileKey,
    pub result: TerrainResult,
}

impl TerrainResponse {
    /// Samples to apply; empty selects the no-data path
    pub fn elevations(&self) -> &[f32] {
        match &self.result {
            TerrainResult::Elevations(samples) => samples,
            TerrainResult::NoData | TerrainResult::Failed(_) => &[],
        }
    }
}

/// Source of elevation rasters for segments
///
/// Requests are fire-and-forget; results reach the segment later through
/// the driver (see `TerrainLoader::poll`).
pub trait TerrainProvider {
    fn config(&self) -> &TerrainConfig;

    /// Start fetching `tile`. Returns `false` if the request was not queued.
    fn request_terrain(&mut self, tile: TileKey) -> bool;
}
