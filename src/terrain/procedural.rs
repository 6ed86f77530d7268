//! Noise-based elevation rasters
//!
//! Stands in for a network elevation service: samples fractal noise over the
//! tile's geographic footprint so neighboring tiles agree along shared edges.

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::core::types::Result;
use crate::geo::mercator::inverse_mercator;
use crate::geo::Extent;

use super::loader::ElevationSource;
use super::provider::TileKey;

/// Parameters controlling elevation synthesis
#[derive(Clone, Debug)]
pub struct ElevationParams {
    pub seed: u32,
    /// Degrees per noise unit (larger = smoother)
    pub scale: f64,
    /// Height in meters at noise value 1
    pub height_scale: f64,
    pub octaves: usize,
    pub persistence: f64,
    pub lacunarity: f64,
    /// Noise-space offset of sea level; tiles entirely below it report no data
    pub sea_level: f64,
}

impl Default for ElevationParams {
    fn default() -> Self {
        Self {
            seed: 12345,
            scale: 20.0,
            height_scale: 4000.0,
            octaves: 6,
            persistence: 0.5,
            lacunarity: 2.0,
            sea_level: 0.0,
        }
    }
}

pub struct ProceduralElevation {
    params: ElevationParams,
    noise: Fbm<Perlin>,
}

impl ProceduralElevation {
    pub fn new(params: ElevationParams) -> Self {
        let noise = Fbm::<Perlin>::new(params.seed)
            .set_octaves(params.octaves)
            .set_persistence(params.persistence)
            .set_lacunarity(params.lacunarity);

        Self { params, noise }
    }

    pub fn params(&self) -> &ElevationParams {
        &self.params
    }

    /// Height in meters at Web-Mercator `(x, y)`, relative to sea level
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        let lonlat = inverse_mercator(x, y);
        let n = self.noise.get([lonlat.lon / self.params.scale, lonlat.lat / self.params.scale]);
        (n - self.params.sea_level) * self.params.height_scale
    }

    /// Row-major `(file_grid_size + 1)²` raster over `extent`, north row first
    pub fn raster(&self, extent: &Extent, file_grid_size: u32) -> Vec<f32> {
        let n = file_grid_size.max(1) as usize;
        let west = extent.south_west.lon;
        let north = extent.north_east.lat;
        let dx = extent.width() / n as f64;
        let dy = extent.height() / n as f64;

        let mut samples = Vec::with_capacity((n + 1) * (n + 1));
        for i in 0..=n {
            for j in 0..=n {
                samples.push(self.height_at(west + j as f64 * dx, north - i as f64 * dy) as f32);
            }
        }
        samples
    }
}

impl Default for ProceduralElevation {
    fn default() -> Self {
        Self::new(ElevationParams::default())
    }
}

impl ElevationSource for ProceduralElevation {
    fn fetch(&self, tile: TileKey, file_grid_size: u32) -> Result<Option<Vec<f32>>> {
        let extent = Extent::from_tile(tile.zoom, tile.x, tile.y);
        let samples = self.raster(&extent, file_grid_size);
        if samples.iter().all(|&h| h <= 0.0) {
            return Ok(None);
        }
        Ok(Some(samples))
    }
}
