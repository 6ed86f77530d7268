//! Planet and terrain configuration
//!
//! Everything here can be loaded from a JSON file. Missing fields fall back
//! to the defaults below, so a config only needs to name what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

/// Terrain provider settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Shallowest zoom for which elevation is requested
    pub min_zoom: u32,
    /// Deepest zoom for which elevation exists
    pub max_zoom: u32,
    /// Render grid size per zoom level
    pub grid_size_by_zoom: Vec<u32>,
    /// Raster side length minus one; inferred from the sample count when `None`
    pub file_grid_size: Option<u32>,
    /// Maximum concurrent elevation fetches
    pub max_concurrent: usize,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            min_zoom: 3,
            max_zoom: 14,
            grid_size_by_zoom: vec![
                32, 32, 32, 32, 16, 8, 8, 8, 8, 16, 16, 16, 16, 32, 32, 16, 8, 4, 2, 2, 2, 2, 2, 2,
            ],
            file_grid_size: Some(32),
            max_concurrent: 4,
        }
    }
}

impl TerrainConfig {
    /// Render grid size for a zoom level; zooms past the table reuse its last entry
    pub fn grid_size_for_zoom(&self, zoom: u32) -> u32 {
        self.grid_size_by_zoom
            .get(zoom as usize)
            .or_else(|| self.grid_size_by_zoom.last())
            .copied()
            .unwrap_or(2)
    }
}

/// Ellipsoid radii in meters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EllipsoidConfig {
    pub equatorial_radius: f64,
    pub polar_radius: f64,
}

impl Default for EllipsoidConfig {
    fn default() -> Self {
        // WGS84
        Self {
            equatorial_radius: 6_378_137.0,
            polar_radius: 6_356_752.314_2,
        }
    }
}

/// Global planet settings shared by every segment
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanetConfig {
    /// Height exaggeration applied to every elevation sample
    pub height_factor: f64,
    /// Screen-size ratio used by the LOD test
    pub lod_ratio: f64,
    /// Upper bound on simultaneously drawn overlay layers
    pub max_overlays: usize,
    /// Tiles deeper than this collapse to a 3x3 lattice when they have no elevation
    pub flat_collapse_zoom: u32,
    /// Grid size used for segments before terrain decides otherwise
    pub default_grid_size: u32,
    pub ellipsoid: EllipsoidConfig,
    pub terrain: TerrainConfig,
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            height_factor: 1.0,
            lod_ratio: 1.12,
            max_overlays: 8,
            flat_collapse_zoom: 5,
            default_grid_size: 32,
            ellipsoid: EllipsoidConfig::default(),
            terrain: TerrainConfig::default(),
        }
    }
}

impl PlanetConfig {
    /// Parse a config from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("Loaded planet config from {}", path.as_ref().display());
        Ok(config)
    }
}
