//! Planet-wide state shared by every segment

use crate::core::config::{PlanetConfig, TerrainConfig};
use crate::core::types::DVec3;
use crate::geo::Ellipsoid;

/// Runtime view of a [`PlanetConfig`]
#[derive(Clone, Debug)]
pub struct Planet {
    pub config: PlanetConfig,
    pub ellipsoid: Ellipsoid,
}

impl Planet {
    pub fn new(config: PlanetConfig) -> Self {
        let ellipsoid = Ellipsoid::from_config(&config.ellipsoid);
        Self { config, ellipsoid }
    }

    pub fn terrain(&self) -> &TerrainConfig {
        &self.config.terrain
    }

    /// Nearest forward ray hit on the planet ellipsoid
    pub fn hit_ray_ellipsoid(&self, origin: DVec3, direction: DVec3) -> Option<DVec3> {
        self.ellipsoid.hit_ray(origin, direction)
    }
}

impl Default for Planet {
    fn default() -> Self {
        Self::new(PlanetConfig::default())
    }
}
