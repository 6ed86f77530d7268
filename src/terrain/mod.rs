//! Terrain geometry: lattice projection, elevation compositing and loading

pub mod lattice;
pub mod compositor;
pub mod provider;
pub mod loader;
pub mod procedural;

pub use lattice::Bounds;
pub use compositor::ComposedTerrain;
pub use provider::{TerrainProvider, TerrainResponse, TerrainResult, TileKey};
pub use loader::{ElevationSource, TerrainLoader};
pub use procedural::{ElevationParams, ProceduralElevation};
