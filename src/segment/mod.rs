//! Terrain segments
//!
//! A [`Segment`] is one quadtree tile: a projected vertex lattice over a
//! Web-Mercator extent, the elevation applied to it, the GPU buffers drawing
//! it and the overlay materials texturing it.
//!
//! Terrain arrives asynchronously. Between [`Segment::load_terrain`] and
//! [`Segment::apply_terrain`] the segment renders its placeholder lattice.
//! Responses that arrive after the segment stopped waiting (it was cleared or
//! destroyed, or terrain was already applied) are ignored.

pub mod material;
pub mod neighbors;

pub use material::{Layer, LayerId, Material, TextureHandle};
pub use neighbors::NeighborSides;

use crate::core::camera::Camera;
use crate::core::error::Error;
use crate::core::types::{DVec3, Result};
use crate::geo::{Extent, LonLat};
use crate::math::{Ray, TriangleHit};
use crate::planet::Planet;
use crate::render::draw::{DrawMode, Frame, ShaderProgram, Uniform, VertexAttribute};
use crate::render::indices::{stitched_indexes, SideSizes};
use crate::render::{BufferService, GpuMesh, GridRegistry, IndexBuffer};
use crate::terrain::compositor::{collapse_to_minimal_lattice, composite_elevations, infer_file_grid_size};
use crate::terrain::lattice::{
    bounds_from_extent, bounds_from_vertices, project_extent_to_vertices, vertex_count, Bounds,
};
use crate::terrain::provider::{TerrainProvider, TileKey};

/// Elevation state of a segment
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TerrainState {
    /// Nothing requested yet
    #[default]
    Empty,
    /// Request in flight, rendering the placeholder
    Loading,
    /// Terrain applied; `has_data` is false for flat fallback geometry
    Ready { has_data: bool },
}

/// Result of a pick query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EarthPoint {
    /// Distance from the eye; negative when the hit lies behind the ray
    pub distance: f64,
    pub point: DVec3,
}

pub struct Segment {
    zoom: u32,
    tile_x: u32,
    tile_y: u32,
    /// `None` once destroyed
    extent: Option<Extent>,
    grid_size: u32,

    plain_vertices: Vec<DVec3>,
    terrain_vertices: Vec<DVec3>,
    temp_vertices: Vec<DVec3>,
    bounds: Bounds,

    terrain: TerrainState,
    ready: bool,
    mesh: Option<GpuMesh>,
    custom_indices: Option<(SideSizes, IndexBuffer)>,

    materials: Vec<Material>,
    pub neighbors: NeighborSides,
    tex_bias_arr: Vec<f32>,
    sampler_arr: Vec<i32>,
}

impl Segment {
    /// Create a segment over `extent` with a flat placeholder lattice of `grid_size`
    pub fn new(planet: &Planet, zoom: u32, extent: Extent, grid_size: u32) -> Result<Self> {
        let plain_vertices = project_extent_to_vertices(&extent, grid_size, &planet.ellipsoid)?;

        // Corner bound alone can miss the bulge of large tiles
        let corner_bounds = bounds_from_extent(&extent, &planet.ellipsoid);
        let bounds = Bounds::from_aabb(corner_bounds.aabb.merged(&bounds_from_vertices(&plain_vertices).aabb));

        let (tile_x, tile_y) = extent.tile_indices();
        let max_overlays = planet.config.max_overlays;

        Ok(Self {
            zoom,
            tile_x,
            tile_y,
            extent: Some(extent),
            grid_size,
            temp_vertices: plain_vertices.clone(),
            plain_vertices,
            terrain_vertices: Vec::new(),
            bounds,
            terrain: TerrainState::Empty,
            ready: false,
            mesh: None,
            custom_indices: None,
            materials: Vec::new(),
            neighbors: NeighborSides::new(grid_size),
            tex_bias_arr: vec![0.0; max_overlays * 3],
            sampler_arr: vec![0; max_overlays],
        })
    }

    /// Segment for XYZ tile `(x, y)` at the planet's default grid size
    pub fn from_tile(planet: &Planet, zoom: u32, x: u32, y: u32) -> Result<Self> {
        Self::new(planet, zoom, Extent::from_tile(zoom, x, y), planet.config.default_grid_size)
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    pub fn tile_key(&self) -> TileKey {
        TileKey::new(self.zoom, self.tile_x, self.tile_y)
    }

    pub fn extent(&self) -> Option<&Extent> {
        self.extent.as_ref()
    }

    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn terrain_state(&self) -> TerrainState {
        self.terrain
    }

    /// GPU buffers are valid
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_destroyed(&self) -> bool {
        self.extent.is_none()
    }

    pub fn terrain_ready(&self) -> bool {
        matches!(self.terrain, TerrainState::Ready { .. })
    }

    pub fn terrain_is_loading(&self) -> bool {
        self.terrain == TerrainState::Loading
    }

    pub fn terrain_exists(&self) -> bool {
        self.terrain == TerrainState::Ready { has_data: true }
    }

    pub fn mesh(&self) -> Option<&GpuMesh> {
        self.mesh.as_ref()
    }

    pub fn plain_vertices(&self) -> &[DVec3] {
        &self.plain_vertices
    }

    pub fn terrain_vertices(&self) -> &[DVec3] {
        &self.terrain_vertices
    }

    /// The lattice currently drawn and picked
    pub fn active_vertices(&self) -> &[DVec3] {
        if self.terrain_ready() {
            &self.terrain_vertices
        } else {
            &self.temp_vertices
        }
    }

    pub fn max_overlays(&self) -> usize {
        self.sampler_arr.len()
    }

    /// Per-overlay uniform arrays: tex-bias triples and sampler slots
    pub fn overlay_arrays_mut(&mut self) -> (&mut [f32], &mut [i32]) {
        (&mut self.tex_bias_arr, &mut self.sampler_arr)
    }

    /// LOD test: true when the tile is small enough on screen to draw as is
    pub fn accept_for_rendering(&self, camera: &Camera, planet: &Planet) -> bool {
        let sphere = &self.bounds.sphere;
        camera.projected_size(sphere.center) > planet.config.lod_ratio * sphere.radius
    }

    /// Replace the placeholder lattice (e.g. with geometry cut from the parent)
    ///
    /// Until terrain is applied this changes what the segment draws, so its
    /// buffers are released and must be rebuilt.
    pub fn set_placeholder(&mut self, gpu: &mut dyn BufferService, vertices: Vec<DVec3>, grid_size: u32) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        if vertices.len() != vertex_count(grid_size) {
            return Err(Error::Terrain(format!(
                "placeholder has {} vertices, expected {} for grid {}",
                vertices.len(),
                vertex_count(grid_size),
                grid_size
            )));
        }

        self.temp_vertices = vertices;
        if !self.terrain_ready() {
            self.clear_buffers(gpu);
            self.grid_size = grid_size;
            self.bounds = bounds_from_vertices(&self.temp_vertices);
        }
        Ok(())
    }

    /// Upload the active lattice and mark the segment drawable
    pub fn build_buffers(&mut self, gpu: &mut dyn BufferService, registry: &mut GridRegistry) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }

        self.clear_buffers(gpu);
        let mesh = GpuMesh::create(gpu, registry, self.active_vertices(), self.grid_size)?;
        self.mesh = Some(mesh);
        self.ready = true;
        Ok(())
    }

    /// Request elevation for this tile
    ///
    /// Tiles shallower than the provider's minimum zoom are flat by definition
    /// and become terrain-ready without a request. Returns whether a request
    /// was issued.
    pub fn load_terrain(&mut self, provider: &mut dyn TerrainProvider) -> bool {
        if self.is_destroyed() {
            return false;
        }

        if self.zoom < provider.config().min_zoom {
            if !self.terrain_ready() {
                self.terrain_vertices = self.temp_vertices.clone();
                self.terrain = TerrainState::Ready { has_data: false };
            }
            return false;
        }

        if self.terrain != TerrainState::Empty {
            return false;
        }

        self.terrain = TerrainState::Loading;
        let tile = self.tile_key();
        if provider.request_terrain(tile) {
            log::debug!("Terrain requested for {:?}", tile);
            true
        } else {
            self.terrain = TerrainState::Empty;
            false
        }
    }

    /// Apply a fetched raster; an empty raster selects the no-data fallback
    ///
    /// Returns `Ok(false)` when the segment is not waiting for terrain.
    pub fn apply_terrain(
        &mut self,
        gpu: &mut dyn BufferService,
        registry: &mut GridRegistry,
        planet: &Planet,
        elevations: &[f32],
    ) -> Result<bool> {
        if elevations.is_empty() {
            self.elevations_not_exist(gpu, registry, planet)
        } else {
            self.elevations_exist(gpu, registry, planet, elevations)
        }
    }

    fn awaiting_terrain(&self) -> bool {
        self.ready && self.terrain_is_loading()
    }

    /// Plain lattice at `grid_size`, re-projected when the stored one differs
    fn plain_lattice(&mut self, planet: &Planet, grid_size: u32) -> Result<&[DVec3]> {
        if self.plain_vertices.len() != vertex_count(grid_size) {
            let extent = self.extent.ok_or_else(|| Error::Terrain("segment destroyed".into()))?;
            self.plain_vertices = project_extent_to_vertices(&extent, grid_size, &planet.ellipsoid)?;
        }
        Ok(&self.plain_vertices)
    }

    fn elevations_exist(
        &mut self,
        gpu: &mut dyn BufferService,
        registry: &mut GridRegistry,
        planet: &Planet,
        elevations: &[f32],
    ) -> Result<bool> {
        if !self.awaiting_terrain() {
            log::warn!("Ignoring terrain for {:?}: segment is not waiting for it", self.tile_key());
            return Ok(false);
        }

        let terrain = planet.terrain();
        let grid_size = terrain.grid_size_for_zoom(self.zoom);
        let file_grid_size = terrain
            .file_grid_size
            .filter(|&f| vertex_count(f) == elevations.len())
            .or_else(|| infer_file_grid_size(elevations.len()));

        let composed = file_grid_size
            .ok_or_else(|| Error::Terrain(format!("{} samples do not form a square raster", elevations.len())))
            .and_then(|fgs| {
                let plain = self.plain_lattice(planet, grid_size)?;
                composite_elevations(plain, grid_size, elevations, fgs, planet.config.height_factor, &planet.ellipsoid)
            });

        let composed = match composed {
            Ok(composed) => composed,
            Err(e) => {
                log::warn!("Terrain for {:?} unusable ({}), using flat fallback", self.tile_key(), e);
                if self.zoom > terrain.max_zoom {
                    // Keep the placeholder geometry but stop waiting
                    self.terrain_vertices = self.temp_vertices.clone();
                    self.terrain = TerrainState::Ready { has_data: false };
                    return Ok(true);
                }
                return self.elevations_not_exist(gpu, registry, planet);
            }
        };

        self.clear_buffers(gpu);
        self.terrain_vertices = composed.vertices;
        self.bounds = composed.bounds;
        self.grid_size = grid_size;
        self.terrain = TerrainState::Ready { has_data: true };

        self.mesh = Some(GpuMesh::create(gpu, registry, &self.terrain_vertices, grid_size)?);
        self.ready = true;
        log::debug!("Terrain applied to {:?} at grid {}", self.tile_key(), grid_size);
        Ok(true)
    }

    fn elevations_not_exist(
        &mut self,
        gpu: &mut dyn BufferService,
        registry: &mut GridRegistry,
        planet: &Planet,
    ) -> Result<bool> {
        let terrain = planet.terrain();
        if self.zoom > terrain.max_zoom {
            return Ok(false);
        }
        if !self.awaiting_terrain() {
            log::warn!("Ignoring empty terrain for {:?}: segment is not waiting for it", self.tile_key());
            return Ok(false);
        }

        let grid_size = terrain.grid_size_for_zoom(self.zoom);
        let flat = self.plain_lattice(planet, grid_size)?.to_vec();

        self.clear_buffers(gpu);
        let collapsed = if self.zoom > planet.config.flat_collapse_zoom {
            collapse_to_minimal_lattice(&flat, grid_size)
        } else {
            None
        };
        match collapsed {
            Some(vertices) => {
                log::debug!("No terrain for {:?}, collapsed to grid 2", self.tile_key());
                self.terrain_vertices = vertices;
                self.grid_size = 2;
            }
            None => {
                self.terrain_vertices = flat;
                self.grid_size = grid_size;
            }
        }
        self.bounds = bounds_from_vertices(&self.terrain_vertices);
        self.terrain = TerrainState::Ready { has_data: false };

        self.mesh = Some(GpuMesh::create(gpu, registry, &self.terrain_vertices, self.grid_size)?);
        self.ready = true;
        Ok(true)
    }

    /// Ray pick against the cell containing `point` (Web-Mercator meters)
    ///
    /// The ray runs from the eye towards the planet center. Hits on either
    /// triangle of the cell are exact; otherwise the plane hit of the second
    /// triangle is returned. Without vertex data the planet ellipsoid is hit
    /// instead and the distance is the camera altitude.
    pub fn get_earth_point(&self, point: LonLat, camera: &Camera, planet: &Planet) -> Option<EarthPoint> {
        let eye = camera.eye();
        let ray = Ray::new(eye, -eye);
        let vertices = self.active_vertices();

        if let Some(extent) = self.extent.filter(|_| vertices.len() == vertex_count(self.grid_size)) {
            let n = self.grid_size as usize;
            let size = self.grid_size as f64;
            let qx = extent.width() / size;
            let qy = extent.height() / size;

            let col = ((point.lon - extent.south_west.lon) / qx).floor();
            let row = (size - (point.lat - extent.south_west.lat) / qy).floor();
            let col = col.clamp(0.0, size - 1.0) as usize;
            let row = row.clamp(0.0, size - 1.0) as usize;

            let top = (n + 1) * row + col;
            let bottom = top + n + 1;
            let (v0, v1, v2, v3) = (vertices[top], vertices[top + 1], vertices[bottom], vertices[bottom + 1]);

            let first = ray.hit_triangle(v0, v1, v2);
            if let TriangleHit::Inside(p) = first {
                return Some(EarthPoint { distance: eye.distance(p), point: p });
            }

            let second = ray.hit_triangle(v1, v3, v2);
            let hit = match second {
                TriangleHit::Inside(p) | TriangleHit::Outside(Some(p)) => Some(EarthPoint {
                    distance: eye.distance(p),
                    point: p,
                }),
                TriangleHit::Away(p) => Some(EarthPoint {
                    distance: -eye.distance(p),
                    point: p,
                }),
                TriangleHit::Outside(None) => first.point().map(|p| EarthPoint {
                    distance: eye.distance(p),
                    point: p,
                }),
            };
            if hit.is_some() {
                return hit;
            }
        }

        planet
            .hit_ray_ellipsoid(ray.origin, ray.direction)
            .map(|p| EarthPoint {
                distance: camera.altitude(&planet.ellipsoid),
                point: p,
            })
    }

    /// Index buffer matching the current neighbor sizes
    ///
    /// Uniform neighbors use the registry's shared buffer. Otherwise a stitched
    /// buffer is built and kept until the neighbor sizes or grid size change.
    pub fn resolve_index_buffer(&mut self, gpu: &mut dyn BufferService, registry: &mut GridRegistry) -> Result<IndexBuffer> {
        let sides = self.neighbors.side_size;
        if self.grid_size < 2 || sides.is_uniform(self.grid_size) {
            return registry.shared_index_buffer(gpu, self.grid_size);
        }

        if let Some((cached, buffer)) = self.custom_indices {
            if cached == sides && buffer.grid_size == self.grid_size {
                return Ok(buffer);
            }
        }
        if let Some((_, old)) = self.custom_indices.take() {
            old.release(gpu);
        }

        let buffer = IndexBuffer::create(gpu, &stitched_indexes(self.grid_size, sides), self.grid_size)?;
        log::debug!("Stitched index buffer for {:?} with sides {:?}", self.tile_key(), sides.0);
        self.custom_indices = Some((sides, buffer));
        Ok(buffer)
    }

    /// Bind positions and texture coordinates and issue the draw
    ///
    /// Returns `false` when the segment has no buffers.
    pub fn draw(&mut self, frame: &mut Frame<'_>, shader: &ShaderProgram) -> Result<bool> {
        let Some(mesh) = self.mesh.filter(|_| self.ready) else {
            return Ok(false);
        };

        let indices = self.resolve_index_buffer(frame.gpu, frame.registry)?;
        indices.check_matches(&mesh)?;

        frame.target.bind_attribute(VertexAttribute::Position, &mesh.positions);
        frame.target.bind_attribute(VertexAttribute::TextureCoord, &mesh.texcoords);
        frame.target.draw_elements(shader.draw_mode, &indices.buffer);

        self.neighbors.clear_has_neighbor();
        Ok(true)
    }

    /// Draw positions only, with the camera matrix, for the picking pass
    pub fn draw_picking(&mut self, frame: &mut Frame<'_>, camera: &Camera) -> Result<bool> {
        let Some(mesh) = self.mesh.filter(|_| self.ready) else {
            return Ok(false);
        };

        let indices = self.resolve_index_buffer(frame.gpu, frame.registry)?;
        indices.check_matches(&mesh)?;

        frame.target.set_uniform(Uniform::PmvMatrix(camera.pmv_matrix()));
        frame.target.bind_attribute(VertexAttribute::Position, &mesh.positions);
        frame.target.draw_elements(DrawMode::Triangles, &indices.buffer);

        self.neighbors.reset(self.grid_size);
        Ok(true)
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.retain(|m| m.layer.id != material.layer.id);
        self.materials.push(material);
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn material_by_layer(&self, layer: LayerId) -> Option<&Material> {
        self.materials.iter().find(|m| m.layer.id == layer)
    }

    pub fn material_by_layer_mut(&mut self, layer: LayerId) -> Option<&mut Material> {
        self.materials.iter_mut().find(|m| m.layer.id == layer)
    }

    pub fn material_by_layer_name(&self, name: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.layer.name == name)
    }

    pub fn delete_materials(&mut self) {
        for material in &mut self.materials {
            material.clear();
        }
        self.materials.clear();
    }

    /// Release every buffer this segment owns; no-op for missing handles
    pub fn delete_buffers(&mut self, gpu: &mut dyn BufferService) {
        if let Some(mesh) = self.mesh.take() {
            mesh.release(gpu);
        }
        if let Some((_, indices)) = self.custom_indices.take() {
            indices.release(gpu);
        }
    }

    pub fn clear_buffers(&mut self, gpu: &mut dyn BufferService) {
        self.ready = false;
        self.delete_buffers(gpu);
    }

    /// Drop all vertex data and forget terrain state
    pub fn delete_elevations(&mut self) {
        self.terrain = TerrainState::Empty;
        self.plain_vertices = Vec::new();
        self.terrain_vertices = Vec::new();
        self.temp_vertices = Vec::new();
    }

    pub fn clear_segment(&mut self, gpu: &mut dyn BufferService) {
        self.clear_buffers(gpu);
        self.delete_materials();
        self.delete_elevations();
    }

    /// Release everything; the segment ignores all later calls
    pub fn destroy_segment(&mut self, gpu: &mut dyn BufferService) {
        self.clear_segment(gpu);
        self.extent = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{PlanetConfig, TerrainConfig};
    use crate::geo::mercator::inverse_mercator;
    use crate::render::buffer::HeadlessBuffers;
    use crate::render::draw::{DrawRecorder, UniformValue};
    use crate::render::indices::Side;
    use std::collections::BTreeSet;

    struct MockProvider {
        config: TerrainConfig,
        requests: Vec<TileKey>,
        accept: bool,
    }

    impl MockProvider {
        fn new(config: &TerrainConfig) -> Self {
            Self {
                config: config.clone(),
                requests: Vec::new(),
                accept: true,
            }
        }
    }

    impl TerrainProvider for MockProvider {
        fn config(&self) -> &TerrainConfig {
            &self.config
        }

        fn request_terrain(&mut self, tile: TileKey) -> bool {
            self.requests.push(tile);
            self.accept
        }
    }

    fn planet_with(grid_size: u32, file_grid_size: Option<u32>) -> Planet {
        let mut config = PlanetConfig::default();
        config.default_grid_size = grid_size;
        config.terrain.grid_size_by_zoom = vec![grid_size; 24];
        config.terrain.file_grid_size = file_grid_size;
        Planet::new(config)
    }

    struct Fixture {
        gpu: HeadlessBuffers,
        registry: GridRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                gpu: HeadlessBuffers::new(),
                registry: GridRegistry::new(),
            }
        }

        /// Segment with buffers built and terrain requested
        fn loading_segment(&mut self, planet: &Planet, zoom: u32, x: u32, y: u32) -> Segment {
            let mut segment = Segment::from_tile(planet, zoom, x, y).unwrap();
            segment.build_buffers(&mut self.gpu, &mut self.registry).unwrap();
            let mut provider = MockProvider::new(planet.terrain());
            assert!(segment.load_terrain(&mut provider));
            segment
        }

        fn apply(&mut self, segment: &mut Segment, planet: &Planet, elevations: &[f32]) -> bool {
            segment.apply_terrain(&mut self.gpu, &mut self.registry, planet, elevations).unwrap()
        }
    }

    /// Height of each terrain vertex above its plain vertex
    fn heights(segment: &Segment) -> Vec<f64> {
        segment
            .plain_vertices()
            .iter()
            .zip(segment.terrain_vertices())
            .map(|(p, v)| v.distance(*p))
            .collect()
    }

    #[test]
    fn test_new_segment_lattice_and_bounds() {
        let planet = planet_with(8, None);
        let segment = Segment::from_tile(&planet, 4, 3, 5).unwrap();

        assert_eq!(segment.tile_key(), TileKey::new(4, 3, 5));
        assert_eq!(segment.active_vertices().len(), 81);
        assert!(segment.bounds().encloses(segment.active_vertices()));
        assert_eq!(segment.terrain_state(), TerrainState::Empty);
        assert!(!segment.is_ready());
        assert_eq!(segment.max_overlays(), planet.config.max_overlays);
    }

    #[test]
    fn test_build_and_clear_buffers() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 10, 20).unwrap();

        segment.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();
        assert!(segment.is_ready());
        assert_eq!(fx.gpu.live_count(), 2);
        assert_eq!(segment.mesh().map(|m| m.positions.item_count), Some(25));

        segment.clear_buffers(&mut fx.gpu);
        segment.clear_buffers(&mut fx.gpu);
        assert!(!segment.is_ready());
        assert!(segment.mesh().is_none());
        assert_eq!(fx.gpu.live_count(), 0);
    }

    #[test]
    fn test_load_terrain_requests_once() {
        let planet = planet_with(4, None);
        let mut segment = Segment::from_tile(&planet, 6, 1, 1).unwrap();
        let mut provider = MockProvider::new(planet.terrain());

        assert!(segment.load_terrain(&mut provider));
        assert!(segment.terrain_is_loading());
        assert!(!segment.load_terrain(&mut provider));
        assert_eq!(provider.requests, vec![TileKey::new(6, 1, 1)]);
    }

    #[test]
    fn test_rejected_request_stays_empty() {
        let planet = planet_with(4, None);
        let mut segment = Segment::from_tile(&planet, 6, 1, 1).unwrap();
        let mut provider = MockProvider::new(planet.terrain());
        provider.accept = false;

        assert!(!segment.load_terrain(&mut provider));
        assert_eq!(segment.terrain_state(), TerrainState::Empty);
    }

    #[test]
    fn test_below_min_zoom_is_flat_and_ready() {
        let planet = planet_with(4, None);
        let mut segment = Segment::from_tile(&planet, 1, 0, 1).unwrap();
        let mut provider = MockProvider::new(planet.terrain());

        assert!(!segment.load_terrain(&mut provider));
        assert!(provider.requests.is_empty());
        assert_eq!(segment.terrain_state(), TerrainState::Ready { has_data: false });
        assert!(!segment.terrain_exists());
        assert_eq!(segment.active_vertices(), segment.plain_vertices());
    }

    #[test]
    fn test_aligned_raster_applies_direct_heights() {
        let planet = planet_with(4, Some(4));
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 6, 33, 21);

        let elevations: Vec<f32> = (0..25).map(|k| 100.0 + 10.0 * k as f32).collect();
        assert!(fx.apply(&mut segment, &planet, &elevations));

        assert!(segment.terrain_exists());
        assert!(!segment.terrain_is_loading());
        assert_eq!(segment.grid_size(), 4);
        for (h, &e) in heights(&segment).iter().zip(&elevations) {
            assert!((h - e as f64).abs() < 1e-6);
        }
        assert!(segment.bounds().encloses(segment.active_vertices()));
        assert!(segment.is_ready());
        assert_eq!(fx.gpu.live_count(), 2);
    }

    #[test]
    fn test_coarse_raster_upsampled_into_grid_4() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 7, 64, 40);

        let e: Vec<f32> = vec![0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];
        assert!(fx.apply(&mut segment, &planet, &e));
        assert_eq!(segment.terrain_vertices().len(), 25);

        let h = heights(&segment);
        let at = |i: usize, j: usize| h[i * 5 + j];
        for i in 0..3 {
            for j in 0..3 {
                assert!((at(2 * i, 2 * j) - e[i * 3 + j] as f64).abs() < 1e-6);
            }
        }
        assert!((at(0, 1) - 5.0).abs() < 1e-6);
        assert!((at(1, 0) - 15.0).abs() < 1e-6);
        assert!((at(1, 1) - 20.0).abs() < 1e-6);
        assert!((at(3, 3) - 60.0).abs() < 1e-6);
        assert!((at(4, 3) - 75.0).abs() < 1e-6);
    }

    #[test]
    fn test_second_apply_is_ignored() {
        let planet = planet_with(4, Some(4));
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 6, 5, 5);
        assert!(fx.apply(&mut segment, &planet, &[50.0; 25]));

        let vertices = segment.terrain_vertices().to_vec();
        let bounds = *segment.bounds();
        let created = fx.gpu.created_count();

        assert!(!fx.apply(&mut segment, &planet, &[900.0; 25]));
        assert!(!fx.apply(&mut segment, &planet, &[]));
        assert_eq!(segment.terrain_vertices(), &vertices[..]);
        assert_eq!(*segment.bounds(), bounds);
        assert_eq!(fx.gpu.created_count(), created);
    }

    #[test]
    fn test_apply_before_buffers_is_ignored() {
        let planet = planet_with(4, Some(4));
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 5, 5).unwrap();
        let mut provider = MockProvider::new(planet.terrain());
        assert!(segment.load_terrain(&mut provider));

        assert!(!fx.apply(&mut segment, &planet, &[50.0; 25]));
        assert!(segment.terrain_is_loading());
        assert_eq!(fx.gpu.created_count(), 0);
    }

    #[test]
    fn test_late_apply_after_destroy_is_inert() {
        let planet = planet_with(4, Some(4));
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 6, 8, 9);
        let created = fx.gpu.created_count();

        segment.destroy_segment(&mut fx.gpu);
        assert!(segment.is_destroyed());
        assert_eq!(fx.gpu.live_count(), 0);

        assert!(!fx.apply(&mut segment, &planet, &[10.0; 25]));
        assert!(!fx.apply(&mut segment, &planet, &[]));
        segment.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();
        assert_eq!(fx.gpu.created_count(), created);
        assert_eq!(fx.gpu.live_count(), 0);
        assert!(segment.active_vertices().is_empty());
    }

    #[test]
    fn test_unusable_raster_falls_back_to_flat() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 4, 3, 3);

        assert!(fx.apply(&mut segment, &planet, &[1.0; 7]));
        assert_eq!(segment.terrain_state(), TerrainState::Ready { has_data: false });
        assert_eq!(segment.grid_size(), 4);
    }

    #[test]
    fn test_no_data_collapses_deep_tiles() {
        let planet = planet_with(8, None);
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 7, 30, 50);
        let plain = segment.plain_vertices().to_vec();

        assert!(fx.apply(&mut segment, &planet, &[]));
        assert_eq!(segment.terrain_state(), TerrainState::Ready { has_data: false });
        assert_eq!(segment.grid_size(), 2);

        let expected: Vec<DVec3> = [0usize, 4, 8]
            .iter()
            .flat_map(|&r| [0usize, 4, 8].map(|c| plain[r * 9 + c]))
            .collect();
        assert_eq!(segment.terrain_vertices(), &expected[..]);
        assert_eq!(segment.mesh().map(|m| (m.grid_size, m.positions.item_count)), Some((2, 9)));
        assert!(segment.bounds().encloses(segment.active_vertices()));
    }

    #[test]
    fn test_no_data_keeps_shallow_tiles_at_full_grid() {
        let planet = planet_with(8, None);
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 4, 3, 3);

        assert!(fx.apply(&mut segment, &planet, &[]));
        assert_eq!(segment.grid_size(), 8);
        assert_eq!(segment.terrain_vertices(), segment.plain_vertices());
    }

    #[test]
    fn test_no_data_past_max_zoom_is_ignored() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let zoom = planet.terrain().max_zoom + 1;
        let mut segment = fx.loading_segment(&planet, zoom, 0, 0);

        assert!(!fx.apply(&mut segment, &planet, &[]));
        assert!(segment.terrain_is_loading());
    }

    #[test]
    fn test_unusable_raster_past_max_zoom_stops_loading() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let zoom = planet.terrain().max_zoom + 1;
        let mut segment = fx.loading_segment(&planet, zoom, 0, 0);
        let mesh = segment.mesh().copied();

        assert!(fx.apply(&mut segment, &planet, &[1.0; 7]));
        assert_eq!(segment.terrain_state(), TerrainState::Ready { has_data: false });
        assert_eq!(segment.grid_size(), 4);
        assert_eq!(segment.active_vertices().len(), 25);
        assert_eq!(segment.mesh().copied(), mesh);
    }

    #[test]
    fn test_terrain_grid_differs_from_placeholder() {
        let mut planet = planet_with(4, Some(2));
        planet.config.default_grid_size = 16;
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 6, 2, 2);
        assert_eq!(segment.grid_size(), 16);

        assert!(fx.apply(&mut segment, &planet, &[5.0; 9]));
        assert_eq!(segment.grid_size(), 4);
        assert_eq!(segment.plain_vertices().len(), 25);
        assert_eq!(segment.mesh().map(|m| m.grid_size), Some(4));
    }

    #[test]
    fn test_lod_accepts_once_far_enough() {
        let planet = Planet::default();
        let segment = Segment::from_tile(&planet, 6, 20, 20).unwrap();
        let sphere = segment.bounds().sphere;
        let up = sphere.center.normalize();

        let mut accepted = false;
        for k in 1..200 {
            let distance = sphere.radius * 0.05 * k as f64;
            let camera = Camera::new(sphere.center + up * distance, 45.0, 1.0);
            let accept = segment.accept_for_rendering(&camera, &planet);
            assert!(!(accepted && !accept), "LOD flipped back at distance {distance}");
            accepted |= accept;
        }
        assert!(accepted);

        let close = Camera::new(sphere.center + up * sphere.radius * 0.1, 45.0, 1.0);
        assert!(!segment.accept_for_rendering(&close, &planet));
    }

    #[test]
    fn test_pick_at_lattice_vertex() {
        let planet = planet_with(4, Some(4));
        let mut fx = Fixture::new();
        let mut segment = fx.loading_segment(&planet, 6, 12, 25);
        let elevations: Vec<f32> = (0..25).map(|k| (k % 7) as f32 * 120.0).collect();
        assert!(fx.apply(&mut segment, &planet, &elevations));

        let extent = *segment.extent().unwrap();
        let qx = extent.width() / 4.0;
        let qy = extent.height() / 4.0;

        for (row, col) in [(1usize, 1usize), (2, 3), (3, 2)] {
            let vertex = segment.terrain_vertices()[row * 5 + col];
            let camera = Camera::new(vertex * 2.0, 45.0, 1.0);
            let query = LonLat::new(
                extent.south_west.lon + col as f64 * qx,
                extent.north_east.lat - row as f64 * qy,
            );

            let hit = segment.get_earth_point(query, &camera, &planet).unwrap();
            assert!(hit.point.distance(vertex) < 1e-3, "({row}, {col}) off by {}", hit.point.distance(vertex));
            assert!((hit.distance - vertex.length()).abs() < 1e-3);
        }
    }

    #[test]
    fn test_pick_without_vertices_hits_ellipsoid() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 12, 25).unwrap();
        segment.destroy_segment(&mut fx.gpu);

        let eye = DVec3::new(0.0, 0.0, planet.ellipsoid.equatorial_radius() + 10_000.0);
        let camera = Camera::new(eye, 45.0, 1.0);
        let hit = segment.get_earth_point(LonLat::new(0.0, 0.0), &camera, &planet).unwrap();

        assert!((hit.point.z - planet.ellipsoid.equatorial_radius()).abs() < 1e-6);
        assert!((hit.distance - camera.altitude(&planet.ellipsoid)).abs() < 1e-6);
    }

    #[test]
    fn test_adjacent_tiles_share_edge_vertices() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let (zoom, x, y) = (5, 12, 9);

        let mut fine = Segment::new(&planet, zoom, Extent::from_tile(zoom, x, y), 4).unwrap();
        let coarse = Segment::new(&planet, zoom, Extent::from_tile(zoom, x, y - 1), 2).unwrap();
        fine.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();
        fine.neighbors.set_side(Side::North, coarse.grid_size());

        let mut recorder = DrawRecorder::new();
        let mut frame = Frame {
            gpu: &mut fx.gpu,
            registry: &mut fx.registry,
            target: &mut recorder,
        };
        assert!(fine.draw(&mut frame, &ShaderProgram::default()).unwrap());

        let call = &recorder.calls()[0];
        let indices = fx.gpu.element_data(call.indices).unwrap();
        let north_row: BTreeSet<u32> = indices.iter().copied().filter(|&i| i < 5).collect();
        assert_eq!(north_row, BTreeSet::from([0, 2, 4]));

        let coarse_south = &coarse.plain_vertices()[6..9];
        for (&i, expected) in north_row.iter().zip(coarse_south) {
            let p = fine.plain_vertices()[i as usize];
            assert!(p.distance(*expected) < 1e-6, "edge vertex {i} off by {}", p.distance(*expected));
        }
    }

    #[test]
    fn test_stitched_buffer_cached_per_side_configuration() {
        let planet = planet_with(8, None);
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 4, 4).unwrap();
        segment.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();

        let shared = segment.resolve_index_buffer(&mut fx.gpu, &mut fx.registry).unwrap();
        assert_eq!(segment.resolve_index_buffer(&mut fx.gpu, &mut fx.registry).unwrap(), shared);

        segment.neighbors.set_side(Side::West, 4);
        let stitched = segment.resolve_index_buffer(&mut fx.gpu, &mut fx.registry).unwrap();
        assert_ne!(stitched, shared);
        assert_eq!(segment.resolve_index_buffer(&mut fx.gpu, &mut fx.registry).unwrap(), stitched);

        segment.neighbors.set_side(Side::South, 2);
        let restitched = segment.resolve_index_buffer(&mut fx.gpu, &mut fx.registry).unwrap();
        assert_ne!(restitched, stitched);
        assert!(!fx.gpu.is_live(stitched.buffer.handle));
        assert!(fx.gpu.is_live(shared.buffer.handle));
    }

    #[test]
    fn test_draw_clears_neighbor_flags() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 4, 4).unwrap();
        let mut recorder = DrawRecorder::new();

        {
            let mut frame = Frame {
                gpu: &mut fx.gpu,
                registry: &mut fx.registry,
                target: &mut recorder,
            };
            assert!(!segment.draw(&mut frame, &ShaderProgram::default()).unwrap());
        }
        segment.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();
        segment.neighbors.set_side(Side::East, 4);

        let mut frame = Frame {
            gpu: &mut fx.gpu,
            registry: &mut fx.registry,
            target: &mut recorder,
        };
        assert!(segment.draw(&mut frame, &ShaderProgram::default()).unwrap());
        assert_eq!(segment.neighbors.has_neighbor, [false; 4]);

        let call = &recorder.calls()[0];
        let mesh = segment.mesh().unwrap();
        assert_eq!(call.positions, Some(mesh.positions.handle));
        assert_eq!(call.texcoords, Some(mesh.texcoords.handle));
        assert_eq!(call.index_count, 96);
    }

    #[test]
    fn test_draw_picking_resets_side_sizes() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 4, 4).unwrap();
        segment.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();
        segment.neighbors.set_side(Side::North, 2);

        let camera = Camera::default();
        let mut recorder = DrawRecorder::new();
        let mut frame = Frame {
            gpu: &mut fx.gpu,
            registry: &mut fx.registry,
            target: &mut recorder,
        };
        assert!(segment.draw_picking(&mut frame, &camera).unwrap());

        let call = &recorder.calls()[0];
        assert_eq!(call.texcoords, None);
        assert_eq!(call.uniforms, vec![UniformValue::PmvMatrix(camera.pmv_matrix())]);
        assert_eq!(segment.neighbors.side_size, SideSizes::uniform(4));
    }

    #[test]
    fn test_material_lookup_and_delete() {
        let planet = Planet::default();
        let mut segment = Segment::from_tile(&planet, 2, 1, 1).unwrap();
        segment.add_material(Material::new(Layer::new(1, "osm")).with_texture(TextureHandle(10), [0.0, 0.0, 1.0]));
        segment.add_material(Material::new(Layer::new(2, "clouds")));
        segment.add_material(Material::new(Layer::new(1, "osm")).with_texture(TextureHandle(11), [0.5, 0.5, 0.5]));

        assert_eq!(segment.materials().len(), 2);
        assert_eq!(segment.material_by_layer(LayerId(1)).and_then(|m| m.texture), Some(TextureHandle(11)));
        assert_eq!(segment.material_by_layer_name("clouds").map(|m| m.layer.id), Some(LayerId(2)));
        assert!(segment.material_by_layer(LayerId(3)).is_none());

        if let Some(m) = segment.material_by_layer_mut(LayerId(2)) {
            m.texture = Some(TextureHandle(12));
        }
        assert!(segment.material_by_layer(LayerId(2)).unwrap().is_ready());

        segment.delete_materials();
        assert!(segment.materials().is_empty());
    }

    #[test]
    fn test_set_placeholder_replaces_active_lattice() {
        let planet = planet_with(4, None);
        let mut fx = Fixture::new();
        let mut segment = Segment::from_tile(&planet, 6, 4, 4).unwrap();
        segment.build_buffers(&mut fx.gpu, &mut fx.registry).unwrap();

        let extent = *segment.extent().unwrap();
        let placeholder = project_extent_to_vertices(&extent, 2, &planet.ellipsoid).unwrap();
        segment.set_placeholder(&mut fx.gpu, placeholder.clone(), 2).unwrap();

        assert!(!segment.is_ready());
        assert_eq!(segment.grid_size(), 2);
        assert_eq!(segment.active_vertices(), &placeholder[..]);
        assert!(segment.set_placeholder(&mut fx.gpu, placeholder, 4).is_err());

        let sw = extent.south_west;
        let corner = planet.ellipsoid.lonlat_to_cartesian(inverse_mercator(sw.lon, sw.lat));
        assert!(segment.bounds().aabb.contains_point(corner));
    }
}
