//! Globe terrain - headless segment demo
//!
//! Builds a 2x2 block of tiles, loads procedural elevation for them, records
//! one overlay frame and one picking frame, and picks the block center.
//!
//! Usage: `globe_terrain [--config planet.json] [--zoom 8]`

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use globe_terrain::core::{camera::Camera, logging, types::{DVec3, Result}, PlanetConfig};
use globe_terrain::geo::mercator::inverse_mercator;
use globe_terrain::geo::LonLat;
use globe_terrain::render::draw::{draw_overlays, DrawRecorder, Frame, ShaderProgram};
use globe_terrain::render::{BufferService, GridRegistry, HeadlessBuffers, Side, WgpuBufferService};
use globe_terrain::segment::{Layer, LayerId, Material, TextureHandle};
use globe_terrain::terrain::{ProceduralElevation, TerrainLoader};
use globe_terrain::{Planet, Segment};

fn parse_config_arg(args: &[String]) -> Option<PathBuf> {
    args.windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| PathBuf::from(&w[1]))
}

fn parse_zoom_arg(args: &[String]) -> Option<u32> {
    args.windows(2)
        .find(|w| w[0] == "--zoom")
        .and_then(|w| w[1].parse().ok())
}

fn open_buffer_service() -> Box<dyn BufferService> {
    match pollster::block_on(WgpuBufferService::request_headless()) {
        Ok(service) => Box::new(service),
        Err(e) => {
            log::warn!("No GPU device ({}), keeping buffers in memory", e);
            Box::new(HeadlessBuffers::new())
        }
    }
}

fn run(args: &[String]) -> Result<()> {
    let config = match parse_config_arg(args) {
        Some(path) => PlanetConfig::load(&path)?,
        None => PlanetConfig::default(),
    };
    let planet = Planet::new(config);
    let zoom = parse_zoom_arg(args).unwrap_or(8).clamp(2, 20);

    let mut gpu = open_buffer_service();
    let mut registry = GridRegistry::new();
    let mut loader = TerrainLoader::new(planet.terrain().clone(), Arc::new(ProceduralElevation::default()))?;

    // 2x2 block near the middle of the tile grid
    let origin = (1u32 << zoom) / 2;
    let mut segments = Vec::new();
    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
        let mut segment = Segment::from_tile(&planet, zoom, origin + dx, origin / 2 + dy)?;
        segment.build_buffers(gpu.as_mut(), &mut registry)?;
        segment.add_material(Material::new(Layer::new(0, "base")).with_texture(TextureHandle(1), [0.0, 0.0, 1.0]));
        segment.load_terrain(&mut loader);
        segments.push(segment);
    }

    for response in loader.wait_idle(Duration::from_secs(30)) {
        if let Some(segment) = segments.iter_mut().find(|s| s.tile_key() == response.tile) {
            let applied = segment.apply_terrain(gpu.as_mut(), &mut registry, &planet, response.elevations())?;
            log::info!(
                "{:?}: applied={} has_data={} grid={}",
                response.tile,
                applied,
                segment.terrain_exists(),
                segment.grid_size()
            );
        }
    }

    // West/east and north/south pairs tell each other their grid sizes
    let sizes: Vec<u32> = segments.iter().map(|s| s.grid_size()).collect();
    let pairs = [
        (0, 1, Side::East, Side::West),
        (2, 3, Side::East, Side::West),
        (0, 2, Side::South, Side::North),
        (1, 3, Side::South, Side::North),
    ];
    for (i, j, side, opposite) in pairs {
        segments[i].neighbors.set_side(side, sizes[j]);
        segments[j].neighbors.set_side(opposite, sizes[i]);
    }

    let center = segments[0].bounds().sphere.center;
    let camera = Camera::look_at(center * 1.5, center, DVec3::Y);

    let mut recorder = DrawRecorder::new();
    let shader = ShaderProgram::default();
    let visible = [LayerId(0)];
    {
        let mut frame = Frame {
            gpu: gpu.as_mut(),
            registry: &mut registry,
            target: &mut recorder,
        };
        for segment in &mut segments {
            if segment.accept_for_rendering(&camera, &planet) {
                draw_overlays(&mut frame, &shader, segment, &visible)?;
            }
            segment.draw_picking(&mut frame, &camera)?;
        }
    }
    log::info!("Recorded {} draw calls", recorder.drain().len());

    // Look straight down at the block's shared corner from 20 km up
    if let Some(extent) = segments[0].extent().copied() {
        let query = LonLat::new(extent.north_east.lon, extent.south_west.lat);
        let ground = inverse_mercator(query.lon, query.lat);
        let eye = planet.ellipsoid.lonlat_to_cartesian(LonLat::with_height(ground.lon, ground.lat, 20_000.0));
        let eye_camera = Camera::new(eye, 45.0, 1.0);
        match segments[0].get_earth_point(query, &eye_camera, &planet) {
            Some(hit) => log::info!("Picked {:?} at distance {:.1} m", hit.point, hit.distance),
            None => log::info!("Pick missed the planet"),
        }
    }

    for segment in &mut segments {
        segment.destroy_segment(gpu.as_mut());
    }
    registry.release(gpu.as_mut());
    Ok(())
}

fn main() {
    logging::init();
    log::info!("Globe terrain starting...");

    let args: Vec<String> = std::env::args().collect();
    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
