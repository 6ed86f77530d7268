//! Globe terrain - quadtree segments of a planet-scale terrain mesh

pub mod core;
pub mod math;
pub mod geo;
pub mod terrain;
pub mod render;
pub mod segment;
pub mod planet;

pub use planet::Planet;
pub use segment::Segment;
