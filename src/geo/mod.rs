//! Geographic primitives: coordinates, extents, projection and the planet ellipsoid

pub mod lonlat;
pub mod mercator;
pub mod extent;
pub mod ellipsoid;

pub use lonlat::LonLat;
pub use extent::Extent;
pub use ellipsoid::Ellipsoid;
