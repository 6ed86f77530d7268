//! Rectangular tile extent in projected coordinates

use super::mercator::POLE;
use super::LonLat;

/// South-west / north-east corners of a tile in Web-Mercator meters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extent {
    pub south_west: LonLat,
    pub north_east: LonLat,
}

impl Extent {
    pub fn new(south_west: LonLat, north_east: LonLat) -> Self {
        Self { south_west, north_east }
    }

    /// Extent of the XYZ tile `(x, y)` at `zoom`, row 0 at the north edge
    pub fn from_tile(zoom: u32, x: u32, y: u32) -> Self {
        let size = 2.0 * POLE / f64::from(zoom).exp2();
        let west = -POLE + x as f64 * size;
        let north = POLE - y as f64 * size;
        Self::new(
            LonLat::new(west, north - size),
            LonLat::new(west + size, north),
        )
    }

    pub fn width(&self) -> f64 {
        self.north_east.lon - self.south_west.lon
    }

    pub fn height(&self) -> f64 {
        self.north_east.lat - self.south_west.lat
    }

    /// Corners in south-west, north-west, north-east, south-east order
    pub fn corners(&self) -> [LonLat; 4] {
        let sw = self.south_west;
        let ne = self.north_east;
        [
            sw,
            LonLat::new(sw.lon, ne.lat),
            ne,
            LonLat::new(ne.lon, sw.lat),
        ]
    }

    /// XYZ tile indices this extent occupies
    pub fn tile_indices(&self) -> (u32, u32) {
        let x = ((-POLE - self.south_west.lon).abs() / self.width()).round();
        let y = ((POLE - self.north_east.lat).abs() / self.height()).round();
        (x as u32, y as u32)
    }

    pub fn contains(&self, point: LonLat) -> bool {
        point.lon >= self.south_west.lon && point.lon <= self.north_east.lon &&
        point.lat >= self.south_west.lat && point.lat <= self.north_east.lat
    }
}
