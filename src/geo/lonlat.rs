//! Longitude/latitude pair

/// Geographic coordinate in degrees with a height in meters.
///
/// Also used for Web-Mercator positions, where `lon`/`lat` hold the projected
/// x/y in meters and `height` is unused.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
    pub height: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat, height: 0.0 }
    }

    pub fn with_height(lon: f64, lat: f64, height: f64) -> Self {
        Self { lon, lat, height }
    }
}
