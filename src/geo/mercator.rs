//! Spherical Web-Mercator (EPSG:3857)

use std::f64::consts::PI;

use super::LonLat;

/// Half the projected world width in meters
pub const POLE: f64 = 20_037_508.34;

/// Latitude where the square Mercator world ends
pub const MAX_LAT: f64 = 85.051_128_779_806_59;

/// Projected meters to geographic degrees
pub fn inverse_mercator(x: f64, y: f64) -> LonLat {
    let lon = 180.0 * x / POLE;
    let lat = (180.0 / PI) * (2.0 * (y * PI / POLE).exp().atan() - PI * 0.5);
    LonLat::new(lon, lat)
}

/// Geographic degrees to projected meters
pub fn forward_mercator(lonlat: LonLat) -> (f64, f64) {
    let x = lonlat.lon * POLE / 180.0;
    let lat = lonlat.lat.clamp(-MAX_LAT, MAX_LAT);
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0) * POLE / 180.0;
    (x, y)
}
