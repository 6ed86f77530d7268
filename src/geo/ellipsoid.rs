//! Planet ellipsoid
//!
//! Cartesian frame is planet-centered and Y-up: +Y points to the north pole,
//! +Z crosses the equator at longitude 0 and +X at longitude 90E.

use crate::core::config::EllipsoidConfig;
use crate::core::types::DVec3;

use super::LonLat;

/// Oblate ellipsoid of revolution
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    a: f64,
    b: f64,
    /// First eccentricity squared
    e2: f64,
    /// Second eccentricity squared
    e2p: f64,
    radii: DVec3,
    inv_radii2: DVec3,
}

impl Ellipsoid {
    /// Create from equatorial (`a`) and polar (`b`) radii
    pub fn new(a: f64, b: f64) -> Self {
        let radii = DVec3::new(a, b, a);
        Self {
            a,
            b,
            e2: 1.0 - (b * b) / (a * a),
            e2p: (a * a - b * b) / (b * b),
            radii,
            inv_radii2: 1.0 / (radii * radii),
        }
    }

    pub fn wgs84() -> Self {
        Self::from_config(&EllipsoidConfig::default())
    }

    pub fn from_config(config: &EllipsoidConfig) -> Self {
        Self::new(config.equatorial_radius, config.polar_radius)
    }

    pub fn equatorial_radius(&self) -> f64 {
        self.a
    }

    pub fn polar_radius(&self) -> f64 {
        self.b
    }

    /// `1 / radii²` per axis; scaling a surface point by this gives its normal direction
    pub fn inv_radii2(&self) -> DVec3 {
        self.inv_radii2
    }

    /// Geodetic degrees plus height to Cartesian
    pub fn lonlat_to_cartesian(&self, lonlat: LonLat) -> DVec3 {
        let lat = lonlat.lat.to_radians();
        let lon = lonlat.lon.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        // Radius of curvature in the prime vertical
        let n = self.a / (1.0 - self.e2 * sin_lat * sin_lat).sqrt();
        let nc = (n + lonlat.height) * cos_lat;

        DVec3::new(
            nc * sin_lon,
            (n * (1.0 - self.e2) + lonlat.height) * sin_lat,
            nc * cos_lon,
        )
    }

    /// Cartesian to geodetic degrees plus height (Bowring)
    pub fn cartesian_to_lonlat(&self, p: DVec3) -> LonLat {
        let axial = (p.x * p.x + p.z * p.z).sqrt();
        let lon = p.x.atan2(p.z).to_degrees();

        if axial < 1e-9 {
            let lat = if p.y >= 0.0 { 90.0 } else { -90.0 };
            return LonLat::with_height(lon, lat, p.y.abs() - self.b);
        }

        let theta = (p.y * self.a).atan2(axial * self.b);
        let (sin_theta, cos_theta) = theta.sin_cos();

        let lat = (p.y + self.e2p * self.b * sin_theta.powi(3))
            .atan2(axial - self.e2 * self.a * cos_theta.powi(3));
        let sin_lat = lat.sin();
        let n = self.a / (1.0 - self.e2 * sin_lat * sin_lat).sqrt();
        let height = axial / lat.cos() - n;

        LonLat::with_height(lon, lat.to_degrees(), height)
    }

    /// Outward geodetic normal at a point on (or near) the surface
    pub fn surface_normal(&self, p: DVec3) -> DVec3 {
        (p * self.inv_radii2).normalize()
    }

    /// Nearest forward intersection of a ray with the ellipsoid surface
    pub fn hit_ray(&self, origin: DVec3, direction: DVec3) -> Option<DVec3> {
        let o = origin / self.radii;
        let d = direction / self.radii;

        let a = d.dot(d);
        let b = 2.0 * o.dot(d);
        let c = o.dot(o) - 1.0;

        let discriminant = b * b - 4.0 * a * c;
        if a == 0.0 || discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let t0 = (-b - sqrt_d) / (2.0 * a);
        let t1 = (-b + sqrt_d) / (2.0 * a);

        let t = if t0 >= 0.0 {
            t0
        } else if t1 >= 0.0 {
            t1
        } else {
            return None;
        };

        Some(origin + direction * t)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::wgs84()
    }
}
