//! Ray type and operations

use crate::core::types::DVec3;

/// Tolerance on barycentric coordinates so hits on shared edges and corners count
const BARYCENTRIC_EPSILON: f64 = 1e-9;

/// Below this `|n·d|` the ray is treated as parallel to the triangle plane
const PARALLEL_EPSILON: f64 = 1e-10;

/// Outcome of a ray/triangle test
///
/// Every variant that could reach the triangle's plane carries the plane
/// intersection point, so callers can still use it for lenient picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TriangleHit {
    /// Plane hit in front of the origin and inside the triangle
    Inside(DVec3),
    /// Plane hit behind the origin
    Away(DVec3),
    /// Plane hit in front of the origin but outside the triangle, or no plane hit at all
    Outside(Option<DVec3>),
}

impl TriangleHit {
    /// Plane intersection point, if there was one
    pub fn point(&self) -> Option<DVec3> {
        match *self {
            TriangleHit::Inside(p) | TriangleHit::Away(p) => Some(p),
            TriangleHit::Outside(p) => p,
        }
    }
}

/// A ray defined by origin and direction
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: DVec3,
    pub direction: DVec3,
}

impl Ray {
    /// Create a new ray; the direction is normalized
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get point along ray at parameter t
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Intersect with triangle `(v0, v1, v2)`
    pub fn hit_triangle(&self, v0: DVec3, v1: DVec3, v2: DVec3) -> TriangleHit {
        let u = v1 - v0;
        let v = v2 - v0;
        let n = u.cross(v);

        let w0 = self.origin - v0;
        let a = -n.dot(w0);
        let b = n.dot(self.direction);

        if b.abs() < PARALLEL_EPSILON {
            // Origin lying in the plane counts as a hit at the origin
            return if a == 0.0 {
                TriangleHit::Inside(self.origin)
            } else {
                TriangleHit::Outside(None)
            };
        }

        let r = a / b;
        let point = self.at(r);
        if r < 0.0 {
            return TriangleHit::Away(point);
        }

        let uu = u.dot(u);
        let uv = u.dot(v);
        let vv = v.dot(v);
        let w = point - v0;
        let wu = w.dot(u);
        let wv = w.dot(v);
        let d = uv * uv - uu * vv;

        let s = (uv * wv - vv * wu) / d;
        if s < -BARYCENTRIC_EPSILON || s > 1.0 + BARYCENTRIC_EPSILON {
            return TriangleHit::Outside(Some(point));
        }
        let t = (uv * wu - uu * wv) / d;
        if t < -BARYCENTRIC_EPSILON || s + t > 1.0 + BARYCENTRIC_EPSILON {
            return TriangleHit::Outside(Some(point));
        }

        TriangleHit::Inside(point)
    }
}
