//! Bounding sphere

use crate::core::types::DVec3;
use super::aabb::Aabb;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl BoundingSphere {
    pub fn new(center: DVec3, radius: f64) -> Self {
        Self { center, radius }
    }

    /// Sphere through the corners of a box, centered on the box center
    pub fn from_aabb(aabb: &Aabb) -> Self {
        let center = aabb.center();
        Self {
            center,
            radius: center.distance(aabb.max),
        }
    }

    pub fn contains_point(&self, p: DVec3) -> bool {
        self.center.distance(p) <= self.radius
    }
}
