//! Mathematical utilities and data structures

pub mod aabb;
pub mod sphere;
pub mod ray;

pub use aabb::Aabb;
pub use sphere::BoundingSphere;
pub use ray::{Ray, TriangleHit};
