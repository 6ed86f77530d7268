//! Globe camera
//!
//! Positions are planet-scale, so the camera keeps f64 state and only narrows
//! to f32 when a matrix is handed to the GPU.

use glam::{DMat3, DMat4, DQuat};

use crate::core::types::{DVec3, Mat4};
use crate::geo::Ellipsoid;

/// Camera with position, rotation, and projection parameters
#[derive(Clone, Debug)]
pub struct Camera {
    /// World position (planet-centered, Y-up)
    pub position: DVec3,
    /// Rotation as quaternion
    pub rotation: DQuat,
    /// Vertical field of view in radians
    pub fov_y: f64,
    /// Aspect ratio (width / height)
    pub aspect: f64,
    /// Near clip plane
    pub near: f64,
    /// Far clip plane
    pub far: f64,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: DVec3, fov_y_degrees: f64, aspect: f64) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 1.0,
            far: 1.0e8,
        }
    }

    /// Create camera looking at a target
    pub fn look_at(position: DVec3, target: DVec3, up: DVec3) -> Self {
        let forward = (target - position).normalize();
        let right = forward.cross(up).normalize();
        let up = right.cross(forward);

        let rotation = DQuat::from_mat3(&DMat3::from_cols(right, up, -forward));

        Self {
            rotation,
            ..Self::new(position, 45.0, 16.0 / 9.0)
        }
    }

    /// Camera eye position
    pub fn eye(&self) -> DVec3 {
        self.position
    }

    /// Get view matrix (world to camera space)
    pub fn view_matrix(&self) -> DMat4 {
        let rotation_matrix = DMat4::from_quat(self.rotation.conjugate());
        let translation_matrix = DMat4::from_translation(-self.position);
        rotation_matrix * translation_matrix
    }

    /// Get projection matrix (camera to clip space)
    pub fn projection_matrix(&self) -> DMat4 {
        DMat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Combined projection-model-view matrix narrowed for upload
    pub fn pmv_matrix(&self) -> Mat4 {
        (self.projection_matrix() * self.view_matrix()).as_mat4()
    }

    /// Get forward direction (negative Z in camera space)
    pub fn forward(&self) -> DVec3 {
        self.rotation * -DVec3::Z
    }

    /// World-space half height of the view frustum at the distance of `point`
    ///
    /// Grows with distance, so a fixed-size object shrinks on screen as this grows.
    pub fn projected_size(&self, point: DVec3) -> f64 {
        self.position.distance(point) * (self.fov_y * 0.5).tan()
    }

    /// Height of the eye above the ellipsoid surface
    pub fn altitude(&self, ellipsoid: &Ellipsoid) -> f64 {
        ellipsoid.cartesian_to_lonlat(self.position).height
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::look_at(DVec3::new(0.0, 0.0, 2.0e7), DVec3::ZERO, DVec3::Y)
    }
}
