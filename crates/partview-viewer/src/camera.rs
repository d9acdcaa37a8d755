//! Orbit camera and fit-to-bounds.

use glam::{Mat4, Vec2, Vec3};
use partview_io::BoundingBox;

use crate::selection::Ray;

/// Camera settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Target point the camera is looking at.
    pub target: Vec3,
    /// Distance from target.
    pub distance: f32,
    /// Azimuth angle (horizontal rotation).
    pub azimuth: f32,
    /// Elevation angle (vertical rotation).
    pub elevation: f32,
    /// Field of view in degrees.
    pub fov: f32,
    /// Near clipping plane.
    pub near: f32,
    /// Far clipping plane.
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 10.0,
            azimuth: 45.0_f32.to_radians(),
            elevation: 30.0_f32.to_radians(),
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Aim at the center of `bounds` from twice its largest extent.
    ///
    /// Empty bounds leave the camera unchanged. Returns whether it moved.
    pub fn fit_to_bounds(&mut self, bounds: &BoundingBox) -> bool {
        if bounds.is_empty() {
            return false;
        }
        let size = bounds.size();
        let max_dim = size.x.max(size.y).max(size.z);

        self.target = bounds.center();
        self.distance = if max_dim > 0.0 { max_dim * 2.0 } else { 1.0 };
        self.near = self.distance / 100.0;
        self.far = self.distance * 100.0;
        true
    }

    /// Camera position on its orbit around the target.
    pub fn eye(&self) -> Vec3 {
        let (sin_el, cos_el) = self.elevation.sin_cos();
        let (sin_az, cos_az) = self.azimuth.sin_cos();
        self.target + self.distance * Vec3::new(cos_el * sin_az, sin_el, cos_el * cos_az)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), aspect, self.near, self.far)
    }

    /// World-space ray through a point in normalized device coordinates
    /// (`-1..1`, +Y up).
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect: f32) -> Ray {
        let inverse = (self.projection_matrix(aspect) * self.view_matrix()).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray::new(near, far - near)
    }
}
