use bevy::prelude::*;

use crate::ray::ray_sphere_intersection;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PickProjection {
    /// Vertical field of view in radians.
    Perspective { fov_y: f32 },
    /// Visible world height of the view volume.
    Orthographic { height: f32 },
}

/// The parts of a view camera that handle picking needs: enough to turn a
/// radius in pixels into a radius in world units at some depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickCamera {
    pub position: Vec3,
    pub forward: Dir3,
    pub projection: PickProjection,
    /// Viewport height in logical pixels.
    pub viewport_height: f32,
}

impl PickCamera {
    pub fn perspective(position: Vec3, forward: Dir3, fov_y: f32, viewport_height: f32) -> Self {
        Self {
            position,
            forward,
            projection: PickProjection::Perspective { fov_y },
            viewport_height,
        }
    }

    pub fn orthographic(position: Vec3, forward: Dir3, height: f32, viewport_height: f32) -> Self {
        Self {
            position,
            forward,
            projection: PickProjection::Orthographic { height },
            viewport_height,
        }
    }

    /// World units covered by one pixel at `point`.
    pub fn perspective_scaling_factor(&self, point: Vec3) -> f32 {
        let viewport_height = self.viewport_height.max(1.0);
        match self.projection {
            PickProjection::Perspective { fov_y } => {
                let depth = (point - self.position).dot(*self.forward).max(0.0);
                depth * 2.0 * (fov_y * 0.5).tan() / viewport_height
            }
            PickProjection::Orthographic { height } => height / viewport_height,
        }
    }

    /// Hit-test a point handle drawn `radius_px` pixels wide.
    ///
    /// The handle is a sphere around `point` whose world radius covers
    /// `radius_px` pixels at the handle's depth. Returns the distance along
    /// `ray` to where it enters that sphere.
    pub fn pick_point_handle(&self, ray: Ray3d, point: Vec3, radius_px: f32) -> Option<f32> {
        let radius = radius_px * self.perspective_scaling_factor(point);
        ray_sphere_intersection(ray, point, radius)
    }
}
