//! Candidate decal placements and their local frame
use nalgebra::{Isometry3, Matrix4, Point3, Translation3, UnitQuaternion, Vector3};

use crate::error::{DecalError, Result};

/// Extent of a decal's projection box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalSize {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
}

impl DecalSize {
    pub fn new(width: f32, height: f32, depth: f32) -> Self {
        Self { width, height, depth }
    }

    pub fn half_extents(&self) -> Vector3<f32> {
        Vector3::new(self.width, self.height, self.depth) / 2.0
    }
}

/// Everything needed to describe a decal before validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalFootprint {
    pub center: Point3<f32>,
    pub orientation: UnitQuaternion<f32>,
    pub size: DecalSize,
}

impl DecalFootprint {
    /// Fails when any extent is non-positive or not finite
    pub fn new(
        center: Point3<f32>,
        orientation: UnitQuaternion<f32>,
        size: DecalSize,
    ) -> Result<Self> {
        for (label, value) in [("width", size.width), ("height", size.height), ("depth", size.depth)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DecalError::InvalidFootprint(format!(
                    "{label} must be positive, got {value}"
                )));
            }
        }
        Ok(Self {
            center,
            orientation,
            size,
        })
    }

    /// Local corner offsets: top-left, top-right, bottom-left, bottom-right.
    ///
    /// All four sit at `+depth/2` along local Z, i.e. behind the surface as
    /// seen from the viewer.
    pub fn corner_offsets(&self) -> [Vector3<f32>; 4] {
        let half = self.size.half_extents();
        [
            Vector3::new(-half.x, half.y, half.z),
            Vector3::new(half.x, half.y, half.z),
            Vector3::new(-half.x, -half.y, half.z),
            Vector3::new(half.x, -half.y, half.z),
        ]
    }

    pub fn world_corners(&self) -> [Point3<f32>; 4] {
        self.corner_offsets()
            .map(|offset| self.center + self.orientation * offset)
    }

    /// Rigid transform from the decal's local frame to world space
    pub fn projector(&self) -> Isometry3<f32> {
        Isometry3::from_parts(Translation3::from(self.center.coords), self.orientation)
    }

    pub fn projector_matrix(&self) -> Matrix4<f32> {
        self.projector().to_homogeneous()
    }

    /// Matrix that stretches world geometry by `scale` inside the decal's own plane
    pub fn scale_about_center(&self, scale: &Vector3<f32>) -> Matrix4<f32> {
        self.projector_matrix()
            * Matrix4::new_nonuniform_scaling(scale)
            * self.projector().inverse().to_homogeneous()
    }
}
