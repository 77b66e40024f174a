//! World-space rays
use nalgebra::{Matrix4, Point3, Unit, Vector3};

use crate::error::{DecalError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    pub direction: Unit<Vector3<f32>>,
}

impl Ray {
    /// Build a ray, normalizing `direction`
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Result<Self> {
        let direction = Unit::try_new(direction, f32::EPSILON).ok_or(DecalError::ZeroDirection)?;
        Ok(Self { origin, direction })
    }

    /// Ray from `origin` through `target`
    pub fn through(origin: Point3<f32>, target: Point3<f32>) -> Result<Self> {
        Self::new(origin, target - origin)
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction.into_inner() * t
    }

    /// Move the ray by `matrix`.
    ///
    /// Directions are renormalized, so distances measured along the result are
    /// in the target space's units.
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Option<Self> {
        let origin = matrix.transform_point(&self.origin);
        let direction = matrix.transform_vector(&self.direction);
        Unit::try_new(direction, f32::EPSILON).map(|direction| Self { origin, direction })
    }
}
