//! Camera, viewport and the screen <-> world conversions
use nalgebra::{Matrix4, Point2, Point3, Vector3, Vector4};

use crate::error::{DecalError, Result};
use crate::ray::Ray;

/// Pixel position on the canvas, origin top-left, Y growing downward
pub type ScreenPoint = Point2<f32>;

/// Projection mode for rendering
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProjectionMode {
    Orthographic,
    Perspective,
}

/// Canvas dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            1.0
        }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }

    /// Normalize a canvas position to device coordinates in [-1, 1].
    ///
    /// The vertical axis is inverted: canvas Y grows downward, device Y upward.
    pub fn to_ndc(&self, point: &ScreenPoint) -> Result<Point2<f32>> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(DecalError::EmptyViewport);
        }
        Ok(Point2::new(
            (point.x / self.width) * 2.0 - 1.0,
            -(point.y / self.height) * 2.0 + 1.0,
        ))
    }
}

/// Result of projecting a world point onto the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProjection {
    pub position: ScreenPoint,
    /// Normalized device depth, -1 at the near plane and 1 at the far plane
    pub depth: f32,
}

impl ScreenProjection {
    pub fn is_visible(&self, viewport: &Viewport) -> bool {
        (0.0..=viewport.width).contains(&self.position.x)
            && (0.0..=viewport.height).contains(&self.position.y)
            && (-1.0..=1.0).contains(&self.depth)
    }
}

/// Camera configuration for 3D rendering
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub mode: ProjectionMode,
}

impl Camera {
    pub fn new(viewport: &Viewport) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::origin(),
            up: Vector3::y(),
            fov: 75f32.to_radians(),
            aspect: viewport.aspect(),
            near: 0.1,
            far: 1000.0,
            mode: ProjectionMode::Perspective,
        }
    }

    pub fn looking_at(mut self, position: Point3<f32>, target: Point3<f32>) -> Self {
        self.position = position;
        self.target = target;
        self
    }

    pub fn set_viewport(&mut self, viewport: &Viewport) {
        self.aspect = viewport.aspect();
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        match self.mode {
            ProjectionMode::Perspective => {
                Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
            }
            ProjectionMode::Orthographic => {
                let height = (self.position - self.target).norm();
                let width = height * self.aspect;
                Matrix4::new_orthographic(
                    -width / 2.0,
                    width / 2.0,
                    -height / 2.0,
                    height / 2.0,
                    self.near,
                    self.far,
                )
            }
        }
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Unit vector the camera looks along
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector3::z())
    }

    /// World-space ray through a canvas position.
    ///
    /// Perspective rays start at the camera; orthographic rays start on the
    /// near plane and travel along the view axis.
    pub fn screen_to_ray(&self, point: &ScreenPoint, viewport: &Viewport) -> Result<Ray> {
        let ndc = viewport.to_ndc(point)?;
        let inverse = self
            .view_projection()
            .try_inverse()
            .ok_or(DecalError::EmptyViewport)?;

        match self.mode {
            ProjectionMode::Perspective => {
                let through = inverse.transform_point(&Point3::new(ndc.x, ndc.y, 0.5));
                Ray::through(self.position, through)
            }
            ProjectionMode::Orthographic => {
                let origin = inverse.transform_point(&Point3::new(ndc.x, ndc.y, -1.0));
                Ray::new(origin, self.forward())
            }
        }
    }

    /// Project a world point to canvas pixels; `None` behind the camera
    pub fn world_to_screen(&self, point: &Point3<f32>, viewport: &Viewport) -> Option<ScreenProjection> {
        let clip: Vector4<f32> = self.view_projection() * point.to_homogeneous();
        if clip.w <= f32::EPSILON {
            return None;
        }

        let ndc = clip.xyz() / clip.w;
        Some(ScreenProjection {
            position: ScreenPoint::new(
                (ndc.x + 1.0) * 0.5 * viewport.width,
                (1.0 - ndc.y) * 0.5 * viewport.height,
            ),
            depth: ndc.z,
        })
    }

    /// Swing the camera around its target by `yaw` and `pitch` radians.
    ///
    /// Pitch stops just short of the poles so the view matrix stays defined.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let offset = self.position - self.target;
        let radius = offset.norm();
        if radius <= f32::EPSILON {
            return;
        }

        let limit = std::f32::consts::FRAC_PI_2 - 0.01;
        let theta = offset.x.atan2(offset.z) + yaw;
        let phi = ((offset.y / radius).clamp(-1.0, 1.0).asin() + pitch).clamp(-limit, limit);

        self.position = self.target
            + Vector3::new(
                radius * phi.cos() * theta.sin(),
                radius * phi.sin(),
                radius * phi.cos() * theta.cos(),
            );
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&Viewport::new(800.0, 600.0))
    }
}
