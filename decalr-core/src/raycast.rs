//! Ray queries against meshes and scene hierarchies
use nalgebra::{Matrix4, Point3, Unit, Vector3};

use crate::geometry::{normal_matrix, Triangle};
use crate::ray::Ray;
use crate::scene::{MeshInstance, NodeKind, SceneNode};

const EPSILON: f32 = 1e-7;

/// Closest intersection of a ray with a mesh
#[derive(Debug, Clone, Copy)]
pub struct SurfaceHit<'a> {
    pub point: Point3<f32>,
    /// Face normal in world space
    pub normal: Unit<Vector3<f32>>,
    /// World-space distance from the ray origin
    pub distance: f32,
    pub target: MeshInstance<'a>,
}

/// Distance window applied to every query, in world units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Raycaster {
    pub near: f32,
    pub far: f32,
}

impl Default for Raycaster {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: f32::INFINITY,
        }
    }
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_far(mut self, far: f32) -> Self {
        self.far = far;
        self
    }

    /// Closest mesh hit among `candidates`.
    ///
    /// Lights, helpers and groups are never reported. With `recursive` the
    /// children of every candidate are searched as well.
    pub fn cast_ray<'a>(
        &self,
        ray: &Ray,
        candidates: &'a [SceneNode],
        recursive: bool,
    ) -> Option<SurfaceHit<'a>> {
        let identity = Matrix4::identity();
        let mut closest = None;
        for node in candidates {
            self.visit(ray, node, &identity, recursive, &mut closest);
        }
        closest
    }

    fn visit<'a>(
        &self,
        ray: &Ray,
        node: &'a SceneNode,
        parent: &Matrix4<f32>,
        recursive: bool,
        closest: &mut Option<SurfaceHit<'a>>,
    ) {
        let world = parent * node.transform;

        match &node.kind {
            NodeKind::Mesh(mesh) => {
                let target = MeshInstance { node, mesh, world };
                if let Some(hit) = self.cast_ray_against_mesh(ray, &target) {
                    if closest.map_or(true, |best| hit.distance < best.distance) {
                        *closest = Some(hit);
                    }
                }
            }
            NodeKind::Light(_) | NodeKind::Helper(_) | NodeKind::Group => {}
        }

        if recursive {
            for child in &node.children {
                self.visit(ray, child, &world, recursive, closest);
            }
        }
    }

    /// Closest hit on a single mesh instance
    pub fn cast_ray_against_mesh<'a>(&self, ray: &Ray, target: &MeshInstance<'a>) -> Option<SurfaceHit<'a>> {
        let inverse = target.world.try_inverse()?;
        let local_ray = ray.transformed(&inverse)?;

        let mut closest: Option<(f32, &Triangle)> = None;
        for triangle in &target.mesh.triangles {
            if let Some(t) = intersect_triangle(&local_ray, triangle) {
                if closest.map_or(true, |(best, _)| t < best) {
                    closest = Some((t, triangle));
                }
            }
        }

        // Local distances are not comparable across scaled instances, so the
        // distance window is checked in world space.
        let (t, triangle) = closest?;
        let point = target.world.transform_point(&local_ray.at(t));
        let distance = (point - ray.origin).norm();
        if distance < self.near || distance > self.far {
            return None;
        }

        let normal = Unit::try_new(
            normal_matrix(&target.world) * triangle.calculate_normal(),
            f32::EPSILON,
        )?;

        Some(SurfaceHit {
            point,
            normal,
            distance,
            target: *target,
        })
    }
}

/// Möller–Trumbore ray-triangle intersection, both faces.
///
/// Returns the distance along the ray for hits in front of its origin.
pub fn intersect_triangle(ray: &Ray, triangle: &Triangle) -> Option<f32> {
    let [v0, v1, v2] = triangle.positions();
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);
    if a.abs() < EPSILON {
        return None; // parallel to the triangle plane
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    (t > EPSILON).then_some(t)
}
