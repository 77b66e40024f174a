//! Decal construction: surface-conforming geometry cut from the target mesh
use std::sync::Arc;

use nalgebra::{Matrix4, Point2, Point3, Vector3};
use serde::Deserialize;

use crate::asset::Texture;
use crate::error::{DecalError, Result};
use crate::footprint::{DecalFootprint, DecalSize};
use crate::geometry::normal_matrix;
use crate::scene::{MeshInstance, NodeId};
use crate::validate::DecalCorners;

/// Pulls decal fragments toward the camera so they win the depth test
/// against the surface they sit on.
pub const POLYGON_OFFSET_FACTOR: f32 = -10.0;

/// What `set_opacity` does with values outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpacityPolicy {
    /// Store the value as given
    #[default]
    Passthrough,
    Clamp,
}

/// How `resize` interprets its width and height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeMode {
    /// Multiply the current scale by `new / built size`; repeated calls compound
    #[default]
    Relative,
    /// Scale so the decal measures exactly `new`
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecalVertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
    pub uv: Point2<f32>,
}

/// Triangle list in world space, three vertices per triangle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecalGeometry {
    pub vertices: Vec<DecalVertex>,
}

impl DecalGeometry {
    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = &[DecalVertex]> {
        self.vertices.chunks_exact(3)
    }
}

/// Render state for a decal
#[derive(Debug, Clone)]
pub struct DecalMaterial {
    pub texture: Arc<Texture>,
    pub opacity: f32,
    pub transparent: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub polygon_offset: bool,
    pub polygon_offset_factor: f32,
}

impl DecalMaterial {
    pub fn new(texture: Arc<Texture>, opacity: f32) -> Self {
        Self {
            texture,
            opacity,
            transparent: true,
            depth_test: true,
            depth_write: false,
            polygon_offset: true,
            polygon_offset_factor: POLYGON_OFFSET_FACTOR,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Decal {
    pub target: NodeId,
    pub geometry: DecalGeometry,
    pub material: DecalMaterial,
    pub corners: DecalCorners,
    /// Stretch applied in the decal's plane, 1.0 as built
    pub scale: Vector3<f32>,
}

impl Decal {
    pub fn footprint(&self) -> &DecalFootprint {
        self.corners.footprint()
    }

    /// Current extent including the resize scale
    pub fn size(&self) -> DecalSize {
        let built = self.footprint().size;
        DecalSize::new(built.width * self.scale.x, built.height * self.scale.y, built.depth)
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.footprint().scale_about_center(&self.scale)
    }

    /// Vertices with the resize scale applied
    pub fn world_vertices(&self) -> impl Iterator<Item = DecalVertex> + '_ {
        let model = self.model_matrix();
        let normals = normal_matrix(&model);
        self.geometry.vertices.iter().map(move |v| DecalVertex {
            position: model.transform_point(&v.position),
            normal: (normals * v.normal).try_normalize(f32::EPSILON).unwrap_or(v.normal),
            uv: v.uv,
        })
    }
}

/// Cut a decal out of `target` for an already validated footprint
pub fn build_decal(
    target: &MeshInstance<'_>,
    texture: Arc<Texture>,
    corners: &DecalCorners,
    opacity: f32,
    policy: OpacityPolicy,
) -> Result<Decal> {
    let opacity = checked_opacity(opacity, policy)?;
    let geometry = project_geometry(target, corners.footprint());
    log::debug!(
        "built decal on '{}' with {} triangles",
        target.node.name,
        geometry.triangle_count()
    );

    Ok(Decal {
        target: target.id(),
        geometry,
        material: DecalMaterial::new(texture, opacity),
        corners: *corners,
        scale: Vector3::new(1.0, 1.0, 1.0),
    })
}

pub fn resize_decal(decal: &mut Decal, new_width: f32, new_height: f32, mode: ResizeMode) -> Result<()> {
    let built = decal.footprint().size;
    for value in [new_width, new_height] {
        if !value.is_finite() || value <= 0.0 {
            return Err(DecalError::InvalidFootprint(format!(
                "resize extent must be positive, got {value}"
            )));
        }
    }

    let factor_x = new_width / built.width;
    let factor_y = new_height / built.height;
    match mode {
        ResizeMode::Relative => {
            decal.scale.x *= factor_x;
            decal.scale.y *= factor_y;
        }
        ResizeMode::Absolute => {
            decal.scale.x = factor_x;
            decal.scale.y = factor_y;
        }
    }
    Ok(())
}

pub fn set_decal_opacity(decal: &mut Decal, opacity: f32, policy: OpacityPolicy) -> Result<()> {
    decal.material.opacity = checked_opacity(opacity, policy)?;
    Ok(())
}

fn checked_opacity(opacity: f32, policy: OpacityPolicy) -> Result<f32> {
    if !opacity.is_finite() {
        return Err(DecalError::InvalidOpacity(opacity));
    }
    Ok(match policy {
        OpacityPolicy::Passthrough => opacity,
        OpacityPolicy::Clamp => opacity.clamp(0.0, 1.0),
    })
}

#[derive(Debug, Clone, Copy)]
struct ClipVertex {
    /// Position in projector space
    position: Vector3<f32>,
    /// Normal in world space
    normal: Vector3<f32>,
}

impl ClipVertex {
    fn lerp(&self, other: &ClipVertex, t: f32) -> ClipVertex {
        ClipVertex {
            position: self.position.lerp(&other.position, t),
            normal: self.normal.lerp(&other.normal, t),
        }
    }
}

/// Clip every triangle of `target` to the footprint's box and map the pieces
/// back to world space.
fn project_geometry(target: &MeshInstance<'_>, footprint: &DecalFootprint) -> DecalGeometry {
    let projector = footprint.projector();
    let to_projector = projector.inverse().to_homogeneous() * target.world;
    let normals = normal_matrix(&target.world);
    let half = footprint.size.half_extents();
    let size = footprint.size;

    let mut geometry = DecalGeometry::default();
    for triangle in &target.mesh.triangles {
        let face_normal = triangle.calculate_normal();
        let polygon: Vec<ClipVertex> = triangle
            .vertices
            .iter()
            .map(|v| {
                let normal = if v.normal.norm_squared() > f32::EPSILON {
                    v.normal
                } else {
                    face_normal
                };
                ClipVertex {
                    position: to_projector.transform_point(&v.position).coords,
                    normal: normals * normal,
                }
            })
            .collect();

        let polygon = clip_to_box(polygon, &half);
        if polygon.len() < 3 {
            continue;
        }

        let to_world = |v: &ClipVertex| DecalVertex {
            position: projector.transform_point(&Point3::from(v.position)),
            normal: v.normal.try_normalize(f32::EPSILON).unwrap_or(v.normal),
            uv: Point2::new(
                v.position.x / size.width + 0.5,
                v.position.y / size.height + 0.5,
            ),
        };
        for i in 1..polygon.len() - 1 {
            geometry.vertices.push(to_world(&polygon[0]));
            geometry.vertices.push(to_world(&polygon[i]));
            geometry.vertices.push(to_world(&polygon[i + 1]));
        }
    }
    geometry
}

/// Sutherland–Hodgman against the six planes `|p[axis]| <= half[axis]`
fn clip_to_box(mut polygon: Vec<ClipVertex>, half: &Vector3<f32>) -> Vec<ClipVertex> {
    for axis in 0..3 {
        for sign in [1.0f32, -1.0] {
            polygon = clip_against_plane(&polygon, axis, sign, half[axis]);
            if polygon.len() < 3 {
                return Vec::new();
            }
        }
    }
    polygon
}

fn clip_against_plane(polygon: &[ClipVertex], axis: usize, sign: f32, limit: f32) -> Vec<ClipVertex> {
    // Signed distance, negative inside
    let distance = |v: &ClipVertex| sign * v.position[axis] - limit;

    let mut output = Vec::with_capacity(polygon.len() + 1);
    for (i, current) in polygon.iter().enumerate() {
        let next = &polygon[(i + 1) % polygon.len()];
        let d_current = distance(current);
        let d_next = distance(next);

        if d_current <= 0.0 {
            output.push(*current);
        }
        if (d_current <= 0.0) != (d_next <= 0.0) {
            let t = d_current / (d_current - d_next);
            output.push(current.lerp(next, t));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Mesh;
    use crate::orientation::solve_orientation;
    use crate::scene::SceneNode;
    use crate::validate::validate_corners;
    use approx::assert_relative_eq;

    fn placed(node: &SceneNode, width: f32, height: f32) -> Decal {
        let target = MeshInstance::from_node(node, node.transform).unwrap();
        let center = Point3::origin();
        let orientation = solve_orientation(&center, &Point3::new(0.0, 0.0, 5.0), 0.0).unwrap();
        let footprint =
            DecalFootprint::new(center, orientation, DecalSize::new(width, height, 1.0)).unwrap();
        let corners = validate_corners(&target, &footprint).unwrap();
        let texture = Arc::new(Texture::solid("test.png", [255, 0, 0, 255]));
        build_decal(&target, texture, &corners, 1.0, OpacityPolicy::Passthrough).unwrap()
    }

    fn area(decal: &Decal) -> f32 {
        decal
            .geometry
            .triangles()
            .map(|t| (t[1].position - t[0].position).cross(&(t[2].position - t[0].position)).norm() / 2.0)
            .sum()
    }

    #[test]
    fn test_decal_on_plane_matches_footprint() {
        let node = SceneNode::mesh(Mesh::plane(10.0, 10.0));
        let decal = placed(&node, 0.5, 0.3);

        assert!(decal.geometry.triangle_count() >= 2);
        assert_relative_eq!(area(&decal), 0.15, epsilon = 1e-4);
        for v in &decal.geometry.vertices {
            assert!(v.position.z.abs() < 1e-5);
            assert!(v.position.x.abs() <= 0.25 + 1e-5);
            assert!(v.position.y.abs() <= 0.15 + 1e-5);
            assert!((0.0 - 1e-5..=1.0 + 1e-5).contains(&v.uv.x));
            assert!((0.0 - 1e-5..=1.0 + 1e-5).contains(&v.uv.y));
            assert_relative_eq!(v.normal, Vector3::z(), epsilon = 1e-5);
        }
        assert_eq!(decal.target, node.id());
    }

    #[test]
    fn test_material_render_state() {
        let node = SceneNode::mesh(Mesh::plane(10.0, 10.0));
        let decal = placed(&node, 0.5, 0.3);
        let material = &decal.material;
        assert!(material.transparent && material.depth_test && material.polygon_offset);
        assert!(!material.depth_write);
        assert_eq!(material.polygon_offset_factor, -10.0);
    }

    #[test]
    fn test_geometry_wraps_cube_edge() {
        // Seen from above and in front, a decal near the top of the front
        // face reaches over the edge onto the top face.
        let node = SceneNode::mesh(Mesh::cube(2.0));
        let target = MeshInstance::from_node(&node, node.transform).unwrap();
        let center = Point3::new(0.0, 0.9, 1.0);
        let orientation = solve_orientation(&center, &Point3::new(0.0, 5.9, 6.0), 0.0).unwrap();
        let footprint =
            DecalFootprint::new(center, orientation, DecalSize::new(0.4, 0.4, 1.0)).unwrap();
        let corners = validate_corners(&target, &footprint).unwrap();
        let decal = build_decal(
            &target,
            Arc::new(Texture::solid("t", [0; 4])),
            &corners,
            1.0,
            OpacityPolicy::Passthrough,
        )
        .unwrap();

        let on_top = decal.geometry.vertices.iter().any(|v| (v.position.y - 1.0).abs() < 1e-5 && v.position.z < 0.99);
        assert!(on_top);
    }

    #[test]
    fn test_relative_resize_compounds() {
        let node = SceneNode::mesh(Mesh::plane(10.0, 10.0));
        let mut decal = placed(&node, 0.5, 0.3);
        resize_decal(&mut decal, 1.0, 0.3, ResizeMode::Relative).unwrap();
        assert_relative_eq!(decal.size().width, 1.0, epsilon = 1e-6);
        resize_decal(&mut decal, 1.0, 0.3, ResizeMode::Relative).unwrap();
        assert_relative_eq!(decal.size().width, 2.0, epsilon = 1e-6);
        assert_relative_eq!(decal.size().height, 0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_absolute_resize() {
        let node = SceneNode::mesh(Mesh::plane(10.0, 10.0));
        let mut decal = placed(&node, 0.5, 0.3);
        resize_decal(&mut decal, 1.0, 0.6, ResizeMode::Absolute).unwrap();
        resize_decal(&mut decal, 1.0, 0.6, ResizeMode::Absolute).unwrap();
        assert_relative_eq!(decal.size().width, 1.0, epsilon = 1e-6);
        assert_relative_eq!(decal.size().height, 0.6, epsilon = 1e-6);

        let xs: Vec<f32> = decal.world_vertices().map(|v| v.position.x).collect();
        let max = xs.iter().cloned().fold(f32::MIN, f32::max);
        assert_relative_eq!(max, 0.5, epsilon = 1e-5);
        assert!(resize_decal(&mut decal, 0.0, 1.0, ResizeMode::Absolute).is_err());
    }

    #[test]
    fn test_opacity_policies() {
        let node = SceneNode::mesh(Mesh::plane(10.0, 10.0));
        let mut decal = placed(&node, 0.5, 0.3);
        set_decal_opacity(&mut decal, 1.4, OpacityPolicy::Passthrough).unwrap();
        assert_eq!(decal.material.opacity, 1.4);
        set_decal_opacity(&mut decal, 1.4, OpacityPolicy::Clamp).unwrap();
        assert_eq!(decal.material.opacity, 1.0);
        set_decal_opacity(&mut decal, -0.5, OpacityPolicy::Clamp).unwrap();
        assert_eq!(decal.material.opacity, 0.0);
        assert!(matches!(
            set_decal_opacity(&mut decal, f32::NAN, OpacityPolicy::Clamp),
            Err(DecalError::InvalidOpacity(_))
        ));
    }

    #[test]
    fn test_clip_triangle_outside_box() {
        let v = |x: f32, y: f32| ClipVertex {
            position: Vector3::new(x, y, 0.0),
            normal: Vector3::z(),
        };
        let half = Vector3::new(1.0, 1.0, 1.0);
        assert!(clip_to_box(vec![v(2.0, 2.0), v(3.0, 2.0), v(3.0, 3.0)], &half).is_empty());
        let clipped = clip_to_box(vec![v(0.0, 0.0), v(4.0, 0.0), v(0.0, 4.0)], &half);
        assert!(clipped.len() >= 3);
        assert!(clipped.iter().all(|c| c.position.x <= 1.0 + 1e-6 && c.position.y <= 1.0 + 1e-6));
    }
}
