//! Mesh primitives the decal pipeline raycasts against and projects onto
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Face normal from the winding order.
    ///
    /// Returns the zero vector for degenerate (zero-area) triangles.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let [v0, v1, v2] = self.positions();
        (v1 - v0)
            .cross(&(v2 - v0))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }

    pub fn positions(&self) -> [Point3<f32>; 3] {
        [
            self.vertices[0].position,
            self.vertices[1].position,
            self.vertices[2].position,
        ]
    }

    /// Copy of this triangle with positions and normals moved by `matrix`
    pub fn transformed(&self, matrix: &Matrix4<f32>, normal_matrix: &Matrix3<f32>) -> Self {
        let map = |v: &Vertex| Vertex {
            position: matrix.transform_point(&v.position),
            normal: (normal_matrix * v.normal)
                .try_normalize(f32::EPSILON)
                .unwrap_or(v.normal),
        };
        Self::new(
            map(&self.vertices[0]),
            map(&self.vertices[1]),
            map(&self.vertices[2]),
        )
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub triangles: Vec<Triangle>,
    /// Base material colour, `None` until a part is recoloured
    pub color: Option<[u8; 3]>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            name: String::new(),
            triangles: Vec::with_capacity(capacity),
            color: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// A flat rectangle in the XY plane facing +Z, centred on the origin
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width / 2.0, height / 2.0);
        let corner = |x: f32, y: f32| Vertex::new(x, y, 0.0, 0.0, 0.0, 1.0);
        let mut mesh = Self::with_capacity(2).named("plane");
        mesh.add_triangle(Triangle::new(corner(-hw, -hh), corner(hw, -hh), corner(hw, hh)));
        mesh.add_triangle(Triangle::new(corner(-hw, -hh), corner(hw, hh), corner(-hw, hh)));
        mesh
    }

    /// An axis-aligned cube centred on the origin
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let mut mesh = Self::with_capacity(12).named("cube");

        // (normal, u axis, v axis); u x v == normal keeps the winding outward
        let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ];

        for (n, u, v) in faces {
            let n = Vector3::from(n);
            let u = Vector3::from(u);
            let v = Vector3::from(v);
            let vertex = |su: f32, sv: f32| {
                let p = (n + u * su + v * sv) * half;
                Vertex {
                    position: Point3::from(p),
                    normal: n,
                }
            };
            mesh.add_triangle(Triangle::new(vertex(-1.0, -1.0), vertex(1.0, -1.0), vertex(1.0, 1.0)));
            mesh.add_triangle(Triangle::new(vertex(-1.0, -1.0), vertex(1.0, 1.0), vertex(-1.0, 1.0)));
        }

        mesh
    }
}

/// Inverse-transpose of the upper 3x3 block, for carrying normals through `matrix`
pub fn normal_matrix(matrix: &Matrix4<f32>) -> Matrix3<f32> {
    let linear = matrix.fixed_view::<3, 3>(0, 0).into_owned();
    linear
        .try_inverse()
        .map(|inv| inv.transpose())
        .unwrap_or(linear)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_normals_match_winding() {
        let cube = Mesh::cube(2.0);
        assert_eq!(cube.triangles.len(), 12);
        for triangle in &cube.triangles {
            let winding = triangle.calculate_normal();
            assert!((winding - triangle.vertices[0].normal).norm() < 1e-6);
        }
    }

    #[test]
    fn test_plane_spans_extent() {
        let plane = Mesh::plane(4.0, 2.0);
        assert!(plane.color.is_none());
        let corner = plane.triangles[0].vertices[2].position;
        assert_eq!(corner, Point3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_degenerate_triangle_normal() {
        let v = Vertex::new(1.0, 1.0, 1.0, 0.0, 0.0, 1.0);
        assert_eq!(Triangle::new(v, v, v).calculate_normal(), Vector3::zeros());
    }

    #[test]
    fn test_transformed_triangle() {
        let plane = Mesh::plane(2.0, 2.0);
        let m = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let moved = plane.triangles[0].transformed(&m, &normal_matrix(&m));
        assert_eq!(moved.vertices[1].position, Point3::new(2.0, -1.0, 0.0));
        assert!((moved.vertices[1].normal - Vector3::z()).norm() < 1e-6);
    }
}
