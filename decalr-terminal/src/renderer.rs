/// ASCII rasterizer for the configurator viewport
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use decalr_core::decal::DecalVertex;
use decalr_core::geometry::normal_matrix;
use decalr_core::scene::Helper;
use decalr_core::{Camera, Decal, Mesh, NodeKind, SceneNode, Viewport};
use nalgebra::{Matrix4, Point2, Point3, Vector3};
use std::io::Write;

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: f32 = 2.0;

/// Depth bias for decal fragments, the rasterizer's polygon offset
const DECAL_DEPTH_BIAS: f32 = 1e-4;

/// Texels more transparent than this leave the surface visible
const ALPHA_CUTOFF: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: Color,
}

const BLANK: Cell = Cell {
    character: ' ',
    color: Color::Reset,
};

/// A vertex after projection to cell coordinates
#[derive(Debug, Clone, Copy)]
struct Projected {
    x: f32,
    y: f32,
    depth: f32,
}

/// ASCII renderer that converts the configurator scene to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![BLANK; size],
        }
    }

    /// Viewport in "pixels": one unit per column, `CELL_ASPECT` units per row
    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width as f32, self.height as f32 * CELL_ASPECT)
    }

    /// Pixel position of the centre of a terminal cell
    pub fn cell_to_screen(column: u16, row: u16) -> Point2<f32> {
        Point2::new(column as f32 + 0.5, (row as f32 + 0.5) * CELL_ASPECT)
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(BLANK);
    }

    /// Draw every mesh and marker under `nodes`
    pub fn render_scene(&mut self, nodes: &[SceneNode], camera: &Camera) {
        let identity = Matrix4::identity();
        for node in nodes {
            self.render_node(node, &identity, camera);
        }
    }

    fn render_node(&mut self, node: &SceneNode, parent: &Matrix4<f32>, camera: &Camera) {
        let world = parent * node.transform;
        match &node.kind {
            NodeKind::Mesh(mesh) => self.render_mesh(mesh, &world, camera),
            NodeKind::Helper(Helper::Marker { .. }) => {
                self.render_marker(&world.transform_point(&Point3::origin()), camera)
            }
            _ => {}
        }
        for child in &node.children {
            self.render_node(child, &world, camera);
        }
    }

    pub fn render_mesh(&mut self, mesh: &Mesh, world: &Matrix4<f32>, camera: &Camera) {
        let normals = normal_matrix(world);
        // Headlight shading, lit from the camera
        let light_dir = -camera.forward();

        for triangle in &mesh.triangles {
            let world_triangle = triangle.transformed(world, &normals);
            let Some(coords) = self.project_all(&world_triangle.positions(), camera) else {
                continue;
            };

            // Models are shaded double-sided
            let normal = world_triangle.calculate_normal();
            let brightness = normal.dot(&light_dir).abs();

            let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32) as usize;
            let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];
            let color = match mesh.color {
                Some(base) => shaded_color(base, brightness),
                None => ramp_color(character),
            };
            let cell = Cell { character, color };

            self.rasterize_triangle(&coords, 0.0, |_| Some(cell));
        }
    }

    /// Draw a decal's triangles with colours sampled from its texture
    pub fn render_decal(&mut self, decal: &Decal, camera: &Camera) {
        let vertices: Vec<DecalVertex> = decal.world_vertices().collect();
        let texture = &decal.material.texture;
        let opacity = decal.material.opacity;

        for triangle in vertices.chunks_exact(3) {
            let positions = [triangle[0].position, triangle[1].position, triangle[2].position];
            let Some(coords) = self.project_all(&positions, camera) else {
                continue;
            };
            let uvs = [triangle[0].uv, triangle[1].uv, triangle[2].uv];

            self.rasterize_triangle(&coords, DECAL_DEPTH_BIAS, |weights| {
                let uv = Point2::from(
                    uvs[0].coords * weights[0] + uvs[1].coords * weights[1] + uvs[2].coords * weights[2],
                );
                let [r, g, b, a] = texture.sample(&uv);
                if (a as f32 / 255.0) * opacity < ALPHA_CUTOFF {
                    return None;
                }
                Some(Cell {
                    character: '█',
                    color: Color::Rgb { r, g, b },
                })
            });
        }
    }

    /// Draw a corner marker on top of everything
    pub fn render_marker(&mut self, point: &Point3<f32>, camera: &Camera) {
        let Some(p) = self.project(point, camera) else {
            return;
        };
        let (x, y) = (p.x.floor() as i32, p.y.floor() as i32);
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width + x as usize;
        self.depth_buffer[idx] = f32::NEG_INFINITY;
        self.cells[idx] = Cell {
            character: 'o',
            color: Color::Yellow,
        };
    }

    fn project(&self, point: &Point3<f32>, camera: &Camera) -> Option<Projected> {
        let projected = camera.world_to_screen(point, &self.viewport())?;
        Some(Projected {
            x: projected.position.x,
            y: projected.position.y / CELL_ASPECT,
            depth: projected.depth,
        })
    }

    /// `None` when any vertex is behind the camera
    fn project_all(&self, positions: &[Point3<f32>; 3], camera: &Camera) -> Option<[Projected; 3]> {
        Some([
            self.project(&positions[0], camera)?,
            self.project(&positions[1], camera)?,
            self.project(&positions[2], camera)?,
        ])
    }

    fn rasterize_triangle<F>(&mut self, coords: &[Projected; 3], bias: f32, mut shade: F)
    where
        F: FnMut(Vector3<f32>) -> Option<Cell>,
    {
        let [v0, v1, v2] = *coords;

        // Bounding box
        let min_x = v0.x.min(v1.x).min(v2.x).floor() as i32;
        let max_x = v0.x.max(v1.x).max(v2.x).ceil() as i32;
        let min_y = v0.y.min(v1.y).min(v2.y).floor() as i32;
        let max_y = v0.y.max(v1.y).max(v2.y).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some(weights) = barycentric((v0.x, v0.y), (v1.x, v1.y), (v2.x, v2.y), (px, py)) else {
                    continue;
                };
                if weights.iter().any(|w| *w < 0.0) {
                    continue;
                }

                let depth = weights.x * v0.depth + weights.y * v1.depth + weights.z * v2.depth - bias;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    if let Some(cell) = shade(weights) {
                        self.depth_buffer[idx] = depth;
                        self.cells[idx] = cell;
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = self.cells[y * self.width + x];
                writer.queue(SetForegroundColor(cell.color))?;
                writer.queue(Print(cell.character))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }

    #[cfg(test)]
    fn character_at(&self, x: usize, y: usize) -> char {
        self.cells[y * self.width + x].character
    }

    #[cfg(test)]
    fn color_at(&self, x: usize, y: usize) -> Color {
        self.cells[y * self.width + x].color
    }
}

/// Color based on character intensity
fn ramp_color(c: char) -> Color {
    match c {
        ' ' | '.' | ':' => Color::DarkGrey,
        '-' | '=' => Color::Grey,
        '+' | '*' => Color::White,
        '#' | '%' | '@' => Color::Cyan,
        _ => Color::White,
    }
}

/// Base colour dimmed by headlight brightness, never fully black
fn shaded_color([r, g, b]: [u8; 3], brightness: f32) -> Color {
    let shade = 0.3 + 0.7 * brightness.clamp(0.0, 1.0);
    let scale = |channel: u8| (channel as f32 * shade).round() as u8;
    Color::Rgb {
        r: scale(r),
        g: scale(g),
        b: scale(b),
    }
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(v0: (f32, f32), v1: (f32, f32), v2: (f32, f32), p: (f32, f32)) -> Option<Vector3<f32>> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some(Vector3::new(w0, w1, w2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use decalr_core::Viewport;

    fn camera_for(renderer: &AsciiRenderer) -> Camera {
        Camera::new(&renderer.viewport()).looking_at(Point3::new(0.0, 0.0, 5.0), Point3::origin())
    }

    #[test]
    fn test_barycentric_inside_and_degenerate() {
        let w = barycentric((0.0, 0.0), (4.0, 0.0), (0.0, 4.0), (1.0, 1.0)).unwrap();
        assert!(w.iter().all(|c| *c >= 0.0));
        assert!((w.sum() - 1.0).abs() < 1e-6);
        assert!(barycentric((0.0, 0.0), (1.0, 1.0), (2.0, 2.0), (1.0, 0.0)).is_none());
    }

    #[test]
    fn test_viewport_uses_cell_aspect() {
        let renderer = AsciiRenderer::new(80, 24);
        assert_eq!(renderer.viewport(), Viewport::new(80.0, 48.0));
        assert_eq!(AsciiRenderer::cell_to_screen(0, 1), Point2::new(0.5, 3.0));
    }

    #[test]
    fn test_mesh_fills_center_cell() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let camera = camera_for(&renderer);
        renderer.render_mesh(&Mesh::plane(2.0, 2.0), &Matrix4::identity(), &camera);
        assert_ne!(renderer.character_at(20, 10), ' ');
        assert_eq!(renderer.character_at(0, 0), ' ');
    }

    #[test]
    fn test_recoloured_mesh_is_tinted() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let camera = camera_for(&renderer);
        let mut plane = Mesh::plane(2.0, 2.0);
        renderer.render_mesh(&plane, &Matrix4::identity(), &camera);
        assert_eq!(renderer.color_at(20, 10), Color::Cyan);

        plane.color = Some([200, 100, 0]);
        renderer.clear();
        renderer.render_mesh(&plane, &Matrix4::identity(), &camera);
        assert_eq!(renderer.color_at(20, 10), Color::Rgb { r: 200, g: 100, b: 0 });
    }

    #[test]
    fn test_shading_keeps_some_colour() {
        assert_eq!(shaded_color([100, 100, 100], 0.0), Color::Rgb { r: 30, g: 30, b: 30 });
    }

    #[test]
    fn test_marker_drawn_over_mesh() {
        let mut renderer = AsciiRenderer::new(40, 20);
        let camera = camera_for(&renderer);
        renderer.render_mesh(&Mesh::plane(2.0, 2.0), &Matrix4::identity(), &camera);
        renderer.render_marker(&Point3::origin(), &camera);
        assert_eq!(renderer.character_at(20, 10), 'o');
    }
}
