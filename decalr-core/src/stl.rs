/// STL reader for product models, binary and ASCII
use std::path::Path;

use nom::{
    bytes::complete::{tag, take},
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u32},
    sequence::{preceded, tuple},
    IResult,
};

use crate::error::AssetError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, AssetError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(AssetError::Parse("file too small to be a valid STL".to_string()));
    }

    let (body, triangle_count) = le_u32::<_, nom::error::Error<&[u8]>>(&data[HEADER_LEN..])
        .map_err(|e| AssetError::Parse(format!("bad triangle count: {e:?}")))?;
    let triangle_count = triangle_count as usize;
    let facet_bytes = triangle_count
        .checked_mul(FACET_LEN)
        .ok_or_else(|| AssetError::Parse(format!("triangle count {triangle_count} is too large")))?;
    if body.len() < facet_bytes {
        return Err(AssetError::Parse(format!(
            "expected {triangle_count} facets, file ends after {}",
            body.len() / FACET_LEN
        )));
    }

    let (_, facets) = count(binary_facet, triangle_count)(body)
        .map_err(|e| AssetError::Parse(format!("bad facet: {e:?}")))?;

    let mut mesh = Mesh::with_capacity(triangle_count);
    for triangle in facets {
        mesh.add_triangle(triangle);
    }
    Ok(mesh)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Triangle> {
    let (input, normal) = le_vector3(input)?;
    let (input, v0) = le_vector3(input)?;
    let (input, v1) = le_vector3(input)?;
    let (input, v2) = le_vector3(input)?;
    // Attribute byte count
    let (input, _) = take(2usize)(input)?;
    Ok((input, facet(normal, [v0, v1, v2])))
}

fn le_vector3(input: &[u8]) -> IResult<&[u8], (f32, f32, f32)> {
    tuple((le_f32, le_f32, le_f32))(input)
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, AssetError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(AssetError::Parse(format!("failed to parse ASCII STL: {e:?}"))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(triangle);
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v0) = parse_vertex(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, facet(normal, [v0, v1, v2])))
}

fn parse_vertex(input: &str) -> IResult<&str, (f32, f32, f32)> {
    preceded(preceded(multispace0, tag("vertex")), parse_vector3)(input)
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Exporters often write zero normals; fall back to the winding normal then.
fn facet(normal: (f32, f32, f32), positions: [(f32, f32, f32); 3]) -> Triangle {
    let vertex = |(x, y, z): (f32, f32, f32), (nx, ny, nz): (f32, f32, f32)| Vertex::new(x, y, z, nx, ny, nz);
    let triangle = Triangle::new(
        vertex(positions[0], normal),
        vertex(positions[1], normal),
        vertex(positions[2], normal),
    );

    let stored = triangle.vertices[0].normal;
    if stored.norm_squared() > f32::EPSILON {
        return triangle;
    }
    let n = triangle.calculate_normal();
    let n = (n.x, n.y, n.z);
    Triangle::new(vertex(positions[0], n), vertex(positions[1], n), vertex(positions[2], n))
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, AssetError> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    if data.len() > 5 && &data[0..5] == b"solid" {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

/// Read an STL file, naming the mesh after the file stem
pub fn load_stl(path: impl AsRef<Path>) -> Result<Mesh, AssetError> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let mesh = parse_stl(&data)?;
    if mesh.is_empty() {
        return Err(AssetError::Parse(format!("{} contains no triangles", path.display())));
    }
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    log::info!("loaded {} triangles from {}", mesh.triangles.len(), path.display());
    Ok(mesh.named(name))
}
