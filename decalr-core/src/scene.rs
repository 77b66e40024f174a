//! Scene graph nodes
//!
//! Node kinds are an explicit enum so raycast candidate filtering is decided
//! by a `match` rather than by inspecting the node at runtime.
use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::{DecalError, Result};
use crate::geometry::Mesh;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    Directional {
        color: [f32; 3],
        intensity: f32,
        target: Point3<f32>,
    },
}

/// Editor aids drawn in the viewport but never part of the product
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Helper {
    Grid { size: f32, divisions: u32 },
    Axes { size: f32 },
    /// Marker left at a validated decal corner
    Marker { radius: f32 },
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Mesh(Mesh),
    Light(Light),
    Helper(Helper),
    Group,
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    id: NodeId,
    pub name: String,
    /// Transform relative to the parent node
    pub transform: Matrix4<f32>,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            transform: Matrix4::identity(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn mesh(mesh: Mesh) -> Self {
        let name = mesh.name.clone();
        Self::new(name, NodeKind::Mesh(mesh))
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn with_transform(mut self, transform: Matrix4<f32>) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// Depth-first search for `id`, returning the node and its world transform
    pub fn find(&self, id: NodeId, parent: &Matrix4<f32>) -> Option<(&SceneNode, Matrix4<f32>)> {
        let world = parent * self.transform;
        if self.id == id {
            return Some((self, world));
        }
        self.children.iter().find_map(|child| child.find(id, &world))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    /// Set the base colour of every mesh named `name` in this subtree.
    ///
    /// Returns how many meshes matched.
    pub fn recolor_meshes(&mut self, name: &str, color: [u8; 3]) -> usize {
        let mut matched = 0;
        if let NodeKind::Mesh(mesh) = &mut self.kind {
            if self.name == name {
                mesh.color = Some(color);
                matched += 1;
            }
        }
        for child in &mut self.children {
            matched += child.recolor_meshes(name, color);
        }
        matched
    }
}

/// A mesh node paired with its accumulated world transform
#[derive(Debug, Clone, Copy)]
pub struct MeshInstance<'a> {
    pub node: &'a SceneNode,
    pub mesh: &'a Mesh,
    pub world: Matrix4<f32>,
}

impl<'a> MeshInstance<'a> {
    /// Fails with `NotAMesh` for lights, helpers and groups
    pub fn from_node(node: &'a SceneNode, world: Matrix4<f32>) -> Result<Self> {
        match &node.kind {
            NodeKind::Mesh(mesh) => Ok(Self { node, mesh, world }),
            _ => Err(DecalError::NotAMesh(node.name.clone())),
        }
    }

    pub fn id(&self) -> NodeId {
        self.node.id()
    }
}

/// Root container for everything the viewport shows
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: SceneNode) -> NodeId {
        let id = node.id();
        self.nodes.push(node);
        id
    }

    pub fn remove(&mut self, id: NodeId) -> Option<SceneNode> {
        let index = self.nodes.iter().position(|node| node.id() == id)?;
        Some(self.nodes.remove(index))
    }

    pub fn find(&self, id: NodeId) -> Option<(&SceneNode, Matrix4<f32>)> {
        let identity = Matrix4::identity();
        self.nodes.iter().find_map(|node| node.find(id, &identity))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.iter_mut().find_map(|node| node.find_mut(id))
    }

    /// Resolve a node as a mesh instance, for the builder and validator
    pub fn mesh_instance(&self, id: NodeId) -> Option<Result<MeshInstance<'_>>> {
        self.find(id)
            .map(|(node, world)| MeshInstance::from_node(node, world))
    }

    /// Ground grid and axes helpers, 50 units across
    pub fn add_grid_helpers(&mut self) {
        self.add(SceneNode::new(
            "grid",
            NodeKind::Helper(Helper::Grid {
                size: 50.0,
                divisions: 50,
            }),
        ));
        self.add(SceneNode::new("axes", NodeKind::Helper(Helper::Axes { size: 50.0 })));
    }

    /// Six white directional lights at `distance` along each axis, aimed at the origin
    pub fn add_light_rig(&mut self, intensity: f32, distance: f32) {
        let rig = [
            ("light-front", Vector3::new(0.0, 0.0, distance)),
            ("light-back", Vector3::new(0.0, 0.0, -distance)),
            ("light-right", Vector3::new(distance, 0.0, 0.0)),
            ("light-left", Vector3::new(-distance, 0.0, 0.0)),
            ("light-top", Vector3::new(0.0, distance, 0.0)),
            ("light-bottom", Vector3::new(0.0, -distance, 0.0)),
        ];
        for (name, position) in rig {
            let light = Light::Directional {
                color: [1.0, 1.0, 1.0],
                intensity,
                target: Point3::origin(),
            };
            self.add(
                SceneNode::new(name, NodeKind::Light(light))
                    .with_transform(Matrix4::new_translation(&position)),
            );
        }
    }
}
