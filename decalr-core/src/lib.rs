/// Decalr Core Library - Decal projection onto product models
///
/// This library provides the renderer-independent core of the configurator:
/// STL loading, the scene graph, screen/world projection, raycasting,
/// decal orientation, corner validation and decal mesh construction.

pub mod asset;
pub mod config;
pub mod configurator;
pub mod decal;
pub mod error;
pub mod footprint;
pub mod geometry;
pub mod interaction;
pub mod orientation;
pub mod projection;
pub mod ray;
pub mod raycast;
pub mod scene;
pub mod stl;
pub mod validate;

// Re-export commonly used types
pub use asset::{StaticTextureSource, Texture, TextureRequest, TextureResolver, TextureSource};
pub use config::ConfiguratorConfig;
pub use configurator::{Configurator, DecalId, ErrorPresenter, LogPresenter, PlacementOutcome};
pub use decal::{build_decal, resize_decal, set_decal_opacity, Decal, OpacityPolicy, ResizeMode};
pub use error::{AssetError, DecalError, Result};
pub use footprint::{DecalFootprint, DecalSize};
pub use geometry::{Mesh, Triangle, Vertex};
pub use interaction::{Click, InteractionController};
pub use orientation::solve_orientation;
pub use projection::{Camera, ProjectionMode, ScreenPoint, Viewport};
pub use ray::Ray;
pub use raycast::{Raycaster, SurfaceHit};
pub use scene::{MeshInstance, NodeId, NodeKind, Scene, SceneNode};
pub use validate::{compute_and_validate_corners, DecalCorners, ValidationObserver};
