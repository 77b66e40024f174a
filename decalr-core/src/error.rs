//! Error types shared by the decal pipeline

use thiserror::Error;

/// Failures while resolving external assets (models and textures)
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse model: {0}")]
    Parse(String),

    #[error("Failed to decode texture: {0}")]
    Decode(String),

    #[error("Asset loader dropped the request before completing it")]
    Disconnected,
}

/// Caller-contract violations and user-facing placement failures.
///
/// Expected geometric outcomes (a ray hitting nothing, a footprint that does
/// not fit) are reported as `None` by the geometry functions; this type only
/// appears once such an outcome has to be surfaced to the user.
#[derive(Error, Debug)]
pub enum DecalError {
    #[error("Surface point coincides with the viewer position")]
    DegenerateView,

    #[error("Ray direction has zero length")]
    ZeroDirection,

    #[error("Node '{0}' is not a mesh")]
    NotAMesh(String),

    #[error("Invalid footprint: {0}")]
    InvalidFootprint(String),

    #[error("Opacity must be a finite number, got {0}")]
    InvalidOpacity(f32),

    #[error("We cannot determine corners for this projection parameter")]
    ProjectionInfeasible,

    #[error("Object with name \"{0}\" not found in the model")]
    ObjectNotFound(String),

    #[error("Viewport has zero area")]
    EmptyViewport,

    #[error(transparent)]
    Asset(#[from] AssetError),
}

impl DecalError {
    /// Short title for an error dialog
    pub fn title(&self) -> &'static str {
        match self {
            DecalError::ProjectionInfeasible => "Intersection Is Not Possible",
            DecalError::Asset(_) => "Failed To Load Asset",
            DecalError::ObjectNotFound(_) => "Object Not Found",
            _ => "Failed To Apply Texture",
        }
    }
}

pub type Result<T> = std::result::Result<T, DecalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_titles() {
        assert_eq!(DecalError::ProjectionInfeasible.title(), "Intersection Is Not Possible");
        assert_eq!(
            DecalError::NotAMesh("grid".to_string()).title(),
            "Failed To Apply Texture"
        );
        let err: DecalError = AssetError::Disconnected.into();
        assert_eq!(err.title(), "Failed To Load Asset");
        let err = DecalError::ObjectNotFound("lid".to_string());
        assert_eq!(err.title(), "Object Not Found");
        assert_eq!(err.to_string(), "Object with name \"lid\" not found in the model");
    }
}
