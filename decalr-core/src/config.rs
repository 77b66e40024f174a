//! Configurator settings
//!
//! Every field has a default, so a JSON file only needs the keys it changes.
use nalgebra::{Matrix4, Point3, Vector3};
use serde::Deserialize;

use crate::decal::{OpacityPolicy, ResizeMode};
use crate::error::AssetError;
use crate::footprint::DecalSize;
use crate::interaction::CLICK_THRESHOLD_PX;
use crate::projection::{Camera, Viewport};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-0.07, 3.741, 4.473],
            look_at: [0.0, 1.0, 0.0],
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl CameraConfig {
    pub fn build(&self, viewport: &Viewport) -> Camera {
        let mut camera = Camera::new(viewport)
            .looking_at(Point3::from(self.position), Point3::from(self.look_at));
        camera.fov = self.fov_degrees.to_radians();
        camera.near = self.near;
        camera.far = self.far;
        camera
    }
}

/// Placement of the loaded product model
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub offset: [f32; 3],
    pub scale: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            offset: [0.0, -2.0, 0.0],
            scale: 1.0,
        }
    }
}

impl ModelConfig {
    pub fn transform(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&Vector3::from(self.offset)) * Matrix4::new_scaling(self.scale)
    }
}

/// Parameters for each new decal
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DecalConfig {
    pub texture: String,
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    pub rotation_degrees: f32,
    pub opacity: f32,
    pub opacity_policy: OpacityPolicy,
    pub resize_mode: ResizeMode,
}

impl Default for DecalConfig {
    fn default() -> Self {
        Self {
            texture: "assets/images/test.png".to_string(),
            width: 0.5,
            height: 0.3,
            depth: 1.0,
            rotation_degrees: 30.0,
            opacity: 1.0,
            opacity_policy: OpacityPolicy::default(),
            resize_mode: ResizeMode::default(),
        }
    }
}

impl DecalConfig {
    pub fn size(&self) -> DecalSize {
        DecalSize::new(self.width, self.height, self.depth)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConfiguratorConfig {
    pub camera: CameraConfig,
    pub model: ModelConfig,
    pub decal: DecalConfig,
    pub click_threshold_px: f32,
    /// Record validated corners as marker helpers
    pub debug_markers: bool,
    pub light_intensity: f32,
    pub light_distance: f32,
}

impl Default for ConfiguratorConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            model: ModelConfig::default(),
            decal: DecalConfig::default(),
            click_threshold_px: CLICK_THRESHOLD_PX,
            debug_markers: false,
            light_intensity: 1.0,
            light_distance: 100.0,
        }
    }
}

impl ConfiguratorConfig {
    pub fn from_json(text: &str) -> Result<Self, AssetError> {
        serde_json::from_str(text).map_err(|e| AssetError::Parse(format!("invalid config: {e}")))
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, AssetError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_scene_setup() {
        let config = ConfiguratorConfig::default();
        assert_eq!(config.camera.position, [-0.07, 3.741, 4.473]);
        assert_eq!(config.decal.size(), DecalSize::new(0.5, 0.3, 1.0));
        assert_eq!(config.click_threshold_px, 5.0);
        assert_eq!(config.decal.opacity_policy, OpacityPolicy::Passthrough);
    }

    #[test]
    fn test_partial_json() {
        let config = ConfiguratorConfig::from_json(
            r#"{ "decal": { "width": 1.5, "opacity_policy": "clamp" }, "debug_markers": true }"#,
        )
        .unwrap();
        assert_eq!(config.decal.width, 1.5);
        assert_eq!(config.decal.height, 0.3);
        assert_eq!(config.decal.opacity_policy, OpacityPolicy::Clamp);
        assert!(config.debug_markers);
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ConfiguratorConfig::from_json("{ nope"),
            Err(AssetError::Parse(_))
        ));
    }

    #[test]
    fn test_camera_build() {
        let camera = CameraConfig::default().build(&Viewport::new(800.0, 600.0));
        assert!((camera.fov - 75f32.to_radians()).abs() < 1e-6);
        assert_eq!(camera.target, Point3::new(0.0, 1.0, 0.0));
    }
}
