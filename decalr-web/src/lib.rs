/// Decalr Web - WASM bindings for the decal configurator
///
/// The page owns rendering; this crate runs the placement pipeline against
/// canvas pointer events and hands decal geometry back as flat arrays.
use decalr_core::{
    stl, Configurator, ConfiguratorConfig, ErrorPresenter, PlacementOutcome, ScreenPoint, SceneNode,
    StaticTextureSource, Texture, TextureRequest, TextureSource, Viewport,
};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Texture slot the page fills with `set_texture`
#[derive(Debug, Clone, Default)]
struct SharedTextures(Rc<RefCell<StaticTextureSource>>);

impl TextureSource for SharedTextures {
    fn request(&mut self, path: &str) -> TextureRequest {
        self.0.borrow_mut().request(path)
    }
}

/// Reports failures on the console and in a browser dialog
struct AlertPresenter;

impl ErrorPresenter for AlertPresenter {
    fn present(&mut self, title: &str, description: &str) {
        web_sys::console::error_1(&JsValue::from_str(&format!("{title}: {description}")));
        if let Some(window) = web_sys::window() {
            let _ = window.alert_with_message(&format!("{title}\n\n{description}"));
        }
    }
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[wasm_bindgen]
pub struct WebConfigurator {
    inner: Configurator,
    textures: SharedTextures,
}

#[wasm_bindgen]
impl WebConfigurator {
    /// Attach to a canvas by element id; `config_json` may be empty
    pub fn from_canvas(canvas_id: &str, config_json: &str) -> Result<WebConfigurator, JsValue> {
        let document = web_sys::window()
            .and_then(|window| window.document())
            .ok_or_else(|| JsValue::from_str("no document available"))?;
        let canvas = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| JsValue::from_str(&format!("no element with id '{canvas_id}'")))?
            .dyn_into::<web_sys::HtmlCanvasElement>()
            .map_err(|_| JsValue::from_str(&format!("'{canvas_id}' is not a canvas")))?;

        let config = if config_json.trim().is_empty() {
            ConfiguratorConfig::default()
        } else {
            ConfiguratorConfig::from_json(config_json).map_err(js_error)?
        };
        let viewport = Viewport::new(canvas.width() as f32, canvas.height() as f32);
        Ok(Self::new(config, viewport, Box::new(AlertPresenter)))
    }

    /// Replace the product model with an STL file's contents
    pub fn load_stl(&mut self, bytes: &[u8]) -> Result<(), JsValue> {
        let mesh = stl::parse_stl(bytes).map_err(js_error)?;
        self.inner.load_model(SceneNode::mesh(mesh.named("model")));
        Ok(())
    }

    /// Provide the decoded decal image as tightly packed RGBA
    pub fn set_texture(&mut self, name: &str, width: u32, height: u32, rgba: &[u8]) -> Result<(), JsValue> {
        let texture = Texture::from_rgba8(name, width, height, rgba).map_err(js_error)?;
        self.textures.0.borrow_mut().set(texture);
        Ok(())
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.inner.set_viewport(Viewport::new(width, height));
    }

    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        self.inner.camera_mut().orbit(yaw, pitch);
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        self.inner.pointer_down(ScreenPoint::new(x, y));
    }

    /// Returns true when the release counted as a click
    pub fn pointer_up(&mut self, x: f32, y: f32) -> bool {
        self.inner.pointer_up(ScreenPoint::new(x, y)).is_some()
    }

    /// Build pending decals; returns how many were placed
    pub fn poll(&mut self) -> u32 {
        self.inner
            .poll()
            .iter()
            .filter(|outcome| matches!(outcome, PlacementOutcome::Placed(_)))
            .count() as u32
    }

    pub fn resize_last(&mut self, width: f32, height: f32) -> Result<(), JsValue> {
        let id = self.last()?;
        self.inner.resize_decal(id, width, height).map_err(js_error)
    }

    pub fn set_last_opacity(&mut self, opacity: f32) -> Result<(), JsValue> {
        let id = self.last()?;
        self.inner.set_decal_opacity(id, opacity).map_err(js_error)
    }

    /// Recolour the model meshes called `name`; unknown names are reported
    pub fn set_part_color(&mut self, name: &str, r: u8, g: u8, b: u8) -> Result<(), JsValue> {
        self.inner.set_part_color(name, [r, g, b]).map_err(js_error)
    }

    pub fn decal_count(&self) -> usize {
        self.inner.decals().count()
    }

    /// Interleaved `x, y, z, u, v` per vertex, three vertices per triangle
    pub fn decal_vertices(&self, index: usize) -> Vec<f32> {
        let Some((_, decal)) = self.inner.decals().nth(index) else {
            return Vec::new();
        };
        decal
            .world_vertices()
            .flat_map(|v| [v.position.x, v.position.y, v.position.z, v.uv.x, v.uv.y])
            .collect()
    }

    pub fn decal_opacity(&self, index: usize) -> Option<f32> {
        self.inner
            .decals()
            .nth(index)
            .map(|(_, decal)| decal.material.opacity)
    }
}

impl WebConfigurator {
    fn new(config: ConfiguratorConfig, viewport: Viewport, presenter: Box<dyn ErrorPresenter>) -> Self {
        let textures = SharedTextures::default();
        let inner = Configurator::new(config, viewport, Box::new(textures.clone()), presenter);
        Self { inner, textures }
    }

    fn last(&self) -> Result<decalr_core::DecalId, JsValue> {
        self.inner
            .last_decal()
            .ok_or_else(|| JsValue::from_str("no decal placed yet"))
    }
}
