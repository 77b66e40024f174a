//! Textures and the asynchronous hand-off from asset loaders
//!
//! Loading happens outside the core. A loader hands back a [`TextureRequest`]
//! immediately and completes it later from whatever thread does the work;
//! the configurator polls requests once per frame and only then builds decals.
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;

use nalgebra::Point2;

use crate::error::AssetError;

pub type LoadResult = Result<Arc<Texture>, AssetError>;

/// Decoded RGBA8 image
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<[u8; 4]>,
    /// Sample with V flipped. Decal textures leave this off.
    pub flip_y: bool,
}

impl Texture {
    pub fn new(name: impl Into<String>, width: u32, height: u32, pixels: Vec<[u8; 4]>) -> Result<Self, AssetError> {
        let expected = width as usize * height as usize;
        if expected == 0 || pixels.len() != expected {
            return Err(AssetError::Decode(format!(
                "expected {expected} pixels for {width}x{height}, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            pixels,
            flip_y: false,
        })
    }

    /// Build from a tightly packed RGBA byte buffer
    pub fn from_rgba8(name: impl Into<String>, width: u32, height: u32, bytes: &[u8]) -> Result<Self, AssetError> {
        if bytes.len() % 4 != 0 {
            return Err(AssetError::Decode(format!("{} bytes is not RGBA8", bytes.len())));
        }
        let pixels = bytes
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
            .collect();
        Self::new(name, width, height, pixels)
    }

    /// Single-texel texture
    pub fn solid(name: impl Into<String>, rgba: [u8; 4]) -> Self {
        Self {
            name: name.into(),
            width: 1,
            height: 1,
            pixels: vec![rgba],
            flip_y: false,
        }
    }

    /// Nearest-neighbour lookup; UVs outside [0, 1] are clamped
    pub fn sample(&self, uv: &Point2<f32>) -> [u8; 4] {
        let u = uv.x.clamp(0.0, 1.0);
        let v = (if self.flip_y { 1.0 - uv.y } else { uv.y }).clamp(0.0, 1.0);
        let x = ((u * self.width as f32) as u32).min(self.width - 1);
        let y = ((v * self.height as f32) as u32).min(self.height - 1);
        self.pixels[(y * self.width + x) as usize]
    }
}

/// Completion side of a [`TextureRequest`], movable to a loader thread
#[derive(Debug)]
pub struct TextureResolver {
    tx: Sender<LoadResult>,
}

impl TextureResolver {
    pub fn resolve(self, result: Result<Texture, AssetError>) {
        // The request may already be gone; nothing to report then.
        let _ = self.tx.send(result.map(Arc::new));
    }
}

/// Pending texture load
#[derive(Debug)]
pub struct TextureRequest {
    path: String,
    rx: Receiver<LoadResult>,
}

impl TextureRequest {
    pub fn channel(path: impl Into<String>) -> (TextureResolver, TextureRequest) {
        let (tx, rx) = mpsc::channel();
        (
            TextureResolver { tx },
            TextureRequest {
                path: path.into(),
                rx,
            },
        )
    }

    /// A request that is already complete
    pub fn ready(path: impl Into<String>, result: LoadResult) -> Self {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(result);
        Self {
            path: path.into(),
            rx,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `None` while the loader is still working
    pub fn try_take(&self) -> Option<LoadResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(AssetError::Disconnected)),
        }
    }
}

/// Anything that can start a texture load
pub trait TextureSource {
    fn request(&mut self, path: &str) -> TextureRequest;
}

/// Serves one preloaded texture for every path
#[derive(Debug, Clone, Default)]
pub struct StaticTextureSource {
    texture: Option<Arc<Texture>>,
}

impl StaticTextureSource {
    pub fn new(texture: Texture) -> Self {
        Self {
            texture: Some(Arc::new(texture)),
        }
    }

    pub fn set(&mut self, texture: Texture) {
        self.texture = Some(Arc::new(texture));
    }
}

impl TextureSource for StaticTextureSource {
    fn request(&mut self, path: &str) -> TextureRequest {
        let result = self
            .texture
            .clone()
            .ok_or_else(|| AssetError::Parse(format!("no texture available for '{path}'")));
        TextureRequest::ready(path, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_then_resolved() {
        let (resolver, request) = TextureRequest::channel("a.png");
        assert!(request.try_take().is_none());
        resolver.resolve(Ok(Texture::solid("a.png", [1, 2, 3, 4])));
        let texture = request.try_take().unwrap().unwrap();
        assert_eq!(texture.pixels, vec![[1, 2, 3, 4]]);
    }

    #[test]
    fn test_dropped_resolver_reports_disconnect() {
        let (resolver, request) = TextureRequest::channel("a.png");
        drop(resolver);
        assert!(matches!(request.try_take(), Some(Err(AssetError::Disconnected))));
    }

    #[test]
    fn test_resolve_from_thread() {
        let (resolver, request) = TextureRequest::channel("a.png");
        std::thread::spawn(move || resolver.resolve(Err(AssetError::Decode("bad".into()))))
            .join()
            .unwrap();
        assert!(matches!(request.try_take(), Some(Err(AssetError::Decode(_)))));
    }

    #[test]
    fn test_sample_corners() {
        let texture = Texture::from_rgba8(
            "checker",
            2,
            2,
            &[255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255],
        )
        .unwrap();
        assert_eq!(texture.sample(&Point2::new(0.0, 0.0)), [255, 0, 0, 255]);
        assert_eq!(texture.sample(&Point2::new(1.0, 0.0)), [0, 255, 0, 255]);
        assert_eq!(texture.sample(&Point2::new(0.2, 0.9)), [0, 0, 255, 255]);

        let mut flipped = texture.clone();
        flipped.flip_y = true;
        assert_eq!(flipped.sample(&Point2::new(0.2, 0.9)), [255, 0, 0, 255]);
    }

    #[test]
    fn test_pixel_count_checked() {
        assert!(Texture::new("bad", 2, 2, vec![[0; 4]; 3]).is_err());
        assert!(Texture::from_rgba8("bad", 1, 1, &[0, 0, 0]).is_err());
    }

    #[test]
    fn test_static_source() {
        let mut empty = StaticTextureSource::default();
        assert!(matches!(empty.request("x").try_take(), Some(Err(_))));
        let mut source = StaticTextureSource::new(Texture::solid("x", [0; 4]));
        assert!(matches!(source.request("x").try_take(), Some(Ok(_))));
    }
}
