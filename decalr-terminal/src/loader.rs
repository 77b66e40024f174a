/// Background PNG decoding for decal textures
use decalr_core::{AssetError, Texture, TextureRequest, TextureSource};
use std::path::Path;
use std::thread;

/// Decodes textures from disk on a worker thread per request
#[derive(Debug, Default)]
pub struct FileTextureSource;

impl TextureSource for FileTextureSource {
    fn request(&mut self, path: &str) -> TextureRequest {
        let (resolver, request) = TextureRequest::channel(path);
        let path = path.to_string();
        thread::spawn(move || resolver.resolve(decode_texture(&path)));
        request
    }
}

/// Read and decode an image file to RGBA8
pub fn decode_texture(path: impl AsRef<Path>) -> Result<Texture, AssetError> {
    let path = path.as_ref();
    let image = image::open(path)
        .map_err(|e| AssetError::Decode(format!("{}: {e}", path.display())))?
        .to_rgba8();
    let (width, height) = image.dimensions();
    log::debug!("decoded {}x{} texture from {}", width, height, path.display());
    Texture::from_rgba8(path.display().to_string(), width, height, image.as_raw())
}
