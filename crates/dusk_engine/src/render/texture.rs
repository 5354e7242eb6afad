//! Textures

use std::rc::Rc;

use super::backend::{detached, release};
use super::{SharedBackend, TextureHandle, WeakBackend};
use crate::assets::ImageData;

/// Image uploaded to the graphics backend
pub struct Texture {
    name: String,
    width: u32,
    height: u32,
    handle: Option<TextureHandle>,
    backend: WeakBackend,
}

impl Texture {
    /// Upload a decoded image
    ///
    /// A backend failure is logged and yields a texture that is not loaded.
    pub fn new(name: impl Into<String>, image: &ImageData, backend: &SharedBackend) -> Self {
        let name = name.into();
        let handle = match backend.borrow_mut().create_texture(image) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to upload texture '{}': {}", name, e);
                None
            }
        };

        Self {
            name,
            width: image.width,
            height: image.height,
            handle,
            backend: Rc::downgrade(backend),
        }
    }

    /// Placeholder for an image that could not be loaded
    pub fn unloaded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            width: 0,
            height: 0,
            handle: None,
            backend: detached(),
        }
    }

    /// Name used in diagnostics (usually the source path)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the backend holds this texture
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Backend texture
    pub fn handle(&self) -> Option<TextureHandle> {
        self.handle
    }

    /// Size in pixels
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("name", &self.name)
            .field("size", &(self.width, self.height))
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            release(&self.backend, &self.name, |backend| backend.destroy_texture(handle));
        }
    }
}
