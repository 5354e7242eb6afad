//! Asset management
//!
//! Shared resources are deduplicated in two steps: an [`AssetIndex`] maps a
//! canonical content key to a stable [`AssetId`], and an [`AssetCache`] maps
//! that id to the shared resource. A purge drops every cached resource the
//! cache is the last owner of; there is no other eviction.

mod cache;
mod image_loader;
mod index;
mod loader;

pub use cache::{AssetCache, AssetStore};
pub use image_loader::ImageData;
pub use index::{AssetId, AssetIndex};
pub use loader::{FileLoader, ResourceLoader};

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::render::{Material, Mesh, Texture};

/// Asset shares of one engine instance
///
/// Shared by `Rc` between the frame driver and every factory, so that all of
/// them resolve content keys against the same index and cache.
#[derive(Debug, Default)]
pub struct Assets {
    meshes: RefCell<AssetStore<Mesh>>,
    materials: RefCell<AssetStore<Material>>,
    textures: RefCell<AssetStore<Texture>>,
}

impl Assets {
    /// Create empty stores
    pub fn new() -> Self {
        Self::default()
    }

    /// Mesh cached under `key`, created by `create` on a miss
    pub fn mesh(&self, key: &str, create: impl FnOnce() -> Rc<Mesh>) -> (AssetId, Rc<Mesh>) {
        resolve(&self.meshes, key, create)
    }

    /// Material cached under `key`, created by `create` on a miss
    pub fn material(&self, key: &str, create: impl FnOnce() -> Rc<Material>) -> (AssetId, Rc<Material>) {
        resolve(&self.materials, key, create)
    }

    /// Texture cached under `key`, created by `create` on a miss
    pub fn texture(&self, key: &str, create: impl FnOnce() -> Rc<Texture>) -> (AssetId, Rc<Texture>) {
        resolve(&self.textures, key, create)
    }

    /// Id of a mesh content key
    pub fn mesh_id(&self, key: &str) -> AssetId {
        self.meshes.borrow_mut().id(key)
    }

    /// Id of a material content key
    pub fn material_id(&self, key: &str) -> AssetId {
        self.materials.borrow_mut().id(key)
    }

    /// Id of a texture content key
    pub fn texture_id(&self, key: &str) -> AssetId {
        self.textures.borrow_mut().id(key)
    }

    /// Cached mesh for `id`
    pub fn cached_mesh(&self, id: AssetId) -> Option<Rc<Mesh>> {
        self.meshes.borrow().get(id)
    }

    /// Number of cached resources (meshes, materials, textures)
    pub fn cached_counts(&self) -> (usize, usize, usize) {
        (
            self.meshes.borrow().len(),
            self.materials.borrow().len(),
            self.textures.borrow().len(),
        )
    }

    /// Drop every cached resource nothing else references
    ///
    /// Meshes go first so the materials they release become purgeable, then
    /// materials, then textures.
    pub fn purge(&self) -> usize {
        let meshes = self.meshes.borrow_mut().purge();
        let materials = self.materials.borrow_mut().purge();
        let textures = self.textures.borrow_mut().purge();

        let total = meshes + materials + textures;
        if total > 0 {
            log::info!(
                "Purged {} assets ({} meshes, {} materials, {} textures)",
                total,
                meshes,
                materials,
                textures
            );
        }
        total
    }
}

/// Get-or-create without holding the store borrowed while `create` runs
///
/// Creation may resolve other assets (a material loading its textures), so
/// the store is only borrowed for the lookup and the insert.
fn resolve<T>(store: &RefCell<AssetStore<T>>, key: &str, create: impl FnOnce() -> Rc<T>) -> (AssetId, Rc<T>) {
    let (id, cached) = store.borrow_mut().lookup(key);
    if let Some(asset) = cached {
        return (id, asset);
    }

    let asset = create();
    store.borrow_mut().insert(id, Rc::clone(&asset));
    (id, asset)
}

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// Asset not found
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Failed to load asset
    #[error("Failed to load asset: {0}")]
    LoadFailed(String),

    /// Invalid asset data
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Unsupported asset format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// IO error during asset loading
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
