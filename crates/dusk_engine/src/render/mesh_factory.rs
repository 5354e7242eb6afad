//! Mesh creation through the shared asset stores
//!
//! Every mesh is requested by a canonical content key built from its
//! parameters. The key is resolved through the asset index and cache, so any
//! number of factories sharing one [`Assets`] bundle produce at most one live
//! mesh per key.

use std::rc::Rc;

use super::{Material, Mesh, MeshData, RenderGroup, SharedBackend};
use crate::assets::{AssetError, Assets, ResourceLoader};

/// Builds primitive, raw and file-backed meshes
pub struct MeshFactory {
    assets: Rc<Assets>,
    backend: SharedBackend,
    loader: Option<Rc<dyn ResourceLoader>>,
}

impl MeshFactory {
    /// Create a factory without file loading support
    pub fn new(assets: Rc<Assets>, backend: SharedBackend) -> Self {
        Self {
            assets,
            backend,
            loader: None,
        }
    }

    /// Enable [`MeshFactory::from_file`] through `loader`
    pub fn with_loader(mut self, loader: Rc<dyn ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Shared stores this factory resolves through
    pub fn assets(&self) -> &Rc<Assets> {
        &self.assets
    }

    /// Content key of a cuboid
    pub fn cuboid_key(width: f32, height: f32, depth: f32) -> String {
        format!(
            "CuboidMesh[{},{},{}]",
            key_extent(width),
            key_extent(height),
            key_extent(depth)
        )
    }

    /// Content key of a plane
    pub fn plane_key(width: f32, depth: f32) -> String {
        format!("PlaneMesh[{},{}]", key_extent(width), key_extent(depth))
    }

    /// Content key of a file mesh
    pub fn file_key(path: &str) -> String {
        format!("FileMesh[{}]", path)
    }

    /// Box centered at the origin
    pub fn cuboid(&self, width: f32, height: f32, depth: f32) -> Rc<Mesh> {
        self.primitive(Self::cuboid_key(width, height, depth), None, || {
            MeshData::cuboid(width, height, depth)
        })
    }

    /// Box drawn with `material`
    pub fn cuboid_with_material(
        &self,
        width: f32,
        height: f32,
        depth: f32,
        material: &Rc<Material>,
    ) -> Rc<Mesh> {
        self.primitive(Self::cuboid_key(width, height, depth), Some(material), || {
            MeshData::cuboid(width, height, depth)
        })
    }

    /// Horizontal plane facing +Y
    pub fn plane(&self, width: f32, depth: f32) -> Rc<Mesh> {
        self.primitive(Self::plane_key(width, depth), None, || MeshData::plane(width, depth))
    }

    /// Horizontal plane drawn with `material`
    pub fn plane_with_material(&self, width: f32, depth: f32, material: &Rc<Material>) -> Rc<Mesh> {
        self.primitive(Self::plane_key(width, depth), Some(material), || {
            MeshData::plane(width, depth)
        })
    }

    /// Mesh from caller-provided geometry, deduplicated by `key`
    pub fn from_data(&self, key: &str, data: MeshData, groups: Vec<RenderGroup>) -> Rc<Mesh> {
        let (_, mesh) = self.assets.mesh(&format!("DataMesh[{}]", key), || {
            let groups = if groups.is_empty() {
                vec![RenderGroup::whole(&data, None)]
            } else {
                groups
            };
            Rc::new(Mesh::new(key, data, groups, &self.backend))
        });
        mesh
    }

    /// Mesh parsed by the resource loader
    ///
    /// Load failures are logged and yield a mesh that is not loaded, which
    /// stays cached under its key like any other mesh.
    pub fn from_file(&self, path: &str) -> Rc<Mesh> {
        let (_, mesh) = self.assets.mesh(&Self::file_key(path), || {
            let loaded = self
                .loader
                .as_ref()
                .ok_or_else(|| AssetError::LoadFailed("no resource loader configured".to_string()))
                .and_then(|loader| loader.load_mesh(path));

            let mesh = match loaded {
                Ok(data) => {
                    let groups = vec![RenderGroup::whole(&data, None)];
                    Mesh::new(path, data, groups, &self.backend)
                }
                Err(e) => {
                    log::error!("Failed to load mesh '{}': {}", path, e);
                    Mesh::unloaded(path)
                }
            };
            Rc::new(mesh)
        });
        mesh
    }

    fn primitive(
        &self,
        key: String,
        material: Option<&Rc<Material>>,
        build: impl FnOnce() -> MeshData,
    ) -> Rc<Mesh> {
        let key = match material {
            Some(material) => format!("{}{{{}}}", key, material.desc().cache_key()),
            None => key,
        };

        let (_, mesh) = self.assets.mesh(&key, || {
            log::debug!("Building {}", key);
            let data = build();
            let groups = vec![RenderGroup::whole(&data, material.cloned())];
            Rc::new(Mesh::new(key.as_str(), data, groups, &self.backend))
        });
        mesh
    }
}

/// Fold `-0.0` into `0.0` so both spellings share one key
fn key_extent(value: f32) -> f32 {
    value + 0.0
}
