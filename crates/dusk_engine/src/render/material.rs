//! Materials
//!
//! A [`MaterialDesc`] is the content a material is built from and doubles as
//! its cache key. [`MaterialFactory`] resolves descriptions and their texture
//! maps through the shared asset stores so identical content is created once.

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use super::backend::release;
use super::{MaterialHandle, SharedBackend, Texture, WeakBackend};
use crate::assets::{Assets, ResourceLoader};

/// Texture map slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    /// Ambient color map
    Ambient = 0,
    /// Diffuse color map
    Diffuse = 1,
    /// Specular intensity map
    Specular = 2,
    /// Bump or normal map
    Bump = 3,
}

impl TextureSlot {
    /// Every slot in binding order
    pub const ALL: [Self; 4] = [Self::Ambient, Self::Diffuse, Self::Specular, Self::Bump];
}

/// Material content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDesc {
    /// Name used in diagnostics
    pub name: String,
    /// Ambient color (RGBA)
    pub ambient: [f32; 4],
    /// Diffuse color (RGBA)
    pub diffuse: [f32; 4],
    /// Specular color (RGBA)
    pub specular: [f32; 4],
    /// Specular exponent
    pub shininess: f32,
    /// Opacity
    pub dissolve: f32,
    /// Ambient map path
    pub ambient_map: Option<String>,
    /// Diffuse map path
    pub diffuse_map: Option<String>,
    /// Specular map path
    pub specular_map: Option<String>,
    /// Bump map path
    pub bump_map: Option<String>,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            ambient: [0.0, 0.0, 0.0, 1.0],
            diffuse: [0.8, 0.8, 0.8, 1.0],
            specular: [0.0, 0.0, 0.0, 1.0],
            shininess: 0.0,
            dissolve: 1.0,
            ambient_map: None,
            diffuse_map: None,
            specular_map: None,
            bump_map: None,
        }
    }
}

impl MaterialDesc {
    /// Plain colored material
    pub fn colored(name: impl Into<String>, diffuse: [f32; 4]) -> Self {
        Self {
            name: name.into(),
            diffuse,
            ..Self::default()
        }
    }

    /// Path of the map bound to `slot`
    pub fn map(&self, slot: TextureSlot) -> Option<&str> {
        match slot {
            TextureSlot::Ambient => self.ambient_map.as_deref(),
            TextureSlot::Diffuse => self.diffuse_map.as_deref(),
            TextureSlot::Specular => self.specular_map.as_deref(),
            TextureSlot::Bump => self.bump_map.as_deref(),
        }
    }

    /// Canonical content key
    ///
    /// Two descriptions with the same colors and maps share a key regardless
    /// of their names.
    pub fn cache_key(&self) -> String {
        let maps: Vec<&str> = TextureSlot::ALL
            .iter()
            .map(|slot| self.map(*slot).unwrap_or(""))
            .collect();
        format!(
            "Material[{:?},{:?},{:?},{},{};{}]",
            self.ambient,
            self.diffuse,
            self.specular,
            self.shininess,
            self.dissolve,
            maps.join("|")
        )
    }
}

/// Material uniform block
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MaterialData {
    /// Ambient color
    pub ambient: [f32; 4],
    /// Diffuse color
    pub diffuse: [f32; 4],
    /// Specular color
    pub specular: [f32; 4],
    /// Specular exponent
    pub shininess: f32,
    /// Opacity
    pub dissolve: f32,
    /// Nonzero where the matching [`TextureSlot`] has a loaded map
    pub has_map: [u32; 4],
    _padding: [f32; 2],
}

impl Default for MaterialData {
    fn default() -> Self {
        Self::from_desc(&MaterialDesc::default())
    }
}

impl MaterialData {
    /// Uniform block for `desc` without any maps
    pub fn from_desc(desc: &MaterialDesc) -> Self {
        Self {
            ambient: desc.ambient,
            diffuse: desc.diffuse,
            specular: desc.specular,
            shininess: desc.shininess,
            dissolve: desc.dissolve,
            has_map: [0; 4],
            _padding: [0.0; 2],
        }
    }
}

/// Material state created in the graphics backend
pub struct Material {
    desc: MaterialDesc,
    data: MaterialData,
    maps: Vec<(TextureSlot, Rc<Texture>)>,
    handle: Option<MaterialHandle>,
    backend: WeakBackend,
}

impl Material {
    /// Create backend state for `desc` with the given maps
    ///
    /// Maps that failed to load are kept but not bound. A backend failure is
    /// logged and yields a material that is not loaded.
    pub fn new(
        desc: MaterialDesc,
        maps: Vec<(TextureSlot, Rc<Texture>)>,
        backend: &SharedBackend,
    ) -> Self {
        let mut data = MaterialData::from_desc(&desc);
        let mut handles = Vec::new();
        for (slot, texture) in &maps {
            if let Some(handle) = texture.handle() {
                data.has_map[*slot as usize] = 1;
                handles.push(handle);
            }
        }

        let handle = match backend.borrow_mut().create_material(&data, &handles) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to create material '{}': {}", desc.name, e);
                None
            }
        };

        Self {
            desc,
            data,
            maps,
            handle,
            backend: Rc::downgrade(backend),
        }
    }

    /// Source description
    pub fn desc(&self) -> &MaterialDesc {
        &self.desc
    }

    /// Uniform block
    pub fn data(&self) -> &MaterialData {
        &self.data
    }

    /// Map bound to `slot`
    pub fn map(&self, slot: TextureSlot) -> Option<&Rc<Texture>> {
        self.maps
            .iter()
            .find(|(bound, _)| *bound == slot)
            .map(|(_, texture)| texture)
    }

    /// Whether the backend holds this material
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Backend material
    pub fn handle(&self) -> Option<MaterialHandle> {
        self.handle
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.desc.name)
            .field("handle", &self.handle)
            .field("maps", &self.maps.len())
            .finish()
    }
}

impl Drop for Material {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            release(&self.backend, &self.desc.name, |backend| backend.destroy_material(handle));
        }
    }
}

/// Creates materials and textures through the shared asset stores
pub struct MaterialFactory {
    assets: Rc<Assets>,
    backend: SharedBackend,
    loader: Rc<dyn ResourceLoader>,
}

impl MaterialFactory {
    /// Create a factory over shared stores
    pub fn new(assets: Rc<Assets>, backend: SharedBackend, loader: Rc<dyn ResourceLoader>) -> Self {
        Self {
            assets,
            backend,
            loader,
        }
    }

    /// Texture decoded from `path`, loaded once per path
    ///
    /// Load failures yield a texture that is not loaded.
    pub fn texture(&self, path: &str) -> Rc<Texture> {
        let key = format!("Texture[{}]", path);
        let (_, texture) = self.assets.texture(&key, || {
            let texture = match self.loader.load_image(path) {
                Ok(image) => Texture::new(path, &image, &self.backend),
                Err(e) => {
                    log::error!("Failed to load texture '{}': {}", path, e);
                    Texture::unloaded(path)
                }
            };
            Rc::new(texture)
        });
        texture
    }

    /// Material for `desc`, created once per content key
    pub fn material(&self, desc: &MaterialDesc) -> Rc<Material> {
        let (_, material) = self.assets.material(&desc.cache_key(), || {
            let maps = TextureSlot::ALL
                .iter()
                .filter_map(|slot| desc.map(*slot).map(|path| (*slot, self.texture(path))))
                .collect();
            Rc::new(Material::new(desc.clone(), maps, &self.backend))
        });
        material
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetError, ImageData};
    use crate::render::{HeadlessBackend, ResourceKind};

    struct SolidImages;

    impl ResourceLoader for SolidImages {
        fn load_image(&self, path: &str) -> Result<ImageData, AssetError> {
            if path.starts_with("missing") {
                Err(AssetError::NotFound(path.to_string()))
            } else {
                Ok(ImageData::solid_color(2, 2, [255, 0, 0, 255]))
            }
        }

        fn load_shader_source(&self, path: &str) -> Result<String, AssetError> {
            Err(AssetError::NotFound(path.to_string()))
        }
    }

    fn factory() -> (Rc<std::cell::RefCell<HeadlessBackend>>, MaterialFactory) {
        let headless = HeadlessBackend::new_shared();
        let factory = MaterialFactory::new(Rc::new(Assets::new()), headless.clone(), Rc::new(SolidImages));
        (headless, factory)
    }

    #[test]
    fn test_cache_key_ignores_name() {
        let a = MaterialDesc::colored("red", [1.0, 0.0, 0.0, 1.0]);
        let b = MaterialDesc::colored("also red", [1.0, 0.0, 0.0, 1.0]);
        let c = MaterialDesc::colored("blue", [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
    }

    #[test]
    fn test_material_data_layout() {
        assert_eq!(std::mem::size_of::<MaterialData>(), 80);
    }

    #[test]
    fn test_identical_materials_are_shared() {
        let (headless, factory) = factory();
        let desc = MaterialDesc {
            diffuse_map: Some("crate.png".to_string()),
            ..MaterialDesc::default()
        };

        let first = factory.material(&desc);
        let second = factory.material(&desc);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.data().has_map, [0, 1, 0, 0]);
        assert_eq!(headless.borrow().live_count(ResourceKind::Material), 1);
        assert_eq!(headless.borrow().live_count(ResourceKind::Texture), 1);
    }

    #[test]
    fn test_missing_map_is_not_bound() {
        let (_headless, factory) = factory();
        let desc = MaterialDesc {
            bump_map: Some("missing.png".to_string()),
            ..MaterialDesc::default()
        };

        let material = factory.material(&desc);
        assert!(material.is_loaded());
        assert_eq!(material.data().has_map, [0; 4]);
        assert!(!material.map(TextureSlot::Bump).is_some_and(|texture| texture.is_loaded()));
    }

    #[test]
    fn test_purge_releases_material_and_maps() {
        let (headless, factory) = factory();
        let desc = MaterialDesc {
            diffuse_map: Some("crate.png".to_string()),
            ..MaterialDesc::default()
        };

        drop(factory.material(&desc));
        assert_eq!(factory.assets.purge(), 2);
        assert_eq!(headless.borrow().live_count(ResourceKind::Material), 0);
        assert_eq!(headless.borrow().live_count(ResourceKind::Texture), 0);
    }
}
