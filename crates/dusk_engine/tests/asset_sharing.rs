//! Content-keyed sharing of meshes, materials and textures

use std::rc::Rc;

use dusk_engine::assets::{AssetCache, AssetIndex};
use dusk_engine::prelude::*;
use dusk_engine::render::{ResourceKind, SharedBackend};

struct SolidImages;

impl ResourceLoader for SolidImages {
    fn load_image(&self, path: &str) -> Result<ImageData, AssetError> {
        if path.starts_with("missing") {
            return Err(AssetError::NotFound(path.to_string()));
        }
        Ok(ImageData::solid_color(2, 2, [255, 255, 255, 255]))
    }

    fn load_shader_source(&self, path: &str) -> Result<String, AssetError> {
        Err(AssetError::NotFound(path.to_string()))
    }
}

#[test]
fn test_two_factories_share_one_cuboid() {
    let headless = HeadlessBackend::new_shared();
    let backend: SharedBackend = headless.clone();
    let assets = Rc::new(Assets::new());
    let first = MeshFactory::new(Rc::clone(&assets), Rc::clone(&backend));
    let second = MeshFactory::new(Rc::clone(&assets), Rc::clone(&backend));

    let a = first.cuboid(1.0, 2.0, 3.0);
    let b = second.cuboid(1.0, 2.0, 3.0);

    let key = MeshFactory::cuboid_key(1.0, 2.0, 3.0);
    assert_eq!(assets.mesh_id(&key), assets.mesh_id(&key));
    assert!(Rc::ptr_eq(&a, &b));
    assert!(assets
        .cached_mesh(assets.mesh_id(&key))
        .is_some_and(|cached| Rc::ptr_eq(&cached, &a)));
    assert_eq!(headless.borrow().live_count(ResourceKind::Mesh), 1);

    let other = first.cuboid(2.0, 2.0, 3.0);
    assert!(!Rc::ptr_eq(&a, &other));
    assert_ne!(assets.mesh_id(&key), assets.mesh_id(&MeshFactory::cuboid_key(2.0, 2.0, 3.0)));
}

#[test]
fn test_index_ids_are_stable() {
    let mut index = AssetIndex::new();
    let foo = index.get_id("foo");
    assert_eq!(index.get_id("foo"), foo);
    assert_ne!(index.get_id("bar"), foo);
    assert_eq!(index.find("foo"), Some(foo));
    assert_eq!(index.find("baz"), None);
}

#[test]
fn test_cache_purge_respects_holders() {
    let mut index = AssetIndex::new();
    let mut cache = AssetCache::new();
    let id = index.get_id("answer");
    let held = Rc::new(42u32);
    cache.add(id, Rc::clone(&held));

    assert!(cache.get(id).is_some_and(|value| Rc::ptr_eq(&value, &held)));
    assert_eq!(cache.purge(), 0);
    assert!(cache.contains(id));

    drop(held);
    assert_eq!(cache.purge(), 1);
    assert!(cache.get(id).is_none());
}

#[test]
fn test_purge_releases_backend_resources_in_order() {
    let headless = HeadlessBackend::new_shared();
    let app = App::new(EngineConfig::default(), headless.clone());
    let materials = app.material_factory(Rc::new(SolidImages));

    let desc = MaterialDesc {
        diffuse_map: Some("brick.png".to_string()),
        ..MaterialDesc::colored("brick", [1.0, 1.0, 1.0, 1.0])
    };
    let material = materials.material(&desc);
    assert!(material.is_loaded());
    assert!(Rc::ptr_eq(&material, &materials.material(&desc)));

    let mesh = app.mesh_factory().cuboid_with_material(1.0, 1.0, 1.0, &material);
    drop(material);
    assert_eq!(app.assets().purge(), 0);

    drop(mesh);
    assert_eq!(app.assets().purge(), 3);
    assert_eq!(app.assets().cached_counts(), (0, 0, 0));

    let backend = headless.borrow();
    assert_eq!(backend.live_count(ResourceKind::Mesh), 0);
    assert_eq!(backend.live_count(ResourceKind::Material), 0);
    assert_eq!(backend.live_count(ResourceKind::Texture), 0);
}

#[test]
fn test_missing_texture_is_cached_unloaded() {
    let app = App::new(EngineConfig::default(), HeadlessBackend::new_shared());
    let materials = app.material_factory(Rc::new(SolidImages));

    let texture = materials.texture("missing.png");
    assert!(!texture.is_loaded());
    assert!(Rc::ptr_eq(&texture, &materials.texture("missing.png")));

    let desc = MaterialDesc {
        bump_map: Some("missing.png".to_string()),
        ..MaterialDesc::colored("bumpy", [0.5, 0.5, 0.5, 1.0])
    };
    let material = materials.material(&desc);
    assert!(material.is_loaded());
    assert_eq!(material.data().has_map, [0, 0, 0, 0]);
}
