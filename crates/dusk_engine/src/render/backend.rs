//! Graphics backend abstraction
//!
//! Components decide when to draw and with which transform and camera data;
//! how the calls execute is up to the backend implementation.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::{DrawMode, MaterialData, MeshData, RenderResult, ShaderSource};
use crate::assets::ImageData;

/// Handle to mesh buffers stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a texture stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to material state stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialHandle(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Kind of backend resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Vertex and index buffers
    Mesh,
    /// Image
    Texture,
    /// Material parameters and bound maps
    Material,
    /// Shader program
    Program,
}

/// Backend shared by every resource and component of one engine instance
pub type SharedBackend = Rc<RefCell<dyn GraphicsBackend>>;

/// Non-owning backend reference kept by resources for release on drop
pub type WeakBackend = Weak<RefCell<dyn GraphicsBackend>>;

/// Graphics API surface used by the engine core
pub trait GraphicsBackend {
    /// Upload vertex and index data
    fn create_mesh(&mut self, data: &MeshData) -> RenderResult<MeshHandle>;

    /// Release mesh buffers
    fn destroy_mesh(&mut self, handle: MeshHandle);

    /// Upload a decoded RGBA8 image
    fn create_texture(&mut self, image: &ImageData) -> RenderResult<TextureHandle>;

    /// Release a texture
    fn destroy_texture(&mut self, handle: TextureHandle);

    /// Create material state from a uniform block and its bound maps
    fn create_material(
        &mut self,
        data: &MaterialData,
        textures: &[TextureHandle],
    ) -> RenderResult<MaterialHandle>;

    /// Release material state
    fn destroy_material(&mut self, handle: MaterialHandle);

    /// Compile and link a program from its stage sources
    fn create_program(&mut self, name: &str, stages: &[ShaderSource]) -> RenderResult<ProgramHandle>;

    /// Release a program
    fn destroy_program(&mut self, handle: ProgramHandle);

    /// Make a program current
    fn bind_program(&mut self, handle: ProgramHandle);

    /// Upload the per-draw transform block (see [`super::TransformData`])
    fn upload_transforms(&mut self, bytes: &[u8]);

    /// Bind material state for subsequent draws
    fn bind_material(&mut self, handle: MaterialHandle);

    /// Draw `count` indices starting at `start`
    fn draw(&mut self, mesh: MeshHandle, mode: DrawMode, start: u32, count: u32);
}

/// Backend reference for resources that never reached a backend
pub(crate) fn detached() -> WeakBackend {
    Weak::<RefCell<super::HeadlessBackend>>::new()
}

/// Release a backend object if the backend is still alive and not busy
pub(crate) fn release(backend: &WeakBackend, what: &str, destroy: impl FnOnce(&mut dyn GraphicsBackend)) {
    let Some(backend) = backend.upgrade() else {
        return;
    };

    let borrowed = backend.try_borrow_mut();
    match borrowed {
        Ok(mut backend) => destroy(&mut *backend),
        Err(_) => log::warn!("Graphics backend busy, leaking {}", what),
    }
}
