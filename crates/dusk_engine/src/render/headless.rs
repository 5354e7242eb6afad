//! Window-less graphics backend
//!
//! Allocates fake handles and records every call, so scenes can be driven
//! and inspected without a GPU. Individual resource kinds can be told to
//! fail creation to exercise load-failure paths.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use super::{
    DrawMode, GraphicsBackend, MaterialData, MaterialHandle, MeshData, MeshHandle, ProgramHandle,
    RenderError, RenderResult, ResourceKind, ShaderSource, TextureHandle, TransformData,
};
use crate::assets::ImageData;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Mesh buffers created
    CreateMesh(MeshHandle),
    /// Mesh buffers released
    DestroyMesh(MeshHandle),
    /// Texture created
    CreateTexture(TextureHandle),
    /// Texture released
    DestroyTexture(TextureHandle),
    /// Material created
    CreateMaterial(MaterialHandle),
    /// Material released
    DestroyMaterial(MaterialHandle),
    /// Program linked
    CreateProgram(ProgramHandle, String),
    /// Program released
    DestroyProgram(ProgramHandle),
    /// Program bound
    BindProgram(ProgramHandle),
    /// Transform block uploaded
    UploadTransforms(TransformData),
    /// Material bound
    BindMaterial(MaterialHandle),
    /// Draw call
    Draw {
        /// Mesh drawn
        mesh: MeshHandle,
        /// Primitive mode
        mode: DrawMode,
        /// First index
        start: u32,
        /// Index count
        count: u32,
    },
}

/// Recording backend without a graphics context
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_handle: u64,
    commands: Vec<BackendCommand>,
    live: HashSet<(ResourceKind, u64)>,
    failing: HashSet<ResourceKind>,
}

impl HeadlessBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend ready to be shared
    ///
    /// The returned handle coerces to [`super::SharedBackend`] while keeping
    /// concrete access for inspection.
    pub fn new_shared() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Make creation of `kind` resources fail from now on
    pub fn fail_on(&mut self, kind: ResourceKind) {
        self.failing.insert(kind);
    }

    /// Let creation of `kind` resources succeed again
    pub fn recover(&mut self, kind: ResourceKind) {
        self.failing.remove(&kind);
    }

    /// Every call recorded so far
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Forget recorded calls (live resources are kept)
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Number of draw calls recorded
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, BackendCommand::Draw { .. }))
            .count()
    }

    /// Last uploaded transform block
    pub fn last_transforms(&self) -> Option<&TransformData> {
        self.commands.iter().rev().find_map(|command| match command {
            BackendCommand::UploadTransforms(data) => Some(data),
            _ => None,
        })
    }

    /// Number of created and not yet released resources of `kind`
    pub fn live_count(&self, kind: ResourceKind) -> usize {
        self.live.iter().filter(|(live_kind, _)| *live_kind == kind).count()
    }

    fn allocate(&mut self, kind: ResourceKind) -> RenderResult<u64> {
        if self.failing.contains(&kind) {
            return Err(RenderError::ResourceCreationFailed(format!(
                "{:?} creation disabled on headless backend",
                kind
            )));
        }

        self.next_handle += 1;
        self.live.insert((kind, self.next_handle));
        Ok(self.next_handle)
    }

    fn free(&mut self, kind: ResourceKind, handle: u64) {
        if !self.live.remove(&(kind, handle)) {
            log::warn!("Releasing unknown {:?} handle {}", kind, handle);
        }
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_mesh(&mut self, data: &MeshData) -> RenderResult<MeshHandle> {
        let handle = MeshHandle(self.allocate(ResourceKind::Mesh)?);
        log::trace!("Created mesh {:?} ({} vertices)", handle, data.vertices.len());
        self.commands.push(BackendCommand::CreateMesh(handle));
        Ok(handle)
    }

    fn destroy_mesh(&mut self, handle: MeshHandle) {
        self.free(ResourceKind::Mesh, handle.0);
        self.commands.push(BackendCommand::DestroyMesh(handle));
    }

    fn create_texture(&mut self, image: &ImageData) -> RenderResult<TextureHandle> {
        let handle = TextureHandle(self.allocate(ResourceKind::Texture)?);
        log::trace!("Created texture {:?} ({}x{})", handle, image.width, image.height);
        self.commands.push(BackendCommand::CreateTexture(handle));
        Ok(handle)
    }

    fn destroy_texture(&mut self, handle: TextureHandle) {
        self.free(ResourceKind::Texture, handle.0);
        self.commands.push(BackendCommand::DestroyTexture(handle));
    }

    fn create_material(
        &mut self,
        _data: &MaterialData,
        textures: &[TextureHandle],
    ) -> RenderResult<MaterialHandle> {
        if let Some(missing) = textures
            .iter()
            .find(|texture| !self.live.contains(&(ResourceKind::Texture, texture.0)))
        {
            return Err(RenderError::InvalidHandle(missing.0));
        }

        let handle = MaterialHandle(self.allocate(ResourceKind::Material)?);
        self.commands.push(BackendCommand::CreateMaterial(handle));
        Ok(handle)
    }

    fn destroy_material(&mut self, handle: MaterialHandle) {
        self.free(ResourceKind::Material, handle.0);
        self.commands.push(BackendCommand::DestroyMaterial(handle));
    }

    fn create_program(&mut self, name: &str, stages: &[ShaderSource]) -> RenderResult<ProgramHandle> {
        if let Some(empty) = stages.iter().find(|stage| stage.source.trim().is_empty()) {
            return Err(RenderError::ShaderCompilationFailed {
                program: name.to_string(),
                reason: format!("empty {:?} stage '{}'", empty.stage, empty.path),
            });
        }

        let handle = ProgramHandle(self.allocate(ResourceKind::Program)?);
        self.commands.push(BackendCommand::CreateProgram(handle, name.to_string()));
        Ok(handle)
    }

    fn destroy_program(&mut self, handle: ProgramHandle) {
        self.free(ResourceKind::Program, handle.0);
        self.commands.push(BackendCommand::DestroyProgram(handle));
    }

    fn bind_program(&mut self, handle: ProgramHandle) {
        self.commands.push(BackendCommand::BindProgram(handle));
    }

    fn upload_transforms(&mut self, bytes: &[u8]) {
        match bytemuck::try_pod_read_unaligned::<TransformData>(bytes) {
            Ok(data) => self.commands.push(BackendCommand::UploadTransforms(data)),
            Err(e) => log::warn!("Ignoring malformed transform upload ({} bytes): {}", bytes.len(), e),
        }
    }

    fn bind_material(&mut self, handle: MaterialHandle) {
        self.commands.push(BackendCommand::BindMaterial(handle));
    }

    fn draw(&mut self, mesh: MeshHandle, mode: DrawMode, start: u32, count: u32) {
        self.commands.push(BackendCommand::Draw {
            mesh,
            mode,
            start,
            count,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_tracked() {
        let mut backend = HeadlessBackend::new();
        let mesh = backend.create_mesh(&MeshData::cuboid(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(backend.live_count(ResourceKind::Mesh), 1);

        backend.destroy_mesh(mesh);
        assert_eq!(backend.live_count(ResourceKind::Mesh), 0);
        assert_eq!(
            backend.commands(),
            &[BackendCommand::CreateMesh(mesh), BackendCommand::DestroyMesh(mesh)]
        );
    }

    #[test]
    fn test_failing_kind() {
        let mut backend = HeadlessBackend::new();
        backend.fail_on(ResourceKind::Texture);
        let image = ImageData::solid_color(2, 2, [255, 255, 255, 255]);
        assert!(matches!(
            backend.create_texture(&image),
            Err(RenderError::ResourceCreationFailed(_))
        ));

        backend.recover(ResourceKind::Texture);
        assert!(backend.create_texture(&image).is_ok());
    }

    #[test]
    fn test_material_requires_live_textures() {
        let mut backend = HeadlessBackend::new();
        let result = backend.create_material(&MaterialData::default(), &[TextureHandle(99)]);
        assert_eq!(result, Err(RenderError::InvalidHandle(99)));
    }

    #[test]
    fn test_empty_shader_stage_fails() {
        let mut backend = HeadlessBackend::new();
        let stages = [ShaderSource {
            stage: crate::render::ShaderStage::Vertex,
            path: "empty.vs.glsl".to_string(),
            source: "  ".to_string(),
        }];
        assert!(matches!(
            backend.create_program("broken", &stages),
            Err(RenderError::ShaderCompilationFailed { .. })
        ));
    }
}
