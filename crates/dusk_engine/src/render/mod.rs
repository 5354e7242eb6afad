//! GPU-backed render resources
//!
//! The graphics API itself sits behind [`GraphicsBackend`]. Resources created
//! through it (meshes, textures, materials, shader programs) are shared via
//! `Rc`, deduplicated by the asset caches, and release their backend objects
//! when the last owner drops them.

mod backend;
mod headless;
mod material;
mod mesh;
mod mesh_factory;
mod shader;
mod texture;

pub use backend::{
    GraphicsBackend, MaterialHandle, MeshHandle, ProgramHandle, ResourceKind, SharedBackend,
    TextureHandle, WeakBackend,
};
pub use headless::{BackendCommand, HeadlessBackend};
pub use material::{Material, MaterialData, MaterialDesc, MaterialFactory, TextureSlot};
pub use mesh::{DrawMode, Mesh, MeshData, RenderGroup, Vertex};
pub use mesh_factory::MeshFactory;
pub use shader::{ShaderProgram, ShaderRegistry, ShaderSource, ShaderStage};
pub use texture::Texture;

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Mat4;

/// Rendering errors
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Backend refused to create a resource
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Shader stage failed to compile or link
    #[error("Shader compilation failed for '{program}': {reason}")]
    ShaderCompilationFailed {
        /// Program name
        program: String,
        /// Backend message
        reason: String,
    },

    /// Handle does not refer to a live resource
    #[error("Invalid handle: {0}")]
    InvalidHandle(u64),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

/// Per-draw transform block uploaded before each mesh is drawn
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TransformData {
    /// Model matrix (column major)
    pub model: [[f32; 4]; 4],
    /// View matrix (column major)
    pub view: [[f32; 4]; 4],
    /// Projection matrix (column major)
    pub projection: [[f32; 4]; 4],
    /// Projection * view * model (column major)
    pub mvp: [[f32; 4]; 4],
}

impl Default for TransformData {
    fn default() -> Self {
        let identity: [[f32; 4]; 4] = Mat4::identity().into();
        Self {
            model: identity,
            view: identity,
            projection: identity,
            mvp: identity,
        }
    }
}

impl TransformData {
    /// Replace the model matrix and refresh the combined matrix
    pub fn set_model(&mut self, model: &Mat4) {
        self.model = (*model).into();
        self.refresh_mvp();
    }

    /// Replace the camera matrices and refresh the combined matrix
    pub fn set_camera(&mut self, view: &Mat4, projection: &Mat4) {
        self.view = (*view).into();
        self.projection = (*projection).into();
        self.refresh_mvp();
    }

    /// Model matrix as a nalgebra matrix
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from(self.model)
    }

    fn refresh_mvp(&mut self) {
        let mvp = Mat4::from(self.projection) * Mat4::from(self.view) * Mat4::from(self.model);
        self.mvp = mvp.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use approx::assert_relative_eq;

    #[test]
    fn test_transform_data_layout() {
        assert_eq!(std::mem::size_of::<TransformData>(), 4 * 64);
        let data = TransformData::default();
        assert_eq!(bytemuck::bytes_of(&data).len(), 256);
    }

    #[test]
    fn test_mvp_tracks_inputs() {
        let mut data = TransformData::default();
        let model = Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0));
        let view = Mat4::new_translation(&Vec3::new(0.0, 0.0, -5.0));
        data.set_model(&model);
        data.set_camera(&view, &Mat4::identity());

        assert_relative_eq!(data.model_matrix(), model);
        assert_relative_eq!(Mat4::from(data.mvp), view * model);
    }
}
