//! Meshes and render groups
//!
//! A [`Mesh`] keeps its CPU-side [`MeshData`] and the backend buffers made
//! from it. Draw calls are split into [`RenderGroup`]s, each a run of indices
//! sharing one material and primitive mode.

use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use super::backend::{detached, release};
use super::{Material, MeshHandle, SharedBackend, WeakBackend};
use crate::foundation::math::{Bounds, Vec3};

/// Vertex layout uploaded to mesh buffers
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in model space
    pub position: [f32; 3],
    /// Normal vector
    pub normal: [f32; 3],
    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }
}

/// Primitive assembly mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    /// Independent triangles
    #[default]
    Triangles,
    /// Triangle strip
    TriangleStrip,
    /// Independent line segments
    Lines,
    /// Points
    Points,
}

/// CPU-side geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Index data
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Create mesh data from vertices and indices
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Axis-aligned bounds of the vertex positions
    pub fn bounds(&self) -> Option<Bounds> {
        let points: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|vertex| Vec3::from(vertex.position))
            .collect();
        Bounds::from_points(&points)
    }

    /// Box centered at the origin with per-face normals
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (x, y, z) = (width * 0.5, height * 0.5, depth * 0.5);

        // (normal, four corners counter-clockwise seen from outside)
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-x, -y, z], [x, -y, z], [x, y, z], [-x, y, z]]),
            ([0.0, 0.0, -1.0], [[x, -y, -z], [-x, -y, -z], [-x, y, -z], [x, y, -z]]),
            ([-1.0, 0.0, 0.0], [[-x, -y, -z], [-x, -y, z], [-x, y, z], [-x, y, -z]]),
            ([1.0, 0.0, 0.0], [[x, -y, z], [x, -y, -z], [x, y, -z], [x, y, z]]),
            ([0.0, 1.0, 0.0], [[-x, y, z], [x, y, z], [x, y, -z], [-x, y, -z]]),
            ([0.0, -1.0, 0.0], [[-x, -y, -z], [x, -y, -z], [x, -y, z], [-x, -y, z]]),
        ];
        let uvs = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];

        let mut vertices = Vec::with_capacity(24);
        let mut indices = Vec::with_capacity(36);
        for (normal, corners) in faces {
            let base = vertices.len() as u32;
            for (corner, uv) in corners.iter().zip(uvs) {
                vertices.push(Vertex::new(*corner, normal, uv));
            }
            indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
        }

        Self::new(vertices, indices)
    }

    /// Horizontal plane centered at the origin facing +Y
    pub fn plane(width: f32, depth: f32) -> Self {
        let (x, z) = (width * 0.5, depth * 0.5);
        let up = [0.0, 1.0, 0.0];
        let vertices = vec![
            Vertex::new([-x, 0.0, z], up, [0.0, 0.0]),
            Vertex::new([x, 0.0, z], up, [1.0, 0.0]),
            Vertex::new([x, 0.0, -z], up, [1.0, 1.0]),
            Vertex::new([-x, 0.0, -z], up, [0.0, 1.0]),
        ];
        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
    }
}

/// Run of indices drawn with one material and mode
#[derive(Debug, Clone)]
pub struct RenderGroup {
    /// Primitive mode
    pub mode: DrawMode,
    /// Shared material, `None` draws with whatever is bound
    pub material: Option<Rc<Material>>,
    /// First index
    pub start: u32,
    /// Number of indices
    pub count: u32,
}

impl RenderGroup {
    /// One group covering all of `data`
    pub fn whole(data: &MeshData, material: Option<Rc<Material>>) -> Self {
        Self {
            mode: DrawMode::Triangles,
            material,
            start: 0,
            count: data.indices.len() as u32,
        }
    }
}

/// Geometry uploaded to the graphics backend
pub struct Mesh {
    name: String,
    data: MeshData,
    bounds: Option<Bounds>,
    groups: Vec<RenderGroup>,
    handle: Option<MeshHandle>,
    backend: WeakBackend,
}

impl Mesh {
    /// Upload `data` and keep it for later inspection
    ///
    /// A backend failure is logged and yields a mesh that is not loaded.
    pub fn new(
        name: impl Into<String>,
        data: MeshData,
        groups: Vec<RenderGroup>,
        backend: &SharedBackend,
    ) -> Self {
        let name = name.into();
        let handle = match backend.borrow_mut().create_mesh(&data) {
            Ok(handle) => Some(handle),
            Err(e) => {
                log::error!("Failed to upload mesh '{}': {}", name, e);
                None
            }
        };

        Self {
            name,
            bounds: data.bounds(),
            data,
            groups,
            handle,
            backend: Rc::downgrade(backend),
        }
    }

    /// Placeholder for a mesh whose source could not be loaded
    pub fn unloaded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: MeshData::default(),
            bounds: None,
            groups: Vec::new(),
            handle: None,
            backend: detached(),
        }
    }

    /// Name used in diagnostics
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether backend buffers exist for this mesh
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Backend buffers
    pub fn handle(&self) -> Option<MeshHandle> {
        self.handle
    }

    /// CPU-side geometry
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Bounds of the geometry, `None` for an empty mesh
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Draw batches
    pub fn render_groups(&self) -> &[RenderGroup] {
        &self.groups
    }
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .field("groups", &self.groups.len())
            .finish()
    }
}

impl Drop for Mesh {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::debug!("Releasing mesh '{}'", self.name);
            release(&self.backend, &self.name, |backend| backend.destroy_mesh(handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{HeadlessBackend, ResourceKind};

    #[test]
    fn test_cuboid_geometry() {
        let data = MeshData::cuboid(2.0, 4.0, 6.0);
        assert_eq!(data.vertices.len(), 24);
        assert_eq!(data.indices.len(), 36);

        let bounds = data.bounds().unwrap();
        assert_eq!(bounds.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 2.0, 3.0));
        assert!(data.indices.iter().all(|&index| (index as usize) < data.vertices.len()));
    }

    #[test]
    fn test_cuboid_faces_wind_outward() {
        let data = MeshData::cuboid(1.0, 1.0, 1.0);
        for triangle in data.indices.chunks(3) {
            let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(data.vertices[triangle[i] as usize].position));
            let normal = Vec3::from(data.vertices[triangle[0] as usize].normal);
            assert!((b - a).cross(&(c - a)).dot(&normal) > 0.0);
        }
    }

    #[test]
    fn test_plane_geometry() {
        let data = MeshData::plane(10.0, 4.0);
        let bounds = data.bounds().unwrap();
        assert_eq!(bounds.size(), Vec3::new(10.0, 0.0, 4.0));
        assert_eq!(data.indices.len(), 6);
    }

    #[test]
    fn test_mesh_releases_buffers_on_drop() {
        let headless = HeadlessBackend::new_shared();
        let backend: SharedBackend = headless.clone();

        let data = MeshData::plane(1.0, 1.0);
        let groups = vec![RenderGroup::whole(&data, None)];
        let mesh = Mesh::new("plane", data, groups, &backend);
        assert!(mesh.is_loaded());
        assert_eq!(mesh.render_groups()[0].count, 6);
        assert_eq!(headless.borrow().live_count(ResourceKind::Mesh), 1);

        drop(mesh);
        assert_eq!(headless.borrow().live_count(ResourceKind::Mesh), 0);
    }

    #[test]
    fn test_failed_upload_is_not_loaded() {
        let headless = HeadlessBackend::new_shared();
        headless.borrow_mut().fail_on(ResourceKind::Mesh);
        let backend: SharedBackend = headless.clone();

        let mesh = Mesh::new("cube", MeshData::cuboid(1.0, 1.0, 1.0), Vec::new(), &backend);
        assert!(!mesh.is_loaded());
        assert!(!Mesh::unloaded("missing").is_loaded());
    }
}
