//! Position, rotation and scale composed over an inherited base transform

use std::cell::Cell;

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Local transform of an actor or camera
///
/// The composed matrix is `base · S · Rx · Ry · Rz · T`. Chaining nodes by
/// setting `child.base = parent.transform()` yields the parent's composition
/// followed by the child's.
#[derive(Debug, Clone)]
pub struct TransformNode {
    base: Mat4,
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    cached: Cell<Option<Mat4>>,
}

impl Default for TransformNode {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformNode {
    /// Identity transform
    pub fn new() -> Self {
        Self {
            base: Mat4::identity(),
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            cached: Cell::new(None),
        }
    }

    /// Set the inherited transform
    pub fn set_base_transform(&mut self, base: Mat4) {
        self.base = base;
        self.invalidate();
    }

    /// Set the translation
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate();
    }

    /// Set the Euler rotation in radians
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.rotation = rotation;
        self.invalidate();
    }

    /// Set the per-axis scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.invalidate();
    }

    /// Inherited transform
    pub fn base_transform(&self) -> Mat4 {
        self.base
    }

    /// Translation
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Euler rotation in radians
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Per-axis scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Composed transform, recomputed after any change
    pub fn transform(&self) -> Mat4 {
        if let Some(cached) = self.cached.get() {
            return cached;
        }

        let transform = self.base
            * Mat4::new_nonuniform_scaling(&self.scale)
            * Mat4::rotation_x(self.rotation.x)
            * Mat4::rotation_y(self.rotation.y)
            * Mat4::rotation_z(self.rotation.z)
            * Mat4::new_translation(&self.position);
        self.cached.set(Some(transform));
        transform
    }

    fn invalidate(&mut self) {
        self.cached.set(None);
    }
}
