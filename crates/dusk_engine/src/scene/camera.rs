//! Perspective camera
//!
//! View and projection matrices are cached separately and only rebuilt when
//! one of their inputs changes. A camera can also drift: velocity added with
//! [`Camera::add_velocity`] is applied on every [`Camera::update`] and decays
//! by the friction factor until it snaps to zero.

use std::cell::Cell;

use bitflags::bitflags;

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

bitflags! {
    /// Cached matrices that need rebuilding
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CameraDirty: u8 {
        /// View matrix is stale
        const VIEW = 1 << 0;
        /// Projection matrix is stale
        const PROJECTION = 1 << 1;
    }
}

/// Velocity decay applied per update
pub const DEFAULT_FRICTION: f32 = 0.9;

/// Velocity components below this magnitude snap to zero
pub const ZERO_CLAMP: f32 = 1e-4;

/// Perspective camera
#[derive(Debug, Clone)]
pub struct Camera {
    base: Mat4,
    position: Vec3,
    forward: Vec3,
    up: Vec3,
    fov: f32,
    aspect: f32,
    near: f32,
    far: f32,
    velocity: Vec3,
    friction: f32,
    dirty: Cell<CameraDirty>,
    view: Cell<Mat4>,
    projection: Cell<Mat4>,
}

impl Camera {
    /// Camera at the origin looking down -Z with a 45 degree field of view
    pub fn new(aspect: f32) -> Self {
        Self {
            base: Mat4::identity(),
            position: Vec3::zeros(),
            forward: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(45.0),
            aspect,
            near: 0.1,
            far: 1000.0,
            velocity: Vec3::zeros(),
            friction: DEFAULT_FRICTION,
            dirty: Cell::new(CameraDirty::all()),
            view: Cell::new(Mat4::identity()),
            projection: Cell::new(Mat4::identity()),
        }
    }

    /// Camera for a viewport of `width` x `height` pixels
    pub fn for_viewport(width: u32, height: u32) -> Self {
        let aspect = if height == 0 { 1.0 } else { width as f32 / height as f32 };
        Self::new(aspect)
    }

    /// Set the transform the view is composed with (see [`CameraComponent`](super::CameraComponent))
    pub fn set_base_transform(&mut self, base: Mat4) {
        self.base = base;
        self.invalidate(CameraDirty::VIEW);
    }

    /// Set the eye position
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.invalidate(CameraDirty::VIEW);
    }

    /// Set the viewing direction
    pub fn set_forward(&mut self, forward: Vec3) {
        self.forward = forward;
        self.invalidate(CameraDirty::VIEW);
    }

    /// Set the up vector
    pub fn set_up(&mut self, up: Vec3) {
        self.up = up;
        self.invalidate(CameraDirty::VIEW);
    }

    /// Set the vertical field of view in radians
    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.invalidate(CameraDirty::PROJECTION);
    }

    /// Set the aspect ratio (width / height)
    pub fn set_aspect(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
        self.invalidate(CameraDirty::PROJECTION);
    }

    /// Set the near and far clip distances
    pub fn set_clip(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
        self.invalidate(CameraDirty::PROJECTION);
    }

    /// Set the velocity decay factor
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    /// Accelerate the camera
    pub fn add_velocity(&mut self, velocity: Vec3) {
        self.velocity += velocity;
    }

    /// Eye position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Viewing direction
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    /// Up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Vertical field of view in radians
    pub fn fov(&self) -> f32 {
        self.fov
    }

    /// Aspect ratio
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Near and far clip distances
    pub fn clip(&self) -> (f32, f32) {
        (self.near, self.far)
    }

    /// Current velocity
    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    /// Matrices awaiting a rebuild
    pub fn dirty(&self) -> CameraDirty {
        self.dirty.get()
    }

    /// Apply velocity for one frame
    pub fn update(&mut self) {
        if self.velocity == Vec3::zeros() {
            return;
        }

        self.position += self.velocity;
        self.invalidate(CameraDirty::VIEW);

        self.velocity *= self.friction;
        self.velocity = self.velocity.map(|v| utils::clamp_to_zero(v, ZERO_CLAMP));
    }

    /// World to view transform
    pub fn view(&self) -> Mat4 {
        if self.dirty.get().contains(CameraDirty::VIEW) {
            let view = Mat4::look_at(self.position, self.position + self.forward, self.up) * self.base;
            self.view.set(view);
            self.clean(CameraDirty::VIEW);
        }
        self.view.get()
    }

    /// View to clip transform
    pub fn projection(&self) -> Mat4 {
        if self.dirty.get().contains(CameraDirty::PROJECTION) {
            let projection = Mat4::perspective(self.fov, self.aspect, self.near, self.far);
            self.projection.set(projection);
            self.clean(CameraDirty::PROJECTION);
        }
        self.projection.get()
    }

    /// Projection * view
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    fn invalidate(&mut self, flags: CameraDirty) {
        self.dirty.set(self.dirty.get() | flags);
    }

    fn clean(&self, flags: CameraDirty) {
        self.dirty.set(self.dirty.get() - flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_view_looks_down_negative_z() {
        let camera = Camera::new(1.0);
        let point = camera.view().transform_point(&Point3::new(0.0, 0.0, -5.0));
        assert_relative_eq!(point.coords, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_matrices_are_tracked_independently() {
        let mut camera = Camera::new(16.0 / 9.0);
        assert_eq!(camera.dirty(), CameraDirty::all());

        camera.view();
        assert_eq!(camera.dirty(), CameraDirty::PROJECTION);
        camera.projection();
        assert!(camera.dirty().is_empty());

        camera.set_fov(1.0);
        assert_eq!(camera.dirty(), CameraDirty::PROJECTION);
        camera.set_position(Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(camera.dirty(), CameraDirty::all());
    }

    #[test]
    fn test_base_transform_is_applied_after_look_at() {
        let mut camera = Camera::new(1.0);
        let base = Mat4::new_translation(&Vec3::new(0.0, 0.0, -3.0));
        camera.set_base_transform(base);
        assert_relative_eq!(camera.view(), base, epsilon = 1e-6);
    }

    #[test]
    fn test_velocity_decays_to_zero() {
        let mut camera = Camera::new(1.0);
        camera.add_velocity(Vec3::new(1.0, 0.0, 0.0));

        camera.update();
        assert_relative_eq!(camera.position().x, 1.0);
        assert_relative_eq!(camera.velocity().x, 0.9);

        camera.update();
        assert_relative_eq!(camera.position().x, 1.9, epsilon = 1e-6);

        for _ in 0..200 {
            camera.update();
        }
        assert_eq!(camera.velocity(), Vec3::zeros());
        let settled = camera.position();
        camera.update();
        assert_eq!(camera.position(), settled);
    }

    #[test]
    fn test_projection_uses_clip_planes() {
        let mut camera = Camera::for_viewport(800, 600);
        camera.set_clip(1.0, 10.0);
        let near = camera.projection() * nalgebra::Vector4::new(0.0, 0.0, -1.0, 1.0);
        assert_relative_eq!(near.z / near.w, -1.0, epsilon = 1e-5);
        assert_relative_eq!(camera.aspect(), 800.0 / 600.0);
    }
}
