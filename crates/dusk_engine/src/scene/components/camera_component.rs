//! Camera driven by an actor transform

use std::any::Any;
use std::rc::{Rc, Weak};

use crate::events::{Event, EventDispatcher, ObjectKey};
use crate::foundation::collections::CameraId;
use crate::foundation::math::Mat4Ext;
use crate::scene::{Actor, ActorLink, Camera, Component, ComponentKind, Scene, SceneError};

/// Places a scene-owned camera at its actor
///
/// Each UPDATE the camera's base transform becomes the inverse of the actor
/// transform, so the camera looks out of the actor's frame. The camera is
/// released from the scene when the component drops.
pub struct CameraComponent {
    link: ActorLink,
    scene: Weak<Scene>,
    camera: CameraId,
}

impl CameraComponent {
    /// Hand `camera` to `scene` and wrap it
    pub fn new(scene: &Rc<Scene>, camera: Camera) -> Rc<Self> {
        let camera = scene.add_camera(camera);
        Rc::new(Self {
            link: ActorLink::new(),
            scene: Rc::downgrade(scene),
            camera,
        })
    }

    /// Handle of the driven camera inside its scene
    pub fn camera_id(&self) -> CameraId {
        self.camera
    }

    /// Make the driven camera the scene's current one
    pub fn make_current(&self) -> Result<(), SceneError> {
        let scene = self.scene.upgrade().ok_or(SceneError::UnknownCamera)?;
        scene.set_current_camera(self.camera)
    }

    fn on_update(&self, _event: &Event) {
        let (Some(actor), Some(scene)) = (self.link.get(), self.scene.upgrade()) else {
            return;
        };

        let base = actor.transform().inverse_or_identity();
        if scene.with_camera_mut(self.camera, |camera| camera.set_base_transform(base)).is_none() {
            log::warn!("Camera of '{}' was removed from scene '{}'", actor.name(), scene.name());
        }
    }
}

impl Component for CameraComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Camera
    }

    fn actor(&self) -> Option<Rc<Actor>> {
        self.link.get()
    }

    fn attach(self: Rc<Self>, actor: &Rc<Actor>) {
        if self.link.rebind(actor, ObjectKey::of(&*self)) {
            actor
                .dispatcher()
                .add_method(Actor::UPDATE, Rc::downgrade(&self), Self::on_update);
        }
    }

    fn detach(&self) {
        self.link.release(ObjectKey::of(self));
    }

    fn duplicate(&self) -> Option<Rc<dyn Component>> {
        let scene = self.scene.upgrade()?;
        let camera = scene.with_camera(self.camera, Camera::clone)?;
        Some(Self::new(&scene, camera))
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Drop for CameraComponent {
    fn drop(&mut self) {
        self.link.release(ObjectKey::of(&*self));
        if let Some(scene) = self.scene.upgrade() {
            scene.remove_camera(self.camera);
        }
    }
}
