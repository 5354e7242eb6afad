//! Mesh drawing component

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::events::{Event, EventDispatcher, ObjectKey};
use crate::foundation::math::Mat4;
use crate::render::{Mesh, ShaderProgram, SharedBackend, TransformData};
use crate::scene::{Actor, ActorLink, Component, ComponentKind};

/// Draws a shared mesh with the owning actor's transform
///
/// On UPDATE the actor transform becomes the model matrix; on RENDER the
/// scene's current camera supplies view and projection, then every render
/// group binds its material and is drawn. A mesh or program that failed to
/// load makes the component inert.
pub struct MeshComponent {
    link: ActorLink,
    mesh: Rc<Mesh>,
    program: Option<Rc<ShaderProgram>>,
    backend: SharedBackend,
    transforms: RefCell<TransformData>,
    updates: Cell<u64>,
    renders: Cell<u64>,
    warned: Cell<bool>,
}

impl MeshComponent {
    /// Component drawing `mesh`, optionally with `program` bound first
    pub fn new(mesh: Rc<Mesh>, program: Option<Rc<ShaderProgram>>, backend: SharedBackend) -> Rc<Self> {
        Rc::new(Self {
            link: ActorLink::new(),
            mesh,
            program,
            backend,
            transforms: RefCell::new(TransformData::default()),
            updates: Cell::new(0),
            renders: Cell::new(0),
            warned: Cell::new(false),
        })
    }

    /// Drawn mesh
    pub fn mesh(&self) -> &Rc<Mesh> {
        &self.mesh
    }

    /// Whether every resource needed to draw loaded
    pub fn is_ready(&self) -> bool {
        self.mesh.is_loaded() && self.program.as_ref().map_or(true, |program| program.is_loaded())
    }

    /// UPDATE events received
    pub fn update_count(&self) -> u64 {
        self.updates.get()
    }

    /// RENDER events received
    pub fn render_count(&self) -> u64 {
        self.renders.get()
    }

    /// Model matrix pushed by the last update
    pub fn model_matrix(&self) -> Mat4 {
        self.transforms.borrow().model_matrix()
    }

    fn on_update(&self, _event: &Event) {
        self.updates.set(self.updates.get() + 1);
        if !self.is_ready() {
            return;
        }

        if let Some(actor) = self.link.get() {
            self.transforms.borrow_mut().set_model(&actor.transform());
        }
    }

    fn on_render(&self, _event: &Event) {
        self.renders.set(self.renders.get() + 1);

        let Some(mesh_handle) = self.mesh.handle().filter(|_| self.is_ready()) else {
            if !self.warned.replace(true) {
                log::warn!("Mesh '{}' is not loaded, skipping render", self.mesh.name());
            }
            return;
        };

        let (view, projection) = self
            .link
            .get()
            .and_then(|actor| actor.scene())
            .and_then(|scene| scene.camera_matrices())
            .unwrap_or_else(|| (Mat4::identity(), Mat4::identity()));

        let mut transforms = self.transforms.borrow_mut();
        transforms.set_camera(&view, &projection);

        let Ok(mut backend) = self.backend.try_borrow_mut() else {
            log::warn!("Graphics backend busy, skipping '{}'", self.mesh.name());
            return;
        };

        if let Some(program) = self.program.as_ref().and_then(|program| program.handle()) {
            backend.bind_program(program);
        }
        backend.upload_transforms(bytemuck::bytes_of(&*transforms));

        for group in self.mesh.render_groups() {
            if let Some(material) = group.material.as_ref().and_then(|material| material.handle()) {
                backend.bind_material(material);
            }
            backend.draw(mesh_handle, group.mode, group.start, group.count);
        }
    }
}

impl Component for MeshComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Mesh
    }

    fn actor(&self) -> Option<Rc<Actor>> {
        self.link.get()
    }

    fn attach(self: Rc<Self>, actor: &Rc<Actor>) {
        if !self.link.rebind(actor, ObjectKey::of(&*self)) {
            return;
        }

        let dispatcher = actor.dispatcher();
        dispatcher.add_method(Actor::UPDATE, Rc::downgrade(&self), Self::on_update);
        dispatcher.add_method(Actor::RENDER, Rc::downgrade(&self), Self::on_render);
    }

    fn detach(&self) {
        self.link.release(ObjectKey::of(self));
    }

    fn duplicate(&self) -> Option<Rc<dyn Component>> {
        Some(Self::new(
            Rc::clone(&self.mesh),
            self.program.clone(),
            Rc::clone(&self.backend),
        ))
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Drop for MeshComponent {
    fn drop(&mut self) {
        self.link.release(ObjectKey::of(&*self));
    }
}
