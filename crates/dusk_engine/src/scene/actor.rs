//! Actors
//!
//! An actor owns a transform node and a list of components. While attached
//! to a scene it listens to the scene's UPDATE and RENDER events and fires
//! its own [`Actor::UPDATE`] and [`Actor::RENDER`] for its components.

use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use super::{Component, ComponentKind, Scene, TransformNode};
use crate::events::{Dispatcher, Event, EventDispatcher, EventId, EventTarget, ObjectKey};
use crate::foundation::math::{Mat4, Vec3};

/// Named entity composed of components
pub struct Actor {
    name: String,
    tags: RefCell<Vec<String>>,
    template: bool,
    transform: RefCell<TransformNode>,
    components: RefCell<Vec<Rc<dyn Component>>>,
    scene: RefCell<Weak<Scene>>,
    dispatcher: Dispatcher,
    self_ref: Weak<Actor>,
}

impl Actor {
    /// Fired once per scene update, same payload as the scene's event
    pub const UPDATE: EventId = EventId::namespaced(EventId::ACTOR_PREFIX, 1);
    /// Fired once per scene render
    pub const RENDER: EventId = EventId::namespaced(EventId::ACTOR_PREFIX, 2);

    /// Create a detached actor
    pub fn new(name: impl Into<String>) -> Rc<Self> {
        Self::build(name.into(), false)
    }

    /// Create a prototype that never receives frame events
    pub fn new_template(name: impl Into<String>) -> Rc<Self> {
        Self::build(name.into(), true)
    }

    fn build(name: String, template: bool) -> Rc<Self> {
        Rc::new_cyclic(|self_ref| Self {
            name,
            tags: RefCell::new(Vec::new()),
            template,
            transform: RefCell::new(TransformNode::new()),
            components: RefCell::new(Vec::new()),
            scene: RefCell::new(Weak::new()),
            dispatcher: Dispatcher::new(),
            self_ref: self_ref.clone(),
        })
    }

    /// Name, unique within the owning scene
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this actor is a prototype
    pub fn is_template(&self) -> bool {
        self.template
    }

    /// Add a lookup tag
    pub fn add_tag(&self, tag: impl Into<String>) {
        let tag = tag.into();
        let mut tags = self.tags.borrow_mut();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }

    /// Whether `tag` was added
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.borrow().iter().any(|t| t == tag)
    }

    /// Tags in insertion order
    pub fn tags(&self) -> Vec<String> {
        self.tags.borrow().clone()
    }

    /// Composed transform
    pub fn transform(&self) -> Mat4 {
        self.transform.borrow().transform()
    }

    /// Transform node
    pub fn transform_node(&self) -> Ref<'_, TransformNode> {
        self.transform.borrow()
    }

    /// Set the inherited transform
    pub fn set_base_transform(&self, base: Mat4) {
        self.transform.borrow_mut().set_base_transform(base);
    }

    /// Set the translation
    pub fn set_position(&self, position: Vec3) {
        self.transform.borrow_mut().set_position(position);
    }

    /// Set the Euler rotation in radians
    pub fn set_rotation(&self, rotation: Vec3) {
        self.transform.borrow_mut().set_rotation(rotation);
    }

    /// Set the per-axis scale
    pub fn set_scale(&self, scale: Vec3) {
        self.transform.borrow_mut().set_scale(scale);
    }

    /// Owning scene, if attached and alive
    pub fn scene(&self) -> Option<Rc<Scene>> {
        self.scene.borrow().upgrade()
    }

    /// Attach to `scene`, subscribing to its UPDATE and RENDER events
    ///
    /// A previous scene is unsubscribed from first. Templates keep the
    /// back-reference but never subscribe.
    pub fn set_scene(&self, scene: &Rc<Scene>) {
        if self.scene.borrow().ptr_eq(&Rc::downgrade(scene)) {
            return;
        }

        self.leave_scene();
        *self.scene.borrow_mut() = Rc::downgrade(scene);

        if self.template {
            log::debug!("Template '{}' bound to scene '{}' without subscribing", self.name, scene.name());
            return;
        }

        scene
            .dispatcher()
            .add_method(Scene::UPDATE, self.self_ref.clone(), Self::on_update);
        scene
            .dispatcher()
            .add_method(Scene::RENDER, self.self_ref.clone(), Self::on_render);
    }

    /// Drop the scene back-reference and its subscriptions
    pub(crate) fn leave_scene(&self) {
        let previous = self.scene.replace(Weak::new());
        if let Some(scene) = previous.upgrade() {
            scene.dispatcher().remove_listeners_of(ObjectKey::of(self));
        }
    }

    /// Take ownership of `component` and attach it
    pub fn add_component(&self, component: Rc<dyn Component>) {
        let Some(actor) = self.self_ref.upgrade() else {
            return;
        };

        self.components.borrow_mut().push(Rc::clone(&component));
        component.attach(&actor);
    }

    /// Detach and release `component`
    ///
    /// Returns whether the component was owned by this actor.
    pub fn remove_component(&self, component: &Rc<dyn Component>) -> bool {
        let removed = {
            let mut components = self.components.borrow_mut();
            let before = components.len();
            components.retain(|owned| !Rc::ptr_eq(owned, component));
            components.len() != before
        };

        if removed {
            component.detach();
        }
        removed
    }

    /// Every component, in attach order
    pub fn components(&self) -> Vec<Rc<dyn Component>> {
        self.components.borrow().clone()
    }

    /// Components of one kind, in attach order
    pub fn components_of_kind(&self, kind: ComponentKind) -> Vec<Rc<dyn Component>> {
        self.components
            .borrow()
            .iter()
            .filter(|component| component.kind() == kind)
            .cloned()
            .collect()
    }

    /// First component of concrete type `T`
    pub fn component<T: Component>(&self) -> Option<Rc<T>> {
        self.components
            .borrow()
            .iter()
            .find_map(|component| Rc::clone(component).into_any().downcast::<T>().ok())
    }

    /// Every component of concrete type `T`
    pub fn components_of<T: Component>(&self) -> Vec<Rc<T>> {
        self.components
            .borrow()
            .iter()
            .filter_map(|component| Rc::clone(component).into_any().downcast::<T>().ok())
            .collect()
    }

    /// Detached copy named `name` with this actor's tags, transform and duplicable components
    pub fn duplicate(&self, name: impl Into<String>) -> Rc<Actor> {
        let copy = Actor::new(name);
        *copy.tags.borrow_mut() = self.tags();
        *copy.transform.borrow_mut() = self.transform.borrow().clone();

        for component in self.components() {
            match component.duplicate() {
                Some(duplicate) => copy.add_component(duplicate),
                None => log::debug!("Skipping non-duplicable {:?} component of '{}'", component.kind(), self.name),
            }
        }
        copy
    }

    fn target(&self) -> EventTarget {
        EventTarget::Actor(self.self_ref.clone())
    }

    fn on_update(&self, event: &Event) {
        self.dispatcher.dispatch(&event.forward(Self::UPDATE, self.target()));
    }

    fn on_render(&self, _event: &Event) {
        self.dispatcher
            .dispatch(&Event::new(Self::RENDER).with_target(self.target()));
    }
}

impl EventDispatcher for Actor {
    fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("name", &self.name)
            .field("template", &self.template)
            .field("components", &self.components.borrow().len())
            .finish()
    }
}

impl Drop for Actor {
    fn drop(&mut self) {
        if let Some(scene) = self.scene.get_mut().upgrade() {
            scene.dispatcher().remove_listeners_of(ObjectKey::of(&*self));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CallbackKey;
    use std::cell::Cell;

    /// Counts the owner's events
    struct Probe {
        link: super::super::ActorLink,
        updates: Cell<u32>,
        renders: Cell<u32>,
        kind: ComponentKind,
    }

    impl Probe {
        fn new(kind: ComponentKind) -> Rc<Self> {
            Rc::new(Self {
                link: Default::default(),
                updates: Cell::new(0),
                renders: Cell::new(0),
                kind,
            })
        }

        fn on_update(&self, _event: &Event) {
            self.updates.set(self.updates.get() + 1);
        }

        fn on_render(&self, _event: &Event) {
            self.renders.set(self.renders.get() + 1);
        }
    }

    impl Component for Probe {
        fn kind(&self) -> ComponentKind {
            self.kind
        }

        fn actor(&self) -> Option<Rc<Actor>> {
            self.link.get()
        }

        fn attach(self: Rc<Self>, actor: &Rc<Actor>) {
            if self.link.rebind(actor, ObjectKey::of(&*self)) {
                actor.dispatcher().add_method(Actor::UPDATE, Rc::downgrade(&self), Self::on_update);
                actor.dispatcher().add_method(Actor::RENDER, Rc::downgrade(&self), Self::on_render);
            }
        }

        fn detach(&self) {
            self.link.release(ObjectKey::of(self));
        }

        fn duplicate(&self) -> Option<Rc<dyn Component>> {
            Some(Probe::new(self.kind))
        }

        fn into_any(self: Rc<Self>) -> Rc<dyn std::any::Any> {
            self
        }
    }

    #[test]
    fn test_components_receive_actor_events() {
        let actor = Actor::new("hero");
        let probe = Probe::new(ComponentKind::Custom("probe"));
        actor.add_component(probe.clone());

        actor.dispatch_event(&Event::new(Actor::UPDATE));
        actor.dispatch_event(&Event::new(Actor::RENDER));
        assert_eq!((probe.updates.get(), probe.renders.get()), (1, 1));
        assert!(probe.actor().is_some_and(|owner| Rc::ptr_eq(&owner, &actor)));
    }

    #[test]
    fn test_remove_component_unsubscribes() {
        let actor = Actor::new("hero");
        let probe: Rc<dyn Component> = Probe::new(ComponentKind::Mesh);
        actor.add_component(Rc::clone(&probe));
        assert_eq!(actor.dispatcher().listener_count(Actor::UPDATE), 1);

        assert!(actor.remove_component(&probe));
        assert!(!actor.remove_component(&probe));
        assert!(actor.dispatcher().event_ids().is_empty());
        assert!(probe.actor().is_none());
    }

    #[test]
    fn test_reattach_moves_subscriptions() {
        let first = Actor::new("first");
        let second = Actor::new("second");
        let probe = Probe::new(ComponentKind::Script);

        Rc::clone(&probe).attach(&first);
        Rc::clone(&probe).attach(&first);
        assert_eq!(first.dispatcher().listener_count(Actor::UPDATE), 1);

        Rc::clone(&probe).attach(&second);
        assert!(!first.dispatcher().has_listeners(Actor::UPDATE));
        assert_eq!(second.dispatcher().listener_count(Actor::RENDER), 1);
    }

    #[test]
    fn test_dropped_component_is_skipped() {
        let actor = Actor::new("hero");
        let probe = Probe::new(ComponentKind::Mesh);
        Rc::clone(&probe).attach(&actor);
        let key = CallbackKey::method(&*probe, Probe::on_update);

        drop(probe);
        // Listener survives until removed, but is skipped once the object is gone
        actor.dispatch_event(&Event::new(Actor::UPDATE));
        assert!(actor.remove_event_listener(Actor::UPDATE, &key));
    }

    #[test]
    fn test_typed_lookup() {
        let actor = Actor::new("hero");
        actor.add_component(Probe::new(ComponentKind::Mesh));
        actor.add_component(Probe::new(ComponentKind::Script));

        assert_eq!(actor.components_of_kind(ComponentKind::Mesh).len(), 1);
        assert!(actor.components_of_kind(ComponentKind::Camera).is_empty());
        assert_eq!(actor.components_of::<Probe>().len(), 2);
        assert_eq!(actor.component::<Probe>().map(|probe| probe.kind), Some(ComponentKind::Mesh));
    }

    #[test]
    fn test_tags_and_duplicate() {
        let actor = Actor::new_template("crate");
        actor.add_tag("prop");
        actor.add_tag("prop");
        actor.set_position(Vec3::new(1.0, 2.0, 3.0));
        actor.add_component(Probe::new(ComponentKind::Mesh));

        let copy = actor.duplicate("crate_1");
        assert!(!copy.is_template());
        assert_eq!(copy.tags(), vec!["prop".to_string()]);
        assert_eq!(copy.transform(), actor.transform());
        assert_eq!(copy.components().len(), 1);
        assert!(copy.has_tag("prop"));
        assert!(!copy.has_tag("hero"));
    }
}
