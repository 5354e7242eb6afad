//! Behavior units attached to actors
//!
//! A component is owned by exactly one [`Actor`] and holds a weak link back
//! to it. Attaching subscribes the component to its owner's events, and
//! detaching (explicitly or on drop) removes every listener the component
//! registered there.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::Actor;
use crate::events::{EventDispatcher, ObjectKey};

/// Closed set of component kinds used for typed lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Draws a mesh
    Mesh,
    /// Drives a scene camera from the actor transform
    Camera,
    /// Runs a script
    Script,
    /// Application-defined kind
    Custom(&'static str),
}

/// Behavior attached to an actor
pub trait Component: 'static {
    /// Kind used for lookup
    fn kind(&self) -> ComponentKind;

    /// Owning actor, if attached and alive
    fn actor(&self) -> Option<Rc<Actor>>;

    /// Bind to `actor` and subscribe to its events
    ///
    /// Attaching to a different actor first unsubscribes from the previous
    /// one; attaching twice to the same actor is a no-op.
    fn attach(self: Rc<Self>, actor: &Rc<Actor>);

    /// Unsubscribe from the owner's events and forget it
    ///
    /// Safe to call when not attached.
    fn detach(&self);

    /// Fresh unattached copy, used when instantiating actor templates
    ///
    /// Components that cannot be copied return `None` and are skipped.
    fn duplicate(&self) -> Option<Rc<dyn Component>> {
        None
    }

    /// Upcast for typed lookup
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// Weak link from a component to its owning actor
#[derive(Debug, Default)]
pub struct ActorLink {
    owner: RefCell<Weak<Actor>>,
}

impl ActorLink {
    /// Unattached link
    pub fn new() -> Self {
        Self::default()
    }

    /// Owning actor, if alive
    pub fn get(&self) -> Option<Rc<Actor>> {
        self.owner.borrow().upgrade()
    }

    /// Point the link at `actor`
    ///
    /// Listeners `object` registered on a previous owner are removed. Returns
    /// `false` when already bound to `actor`, in which case nothing changes.
    pub fn rebind(&self, actor: &Rc<Actor>, object: ObjectKey) -> bool {
        let previous = self.owner.replace(Rc::downgrade(actor));
        if previous.ptr_eq(&Rc::downgrade(actor)) {
            return false;
        }

        if let Some(previous) = previous.upgrade() {
            log::debug!("Moving component from '{}' to '{}'", previous.name(), actor.name());
            previous.dispatcher().remove_listeners_of(object);
        }
        true
    }

    /// Remove every listener `object` registered on the owner and forget it
    pub fn release(&self, object: ObjectKey) {
        let previous = self.owner.replace(Weak::new());
        if let Some(actor) = previous.upgrade() {
            actor.dispatcher().remove_listeners_of(object);
        }
    }
}
