//! Event core
//!
//! Events are identified by small integers namespaced per owner kind, carry a
//! cheap-to-clone payload and a weak reference to whoever fired them, and are
//! delivered synchronously by a per-instance [`Dispatcher`].
//!
//! Owner kinds reserve id ranges so identifiers never collide even though every
//! dispatch table belongs to a single object:
//!
//! | owner  | prefix | ids                                   |
//! |--------|--------|---------------------------------------|
//! | App    | 0      | `App::UPDATE`, `App::RENDER`          |
//! | Scene  | 100    | `Scene::START` .. `Scene::RENDER`     |
//! | Actor  | 200    | `Actor::UPDATE`, `Actor::RENDER`      |
//! | user   | 1000   | [`EventId::user`]                     |

mod callback;
mod dispatcher;

pub use callback::{
    Callback, CallbackKey, FunctionCallback, MethodCallback, ObjectKey, ScriptCallback,
};
pub use dispatcher::{Dispatcher, EventDispatcher};

use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::app::App;
use crate::scene::{Actor, Scene};

/// Opaque event identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u32);

impl EventId {
    /// Id range reserved for the frame driver
    pub const APP_PREFIX: u32 = 0;
    /// Id range reserved for scenes
    pub const SCENE_PREFIX: u32 = 100;
    /// Id range reserved for actors
    pub const ACTOR_PREFIX: u32 = 200;
    /// First id available to scripts and applications
    pub const USER_PREFIX: u32 = 1000;

    /// Wrap a raw id
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Id `offset` inside the range starting at `prefix`
    pub const fn namespaced(prefix: u32, offset: u32) -> Self {
        Self(prefix + offset)
    }

    /// Application-defined id
    pub const fn user(offset: u32) -> Self {
        Self::namespaced(Self::USER_PREFIX, offset)
    }

    /// Raw integer value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

/// Per-frame timing delivered with update events
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateContext {
    /// Seconds covered by this update
    pub delta_time: f32,
    /// Seconds since the previous render
    pub elapsed_time: f32,
    /// Seconds since the frame driver started
    pub total_time: f32,
    /// Frames per second derived from the last step
    pub fps: f32,
}

/// Event payload
///
/// Cloning is cheap: arbitrary values are shared behind an `Rc`.
#[derive(Debug, Clone, Default)]
pub enum EventData {
    /// Canonical empty payload
    #[default]
    Empty,
    /// Frame timing
    Update(UpdateContext),
    /// Arbitrary value, typically from scripts
    Value(Rc<dyn Any>),
}

impl EventData {
    /// Wrap an arbitrary value
    pub fn value<T: Any>(value: T) -> Self {
        Self::Value(Rc::new(value))
    }

    /// Whether this is the empty payload
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Object that fired an event
#[derive(Debug, Clone, Default)]
pub enum EventTarget {
    /// Fired without an owner
    #[default]
    None,
    /// Fired by the frame driver
    App(Weak<App>),
    /// Fired by a scene
    Scene(Weak<Scene>),
    /// Fired by an actor
    Actor(Weak<Actor>),
}

impl EventTarget {
    /// Firing scene, if still alive
    pub fn scene(&self) -> Option<Rc<Scene>> {
        match self {
            Self::Scene(scene) => scene.upgrade(),
            _ => None,
        }
    }

    /// Firing actor, if still alive
    pub fn actor(&self) -> Option<Rc<Actor>> {
        match self {
            Self::Actor(actor) => actor.upgrade(),
            _ => None,
        }
    }

    /// Firing frame driver, if still alive
    pub fn app(&self) -> Option<Rc<App>> {
        match self {
            Self::App(app) => app.upgrade(),
            _ => None,
        }
    }
}

/// A fired event
#[derive(Debug, Clone)]
pub struct Event {
    /// Identifier
    pub id: EventId,
    /// Payload
    pub data: EventData,
    /// Firing object
    pub target: EventTarget,
}

impl Event {
    /// Event with an empty payload and no target
    pub fn new(id: EventId) -> Self {
        Self {
            id,
            data: EventData::Empty,
            target: EventTarget::None,
        }
    }

    /// Replace the payload (builder pattern)
    pub fn with_data(mut self, data: EventData) -> Self {
        self.data = data;
        self
    }

    /// Replace the target (builder pattern)
    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }

    /// Frame timing, if this event carries it
    pub fn update_context(&self) -> Option<&UpdateContext> {
        match &self.data {
            EventData::Update(context) => Some(context),
            _ => None,
        }
    }

    /// Typed view of a [`EventData::Value`] payload
    pub fn value<T: Any>(&self) -> Option<&T> {
        match &self.data {
            EventData::Value(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Same payload under a different id, fired by `target`
    pub fn forward(&self, id: EventId, target: EventTarget) -> Self {
        Self {
            id,
            data: self.data.clone(),
            target,
        }
    }
}
