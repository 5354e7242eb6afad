//! Script-driven behavior

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use crate::events::{EventDispatcher, ObjectKey};
use crate::scene::{Actor, ActorLink, Component, ComponentKind};
use crate::script::ScriptHost;

/// Runs one script file against its actor
///
/// The script subscribes itself to events through the host; detaching
/// removes every listener the host's context registered on the actor.
pub struct ScriptComponent {
    link: ActorLink,
    host: Rc<dyn ScriptHost>,
    filename: String,
    ready: Cell<bool>,
}

impl ScriptComponent {
    /// Component running `filename` in `host` once attached
    pub fn new(host: Rc<dyn ScriptHost>, filename: impl Into<String>) -> Rc<Self> {
        Rc::new(Self {
            link: ActorLink::new(),
            host,
            filename: filename.into(),
            ready: Cell::new(false),
        })
    }

    /// Script file path
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Scripting context
    pub fn host(&self) -> &Rc<dyn ScriptHost> {
        &self.host
    }

    /// Whether the script file ran successfully on the last attach
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    fn remove_script_listeners(&self, actor: &Actor) {
        let removed = actor.dispatcher().remove_script_listeners(self.host.context_id());
        if removed > 0 {
            log::debug!("Removed {} listeners of '{}' from '{}'", removed, self.filename, actor.name());
        }
    }
}

impl Component for ScriptComponent {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Script
    }

    fn actor(&self) -> Option<Rc<Actor>> {
        self.link.get()
    }

    fn attach(self: Rc<Self>, actor: &Rc<Actor>) {
        if let Some(previous) = self.link.get() {
            if Rc::ptr_eq(&previous, actor) {
                return;
            }
            self.remove_script_listeners(&previous);
        }
        self.link.rebind(actor, ObjectKey::of(&*self));

        self.host.bind_component(actor);
        match self.host.run_file(&self.filename) {
            Ok(()) => {
                log::debug!("Script '{}' attached to '{}'", self.filename, actor.name());
                self.ready.set(true);
            }
            Err(e) => {
                log::error!("Failed to run script for '{}': {}", actor.name(), e);
                self.ready.set(false);
            }
        }
    }

    fn detach(&self) {
        if let Some(actor) = self.link.get() {
            self.remove_script_listeners(&actor);
        }
        self.link.release(ObjectKey::of(self));
        self.ready.set(false);
    }

    fn duplicate(&self) -> Option<Rc<dyn Component>> {
        Some(Self::new(Rc::clone(&self.host), self.filename.clone()))
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

impl Drop for ScriptComponent {
    fn drop(&mut self) {
        self.detach();
    }
}
