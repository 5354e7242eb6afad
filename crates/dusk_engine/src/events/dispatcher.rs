//! Per-instance dispatch table
//!
//! Listeners may add or remove listeners (including themselves) from inside
//! their own invocation. Dispatch never holds a borrow of the table while a
//! callback runs: it walks the list by index, removal only marks entries
//! dead while a dispatch of that id is in flight, and dead entries are
//! compacted once the outermost dispatch of the id returns.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::{Callback, CallbackKey, Event, EventId, FunctionCallback, MethodCallback, ObjectKey};
use crate::script::ScriptContextId;

struct Listener {
    callback: Box<dyn Callback>,
    alive: Cell<bool>,
}

impl Listener {
    fn is_alive(&self) -> bool {
        self.alive.get()
    }

    fn kill(&self) {
        self.alive.set(false);
    }
}

#[derive(Default)]
struct ListenerList {
    entries: Vec<Rc<Listener>>,
    dispatching: u32,
}

impl ListenerList {
    fn live(&self) -> impl Iterator<Item = &Rc<Listener>> {
        self.entries.iter().filter(|listener| listener.is_alive())
    }

    /// Kill every live listener matching `predicate`, then compact when idle
    fn remove_where(&mut self, mut predicate: impl FnMut(&CallbackKey) -> bool) -> usize {
        let mut removed = 0;
        for listener in &self.entries {
            if listener.is_alive() && predicate(&listener.callback.key()) {
                listener.kill();
                removed += 1;
            }
        }
        self.compact();
        removed
    }

    fn compact(&mut self) {
        if self.dispatching == 0 {
            self.entries.retain(|listener| listener.is_alive());
        }
    }

    fn is_disposable(&self) -> bool {
        self.dispatching == 0 && self.entries.is_empty()
    }
}

/// Event dispatch table owned by one object
#[derive(Default)]
pub struct Dispatcher {
    table: RefCell<HashMap<EventId, ListenerList>>,
}

impl Dispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `id`
    ///
    /// No de-duplication is performed. A listener added while `id` is being
    /// dispatched is first invoked by the next dispatch.
    pub fn add_listener(&self, id: EventId, callback: impl Callback + 'static) {
        self.table
            .borrow_mut()
            .entry(id)
            .or_default()
            .entries
            .push(Rc::new(Listener {
                callback: Box::new(callback),
                alive: Cell::new(true),
            }));
    }

    /// Append a free function listener
    pub fn add_function(&self, id: EventId, function: fn(&Event)) {
        self.add_listener(id, FunctionCallback::new(function));
    }

    /// Append a method listener bound to `object`
    pub fn add_method<T: 'static>(&self, id: EventId, object: Weak<T>, method: fn(&T, &Event)) {
        self.add_listener(id, MethodCallback::new(object, method));
    }

    /// Remove the first live listener for `id` matching `key`
    ///
    /// Unknown keys are ignored. Returns whether a listener was removed.
    pub fn remove_listener(&self, id: EventId, key: &CallbackKey) -> bool {
        let mut table = self.table.borrow_mut();
        let Some(list) = table.get_mut(&id) else {
            return false;
        };

        let Some(listener) = list.live().find(|listener| listener.callback.key() == *key) else {
            return false;
        };
        listener.kill();
        list.compact();

        if list.is_disposable() {
            table.remove(&id);
        }
        true
    }

    /// Remove a free function listener
    pub fn remove_function(&self, id: EventId, function: fn(&Event)) -> bool {
        self.remove_listener(id, &CallbackKey::function(function))
    }

    /// Remove a method listener bound to `object`
    pub fn remove_method<T>(&self, id: EventId, object: &T, method: fn(&T, &Event)) -> bool {
        self.remove_listener(id, &CallbackKey::method(object, method))
    }

    /// Remove every method listener bound to `object`, for any id
    pub fn remove_listeners_of(&self, object: ObjectKey) -> usize {
        self.remove_all_where(|key| key.is_bound_to(object))
    }

    /// Remove every listener registered by one script context
    pub fn remove_script_listeners(&self, context: ScriptContextId) -> usize {
        self.remove_all_where(|key| key.is_in_script(context))
    }

    /// Remove every listener for one id
    pub fn remove_all_listeners_for(&self, id: EventId) {
        let mut table = self.table.borrow_mut();
        if let Some(list) = table.get_mut(&id) {
            list.remove_where(|_| true);
            if list.is_disposable() {
                table.remove(&id);
            }
        }
    }

    /// Remove every listener for every id
    pub fn remove_all_listeners(&self) {
        self.remove_all_where(|_| true);
    }

    fn remove_all_where(&self, mut predicate: impl FnMut(&CallbackKey) -> bool) -> usize {
        let mut table = self.table.borrow_mut();
        let removed = table
            .values_mut()
            .map(|list| list.remove_where(&mut predicate))
            .sum();
        table.retain(|_, list| !list.is_disposable());
        removed
    }

    /// Invoke every live listener for `event.id` in registration order
    pub fn dispatch(&self, event: &Event) {
        let count = {
            let mut table = self.table.borrow_mut();
            let Some(list) = table.get_mut(&event.id) else {
                return;
            };
            list.dispatching += 1;
            list.entries.len()
        };

        for index in 0..count {
            // Entries are never erased while the id is dispatching, so indices are stable
            let listener = self
                .table
                .borrow()
                .get(&event.id)
                .and_then(|list| list.entries.get(index).cloned());

            match listener {
                Some(listener) if listener.is_alive() => listener.callback.invoke(event),
                Some(_) => {}
                None => break,
            }
        }

        let mut table = self.table.borrow_mut();
        if let Some(list) = table.get_mut(&event.id) {
            list.dispatching = list.dispatching.saturating_sub(1);
            list.compact();
            if list.is_disposable() {
                table.remove(&event.id);
            }
        }
    }

    /// Number of live listeners for `id`
    pub fn listener_count(&self, id: EventId) -> usize {
        self.table
            .borrow()
            .get(&id)
            .map_or(0, |list| list.live().count())
    }

    /// Whether `id` has at least one live listener
    pub fn has_listeners(&self, id: EventId) -> bool {
        self.listener_count(id) > 0
    }

    /// Ids with at least one live listener, in ascending order
    pub fn event_ids(&self) -> Vec<EventId> {
        let mut ids: Vec<EventId> = self
            .table
            .borrow()
            .iter()
            .filter(|(_, list)| list.live().next().is_some())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        let table = self.table.get_mut();
        let remaining: usize = table.values().map(|list| list.live().count()).sum();
        if remaining > 0 {
            log::trace!("Dispatcher dropped with {} live listeners", remaining);
        }
        table.clear();
    }
}

/// Capability of objects that own a [`Dispatcher`]
pub trait EventDispatcher {
    /// The owned dispatch table
    fn dispatcher(&self) -> &Dispatcher;

    /// Register a listener on this object
    fn add_event_listener(&self, id: EventId, callback: impl Callback + 'static)
    where
        Self: Sized,
    {
        self.dispatcher().add_listener(id, callback);
    }

    /// Remove a listener from this object
    fn remove_event_listener(&self, id: EventId, key: &CallbackKey) -> bool {
        self.dispatcher().remove_listener(id, key)
    }

    /// Fire an event on this object
    fn dispatch_event(&self, event: &Event) {
        self.dispatcher().dispatch(event);
    }
}
