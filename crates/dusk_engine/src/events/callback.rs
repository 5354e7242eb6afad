//! Listener callbacks
//!
//! Three kinds of callback share the [`Callback`] interface. Callbacks are
//! not addressable by handle once registered; removal matches on their
//! [`CallbackKey`] instead.

use std::rc::Weak;

use super::Event;
use crate::script::{ScriptContextId, ScriptHost};

/// Address of a shared object, used to match listeners bound to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Key of the object behind `object`
    pub fn of<T: ?Sized>(object: &T) -> Self {
        Self((object as *const T).cast::<()>() as usize)
    }

    /// Key of the object a weak reference points to
    pub fn of_weak<T>(object: &Weak<T>) -> Self {
        Self(object.as_ptr().cast::<()>() as usize)
    }
}

/// Equality key of a callback
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallbackKey {
    /// Free function, by address
    Function(usize),
    /// Method bound to an object
    Method {
        /// Bound object
        object: ObjectKey,
        /// Method address
        method: usize,
    },
    /// Function inside a script context
    Script {
        /// Owning script context
        context: ScriptContextId,
        /// Function name
        function: String,
    },
}

impl CallbackKey {
    /// Key of a free function callback
    pub fn function(function: fn(&Event)) -> Self {
        Self::Function(function as usize)
    }

    /// Key of a method callback bound to `object`
    pub fn method<T: ?Sized>(object: &T, method: fn(&T, &Event)) -> Self {
        Self::Method {
            object: ObjectKey::of(object),
            method: method as usize,
        }
    }

    /// Key of a script callback
    pub fn script(context: ScriptContextId, function: impl Into<String>) -> Self {
        Self::Script {
            context,
            function: function.into(),
        }
    }

    /// Whether this callback is bound to `object`
    pub fn is_bound_to(&self, object: ObjectKey) -> bool {
        matches!(self, Self::Method { object: bound, .. } if *bound == object)
    }

    /// Whether this callback lives in the script context `context`
    pub fn is_in_script(&self, context: ScriptContextId) -> bool {
        matches!(self, Self::Script { context: owner, .. } if *owner == context)
    }
}

/// Listener interface stored in dispatch tables
pub trait Callback {
    /// Handle the event
    fn invoke(&self, event: &Event);

    /// Equality key used for removal
    fn key(&self) -> CallbackKey;
}

/// Free function listener
#[derive(Debug, Clone, Copy)]
pub struct FunctionCallback {
    function: fn(&Event),
}

impl FunctionCallback {
    /// Wrap a free function
    pub fn new(function: fn(&Event)) -> Self {
        Self { function }
    }
}

impl Callback for FunctionCallback {
    fn invoke(&self, event: &Event) {
        (self.function)(event);
    }

    fn key(&self) -> CallbackKey {
        CallbackKey::function(self.function)
    }
}

/// Method bound to a shared object
///
/// Holds the object weakly; once the object is gone the callback is skipped.
pub struct MethodCallback<T> {
    object: Weak<T>,
    method: fn(&T, &Event),
}

impl<T> MethodCallback<T> {
    /// Bind `method` to `object`
    pub fn new(object: Weak<T>, method: fn(&T, &Event)) -> Self {
        Self { object, method }
    }
}

impl<T> Callback for MethodCallback<T> {
    fn invoke(&self, event: &Event) {
        match self.object.upgrade() {
            Some(object) => (self.method)(&object, event),
            None => log::trace!("Skipping {} for a dropped listener object", event.id),
        }
    }

    fn key(&self) -> CallbackKey {
        CallbackKey::Method {
            object: ObjectKey::of_weak(&self.object),
            method: self.method as usize,
        }
    }
}

/// Function inside a script context
pub struct ScriptCallback {
    host: Weak<dyn ScriptHost>,
    context: ScriptContextId,
    function: String,
}

impl ScriptCallback {
    /// Callback invoking `function` through `host`
    pub fn new(host: Weak<dyn ScriptHost>, context: ScriptContextId, function: impl Into<String>) -> Self {
        Self {
            host,
            context,
            function: function.into(),
        }
    }
}

impl Callback for ScriptCallback {
    fn invoke(&self, event: &Event) {
        let Some(host) = self.host.upgrade() else {
            log::trace!("Script context {:?} is gone, skipping '{}'", self.context, self.function);
            return;
        };

        if let Err(e) = host.call_function(&self.function, event) {
            log::error!("Script function '{}' failed on {}: {}", self.function, event.id, e);
        }
    }

    fn key(&self) -> CallbackKey {
        CallbackKey::Script {
            context: self.context,
            function: self.function.clone(),
        }
    }
}
