//! Script bridge contract
//!
//! The scripting runtime itself lives outside the engine core. A host
//! implementation runs files and calls named functions; scripts subscribe to
//! events by registering [`ScriptCallback`](crate::events::ScriptCallback)s
//! keyed by their context id and function name.

use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::events::Event;
use crate::scene::{Actor, Scene};

/// Identity of one script context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptContextId(u32);

static NEXT_CONTEXT: AtomicU32 = AtomicU32::new(1);

impl ScriptContextId {
    /// Wrap a raw id
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Allocate a process-unique id for a new context
    pub fn next() -> Self {
        Self(NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw integer value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Script runtime errors
#[derive(thiserror::Error, Debug)]
pub enum ScriptError {
    /// Script file could not be read
    #[error("Script '{path}' could not be read: {source}")]
    Io {
        /// Script path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Script failed to compile or run
    #[error("Script '{path}' failed: {reason}")]
    Load {
        /// Script path
        path: String,
        /// Runtime message
        reason: String,
    },

    /// Named function does not exist
    #[error("Script function '{0}' not found")]
    UnknownFunction(String),

    /// Named function raised an error
    #[error("Script function '{function}' failed: {reason}")]
    Call {
        /// Function name
        function: String,
        /// Runtime message
        reason: String,
    },
}

/// One scripting context as seen by the engine
pub trait ScriptHost {
    /// Identity used to key this context's listeners
    fn context_id(&self) -> ScriptContextId;

    /// Make `actor` the script's current component owner
    fn bind_component(&self, actor: &Rc<Actor>);

    /// Make `scene` the script's current scene, for actor lookup by name
    ///
    /// Hosts that only drive components can ignore this.
    fn bind_scene(&self, _scene: &Rc<Scene>) {}

    /// Execute a script file
    fn run_file(&self, path: &str) -> Result<(), ScriptError>;

    /// Call a named function, marshaling `event` into the script's representation
    fn call_function(&self, function: &str, event: &Event) -> Result<(), ScriptError>;
}
