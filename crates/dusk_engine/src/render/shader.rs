//! Shader programs

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::backend::{detached, release};
use super::{ProgramHandle, RenderResult, SharedBackend, WeakBackend};

/// Pipeline stage of a shader source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Geometry stage
    Geometry,
    /// Fragment stage
    Fragment,
}

/// Source text of one stage
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    /// Pipeline stage
    pub stage: ShaderStage,
    /// Where the source came from
    pub path: String,
    /// Source text
    pub source: String,
}

/// Linked shader program
pub struct ShaderProgram {
    name: String,
    handle: Option<ProgramHandle>,
    backend: WeakBackend,
}

impl ShaderProgram {
    /// Compile and link `stages`
    pub fn compile(
        name: impl Into<String>,
        stages: &[ShaderSource],
        backend: &SharedBackend,
    ) -> RenderResult<Self> {
        let name = name.into();
        let handle = backend.borrow_mut().create_program(&name, stages)?;
        log::debug!("Linked shader program '{}' from {} stages", name, stages.len());

        Ok(Self {
            name,
            handle: Some(handle),
            backend: Rc::downgrade(backend),
        })
    }

    /// Placeholder for a program that failed to build
    pub fn unloaded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handle: None,
            backend: detached(),
        }
    }

    /// Registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the program is linked
    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    /// Backend program
    pub fn handle(&self) -> Option<ProgramHandle> {
        self.handle
    }
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            release(&self.backend, &self.name, |backend| backend.destroy_program(handle));
        }
    }
}

/// Named shader programs
#[derive(Debug, Default)]
pub struct ShaderRegistry {
    programs: HashMap<String, Rc<ShaderProgram>>,
}

impl ShaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a program under its name, returning the one it replaces
    pub fn insert(&mut self, program: ShaderProgram) -> Option<Rc<ShaderProgram>> {
        self.programs.insert(program.name().to_string(), Rc::new(program))
    }

    /// Program registered as `name`
    pub fn get(&self, name: &str) -> Option<Rc<ShaderProgram>> {
        self.programs.get(name).cloned()
    }

    /// Unregister a program
    pub fn remove(&mut self, name: &str) -> Option<Rc<ShaderProgram>> {
        self.programs.remove(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.programs.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered programs
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether no program is registered
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Drop every program
    pub fn clear(&mut self) {
        self.programs.clear();
    }
}
