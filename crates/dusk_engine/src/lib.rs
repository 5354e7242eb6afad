//! # Dusk Engine
//!
//! Core of a small real-time 3D engine: an event dispatcher, a scene graph
//! of actors and components, a content-keyed asset cache and the render
//! resources that sit behind an abstract graphics backend.
//!
//! ## Features
//!
//! - **Events**: re-entrancy safe listener tables on the app, every scene and every actor
//! - **Scene graph**: actors with transforms, tags and typed components
//! - **Assets**: identical content loads once, purged when no longer referenced
//! - **Headless rendering**: a recording backend for tools and tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dusk_engine::prelude::*;
//!
//! let app = App::new(EngineConfig::default(), HeadlessBackend::new_shared());
//! let scene = Scene::new("main", &app);
//! app.add_scene(scene.clone())?;
//!
//! let cube = Actor::new("cube");
//! let mesh = app.mesh_factory().cuboid(1.0, 1.0, 1.0);
//! cube.add_component(MeshComponent::new(mesh, None, app.backend().clone()));
//! scene.add_actor(cube)?;
//!
//! app.set_current_scene("main")?;
//! app.run_frames(3);
//! # Ok::<(), AppError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod app;
pub mod assets;
pub mod config;
pub mod events;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod script;

pub use app::{App, AppError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        app::{App, AppError},
        assets::{AssetError, AssetId, Assets, FileLoader, ImageData, ResourceLoader},
        config::{Config, EngineConfig},
        events::{
            Callback, CallbackKey, Dispatcher, Event, EventData, EventDispatcher, EventId, EventTarget,
            UpdateContext,
        },
        foundation::{
            math::{Mat4, Mat4Ext, Vec3},
            time::Timer,
        },
        render::{
            GraphicsBackend, HeadlessBackend, Material, MaterialDesc, MaterialFactory, Mesh, MeshData,
            MeshFactory, ShaderProgram, SharedBackend, Texture,
        },
        scene::{
            Actor, Camera, CameraComponent, Component, ComponentKind, MeshComponent, Scene, SceneError,
            ScriptComponent,
        },
        script::{ScriptContextId, ScriptError, ScriptHost},
    };
}
