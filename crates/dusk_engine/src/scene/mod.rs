//! Scene graph
//!
//! Ownership is tree shaped: a [`Scene`] owns its [`Actor`]s, an actor owns
//! its [`Component`]s. Back-references (component to actor, actor to scene)
//! are weak, and every subscription made along them is removed when the
//! subscriber is detached or dropped.

mod actor;
mod camera;
mod component;
mod components;
mod scene_graph;
mod transform_node;

pub use actor::Actor;
pub use camera::{Camera, CameraDirty, DEFAULT_FRICTION, ZERO_CLAMP};
pub use component::{ActorLink, Component, ComponentKind};
pub use components::{CameraComponent, MeshComponent, ScriptComponent};
pub use scene_graph::{Scene, SceneError};
pub use transform_node::TransformNode;
