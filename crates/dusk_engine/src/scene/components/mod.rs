//! Built-in components

mod camera_component;
mod mesh_component;
mod script_component;

pub use camera_component::CameraComponent;
pub use mesh_component::MeshComponent;
pub use script_component::ScriptComponent;
