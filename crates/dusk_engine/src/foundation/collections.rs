//! Specialized collection types

pub use slotmap::{new_key_type, SlotMap};

/// Handle-based map using slot map for stable, validated references
pub type HandleMap<K, T> = SlotMap<K, T>;

new_key_type! {
    /// Handle of a camera owned by a scene
    pub struct CameraId;
}
