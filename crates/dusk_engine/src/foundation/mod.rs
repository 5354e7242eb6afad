//! Foundation types shared by every engine module
//!
//! Math aliases over nalgebra, frame timing, handle maps for arena-owned
//! objects, and logger setup.

pub mod collections;
pub mod logging;
pub mod math;
pub mod time;
