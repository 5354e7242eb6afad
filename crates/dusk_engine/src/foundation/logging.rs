//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn, LevelFilter};

/// Initialize the logging system from `RUST_LOG`
pub fn init() {
    // A second init (e.g. from several tests) is harmless
    let _ = env_logger::try_init();
}

/// Initialize the logging system with an explicit default level
///
/// `RUST_LOG` still overrides the level when set.
pub fn init_with_level(level: LevelFilter) {
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
