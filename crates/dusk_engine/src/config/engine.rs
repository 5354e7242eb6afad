//! Engine configuration
//!
//! Every section has sensible defaults and missing keys fall back to them,
//! so partial configuration files are accepted.

use serde::{Deserialize, Serialize};

use super::Config;
use crate::render::ShaderStage;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window parameters (used to derive the default camera aspect)
    pub window: WindowConfig,
    /// Frame pacing
    pub frame: FrameConfig,
    /// Asset lookup
    pub assets: AssetConfig,
    /// Logging
    pub log: LogConfig,
    /// Shader programs compiled at startup
    pub shaders: Vec<ShaderConfig>,
    /// Scene made current once the application has registered its scenes
    pub start_scene: Option<String>,
}

impl Config for EngineConfig {}

/// Window parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Window title
    pub title: String,
}

impl WindowConfig {
    /// Width over height, 1.0 for a degenerate window
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            title: "Dusk".to_string(),
        }
    }
}

/// Frame pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Render events per second; 0 renders on every update
    pub target_fps: u32,
    /// Longest step (seconds) reported to a single update
    pub max_delta: f32,
}

impl FrameConfig {
    /// Seconds between two render events, `None` when rendering every tick
    pub fn render_interval(&self) -> Option<f32> {
        (self.target_fps > 0).then(|| 1.0 / self.target_fps as f32)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            target_fps: 60,
            max_delta: 0.25,
        }
    }
}

/// Asset lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Directories searched, in order, for relative asset paths
    pub search_paths: Vec<String>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            search_paths: vec!["assets".to_string(), ".".to_string()],
        }
    }
}

/// Logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`
    pub level: String,
}

impl LogConfig {
    /// Parsed level filter, `info` for unknown names
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or_else(|_| {
            log::warn!("Unknown log level '{}', using info", self.level);
            log::LevelFilter::Info
        })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// One named shader program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Registry name of the program
    pub name: String,
    /// Stage sources
    pub files: Vec<ShaderFileConfig>,
}

/// One shader stage source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderFileConfig {
    /// Path to the source, resolved through the asset search paths
    pub path: String,
    /// Pipeline stage
    pub stage: ShaderStage,
}
