//! Resource loaders
//!
//! Loaders turn a path into a fully constructed in-memory resource. Caching
//! and backend upload happen in the factories built on top of them.

use std::path::{Path, PathBuf};

use super::{AssetError, ImageData};
use crate::config::AssetConfig;
use crate::render::MeshData;

/// Synchronous resource loading
pub trait ResourceLoader {
    /// Decode an image to RGBA8
    fn load_image(&self, path: &str) -> Result<ImageData, AssetError>;

    /// Parse a model file
    fn load_mesh(&self, path: &str) -> Result<MeshData, AssetError> {
        Err(AssetError::UnsupportedFormat(format!("no mesh parser for '{}'", path)))
    }

    /// Read shader source text
    fn load_shader_source(&self, path: &str) -> Result<String, AssetError>;
}

/// Loads resources from the file system
///
/// Relative paths are tried against each search path in order; absolute
/// paths are used as is.
#[derive(Debug, Clone, Default)]
pub struct FileLoader {
    search_paths: Vec<PathBuf>,
}

impl FileLoader {
    /// Loader over explicit search paths
    pub fn new(search_paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Loader over the configured search paths
    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.search_paths.iter().map(PathBuf::from))
    }

    /// Search paths, in lookup order
    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// First existing file for `path`
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return if candidate.is_file() {
                Ok(candidate.to_path_buf())
            } else {
                Err(AssetError::NotFound(path.to_string()))
            };
        }

        self.search_paths
            .iter()
            .map(|dir| dir.join(candidate))
            .find(|full| full.is_file())
            .ok_or_else(|| {
                log::debug!("'{}' not found in {:?}", path, self.search_paths);
                AssetError::NotFound(path.to_string())
            })
    }
}

impl ResourceLoader for FileLoader {
    fn load_image(&self, path: &str) -> Result<ImageData, AssetError> {
        ImageData::from_file(self.resolve(path)?)
    }

    fn load_shader_source(&self, path: &str) -> Result<String, AssetError> {
        let full = self.resolve(path)?;
        Ok(std::fs::read_to_string(full)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_paths_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        std::fs::write(second.path().join("flat.vs.glsl"), "second").unwrap();
        std::fs::write(second.path().join("both.glsl"), "second").unwrap();
        std::fs::write(first.path().join("both.glsl"), "first").unwrap();

        let loader = FileLoader::new([first.path(), second.path()]);
        assert_eq!(loader.load_shader_source("flat.vs.glsl").unwrap(), "second");
        assert_eq!(loader.load_shader_source("both.glsl").unwrap(), "first");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FileLoader::new([dir.path()]);
        assert!(matches!(loader.load_shader_source("nope.glsl"), Err(AssetError::NotFound(_))));
        assert!(matches!(loader.load_image("nope.png"), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_meshes_are_unsupported_by_default() {
        let loader = FileLoader::from_config(&AssetConfig::default());
        assert_eq!(loader.search_paths().len(), 2);
        assert!(matches!(loader.load_mesh("teapot.obj"), Err(AssetError::UnsupportedFormat(_))));
    }
}
