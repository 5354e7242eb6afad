//! Image decoding for textures

use std::path::Path;

use super::AssetError;

/// Decoded RGBA8 image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Raw RGBA pixel data, row major
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Decode an image file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path = path.as_ref();
        log::debug!("Loading image from: {:?}", path);

        let image = image::open(path)
            .map_err(|e| AssetError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        log::info!("Loaded image {}x{} from {:?}", width, height, path);
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Decode an in-memory encoded image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| AssetError::InvalidData(format!("undecodable image: {}", e)))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Image filled with one color
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let data = color.repeat((width * height) as usize);
        Self {
            data,
            width,
            height,
        }
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_image() {
        let image = ImageData::solid_color(4, 2, [255, 0, 0, 255]);
        assert_eq!(image.size_bytes(), 4 * 2 * 4);
        assert_eq!(&image.data[0..4], &[255, 0, 0, 255]);
        assert_eq!(&image.data[28..32], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_png_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");

        let mut pixels = image::RgbaImage::new(2, 2);
        pixels.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
        pixels.save(&path).unwrap();

        let loaded = ImageData::from_file(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (2, 2));
        assert_eq!(&loaded.data[4..8], &[0, 255, 0, 255]);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(matches!(
            ImageData::from_bytes(b"not an image"),
            Err(AssetError::InvalidData(_))
        ));
    }
}
