use std::path::Path;

use crate::error::StartupError;

/// Decoded cover image: RGBA8, top row first.
#[derive(Debug, Clone)]
pub struct CoverImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl CoverImage {
    /// Decode the image at `path`.
    pub fn load(path: &Path) -> Result<Self, StartupError> {
        let decoded = image::open(path).map_err(|source| StartupError::CoverImage {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        log::info!("Loaded cover {} ({}x{})", path.display(), width, height);
        Self::from_rgba(width, height, rgba.into_raw())
    }

    /// Wrap an existing RGBA8 buffer, checking it holds exactly
    /// `width * height` pixels.
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, StartupError> {
        let expected = Self::byte_len(width, height);
        if pixels.len() != expected {
            return Err(StartupError::CoverSize {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    fn byte_len(width: u32, height: u32) -> usize {
        4 * width as usize * height as usize
    }

    /// Bytes per pixel row.
    pub fn stride(&self) -> u32 {
        4 * self.width
    }
}
