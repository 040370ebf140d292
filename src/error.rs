use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions while bringing up the slider. None of these have a
/// recovery path; `main` logs them and exits non-zero.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load cover image {}", .path.display())]
    CoverImage {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cover pixel buffer is {actual} bytes, expected {expected} for {width}x{height}")]
    CoverSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    #[error("cover is {width}x{height} but the GPU allows at most {max}x{max}")]
    CoverTooLarge { width: u32, height: u32, max: u32 },

    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),

    #[error("failed to create wgpu surface")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter found")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create wgpu device")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats for this adapter")]
    UnsupportedSurface,
}
