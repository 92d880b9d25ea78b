// SPDX-License-Identifier: GPL-3.0-only

//! GPU binding boundary
//!
//! The preview pipeline never owns the GPU: a device and its command
//! queue are supplied from outside, drawables are supplied per draw by
//! the presentation surface, and a device change is a discrete event the
//! pipeline reacts to by rebuilding its caches. These traits are that
//! boundary; [`wgpu_binding`] implements them over wgpu and
//! [`testing`] provides instrumented doubles.

pub mod testing;
pub mod texture_bridge;
pub mod wgpu_binding;

pub use texture_bridge::{BridgeError, BridgeResult, TextureBridge};

use std::sync::Arc;

use crate::capture::{PixelFormat, PlaneLayout, VideoFrame};
use crate::geometry::Rect;

/// GPU texture formats this pipeline produces or presents into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// Single channel, 8-bit (luma / gray planes)
    R8Unorm,
    /// Two channels, 8-bit each (interleaved UV planes)
    Rg8Unorm,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
}

impl TextureFormat {
    /// The texture format matching one plane of a frame format, the way
    /// the plane is actually laid out in memory.
    pub fn for_plane(format: PixelFormat, plane: usize) -> Option<TextureFormat> {
        match (format, plane) {
            (PixelFormat::NV12, 0) => Some(TextureFormat::R8Unorm),
            (PixelFormat::NV12, 1) => Some(TextureFormat::Rg8Unorm),
            (PixelFormat::I420, 0..=2) => Some(TextureFormat::R8Unorm),
            (PixelFormat::RGBA, 0) => Some(TextureFormat::Rgba8Unorm),
            (PixelFormat::BGRA, 0) => Some(TextureFormat::Bgra8Unorm),
            (PixelFormat::Gray8, 0) => Some(TextureFormat::R8Unorm),
            _ => None,
        }
    }

    pub fn bytes_per_texel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rg8Unorm => 2,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb => 4,
        }
    }
}

impl std::fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TextureFormat::R8Unorm => "r8unorm",
            TextureFormat::Rg8Unorm => "rg8unorm",
            TextureFormat::Rgba8Unorm => "rgba8unorm",
            TextureFormat::Rgba8UnormSrgb => "rgba8unorm-srgb",
            TextureFormat::Bgra8Unorm => "bgra8unorm",
            TextureFormat::Bgra8UnormSrgb => "bgra8unorm-srgb",
        };
        write!(f, "{}", name)
    }
}

pub type ImportResult = Result<Arc<dyn GpuTexture>, ImportError>;

/// Errors from turning a frame plane into a GPU texture
#[derive(Debug)]
pub enum ImportError {
    /// The buffer/plane/format combination cannot be exposed as a texture
    Unsupported(String),
    /// The device refused the import
    Failed(String),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::Unsupported(msg) => write!(f, "unsupported plane import: {}", msg),
            ImportError::Failed(msg) => write!(f, "plane import failed: {}", msg),
        }
    }
}

impl std::error::Error for ImportError {}

/// Handle to GPU-resident image storage.
///
/// A handle created from a frame plane aliases that frame's memory and
/// must not be assumed valid past the frame's own lifetime.
pub trait GpuTexture: Send + Sync + std::fmt::Debug {
    /// Width in texels
    fn width(&self) -> u32;

    /// Height in texels
    fn height(&self) -> u32;

    fn format(&self) -> TextureFormat;

    /// Escape hatch for queues that understand the concrete type
    fn as_any(&self) -> &dyn std::any::Any;
}

/// The externally supplied GPU device.
pub trait GpuDevice: Send + Sync {
    /// Expose one plane of a frame's buffer as a texture, without
    /// copying pixel storage where the platform allows it.
    ///
    /// `layout` carries the plane's own (sub-sampled) dimensions; the
    /// created texture uses those, never the whole buffer's.
    fn import_plane(
        &self,
        frame: &VideoFrame,
        plane: usize,
        format: TextureFormat,
        layout: PlaneLayout,
    ) -> ImportResult;

    /// Bring a previously imported texture up to date with the buffer's
    /// current contents. Aliasing imports see new texels automatically
    /// and keep the default no-op; upload-based bindings rewrite here.
    fn refresh_plane(
        &self,
        _texture: &Arc<dyn GpuTexture>,
        _frame: &VideoFrame,
        _plane: usize,
        _layout: PlaneLayout,
    ) -> Result<(), ImportError> {
        Ok(())
    }

    /// Create a command submission queue on this device.
    fn make_queue(&self) -> Arc<dyn CommandQueue>;
}

/// Command submission for the draw path.
pub trait CommandQueue: Send + Sync {
    /// Copy `extent` texels from `source`'s origin into the drawable's
    /// texture at `origin`, then present, in a single submission.
    ///
    /// The copy is a plain blit: no sampling, no format conversion; the
    /// caller guarantees matching formats and in-range coordinates.
    fn blit_and_present(
        &self,
        source: &dyn GpuTexture,
        extent: (u32, u32),
        origin: (u32, u32),
        drawable: Box<dyn Drawable>,
    );
}

/// One presentable surface output, supplied per draw and never retained
/// past it.
pub trait Drawable: Send {
    /// The drawable's backing texture
    fn texture(&self) -> Arc<dyn GpuTexture>;

    /// Current surface bounds in logical units, as the platform reports
    /// them (origin included)
    fn bounds(&self) -> Rect;

    /// Backing-pixel density of the display this drawable targets
    fn backing_scale(&self) -> f32;

    /// Schedule the drawable for on-screen presentation
    fn present(self: Box<Self>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_format_mapping() {
        assert_eq!(
            TextureFormat::for_plane(PixelFormat::NV12, 0),
            Some(TextureFormat::R8Unorm)
        );
        assert_eq!(
            TextureFormat::for_plane(PixelFormat::NV12, 1),
            Some(TextureFormat::Rg8Unorm)
        );
        assert_eq!(
            TextureFormat::for_plane(PixelFormat::I420, 2),
            Some(TextureFormat::R8Unorm)
        );
        assert_eq!(TextureFormat::for_plane(PixelFormat::NV12, 2), None);
        assert_eq!(
            TextureFormat::for_plane(PixelFormat::BGRA, 0),
            Some(TextureFormat::Bgra8Unorm)
        );
    }

    #[test]
    fn test_bytes_per_texel() {
        assert_eq!(TextureFormat::R8Unorm.bytes_per_texel(), 1);
        assert_eq!(TextureFormat::Rg8Unorm.bytes_per_texel(), 2);
        assert_eq!(TextureFormat::Bgra8Unorm.bytes_per_texel(), 4);
    }
}
