// SPDX-License-Identifier: GPL-3.0-only

//! Frame-to-texture bridging
//!
//! Converts one plane of an arriving video frame into a GPU texture by
//! reusing a cache keyed to the underlying hardware buffer's identity.
//! Capture drivers recycle a small buffer pool, so after the first few
//! frames every conversion is a lookup, with no allocation on the hot path.
//!
//! The cache is bound to one GPU device. When the device changes it is
//! replaced wholesale with a fresh map, so a concurrent reader can never
//! observe a half-rebuilt cache.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{GpuDevice, GpuTexture, TextureFormat};
use crate::capture::{BufferId, VideoFrame};

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors from per-frame texture conversion. Both are recoverable: the
/// affected frame is simply not displayed and the next frame retries.
#[derive(Debug)]
pub enum BridgeError {
    /// No GPU device is bound yet; texture creation requires one
    DeviceMismatch,
    /// The device refused to expose the buffer plane as a texture
    ConversionFailed(String),
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::DeviceMismatch => {
                write!(f, "no GPU device bound for texture creation")
            }
            BridgeError::ConversionFailed(msg) => write!(f, "plane conversion failed: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PlaneKey {
    buffer: BufferId,
    plane: usize,
    format: TextureFormat,
}

/// Device-bound cache mapping (buffer identity, plane, format) to
/// created textures.
pub struct TextureBridge {
    device: Option<Arc<dyn GpuDevice>>,
    cache: HashMap<PlaneKey, Arc<dyn GpuTexture>>,
}

impl TextureBridge {
    pub fn new() -> Self {
        Self {
            device: None,
            cache: HashMap::new(),
        }
    }

    /// Bind the GPU device textures are created on.
    ///
    /// Rebinding a different device discards every cached texture and
    /// starts from an empty map; rebinding the same device is a no-op.
    pub fn bind_device(&mut self, device: Arc<dyn GpuDevice>) {
        if let Some(current) = &self.device {
            if Arc::ptr_eq(current, &device) {
                return;
            }
            debug!("GPU device changed, texture cache rebuilt");
        }
        self.cache = HashMap::new();
        self.device = Some(device);
    }

    pub fn is_bound(&self) -> bool {
        self.device.is_some()
    }

    /// Number of live cache entries (one per buffer/plane/format seen
    /// since the last device bind).
    pub fn cached_textures(&self) -> usize {
        self.cache.len()
    }

    /// Get the texture for one plane of `frame` at `format`.
    ///
    /// The view's dimensions are the plane's own (chroma planes of 4:2:0
    /// formats are half resolution). On success the returned texture
    /// aliases the frame's memory; it is not valid past the frame's own
    /// lifetime.
    pub fn texture_for(
        &mut self,
        frame: &VideoFrame,
        plane: usize,
        format: TextureFormat,
    ) -> BridgeResult<Arc<dyn GpuTexture>> {
        let device = self.device.as_ref().ok_or(BridgeError::DeviceMismatch)?;
        let buffer = frame.buffer();
        let layout = buffer.plane_layout(plane).ok_or_else(|| {
            BridgeError::ConversionFailed(format!(
                "plane {} out of range for {}-plane buffer",
                plane,
                buffer.plane_count()
            ))
        })?;

        let key = PlaneKey {
            buffer: buffer.id(),
            plane,
            format,
        };
        if let Some(texture) = self.cache.get(&key) {
            device
                .refresh_plane(texture, frame, plane, layout)
                .map_err(|err| BridgeError::ConversionFailed(err.to_string()))?;
            trace!(buffer = %key.buffer, plane, "plane texture cache hit");
            return Ok(Arc::clone(texture));
        }

        let texture = device
            .import_plane(frame, plane, format, layout)
            .map_err(|err| BridgeError::ConversionFailed(err.to_string()))?;
        debug!(
            buffer = %key.buffer,
            plane,
            %format,
            width = layout.width,
            height = layout.height,
            "imported plane texture"
        );
        self.cache.insert(key, Arc::clone(&texture));
        Ok(texture)
    }
}

impl Default for TextureBridge {
    fn default() -> Self {
        Self::new()
    }
}
