// SPDX-License-Identifier: GPL-3.0-only

//! Low-latency camera preview pipeline
//!
//! This library takes live multi-plane video frames from a capture
//! device to an on-screen surface with a single GPU blit per draw:
//! frames are bridged to GPU textures through a buffer-identity cache
//! (no pixel copies where the platform allows aliasing), fitted into the
//! destination without distortion, and composited on demand.
//!
//! # Architecture
//!
//! The crate is organized into four modules:
//!
//! - [`capture`]: the capture-subsystem boundary and frame delivery
//! - [`gpu`]: the GPU binding boundary, texture bridging and cache
//! - [`geometry`]: aspect-preserving fit math
//! - [`preview`]: the preview surface and pipeline wiring
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use camera_preview::capture::{backend_from_config, FrameSource};
//! use camera_preview::config::Config;
//! use camera_preview::gpu::wgpu_binding::WgpuDevice;
//! use camera_preview::gpu::GpuDevice;
//! use camera_preview::preview::{PreviewSession, PreviewSurface};
//!
//! let config = Config::default();
//! let session = PreviewSession::new(Arc::new(PreviewSurface::new()));
//!
//! let device: Arc<dyn GpuDevice> = WgpuDevice::request("preview")?;
//! session.bind_device(&device);
//!
//! let backend = backend_from_config(&config)?;
//! let mut source = FrameSource::open(backend, config.position, session.clone())?;
//! // ... per draw: session.surface().render_once(drawable)
//! source.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod capture;
pub mod config;
pub mod geometry;
pub mod gpu;
pub mod preview;

// Re-export commonly used types
pub use capture::{
    CaptureBackend, CaptureError, DevicePosition, FrameSink, FrameSource, PixelFormat,
    VideoFrame, VirtualCameraBackend,
};
pub use config::{Config, FormatSettings};
pub use geometry::{Point, Rect, Size};
pub use gpu::{BridgeError, TextureBridge, TextureFormat};
pub use preview::{PreviewSession, PreviewSurface};
