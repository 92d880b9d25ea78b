// SPDX-License-Identifier: GPL-3.0-only

//! Frame-to-surface wiring
//!
//! [`PreviewSession`] is the sink that closes the pipeline: each arriving
//! video frame is bridged to a texture and handed to the surface, on the
//! delivery thread. Audio passes through untouched.

use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::capture::{FrameSink, VideoFrame};
use crate::gpu::{GpuDevice, TextureBridge, TextureFormat};

use super::PreviewSurface;

/// Owns the texture bridge and feeds one preview surface.
pub struct PreviewSession {
    bridge: Mutex<TextureBridge>,
    surface: Arc<PreviewSurface>,
}

impl PreviewSession {
    pub fn new(surface: Arc<PreviewSurface>) -> Arc<Self> {
        Arc::new(Self {
            bridge: Mutex::new(TextureBridge::new()),
            surface,
        })
    }

    /// React to a (re)bound GPU device: the bridge rebuilds its cache,
    /// the surface picks up the device's queue.
    pub fn bind_device(&self, device: &Arc<dyn GpuDevice>) {
        if let Ok(mut bridge) = self.bridge.lock() {
            bridge.bind_device(Arc::clone(device));
        }
        self.surface.bind_device(device);
    }

    pub fn surface(&self) -> &Arc<PreviewSurface> {
        &self.surface
    }
}

impl FrameSink for PreviewSession {
    fn on_video_frame(&self, frame: &VideoFrame) {
        // plane 0 carries the luma (or the packed color) of every format
        // this pipeline accepts
        let Some(format) = TextureFormat::for_plane(frame.format(), 0) else {
            debug!(format = %frame.format(), "no texture format for frame, skipped");
            return;
        };
        let result = match self.bridge.lock() {
            Ok(mut bridge) => bridge.texture_for(frame, 0, format),
            Err(_) => return,
        };
        match result {
            Ok(texture) => self.surface.set_source_texture(&texture),
            // recoverable: this frame is not displayed, the next one is
            // the retry
            Err(err) => debug!(%err, "frame not displayed"),
        }
    }
}
