// SPDX-License-Identifier: GPL-3.0-only

//! Frame source lifecycle
//!
//! A [`FrameSource`] brackets one preview session: it opens a capture
//! backend at a device position, runs the dedicated delivery thread,
//! and guarantees that closing (or dropping) the source stops the
//! hardware session and joins delivery before returning.

use std::sync::Arc;
use tracing::{debug, info};

use super::delivery::DeliveryLoop;
use super::types::{CaptureResult, DevicePosition};
use super::{CaptureBackend, FrameSink};

/// A live capture pipeline delivering frames to one sink.
pub struct FrameSource {
    backend: Box<dyn CaptureBackend>,
    delivery: Option<DeliveryLoop>,
    position: DevicePosition,
}

impl FrameSource {
    /// Open a capture session and start delivering frames to `sink`.
    ///
    /// Fails with [`CaptureError::DeviceUnavailable`] when the backend
    /// has no device at `position`; in that case no delivery thread is
    /// spawned and no session state exists.
    ///
    /// [`CaptureError::DeviceUnavailable`]: super::CaptureError::DeviceUnavailable
    pub fn open(
        mut backend: Box<dyn CaptureBackend>,
        position: DevicePosition,
        sink: Arc<dyn FrameSink>,
    ) -> CaptureResult<Self> {
        let receiver = backend.open(position)?;
        let delivery = DeliveryLoop::spawn(receiver, sink);
        info!(%position, "capture session opened");
        Ok(Self {
            backend,
            delivery: Some(delivery),
            position,
        })
    }

    pub fn position(&self) -> DevicePosition {
        self.position
    }

    pub fn is_open(&self) -> bool {
        self.delivery.is_some()
    }

    /// Add an audio output to the running session.
    ///
    /// Audio frames reach the sink's audio slot on the same delivery
    /// thread, interleaved with video in capture order.
    pub fn attach_audio(&mut self) -> CaptureResult<()> {
        self.backend.attach_audio()
    }

    /// Stop the hardware session, then stop and join delivery.
    ///
    /// Blocks until both are down; after return the backend reports
    /// inactive and no further sink callbacks occur.
    pub fn close(&mut self) {
        if let Some(mut delivery) = self.delivery.take() {
            debug!(position = %self.position, "closing capture session");
            self.backend.close();
            delivery.stop();
            info!(position = %self.position, "capture session closed");
        }
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("position", &self.position)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
