// SPDX-License-Identifier: GPL-3.0-only

//! Capture subsystem boundary
//!
//! This module defines the trait seam between the preview pipeline and
//! whatever actually owns the camera hardware, plus the frame source
//! that drives delivery.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ CaptureBackend impl  │  ← hardware session (external), sample channel
//! └──────────┬───────────┘
//!            │ SampleReceiver
//!            ▼
//! ┌──────────────────────┐
//! │     FrameSource      │  ← lifecycle + dedicated serial delivery thread
//! └──────────┬───────────┘
//!            │ in capture order
//!            ▼
//! ┌──────────────────────┐
//! │   FrameSink impl     │  ← on_video_frame / on_audio_frame
//! └──────────────────────┘
//! ```
//!
//! Device enumeration, permission negotiation and format selection live
//! behind the backend; this crate only requires that samples arrive on
//! the channel in capture order with stable plane layout metadata.

pub(crate) mod delivery;
pub mod source;
pub mod types;
pub mod virtual_device;

pub use source::FrameSource;
pub use types::*;
pub use virtual_device::VirtualCameraBackend;

use crate::config::Config;

/// The external capture subsystem.
///
/// An open backend owns a running hardware session that consumes power
/// and bus bandwidth; [`close`](CaptureBackend::close) must stop that
/// session before returning so no hardware handle outlives the owner.
pub trait CaptureBackend: Send {
    /// Start a capture session on the device at `position`.
    ///
    /// Returns the channel on which the session delivers samples, in
    /// capture order. Fails with [`CaptureError::DeviceUnavailable`]
    /// when no matching device exists, in which case no session state
    /// is created.
    fn open(&mut self, position: DevicePosition) -> CaptureResult<SampleReceiver>;

    /// Stop the capture session and release the hardware synchronously.
    fn close(&mut self);

    /// Whether a hardware session is currently running.
    fn is_active(&self) -> bool;

    /// Add an audio output to the session, feeding the same sample
    /// channel. Idempotent; may be called before or after `open`.
    fn attach_audio(&mut self) -> CaptureResult<()>;
}

/// Receiver for captured samples, with one slot per media kind.
///
/// Both callbacks run on the frame source's delivery thread, strictly
/// serialized: frame N's handling completes before frame N+1 is
/// dispatched. Sinks that only care about video leave the audio slot
/// on its default no-op.
pub trait FrameSink: Send + Sync {
    /// Called for every captured video frame, in capture order.
    ///
    /// The frame (and any texture aliasing its memory) is only
    /// guaranteed valid for the duration of the call; each new frame
    /// supersedes the previous one.
    fn on_video_frame(&self, frame: &VideoFrame);

    /// Called for every captured audio frame when audio is attached.
    fn on_audio_frame(&self, _frame: &AudioFrame) {}
}

/// Get a concrete backend for `config` (synthetic only; hardware
/// backends plug in behind the same trait).
pub fn backend_from_config(config: &Config) -> CaptureResult<Box<dyn CaptureBackend>> {
    let format = config.format.parse_pixel_format().ok_or_else(|| {
        CaptureError::SessionFailed(format!(
            "unknown pixel format {:?}",
            config.format.pixel_format
        ))
    })?;
    Ok(Box::new(VirtualCameraBackend::new(
        config.position,
        format,
        config.format.width,
        config.format.height,
        config.format.framerate.unwrap_or(30),
    )))
}
