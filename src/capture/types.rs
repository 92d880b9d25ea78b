// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture backends

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Physical position of a capture device relative to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DevicePosition {
    /// Rear-facing camera (the usual default on handheld hardware)
    #[default]
    Back,
    /// User-facing camera
    Front,
    /// Position not reported by the device (external webcams, virtual nodes)
    Unspecified,
}

impl std::fmt::Display for DevicePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DevicePosition::Back => write!(f, "back"),
            DevicePosition::Front => write!(f, "front"),
            DevicePosition::Unspecified => write!(f, "unspecified"),
        }
    }
}

/// Pixel format of a captured frame
///
/// Multi-plane YUV layouts are delivered exactly as the hardware hands
/// them over; nothing in this crate converts between formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// NV12 - Semi-planar 4:2:0 (Y plane + interleaved UV plane)
    NV12,
    /// I420 - Planar 4:2:0 (separate Y, U, V planes)
    I420,
    /// RGBA - 32-bit with alpha (4 bytes per pixel)
    RGBA,
    /// BGRA - 32-bit with alpha (B G R A byte order)
    BGRA,
    /// Gray8 - 8-bit single channel (monochrome and IR cameras)
    Gray8,
}

impl PixelFormat {
    /// Number of pixel planes in this layout
    pub fn plane_count(&self) -> usize {
        match self {
            PixelFormat::NV12 => 2,
            PixelFormat::I420 => 3,
            PixelFormat::RGBA | PixelFormat::BGRA | PixelFormat::Gray8 => 1,
        }
    }

    /// Dimensions of one plane, in that plane's own texel units.
    ///
    /// Chroma planes of 4:2:0 formats are half resolution in both axes
    /// and must not be conflated with the luma plane's dimensions.
    pub fn plane_dimensions(&self, plane: usize, width: u32, height: u32) -> Option<(u32, u32)> {
        match (self, plane) {
            (PixelFormat::NV12, 0) | (PixelFormat::I420, 0) => Some((width, height)),
            (PixelFormat::NV12, 1) | (PixelFormat::I420, 1 | 2) => {
                Some((width.div_ceil(2), height.div_ceil(2)))
            }
            (PixelFormat::RGBA | PixelFormat::BGRA | PixelFormat::Gray8, 0) => {
                Some((width, height))
            }
            _ => None,
        }
    }

    /// Tightly packed row stride of one plane, in bytes.
    pub fn plane_stride(&self, plane: usize, width: u32) -> Option<u32> {
        match (self, plane) {
            (PixelFormat::NV12, 0) | (PixelFormat::I420, 0) | (PixelFormat::Gray8, 0) => {
                Some(width)
            }
            // interleaved UV: half the columns, two bytes per texel
            (PixelFormat::NV12, 1) => Some(width.div_ceil(2) * 2),
            (PixelFormat::I420, 1 | 2) => Some(width.div_ceil(2)),
            (PixelFormat::RGBA | PixelFormat::BGRA, 0) => Some(width * 4),
            _ => None,
        }
    }

    /// Parse a FourCC-style format string (as stored in configuration).
    pub fn from_fourcc(fourcc: &str) -> Option<Self> {
        match fourcc {
            "NV12" => Some(PixelFormat::NV12),
            "I420" | "YU12" => Some(PixelFormat::I420),
            "RGBA" | "RGBx" => Some(PixelFormat::RGBA),
            "BGRA" | "BGRx" => Some(PixelFormat::BGRA),
            "GRAY8" | "GREY" | "Y8" => Some(PixelFormat::Gray8),
            _ => None,
        }
    }

    /// Canonical FourCC-style name for this format.
    pub fn fourcc(&self) -> &'static str {
        match self {
            PixelFormat::NV12 => "NV12",
            PixelFormat::I420 => "I420",
            PixelFormat::RGBA => "RGBA",
            PixelFormat::BGRA => "BGRA",
            PixelFormat::Gray8 => "GRAY8",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.fourcc())
    }
}

/// Shared frame bytes - cloning never copies pixel data
#[derive(Clone)]
pub struct FrameData(Arc<[u8]>);

impl FrameData {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for FrameData {
    fn from(bytes: Vec<u8>) -> Self {
        FrameData(bytes.into())
    }
}

impl AsRef<[u8]> for FrameData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::ops::Deref for FrameData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for FrameData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameData({} bytes)", self.0.len())
    }
}

/// Stable identity of the hardware memory behind a frame.
///
/// Capture drivers recycle a small pool of buffers; the id lets GPU-side
/// caches recognize a returning buffer across frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

impl std::fmt::Display for BufferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Geometry of one plane within a hardware buffer, in plane units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneLayout {
    /// Texel columns in this plane (sub-sampled for chroma planes)
    pub width: u32,
    /// Texel rows in this plane
    pub height: u32,
    /// Bytes per row, including any driver padding
    pub stride: u32,
}

/// The opaque multi-plane pixel buffer behind a [`VideoFrame`].
///
/// Implemented by capture backends. The buffer is immutable for the
/// lifetime of one delivery; GPU bindings reach native handles (DMABuf
/// fds, IOSurfaces, ...) through [`as_any`](HardwareBuffer::as_any).
pub trait HardwareBuffer: Send + Sync {
    /// Stable identity of the underlying hardware memory
    fn id(&self) -> BufferId;

    /// Full-buffer width in pixels (the luma plane's width for YUV)
    fn width(&self) -> u32;

    /// Full-buffer height in pixels
    fn height(&self) -> u32;

    /// Number of pixel planes
    fn plane_count(&self) -> usize;

    /// Layout of one plane; `None` if `plane` is out of range
    fn plane_layout(&self, plane: usize) -> Option<PlaneLayout>;

    /// CPU-visible bytes of one plane, if the buffer is mappable.
    ///
    /// Buffers that only exist in device memory return `None`; importing
    /// those is the GPU binding's job.
    fn plane_bytes(&self, plane: usize) -> Option<&[u8]>;

    /// Escape hatch for GPU bindings that understand the concrete type
    fn as_any(&self) -> &dyn std::any::Any;
}

/// One captured video frame: an opaque multi-plane buffer plus layout
/// metadata, immutable for the lifetime of one delivery.
#[derive(Clone)]
pub struct VideoFrame {
    buffer: Arc<dyn HardwareBuffer>,
    format: PixelFormat,
    captured_at: Instant,
}

impl VideoFrame {
    pub fn new(buffer: Arc<dyn HardwareBuffer>, format: PixelFormat) -> Self {
        Self {
            buffer,
            format,
            captured_at: Instant::now(),
        }
    }

    pub fn buffer(&self) -> &Arc<dyn HardwareBuffer> {
        &self.buffer
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn plane_count(&self) -> usize {
        self.buffer.plane_count()
    }

    /// Timestamp taken when the frame entered this process (for latency
    /// diagnostics)
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }
}

impl std::fmt::Debug for VideoFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "VideoFrame({}x{} {} buffer {})",
            self.width(),
            self.height(),
            self.format,
            self.buffer.id()
        )
    }
}

/// One captured audio buffer. Carried through the pipeline untouched;
/// nothing in this crate interprets the samples.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub data: FrameData,
    pub sample_rate: u32,
    pub channels: u16,
    pub captured_at: Instant,
}

/// A sample leaving the capture subsystem, tagged for sink dispatch.
#[derive(Debug, Clone)]
pub enum CapturedSample {
    Video(VideoFrame),
    Audio(AudioFrame),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Errors from the capture boundary
#[derive(Debug)]
pub enum CaptureError {
    /// No capture device matches the requested position; nothing was opened
    DeviceUnavailable(DevicePosition),
    /// The capture session could not be started or has failed
    SessionFailed(String),
    /// Audio capture was requested but cannot be provided
    AudioUnavailable(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::DeviceUnavailable(position) => {
                write!(f, "no capture device at position {}", position)
            }
            CaptureError::SessionFailed(msg) => write!(f, "capture session failed: {}", msg),
            CaptureError::AudioUnavailable(msg) => write!(f, "audio unavailable: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Sending half of a backend's sample channel
pub type SampleSender = std::sync::mpsc::Sender<CapturedSample>;

/// Receiving half of a backend's sample channel; drained by the
/// dedicated delivery thread
pub type SampleReceiver = std::sync::mpsc::Receiver<CapturedSample>;
