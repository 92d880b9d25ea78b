// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic capture backend
//!
//! A paced frame generator standing in for real camera hardware during
//! development and in tests. Frames come from a fixed-size rotating pool
//! of buffer identities, the same recycling pattern a V4L2 or PipeWire
//! driver exhibits, so GPU-side caches see returning [`BufferId`]s.

use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::types::{
    AudioFrame, BufferId, CaptureError, CaptureResult, CapturedSample, DevicePosition, FrameData,
    HardwareBuffer, PixelFormat, PlaneLayout, SampleReceiver, SampleSender, VideoFrame,
};
use super::CaptureBackend;

const DEFAULT_POOL_SIZE: usize = 4;
const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u16 = 2;

/// A CPU-backed multi-plane buffer with synthesized pixel content.
///
/// Immutable after construction; the generator allocates a fresh one per
/// frame while reusing identities from its pool.
pub struct SyntheticBuffer {
    id: BufferId,
    width: u32,
    height: u32,
    planes: Vec<(PlaneLayout, Range<usize>)>,
    data: Vec<u8>,
}

impl SyntheticBuffer {
    /// Build a buffer of `format` content, varied by `seq` so successive
    /// frames are visually distinct.
    pub fn new(id: u64, format: PixelFormat, width: u32, height: u32, seq: u64) -> Self {
        let mut planes = Vec::with_capacity(format.plane_count());
        let mut data = Vec::new();
        for plane in 0..format.plane_count() {
            let (w, h) = format
                .plane_dimensions(plane, width, height)
                .expect("plane within declared count");
            let stride = format
                .plane_stride(plane, width)
                .expect("plane within declared count");
            let start = data.len();
            fill_plane(&mut data, format, plane, w, h, stride, seq);
            planes.push((
                PlaneLayout {
                    width: w,
                    height: h,
                    stride,
                },
                start..data.len(),
            ));
        }
        Self {
            id: BufferId(id),
            width,
            height,
            planes,
            data,
        }
    }
}

impl HardwareBuffer for SyntheticBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn plane_count(&self) -> usize {
        self.planes.len()
    }

    fn plane_layout(&self, plane: usize) -> Option<PlaneLayout> {
        self.planes.get(plane).map(|(layout, _)| *layout)
    }

    fn plane_bytes(&self, plane: usize) -> Option<&[u8]> {
        self.planes
            .get(plane)
            .map(|(_, range)| &self.data[range.clone()])
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

fn fill_plane(
    data: &mut Vec<u8>,
    format: PixelFormat,
    plane: usize,
    width: u32,
    height: u32,
    stride: u32,
    seq: u64,
) {
    match (format, plane) {
        // luma: a gradient that drifts with the sequence number
        (PixelFormat::NV12 | PixelFormat::I420 | PixelFormat::Gray8, 0) => {
            for y in 0..height {
                for x in 0..stride {
                    data.push(((x + y + seq as u32) & 0xff) as u8);
                }
            }
        }
        // chroma: neutral gray
        (PixelFormat::NV12, 1) | (PixelFormat::I420, 1 | 2) => {
            data.resize(data.len() + (stride * height) as usize, 128);
        }
        (PixelFormat::RGBA | PixelFormat::BGRA, 0) => {
            let mut words = Vec::with_capacity((width * height) as usize);
            for y in 0..height {
                for x in 0..width {
                    let r = ((x + seq as u32) & 0xff) as u8;
                    let g = ((y + seq as u32) & 0xff) as u8;
                    let b = 0x40u8;
                    let bytes = match format {
                        PixelFormat::RGBA => [r, g, b, 0xff],
                        _ => [b, g, r, 0xff],
                    };
                    words.push(u32::from_le_bytes(bytes));
                }
            }
            data.extend_from_slice(bytemuck::cast_slice::<u32, u8>(&words));
        }
        _ => unreachable!("plane index checked against format"),
    }
}

struct Generator {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

/// Synthetic camera claiming one device position.
pub struct VirtualCameraBackend {
    position: DevicePosition,
    format: PixelFormat,
    width: u32,
    height: u32,
    fps: u32,
    pool_size: usize,
    audio: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    generator: Option<Generator>,
}

impl VirtualCameraBackend {
    pub fn new(
        position: DevicePosition,
        format: PixelFormat,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Self {
        Self {
            position,
            format,
            width,
            height,
            fps: fps.max(1),
            pool_size: DEFAULT_POOL_SIZE,
            audio: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicBool::new(false)),
            generator: None,
        }
    }

    /// Number of distinct buffer identities the generator rotates through.
    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Shared session flag, readable after the backend has been moved
    /// into a frame source.
    pub fn activity_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.active)
    }

    fn spawn_generator(&self, sender: SampleSender) -> Generator {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);
        let audio = Arc::clone(&self.audio);
        let (format, width, height, fps, pool_size) = (
            self.format,
            self.width,
            self.height,
            self.fps,
            self.pool_size,
        );

        let handle = thread::Builder::new()
            .name("virtual-camera".into())
            .spawn(move || {
                let interval = Duration::from_secs(1) / fps;
                let audio_bytes =
                    (AUDIO_SAMPLE_RATE as u64 * u64::from(AUDIO_CHANNELS) * 2 / u64::from(fps))
                        as usize;
                let mut seq = 0u64;
                debug!(width, height, %format, fps, "virtual camera generator started");
                loop {
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    let buffer = Arc::new(SyntheticBuffer::new(
                        seq % pool_size as u64,
                        format,
                        width,
                        height,
                        seq,
                    ));
                    let frame = VideoFrame::new(buffer, format);
                    if sender.send(CapturedSample::Video(frame)).is_err() {
                        break;
                    }
                    if audio.load(Ordering::SeqCst) {
                        let silence = AudioFrame {
                            data: FrameData::from(vec![0u8; audio_bytes]),
                            sample_rate: AUDIO_SAMPLE_RATE,
                            channels: AUDIO_CHANNELS,
                            captured_at: Instant::now(),
                        };
                        if sender.send(CapturedSample::Audio(silence)).is_err() {
                            break;
                        }
                    }
                    seq += 1;
                    thread::sleep(interval);
                }
                debug!("virtual camera generator exiting");
            })
            .expect("spawn virtual camera generator");

        Generator {
            handle: Some(handle),
            stop,
        }
    }
}

impl CaptureBackend for VirtualCameraBackend {
    fn open(&mut self, position: DevicePosition) -> CaptureResult<SampleReceiver> {
        if position != self.position {
            return Err(CaptureError::DeviceUnavailable(position));
        }
        if self.generator.is_some() {
            return Err(CaptureError::SessionFailed(
                "virtual camera already open".into(),
            ));
        }
        let (sender, receiver) = mpsc::channel();
        self.generator = Some(self.spawn_generator(sender));
        self.active.store(true, Ordering::SeqCst);
        info!(%position, width = self.width, height = self.height, format = %self.format, "virtual camera opened");
        Ok(receiver)
    }

    fn close(&mut self) {
        if let Some(mut generator) = self.generator.take() {
            generator.stop.store(true, Ordering::SeqCst);
            if let Some(handle) = generator.handle.take() {
                if handle.join().is_err() {
                    warn!("virtual camera generator panicked");
                }
            }
            self.active.store(false, Ordering::SeqCst);
            info!("virtual camera closed");
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn attach_audio(&mut self) -> CaptureResult<()> {
        self.audio.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for VirtualCameraBackend {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthetic_buffer_plane_layout() {
        let buffer = SyntheticBuffer::new(7, PixelFormat::NV12, 64, 48, 0);
        assert_eq!(buffer.id(), BufferId(7));
        assert_eq!(buffer.plane_count(), 2);
        let luma = buffer.plane_layout(0).unwrap();
        assert_eq!((luma.width, luma.height, luma.stride), (64, 48, 64));
        let chroma = buffer.plane_layout(1).unwrap();
        assert_eq!((chroma.width, chroma.height, chroma.stride), (32, 24, 64));
        assert_eq!(buffer.plane_bytes(0).unwrap().len(), 64 * 48);
        assert_eq!(buffer.plane_bytes(1).unwrap().len(), 64 * 24);
        assert!(buffer.plane_layout(2).is_none());
        assert!(buffer.plane_bytes(2).is_none());
    }

    #[test]
    fn test_synthetic_buffer_rgba_size() {
        let buffer = SyntheticBuffer::new(0, PixelFormat::RGBA, 16, 8, 3);
        assert_eq!(buffer.plane_count(), 1);
        assert_eq!(buffer.plane_bytes(0).unwrap().len(), 16 * 8 * 4);
    }

    #[test]
    fn test_open_requires_matching_position() {
        let mut backend =
            VirtualCameraBackend::new(DevicePosition::Front, PixelFormat::NV12, 32, 32, 30);
        let err = backend.open(DevicePosition::Back).unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
        assert!(!backend.is_active());
    }

    #[test]
    fn test_open_close_cycle() {
        let mut backend =
            VirtualCameraBackend::new(DevicePosition::Back, PixelFormat::NV12, 32, 32, 60)
                .with_pool_size(2);
        let receiver = backend.open(DevicePosition::Back).unwrap();
        assert!(backend.is_active());

        // frames arrive and rotate through the pool
        let first = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = receiver.recv_timeout(Duration::from_secs(2)).unwrap();
        match (first, second) {
            (CapturedSample::Video(a), CapturedSample::Video(b)) => {
                assert_eq!(a.buffer().id(), BufferId(0));
                assert_eq!(b.buffer().id(), BufferId(1));
            }
            other => panic!("expected two video frames, got {:?}", other),
        }

        backend.close();
        assert!(!backend.is_active());
    }

    #[test]
    fn test_audio_interleaved_when_attached() {
        let mut backend =
            VirtualCameraBackend::new(DevicePosition::Back, PixelFormat::Gray8, 8, 8, 60);
        backend.attach_audio().unwrap();
        let receiver = backend.open(DevicePosition::Back).unwrap();

        let mut saw_audio = false;
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline && !saw_audio {
            if let Ok(CapturedSample::Audio(frame)) =
                receiver.recv_timeout(Duration::from_millis(100))
            {
                assert_eq!(frame.sample_rate, AUDIO_SAMPLE_RATE);
                assert!(frame.data.iter().all(|&b| b == 0));
                saw_audio = true;
            }
        }
        backend.close();
        assert!(saw_audio);
    }
}
