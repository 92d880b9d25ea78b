// SPDX-License-Identifier: GPL-3.0-only

//! Dedicated serial delivery thread for captured samples
//!
//! One thread drains a backend's sample channel into a sink, one sample
//! at a time, so a frame's conversion and hand-off never interleave with
//! the next frame's arrival for the same sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{CapturedSample, SampleReceiver};
use super::FrameSink;

/// How long a blocked receive waits before re-checking the stop flag.
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Owns the delivery thread; stopping joins it.
pub(crate) struct DeliveryLoop {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl DeliveryLoop {
    /// Spawn the delivery thread draining `receiver` into `sink`.
    pub fn spawn(receiver: SampleReceiver, sink: Arc<dyn FrameSink>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("preview-delivery".into())
            .spawn(move || {
                debug!("delivery thread started");
                loop {
                    if stop_flag.load(Ordering::SeqCst) {
                        break;
                    }
                    match receiver.recv_timeout(STOP_POLL_INTERVAL) {
                        Ok(CapturedSample::Video(frame)) => sink.on_video_frame(&frame),
                        Ok(CapturedSample::Audio(frame)) => sink.on_audio_frame(&frame),
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => {
                            debug!("sample channel closed");
                            break;
                        }
                    }
                }
                debug!("delivery thread exiting");
            })
            .expect("spawn delivery thread");

        Self {
            handle: Some(handle),
            stop,
        }
    }

    /// Signal the thread to stop and wait for it to finish.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("delivery thread panicked");
            }
        }
    }
}

impl Drop for DeliveryLoop {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::types::{AudioFrame, FrameData, PixelFormat, VideoFrame};
    use crate::capture::virtual_device::SyntheticBuffer;
    use std::sync::Mutex;
    use std::sync::mpsc;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<String>>,
    }

    impl FrameSink for RecordingSink {
        fn on_video_frame(&self, frame: &VideoFrame) {
            self.events
                .lock()
                .unwrap()
                .push(format!("video:{}", frame.buffer().id()));
        }

        fn on_audio_frame(&self, _frame: &AudioFrame) {
            self.events.lock().unwrap().push("audio".into());
        }
    }

    fn video_sample(id: u64) -> CapturedSample {
        let buffer = Arc::new(SyntheticBuffer::new(id, PixelFormat::NV12, 4, 4, 0));
        CapturedSample::Video(VideoFrame::new(buffer, PixelFormat::NV12))
    }

    fn audio_sample() -> CapturedSample {
        CapturedSample::Audio(AudioFrame {
            data: FrameData::from(vec![0u8; 64]),
            sample_rate: 48_000,
            channels: 2,
            captured_at: Instant::now(),
        })
    }

    #[test]
    fn test_delivers_in_order() {
        let (tx, rx) = mpsc::channel();
        let sink = Arc::new(RecordingSink::default());
        let mut delivery = DeliveryLoop::spawn(rx, sink.clone());

        tx.send(video_sample(1)).unwrap();
        tx.send(audio_sample()).unwrap();
        tx.send(video_sample(2)).unwrap();
        drop(tx);

        let deadline = Instant::now() + Duration::from_secs(2);
        while sink.events.lock().unwrap().len() < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        delivery.stop();
        assert_eq!(
            *sink.events.lock().unwrap(),
            vec!["video:#1", "audio", "video:#2"]
        );
    }

    #[test]
    fn test_stop_joins_thread() {
        let (tx, rx) = mpsc::channel();
        let sink = Arc::new(RecordingSink::default());
        let mut delivery = DeliveryLoop::spawn(rx, sink);
        delivery.stop();
        // sender outlives the loop; nothing should panic
        drop(tx);
    }
}
