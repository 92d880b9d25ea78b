// SPDX-License-Identifier: GPL-3.0-only

//! Instrumented GPU doubles
//!
//! Stand-ins for the GPU binding traits with observable counters on the
//! texture creation and command submission paths. Used by this crate's
//! own tests and available to embedders testing against the same seam.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    CommandQueue, Drawable, GpuDevice, GpuTexture, ImportError, ImportResult, TextureFormat,
};
use crate::capture::{PlaneLayout, VideoFrame};
use crate::geometry::Rect;

/// Plain texture handle carrying only dimensions and format.
#[derive(Debug)]
pub struct MockTexture {
    width: u32,
    height: u32,
    format: TextureFormat,
}

impl MockTexture {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Arc<Self> {
        Arc::new(Self {
            width,
            height,
            format,
        })
    }
}

impl GpuTexture for MockTexture {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Record of one blit submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlitRecord {
    pub source_size: (u32, u32),
    pub source_format: TextureFormat,
    pub extent: (u32, u32),
    pub origin: (u32, u32),
}

/// Queue double counting submissions and remembering the last blit.
#[derive(Default)]
pub struct MockQueue {
    submissions: AtomicUsize,
    last_blit: Mutex<Option<BlitRecord>>,
}

impl MockQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of command submissions issued so far.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }

    pub fn last_blit(&self) -> Option<BlitRecord> {
        self.last_blit.lock().unwrap().clone()
    }
}

impl CommandQueue for MockQueue {
    fn blit_and_present(
        &self,
        source: &dyn GpuTexture,
        extent: (u32, u32),
        origin: (u32, u32),
        drawable: Box<dyn Drawable>,
    ) {
        *self.last_blit.lock().unwrap() = Some(BlitRecord {
            source_size: (source.width(), source.height()),
            source_format: source.format(),
            extent,
            origin,
        });
        self.submissions.fetch_add(1, Ordering::SeqCst);
        drawable.present();
    }
}

/// Device double whose import path is countable and can be made to
/// refuse conversions.
pub struct MockGpu {
    imports: AtomicUsize,
    refreshes: AtomicUsize,
    refuse: AtomicBool,
    queue: Arc<MockQueue>,
}

impl MockGpu {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            imports: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
            refuse: AtomicBool::new(false),
            queue: MockQueue::new(),
        })
    }

    /// Number of textures created (cache misses on the bridge).
    pub fn imports(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }

    /// Number of cache-hit refreshes.
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Make subsequent imports fail the way hardware refuses an
    /// unsupported buffer/format combination.
    pub fn refuse_imports(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn queue(&self) -> Arc<MockQueue> {
        Arc::clone(&self.queue)
    }
}

impl GpuDevice for MockGpu {
    fn import_plane(
        &self,
        _frame: &VideoFrame,
        _plane: usize,
        format: TextureFormat,
        layout: PlaneLayout,
    ) -> ImportResult {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ImportError::Failed("refused by test device".into()));
        }
        self.imports.fetch_add(1, Ordering::SeqCst);
        Ok(MockTexture::new(layout.width, layout.height, format))
    }

    fn refresh_plane(
        &self,
        _texture: &Arc<dyn GpuTexture>,
        _frame: &VideoFrame,
        _plane: usize,
        _layout: PlaneLayout,
    ) -> Result<(), ImportError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn make_queue(&self) -> Arc<dyn CommandQueue> {
        self.queue.clone()
    }
}

/// Drawable double with a shared presented flag.
pub struct MockDrawable {
    texture: Arc<dyn GpuTexture>,
    bounds: Rect,
    backing_scale: f32,
    presented: Arc<AtomicBool>,
}

impl MockDrawable {
    pub fn new(texture: Arc<dyn GpuTexture>, bounds: Rect, backing_scale: f32) -> Box<Self> {
        Box::new(Self {
            texture,
            bounds,
            backing_scale,
            presented: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag that flips to true when the drawable is presented; readable
    /// after the drawable has been consumed by the draw path.
    pub fn presented_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.presented)
    }
}

impl Drawable for MockDrawable {
    fn texture(&self) -> Arc<dyn GpuTexture> {
        Arc::clone(&self.texture)
    }

    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn backing_scale(&self) -> f32 {
        self.backing_scale
    }

    fn present(self: Box<Self>) {
        self.presented.store(true, Ordering::SeqCst);
    }
}
