// SPDX-License-Identifier: GPL-3.0-only

//! On-demand preview compositing
//!
//! [`PreviewSurface`] owns the draw end of the pipeline: a single-slot
//! "latest texture" handoff written from the delivery thread and read
//! from the platform's draw context. Redraws are on-demand only; the surface
//! never self-redraws on a timer, so no GPU work happens while no new
//! frame has arrived.

pub mod session;

pub use session::PreviewSession;

use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

use crate::geometry::{Rect, Size};
use crate::gpu::{CommandQueue, Drawable, GpuDevice, GpuTexture, TextureFormat};

type RedrawHandler = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct SurfaceState {
    /// Latest-wins slot. Weak: the bridge's cache owns texture lifetime,
    /// the surface only reads the most recent handle at draw time.
    source: Option<Weak<dyn GpuTexture>>,
    queue: Option<Arc<dyn CommandQueue>>,
    preferred_format: Option<TextureFormat>,
}

/// The destination drawable's owner: accepts the newest source texture
/// from the delivery side and composites it on an external trigger.
///
/// Two states: *idle* (no source texture yet; draws are no-ops) and
/// *ready* (a texture has been set). There is no transition back: a new
/// texture simply replaces the previous reference.
#[derive(Default)]
pub struct PreviewSurface {
    state: Mutex<SurfaceState>,
    redraw: Mutex<Option<RedrawHandler>>,
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the command queue of the (re)bound GPU device.
    pub fn bind_device(&self, device: &Arc<dyn GpuDevice>) {
        let queue = device.make_queue();
        if let Ok(mut state) = self.state.lock() {
            state.queue = Some(queue);
        }
    }

    /// Register the external redraw trigger invoked after each new
    /// source texture. Without one, the embedder is expected to call
    /// [`render_once`](Self::render_once) on its own schedule.
    pub fn set_redraw_handler(&self, handler: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut redraw) = self.redraw.lock() {
            *redraw = Some(Box::new(handler));
        }
    }

    /// Whether a source texture has ever been set.
    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.source.is_some())
            .unwrap_or(false)
    }

    /// The pixel format the destination surface should be configured
    /// with; follows the most recently drawn source texture.
    pub fn preferred_format(&self) -> Option<TextureFormat> {
        self.state
            .lock()
            .ok()
            .and_then(|state| state.preferred_format)
    }

    /// Store the newest source texture and request one redraw.
    ///
    /// May race with an in-progress [`render_once`](Self::render_once);
    /// the draw sees either the previous or this texture, never a torn
    /// value. Textures set faster than draws are triggered are silently
    /// superseded.
    pub fn set_source_texture(&self, texture: &Arc<dyn GpuTexture>) {
        if let Ok(mut state) = self.state.lock() {
            state.source = Some(Arc::downgrade(texture));
        }
        if let Ok(redraw) = self.redraw.lock() {
            if let Some(handler) = redraw.as_ref() {
                handler();
            }
        }
    }

    /// Composite the current source texture into `drawable` and present.
    ///
    /// A no-op (zero submissions, never a panic) while idle, when the
    /// latest texture has been dropped by its owner, or when no queue is
    /// bound. Transient unavailability is an expected steady state, not
    /// a fault.
    pub fn render_once(&self, drawable: Box<dyn Drawable>) {
        // snapshot under a brief lock, released before any GPU work
        let (texture, queue) = match self.state.lock() {
            Ok(state) => (
                state.source.as_ref().and_then(Weak::upgrade),
                state.queue.clone(),
            ),
            Err(_) => return,
        };
        let Some(texture) = texture else {
            return;
        };
        let Some(queue) = queue else {
            return;
        };

        // the destination adapts to the source, not vice versa
        let source_format = texture.format();
        if let Ok(mut state) = self.state.lock() {
            state.preferred_format = Some(source_format);
        }
        let destination = drawable.texture();
        if destination.format() != source_format {
            debug!(
                source = %source_format,
                destination = %destination.format(),
                "drawable format lags the source; presenting without blit"
            );
            drawable.present();
            return;
        }

        let target = Rect::new(
            drawable.bounds().origin,
            drawable.bounds().size.multiply(drawable.backing_scale()),
        );
        let fitted = Rect::from_size(Size::new(
            texture.width() as f32,
            texture.height() as f32,
        ))
        .scale_fit(target);

        // clamp to texels both textures actually have
        let origin = (
            fitted.origin.x.max(0.0) as u32,
            fitted.origin.y.max(0.0) as u32,
        );
        let extent = (
            (fitted.size.width.max(0.0) as u32)
                .min(texture.width())
                .min(destination.width().saturating_sub(origin.0)),
            (fitted.size.height.max(0.0) as u32)
                .min(texture.height())
                .min(destination.height().saturating_sub(origin.1)),
        );
        if extent.0 == 0 || extent.1 == 0 {
            drawable.present();
            return;
        }

        queue.blit_and_present(texture.as_ref(), extent, origin, drawable);
    }
}
