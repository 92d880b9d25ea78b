// SPDX-License-Identifier: GPL-3.0-only

//! wgpu implementation of the GPU binding boundary
//!
//! Plane import here allocates the texture once per buffer identity and
//! uploads mapped plane bytes with `Queue::write_texture`, the portable
//! path for buffers that only offer a CPU mapping. Platforms with
//! importable hardware buffers (DMABuf, IOSurface, AHardwareBuffer)
//! supply their own [`GpuDevice`] whose import aliases the buffer memory
//! outright; everything above this module is written against that
//! contract and does not change.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    CommandQueue, Drawable, GpuDevice, GpuTexture, ImportError, ImportResult, TextureFormat,
};
use crate::capture::{PlaneLayout, VideoFrame};
use crate::geometry::Rect;

pub fn to_wgpu_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
        TextureFormat::Rg8Unorm => wgpu::TextureFormat::Rg8Unorm,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TextureFormat::Bgra8UnormSrgb => wgpu::TextureFormat::Bgra8UnormSrgb,
    }
}

pub fn from_wgpu_format(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    match format {
        wgpu::TextureFormat::R8Unorm => Some(TextureFormat::R8Unorm),
        wgpu::TextureFormat::Rg8Unorm => Some(TextureFormat::Rg8Unorm),
        wgpu::TextureFormat::Rgba8Unorm => Some(TextureFormat::Rgba8Unorm),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(TextureFormat::Rgba8UnormSrgb),
        wgpu::TextureFormat::Bgra8Unorm => Some(TextureFormat::Bgra8Unorm),
        wgpu::TextureFormat::Bgra8UnormSrgb => Some(TextureFormat::Bgra8UnormSrgb),
        _ => None,
    }
}

/// A wgpu texture behind the [`GpuTexture`] handle.
#[derive(Debug)]
pub struct WgpuTexture {
    texture: wgpu::Texture,
    format: TextureFormat,
}

impl WgpuTexture {
    pub fn new(texture: wgpu::Texture, format: TextureFormat) -> Self {
        Self { texture, format }
    }

    pub fn raw(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl GpuTexture for WgpuTexture {
    fn width(&self) -> u32 {
        self.texture.width()
    }

    fn height(&self) -> u32 {
        self.texture.height()
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Information about the created GPU device
#[derive(Debug)]
pub struct GpuDeviceInfo {
    /// Name of the GPU adapter
    pub adapter_name: String,
    /// Backend being used (Vulkan on Linux)
    pub backend: wgpu::Backend,
}

/// Create a wgpu device and queue for the preview pipeline.
///
/// # Arguments
///
/// * `label` - A label for the device (for debugging)
pub async fn create_preview_device(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), String> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::VULKAN,
        ..Default::default()
    });

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        })
        .await
        .map_err(|err| format!("failed to find suitable GPU adapter: {err}"))?;

    let adapter_info = adapter.get_info();
    info!(
        adapter = %adapter_info.name,
        backend = ?adapter_info.backend,
        "GPU adapter selected for preview"
    );

    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some(label),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            memory_hints: wgpu::MemoryHints::Performance,
            ..Default::default()
        })
        .await
        .map_err(|err| format!("failed to create GPU device: {err}"))?;

    Ok((
        Arc::new(device),
        Arc::new(queue),
        GpuDeviceInfo {
            adapter_name: adapter_info.name,
            backend: adapter_info.backend,
        },
    ))
}

/// Blocking wrapper around [`create_preview_device`].
pub fn create_preview_device_blocking(
    label: &str,
) -> Result<(Arc<wgpu::Device>, Arc<wgpu::Queue>, GpuDeviceInfo), String> {
    pollster::block_on(create_preview_device(label))
}

/// [`GpuDevice`] over a wgpu device/queue pair.
pub struct WgpuDevice {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuDevice {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Arc<Self> {
        Arc::new(Self { device, queue })
    }

    /// Create the device through the default adapter selection.
    pub fn request(label: &str) -> Result<Arc<Self>, String> {
        let (device, queue, _info) = create_preview_device_blocking(label)?;
        Ok(Self::new(device, queue))
    }

    fn write_plane(
        &self,
        texture: &wgpu::Texture,
        frame: &VideoFrame,
        plane: usize,
        layout: PlaneLayout,
    ) -> Result<(), ImportError> {
        let bytes = frame.buffer().plane_bytes(plane).ok_or_else(|| {
            ImportError::Unsupported(
                "buffer has no CPU mapping; an importing GpuDevice is required".into(),
            )
        })?;
        let expected = (layout.stride * layout.height) as usize;
        if bytes.len() < expected {
            return Err(ImportError::Failed(format!(
                "plane {} holds {} bytes, layout needs {}",
                plane,
                bytes.len(),
                expected
            )));
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(layout.stride),
                rows_per_image: Some(layout.height),
            },
            wgpu::Extent3d {
                width: layout.width,
                height: layout.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

impl GpuDevice for WgpuDevice {
    fn import_plane(
        &self,
        frame: &VideoFrame,
        plane: usize,
        format: TextureFormat,
        layout: PlaneLayout,
    ) -> ImportResult {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("preview-plane"),
            size: wgpu::Extent3d {
                width: layout.width,
                height: layout.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: to_wgpu_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        self.write_plane(&texture, frame, plane, layout)?;
        debug!(
            plane,
            width = layout.width,
            height = layout.height,
            %format,
            "uploaded plane texture"
        );
        Ok(Arc::new(WgpuTexture::new(texture, format)))
    }

    fn refresh_plane(
        &self,
        texture: &Arc<dyn GpuTexture>,
        frame: &VideoFrame,
        plane: usize,
        layout: PlaneLayout,
    ) -> Result<(), ImportError> {
        let texture = texture
            .as_any()
            .downcast_ref::<WgpuTexture>()
            .ok_or_else(|| ImportError::Failed("cached texture is not a wgpu texture".into()))?;
        self.write_plane(&texture.texture, frame, plane, layout)
    }

    fn make_queue(&self) -> Arc<dyn CommandQueue> {
        Arc::new(WgpuQueue {
            device: Arc::clone(&self.device),
            queue: Arc::clone(&self.queue),
        })
    }
}

/// [`CommandQueue`] submitting one encoder per draw.
pub struct WgpuQueue {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl CommandQueue for WgpuQueue {
    fn blit_and_present(
        &self,
        source: &dyn GpuTexture,
        extent: (u32, u32),
        origin: (u32, u32),
        drawable: Box<dyn Drawable>,
    ) {
        let Some(source) = source.as_any().downcast_ref::<WgpuTexture>() else {
            warn!("blit source is not a wgpu texture");
            drawable.present();
            return;
        };
        let destination = drawable.texture();
        let Some(destination) = destination.as_any().downcast_ref::<WgpuTexture>() else {
            warn!("drawable texture is not a wgpu texture");
            drawable.present();
            return;
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("preview-blit"),
            });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: source.raw(),
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: destination.raw(),
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: origin.0,
                    y: origin.1,
                    z: 0,
                },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: extent.0,
                height: extent.1,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));
        drawable.present();
    }
}

/// A surface frame wrapped for the draw path.
pub struct WgpuDrawable {
    frame: wgpu::SurfaceTexture,
    texture: Arc<dyn GpuTexture>,
    bounds: Rect,
    backing_scale: f32,
}

impl WgpuDrawable {
    /// Wrap the current surface frame together with the surface's
    /// reported logical bounds and backing scale.
    pub fn new(
        frame: wgpu::SurfaceTexture,
        bounds: Rect,
        backing_scale: f32,
    ) -> Result<Box<Self>, ImportError> {
        let format = from_wgpu_format(frame.texture.format()).ok_or_else(|| {
            ImportError::Unsupported(format!(
                "surface format {:?} is not supported by the preview pipeline",
                frame.texture.format()
            ))
        })?;
        let texture: Arc<dyn GpuTexture> =
            Arc::new(WgpuTexture::new(frame.texture.clone(), format));
        Ok(Box::new(Self {
            frame,
            texture,
            bounds,
            backing_scale,
        }))
    }
}

impl Drawable for WgpuDrawable {
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
        let this = *self;
        this.frame.present();
    }
}
