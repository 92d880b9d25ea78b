// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

use crate::capture::{DevicePosition, PixelFormat};

/// Capture format settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// Resolution width
    pub width: u32,
    /// Resolution height
    pub height: u32,
    /// Framerate (None lets the device pick)
    pub framerate: Option<u32>,
    /// Pixel format as a FourCC-style string (e.g. "NV12", "RGBA")
    pub pixel_format: String,
}

impl FormatSettings {
    /// The parsed pixel format, if the string names one this pipeline
    /// understands.
    pub fn parse_pixel_format(&self) -> Option<PixelFormat> {
        PixelFormat::from_fourcc(&self.pixel_format)
    }
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            framerate: Some(30),
            pixel_format: "NV12".into(),
        }
    }
}

/// Preview session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Which device position to open
    pub position: DevicePosition,
    /// Whether to attach an audio output to the session
    pub attach_audio: bool,
    /// Capture format
    pub format: FormatSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            position: DevicePosition::default(),
            attach_audio: false,
            format: FormatSettings::default(),
        }
    }
}
