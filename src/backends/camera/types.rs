// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture devices and their consumers

use image::{ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A decoded camera frame in straight RGBA
#[derive(Debug, Clone)]
pub struct CameraFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel rows, `stride` bytes apart
    pub data: Arc<[u8]>,
    /// Bytes per row
    pub stride: u32,
    pub captured_at: Instant,
}

impl CameraFrame {
    /// Wrap tightly packed RGBA bytes
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::from(data),
            stride: width * 4,
            captured_at: Instant::now(),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw())
    }

    /// Borrow the pixels as an image view, repacking rows only when the stride has padding
    ///
    /// Returns `None` if the buffer is too short for the declared geometry.
    pub fn view(&self) -> Option<ImageBuffer<Rgba<u8>, Cow<'_, [u8]>>> {
        let row = self.width as usize * 4;
        let stride = self.stride as usize;
        let rows = self.height as usize;

        if stride == row {
            let data = self.data.get(..row * rows)?;
            return ImageBuffer::from_raw(self.width, self.height, Cow::Borrowed(data));
        }

        if stride < row || self.data.len() < stride * rows.saturating_sub(1) + row {
            return None;
        }

        let mut packed = Vec::with_capacity(row * rows);
        for y in 0..rows {
            packed.extend_from_slice(&self.data[y * stride..y * stride + row]);
        }
        ImageBuffer::from_raw(self.width, self.height, Cow::Owned(packed))
    }
}

/// Sender half of a video track's frame channel
pub type FrameSender = tokio::sync::mpsc::Sender<CameraFrame>;

/// Receiver half of a video track's frame channel
pub type FrameReceiver = tokio::sync::mpsc::Receiver<CameraFrame>;

/// Frames buffered between a device thread and the source before drops
pub const FRAME_CHANNEL_DEPTH: usize = 4;

/// Create a frame channel for a video track
pub fn frame_channel() -> (FrameSender, FrameReceiver) {
    tokio::sync::mpsc::channel(FRAME_CHANNEL_DEPTH)
}

/// What a consumer asks the device for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub video: bool,
    pub audio: bool,
}

impl Default for StreamRequest {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

/// A capture device as listed to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Human-readable name (V4L2 card name for hardware)
    pub name: String,
    /// Device spec accepted by [`super::open_device`]
    pub path: String,
    pub driver: String,
}

/// A negotiated capture format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFormat {
    pub width: u32,
    pub height: u32,
    pub fourcc: String,
}

impl std::fmt::Display for CameraFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.fourcc)
    }
}

/// Horizontal layout of rendered frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    /// Horizontally flipped (selfie mode)
    #[default]
    Mirrored,
    Natural,
}

impl Orientation {
    pub fn from_mirrored(mirrored: bool) -> Self {
        if mirrored {
            Orientation::Mirrored
        } else {
            Orientation::Natural
        }
    }

    pub fn is_mirrored(self) -> bool {
        self == Orientation::Mirrored
    }

    pub fn flipped(self) -> Self {
        Self::from_mirrored(!self.is_mirrored())
    }
}

/// Orientation flag shared by every consumer of one capture source
///
/// Only the flip action writes it; render loops re-read it every tick.
#[derive(Debug, Clone)]
pub struct SharedOrientation(Arc<AtomicBool>);

impl SharedOrientation {
    pub fn new(orientation: Orientation) -> Self {
        Self(Arc::new(AtomicBool::new(orientation.is_mirrored())))
    }

    pub fn get(&self) -> Orientation {
        Orientation::from_mirrored(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, orientation: Orientation) {
        self.0.store(orientation.is_mirrored(), Ordering::Release);
    }

    /// Toggle and return the new orientation
    pub fn flip(&self) -> Orientation {
        let was_mirrored = self.0.fetch_xor(true, Ordering::AcqRel);
        Orientation::from_mirrored(!was_mirrored)
    }
}

impl Default for SharedOrientation {
    fn default() -> Self {
        Self::new(Orientation::default())
    }
}
