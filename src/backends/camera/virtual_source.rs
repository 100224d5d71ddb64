// SPDX-License-Identifier: GPL-3.0-only

//! Virtual capture devices
//!
//! Stand-ins for a webcam: animated color bars, or a still image file looped
//! at the virtual frame rate. Useful on machines without a camera and for
//! demonstrating filters on a known picture.

use super::frame_loop::{CaptureThread, LoopAction};
use super::types::{CameraDevice, CameraFrame, StreamRequest, frame_channel};
use super::{CaptureDevice, MediaStream, VideoTrack};
use crate::constants::timing;
use crate::errors::CameraError;
use image::{Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

/// Device spec for the test pattern
pub const TEST_PATTERN_SPEC: &str = "test-pattern";

/// Device spec prefix for image files
pub const IMAGE_SPEC_PREFIX: &str = "image:";

const PATTERN_WIDTH: u32 = 640;
const PATTERN_HEIGHT: u32 = 480;

/// SMPTE-style bar colors, left to right
const BARS: [[u8; 3]; 7] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
];

enum Content {
    TestPattern,
    Image { path: PathBuf, image: Arc<RgbaImage> },
}

/// A camera that synthesizes its frames
pub struct VirtualDevice {
    content: Content,
}

impl VirtualDevice {
    pub fn test_pattern() -> Self {
        Self {
            content: Content::TestPattern,
        }
    }

    /// Loop a still image file
    pub fn image(path: impl AsRef<Path>) -> Result<Self, CameraError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading image file");
        let image = image::open(path)
            .map_err(|e| {
                CameraError::DeviceUnavailable(format!(
                    "Failed to load image '{}': {}",
                    path.display(),
                    e
                ))
            })?
            .to_rgba8();
        info!(width = image.width(), height = image.height(), "Image loaded");
        Ok(Self {
            content: Content::Image {
                path: path.to_path_buf(),
                image: Arc::new(image),
            },
        })
    }
}

impl CaptureDevice for VirtualDevice {
    fn describe(&self) -> CameraDevice {
        match &self.content {
            Content::TestPattern => CameraDevice {
                name: "Test pattern".to_string(),
                path: TEST_PATTERN_SPEC.to_string(),
                driver: "virtual".to_string(),
            },
            Content::Image { path, .. } => CameraDevice {
                name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "Image".to_string()),
                path: format!("{}{}", IMAGE_SPEC_PREFIX, path.display()),
                driver: "virtual".to_string(),
            },
        }
    }

    fn request(&mut self, request: StreamRequest) -> Result<MediaStream, CameraError> {
        if !request.video {
            return Err(CameraError::InvalidFormat(
                "virtual devices only provide video".to_string(),
            ));
        }
        if request.audio {
            debug!("Virtual device has no audio; stream is video-only");
        }

        let (sender, receiver) = frame_channel();
        let ended = Arc::new(AtomicBool::new(false));
        let label = self.describe().name;

        let mut render: Box<dyn FnMut(u64) -> CameraFrame + Send> = match &self.content {
            Content::TestPattern => Box::new(|index| CameraFrame::from_image(test_pattern(index))),
            Content::Image { image, .. } => {
                let image = Arc::clone(image);
                Box::new(move |_| CameraFrame::from_image((*image).clone()))
            }
        };

        let mut index = 0u64;
        let mut next_deadline = Instant::now();
        let worker = CaptureThread::start(
            &format!("virtual-capture {}", label),
            Arc::clone(&ended),
            move || {
                let frame = render(index);
                index += 1;

                match sender.try_send(frame) {
                    Ok(()) | Err(TrySendError::Full(_)) => {}
                    Err(TrySendError::Closed(_)) => return LoopAction::Stop,
                }

                next_deadline += timing::VIRTUAL_FRAME_DURATION;
                let now = Instant::now();
                if next_deadline > now {
                    std::thread::sleep(next_deadline - now);
                } else {
                    next_deadline = now;
                }
                LoopAction::Continue
            },
        );

        Ok(MediaStream::new(
            VideoTrack::new(label, receiver, ended).with_worker(worker),
            Vec::new(),
        ))
    }
}

/// Color bars with a white marker sweeping left to right
///
/// The marker makes horizontal mirroring and motion easy to see.
pub fn test_pattern(index: u64) -> RgbaImage {
    let bar_width = PATTERN_WIDTH.div_ceil(BARS.len() as u32);
    let marker_x = (index as u32).wrapping_mul(8) % PATTERN_WIDTH;
    let marker_rows = PATTERN_HEIGHT * 3 / 4..PATTERN_HEIGHT;

    RgbaImage::from_fn(PATTERN_WIDTH, PATTERN_HEIGHT, |x, y| {
        if marker_rows.contains(&y) {
            if x.abs_diff(marker_x) < 8 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([16, 16, 16, 255])
            }
        } else {
            let [r, g, b] = BARS[(x / bar_width) as usize];
            Rgba([r, g, b, 255])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::CaptureSource;
    use std::time::Duration;

    #[test]
    fn test_pattern_bars() {
        let frame = test_pattern(0);
        assert_eq!(frame.dimensions(), (PATTERN_WIDTH, PATTERN_HEIGHT));
        assert_eq!(frame.get_pixel(0, 0).0, [235, 235, 235, 255]);
        assert_eq!(frame.get_pixel(PATTERN_WIDTH - 1, 0).0, [16, 16, 235, 255]);
    }

    #[test]
    fn test_virtual_source_becomes_ready() {
        let mut source = CaptureSource::new(
            Box::new(VirtualDevice::test_pattern()),
            StreamRequest::default(),
        );
        let handle = source.handle();
        source.open().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while !handle.is_ready() && Instant::now() < deadline {
            source.poll();
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(handle.is_ready());
        assert_eq!(handle.intrinsic_size(), Some((PATTERN_WIDTH, PATTERN_HEIGHT)));
        source.close();
        source.close();
        assert!(!handle.is_ready());
    }

    #[test]
    fn test_missing_image_is_unavailable() {
        let result = VirtualDevice::image("/nonexistent/honey.png");
        assert!(matches!(result, Err(CameraError::DeviceUnavailable(_))));
    }
}
