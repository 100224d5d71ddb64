// SPDX-License-Identifier: GPL-3.0-only

//! Still photo pipeline
//!
//! ```text
//! take photo → countdown 3, 2, 1 → flash + render → StillImage
//!                                                     ↓
//!                      apply filter (display only) / export (encode)
//! ```
//!
//! # Stages
//!
//! 1. **Capture** ([`capture`]): countdown state machine that renders one
//!    full-resolution frame with the live preview filter baked in
//! 2. **Post-Processing** ([`processing`]): swaps the display filter and
//!    materializes it on export
//! 3. **Encoding** ([`encoding`]): PNG or JPEG bytes plus a suggested filename

pub mod capture;
pub mod encoding;
pub mod processing;

pub use capture::{CaptureEvent, CapturePipeline, CaptureRequest, CaptureState, CountdownState};
pub use encoding::{EncodedImage, EncodingFormat, PhotoEncoder};
pub use processing::PhotoPostProcessor;

use crate::backends::camera::Orientation;
use crate::media::filters::FilterSpec;
use chrono::{DateTime, Local};
use image::RgbaImage;
use std::sync::Arc;
use uuid::Uuid;

/// A captured photo
///
/// The pixels and the filter baked into them are fixed at capture. The
/// display filter is a separate, non-destructive setting that only
/// [`PhotoPostProcessor`] may change.
#[derive(Debug, Clone)]
pub struct StillImage {
    id: Uuid,
    pixels: Arc<RgbaImage>,
    baked_filter: &'static FilterSpec,
    display_filter: &'static FilterSpec,
    orientation: Orientation,
    captured_at: DateTime<Local>,
}

impl StillImage {
    /// New capture; the display filter starts out equal to the baked filter
    pub fn new(pixels: RgbaImage, baked_filter: &'static FilterSpec, orientation: Orientation) -> Self {
        Self {
            id: Uuid::new_v4(),
            pixels: Arc::new(pixels),
            baked_filter,
            display_filter: baked_filter,
            orientation,
            captured_at: Local::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Stored pixels, already oriented and filtered
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Filter rendered into the pixels at capture
    pub fn baked_filter(&self) -> &'static FilterSpec {
        self.baked_filter
    }

    /// Filter shown when the photo is displayed or exported
    pub fn display_filter(&self) -> &'static FilterSpec {
        self.display_filter
    }

    /// CSS `filter` text for display-level rendering of the stored pixels
    pub fn display_css(&self) -> String {
        self.display_filter.css()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub(crate) fn set_display_filter(&mut self, filter: &'static FilterSpec) {
        self.display_filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::filters;

    #[test]
    fn test_display_filter_starts_as_baked() {
        let sepia = filters::preset("sepia").unwrap();
        let still = StillImage::new(RgbaImage::new(3, 2), sepia, Orientation::Mirrored);
        assert_eq!(still.baked_filter().id, "sepia");
        assert_eq!(still.display_filter().id, "sepia");
        assert_eq!(still.display_css(), "sepia(100%)");
        assert_eq!((still.width(), still.height()), (3, 2));
    }
}
