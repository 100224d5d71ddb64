// SPDX-License-Identifier: GPL-3.0-only

//! Post-processing for captured photos
//!
//! Changing a photo's filter is display-only: the stored pixels keep the
//! filter they were captured with, and the new filter is described as CSS
//! text for the presentation layer. Export is the one place where the display
//! filter is rendered into pixels, as a single filter pass over the stored
//! image (no orientation pass; stored pixels are already oriented).

use super::StillImage;
use super::encoding::{EncodedImage, PhotoEncoder};
use crate::errors::PhotoError;
use crate::media::filters::{self, FilterSpec};
use crate::media::renderer::filter_pass;
use crate::media::surface::RenderSurface;
use tracing::{debug, info};

pub struct PhotoPostProcessor {
    encoder: PhotoEncoder,
}

impl PhotoPostProcessor {
    pub fn new(encoder: PhotoEncoder) -> Self {
        Self { encoder }
    }

    pub fn encoder(&self) -> PhotoEncoder {
        self.encoder
    }

    /// Change the filter the photo is displayed and exported with
    pub fn apply_filter(&self, image: &mut StillImage, filter: &'static FilterSpec) {
        debug!(photo = %image.id(), filter = filter.id, "Photo display filter changed");
        image.set_display_filter(filter);
    }

    /// [`apply_filter`](Self::apply_filter) by preset id
    pub fn apply_filter_id(&self, image: &mut StillImage, id: &str) -> Option<&'static FilterSpec> {
        let filter = filters::preset(id)?;
        self.apply_filter(image, filter);
        Some(filter)
    }

    /// Encode the stored pixels with the display filter rendered in
    pub fn export(&self, image: &StillImage) -> Result<EncodedImage, PhotoError> {
        let mut dest = RenderSurface::new(image.width(), image.height());
        filter_pass(image.pixels(), image.display_filter(), &mut dest);
        info!(
            photo = %image.id(),
            baked = image.baked_filter().id,
            display = image.display_filter().id,
            "Exporting photo"
        );
        self.encoder.encode(dest.image())
    }

    /// Encode the stored pixels as captured
    pub fn export_original(&self, image: &StillImage) -> Result<EncodedImage, PhotoError> {
        info!(photo = %image.id(), "Exporting original photo");
        self.encoder.encode(image.pixels())
    }
}

impl Default for PhotoPostProcessor {
    fn default() -> Self {
        Self::new(PhotoEncoder::default())
    }
}
