// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! This module handles encoding exported pixels to:
//! - PNG (lossless, keeps alpha)
//! - JPEG (lossy, composited over black)

use crate::config::PhotoFormat;
use crate::constants::file_names;
use crate::errors::PhotoError;
use crate::media::surface::flatten_over_black;
use image::RgbaImage;
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingFormat {
    /// PNG format (lossless compression)
    #[default]
    Png,
    /// JPEG format (lossy compression)
    Jpeg,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Png => "png",
            EncodingFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            EncodingFormat::Png => "image/png",
            EncodingFormat::Jpeg => "image/jpeg",
        }
    }
}

impl From<PhotoFormat> for EncodingFormat {
    fn from(format: PhotoFormat) -> Self {
        match format {
            PhotoFormat::Png => EncodingFormat::Png,
            PhotoFormat::Jpeg => EncodingFormat::Jpeg,
        }
    }
}

/// Encoded image data ready for saving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    /// `honey-snap-photo.<ext>`
    pub fn suggested_filename(&self) -> String {
        format!("{}.{}", file_names::PHOTO_STEM, self.format.extension())
    }
}

/// Photo encoder
#[derive(Debug, Clone, Copy)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    jpeg_quality: u8,
}

impl PhotoEncoder {
    /// PNG encoder
    pub fn new() -> Self {
        Self {
            format: EncodingFormat::Png,
            jpeg_quality: 90,
        }
    }

    pub fn with_format(format: EncodingFormat, jpeg_quality: u8) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn format(&self) -> EncodingFormat {
        self.format
    }

    pub fn encode(&self, image: &RgbaImage) -> Result<EncodedImage, PhotoError> {
        info!(
            width = image.width(),
            height = image.height(),
            format = ?self.format,
            "Starting encoding"
        );

        let data = match self.format {
            EncodingFormat::Png => Self::encode_png(image)?,
            EncodingFormat::Jpeg => Self::encode_jpeg(image, self.jpeg_quality)?,
        };

        debug!(size = data.len(), "Encoding complete");

        Ok(EncodedImage {
            data,
            format: self.format,
            width: image.width(),
            height: image.height(),
        })
    }

    /// Encode image as JPEG
    fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, PhotoError> {
        let rgb = flatten_over_black(image);
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);

        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
        encoder.encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )?;

        Ok(buffer)
    }

    /// Encode image as PNG
    fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PhotoError> {
        let mut buffer = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)?;
        Ok(buffer)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}
