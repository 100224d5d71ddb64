// SPDX-License-Identifier: GPL-3.0-only

//! Output format selection for the recording pipeline
//!
//! The first preferred format the host supports wins. When none is
//! supported the Motion-JPEG fallback is used, and if even that is missing,
//! the first format the host offers. Only an empty capability set is an
//! error. The result depends on nothing but the two input lists.

use crate::constants::formats;
use crate::errors::RecordingError;
use crate::media::encoders::OutputFormat;
use tracing::{debug, info, warn};

/// Chosen format and whether it came from the preferred list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatSelection {
    pub format: OutputFormat,
    pub fell_back: bool,
}

/// Default priority order
pub fn default_preferences() -> Vec<OutputFormat> {
    formats::PREFERRED_MIME_TYPES
        .iter()
        .filter_map(|mime| OutputFormat::from_mime(mime))
        .collect()
}

/// Parse a configured priority list, skipping unknown MIME types
pub fn parse_preferred(mimes: &[String]) -> Vec<OutputFormat> {
    let mut preferred: Vec<OutputFormat> = Vec::new();
    for mime in mimes {
        match OutputFormat::from_mime(mime) {
            Some(format) if !preferred.contains(&format) => preferred.push(format),
            Some(_) => debug!(mime = %mime, "Duplicate preferred format"),
            None => warn!(mime = %mime, "Ignoring unknown output format"),
        }
    }
    preferred
}

/// Pick the output format for a recording
pub fn select_output_format(
    preferred: &[OutputFormat],
    supported: &[OutputFormat],
) -> Result<FormatSelection, RecordingError> {
    if let Some(format) = preferred.iter().find(|f| supported.contains(f)) {
        info!(format = %format, "Selected preferred output format");
        return Ok(FormatSelection {
            format: *format,
            fell_back: false,
        });
    }

    let fallback = if supported.contains(&OutputFormat::MOTION_JPEG) {
        Some(OutputFormat::MOTION_JPEG)
    } else {
        supported.first().copied()
    };

    match fallback {
        Some(format) => {
            info!(format = %format, "No preferred format supported, using fallback");
            Ok(FormatSelection {
                format,
                fell_back: true,
            })
        }
        None => Err(RecordingError::EncoderNotAvailable(
            "no encoder formats available".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        let preferred = default_preferences();
        assert_eq!(
            preferred,
            vec![
                OutputFormat::MP4_H264,
                OutputFormat::WEBM_H264,
                OutputFormat::WEBM_VP8
            ]
        );

        let supported = [
            OutputFormat::MOTION_JPEG,
            OutputFormat::WEBM_VP8,
            OutputFormat::WEBM_H264,
        ];
        let selection = select_output_format(&preferred, &supported).unwrap();
        assert_eq!(selection.format, OutputFormat::WEBM_H264);
        assert!(!selection.fell_back);

        // Order of the host's list does not matter
        let mut reversed = supported;
        reversed.reverse();
        assert_eq!(
            select_output_format(&preferred, &reversed).unwrap(),
            selection
        );
    }

    #[test]
    fn test_fallback_only() {
        let selection =
            select_output_format(&default_preferences(), &[OutputFormat::MOTION_JPEG]).unwrap();
        assert_eq!(selection.format, OutputFormat::MOTION_JPEG);
        assert!(selection.fell_back);
    }

    #[test]
    fn test_nothing_supported() {
        assert!(matches!(
            select_output_format(&default_preferences(), &[]),
            Err(RecordingError::EncoderNotAvailable(_))
        ));
    }

    #[test]
    fn test_parse_preferred() {
        let parsed = parse_preferred(&[
            "video/webm".to_string(),
            "audio/ogg".to_string(),
            "VIDEO/WEBM".to_string(),
            "video/mp4".to_string(),
        ]);
        assert_eq!(parsed, vec![OutputFormat::WEBM_VP8, OutputFormat::MP4_H264]);
    }
}
