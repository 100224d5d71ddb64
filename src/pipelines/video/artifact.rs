// SPDX-License-Identifier: GPL-3.0-only

//! Finished recordings

use crate::constants::file_names;
use crate::media::encoders::OutputFormat;
use std::time::Duration;
use uuid::Uuid;

/// A recording assembled from its encoder chunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoArtifact {
    pub session_id: Uuid,
    pub format: OutputFormat,
    /// Concatenation of every chunk in emission order
    pub data: Vec<u8>,
    pub chunk_count: usize,
    /// Wall time between start and finalize
    pub duration: Duration,
}

impl VideoArtifact {
    pub fn assemble(
        session_id: Uuid,
        format: OutputFormat,
        chunks: Vec<Vec<u8>>,
        duration: Duration,
    ) -> Self {
        let chunk_count = chunks.len();
        Self {
            session_id,
            format,
            data: chunks.concat(),
            chunk_count,
            duration,
        }
    }

    /// True when the encoder produced no data at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// `honey-snap-video.<ext>`
    pub fn suggested_filename(&self) -> String {
        format!("{}.{}", file_names::VIDEO_STEM, self.format.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_keeps_order() {
        let artifact = VideoArtifact::assemble(
            Uuid::new_v4(),
            OutputFormat::WEBM_H264,
            vec![vec![1, 2], vec![3], vec![4, 5, 6]],
            Duration::from_secs(3),
        );
        assert_eq!(artifact.data, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(artifact.chunk_count, 3);
        assert_eq!(artifact.suggested_filename(), "honey-snap-video.webm");
        assert_eq!(artifact.mime_type(), "video/webm; codecs=h264");
    }

    #[test]
    fn test_empty_artifact() {
        let artifact = VideoArtifact::assemble(
            Uuid::new_v4(),
            OutputFormat::MOTION_JPEG,
            Vec::new(),
            Duration::ZERO,
        );
        assert!(artifact.is_empty());
        assert_eq!(artifact.chunk_count, 0);
        assert_eq!(artifact.suggested_filename(), "honey-snap-video.mjpeg");
    }
}
