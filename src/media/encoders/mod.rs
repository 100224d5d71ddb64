// SPDX-License-Identifier: GPL-3.0-only

//! Video encoder sessions
//!
//! An encoder session consumes a compositing surface's output stream
//! ([`SurfaceStream`]) and emits binary chunks of one container format as
//! [`EncoderEvent`]s on a channel. Sessions run on background threads; the
//! recording pipeline only ever polls their event channel.
//!
//! Backends advertise which [`OutputFormat`]s they can produce. The
//! [`EncoderRegistry`] unions several backends in priority order.

#[cfg(feature = "gstreamer")]
pub mod gst;
pub mod mjpeg;

use crate::backends::camera::AudioTrack;
use crate::constants::{BitratePreset, formats, timing};
use crate::errors::RecordingError;
use crate::media::surface::SharedSurface;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Container formats for video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Mp4,
    WebM,
    /// Concatenated JPEG frames
    MotionJpeg,
}

/// Video codec inside the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoCodec {
    H264,
    Vp8,
    Jpeg,
}

/// A container/codec pair an encoder can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputFormat {
    pub container: ContainerFormat,
    pub codec: VideoCodec,
}

impl OutputFormat {
    pub const MP4_H264: OutputFormat = OutputFormat {
        container: ContainerFormat::Mp4,
        codec: VideoCodec::H264,
    };
    pub const WEBM_H264: OutputFormat = OutputFormat {
        container: ContainerFormat::WebM,
        codec: VideoCodec::H264,
    };
    pub const WEBM_VP8: OutputFormat = OutputFormat {
        container: ContainerFormat::WebM,
        codec: VideoCodec::Vp8,
    };
    /// Lowest common denominator; the in-process encoder always provides it
    pub const MOTION_JPEG: OutputFormat = OutputFormat {
        container: ContainerFormat::MotionJpeg,
        codec: VideoCodec::Jpeg,
    };

    pub fn mime_type(&self) -> &'static str {
        match (self.container, self.codec) {
            (ContainerFormat::Mp4, _) => formats::MIME_MP4,
            (ContainerFormat::WebM, VideoCodec::H264) => formats::MIME_WEBM_H264,
            (ContainerFormat::WebM, _) => formats::MIME_WEBM,
            (ContainerFormat::MotionJpeg, _) => formats::MIME_MJPEG,
        }
    }

    /// Parse a MIME type such as `video/webm; codecs=h264`
    pub fn from_mime(mime: &str) -> Option<Self> {
        let normalized: String = mime
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "video/mp4" | "video/mp4;codecs=h264" | "video/mp4;codecs=avc1" => {
                Some(Self::MP4_H264)
            }
            "video/webm;codecs=h264" => Some(Self::WEBM_H264),
            "video/webm" | "video/webm;codecs=vp8" => Some(Self::WEBM_VP8),
            "video/x-motion-jpeg" => Some(Self::MOTION_JPEG),
            _ => None,
        }
    }

    /// File extension for saved recordings
    pub fn extension(&self) -> &'static str {
        match self.container {
            ContainerFormat::WebM => "webm",
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::MotionJpeg => "mjpeg",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Encoder session state as observed by the recording pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Inactive,
    Recording,
    Stopping,
}

/// Lock-free, cloneable view of a session's [`EncoderState`]
#[derive(Debug, Clone)]
pub struct EncoderStateHandle(Arc<AtomicU8>);

impl EncoderStateHandle {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU8::new(0)))
    }

    pub fn get(&self) -> EncoderState {
        match self.0.load(Ordering::Acquire) {
            1 => EncoderState::Recording,
            2 => EncoderState::Stopping,
            _ => EncoderState::Inactive,
        }
    }

    pub fn set(&self, state: EncoderState) {
        let raw = match state {
            EncoderState::Inactive => 0,
            EncoderState::Recording => 1,
            EncoderState::Stopping => 2,
        };
        self.0.store(raw, Ordering::Release);
    }

    /// Move from `from` to `to`; false if the state was something else
    pub fn transition(&self, from: EncoderState, to: EncoderState) -> bool {
        let current = self.get();
        if current != from {
            return false;
        }
        self.set(to);
        true
    }
}

impl Default for EncoderStateHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Something the encoder emitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncoderEvent {
    /// A chunk of the output container, in emission order
    Data(Vec<u8>),
    /// A non-fatal encoding problem
    Error(String),
    /// Final event; no data follows
    Stopped,
}

/// The compositing surface's output stream plus pass-through audio
#[derive(Debug, Clone)]
pub struct SurfaceStream {
    pub surface: SharedSurface,
    /// Nominal capture rate
    pub fps: u32,
    pub audio: Vec<AudioTrack>,
}

impl SurfaceStream {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.fps.max(1)
    }
}

/// Tunables shared by all encoder backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub chunk_interval: Duration,
    pub quality: BitratePreset,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            chunk_interval: timing::CHUNK_INTERVAL,
            quality: BitratePreset::default(),
        }
    }
}

/// Encoder collaborator for one recording
pub trait EncoderSession: Send {
    fn format(&self) -> OutputFormat;

    /// Begin consuming the stream; state becomes Recording
    fn start(&mut self) -> Result<(), RecordingError>;

    /// Ask the encoder to flush and finish; state becomes Stopping, then
    /// Inactive once the final [`EncoderEvent::Stopped`] has been sent
    fn stop(&mut self);

    fn state_handle(&self) -> EncoderStateHandle;

    fn state(&self) -> EncoderState {
        self.state_handle().get()
    }

    /// Next pending event without blocking
    fn try_next_event(&mut self) -> Option<EncoderEvent>;
}

/// A family of encoders sharing one implementation
pub trait EncoderBackend: Send {
    fn name(&self) -> &str;

    /// Formats this backend can produce on this host
    fn supported_formats(&self) -> Vec<OutputFormat>;

    fn create_session(
        &self,
        stream: SurfaceStream,
        format: OutputFormat,
    ) -> Result<Box<dyn EncoderSession>, RecordingError>;
}

/// Several backends, consulted in order
#[derive(Default)]
pub struct EncoderRegistry {
    backends: Vec<Box<dyn EncoderBackend>>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(mut self, backend: Box<dyn EncoderBackend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Every backend available in this build, hardware first
    pub fn detect(settings: EncoderSettings) -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "gstreamer")]
        {
            match gst::GstBackend::new(settings) {
                Ok(backend) => registry = registry.with_backend(Box::new(backend)),
                Err(e) => tracing::warn!(error = %e, "GStreamer encoders unavailable"),
            }
        }

        let registry = registry.with_backend(Box::new(mjpeg::MjpegBackend::new(settings)));
        info!(formats = ?registry.supported_formats(), "Detected encoder formats");
        registry
    }
}

impl EncoderBackend for EncoderRegistry {
    fn name(&self) -> &str {
        "registry"
    }

    fn supported_formats(&self) -> Vec<OutputFormat> {
        let mut formats = Vec::new();
        for backend in &self.backends {
            for format in backend.supported_formats() {
                if !formats.contains(&format) {
                    formats.push(format);
                }
            }
        }
        formats
    }

    fn create_session(
        &self,
        stream: SurfaceStream,
        format: OutputFormat,
    ) -> Result<Box<dyn EncoderSession>, RecordingError> {
        let backend = self
            .backends
            .iter()
            .find(|b| b.supported_formats().contains(&format))
            .ok_or_else(|| RecordingError::UnsupportedOutputFormat(format.to_string()))?;
        debug!(backend = backend.name(), format = %format, "Creating encoder session");
        backend.create_session(stream, format)
    }
}
