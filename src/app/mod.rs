// SPDX-License-Identifier: GPL-3.0-only

//! Application model for Honey Snap
//!
//! [`AppModel`] owns the capture source and every pipeline reading it. A
//! presentation layer (the CLI, or a GUI) feeds it [`Message`]s and renders
//! from its accessors and the [`AppEvent`]s each update returns.
//!
//! # Architecture
//!
//! - `state`: Application state types (AppModel, Message, AppEvent)
//! - `update`: Message dispatch
//! - `handlers`: Message handlers grouped by domain
//!
//! # Clocks
//!
//! Two clocks drive the model. [`Message::AnimationFrame`] is the display
//! clock: it publishes the newest camera frame, runs the frame loop and
//! collects encoder output. [`Message::TimerTick`] is the one-second
//! countdown clock.

mod handlers;
mod state;
mod update;

pub use state::{AppEvent, AppModel, Message};

use crate::backends::camera::{
    CaptureDevice, CaptureSource, FrameLoop, Orientation, SharedOrientation, StreamRequest,
};
use crate::config::Config;
use crate::constants::timing;
use crate::errors::{AppError, AppResult, PhotoError};
use crate::media::encoders::{EncoderBackend, EncoderRegistry};
use crate::media::filters::{FilterSelection, FilterSpec};
use crate::pipelines::photo::{
    CapturePipeline, CaptureState, EncodedImage, EncodingFormat, PhotoEncoder, PhotoPostProcessor,
    StillImage,
};
use crate::pipelines::preview::PreviewBank;
use crate::pipelines::video::{
    RecordingOptions, RecordingPipeline, RecordingState, VideoArtifact, default_preferences,
    parse_preferred,
};
use std::time::Instant;
use tracing::info;

impl AppModel {
    /// Wire every component to `device`; the camera is not opened yet
    pub fn new(
        config: Config,
        device: Box<dyn CaptureDevice>,
        encoders: Box<dyn EncoderBackend>,
    ) -> AppResult<Self> {
        config.validate()?;

        let preview_filter = FilterSelection::new(&config.preview_filter)
            .ok_or_else(|| AppError::UnknownFilter(config.preview_filter.clone()))?;
        let orientation = SharedOrientation::new(Orientation::from_mirrored(config.mirror_preview));
        let source = CaptureSource::new(
            device,
            StreamRequest {
                video: true,
                audio: config.capture_audio,
            },
        );
        let handle = source.handle();

        let capture = CapturePipeline::new(handle.clone(), orientation.clone(), preview_filter.clone())
            .with_timing(
                config.countdown_seconds,
                timing::COUNTDOWN_TICK,
                config.flash_duration(),
            );

        let mut preferred = parse_preferred(&config.preferred_formats);
        if preferred.is_empty() {
            preferred = default_preferences();
        }
        let recorder = RecordingPipeline::new(handle.clone(), orientation.clone(), preview_filter.clone())
            .with_options(RecordingOptions {
                preferred,
                fps: config.recording_fps,
                fallback_size: config.fallback_recording_size(),
            });

        let post_processor = PhotoPostProcessor::new(PhotoEncoder::with_format(
            EncodingFormat::from(config.photo_format),
            config.jpeg_quality,
        ));

        info!(
            device = %source.device().path,
            filter = preview_filter.current().id,
            mirrored = config.mirror_preview,
            encoder = encoders.name(),
            "Application model ready"
        );

        Ok(Self {
            preview: PreviewBank::new(handle, orientation.clone()),
            config,
            source,
            orientation,
            preview_filter,
            frame_loop: FrameLoop::new(),
            capture,
            recorder,
            encoders,
            post_processor,
            photo: None,
            video: None,
        })
    }

    /// Like [`AppModel::new`] with every encoder available in this build
    pub fn with_detected_encoders(config: Config, device: Box<dyn CaptureDevice>) -> AppResult<Self> {
        let encoders = EncoderRegistry::detect(config.encoder_settings());
        Self::new(config, device, Box::new(encoders))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_camera_open(&self) -> bool {
        self.source.is_open()
    }

    /// Open and at least one frame decoded
    pub fn is_camera_ready(&self) -> bool {
        self.source.handle().is_ready()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation.get()
    }

    pub fn preview_filter(&self) -> &'static FilterSpec {
        self.preview_filter.current()
    }

    pub fn preview(&self) -> &PreviewBank {
        &self.preview
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Number shown by a running countdown
    pub fn countdown(&self) -> Option<u32> {
        self.capture.countdown()
    }

    pub fn flash_active(&self, now: Instant) -> bool {
        self.capture.flash_active(now)
    }

    pub fn recording_state(&self) -> RecordingState {
        self.recorder.state()
    }

    pub fn photo(&self) -> Option<&StillImage> {
        self.photo.as_ref()
    }

    /// Export the last photo with its display filter
    pub fn export_photo(&self) -> AppResult<EncodedImage> {
        let photo = self.photo.as_ref().ok_or(PhotoError::NoFrameAvailable)?;
        Ok(self.post_processor.export(photo)?)
    }

    /// Export the last photo exactly as captured
    pub fn export_original_photo(&self) -> AppResult<EncodedImage> {
        let photo = self.photo.as_ref().ok_or(PhotoError::NoFrameAvailable)?;
        Ok(self.post_processor.export_original(photo)?)
    }

    /// Take the last finished recording
    pub fn take_video(&mut self) -> Option<VideoArtifact> {
        self.video.take()
    }
}
