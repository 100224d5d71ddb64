// SPDX-License-Identifier: GPL-3.0-only

//! Application state management

use crate::backends::camera::{CaptureSource, FrameLoop, SharedOrientation};
use crate::config::Config;
use crate::errors::AppError;
use crate::media::encoders::{EncoderBackend, OutputFormat};
use crate::media::filters::FilterSelection;
use crate::pipelines::photo::{CapturePipeline, PhotoPostProcessor, StillImage};
use crate::pipelines::preview::PreviewBank;
use crate::pipelines::video::{RecordingPipeline, VideoArtifact};
use std::time::Instant;
use uuid::Uuid;

/// User-facing triggers and clock ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    OpenCamera,
    CloseCamera,
    /// Start the photo countdown
    TakePhoto,
    /// Abort a running countdown
    CancelPhoto,
    /// Toggle mirrored/natural orientation
    FlipCamera,
    StartRecording,
    StopRecording,
    /// Preset id used for previews, captures and recordings
    SelectPreviewFilter(String),
    /// Preset id used to display and export the last photo
    SelectPhotoFilter(String),
    /// Display clock tick
    AnimationFrame(Instant),
    /// Countdown clock tick
    TimerTick(Instant),
}

/// What happened while handling a message, for the presentation layer
#[derive(Debug, Clone)]
pub enum AppEvent {
    CameraOpened,
    CameraClosed,
    CountdownStarted(u32),
    CountdownTick(u32),
    CountdownCancelled,
    PhotoCaptured(Uuid),
    RecordingStarted(OutputFormat),
    RecordingStopping,
    RecordingFinished(VideoArtifact),
    PreviewFilterChanged(&'static str),
    PhotoFilterChanged(&'static str),
    Error(AppError),
}

/// Every component of the camera, wired to one capture source
pub struct AppModel {
    pub(crate) config: Config,
    pub(crate) source: CaptureSource,
    pub(crate) orientation: SharedOrientation,
    pub(crate) preview_filter: FilterSelection,
    pub(crate) frame_loop: FrameLoop,
    pub(crate) preview: PreviewBank,
    pub(crate) capture: CapturePipeline,
    pub(crate) recorder: RecordingPipeline,
    pub(crate) encoders: Box<dyn EncoderBackend>,
    pub(crate) post_processor: PhotoPostProcessor,
    /// Most recent capture
    pub(crate) photo: Option<StillImage>,
    /// Most recent finished recording, until taken
    pub(crate) video: Option<VideoArtifact>,
}
