// SPDX-License-Identifier: GPL-3.0-only

//! Filtered video recording
//!
//! ```text
//!  SourceHandle ──▶ CompositeTask (FrameLoop) ──▶ SharedSurface ──▶ EncoderSession
//!                    orientation + filter                             │ chunks
//!                    re-read every tick                               ▼
//!                                          RecordingPipeline::poll ──▶ VideoArtifact
//! ```
//!
//! The compositing task keeps itself scheduled while the encoder reports
//! `Recording`; once [`RecordingPipeline::stop`] has been called it runs at
//! most one more time. Encoder chunks are collected from
//! [`RecordingPipeline::poll`], which the host calls from its event loop.

use super::artifact::VideoArtifact;
use super::encoder_selection::{default_preferences, select_output_format};
use crate::backends::camera::{FrameLoop, FrameTask, FrameTick, LoopAction, SharedOrientation, SourceHandle};
use crate::constants::{surfaces, timing};
use crate::errors::RecordingError;
use crate::media::encoders::{
    EncoderBackend, EncoderEvent, EncoderSession, EncoderState, EncoderStateHandle, OutputFormat,
    SurfaceStream,
};
use crate::media::filters::FilterSelection;
use crate::media::renderer::render_frame;
use crate::media::surface::{RenderSurface, SharedSurface};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Frame loop task name
pub const COMPOSITE_TASK: &str = "recording-composite";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
    /// Stop requested, waiting for the encoder's last chunks
    Stopping,
    /// Artifact assembled; a new recording may start
    Finalized,
}

/// Recording parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingOptions {
    /// Output formats in priority order
    pub preferred: Vec<OutputFormat>,
    pub fps: u32,
    /// Surface size when the source has not reported its own yet
    pub fallback_size: (u32, u32),
}

impl Default for RecordingOptions {
    fn default() -> Self {
        Self {
            preferred: default_preferences(),
            fps: timing::RECORDING_FPS,
            fallback_size: (
                surfaces::FALLBACK_RECORDING_WIDTH,
                surfaces::FALLBACK_RECORDING_HEIGHT,
            ),
        }
    }
}

/// One recording from start to finalize
struct RecordingSession {
    id: Uuid,
    encoder: Box<dyn EncoderSession>,
    format: OutputFormat,
    chunks: Vec<Vec<u8>>,
    started_at: Instant,
}

pub struct RecordingPipeline {
    source: SourceHandle,
    orientation: SharedOrientation,
    filter: FilterSelection,
    options: RecordingOptions,
    state: RecordingState,
    session: Option<RecordingSession>,
    composited: Arc<AtomicU64>,
}

impl RecordingPipeline {
    pub fn new(source: SourceHandle, orientation: SharedOrientation, filter: FilterSelection) -> Self {
        Self {
            source,
            orientation,
            filter,
            options: RecordingOptions::default(),
            state: RecordingState::Idle,
            session: None,
            composited: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_options(mut self, options: RecordingOptions) -> Self {
        self.options = options;
        self
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Format of the active session
    pub fn format(&self) -> Option<OutputFormat> {
        self.session.as_ref().map(|s| s.format)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Chunks collected so far in the active session
    pub fn chunk_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.chunks.len())
    }

    /// Frames drawn onto the compositing surface by the latest session
    pub fn frames_composited(&self) -> u64 {
        self.composited.load(Ordering::Relaxed)
    }

    /// Start recording the filtered source
    ///
    /// Picks the output format from what `backend` supports, starts an
    /// encoder session on a fresh compositing surface and schedules the
    /// compositing task on `frame_loop`.
    pub fn start(
        &mut self,
        backend: &dyn EncoderBackend,
        frame_loop: &mut FrameLoop,
    ) -> Result<OutputFormat, RecordingError> {
        if self.session.is_some() {
            return Err(RecordingError::AlreadyRecording);
        }
        if !self.source.is_open() {
            return Err(RecordingError::NoActiveSource);
        }

        let (width, height) = match self.source.intrinsic_size() {
            Some(size) => size,
            None => {
                debug!(
                    width = self.options.fallback_size.0,
                    height = self.options.fallback_size.1,
                    "Source size unknown, using fallback"
                );
                self.options.fallback_size
            }
        };

        let selection = select_output_format(&self.options.preferred, &backend.supported_formats())?;
        let surface = SharedSurface::new(width, height);
        let audio = self.source.audio_tracks();
        let audio_tracks = audio.len();

        let mut encoder = backend.create_session(
            SurfaceStream {
                surface: surface.clone(),
                fps: self.options.fps,
                audio,
            },
            selection.format,
        )?;
        encoder.start()?;

        let id = Uuid::new_v4();
        self.composited = Arc::new(AtomicU64::new(0));
        frame_loop.schedule(Box::new(CompositeTask {
            source: self.source.clone(),
            orientation: self.orientation.clone(),
            filter: self.filter.clone(),
            surface,
            encoder_state: encoder.state_handle(),
            scratch: RenderSurface::new(0, 0),
            composited: Arc::clone(&self.composited),
        }));

        info!(
            session = %id,
            backend = backend.name(),
            format = %selection.format,
            fell_back = selection.fell_back,
            width,
            height,
            fps = self.options.fps,
            audio_tracks,
            "Recording started"
        );

        self.session = Some(RecordingSession {
            id,
            encoder,
            format: selection.format,
            chunks: Vec::new(),
            started_at: Instant::now(),
        });
        self.state = RecordingState::Recording;
        Ok(selection.format)
    }

    /// Ask the encoder to finish; ignored unless recording
    pub fn stop(&mut self) {
        if self.state != RecordingState::Recording {
            debug!(state = ?self.state, "Stop ignored, not recording");
            return;
        }
        if let Some(session) = self.session.as_mut() {
            info!(session = %session.id, "Stopping recording");
            session.encoder.stop();
        }
        self.state = RecordingState::Stopping;
    }

    /// Collect pending encoder output
    ///
    /// Returns the artifact once the encoder has finished.
    pub fn poll(&mut self) -> Option<VideoArtifact> {
        let session = self.session.as_mut()?;
        let mut stopped = false;

        while let Some(event) = session.encoder.try_next_event() {
            match event {
                EncoderEvent::Data(chunk) if chunk.is_empty() => {
                    trace!(session = %session.id, "Discarding empty chunk");
                }
                EncoderEvent::Data(chunk) => {
                    trace!(session = %session.id, bytes = chunk.len(), "Chunk received");
                    session.chunks.push(chunk);
                }
                EncoderEvent::Error(message) => {
                    error!(session = %session.id, error = %message, "Encoder error");
                }
                EncoderEvent::Stopped => {
                    stopped = true;
                    break;
                }
            }
        }

        if !stopped {
            return None;
        }
        if self.state == RecordingState::Recording {
            warn!(session = %session.id, "Encoder stopped on its own");
        }
        self.finalize()
    }

    /// Stop and wait up to `timeout` for the artifact
    ///
    /// If the encoder has not finished by then, the chunks received so far
    /// are assembled.
    pub fn finish(&mut self, timeout: Duration) -> Result<VideoArtifact, RecordingError> {
        if self.session.is_none() {
            return Err(RecordingError::NotRecording);
        }
        self.stop();

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(artifact) = self.poll() {
                return Ok(artifact);
            }
            if Instant::now() >= deadline {
                warn!(?timeout, "Encoder did not finish in time, keeping partial output");
                return self.finalize().ok_or(RecordingError::NotRecording);
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn finalize(&mut self) -> Option<VideoArtifact> {
        let session = self.session.take()?;
        let artifact = VideoArtifact::assemble(
            session.id,
            session.format,
            session.chunks,
            session.started_at.elapsed(),
        );
        self.state = RecordingState::Finalized;
        info!(
            session = %artifact.session_id,
            format = %artifact.format,
            chunks = artifact.chunk_count,
            bytes = artifact.len(),
            frames = self.frames_composited(),
            "Recording finalized"
        );
        Some(artifact)
    }
}

impl Drop for RecordingPipeline {
    fn drop(&mut self) {
        if let Some(session) = self.session.as_mut() {
            if session.encoder.state() == EncoderState::Recording {
                warn!(session = %session.id, "Recording dropped while active, stopping encoder");
                session.encoder.stop();
            }
        }
    }
}

/// Draws the filtered source onto the compositing surface every tick
struct CompositeTask {
    source: SourceHandle,
    orientation: SharedOrientation,
    filter: FilterSelection,
    surface: SharedSurface,
    encoder_state: EncoderStateHandle,
    scratch: RenderSurface,
    composited: Arc<AtomicU64>,
}

impl FrameTask for CompositeTask {
    fn name(&self) -> &str {
        COMPOSITE_TASK
    }

    fn on_frame(&mut self, tick: &FrameTick) -> LoopAction {
        if self.encoder_state.get() != EncoderState::Recording {
            debug!(frame = tick.index, "Encoder no longer recording, compositing ends");
            return LoopAction::Stop;
        }
        // Not `is_ready`: recording may start before the first frame decodes
        if !self.source.is_open() {
            debug!(frame = tick.index, "Source closed, compositing ends");
            return LoopAction::Stop;
        }

        let frame = self.source.current_frame();
        let orientation = self.orientation.get();
        let filter = self.filter.current();
        let scratch = &mut self.scratch;
        let drew = self
            .surface
            .draw(|dest| render_frame(frame.as_deref(), orientation, filter, scratch, dest));
        if drew {
            self.composited.fetch_add(1, Ordering::Relaxed);
        }
        LoopAction::Continue
    }
}
