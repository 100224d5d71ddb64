// SPDX-License-Identifier: GPL-3.0-only

//! Capture operations handlers
//!
//! Handles the photo countdown and video recording.

use crate::app::state::{AppEvent, AppModel};
use crate::errors::AppResult;
use crate::pipelines::photo::{CaptureEvent, CaptureRequest};
use crate::pipelines::video::VideoArtifact;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

impl AppModel {
    pub(crate) fn handle_take_photo(&mut self) -> Vec<AppEvent> {
        match self.capture.request(Instant::now()) {
            Ok(CaptureRequest::Started { remaining }) => vec![AppEvent::CountdownStarted(remaining)],
            Ok(CaptureRequest::Ignored) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Photo request rejected");
                vec![AppEvent::Error(e.into())]
            }
        }
    }

    pub(crate) fn handle_cancel_photo(&mut self) -> Vec<AppEvent> {
        if self.capture.cancel() {
            vec![AppEvent::CountdownCancelled]
        } else {
            Vec::new()
        }
    }

    /// Countdown clock
    pub(crate) fn handle_timer_tick(&mut self, now: Instant) -> Vec<AppEvent> {
        self.capture
            .tick(now)
            .into_iter()
            .map(|event| match event {
                CaptureEvent::CountdownTick(remaining) => AppEvent::CountdownTick(remaining),
                CaptureEvent::Captured(photo) => {
                    let id = photo.id();
                    self.photo = Some(photo);
                    AppEvent::PhotoCaptured(id)
                }
                CaptureEvent::Failed(e) => AppEvent::Error(e.into()),
            })
            .collect()
    }

    pub(crate) fn handle_start_recording(&mut self) -> Vec<AppEvent> {
        match self
            .recorder
            .start(self.encoders.as_ref(), &mut self.frame_loop)
        {
            Ok(format) => vec![AppEvent::RecordingStarted(format)],
            Err(e) => {
                warn!(error = %e, "Recording not started");
                vec![AppEvent::Error(e.into())]
            }
        }
    }

    pub(crate) fn handle_stop_recording(&mut self) -> Vec<AppEvent> {
        if !self.recorder.is_recording() {
            debug!("Stop requested while not recording");
            return Vec::new();
        }
        self.recorder.stop();
        vec![AppEvent::RecordingStopping]
    }

    /// Stop the recording and wait up to `timeout` for its artifact
    pub fn finish_recording(&mut self, timeout: Duration) -> AppResult<VideoArtifact> {
        if let Some(artifact) = self.video.take() {
            return Ok(artifact);
        }
        let artifact = self.recorder.finish(timeout)?;
        info!(
            bytes = artifact.len(),
            chunks = artifact.chunk_count,
            "Recording finished"
        );
        if artifact.chunk_count == 0 {
            warn!("Recording produced no data");
        }
        Ok(artifact)
    }

    /// Whether the recorder still holds a session
    pub fn recording_pending(&self) -> bool {
        self.recorder.session_id().is_some()
    }
}
