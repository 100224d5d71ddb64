// SPDX-License-Identifier: GPL-3.0-only

//! Camera lifecycle handlers
//!
//! Handles opening and closing the source, flipping, and the display clock.

use crate::app::state::{AppEvent, AppModel};
use crate::pipelines::photo::CaptureState;
use std::time::Instant;
use tracing::{debug, info, warn};

impl AppModel {
    pub(crate) fn handle_open_camera(&mut self) -> Vec<AppEvent> {
        if self.source.is_open() {
            debug!("Camera already open");
            return Vec::new();
        }
        match self.source.open() {
            Ok(()) => vec![AppEvent::CameraOpened],
            Err(e) => {
                warn!(error = %e, "Camera unavailable");
                vec![AppEvent::Error(e.into())]
            }
        }
    }

    pub(crate) fn handle_close_camera(&mut self) -> Vec<AppEvent> {
        let was_open = self.source.is_open();
        // Loops reading the source see it unready on their next tick and end
        self.source.close();
        if was_open {
            vec![AppEvent::CameraClosed]
        } else {
            Vec::new()
        }
    }

    pub(crate) fn handle_flip_camera(&mut self) -> Vec<AppEvent> {
        let orientation = self.orientation.flip();
        info!(mirrored = orientation.is_mirrored(), "Camera flipped");
        Vec::new()
    }

    /// Display clock: publish the newest frame, render, collect encoder output
    pub(crate) fn handle_animation_frame(&mut self, now: Instant) -> Vec<AppEvent> {
        let mut events = Vec::new();

        let was_open = self.source.is_open();
        self.source.poll();
        if was_open && !self.source.is_open() {
            events.push(AppEvent::CameraClosed);
        }

        self.preview.ensure_running(&mut self.frame_loop);
        self.frame_loop.run_frame(now);

        // The flash clears on the display clock, not the countdown clock
        if self.capture.state() == CaptureState::Flash {
            self.capture.tick(now);
        }

        if let Some(artifact) = self.recorder.poll() {
            events.push(AppEvent::RecordingFinished(artifact.clone()));
            self.video = Some(artifact);
        }

        events
    }
}
