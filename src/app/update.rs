// SPDX-License-Identifier: GPL-3.0-only

//! Message update handling
//!
//! The main `update()` function acts as a dispatcher; the handling code
//! lives in the `handlers` submodules organized by functional domain.
//!
//! # Handler Modules
//!
//! - `handlers::camera`: open, close, flip, display clock
//! - `handlers::capture`: photo countdown and video recording
//! - `handlers::filters`: preview and photo filter selection

use crate::app::state::{AppEvent, AppModel, Message};

impl AppModel {
    /// Handle one message and report what changed
    pub fn update(&mut self, message: Message) -> Vec<AppEvent> {
        match message {
            // ===== Camera =====
            Message::OpenCamera => self.handle_open_camera(),
            Message::CloseCamera => self.handle_close_camera(),
            Message::FlipCamera => self.handle_flip_camera(),
            Message::AnimationFrame(now) => self.handle_animation_frame(now),

            // ===== Photo =====
            Message::TakePhoto => self.handle_take_photo(),
            Message::CancelPhoto => self.handle_cancel_photo(),
            Message::TimerTick(now) => self.handle_timer_tick(now),

            // ===== Video =====
            Message::StartRecording => self.handle_start_recording(),
            Message::StopRecording => self.handle_stop_recording(),

            // ===== Filters =====
            Message::SelectPreviewFilter(id) => self.handle_select_preview_filter(&id),
            Message::SelectPhotoFilter(id) => self.handle_select_photo_filter(&id),
        }
    }
}
