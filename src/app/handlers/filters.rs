// SPDX-License-Identifier: GPL-3.0-only

//! Filter selection handlers

use crate::app::state::{AppEvent, AppModel};
use crate::errors::{AppError, PhotoError};
use tracing::info;

impl AppModel {
    /// Select the live filter; recordings pick it up on their next frame
    pub(crate) fn handle_select_preview_filter(&mut self, id: &str) -> Vec<AppEvent> {
        match self.preview_filter.select(id) {
            Some(filter) => {
                info!(filter = filter.id, "Preview filter selected");
                vec![AppEvent::PreviewFilterChanged(filter.id)]
            }
            None => vec![AppEvent::Error(AppError::UnknownFilter(id.to_string()))],
        }
    }

    /// Change the display filter of the last photo
    pub(crate) fn handle_select_photo_filter(&mut self, id: &str) -> Vec<AppEvent> {
        let Some(photo) = self.photo.as_mut() else {
            return vec![AppEvent::Error(PhotoError::NoFrameAvailable.into())];
        };
        match self.post_processor.apply_filter_id(photo, id) {
            Some(filter) => vec![AppEvent::PhotoFilterChanged(filter.id)],
            None => vec![AppEvent::Error(AppError::UnknownFilter(id.to_string()))],
        }
    }
}
