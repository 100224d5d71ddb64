// SPDX-License-Identifier: GPL-3.0-only

//! Video recording pipeline
//!
//! This module provides the filtered recording pipeline:
//! - Deterministic output format selection with a Motion-JPEG fallback
//! - A compositing loop that follows live filter and orientation changes
//! - Ordered chunk collection into one [`VideoArtifact`]

pub mod artifact;
pub mod encoder_selection;
pub mod recorder;

pub use artifact::VideoArtifact;
pub use encoder_selection::{FormatSelection, default_preferences, parse_preferred, select_output_format};
pub use recorder::{COMPOSITE_TASK, RecordingOptions, RecordingPipeline, RecordingState};
