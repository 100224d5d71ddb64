// SPDX-License-Identifier: GPL-3.0-only

//! Honey Snap - live camera filters
//!
//! This library provides the core of the Honey Snap camera: filtered preview
//! thumbnails, countdown photo capture and filtered video recording, all
//! rendered from one live camera source through the same two-pass renderer
//! (orientation, then filter).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`app`]: Application model and message handling
//! - [`backends`]: Capture devices and the frame loop
//! - [`media`]: Filters, the frame renderer and video encoders
//! - [`pipelines`]: Preview, photo and video pipelines
//! - [`config`]: User configuration handling
//! - [`storage`]: Output directories and file naming
//!
//! # Example
//!
//! ```no_run
//! use honey_snap::app::{AppModel, Message};
//! use honey_snap::backends::camera::open_device;
//! use honey_snap::config::Config;
//!
//! let device = open_device("test-pattern")?;
//! let mut app = AppModel::with_detected_encoders(Config::default(), device)?;
//! app.update(Message::OpenCamera);
//! app.update(Message::SelectPreviewFilter("sepia".into()));
//! # Ok::<(), honey_snap::errors::AppError>(())
//! ```

pub mod app;
pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod media;
pub mod pipelines;
pub mod storage;

// Re-export commonly used types
pub use app::{AppEvent, AppModel, Message};
pub use config::Config;
pub use constants::BitratePreset;
pub use errors::{AppError, AppResult};
pub use media::filters::FilterSpec;
