// SPDX-License-Identifier: GPL-3.0-only

//! Pixel processing shared by every pipeline
//!
//! # Rendering
//!
//! Camera frames reach the screen, the photo and the recording through the
//! same two-pass [`renderer`]: orientation first, then the [`filters`] pass,
//! each drawing into a [`surface::RenderSurface`].
//!
//! # Video Encoding
//!
//! The [`encoders`] module turns the recording surface into container
//! chunks:
//! - **GStreamer** (optional `gstreamer` feature): fragmented MP4 or WebM
//! - **Motion-JPEG**: in-process fallback, always available
//!
//! # Modules
//!
//! - [`encoders`]: Encoder sessions, backends and output formats
//! - [`filters`]: Filter preset catalog and the CPU filter pass
//! - [`renderer`]: Orientation and filter passes
//! - [`surface`]: Render targets, including the cross-thread recording surface

pub mod encoders;
pub mod filters;
pub mod renderer;
pub mod surface;

// Re-export commonly used types
pub use filters::{FilterSelection, FilterSpec};
pub use renderer::render_frame;
pub use surface::{RenderSurface, SharedSurface};
