// SPDX-License-Identifier: GPL-3.0-only

//! Consumers of the live camera frame
//!
//! Three pipelines read the same [`SourceHandle`](crate::backends::camera::SourceHandle)
//! and render through the same two-pass renderer.
//!
//! # Pipeline Architecture
//!
//! ```text
//!                       ┌───────────────────┐     ┌────────────────────┐
//!                  ┌──▶ │   Preview Bank    │ ──▶ │ 7 x 150x100 thumbs │
//!                  │    │ (FrameLoop task)  │     │                    │
//!                  │    └───────────────────┘     └────────────────────┘
//! ┌──────────────┐ │    ┌───────────────────┐     ┌────────────────────┐
//! │ Camera Frame │ ├──▶ │  Photo Pipeline   │ ──▶ │ StillImage / PNG   │
//! │  (RGBA)      │ │    │ (countdown timer) │     │                    │
//! └──────────────┘ │    └───────────────────┘     └────────────────────┘
//!                  │    ┌───────────────────┐     ┌────────────────────┐
//!                  └──▶ │  Video Pipeline   │ ──▶ │ VideoArtifact      │
//!                       │ (FrameLoop task)  │     │ (encoder chunks)   │
//!                       └───────────────────┘     └────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`preview`]: live filter thumbnails
//! - [`photo`]: countdown capture, display filter changes and export
//! - [`video`]: filtered recording with encoder format selection

pub mod photo;
pub mod preview;
pub mod video;
