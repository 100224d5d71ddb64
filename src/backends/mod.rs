// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for capture devices
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │            Pipelines / App Layer             │
//! └────────────────────┬────────────────────────┘
//!                      │ SourceHandle
//! ┌────────────────────┴────────────────────────┐
//! │               CaptureSource                  │
//! │  ┌─────────────┐    ┌──────────────────┐   │
//! │  │    V4L2     │    │     Virtual      │   │
//! │  │  /dev/video │    │ test-pattern/img │   │
//! │  └─────────────┘    └──────────────────┘   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`camera`]: Device abstraction, the capture source and frame scheduling

pub mod camera;
