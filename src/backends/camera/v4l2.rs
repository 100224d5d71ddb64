// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture device
//!
//! Opens a `/dev/videoN` node, negotiates a format we can convert
//! (MJPEG, YUYV or UYVY), and converts every captured buffer to RGBA on a
//! worker thread. V4L2 nodes carry no audio, so streams from this device are
//! video-only.

use super::format_converters::{mjpeg_to_rgba, uyvy_to_rgba, yuyv_to_rgba};
use super::frame_loop::CaptureThread;
use super::types::{CameraDevice, CameraFormat, CameraFrame, FrameSender, StreamRequest, frame_channel};
use super::{CaptureDevice, MediaStream, VideoTrack};
use crate::errors::CameraError;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::{Format, FourCC};

/// Formats we can convert, in negotiation order
const SUPPORTED_FOURCCS: [&[u8; 4]; 3] = [b"MJPG", b"YUYV", b"UYVY"];

/// Default requested capture size
const DEFAULT_WIDTH: u32 = 1280;
const DEFAULT_HEIGHT: u32 = 720;

/// A V4L2 camera node
pub struct V4l2Device {
    path: String,
    width: u32,
    height: u32,
}

impl V4l2Device {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }

    /// Request a different capture size; the driver picks the closest it has
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

impl CaptureDevice for V4l2Device {
    fn describe(&self) -> CameraDevice {
        describe_node(&self.path).unwrap_or_else(|| CameraDevice {
            name: self.path.clone(),
            path: self.path.clone(),
            driver: "v4l2".to_string(),
        })
    }

    fn request(&mut self, request: StreamRequest) -> Result<MediaStream, CameraError> {
        if !request.video {
            return Err(CameraError::InvalidFormat(
                "V4L2 devices only provide video".to_string(),
            ));
        }

        let dev = Device::with_path(&self.path)
            .map_err(|e| CameraError::DeviceUnavailable(format!("{}: {}", self.path, e)))?;
        let format = negotiate_format(&dev, self.width, self.height)?;

        info!(path = %self.path, format = %format, "V4L2 format configured");

        if request.audio {
            debug!(path = %self.path, "V4L2 node has no audio; stream is video-only");
        }

        let (sender, receiver) = frame_channel();
        let ended = Arc::new(AtomicBool::new(false));
        let label = self.describe().name;
        let worker_format = format.clone();
        let worker = CaptureThread::spawn(
            &format!("v4l2-capture {}", self.path),
            Arc::clone(&ended),
            move |stop| capture_loop(dev, worker_format, stop, sender),
        );

        Ok(MediaStream::new(
            VideoTrack::new(label, receiver, ended).with_worker(worker),
            Vec::new(),
        ))
    }
}

/// Try each convertible format until the driver accepts one
fn negotiate_format(dev: &Device, width: u32, height: u32) -> Result<CameraFormat, CameraError> {
    for fourcc in SUPPORTED_FOURCCS {
        let requested = Format::new(width, height, FourCC::new(fourcc));
        match dev.set_format(&requested) {
            Ok(actual) if SUPPORTED_FOURCCS.contains(&&actual.fourcc.repr) => {
                return Ok(CameraFormat {
                    width: actual.width,
                    height: actual.height,
                    fourcc: String::from_utf8_lossy(&actual.fourcc.repr).to_string(),
                });
            }
            Ok(actual) => {
                debug!(requested = ?requested.fourcc, got = ?actual.fourcc, "Driver substituted format");
            }
            Err(e) => {
                debug!(fourcc = ?requested.fourcc, error = %e, "Format rejected");
            }
        }
    }

    Err(CameraError::InvalidFormat(
        "device offers none of MJPG, YUYV, UYVY".to_string(),
    ))
}

fn capture_loop(
    dev: Device,
    format: CameraFormat,
    stop: Arc<AtomicBool>,
    sender: FrameSender,
) -> Result<(), String> {
    let mut stream = Stream::with_buffers(&dev, Type::VideoCapture, 4)
        .map_err(|e| format!("Failed to create stream: {}", e))?;

    let mut dropped = 0u64;

    while !stop.load(Ordering::SeqCst) {
        let (buf, meta) = match stream.next() {
            Ok(frame) => frame,
            Err(e) => {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                return Err(format!("Capture failed: {}", e));
            }
        };

        let used = (meta.bytesused as usize).min(buf.len());
        let data = &buf[..used];

        let frame = match format.fourcc.as_str() {
            "MJPG" => match mjpeg_to_rgba(data) {
                Ok((w, h, rgba)) => CameraFrame::from_rgba(w, h, rgba),
                Err(e) => {
                    debug!(error = %e, "Skipping corrupt MJPEG frame");
                    continue;
                }
            },
            "UYVY" => CameraFrame::from_rgba(
                format.width,
                format.height,
                uyvy_to_rgba(data, format.width, format.height),
            ),
            _ => CameraFrame::from_rgba(
                format.width,
                format.height,
                yuyv_to_rgba(data, format.width, format.height),
            ),
        };

        match sender.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                dropped += 1;
                if dropped % 30 == 1 {
                    debug!(dropped, "Consumer behind, dropping frames");
                }
            }
            Err(TrySendError::Closed(_)) => break,
        }
    }

    Ok(())
}

fn describe_node(path: &str) -> Option<CameraDevice> {
    let dev = Device::with_path(path).ok()?;
    let caps = dev.query_caps().ok()?;
    if !caps
        .capabilities
        .contains(v4l::capability::Flags::VIDEO_CAPTURE)
    {
        return None;
    }
    Some(CameraDevice {
        name: caps.card,
        path: path.to_string(),
        driver: caps.driver,
    })
}

/// Video capture nodes under /dev, in node order
pub fn enumerate() -> Vec<CameraDevice> {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Vec::new();
    };

    let mut nodes: Vec<(u32, String)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let index = name.to_str()?.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, entry.path().to_string_lossy().to_string()))
        })
        .collect();
    nodes.sort();

    let devices: Vec<CameraDevice> = nodes
        .iter()
        .filter_map(|(_, path)| describe_node(path))
        .collect();

    if devices.is_empty() && Path::new("/dev").exists() {
        warn!("No V4L2 capture devices found");
    }
    devices
}
