// SPDX-License-Identifier: GPL-3.0-only

//! In-process Motion-JPEG encoder
//!
//! Always available, so recording works on hosts without GStreamer plugins.
//! A worker thread samples the recording surface at the stream's frame rate,
//! JPEG-encodes every newly composited frame and emits the accumulated
//! frames as one data chunk per chunk interval. The output is a plain
//! concatenation of JPEG images, which most players accept as MJPEG.
//!
//! Audio tracks cannot be carried by this container and are ignored.

use super::{
    EncoderBackend, EncoderEvent, EncoderSession, EncoderSettings, EncoderState,
    EncoderStateHandle, OutputFormat, SurfaceStream,
};
use crate::backends::camera::CaptureThread;
use crate::errors::RecordingError;
use crate::media::surface::flatten_over_black;
use image::RgbaImage;
use image::codecs::jpeg::JpegEncoder;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

pub struct MjpegBackend {
    settings: EncoderSettings,
}

impl MjpegBackend {
    pub fn new(settings: EncoderSettings) -> Self {
        Self { settings }
    }
}

impl EncoderBackend for MjpegBackend {
    fn name(&self) -> &str {
        "mjpeg"
    }

    fn supported_formats(&self) -> Vec<OutputFormat> {
        vec![OutputFormat::MOTION_JPEG]
    }

    fn create_session(
        &self,
        stream: SurfaceStream,
        format: OutputFormat,
    ) -> Result<Box<dyn EncoderSession>, RecordingError> {
        if format != OutputFormat::MOTION_JPEG {
            return Err(RecordingError::UnsupportedOutputFormat(format.to_string()));
        }
        Ok(Box::new(MjpegSession::new(stream, self.settings)))
    }
}

pub struct MjpegSession {
    stream: SurfaceStream,
    settings: EncoderSettings,
    state: EncoderStateHandle,
    events: UnboundedReceiver<EncoderEvent>,
    sender: Option<UnboundedSender<EncoderEvent>>,
    worker: Option<CaptureThread>,
}

impl MjpegSession {
    pub fn new(stream: SurfaceStream, settings: EncoderSettings) -> Self {
        let (sender, events) = mpsc::unbounded_channel();
        Self {
            stream,
            settings,
            state: EncoderStateHandle::new(),
            events,
            sender: Some(sender),
            worker: None,
        }
    }
}

impl EncoderSession for MjpegSession {
    fn format(&self) -> OutputFormat {
        OutputFormat::MOTION_JPEG
    }

    fn start(&mut self) -> Result<(), RecordingError> {
        let sender = self
            .sender
            .take()
            .ok_or_else(|| RecordingError::StartFailed("session already started".into()))?;

        if !self.stream.audio.is_empty() {
            warn!(
                tracks = self.stream.audio.len(),
                "Motion-JPEG cannot carry audio; recording video only"
            );
        }

        let (width, height) = self.stream.surface.dimensions();
        info!(
            width,
            height,
            fps = self.stream.fps,
            quality = self.settings.quality.jpeg_quality(),
            "Starting Motion-JPEG encoder"
        );

        self.state.set(EncoderState::Recording);
        let worker = ChunkWorker {
            stream: self.stream.clone(),
            settings: self.settings,
            state: self.state.clone(),
            sender,
        };
        self.worker = Some(CaptureThread::spawn(
            "mjpeg-encoder",
            Arc::new(AtomicBool::new(false)),
            move |stop| {
                worker.run(&stop);
                Ok(())
            },
        ));
        Ok(())
    }

    fn stop(&mut self) {
        if !self
            .state
            .transition(EncoderState::Recording, EncoderState::Stopping)
        {
            debug!("Motion-JPEG encoder not recording, ignoring stop");
            return;
        }
        if let Some(worker) = &self.worker {
            worker.request_stop();
        }
    }

    fn state_handle(&self) -> EncoderStateHandle {
        self.state.clone()
    }

    fn try_next_event(&mut self) -> Option<EncoderEvent> {
        self.events.try_recv().ok()
    }
}

/// State moved onto the encoder thread
struct ChunkWorker {
    stream: SurfaceStream,
    settings: EncoderSettings,
    state: EncoderStateHandle,
    sender: UnboundedSender<EncoderEvent>,
}

impl ChunkWorker {
    fn run(self, stop: &AtomicBool) {
        let interval = self.stream.frame_interval();
        let quality = self.settings.quality.jpeg_quality();
        let mut seen = 0u64;
        let mut pending: Vec<u8> = Vec::new();
        let mut frames = 0u64;
        let mut last_flush = Instant::now();

        loop {
            let stopping = stop.load(Ordering::SeqCst);

            // One final sample after stop so the last composited frame lands
            if let Some((generation, image)) = self.stream.surface.sample_newer(seen) {
                seen = generation;
                match encode_jpeg(&image, quality) {
                    Ok(jpeg) => {
                        pending.extend_from_slice(&jpeg);
                        frames += 1;
                    }
                    Err(e) => {
                        let _ = self.sender.send(EncoderEvent::Error(e));
                    }
                }
            }

            if stopping {
                break;
            }

            if last_flush.elapsed() >= self.settings.chunk_interval {
                last_flush = Instant::now();
                self.flush(&mut pending);
            }

            std::thread::sleep(interval);
        }

        self.flush(&mut pending);
        debug!(frames, "Motion-JPEG encoder drained");
        self.state.set(EncoderState::Inactive);
        let _ = self.sender.send(EncoderEvent::Stopped);
    }

    /// Emit buffered frames as one chunk, even when nothing was buffered
    fn flush(&self, pending: &mut Vec<u8>) {
        let chunk = std::mem::take(pending);
        let _ = self.sender.send(EncoderEvent::Data(chunk));
    }
}

fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>, String> {
    let rgb = flatten_over_black(image);
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;
    Ok(buffer)
}
