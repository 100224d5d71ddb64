// SPDX-License-Identifier: GPL-3.0-only

//! Scripted collaborators shared by the integration tests

#![allow(dead_code)]

use honey_snap::backends::camera::{
    AudioTrack, CameraDevice, CameraFrame, CaptureDevice, FrameSender, MediaStream, StreamRequest,
    VideoTrack, frame_channel,
};
use honey_snap::errors::{CameraError, RecordingError};
use honey_snap::media::encoders::{
    EncoderBackend, EncoderEvent, EncoderSession, EncoderState, EncoderStateHandle, OutputFormat,
    SurfaceStream,
};
use image::{Rgba, RgbaImage};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Device whose frames are pushed by the test
///
/// Every track it hands out is recorded so tests can check they were stopped.
#[derive(Clone, Default)]
pub struct ScriptedDevice {
    pub sender: Arc<Mutex<Option<FrameSender>>>,
    pub video_ended: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
    pub audio: Arc<Mutex<Vec<AudioTrack>>>,
    pub unavailable: bool,
}

impl ScriptedDevice {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Queue a frame; false if no stream is open
    pub fn push(&self, image: RgbaImage) -> bool {
        let sender = self.sender.lock().unwrap();
        match sender.as_ref() {
            Some(tx) => tx.try_send(CameraFrame::from_image(image)).is_ok(),
            None => false,
        }
    }

    /// Whether any track handed out is still live
    pub fn any_track_live(&self) -> bool {
        let video_live = self
            .video_ended
            .lock()
            .unwrap()
            .iter()
            .any(|ended| !ended.load(std::sync::atomic::Ordering::SeqCst));
        let audio_live = self.audio.lock().unwrap().iter().any(AudioTrack::is_live);
        video_live || audio_live
    }
}

impl CaptureDevice for ScriptedDevice {
    fn describe(&self) -> CameraDevice {
        CameraDevice {
            name: "Scripted Camera".into(),
            path: "scripted".into(),
            driver: "test".into(),
        }
    }

    fn request(&mut self, request: StreamRequest) -> Result<MediaStream, CameraError> {
        if self.unavailable {
            return Err(CameraError::DeviceUnavailable("permission denied".into()));
        }
        let (tx, rx) = frame_channel();
        *self.sender.lock().unwrap() = Some(tx);

        let ended = Arc::new(AtomicBool::new(false));
        self.video_ended.lock().unwrap().push(Arc::clone(&ended));

        let mut audio = Vec::new();
        if request.audio {
            let track = AudioTrack::new("Scripted Microphone", None);
            self.audio.lock().unwrap().push(track.clone());
            audio.push(track);
        }
        Ok(MediaStream::new(VideoTrack::new("Scripted Camera", rx, ended), audio))
    }
}

/// Encoder that emits the top-left pixel of every newly composited frame
/// as one 4-byte chunk
#[derive(Clone)]
pub struct PixelEncoder {
    pub formats: Vec<OutputFormat>,
    pub stream: Arc<Mutex<Option<SurfaceStream>>>,
}

impl PixelEncoder {
    pub fn new(formats: &[OutputFormat]) -> Self {
        Self {
            formats: formats.to_vec(),
            stream: Arc::new(Mutex::new(None)),
        }
    }

    /// Surface handed to the last session
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        self.stream
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.surface.dimensions())
    }

    /// Latest composited pixels of the last session
    pub fn composited(&self) -> Option<RgbaImage> {
        let stream = self.stream.lock().unwrap();
        stream
            .as_ref()
            .and_then(|s| s.surface.sample_newer(0))
            .map(|(_, image)| image)
    }
}

struct PixelSession {
    stream: SurfaceStream,
    format: OutputFormat,
    state: EncoderStateHandle,
    seen: u64,
    finished: bool,
}

impl EncoderSession for PixelSession {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn start(&mut self) -> Result<(), RecordingError> {
        self.state.set(EncoderState::Recording);
        Ok(())
    }

    fn stop(&mut self) {
        self.state
            .transition(EncoderState::Recording, EncoderState::Stopping);
    }

    fn state_handle(&self) -> EncoderStateHandle {
        self.state.clone()
    }

    fn try_next_event(&mut self) -> Option<EncoderEvent> {
        if self.finished {
            return None;
        }
        if let Some((generation, image)) = self.stream.surface.sample_newer(self.seen) {
            self.seen = generation;
            return Some(EncoderEvent::Data(image.get_pixel(0, 0).0.to_vec()));
        }
        if self.state.get() == EncoderState::Stopping {
            self.finished = true;
            self.state.set(EncoderState::Inactive);
            return Some(EncoderEvent::Stopped);
        }
        None
    }
}

impl EncoderBackend for PixelEncoder {
    fn name(&self) -> &str {
        "pixel"
    }

    fn supported_formats(&self) -> Vec<OutputFormat> {
        self.formats.clone()
    }

    fn create_session(
        &self,
        stream: SurfaceStream,
        format: OutputFormat,
    ) -> Result<Box<dyn EncoderSession>, RecordingError> {
        if !self.formats.contains(&format) {
            return Err(RecordingError::UnsupportedOutputFormat(format.to_string()));
        }
        *self.stream.lock().unwrap() = Some(stream.clone());
        Ok(Box::new(PixelSession {
            stream,
            format,
            state: EncoderStateHandle::new(),
            seen: 0,
            finished: false,
        }))
    }
}

pub fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(color))
}

/// Left half red, right half blue, with a vertical gradient
pub fn asymmetric(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let shade = (y * 255 / height.max(1)) as u8;
        if x < width / 2 {
            Rgba([230, shade, 20, 255])
        } else {
            Rgba([20, shade, 230, 255])
        }
    })
}
