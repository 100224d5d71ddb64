// SPDX-License-Identifier: GPL-3.0-only

//! Capture source and device abstraction
//!
//! A [`CaptureDevice`] turns a [`StreamRequest`] into a [`MediaStream`] of
//! stoppable tracks. [`CaptureSource`] owns the one open stream, pulls frames
//! off its video track and publishes the latest one through a
//! [`SourceHandle`] that every render loop reads from.
//!
//! Readiness is observed, not assumed: a source is "ready" only once a frame
//! has actually arrived after `open()`.

pub mod format_converters;
pub mod frame_loop;
pub mod types;
pub mod v4l2;
pub mod virtual_source;

pub use frame_loop::{CaptureThread, FrameLoop, FrameTask, FrameTick, LoopAction};
pub use types::*;

use crate::errors::CameraError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

/// Device capture collaborator
pub trait CaptureDevice: Send {
    /// Identity of the device for logs and listings
    fn describe(&self) -> CameraDevice;

    /// Start streaming
    ///
    /// Fails with [`CameraError::DeviceUnavailable`] when the device does not
    /// exist or cannot be opened. Callers report this; they do not retry.
    fn request(&mut self, request: StreamRequest) -> Result<MediaStream, CameraError>;
}

/// Live video track fed by a device worker
pub struct VideoTrack {
    label: String,
    frames: FrameReceiver,
    ended: Arc<AtomicBool>,
    worker: Option<CaptureThread>,
}

impl VideoTrack {
    /// Track reading from `frames`; raising `ended` signals the producer to stop
    pub fn new(label: impl Into<String>, frames: FrameReceiver, ended: Arc<AtomicBool>) -> Self {
        Self {
            label: label.into(),
            frames,
            ended,
            worker: None,
        }
    }

    /// Attach the worker thread producing this track's frames
    pub fn with_worker(mut self, worker: CaptureThread) -> Self {
        self.worker = Some(worker);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        !self.ended.load(Ordering::SeqCst)
    }

    /// Stop the track and join its worker
    pub fn stop(&mut self) {
        self.ended.store(true, Ordering::SeqCst);
        self.frames.close();
        if let Some(mut worker) = self.worker.take() {
            worker.stop();
        }
    }

    /// Drain pending frames, keeping only the newest
    fn drain_latest(&mut self) -> Result<Option<CameraFrame>, TryRecvError> {
        let mut latest = None;
        loop {
            match self.frames.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) => return Ok(latest),
                Err(TryRecvError::Disconnected) => {
                    return if latest.is_some() {
                        Ok(latest)
                    } else {
                        Err(TryRecvError::Disconnected)
                    };
                }
            }
        }
    }
}

/// Audio track handle
///
/// Audio is never processed; encoders that can record sound attach the
/// track's device directly to their output.
#[derive(Debug, Clone)]
pub struct AudioTrack {
    label: String,
    /// Device hint for encoders that open the microphone themselves
    device: Option<String>,
    ended: Arc<AtomicBool>,
}

impl AudioTrack {
    pub fn new(label: impl Into<String>, device: Option<String>) -> Self {
        Self {
            label: label.into(),
            device,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn is_live(&self) -> bool {
        !self.ended.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}

/// A device stream: one video track and any number of audio tracks
pub struct MediaStream {
    video: VideoTrack,
    audio: Vec<AudioTrack>,
}

impl MediaStream {
    pub fn new(video: VideoTrack, audio: Vec<AudioTrack>) -> Self {
        Self { video, audio }
    }

    pub fn video(&self) -> &VideoTrack {
        &self.video
    }

    pub fn audio(&self) -> &[AudioTrack] {
        &self.audio
    }

    /// Stop every track
    pub fn stop(&mut self) {
        self.video.stop();
        for track in &self.audio {
            track.stop();
        }
    }

    /// Whether any track is still live
    pub fn is_active(&self) -> bool {
        self.video.is_live() || self.audio.iter().any(AudioTrack::is_live)
    }
}

#[derive(Default)]
struct SourceState {
    open: AtomicBool,
    latest: Mutex<Option<Arc<CameraFrame>>>,
    audio: Mutex<Vec<AudioTrack>>,
}

/// Read-only view of the open capture source
///
/// Cloned into every consumer. Frame reads never block on the device.
#[derive(Clone, Default)]
pub struct SourceHandle {
    state: Arc<SourceState>,
}

impl SourceHandle {
    pub fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst)
    }

    /// Open and at least one frame decoded
    pub fn is_ready(&self) -> bool {
        self.is_open() && self.current_frame().is_some()
    }

    /// Latest decoded frame, if any
    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        if !self.is_open() {
            return None;
        }
        self.state.latest.lock().ok()?.clone()
    }

    /// Source resolution, known once the first frame has decoded
    pub fn intrinsic_size(&self) -> Option<(u32, u32)> {
        self.current_frame().map(|f| (f.width, f.height))
    }

    /// Audio tracks of the open stream
    pub fn audio_tracks(&self) -> Vec<AudioTrack> {
        self.state
            .audio
            .lock()
            .map(|tracks| tracks.clone())
            .unwrap_or_default()
    }

    fn publish(&self, frame: CameraFrame) {
        if let Ok(mut latest) = self.state.latest.lock() {
            *latest = Some(Arc::new(frame));
        }
    }

    fn reset(&self, open: bool, audio: Vec<AudioTrack>) {
        self.state.open.store(open, Ordering::SeqCst);
        if let Ok(mut latest) = self.state.latest.lock() {
            *latest = None;
        }
        if let Ok(mut tracks) = self.state.audio.lock() {
            *tracks = audio;
        }
    }
}

/// Owner of the live camera stream
pub struct CaptureSource {
    device: Box<dyn CaptureDevice>,
    request: StreamRequest,
    stream: Option<MediaStream>,
    handle: SourceHandle,
    frames_received: u64,
}

impl CaptureSource {
    pub fn new(device: Box<dyn CaptureDevice>, request: StreamRequest) -> Self {
        Self {
            device,
            request,
            stream: None,
            handle: SourceHandle::default(),
            frames_received: 0,
        }
    }

    /// Handle for consumers
    pub fn handle(&self) -> SourceHandle {
        self.handle.clone()
    }

    pub fn device(&self) -> CameraDevice {
        self.device.describe()
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    /// Request the stream from the device
    ///
    /// Opening an already open source does nothing.
    pub fn open(&mut self) -> Result<(), CameraError> {
        if self.stream.is_some() {
            debug!("Capture source already open");
            return Ok(());
        }

        let device = self.device.describe();
        let stream = match self.device.request(self.request) {
            Ok(stream) => stream,
            Err(e) => {
                warn!(device = %device.path, error = %e, "Failed to open capture device");
                return Err(e);
            }
        };

        info!(
            device = %device.path,
            name = %device.name,
            video = %stream.video().label(),
            audio_tracks = stream.audio().len(),
            "Capture source opened"
        );

        self.handle.reset(true, stream.audio().to_vec());
        self.stream = Some(stream);
        self.frames_received = 0;
        Ok(())
    }

    /// Stop every track; safe to call repeatedly
    pub fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            info!(frames = self.frames_received, "Capture source closed");
        }
        self.handle.reset(false, Vec::new());
    }

    /// Move the newest pending frame to the shared handle
    ///
    /// Returns true when a new frame was published. A video track whose
    /// producer went away closes the source.
    pub fn poll(&mut self) -> bool {
        let Some(stream) = self.stream.as_mut() else {
            return false;
        };

        match stream.video.drain_latest() {
            Ok(Some(frame)) => {
                if self.frames_received == 0 {
                    info!(
                        width = frame.width,
                        height = frame.height,
                        "First frame decoded"
                    );
                }
                self.frames_received += 1;
                self.handle.publish(frame);
                true
            }
            Ok(None) => false,
            Err(_) => {
                warn!("Video track ended, closing capture source");
                self.close();
                false
            }
        }
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        self.close();
    }
}

/// Build a device from a spec string
///
/// - `test-pattern`: animated color bars
/// - `image:<path>`: a still image looped as a camera
/// - anything else: a V4L2 device node such as `/dev/video0`
pub fn open_device(spec: &str) -> Result<Box<dyn CaptureDevice>, CameraError> {
    if spec == virtual_source::TEST_PATTERN_SPEC {
        return Ok(Box::new(virtual_source::VirtualDevice::test_pattern()));
    }
    if let Some(path) = spec.strip_prefix(virtual_source::IMAGE_SPEC_PREFIX) {
        return Ok(Box::new(virtual_source::VirtualDevice::image(path)?));
    }
    Ok(Box::new(v4l2::V4l2Device::new(spec)))
}

/// Hardware devices followed by the always-available virtual sources
pub fn enumerate_devices() -> Vec<CameraDevice> {
    let mut devices = v4l2::enumerate();
    devices.push(virtual_source::VirtualDevice::test_pattern().describe());
    devices
}

/// First hardware camera, if any
pub fn default_device_spec() -> Option<String> {
    v4l2::enumerate().into_iter().next().map(|d| d.path)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ChannelDevice {
        sender: Option<FrameSender>,
        fail: bool,
    }

    impl CaptureDevice for ChannelDevice {
        fn describe(&self) -> CameraDevice {
            CameraDevice {
                name: "channel".into(),
                path: "channel".into(),
                driver: "test".into(),
            }
        }

        fn request(&mut self, request: StreamRequest) -> Result<MediaStream, CameraError> {
            if self.fail {
                return Err(CameraError::DeviceUnavailable("denied".into()));
            }
            let (tx, rx) = frame_channel();
            self.sender = Some(tx);
            let audio = if request.audio {
                vec![AudioTrack::new("mic", None)]
            } else {
                Vec::new()
            };
            Ok(MediaStream::new(
                VideoTrack::new("cam", rx, Arc::new(AtomicBool::new(false))),
                audio,
            ))
        }
    }

    fn frame() -> CameraFrame {
        CameraFrame::from_rgba(2, 2, vec![255; 16])
    }

    #[test]
    fn test_readiness_waits_for_first_frame() {
        let mut source = CaptureSource::new(
            Box::new(ChannelDevice {
                sender: None,
                fail: false,
            }),
            StreamRequest::default(),
        );
        let handle = source.handle();
        source.open().unwrap();
        assert!(handle.is_open());
        assert!(!handle.is_ready());
        assert_eq!(handle.audio_tracks().len(), 1);
        assert!(!source.poll());
        assert!(handle.intrinsic_size().is_none());
    }

    #[test]
    fn test_device_failure_reported() {
        let mut source = CaptureSource::new(
            Box::new(ChannelDevice {
                sender: None,
                fail: true,
            }),
            StreamRequest::default(),
        );
        assert!(matches!(
            source.open(),
            Err(CameraError::DeviceUnavailable(_))
        ));
        assert!(!source.handle().is_open());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut device = ChannelDevice {
            sender: None,
            fail: false,
        };
        let mut stream = device.request(StreamRequest::default()).unwrap();
        let sender = device.sender.take().unwrap();
        sender.try_send(frame()).unwrap();
        stream.stop();
        stream.stop();
        assert!(!stream.is_active());
    }

    #[test]
    fn test_lost_producer_closes_source() {
        struct Oneshot;
        impl CaptureDevice for Oneshot {
            fn describe(&self) -> CameraDevice {
                CameraDevice {
                    name: "oneshot".into(),
                    path: "oneshot".into(),
                    driver: "test".into(),
                }
            }
            fn request(&mut self, _: StreamRequest) -> Result<MediaStream, CameraError> {
                let (tx, rx) = frame_channel();
                tx.try_send(frame()).unwrap();
                drop(tx);
                Ok(MediaStream::new(
                    VideoTrack::new("cam", rx, Arc::new(AtomicBool::new(false))),
                    Vec::new(),
                ))
            }
        }

        let mut source = CaptureSource::new(Box::new(Oneshot), StreamRequest::default());
        let handle = source.handle();
        source.open().unwrap();
        assert!(source.poll());
        assert_eq!(handle.intrinsic_size(), Some((2, 2)));
        assert!(!source.poll());
        assert!(!handle.is_open());
        assert!(handle.current_frame().is_none());
    }
}
