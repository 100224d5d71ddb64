// SPDX-License-Identifier: GPL-3.0-only

//! Countdown photo capture
//!
//! ```text
//! Idle ──request──▶ CountingDown(3) ─1s─▶ (2) ─1s─▶ (1) ─1s─▶ Flash ──▶ Captured
//!                        │                                     │
//!                      cancel ──▶ Idle               StillImage rendered
//! ```
//!
//! The countdown runs on its own one-second clock, independent of the display
//! frame loop; the host calls [`CapturePipeline::tick`] whenever its timer
//! fires. The frame is rendered on the transition into `Flash`, at the
//! source's full resolution, with whatever preview filter is selected at that
//! instant.

use super::StillImage;
use crate::backends::camera::{SharedOrientation, SourceHandle};
use crate::constants::timing;
use crate::errors::PhotoError;
use crate::flash::FlashPulse;
use crate::media::filters::FilterSelection;
use crate::media::renderer::render_frame;
use crate::media::surface::RenderSurface;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pending countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownState {
    /// Ticks left before capture
    pub remaining: u32,
    /// When the next tick is due
    pub next_tick_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    CountingDown(CountdownState),
    /// Frame captured, flash still visible
    Flash,
    Captured,
}

/// Outcome of a take-photo request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureRequest {
    Started { remaining: u32 },
    /// A capture is already under way
    Ignored,
}

#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// Countdown moved on; the value is the new number to display
    CountdownTick(u32),
    Captured(StillImage),
    /// Countdown completed but nothing could be captured
    Failed(PhotoError),
}

pub struct CapturePipeline {
    source: SourceHandle,
    orientation: SharedOrientation,
    filter: FilterSelection,
    countdown_start: u32,
    tick_interval: Duration,
    state: CaptureState,
    flash: FlashPulse,
    surface: RenderSurface,
    scratch: RenderSurface,
}

impl CapturePipeline {
    pub fn new(source: SourceHandle, orientation: SharedOrientation, filter: FilterSelection) -> Self {
        Self {
            source,
            orientation,
            filter,
            countdown_start: timing::COUNTDOWN_START,
            tick_interval: timing::COUNTDOWN_TICK,
            state: CaptureState::Idle,
            flash: FlashPulse::default(),
            surface: RenderSurface::new(0, 0),
            scratch: RenderSurface::new(0, 0),
        }
    }

    /// Override countdown length, tick interval and flash duration
    pub fn with_timing(mut self, countdown_start: u32, tick_interval: Duration, flash: Duration) -> Self {
        self.countdown_start = countdown_start.max(1);
        self.tick_interval = tick_interval;
        self.flash = FlashPulse::new(flash);
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Number currently shown by the countdown, if one is running
    pub fn countdown(&self) -> Option<u32> {
        match self.state {
            CaptureState::CountingDown(countdown) => Some(countdown.remaining),
            _ => None,
        }
    }

    /// Whether the flash overlay is visible at `now`
    pub fn flash_active(&self, now: Instant) -> bool {
        self.flash.is_active(now)
    }

    /// Countdown or flash in progress
    pub fn is_busy(&self) -> bool {
        matches!(self.state, CaptureState::CountingDown(_) | CaptureState::Flash)
    }

    /// Take a photo after the countdown
    ///
    /// Requests made while a capture is under way are ignored. Without an
    /// open source the request is rejected and nothing changes.
    pub fn request(&mut self, now: Instant) -> Result<CaptureRequest, PhotoError> {
        if self.is_busy() {
            debug!("Capture already in progress, ignoring request");
            return Ok(CaptureRequest::Ignored);
        }
        if !self.source.is_open() {
            return Err(PhotoError::NoActiveSource);
        }

        info!(countdown = self.countdown_start, "Starting photo countdown");
        self.state = CaptureState::CountingDown(CountdownState {
            remaining: self.countdown_start,
            next_tick_at: now + self.tick_interval,
        });
        Ok(CaptureRequest::Started {
            remaining: self.countdown_start,
        })
    }

    /// Abort a running countdown; returns true if one was cancelled
    pub fn cancel(&mut self) -> bool {
        if let CaptureState::CountingDown(countdown) = self.state {
            info!(remaining = countdown.remaining, "Photo countdown cancelled");
            self.state = CaptureState::Idle;
            return true;
        }
        false
    }

    /// Advance the countdown and the flash to `now`
    pub fn tick(&mut self, now: Instant) -> Vec<CaptureEvent> {
        let mut events = Vec::new();

        if let CaptureState::CountingDown(mut countdown) = self.state {
            while now >= countdown.next_tick_at && countdown.remaining > 0 {
                countdown.remaining -= 1;
                countdown.next_tick_at += self.tick_interval;
                if countdown.remaining > 0 {
                    events.push(CaptureEvent::CountdownTick(countdown.remaining));
                }
            }

            if countdown.remaining == 0 {
                events.push(self.capture(now));
            } else {
                self.state = CaptureState::CountingDown(countdown);
            }
        }

        if self.state == CaptureState::Flash && self.flash.expire(now) {
            self.state = CaptureState::Captured;
        }

        events
    }

    /// Render the current frame with the live preview filter
    fn capture(&mut self, now: Instant) -> CaptureEvent {
        let Some(frame) = self.source.current_frame() else {
            warn!("No frame available when countdown finished");
            self.state = CaptureState::Idle;
            return CaptureEvent::Failed(PhotoError::NoFrameAvailable);
        };

        let filter = self.filter.current();
        let orientation = self.orientation.get();

        self.state = CaptureState::Flash;
        self.flash.trigger(now);

        self.surface.ensure_size(frame.width, frame.height);
        if !render_frame(
            Some(&*frame),
            orientation,
            filter,
            &mut self.scratch,
            &mut self.surface,
        ) {
            self.state = CaptureState::Idle;
            self.flash.clear();
            return CaptureEvent::Failed(PhotoError::NoFrameAvailable);
        }

        info!(
            width = frame.width,
            height = frame.height,
            filter = filter.id,
            mirrored = orientation.is_mirrored(),
            "Photo captured"
        );
        CaptureEvent::Captured(StillImage::new(
            self.surface.image().clone(),
            filter,
            orientation,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::{
        CameraDevice, CameraFrame, CaptureDevice, CaptureSource, MediaStream, Orientation,
        StreamRequest, VideoTrack, frame_channel,
    };
    use crate::errors::CameraError;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    /// Device whose stream carries one 4x2 frame, red on the left, then ends
    struct OneFrame;

    impl CaptureDevice for OneFrame {
        fn describe(&self) -> CameraDevice {
            CameraDevice {
                name: "one".into(),
                path: "one".into(),
                driver: "test".into(),
            }
        }

        fn request(&mut self, _: StreamRequest) -> Result<MediaStream, CameraError> {
            let (tx, rx) = frame_channel();
            let image = RgbaImage::from_fn(4, 2, |x, _| {
                if x < 2 {
                    Rgba([255, 0, 0, 255])
                } else {
                    Rgba([0, 255, 0, 255])
                }
            });
            tx.try_send(CameraFrame::from_image(image)).unwrap();
            Ok(MediaStream::new(
                VideoTrack::new("cam", rx, Arc::new(AtomicBool::new(false))),
                Vec::new(),
            ))
        }
    }

    fn open_source() -> CaptureSource {
        let mut source = CaptureSource::new(Box::new(OneFrame), StreamRequest::default());
        source.open().unwrap();
        source.poll();
        source
    }

    fn pipeline(source: &CaptureSource, filter: &FilterSelection) -> CapturePipeline {
        CapturePipeline::new(
            source.handle(),
            SharedOrientation::new(Orientation::Natural),
            filter.clone(),
        )
    }

    #[test]
    fn test_rejected_without_source() {
        let mut capture = CapturePipeline::new(
            SourceHandle::default(),
            SharedOrientation::default(),
            FilterSelection::default(),
        );
        assert_eq!(
            capture.request(Instant::now()),
            Err(PhotoError::NoActiveSource)
        );
        assert_eq!(capture.state(), CaptureState::Idle);
        assert!(capture.tick(Instant::now() + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_countdown_then_capture() {
        let source = open_source();
        let filter = FilterSelection::default();
        let mut capture = pipeline(&source, &filter);
        let t0 = Instant::now();

        assert_eq!(
            capture.request(t0),
            Ok(CaptureRequest::Started { remaining: 3 })
        );
        assert_eq!(capture.request(t0), Ok(CaptureRequest::Ignored));

        let events = capture.tick(t0 + Duration::from_millis(1000));
        assert!(matches!(events.as_slice(), [CaptureEvent::CountdownTick(2)]));
        assert_eq!(capture.countdown(), Some(2));

        let events = capture.tick(t0 + Duration::from_millis(2000));
        assert!(matches!(events.as_slice(), [CaptureEvent::CountdownTick(1)]));

        // Selected just before the last tick: this is what gets baked in
        filter.select("bw");
        let t3 = t0 + Duration::from_millis(3000);
        let mut events = capture.tick(t3);
        assert_eq!(events.len(), 1);
        let Some(CaptureEvent::Captured(still)) = events.pop() else {
            panic!("expected a capture");
        };
        assert_eq!(still.baked_filter().id, "bw");
        assert_eq!((still.width(), still.height()), (4, 2));
        let p = still.pixels().get_pixel(0, 0);
        assert_eq!(p[0], p[1]);

        assert_eq!(capture.state(), CaptureState::Flash);
        assert!(capture.flash_active(t3));
        assert_eq!(capture.request(t3), Ok(CaptureRequest::Ignored));

        assert!(capture.tick(t3 + Duration::from_millis(250)).is_empty());
        assert_eq!(capture.state(), CaptureState::Captured);
        assert!(!capture.flash_active(t3 + Duration::from_millis(250)));

        assert!(matches!(
            capture.request(t3 + Duration::from_secs(1)),
            Ok(CaptureRequest::Started { .. })
        ));
    }

    #[test]
    fn test_request_during_flash_is_ignored() {
        let source = open_source();
        let mut capture = pipeline(&source, &FilterSelection::default());
        let t0 = Instant::now();
        capture.request(t0).unwrap();
        let t3 = t0 + Duration::from_secs(3);
        assert_eq!(capture.tick(t3).len(), 3);
        assert_eq!(capture.state(), CaptureState::Flash);

        let mid_flash = t3 + Duration::from_millis(100);
        assert_eq!(capture.request(mid_flash), Ok(CaptureRequest::Ignored));
        assert_eq!(capture.state(), CaptureState::Flash);
        assert_eq!(capture.countdown(), None);

        // Only the pulse ends; no second still comes out of it
        let events = capture.tick(t3 + Duration::from_millis(250));
        assert!(events.is_empty());
        assert_eq!(capture.state(), CaptureState::Captured);
    }

    #[test]
    fn test_late_timer_catches_up() {
        let source = open_source();
        let mut capture = pipeline(&source, &FilterSelection::default());
        let t0 = Instant::now();
        capture.request(t0).unwrap();
        let events = capture.tick(t0 + Duration::from_secs(10));
        assert_eq!(events.len(), 3);
        assert!(matches!(events[2], CaptureEvent::Captured(_)));
    }

    #[test]
    fn test_cancel_discards_countdown() {
        let source = open_source();
        let mut capture = pipeline(&source, &FilterSelection::default());
        let t0 = Instant::now();
        capture.request(t0).unwrap();
        capture.tick(t0 + Duration::from_secs(1));
        assert!(capture.cancel());
        assert!(!capture.cancel());
        assert_eq!(capture.state(), CaptureState::Idle);
        assert!(capture.tick(t0 + Duration::from_secs(5)).is_empty());
    }

    #[test]
    fn test_lost_frame_returns_to_idle() {
        let mut source = open_source();
        let mut capture = pipeline(&source, &FilterSelection::default());
        let t0 = Instant::now();
        capture.request(t0).unwrap();
        source.close();
        let events = capture.tick(t0 + Duration::from_secs(3));
        assert!(matches!(
            events.as_slice(),
            [.., CaptureEvent::Failed(PhotoError::NoFrameAvailable)]
        ));
        assert_eq!(capture.state(), CaptureState::Idle);
    }
}
