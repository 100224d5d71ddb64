// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the application model

mod common;

use common::{PixelEncoder, ScriptedDevice, asymmetric, solid};
use honey_snap::app::{AppEvent, AppModel, Message};
use honey_snap::backends::camera::Orientation;
use honey_snap::errors::{AppError, CameraError, PhotoError, RecordingError};
use honey_snap::media::encoders::OutputFormat;
use honey_snap::pipelines::photo::CaptureState;
use honey_snap::pipelines::video::RecordingState;
use honey_snap::Config;
use std::time::{Duration, Instant};

fn model(device: &ScriptedDevice, encoder: &PixelEncoder) -> AppModel {
    AppModel::new(
        Config::default(),
        Box::new(device.clone()),
        Box::new(encoder.clone()),
    )
    .unwrap()
}

/// Open the camera and publish one frame
fn open_with_frame(app: &mut AppModel, device: &ScriptedDevice, frame: image::RgbaImage) {
    assert!(matches!(
        app.update(Message::OpenCamera).as_slice(),
        [AppEvent::CameraOpened]
    ));
    assert!(device.push(frame));
    app.update(Message::AnimationFrame(Instant::now()));
    assert!(app.is_camera_ready());
}

#[test]
fn test_photo_flow() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);
    open_with_frame(&mut app, &device, asymmetric(20, 10));
    assert!(app.preview().is_running());
    assert_eq!(app.orientation(), Orientation::Mirrored);

    app.update(Message::SelectPreviewFilter("sepia".into()));
    let t0 = Instant::now();
    assert!(matches!(
        app.update(Message::TakePhoto).as_slice(),
        [AppEvent::CountdownStarted(3)]
    ));
    assert!(app.update(Message::TakePhoto).is_empty());

    let second = Duration::from_millis(1100);
    assert!(matches!(
        app.update(Message::TimerTick(t0 + second)).as_slice(),
        [AppEvent::CountdownTick(2)]
    ));
    assert!(matches!(
        app.update(Message::TimerTick(t0 + second * 2)).as_slice(),
        [AppEvent::CountdownTick(1)]
    ));
    let t3 = t0 + second * 3;
    assert!(matches!(
        app.update(Message::TimerTick(t3)).as_slice(),
        [AppEvent::PhotoCaptured(_)]
    ));
    assert!(app.flash_active(t3));
    assert_eq!(app.capture_state(), CaptureState::Flash);

    app.update(Message::AnimationFrame(t3 + Duration::from_millis(250)));
    assert_eq!(app.capture_state(), CaptureState::Captured);

    let photo = app.photo().unwrap().clone();
    assert_eq!(photo.baked_filter().id, "sepia");
    assert_eq!((photo.width(), photo.height()), (20, 10));

    assert!(matches!(
        app.update(Message::SelectPhotoFilter("bw".into())).as_slice(),
        [AppEvent::PhotoFilterChanged("bw")]
    ));
    assert_eq!(app.photo().unwrap().pixels(), photo.pixels());

    let original = app.export_original_photo().unwrap();
    assert_eq!(original.suggested_filename(), "honey-snap-photo.png");
    let decoded = image::load_from_memory(&original.data).unwrap().to_rgba8();
    assert_eq!(&decoded, photo.pixels());

    let filtered = image::load_from_memory(&app.export_photo().unwrap().data)
        .unwrap()
        .to_rgba8();
    let p = filtered.get_pixel(3, 3);
    assert_eq!((p[0], p[0]), (p[1], p[2]));
}

#[test]
fn test_cancel_countdown() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);
    open_with_frame(&mut app, &device, solid(8, 8, [10, 20, 30, 255]));

    let t0 = Instant::now();
    app.update(Message::TakePhoto);
    assert!(matches!(
        app.update(Message::CancelPhoto).as_slice(),
        [AppEvent::CountdownCancelled]
    ));
    assert!(app.update(Message::CancelPhoto).is_empty());
    assert!(app.update(Message::TimerTick(t0 + Duration::from_secs(5))).is_empty());
    assert!(app.photo().is_none());
}

#[test]
fn test_requests_without_camera() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);

    assert!(matches!(
        app.update(Message::TakePhoto).as_slice(),
        [AppEvent::Error(AppError::Photo(PhotoError::NoActiveSource))]
    ));
    assert_eq!(app.countdown(), None);
    assert!(matches!(
        app.update(Message::StartRecording).as_slice(),
        [AppEvent::Error(AppError::Recording(RecordingError::NoActiveSource))]
    ));
    assert_eq!(app.recording_state(), RecordingState::Idle);
    assert!(app.update(Message::StopRecording).is_empty());
    assert!(app.update(Message::CloseCamera).is_empty());
}

#[test]
fn test_unavailable_camera() {
    let device = ScriptedDevice::unavailable();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);
    assert!(matches!(
        app.update(Message::OpenCamera).as_slice(),
        [AppEvent::Error(AppError::Camera(CameraError::DeviceUnavailable(_)))]
    ));
    assert!(!app.is_camera_open());
}

#[test]
fn test_recording_flow() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);
    let color = [120, 60, 30, 255];
    open_with_frame(&mut app, &device, solid(32, 24, color));

    assert!(matches!(
        app.update(Message::StartRecording).as_slice(),
        [AppEvent::RecordingStarted(OutputFormat::MOTION_JPEG)]
    ));
    assert!(matches!(
        app.update(Message::StartRecording).as_slice(),
        [AppEvent::Error(AppError::Recording(RecordingError::AlreadyRecording))]
    ));

    let t0 = Instant::now();
    for i in 0..10u32 {
        assert!(app
            .update(Message::AnimationFrame(t0 + Duration::from_millis(33) * i))
            .is_empty());
    }

    assert!(matches!(
        app.update(Message::StopRecording).as_slice(),
        [AppEvent::RecordingStopping]
    ));
    let events = app.update(Message::AnimationFrame(Instant::now()));
    let Some(AppEvent::RecordingFinished(artifact)) = events.into_iter().next() else {
        panic!("recording did not finish");
    };
    assert_eq!(artifact.chunk_count, 10);
    assert_eq!(&artifact.data[..4], &color);
    assert_eq!(app.recording_state(), RecordingState::Finalized);
    assert_eq!(app.take_video(), Some(artifact));
    assert_eq!(app.take_video(), None);
}

#[test]
fn test_recording_before_first_frame_uses_config_size() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let config = Config {
        fallback_recording_width: 320,
        fallback_recording_height: 240,
        ..Config::default()
    };
    let mut app = AppModel::new(config, Box::new(device.clone()), Box::new(encoder.clone())).unwrap();

    app.update(Message::OpenCamera);
    assert!(!app.is_camera_ready());
    assert!(matches!(
        app.update(Message::StartRecording).as_slice(),
        [AppEvent::RecordingStarted(_)]
    ));
    assert_eq!(encoder.surface_size(), Some((320, 240)));
}

#[test]
fn test_audio_is_opt_in() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);
    app.update(Message::OpenCamera);
    assert!(device.audio.lock().unwrap().is_empty());

    let device = ScriptedDevice::default();
    let config = Config {
        capture_audio: true,
        ..Config::default()
    };
    let mut app = AppModel::new(config, Box::new(device.clone()), Box::new(encoder)).unwrap();
    app.update(Message::OpenCamera);
    assert_eq!(device.audio.lock().unwrap().len(), 1);
}

#[test]
fn test_unknown_filters_rejected() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);

    assert!(matches!(
        app.update(Message::SelectPreviewFilter("polaroid".into())).as_slice(),
        [AppEvent::Error(AppError::UnknownFilter(_))]
    ));
    assert_eq!(app.preview_filter().id, "none");
    assert!(matches!(
        app.update(Message::SelectPhotoFilter("sepia".into())).as_slice(),
        [AppEvent::Error(AppError::Photo(PhotoError::NoFrameAvailable))]
    ));
}

#[test]
fn test_close_stops_preview() {
    let device = ScriptedDevice::default();
    let encoder = PixelEncoder::new(&[OutputFormat::MOTION_JPEG]);
    let mut app = model(&device, &encoder);
    open_with_frame(&mut app, &device, solid(8, 8, [0, 0, 0, 255]));

    assert!(matches!(
        app.update(Message::CloseCamera).as_slice(),
        [AppEvent::CameraClosed]
    ));
    assert!(app.update(Message::CloseCamera).is_empty());
    app.update(Message::AnimationFrame(Instant::now()));
    assert!(!app.preview().is_running());
    assert!(!device.any_track_live());

    app.update(Message::FlipCamera);
    assert_eq!(app.orientation(), Orientation::Natural);
}
