// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for camera operations
//!
//! This module provides command-line functionality for:
//! - Listing capture devices and filter presets
//! - Saving filter previews
//! - Taking countdown photos
//! - Recording filtered videos

use honey_snap::app::{AppEvent, AppModel, Message};
use honey_snap::backends::camera::{default_device_spec, enumerate_devices, open_device};
use honey_snap::config::Config;
use honey_snap::constants::{file_names, timing};
use honey_snap::errors::{AppError, CameraError};
use honey_snap::media::filters;
use honey_snap::pipelines::photo::PhotoEncoder;
use honey_snap::storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;

/// How long to wait for the first decoded frame
const READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Options shared by every capture command
pub struct CommonOptions {
    pub config: Option<PathBuf>,
    pub device: Option<String>,
    pub natural: bool,
}

/// What to do during a recording
pub struct RecordPlan {
    pub duration: f64,
    pub filter: Option<String>,
    /// Preset and seconds-from-start of a live filter switch
    pub switch: Option<(String, f64)>,
    pub audio: bool,
}

/// List all capture devices
pub fn list_devices() -> Result<(), Box<dyn std::error::Error>> {
    let devices = enumerate_devices();

    println!("Available devices:");
    println!();
    for device in &devices {
        println!("  {} ({})", device.name, device.driver);
        println!("      {}", device.path);
    }
    println!();
    println!("Use --device <path> to pick one, or --device image:<file> for a still image.");
    Ok(())
}

/// List the filter catalog
pub fn list_filters() -> Result<(), Box<dyn std::error::Error>> {
    println!("Filter presets:");
    println!();
    for filter in filters::presets() {
        let css = filter.css();
        println!("  {:<8} {:<14} {}", filter.id, filter.name, css);
    }
    Ok(())
}

/// Render every preview thumbnail for a while and save them as PNG
pub fn save_previews(
    options: &CommonOptions,
    frames: u32,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(options)?;
    let output_dir = output.unwrap_or_else(|| storage::photo_dir(&config));
    let mut app = build_model(config, options)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        open_camera(&mut app).await?;

        let mut display = display_clock();
        while app.preview().frames_rendered() < u64::from(frames.max(1)) {
            display.tick().await;
            app.update(Message::AnimationFrame(Instant::now()));
            if !app.is_camera_open() {
                return Err(AppError::from(CameraError::NoActiveSource));
            }
        }
        Ok::<(), AppError>(())
    })?;

    let encoder = PhotoEncoder::new();
    for (filter, thumbnail) in app.preview().snapshots() {
        let encoded = encoder.encode(&thumbnail)?;
        let path = output_dir.join(format!("preview-{}.{}", filter.id, encoded.format.extension()));
        storage::save_bytes(&path, &encoded.data)?;
        println!("  {:<8} {}", filter.id, path.display());
    }
    app.update(Message::CloseCamera);
    Ok(())
}

/// Count down, capture and save a photo
pub fn take_photo(
    options: &CommonOptions,
    filter: Option<String>,
    photo_filter: Option<String>,
    original: bool,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(options)?;
    let photo_dir = storage::photo_dir(&config);
    let mut app = build_model(config, options)?;
    let stop = install_ctrlc()?;

    let rt = tokio::runtime::Runtime::new()?;
    let captured = rt.block_on(async {
        open_camera(&mut app).await?;
        if let Some(id) = filter.as_deref() {
            fail_on_error(app.update(Message::SelectPreviewFilter(id.to_string())))?;
        }

        fail_on_error(app.update(Message::TakePhoto))?;
        if let Some(remaining) = app.countdown() {
            println!("Smile! {}...", remaining);
        }

        let mut display = display_clock();
        let mut countdown = tokio::time::interval_at(
            tokio::time::Instant::now() + timing::COUNTDOWN_TICK,
            timing::COUNTDOWN_TICK,
        );

        loop {
            let events = tokio::select! {
                _ = display.tick() => app.update(Message::AnimationFrame(Instant::now())),
                _ = countdown.tick() => app.update(Message::TimerTick(Instant::now())),
            };

            for event in events {
                match event {
                    AppEvent::CountdownTick(remaining) => println!("{}...", remaining),
                    AppEvent::PhotoCaptured(_) => return Ok(true),
                    AppEvent::Error(e) => return Err(e),
                    _ => {}
                }
            }

            if stop.load(Ordering::SeqCst) {
                app.update(Message::CancelPhoto);
                return Ok(false);
            }
        }
    })?;

    if !captured {
        println!("Cancelled.");
        return Ok(());
    }

    if let Some(id) = photo_filter.as_deref() {
        fail_on_error(app.update(Message::SelectPhotoFilter(id.to_string())))?;
    }

    let encoded = app.export_photo()?;
    let path = output.unwrap_or_else(|| {
        storage::timestamped_path(&photo_dir, file_names::PHOTO_STEM, encoded.format.extension())
    });
    storage::save_bytes(&path, &encoded.data)?;
    println!("Photo saved: {}", path.display());

    if original {
        let encoded = app.export_original_photo()?;
        let path = sibling_path(&path, "original", encoded.format.extension());
        storage::save_bytes(&path, &encoded.data)?;
        println!("Original saved: {}", path.display());
    }

    app.update(Message::CloseCamera);
    Ok(())
}

/// Record for a fixed time, optionally switching filters halfway
pub fn record_video(
    options: &CommonOptions,
    plan: RecordPlan,
    output: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(options)?;
    if plan.audio {
        config.capture_audio = true;
    }
    let video_dir = storage::video_dir(&config);
    let mut app = build_model(config, options)?;
    let stop = install_ctrlc()?;
    let duration = Duration::from_secs_f64(plan.duration.max(0.0));

    let rt = tokio::runtime::Runtime::new()?;
    let finished = rt.block_on(async {
        open_camera(&mut app).await?;
        if let Some(id) = plan.filter.as_deref() {
            fail_on_error(app.update(Message::SelectPreviewFilter(id.to_string())))?;
        }

        for event in app.update(Message::StartRecording) {
            match event {
                AppEvent::RecordingStarted(format) => println!("Recording {}...", format),
                AppEvent::Error(e) => return Err(e),
                _ => {}
            }
        }
        println!("Press Ctrl+C to stop early");

        let started = Instant::now();
        let mut switch = plan.switch.clone();
        let mut stopped_at: Option<Instant> = None;
        let mut display = display_clock();

        loop {
            display.tick().await;
            let now = Instant::now();

            if let Some((id, after)) = switch.as_ref()
                && now.duration_since(started).as_secs_f64() >= *after
            {
                fail_on_error(app.update(Message::SelectPreviewFilter(id.clone())))?;
                println!("Switched to {}", id);
                switch = None;
            }

            if stopped_at.is_none()
                && (now.duration_since(started) >= duration || stop.load(Ordering::SeqCst))
            {
                app.update(Message::StopRecording);
                stopped_at = Some(now);
            }

            for event in app.update(Message::AnimationFrame(now)) {
                if let AppEvent::RecordingFinished(artifact) = event {
                    return Ok(Some(artifact));
                }
            }

            if stopped_at.is_some_and(|at| at.elapsed() >= timing::FINALIZE_TIMEOUT) {
                return Ok(None);
            }
        }
    })?;

    let artifact = match finished {
        Some(artifact) => artifact,
        // The encoder is taking too long; keep whatever it produced
        None => app.finish_recording(Duration::ZERO)?,
    };

    if artifact.is_empty() {
        println!("Recording produced no data.");
        return Ok(());
    }

    let path = output.unwrap_or_else(|| {
        storage::timestamped_path(&video_dir, file_names::VIDEO_STEM, artifact.format.extension())
    });
    storage::save_bytes(&path, &artifact.data)?;
    println!(
        "Video saved: {} ({}, {} chunks, {:.1}s)",
        path.display(),
        artifact.mime_type(),
        artifact.chunk_count,
        artifact.duration.as_secs_f64()
    );

    app.update(Message::CloseCamera);
    Ok(())
}

fn load_config(options: &CommonOptions) -> Result<Config, AppError> {
    let mut config = match options.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if options.natural {
        config.mirror_preview = false;
    }
    Ok(config)
}

fn build_model(config: Config, options: &CommonOptions) -> Result<AppModel, AppError> {
    let spec = options
        .device
        .clone()
        .or_else(|| config.device.clone())
        .or_else(default_device_spec)
        .ok_or_else(|| {
            CameraError::DeviceUnavailable(
                "no camera found (try --device test-pattern)".to_string(),
            )
        })?;
    let device = open_device(&spec)?;
    AppModel::with_detected_encoders(config, device)
}

/// Open the camera and wait for its first frame
async fn open_camera(app: &mut AppModel) -> Result<(), AppError> {
    fail_on_error(app.update(Message::OpenCamera))?;

    let deadline = Instant::now() + READY_TIMEOUT;
    let mut display = display_clock();
    while !app.is_camera_ready() {
        if Instant::now() >= deadline || !app.is_camera_open() {
            return Err(CameraError::DeviceUnavailable("no frames from camera".to_string()).into());
        }
        display.tick().await;
        app.update(Message::AnimationFrame(Instant::now()));
    }
    Ok(())
}

fn display_clock() -> tokio::time::Interval {
    let mut clock = tokio::time::interval(timing::FRAME_INTERVAL);
    clock.set_missed_tick_behavior(MissedTickBehavior::Skip);
    clock
}

fn fail_on_error(events: Vec<AppEvent>) -> Result<(), AppError> {
    for event in events {
        if let AppEvent::Error(e) = event {
            return Err(e);
        }
    }
    Ok(())
}

fn install_ctrlc() -> Result<Arc<AtomicBool>, ctrlc::Error> {
    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;
    Ok(stop)
}

/// `photo.png` -> `photo-original.png`
fn sibling_path(path: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_names::PHOTO_STEM.to_string());
    path.with_file_name(format!("{}-{}.{}", stem, suffix, extension))
}
