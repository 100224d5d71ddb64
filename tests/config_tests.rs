// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use honey_snap::config::PhotoFormat;
use honey_snap::{AppError, Config};
use std::path::PathBuf;

fn scratch_file() -> PathBuf {
    std::env::temp_dir()
        .join(format!("honey-snap-config-{}", uuid::Uuid::new_v4()))
        .join("config.json")
}

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(
        config.mirror_preview,
        "Mirror preview should be enabled by default"
    );
    assert_eq!(config.preview_filter, "none");
    assert_eq!(config.photo_format, PhotoFormat::Png);
    assert_eq!(config.fallback_recording_size(), (640, 480));
    assert!(!config.capture_audio, "Audio is opt-in");
}

#[test]
fn test_missing_file_gives_defaults() {
    let config = Config::load_from(&scratch_file()).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_save_and_load() {
    let path = scratch_file();
    let config = Config {
        device: Some("test-pattern".into()),
        preview_filter: "warm".into(),
        photo_format: PhotoFormat::Jpeg,
        preferred_formats: vec!["video/webm".into()],
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn test_invalid_file_rejected() {
    let path = scratch_file();
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();

    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load_from(&path).is_err());

    std::fs::write(&path, r#"{"recording_fps": 0}"#).unwrap();
    assert!(matches!(
        Config::load_from(&path),
        Err(AppError::Config(_))
    ));

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}
