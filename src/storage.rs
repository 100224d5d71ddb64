// SPDX-License-Identifier: GPL-3.0-only

//! Storage utilities for saving photos and recordings

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::info;

/// Folder created under the user's Pictures/Videos directories
const DEFAULT_SAVE_FOLDER: &str = "Honey Snap";

/// Photo directory: the configured override, else `~/Pictures/Honey Snap`
pub fn photo_dir(config: &Config) -> PathBuf {
    config.photo_dir.clone().unwrap_or_else(|| {
        dirs::picture_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(DEFAULT_SAVE_FOLDER)
    })
}

/// Video directory: the configured override, else `~/Videos/Honey Snap`
pub fn video_dir(config: &Config) -> PathBuf {
    config.video_dir.clone().unwrap_or_else(|| {
        dirs::video_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join(DEFAULT_SAVE_FOLDER)
    })
}

/// `<dir>/<stem>_<YYYYmmdd_HHMMSS>.<ext>`, with a counter if that file exists
pub fn timestamped_path(dir: &Path, stem: &str, extension: &str) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut path = dir.join(format!("{}_{}.{}", stem, timestamp, extension));
    let mut counter = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}_{}.{}", stem, timestamp, counter, extension));
        counter += 1;
    }
    path
}

/// Write `data` to `path`, creating parent directories
pub fn save_bytes(path: &Path, data: &[u8]) -> AppResult<PathBuf> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("{}: {}", parent.display(), e)))?;
    }
    std::fs::write(path, data)
        .map_err(|e| AppError::Storage(format!("{}: {}", path.display(), e)))?;
    info!(path = %path.display(), bytes = data.len(), "Saved file");
    Ok(path.to_path_buf())
}
