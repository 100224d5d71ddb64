// SPDX-License-Identifier: GPL-3.0-only

//! Error types for honey-snap
//!
//! Each area of the pipeline has its own error enum. [`AppError`] wraps them
//! for the application layer and the CLI.

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Main application error type
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Camera-related errors
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    /// Recording-related errors
    #[error("Recording error: {0}")]
    Recording(#[from] RecordingError),
    /// Photo capture errors
    #[error("Photo error: {0}")]
    Photo(#[from] PhotoError),
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
    /// Storage/filesystem errors
    #[error("Storage error: {0}")]
    Storage(String),
    /// Unknown filter preset id
    #[error("Unknown filter preset: {0}")]
    UnknownFilter(String),
}

/// Camera (capture source) errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    /// No capture device exists, or access to it was denied
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Operation requires an open capture source
    #[error("No active capture source")]
    NoActiveSource,
    /// The device does not offer a usable pixel format
    #[error("Invalid camera format: {0}")]
    InvalidFormat(String),
    /// Device backend failure after the stream was opened
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Recording-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    /// Recording requested without an open capture source
    #[error("No active capture source")]
    NoActiveSource,
    /// Recording already in progress
    #[error("Recording already in progress")]
    AlreadyRecording,
    /// Failed to start the encoder session
    #[error("Failed to start recording: {0}")]
    StartFailed(String),
    /// Encoder not available
    #[error("Encoder not available: {0}")]
    EncoderNotAvailable(String),
    /// An encoder was asked for a format it cannot produce
    #[error("Unsupported output format: {0}")]
    UnsupportedOutputFormat(String),
    /// Encoder session failed while recording
    #[error("Pipeline error: {0}")]
    PipelineError(String),
    /// Operation requires a recording in progress
    #[error("No recording in progress")]
    NotRecording,
}

/// Photo capture and export errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    /// Capture requested without an open capture source
    #[error("No active capture source")]
    NoActiveSource,
    /// The source had no decoded frame when the countdown completed
    #[error("No frame available")]
    NoFrameAvailable,
    /// Encoding failed
    #[error("Encoding failed: {0}")]
    EncodingFailed(String),
    /// Saving failed
    #[error("Save failed: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<image::ImageError> for PhotoError {
    fn from(err: image::ImageError) -> Self {
        PhotoError::EncodingFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Camera(CameraError::DeviceUnavailable("/dev/video9".into()));
        assert_eq!(
            err.to_string(),
            "Camera error: Capture device unavailable: /dev/video9"
        );

        let err: AppError = RecordingError::NoActiveSource.into();
        assert_eq!(err.to_string(), "Recording error: No active capture source");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(AppError::from(io), AppError::Storage(_)));
    }
}
