//! Error taxonomy.

use std::{fmt, path::PathBuf};

use thiserror::Error;

/// Why a frame source could not be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcquisitionFailure {
    /// The device exists, but another process is using it.
    InUse,
    /// Access to the device was denied.
    PermissionDenied,
    /// No usable device was found.
    NoDevice,
    Other,
}

impl AcquisitionFailure {
    /// Returns a hint telling the user how to recover.
    pub fn guidance(&self) -> &'static str {
        match self {
            AcquisitionFailure::InUse => {
                "It's most likely being used by another app. To use it here, close it in any apps \
                 that are using it and try reloading the camera."
            }
            AcquisitionFailure::PermissionDenied => {
                "If you didn't intend this, allow access to the camera device (for example, by \
                 adding your user to the `video` group) and try reloading the camera."
            }
            AcquisitionFailure::NoDevice => {
                "Connect a camera that delivers JPEG frames, or choose a photo instead."
            }
            AcquisitionFailure::Other => "Try reloading the camera, or choose a photo instead.",
        }
    }

    /// Classifies an I/O error returned while opening or configuring a device.
    pub fn from_io(error: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        // EBUSY has no stable `ErrorKind`.
        const EBUSY: i32 = 16;
        if error.raw_os_error() == Some(EBUSY) {
            return AcquisitionFailure::InUse;
        }
        match error.kind() {
            ErrorKind::PermissionDenied => AcquisitionFailure::PermissionDenied,
            ErrorKind::NotFound => AcquisitionFailure::NoDevice,
            _ => AcquisitionFailure::Other,
        }
    }
}

impl fmt::Display for AcquisitionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AcquisitionFailure::InUse => "camera is in use",
            AcquisitionFailure::PermissionDenied => "camera access denied",
            AcquisitionFailure::NoDevice => "no camera found",
            AcquisitionFailure::Other => "camera is unavailable",
        })
    }
}

/// Errors produced by faceflap.
///
/// Drawing code never fails; errors come from detection, sources, and file I/O.
#[derive(Debug, Error)]
pub enum Error {
    /// The face detection model could not be initialized. Effects needing landmarks are disabled.
    #[error("face detection is unavailable: {0}")]
    DetectionUnavailable(String),

    /// No face was found in the current frame.
    #[error("no face detected")]
    NoFaceDetected,

    /// A frame source (usually a camera) could not be acquired.
    #[error("{kind}: {message}. {}", .kind.guidance())]
    SourceAcquisition {
        kind: AcquisitionFailure,
        message: String,
    },

    /// A landmark group was empty or contained non-finite coordinates.
    #[error("malformed landmarks: {0}")]
    MalformedLandmarks(String),

    /// A frame was started while the previous one was still being processed.
    #[error("a frame is already in flight")]
    FrameInFlight,

    #[error("operation timed out")]
    Timeout,

    #[error("operation was cancelled")]
    Cancelled,

    #[error("failed to process image '{}': {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: faceflap_image::ImageError,
    },

    #[error("image decoding failed: {0}")]
    Decode(#[from] faceflap_image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid landmark file: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedLandmarks(msg.into())
    }

    pub fn acquisition(kind: AcquisitionFailure, message: impl fmt::Display) -> Self {
        Error::SourceAcquisition {
            kind,
            message: message.to_string(),
        }
    }

    /// Returns whether this error only affects the current frame.
    ///
    /// Per-frame errors are handled by skipping the effect; all other errors are reported to the
    /// user.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Error::NoFaceDetected | Error::MalformedLandmarks(_) | Error::FrameInFlight
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
