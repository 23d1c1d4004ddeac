//! Real-time "face flap" camera effect.
//!
//! Frames from a camera or an image file are passed to a face detector, the detected landmarks are
//! reduced to a [`face::Face`] description, and the [`flaps::FaceFlapsDrawer`] composites scaled
//! copies of the eye and mouth regions back onto the frame, inside a head-shaped clip region.
//!
//! The [`pipeline::RenderPipeline`] ties everything together, pulling frames from the
//! [`source::SourceController`].
//!
//! # Coordinates
//!
//! All coordinates are image coordinates: X points to the right, Y points *down*, and positive
//! angles rotate clockwise on screen.
//!
//! # Environment Variables
//!
//! Some defaults can be overridden by setting environment variables:
//!
//! * `FACEFLAP_OVERALL_SCALE`, `FACEFLAP_EYE_FLAP_SCALE`, `FACEFLAP_MOUTH_FLAP_SCALE`: scale
//!   factors used by [`flaps::FlapConfig::from_env`].
//! * `FACEFLAP_BACKDROP`: `#rrggbb` color filling the flap regions where the source is
//!   transparent.
//! * `FACEFLAP_WEBCAM_NAME`: Forces the device to use for [`webcam::Webcam`]s created without an
//!   explicit device name. If unset, the first device that supports a compatible image format will
//!   be used.

use log::LevelFilter;

pub mod detector;
pub mod display;
pub mod effect;
pub mod error;
pub mod face;
pub mod flaps;
pub mod landmark;
pub mod loader;
pub mod notice;
pub mod pipeline;
pub mod source;
pub mod timer;
pub mod webcam;

#[cfg(test)]
mod test;

pub use error::{AcquisitionFailure, Error, Result};
pub use faceflap_image as image;
pub use faceflap_linalg as linalg;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .filter(Some("faceflap_image"), LevelFilter::Info)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and faceflap will log at *debug* level, the image crate at *info* level.
/// `RUST_LOG` can be used to override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
