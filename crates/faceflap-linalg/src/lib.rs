//! A small 2D geometry library for faceflap.
//!
//! # Coordinates
//!
//! All types in this crate use image coordinates: X points to the right, Y points *down*. As a
//! consequence, a positive rotation angle rotates points *clockwise* as seen on screen, which is
//! the same convention the [`Affine`] transforms of the canvas use.
//!
//! # Degenerate Inputs
//!
//! Reductions over point sets ([`Point::centroid`], [`BoundingBox::bounding`]) return [`None`]
//! for empty input instead of producing NaN or infinite coordinates.

mod affine;
mod bbox;
mod point;

pub use affine::*;
pub use bbox::*;
pub use point::*;
