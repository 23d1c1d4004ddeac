//! CPU image manipulation and a canvas-style 2D drawing context.
//!
//! # Overview
//!
//! [`Image`] is an owned 8-bit sRGBA image, backed by the `image` crate.
//!
//! [`Canvas`] wraps an [`Image`] and offers an API modeled after the HTML canvas 2D context: a
//! stack of saved states, each holding a current transformation matrix, a clip region and a fill
//! color. Shapes are described by [`Path`]s and rasterized with a [`FillRule`]. Images are drawn
//! onto the canvas through the current transform and clip.
//!
//! ## Drawing
//!
//! A few primitive drawing operations for visualizing debug data are available in the [`draw`]
//! module. Unlike [`Canvas`] operations, they ignore transforms and clipping.
//!
//! # A Note on Pixel Coordinates
//!
//! Pixels are `1.0 x 1.0` in size, and a pixel is only covered by a shape if the shape covers the
//! pixel's center. The pixel at `(x, y)` has its center at `(x + 0.5, y + 0.5)`.

pub mod draw;

mod blend;
mod canvas;
mod color;
mod image;
mod path;
mod resolution;

pub use blend::*;
pub use canvas::*;
pub use color::{Color, ParseColorError};
pub use self::image::*;
pub use path::*;
pub use resolution::*;
