//! Shared test fixtures.

use std::f32::consts::{PI, TAU};

use faceflap_image::{Color, Image};
use faceflap_linalg::{point, BoundingBox, Point};

use crate::landmark::LandmarkGroups;

/// Center the fixture face is rotated around by [`tilted_face`].
pub const PIVOT: Point = point(200.0, 150.0);

fn ellipse(center: Point, rx: f32, ry: f32, n: usize) -> impl Iterator<Item = Point> {
    (0..n).map(move |i| {
        let t = i as f32 / n as f32 * TAU;
        center + point(rx * t.cos(), ry * t.sin())
    })
}

fn line(from: Point, to: Point, n: usize) -> impl Iterator<Item = Point> {
    (0..n).map(move |i| from + (to - from).scale(i as f32 / (n - 1) as f32))
}

/// A synthetic, upright 68-point face for a 400x400 frame.
///
/// * The jaw is the lower half of an ellipse around [`PIVOT`] with radii 100x120, running from
///   `(100, 150)` through `(200, 270)` to `(300, 150)`.
/// * The eyes are 30x12 ellipses centered at `(160, 150)` and `(240, 150)`.
/// * The mouth is centered at `(200, 225)`, its outer lip spans `170..=230` x `215..=235`.
pub fn face() -> LandmarkGroups {
    let mut points = Vec::with_capacity(68);
    points.extend((0..17).map(|i| {
        let t = i as f32 / 16.0 * PI;
        point(200.0 - 100.0 * t.cos(), 150.0 + 120.0 * t.sin())
    }));
    points.extend(line(point(140.0, 130.0), point(180.0, 130.0), 5));
    points.extend(line(point(220.0, 130.0), point(260.0, 130.0), 5));
    points.extend(line(point(200.0, 160.0), point(200.0, 190.0), 4));
    points.extend(line(point(190.0, 200.0), point(210.0, 200.0), 5));
    points.extend(ellipse(point(160.0, 150.0), 15.0, 6.0, 6));
    points.extend(ellipse(point(240.0, 150.0), 15.0, 6.0, 6));
    points.extend(ellipse(point(200.0, 225.0), 30.0, 10.0, 12));
    points.extend(ellipse(point(200.0, 225.0), 20.0, 4.0, 8));
    LandmarkGroups::from_68(&points).unwrap()
}

/// [`face`], rotated around [`PIVOT`] by `radians` (clockwise on screen).
pub fn tilted_face(radians: f32) -> LandmarkGroups {
    face().map(|p| PIVOT + (p - PIVOT).rotate(radians))
}

/// Eye region of the fixture face, covering both eyes.
pub fn eye_region() -> BoundingBox {
    BoundingBox::from_corners(point(145.0, 144.0), point(256.0, 157.0))
}

/// Mouth region of the fixture face.
pub fn mouth_region() -> BoundingBox {
    BoundingBox::from_corners(point(170.0, 215.0), point(231.0, 236.0))
}

/// A 400x400 blue frame with the eye and mouth regions of [`face`] painted red.
pub fn frame() -> Image {
    let mut image = Image::filled(400, 400, Color::BLUE);
    for region in [eye_region(), mouth_region()] {
        for y in region.min().y as u32..region.max().y as u32 {
            for x in region.min().x as u32..region.max().x as u32 {
                image.set(x, y, Color::RED);
            }
        }
    }
    image
}
