//! Extraction of face geometry from landmarks.
//!
//! [`FaceExtractor::extract`] reduces a set of [`LandmarkGroups`] to a [`Face`]: centers,
//! bounding boxes and the tilt of the eye line. The result is everything the
//! [`FaceFlapsDrawer`][crate::flaps::FaceFlapsDrawer] needs to know about a face.

use faceflap_linalg::{BoundingBox, Point};

use crate::{landmark::LandmarkGroups, Error, Result};

/// Function used to compute the angle of the eye line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleMode {
    /// Four-quadrant angle ([`Point::angle_between`]).
    #[default]
    Atan2,
    /// Two-quadrant slope angle ([`Point::slope_angle_between`]).
    ///
    /// Loses the direction of the eye line, so a face that is upside down (or mirrored) yields the
    /// same angle as an upright one.
    Atan,
}

impl AngleMode {
    fn angle(self, from: Point, to: Point) -> f32 {
        match self {
            AngleMode::Atan2 => Point::angle_between(from, to),
            AngleMode::Atan => Point::slope_angle_between(from, to),
        }
    }
}

/// Configuration for a [`FaceExtractor`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractorConfig {
    include_eyebrows: bool,
    angle_mode: AngleMode,
}

impl ExtractorConfig {
    /// Whether to extend each eye's bounding box to cover the eyebrow above it.
    ///
    /// Off by default.
    pub fn include_eyebrows(mut self, include: bool) -> Self {
        self.include_eyebrows = include;
        self
    }

    pub fn angle_mode(mut self, mode: AngleMode) -> Self {
        self.angle_mode = mode;
        self
    }
}

/// Geometry of both eyes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Eyes {
    /// Midpoint between the two eye centers.
    pub center: Point,
    /// Union of [`Eyes::left_bounding_box`] and [`Eyes::right_bounding_box`].
    pub bounding_box: BoundingBox,
    pub left_bounding_box: BoundingBox,
    pub right_bounding_box: BoundingBox,
    pub left_center: Point,
    pub right_center: Point,
    /// Rotation (in radians) that levels the eye line.
    ///
    /// This is the *negated* angle of the line from the left to the right eye center. If the right
    /// eye is higher up on screen than the left one, this is positive.
    pub angle: f32,
    /// Length of the diagonal of [`Eyes::bounding_box`].
    ///
    /// Despite the name, this is not a vertical measurement. It is used as the unit for the size of
    /// the eye flap.
    pub height: f32,
    /// Whether the eyebrows were included in the bounding boxes.
    pub includes_eyebrows: bool,
}

/// Geometry of the mouth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mouth {
    pub center: Point,
    pub bounding_box: BoundingBox,
    /// Vertical extent of [`Mouth::bounding_box`].
    pub height: f32,
}

/// Geometry of the head, derived from the jaw outline.
#[derive(Debug, Clone, PartialEq)]
pub struct Head {
    pub center: Point,
    pub bounding_box: BoundingBox,
    /// The jaw outline, in landmark order (from the image-left end to the image-right end).
    pub points: Vec<Point>,
}

/// Face geometry derived from a single frame's landmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub eyes: Eyes,
    pub mouth: Mouth,
    pub head: Head,
}

/// Computes [`Face`] geometry from [`LandmarkGroups`].
#[derive(Debug, Clone, Default)]
pub struct FaceExtractor {
    config: ExtractorConfig,
}

impl FaceExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts face geometry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedLandmarks`] if a group that is needed is empty or contains a
    /// non-finite coordinate.
    pub fn extract(&self, landmarks: &LandmarkGroups) -> Result<Face> {
        let (left_center, mut left_bounding_box) = region("left eye", &landmarks.left_eye)?;
        let (right_center, mut right_bounding_box) = region("right eye", &landmarks.right_eye)?;
        if self.config.include_eyebrows {
            let (_, left_brow) = region("left eyebrow", &landmarks.left_eyebrow)?;
            let (_, right_brow) = region("right eyebrow", &landmarks.right_eyebrow)?;
            left_bounding_box = left_bounding_box.union(&left_brow);
            right_bounding_box = right_bounding_box.union(&right_brow);
        }

        let center = (left_center + right_center).scale(0.5);
        let angle = -self.config.angle_mode.angle(left_center, right_center);
        let bounding_box = left_bounding_box.union(&right_bounding_box);
        let eyes = Eyes {
            center,
            bounding_box,
            left_bounding_box,
            right_bounding_box,
            left_center,
            right_center,
            angle,
            height: bounding_box.diagonal(),
            includes_eyebrows: self.config.include_eyebrows,
        };

        let (center, bounding_box) = region("mouth", &landmarks.mouth)?;
        let mouth = Mouth {
            center,
            bounding_box,
            height: bounding_box.height(),
        };

        let (center, bounding_box) = region("jaw outline", &landmarks.jaw_outline)?;
        let head = Head {
            center,
            bounding_box,
            points: landmarks.jaw_outline.clone(),
        };

        log::trace!(
            "extracted face: eyes at {:?} (angle {:.3}), mouth at {:?}, head at {:?}",
            eyes.center,
            eyes.angle,
            mouth.center,
            head.center,
        );
        Ok(Face { eyes, mouth, head })
    }
}

/// Computes the centroid and bounding box of a landmark group.
fn region(name: &str, points: &[Point]) -> Result<(Point, BoundingBox)> {
    if let Some(p) = points.iter().find(|p| !p.is_finite()) {
        return Err(Error::malformed(format!(
            "{name} contains non-finite point {p:?}"
        )));
    }
    let empty = || Error::malformed(format!("{name} is empty"));
    let center = Point::centroid(points.iter().copied()).ok_or_else(empty)?;
    let bounding_box = BoundingBox::bounding(points.iter().copied()).ok_or_else(empty)?;
    Ok((center, bounding_box))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use faceflap_linalg::point;

    use crate::test;

    use super::*;

    #[test]
    fn level_eyes() {
        let face = FaceExtractor::default().extract(&test::face()).unwrap();

        assert_relative_eq!(face.eyes.angle, 0.0, epsilon = 1e-5);
        assert_relative_eq!(face.eyes.center, point(200.0, 150.0), epsilon = 1e-4);
        assert_relative_eq!(face.eyes.left_center, point(160.0, 150.0), epsilon = 1e-4);
        assert_relative_eq!(face.eyes.right_center, point(240.0, 150.0), epsilon = 1e-4);
        assert_relative_eq!(face.eyes.bounding_box.min().x, 145.0, epsilon = 1e-4);
        assert_relative_eq!(face.eyes.bounding_box.max().x, 255.0, epsilon = 1e-4);
        assert_relative_eq!(
            face.eyes.height,
            face.eyes.bounding_box.diagonal(),
            epsilon = 1e-6
        );
        assert!(face.eyes.height > face.eyes.bounding_box.width());
        assert!(!face.eyes.includes_eyebrows);
    }

    #[test]
    fn mouth_and_head() {
        let face = FaceExtractor::default().extract(&test::face()).unwrap();

        assert_relative_eq!(face.mouth.center, point(200.0, 225.0), epsilon = 1e-4);
        assert_relative_eq!(face.mouth.height, 20.0, epsilon = 1e-4);
        assert_relative_eq!(face.mouth.bounding_box.min(), point(170.0, 215.0), epsilon = 1e-4);

        assert_eq!(face.head.points.len(), 17);
        assert_relative_eq!(face.head.points[0], point(100.0, 150.0), epsilon = 1e-4);
        assert_relative_eq!(face.head.center.x, 200.0, epsilon = 1e-4);
        assert!(face.head.center.y > 150.0);
        assert_relative_eq!(face.head.bounding_box.max().y, 270.0, epsilon = 1e-4);
    }

    fn eyes_at(left: Point, right: Point) -> LandmarkGroups {
        let mut landmarks = test::face();
        landmarks.left_eye = vec![left];
        landmarks.right_eye = vec![right];
        landmarks
    }

    #[test]
    fn right_eye_higher() {
        let landmarks = eyes_at(point(100.0, 150.0), point(200.0, 130.0));
        for mode in [AngleMode::Atan2, AngleMode::Atan] {
            let extractor = FaceExtractor::new(ExtractorConfig::default().angle_mode(mode));
            let eyes = extractor.extract(&landmarks).unwrap().eyes;
            assert_relative_eq!(eyes.angle, (20.0f32 / 100.0).atan(), epsilon = 1e-6);
            assert!(eyes.angle > 0.0);
            assert_relative_eq!(eyes.center, point(150.0, 140.0));
        }
    }

    #[test]
    fn angle_modes_differ_for_swapped_eyes() {
        // Left and right swapped: the eye line points to the left.
        let landmarks = eyes_at(point(200.0, 130.0), point(100.0, 150.0));

        let atan2 = FaceExtractor::default().extract(&landmarks).unwrap();
        let atan = FaceExtractor::new(ExtractorConfig::default().angle_mode(AngleMode::Atan))
            .extract(&landmarks)
            .unwrap();

        // `atan` can't tell the two orderings apart.
        assert_relative_eq!(atan.eyes.angle, (20.0f32 / 100.0).atan(), epsilon = 1e-6);
        // `atan2` sees a face that is (almost) upside down.
        assert!(atan2.eyes.angle.abs() > 2.9, "{}", atan2.eyes.angle);
    }

    #[test]
    fn tilted_face() {
        let tilt = 0.2;
        let face = FaceExtractor::default()
            .extract(&test::tilted_face(tilt))
            .unwrap();
        assert_relative_eq!(face.eyes.angle, -tilt, epsilon = 1e-5);
        assert_relative_eq!(face.eyes.center, test::PIVOT, epsilon = 1e-3);
    }

    #[test]
    fn random_tilts_and_shifts() {
        let upright = FaceExtractor::default().extract(&test::face()).unwrap();
        for _ in 0..50 {
            // Both angle modes agree while the eyes are not swapped.
            let tilt = (fastrand::f32() - 0.5) * 2.4;
            let shift = point(fastrand::f32() * 100.0 - 50.0, fastrand::f32() * 100.0 - 50.0);
            let landmarks = test::tilted_face(tilt).map(|p| p + shift);

            for mode in [AngleMode::Atan2, AngleMode::Atan] {
                let face = FaceExtractor::new(ExtractorConfig::default().angle_mode(mode))
                    .extract(&landmarks)
                    .unwrap();
                assert_relative_eq!(face.eyes.angle, -tilt, epsilon = 1e-4);
                assert_relative_eq!(face.eyes.center, test::PIVOT + shift, epsilon = 1e-2);
                let mouth = test::PIVOT + (upright.mouth.center - test::PIVOT).rotate(tilt);
                assert_relative_eq!(face.mouth.center, mouth + shift, epsilon = 1e-2);
            }
        }
    }

    #[test]
    fn eyebrows() {
        let extractor = FaceExtractor::new(ExtractorConfig::default().include_eyebrows(true));
        let eyes = extractor.extract(&test::face()).unwrap().eyes;
        assert!(eyes.includes_eyebrows);
        assert_relative_eq!(eyes.left_bounding_box.min().y, 130.0, epsilon = 1e-4);
        assert_relative_eq!(eyes.bounding_box.min(), point(140.0, 130.0), epsilon = 1e-4);
        // Eye centers are not affected.
        assert_relative_eq!(eyes.left_center, point(160.0, 150.0), epsilon = 1e-4);
    }

    #[test]
    fn malformed() {
        let extractor = FaceExtractor::default();

        let mut landmarks = test::face();
        landmarks.mouth.clear();
        let err = extractor.extract(&landmarks).unwrap_err();
        assert!(err.to_string().contains("mouth is empty"), "{err}");

        let mut landmarks = test::face();
        landmarks.jaw_outline[3].y = f32::NAN;
        assert!(matches!(
            extractor.extract(&landmarks),
            Err(Error::MalformedLandmarks(_))
        ));

        // Unused groups are not validated.
        let mut landmarks = test::face();
        landmarks.left_eyebrow.clear();
        landmarks.nose.clear();
        assert!(extractor.extract(&landmarks).is_ok());
        assert!(FaceExtractor::new(ExtractorConfig::default().include_eyebrows(true))
            .extract(&landmarks)
            .is_err());
    }
}
