//! Facial landmark groups in the 68-point iBUG layout.
//!
//! "Left" and "right" refer to the *image*: the left eye is the one with the smaller X coordinate
//! in an unmirrored frame.

use std::{fs, ops::Range, path::Path};

use faceflap_linalg::Point;
use serde::Deserialize;

use crate::Error;

/// Number of landmarks in the iBUG 68-point layout.
pub const NUM_LANDMARKS: usize = 68;

const JAW: Range<usize> = 0..17;
const LEFT_EYEBROW: Range<usize> = 17..22;
const RIGHT_EYEBROW: Range<usize> = 22..27;
const NOSE: Range<usize> = 27..36;
const LEFT_EYE: Range<usize> = 36..42;
const RIGHT_EYE: Range<usize> = 42..48;
const MOUTH: Range<usize> = 48..68;

/// Named, ordered landmark point sequences for a single face.
///
/// The order of points within a group follows the face outline, so consecutive points are
/// adjacent on the face.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkGroups {
    pub jaw_outline: Vec<Point>,
    pub left_eyebrow: Vec<Point>,
    pub right_eyebrow: Vec<Point>,
    pub nose: Vec<Point>,
    pub left_eye: Vec<Point>,
    pub right_eye: Vec<Point>,
    pub mouth: Vec<Point>,
}

impl LandmarkGroups {
    /// Splits a flat list of 68 landmarks into groups.
    pub fn from_68(points: &[Point]) -> Result<Self, Error> {
        if points.len() != NUM_LANDMARKS {
            return Err(Error::malformed(format!(
                "expected {} landmarks, got {}",
                NUM_LANDMARKS,
                points.len()
            )));
        }

        Ok(Self {
            jaw_outline: points[JAW].to_vec(),
            left_eyebrow: points[LEFT_EYEBROW].to_vec(),
            right_eyebrow: points[RIGHT_EYEBROW].to_vec(),
            nose: points[NOSE].to_vec(),
            left_eye: points[LEFT_EYE].to_vec(),
            right_eye: points[RIGHT_EYE].to_vec(),
            mouth: points[MOUTH].to_vec(),
        })
    }

    /// Parses landmarks from JSON.
    ///
    /// Accepts either an array of 68 `[x, y]` pairs, or an object with a `"points"` field holding
    /// such an array.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum LandmarkFile {
            Points(Vec<[f32; 2]>),
            Object { points: Vec<[f32; 2]> },
        }

        let points = match serde_json::from_str(json)? {
            LandmarkFile::Points(points) | LandmarkFile::Object { points } => points,
        };
        let points = points.into_iter().map(Point::from).collect::<Vec<_>>();
        Self::from_68(&points)
    }

    /// Loads landmarks from a JSON file (see [`LandmarkGroups::from_json`]).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let groups = Self::from_json(&json)?;
        log::debug!("loaded {} landmarks from {}", NUM_LANDMARKS, path.display());
        Ok(groups)
    }

    /// Returns every group together with its name, in layout order.
    pub fn groups(&self) -> [(&'static str, &[Point]); 7] {
        [
            ("jaw outline", &self.jaw_outline),
            ("left eyebrow", &self.left_eyebrow),
            ("right eyebrow", &self.right_eyebrow),
            ("nose", &self.nose),
            ("left eye", &self.left_eye),
            ("right eye", &self.right_eye),
            ("mouth", &self.mouth),
        ]
    }

    /// Returns an iterator over all landmarks, in layout order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.groups().into_iter().flat_map(|(_, pts)| pts.iter().copied())
    }

    /// Applies `f` to every landmark.
    #[must_use]
    pub fn map(&self, mut f: impl FnMut(Point) -> Point) -> Self {
        let mut map = |pts: &[Point]| pts.iter().map(|p| f(*p)).collect::<Vec<_>>();
        Self {
            jaw_outline: map(&self.jaw_outline),
            left_eyebrow: map(&self.left_eyebrow),
            right_eyebrow: map(&self.right_eyebrow),
            nose: map(&self.nose),
            left_eye: map(&self.left_eye),
            right_eye: map(&self.right_eye),
            mouth: map(&self.mouth),
        }
    }
}
