//! The face flaps effect.
//!
//! The effect redraws two regions of the source image on top of itself: a *mouth flap* and an
//! *eyes flap*. Each flap is a rectangle aligned with the eye line, positioned slightly above the
//! feature it shows and magnified. Both flaps are clipped to a head-shaped region synthesized from
//! the jaw outline.

use std::env;

use faceflap_image::{Canvas, Color, FillRule, Image, Path};
use faceflap_linalg::{point, BoundingBox, Point};

use crate::face::{Face, Head};

const ENV_OVERALL_SCALE: &str = "FACEFLAP_OVERALL_SCALE";
const ENV_EYE_FLAP_SCALE: &str = "FACEFLAP_EYE_FLAP_SCALE";
const ENV_MOUTH_FLAP_SCALE: &str = "FACEFLAP_MOUTH_FLAP_SCALE";
const ENV_BACKDROP: &str = "FACEFLAP_BACKDROP";

/// Parameters of the face flaps effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlapConfig {
    overall_scale: f32,
    eye_flap_scale: f32,
    mouth_flap_scale: f32,
    mouth_offset: f32,
    eyes_offset: f32,
    mouth_expand: (f32, f32),
    eye_expand: (f32, f32),
    backdrop: Color,
}

impl Default for FlapConfig {
    fn default() -> Self {
        Self {
            overall_scale: 1.25,
            eye_flap_scale: 1.35,
            mouth_flap_scale: 1.35,
            mouth_offset: -0.25,
            eyes_offset: -0.1,
            mouth_expand: (1.0, 0.5),
            eye_expand: (0.35, 0.2),
            backdrop: Color::BLACK,
        }
    }
}

impl FlapConfig {
    /// Creates the default configuration, with scale factors overridden by environment variables.
    ///
    /// `FACEFLAP_OVERALL_SCALE`, `FACEFLAP_EYE_FLAP_SCALE` and `FACEFLAP_MOUTH_FLAP_SCALE` must be
    /// positive numbers, `FACEFLAP_BACKDROP` a `#rrggbb` color. Invalid values are logged and
    /// ignored.
    pub fn from_env() -> Self {
        let mut this = Self::default();
        if let Some(scale) = env_scale(ENV_OVERALL_SCALE) {
            this.overall_scale = scale;
        }
        if let Some(scale) = env_scale(ENV_EYE_FLAP_SCALE) {
            this.eye_flap_scale = scale;
        }
        if let Some(scale) = env_scale(ENV_MOUTH_FLAP_SCALE) {
            this.mouth_flap_scale = scale;
        }
        if let Ok(value) = env::var(ENV_BACKDROP) {
            match value.parse() {
                Ok(color) => this.backdrop = color,
                Err(e) => log::warn!("ignoring {ENV_BACKDROP}: {e}"),
            }
        }
        this
    }

    /// Sets the zoom factor applied to the whole effect, around the head center.
    pub fn overall_scale(mut self, scale: f32) -> Self {
        self.overall_scale = scale;
        self
    }

    pub fn eye_flap_scale(mut self, scale: f32) -> Self {
        self.eye_flap_scale = scale;
        self
    }

    pub fn mouth_flap_scale(mut self, scale: f32) -> Self {
        self.mouth_flap_scale = scale;
        self
    }

    /// Sets the vertical offset of the mouth flap, as a multiple of the mouth height.
    ///
    /// Negative values move the flap up, towards the eyes.
    pub fn mouth_offset(mut self, offset: f32) -> Self {
        self.mouth_offset = offset;
        self
    }

    /// Sets the vertical offset of the eyes flap, as a multiple of [`Eyes::height`].
    ///
    /// [`Eyes::height`]: crate::face::Eyes::height
    pub fn eyes_offset(mut self, offset: f32) -> Self {
        self.eyes_offset = offset;
        self
    }

    /// Sets how far the mouth flap extends past the mouth, as multiples of the mouth's half width
    /// and half height.
    pub fn mouth_expand(mut self, x: f32, y: f32) -> Self {
        self.mouth_expand = (x, y);
        self
    }

    /// Sets how far the eyes flap extends past the eyes, as multiples of [`Eyes::height`].
    ///
    /// [`Eyes::height`]: crate::face::Eyes::height
    pub fn eye_expand(mut self, x: f32, y: f32) -> Self {
        self.eye_expand = (x, y);
        self
    }

    /// Sets the color that fills the flap regions before the source image is drawn into them.
    ///
    /// It is only visible where the source image does not cover the flap, or is translucent.
    pub fn backdrop(mut self, color: Color) -> Self {
        self.backdrop = color;
        self
    }
}

fn env_scale(var: &str) -> Option<f32> {
    let value = env::var(var).ok()?;
    match value.trim().parse::<f32>() {
        Ok(scale) if scale.is_finite() && scale > 0.0 => {
            log::debug!("{var}={scale}");
            Some(scale)
        }
        _ => {
            log::warn!("ignoring invalid value for {var}: {value:?}");
            None
        }
    }
}

/// Draws the face flaps effect onto a [`Canvas`].
#[derive(Debug, Clone, Default)]
pub struct FaceFlapsDrawer {
    config: FlapConfig,
}

impl FaceFlapsDrawer {
    pub fn new(config: FlapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FlapConfig {
        &self.config
    }

    /// Draws the flaps for `face`, sampling from `source`.
    ///
    /// `source` is expected to be the frame `face` was extracted from, drawn in canvas
    /// coordinates. The canvas state (transform, clip, fill color, and the number of saved
    /// states) is the same after this returns as before.
    ///
    /// If `source` is empty, nothing is drawn.
    pub fn draw(&self, canvas: &mut Canvas, face: &Face, source: &Image) {
        if source.is_empty() {
            log::debug!("source image is empty, skipping face flaps");
            return;
        }

        canvas.scoped(|canvas| {
            let center = face.head.center;
            let scale = self.config.overall_scale;
            canvas.translate(center);
            canvas.scale(scale, scale);
            canvas.translate(-center);

            canvas.clip(&head_mask(&face.head), FillRule::EvenOdd);

            self.draw_mouth_flap(canvas, face, source);
            self.draw_eyes_flap(canvas, face, source);
        });
    }

    fn draw_mouth_flap(&self, canvas: &mut Canvas, face: &Face, source: &Image) {
        let mouth = &face.mouth;
        let (expand_x, expand_y) = self.config.mouth_expand;
        let bb = &mouth.bounding_box;
        let rect = BoundingBox::from_corners(bb.min() - mouth.center, bb.max() - mouth.center)
            .grow(expand_x * bb.width() / 2.0, expand_y * bb.height() / 2.0);

        self.draw_flap(
            canvas,
            Flap {
                center: mouth.center,
                offset: self.config.mouth_offset * mouth.height,
                angle: face.eyes.angle,
                scale: self.config.mouth_flap_scale,
                rect,
            },
            source,
        );
    }

    fn draw_eyes_flap(&self, canvas: &mut Canvas, face: &Face, source: &Image) {
        let eyes = &face.eyes;
        let (expand_x, expand_y) = self.config.eye_expand;

        // Bring the eye region into the frame of the eye line, so that the expansion happens along
        // it instead of along the canvas axes.
        let corners = eyes
            .bounding_box
            .corners()
            .map(|corner| (corner - eyes.center).rotate(eyes.angle));
        let Some(rect) = BoundingBox::bounding(corners) else {
            return;
        };
        let rect = rect.grow(expand_x * eyes.height, expand_y * eyes.height);

        self.draw_flap(
            canvas,
            Flap {
                center: eyes.center,
                offset: self.config.eyes_offset * eyes.height,
                angle: eyes.angle,
                scale: self.config.eye_flap_scale,
                rect,
            },
            source,
        );
    }

    fn draw_flap(&self, canvas: &mut Canvas, flap: Flap, source: &Image) {
        log::trace!("{:?}", flap);

        canvas.scoped(|canvas| {
            canvas.translate(flap.center + point(0.0, flap.offset));
            canvas.rotate(-flap.angle);
            canvas.scale(flap.scale, flap.scale);

            let path = Path::rect(&flap.rect);
            canvas.set_fill_color(self.config.backdrop);
            canvas.fill(&path, FillRule::NonZero);
            canvas.clip(&path, FillRule::NonZero);

            // Undo rotation and translation, but keep the scale: the source is drawn magnified
            // around the flap center.
            canvas.rotate(flap.angle);
            canvas.translate(-flap.center);
            canvas.draw_image(source, 0.0, 0.0);
        });
    }
}

/// A flap, in the coordinate system of the face feature it shows.
#[derive(Debug)]
struct Flap {
    /// Center of the feature.
    center: Point,
    /// Vertical offset of the flap relative to `center`, in canvas pixels.
    offset: f32,
    /// Angle of the eye line. The flap rectangle is aligned to it.
    angle: f32,
    scale: f32,
    /// Flap rectangle, relative to `center` and aligned to the eye line.
    rect: BoundingBox,
}

/// Builds the head-shaped clip path.
///
/// The jaw outline only covers the lower half of the head. It is mirrored across the line through
/// its end points to synthesize the upper half.
fn head_mask(head: &Head) -> Path {
    let (Some(&first), Some(&last)) = (head.points.first(), head.points.last()) else {
        return Path::new();
    };
    let mid = (first + last).scale(0.5);
    let tilt = Point::angle_between(first, last);

    let mirrored = head
        .points
        .iter()
        .rev()
        .map(|&p| mid + (p - mid).rotate(-tilt).reflect_x_axis().rotate(tilt));
    Path::polygon(head.points.iter().copied().chain(mirrored))
}
