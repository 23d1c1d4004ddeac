//! Overlay effects and effect selection.

use faceflap_image::{Canvas, Image};

use crate::{
    face::Face,
    flaps::{FaceFlapsDrawer, FlapConfig},
};

/// An effect that is drawn on top of the source frame.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Shows the source frame unmodified.
    None,
    FaceFlaps(FaceFlapsDrawer),
}

static NOOP: Effect = Effect::None;

impl Effect {
    /// Returns whether the effect needs face landmarks to be detected.
    pub fn needs_landmarks(&self) -> bool {
        matches!(self, Effect::FaceFlaps(_))
    }

    /// Draws the effect onto `canvas`, which already contains `source`.
    ///
    /// Effects that need a face do nothing when `face` is `None`.
    pub fn draw(&self, canvas: &mut Canvas, face: Option<&Face>, source: &Image) {
        match (self, face) {
            (Effect::None, _) => {}
            (Effect::FaceFlaps(drawer), Some(face)) => drawer.draw(canvas, face, source),
            (Effect::FaceFlaps(_), None) => log::trace!("no face, skipping face flaps"),
        }
    }
}

/// Identifies an [`Effect`] the user can choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffectType {
    None,
    #[default]
    Flaps,
}

/// Keeps track of the selected effect.
///
/// Effects that need landmarks only become available once a face detector is running. Until
/// then, selecting them results in the no-op effect.
#[derive(Debug, Default)]
pub struct EffectController {
    selected: EffectType,
    face_flaps: Option<Effect>,
}

impl EffectController {
    pub fn new(selected: EffectType) -> Self {
        Self {
            selected,
            face_flaps: None,
        }
    }

    /// Makes the face flaps effect available.
    pub fn init_face_flaps(&mut self, config: FlapConfig) {
        log::debug!("face flaps effect initialized");
        self.face_flaps = Some(Effect::FaceFlaps(FaceFlapsDrawer::new(config)));
    }

    pub fn switch_to(&mut self, effect: EffectType) {
        if effect != self.selected {
            log::debug!("switching effect: {:?} -> {:?}", self.selected, effect);
            self.selected = effect;
        }
    }

    pub fn selected(&self) -> EffectType {
        self.selected
    }

    /// Returns the effect to draw.
    pub fn current(&self) -> &Effect {
        match (self.selected, &self.face_flaps) {
            (EffectType::Flaps, Some(effect)) => effect,
            _ => &NOOP,
        }
    }
}
