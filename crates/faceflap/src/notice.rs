//! User-facing messages.

use faceflap_image::{draw, Color, Image};

use crate::{AcquisitionFailure, Error};

/// Groups errors into the messages shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    DetectionUnavailable,
    NoFace,
    Acquisition(AcquisitionFailure),
    ImageLoad,
}

impl NoticeKind {
    /// Returns the kind of notice `error` is shown as, or `None` if it isn't shown.
    fn of(error: &Error) -> Option<Self> {
        Some(match error {
            Error::DetectionUnavailable(_) => NoticeKind::DetectionUnavailable,
            Error::NoFaceDetected => NoticeKind::NoFace,
            Error::SourceAcquisition { kind, .. } => NoticeKind::Acquisition(*kind),
            Error::Timeout | Error::Image { .. } | Error::Decode(_) => NoticeKind::ImageLoad,
            Error::MalformedLandmarks(_)
            | Error::FrameInFlight
            | Error::Cancelled
            | Error::Io(_)
            | Error::Json(_) => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Messages waiting to be dismissed by the user.
///
/// Each kind of notice is shown at most once at a time: reporting an error again while its notice
/// is still active does nothing.
#[derive(Debug, Default)]
pub struct Notices {
    active: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows a notice for `error`.
    ///
    /// Returns whether a new notice was added.
    pub fn report(&mut self, error: &Error) -> bool {
        let Some(kind) = NoticeKind::of(error) else {
            return false;
        };
        if self.is_active(kind) {
            return false;
        }

        let message = match error {
            Error::NoFaceDetected => "No face detected. Try again.".to_string(),
            e => {
                let mut message = e.to_string();
                if let Some(first) = message.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                message
            }
        };
        log::info!("notice: {}", message);
        self.active.push(Notice { kind, message });
        true
    }

    pub fn dismiss(&mut self, kind: NoticeKind) {
        self.active.retain(|notice| notice.kind != kind);
    }

    pub fn dismiss_all(&mut self) {
        self.active.clear();
    }

    pub fn is_active(&self, kind: NoticeKind) -> bool {
        self.active.iter().any(|notice| notice.kind == kind)
    }

    /// Returns the active notices, oldest first.
    pub fn active(&self) -> &[Notice] {
        &self.active
    }

    /// Draws the active notices onto the top left corner of `image`.
    pub fn draw(&self, image: &mut Image) {
        const LINE_HEIGHT: i32 = 22;
        for (i, notice) in self.active.iter().enumerate() {
            let y = 4 + i as i32 * LINE_HEIGHT;
            draw::text(image, 4, y, &notice.message)
                .color(Color::YELLOW)
                .background(Color::BLACK);
        }
    }
}
