//! The user-visible output surface.

use faceflap_image::{Image, Resolution};

/// Holds the most recently presented frame, scaled to fit a container.
///
/// Frames keep their aspect ratio: they are scaled by the largest factor that still fits both
/// dimensions of the container, then rounded up to whole pixels.
#[derive(Debug)]
pub struct DisplaySurface {
    container: Resolution,
    image: Image,
}

impl DisplaySurface {
    pub fn new(container: Resolution) -> Self {
        Self {
            container,
            image: Image::new(0, 0),
        }
    }

    pub fn container(&self) -> Resolution {
        self.container
    }

    /// Changes the container size. Takes effect on the next [`DisplaySurface::present`].
    pub fn set_container(&mut self, container: Resolution) {
        if container != self.container {
            log::debug!("display container resized to {}", container);
            self.container = container;
        }
    }

    /// Displays `frame`.
    pub fn present(&mut self, frame: &Image) {
        let res = frame.resolution().fit_within(self.container);
        if res == frame.resolution() {
            self.image.clone_from(frame);
        } else if res.is_empty() {
            self.image = Image::new(0, 0);
        } else {
            self.image = frame.resized(res);
        }
    }

    /// Returns the displayed image.
    pub fn image(&self) -> &Image {
        &self.image
    }

    pub(crate) fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }
}
