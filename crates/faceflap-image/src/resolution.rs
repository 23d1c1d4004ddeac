//! Frame and container sizes.

use std::{fmt, str::FromStr};

/// Size of an image, camera frame, or display container in pixels.
///
/// Displayed and parsed as `WIDTHxHEIGHT`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// `1920x1080`
    pub const RES_1080P: Self = Self::new(1920, 1080);

    /// `1280x720`
    pub const RES_720P: Self = Self::new(1280, 720);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn num_pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Returns `true` if there are no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns whether both dimensions are at most as large as those of `container`.
    pub fn fits_in(&self, container: Resolution) -> bool {
        self.width <= container.width && self.height <= container.height
    }

    /// Scales `self` uniformly so that it fits inside of `container`, preserving its aspect ratio.
    ///
    /// The scale factor is `min(container.width / width, container.height / height)`, and the
    /// scaled dimensions are rounded up. This may upscale `self` if the container is larger.
    ///
    /// If either resolution is empty, an empty resolution is returned.
    pub fn fit_within(&self, container: Resolution) -> Resolution {
        if self.is_empty() || container.is_empty() {
            return Resolution::new(0, 0);
        }

        let scale = f32::min(
            container.width as f32 / self.width as f32,
            container.height as f32 / self.height as f32,
        );
        let fitted = Resolution::new(
            (self.width as f32 * scale).ceil() as u32,
            (self.height as f32 * scale).ceil() as u32,
        );
        log::trace!("fit {self} in {container} -> {fitted} (x{scale:.3})");
        fitted
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResolutionError(String);

impl fmt::Display for ParseResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid resolution '{}' (expected WIDTHxHEIGHT)", self.0)
    }
}

impl std::error::Error for ParseResolutionError {}

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseResolutionError(s.to_string());
        let (w, h) = s.split_once(['x', 'X']).ok_or_else(err)?;
        let width = w.trim().parse().map_err(|_| err())?;
        let height = h.trim().parse().map_err(|_| err())?;
        Ok(Self::new(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_within() {
        // Limited by height: 640x480 in 1000x600 -> x1.25.
        assert_eq!(
            Resolution::new(640, 480).fit_within(Resolution::new(1000, 600)),
            Resolution::new(800, 600)
        );
        // Limited by width.
        assert_eq!(
            Resolution::new(1920, 1080).fit_within(Resolution::new(960, 960)),
            Resolution::new(960, 540)
        );
        // Upscaling is allowed.
        assert_eq!(
            Resolution::new(4, 4).fit_within(Resolution::new(10, 10)),
            Resolution::new(10, 10)
        );
        // Fractional sizes are rounded up.
        assert_eq!(
            Resolution::new(300, 200).fit_within(Resolution::new(100, 100)),
            Resolution::new(100, 67)
        );
        assert_eq!(
            Resolution::new(0, 200).fit_within(Resolution::new(100, 100)),
            Resolution::new(0, 0)
        );
    }

    #[test]
    fn fits_in() {
        assert!(Resolution::RES_720P.fits_in(Resolution::RES_1080P));
        assert!(Resolution::RES_720P.fits_in(Resolution::RES_720P));
        assert!(!Resolution::new(1281, 10).fits_in(Resolution::RES_720P));
    }

    #[test]
    fn parse() {
        assert_eq!("1280x720".parse::<Resolution>(), Ok(Resolution::RES_720P));
        assert_eq!("640 X 480".parse::<Resolution>(), Ok(Resolution::new(640, 480)));
        assert!("1280".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }
}
