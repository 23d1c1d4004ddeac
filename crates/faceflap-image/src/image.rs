use std::{fmt, path::Path};

use image::{imageops, ImageFormat, Rgba, RgbaImage};

use crate::{Color, Resolution};

pub use image::ImageError;

/// An owned RGBA frame.
///
/// Frames from cameras, loaded photos, canvases and the display surface are all [`Image`]s.
#[derive(Clone, PartialEq)]
pub struct Image {
    buf: RgbaImage,
}

impl Image {
    /// Transparent image of `width x height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: RgbaImage::new(width, height),
        }
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            buf: RgbaImage::from_pixel(width, height, Rgba(color.0)),
        }
    }

    /// Loads a JPEG or PNG file, detecting the format from its contents.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let buf = image::io::Reader::open(path.as_ref())?
            .with_guessed_format()?
            .decode()?
            .into_rgba8();
        Ok(Self { buf })
    }

    /// Decodes a JPEG frame, as delivered by MJPG webcams.
    pub fn decode_jpeg(data: &[u8]) -> Result<Self, ImageError> {
        let buf = image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.into_rgba8();
        Ok(Self { buf })
    }

    /// Writes the image to `path`, in the format indicated by its extension (`png` or `jpg`).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImageError> {
        let path = path.as_ref();
        if ImageFormat::from_path(path)? == ImageFormat::Jpeg {
            // JPEG has no alpha channel.
            let rgb = image::DynamicImage::ImageRgba8(self.buf.clone()).into_rgb8();
            return rgb.save(path);
        }
        self.buf.save(path)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width(), self.height())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.resolution().is_empty()
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Color {
        Color(self.buf.get_pixel(x, y).0)
    }

    /// # Panics
    ///
    /// Panics if `(x, y)` is out of bounds.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        self.buf.put_pixel(x, y, Rgba(color.0));
    }

    /// Returns the pixel at `(x, y)`, or `None` outside of the image.
    ///
    /// Accepts negative coordinates, which makes it convenient for sampling with a transform.
    #[inline]
    pub fn get_checked(&self, x: i64, y: i64) -> Option<Color> {
        let (x, y) = (u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        if x < self.width() && y < self.height() {
            Some(self.get(x, y))
        } else {
            None
        }
    }

    /// Returns a copy scaled to `res` with bilinear filtering.
    pub fn resized(&self, res: Resolution) -> Image {
        if res == self.resolution() {
            return self.clone();
        }
        if self.is_empty() {
            return Image::new(res.width(), res.height());
        }
        log::trace!("resize {} -> {}", self.resolution(), res);
        Image {
            buf: imageops::resize(
                &self.buf,
                res.width(),
                res.height(),
                imageops::FilterType::Triangle,
            ),
        }
    }

    /// Overwrites every pixel with `color`.
    pub fn clear(&mut self, color: Color) {
        for pix in self.buf.pixels_mut() {
            *pix = Rgba(color.0);
        }
    }

    /// Returns the pixels as interleaved RGBA bytes, row by row.
    #[inline]
    pub fn data(&self) -> &[u8] {
        self.buf.as_raw()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Image({})", self.resolution())
    }
}
