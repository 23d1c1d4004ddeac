//! Debug and notice overlays drawn directly onto [`Image`]s.
//!
//! Each function returns a guard that can be customized and draws when dropped. Overlays replace
//! the pixels they cover and ignore the transform and clip of any [`Canvas`][crate::Canvas].

use std::convert::Infallible;

use embedded_graphics::{
    draw_target::DrawTarget,
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text, TextStyleBuilder},
};
use faceflap_linalg::Point as LinalgPoint;
use itertools::Itertools;

use crate::{Color, Image};

fn pixel(p: LinalgPoint) -> Point {
    Point::new(p.x.round() as i32, p.y.round() as i32)
}

/// Draws `drawable` onto `image`, discarding pixels that fall outside of it.
fn paint<D: Drawable<Color = Color>>(image: &mut Image, drawable: &D) {
    match drawable.draw(&mut Target(image)) {
        Ok(_) => {}
        Err(infallible) => match infallible {},
    }
}

/// Guard returned by [`marker`].
pub struct DrawMarker<'a> {
    image: &'a mut Image,
    center: Point,
    color: Color,
    size: u32,
}

impl DrawMarker<'_> {
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Sets the width and height of the marker, which must be odd.
    ///
    /// The default is 5. A size of 1 draws a single pixel.
    pub fn size(&mut self, size: u32) -> &mut Self {
        assert!(size % 2 == 1, "marker size must be odd, got {size}");
        self.size = size;
        self
    }
}

impl Drop for DrawMarker<'_> {
    fn drop(&mut self) {
        let r = (self.size / 2) as i32;
        let c = self.center;
        if r == 0 {
            paint(self.image, &Pixel(c, self.color));
            return;
        }
        let style = PrimitiveStyle::with_stroke(self.color, 1);
        for (from, to) in [
            (c + Point::new(-r, -r), c + Point::new(r, r)),
            (c + Point::new(r, -r), c + Point::new(-r, r)),
        ] {
            paint(self.image, &Line::new(from, to).into_styled(style));
        }
    }
}

/// Guard returned by [`polyline`].
pub struct DrawPolyline<'a> {
    image: &'a mut Image,
    points: Vec<Point>,
    color: Color,
    closed: bool,
}

impl DrawPolyline<'_> {
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Also connects the last point to the first one (if there are more than 2 points).
    pub fn closed(&mut self, closed: bool) -> &mut Self {
        self.closed = closed;
        self
    }
}

impl Drop for DrawPolyline<'_> {
    fn drop(&mut self) {
        let style = PrimitiveStyle::with_stroke(self.color, 1);
        let closing = match self.points.as_slice() {
            [first, .., last] if self.closed && self.points.len() > 2 => Some((*last, *first)),
            _ => None,
        };
        let segments = self.points.iter().copied().tuple_windows().chain(closing);
        for (start, end) in segments {
            paint(self.image, &Line::new(start, end).into_styled(style));
        }
    }
}

/// Guard returned by [`text`].
pub struct DrawText<'a> {
    image: &'a mut Image,
    top_left: Point,
    text: &'a str,
    color: Color,
    background: Option<Color>,
}

impl DrawText<'_> {
    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    /// Fills the box covered by the text with `color` first, to keep it legible on any frame.
    pub fn background(&mut self, color: Color) -> &mut Self {
        self.background = Some(color);
        self
    }
}

impl Drop for DrawText<'_> {
    fn drop(&mut self) {
        let text = Text::with_text_style(
            self.text,
            self.top_left,
            MonoTextStyle::new(&FONT_10X20, self.color),
            TextStyleBuilder::new().baseline(Baseline::Top).build(),
        );
        if let Some(background) = self.background {
            let rect = text.bounding_box();
            paint(
                self.image,
                &rect.into_styled(PrimitiveStyle::with_fill(background)),
            );
        }
        paint(self.image, &text);
    }
}

/// Draws an `X`-shaped marker centered on `center`, to visualize landmarks.
pub fn marker(image: &mut Image, center: LinalgPoint) -> DrawMarker<'_> {
    DrawMarker {
        image,
        center: pixel(center),
        color: Color::RED,
        size: 5,
    }
}

/// Draws line segments connecting consecutive `points`.
pub fn polyline<I>(image: &mut Image, points: I) -> DrawPolyline<'_>
where
    I: IntoIterator<Item = LinalgPoint>,
{
    DrawPolyline {
        image,
        points: points.into_iter().map(pixel).collect(),
        color: Color::GREEN,
        closed: false,
    }
}

/// Draws a line of text whose top left corner is at `(x, y)`.
pub fn text<'a>(image: &'a mut Image, x: i32, y: i32, text: &'a str) -> DrawText<'a> {
    DrawText {
        image,
        top_left: Point::new(x, y),
        text,
        color: Color::WHITE,
        background: None,
    }
}

struct Target<'a>(&'a mut Image);

impl Dimensions for Target<'_> {
    fn bounding_box(&self) -> Rectangle {
        Rectangle::new(
            Point::zero(),
            Size::new(self.0.width(), self.0.height()),
        )
    }
}

impl DrawTarget for Target<'_> {
    type Color = Color;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Color>>,
    {
        let (width, height) = (self.0.width(), self.0.height());
        for Pixel(pos, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(pos.x), u32::try_from(pos.y)) else {
                continue;
            };
            if x < width && y < height {
                self.0.set(x, y, color);
            }
        }
        Ok(())
    }
}
