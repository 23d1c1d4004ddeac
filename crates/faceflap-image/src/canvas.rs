//! A 2D drawing context in the style of the HTML canvas.

use std::sync::Arc;

use faceflap_linalg::{point, Affine, BoundingBox, Point};

use crate::{BlendMode, Color, FillRule, Image, Mask, Path, Resolution};

/// Drawing state that is saved and restored by [`Canvas::save`] and [`Canvas::restore`].
#[derive(Debug, Clone)]
struct State {
    transform: Affine,
    /// `None` means "no clipping".
    clip: Option<Arc<Mask>>,
    fill: Color,
}

impl Default for State {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            clip: None,
            fill: Color::BLACK,
        }
    }
}

/// A drawing surface with a transform stack, clipping, and path filling.
///
/// All operations that draw onto the canvas map their input through the current transform and
/// only touch pixels inside of the current clip region.
///
/// Every [`Canvas::save`] should be paired with a [`Canvas::restore`]. [`Canvas::scoped`] does
/// this automatically.
#[derive(Debug)]
pub struct Canvas {
    image: Image,
    state: State,
    stack: Vec<State>,
}

impl Canvas {
    /// Creates a canvas of the given size, initialized to transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(Image::new(width, height))
    }

    /// Creates a canvas that draws onto `image`.
    pub fn from_image(image: Image) -> Self {
        Self {
            image,
            state: State::default(),
            stack: Vec::new(),
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.image.resolution()
    }

    /// Returns the canvas contents.
    #[inline]
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Returns the canvas contents for direct modification, bypassing transform and clip.
    #[inline]
    pub fn image_mut(&mut self) -> &mut Image {
        &mut self.image
    }

    pub fn into_image(self) -> Image {
        self.image
    }

    /// Resizes the canvas.
    ///
    /// Like resizing an HTML canvas, this discards the contents and resets all drawing state,
    /// including saved states. Resizing to the current size is a no-op.
    pub fn resize(&mut self, res: Resolution) {
        if res == self.resolution() {
            return;
        }
        log::trace!("resizing canvas {} -> {}", self.resolution(), res);
        self.image = Image::new(res.width(), res.height());
        self.state = State::default();
        self.stack.clear();
    }

    /// Sets every pixel to `color`, ignoring transform and clip.
    pub fn clear(&mut self, color: Color) {
        self.image.clear(color);
    }

    /// Pushes the current drawing state onto the state stack.
    pub fn save(&mut self) {
        self.stack.push(self.state.clone());
    }

    /// Pops the most recently saved drawing state and makes it current.
    ///
    /// If no state was saved, this does nothing.
    pub fn restore(&mut self) {
        match self.stack.pop() {
            Some(state) => self.state = state,
            None => log::trace!("`restore` called without matching `save`"),
        }
    }

    /// Returns the number of saved states.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Runs `f` between a [`Canvas::save`] and [`Canvas::restore`].
    pub fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let depth = self.depth();
        self.save();
        let result = f(self);
        // Also unwinds any unbalanced `save` calls made by `f`.
        while self.depth() > depth {
            self.restore();
        }
        result
    }

    /// Returns the current transformation matrix.
    #[inline]
    pub fn transform(&self) -> Affine {
        self.state.transform
    }

    /// Replaces the current transformation matrix.
    pub fn set_transform(&mut self, transform: Affine) {
        self.state.transform = transform;
    }

    /// Multiplies the current transform with `transform` (applied before the existing transform).
    pub fn apply_transform(&mut self, transform: Affine) {
        self.state.transform = self.state.transform * transform;
    }

    pub fn translate(&mut self, offset: Point) {
        self.apply_transform(Affine::translation(offset));
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.apply_transform(Affine::scaling(sx, sy));
    }

    /// Rotates subsequent drawing operations by `radians` (clockwise on screen).
    pub fn rotate(&mut self, radians: f32) {
        self.apply_transform(Affine::rotation(radians));
    }

    #[inline]
    pub fn fill_color(&self) -> Color {
        self.state.fill
    }

    pub fn set_fill_color(&mut self, color: Color) {
        self.state.fill = color;
    }

    /// Returns whether a clip region is active.
    #[inline]
    pub fn is_clipped(&self) -> bool {
        self.state.clip.is_some()
    }

    /// Returns whether the pixel at `(x, y)` lies inside of the current clip region.
    #[inline]
    pub fn is_visible(&self, x: u32, y: u32) -> bool {
        x < self.width()
            && y < self.height()
            && self.state.clip.as_ref().map_or(true, |clip| clip.get(x, y))
    }

    /// Fills `path` (mapped through the current transform) with the current fill color.
    pub fn fill(&mut self, path: &Path, rule: FillRule) {
        let mask = path
            .transformed(&self.state.transform)
            .rasterize(self.resolution(), rule);
        let color = self.state.fill;
        for y in 0..self.height() {
            for x in 0..self.width() {
                if mask.get(x, y) && self.is_visible(x, y) {
                    let dest = self.image.get(x, y);
                    self.image.set(x, y, BlendMode::Alpha.apply(dest, color));
                }
            }
        }
    }

    /// Intersects the current clip region with `path` (mapped through the current transform).
    ///
    /// The clip region can only shrink; use [`Canvas::save`] and [`Canvas::restore`] to undo it.
    pub fn clip(&mut self, path: &Path, rule: FillRule) {
        let mut mask = path
            .transformed(&self.state.transform)
            .rasterize(self.resolution(), rule);
        if let Some(clip) = &self.state.clip {
            mask.intersect(clip);
        }
        log::trace!("clip: {} pixels visible", mask.count());
        self.state.clip = Some(Arc::new(mask));
    }

    /// Draws `src` with its top left corner at `(x, y)`, mapped through the current transform.
    ///
    /// Pixels are sampled with nearest-neighbor filtering and alpha blended onto the canvas. Only
    /// pixels inside of the current clip region are modified.
    pub fn draw_image(&mut self, src: &Image, x: f32, y: f32) {
        if src.is_empty() {
            return;
        }
        let transform = self.state.transform * Affine::translation(point(x, y));
        let Some(inverse) = transform.inverse() else {
            log::trace!("draw_image: singular transform {:?}", transform);
            return;
        };

        // Only visit the destination pixels that the transformed source can cover.
        let corners = BoundingBox::from_corners(
            Point::ZERO,
            point(src.width() as f32, src.height() as f32),
        )
        .corners()
        .map(|c| transform.apply(c));
        let Some(bounds) = BoundingBox::bounding(corners) else {
            return;
        };
        let x_range = pixel_range(bounds.min().x, bounds.max().x, self.width());
        let y_range = pixel_range(bounds.min().y, bounds.max().y, self.height());

        for dy in y_range {
            for dx in x_range.clone() {
                if !self.is_visible(dx, dy) {
                    continue;
                }
                let s = inverse.apply(point(dx as f32 + 0.5, dy as f32 + 0.5));
                let Some(color) = src.get_checked(s.x.floor() as i64, s.y.floor() as i64) else {
                    continue;
                };
                let dest = self.image.get(dx, dy);
                self.image.set(dx, dy, BlendMode::Alpha.apply(dest, color));
            }
        }
    }
}

/// Returns the range of pixel indices below `limit` whose centers may lie in `min..max`.
fn pixel_range(min: f32, max: f32, limit: u32) -> std::ops::Range<u32> {
    let limit = limit as f32;
    let start = (min - 0.5).floor().clamp(0.0, limit) as u32;
    let end = (max + 0.5).ceil().clamp(0.0, limit) as u32;
    start..end
}
