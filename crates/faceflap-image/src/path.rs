//! Polygonal paths and their rasterization.

use faceflap_linalg::{Affine, BoundingBox, Point};

use crate::Resolution;

/// Rule used to decide which points are inside of a (possibly self-intersecting) [`Path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillRule {
    /// A point is inside if the path winds around it a non-zero number of times.
    #[default]
    NonZero,
    /// A point is inside if a ray from it crosses the path an odd number of times.
    ///
    /// Regions covered twice (for example, by a shape and its mirror image) are treated as outside.
    EvenOdd,
}

/// A path made of straight line segments.
///
/// A path consists of any number of *subpaths*. Every subpath is implicitly closed when the path
/// is filled or used as a clip region, the same way an HTML canvas treats open subpaths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    subpaths: Vec<Vec<Point>>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a path containing a single closed polygon.
    pub fn polygon<I: IntoIterator<Item = Point>>(points: I) -> Self {
        let mut this = Self::new();
        this.subpaths.push(points.into_iter().collect());
        this
    }

    /// Creates a path containing the 4 corners of `rect`.
    pub fn rect(rect: &BoundingBox) -> Self {
        Self::polygon(rect.corners())
    }

    /// Starts a new subpath at `p`.
    pub fn move_to(&mut self, p: Point) -> &mut Self {
        self.subpaths.push(vec![p]);
        self
    }

    /// Adds a line segment from the last point to `p`.
    ///
    /// If there is no current subpath, this behaves like [`Path::move_to`].
    pub fn line_to(&mut self, p: Point) -> &mut Self {
        match self.subpaths.last_mut() {
            Some(subpath) => subpath.push(p),
            None => self.subpaths.push(vec![p]),
        }
        self
    }

    /// Closes the current subpath. Subsequent [`Path::line_to`] calls start a new subpath at the
    /// same starting point.
    pub fn close(&mut self) -> &mut Self {
        if let Some(start) = self.subpaths.last().and_then(|sp| sp.first()).copied() {
            self.subpaths.push(vec![start]);
        }
        self
    }

    /// Returns `true` if the path contains no points.
    pub fn is_empty(&self) -> bool {
        self.subpaths.iter().all(|sp| sp.is_empty())
    }

    /// Returns an iterator over all points of the path, in order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.subpaths.iter().flatten().copied()
    }

    /// Returns the bounding box of all points in the path, or [`None`] if the path is empty.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::bounding(self.points())
    }

    /// Returns a copy of this path with every point mapped through `transform`.
    ///
    /// Since affine transforms map lines to lines, this is exact.
    #[must_use]
    pub fn transformed(&self, transform: &Affine) -> Self {
        Self {
            subpaths: self
                .subpaths
                .iter()
                .map(|sp| sp.iter().map(|p| transform.apply(*p)).collect())
                .collect(),
        }
    }

    /// Returns whether `p` lies inside of the path, according to `rule`.
    pub fn contains(&self, p: Point, rule: FillRule) -> bool {
        let mut winding = 0i32;
        for edge in self.edges() {
            if let Some((x, dir)) = edge.crossing(p.y) {
                if x < p.x {
                    winding += dir;
                }
            }
        }
        rule.is_inside(winding)
    }

    /// Rasterizes this path into a [`Mask`] of resolution `res`.
    ///
    /// A pixel is covered if its center lies inside of the path.
    pub fn rasterize(&self, res: Resolution, rule: FillRule) -> Mask {
        let mut mask = Mask::empty(res);
        let edges = self.edges().collect::<Vec<_>>();
        if edges.is_empty() {
            return mask;
        }

        let mut crossings = Vec::new();
        for y in 0..res.height() {
            let yc = y as f32 + 0.5;
            crossings.clear();
            crossings.extend(edges.iter().filter_map(|edge| edge.crossing(yc)));
            if crossings.is_empty() {
                continue;
            }
            crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut winding = 0;
            for pair in crossings.windows(2) {
                let (x0, dir) = pair[0];
                let (x1, _) = pair[1];
                winding += dir;
                if rule.is_inside(winding) {
                    mask.fill_span(y, x0, x1);
                }
            }
        }
        mask
    }

    fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.subpaths
            .iter()
            .filter(|sp| sp.len() > 1)
            .flat_map(|sp| {
                let closing = Edge {
                    from: sp[sp.len() - 1],
                    to: sp[0],
                };
                sp.windows(2)
                    .map(|w| Edge {
                        from: w[0],
                        to: w[1],
                    })
                    .chain(std::iter::once(closing))
            })
    }
}

impl FillRule {
    #[inline]
    fn is_inside(self, winding: i32) -> bool {
        match self {
            FillRule::NonZero => winding != 0,
            FillRule::EvenOdd => winding % 2 != 0,
        }
    }
}

#[derive(Clone, Copy)]
struct Edge {
    from: Point,
    to: Point,
}

impl Edge {
    /// Computes where this edge crosses the horizontal line at `y`, and its winding direction.
    ///
    /// Uses a half-open rule (`min.y <= y < max.y`) so shared vertices are only counted once.
    fn crossing(&self, y: f32) -> Option<(f32, i32)> {
        let (from, to) = (self.from, self.to);
        let dir = if from.y < to.y {
            1
        } else if from.y > to.y {
            -1
        } else {
            return None;
        };
        let (lo, hi) = if dir > 0 { (from, to) } else { (to, from) };
        if y < lo.y || y >= hi.y {
            return None;
        }
        let t = (y - lo.y) / (hi.y - lo.y);
        let x = lo.x + t * (hi.x - lo.x);
        if !x.is_finite() {
            return None;
        }
        Some((x, dir))
    }
}

/// A 1-bit coverage mask.
#[derive(Clone, PartialEq, Eq)]
pub struct Mask {
    res: Resolution,
    bits: Vec<bool>,
}

impl Mask {
    /// Creates a mask of resolution `res` that covers no pixels.
    pub fn empty(res: Resolution) -> Self {
        Self {
            res,
            bits: vec![false; res.num_pixels() as usize],
        }
    }

    /// Creates a mask of resolution `res` that covers every pixel.
    pub fn full(res: Resolution) -> Self {
        Self {
            res,
            bits: vec![true; res.num_pixels() as usize],
        }
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.res
    }

    /// Returns whether the pixel at `(x, y)` is covered. Pixels outside of the mask never are.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.res.width() || y >= self.res.height() {
            return false;
        }
        self.bits[self.index(x, y)]
    }

    /// Returns the number of covered pixels.
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|b| **b).count()
    }

    /// Removes coverage from every pixel that is not also covered by `other`.
    pub fn intersect(&mut self, other: &Mask) {
        for y in 0..self.res.height() {
            for x in 0..self.res.width() {
                let i = self.index(x, y);
                self.bits[i] = self.bits[i] && other.get(x, y);
            }
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.res.width() as usize + x as usize
    }

    /// Covers every pixel in row `y` whose center lies in `x0..x1`.
    fn fill_span(&mut self, y: u32, x0: f32, x1: f32) {
        let width = self.res.width() as f32;
        let start = (x0 - 0.5).ceil().clamp(0.0, width) as u32;
        let end = (x1 - 0.5).ceil().clamp(0.0, width) as u32;
        for x in start..end {
            let i = self.index(x, y);
            self.bits[i] = true;
        }
    }
}

impl std::fmt::Debug for Mask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} Mask ({} covered)", self.res, self.count())
    }
}
