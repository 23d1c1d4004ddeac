use crate::{point, Point};

/// An axis-aligned bounding box, described by its minimum and maximum corner.
///
/// A [`BoundingBox`] always satisfies `min.x <= max.x` and `min.y <= max.y`. Boxes with zero
/// width and/or height are allowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl BoundingBox {
    /// Creates a box spanning two opposing corners, given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            min: point(a.x.min(b.x), a.y.min(b.y)),
            max: point(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Computes the component-wise minimum and maximum of `points`.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_corners(first, first), |bb, p| Self {
            min: point(bb.min.x.min(p.x), bb.min.y.min(p.y)),
            max: point(bb.max.x.max(p.x), bb.max.y.max(p.y)),
        }))
    }

    #[inline]
    pub fn min(&self) -> Point {
        self.min
    }

    #[inline]
    pub fn max(&self) -> Point {
        self.max
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Returns the midpoint between the two corners.
    #[inline]
    pub fn center(&self) -> Point {
        (self.min + self.max).scale(0.5)
    }

    /// Returns the distance between the minimum and maximum corner.
    #[inline]
    pub fn diagonal(&self) -> f32 {
        Point::distance(self.min, self.max)
    }

    /// Returns the smallest box containing both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: point(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: point(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Returns a box with each side moved outwards by `dx` (left and right) or `dy` (top and
    /// bottom).
    ///
    /// Negative amounts shrink the box; it collapses onto its center instead of inverting.
    #[must_use]
    pub fn grow(&self, dx: f32, dy: f32) -> Self {
        let center = self.center();
        let half_w = (self.width() / 2.0 + dx).max(0.0);
        let half_h = (self.height() / 2.0 + dy).max(0.0);
        Self {
            min: point(center.x - half_w, center.y - half_h),
            max: point(center.x + half_w, center.y + half_h),
        }
    }

    /// Returns whether `p` lies inside or on the border of this box.
    pub fn contains(&self, p: Point) -> bool {
        (self.min.x..=self.max.x).contains(&p.x) && (self.min.y..=self.max.y).contains(&p.y)
    }

    /// Returns the 4 corners, clockwise (on screen) starting at the minimum corner.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.min,
            point(self.max.x, self.min.y),
            self.max,
            point(self.min.x, self.max.y),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_empty() {
        assert_eq!(BoundingBox::bounding(std::iter::empty()), None);
    }

    #[test]
    fn bounding_single() {
        let bb = BoundingBox::bounding([point(2.0, 3.0)]).unwrap();
        assert_eq!(bb.min(), point(2.0, 3.0));
        assert_eq!(bb.max(), point(2.0, 3.0));
        assert_eq!(bb.width(), 0.0);
        assert_eq!(bb.diagonal(), 0.0);
    }

    #[test]
    fn bounding_contains_all_points() {
        let mut rng = fastrand::Rng::with_seed(1234);
        for len in 1..40 {
            let points = (0..len)
                .map(|_| point(rng.f32() * 600.0 - 300.0, rng.f32() * 400.0))
                .collect::<Vec<_>>();
            let bb = BoundingBox::bounding(points.iter().copied()).unwrap();
            assert!(bb.min().x <= bb.max().x);
            assert!(bb.min().y <= bb.max().y);
            for p in &points {
                assert!(bb.contains(*p), "{:?} not in {:?}", p, bb);
            }
            // Each side is touched by at least one point.
            assert!(points.iter().any(|p| p.x == bb.min().x));
            assert!(points.iter().any(|p| p.y == bb.max().y));
        }
    }

    #[test]
    fn union_and_diagonal() {
        let a = BoundingBox::from_corners(point(0.0, 0.0), point(1.0, 1.0));
        let b = BoundingBox::from_corners(point(4.0, 4.0), point(3.0, 2.0));
        let u = a.union(&b);
        assert_eq!(u.min(), point(0.0, 0.0));
        assert_eq!(u.max(), point(4.0, 4.0));
        assert_eq!(
            BoundingBox::from_corners(point(0.0, 0.0), point(3.0, 4.0)).diagonal(),
            5.0
        );
    }

    #[test]
    fn grow() {
        let bb = BoundingBox::from_corners(point(10.0, 10.0), point(20.0, 14.0));
        let grown = bb.grow(5.0, 1.0);
        assert_eq!(grown.min(), point(5.0, 9.0));
        assert_eq!(grown.max(), point(25.0, 15.0));
        assert_eq!(grown.center(), bb.center());

        let collapsed = bb.grow(-100.0, -100.0);
        assert_eq!(collapsed.min(), bb.center());
        assert_eq!(collapsed.max(), bb.center());
    }
}
