use std::{
    fmt,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use approx::{AbsDiffEq, RelativeEq};

/// Creates a [`Point`] from its coordinates.
#[inline]
pub const fn point(x: f32, y: f32) -> Point {
    Point { x, y }
}

/// An immutable 2D point or vector.
///
/// Arithmetic is available through the operator traits (`+`, `-`, unary `-`, and `* f32`), and
/// through the named methods below. All operations return new values.
#[derive(Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = point(0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Multiplies both coordinates by `factor`.
    #[inline]
    #[must_use]
    pub fn scale(self, factor: f32) -> Self {
        point(self.x * factor, self.y * factor)
    }

    /// Rotates this point around the origin by `radians`.
    ///
    /// This applies the rotation matrix `[cos -sin; sin cos]`. Since Y points down, positive angles
    /// rotate clockwise on screen.
    #[must_use]
    pub fn rotate(self, radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        point(
            self.x * cos - self.y * sin,
            self.x * sin + self.y * cos,
        )
    }

    /// Reflects this point across the X axis by negating its Y coordinate.
    #[inline]
    #[must_use]
    pub fn reflect_x_axis(self) -> Self {
        point(self.x, -self.y)
    }

    /// Returns the length of this vector.
    #[inline]
    pub fn magnitude(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    /// Returns the Z component of the 3D cross product of `self` and `other`.
    #[inline]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    /// Returns `true` if both coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Computes the arithmetic mean of `points`.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn centroid<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut sum = Point::ZERO;
        let mut count = 0usize;
        for p in points {
            sum += p;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(sum.scale(1.0 / count as f32))
    }

    /// Returns the Euclidean distance between `a` and `b`.
    #[inline]
    pub fn distance(a: Self, b: Self) -> f32 {
        (b - a).magnitude()
    }

    /// Returns the angle of the vector pointing from `a` to `b`, in radians.
    ///
    /// This is a four-quadrant angle in range `-π..=π`, computed with [`f32::atan2`]. Swapping the
    /// arguments yields an angle that differs by `π`.
    #[inline]
    pub fn angle_between(a: Self, b: Self) -> f32 {
        let v = b - a;
        v.y.atan2(v.x)
    }

    /// Returns the slope angle of the line through `a` and `b`, in radians.
    ///
    /// Unlike [`Point::angle_between`], this is computed as `atan(dy / dx)` and only covers
    /// `-π/2..=π/2`: the direction of the line is lost, so swapping the arguments returns the same
    /// angle. Vertical lines yield `±π/2` depending on the sign of the zero in `dx`.
    #[inline]
    pub fn slope_angle_between(a: Self, b: Self) -> f32 {
        let v = b - a;
        (v.y / v.x).atan()
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<[f32; 2]> for Point {
    #[inline]
    fn from([x, y]: [f32; 2]) -> Self {
        point(x, y)
    }
}

impl From<(f32, f32)> for Point {
    #[inline]
    fn from((x, y): (f32, f32)) -> Self {
        point(x, y)
    }
}

impl From<Point> for [f32; 2] {
    #[inline]
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        point(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        point(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Point {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for Point {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        point(-self.x, -self.y)
    }
}

impl Mul<f32> for Point {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        self.scale(rhs)
    }
}

impl AbsDiffEq for Point {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}

impl RelativeEq for Point {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::{FRAC_PI_2, PI};

    use approx::assert_abs_diff_eq;

    use super::*;

    fn random_point(rng: &mut fastrand::Rng) -> Point {
        point(rng.f32() * 2000.0 - 1000.0, rng.f32() * 2000.0 - 1000.0)
    }

    #[test]
    fn rotate_quarter_turn() {
        // X axis rotates onto the Y axis, which points down on screen (clockwise).
        assert_abs_diff_eq!(point(1.0, 0.0).rotate(FRAC_PI_2), point(0.0, 1.0), epsilon = 1e-6);
        assert_abs_diff_eq!(point(0.0, 1.0).rotate(FRAC_PI_2), point(-1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn rotate_round_trip() {
        let mut rng = fastrand::Rng::with_seed(0x5eed);
        for _ in 0..1000 {
            let p = random_point(&mut rng);
            let angle = rng.f32() * 4.0 * PI - 2.0 * PI;
            let back = p.rotate(angle).rotate(-angle);
            assert_abs_diff_eq!(back, p, epsilon = 1e-2);
            assert_abs_diff_eq!(p.rotate(angle).magnitude(), p.magnitude(), epsilon = 1e-2);
        }
    }

    #[test]
    fn centroid() {
        assert_eq!(Point::centroid(std::iter::empty()), None);
        assert_eq!(Point::centroid([point(3.0, -4.0)]), Some(point(3.0, -4.0)));
        assert_eq!(
            Point::centroid([point(0.0, 0.0), point(2.0, 0.0), point(2.0, 2.0), point(0.0, 2.0)]),
            Some(point(1.0, 1.0)),
        );

        let mut rng = fastrand::Rng::with_seed(7);
        let points = (0..50).map(|_| random_point(&mut rng)).collect::<Vec<_>>();
        let mean_x = points.iter().map(|p| p.x).sum::<f32>() / points.len() as f32;
        let mean_y = points.iter().map(|p| p.y).sum::<f32>() / points.len() as f32;
        assert_abs_diff_eq!(
            Point::centroid(points.iter().copied()).unwrap(),
            point(mean_x, mean_y),
            epsilon = 1e-2
        );
    }

    #[test]
    fn reflect() {
        assert_eq!(point(3.0, 4.0).reflect_x_axis(), point(3.0, -4.0));
        assert_eq!(point(3.0, 4.0).reflect_x_axis().reflect_x_axis(), point(3.0, 4.0));
    }

    #[test]
    fn distance() {
        assert_eq!(Point::distance(point(1.0, 1.0), point(4.0, 5.0)), 5.0);
        assert_eq!(Point::distance(point(4.0, 5.0), point(1.0, 1.0)), 5.0);
        assert_eq!(point(3.0, 4.0).magnitude(), 5.0);
    }

    #[test]
    fn angle_between_is_four_quadrant() {
        let a = point(100.0, 150.0);
        let b = point(200.0, 130.0);
        let ab = Point::angle_between(a, b);
        let ba = Point::angle_between(b, a);
        assert!(ab < 0.0);
        assert_abs_diff_eq!(ab, (-20.0f32 / 100.0).atan(), epsilon = 1e-6);
        // Reversing the direction turns the vector by half a revolution, it does not negate.
        assert_abs_diff_eq!((ab - ba).abs(), PI, epsilon = 1e-5);

        assert_abs_diff_eq!(
            Point::angle_between(point(0.0, 0.0), point(0.0, 10.0)),
            FRAC_PI_2,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(
            Point::angle_between(point(0.0, 0.0), point(-10.0, 0.0)),
            PI,
            epsilon = 1e-6
        );
    }

    #[test]
    fn slope_angle_loses_direction() {
        let a = point(100.0, 150.0);
        let b = point(200.0, 130.0);
        // Same as `angle_between` while the line points right...
        assert_abs_diff_eq!(
            Point::slope_angle_between(a, b),
            Point::angle_between(a, b),
            epsilon = 1e-6
        );
        // ...but symmetric in its arguments, so reversed eye orderings are indistinguishable.
        assert_eq!(
            Point::slope_angle_between(a, b),
            Point::slope_angle_between(b, a)
        );
        assert_abs_diff_eq!(
            Point::slope_angle_between(point(0.0, 0.0), point(0.0, 10.0)).abs(),
            FRAC_PI_2,
            epsilon = 1e-6
        );
    }
}
