use crate::cgmath64::*;
use cgmath::AbsDiffEq;
use std::fmt::Debug;

/// general tolerance
pub const TOLERANCE: f64 = 1.0e-6;

/// general tolerance of square order
pub const TOLERANCE2: f64 = TOLERANCE * TOLERANCE;

/// Defines a tolerance in the whole package
pub trait Tolerance: AbsDiffEq<Epsilon = f64> + Debug {
    /// The "distance" is less than `TOLERANCE`.
    fn near(&self, other: &Self) -> bool { self.abs_diff_eq(other, TOLERANCE) }

    /// The "distance" is less than `TOLERANCE2`.
    fn near2(&self, other: &Self) -> bool { self.abs_diff_eq(other, TOLERANCE2) }
}

impl<T: AbsDiffEq<Epsilon = f64> + Debug> Tolerance for T {}

/// Asserts that `left.near(&right)` (using `Tolerance`).
#[macro_export]
macro_rules! assert_near {
    ($left: expr, $right: expr $(,)?) => {{
        let (left, right) = ($left, $right);
        assert!(
            $crate::tolerance::Tolerance::near(&left, &right),
            "assertion failed: `left` is near `right`\nleft: {left:?},\nright: {right:?}",
        )
    }};
    ($left: expr, $right: expr, $($arg: tt)+) => {{
        let (left, right) = ($left, $right);
        assert!(
            $crate::tolerance::Tolerance::near(&left, &right),
            "assertion failed: `left` is near `right`\nleft: {left:?},\nright: {right:?}: {}",
            format_args!($($arg)+),
        )
    }};
}

/// The structs defined the origin. `f64`, `Vector`, and so on.
pub trait Origin: Tolerance + Zero {
    /// near origin
    #[inline(always)]
    fn so_small(&self) -> bool { self.near(&Self::zero()) }

    /// near origin in square order
    #[inline(always)]
    fn so_small2(&self) -> bool { self.near2(&Self::zero()) }
}

impl<T: Tolerance + Zero> Origin for T {}

/// Compares two scalars against an explicit, model-scaled tolerance.
#[inline(always)]
pub fn same_value(a: f64, b: f64, tiny: f64) -> bool { (a - b).abs() <= tiny }

/// Whether two points coincide under an explicit, model-scaled tolerance.
#[inline(always)]
pub fn same_point(p: Point3, q: Point3, tiny: f64) -> bool {
    same_value(p.x, q.x, tiny) && same_value(p.y, q.y, tiny) && same_value(p.z, q.z, tiny)
}

/// Whether two points coincide in map view under an explicit tolerance.
#[inline(always)]
pub fn same_point_xy(p: Point2, q: Point2, tiny: f64) -> bool {
    same_value(p.x, q.x, tiny) && same_value(p.y, q.y, tiny)
}

#[test]
#[should_panic]
fn assert_near_without_msg() { assert_near!(1.0, 2.0) }

#[test]
fn same_point_scaled() {
    let p = Point3::new(100.0, 200.0, 300.0);
    let q = Point3::new(100.4, 200.0, 299.7);
    assert!(same_point(p, q, 0.5));
    assert!(!same_point(p, q, 0.2));
}
