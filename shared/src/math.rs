use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// A point or vector in 2D world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    /// Value along the y-axis.
    /// Positive direction is up.
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians), scaled by `magnitude`.
    pub fn from_angle(angle: f32, magnitude: f32) -> Self {
        Self {
            x: angle.cos() * magnitude,
            y: angle.sin() * magnitude,
        }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the normalized vector.
    pub fn normalize(&self) -> Point {
        let mag = self.magnitude();
        if mag == 0.0 {
            Point::ZERO
        } else {
            Point {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    /// Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Point {
        Point {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    pub fn dot(&self, other: &Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        (*other - *self).magnitude()
    }

    /// Angle of the vector in radians, measured from the positive x-axis.
    pub fn angle(&self) -> f32 {
        self.y.atan2(self.x)
    }

    /// Rotates the vector counter-clockwise by `angle` radians.
    pub fn rotate(&self, angle: f32) -> Point {
        if angle == 0.0 {
            return *self;
        }
        let (sin, cos) = angle.sin_cos();
        Point {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, other: Point) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Point {
    fn sub_assign(&mut self, other: Point) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f32> for Point {
    type Output = Point;

    fn mul(self, scalar: f32) -> Point {
        self.scale(scalar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_magnitude_and_normalize() {
        let v = Point::new(3.0, 4.0);
        assert_eq!(v.magnitude(), 5.0);

        let n = v.normalize();
        assert_approx_eq!(n.x, 0.6, 1e-6);
        assert_approx_eq!(n.y, 0.8, 1e-6);

        assert_eq!(Point::ZERO.normalize(), Point::ZERO);
    }

    #[test]
    fn test_operators() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(-3.0, 0.5);
        assert_eq!(a + b, Point::new(-2.0, 2.5));
        assert_eq!(a - b, Point::new(4.0, 1.5));
        assert_eq!(a * 2.0, Point::new(2.0, 4.0));
        assert_eq!(a.dot(&b), -2.0);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Point::new(1.0, 0.0).rotate(std::f32::consts::FRAC_PI_2);
        assert_approx_eq!(v.x, 0.0, 1e-6);
        assert_approx_eq!(v.y, 1.0, 1e-6);
    }

    #[test]
    fn test_from_angle_round_trips_angle() {
        let v = Point::from_angle(1.25, 10.0);
        assert_approx_eq!(v.angle(), 1.25, 1e-5);
        assert_approx_eq!(v.magnitude(), 10.0, 1e-4);
    }
}
