/// A 2D coordinate in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from the origin in direction `angle` (radians).
    pub fn polar(radius: f64, angle: f64) -> Self {
        Self {
            x: radius * angle.cos(),
            y: radius * angle.sin(),
        }
    }

    /// Rotate counter-clockwise by `angle` radians about `center`.
    pub fn rotate_about(self, center: Point, angle: f64) -> Point {
        if angle == 0.0 {
            return self;
        }
        let (sin_a, cos_a) = angle.sin_cos();
        let dx = self.x - center.x;
        let dy = self.y - center.y;
        Point {
            x: center.x + dx * cos_a - dy * sin_a,
            y: center.y + dx * sin_a + dy * cos_a,
        }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Direction of this point seen from `center`, in radians.
    pub fn angle_about(self, center: Point) -> f64 {
        (self.y - center.y).atan2(self.x - center.x)
    }

    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point {
            x: 0.5 * (self.x + other.x),
            y: 0.5 * (self.y + other.y),
        }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_rotate_about_origin() {
        let p = Point::new(1.0, 0.0).rotate_about(Point::ORIGIN, FRAC_PI_2);
        assert_abs_diff_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_about_offset_center() {
        let c = Point::new(2.0, 3.0);
        let p = Point::new(3.0, 3.0).rotate_about(c, PI);
        assert_abs_diff_eq!(p.x, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 3.0, epsilon = 1e-12);
        // distance to the center is preserved
        assert_abs_diff_eq!(p.distance(c), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_negative_angle_is_clockwise() {
        let p = Point::new(0.0, 2.0).rotate_about(Point::ORIGIN, -FRAC_PI_2);
        assert_abs_diff_eq!(p.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_angle_about() {
        let c = Point::new(1.0, 1.0);
        assert_abs_diff_eq!(Point::new(1.0, 3.0).angle_about(c), FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(Point::new(-1.0, 1.0).angle_about(c), PI, epsilon = 1e-12);
    }
}
