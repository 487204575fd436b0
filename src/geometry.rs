//! Screen-space hit geometry.
//!
//! Screen coordinates have their origin at the top left with y pointing down.
use glam::DVec2;

/// Axis a span geometry resolves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Along x: a vertical rule at `sx`.
    H,
    /// Along y: a horizontal rule at `sy`.
    V,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point {
        sx: f64,
        sy: f64,
    },
    Span {
        sx: f64,
        sy: f64,
        direction: Direction,
    },
    Rect {
        sx0: f64,
        sy0: f64,
        sx1: f64,
        sy1: f64,
    },
    Poly {
        sx: Vec<f64>,
        sy: Vec<f64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryKind {
    Point,
    Span,
    Rect,
    Poly,
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point { .. } => GeometryKind::Point,
            Self::Span { .. } => GeometryKind::Span,
            Self::Rect { .. } => GeometryKind::Rect,
            Self::Poly { .. } => GeometryKind::Poly,
        }
    }
}

/// Even-odd point in polygon test. The polygon is closed implicitly.
pub fn point_in_poly(x: f64, y: f64, xs: &[f64], ys: &[f64]) -> bool {
    let n = xs.len().min(ys.len());
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (xi, yi, xj, yj) = (xs[i], ys[i], xs[j], ys[j]);
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the segment `a`-`b`.
pub fn dist_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    let ab = b - a;
    let len2 = ab.length_squared();
    if len2 == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_odd_polygon() {
        let xs = [0.0, 10.0, 10.0, 0.0];
        let ys = [0.0, 0.0, 10.0, 10.0];
        assert!(point_in_poly(5.0, 5.0, &xs, &ys));
        assert!(!point_in_poly(15.0, 5.0, &xs, &ys));
        assert!(!point_in_poly(5.0, 5.0, &xs[..2], &ys[..2]));

        let xs = [0.0, 10.0, 10.0, 6.0, 6.0, 4.0, 4.0, 0.0];
        let ys = [0.0, 0.0, 10.0, 10.0, 4.0, 4.0, 10.0, 10.0];
        assert!(point_in_poly(2.0, 8.0, &xs, &ys));
        assert!(!point_in_poly(5.0, 8.0, &xs, &ys));
    }

    #[test]
    fn segment_distance() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(10.0, 0.0);
        assert_eq!(dist_to_segment(DVec2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(dist_to_segment(DVec2::new(-3.0, 4.0), a, b), 5.0);
        assert_eq!(dist_to_segment(DVec2::new(1.0, 1.0), a, a), 2f64.sqrt());
    }
}
