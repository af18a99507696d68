// src/engine/geom.rs
use std::cmp::{max, min};

use super::{IntRect, Point};

#[inline]
pub(crate) fn clamp_i32(v: i32, lo: i32, hi: i32) -> i32 {
    if v < lo {
        lo
    } else if v > hi {
        hi
    } else {
        v
    }
}

/// Min/max over a vertex list as `(min_x, max_x, min_y, max_y)`.
/// `None` for an empty list.
pub(crate) fn min_max_points(points: &[Point]) -> Option<(i32, i32, i32, i32)> {
    let first = points.first()?;
    let mut out = (first.x, first.x, first.y, first.y);
    for p in &points[1..] {
        out.0 = out.0.min(p.x);
        out.1 = out.1.max(p.x);
        out.2 = out.2.min(p.y);
        out.3 = out.3.max(p.y);
    }
    Some(out)
}

/// Inclusive pixel bbox of a vertex list, clipped to the canvas.
pub(crate) fn polygon_bbox_px(points: &[Point], canvas_w: usize, canvas_h: usize) -> IntRect {
    let Some((x0, x1, y0, y1)) = min_max_points(points) else {
        return IntRect::empty();
    };
    if canvas_w == 0 || canvas_h == 0 {
        return IntRect::empty();
    }
    // Fully off-canvas
    if x1 < 0 || y1 < 0 || x0 >= canvas_w as i32 || y0 >= canvas_h as i32 {
        return IntRect::empty();
    }
    let min_x = max(x0, 0) as usize;
    let min_y = max(y0, 0) as usize;
    let max_x = min(x1, canvas_w as i32 - 1) as usize;
    let max_y = min(y1, canvas_h as i32 - 1) as usize;
    IntRect {
        x: min_x,
        y: min_y,
        w: max_x - min_x + 1,
        h: max_y - min_y + 1,
    }
}

/// Sign of the 2D cross product: >0 when `p2` is left of the line p0→p1,
/// 0 when on it, <0 when right.
#[inline]
pub fn is_left(p0: Point, p1: Point, p2: Point) -> i64 {
    let (x0, y0) = (p0.x as i64, p0.y as i64);
    let (x1, y1) = (p1.x as i64, p1.y as i64);
    let (x2, y2) = (p2.x as i64, p2.y as i64);
    (x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0)
}

/// Winding number of `p` against the closed polygon `vertices`
/// (the last→first edge is implicit). Zero only when `p` is outside.
pub fn winding_number(p: Point, vertices: &[Point]) -> i32 {
    let n = vertices.len();
    if n == 0 {
        return 0;
    }
    let mut wn = 0;
    for i in 0..n {
        let v0 = vertices[i];
        let v1 = vertices[(i + 1) % n];
        if v0.y <= p.y {
            // upward crossing, p strictly left
            if v1.y > p.y && is_left(v0, v1, p) > 0 {
                wn += 1;
            }
        } else if v1.y <= p.y && is_left(v0, v1, p) < 0 {
            // downward crossing, p strictly right
            wn -= 1;
        }
    }
    wn
}

#[inline]
pub fn contains(p: Point, vertices: &[Point]) -> bool {
    winding_number(p, vertices) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![Point::new(0, 0), Point::new(10, 0), Point::new(10, 10), Point::new(0, 10)]
    }

    #[test]
    fn test_is_left_sign() {
        let a = Point::new(0, 0);
        let b = Point::new(10, 0);
        assert!(is_left(a, b, Point::new(5, 5)) > 0);
        assert_eq!(is_left(a, b, Point::new(20, 0)), 0);
        assert!(is_left(a, b, Point::new(5, -5)) < 0);
    }

    #[test]
    fn test_square_interior_points_are_inside() {
        let sq = square();
        for y in 1..10 {
            for x in 1..10 {
                assert_ne!(winding_number(Point::new(x, y), &sq), 0, "({x},{y}) should be inside");
            }
        }
    }

    #[test]
    fn test_square_exterior_points_are_outside() {
        let sq = square();
        for &(x, y) in &[(-1, 5), (11, 5), (5, -1), (5, 11), (-3, -3), (15, 15), (11, -1)] {
            assert_eq!(winding_number(Point::new(x, y), &sq), 0, "({x},{y}) should be outside");
        }
    }

    #[test]
    fn test_square_vertices_half_open() {
        // Only the min-y corner on the upward edge counts; the rest fall outside.
        let sq = square();
        assert_ne!(winding_number(Point::new(0, 0), &sq), 0);
        assert_eq!(winding_number(Point::new(10, 0), &sq), 0);
        assert_eq!(winding_number(Point::new(10, 10), &sq), 0);
        assert_eq!(winding_number(Point::new(0, 10), &sq), 0);
    }

    #[test]
    fn test_bow_tie_lobes_have_opposite_winding() {
        let bow = vec![Point::new(0, 0), Point::new(10, 10), Point::new(10, 0), Point::new(0, 10)];
        let left = winding_number(Point::new(2, 4), &bow);
        let right = winding_number(Point::new(8, 4), &bow);
        assert_ne!(left, 0);
        assert_ne!(right, 0);
        assert_eq!(left, -right);
        // Between the lobes, above the crossing
        assert_eq!(winding_number(Point::new(5, 2), &bow), 0);
    }

    #[test]
    fn test_bbox_clips_to_canvas() {
        let pts = vec![Point::new(-5, 2), Point::new(30, 4), Point::new(3, 20)];
        let r = polygon_bbox_px(&pts, 16, 8);
        assert_eq!(r, IntRect { x: 0, y: 2, w: 16, h: 6 });
    }

    #[test]
    fn test_bbox_off_canvas_is_empty() {
        let pts = vec![Point::new(20, 20), Point::new(30, 22), Point::new(25, 28)];
        assert!(polygon_bbox_px(&pts, 16, 16).is_empty());
    }

    #[test]
    fn test_clamp_i32() {
        assert_eq!(clamp_i32(-4, 0, 10), 0);
        assert_eq!(clamp_i32(14, 0, 10), 10);
        assert_eq!(clamp_i32(7, 0, 10), 7);
    }
}
