// -----------------------------------------------------------------------------
// Rasterization & blending
// -----------------------------------------------------------------------------
use std::sync::Arc;

use super::{Canvas, Color, Point, Polygon};
use super::geom::winding_number;

/// Alpha-over in 8-bit fixed point. The foreground alpha is biased by +1 so
/// the weights sum to exactly 256 and the divide becomes a shift; the
/// result is always fully opaque.
#[inline]
pub fn composite_over(fg: Color, bg: Color) -> Color {
    let a = fg.a as u32 + 1; // 1..=256
    let ia = 256 - a;
    let mix = |f: u8, b: u8| ((a * f as u32 + ia * b as u32) >> 8) as u8;
    Color {
        r: mix(fg.r, bg.r),
        g: mix(fg.g, bg.g),
        b: mix(fg.b, bg.b),
        a: 255,
    }
}

/// Composite `color` onto the pixel at (x, y). Coordinates must be in bounds.
#[inline]
pub fn plot(x: usize, y: usize, color: Color, canvas: &mut Canvas) {
    let i = canvas.pixel_offset(x, y);
    let px = &mut canvas.pixels_mut()[i..i + 4];
    let out = composite_over(color, Color::new(px[0], px[1], px[2], px[3]));
    px.copy_from_slice(&out.to_array());
}

/// Fill the whole canvas with a solid background color.
pub fn fill_background(canvas: &mut Canvas, color: Color) {
    let rgba = color.to_array();
    for px in canvas.pixels_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

/// Every pixel of the clipped bbox whose winding number is non-zero, row-major.
pub fn scan_interior(polygon: &Polygon, canvas_w: usize, canvas_h: usize) -> Vec<Point> {
    let bbox = polygon.bbox_px(canvas_w, canvas_h);
    if bbox.is_empty() {
        return Vec::new();
    }
    let vertices = polygon.vertices();
    let mut out = Vec::with_capacity(bbox.w * bbox.h / 2);
    for y in bbox.y..bbox.y + bbox.h {
        for x in bbox.x..bbox.x + bbox.w {
            let p = Point::new(x as i32, y as i32);
            if winding_number(p, vertices) != 0 {
                out.push(p);
            }
        }
    }
    out
}

/// Composite one polygon onto `canvas`. Replays the cached interior when the
/// polygon has one, otherwise scans its bbox and records the cache.
pub fn rasterize_polygon(polygon: &Polygon, canvas: &mut Canvas) {
    let (w, h) = (canvas.width(), canvas.height());
    let color = polygon.color();
    let interior = polygon.interior_or_init(|| scan_interior(polygon, w, h));
    for p in interior {
        plot(p.x as usize, p.y as usize, color, canvas);
    }
}

/// Background first, then polygons in sequence order (later ones on top).
pub fn render_polygons(polygons: &[Arc<Polygon>], background: Color, canvas: &mut Canvas) {
    fill_background(canvas, background);
    for polygon in polygons {
        rasterize_polygon(polygon, canvas);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn color() -> impl Strategy<Value = Color> {
        any::<[u8; 4]>().prop_map(Color::from_array)
    }

    proptest! {
        #[test]
        fn prop_composite_is_opaque(fg in color(), bg in color()) {
            prop_assert_eq!(composite_over(fg, bg).a, 255);
        }

        #[test]
        fn prop_transparent_fg_keeps_background(fg in color(), bg in color()) {
            let fg = Color { a: 0, ..fg };
            let out = composite_over(fg, bg);
            // (fg + 255*bg) >> 8 never drifts by more than one step
            for (o, b) in [(out.r, bg.r), (out.g, bg.g), (out.b, bg.b)] {
                prop_assert!((o as i32 - b as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_composite_exact_values() {
        let out = composite_over(Color::new(0, 0, 0, 0), Color::new(200, 100, 50, 255));
        assert_eq!(out, Color::new(199, 99, 49, 255));

        // a=255 -> weight 256, foreground wins exactly
        let out = composite_over(Color::new(12, 34, 56, 255), Color::new(200, 100, 50, 7));
        assert_eq!(out, Color::new(12, 34, 56, 255));

        // a=127 -> weight 128, even split
        let out = composite_over(Color::new(100, 0, 255, 127), Color::new(0, 100, 255, 255));
        assert_eq!(out, Color::new(50, 50, 255, 255));
    }

    #[test]
    fn test_plot_touches_one_pixel() {
        let mut canvas = Canvas::new(3, 2);
        fill_background(&mut canvas, Color::WHITE);
        plot(1, 1, Color::new(0, 0, 0, 255), &mut canvas);
        assert_eq!(canvas.pixel(1, 1), Color::new(0, 0, 0, 255));
        assert_eq!(canvas.pixel(0, 1), Color::WHITE);
        assert_eq!(canvas.pixel(1, 0), Color::WHITE);
    }

    #[test]
    fn test_rasterize_fills_square_interior() {
        let mut canvas = Canvas::new(8, 8);
        fill_background(&mut canvas, Color::WHITE);
        let sq = Polygon::new(
            vec![Point::new(2, 2), Point::new(6, 2), Point::new(6, 6), Point::new(2, 6)],
            Color::new(0, 0, 0, 255),
        )
        .unwrap();
        rasterize_polygon(&sq, &mut canvas);
        // half-open: rows/cols 2..6
        for y in 0..8 {
            for x in 0..8 {
                let inside = (2..6).contains(&x) && (2..6).contains(&y);
                let expect = if inside { Color::BLACK } else { Color::WHITE };
                assert_eq!(canvas.pixel(x, y), expect, "pixel ({x},{y})");
            }
        }
        assert!(sq.has_cached_interior());
        assert_eq!(sq.cached_interior().map(<[Point]>::len), Some(16));
    }

    #[test]
    fn test_cached_replay_matches_fresh_scan() {
        let mut poly = Polygon::new(
            vec![Point::new(1, 0), Point::new(14, 3), Point::new(9, 12), Point::new(0, 9), Point::new(6, 5)],
            Color::new(40, 80, 120, 90),
        )
        .unwrap();
        let mut first = Canvas::new(16, 16);
        rasterize_polygon(&poly, &mut first);
        let cached: Vec<Point> = poly.cached_interior().unwrap().to_vec();

        // color-only edit keeps the cache; replay must cover the same pixels
        poly.set_color(Color::new(250, 10, 10, 200));
        assert!(poly.has_cached_interior());
        assert_eq!(cached, scan_interior(&poly, 16, 16));

        let mut replayed = Canvas::new(16, 16);
        rasterize_polygon(&poly, &mut replayed);
        let mut fresh = Canvas::new(16, 16);
        let mut uncached = poly.clone();
        uncached.invalidate_interior();
        rasterize_polygon(&uncached, &mut fresh);
        assert_eq!(replayed, fresh);
    }

    #[test]
    fn test_vertex_on_far_edge_is_clipped() {
        // Vertex jitter may land on x == width; the scan must stay in bounds.
        let poly = Polygon::new(
            vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 4)],
            Color::BLACK,
        )
        .unwrap();
        let mut canvas = Canvas::new(4, 4);
        rasterize_polygon(&poly, &mut canvas);
        assert!(poly.cached_interior().unwrap().iter().all(|p| p.x < 4 && p.y < 4));
    }

    #[test]
    fn test_later_polygons_draw_on_top() {
        let full = |c: Color| {
            Arc::new(
                Polygon::new(
                    vec![Point::new(0, 0), Point::new(4, 0), Point::new(4, 4), Point::new(0, 4)],
                    c,
                )
                .unwrap(),
            )
        };
        let mut canvas = Canvas::new(4, 4);
        let red = Color::new(255, 0, 0, 255);
        let blue = Color::new(0, 0, 255, 255);
        render_polygons(&[full(red), full(blue)], Color::WHITE, &mut canvas);
        assert_eq!(canvas.pixel(1, 1), blue);
        render_polygons(&[full(blue), full(red)], Color::WHITE, &mut canvas);
        assert_eq!(canvas.pixel(1, 1), red);
    }
}
