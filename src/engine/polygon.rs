// -----------------------------------------------------------------------------
// Polygon DNA
// -----------------------------------------------------------------------------

use std::sync::{Arc, OnceLock};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{Color, EngineError, IntRect, Point};
use super::geom::polygon_bbox_px;

pub const MIN_VERTICES: usize = 3;
pub const MAX_VERTICES: usize = 6;

/// Alpha given to freshly generated polygons.
pub const INITIAL_ALPHA: u8 = 75;

/// A filled polygon with 3-6 vertices and one RGBA fill.
///
/// The interior-pixel cache is filled by the first rasterization and shared
/// by clones; any vertex edit drops it, a color edit keeps it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Polygon {
    vertices: Vec<Point>,
    color: Color,

    #[serde(skip)]
    interior: OnceLock<Arc<[Point]>>,
}

impl PartialEq for Polygon {
    fn eq(&self, other: &Self) -> bool {
        self.vertices == other.vertices && self.color == other.color
    }
}

impl Polygon {
    pub fn new(vertices: Vec<Point>, color: Color) -> Result<Self, EngineError> {
        if !(MIN_VERTICES..=MAX_VERTICES).contains(&vertices.len()) {
            return Err(EngineError::InvalidGeometry { vertices: vertices.len() });
        }
        Ok(Self { vertices, color, interior: OnceLock::new() })
    }

    /// Random polygon of `order` vertices spread uniformly over a `width`x`height` canvas.
    /// `order` must already be validated.
    pub(crate) fn random<R: Rng>(rng: &mut R, order: usize, width: usize, height: usize) -> Self {
        debug_assert!((MIN_VERTICES..=MAX_VERTICES).contains(&order));
        let vertices = (0..order)
            .map(|_| Point::new(rng.gen_range(0..width as i32), rng.gen_range(0..height as i32)))
            .collect();
        let color = Color::new(rng.gen(), rng.gen(), rng.gen(), INITIAL_ALPHA);
        Self { vertices, color, interior: OnceLock::new() }
    }

    #[inline]
    pub fn vertices(&self) -> &[Point] { &self.vertices }
    #[inline]
    pub fn color(&self) -> Color { self.color }
    #[inline]
    pub fn order(&self) -> usize { self.vertices.len() }

    /// Checks the vertex-count invariant (used after deserializing).
    pub fn validate(&self) -> Result<(), EngineError> {
        if (MIN_VERTICES..=MAX_VERTICES).contains(&self.vertices.len()) {
            Ok(())
        } else {
            Err(EngineError::InvalidGeometry { vertices: self.vertices.len() })
        }
    }

    pub fn bbox_px(&self, canvas_w: usize, canvas_h: usize) -> IntRect {
        polygon_bbox_px(&self.vertices, canvas_w, canvas_h)
    }

    /// Move one vertex. Invalidates the interior cache.
    pub fn set_vertex(&mut self, index: usize, p: Point) {
        self.vertices[index] = p;
        self.invalidate_interior();
    }

    /// Change the fill. The interior cache stays valid.
    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    #[inline]
    pub fn has_cached_interior(&self) -> bool {
        self.interior.get().is_some()
    }

    #[inline]
    pub fn cached_interior(&self) -> Option<&[Point]> {
        self.interior.get().map(|p| &**p)
    }

    #[inline]
    pub(crate) fn invalidate_interior(&mut self) {
        self.interior = OnceLock::new();
    }

    /// Returns the cached interior, computing it with `scan` on a miss.
    pub(crate) fn interior_or_init(&self, scan: impl FnOnce() -> Vec<Point>) -> &[Point] {
        self.interior.get_or_init(|| Arc::from(scan()))
    }
}
