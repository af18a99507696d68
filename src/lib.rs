//! Approximates a raster image with a small set of semi-transparent polygons
//! by randomized hill-climbing.
//!
//! [`engine`] holds the core: rasterizer, fitness evaluator, candidate model
//! and the (optionally concurrent) optimizer. [`export`] is the file boundary.

pub mod engine;
pub mod export;
