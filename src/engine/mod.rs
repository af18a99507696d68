// engine/mod.rs
mod types;
mod geom;
mod error;
mod polygon;
mod raster;
mod mutation;
mod scheduler;
mod fitness;
mod config;
mod model;
mod optimizer;
mod stats;

pub use types::{Canvas, Color, IntRect, Point};
pub use geom::{contains, is_left, winding_number};
pub use error::{ConfigError, EngineError};
pub use polygon::{Polygon, INITIAL_ALPHA, MAX_VERTICES, MIN_VERTICES};
pub use raster::{composite_over, fill_background, plot, rasterize_polygon, render_polygons, scan_interior};
pub use mutation::{ColorPolicy, MutationOperator, MutationParams};
pub use scheduler::INITIAL_SUCCESS_RATIO;
pub use fitness::{FitnessEvaluator, FitnessMode};
pub use config::{CommitOrder, ModelConfig, OptimizerConfig, RunConfig};
pub use model::{Model, Snapshot};
pub use optimizer::{CancelHandle, Optimizer, TrialOutcome};
pub use stats::{OperatorStats, OptimizerStats};

pub(crate) use geom::clamp_i32;
