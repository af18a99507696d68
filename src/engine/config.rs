// -----------------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::polygon::{MAX_VERTICES, MIN_VERTICES};
use super::{Color, ConfigError, FitnessMode, MutationParams};

/// Shape of the initial candidate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub polygons: usize,
    /// Initial polygon orders are drawn uniformly from `min_vertices..=max_vertices`.
    pub min_vertices: usize,
    pub max_vertices: usize,
    pub background: Color,
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            polygons: 50,
            min_vertices: 3,
            max_vertices: 5,
            background: Color::WHITE,
            seed: 0,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.polygons == 0 {
            return Err(ConfigError::NoPolygons);
        }
        if self.min_vertices < MIN_VERTICES
            || self.max_vertices > MAX_VERTICES
            || self.min_vertices > self.max_vertices
        {
            return Err(ConfigError::InvalidVertexRange {
                min: self.min_vertices,
                max: self.max_vertices,
            });
        }
        Ok(())
    }
}

/// Order in which concurrent trial results are committed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOrder {
    /// Apply each result as soon as it arrives. Fastest, not reproducible.
    #[default]
    Arrival,
    /// Evaluate in lockstep batches and apply in token order. Reproducible for a seed.
    TokenOrder,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Trial budget. Zero is allowed and leaves the model untouched.
    pub iterations: u64,
    pub concurrency: usize,
    /// Progress is logged every this many trials.
    pub log_every: u64,
    /// Trials per success-ratio refresh.
    pub ratio_window: u64,
    pub commit_order: CommitOrder,
    pub mutation: MutationParams,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            concurrency: 1,
            log_every: 100,
            ratio_window: 100,
            commit_order: CommitOrder::Arrival,
            mutation: MutationParams::default(),
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        if self.log_every == 0 {
            return Err(ConfigError::InvalidLogInterval);
        }
        if self.ratio_window == 0 {
            return Err(ConfigError::InvalidRatioWindow);
        }
        self.mutation.validate()
    }
}

/// Everything a run needs besides the target image. Loadable from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub model: ModelConfig,
    pub optimizer: OptimizerConfig,
    pub fitness: FitnessMode,
    /// Inputs larger than this on either side are downscaled before the run.
    pub max_image_size: u32,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            optimizer: OptimizerConfig::default(),
            fitness: FitnessMode::default(),
            max_image_size: 256,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.optimizer.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = RunConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.model.polygons, 50);
        assert_eq!(cfg.optimizer.iterations, 1000);
        assert_eq!(cfg.max_image_size, 256);
        assert_eq!(cfg.fitness, FitnessMode::RgbOnly);
    }

    #[test]
    fn test_model_config_rejections() {
        let c = ModelConfig { polygons: 0, ..Default::default() };
        assert_eq!(c.validate(), Err(ConfigError::NoPolygons));
        let c = ModelConfig { min_vertices: 2, ..Default::default() };
        assert!(matches!(c.validate(), Err(ConfigError::InvalidVertexRange { min: 2, .. })));
        let c = ModelConfig { min_vertices: 5, max_vertices: 4, ..Default::default() };
        assert!(c.validate().is_err());
        let c = ModelConfig { max_vertices: 7, ..Default::default() };
        assert!(c.validate().is_err());
        let c = ModelConfig { min_vertices: 6, max_vertices: 6, ..Default::default() };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_optimizer_config_rejections() {
        let c = OptimizerConfig { concurrency: 0, ..Default::default() };
        assert_eq!(c.validate(), Err(ConfigError::InvalidConcurrency));
        let c = OptimizerConfig { log_every: 0, ..Default::default() };
        assert_eq!(c.validate(), Err(ConfigError::InvalidLogInterval));
        let c = OptimizerConfig { ratio_window: 0, ..Default::default() };
        assert_eq!(c.validate(), Err(ConfigError::InvalidRatioWindow));
        let c = OptimizerConfig { iterations: 0, ..Default::default() };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "model": { "polygons": 12, "seed": 9 },
            "optimizer": { "concurrency": 4, "commit_order": "token_order",
                           "mutation": { "color_policy": "randomize" } },
            "fitness": "legacy_stride"
        }"#;
        let cfg: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.model.polygons, 12);
        assert_eq!(cfg.model.seed, 9);
        assert_eq!(cfg.model.max_vertices, 5);
        assert_eq!(cfg.optimizer.concurrency, 4);
        assert_eq!(cfg.optimizer.commit_order, CommitOrder::TokenOrder);
        assert_eq!(cfg.optimizer.iterations, 1000);
        assert_eq!(cfg.optimizer.mutation.color_policy, crate::engine::ColorPolicy::Randomize);
        assert_eq!(cfg.optimizer.mutation.color_amplitude, 50);
        assert_eq!(cfg.fitness, FitnessMode::LegacyStride);
        assert!(cfg.validate().is_ok());
    }
}
