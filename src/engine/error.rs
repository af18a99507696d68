// -----------------------------------------------------------------------------
// Error taxonomy
// -----------------------------------------------------------------------------

/// Failures the core can report. Everything else (file I/O, decoding)
/// belongs to the export layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("polygon must have between 3 and 6 vertices, got {vertices}")]
    InvalidGeometry { vertices: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Configuration validation errors.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("polygon count must be non-zero")]
    NoPolygons,
    #[error("vertex range {min}..={max} must lie within 3..=6 and be non-empty")]
    InvalidVertexRange { min: usize, max: usize },
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
    #[error("log interval must be non-zero")]
    InvalidLogInterval,
    #[error("success-ratio window must be non-zero")]
    InvalidRatioWindow,
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    #[error("{name} amplitude must be positive")]
    InvalidAmplitude { name: &'static str },
}
