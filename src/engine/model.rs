// -----------------------------------------------------------------------------
// Candidate model
// -----------------------------------------------------------------------------

use std::sync::Arc;

use log::{debug, warn};
use rand::prelude::*;
use rand_pcg::Pcg64Mcg as PcgRng;
use serde::{Deserialize, Serialize};

use super::mutation::{propose, Proposal};
use super::raster::render_polygons;
use super::{Canvas, Color, EngineError, FitnessEvaluator, FitnessMode, ModelConfig, MutationParams, Polygon};

/// Serializable state of a model, enough to resume a run against the same target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub width: usize,
    pub height: usize,
    pub background: Color,
    pub seed: u64,
    pub polygons: Vec<Polygon>,
    pub score: f64,
    pub best_iteration: u64,
    pub iterations_run: u64,
}

/// The committed candidate: background plus polygons in paint order, scored
/// against an immutable target.
///
/// `score` always equals the fitness of the committed polygons; the only way
/// to replace them is through a commit that carries the new score.
pub struct Model {
    width: usize,
    height: usize,
    background: Color,
    polygons: Vec<Arc<Polygon>>,
    target: Arc<Canvas>,
    evaluator: FitnessEvaluator,
    score: f64,
    best_iteration: u64,
    iterations_run: u64,
    seed: u64,
    rng: PcgRng,
    scratch: Canvas,
}

impl Model {
    /// Build a model with `config.polygons` random polygons over `target`.
    pub fn new(target: impl Into<Arc<Canvas>>, config: &ModelConfig, fitness: FitnessMode) -> Result<Self, EngineError> {
        config.validate()?;
        let target = target.into();
        check_target(&target)?;
        let (width, height) = (target.width(), target.height());

        let mut rng = PcgRng::seed_from_u64(config.seed);
        let polygons = (0..config.polygons)
            .map(|_| {
                let order = rng.gen_range(config.min_vertices..=config.max_vertices);
                Arc::new(Polygon::random(&mut rng, order, width, height))
            })
            .collect();

        Ok(Self::assemble(target, config.background, polygons, config.seed, rng, fitness, 0, 0))
    }

    /// Rebuild a model from a snapshot. The score is recomputed, not trusted.
    pub fn from_snapshot(target: impl Into<Arc<Canvas>>, snapshot: Snapshot, fitness: FitnessMode) -> Result<Self, EngineError> {
        let target = target.into();
        check_target(&target)?;
        if (snapshot.width, snapshot.height) != (target.width(), target.height()) {
            return Err(EngineError::InvalidInput(format!(
                "snapshot is {}x{} but target is {}x{}",
                snapshot.width,
                snapshot.height,
                target.width(),
                target.height()
            )));
        }
        if snapshot.polygons.is_empty() {
            return Err(EngineError::InvalidInput("snapshot has no polygons".into()));
        }
        for p in &snapshot.polygons {
            p.validate()?;
        }

        // Resumed runs continue on a fresh stream keyed by how far the run got.
        let rng = PcgRng::seed_from_u64(snapshot.seed ^ snapshot.iterations_run.rotate_left(32));
        let polygons = snapshot.polygons.into_iter().map(Arc::new).collect();
        let model = Self::assemble(
            target,
            snapshot.background,
            polygons,
            snapshot.seed,
            rng,
            fitness,
            snapshot.best_iteration,
            snapshot.iterations_run,
        );
        if (model.score - snapshot.score).abs() > 1e-6 {
            warn!("snapshot score {} differs from recomputed {}", snapshot.score, model.score);
        }
        Ok(model)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        target: Arc<Canvas>,
        background: Color,
        polygons: Vec<Arc<Polygon>>,
        seed: u64,
        rng: PcgRng,
        fitness: FitnessMode,
        best_iteration: u64,
        iterations_run: u64,
    ) -> Self {
        let (width, height) = (target.width(), target.height());
        let mut model = Self {
            width,
            height,
            background,
            polygons,
            target,
            evaluator: FitnessEvaluator::new(fitness),
            score: f64::INFINITY,
            best_iteration,
            iterations_run,
            seed,
            rng,
            scratch: Canvas::new(width, height),
        };
        let polygons = model.polygons.clone();
        model.score = model.evaluate(&polygons);
        model
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.width,
            height: self.height,
            background: self.background,
            seed: self.seed,
            polygons: self.polygons.iter().map(|p| (**p).clone()).collect(),
            score: self.score,
            best_iteration: self.best_iteration,
            iterations_run: self.iterations_run,
        }
    }

    #[inline]
    pub fn width(&self) -> usize { self.width }
    #[inline]
    pub fn height(&self) -> usize { self.height }
    #[inline]
    pub fn background(&self) -> Color { self.background }
    #[inline]
    pub fn polygons(&self) -> &[Arc<Polygon>] { &self.polygons }
    #[inline]
    pub fn target(&self) -> &Arc<Canvas> { &self.target }
    #[inline]
    pub fn evaluator(&self) -> FitnessEvaluator { self.evaluator }
    #[inline]
    pub fn score(&self) -> f64 { self.score }
    /// Iteration at which the committed polygons were found (0 = initial).
    #[inline]
    pub fn best_iteration(&self) -> u64 { self.best_iteration }
    #[inline]
    pub fn iterations_run(&self) -> u64 { self.iterations_run }
    #[inline]
    pub fn seed(&self) -> u64 { self.seed }

    /// Render the committed polygons onto a fresh canvas.
    pub fn render(&self) -> Canvas {
        let mut canvas = Canvas::new(self.width, self.height);
        render_polygons(&self.polygons, self.background, &mut canvas);
        canvas
    }

    /// Fitness of an arbitrary polygon sequence against this model's target.
    pub fn evaluate(&mut self, polygons: &[Arc<Polygon>]) -> f64 {
        score_polygons(&self.target, self.evaluator, self.background, polygons, &mut self.scratch)
    }

    pub(crate) fn propose(&mut self, success_ratio: f64, params: &MutationParams) -> Proposal {
        propose(&mut self.rng, &self.polygons, success_ratio, self.width, self.height, params)
    }

    pub(crate) fn rng_mut(&mut self) -> &mut PcgRng {
        &mut self.rng
    }

    /// Replace the committed polygons. Callers guarantee `score` is their fitness
    /// and that it beats the current one.
    pub(crate) fn commit(&mut self, polygons: Vec<Arc<Polygon>>, score: f64, iteration: u64) {
        debug_assert!(score < self.score);
        debug_assert_eq!(polygons.len(), self.polygons.len());
        debug!("iteration {iteration}: {:.3} -> {:.3}", self.score, score);
        self.polygons = polygons;
        self.score = score;
        self.best_iteration = iteration;
    }

    pub(crate) fn add_iterations(&mut self, n: u64) {
        self.iterations_run += n;
    }
}

/// Render `polygons` into `scratch` and score it against `target`.
pub(crate) fn score_polygons(
    target: &Canvas,
    evaluator: FitnessEvaluator,
    background: Color,
    polygons: &[Arc<Polygon>],
    scratch: &mut Canvas,
) -> f64 {
    render_polygons(polygons, background, scratch);
    evaluator.score(target, scratch)
}

fn check_target(target: &Canvas) -> Result<(), EngineError> {
    if target.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "target image is {}x{}, need a non-zero area",
            target.width(),
            target.height()
        )));
    }
    Ok(())
}
