// -----------------------------------------------------------------------------
// Optimizer: hill-climbing over the committed model
//
// The coordinating thread is the only writer of the Model. Concurrent workers
// read an epoch-stamped snapshot and report trials back over a channel.
// -----------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc, Arc,
};
use std::thread;
use std::time::Instant;

use log::{debug, info};
use parking_lot::RwLock;
use rand::prelude::*;
use rand_pcg::Pcg64Mcg as PcgRng;
use rayon::prelude::*;

use super::model::score_polygons;
use super::mutation::propose;
use super::scheduler::SuccessWindow;
use super::stats::{OperatorStats, OptimizerStats};
use super::{Canvas, CommitOrder, EngineError, Model, MutationOperator, OptimizerConfig, Polygon};

/// Stops a running optimizer from another thread. No new trials start once
/// set; trials already in flight finish and are judged normally.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Result of one trial.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrialOutcome {
    pub op: MutationOperator,
    pub score: f64,
    pub accepted: bool,
}

pub struct Optimizer {
    config: OptimizerConfig,
    cancel: CancelHandle,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config, cancel: CancelHandle::default() })
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// One single-threaded trial: clone, mutate one polygon, render, score,
    /// and commit iff the score is strictly below the current one.
    pub fn step(&self, model: &mut Model, success_ratio: f64, iteration: u64) -> TrialOutcome {
        let proposal = model.propose(success_ratio, &self.config.mutation);
        let score = model.evaluate(&proposal.polygons);
        let accepted = score < model.score();
        if accepted {
            debug!("{} on polygon {}", proposal.op.label(), proposal.index);
            model.commit(proposal.polygons, score, iteration);
        }
        TrialOutcome { op: proposal.op, score, accepted }
    }

    /// Run the configured number of trials (or until cancelled).
    pub fn run(&self, model: &mut Model) -> Result<OptimizerStats, EngineError> {
        let mut progress = Progress::new(&self.config, model);
        let started = Instant::now();

        let done = match (self.config.concurrency, self.config.commit_order) {
            (1, _) => self.run_sequential(model, &mut progress, started),
            (_, CommitOrder::Arrival) => self.run_arrival(model, &mut progress, started),
            (_, CommitOrder::TokenOrder) => self.run_token_order(model, &mut progress, started)?,
        };

        model.add_iterations(done);
        Ok(progress.finish(model, started, self.cancel.is_cancelled()))
    }

    fn run_sequential(&self, model: &mut Model, progress: &mut Progress, started: Instant) -> u64 {
        let base = model.iterations_run();
        let mut done = 0;
        for i in 1..=self.config.iterations {
            if self.cancel.is_cancelled() {
                break;
            }
            let outcome = self.step(model, progress.window.ratio(), base + i);
            progress.record(i, outcome.op, outcome.accepted, model.score(), started);
            done = i;
        }
        done
    }

    // ---------- Arrival order: channel to a single owner ----------
    fn run_arrival(&self, model: &mut Model, progress: &mut Progress, started: Instant) -> u64 {
        let iterations = self.config.iterations;
        let base = model.iterations_run();
        let (w, h, bg) = (model.width(), model.height(), model.background());
        let target = Arc::clone(model.target());
        let evaluator = model.evaluator();
        let params = &self.config.mutation;
        let worker_seeds: Vec<u64> = (0..self.config.concurrency).map(|_| model.rng_mut().gen()).collect();

        let shared = RwLock::new(Arc::new(Committed {
            epoch: 0,
            polygons: model.polygons().to_vec(),
            score: model.score(),
            ratio: progress.window.ratio(),
        }));
        let next_token = AtomicU64::new(1);
        let (tx, rx) = mpsc::channel::<TrialReport>();
        let mut epoch = 0u64;
        let mut received = 0u64;

        thread::scope(|s| {
            for seed in worker_seeds {
                let tx = tx.clone();
                let (shared, next_token, cancel, target) = (&shared, &next_token, &self.cancel, &target);
                s.spawn(move || {
                    let mut rng = PcgRng::seed_from_u64(seed);
                    let mut scratch = Canvas::new(w, h);
                    loop {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let token = next_token.fetch_add(1, Ordering::Relaxed);
                        if token > iterations {
                            break;
                        }
                        let snap: Arc<Committed> = shared.read().clone();
                        let proposal = propose(&mut rng, &snap.polygons, snap.ratio, w, h, params);
                        let score = score_polygons(target, evaluator, bg, &proposal.polygons, &mut scratch);
                        // Only ship the polygons when they beat the snapshot.
                        let polygons = (score < snap.score).then_some(proposal.polygons);
                        let report = TrialReport { token, epoch: snap.epoch, op: proposal.op, score, polygons };
                        if tx.send(report).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(tx);

            for report in rx {
                received += 1;
                let accepted = match report.polygons {
                    Some(polygons) if report.score < model.score() => {
                        model.commit(polygons, report.score, base + report.token);
                        true
                    }
                    Some(_) => {
                        debug!("token {} improved epoch {} but lost to epoch {}", report.token, report.epoch, epoch);
                        progress.stats.stale_improvements += 1;
                        false
                    }
                    None => false,
                };
                let ratio_before = progress.window.ratio();
                progress.record(received, report.op, accepted, model.score(), started);

                if accepted || progress.window.ratio() != ratio_before {
                    if accepted {
                        epoch += 1;
                    }
                    *shared.write() = Arc::new(Committed {
                        epoch,
                        polygons: model.polygons().to_vec(),
                        score: model.score(),
                        ratio: progress.window.ratio(),
                    });
                }
            }
        });
        received
    }

    // ---------- Token order: lockstep batches, deterministic ----------
    fn run_token_order(&self, model: &mut Model, progress: &mut Progress, started: Instant) -> Result<u64, EngineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.concurrency)
            .thread_name(|i| format!("polytrace-{i}"))
            .build()?;

        let iterations = self.config.iterations;
        let batch = self.config.concurrency as u64;
        let base = model.iterations_run();
        let seed = model.seed();
        let (w, h, bg) = (model.width(), model.height(), model.background());
        let target = Arc::clone(model.target());
        let evaluator = model.evaluator();
        let params = &self.config.mutation;

        let mut next = 1u64;
        while next <= iterations && !self.cancel.is_cancelled() {
            let last = (next + batch - 1).min(iterations);
            let committed = model.polygons().to_vec();
            let ratio = progress.window.ratio();

            let results: Vec<(u64, MutationOperator, f64, Vec<Arc<Polygon>>)> = pool.install(|| {
                (0..=(last - next) as usize)
                    .into_par_iter()
                    .map_init(
                        || Canvas::new(w, h),
                        |scratch, k| {
                            let token = next + k as u64;
                            let mut rng = token_rng(seed, base + token);
                            let p = propose(&mut rng, &committed, ratio, w, h, params);
                            let score = score_polygons(&target, evaluator, bg, &p.polygons, scratch);
                            (token, p.op, score, p.polygons)
                        },
                    )
                    .collect()
            });

            for (token, op, score, polygons) in results {
                let accepted = score < model.score();
                if accepted {
                    model.commit(polygons, score, base + token);
                }
                progress.record(token, op, accepted, model.score(), started);
            }
            next = last + 1;
        }
        Ok(next - 1)
    }
}

/// Independent random stream for one global trial index.
fn token_rng(seed: u64, token: u64) -> PcgRng {
    PcgRng::seed_from_u64(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ token)
}

/// What workers read. Replaced wholesale on every commit.
struct Committed {
    epoch: u64,
    polygons: Vec<Arc<Polygon>>,
    score: f64,
    ratio: f64,
}

struct TrialReport {
    token: u64,
    epoch: u64,
    op: MutationOperator,
    score: f64,
    polygons: Option<Vec<Arc<Polygon>>>,
}

// ---------- Bookkeeping shared by all run modes ----------
struct Progress {
    window: SuccessWindow,
    stats: OptimizerStats,
    log_every: u64,
}

impl Progress {
    fn new(config: &OptimizerConfig, model: &Model) -> Self {
        let stats = OptimizerStats {
            iterations_requested: config.iterations,
            initial_score: model.score(),
            final_score: model.score(),
            best_iteration: model.best_iteration(),
            ..OptimizerStats::default()
        };
        Self { window: SuccessWindow::new(config.ratio_window), stats, log_every: config.log_every }
    }

    fn record(&mut self, n: u64, op: MutationOperator, accepted: bool, score: f64, started: Instant) {
        self.window.record_outcome(op, accepted);
        self.stats.iterations_run += 1;
        if accepted {
            self.stats.total_accepts += 1;
            self.stats.push_score_history(score);
        }
        if n % self.log_every == 0 {
            info!(
                "iteration {n}: score {score:.3}, success ratio {:.3}, elapsed {:.2?}",
                self.window.ratio(),
                started.elapsed()
            );
        }
    }

    fn finish(mut self, model: &Model, started: Instant, cancelled: bool) -> OptimizerStats {
        self.stats.final_score = model.score();
        self.stats.best_iteration = model.best_iteration();
        self.stats.cancelled = cancelled;
        self.stats.operators = self
            .window
            .operator_rates()
            .into_iter()
            .map(|(op, proposals, accepts)| OperatorStats { label: op.label(), proposals, accepts })
            .collect();
        self.stats.finish(started.elapsed());
        if cancelled {
            info!("cancelled after {} of {} iterations", self.stats.iterations_run, self.stats.iterations_requested);
        }
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FitnessMode, ModelConfig};

    /// Left half red, right half blue.
    fn target(w: usize, h: usize) -> Canvas {
        let mut px = Vec::with_capacity(w * h * 4);
        for _ in 0..h {
            for x in 0..w {
                let c: [u8; 4] = if x < w / 2 { [220, 30, 30, 255] } else { [20, 40, 200, 255] };
                px.extend_from_slice(&c);
            }
        }
        Canvas::from_rgba(w, h, px).unwrap()
    }

    fn model(polygons: usize, seed: u64) -> Model {
        let cfg = ModelConfig { polygons, seed, ..ModelConfig::default() };
        Model::new(target(24, 16), &cfg, FitnessMode::RgbOnly).unwrap()
    }

    fn optimizer(iterations: u64, concurrency: usize, commit_order: CommitOrder) -> Optimizer {
        Optimizer::new(OptimizerConfig { iterations, concurrency, commit_order, ..OptimizerConfig::default() }).unwrap()
    }

    #[test]
    fn test_step_commits_iff_strictly_better() {
        let mut m = model(6, 1);
        let opt = optimizer(1, 1, CommitOrder::Arrival);
        for i in 1..=300 {
            let before_score = m.score();
            let before = m.snapshot().polygons;
            let out = opt.step(&mut m, 100.0, i);
            assert_eq!(out.accepted, out.score < before_score);
            if out.accepted {
                assert_eq!(m.score(), out.score);
                assert_eq!(m.best_iteration(), i);
            } else {
                assert_eq!(m.score(), before_score);
                assert_eq!(m.snapshot().polygons, before);
            }
        }
    }

    #[test]
    fn test_sequential_score_is_monotonic() {
        let mut m = model(8, 2);
        let opt = optimizer(1, 1, CommitOrder::Arrival);
        let mut last = m.score();
        for i in 1..=500 {
            opt.step(&mut m, 100.0, i);
            assert!(m.score() <= last);
            last = m.score();
        }
    }

    #[test]
    fn test_run_improves_and_reports() {
        let mut m = model(10, 3);
        let initial = m.score();
        let stats = optimizer(800, 1, CommitOrder::Arrival).run(&mut m).unwrap();
        assert_eq!(stats.iterations_run, 800);
        assert_eq!(m.iterations_run(), 800);
        assert_eq!(stats.initial_score, initial);
        assert_eq!(stats.final_score, m.score());
        assert!(m.score() < initial);
        assert!(stats.total_accepts > 0);
        let proposals: u64 = stats.operators.iter().map(|o| o.proposals).sum();
        assert_eq!(proposals, 800);
        // committed score is still the fitness of the committed polygons
        assert_eq!(m.score(), m.evaluator().score(m.target(), &m.render()));
    }

    #[test]
    fn test_zero_iterations_is_noop() {
        let mut m = model(4, 4);
        let before = m.snapshot();
        let stats = optimizer(0, 1, CommitOrder::Arrival).run(&mut m).unwrap();
        assert_eq!(stats.iterations_run, 0);
        assert_eq!(m.snapshot(), before);
    }

    #[test]
    fn test_arrival_concurrent_keeps_invariants() {
        let mut m = model(10, 5);
        let initial = m.score();
        let stats = optimizer(600, 4, CommitOrder::Arrival).run(&mut m).unwrap();
        assert_eq!(stats.iterations_run, 600);
        assert!(m.score() <= initial);
        assert_eq!(m.score(), m.evaluator().score(m.target(), &m.render()));
        // accepted scores are strictly decreasing in commit order
        assert!(stats.score_history.windows(2).all(|w| w[1] < w[0]));
    }

    #[test]
    fn test_token_order_is_reproducible() {
        let run = || {
            let mut m = model(10, 6);
            optimizer(400, 3, CommitOrder::TokenOrder).run(&mut m).unwrap();
            m.snapshot()
        };
        let a = run();
        let b = run();
        assert_eq!(a, b);
        assert_eq!(a.iterations_run, 400);
    }

    #[test]
    fn test_token_order_keeps_invariants() {
        let mut m = model(10, 7);
        let initial = m.score();
        let stats = optimizer(301, 4, CommitOrder::TokenOrder).run(&mut m).unwrap();
        assert_eq!(stats.iterations_run, 301);
        assert!(m.score() <= initial);
        assert_eq!(m.score(), m.evaluator().score(m.target(), &m.render()));
    }

    #[test]
    fn test_cancel_before_run_does_nothing() {
        for (c, order) in [(1, CommitOrder::Arrival), (3, CommitOrder::Arrival), (3, CommitOrder::TokenOrder)] {
            let mut m = model(4, 8);
            let before = m.snapshot();
            let opt = optimizer(100, c, order);
            opt.cancel_handle().cancel();
            let stats = opt.run(&mut m).unwrap();
            assert!(stats.cancelled);
            assert_eq!(stats.iterations_run, 0);
            assert_eq!(m.snapshot(), before);
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let err = Optimizer::new(OptimizerConfig { concurrency: 0, ..OptimizerConfig::default() }).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
