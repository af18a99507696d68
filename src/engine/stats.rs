// -----------------------------------------------------------------------------
// Run statistics
// -----------------------------------------------------------------------------

use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperatorStats {
    pub label: &'static str,
    pub proposals: u64,
    pub accepts: u64,
}

/// What a finished (or cancelled) run did.
#[derive(Clone, Debug, Default)]
pub struct OptimizerStats {
    pub iterations_requested: u64,
    pub iterations_run: u64,
    pub total_accepts: u64,
    /// Concurrent trials that improved on their snapshot but lost to a newer commit.
    pub stale_improvements: u64,

    pub initial_score: f64,
    pub final_score: f64,
    pub best_iteration: u64,

    pub elapsed: Duration,
    pub proposals_per_second: f64,
    pub accepts_per_second: f64,

    pub operators: Vec<OperatorStats>,
    pub score_history: Vec<f64>,

    pub cancelled: bool,
}

impl OptimizerStats {
    pub const MAX_HISTORY: usize = 512;

    pub fn push_score_history(&mut self, v: f64) {
        self.score_history.push(v);
        if self.score_history.len() > Self::MAX_HISTORY {
            let extra = self.score_history.len() - Self::MAX_HISTORY;
            self.score_history.drain(0..extra);
        }
    }

    /// Fraction of trials that were committed.
    pub fn success_ratio(&self) -> f64 {
        if self.iterations_run == 0 {
            0.0
        } else {
            self.total_accepts as f64 / self.iterations_run as f64
        }
    }

    /// Polygons rendered per second, `iterations * polygons / elapsed`.
    pub fn polygons_per_second(&self, polygon_count: usize) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.iterations_run as f64 * polygon_count as f64 / secs
        }
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.proposals_per_second = self.iterations_run as f64 / secs;
            self.accepts_per_second = self.total_accepts as f64 / secs;
        }
    }
}
