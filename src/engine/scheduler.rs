// -----------------------------------------------------------------------------
// Success-ratio feedback:
// - Rolling accept ratio, refreshed once per window of attempts
// - Per-operator proposal/accept counters for reporting
// -----------------------------------------------------------------------------

use super::MutationOperator;

/// Ratio reported before the first window completes. Far above any jitter
/// threshold, so early vertex mutations always relocate.
pub const INITIAL_SUCCESS_RATIO: f64 = 100.0;

/// Tracks accepted/attempted trials and exposes the ratio of the last full window.
#[derive(Clone, Debug)]
pub(crate) struct SuccessWindow {
    window: u64,
    attempts: u64,
    accepts: u64,
    ratio: f64,

    proposals_by_op: [u64; MutationOperator::COUNT],
    accepts_by_op: [u64; MutationOperator::COUNT],
}

impl SuccessWindow {
    /// `window` must be non-zero (checked by config validation).
    pub(crate) fn new(window: u64) -> Self {
        Self {
            window: window.max(1),
            attempts: 0,
            accepts: 0,
            ratio: INITIAL_SUCCESS_RATIO,
            proposals_by_op: [0; MutationOperator::COUNT],
            accepts_by_op: [0; MutationOperator::COUNT],
        }
    }

    #[inline]
    pub(crate) fn ratio(&self) -> f64 {
        self.ratio
    }

    pub(crate) fn record_outcome(&mut self, op: MutationOperator, accepted: bool) {
        let i = op.index();
        self.proposals_by_op[i] = self.proposals_by_op[i].saturating_add(1);
        self.attempts += 1;
        if accepted {
            self.accepts_by_op[i] = self.accepts_by_op[i].saturating_add(1);
            self.accepts += 1;
        }
        if self.attempts == self.window {
            self.ratio = self.accepts as f64 / self.attempts as f64;
            self.attempts = 0;
            self.accepts = 0;
        }
    }

    /// Accept rate per operator, in `MutationOperator::ALL` order.
    pub(crate) fn operator_rates(&self) -> Vec<(MutationOperator, u64, u64)> {
        MutationOperator::ALL
            .iter()
            .map(|&op| (op, self.proposals_by_op[op.index()], self.accepts_by_op[op.index()]))
            .collect()
    }
}
