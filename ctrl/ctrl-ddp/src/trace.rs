//! Per-iteration diagnostics.
//!
//! One [`TraceData`] record is appended for every optimization iteration,
//! accepted or not, plus a baseline record for the initial rollout. Records
//! are immutable after creation and are the solver's sole observable side
//! channel beyond the final trajectory and gains.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Diagnostics for one optimization iteration.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceData {
    /// Iteration index. Index 0 is the baseline record for the initial
    /// rollout.
    pub iter: usize,

    /// Total trajectory cost after this iteration.
    pub cost: f64,

    /// Damping coefficient after this iteration's regularization update.
    pub lambda: f64,

    /// Damping scaling factor after this iteration's update.
    pub dlambda: f64,

    /// Accepted line-search step size; 0 when no candidate was accepted
    /// (and for the baseline record).
    pub alpha: f64,

    /// Feedforward norm relative to the inputs, the gradient-style
    /// convergence metric. 0 for rejected iterations and the baseline.
    pub k_rel_norm: f64,

    /// Actual cost improvement of the accepted candidate.
    pub cost_update_actual: f64,

    /// Cost improvement predicted from the backward-pass expansion.
    pub cost_update_expected: f64,

    /// Ratio of actual to expected cost improvement.
    pub cost_update_ratio: f64,

    /// Time spent evaluating model derivatives.
    pub duration_derivative: Duration,

    /// Time spent in the backward pass, including regularization retries.
    pub duration_backward: Duration,

    /// Time spent in forward rollouts and line search.
    pub duration_forward: Duration,
}

impl TraceData {
    /// Whether this iteration accepted a line-search candidate. The
    /// baseline record reports false.
    #[must_use]
    pub fn accepted(&self) -> bool {
        self.alpha != 0.0
    }
}
