//! Trajectory and gain containers owned by the optimization loop.

use nalgebra::{DMatrix, DVector};

/// A state/input trajectory with its per-step costs.
///
/// Holds `horizon + 1` states, `horizon` inputs, and `horizon + 1` cost
/// entries (running costs for each step plus the terminal cost last).
/// `states[0]` is the externally supplied current state; no pass alters it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Trajectory {
    /// State sequence `x[0] ..= x[N]`.
    pub states: Vec<DVector<f64>>,
    /// Input sequence `u[0] .. u[N]`.
    pub inputs: Vec<DVector<f64>>,
    /// Cost sequence: running costs `L[0] .. L[N]` then the terminal cost.
    pub costs: Vec<f64>,
}

impl Trajectory {
    /// Number of horizon steps (length of the input sequence).
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.inputs.len()
    }

    /// Total cost: running costs plus terminal cost.
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.costs.iter().sum()
    }

    /// The final state of the horizon, if the trajectory is non-empty.
    #[must_use]
    pub fn terminal_state(&self) -> Option<&DVector<f64>> {
        self.states.last()
    }
}

/// Feedforward and feedback gains produced by the backward pass.
///
/// For step `k`, the tracking control law is
/// `u[k] = u_ref[k] + alpha * feedforward[k] + feedback[k] * (x[k] - x_ref[k])`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gains {
    /// Feedforward input corrections, one vector of length `m` per step.
    pub feedforward: Vec<DVector<f64>>,
    /// Feedback gain matrices, one `m x n` matrix per step.
    pub feedback: Vec<DMatrix<f64>>,
}

impl Gains {
    /// Number of horizon steps covered by the gains.
    #[must_use]
    pub fn horizon(&self) -> usize {
        self.feedforward.len()
    }
}
