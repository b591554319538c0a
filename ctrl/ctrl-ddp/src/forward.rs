//! Forward rollout and line search.
//!
//! The forward pass rolls a candidate trajectory from the fixed initial
//! state, applying the feedforward correction scaled by the trial step size
//! plus feedback on the state deviation from the reference. The line search
//! tries the configured step sizes in order and accepts the first candidate
//! whose actual cost improvement is a sufficient fraction of the improvement
//! predicted by the backward-pass expansion.

use nalgebra::DVector;
use tracing::debug;

use crate::config::DdpConfig;
use crate::problem::DdpProblem;
use crate::types::{Gains, Trajectory};

/// Tolerance under which a slightly negative actual improvement still
/// counts as non-negative. Only reachable with a negative acceptance
/// threshold.
const ACTUAL_IMPROVEMENT_TOL: f64 = 1e-12;

/// An accepted line-search candidate and its acceptance metrics.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineSearchResult {
    pub candidate: Trajectory,
    pub alpha: f64,
    pub cost_update_actual: f64,
    pub cost_update_expected: f64,
    pub cost_update_ratio: f64,
}

/// Roll the supplied input sequence through the dynamics from `x0`,
/// accumulating running costs and the terminal cost.
pub(crate) fn rollout<P: DdpProblem>(
    problem: &P,
    x0: DVector<f64>,
    inputs: &[DVector<f64>],
) -> Trajectory {
    let horizon = inputs.len();
    let mut states = Vec::with_capacity(horizon + 1);
    let mut costs = Vec::with_capacity(horizon + 1);
    states.push(x0);
    for (k, u) in inputs.iter().enumerate() {
        costs.push(problem.running_cost(&states[k], u));
        let next = problem.state_eq(&states[k], u);
        states.push(next);
    }
    costs.push(problem.terminal_cost(&states[horizon]));
    Trajectory {
        states,
        inputs: inputs.to_vec(),
        costs,
    }
}

/// Roll one candidate trajectory using the gains and the trial step size.
pub(crate) fn forward_pass<P: DdpProblem>(
    problem: &P,
    reference: &Trajectory,
    gains: &Gains,
    alpha: f64,
) -> Trajectory {
    let horizon = reference.horizon();
    let mut states = Vec::with_capacity(horizon + 1);
    let mut inputs = Vec::with_capacity(horizon);
    let mut costs = Vec::with_capacity(horizon + 1);
    states.push(reference.states[0].clone());
    for k in 0..horizon {
        let deviation = &states[k] - &reference.states[k];
        let u = &reference.inputs[k]
            + &gains.feedforward[k] * alpha
            + &gains.feedback[k] * deviation;
        costs.push(problem.running_cost(&states[k], &u));
        let next = problem.state_eq(&states[k], &u);
        states.push(next);
        inputs.push(u);
    }
    costs.push(problem.terminal_cost(&states[horizon]));
    Trajectory {
        states,
        inputs,
        costs,
    }
}

/// Try each configured step size in order; return the first acceptable
/// candidate, or `None` when the line search is exhausted.
///
/// A candidate is rejected outright when its cost is non-finite or when the
/// expansion predicts no improvement at this step size.
pub(crate) fn line_search<P: DdpProblem>(
    problem: &P,
    reference: &Trajectory,
    gains: &Gains,
    dv: [f64; 2],
    config: &DdpConfig,
) -> Option<LineSearchResult> {
    let cost_old = reference.total_cost();
    for &alpha in &config.alpha_list {
        let candidate = forward_pass(problem, reference, gains, alpha);
        let cost_candidate = candidate.total_cost();
        if !cost_candidate.is_finite() {
            debug!("line search: rejecting alpha {alpha:.3e} (non-finite cost)");
            continue;
        }

        let cost_update_actual = cost_old - cost_candidate;
        let cost_update_expected = -(alpha * dv[0] + alpha * alpha * dv[1]);
        if cost_update_expected <= 0.0 {
            debug!(
                "line search: rejecting alpha {alpha:.3e} (no predicted improvement: {cost_update_expected:.3e})"
            );
            continue;
        }

        let cost_update_ratio = cost_update_actual / cost_update_expected;
        if cost_update_ratio > config.cost_update_ratio_thre
            && cost_update_actual >= -ACTUAL_IMPROVEMENT_TOL
        {
            return Some(LineSearchResult {
                candidate,
                alpha,
                cost_update_actual,
                cost_update_expected,
                cost_update_ratio,
            });
        }
        debug!(
            "line search: rejecting alpha {alpha:.3e} (ratio {cost_update_ratio:.3e}, actual {cost_update_actual:.3e})"
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{RunningCostDerivs, StateEqDerivs, TerminalCostDerivs};
    use approx::assert_relative_eq;
    use nalgebra::{dmatrix, dvector};

    /// Scalar integrator: x' = x + u, L = u^2, terminal (x - 1)^2.
    struct Integrator;

    impl DdpProblem for Integrator {
        fn state_dim(&self) -> usize {
            1
        }

        fn input_dim(&self) -> usize {
            1
        }

        fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
            dvector![x[0] + u[0]]
        }

        fn running_cost(&self, _x: &DVector<f64>, u: &DVector<f64>) -> f64 {
            u[0] * u[0]
        }

        fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 1.0) * (x[0] - 1.0)
        }

        fn state_eq_derivs(&self, _x: &DVector<f64>, _u: &DVector<f64>) -> StateEqDerivs {
            StateEqDerivs {
                fx: dmatrix![1.0],
                fu: dmatrix![1.0],
            }
        }

        fn running_cost_derivs(&self, _x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs {
            RunningCostDerivs {
                lx: dvector![0.0],
                lu: dvector![2.0 * u[0]],
                lxx: dmatrix![0.0],
                luu: dmatrix![2.0],
                lxu: dmatrix![0.0],
            }
        }

        fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs {
            TerminalCostDerivs {
                vx: dvector![2.0 * (x[0] - 1.0)],
                vxx: dmatrix![2.0],
            }
        }
    }

    /// Integrator whose running cost blows up to NaN past a threshold.
    struct Spiky;

    impl DdpProblem for Spiky {
        fn state_dim(&self) -> usize {
            1
        }

        fn input_dim(&self) -> usize {
            1
        }

        fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
            dvector![x[0] + u[0]]
        }

        fn running_cost(&self, _x: &DVector<f64>, u: &DVector<f64>) -> f64 {
            if u[0].abs() > 0.5 {
                f64::NAN
            } else {
                u[0] * u[0]
            }
        }

        fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
            (x[0] - 1.0) * (x[0] - 1.0)
        }

        fn state_eq_derivs(&self, _x: &DVector<f64>, _u: &DVector<f64>) -> StateEqDerivs {
            StateEqDerivs {
                fx: dmatrix![1.0],
                fu: dmatrix![1.0],
            }
        }

        fn running_cost_derivs(&self, _x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs {
            RunningCostDerivs {
                lx: dvector![0.0],
                lu: dvector![2.0 * u[0]],
                lxx: dmatrix![0.0],
                luu: dmatrix![2.0],
                lxu: dmatrix![0.0],
            }
        }

        fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs {
            TerminalCostDerivs {
                vx: dvector![2.0 * (x[0] - 1.0)],
                vxx: dmatrix![2.0],
            }
        }
    }

    fn unit_gains(horizon: usize, value: f64) -> Gains {
        Gains {
            feedforward: vec![dvector![value]; horizon],
            feedback: vec![dmatrix![0.0]; horizon],
        }
    }

    #[test]
    fn rollout_accumulates_states_and_costs() {
        let inputs = vec![dvector![0.25]; 4];
        let trajectory = rollout(&Integrator, dvector![0.0], &inputs);

        assert_eq!(trajectory.states.len(), 5);
        assert_eq!(trajectory.costs.len(), 5);
        assert_relative_eq!(trajectory.states[4][0], 1.0);
        // 4 * 0.25^2 running + zero terminal error.
        assert_relative_eq!(trajectory.total_cost(), 0.25, epsilon = 1e-14);
    }

    #[test]
    fn rollout_is_reproducible() {
        let inputs = vec![dvector![0.1], dvector![-0.2], dvector![0.3]];
        let a = rollout(&Integrator, dvector![0.5], &inputs);
        let b = rollout(&Integrator, dvector![0.5], &a.inputs);
        assert_eq!(a.states, b.states);
        assert_eq!(a.costs, b.costs);
    }

    #[test]
    fn forward_pass_with_zero_gains_reproduces_reference() {
        let inputs = vec![dvector![0.2]; 3];
        let reference = rollout(&Integrator, dvector![0.0], &inputs);
        let candidate = forward_pass(&Integrator, &reference, &unit_gains(3, 0.0), 1.0);
        assert_eq!(candidate, reference);
    }

    #[test]
    fn forward_pass_scales_feedforward_by_alpha() {
        let inputs = vec![dvector![0.0]; 2];
        let reference = rollout(&Integrator, dvector![0.0], &inputs);
        let candidate = forward_pass(&Integrator, &reference, &unit_gains(2, 0.4), 0.5);
        assert_relative_eq!(candidate.inputs[0][0], 0.2);
        assert_relative_eq!(candidate.states[1][0], 0.2);
    }

    #[test]
    fn forward_pass_preserves_initial_state() {
        let inputs = vec![dvector![0.3]; 3];
        let reference = rollout(&Integrator, dvector![0.7], &inputs);
        let candidate = forward_pass(&Integrator, &reference, &unit_gains(3, 1.0), 1.0);
        assert_eq!(candidate.states[0], reference.states[0]);
    }

    #[test]
    fn line_search_accepts_descent_step() {
        let inputs = vec![dvector![0.0]; 2];
        let reference = rollout(&Integrator, dvector![0.0], &inputs);
        // Pushing toward the target reduces the terminal cost.
        let gains = unit_gains(2, 0.4);
        // dv chosen consistent with a genuine descent direction.
        let dv = [-1.0, 0.5];

        let config = DdpConfig::with_horizon_steps(2);
        let result = line_search(&Integrator, &reference, &gains, dv, &config)
            .expect("descent step must be accepted");
        assert_relative_eq!(result.alpha, 1.0);
        assert!(result.cost_update_actual > 0.0);
        assert!(result.cost_update_ratio > 0.0);
    }

    #[test]
    fn line_search_skips_non_finite_candidates() {
        let inputs = vec![dvector![0.0]; 2];
        let reference = rollout(&Spiky, dvector![0.0], &inputs);
        // Full step drives |u| past the NaN threshold; smaller alphas stay
        // inside it.
        let gains = unit_gains(2, 0.6);
        let dv = [-1.0, 0.5];

        let config = DdpConfig::with_horizon_steps(2);
        let result = line_search(&Spiky, &reference, &gains, dv, &config)
            .expect("a backed-off step must be accepted");
        assert!(result.alpha < 1.0, "full step must be rejected as NaN");
        assert!(result.cost_update_actual > 0.0);
    }

    #[test]
    fn line_search_exhausts_on_empty_candidate_list() {
        let inputs = vec![dvector![0.0]; 2];
        let reference = rollout(&Integrator, dvector![0.0], &inputs);
        let gains = unit_gains(2, 0.4);

        let mut config = DdpConfig::with_horizon_steps(2);
        config.alpha_list.clear();
        assert!(line_search(&Integrator, &reference, &gains, [-1.0, 0.5], &config).is_none());
    }

    #[test]
    fn line_search_rejects_when_no_improvement_predicted() {
        let inputs = vec![dvector![0.0]; 2];
        let reference = rollout(&Integrator, dvector![0.0], &inputs);
        let gains = unit_gains(2, 0.4);
        // An ascent-direction expansion predicts no improvement anywhere.
        let dv = [1.0, 0.0];

        let config = DdpConfig::with_horizon_steps(2);
        assert!(line_search(&Integrator, &reference, &gains, dv, &config).is_none());
    }
}
