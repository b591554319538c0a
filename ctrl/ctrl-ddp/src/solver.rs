//! The optimization loop.
//!
//! Owns all mutable solver state (trajectory, gains, damping, trace) and
//! drives the derivative / backward / forward phases per iteration, growing
//! the damping on failure and decaying it on acceptance until a convergence
//! test fires or a budget runs out.

use std::time::{Duration, Instant};

use nalgebra::DVector;
use tracing::{debug, info, warn};

use crate::backward::backward_pass;
use crate::config::DdpConfig;
use crate::derivatives::compute_derivatives;
use crate::error::{DdpError, DdpResult};
use crate::forward::{line_search, rollout, LineSearchResult};
use crate::problem::DdpProblem;
use crate::regularization::Regularization;
use crate::trace::TraceData;
use crate::types::{Gains, Trajectory};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How a solve terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolveStatus {
    /// A convergence test fired: the solution is locally optimal to within
    /// the configured thresholds.
    Converged,
    /// The iteration budget ran out. Non-fatal: the last accepted
    /// trajectory is retained and is typically usable.
    IterationsExhausted,
    /// The damping grew past its ceiling without producing an acceptable
    /// step. The best-so-far trajectory is retained for inspection.
    RegularizationExceeded,
}

impl SolveStatus {
    /// Whether the retained trajectory should be treated as a usable
    /// solution. Only the damping ceiling is a failed solve.
    #[must_use]
    pub const fn is_success(self) -> bool {
        !matches!(self, Self::RegularizationExceeded)
    }
}

impl std::fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::IterationsExhausted => write!(f, "iteration budget exhausted"),
            Self::RegularizationExceeded => write!(f, "regularization ceiling exceeded"),
        }
    }
}

/// Differential Dynamic Programming solver.
///
/// Construct once per problem, then call [`DdpSolver::solve`]. The solver
/// retains the optimized trajectory, the time-varying gains, and the
/// per-iteration trace for inspection after the call; each `solve` resets
/// them.
pub struct DdpSolver<P> {
    problem: P,
    config: DdpConfig,
    regularization: Regularization,
    trajectory: Trajectory,
    gains: Gains,
    trace: Vec<TraceData>,
}

/// Outcome of one iteration: terminate with a status or keep going.
enum Step {
    Continue,
    Terminate(SolveStatus),
}

impl<P: DdpProblem> DdpSolver<P> {
    /// Create a solver for `problem` with a validated `config`.
    pub fn new(problem: P, config: DdpConfig) -> DdpResult<Self> {
        config.validate()?;
        let regularization = Regularization::new(&config);
        Ok(Self {
            problem,
            config,
            regularization,
            trajectory: Trajectory::default(),
            gains: Gains::default(),
            trace: Vec::new(),
        })
    }

    /// The wrapped problem.
    #[must_use]
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// The solver configuration.
    #[must_use]
    pub fn config(&self) -> &DdpConfig {
        &self.config
    }

    /// The current trajectory: the converged solution after a successful
    /// solve, the last accepted iterate otherwise.
    #[must_use]
    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// The gains from the last successful backward pass.
    #[must_use]
    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    /// Per-iteration diagnostics for the last solve, baseline record first.
    #[must_use]
    pub fn trace(&self) -> &[TraceData] {
        &self.trace
    }

    /// Optimize from `initial_state`, seeding the trajectory by rolling
    /// `initial_inputs` through the dynamics.
    ///
    /// Fails fast with a dimension error, without touching solver state,
    /// when `initial_inputs` does not match the configured horizon or any
    /// vector does not match the problem dimensions. Otherwise always
    /// returns a [`SolveStatus`]; numerical trouble is absorbed by the
    /// regularization schedule.
    pub fn solve(
        &mut self,
        initial_state: &DVector<f64>,
        initial_inputs: &[DVector<f64>],
    ) -> DdpResult<SolveStatus> {
        if initial_inputs.len() != self.config.horizon_steps {
            return Err(DdpError::HorizonMismatch {
                expected: self.config.horizon_steps,
                got: initial_inputs.len(),
            });
        }
        let n = self.problem.state_dim();
        if initial_state.len() != n {
            return Err(DdpError::StateDimMismatch {
                expected: n,
                got: initial_state.len(),
            });
        }
        let m = self.problem.input_dim();
        for (step, u) in initial_inputs.iter().enumerate() {
            if u.len() != m {
                return Err(DdpError::InputDimMismatch {
                    step,
                    expected: m,
                    got: u.len(),
                });
            }
        }

        self.regularization = Regularization::new(&self.config);
        self.trace.clear();
        self.gains = Gains::default();
        self.trajectory = rollout(&self.problem, initial_state.clone(), initial_inputs);

        let initial_cost = self.trajectory.total_cost();
        debug!("initial rollout cost {initial_cost:.6e}");
        self.trace.push(TraceData {
            iter: 0,
            cost: initial_cost,
            lambda: self.regularization.lambda(),
            dlambda: self.regularization.dlambda(),
            ..TraceData::default()
        });

        for iter in 1..=self.config.max_iter {
            if let Step::Terminate(status) = self.iterate(iter) {
                self.log_termination(status, iter);
                return Ok(status);
            }
        }
        self.log_termination(SolveStatus::IterationsExhausted, self.config.max_iter);
        Ok(SolveStatus::IterationsExhausted)
    }

    /// One optimization iteration: derivatives, backward pass with in-place
    /// damping retries, line search, regularization update, convergence
    /// tests. Appends exactly one trace record.
    fn iterate(&mut self, iter: usize) -> Step {
        let started = Instant::now();
        let derivs = compute_derivatives(
            &self.problem,
            &self.trajectory,
            self.config.use_state_eq_second_derivative,
        );
        let terminal = self
            .problem
            .terminal_cost_derivs(&self.trajectory.states[self.trajectory.horizon()]);
        let duration_derivative = started.elapsed();

        if iter == 1
            && self.config.use_state_eq_second_derivative
            && derivs.iter().any(|d| d.state_eq_hessians.is_none())
        {
            warn!(
                "second-order dynamics derivatives requested but not supplied by the model; \
                 falling back to the Gauss-Newton approximation"
            );
        }

        // Backward pass, retrying in place with grown damping. The growth
        // multiplies by at least lambda_factor per retry, so the loop
        // reaches either success or the ceiling in finitely many steps.
        let started = Instant::now();
        let backward = loop {
            match backward_pass(
                &derivs,
                &terminal,
                self.regularization.lambda(),
                self.config.regularization_mode,
            ) {
                Ok(backward) => break backward,
                Err(failure) => {
                    debug!(
                        "iteration {iter}: backward pass lost positive definiteness at step {} \
                         (lambda {:.3e})",
                        failure.step,
                        self.regularization.lambda()
                    );
                    if !self.regularization.increase(&self.config) {
                        warn!("iteration {iter}: damping ceiling reached in backward pass");
                        self.push_failed_trace(iter, duration_derivative, started.elapsed(), Duration::ZERO);
                        return Step::Terminate(SolveStatus::RegularizationExceeded);
                    }
                }
            }
        };
        self.gains = backward.gains;
        let duration_backward = started.elapsed();

        // Gradient-style convergence test, evaluated against the current
        // inputs before any rollout. Placing it here (rather than after
        // acceptance) keeps an already-optimal trajectory from starving the
        // line search: with a near-zero feedforward no candidate can predict
        // improvement, so waiting for an acceptance would grow the damping
        // to its ceiling instead of terminating.
        let k_rel_norm = relative_gain_norm(&self.gains.feedforward, &self.trajectory.inputs);
        if self.regularization.lambda() < self.config.lambda_thre
            && k_rel_norm < self.config.k_rel_norm_thre
        {
            self.trace.push(TraceData {
                iter,
                cost: self.trajectory.total_cost(),
                lambda: self.regularization.lambda(),
                dlambda: self.regularization.dlambda(),
                k_rel_norm,
                duration_derivative,
                duration_backward,
                ..TraceData::default()
            });
            debug!("iteration {iter}: converged on relative feedforward norm {k_rel_norm:.3e}");
            return Step::Terminate(SolveStatus::Converged);
        }

        let started = Instant::now();
        let cost_old = self.trajectory.total_cost();
        let searched = line_search(
            &self.problem,
            &self.trajectory,
            &self.gains,
            backward.dv,
            &self.config,
        );
        let duration_forward = started.elapsed();

        let Some(LineSearchResult {
            candidate,
            alpha,
            cost_update_actual,
            cost_update_expected,
            cost_update_ratio,
        }) = searched
        else {
            let within_budget = self.regularization.increase(&self.config);
            self.push_failed_trace(iter, duration_derivative, duration_backward, duration_forward);
            if within_budget {
                debug!(
                    "iteration {iter}: line search exhausted, growing damping to {:.3e}",
                    self.regularization.lambda()
                );
                return Step::Continue;
            }
            warn!("iteration {iter}: damping ceiling reached after line-search exhaustion");
            return Step::Terminate(SolveStatus::RegularizationExceeded);
        };

        self.trajectory = candidate;
        self.regularization.decrease(&self.config);
        let cost = self.trajectory.total_cost();

        self.trace.push(TraceData {
            iter,
            cost,
            lambda: self.regularization.lambda(),
            dlambda: self.regularization.dlambda(),
            alpha,
            k_rel_norm,
            cost_update_actual,
            cost_update_expected,
            cost_update_ratio,
            duration_derivative,
            duration_backward,
            duration_forward,
        });

        if self.config.verbose {
            info!(
                "iteration {iter}: cost {cost:.6e} (down {cost_update_actual:.3e}), \
                 alpha {alpha:.3e}, lambda {:.3e}",
                self.regularization.lambda()
            );
        } else {
            debug!(
                "iteration {iter}: cost {cost:.6e} (down {cost_update_actual:.3e}), \
                 alpha {alpha:.3e}, lambda {:.3e}",
                self.regularization.lambda()
            );
        }

        let relative_improvement = cost_update_actual / cost_old.abs().max(1.0);
        if relative_improvement < self.config.cost_update_thre {
            debug!("iteration {iter}: converged on relative cost update {relative_improvement:.3e}");
            return Step::Terminate(SolveStatus::Converged);
        }
        Step::Continue
    }

    /// Record an iteration that accepted no candidate.
    fn push_failed_trace(
        &mut self,
        iter: usize,
        duration_derivative: Duration,
        duration_backward: Duration,
        duration_forward: Duration,
    ) {
        self.trace.push(TraceData {
            iter,
            cost: self.trajectory.total_cost(),
            lambda: self.regularization.lambda(),
            dlambda: self.regularization.dlambda(),
            duration_derivative,
            duration_backward,
            duration_forward,
            ..TraceData::default()
        });
    }

    fn log_termination(&self, status: SolveStatus, iter: usize) {
        let cost = self.trajectory.total_cost();
        if self.config.verbose {
            info!("solve finished after {iter} iterations: {status} (cost {cost:.6e})");
        } else {
            debug!("solve finished after {iter} iterations: {status} (cost {cost:.6e})");
        }
    }
}

/// Gradient-style convergence metric: the mean over the horizon of the
/// largest feedforward component relative to the corresponding input
/// magnitude (offset by 1 so near-zero inputs are well behaved).
fn relative_gain_norm(feedforward: &[DVector<f64>], inputs: &[DVector<f64>]) -> f64 {
    if feedforward.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for (kff, u) in feedforward.iter().zip(inputs) {
        let mut step_max = 0.0_f64;
        for i in 0..kff.len() {
            step_max = step_max.max(kff[i].abs() / (u[i].abs() + 1.0));
        }
        total += step_max;
    }
    total / feedforward.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{RunningCostDerivs, StateEqDerivs, TerminalCostDerivs};
    use approx::assert_relative_eq;
    use nalgebra::{dmatrix, dvector};

    /// Scalar integrator steering toward `target` through the terminal cost.
    struct Integrator {
        target: f64,
    }

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
            (x[0] - self.target) * (x[0] - self.target)
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
                vx: dvector![2.0 * (x[0] - self.target)],
                vxx: dmatrix![2.0],
            }
        }
    }

    fn zero_inputs(horizon: usize) -> Vec<DVector<f64>> {
        vec![dvector![0.0]; horizon]
    }

    #[test]
    fn construction_validates_config() {
        let config = DdpConfig {
            lambda_factor: 0.5,
            ..DdpConfig::default()
        };
        let err = DdpSolver::new(Integrator { target: 1.0 }, config).err();
        assert!(matches!(err, Some(DdpError::InvalidConfig { .. })));
    }

    #[test]
    fn solves_scalar_tracking_problem() {
        let config = DdpConfig::with_horizon_steps(10);
        let mut solver = DdpSolver::new(Integrator { target: 0.01 }, config).unwrap();
        let status = solver.solve(&dvector![0.0], &zero_inputs(10)).unwrap();

        assert_eq!(status, SolveStatus::Converged);
        assert_eq!(solver.trajectory().horizon(), 10);
        assert_eq!(solver.gains().horizon(), 10);
        assert!(solver.trace().len() >= 2);

        // Quadratic problem: one Newton step lands on the analytic optimum
        // sum(u) = target * N / (N + 1).
        let optimum = 0.01 * 10.0 / 11.0;
        let reached = solver.trajectory().terminal_state().unwrap()[0];
        assert_relative_eq!(reached, optimum, epsilon = 1e-8);
    }

    #[test]
    fn baseline_trace_record_reports_initial_rollout() {
        let config = DdpConfig::with_horizon_steps(5);
        let mut solver = DdpSolver::new(Integrator { target: 2.0 }, config).unwrap();
        solver.solve(&dvector![0.0], &zero_inputs(5)).unwrap();

        let baseline = &solver.trace()[0];
        assert_eq!(baseline.iter, 0);
        assert!(!baseline.accepted());
        // Zero inputs from zero state: cost is the pure terminal error.
        assert_relative_eq!(baseline.cost, 4.0);
    }

    #[test]
    fn resolve_resets_trace_and_state() {
        let config = DdpConfig::with_horizon_steps(5);
        let mut solver = DdpSolver::new(Integrator { target: 0.5 }, config).unwrap();
        solver.solve(&dvector![0.0], &zero_inputs(5)).unwrap();
        let first_len = solver.trace().len();

        solver.solve(&dvector![0.0], &zero_inputs(5)).unwrap();
        assert!(solver.trace().len() <= first_len);
        assert_eq!(solver.trace()[0].iter, 0);
    }

    #[test]
    fn relative_gain_norm_matches_hand_computation() {
        let feedforward = vec![dvector![0.2, -0.4], dvector![0.0, 0.1]];
        let inputs = vec![dvector![1.0, 1.0], dvector![0.0, 0.0]];
        // Step 0: max(0.2/2, 0.4/2) = 0.2; step 1: max(0, 0.1/1) = 0.1.
        let norm = relative_gain_norm(&feedforward, &inputs);
        assert_relative_eq!(norm, 0.15);
    }

    #[test]
    fn relative_gain_norm_of_empty_gains_is_zero() {
        assert_relative_eq!(relative_gain_norm(&[], &[]), 0.0);
    }
}
