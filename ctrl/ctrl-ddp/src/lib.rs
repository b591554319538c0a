//! Differential Dynamic Programming (DDP / iLQG) trajectory optimizer.
//!
//! Given a discrete-time dynamics model, a running cost, and a terminal
//! cost, the solver computes a locally optimal state/input trajectory over a
//! fixed horizon together with time-varying feedback gains usable for
//! real-time tracking.
//!
//! # Algorithm
//!
//! Each iteration runs three phases:
//!
//! 1. **Derivatives**: evaluate the model's first (and optionally second)
//!    order derivatives along the current trajectory.
//! 2. **Backward pass**: a Riccati-like recursion from the horizon end
//!    expands the action-value function to second order at every step and
//!    solves for feedforward/feedback gains through a Cholesky
//!    factorization of the damped input curvature. Losing positive
//!    definiteness aborts the pass; the loop grows the damping and retries
//!    the same iteration.
//! 3. **Forward pass**: candidate trajectories are rolled out for a
//!    descending list of step sizes; the first candidate whose actual cost
//!    improvement is an acceptable fraction of the predicted improvement
//!    replaces the trajectory.
//!
//! Damping follows a Levenberg-Marquardt-style schedule: multiplicative
//! growth on failure, multiplicative decay on acceptance. Growth past the
//! configured ceiling terminates the solve as failed with the best-so-far
//! trajectory retained.
//!
//! See Tassa, Erez, Todorov, "Synthesis and stabilization of complex
//! behaviors through online trajectory optimization" (IROS 2012).
//!
//! # Layer 0 Crate
//!
//! Pure computation with **zero engine dependencies**: usable from headless
//! planners, hardware control loops, and tests alike. Per-timestep
//! derivative evaluation can fan out over a thread pool via the `parallel`
//! feature without changing results.
//!
//! # Quick Start
//!
//! ```ignore
//! use ctrl_ddp::{DdpConfig, DdpSolver};
//! use nalgebra::dvector;
//!
//! // `MyProblem` implements ctrl_ddp::DdpProblem.
//! let config = DdpConfig::with_horizon_steps(100);
//! let mut solver = DdpSolver::new(MyProblem::new(), config)?;
//!
//! let status = solver.solve(&x0, &initial_inputs)?;
//! if status.is_success() {
//!     let trajectory = solver.trajectory();
//!     let gains = solver.gains();
//!     // Track trajectory with u[k] + K[k] * (x - x_ref[k]).
//! }
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions, // DdpConfig, DdpSolver etc. are the natural names
    clippy::similar_names,           // qu/qux/quu are standard DDP notation
    clippy::many_single_char_names,  // n, m, k index dimensions and steps
    clippy::cast_precision_loss      // horizon counts fit in f64 exactly
)]

mod backward;
mod config;
mod derivatives;
mod error;
mod forward;
mod problem;
mod regularization;
mod solver;
mod trace;
mod types;

pub use config::{DdpConfig, RegularizationMode};
pub use error::{DdpError, DdpResult};
pub use problem::{
    DdpProblem, RunningCostDerivs, StateEqDerivs, StateEqHessians, TerminalCostDerivs,
};
pub use solver::{DdpSolver, SolveStatus};
pub use trace::TraceData;
pub use types::{Gains, Trajectory};
