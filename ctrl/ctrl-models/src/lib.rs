//! Benchmark optimal-control problems for the [`ctrl_ddp`] solver.
//!
//! Canonical [`ctrl_ddp::DdpProblem`] implementations used by integration
//! tests, benchmarks, and as starting points for embedding the solver:
//!
//! - [`LinearQuadratic`]: LTI dynamics with quadratic tracking costs, the
//!   class the backward pass solves exactly in one step.
//! - [`Pendulum`]: torque-driven swing-up with analytic derivatives,
//!   including dynamics curvature for full DDP.
//! - [`CartPole`]: under-actuated balance/swing-up with finite-difference
//!   dynamics Jacobians from [`fd`].
//!
//! # Example
//!
//! ```
//! use ctrl_ddp::{DdpConfig, DdpSolver};
//! use ctrl_models::Pendulum;
//! use nalgebra::dvector;
//! use std::f64::consts::PI;
//!
//! let config = DdpConfig::with_horizon_steps(40).max_iter(100);
//! let mut solver = DdpSolver::new(Pendulum::default(), config).unwrap();
//!
//! // Stabilize from a small push away from upright.
//! let x0 = dvector![PI - 0.2, 0.0];
//! let inputs = vec![dvector![0.0]; 40];
//! let status = solver.solve(&x0, &inputs).unwrap();
//! assert!(status.is_success());
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions, // PendulumParams etc. are the natural names
    clippy::suboptimal_flops,        // textbook dynamics read better unfused
    clippy::similar_names            // dacc_dtheta / dacc_domega and friends
)]

pub mod fd;

mod cartpole;
mod linear;
mod pendulum;

pub use cartpole::{CartPole, CartPoleParams};
pub use linear::LinearQuadratic;
pub use pendulum::{Pendulum, PendulumParams};
