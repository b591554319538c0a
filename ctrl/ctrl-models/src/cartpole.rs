//! Cart-pole balance and swing-up.
//!
//! State `[position, velocity, angle, angular_velocity]` with the pole
//! upright at `angle = 0` and hanging at `angle = pi`. The input is a
//! horizontal force on the cart. Dynamics Jacobians come from finite
//! differences (see [`crate::fd`]); the cost derivatives are analytic.

use ctrl_ddp::{DdpProblem, RunningCostDerivs, StateEqDerivs, TerminalCostDerivs};
use nalgebra::{DMatrix, DVector, dmatrix, dvector};

use crate::fd::{FdOptions, state_eq_jacobians};

/// Physical and cost parameters for [`CartPole`].
#[derive(Debug, Clone, PartialEq)]
pub struct CartPoleParams {
    /// Cart mass (kg).
    pub cart_mass: f64,
    /// Pole mass (kg).
    pub pole_mass: f64,
    /// Half-length of the pole (m).
    pub pole_length: f64,
    /// Gravitational acceleration (m / s^2).
    pub gravity: f64,
    /// Integration timestep (s).
    pub dt: f64,
    /// Running cost weight on the force.
    pub w_input: f64,
    /// Running cost weights on `[position, velocity, angle, angular_velocity]`.
    pub w_state: [f64; 4],
    /// Terminal cost weights on the state.
    pub terminal_w_state: [f64; 4],
    /// Finite-difference options for the dynamics Jacobians.
    pub fd: FdOptions,
}

impl Default for CartPoleParams {
    fn default() -> Self {
        Self {
            cart_mass: 1.0,
            pole_mass: 0.1,
            pole_length: 0.5,
            gravity: 9.81,
            dt: 0.02,
            w_input: 1e-3,
            w_state: [0.1, 0.01, 1.0, 0.01],
            terminal_w_state: [10.0, 1.0, 100.0, 10.0],
            fd: FdOptions {
                eps: 1e-6,
                centered: true,
            },
        }
    }
}

/// Cart-pole problem regulating the state to the upright origin.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CartPole {
    params: CartPoleParams,
}

impl CartPole {
    /// Create a cart-pole with the given parameters.
    #[must_use]
    pub const fn new(params: CartPoleParams) -> Self {
        Self { params }
    }

    /// The parameters in use.
    #[must_use]
    pub const fn params(&self) -> &CartPoleParams {
        &self.params
    }

    /// Cart and pole accelerations at the given state under `force`.
    fn accelerations(&self, x: &DVector<f64>, force: f64) -> (f64, f64) {
        let p = &self.params;
        let total_mass = p.cart_mass + p.pole_mass;
        let (sin, cos) = x[2].sin_cos();
        let omega = x[3];

        let temp = (force + p.pole_mass * p.pole_length * omega * omega * sin) / total_mass;
        let angle_acc = (p.gravity * sin - cos * temp)
            / (p.pole_length * (4.0 / 3.0 - p.pole_mass * cos * cos / total_mass));
        let cart_acc = temp - p.pole_mass * p.pole_length * angle_acc * cos / total_mass;
        (cart_acc, angle_acc)
    }
}

impl DdpProblem for CartPole {
    fn state_dim(&self) -> usize {
        4
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        let dt = self.params.dt;
        let (cart_acc, angle_acc) = self.accelerations(x, u[0]);
        let velocity_next = x[1] + dt * cart_acc;
        let omega_next = x[3] + dt * angle_acc;
        dvector![
            x[0] + dt * velocity_next,
            velocity_next,
            x[2] + dt * omega_next,
            omega_next
        ]
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        let p = &self.params;
        let mut cost = 0.5 * p.w_input * u[0] * u[0];
        for i in 0..4 {
            cost += 0.5 * p.w_state[i] * x[i] * x[i];
        }
        cost
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        let p = &self.params;
        let mut cost = 0.0;
        for i in 0..4 {
            cost += 0.5 * p.terminal_w_state[i] * x[i] * x[i];
        }
        cost
    }

    fn state_eq_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> StateEqDerivs {
        state_eq_jacobians(self, x, u, &self.params.fd)
    }

    fn running_cost_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs {
        let p = &self.params;
        let lx = DVector::from_fn(4, |i, _| p.w_state[i] * x[i]);
        let lxx = DMatrix::from_diagonal(&DVector::from_row_slice(&p.w_state));
        RunningCostDerivs {
            lx,
            lu: dvector![p.w_input * u[0]],
            lxx,
            luu: dmatrix![p.w_input],
            lxu: DMatrix::zeros(4, 1),
        }
    }

    fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs {
        let p = &self.params;
        TerminalCostDerivs {
            vx: DVector::from_fn(4, |i, _| p.terminal_w_state[i] * x[i]),
            vxx: DMatrix::from_diagonal(&DVector::from_row_slice(&p.terminal_w_state)),
        }
    }
}
