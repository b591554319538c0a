//! Torque-driven pendulum swing-up and stabilization.
//!
//! State `[theta, omega]` with `theta = 0` hanging down and the upright
//! target at `theta = pi`. Discretized with a semi-implicit Euler step:
//! velocity first, then position with the new velocity.

use std::f64::consts::PI;

use ctrl_ddp::{
    DdpProblem, RunningCostDerivs, StateEqDerivs, StateEqHessians, TerminalCostDerivs,
};
use nalgebra::{DMatrix, DVector, dmatrix, dvector};

/// Physical and cost parameters for [`Pendulum`].
#[derive(Debug, Clone, PartialEq)]
pub struct PendulumParams {
    /// Point mass at the rod end (kg).
    pub mass: f64,
    /// Rod length (m).
    pub length: f64,
    /// Viscous joint damping (N m s / rad).
    pub damping: f64,
    /// Gravitational acceleration (m / s^2).
    pub gravity: f64,
    /// Integration timestep (s).
    pub dt: f64,
    /// Target angle; `pi` is upright.
    pub target_angle: f64,
    /// Running cost weight on torque.
    pub w_input: f64,
    /// Running cost weight on the angle error.
    pub w_angle: f64,
    /// Running cost weight on the angular velocity.
    pub w_velocity: f64,
    /// Terminal cost weight on the angle error.
    pub terminal_w_angle: f64,
    /// Terminal cost weight on the angular velocity.
    pub terminal_w_velocity: f64,
}

impl Default for PendulumParams {
    fn default() -> Self {
        Self {
            mass: 1.0,
            length: 1.0,
            damping: 0.05,
            gravity: 9.81,
            dt: 0.02,
            target_angle: PI,
            w_input: 1e-3,
            w_angle: 0.1,
            w_velocity: 0.01,
            terminal_w_angle: 100.0,
            terminal_w_velocity: 10.0,
        }
    }
}

/// Pendulum problem with analytic derivatives, including the dynamics
/// curvature tensors for full DDP.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pendulum {
    params: PendulumParams,
}

impl Pendulum {
    /// Create a pendulum with the given parameters.
    #[must_use]
    pub const fn new(params: PendulumParams) -> Self {
        Self { params }
    }

    /// The parameters in use.
    #[must_use]
    pub const fn params(&self) -> &PendulumParams {
        &self.params
    }

    /// The upright equilibrium state `[target_angle, 0]`.
    #[must_use]
    pub fn upright(&self) -> DVector<f64> {
        dvector![self.params.target_angle, 0.0]
    }

    /// Angular acceleration at `(theta, omega)` under torque `tau`.
    fn accel(&self, theta: f64, omega: f64, tau: f64) -> f64 {
        let p = &self.params;
        let inertia = p.mass * p.length * p.length;
        (tau - p.damping * omega - p.mass * p.gravity * p.length * theta.sin()) / inertia
    }
}

impl DdpProblem for Pendulum {
    fn state_dim(&self) -> usize {
        2
    }

    fn input_dim(&self) -> usize {
        1
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        let dt = self.params.dt;
        let omega_next = x[1] + dt * self.accel(x[0], x[1], u[0]);
        let theta_next = x[0] + dt * omega_next;
        dvector![theta_next, omega_next]
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        let p = &self.params;
        let angle_err = x[0] - p.target_angle;
        0.5 * (p.w_input * u[0] * u[0]
            + p.w_angle * angle_err * angle_err
            + p.w_velocity * x[1] * x[1])
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        let p = &self.params;
        let angle_err = x[0] - p.target_angle;
        0.5 * (p.terminal_w_angle * angle_err * angle_err
            + p.terminal_w_velocity * x[1] * x[1])
    }

    fn state_eq_derivs(&self, x: &DVector<f64>, _u: &DVector<f64>) -> StateEqDerivs {
        let p = &self.params;
        let dt = p.dt;
        let inertia = p.mass * p.length * p.length;
        let dacc_dtheta = -(p.gravity / p.length) * x[0].cos();
        let dacc_domega = -p.damping / inertia;
        let dacc_dtau = 1.0 / inertia;

        // Rows ordered [theta_next, omega_next]; theta_next sees the new
        // velocity, hence the dt^2 terms.
        StateEqDerivs {
            fx: dmatrix![
                1.0 + dt * dt * dacc_dtheta, dt * (1.0 + dt * dacc_domega);
                dt * dacc_dtheta, 1.0 + dt * dacc_domega
            ],
            fu: dmatrix![dt * dt * dacc_dtau; dt * dacc_dtau],
        }
    }

    fn state_eq_second_derivs(
        &self,
        x: &DVector<f64>,
        _u: &DVector<f64>,
    ) -> Option<StateEqHessians> {
        let p = &self.params;
        let dt = p.dt;
        // The only nonlinearity is the gravity torque, so the curvature
        // lives entirely in the (theta, theta) entry.
        let d2acc_dtheta2 = (p.gravity / p.length) * x[0].sin();

        let mut fxx_theta = DMatrix::zeros(2, 2);
        fxx_theta[(0, 0)] = dt * dt * d2acc_dtheta2;
        let mut fxx_omega = DMatrix::zeros(2, 2);
        fxx_omega[(0, 0)] = dt * d2acc_dtheta2;

        Some(StateEqHessians {
            fxx: vec![fxx_theta, fxx_omega],
            fuu: vec![DMatrix::zeros(1, 1); 2],
            fxu: vec![DMatrix::zeros(2, 1); 2],
        })
    }

    fn running_cost_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs {
        let p = &self.params;
        let angle_err = x[0] - p.target_angle;
        RunningCostDerivs {
            lx: dvector![p.w_angle * angle_err, p.w_velocity * x[1]],
            lu: dvector![p.w_input * u[0]],
            lxx: dmatrix![p.w_angle, 0.0; 0.0, p.w_velocity],
            luu: dmatrix![p.w_input],
            lxu: DMatrix::zeros(2, 1),
        }
    }

    fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs {
        let p = &self.params;
        let angle_err = x[0] - p.target_angle;
        TerminalCostDerivs {
            vx: dvector![p.terminal_w_angle * angle_err, p.terminal_w_velocity * x[1]],
            vxx: dmatrix![p.terminal_w_angle, 0.0; 0.0, p.terminal_w_velocity],
        }
    }
}
