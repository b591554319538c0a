//! The optimal control problem contract.
//!
//! A [`DdpProblem`] supplies the discrete state equation, the running and
//! terminal costs, and their derivatives. The solver treats it as stateless
//! and side-effect-free and calls it many times per iteration, so
//! implementations should keep individual evaluations cheap relative to the
//! solver's linear algebra.

use nalgebra::{DMatrix, DVector};

/// First-order derivatives of the state equation at one `(x, u)` point.
#[derive(Debug, Clone, PartialEq)]
pub struct StateEqDerivs {
    /// Jacobian w.r.t. the state, `n x n`.
    pub fx: DMatrix<f64>,
    /// Jacobian w.r.t. the input, `n x m`.
    pub fu: DMatrix<f64>,
}

/// Second-order derivatives of the state equation at one `(x, u)` point.
///
/// Each field is a rank-3 tensor stored as one matrix per output component:
/// `fxx[i]` is the `n x n` Hessian of the i-th component of the next state
/// w.r.t. the state, and similarly for `fuu` (`m x m`) and `fxu` (`n x m`).
#[derive(Debug, Clone, PartialEq)]
pub struct StateEqHessians {
    /// Per-output-component Hessians w.r.t. the state.
    pub fxx: Vec<DMatrix<f64>>,
    /// Per-output-component Hessians w.r.t. the input.
    pub fuu: Vec<DMatrix<f64>>,
    /// Per-output-component mixed state/input Hessians.
    pub fxu: Vec<DMatrix<f64>>,
}

/// First- and second-order derivatives of the running cost at one `(x, u)`
/// point.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningCostDerivs {
    /// Gradient w.r.t. the state, length `n`.
    pub lx: DVector<f64>,
    /// Gradient w.r.t. the input, length `m`.
    pub lu: DVector<f64>,
    /// Hessian w.r.t. the state, `n x n`.
    pub lxx: DMatrix<f64>,
    /// Hessian w.r.t. the input, `m x m`.
    pub luu: DMatrix<f64>,
    /// Mixed state/input Hessian, `n x m`.
    pub lxu: DMatrix<f64>,
}

/// First- and second-order derivatives of the terminal cost at one state.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalCostDerivs {
    /// Gradient w.r.t. the state, length `n`.
    pub vx: DVector<f64>,
    /// Hessian w.r.t. the state, `n x n`.
    pub vxx: DMatrix<f64>,
}

/// A discrete-time optimal control problem.
///
/// The contract mirrors the standard DDP problem statement: minimize the sum
/// of running costs plus a terminal cost subject to the state equation
/// `x[k+1] = f(x[k], u[k])` over a fixed horizon.
///
/// Derivative routines must be consistent with the corresponding value
/// routines. The solver cannot enforce this, but inconsistent derivatives
/// break convergence: the backward pass loses positive definiteness or the
/// line search rejects every candidate, and the solve ends at the damping
/// ceiling.
///
/// Cost second derivatives are always required. Dynamics second derivatives
/// are optional: [`DdpProblem::state_eq_second_derivs`] defaults to `None`,
/// in which case the solver drops the dynamics curvature term (Gauss-Newton
/// approximation) regardless of configuration.
///
/// Implementations must be `Sync` so per-timestep derivative evaluation can
/// be parallelized.
pub trait DdpProblem: Sync {
    /// State dimension `n`.
    fn state_dim(&self) -> usize;

    /// Input dimension `m`.
    fn input_dim(&self) -> usize;

    /// Discrete state equation: next state from `(x[k], u[k])`.
    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64>;

    /// Running cost `L[k]` at `(x[k], u[k])`.
    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64;

    /// Terminal cost at the final state.
    fn terminal_cost(&self, x: &DVector<f64>) -> f64;

    /// First-order derivatives of the state equation.
    fn state_eq_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> StateEqDerivs;

    /// Second-order derivatives of the state equation, if the model provides
    /// them. Consumed only when the solver is configured for full DDP.
    fn state_eq_second_derivs(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Option<StateEqHessians> {
        let _ = (x, u);
        None
    }

    /// First- and second-order derivatives of the running cost.
    fn running_cost_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs;

    /// First- and second-order derivatives of the terminal cost.
    fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs;
}

impl<P: DdpProblem + ?Sized> DdpProblem for &P {
    fn state_dim(&self) -> usize {
        (**self).state_dim()
    }

    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        (**self).state_eq(x, u)
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        (**self).running_cost(x, u)
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        (**self).terminal_cost(x)
    }

    fn state_eq_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> StateEqDerivs {
        (**self).state_eq_derivs(x, u)
    }

    fn state_eq_second_derivs(
        &self,
        x: &DVector<f64>,
        u: &DVector<f64>,
    ) -> Option<StateEqHessians> {
        (**self).state_eq_second_derivs(x, u)
    }

    fn running_cost_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs {
        (**self).running_cost_derivs(x, u)
    }

    fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs {
        (**self).terminal_cost_derivs(x)
    }
}
