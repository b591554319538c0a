//! Per-timestep derivative bundles.
//!
//! One [`Derivatives`] entry per horizon step, rebuilt from the current
//! trajectory every iteration. Evaluation has no cross-timestep dependency,
//! so it fans out across a rayon pool when the `parallel` feature is
//! enabled; results are collected in index order and are identical with the
//! feature on or off.

use nalgebra::{DMatrix, DVector};

use crate::problem::{DdpProblem, StateEqDerivs, StateEqHessians};
use crate::types::Trajectory;

/// All derivatives of the dynamics and running cost at one timestep.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Derivatives {
    /// State equation Jacobian w.r.t. the state, `n x n`.
    pub fx: DMatrix<f64>,
    /// State equation Jacobian w.r.t. the input, `n x m`.
    pub fu: DMatrix<f64>,
    /// Dynamics curvature tensors when full DDP is in effect.
    pub state_eq_hessians: Option<StateEqHessians>,
    /// Running cost gradient w.r.t. the state.
    pub lx: DVector<f64>,
    /// Running cost gradient w.r.t. the input.
    pub lu: DVector<f64>,
    /// Running cost Hessian w.r.t. the state.
    pub lxx: DMatrix<f64>,
    /// Running cost Hessian w.r.t. the input.
    pub luu: DMatrix<f64>,
    /// Running cost mixed state/input Hessian, `n x m`.
    pub lxu: DMatrix<f64>,
}

/// Evaluate the model over the whole horizon of `trajectory`.
///
/// `use_second_order` requests dynamics curvature tensors; steps where the
/// model returns `None` fall back to the Gauss-Newton approximation.
pub(crate) fn compute_derivatives<P: DdpProblem>(
    problem: &P,
    trajectory: &Trajectory,
    use_second_order: bool,
) -> Vec<Derivatives> {
    let eval = |k: usize| {
        let x = &trajectory.states[k];
        let u = &trajectory.inputs[k];
        let StateEqDerivs { fx, fu } = problem.state_eq_derivs(x, u);
        let state_eq_hessians = if use_second_order {
            problem.state_eq_second_derivs(x, u)
        } else {
            None
        };
        let cost = problem.running_cost_derivs(x, u);
        Derivatives {
            fx,
            fu,
            state_eq_hessians,
            lx: cost.lx,
            lu: cost.lu,
            lxx: cost.lxx,
            luu: cost.luu,
            lxu: cost.lxu,
        }
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
        (0..trajectory.horizon()).into_par_iter().map(eval).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        (0..trajectory.horizon()).map(eval).collect()
    }
}
