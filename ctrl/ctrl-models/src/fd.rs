//! Finite-difference dynamics Jacobians.
//!
//! For models without closed-form dynamics derivatives, these helpers build
//! the state-equation Jacobians by perturbing one coordinate at a time
//! through [`DdpProblem::state_eq`]. Centered differences give O(eps^2)
//! truncation error at twice the evaluation cost of forward differences.

use ctrl_ddp::{DdpProblem, StateEqDerivs};
use nalgebra::{DMatrix, DVector};

/// Options for finite-difference evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FdOptions {
    /// Perturbation magnitude. Must be in `(0, 1e-2]`; typical range is
    /// `1e-8` to `1e-4`.
    pub eps: f64,
    /// Use centered differences (O(eps^2) error, 2x cost) instead of
    /// forward differences (O(eps) error).
    pub centered: bool,
}

impl Default for FdOptions {
    fn default() -> Self {
        Self {
            eps: 1e-6,
            centered: true,
        }
    }
}

/// Finite-difference Jacobians of the state equation at `(x, u)`.
///
/// # Panics
///
/// Panics if `eps` is non-positive, non-finite, or greater than `1e-2`
/// (large perturbations invalidate the linearization).
#[must_use]
pub fn state_eq_jacobians<P: DdpProblem + ?Sized>(
    problem: &P,
    x: &DVector<f64>,
    u: &DVector<f64>,
    options: &FdOptions,
) -> StateEqDerivs {
    assert!(
        options.eps > 0.0 && options.eps.is_finite() && options.eps <= 1e-2,
        "fd eps must be in (0, 1e-2], got {}",
        options.eps
    );
    let n = problem.state_dim();
    let m = problem.input_dim();
    let eps = options.eps;
    let nominal = problem.state_eq(x, u);

    let mut fx = DMatrix::zeros(n, n);
    for i in 0..n {
        let mut xp = x.clone();
        xp[i] += eps;
        let fp = problem.state_eq(&xp, u);
        let column = if options.centered {
            let mut xm = x.clone();
            xm[i] -= eps;
            (fp - problem.state_eq(&xm, u)) / (2.0 * eps)
        } else {
            (fp - &nominal) / eps
        };
        fx.set_column(i, &column);
    }

    let mut fu = DMatrix::zeros(n, m);
    for j in 0..m {
        let mut up = u.clone();
        up[j] += eps;
        let fp = problem.state_eq(x, &up);
        let column = if options.centered {
            let mut um = u.clone();
            um[j] -= eps;
            (fp - problem.state_eq(x, &um)) / (2.0 * eps)
        } else {
            (fp - &nominal) / eps
        };
        fu.set_column(j, &column);
    }

    StateEqDerivs { fx, fu }
}
