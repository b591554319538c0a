//! Backward Riccati-like recursion.
//!
//! Runs from the end of the horizon to the start, expanding the action-value
//! function to second order at each step and solving for the feedforward and
//! feedback gains through a Cholesky factorization of the regularized input
//! curvature. Loss of positive definiteness at any step aborts the pass; the
//! optimization loop reacts by growing the damping and retrying.

use nalgebra::{Cholesky, DMatrix, DVector};

use crate::config::RegularizationMode;
use crate::derivatives::Derivatives;
use crate::problem::TerminalCostDerivs;
use crate::types::Gains;

/// Successful backward pass: gains for every step plus the expected cost
/// improvement, split into its linear and quadratic step-size terms.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BackwardPass {
    pub gains: Gains,
    /// `dv[0] = sum k^T Qu`, `dv[1] = 0.5 sum k^T Quu k`.
    pub dv: [f64; 2],
}

/// The regularized input curvature lost positive definiteness at `step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NotPositiveDefinite {
    pub step: usize,
}

/// Input curvature blocks `Quu` and `Qux` for one step, given the value
/// curvature to propagate through the dynamics.
fn input_curvature(
    d: &Derivatives,
    vx: &DVector<f64>,
    vxx: &DMatrix<f64>,
) -> (DMatrix<f64>, DMatrix<f64>) {
    let fu_t = d.fu.transpose();
    let mut quu = &d.luu + &fu_t * vxx * &d.fu;
    let mut qux = d.lxu.transpose() + &fu_t * vxx * &d.fx;
    if let Some(h) = &d.state_eq_hessians {
        for (i, vxi) in vx.iter().enumerate() {
            quu += &h.fuu[i] * *vxi;
            qux += h.fxu[i].transpose() * *vxi;
        }
    }
    (quu, qux)
}

/// Run the backward recursion over the whole horizon.
///
/// `lambda` is injected per `mode`: added to `Quu` before factorization, or
/// to `Vxx` before the curvature is propagated through the dynamics. Gains
/// solve the regularized system; the value-function propagation and the
/// expected improvement use the unregularized curvature.
pub(crate) fn backward_pass(
    derivs: &[Derivatives],
    terminal: &TerminalCostDerivs,
    lambda: f64,
    mode: RegularizationMode,
) -> Result<BackwardPass, NotPositiveDefinite> {
    let horizon = derivs.len();
    let mut vx = terminal.vx.clone();
    let mut vxx = terminal.vxx.clone();
    let mut feedforward = Vec::with_capacity(horizon);
    let mut feedback = Vec::with_capacity(horizon);
    let mut dv = [0.0, 0.0];

    for step in (0..horizon).rev() {
        let d = &derivs[step];
        let n = vx.len();
        let m = d.lu.len();

        let qx = &d.lx + d.fx.transpose() * &vx;
        let qu = &d.lu + d.fu.transpose() * &vx;
        let mut qxx = &d.lxx + d.fx.transpose() * &vxx * &d.fx;
        if let Some(h) = &d.state_eq_hessians {
            for (i, vxi) in vx.iter().enumerate() {
                qxx += &h.fxx[i] * *vxi;
            }
        }
        let (quu, qux) = input_curvature(d, &vx, &vxx);

        let (quu_reg, qux_reg) = match mode {
            RegularizationMode::Action => {
                let mut quu_reg = quu.clone();
                for i in 0..m {
                    quu_reg[(i, i)] += lambda;
                }
                (quu_reg, qux.clone())
            }
            RegularizationMode::Value => {
                let mut vxx_reg = vxx.clone();
                for i in 0..n {
                    vxx_reg[(i, i)] += lambda;
                }
                input_curvature(d, &vx, &vxx_reg)
            }
        };

        let Some(chol) = Cholesky::new(quu_reg) else {
            return Err(NotPositiveDefinite { step });
        };
        let kff = -chol.solve(&qu);
        let kfb = -chol.solve(&qux_reg);

        dv[0] += kff.dot(&qu);
        dv[1] += 0.5 * kff.dot(&(&quu * &kff));

        vx = qx + kfb.transpose() * (&quu * &kff) + kfb.transpose() * &qu + qux.transpose() * &kff;
        let vxx_raw =
            &qxx + kfb.transpose() * &quu * &kfb + kfb.transpose() * &qux + qux.transpose() * &kfb;
        vxx = (&vxx_raw + vxx_raw.transpose()) * 0.5;

        feedforward.push(kff);
        feedback.push(kfb);
    }

    feedforward.reverse();
    feedback.reverse();

    Ok(BackwardPass {
        gains: Gains {
            feedforward,
            feedback,
        },
        dv,
    })
}
