//! Linear time-invariant dynamics with quadratic tracking costs.

use ctrl_ddp::{DdpProblem, RunningCostDerivs, StateEqDerivs, TerminalCostDerivs};
use nalgebra::{DMatrix, DVector};

/// LTI dynamics `x' = A x + B u` with quadratic costs
/// `0.5 (x - target)^T Q (x - target) + 0.5 u^T R u` per step and
/// `0.5 (x - target)^T Qf (x - target)` at the horizon end.
///
/// The DDP backward pass is exact on this problem class, so it doubles as a
/// correctness reference: one accepted iteration lands on the LQR optimum.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearQuadratic {
    a: DMatrix<f64>,
    b: DMatrix<f64>,
    q: DMatrix<f64>,
    r: DMatrix<f64>,
    q_terminal: DMatrix<f64>,
    target: DVector<f64>,
}

impl LinearQuadratic {
    /// Create a problem from its matrices.
    ///
    /// # Panics
    ///
    /// Panics when the matrix dimensions are inconsistent.
    #[must_use]
    pub fn new(
        a: DMatrix<f64>,
        b: DMatrix<f64>,
        q: DMatrix<f64>,
        r: DMatrix<f64>,
        q_terminal: DMatrix<f64>,
        target: DVector<f64>,
    ) -> Self {
        let n = a.nrows();
        let m = b.ncols();
        assert_eq!(a.shape(), (n, n), "A must be square");
        assert_eq!(b.nrows(), n, "B row count must match the state dimension");
        assert_eq!(q.shape(), (n, n), "Q must be n x n");
        assert_eq!(r.shape(), (m, m), "R must be m x m");
        assert_eq!(q_terminal.shape(), (n, n), "Qf must be n x n");
        assert_eq!(target.len(), n, "target must be state-dimensioned");
        Self {
            a,
            b,
            q,
            r,
            q_terminal,
            target,
        }
    }

    /// Discretized point mass (position, velocity) driven by acceleration,
    /// steered toward `target_position` at rest.
    #[must_use]
    pub fn double_integrator(dt: f64, target_position: f64) -> Self {
        Self::new(
            DMatrix::from_row_slice(2, 2, &[1.0, dt, 0.0, 1.0]),
            DMatrix::from_row_slice(2, 1, &[0.5 * dt * dt, dt]),
            DMatrix::zeros(2, 2),
            DMatrix::from_element(1, 1, 1e-2),
            DMatrix::from_diagonal(&DVector::from_vec(vec![1e3, 1e2])),
            DVector::from_vec(vec![target_position, 0.0]),
        )
    }

    /// The tracked target state.
    #[must_use]
    pub fn target(&self) -> &DVector<f64> {
        &self.target
    }
}

impl DdpProblem for LinearQuadratic {
    fn state_dim(&self) -> usize {
        self.a.nrows()
    }

    fn input_dim(&self) -> usize {
        self.b.ncols()
    }

    fn state_eq(&self, x: &DVector<f64>, u: &DVector<f64>) -> DVector<f64> {
        &self.a * x + &self.b * u
    }

    fn running_cost(&self, x: &DVector<f64>, u: &DVector<f64>) -> f64 {
        let dx = x - &self.target;
        0.5 * dx.dot(&(&self.q * &dx)) + 0.5 * u.dot(&(&self.r * u))
    }

    fn terminal_cost(&self, x: &DVector<f64>) -> f64 {
        let dx = x - &self.target;
        0.5 * dx.dot(&(&self.q_terminal * &dx))
    }

    fn state_eq_derivs(&self, _x: &DVector<f64>, _u: &DVector<f64>) -> StateEqDerivs {
        StateEqDerivs {
            fx: self.a.clone(),
            fu: self.b.clone(),
        }
    }

    fn running_cost_derivs(&self, x: &DVector<f64>, u: &DVector<f64>) -> RunningCostDerivs {
        let dx = x - &self.target;
        RunningCostDerivs {
            lx: &self.q * dx,
            lu: &self.r * u,
            lxx: self.q.clone(),
            luu: self.r.clone(),
            lxu: DMatrix::zeros(self.state_dim(), self.input_dim()),
        }
    }

    fn terminal_cost_derivs(&self, x: &DVector<f64>) -> TerminalCostDerivs {
        let dx = x - &self.target;
        TerminalCostDerivs {
            vx: &self.q_terminal * dx,
            vxx: self.q_terminal.clone(),
        }
    }
}
