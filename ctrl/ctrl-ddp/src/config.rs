//! Solver configuration.
//!
//! All numeric knobs governing the optimization loop: iteration and horizon
//! counts, the regularization schedule, line-search candidates, and
//! convergence thresholds. The configuration is validated once at solver
//! construction and immutable during a solve.

use crate::error::{DdpError, DdpResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where the damping coefficient is injected in the backward pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RegularizationMode {
    /// Add `lambda * I` to the action-value curvature `Quu` just before
    /// factorization.
    #[default]
    Action,
    /// Add `lambda * I` to the value curvature `Vxx` before forming `Quu`
    /// and `Qux`. Penalizes state deviation rather than input deviation,
    /// which keeps the feedback gains bounded near singular `Quu`.
    Value,
}

impl std::fmt::Display for RegularizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action => write!(f, "action (Quu + lambda I)"),
            Self::Value => write!(f, "value (Vxx + lambda I)"),
        }
    }
}

/// Configuration for [`crate::DdpSolver`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DdpConfig {
    /// Emit per-iteration summaries at `info` level instead of `debug`.
    pub verbose: bool,

    /// Use second-order dynamics derivatives (full DDP). When false, or when
    /// the problem does not supply them, the dynamics curvature term is
    /// dropped (Gauss-Newton / iLQG approximation).
    pub use_state_eq_second_derivative: bool,

    /// Maximum number of optimization iterations.
    pub max_iter: usize,

    /// Number of steps in the horizon. The trajectory holds
    /// `horizon_steps + 1` states and `horizon_steps` inputs.
    pub horizon_steps: usize,

    /// Where damping is injected in the backward pass.
    pub regularization_mode: RegularizationMode,

    /// Initial damping coefficient.
    pub initial_lambda: f64,

    /// Initial multiplicative scaling factor of the damping coefficient.
    pub initial_dlambda: f64,

    /// Growth/decay factor of the damping scaling. Must exceed 1.
    pub lambda_factor: f64,

    /// Smallest nonzero damping coefficient. Decay below this snaps to zero.
    pub lambda_min: f64,

    /// Damping ceiling. Growth past this terminates the solve as failed.
    pub lambda_max: f64,

    /// Convergence threshold on the feedforward norm relative to the inputs.
    pub k_rel_norm_thre: f64,

    /// Damping threshold gating the gradient-based convergence test.
    pub lambda_thre: f64,

    /// Line-search step sizes, tried in order. Conventionally descending
    /// from 1. An empty list makes every forward pass fail, which drives
    /// the damping to its ceiling.
    pub alpha_list: Vec<f64>,

    /// Minimum ratio of actual to expected cost improvement for a
    /// line-search candidate to be accepted. The default of 0 accepts any
    /// candidate with a real improvement.
    pub cost_update_ratio_thre: f64,

    /// Convergence threshold on the relative cost improvement of an
    /// accepted iteration.
    pub cost_update_thre: f64,
}

impl Default for DdpConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            use_state_eq_second_derivative: false,
            max_iter: 500,
            horizon_steps: 100,
            regularization_mode: RegularizationMode::Action,
            initial_lambda: 1e-6,
            initial_dlambda: 1.0,
            lambda_factor: 1.6,
            lambda_min: 1e-6,
            lambda_max: 1e10,
            k_rel_norm_thre: 1e-4,
            lambda_thre: 1e-5,
            alpha_list: Self::log_spaced_alphas(10, 0.0, -3.0),
            cost_update_ratio_thre: 0.0,
            cost_update_thre: 1e-7,
        }
    }
}

impl DdpConfig {
    /// Create a config with the given horizon length.
    #[must_use]
    pub fn with_horizon_steps(horizon_steps: usize) -> Self {
        Self {
            horizon_steps,
            ..Default::default()
        }
    }

    /// Generate `count` step sizes `10^t` with `t` linearly spaced from
    /// `exp_hi` down to `exp_lo`.
    ///
    /// The default candidate list is `log_spaced_alphas(10, 0.0, -3.0)`.
    #[must_use]
    pub fn log_spaced_alphas(count: usize, exp_hi: f64, exp_lo: f64) -> Vec<f64> {
        match count {
            0 => Vec::new(),
            1 => vec![10f64.powf(exp_hi)],
            _ => {
                let step = (exp_lo - exp_hi) / (count - 1) as f64;
                (0..count)
                    .map(|i| 10f64.powf(exp_hi + step * i as f64))
                    .collect()
            }
        }
    }

    /// Set the maximum iteration count.
    #[must_use]
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the regularization mode.
    #[must_use]
    pub fn regularization_mode(mut self, mode: RegularizationMode) -> Self {
        self.regularization_mode = mode;
        self
    }

    /// Enable second-order dynamics derivatives (full DDP).
    #[must_use]
    pub fn with_second_order_dynamics(mut self) -> Self {
        self.use_state_eq_second_derivative = true;
        self
    }

    /// Replace the line-search candidate list.
    #[must_use]
    pub fn alpha_list(mut self, alphas: Vec<f64>) -> Self {
        self.alpha_list = alphas;
        self
    }

    /// Elevate per-iteration summaries to `info` level.
    #[must_use]
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Validate the configuration.
    ///
    /// An empty `alpha_list` is accepted: it is degenerate but well-defined
    /// (every forward pass fails and the solve terminates at the damping
    /// ceiling).
    pub fn validate(&self) -> DdpResult<()> {
        if self.max_iter == 0 {
            return Err(DdpError::invalid_config("max_iter must be at least 1"));
        }
        if self.horizon_steps == 0 {
            return Err(DdpError::invalid_config("horizon_steps must be at least 1"));
        }
        if !self.initial_lambda.is_finite() || self.initial_lambda < 0.0 {
            return Err(DdpError::invalid_config(
                "initial_lambda must be finite and non-negative",
            ));
        }
        if !self.initial_dlambda.is_finite() || self.initial_dlambda <= 0.0 {
            return Err(DdpError::invalid_config(
                "initial_dlambda must be finite and positive",
            ));
        }
        if !self.lambda_factor.is_finite() || self.lambda_factor <= 1.0 {
            return Err(DdpError::invalid_config("lambda_factor must exceed 1"));
        }
        if !self.lambda_min.is_finite() || self.lambda_min <= 0.0 {
            return Err(DdpError::invalid_config("lambda_min must be positive"));
        }
        if !self.lambda_max.is_finite() || self.lambda_max < self.lambda_min {
            return Err(DdpError::invalid_config(
                "lambda_max must be finite and at least lambda_min",
            ));
        }
        if self.initial_lambda > self.lambda_max {
            return Err(DdpError::invalid_config(
                "initial_lambda must not exceed lambda_max",
            ));
        }
        if !self.k_rel_norm_thre.is_finite() || self.k_rel_norm_thre < 0.0 {
            return Err(DdpError::invalid_config(
                "k_rel_norm_thre must be finite and non-negative",
            ));
        }
        if !self.lambda_thre.is_finite() || self.lambda_thre < 0.0 {
            return Err(DdpError::invalid_config(
                "lambda_thre must be finite and non-negative",
            ));
        }
        if !self.cost_update_thre.is_finite() || self.cost_update_thre < 0.0 {
            return Err(DdpError::invalid_config(
                "cost_update_thre must be finite and non-negative",
            ));
        }
        if !self.cost_update_ratio_thre.is_finite() {
            return Err(DdpError::invalid_config(
                "cost_update_ratio_thre must be finite",
            ));
        }
        for &alpha in &self.alpha_list {
            if !alpha.is_finite() || alpha <= 0.0 {
                return Err(DdpError::invalid_config(
                    "alpha_list entries must be finite and positive",
                ));
            }
        }
        Ok(())
    }
}
