//! Adaptive damping schedule.
//!
//! Levenberg-Marquardt-style trust-region analogue for DDP: the damping
//! coefficient grows multiplicatively on backward- or forward-pass failure
//! and decays multiplicatively on accepted iterations. The scaling factor
//! `dlambda` accelerates consecutive moves in the same direction.

use crate::config::DdpConfig;

/// Damping coefficient and its scaling factor, persisted across iterations
/// within one solve and reset at the start of each solve.
///
/// Invariant after any update: `lambda == 0` (fully decayed) or
/// `lambda_min <= lambda <= lambda_max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Regularization {
    lambda: f64,
    dlambda: f64,
}

impl Regularization {
    /// Seed from the configured initial values.
    pub(crate) fn new(config: &DdpConfig) -> Self {
        Self {
            lambda: config.initial_lambda,
            dlambda: config.initial_dlambda,
        }
    }

    /// Current damping coefficient.
    pub(crate) fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Current scaling factor.
    pub(crate) fn dlambda(&self) -> f64 {
        self.dlambda
    }

    /// Grow the damping after a failed backward or forward pass.
    ///
    /// Returns false when the growth would push `lambda` past the ceiling,
    /// in which case `lambda` is clamped to `lambda_max` and the solve must
    /// terminate as failed. Growth multiplies by at least `lambda_factor`
    /// per call, so repeated failures reach the ceiling in finitely many
    /// steps.
    #[must_use]
    pub(crate) fn increase(&mut self, config: &DdpConfig) -> bool {
        self.dlambda = (self.dlambda * config.lambda_factor).max(config.lambda_factor);
        self.lambda = (self.lambda * self.dlambda).max(config.lambda_min);
        if self.lambda > config.lambda_max {
            self.lambda = config.lambda_max;
            false
        } else {
            true
        }
    }

    /// Decay the damping after an accepted iteration. Decay below
    /// `lambda_min` snaps to zero.
    pub(crate) fn decrease(&mut self, config: &DdpConfig) {
        self.dlambda = (self.dlambda / config.lambda_factor).min(1.0 / config.lambda_factor);
        let decayed = self.lambda * self.dlambda;
        self.lambda = if decayed >= config.lambda_min {
            decayed
        } else {
            0.0
        };
    }
}
