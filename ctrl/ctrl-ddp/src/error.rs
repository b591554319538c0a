//! Error types for solver construction and invocation.

use thiserror::Error;

/// Result alias for fallible ctrl-ddp operations.
pub type DdpResult<T> = Result<T, DdpError>;

/// Errors surfaced by [`crate::DdpSolver`].
///
/// These cover fail-fast precondition violations only. Numerical trouble
/// during optimization (loss of positive definiteness, line-search
/// exhaustion) is handled internally by the regularization schedule and
/// reported through [`crate::SolveStatus`], never as an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DdpError {
    /// Configuration rejected by validation.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// Initial input sequence length does not match the configured horizon.
    #[error("horizon mismatch: expected {expected} inputs, got {got}")]
    HorizonMismatch {
        /// Configured number of horizon steps.
        expected: usize,
        /// Length of the supplied input sequence.
        got: usize,
    },

    /// Initial state dimension does not match the problem.
    #[error("state dimension mismatch: expected {expected}, got {got}")]
    StateDimMismatch {
        /// State dimension reported by the problem.
        expected: usize,
        /// Dimension of the supplied state vector.
        got: usize,
    },

    /// An initial input vector dimension does not match the problem.
    #[error("input dimension mismatch at step {step}: expected {expected}, got {got}")]
    InputDimMismatch {
        /// Horizon step of the offending input.
        step: usize,
        /// Input dimension reported by the problem.
        expected: usize,
        /// Dimension of the supplied input vector.
        got: usize,
    },
}

impl DdpError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is a configuration error.
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::InvalidConfig { .. })
    }

    /// Check if this is a dimension error (horizon, state, or input).
    #[must_use]
    pub fn is_dimension_error(&self) -> bool {
        matches!(
            self,
            Self::HorizonMismatch { .. }
                | Self::StateDimMismatch { .. }
                | Self::InputDimMismatch { .. }
        )
    }
}
