//! Error types for pendulum-core.

use thiserror::Error;

/// Why the integrator could not finish the requested span.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum FailureCause {
    #[error("derivative evaluation produced a non-finite value")]
    NonFiniteDerivative,

    #[error("step size underflow (h = {0:e})")]
    StepSizeUnderflow(f64),

    #[error("step limit of {0} exceeded")]
    TooManySteps(usize),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// `t` and `state` are the last point the solver accepted.
    #[error("Integration failed at t = {t}: {cause}")]
    IntegrationFailure {
        cause: FailureCause,
        t: f64,
        state: Vec<f64>,
    },

    #[error("Cannot play back an empty frame sequence")]
    EmptyFrames,
}

pub type Result<T> = std::result::Result<T, SimError>;
