//! Error types for the crate

use thiserror::Error;

/// Errors produced by environments, episode generation and schedules
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid action index {index} (expected 0..{num_actions})")]
    InvalidAction { index: usize, num_actions: usize },

    #[error("state index {index} is out of range (expected 0..{num_indices})")]
    StateOutOfRange { index: usize, num_indices: usize },

    #[error("episode did not terminate within {max_steps} steps")]
    StepLimit { max_steps: usize },

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
