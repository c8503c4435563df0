//! Tabular reinforcement learning over small, fully observable environments
//!
//! Two learners share one environment contract: a [Monte Carlo predictor](algo::tabular::MonteCarloPredictor)
//! that estimates state values under a fixed policy, and a [Q-learning agent](algo::tabular::QLearningAgent)
//! that learns action values on-line with epsilon-greedy exploration.

/// Implemented RL algorithms
pub mod algo;

/// Implementations of strategies for time-decaying hyperparameters
pub mod decay;

/// Environment
pub mod env;

/// Episode generation
pub mod episode;

/// Exploration policies
pub mod exploration;

/// Testing environments
pub mod gym;

pub mod policy;

mod error;
mod util;

pub use error::{Error, Result};
