pub mod monte_carlo;
pub mod q_table;

pub use monte_carlo::{MonteCarloConfig, MonteCarloPredictor};
pub use q_table::{QLearningAgent, QLearningConfig, QTable};
