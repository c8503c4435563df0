use rand::Rng;

use crate::assert_interval;

use super::Choice;

/// Epsilon greedy exploration policy
///
/// `epsilon` is a plain field so a training loop can adjust it between episodes,
/// for instance from a [`Decay`](crate::decay::Decay) schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpsilonGreedy {
    pub epsilon: f32,
}

impl EpsilonGreedy {
    /// Initialize epsilon greedy policy with a fixed exploration rate
    ///
    /// **Panics** if `epsilon` is not in the interval `[0,1]`
    pub fn new(epsilon: f32) -> Self {
        assert_interval!(epsilon, 0.0, 1.0);
        Self { epsilon }
    }

    /// Explore with probability `epsilon`, exploit otherwise
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f32>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }
}
