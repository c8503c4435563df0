use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    assert_interval,
    env::{DiscreteStateSpace, Environment, Simulation},
    episode::{self, Episode},
};

/// Snapshots are taken on every episode index divisible by this, and on the last episode
const SNAPSHOT_INTERVAL: usize = 10;

/// Configuration for the [`MonteCarloPredictor`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloConfig {
    /// Discount factor γ - must be between 0 and 1
    ///
    /// **Default**: `0.9`
    pub gamma: f32,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self { gamma: 0.9 }
    }
}

/// A value table snapshot taken after the given episode index
pub type ValueSnapshot<S> = (usize, HashMap<S, f32>);

/// Monte Carlo prediction of state values under a fixed policy
///
/// Each episode is scanned backwards accumulating the discounted return
/// G ← γG + r<sub>t</sub>. A state contributes one return per episode: the one in effect
/// the first time the backward scan meets it, which is the return from the state's *last*
/// occurrence in forward order. The value of a state is the plain mean of every return
/// recorded for it.
pub struct MonteCarloPredictor<E: Environment> {
    sim: Simulation<E>,
    gamma: f32,
    values: HashMap<E::State, f32>,
    returns: HashMap<E::State, Vec<f32>>,
    visit_counts: HashMap<E::State, u32>,
    value_history: Vec<ValueSnapshot<E::State>>,
}

impl<E: Environment> MonteCarloPredictor<E> {
    /// **Panics** if `gamma` is not in the interval `[0,1]`
    pub fn new(env: E, config: MonteCarloConfig) -> Self {
        assert_interval!(config.gamma, 0.0, 1.0);
        Self {
            sim: Simulation::new(env),
            gamma: config.gamma,
            values: HashMap::new(),
            returns: HashMap::new(),
            visit_counts: HashMap::new(),
            value_history: Vec::new(),
        }
    }

    /// Forget every value, return, visit and snapshot
    pub fn reset(&mut self) {
        self.values.clear();
        self.returns.clear();
        self.visit_counts.clear();
        self.value_history.clear();
    }

    /// Estimate state values from `num_episodes` fresh episodes under `policy`
    ///
    /// Results from earlier calls are discarded first.
    pub fn predict<P>(&mut self, num_episodes: usize, policy: &mut P)
    where
        P: FnMut(E::State) -> E::Action,
    {
        self.reset();

        for i in 0..num_episodes {
            let episode = episode::generate(&mut self.sim, policy);
            self.update(&episode);

            if i % SNAPSHOT_INTERVAL == 0 || i + 1 == num_episodes {
                self.value_history.push((i, self.values.clone()));
                debug!(
                    "episode {i}: {} steps, {} states valued",
                    episode.len(),
                    self.values.len()
                );
            }
        }
    }

    /// Fold one episode's returns into the tables
    fn update(&mut self, episode: &Episode<E>) {
        let mut pending: HashSet<E::State> = episode.iter().map(|step| step.state).collect();

        let mut g = 0.0;
        for step in episode.iter().rev() {
            g = self.gamma * g + step.reward;

            if pending.remove(&step.state) {
                let returns = self.returns.entry(step.state).or_default();
                returns.push(g);
                let mean = returns.iter().sum::<f32>() / returns.len() as f32;
                self.values.insert(step.state, mean);
                *self.visit_counts.entry(step.state).or_default() += 1;
            }
        }
    }

    /// Estimated values of every state visited so far
    pub fn values(&self) -> &HashMap<E::State, f32> {
        &self.values
    }

    /// Every return recorded per state, in the order they were observed
    pub fn returns(&self) -> &HashMap<E::State, Vec<f32>> {
        &self.returns
    }

    /// Number of episodes that contributed a return for each state
    pub fn visit_counts(&self) -> &HashMap<E::State, u32> {
        &self.visit_counts
    }

    /// Value table snapshots in episode order
    pub fn value_history(&self) -> &[ValueSnapshot<E::State>] {
        &self.value_history
    }

    pub fn gamma(&self) -> f32 {
        self.gamma
    }

    pub fn env(&self) -> &E {
        self.sim.env()
    }
}

impl<E: DiscreteStateSpace> MonteCarloPredictor<E> {
    /// Values for every state the environment enumerates, 0 for states never visited
    pub fn value_table(&self) -> HashMap<E::State, f32> {
        self.sim
            .env()
            .states()
            .into_iter()
            .map(|state| (state, self.values.get(&state).copied().unwrap_or(0.0)))
            .collect()
    }
}
