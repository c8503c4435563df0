use std::collections::HashMap;

use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    assert_interval,
    decay::Decay,
    env::{DiscreteActionSpace, DiscreteStateSpace, Simulation, Transition},
    error::{Error, Result},
    exploration::{Choice, EpsilonGreedy},
    util::argmax,
};

/// Episodes between training progress reports
const REPORT_INTERVAL: usize = 100;

/// Configuration for the [`QLearningAgent`]
#[derive(Debug, Clone, PartialEq)]
pub struct QLearningConfig {
    /// Learning rate α
    ///
    /// **Default**: `0.1`
    pub alpha: f32,
    /// Discount factor γ
    ///
    /// **Default**: `0.9`
    pub gamma: f32,
    /// Initial exploration rate ε
    ///
    /// **Default**: `0.1`
    pub epsilon: f32,
    /// Seed for the exploration generator, or `None` to seed from system entropy
    ///
    /// **Default**: `None`
    pub seed: Option<u64>,
    /// Cut an on-line episode short after this many steps
    ///
    /// **Default**: `None`
    pub max_steps: Option<usize>,
}

impl Default for QLearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 0.1,
            seed: None,
            max_steps: None,
        }
    }
}

/// A dense table of action values, one row per state index and one column per action index
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    values: Vec<f32>,
    num_actions: usize,
}

impl QTable {
    /// A table of zeros
    pub fn new(num_states: usize, num_actions: usize) -> Self {
        Self {
            values: vec![0.0; num_states * num_actions],
            num_actions,
        }
    }

    pub fn num_states(&self) -> usize {
        self.values.len() / self.num_actions.max(1)
    }

    pub fn num_actions(&self) -> usize {
        self.num_actions
    }

    /// Action values of one state
    pub fn row(&self, state: usize) -> &[f32] {
        let start = state * self.num_actions;
        &self.values[start..start + self.num_actions]
    }

    /// Every row in state index order
    pub fn rows(&self) -> impl Iterator<Item = &[f32]> {
        self.values.chunks(self.num_actions.max(1))
    }

    pub fn get(&self, state: usize, action: usize) -> f32 {
        self.values[state * self.num_actions + action]
    }

    fn get_mut(&mut self, state: usize, action: usize) -> &mut f32 {
        &mut self.values[state * self.num_actions + action]
    }

    /// Largest action value of a state
    pub fn max(&self, state: usize) -> f32 {
        self.row(state)
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Index of the best action of a state, ties going to the lowest index
    pub fn best_action(&self, state: usize) -> usize {
        argmax(self.row(state)).unwrap_or(0)
    }
}

/// A Q-learning agent that learns its environment on-line with a Q-table
///
/// Every step applies the temporal-difference update
///
/// Q(s, a) ← Q(s, a) + α(target - Q(s, a))
///
/// where the target is the reward alone on terminal steps and r + γ max<sub>a'</sub> Q(s', a') otherwise.
/// Actions are chosen epsilon-greedily.
///
/// ### Generics
/// - `E` - The environment in which the agent will learn
///     - The state and action spaces must both be discrete because a Q value is stored for every pair
pub struct QLearningAgent<E>
where
    E: DiscreteStateSpace + DiscreteActionSpace,
{
    sim: Simulation<E>,
    actions: Vec<E::Action>,
    q_table: QTable,
    exploration: EpsilonGreedy,
    alpha: f32,
    gamma: f32,
    max_steps: Option<usize>,
    rng: StdRng,
    episode: u32,
}

impl<E> QLearningAgent<E>
where
    E: DiscreteStateSpace + DiscreteActionSpace,
{
    /// Initialize a new agent in a given environment with every Q value at zero
    ///
    /// **Panics** if `alpha`, `gamma` or `epsilon` is not in the interval `[0,1]`
    pub fn new(env: E, config: QLearningConfig) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let actions = env.actions();
        let q_table = QTable::new(env.num_indices(), actions.len());

        Self {
            sim: Simulation::new(env),
            actions,
            q_table,
            exploration: EpsilonGreedy::new(config.epsilon),
            alpha: config.alpha,
            gamma: config.gamma,
            max_steps: config.max_steps,
            rng,
            episode: 0,
        }
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Q value of one state-action pair
    pub fn q_value(&self, state: E::State, action: E::Action) -> f32 {
        let env = self.sim.env();
        self.q_table
            .get(env.state_index(state), env.action_index(action))
    }

    pub fn epsilon(&self) -> f32 {
        self.exploration.epsilon
    }

    /// Change the exploration rate, typically between episodes
    ///
    /// **Panics** if `epsilon` is not in the interval `[0,1]`
    pub fn set_epsilon(&mut self, epsilon: f32) {
        assert_interval!(epsilon, 0.0, 1.0);
        self.exploration.epsilon = epsilon;
    }

    /// Number of episodes run through [`go`](Self::go)
    pub fn episode(&self) -> u32 {
        self.episode
    }

    pub fn env(&self) -> &E {
        self.sim.env()
    }

    /// The live simulation, for driving the agent step by step
    pub fn simulation_mut(&mut self) -> &mut Simulation<E> {
        &mut self.sim
    }

    /// Best known action in `state`, ties going to the lowest action index
    pub fn greedy_action(&self, state: E::State) -> E::Action {
        let row = self.sim.env().state_index(state);
        self.actions[self.q_table.best_action(row)]
    }

    /// Choose an action based on the current state and exploration policy
    pub fn select_action(&mut self, state: E::State) -> E::Action {
        match self.exploration.choose(&mut self.rng) {
            Choice::Explore => self.sim.env().random_action(&mut self.rng),
            Choice::Exploit => self.greedy_action(state),
        }
    }

    /// Learn from a single transition
    pub fn learn(
        &mut self,
        state: E::State,
        action: E::Action,
        reward: f32,
        next_state: E::State,
        done: bool,
    ) {
        let env = self.sim.env();
        let (s, a) = (env.state_index(state), env.action_index(action));

        let target = if done {
            reward
        } else {
            reward + self.gamma * self.q_table.max(env.state_index(next_state))
        };

        let q_value = self.q_table.get_mut(s, a);
        *q_value += self.alpha * (target - *q_value);
    }

    /// The greedy action of every enumerable state
    pub fn optimal_policy(&self) -> HashMap<E::State, E::Action> {
        self.sim
            .env()
            .states()
            .into_iter()
            .map(|state| (state, self.greedy_action(state)))
            .collect()
    }

    /// Run one on-line episode, learning from every step
    ///
    /// **Returns** the total reward of the episode
    pub fn go(&mut self) -> f32 {
        let mut state = self.sim.reset();
        let mut total_reward = 0.0;
        let mut steps = 0;

        while self.sim.is_active() {
            if self.max_steps == Some(steps) {
                debug!("episode {} cut short after {steps} steps", self.episode);
                break;
            }

            let action = self.select_action(state);
            let Transition {
                next_state,
                reward,
                done,
            } = self.sim.step(action);
            self.learn(state, action, reward, next_state, done);

            state = next_state;
            total_reward += reward;
            steps += 1;
        }

        self.episode += 1;
        total_reward
    }

    /// Run `num_episodes` episodes, setting the exploration rate from `schedule` before each one
    ///
    /// The schedule is evaluated at the agent's running episode count, so consecutive calls
    /// continue where the last one stopped.
    ///
    /// **Returns** the total reward of every episode
    pub fn train<D: Decay>(&mut self, num_episodes: usize, schedule: &D) -> Vec<f32> {
        let mut rewards = Vec::with_capacity(num_episodes);

        for i in 0..num_episodes {
            self.set_epsilon(schedule.evaluate(self.episode as f32));
            rewards.push(self.go());

            if (i + 1) % REPORT_INTERVAL == 0 {
                let recent = &rewards[rewards.len() - REPORT_INTERVAL..];
                let average = recent.iter().sum::<f32>() / REPORT_INTERVAL as f32;
                info!(
                    "episode {}/{num_episodes}, average reward {average:.2}, epsilon {:.4}",
                    i + 1,
                    self.epsilon()
                );
            }
        }

        rewards
    }

    /// Follow the greedy policy from the initial state
    ///
    /// **Returns** every state visited, starting with the initial one
    ///
    /// **Errors** with [`Error::StepLimit`] if the path has not ended after `max_steps` steps
    pub fn greedy_path(&mut self, max_steps: usize) -> Result<Vec<E::State>> {
        let mut state = self.sim.reset();
        let mut path = vec![state];

        while self.sim.is_active() {
            if path.len() > max_steps {
                return Err(Error::StepLimit { max_steps });
            }
            let action = self.greedy_action(state);
            state = self.sim.step(action).next_state;
            path.push(state);
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decay,
        env::Environment,
        gym::{GridAction, GridWorld, JumpGame},
    };

    fn seeded(seed: u64) -> QLearningConfig {
        QLearningConfig {
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn starts_at_zero() {
        let agent = QLearningAgent::new(GridWorld::default(), seeded(0));
        let table = agent.q_table();
        assert_eq!(table.num_states(), 25);
        assert_eq!(table.num_actions(), 4);
        assert!(table.rows().all(|row| row.iter().all(|&q| q == 0.0)));
    }

    #[test]
    fn temporal_difference_update() {
        let mut agent = QLearningAgent::new(GridWorld::default(), seeded(0));

        agent.learn((3, 4), GridAction::Down, 1.0, (4, 4), true);
        assert!((agent.q_value((3, 4), GridAction::Down) - 0.1).abs() < 1e-6);

        // target = -0.01 + 0.9 * 0.1 = 0.08
        agent.learn((2, 4), GridAction::Down, -0.01, (3, 4), false);
        assert!((agent.q_value((2, 4), GridAction::Down) - 0.008).abs() < 1e-6);

        // terminal steps ignore the next state's values
        agent.learn((2, 4), GridAction::Right, -0.01, (3, 4), true);
        assert!((agent.q_value((2, 4), GridAction::Right) + 0.001).abs() < 1e-6);
    }

    #[test]
    fn greedy_ties_go_to_lowest_action() {
        let mut agent = QLearningAgent::new(GridWorld::default(), seeded(0));
        agent.set_epsilon(0.0);
        assert_eq!(agent.select_action((0, 0)), GridAction::Up);

        agent.learn((0, 0), GridAction::Down, 0.5, (1, 0), true);
        agent.learn((0, 0), GridAction::Right, 0.5, (0, 1), true);
        assert_eq!(agent.select_action((0, 0)), GridAction::Right);

        let policy = agent.optimal_policy();
        assert_eq!(policy.len(), 22);
        assert_eq!(policy[&(0, 0)], GridAction::Right);
        assert_eq!(policy[&(2, 3)], GridAction::Up);
    }

    #[test]
    fn full_exploration_uses_every_action() {
        let mut agent = QLearningAgent::new(GridWorld::default(), seeded(9));
        agent.set_epsilon(1.0);
        let mut seen = Vec::new();
        for _ in 0..200 {
            let action = agent.select_action((2, 3));
            if !seen.contains(&action) {
                seen.push(action);
            }
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn step_by_step_driving() {
        let mut agent = QLearningAgent::new(GridWorld::default(), seeded(4));
        let mut state = agent.simulation_mut().reset();
        let mut steps = 0;
        while agent.simulation_mut().is_active() && steps < 10_000 {
            let action = agent.select_action(state);
            let t = agent.simulation_mut().step(action);
            agent.learn(state, action, t.reward, t.next_state, t.done);
            state = t.next_state;
            steps += 1;
        }
        assert_eq!(state, (4, 4));
    }

    #[test]
    fn training_is_reproducible() {
        let schedule = decay::Step::new(0.9, 0.1, 0.0, 100.0).unwrap();

        let mut a = QLearningAgent::new(GridWorld::default(), seeded(17));
        let mut b = QLearningAgent::new(GridWorld::default(), seeded(17));
        let rewards_a = a.train(200, &schedule);
        let rewards_b = b.train(200, &schedule);

        assert_eq!(rewards_a, rewards_b);
        assert_eq!(a.q_table(), b.q_table());
        assert_eq!(a.episode(), 200);
        assert!((a.epsilon() - 0.09).abs() < 1e-6);
        assert!(a.q_table().rows().flatten().all(|q| q.is_finite()));
    }

    #[test]
    fn learns_path_around_obstacles() {
        let env = GridWorld::default();
        let mut agent = QLearningAgent::new(env, seeded(2024));
        let schedule = decay::Step::new(0.9, 0.1, 0.0, 100.0).unwrap();
        let rewards = agent.train(2000, &schedule);
        assert!(rewards.iter().all(|r| r.is_finite()));

        let path = agent.greedy_path(100).unwrap();
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(4, 4)));
        assert!(path.iter().all(|&cell| !agent.env().is_obstacle(cell)));
    }

    #[test]
    fn jump_game_training() {
        let config = QLearningConfig {
            seed: Some(8),
            max_steps: Some(500),
            ..Default::default()
        };
        let mut agent = QLearningAgent::new(JumpGame::default(), config);
        let schedule = decay::Constant::new(0.2);
        let rewards = agent.train(300, &schedule);

        assert_eq!(rewards.len(), 300);
        assert!(rewards.iter().all(|r| r.is_finite()));
        assert!(agent.q_table().rows().flatten().all(|q| q.is_finite()));

        let policy = agent.optimal_policy();
        assert_eq!(policy.len(), agent.env().states().len());
        assert!(agent.env().is_terminal(agent.env().state_from_index(40).unwrap()));
    }

    #[test]
    fn greedy_path_reports_cycles() {
        // untrained: Up at (0, 0) bumps the wall forever
        let mut agent = QLearningAgent::new(GridWorld::default(), seeded(0));
        assert_eq!(
            agent.greedy_path(20),
            Err(Error::StepLimit { max_steps: 20 })
        );
    }
}
