use std::{collections::HashMap, fmt};

use log::debug;

use crate::{
    env::{Environment, Simulation},
    error::{Error, Result},
};

/// One step of an episode
pub struct Step<E: Environment> {
    /// The state of the environment before taking the action
    pub state: E::State,
    /// The action taken in the given state
    pub action: E::Action,
    /// The reward received after taking the action
    pub reward: f32,
}

impl<E: Environment> Clone for Step<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: Environment> Copy for Step<E> {}

impl<E: Environment> fmt::Debug for Step<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("state", &self.state)
            .field("action", &self.action)
            .field("reward", &self.reward)
            .finish()
    }
}

/// An ordered trajectory from reset to termination
pub type Episode<E> = Vec<Step<E>>;

/// Run one full episode under `policy`
///
/// The simulation is reset first. There is no step cap: the environment's own rules must
/// end the episode, so a policy that can stall forever (for example, always walking into an
/// obstacle while energy remains) never returns. Use [`generate_bounded`] when that matters.
pub fn generate<E, P>(sim: &mut Simulation<E>, policy: &mut P) -> Episode<E>
where
    E: Environment,
    P: FnMut(E::State) -> E::Action,
{
    let mut episode = Vec::new();
    let mut state = sim.reset();
    while sim.is_active() {
        let action = policy(state);
        let transition = sim.step(action);
        episode.push(Step {
            state,
            action,
            reward: transition.reward,
        });
        state = transition.next_state;
    }

    episode
}

/// Like [`generate`], but gives up after `max_steps` steps
///
/// **Errors** with [`Error::StepLimit`] if the episode is still running after `max_steps` steps
pub fn generate_bounded<E, P>(
    sim: &mut Simulation<E>,
    policy: &mut P,
    max_steps: usize,
) -> Result<Episode<E>>
where
    E: Environment,
    P: FnMut(E::State) -> E::Action,
{
    let mut episode = Vec::new();
    let mut state = sim.reset();
    while sim.is_active() {
        if episode.len() == max_steps {
            return Err(Error::StepLimit { max_steps });
        }
        let action = policy(state);
        let transition = sim.step(action);
        episode.push(Step {
            state,
            action,
            reward: transition.reward,
        });
        state = transition.next_state;
    }

    Ok(episode)
}

/// Summary of a batch of episodes run under one policy
#[derive(Debug, Clone)]
pub struct PolicyEvaluation<S> {
    pub episodes: usize,
    /// Episodes that ended in a terminal state of the environment
    pub successes: usize,
    /// How often each state was the last one of an episode
    pub final_states: HashMap<S, usize>,
}

impl<S> PolicyEvaluation<S> {
    pub fn success_rate(&self) -> f32 {
        if self.episodes == 0 {
            return 0.0;
        }
        self.successes as f32 / self.episodes as f32
    }
}

/// Run `num_episodes` episodes under `policy` and tally where they end
///
/// An episode succeeds when its final state is [terminal](Environment::is_terminal) on its own,
/// which excludes episodes cut short by a dead end.
pub fn evaluate<E, P>(
    sim: &mut Simulation<E>,
    policy: &mut P,
    num_episodes: usize,
    max_steps: usize,
) -> Result<PolicyEvaluation<E::State>>
where
    E: Environment,
    P: FnMut(E::State) -> E::Action,
{
    let mut evaluation = PolicyEvaluation {
        episodes: num_episodes,
        successes: 0,
        final_states: HashMap::new(),
    };

    for _ in 0..num_episodes {
        generate_bounded(sim, policy, max_steps)?;
        let last = sim.state();
        if sim.env().is_terminal(last) {
            evaluation.successes += 1;
        }
        *evaluation.final_states.entry(last).or_default() += 1;
    }

    debug!(
        "policy succeeded in {}/{} episodes",
        evaluation.successes, evaluation.episodes
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::{
        gym::{GridAction, GridWorld, JumpAction, JumpGame, JumpState},
        policy,
    };

    #[test]
    fn episode_records_state_before_step() {
        let mut sim = Simulation::new(JumpGame::default());
        let mut script = [JumpAction::Walk, JumpAction::Walk, JumpAction::Jump].into_iter();
        let mut policy = |s: JumpState| {
            script.next().unwrap_or(if [6, 8].contains(&(s.position + 1)) {
                JumpAction::Jump
            } else {
                JumpAction::Walk
            })
        };
        let episode = generate(&mut sim, &mut policy);

        assert_eq!(episode[0].state, JumpState::new(0, 3));
        assert_eq!(episode[1].state, JumpState::new(1, 3));
        assert_eq!(episode[2].state, JumpState::new(2, 3));
        assert_eq!(episode[2].action, JumpAction::Jump);
        assert_eq!(episode[3].state, JumpState::new(4, 2));
        // 4 -> 5 -> 7 -> 9 -> 10
        assert_eq!(episode.len(), 7);
        assert_eq!(episode.last().map(|s| s.reward), Some(10.0));
        assert!(!sim.is_active());
    }

    #[test]
    fn walking_into_goal_ends_episode() {
        let mut sim = Simulation::new(GridWorld::default());
        let mut policy = |(row, col): (usize, usize)| {
            if col < 4 && row == 0 {
                GridAction::Right
            } else {
                GridAction::Down
            }
        };
        let episode = generate(&mut sim, &mut policy);
        assert_eq!(episode.len(), 8);
        assert_eq!(episode.last().map(|s| s.reward), Some(1.0));
        let total: f32 = episode.iter().map(|s| s.reward).sum();
        assert!((total - (1.0 - 0.07)).abs() < 1e-5);
    }

    #[test]
    fn bounded_generation_stops_stalled_policy() {
        let mut sim = Simulation::new(JumpGame::default());
        let mut always_walk = |_: JumpState| JumpAction::Walk;
        let result = generate_bounded(&mut sim, &mut always_walk, 50);
        assert_eq!(result.unwrap_err(), Error::StepLimit { max_steps: 50 });
    }

    #[test]
    fn random_episodes_terminate() {
        let env = JumpGame::default();
        let mut policy = policy::uniform_random(&env, StdRng::seed_from_u64(7));
        let mut sim = Simulation::new(env);
        for _ in 0..200 {
            let episode = generate_bounded(&mut sim, &mut policy, 10_000).unwrap();
            let total: f32 = episode.iter().map(|s| s.reward).sum();
            assert!(total.is_finite());
            assert!(!episode.is_empty());
        }
    }

    #[test]
    fn evaluation_counts_outcomes() {
        let mut sim = Simulation::new(JumpGame::default());
        // jump whenever an obstacle is ahead, walk otherwise
        let mut policy = |s: JumpState| {
            if [3, 6, 8].contains(&(s.position + 1)) {
                JumpAction::Jump
            } else {
                JumpAction::Walk
            }
        };
        let evaluation = evaluate(&mut sim, &mut policy, 5, 100).unwrap();
        assert_eq!(evaluation.successes, 5);
        assert_eq!(evaluation.success_rate(), 1.0);
        assert_eq!(evaluation.final_states[&JumpState::new(10, 0)], 5);
    }
}
