use std::{fmt::Debug, hash::Hash};

use log::trace;
use rand::{seq::SliceRandom, Rng};

use crate::error::Result;

/// The outcome of applying one action to one state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition<S> {
    /// The state reached by the action
    pub next_state: S,
    /// The reward received for the action
    pub reward: f32,
    /// Whether `next_state` ends the episode
    pub done: bool,
}

impl<S> Transition<S> {
    /// The zero-reward terminal outcome returned for any step out of a finished episode
    pub fn idle(state: S) -> Self {
        Self {
            next_state: state,
            reward: 0.0,
            done: true,
        }
    }
}

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent
/// and a fully observable state. An implementor holds configuration only: the
/// transition is a pure function of `(state, action)` and the live state of an
/// episode belongs to a [`Simulation`].
pub trait Environment {
    /// A representation of the state of the environment to be passed to an agent
    type State: Copy + Eq + Hash + Debug;

    /// A representation of an action that an agent can take to affect the environment
    type Action: Copy + Eq + Hash + Debug;

    /// The state every episode starts from
    fn initial_state(&self) -> Self::State;

    /// Determine if the state ends an episode on its own, regardless of how it was reached
    fn is_terminal(&self, state: Self::State) -> bool;

    /// Compute the outcome of taking `action` in `state`
    ///
    /// A terminal `state` yields [`Transition::idle`].
    fn transition(&self, state: Self::State, action: Self::Action) -> Transition<Self::State>;
}

/// An environment with a finite, fixed action space
pub trait DiscreteActionSpace: Environment {
    /// Get every action in index order
    ///
    /// The returned vector should never be empty.
    fn actions(&self) -> Vec<Self::Action>;

    /// Position of `action` in [`actions`](Self::actions)
    fn action_index(&self, action: Self::Action) -> usize;

    /// Convert a raw action index into an action
    ///
    /// **Errors** with [`Error::InvalidAction`](crate::Error::InvalidAction) if `index` is out of range
    fn action_from_index(&self, index: usize) -> Result<Self::Action>;

    fn num_actions(&self) -> usize {
        self.actions().len()
    }

    /// Draw an action uniformly at random
    fn random_action<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Action {
        *self
            .actions()
            .choose(rng)
            .expect("The action space is not empty")
    }
}

/// An environment with a finite state space that maps onto dense table rows
pub trait DiscreteStateSpace: Environment {
    /// Get every enumerable state
    fn states(&self) -> Vec<Self::State>;

    /// Number of rows a dense table over this state space needs
    fn num_indices(&self) -> usize;

    /// Row of `state` in a dense table, always below [`num_indices`](Self::num_indices)
    fn state_index(&self, state: Self::State) -> usize;

    /// Inverse of [`state_index`](Self::state_index)
    ///
    /// **Errors** with [`Error::StateOutOfRange`](crate::Error::StateOutOfRange) if `index` is not below `num_indices`
    fn state_from_index(&self, index: usize) -> Result<Self::State>;
}

/// An environment together with the live state of one episode
///
/// This is the imperative face of an [`Environment`]: it owns the current state and the
/// termination flag, and every [`step`](Self::step) replaces them.
#[derive(Debug, Clone)]
pub struct Simulation<E: Environment> {
    env: E,
    state: E::State,
    done: bool,
}

impl<E: Environment> Simulation<E> {
    pub fn new(env: E) -> Self {
        let state = env.initial_state();
        Self {
            env,
            state,
            done: false,
        }
    }

    /// Reset the episode to the environment's initial state
    ///
    /// **Returns** the state
    pub fn reset(&mut self) -> E::State {
        self.state = self.env.initial_state();
        self.done = false;
        self.state
    }

    /// Apply an action to the current state
    ///
    /// Once the episode is over, every further call returns the final state with zero reward and `done`.
    pub fn step(&mut self, action: E::Action) -> Transition<E::State> {
        if self.done {
            return Transition::idle(self.state);
        }

        let transition = self.env.transition(self.state, action);
        trace!(
            "{:?} --{:?}--> {:?} ({})",
            self.state,
            action,
            transition.next_state,
            transition.reward
        );
        self.state = transition.next_state;
        self.done = transition.done;
        transition
    }

    /// The current state
    pub fn state(&self) -> E::State {
        self.state
    }

    /// Determine if the episode is still running
    pub fn is_active(&self) -> bool {
        !self.done
    }

    pub fn env(&self) -> &E {
        &self.env
    }
}
