use std::collections::BTreeSet;

use strum::{EnumIter, FromRepr, VariantArray};

use crate::{
    env::{DiscreteActionSpace, DiscreteStateSpace, Environment, Transition},
    error::{Error, Result},
};

/// Reward per cell advanced
const ADVANCE_REWARD: f32 = 0.2;
const GOAL_REWARD: f32 = 10.0;
const DEAD_END_REWARD: f32 = -1.0;

#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JumpAction {
    /// Move one cell forward unless an obstacle is in the way
    Walk = 0,
    /// Move two cells forward for one unit of energy
    Jump = 1,
}

impl From<JumpAction> for usize {
    fn from(action: JumpAction) -> Self {
        action as usize
    }
}

impl TryFrom<usize> for JumpAction {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        Self::from_repr(index).ok_or(Error::InvalidAction {
            index,
            num_actions: Self::VARIANTS.len(),
        })
    }
}

/// Position on the track and remaining jump energy
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JumpState {
    pub position: usize,
    pub energy: u32,
}

impl JumpState {
    pub const fn new(position: usize, energy: u32) -> Self {
        Self { position, energy }
    }
}

/// Configuration for a [`JumpGame`]
#[derive(Debug, Clone, PartialEq)]
pub struct JumpGameConfig {
    /// Length of the track; jumps that would reach this cell count as leaving the board
    ///
    /// **Default**: `10`
    pub board_size: usize,
    /// Cells that cannot be walked onto
    ///
    /// **Default**: `[3, 6, 8]`
    pub obstacles: Vec<usize>,
    /// Cell that ends the episode with the goal reward
    ///
    /// **Default**: `10`
    pub goal: usize,
    /// Jump energy at the start of every episode, also the largest energy a state can hold
    ///
    /// **Default**: `3`
    pub start_energy: u32,
}

impl Default for JumpGameConfig {
    fn default() -> Self {
        Self {
            board_size: 10,
            obstacles: vec![3, 6, 8],
            goal: 10,
            start_energy: 3,
        }
    }
}

/// A one-dimensional track with fixed obstacles and energy-limited jumps
///
/// The agent starts at cell 0 and moves only forward. Walking onto an obstacle leaves it
/// in place; a jump whose landing cell is an obstacle lands one cell short. Every cell
/// advanced earns a small reward, reaching the goal earns a large one, and being stuck
/// behind an obstacle with no usable jump ends the episode with a penalty.
#[derive(Debug, Clone)]
pub struct JumpGame {
    board_size: usize,
    obstacles: BTreeSet<usize>,
    goal: usize,
    start_energy: u32,
}

impl JumpGame {
    /// Build a game from a custom layout
    ///
    /// **Errors** if the goal is at cell 0 or an obstacle sits on the start or the goal
    pub fn new(config: JumpGameConfig) -> Result<Self> {
        let JumpGameConfig {
            board_size,
            obstacles,
            goal,
            start_energy,
        } = config;

        if goal == 0 {
            return Err(Error::config("goal must lie ahead of the start cell"));
        }
        if let Some(cell) = obstacles.iter().find(|&&c| c == 0 || c >= goal) {
            return Err(Error::config(format!(
                "obstacle at {cell} must lie strictly between the start and the goal"
            )));
        }

        Ok(Self {
            board_size,
            obstacles: obstacles.into_iter().collect(),
            goal,
            start_energy,
        })
    }

    pub fn goal(&self) -> usize {
        self.goal
    }

    pub fn board_size(&self) -> usize {
        self.board_size
    }

    pub fn max_energy(&self) -> u32 {
        self.start_energy
    }

    pub fn obstacles(&self) -> impl Iterator<Item = usize> + '_ {
        self.obstacles.iter().copied()
    }

    pub fn is_obstacle(&self, cell: usize) -> bool {
        self.obstacles.contains(&cell)
    }

    /// Blocked by an obstacle with no jump left, or with a jump that would leave the board
    fn is_dead_end(&self, state: JumpState) -> bool {
        self.is_obstacle(state.position + 1)
            && (state.energy == 0 || state.position + 2 >= self.board_size)
    }

    /// One-line picture of the track: `P` agent, `X` obstacle, `G` goal, `-` free
    pub fn render(&self, state: JumpState) -> String {
        (0..=self.goal)
            .map(|cell| {
                if cell == state.position {
                    'P'
                } else if cell == self.goal {
                    'G'
                } else if self.is_obstacle(cell) {
                    'X'
                } else {
                    '-'
                }
            })
            .collect()
    }
}

impl Default for JumpGame {
    fn default() -> Self {
        let JumpGameConfig {
            board_size,
            obstacles,
            goal,
            start_energy,
        } = JumpGameConfig::default();
        Self {
            board_size,
            obstacles: obstacles.into_iter().collect(),
            goal,
            start_energy,
        }
    }
}

impl Environment for JumpGame {
    type State = JumpState;
    type Action = JumpAction;

    fn initial_state(&self) -> Self::State {
        JumpState::new(0, self.start_energy)
    }

    fn is_terminal(&self, state: Self::State) -> bool {
        state.position >= self.goal
    }

    fn transition(&self, state: Self::State, action: Self::Action) -> Transition<Self::State> {
        if self.is_terminal(state) {
            return Transition::idle(state);
        }

        let mut next = state;
        match action {
            JumpAction::Walk => {
                if !self.is_obstacle(state.position + 1) {
                    next.position += 1;
                }
            }
            JumpAction::Jump => {
                if state.energy > 0 {
                    let target = state.position + 2;
                    next.position = if self.is_obstacle(target) {
                        target - 1
                    } else {
                        target
                    };
                    next.energy -= 1;
                }
            }
        }

        let mut reward = 0.0;
        let mut done = false;

        if next.position > state.position {
            reward = ADVANCE_REWARD * (next.position - state.position) as f32;
        }

        if next.position >= self.goal {
            next.position = self.goal;
            reward = GOAL_REWARD;
            done = true;
        } else if self.is_dead_end(next) {
            reward = DEAD_END_REWARD;
            done = true;
        }

        Transition {
            next_state: next,
            reward,
            done,
        }
    }
}

impl DiscreteActionSpace for JumpGame {
    fn actions(&self) -> Vec<Self::Action> {
        JumpAction::VARIANTS.to_vec()
    }

    fn action_index(&self, action: Self::Action) -> usize {
        action.into()
    }

    fn action_from_index(&self, index: usize) -> Result<Self::Action> {
        JumpAction::try_from(index)
    }
}

impl DiscreteStateSpace for JumpGame {
    /// Every `(position, energy)` pair, with the goal listed once at energy 0
    fn states(&self) -> Vec<Self::State> {
        let mut states = Vec::with_capacity(self.goal * (self.start_energy as usize + 1) + 1);
        for position in 0..self.goal {
            for energy in 0..=self.start_energy {
                states.push(JumpState::new(position, energy));
            }
        }
        states.push(JumpState::new(self.goal, 0));
        states
    }

    fn num_indices(&self) -> usize {
        (self.goal + 1) * (self.start_energy as usize + 1)
    }

    fn state_index(&self, state: Self::State) -> usize {
        let position = state.position.min(self.goal);
        let energy = state.energy.min(self.start_energy) as usize;
        position * (self.start_energy as usize + 1) + energy
    }

    fn state_from_index(&self, index: usize) -> Result<Self::State> {
        let num_indices = self.num_indices();
        if index >= num_indices {
            return Err(Error::StateOutOfRange { index, num_indices });
        }
        let width = self.start_energy as usize + 1;
        Ok(JumpState::new(index / width, (index % width) as u32))
    }
}

#[cfg(test)]
mod tests {
    use float_eq::assert_float_eq;

    use super::*;
    use crate::env::Simulation;

    fn game() -> JumpGame {
        JumpGame::default()
    }

    #[test]
    fn walk_into_obstacle_stays() {
        let t = game().transition(JumpState::new(2, 3), JumpAction::Walk);
        assert_eq!(t.next_state, JumpState::new(2, 3), "Obstacle at 3 blocks walking");
        assert_eq!(t.reward, 0.0);
        assert!(!t.done);
    }

    #[test]
    fn jump_onto_obstacle_lands_short() {
        let t = game().transition(JumpState::new(1, 3), JumpAction::Jump);
        assert_eq!(t.next_state, JumpState::new(2, 2), "Lands before 3 and spends energy");
        assert_float_eq!(t.reward, 0.2, abs <= 1e-6);
        assert!(!t.done);
    }

    #[test]
    fn jump_over_obstacle() {
        let t = game().transition(JumpState::new(2, 3), JumpAction::Jump);
        assert_eq!(t.next_state, JumpState::new(4, 2));
        assert_float_eq!(t.reward, 0.4, abs <= 1e-6);
        assert!(!t.done);
    }

    #[test]
    fn jump_to_goal_overrides_reward() {
        let t = game().transition(JumpState::new(8, 1), JumpAction::Jump);
        assert_eq!(t.next_state.position, 10);
        assert_eq!(t.reward, 10.0);
        assert!(t.done);

        let t = game().transition(JumpState::new(9, 0), JumpAction::Walk);
        assert_eq!(t.next_state, JumpState::new(10, 0));
        assert_eq!(t.reward, 10.0);
        assert!(t.done);
    }

    #[test]
    fn jump_without_energy_is_noop() {
        let t = game().transition(JumpState::new(0, 0), JumpAction::Jump);
        assert_eq!(t.next_state, JumpState::new(0, 0));
        assert_eq!(t.reward, 0.0);
        assert!(!t.done);
    }

    #[test]
    fn dead_end_without_energy() {
        // walking 1 -> 2 puts obstacle 3 ahead with no energy left
        let t = game().transition(JumpState::new(1, 0), JumpAction::Walk);
        assert_eq!(t.next_state, JumpState::new(2, 0));
        assert_eq!(t.reward, -1.0, "Penalty replaces the advance reward");
        assert!(t.done);
    }

    #[test]
    fn dead_end_when_jump_leaves_board() {
        let env = JumpGame::new(JumpGameConfig {
            board_size: 6,
            obstacles: vec![5],
            goal: 6,
            start_energy: 3,
        })
        .unwrap();
        let t = env.transition(JumpState::new(3, 2), JumpAction::Walk);
        assert_eq!(t.next_state, JumpState::new(4, 2));
        assert_eq!(t.reward, -1.0);
        assert!(t.done);
    }

    #[test]
    fn terminal_step_is_idempotent() {
        let mut sim = Simulation::new(game());
        sim.reset();
        for action in [JumpAction::Walk, JumpAction::Walk, JumpAction::Walk] {
            sim.step(action);
        }
        // 0 -> 1 -> 2, then blocked by 3 with energy left
        assert_eq!(sim.state(), JumpState::new(2, 3));
        assert!(sim.is_active());

        let end = sim.step(JumpAction::Jump);
        assert_eq!(end.next_state, JumpState::new(4, 2));

        let mut sim = Simulation::new(game());
        sim.reset();
        sim.step(JumpAction::Walk);
        sim.step(JumpAction::Jump);
        sim.step(JumpAction::Jump);
        sim.step(JumpAction::Jump);
        // 1 -> 2 -> 4 -> 5 (6 is blocked), energy gone, obstacle at 6 ahead
        assert_eq!(sim.state(), JumpState::new(5, 0));
        assert!(!sim.is_active());

        for action in [JumpAction::Walk, JumpAction::Jump, JumpAction::Walk] {
            let t = sim.step(action);
            assert_eq!(t, Transition::idle(JumpState::new(5, 0)));
        }
    }

    #[test]
    fn all_states_enumeration() {
        let env = game();
        let states = env.states();
        assert_eq!(states.len(), 10 * 4 + 1);
        assert!(states.contains(&env.initial_state()));
        assert_eq!(states.last(), Some(&JumpState::new(10, 0)));
        assert!(!states.contains(&JumpState::new(10, 1)));
        for s in &states {
            assert_eq!(env.state_from_index(env.state_index(*s)), Ok(*s));
        }
        assert!(env.state_from_index(env.num_indices()).is_err());
    }

    #[test]
    fn raw_actions_are_validated() {
        assert_eq!(JumpAction::try_from(1), Ok(JumpAction::Jump));
        assert_eq!(
            game().action_from_index(2),
            Err(Error::InvalidAction {
                index: 2,
                num_actions: 2
            })
        );
    }

    #[test]
    fn rejects_bad_layouts() {
        let config = JumpGameConfig {
            obstacles: vec![0, 4],
            ..Default::default()
        };
        assert!(JumpGame::new(config).is_err());
        assert!(JumpGame::new(JumpGameConfig::default()).is_ok());
    }

    #[test]
    fn render_board() {
        let env = game();
        assert_eq!(env.render(env.initial_state()), "P--X--X-X-G");
        assert_eq!(env.render(JumpState::new(10, 0)), "---X--X-X-P");
    }
}
