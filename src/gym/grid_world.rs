use strum::{EnumIter, FromRepr, VariantArray};

use crate::{
    env::{DiscreteActionSpace, DiscreteStateSpace, Environment, Transition},
    error::{Error, Result},
};

/// `(row, col)` coordinates of a grid cell
pub type Cell = (usize, usize);

const GOAL_REWARD: f32 = 1.0;
const STEP_COST: f32 = -0.01;

#[derive(EnumIter, VariantArray, FromRepr, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridAction {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl From<GridAction> for usize {
    fn from(action: GridAction) -> Self {
        action as usize
    }
}

impl TryFrom<usize> for GridAction {
    type Error = Error;

    fn try_from(index: usize) -> Result<Self> {
        Self::from_repr(index).ok_or(Error::InvalidAction {
            index,
            num_actions: Self::VARIANTS.len(),
        })
    }
}

/// Configuration for a [`GridWorld`]
#[derive(Debug, Clone, PartialEq)]
pub struct GridWorldConfig {
    /// Side length of the square grid
    ///
    /// **Default**: `5`
    pub size: usize,
    /// Cells that cannot be entered
    ///
    /// **Default**: `[(1, 1), (2, 2), (3, 1)]`
    pub obstacles: Vec<Cell>,
    /// **Default**: `(4, 4)`
    pub goal: Cell,
    /// **Default**: `(0, 0)`
    pub start: Cell,
}

impl Default for GridWorldConfig {
    fn default() -> Self {
        Self {
            size: 5,
            obstacles: vec![(1, 1), (2, 2), (3, 1)],
            goal: (4, 4),
            start: (0, 0),
        }
    }
}

/// A square grid with fixed obstacles and a single goal
///
/// Moves are clamped at the walls and bounce off obstacles. Every move costs a little
/// and entering the goal pays out and ends the episode.
#[derive(Debug, Clone)]
pub struct GridWorld {
    size: usize,
    obstacles: Vec<Cell>,
    goal: Cell,
    start: Cell,
}

impl GridWorld {
    /// Build a grid from a custom layout
    ///
    /// **Errors** if the grid is empty, a cell lies outside it, or the start or goal is an obstacle
    pub fn new(config: GridWorldConfig) -> Result<Self> {
        let GridWorldConfig {
            size,
            obstacles,
            goal,
            start,
        } = config;

        if size == 0 {
            return Err(Error::config("grid size must be positive"));
        }
        let in_bounds = |(r, c): Cell| r < size && c < size;
        if let Some(cell) = obstacles
            .iter()
            .chain([&goal, &start])
            .find(|&&c| !in_bounds(c))
        {
            return Err(Error::config(format!(
                "cell {cell:?} lies outside the {size}x{size} grid"
            )));
        }
        if obstacles.contains(&goal) || obstacles.contains(&start) {
            return Err(Error::config("start and goal must not be obstacles"));
        }

        Ok(Self {
            size,
            obstacles,
            goal,
            start,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn goal(&self) -> Cell {
        self.goal
    }

    pub fn obstacles(&self) -> &[Cell] {
        &self.obstacles
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    /// Neighbouring cell in `action`'s direction, staying put at the walls
    fn shift(&self, (row, col): Cell, action: GridAction) -> Cell {
        let last = self.size - 1;
        match action {
            GridAction::Up => (row.saturating_sub(1), col),
            GridAction::Right => (row, (col + 1).min(last)),
            GridAction::Down => ((row + 1).min(last), col),
            GridAction::Left => (row, col.saturating_sub(1)),
        }
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        let GridWorldConfig {
            size,
            obstacles,
            goal,
            start,
        } = GridWorldConfig::default();
        Self {
            size,
            obstacles,
            goal,
            start,
        }
    }
}

impl Environment for GridWorld {
    type State = Cell;
    type Action = GridAction;

    fn initial_state(&self) -> Self::State {
        self.start
    }

    fn is_terminal(&self, state: Self::State) -> bool {
        state == self.goal
    }

    fn transition(&self, state: Self::State, action: Self::Action) -> Transition<Self::State> {
        if self.is_terminal(state) {
            return Transition::idle(state);
        }

        let mut next_state = self.shift(state, action);
        if self.is_obstacle(next_state) {
            next_state = state;
        }

        let done = next_state == self.goal;
        Transition {
            next_state,
            reward: if done { GOAL_REWARD } else { STEP_COST },
            done,
        }
    }
}

impl DiscreteActionSpace for GridWorld {
    fn actions(&self) -> Vec<Self::Action> {
        GridAction::VARIANTS.to_vec()
    }

    fn action_index(&self, action: Self::Action) -> usize {
        action.into()
    }

    fn action_from_index(&self, index: usize) -> Result<Self::Action> {
        GridAction::try_from(index)
    }
}

impl DiscreteStateSpace for GridWorld {
    /// Every cell that is not an obstacle, in row-major order
    fn states(&self) -> Vec<Self::State> {
        (0..self.size)
            .flat_map(|row| (0..self.size).map(move |col| (row, col)))
            .filter(|&cell| !self.is_obstacle(cell))
            .collect()
    }

    fn num_indices(&self) -> usize {
        self.size * self.size
    }

    fn state_index(&self, (row, col): Self::State) -> usize {
        row * self.size + col
    }

    fn state_from_index(&self, index: usize) -> Result<Self::State> {
        let num_indices = self.num_indices();
        if index >= num_indices {
            return Err(Error::StateOutOfRange { index, num_indices });
        }
        Ok((index / self.size, index % self.size))
    }
}
