pub mod grid_world;
pub mod jump_game;

pub use grid_world::{Cell, GridAction, GridWorld, GridWorldConfig};
pub use jump_game::{JumpAction, JumpGame, JumpGameConfig, JumpState};
