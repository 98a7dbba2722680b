//! **mazes** generates perfect mazes on a rectangular grid of walled cells, finds routes
//! through them and walks an agent along those routes.
//!
//! Generation and movement are steppable: a caller drives them one event at a time, or runs
//! them to completion in a single call.

pub mod cells;
pub mod errors;
pub mod generators;
pub mod grid;
pub mod grid_displays;
pub mod grid_iterators;
pub mod movement;
pub mod pathing;
pub mod units;
mod utils;

pub use crate::generators::{generate_maze, GenerationEvent, MazeGenerator};
pub use crate::movement::{follow_path, AgentMover, MovementEvent, PathFollower};
pub use crate::pathing::{find_path, Route};
