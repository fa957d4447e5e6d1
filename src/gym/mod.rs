pub mod grid_world;
pub mod preset;

pub use grid_world::{Action, Cell, GridMap, GridWorld, Pos};
pub use preset::MapPreset;
