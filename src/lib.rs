//! Tabular Q-learning in a grid world maze
//!
//! A [`GridWorld`](gym::GridWorld) models walls, traps, one-time bonuses and a goal; a
//! [`QTableAgent`](algo::QTableAgent) learns to navigate it through the
//! [`DiscreteSpace`](env::DiscreteSpace) contract alone.

/// Implemented RL algorithms
pub mod algo;

/// Environment and state space contracts
pub mod env;

/// Error types
pub mod error;

/// Exploration policies
pub mod exploration;

/// Maze environments
pub mod gym;

/// Training and evaluation loops
pub mod train;

mod util;

pub use error::{Error, Result};
