//! Error types for the maze-rl crate

use thiserror::Error;

/// Main error type for the maze-rl crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid action code {code} (expected 0-3: up, down, left, right)")]
    InvalidAction { code: usize },

    #[error("unknown map preset '{name}'. Expected one of: simple, medium, hard")]
    UnknownPreset { name: String },

    #[error("invalid map: {reason}")]
    InvalidMap { reason: String },

    #[error(
        "snapshot table is {got_states}x{got_actions}, expected {expected_states}x{expected_actions}"
    )]
    SnapshotShape {
        expected_states: usize,
        expected_actions: usize,
        got_states: usize,
        got_actions: usize,
    },

    #[error("snapshot table holds {got} values, expected {expected}")]
    SnapshotLength { expected: usize, got: usize },

    #[error("snapshot table value {value} at state {state}, action {action} is not finite")]
    SnapshotValue {
        state: usize,
        action: usize,
        value: f64,
    },

    #[error("snapshot exploration rate {epsilon} is not in [0, 1]")]
    SnapshotEpsilon { epsilon: f64 },

    #[error("snapshot histories differ in length: {rewards} rewards, {steps} step counts")]
    SnapshotHistory { rewards: usize, steps: usize },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }
}
