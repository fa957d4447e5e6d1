use std::fmt;

use serde::{Deserialize, Serialize};

/// Dense `n_states x n_actions` table of action values, zero-initialized
///
/// Row `s` holds the values of every action in state `s`, in [`DiscreteAction::ALL`](crate::env::DiscreteAction::ALL) order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QTable {
    n_states: usize,
    n_actions: usize,
    values: Vec<f64>,
}

impl QTable {
    pub fn new(n_states: usize, n_actions: usize) -> Self {
        Self {
            n_states,
            n_actions,
            values: vec![0.0; n_states * n_actions],
        }
    }

    pub fn n_states(&self) -> usize {
        self.n_states
    }

    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    /// Whether the value buffer matches the declared shape
    pub(crate) fn is_well_formed(&self) -> bool {
        self.values.len() == self.n_states * self.n_actions
    }

    /// The values of every action in `state`
    pub fn row(&self, state: usize) -> &[f64] {
        let start = state * self.n_actions;
        &self.values[start..start + self.n_actions]
    }

    pub fn get(&self, state: usize, action: usize) -> f64 {
        self.values[state * self.n_actions + action]
    }

    pub(crate) fn get_mut(&mut self, state: usize, action: usize) -> &mut f64 {
        &mut self.values[state * self.n_actions + action]
    }

    /// Maximum value over all actions in `state`
    pub fn max(&self, state: usize) -> f64 {
        self.row(state)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// All values in row-major order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Shape, value range and fill ratio of the table
    pub fn summary(&self) -> TableSummary {
        let (min, max) = self
            .values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let nonzero = self.values.iter().filter(|&&v| v != 0.0).count();
        let nonzero_ratio = if self.values.is_empty() {
            0.0
        } else {
            nonzero as f64 / self.values.len() as f64
        };

        TableSummary {
            n_states: self.n_states,
            n_actions: self.n_actions,
            min,
            max,
            nonzero_ratio,
        }
    }
}

/// Inspection summary of a [`QTable`]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableSummary {
    pub n_states: usize,
    pub n_actions: usize,
    pub min: f64,
    pub max: f64,
    /// Fraction of entries that have moved away from zero
    pub nonzero_ratio: f64,
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Q-table shape: ({}, {})", self.n_states, self.n_actions)?;
        writeln!(f, "Q-value range: [{:.2}, {:.2}]", self.min, self.max)?;
        write!(f, "Non-zero Q-value ratio: {:.1}%", self.nonzero_ratio * 100.0)
    }
}
