use rand::Rng;

use crate::assert_interval;

use super::Choice;

/// Epsilon greedy exploration policy with an episode-decayed epsilon threshold
///
/// Epsilon is multiplied by `decay` once per completed episode and never drops below `floor`.
#[derive(Clone, Debug, PartialEq)]
pub struct EpsilonGreedy {
    epsilon: f64,
    decay: f64,
    floor: f64,
}

impl EpsilonGreedy {
    /// Initialize epsilon greedy policy from a start value, per-episode decay multiplier and floor
    ///
    /// **Panics** if any parameter is not in the interval `[0,1]`, or if `start` is less than `floor`
    pub fn new(start: f64, decay: f64, floor: f64) -> Self {
        assert_interval!(start, 0.0, 1.0);
        assert_interval!(decay, 0.0, 1.0);
        assert_interval!(floor, 0.0, 1.0);
        assert!(
            start >= floor,
            "Epsilon start value must not be less than its floor."
        );
        Self {
            epsilon: start,
            decay,
            floor,
        }
    }

    /// Current exploration probability
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Overwrite the current exploration probability, e.g. when restoring a saved agent
    pub(crate) fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Invoke epsilon greedy policy with the current epsilon
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.gen::<f64>() < self.epsilon {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// ε ← max(floor, ε · decay)
    pub fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(self.floor);
    }
}
