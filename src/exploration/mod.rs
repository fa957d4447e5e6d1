/// Exploration policy result
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Choice {
    Explore,
    Exploit,
}

mod epsilon_greedy;

pub use epsilon_greedy::EpsilonGreedy;
