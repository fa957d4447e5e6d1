use std::fmt::Debug;

/// A fixed, ordered set of discrete actions
///
/// The position of an action in [`ALL`](DiscreteAction::ALL) is its column in a value table, so the
/// ordering must never change between saving and loading a table.
pub trait DiscreteAction: Copy + Eq + Debug + 'static {
    /// Every action, in table order
    const ALL: &'static [Self];

    /// Column index of this action in a value table
    fn index(self) -> usize;

    /// Number of actions in the set
    fn count() -> usize {
        Self::ALL.len()
    }
}

/// A finite state space with a dense integer addressing scheme and state-dependent legal actions
///
/// This is everything a tabular learner needs to know about a problem. It deliberately says nothing
/// about how the states came about, so a learner can be driven by any environment (or none at all).
pub trait DiscreteSpace {
    /// A representation of the state of the environment to be passed to an agent
    type State: Clone + Debug;

    /// A representation of an action that an agent can take to affect the environment
    type Action: DiscreteAction;

    /// Map a state to its index in `0..total_states()`
    ///
    /// The mapping must be a bijection that stays stable for the lifetime of the space.
    fn state_index(&self, state: &Self::State) -> usize;

    /// Inverse of [`state_index`](DiscreteSpace::state_index)
    ///
    /// `index` must be in `0..total_states()`.
    fn state_at(&self, index: usize) -> Self::State;

    /// Total number of states
    fn total_states(&self) -> usize;

    /// Actions that can be taken in `state`
    ///
    /// May be empty for degenerate states; callers must handle that.
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;
}

/// Represents a Markov decision process, defining the dynamics of an environment
/// in which an agent can operate.
///
/// This base trait represents the common case of a discrete-time MDP with one agent
/// and a finite state space and action space.
pub trait Environment: DiscreteSpace {
    /// Reset the environment to an initial state
    ///
    /// **Returns** the state
    fn reset(&mut self) -> Self::State;

    /// Update the environment in response to an action taken by an agent, producing a new state and associated reward
    fn step(&mut self, action: Self::Action) -> Transition<Self::State>;
}

/// Outcome of a single [`Environment::step`]
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    /// The state of the environment after the action is taken
    pub next_state: S,
    /// The reward received for the action
    pub reward: f64,
    /// Whether `next_state` is terminal
    pub done: bool,
}

/// Represents a single experience or transition in the environment
#[derive(Debug, Clone, PartialEq)]
pub struct Exp<S, A> {
    /// The state of the environment before taking the action
    pub state: S,
    /// The action taken in the given state
    pub action: A,
    /// The reward received after taking the action
    pub reward: f64,
    /// The state of the environment after the action is taken
    pub next_state: S,
    /// Whether `next_state` is terminal
    pub done: bool,
}

impl<S, A> Exp<S, A> {
    /// Pair the state an action was taken in with the resulting [`Transition`]
    pub fn new(state: S, action: A, transition: Transition<S>) -> Self {
        let Transition {
            next_state,
            reward,
            done,
        } = transition;
        Self {
            state,
            action,
            reward,
            next_state,
            done,
        }
    }
}
