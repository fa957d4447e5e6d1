use std::marker::PhantomData;

use log::{debug, warn};
use rand::{rngs::StdRng, seq::SliceRandom, Rng};

use crate::{
    assert_interval,
    env::{DiscreteAction, DiscreteSpace, Environment, Exp},
    error::{Error, Result},
    exploration::{Choice, EpsilonGreedy},
};

use super::{Policy, QTable, Snapshot, TableSummary};

/// Configuration for the [`QTableAgent`]
#[derive(Debug, Clone, PartialEq)]
pub struct QTableAgentConfig {
    /// Learning rate α
    ///
    /// **Default**: `0.1`
    pub alpha: f64,
    /// Discount factor γ
    ///
    /// **Default**: `0.9`
    pub gamma: f64,
    /// Initial exploration probability ε
    ///
    /// **Default**: `1.0`
    pub epsilon: f64,
    /// Multiplier applied to ε after every training episode
    ///
    /// **Default**: `0.995`
    pub epsilon_decay: f64,
    /// Lower bound for ε
    ///
    /// **Default**: `0.01`
    pub epsilon_min: f64,
}

impl Default for QTableAgentConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            epsilon: 1.0,
            epsilon_decay: 0.995,
            epsilon_min: 0.01,
        }
    }
}

/// Totals for one training episode
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EpisodeSummary {
    pub reward: f64,
    pub steps: usize,
    /// Whether the episode ended in a terminal state rather than by running out of steps
    pub terminated: bool,
}

/// Totals and trajectory of one greedy test episode
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout<S> {
    pub reward: f64,
    pub steps: usize,
    pub terminated: bool,
    /// Every state visited, starting with the reset state
    pub path: Vec<S>,
}

/// A Q-learning agent that keeps a dense [`QTable`] over an indexed state space
///
/// The agent only knows the problem through [`DiscreteSpace`]: state indices, the number of states,
/// and which actions are legal where. Values are updated with the one-step rule
///
/// Q(s,a) ← Q(s,a) + α(target − Q(s,a)), target = r if terminal, else r + γ max<sub>a'</sub> Q(s',a')
///
/// ### Generics
/// - `A` - The [`DiscreteAction`] set, one table column per action
/// - `R` - The random source used for exploration and greedy tie-breaks
pub struct QTableAgent<A, R = StdRng> {
    q_table: QTable,
    exploration: EpsilonGreedy,
    alpha: f64,
    gamma: f64,
    rewards_history: Vec<f64>,
    steps_history: Vec<usize>,
    rng: R,
    _action: PhantomData<fn() -> A>,
}

impl<A, R> QTableAgent<A, R>
where
    A: DiscreteAction,
    R: Rng,
{
    /// Initialize a new `QTableAgent` sized for `space`
    ///
    /// **Panics** if `alpha`, `gamma` or any exploration parameter is not in the interval `[0,1]`
    pub fn new<S>(space: &S, config: QTableAgentConfig, rng: R) -> Self
    where
        S: DiscreteSpace<Action = A>,
    {
        Self::with_states(space.total_states(), config, rng)
    }

    /// Initialize a new `QTableAgent` for `n_states` states
    ///
    /// **Panics** under the same conditions as [`new`](QTableAgent::new)
    pub fn with_states(n_states: usize, config: QTableAgentConfig, rng: R) -> Self {
        assert_interval!(config.alpha, 0.0, 1.0);
        assert_interval!(config.gamma, 0.0, 1.0);
        Self {
            q_table: QTable::new(n_states, A::count()),
            exploration: EpsilonGreedy::new(
                config.epsilon,
                config.epsilon_decay,
                config.epsilon_min,
            ),
            alpha: config.alpha,
            gamma: config.gamma,
            rewards_history: Vec::new(),
            steps_history: Vec::new(),
            rng,
            _action: PhantomData,
        }
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    /// Current exploration probability
    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    /// Total reward of every training episode so far
    pub fn rewards_history(&self) -> &[f64] {
        &self.rewards_history
    }

    /// Step count of every training episode so far
    pub fn steps_history(&self) -> &[usize] {
        &self.steps_history
    }

    pub fn summary(&self) -> TableSummary {
        self.q_table.summary()
    }

    /// Choose an action for the state with index `state`
    ///
    /// When `exploring`, a uniformly random legal action is taken with probability ε. Otherwise the
    /// legal action with the highest value is taken, with ties broken uniformly at random. If no
    /// action is legal, the full action set stands in for the legal one.
    pub fn choose_action(&mut self, state: usize, exploring: bool, legal: &[A]) -> A {
        let candidates = if legal.is_empty() {
            warn!("state {state} has no legal actions, falling back to the full action set");
            A::ALL
        } else {
            legal
        };

        if exploring && self.exploration.choose(&mut self.rng) == Choice::Explore {
            return *candidates
                .choose(&mut self.rng)
                .expect("candidate actions are never empty");
        }

        let row = self.q_table.row(state);
        let best = candidates
            .iter()
            .map(|a| row[a.index()])
            .fold(f64::NEG_INFINITY, f64::max);
        let ties = candidates
            .iter()
            .copied()
            .filter(|a| row[a.index()] == best)
            .collect::<Vec<_>>();

        // empty only if the row holds NaN
        let pool = if ties.is_empty() {
            candidates
        } else {
            &ties[..]
        };
        *pool
            .choose(&mut self.rng)
            .expect("candidate actions are never empty")
    }

    /// Choose an action for `state`, looking up its index and legal actions in `space`
    pub fn act<S>(&mut self, space: &S, state: &S::State, exploring: bool) -> A
    where
        S: DiscreteSpace<Action = A>,
    {
        let legal = space.legal_actions(state);
        self.choose_action(space.state_index(state), exploring, &legal)
    }

    /// Apply the one-step Q-learning update to `(state, action)`
    ///
    /// A terminal transition (`done`) ignores `next_state` entirely.
    pub fn update(&mut self, state: usize, action: A, reward: f64, next_state: usize, done: bool) {
        let target = if done {
            reward
        } else {
            reward + self.gamma * self.q_table.max(next_state)
        };
        let q = self.q_table.get_mut(state, action.index());
        *q += self.alpha * (target - *q);
    }

    /// Learn from a given experience and update the table
    pub fn learn<S>(&mut self, space: &S, experience: &Exp<S::State, A>)
    where
        S: DiscreteSpace<Action = A>,
    {
        let Exp {
            state,
            action,
            reward,
            next_state,
            done,
        } = experience;

        self.update(
            space.state_index(state),
            *action,
            *reward,
            space.state_index(next_state),
            *done,
        );
    }

    /// Decay ε once; called at the end of every training episode
    pub fn decay_exploration(&mut self) {
        self.exploration.decay();
    }

    /// Greedy action for every state of `space`
    ///
    /// Ties go to the action listed first by [`DiscreteSpace::legal_actions`]. `space` must have as many
    /// states as the table.
    pub fn policy<S>(&self, space: &S) -> Policy<A>
    where
        S: DiscreteSpace<Action = A>,
    {
        (0..space.total_states())
            .map(|index| {
                let row = self.q_table.row(index);
                space
                    .legal_actions(&space.state_at(index))
                    .into_iter()
                    .reduce(|best, a| {
                        if row[a.index()] > row[best.index()] {
                            a
                        } else {
                            best
                        }
                    })
            })
            .collect()
    }

    /// Run one training episode of at most `max_steps` steps, then decay ε
    pub fn train_episode<E>(&mut self, env: &mut E, max_steps: usize) -> EpisodeSummary
    where
        E: Environment<Action = A>,
    {
        let mut state = env.reset();
        let mut summary = EpisodeSummary::default();

        for _ in 0..max_steps {
            let action = self.act(&*env, &state, true);
            let experience = Exp::new(state, action, env.step(action));
            self.learn(&*env, &experience);

            summary.reward += experience.reward;
            summary.steps += 1;
            summary.terminated = experience.done;
            state = experience.next_state;
            if summary.terminated {
                break;
            }
        }

        self.decay_exploration();
        self.rewards_history.push(summary.reward);
        self.steps_history.push(summary.steps);
        debug!(
            "episode {}: reward={:.1} steps={} epsilon={:.3}",
            self.rewards_history.len(),
            summary.reward,
            summary.steps,
            self.epsilon()
        );

        summary
    }

    /// Run one greedy episode of at most `max_steps` steps without learning
    ///
    /// The table, ε and the training histories are left untouched.
    pub fn test_episode<E>(&mut self, env: &mut E, max_steps: usize) -> Rollout<E::State>
    where
        E: Environment<Action = A>,
    {
        let mut state = env.reset();
        let mut rollout = Rollout {
            reward: 0.0,
            steps: 0,
            terminated: false,
            path: vec![state.clone()],
        };

        for _ in 0..max_steps {
            let action = self.act(&*env, &state, false);
            let transition = env.step(action);

            rollout.reward += transition.reward;
            rollout.steps += 1;
            rollout.terminated = transition.done;
            rollout.path.push(transition.next_state.clone());
            state = transition.next_state;
            if rollout.terminated {
                break;
            }
        }

        rollout
    }

    /// Copy out everything that defines the agent's learned behavior
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            q_table: self.q_table.clone(),
            epsilon: self.epsilon(),
            rewards_history: self.rewards_history.clone(),
            steps_history: self.steps_history.clone(),
        }
    }

    /// Replace the table, ε and histories with those of `snapshot`
    ///
    /// Fails without modifying the agent if the snapshot's table shape differs from the agent's, the
    /// table holds a non-finite value, ε is outside `[0,1]` or the histories have different lengths.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        let Snapshot {
            q_table,
            epsilon,
            rewards_history,
            steps_history,
        } = snapshot;

        if q_table.n_states() != self.q_table.n_states()
            || q_table.n_actions() != self.q_table.n_actions()
        {
            return Err(Error::SnapshotShape {
                expected_states: self.q_table.n_states(),
                expected_actions: self.q_table.n_actions(),
                got_states: q_table.n_states(),
                got_actions: q_table.n_actions(),
            });
        }
        if !q_table.is_well_formed() {
            return Err(Error::SnapshotLength {
                expected: q_table.n_states() * q_table.n_actions(),
                got: q_table.values().len(),
            });
        }
        if let Some(i) = q_table.values().iter().position(|v| !v.is_finite()) {
            return Err(Error::SnapshotValue {
                state: i / q_table.n_actions(),
                action: i % q_table.n_actions(),
                value: q_table.values()[i],
            });
        }
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(Error::SnapshotEpsilon { epsilon });
        }
        if rewards_history.len() != steps_history.len() {
            return Err(Error::SnapshotHistory {
                rewards: rewards_history.len(),
                steps: steps_history.len(),
            });
        }

        self.q_table = q_table;
        self.exploration.set_epsilon(epsilon);
        self.rewards_history = rewards_history;
        self.steps_history = steps_history;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::{
        env::tests::{Flip, MockSpace},
        gym::{Action, GridWorld, MapPreset},
    };

    fn agent(config: QTableAgentConfig) -> QTableAgent<Action> {
        let env = GridWorld::new(MapPreset::Simple);
        QTableAgent::new(&env, config, StdRng::seed_from_u64(7))
    }

    fn mock_agent(config: QTableAgentConfig) -> QTableAgent<Flip> {
        QTableAgent::new(&MockSpace, config, StdRng::seed_from_u64(7))
    }

    fn greedy() -> QTableAgentConfig {
        QTableAgentConfig {
            epsilon: 0.0,
            epsilon_min: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn sized_by_space() {
        let agent = agent(Default::default());
        assert_eq!(agent.q_table().n_states(), 25);
        assert_eq!(agent.q_table().n_actions(), 4);
        assert_eq!(agent.epsilon(), 1.0);
    }

    #[test]
    fn terminal_update_ignores_next_state() {
        let mut agent = agent(Default::default());
        *agent.q_table.get_mut(3, Action::Up.index()) = 1000.0;
        *agent.q_table.get_mut(0, Action::Right.index()) = 20.0;

        agent.update(0, Action::Right, 100.0, 3, true);
        assert_eq!(
            agent.q_table().get(0, Action::Right.index()),
            20.0 + 0.1 * (100.0 - 20.0)
        );
    }

    #[test]
    fn update_bootstraps_from_best_next_action() {
        let mut agent = agent(Default::default());
        *agent.q_table.get_mut(1, Action::Left.index()) = 10.0;
        *agent.q_table.get_mut(1, Action::Down.index()) = 4.0;

        agent.update(0, Action::Right, -1.0, 1, false);
        let expected = 0.0 + 0.1 * (-1.0 + 0.9 * 10.0 - 0.0);
        assert_eq!(agent.q_table().get(0, Action::Right.index()), expected);

        let untouched = [Action::Up, Action::Down, Action::Left];
        for action in untouched {
            assert_eq!(agent.q_table().get(0, action.index()), 0.0);
        }
    }

    #[test]
    fn update_does_not_clamp() {
        let mut agent = agent(QTableAgentConfig {
            alpha: 1.0,
            ..Default::default()
        });
        agent.update(0, Action::Up, -1e6, 1, true);
        assert_eq!(agent.q_table().get(0, Action::Up.index()), -1e6);
        agent.update(0, Action::Up, 1e9, 1, true);
        assert_eq!(agent.q_table().get(0, Action::Up.index()), 1e9);
    }

    #[test]
    fn greedy_only_considers_legal_actions() {
        let mut agent = agent(greedy());
        *agent.q_table.get_mut(0, Action::Up.index()) = 50.0;
        *agent.q_table.get_mut(0, Action::Down.index()) = 2.0;
        *agent.q_table.get_mut(0, Action::Right.index()) = 1.0;

        let legal = [Action::Down, Action::Right];
        for _ in 0..100 {
            assert_eq!(agent.choose_action(0, false, &legal), Action::Down);
            assert_eq!(agent.choose_action(0, true, &legal), Action::Down, "ε = 0");
        }
    }

    #[test]
    fn greedy_ties_are_broken_at_random() {
        let mut agent = agent(greedy());
        let mut counts = [0usize; 4];
        for _ in 0..4000 {
            counts[agent.choose_action(0, false, Action::ALL).index()] += 1;
        }
        assert!(
            counts.iter().all(|&n| n > 800),
            "every tied action gets picked: {counts:?}"
        );

        *agent.q_table.get_mut(0, Action::Left.index()) = -1.0;
        for _ in 0..200 {
            assert_ne!(agent.choose_action(0, false, Action::ALL), Action::Left);
        }
    }

    #[test]
    fn exploration_stays_legal() {
        let mut agent = agent(Default::default());
        let legal = [Action::Up, Action::Right];
        let mut seen = [false; 4];
        for _ in 0..500 {
            let action = agent.choose_action(20, true, &legal);
            assert!(legal.contains(&action));
            seen[action.index()] = true;
        }
        assert!(seen[Action::Up.index()] && seen[Action::Right.index()]);
    }

    #[test]
    fn no_legal_actions_falls_back_to_all() {
        let mut agent = mock_agent(Default::default());
        let mut seen = [false; 2];
        for _ in 0..200 {
            seen[agent.act(&MockSpace, &1, true).index()] = true;
        }
        assert_eq!(seen, [true, true], "explores the full action set");

        let mut agent = mock_agent(greedy());
        *agent.q_table.get_mut(1, Flip::Move.index()) = 3.0;
        assert_eq!(agent.act(&MockSpace, &1, false), Flip::Move);
    }

    #[test]
    fn decay_respects_floor() {
        let mut agent = agent(QTableAgentConfig {
            epsilon_decay: 0.5,
            epsilon_min: 0.2,
            ..Default::default()
        });
        let mut previous = agent.epsilon();
        for _ in 0..10 {
            agent.decay_exploration();
            assert!(agent.epsilon() <= previous);
            assert!(agent.epsilon() >= 0.2);
            previous = agent.epsilon();
        }
        assert_eq!(agent.epsilon(), 0.2);
    }

    #[test]
    fn policy_uses_first_maximum() {
        let mut agent = mock_agent(greedy());
        let policy = agent.policy(&MockSpace);
        assert_eq!(policy.len(), 2);
        assert_eq!(policy.get(0), Some(Flip::Stay), "all-zero row picks first legal action");
        assert_eq!(policy.get(1), None, "dead end has no action");

        *agent.q_table.get_mut(0, Flip::Move.index()) = 0.5;
        assert_eq!(agent.policy(&MockSpace).get(0), Some(Flip::Move));
    }

    #[test]
    fn policy_over_grid_only_uses_legal_actions() {
        let env = GridWorld::new(MapPreset::Simple);
        let mut agent = agent(greedy());
        *agent.q_table.get_mut(20, Action::Down.index()) = 99.0;
        *agent.q_table.get_mut(20, Action::Up.index()) = 1.0;

        let policy = agent.policy(&env);
        assert_eq!(policy.len(), 25);
        assert_eq!(policy.get(20), Some(Action::Up), "(4, 0) cannot move down");
    }

    #[test]
    fn train_episode_records_history() {
        let mut env = GridWorld::new(MapPreset::Simple);
        let mut agent = agent(Default::default());

        let summary = agent.train_episode(&mut env, 50);
        assert!(summary.steps <= 50);
        assert_eq!(agent.rewards_history(), &[summary.reward]);
        assert_eq!(agent.steps_history(), &[summary.steps]);
        assert_eq!(agent.epsilon(), 0.995, "decayed exactly once");
        assert!(agent.summary().nonzero_ratio > 0.0);
    }

    #[test]
    fn train_episode_stops_at_step_budget() {
        let mut env = GridWorld::new(MapPreset::Hard);
        let mut agent = QTableAgent::new(&env, Default::default(), StdRng::seed_from_u64(1));

        let summary = agent.train_episode(&mut env, 3);
        assert_eq!(summary.steps, 3);
        assert!(!summary.terminated, "goal is further than three steps away");
    }

    #[test]
    fn test_episode_is_read_only() {
        let mut env = GridWorld::new(MapPreset::Simple);
        let mut agent = agent(Default::default());
        for _ in 0..20 {
            agent.train_episode(&mut env, 100);
        }

        let before = agent.snapshot();
        let rollout = agent.test_episode(&mut env, 100);
        assert_eq!(agent.snapshot(), before);

        assert_eq!(rollout.path.first(), Some(&(4, 0)));
        assert_eq!(rollout.path.len(), rollout.steps + 1);
    }

    #[test]
    fn restore_reproduces_behavior() {
        let mut env = GridWorld::new(MapPreset::Simple);
        let mut trained = agent(Default::default());
        for _ in 0..30 {
            trained.train_episode(&mut env, 100);
        }
        let snapshot = trained.snapshot();

        let mut restored = agent(Default::default());
        restored.restore(snapshot.clone()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.epsilon(), trained.epsilon());
        assert_eq!(restored.rewards_history().len(), 30);

        trained.rng = StdRng::seed_from_u64(99);
        restored.rng = StdRng::seed_from_u64(99);
        let a = trained.test_episode(&mut env, 100);
        let b = restored.test_episode(&mut env, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn restore_rejects_mismatched_snapshots() {
        let mut agent = agent(Default::default());
        agent.update(0, Action::Up, 5.0, 1, true);
        let before = agent.snapshot();

        let medium = GridWorld::new(MapPreset::Medium);
        let other =
            QTableAgent::<Action>::new(&medium, Default::default(), StdRng::seed_from_u64(0));
        let err = agent.restore(other.snapshot()).unwrap_err();
        assert!(matches!(
            err,
            Error::SnapshotShape {
                expected_states: 25,
                got_states: 64,
                ..
            }
        ));
        assert_eq!(agent.snapshot(), before, "failed restore leaves agent untouched");

        let mut uneven = before.clone();
        uneven.rewards_history.push(1.0);
        uneven.epsilon = 0.5;
        let err = agent.restore(uneven).unwrap_err();
        assert!(matches!(err, Error::SnapshotHistory { rewards: 1, steps: 0 }));
        assert_eq!(agent.snapshot(), before);
    }

    #[test]
    fn restore_rejects_corrupt_values() {
        let mut env = GridWorld::new(MapPreset::Simple);
        let mut agent = agent(greedy());
        agent.update(0, Action::Up, 5.0, 1, true);
        let before = agent.snapshot();

        let mut bytes = before.to_bytes().unwrap();
        let nan = f64::NAN.to_le_bytes();
        let at = bytes
            .windows(8)
            .position(|w| w == 0.5f64.to_le_bytes())
            .expect("encoded table holds Q(0, up)");
        bytes[at..at + 8].copy_from_slice(&nan);
        let corrupt = Snapshot::from_bytes(&bytes).unwrap();

        let err = agent.restore(corrupt).unwrap_err();
        assert!(matches!(
            err,
            Error::SnapshotValue {
                state: 0,
                action: 0,
                ..
            }
        ));
        assert_eq!(agent.snapshot(), before);

        let mut infinite = before.clone();
        infinite.epsilon = f64::INFINITY;
        assert!(matches!(
            agent.restore(infinite),
            Err(Error::SnapshotEpsilon { .. })
        ));
        assert_eq!(agent.snapshot(), before);

        let rollout = agent.test_episode(&mut env, 10);
        assert!(rollout.steps <= 10);
    }

    #[test]
    fn restore_rejects_truncated_table() {
        let mut agent = agent(Default::default());
        let mut snapshot = agent.snapshot();
        snapshot.q_table = bincode::deserialize(
            &bincode::serialize(&(25usize, 4usize, vec![0.0f64; 99])).unwrap(),
        )
        .unwrap();

        let err = agent.restore(snapshot).unwrap_err();
        assert!(matches!(
            err,
            Error::SnapshotLength {
                expected: 100,
                got: 99,
            }
        ));
        assert_eq!(err.to_string(), "snapshot table holds 99 values, expected 100");
    }

    #[test]
    fn greedy_survives_nan_row() {
        let mut agent = agent(greedy());
        *agent.q_table.get_mut(0, Action::Up.index()) = f64::NAN;
        *agent.q_table.get_mut(0, Action::Right.index()) = f64::NAN;

        let legal = [Action::Up, Action::Right];
        for _ in 0..20 {
            assert!(legal.contains(&agent.choose_action(0, false, &legal)));
        }
    }

    #[test]
    fn test_episode_never_explores() {
        let mut env = GridWorld::new(MapPreset::Simple);
        let mut agent = agent(QTableAgentConfig {
            epsilon: 1.0,
            epsilon_decay: 1.0,
            epsilon_min: 1.0,
            ..Default::default()
        });

        // up the left column, then along the top row
        let route = [
            ((4, 0), Action::Up),
            ((3, 0), Action::Up),
            ((2, 0), Action::Up),
            ((1, 0), Action::Up),
            ((0, 0), Action::Right),
            ((0, 1), Action::Right),
            ((0, 2), Action::Right),
            ((0, 3), Action::Right),
        ];
        for (pos, action) in route {
            *agent.q_table.get_mut(env.state_index(&pos), action.index()) = 10.0;
        }

        let mut expected = route.iter().map(|&(pos, _)| pos).collect::<Vec<_>>();
        expected.push((0, 4));
        for _ in 0..10 {
            let rollout = agent.test_episode(&mut env, 100);
            assert_eq!(rollout.path, expected);
            assert_eq!(rollout.reward, 93.0);
            assert!(rollout.terminated);
        }
        assert_eq!(agent.epsilon(), 1.0);
    }

    #[test]
    #[should_panic(expected = "Invalid value for `config.alpha`")]
    fn rejects_out_of_range_alpha() {
        agent(QTableAgentConfig {
            alpha: 1.5,
            ..Default::default()
        });
    }
}
