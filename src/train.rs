//! Multi-episode training and greedy evaluation
//!
//! The step budget of an episode is enforced here and in the agent's episode methods, never by the
//! environment itself.

use log::info;
use rand::Rng;

use crate::{
    algo::QTableAgent,
    env::{DiscreteAction, Environment},
    gym::MapPreset,
    util::mean,
};

/// Configuration for [`train`]
#[derive(Debug, Clone, PartialEq)]
pub struct TrainerConfig {
    /// Number of training episodes
    ///
    /// **Default**: `500`
    pub episodes: usize,
    /// Step budget per episode, training and evaluation alike
    ///
    /// **Default**: `200`
    pub max_steps: usize,
    /// Evaluate after the first episode and then every `eval_every` episodes; `0` disables evaluation
    ///
    /// **Default**: `100`
    pub eval_every: usize,
    /// Greedy episodes per evaluation
    ///
    /// **Default**: `10`
    pub eval_episodes: usize,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            episodes: 500,
            max_steps: 200,
            eval_every: 100,
            eval_episodes: 10,
        }
    }
}

impl TrainerConfig {
    /// Episode counts scaled to the preset's difficulty
    pub fn for_preset(preset: MapPreset) -> Self {
        let episodes = match preset {
            MapPreset::Simple => 500,
            MapPreset::Medium => 1000,
            MapPreset::Hard => 5000,
        };
        Self {
            episodes,
            ..Default::default()
        }
    }
}

/// Per-episode training curves
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingReport {
    pub rewards: Vec<f64>,
    pub steps: Vec<usize>,
    /// Success rate at each evaluation checkpoint
    pub success_rates: Vec<f64>,
}

/// Aggregate of several greedy test episodes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub mean_reward: f64,
    pub mean_steps: f64,
    /// Fraction of episodes with a positive total reward
    pub success_rate: f64,
}

/// Run `episodes` greedy test episodes
///
/// An episode counts as a success when its total reward is positive, which in the preset mazes
/// only happens by reaching the goal.
pub fn evaluate<A, R, E>(
    agent: &mut QTableAgent<A, R>,
    env: &mut E,
    episodes: usize,
    max_steps: usize,
) -> Evaluation
where
    A: DiscreteAction,
    R: Rng,
    E: Environment<Action = A>,
{
    let mut rewards = Vec::with_capacity(episodes);
    let mut steps = Vec::with_capacity(episodes);
    for _ in 0..episodes {
        let rollout = agent.test_episode(env, max_steps);
        rewards.push(rollout.reward);
        steps.push(rollout.steps as f64);
    }

    let successes = rewards.iter().filter(|&&r| r > 0.0).count();
    Evaluation {
        mean_reward: mean(&rewards),
        mean_steps: mean(&steps),
        success_rate: if episodes == 0 {
            0.0
        } else {
            successes as f64 / episodes as f64
        },
    }
}

/// Train `agent` in `env`, evaluating it periodically
pub fn train<A, R, E>(
    agent: &mut QTableAgent<A, R>,
    env: &mut E,
    config: &TrainerConfig,
) -> TrainingReport
where
    A: DiscreteAction,
    R: Rng,
    E: Environment<Action = A>,
{
    let mut report = TrainingReport {
        rewards: Vec::with_capacity(config.episodes),
        steps: Vec::with_capacity(config.episodes),
        success_rates: Vec::new(),
    };

    for episode in 0..config.episodes {
        let summary = agent.train_episode(env, config.max_steps);
        report.rewards.push(summary.reward);
        report.steps.push(summary.steps);

        let checkpoint =
            config.eval_every > 0 && (episode == 0 || (episode + 1) % config.eval_every == 0);
        if checkpoint {
            let eval = evaluate(agent, env, config.eval_episodes, config.max_steps);
            report.success_rates.push(eval.success_rate);
            info!(
                "Episode {}/{}: Reward={:.1}, Steps={}, Exploration={:.3}, Success={:.1}%",
                episode + 1,
                config.episodes,
                summary.reward,
                summary.steps,
                agent.epsilon(),
                eval.success_rate * 100.0
            );
        }
    }

    report
}
