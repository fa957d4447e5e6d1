use std::{env, error::Error, fs, path::Path};

use log::info;
use maze_rl::{
    algo::{tabular::SnapshotStore, QTableAgent, QTableAgentConfig},
    env::{DiscreteSpace, Environment},
    gym::{Action, GridWorld, MapPreset},
    train::{self, TrainerConfig},
};
use rand::{rngs::StdRng, SeedableRng};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let name = env::args().nth(1).unwrap_or_else(|| "simple".to_string());
    let preset = MapPreset::from_name(&name)?;
    let out = Path::new("demos/out");

    let mut env = GridWorld::new(preset);
    let config = QTableAgentConfig {
        epsilon_decay: 0.997,
        epsilon_min: 0.02,
        ..Default::default()
    };
    let mut agent = QTableAgent::<Action>::new(&env, config.clone(), StdRng::from_entropy());

    let trainer = TrainerConfig::for_preset(preset);
    info!("training on the {preset} maze for {} episodes", trainer.episodes);
    let report = train::train(&mut agent, &mut env, &trainer);

    fs::create_dir_all(out)?;
    let mut wtr = csv::Writer::from_path(out.join(format!("training_{preset}.csv")))?;
    wtr.write_record(["episode", "reward", "steps"])?;
    for (i, (reward, steps)) in report.rewards.iter().zip(&report.steps).enumerate() {
        wtr.write_record(&[(i + 1).to_string(), reward.to_string(), steps.to_string()])?;
    }
    wtr.flush()?;

    let store = SnapshotStore::new(out);
    store.save(&preset.to_string(), &agent.snapshot())?;

    let mut loaded = QTableAgent::<Action>::new(&env, config, StdRng::from_entropy());
    loaded.restore(store.load(&preset.to_string())?)?;

    let eval = train::evaluate(&mut loaded, &mut env, 10, 100);
    println!(
        "Average performance: Reward={:.1}, Steps={:.1}, Success={:.0}%",
        eval.mean_reward,
        eval.mean_steps,
        eval.success_rate * 100.0
    );
    println!("\n{}", loaded.summary());

    let rollout = loaded.test_episode(&mut env, 100);
    env.reset();
    for (step, pos) in rollout.path.iter().enumerate().skip(1) {
        println!("Step {step}: {pos:?}");
    }
    println!(
        "{} after {} steps with total reward {:.1}",
        if rollout.terminated { "Reached the goal" } else { "Gave up" },
        rollout.steps,
        rollout.reward
    );

    println!("\nPolicy:");
    print!("{}", env.render_policy(&loaded.policy(&env)));
    println!("\nStart:");
    print!("{env}");
    println!("States: {}", env.total_states());

    Ok(())
}
