//! Example: pulling arms on the plain bandit

use polytask_core::seeding::derive_stream;
use polytask_core::Env;
use polytask_envs::BanditEnv;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut env = BanditEnv::new(5)?;
    env.seed(Some(5));
    env.reset()?;

    let (mut action_rng, _) = derive_stream(Some(1));
    let mut total_reward = 0.0;
    let num_pulls = 100;

    for pull in 0..num_pulls {
        let action = env.action_space().sample(&mut action_rng);
        let step = env.step(action.clone())?;
        total_reward += step.reward;
        if pull < 5 {
            println!("Pull {}: action = {:?}, reward = {}", pull + 1, action, step.reward);
        }
    }

    println!("\nTotal reward over {num_pulls} pulls: {total_reward:.0}");
    println!("Arm probabilities: {:?}", env.reward_probability());

    Ok(())
}
