//! Example: adapting the plain bandit into the multi-task contract

use polytask_core::seeding::derive_stream;
use polytask_core::wrappers::EnvToMultiTask;
use polytask_core::MultiTaskEnv;
use polytask_envs::{BanditEnv, BanditTaskAdapter};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let bandit = BanditEnv::new(5)?;
    let adapter = BanditTaskAdapter::new(5)?;
    let mut env = EnvToMultiTask::new(bandit, adapter);
    env.seed(Some(5));
    env.seed_task(Some(15));

    let (mut action_rng, _) = derive_stream(Some(1));
    let num_tasks = 4;
    let steps_per_task = 25;

    for task_index in 0..num_tasks {
        // Each task overwrites the inner bandit's arm probabilities.
        env.reset_task_state()?;
        env.reset()?;
        let mut total_reward = 0.0;
        for _ in 0..steps_per_task {
            let action = env.action_space().sample(&mut action_rng);
            total_reward += env.step(action)?.reward;
        }
        println!(
            "Task {}: inner probabilities = {:?}, total reward = {:.0}",
            task_index + 1,
            env.inner()
                .reward_probability()
                .iter()
                .map(|p| (p * 100.0).round() / 100.0)
                .collect::<Vec<_>>(),
            total_reward
        );
    }

    Ok(())
}
