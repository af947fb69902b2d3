//! Example: switching tasks on the multi-task bandit

use polytask_core::seeding::derive_stream;
use polytask_core::MultiTaskEnv;
use polytask_envs::MultiTaskBandit;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut env = MultiTaskBandit::new(5)?;
    env.seed(Some(5));
    env.seed_task(Some(15));

    let (mut action_rng, _) = derive_stream(Some(1));
    let num_tasks = 5;
    let steps_per_task = 20;

    for task_index in 0..num_tasks {
        env.reset_task_state()?;
        env.reset()?;
        let task = env.get_task_state()?;

        let mut total_reward = 0.0;
        for _ in 0..steps_per_task {
            let action = env.action_space().sample(&mut action_rng);
            total_reward += env.step(action)?.reward;
        }

        println!(
            "Task {}: probabilities = {:?}, total reward = {:.0}",
            task_index + 1,
            task.iter().map(|p| (p * 100.0).round() / 100.0).collect::<Vec<_>>(),
            total_reward
        );
    }

    Ok(())
}
