//! Example: the finite bandit's candidate matrix is shared across instances

use polytask_core::MultiTaskEnv;
use polytask_envs::FiniteMultiTaskBandit;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut env = FiniteMultiTaskBandit::new(10, 5)?;
    env.seed(Some(5));
    env.seed_task(Some(15));

    println!("Sampled task indices:");
    for _ in 0..5 {
        let index = env.sample_task_state()?;
        env.set_task_state(index)?;
        println!("  task {} -> {:?}", index, env.get_task_obs()?);
    }

    // A second instance with the same shape agrees on every candidate.
    let mut twin = FiniteMultiTaskBandit::new(10, 5)?;
    twin.seed(Some(99));
    twin.seed_task(Some(99));
    env.set_task_state(3)?;
    twin.set_task_state(3)?;
    println!("\nInstance A task 3: {:?}", env.get_task_obs()?);
    println!("Instance B task 3: {:?}", twin.get_task_obs()?);

    Ok(())
}
