//! Shared conformance driver for multi-task environments

#![allow(dead_code)]

use polytask_core::seeding::derive_stream;
use polytask_core::DynMultiTaskEnv;

/// Seeds used by the conformance driver
pub const ENV_SEED: u64 = 5;
pub const TASK_SEED: u64 = 15;

/// Drive an environment through the full contract and check its invariants:
/// seed echo, precondition asserts, repeated task switching, observation
/// composition and space containment.
pub fn validate_multitask_env(env: &mut dyn DynMultiTaskEnv) {
    let seeds = env.seed(Some(ENV_SEED));
    assert_eq!(seeds.first(), Some(&ENV_SEED));
    env.assert_env_seed_is_set().unwrap();

    let task_seeds = env.seed_task(Some(TASK_SEED));
    assert_eq!(task_seeds.first(), Some(&TASK_SEED));
    env.assert_task_seed_is_set().unwrap();

    let (mut action_rng, _) = derive_stream(Some(7));
    for _ in 0..10 {
        env.reset_task_state().unwrap();
        let obs = env.reset().unwrap();
        assert!(
            env.observation_space().contains(&obs),
            "reset observation escapes the declared space"
        );
        assert_eq!(obs.task_obs, env.get_task_obs().unwrap());

        for _ in 0..3 {
            let action = env.action_space().sample(&mut action_rng);
            let step = env.step(action).unwrap();
            assert!(
                env.observation_space()
                    .task_obs
                    .contains(&step.observation.task_obs),
                "step task observation escapes the declared space"
            );
            assert_eq!(step.observation.task_obs, env.get_task_obs().unwrap());
            assert!(step.reward.is_finite());
        }
    }
}
