//! Wrapper laws exercised through concrete environments

mod common;

use proptest::prelude::*;

use polytask_core::wrappers::{
    EnvBuilder, EnvToMultiTask, FixedTaskSet, FixedTaskSetWithId, MultiEnvWrapper, ResampleOnReset,
};
use polytask_core::{Action, Env, EnvError, MultiTaskEnv, Space, TaskObs};
use polytask_envs::{BanditEnv, BanditTaskAdapter, MultiTaskBandit, MultiTaskCartPole};

fn cartpole() -> MultiTaskCartPole {
    MultiTaskCartPole::new().unwrap()
}

#[test]
fn fixed_task_set_passes_conformance_for_valid_sizes() {
    for n_tasks in [1, 10, 100] {
        let mut env = FixedTaskSet::new(cartpole(), n_tasks).unwrap();
        common::validate_multitask_env(&mut env);
    }
}

#[test]
fn fixed_task_set_rejects_zero_tasks() {
    assert!(matches!(
        FixedTaskSet::new(cartpole(), 0),
        Err(EnvError::Validation(_))
    ));
    assert!(matches!(
        FixedTaskSetWithId::new(cartpole(), 0),
        Err(EnvError::Validation(_))
    ));
}

#[test]
fn fixed_task_set_with_id_passes_conformance() {
    for n_tasks in [1, 10, 100] {
        let mut env = FixedTaskSetWithId::new(cartpole(), n_tasks).unwrap();
        common::validate_multitask_env(&mut env);
    }
}

#[test]
fn candidate_set_survives_reseeding() {
    let mut env = FixedTaskSet::new(MultiTaskBandit::new(3).unwrap(), 4).unwrap();
    env.seed_task(Some(1));
    let mut candidates = Vec::new();
    for _ in 0..100 {
        let task = env.sample_task_state().unwrap();
        if !candidates.contains(&task) {
            candidates.push(task);
        }
    }
    assert!(candidates.len() <= 4);

    env.seed_task(Some(999));
    for _ in 0..100 {
        let task = env.sample_task_state().unwrap();
        assert!(candidates.contains(&task), "reseeding changed the candidates");
    }
}

#[test]
fn id_wrapper_maps_indices_through_the_candidates() {
    let mut env = FixedTaskSetWithId::new(MultiTaskBandit::new(3).unwrap(), 5).unwrap();
    env.seed(Some(1));
    env.seed_task(Some(2));
    env.set_task_state(4).unwrap();
    assert_eq!(env.get_task_state().unwrap(), 4);
    assert_eq!(env.get_task_obs().unwrap(), TaskObs::Index(4));
    assert_eq!(env.observation_space().task_obs, Space::Discrete { n: 5 });
    let inner_task = env.inner().get_task_state().unwrap();
    assert!(inner_task.iter().all(|p| (0.0..=1.0).contains(p)));

    let obs = env.reset().unwrap();
    assert_eq!(obs.task_obs, TaskObs::Index(4));
    assert!(matches!(env.set_task_state(5), Err(EnvError::Validation(_))));
}

#[test]
fn resample_on_reset_draws_a_fresh_task_each_episode() {
    let mut env = ResampleOnReset::new(MultiTaskBandit::new(4).unwrap());
    env.seed(Some(3));
    env.seed_task(Some(4));
    let mut tasks = Vec::new();
    for _ in 0..5 {
        env.reset().unwrap();
        tasks.push(env.get_task_state().unwrap());
    }
    tasks.dedup();
    assert!(tasks.len() > 1, "every episode reused the same task");
}

#[test]
fn env_to_multitask_adapts_the_plain_bandit() {
    let env = BanditEnv::with_probabilities(vec![0.5; 5]).unwrap();
    let adapter = BanditTaskAdapter::new(5).unwrap();
    let mut env = EnvToMultiTask::new(env, adapter);
    common::validate_multitask_env(&mut env);
    let task = env.get_task_state().unwrap();
    assert_eq!(env.inner().reward_probability(), task.as_slice());
}

#[test]
fn multi_env_wrapper_builds_lazily_and_caches() {
    let builders: Vec<EnvBuilder<BanditEnv>> = (0..4)
        .map(|i| {
            let builder: EnvBuilder<BanditEnv> = Box::new(move || {
                let mut env =
                    BanditEnv::with_probabilities(vec![0.25 * (i as f64 + 1.0); 2]).unwrap();
                env.seed(Some(i));
                env
            });
            builder
        })
        .collect();
    let mut env = MultiEnvWrapper::new(builders, 0).unwrap();
    assert!(env.is_built(0));
    assert!(!env.is_built(3));

    env.seed_task(Some(5));
    env.set_task_state(3).unwrap();
    assert!(env.is_built(3));
    assert!(!env.is_built(1));

    let obs = env.reset().unwrap();
    assert_eq!(obs.task_obs, TaskObs::Index(3));
    let step = env.step(Action::Index(0)).unwrap();
    assert_eq!(step.observation.task_obs, TaskObs::Index(3));
}

#[test]
fn wrappers_check_both_their_own_and_the_inner_seeds() {
    let mut inner = cartpole();
    inner.seed(Some(1));
    inner.seed_task(Some(2));
    // The wrapper's own slots start empty even though the inner env is seeded.
    let env = FixedTaskSet::new(inner, 3).unwrap();
    assert!(matches!(
        env.assert_env_seed_is_set(),
        Err(EnvError::EnvSeedNotSet)
    ));
    assert!(matches!(
        env.assert_task_seed_is_set(),
        Err(EnvError::TaskSeedNotSet)
    ));
}

#[test]
fn nested_wrapping_composes() {
    let env = FixedTaskSet::new(MultiTaskBandit::new(3).unwrap(), 6).unwrap();
    let mut env = ResampleOnReset::new(env);
    let seeds = env.seed(Some(10));
    assert_eq!(seeds.len(), 3, "each layer reports its seed");
    assert_eq!(seeds[0], 10);
    env.seed_task(Some(11));
    common::validate_multitask_env(&mut env);
}

proptest! {
    #[test]
    fn cardinality_is_bounded_by_n_tasks(k in 1_usize..8) {
        let mut env = FixedTaskSet::new(MultiTaskBandit::new(2).unwrap(), k).unwrap();
        env.seed_task(Some(21));
        let mut distinct = Vec::new();
        for _ in 0..=k {
            env.reset_task_state().unwrap();
            let task = env.get_task_state().unwrap();
            if !distinct.contains(&task) {
                distinct.push(task);
            }
        }
        prop_assert!(distinct.len() <= k);
    }
}
