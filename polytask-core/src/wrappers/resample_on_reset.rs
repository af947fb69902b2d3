//! Fresh task on every episode

use crate::error::Result;
use crate::multitask::MultiTaskEnv;
use crate::observation::{Observation, Step};
use crate::seeding::{StreamRole, StreamSlot};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// Wrapper that resamples the task at every `reset`.
///
/// `reset` first calls `reset_task_state` on the inner environment and then
/// delegates the reset itself, so every episode starts under a freshly
/// sampled task. Everything else forwards unchanged.
pub struct ResampleOnReset<E: MultiTaskEnv> {
    env: E,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
}

impl<E: MultiTaskEnv> ResampleOnReset<E> {
    /// Wrap `env`
    pub fn new(env: E) -> Self {
        Self {
            env,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
        }
    }

    /// The wrapped environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Mutable access to the wrapped environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }
}

impl<E: MultiTaskEnv> MultiTaskEnv for ResampleOnReset<E> {
    type TaskState = E::TaskState;

    fn observation_space(&self) -> &ObservationSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        let own = self.env_slot.reseed(seed);
        let mut seeds = vec![own];
        seeds.extend(self.env.seed(Some(own)));
        seeds
    }

    fn seed_task(&mut self, seed: Option<u64>) -> Vec<u64> {
        let own = self.task_slot.reseed(seed);
        let mut seeds = vec![own];
        seeds.extend(self.env.seed_task(Some(own)));
        seeds
    }

    fn assert_env_seed_is_set(&self) -> Result<()> {
        self.env_slot.assert_seeded()?;
        self.env.assert_env_seed_is_set()
    }

    fn assert_task_seed_is_set(&self) -> Result<()> {
        self.task_slot.assert_seeded()?;
        self.env.assert_task_seed_is_set()
    }

    fn sample_task_state(&mut self) -> Result<Self::TaskState> {
        self.env.sample_task_state()
    }

    fn get_task_state(&self) -> Result<Self::TaskState> {
        self.env.get_task_state()
    }

    fn set_task_state(&mut self, state: Self::TaskState) -> Result<()> {
        self.env.set_task_state(state)
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        self.env.reset_task_state()?;
        self.env.reset()
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        self.env.step(action)
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        self.env.get_task_obs()
    }

    fn reward_range(&self) -> (f64, f64) {
        self.env.reward_range()
    }

    fn metadata(&self) -> Metadata {
        self.env.metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::ToyTaskEnv;
    use super::*;
    use crate::error::EnvError;

    #[test]
    fn reset_draws_a_new_task() {
        let mut env = ResampleOnReset::new(ToyTaskEnv::new());
        env.seed(Some(1));
        env.seed_task(Some(2));
        let obs_a = env.reset().unwrap();
        let task_a = env.get_task_state().unwrap();
        let _obs_b = env.reset().unwrap();
        let task_b = env.get_task_state().unwrap();
        assert!(env.observation_space().contains(&obs_a));
        assert_ne!(task_a, task_b);
    }

    #[test]
    fn reset_still_requires_task_seed() {
        let mut env = ResampleOnReset::new(ToyTaskEnv::new());
        env.seed(Some(1));
        assert!(matches!(env.reset(), Err(EnvError::TaskSeedNotSet)));
    }

    #[test]
    fn episodes_replay_under_equal_seeds() {
        let mut a = ResampleOnReset::new(ToyTaskEnv::new());
        a.seed(Some(5));
        a.seed_task(Some(6));
        let mut b = ResampleOnReset::new(ToyTaskEnv::new());
        b.seed(Some(5));
        b.seed_task(Some(6));
        for _ in 0..4 {
            assert_eq!(a.reset().unwrap(), b.reset().unwrap());
            assert_eq!(
                a.step(Action::Index(1)).unwrap(),
                b.step(Action::Index(1)).unwrap()
            );
        }
    }
}
