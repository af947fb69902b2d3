//! Restriction of the task universe to a fixed candidate set

use rand::Rng;

use crate::error::{EnvError, Result};
use crate::multitask::MultiTaskEnv;
use crate::observation::{Observation, Step};
use crate::seeding::{StreamRole, StreamSlot};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// Wrapper fixing the number of distinct tasks to `n_tasks`.
///
/// The candidate tasks are drawn lazily, exactly once, from the inner
/// environment's own distribution on the first `sample_task_state` call.
/// Afterwards sampling draws a uniform index into the cached list using the
/// wrapper's task stream. The cached list never changes size or contents for
/// the wrapper's lifetime; re-seeding the task stream changes which index is
/// drawn, never the candidates.
pub struct FixedTaskSet<E: MultiTaskEnv> {
    env: E,
    n_tasks: usize,
    tasks: Option<Vec<E::TaskState>>,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
}

impl<E: MultiTaskEnv> FixedTaskSet<E> {
    /// Wrap `env`, restricting it to `n_tasks` candidate tasks
    pub fn new(env: E, n_tasks: usize) -> Result<Self> {
        if n_tasks == 0 {
            return Err(EnvError::Validation(
                "n_tasks must be at least one".into(),
            ));
        }
        Ok(Self {
            env,
            n_tasks,
            tasks: None,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
        })
    }

    /// Number of candidate tasks
    #[must_use]
    pub fn n_tasks(&self) -> usize {
        self.n_tasks
    }

    /// The wrapped environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Mutable access to the wrapped environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Draw candidates from the inner distribution on first use
    fn populate(&mut self) -> Result<()> {
        if self.tasks.is_none() {
            let mut tasks = Vec::with_capacity(self.n_tasks);
            for _ in 0..self.n_tasks {
                tasks.push(self.env.sample_task_state()?);
            }
            tracing::debug!(n_tasks = self.n_tasks, "candidate task set populated");
            self.tasks = Some(tasks);
        }
        Ok(())
    }

    /// Uniform index into the candidate list from the wrapper's task stream
    fn draw_candidate(&mut self) -> Result<E::TaskState> {
        let index = self.task_slot.stream()?.gen_range(0..self.n_tasks);
        let task = self
            .tasks
            .as_ref()
            .and_then(|tasks| tasks.get(index))
            .ok_or(EnvError::TaskNotSet)?;
        Ok(task.clone())
    }
}

impl<E: MultiTaskEnv> MultiTaskEnv for FixedTaskSet<E> {
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
        self.assert_task_seed_is_set()?;
        self.populate()?;
        self.draw_candidate()
    }

    fn get_task_state(&self) -> Result<Self::TaskState> {
        self.env.get_task_state()
    }

    fn set_task_state(&mut self, state: Self::TaskState) -> Result<()> {
        self.env.set_task_state(state)
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
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

    fn wrapped(n_tasks: usize) -> FixedTaskSet<ToyTaskEnv> {
        FixedTaskSet::new(ToyTaskEnv::new(), n_tasks).unwrap()
    }

    #[test]
    fn rejects_zero_tasks() {
        assert!(matches!(
            FixedTaskSet::new(ToyTaskEnv::new(), 0),
            Err(EnvError::Validation(_))
        ));
    }

    #[test]
    fn seed_lists_cover_the_whole_stack() {
        let mut env = wrapped(3);
        assert_eq!(env.seed(Some(8)), vec![8, 8]);
        assert_eq!(env.seed_task(Some(9)), vec![9, 9]);
    }

    #[test]
    fn sampling_requires_both_task_seeds() {
        let mut env = wrapped(3);
        assert!(matches!(
            env.sample_task_state(),
            Err(EnvError::TaskSeedNotSet)
        ));
        env.seed_task(Some(2));
        assert!(env.sample_task_state().is_ok());
    }

    #[test]
    fn samples_come_from_a_fixed_candidate_set() {
        let mut env = wrapped(4);
        env.seed_task(Some(21));
        let mut seen = Vec::new();
        for _ in 0..50 {
            let task = env.sample_task_state().unwrap();
            if !seen.contains(&task) {
                seen.push(task);
            }
        }
        assert!(seen.len() <= 4);
    }

    #[test]
    fn reseeding_keeps_the_candidate_set() {
        let mut env = wrapped(5);
        env.seed_task(Some(1));
        let mut first: Vec<_> = Vec::new();
        for _ in 0..100 {
            let task = env.sample_task_state().unwrap();
            if !first.contains(&task) {
                first.push(task);
            }
        }
        env.seed_task(Some(999));
        for _ in 0..100 {
            let task = env.sample_task_state().unwrap();
            assert!(first.contains(&task));
        }
    }

    #[test]
    fn reset_task_state_activates_a_candidate() {
        let mut env = wrapped(2);
        env.seed(Some(3));
        env.seed_task(Some(4));
        env.reset_task_state().unwrap();
        let active = env.get_task_state().unwrap();
        let obs = env.reset().unwrap();
        assert!(env.observation_space().contains(&obs));
        assert_eq!(env.get_task_state().unwrap(), active);
    }
}
