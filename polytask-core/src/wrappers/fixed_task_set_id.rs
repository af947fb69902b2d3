//! Fixed task set observed through candidate indices

use rand::Rng;

use crate::error::{EnvError, Result};
use crate::multitask::MultiTaskEnv;
use crate::observation::{Observation, Step};
use crate::seeding::{StreamRole, StreamSlot};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// [`FixedTaskSet`](super::FixedTaskSet) variant whose task state is the
/// candidate *index*.
///
/// The agent observes which of the `n_tasks` candidates is active, not the
/// candidate itself: `get_task_state`/`get_task_obs` return an integer in
/// `[0, n_tasks)`, the task-observation space becomes `Discrete(n_tasks)`,
/// and every observation is re-composed with the index. `set_task_state`
/// accepts an index and maps it through the cached candidate list before
/// delegating inward.
pub struct FixedTaskSetWithId<E: MultiTaskEnv> {
    env: E,
    n_tasks: usize,
    tasks: Option<Vec<E::TaskState>>,
    task: Option<usize>,
    observation_space: ObservationSpace,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
}

impl<E: MultiTaskEnv> FixedTaskSetWithId<E> {
    /// Wrap `env`, restricting it to `n_tasks` candidates observed by index
    pub fn new(env: E, n_tasks: usize) -> Result<Self> {
        if n_tasks == 0 {
            return Err(EnvError::Validation(
                "n_tasks must be at least one".into(),
            ));
        }
        let observation_space = ObservationSpace::new(
            env.observation_space().env_obs.clone(),
            Space::discrete(n_tasks)?,
        );
        Ok(Self {
            env,
            n_tasks,
            tasks: None,
            task: None,
            observation_space,
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

    fn active_index(&self) -> Result<usize> {
        self.task.ok_or(EnvError::TaskNotSet)
    }

    fn recompose(&self, observation: Observation) -> Result<Observation> {
        let index = self.active_index()?;
        Ok(Observation::compose(
            observation.env_obs,
            TaskObs::Index(index),
        ))
    }
}

impl<E: MultiTaskEnv> MultiTaskEnv for FixedTaskSetWithId<E> {
    type TaskState = usize;

    fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
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

    fn sample_task_state(&mut self) -> Result<usize> {
        self.assert_task_seed_is_set()?;
        self.populate()?;
        Ok(self.task_slot.stream()?.gen_range(0..self.n_tasks))
    }

    fn get_task_state(&self) -> Result<usize> {
        self.active_index()
    }

    /// Activate the candidate at `state`.
    ///
    /// Populating the candidate list on first use draws from the inner
    /// distribution, so the task seeds must be set before the first call.
    fn set_task_state(&mut self, state: usize) -> Result<()> {
        if state >= self.n_tasks {
            return Err(EnvError::Validation(format!(
                "task index {state} out of range for {} tasks",
                self.n_tasks
            )));
        }
        self.populate()?;
        let candidate = self
            .tasks
            .as_ref()
            .and_then(|tasks| tasks.get(state))
            .ok_or(EnvError::TaskNotSet)?
            .clone();
        self.env.set_task_state(candidate)?;
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let observation = self.env.reset()?;
        self.recompose(observation)
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        let step = self.env.step(action)?;
        Ok(Step {
            observation: self.recompose(step.observation)?,
            reward: step.reward,
            done: step.done,
            info: step.info,
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        Ok(TaskObs::Index(self.active_index()?))
    }

    fn reward_range(&self) -> (f64, f64) {
        self.env.reward_range()
    }

    fn metadata(&self) -> Metadata {
        self.env.metadata()
    }
}
