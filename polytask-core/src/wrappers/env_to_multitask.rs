//! Adapter from a plain environment to the multi-task contract

use crate::env::Env;
use crate::error::{EnvError, Result};
use crate::multitask::{MultiTaskEnv, TaskState};
use crate::observation::{Observation, Step};
use crate::seeding::{RngStream, StreamRole, StreamSlot};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// Task behavior injected into [`EnvToMultiTask`] at construction.
///
/// A plain [`Env`] knows nothing about tasks. The adapter owns the task
/// distribution, the projection from task state to task observation, and the
/// application of a task onto the environment's parameters.
pub trait TaskAdapter<E: Env> {
    /// Task description this adapter produces
    type TaskState: TaskState;

    /// Space the task observations live in
    fn task_obs_space(&self) -> Space;

    /// Draw a task from the adapter's distribution
    fn sample(&mut self, rng: &mut RngStream) -> Self::TaskState;

    /// Project a task to its observation
    fn task_obs(&self, state: &Self::TaskState) -> TaskObs;

    /// Push a task into the environment's parameters
    fn apply(&mut self, env: &mut E, state: &Self::TaskState) -> Result<()>;
}

/// Multi-task view over a plain environment.
///
/// Observations are composed from the inner environment's raw observation
/// and the adapter's task observation. `reward_range` and `metadata` pass
/// through from the inner environment.
pub struct EnvToMultiTask<E: Env, A: TaskAdapter<E>> {
    env: E,
    adapter: A,
    observation_space: ObservationSpace,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<A::TaskState>,
    started: bool,
}

impl<E: Env, A: TaskAdapter<E>> EnvToMultiTask<E, A> {
    /// Wrap `env`, with task behavior supplied by `adapter`
    pub fn new(env: E, adapter: A) -> Self {
        let observation_space =
            ObservationSpace::new(env.observation_space().clone(), adapter.task_obs_space());
        Self {
            env,
            adapter,
            observation_space,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            started: false,
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

impl<E: Env, A: TaskAdapter<E>> MultiTaskEnv for EnvToMultiTask<E, A> {
    type TaskState = A::TaskState;

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
        vec![self.task_slot.reseed(seed)]
    }

    fn assert_env_seed_is_set(&self) -> Result<()> {
        self.env_slot.assert_seeded()
    }

    fn assert_task_seed_is_set(&self) -> Result<()> {
        self.task_slot.assert_seeded()
    }

    fn sample_task_state(&mut self) -> Result<Self::TaskState> {
        self.assert_task_seed_is_set()?;
        let rng = self.task_slot.stream()?;
        Ok(self.adapter.sample(rng))
    }

    fn get_task_state(&self) -> Result<Self::TaskState> {
        self.task.clone().ok_or(EnvError::TaskNotSet)
    }

    fn set_task_state(&mut self, state: Self::TaskState) -> Result<()> {
        self.adapter.apply(&mut self.env, &state)?;
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let task_obs = self.get_task_obs()?;
        let env_obs = self.env.reset()?;
        self.started = true;
        Ok(Observation::compose(env_obs, task_obs))
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        if !self.started {
            return Err(EnvError::StepBeforeReset);
        }
        let task_obs = self.get_task_obs()?;
        let step = self.env.step(action)?;
        Ok(Step {
            observation: Observation::compose(step.obs, task_obs),
            reward: step.reward,
            done: step.done,
            info: step.info,
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
        Ok(self.adapter.task_obs(task))
    }

    fn reward_range(&self) -> (f64, f64) {
        self.env.reward_range()
    }

    fn metadata(&self) -> Metadata {
        self.env.metadata()
    }
}
