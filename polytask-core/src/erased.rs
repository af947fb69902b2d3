//! Object-safe erased view of the multi-task contract

use serde_json::Value;

use crate::error::Result;
use crate::multitask::MultiTaskEnv;
use crate::observation::{Observation, Step};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// [`MultiTaskEnv`] with the task state erased to JSON.
///
/// Registries and generic drivers hold `Box<dyn DynMultiTaskEnv>` so that
/// environments with different task-state types share one interface. Task
/// states cross the boundary as [`serde_json::Value`]; the blanket impl
/// covers every `MultiTaskEnv` whose task state serializes, which the
/// [`TaskState`](crate::TaskState) bounds guarantee.
pub trait DynMultiTaskEnv: Send {
    /// Composite observation space
    fn observation_space(&self) -> &ObservationSpace;

    /// Space of accepted actions
    fn action_space(&self) -> &Space;

    /// (Re)initialize the environment stream
    fn seed(&mut self, seed: Option<u64>) -> Vec<u64>;

    /// (Re)initialize the task stream
    fn seed_task(&mut self, seed: Option<u64>) -> Vec<u64>;

    /// Fail unless the environment stream is seeded
    fn assert_env_seed_is_set(&self) -> Result<()>;

    /// Fail unless the task stream is seeded
    fn assert_task_seed_is_set(&self) -> Result<()>;

    /// Draw a fresh task description, erased
    fn sample_task_state(&mut self) -> Result<Value>;

    /// The currently active task, erased
    fn get_task_state(&self) -> Result<Value>;

    /// Replace the active task from an erased description
    fn set_task_state(&mut self, state: Value) -> Result<()>;

    /// Sample a task and make it active
    fn reset_task_state(&mut self) -> Result<()>;

    /// Start a new episode under the current task
    fn reset(&mut self) -> Result<Observation>;

    /// Advance the simulation by one action
    fn step(&mut self, action: Action) -> Result<Step>;

    /// Task observation of the most recent observation
    fn get_task_obs(&self) -> Result<TaskObs>;

    /// Bounds on the reward signal
    fn reward_range(&self) -> (f64, f64);

    /// Static environment properties
    fn metadata(&self) -> Metadata;
}

impl<E> DynMultiTaskEnv for E
where
    E: MultiTaskEnv + Send,
{
    fn observation_space(&self) -> &ObservationSpace {
        MultiTaskEnv::observation_space(self)
    }

    fn action_space(&self) -> &Space {
        MultiTaskEnv::action_space(self)
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        MultiTaskEnv::seed(self, seed)
    }

    fn seed_task(&mut self, seed: Option<u64>) -> Vec<u64> {
        MultiTaskEnv::seed_task(self, seed)
    }

    fn assert_env_seed_is_set(&self) -> Result<()> {
        MultiTaskEnv::assert_env_seed_is_set(self)
    }

    fn assert_task_seed_is_set(&self) -> Result<()> {
        MultiTaskEnv::assert_task_seed_is_set(self)
    }

    fn sample_task_state(&mut self) -> Result<Value> {
        let state = MultiTaskEnv::sample_task_state(self)?;
        Ok(serde_json::to_value(state)?)
    }

    fn get_task_state(&self) -> Result<Value> {
        let state = MultiTaskEnv::get_task_state(self)?;
        Ok(serde_json::to_value(state)?)
    }

    fn set_task_state(&mut self, state: Value) -> Result<()> {
        let state = serde_json::from_value(state)?;
        MultiTaskEnv::set_task_state(self, state)
    }

    fn reset_task_state(&mut self) -> Result<()> {
        MultiTaskEnv::reset_task_state(self)
    }

    fn reset(&mut self) -> Result<Observation> {
        MultiTaskEnv::reset(self)
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        MultiTaskEnv::step(self, action)
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        MultiTaskEnv::get_task_obs(self)
    }

    fn reward_range(&self) -> (f64, f64) {
        MultiTaskEnv::reward_range(self)
    }

    fn metadata(&self) -> Metadata {
        MultiTaskEnv::metadata(self)
    }
}
