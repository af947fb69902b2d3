//! The multi-task environment contract

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;
use crate::observation::{Observation, Step};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// Capabilities a task description must offer.
///
/// Blanket-implemented for any type with the listed bounds; callers never
/// implement it by hand. Equality powers task round-trip checks, serde powers
/// the erased view used by the registry.
pub trait TaskState:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + 'static
{
}

impl<T> TaskState for T where
    T: Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + 'static
{
}

/// An environment that exposes the task it is solving as first-class state.
///
/// Implementations keep two independent random streams: the environment
/// stream drives transition dynamics and initial states, the task stream
/// drives task sampling. Each is seeded explicitly (`seed`, `seed_task`) and
/// drawing from an unseeded stream is an error, so every run is replayable
/// from the two integers the seed calls return.
///
/// Lifecycle per instance: seed both streams, establish a task
/// (`set_task_state` or `reset_task_state`), `reset`, then `step` until done.
/// Switching tasks never resets simulation state by itself; callers `reset`
/// afterwards to start an episode under the new task. `reset` never changes
/// the active task.
pub trait MultiTaskEnv {
    /// Description of a task this environment can solve
    type TaskState: TaskState;

    /// Composite observation space
    fn observation_space(&self) -> &ObservationSpace;

    /// Space of accepted actions
    fn action_space(&self) -> &Space;

    /// (Re)initialize the environment stream.
    ///
    /// Returns the seeds in use, own seed first. Each call replaces the
    /// stream; seeding twice with the same value replays the same episode
    /// draws. Wrappers prepend their own seed and append the inner
    /// environment's list.
    fn seed(&mut self, seed: Option<u64>) -> Vec<u64>;

    /// (Re)initialize the task stream; same conventions as `seed`.
    ///
    /// Implementations that sample task observations from a declared space
    /// must route those draws through this stream, so re-seeding it also
    /// re-seeds task-observation sampling.
    fn seed_task(&mut self, seed: Option<u64>) -> Vec<u64>;

    /// Fail unless the environment stream is seeded, here and inward
    fn assert_env_seed_is_set(&self) -> Result<()>;

    /// Fail unless the task stream is seeded, here and inward
    fn assert_task_seed_is_set(&self) -> Result<()>;

    /// Draw a fresh task description.
    ///
    /// Uses the task stream only; neither the environment stream nor running
    /// simulation state may be touched. Requires the task seed to be set.
    fn sample_task_state(&mut self) -> Result<Self::TaskState>;

    /// The currently active task, without side effects
    fn get_task_state(&self) -> Result<Self::TaskState>;

    /// Replace the active task and recompute derived parameters.
    ///
    /// Simulation state is left alone; call `reset` afterwards to start an
    /// episode under the new task.
    fn set_task_state(&mut self, state: Self::TaskState) -> Result<()>;

    /// Sample a task and make it active.
    ///
    /// Atomic from the caller's point of view: when sampling fails the
    /// active task is unchanged.
    fn reset_task_state(&mut self) -> Result<()> {
        let state = self.sample_task_state()?;
        self.set_task_state(state)
    }

    /// Start a new episode under the current task.
    ///
    /// Requires the environment seed to be set. Reinitializes simulation
    /// state only; the active task is untouched.
    fn reset(&mut self) -> Result<Observation>;

    /// Advance the simulation by one action.
    ///
    /// The action is validated against the declared action space. Stepping
    /// before the first `reset` is an error; stepping a finished episode is
    /// flagged with a warning rather than silently continued.
    fn step(&mut self, action: Action) -> Result<Step>;

    /// Task observation of the most recent [`Observation`], without stepping
    /// or resetting
    fn get_task_obs(&self) -> Result<TaskObs>;

    /// Bounds on the reward signal
    fn reward_range(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Static environment properties
    fn metadata(&self) -> Metadata {
        Metadata::new()
    }
}
