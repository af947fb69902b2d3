//! Plain single-task environment trait

use crate::error::Result;
use crate::space::Space;
use crate::types::{Action, EnvObs, Metadata, Reward, StepInfo};

/// Result of a single plain-environment step
#[derive(Debug, Clone, PartialEq)]
pub struct EnvStep {
    /// Observation after the transition
    pub obs: EnvObs,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

/// A conventional environment with no notion of tasks.
///
/// This is the inner type [`EnvToMultiTask`](crate::wrappers::EnvToMultiTask)
/// adapts into the multi-task contract. Implementations keep the same stream
/// discipline as multi-task environments: `seed` replaces the stream and
/// `reset` requires it to have been set.
pub trait Env {
    /// Space of raw observations
    fn observation_space(&self) -> &Space;

    /// Space of accepted actions
    fn action_space(&self) -> &Space;

    /// (Re)initialize the environment stream; returns the seeds in use
    fn seed(&mut self, seed: Option<u64>) -> Vec<u64>;

    /// Start a new episode and return the first observation
    fn reset(&mut self) -> Result<EnvObs>;

    /// Advance the simulation by one action
    fn step(&mut self, action: Action) -> Result<EnvStep>;

    /// Bounds on the reward signal
    fn reward_range(&self) -> (f64, f64) {
        (f64::NEG_INFINITY, f64::INFINITY)
    }

    /// Static environment properties
    fn metadata(&self) -> Metadata {
        Metadata::new()
    }
}
