//! Observation composition and step results

use serde::{Deserialize, Serialize};

use crate::types::{EnvObs, Reward, StepInfo, TaskObs};

/// A composed multi-task observation.
///
/// Both components are always present, whatever the environment or wrapper
/// stack produced it. `compose` is the single constructor `reset` and `step`
/// implementations route their raw observations through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Raw environment observation
    pub env_obs: EnvObs,
    /// Description of the active task
    pub task_obs: TaskObs,
}

impl Observation {
    /// Compose the two observation components
    #[must_use]
    pub fn compose(env_obs: EnvObs, task_obs: TaskObs) -> Self {
        Self { env_obs, task_obs }
    }
}

/// Result of a single multi-task environment step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Observation after the transition
    pub observation: Observation,
    /// Reward signal
    pub reward: Reward,
    /// Whether the episode is done
    pub done: bool,
    /// Additional info from the environment
    pub info: StepInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpaceValue;

    #[test]
    fn compose_preserves_both_components() {
        let obs = Observation::compose(vec![1.0, 2.0], SpaceValue::Index(1));
        assert_eq!(obs.env_obs, vec![1.0, 2.0]);
        assert_eq!(obs.task_obs, SpaceValue::Index(1));
    }

    #[test]
    fn observation_serializes_with_both_keys() {
        let obs = Observation::compose(vec![0.0], SpaceValue::Vector(vec![0.5]));
        let value = serde_json::to_value(&obs).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"env_obs": [0.0], "task_obs": [0.5]})
        );
    }
}
