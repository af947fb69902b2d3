//! Wrappers that compose and transform multi-task environments
//!
//! Every wrapper owns its inner environment and forwards each contract
//! method explicitly, so errors propagate unchanged and nothing is delegated
//! reflectively. Anything beyond the contract is reached through
//! `inner`/`inner_mut`.

mod env_to_multitask;
mod fixed_task_set;
mod fixed_task_set_id;
mod multi_env;
mod resample_on_reset;

pub use env_to_multitask::{EnvToMultiTask, TaskAdapter};
pub use fixed_task_set::FixedTaskSet;
pub use fixed_task_set_id::FixedTaskSetWithId;
pub use multi_env::{EnvBuilder, MultiEnvWrapper};
pub use resample_on_reset::ResampleOnReset;

#[cfg(test)]
pub(crate) mod test_support {
    //! Minimal concrete contract implementation for wrapper tests

    use rand::Rng;

    use crate::error::{EnvError, Result};
    use crate::multitask::MultiTaskEnv;
    use crate::observation::{Observation, Step};
    use crate::seeding::{StreamRole, StreamSlot};
    use crate::space::{ObservationSpace, Space};
    use crate::types::{Action, StepInfo, TaskObs};

    /// Two-action environment whose task is a pair of per-action rewards
    pub(crate) struct ToyTaskEnv {
        observation_space: ObservationSpace,
        action_space: Space,
        env_slot: StreamSlot,
        task_slot: StreamSlot,
        task: Option<Vec<f64>>,
        position: f64,
        started: bool,
    }

    impl ToyTaskEnv {
        pub(crate) fn new() -> Self {
            Self {
                observation_space: ObservationSpace::new(
                    Space::uniform_box(-100.0, 100.0, 1).unwrap(),
                    Space::uniform_box(0.0, 1.0, 2).unwrap(),
                ),
                action_space: Space::discrete(2).unwrap(),
                env_slot: StreamSlot::new(StreamRole::Env),
                task_slot: StreamSlot::new(StreamRole::Task),
                task: None,
                position: 0.0,
                started: false,
            }
        }
    }

    impl MultiTaskEnv for ToyTaskEnv {
        type TaskState = Vec<f64>;

        fn observation_space(&self) -> &ObservationSpace {
            &self.observation_space
        }

        fn action_space(&self) -> &Space {
            &self.action_space
        }

        fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
            vec![self.env_slot.reseed(seed)]
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

        fn sample_task_state(&mut self) -> Result<Vec<f64>> {
            self.assert_task_seed_is_set()?;
            let rng = self.task_slot.stream()?;
            Ok((0..2).map(|_| rng.gen_range(0.0..1.0)).collect())
        }

        fn get_task_state(&self) -> Result<Vec<f64>> {
            self.task.clone().ok_or(EnvError::TaskNotSet)
        }

        fn set_task_state(&mut self, state: Vec<f64>) -> Result<()> {
            if state.len() != 2 {
                return Err(EnvError::Validation(format!(
                    "expected 2 per-action rewards, got {}",
                    state.len()
                )));
            }
            self.task = Some(state);
            Ok(())
        }

        fn reset(&mut self) -> Result<Observation> {
            self.assert_env_seed_is_set()?;
            let task_obs = self.get_task_obs()?;
            self.position = 0.0;
            self.started = true;
            Ok(Observation::compose(vec![self.position], task_obs))
        }

        fn step(&mut self, action: Action) -> Result<Step> {
            if !self.started {
                return Err(EnvError::StepBeforeReset);
            }
            if !self.action_space.contains(&action) {
                return Err(EnvError::InvalidAction(format!("{action:?}")));
            }
            let index = action
                .as_index()
                .ok_or_else(|| EnvError::InvalidAction(format!("{action:?}")))?;
            let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
            self.position += index as f64;
            Ok(Step {
                observation: Observation::compose(vec![self.position], TaskObs::Vector(task.clone())),
                reward: task[index],
                done: false,
                info: StepInfo::new(),
            })
        }

        fn get_task_obs(&self) -> Result<TaskObs> {
            let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
            Ok(TaskObs::Vector(task.clone()))
        }
    }
}
