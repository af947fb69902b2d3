//! Task-indexed family of lazily built single-task environments

use crate::env::Env;
use crate::error::{EnvError, Result};
use crate::multitask::MultiTaskEnv;
use crate::observation::{Observation, Step};
use crate::seeding::{StreamRole, StreamSlot};
use crate::space::{ObservationSpace, Space};
use crate::types::{Action, Metadata, TaskObs};

/// Constructor for one sub-environment of a [`MultiEnvWrapper`]
pub type EnvBuilder<E> = Box<dyn Fn() -> E + Send>;

/// Multi-task environment backed by one single-task environment per task.
///
/// The task state is the index into the builder list. A sub-environment is
/// constructed synchronously the first time its index becomes active and
/// cached for the wrapper's lifetime, so memory grows with the number of
/// distinct tasks visited, not with the number declared. Sub-environments
/// are expected to be a homogeneous family sharing one observation and
/// action space; seeding at construction is the builders' concern.
pub struct MultiEnvWrapper<E: Env> {
    builders: Vec<EnvBuilder<E>>,
    envs: Vec<Option<E>>,
    started: Vec<bool>,
    task: usize,
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
}

impl<E: Env> MultiEnvWrapper<E> {
    /// Build the wrapper, constructing the sub-environment for
    /// `initial_task_state` eagerly so the spaces are known.
    pub fn new(builders: Vec<EnvBuilder<E>>, initial_task_state: usize) -> Result<Self> {
        if builders.is_empty() {
            return Err(EnvError::Validation(
                "at least one environment builder is required".into(),
            ));
        }
        if initial_task_state >= builders.len() {
            return Err(EnvError::Validation(format!(
                "initial task index {initial_task_state} out of range for {} builders",
                builders.len()
            )));
        }
        let num_tasks = builders.len();
        let initial = builders[initial_task_state]();
        let observation_space = ObservationSpace::new(
            initial.observation_space().clone(),
            Space::discrete(num_tasks)?,
        );
        let action_space = initial.action_space().clone();
        let mut envs: Vec<Option<E>> = (0..num_tasks).map(|_| None).collect();
        envs[initial_task_state] = Some(initial);
        Ok(Self {
            builders,
            envs,
            started: vec![false; num_tasks],
            task: initial_task_state,
            observation_space,
            action_space,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
        })
    }

    /// Number of tasks in the family
    #[must_use]
    pub fn num_tasks(&self) -> usize {
        self.builders.len()
    }

    /// Whether the sub-environment for `index` has been constructed
    #[must_use]
    pub fn is_built(&self, index: usize) -> bool {
        self.envs.get(index).is_some_and(Option::is_some)
    }

    fn current(&self) -> Result<&E> {
        self.envs
            .get(self.task)
            .and_then(Option::as_ref)
            .ok_or(EnvError::TaskNotSet)
    }

    fn current_mut(&mut self) -> Result<&mut E> {
        self.envs
            .get_mut(self.task)
            .and_then(Option::as_mut)
            .ok_or(EnvError::TaskNotSet)
    }
}

impl<E: Env> MultiTaskEnv for MultiEnvWrapper<E> {
    type TaskState = usize;

    fn observation_space(&self) -> &ObservationSpace {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        let own = self.env_slot.reseed(seed);
        let mut seeds = vec![own];
        if let Ok(env) = self.current_mut() {
            seeds.extend(env.seed(Some(own)));
        }
        seeds
    }

    fn seed_task(&mut self, seed: Option<u64>) -> Vec<u64> {
        vec![self.task_slot.reseed(seed)]
    }

    /// Sub-environments are seeded by their builders, so there is no
    /// wrapper-level precondition here.
    fn assert_env_seed_is_set(&self) -> Result<()> {
        Ok(())
    }

    fn assert_task_seed_is_set(&self) -> Result<()> {
        self.task_slot.assert_seeded()
    }

    fn sample_task_state(&mut self) -> Result<usize> {
        self.assert_task_seed_is_set()?;
        use rand::Rng;
        let num_tasks = self.builders.len();
        Ok(self.task_slot.stream()?.gen_range(0..num_tasks))
    }

    fn get_task_state(&self) -> Result<usize> {
        Ok(self.task)
    }

    fn set_task_state(&mut self, state: usize) -> Result<()> {
        if state >= self.builders.len() {
            return Err(EnvError::Validation(format!(
                "task index {state} out of range for {} builders",
                self.builders.len()
            )));
        }
        if self.envs[state].is_none() {
            tracing::debug!(task = state, "constructing sub-environment");
            self.envs[state] = Some(self.builders[state]());
        }
        self.task = state;
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        let task = self.task;
        let env_obs = self.current_mut()?.reset()?;
        self.started[task] = true;
        Ok(Observation::compose(env_obs, TaskObs::Index(task)))
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        let task = self.task;
        if !self.started[task] {
            return Err(EnvError::StepBeforeReset);
        }
        let step = self.current_mut()?.step(action)?;
        Ok(Step {
            observation: Observation::compose(step.obs, TaskObs::Index(task)),
            reward: step.reward,
            done: step.done,
            info: step.info,
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        Ok(TaskObs::Index(self.task))
    }

    fn reward_range(&self) -> (f64, f64) {
        self.current()
            .map_or((f64::NEG_INFINITY, f64::INFINITY), Env::reward_range)
    }

    fn metadata(&self) -> Metadata {
        self.current().map_or_else(|_| Metadata::new(), Env::metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::EnvStep;
    use crate::types::{EnvObs, StepInfo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct TaggedEnv {
        tag: f64,
        steps: usize,
        observation_space: Space,
        action_space: Space,
    }

    impl TaggedEnv {
        fn new(tag: f64) -> Self {
            Self {
                tag,
                steps: 0,
                observation_space: Space::uniform_box(-10.0, 10.0, 1).unwrap(),
                action_space: Space::discrete(2).unwrap(),
            }
        }
    }

    impl Env for TaggedEnv {
        fn observation_space(&self) -> &Space {
            &self.observation_space
        }

        fn action_space(&self) -> &Space {
            &self.action_space
        }

        fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
            vec![seed.unwrap_or(0)]
        }

        fn reset(&mut self) -> Result<EnvObs> {
            self.steps = 0;
            Ok(vec![self.tag])
        }

        fn step(&mut self, _action: Action) -> Result<EnvStep> {
            self.steps += 1;
            Ok(EnvStep {
                obs: vec![self.tag],
                reward: self.tag,
                done: false,
                info: StepInfo::new(),
            })
        }
    }

    fn family(n: usize, built: &Arc<AtomicUsize>) -> Vec<EnvBuilder<TaggedEnv>> {
        (0..n)
            .map(|i| {
                let built = Arc::clone(built);
                let builder: EnvBuilder<TaggedEnv> = Box::new(move || {
                    built.fetch_add(1, Ordering::SeqCst);
                    TaggedEnv::new(i as f64)
                });
                builder
            })
            .collect()
    }

    #[test]
    fn only_the_initial_env_is_built_up_front() {
        let built = Arc::new(AtomicUsize::new(0));
        let wrapper = MultiEnvWrapper::new(family(5, &built), 2).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(wrapper.is_built(2));
        assert!(!wrapper.is_built(0));
    }

    #[test]
    fn switching_builds_once_and_caches() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut wrapper = MultiEnvWrapper::new(family(3, &built), 0).unwrap();
        wrapper.set_task_state(1).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
        wrapper.set_task_state(0).unwrap();
        wrapper.set_task_state(1).unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn observations_carry_the_task_index() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut wrapper = MultiEnvWrapper::new(family(3, &built), 1).unwrap();
        let obs = wrapper.reset().unwrap();
        assert_eq!(obs.env_obs, vec![1.0]);
        assert_eq!(obs.task_obs, TaskObs::Index(1));
        let step = wrapper.step(Action::Index(0)).unwrap();
        assert_eq!(step.observation.task_obs, TaskObs::Index(1));
        assert!(wrapper.observation_space().contains(&step.observation));
    }

    #[test]
    fn sampling_draws_valid_indices() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut wrapper = MultiEnvWrapper::new(family(4, &built), 0).unwrap();
        assert!(matches!(
            wrapper.sample_task_state(),
            Err(EnvError::TaskSeedNotSet)
        ));
        wrapper.seed_task(Some(3));
        for _ in 0..32 {
            assert!(wrapper.sample_task_state().unwrap() < 4);
        }
    }

    #[test]
    fn each_sub_env_needs_its_own_reset() {
        let built = Arc::new(AtomicUsize::new(0));
        let mut wrapper = MultiEnvWrapper::new(family(2, &built), 0).unwrap();
        wrapper.reset().unwrap();
        wrapper.step(Action::Index(0)).unwrap();
        wrapper.set_task_state(1).unwrap();
        assert!(matches!(
            wrapper.step(Action::Index(0)),
            Err(EnvError::StepBeforeReset)
        ));
        wrapper.reset().unwrap();
        wrapper.step(Action::Index(0)).unwrap();
        wrapper.set_task_state(0).unwrap();
        assert!(wrapper.step(Action::Index(0)).is_ok());
    }

    #[test]
    fn invalid_construction_is_rejected() {
        let built = Arc::new(AtomicUsize::new(0));
        assert!(matches!(
            MultiEnvWrapper::new(family(0, &built), 0),
            Err(EnvError::Validation(_))
        ));
        assert!(matches!(
            MultiEnvWrapper::new(family(2, &built), 2),
            Err(EnvError::Validation(_))
        ));
    }
}
