//! Multi-armed bandit environments
//!
//! Three renditions of the same machine: a plain single-task bandit, a
//! multi-task bandit whose task is the arm-probability vector, and a finite
//! variant restricted to a fixed candidate matrix. [`BanditTaskAdapter`]
//! turns the plain bandit into a multi-task one through
//! [`EnvToMultiTask`](polytask_core::wrappers::EnvToMultiTask).

use rand::Rng;

use polytask_core::seeding::{derive_stream, StreamRole, StreamSlot};
use polytask_core::wrappers::TaskAdapter;
use polytask_core::{
    Action, Env, EnvError, EnvObs, EnvStep, MultiTaskEnv, Observation, ObservationSpace, Result,
    RngStream, Space, Step, StepInfo, TaskObs,
};

fn validate_probabilities(probabilities: &[f64]) -> Result<()> {
    if probabilities.is_empty() {
        return Err(EnvError::Validation(
            "at least one arm probability is required".into(),
        ));
    }
    if let Some(p) = probabilities
        .iter()
        .find(|p| !(0.0..=1.0).contains(*p) || p.is_nan())
    {
        return Err(EnvError::Validation(format!(
            "arm probability {p} outside [0, 1]"
        )));
    }
    Ok(())
}

/// Plain `n`-armed bandit with fixed arm probabilities.
///
/// The observation is always `[0.0]`; pulling arm `a` pays `1.0` with the
/// arm's probability and `0.0` otherwise, and the episode never ends. The
/// probabilities are drawn once at construction, so they are part of the
/// instance, not of the task stream.
pub struct BanditEnv {
    n_arms: usize,
    reward_probability: Vec<f64>,
    observation_space: Space,
    action_space: Space,
    env_slot: StreamSlot,
}

impl BanditEnv {
    /// Bandit with `n_arms` arms and probabilities drawn from entropy
    pub fn new(n_arms: usize) -> Result<Self> {
        if n_arms == 0 {
            return Err(EnvError::Validation("a bandit needs at least one arm".into()));
        }
        let (mut rng, _) = derive_stream(None);
        let probabilities = (0..n_arms).map(|_| rng.gen_range(0.0..1.0)).collect();
        Self::with_probabilities(probabilities)
    }

    /// Bandit with explicit arm probabilities, each in `[0, 1]`
    pub fn with_probabilities(probabilities: Vec<f64>) -> Result<Self> {
        validate_probabilities(&probabilities)?;
        let n_arms = probabilities.len();
        Ok(Self {
            n_arms,
            reward_probability: probabilities,
            observation_space: Space::uniform_box(0.0, 1.0, 1)?,
            action_space: Space::discrete(n_arms)?,
            env_slot: StreamSlot::new(StreamRole::Env),
        })
    }

    /// Number of arms
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    /// Per-arm reward probabilities
    #[must_use]
    pub fn reward_probability(&self) -> &[f64] {
        &self.reward_probability
    }

    /// Replace the per-arm reward probabilities
    pub fn set_reward_probability(&mut self, probabilities: Vec<f64>) -> Result<()> {
        validate_probabilities(&probabilities)?;
        if probabilities.len() != self.n_arms {
            return Err(EnvError::Validation(format!(
                "expected {} arm probabilities, got {}",
                self.n_arms,
                probabilities.len()
            )));
        }
        self.reward_probability = probabilities;
        Ok(())
    }

    fn pull(&mut self, action: &Action) -> Result<f64> {
        if !self.action_space.contains(action) {
            return Err(EnvError::InvalidAction(format!("{action:?}")));
        }
        let arm = action
            .as_index()
            .ok_or_else(|| EnvError::InvalidAction(format!("{action:?}")))?;
        let sample: f64 = self.env_slot.stream()?.gen_range(0.0..1.0);
        Ok(if sample < self.reward_probability[arm] {
            1.0
        } else {
            0.0
        })
    }
}

impl Env for BanditEnv {
    fn observation_space(&self) -> &Space {
        &self.observation_space
    }

    fn action_space(&self) -> &Space {
        &self.action_space
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        vec![self.env_slot.reseed(seed)]
    }

    fn reset(&mut self) -> Result<EnvObs> {
        self.env_slot.assert_seeded()?;
        Ok(vec![0.0])
    }

    fn step(&mut self, action: Action) -> Result<EnvStep> {
        let reward = self.pull(&action)?;
        Ok(EnvStep {
            obs: vec![0.0],
            reward,
            done: false,
            info: StepInfo::new(),
        })
    }

    fn reward_range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }
}

/// Multi-task bandit whose task state is the arm-probability vector.
///
/// Tasks are sampled from the declared task-observation space through the
/// task stream, so re-seeding the task stream re-seeds task sampling.
pub struct MultiTaskBandit {
    n_arms: usize,
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<Vec<f64>>,
    started: bool,
}

impl MultiTaskBandit {
    /// Multi-task bandit with `n_arms` arms
    pub fn new(n_arms: usize) -> Result<Self> {
        if n_arms == 0 {
            return Err(EnvError::Validation("a bandit needs at least one arm".into()));
        }
        Ok(Self {
            n_arms,
            observation_space: ObservationSpace::new(
                Space::uniform_box(0.0, 1.0, 1)?,
                Space::uniform_box(0.0, 1.0, n_arms)?,
            ),
            action_space: Space::discrete(n_arms)?,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            started: false,
        })
    }

    /// Number of arms
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }
}

impl MultiTaskEnv for MultiTaskBandit {
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
        let sampled = self
            .observation_space
            .task_obs
            .sample(self.task_slot.stream()?);
        Ok(sampled.to_vec())
    }

    fn get_task_state(&self) -> Result<Vec<f64>> {
        self.task.clone().ok_or(EnvError::TaskNotSet)
    }

    fn set_task_state(&mut self, state: Vec<f64>) -> Result<()> {
        if !self
            .observation_space
            .task_obs
            .contains(&TaskObs::Vector(state.clone()))
        {
            return Err(EnvError::Validation(format!(
                "task state {state:?} outside the task space of a {}-armed bandit",
                self.n_arms
            )));
        }
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let task_obs = self.get_task_obs()?;
        self.started = true;
        Ok(Observation::compose(vec![0.0], task_obs))
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        if !self.started {
            return Err(EnvError::StepBeforeReset);
        }
        if !self.action_space.contains(&action) {
            return Err(EnvError::InvalidAction(format!("{action:?}")));
        }
        let arm = action
            .as_index()
            .ok_or_else(|| EnvError::InvalidAction(format!("{action:?}")))?;
        let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
        let probability = task[arm];
        let sample: f64 = self.env_slot.stream()?.gen_range(0.0..1.0);
        let reward = if sample < probability { 1.0 } else { 0.0 };
        Ok(Step {
            observation: Observation::compose(vec![0.0], self.get_task_obs()?),
            reward,
            done: false,
            info: StepInfo::new(),
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
        Ok(TaskObs::Vector(task.clone()))
    }

    fn reward_range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }
}

/// Multi-task bandit restricted to a fixed candidate matrix.
///
/// The `n_tasks` candidate probability vectors are derived from a constant
/// stream at construction, so every instance with the same shape agrees on
/// them; a task state is an index into the matrix, which makes task states
/// portable across instances.
pub struct FiniteMultiTaskBandit {
    n_arms: usize,
    n_tasks: usize,
    candidates: Vec<Vec<f64>>,
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<usize>,
    started: bool,
}

impl FiniteMultiTaskBandit {
    /// Finite bandit with `n_tasks` candidate tasks over `n_arms` arms
    pub fn new(n_tasks: usize, n_arms: usize) -> Result<Self> {
        if n_tasks == 0 {
            return Err(EnvError::Validation(
                "a finite bandit needs at least one task".into(),
            ));
        }
        if n_arms == 0 {
            return Err(EnvError::Validation("a bandit needs at least one arm".into()));
        }
        let task_space = Space::uniform_box(0.0, 1.0, n_arms)?;
        // Constant stream: the candidate matrix is part of the environment
        // definition, not of any seeded stream.
        let (mut rng, _) = derive_stream(Some(0));
        let candidates = (0..n_tasks)
            .map(|_| task_space.sample(&mut rng).to_vec())
            .collect();
        Ok(Self {
            n_arms,
            n_tasks,
            candidates,
            observation_space: ObservationSpace::new(
                Space::uniform_box(0.0, 1.0, 1)?,
                task_space,
            ),
            action_space: Space::discrete(n_arms)?,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            started: false,
        })
    }

    /// Number of candidate tasks
    #[must_use]
    pub fn n_tasks(&self) -> usize {
        self.n_tasks
    }

    /// Number of arms
    #[must_use]
    pub fn n_arms(&self) -> usize {
        self.n_arms
    }

    fn active_probabilities(&self) -> Result<&[f64]> {
        let task = self.task.ok_or(EnvError::TaskNotSet)?;
        Ok(&self.candidates[task])
    }
}

impl MultiTaskEnv for FiniteMultiTaskBandit {
    type TaskState = usize;

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

    fn sample_task_state(&mut self) -> Result<usize> {
        self.assert_task_seed_is_set()?;
        Ok(self.task_slot.stream()?.gen_range(0..self.n_tasks))
    }

    fn get_task_state(&self) -> Result<usize> {
        self.task.ok_or(EnvError::TaskNotSet)
    }

    fn set_task_state(&mut self, state: usize) -> Result<()> {
        if state >= self.n_tasks {
            return Err(EnvError::Validation(format!(
                "task index {state} out of range for {} tasks",
                self.n_tasks
            )));
        }
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let task_obs = self.get_task_obs()?;
        self.started = true;
        Ok(Observation::compose(vec![0.0], task_obs))
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        if !self.started {
            return Err(EnvError::StepBeforeReset);
        }
        if !self.action_space.contains(&action) {
            return Err(EnvError::InvalidAction(format!("{action:?}")));
        }
        let arm = action
            .as_index()
            .ok_or_else(|| EnvError::InvalidAction(format!("{action:?}")))?;
        let probability = self.active_probabilities()?[arm];
        let sample: f64 = self.env_slot.stream()?.gen_range(0.0..1.0);
        let reward = if sample < probability { 1.0 } else { 0.0 };
        Ok(Step {
            observation: Observation::compose(vec![0.0], self.get_task_obs()?),
            reward,
            done: false,
            info: StepInfo::new(),
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        Ok(TaskObs::Vector(self.active_probabilities()?.to_vec()))
    }

    fn reward_range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }
}

/// Task behavior for adapting [`BanditEnv`] into the multi-task contract.
///
/// The task state is the arm-probability vector; applying it overwrites the
/// plain bandit's probabilities.
pub struct BanditTaskAdapter {
    task_space: Space,
}

impl BanditTaskAdapter {
    /// Adapter for bandits with `n_arms` arms
    pub fn new(n_arms: usize) -> Result<Self> {
        Ok(Self {
            task_space: Space::uniform_box(0.0, 1.0, n_arms.max(1))?,
        })
    }
}

impl TaskAdapter<BanditEnv> for BanditTaskAdapter {
    type TaskState = Vec<f64>;

    fn task_obs_space(&self) -> Space {
        self.task_space.clone()
    }

    fn sample(&mut self, rng: &mut RngStream) -> Vec<f64> {
        self.task_space.sample(rng).to_vec()
    }

    fn task_obs(&self, state: &Vec<f64>) -> TaskObs {
        TaskObs::Vector(state.clone())
    }

    fn apply(&mut self, env: &mut BanditEnv, state: &Vec<f64>) -> Result<()> {
        env.set_reward_probability(state.clone())
    }
}
