//! Tabular MDPs whose task state is the full model
//!
//! The task state carries the reward matrix and the transition tensor, so
//! switching tasks swaps the whole MDP. The base environment has no task
//! distribution of its own; [`UniformTabularMdp`] samples uniform rewards
//! and softmax-normalized Gaussian transitions.

use ndarray::{Array2, Array3, Axis};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use polytask_core::seeding::{StreamRole, StreamSlot};
use polytask_core::{
    Action, EnvError, MultiTaskEnv, Observation, ObservationSpace, Result, Space, Step, StepInfo,
    TaskObs,
};

const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Full model of one tabular task.
///
/// `rewards[[s, a]]` is the probability of earning `+1` when taking action
/// `a` in state `s`; `transitions[[s, a, s']]` is the probability of moving
/// to `s'`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularTask {
    /// Per state-action reward probabilities, `n_states x n_actions`
    pub rewards: Array2<f64>,
    /// Transition tensor, `n_states x n_actions x n_states`
    pub transitions: Array3<f64>,
}

impl TabularTask {
    fn validate(&self, n_states: usize, n_actions: usize) -> Result<()> {
        if self.rewards.dim() != (n_states, n_actions) {
            return Err(EnvError::Validation(format!(
                "reward matrix shape {:?} does not match {n_states} states x {n_actions} actions",
                self.rewards.dim()
            )));
        }
        if self.transitions.dim() != (n_states, n_actions, n_states) {
            return Err(EnvError::Validation(format!(
                "transition tensor shape {:?} does not match {n_states}x{n_actions}x{n_states}",
                self.transitions.dim()
            )));
        }
        if self.rewards.iter().any(|p| !(0.0..=1.0).contains(p)) {
            return Err(EnvError::Validation(
                "reward probabilities must lie in [0, 1]".into(),
            ));
        }
        for row in self.transitions.rows() {
            if row.iter().any(|p| *p < 0.0) {
                return Err(EnvError::Validation(
                    "transition probabilities must be non-negative".into(),
                ));
            }
            let sum: f64 = row.sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(EnvError::Validation(format!(
                    "transition row sums to {sum}, expected 1"
                )));
            }
        }
        Ok(())
    }

    fn flatten(&self) -> Vec<f64> {
        self.rewards
            .iter()
            .chain(self.transitions.iter())
            .copied()
            .collect()
    }
}

/// Tabular MDP over `n_states` states and `n_actions` actions.
///
/// Observations are a one-hot encoding of the current state plus a trailing
/// reward channel; the task observation is the flattened model. The base
/// environment cannot sample tasks (`Unsupported`); tasks arrive through
/// `set_task_state` or from a subtype with a distribution.
pub struct TabularMdp {
    n_states: usize,
    n_actions: usize,
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<TabularTask>,
    state: usize,
    started: bool,
}

impl TabularMdp {
    /// Tabular MDP over `n_states` states and `n_actions` actions
    pub fn new(n_states: usize, n_actions: usize) -> Result<Self> {
        if n_states == 0 || n_actions == 0 {
            return Err(EnvError::Validation(
                "a tabular MDP needs at least one state and one action".into(),
            ));
        }
        let task_dim = n_states * n_actions + n_states * n_actions * n_states;
        Ok(Self {
            n_states,
            n_actions,
            observation_space: ObservationSpace::new(
                Space::uniform_box(0.0, 1.0, n_states + 1)?,
                Space::uniform_box(0.0, 1.0, task_dim)?,
            ),
            action_space: Space::discrete(n_actions)?,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            state: 0,
            started: false,
        })
    }

    /// Number of states
    #[must_use]
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// Number of actions
    #[must_use]
    pub fn n_actions(&self) -> usize {
        self.n_actions
    }

    fn one_hot(&self, reward: f64) -> Vec<f64> {
        let mut obs = vec![0.0; self.n_states + 1];
        obs[self.state] = 1.0;
        obs[self.n_states] = reward;
        obs
    }
}

impl MultiTaskEnv for TabularMdp {
    type TaskState = TabularTask;

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

    fn sample_task_state(&mut self) -> Result<TabularTask> {
        Err(EnvError::Unsupported(
            "the base tabular MDP has no task distribution",
        ))
    }

    fn get_task_state(&self) -> Result<TabularTask> {
        self.task.clone().ok_or(EnvError::TaskNotSet)
    }

    fn set_task_state(&mut self, state: TabularTask) -> Result<()> {
        state.validate(self.n_states, self.n_actions)?;
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let task_obs = self.get_task_obs()?;
        self.state = {
            let n_states = self.n_states;
            self.env_slot.stream()?.gen_range(0..n_states)
        };
        self.started = true;
        Ok(Observation::compose(self.one_hot(0.0), task_obs))
    }

    fn step(&mut self, action: Action) -> Result<Step> {
        if !self.started {
            return Err(EnvError::StepBeforeReset);
        }
        if !self.action_space.contains(&action) {
            return Err(EnvError::InvalidAction(format!("{action:?}")));
        }
        let action = action
            .as_index()
            .ok_or_else(|| EnvError::InvalidAction(format!("{action:?}")))?;
        let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
        let reward_probability = task.rewards[[self.state, action]];
        let transition_row: Vec<f64> = task
            .transitions
            .index_axis(Axis(0), self.state)
            .index_axis(Axis(0), action)
            .to_vec();

        let rng = self.env_slot.stream()?;
        let reward_draw: f64 = rng.gen_range(0.0..1.0);
        let reward = if reward_draw < reward_probability {
            1.0
        } else {
            0.0
        };
        let transition_draw: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        let mut next_state = self.n_states - 1;
        for (candidate, probability) in transition_row.iter().enumerate() {
            cumulative += probability;
            if transition_draw < cumulative {
                next_state = candidate;
                break;
            }
        }
        self.state = next_state;
        Ok(Step {
            observation: Observation::compose(self.one_hot(reward), self.get_task_obs()?),
            reward,
            done: false,
            info: StepInfo::new(),
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
        Ok(TaskObs::Vector(task.flatten()))
    }

    fn reward_range(&self) -> (f64, f64) {
        (0.0, 1.0)
    }
}

/// Tabular MDP with a uniform task distribution.
///
/// Rewards are drawn uniformly from `[0, 1]`; transitions draw a standard
/// normal tensor and softmax-normalize it over the next-state axis.
pub struct UniformTabularMdp {
    env: TabularMdp,
}

impl UniformTabularMdp {
    /// Uniform tabular MDP over `n_states` states and `n_actions` actions
    pub fn new(n_states: usize, n_actions: usize) -> Result<Self> {
        Ok(Self {
            env: TabularMdp::new(n_states, n_actions)?,
        })
    }
}

impl MultiTaskEnv for UniformTabularMdp {
    type TaskState = TabularTask;

    fn observation_space(&self) -> &ObservationSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> &Space {
        self.env.action_space()
    }

    fn seed(&mut self, seed: Option<u64>) -> Vec<u64> {
        self.env.seed(seed)
    }

    fn seed_task(&mut self, seed: Option<u64>) -> Vec<u64> {
        self.env.seed_task(seed)
    }

    fn assert_env_seed_is_set(&self) -> Result<()> {
        self.env.assert_env_seed_is_set()
    }

    fn assert_task_seed_is_set(&self) -> Result<()> {
        self.env.assert_task_seed_is_set()
    }

    fn sample_task_state(&mut self) -> Result<TabularTask> {
        self.env.assert_task_seed_is_set()?;
        let (n_states, n_actions) = (self.env.n_states, self.env.n_actions);
        let rng = self.env.task_slot.stream()?;
        let rewards =
            Array2::from_shape_simple_fn((n_states, n_actions), || rng.gen_range(0.0..1.0));
        let mut transitions =
            Array3::from_shape_simple_fn((n_states, n_actions, n_states), || {
                rng.sample::<f64, _>(StandardNormal)
            });
        for mut row in transitions.rows_mut() {
            let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            row.mapv_inplace(|x| (x - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|x| x / sum);
        }
        Ok(TabularTask {
            rewards,
            transitions,
        })
    }

    fn get_task_state(&self) -> Result<TabularTask> {
        self.env.get_task_state()
    }

    fn set_task_state(&mut self, state: TabularTask) -> Result<()> {
        self.env.set_task_state(state)
    }

    fn reset(&mut self) -> Result<Observation> {
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ready(n_states: usize, n_actions: usize) -> UniformTabularMdp {
        let mut env = UniformTabularMdp::new(n_states, n_actions).unwrap();
        env.seed(Some(5));
        env.seed_task(Some(14));
        env.reset_task_state().unwrap();
        env
    }

    #[test]
    fn rejects_empty_dimensions() {
        assert!(matches!(TabularMdp::new(0, 2), Err(EnvError::Validation(_))));
        assert!(matches!(TabularMdp::new(3, 0), Err(EnvError::Validation(_))));
    }

    #[test]
    fn base_mdp_cannot_sample_tasks() {
        let mut env = TabularMdp::new(3, 2).unwrap();
        env.seed_task(Some(1));
        assert!(matches!(
            env.sample_task_state(),
            Err(EnvError::Unsupported(_))
        ));
    }

    #[test]
    fn sampling_failure_leaves_the_active_task_unchanged() {
        let mut env = ready(3, 2);
        let task = {
            let mut base = TabularMdp::new(3, 2).unwrap();
            base.seed_task(Some(1));
            let mut uniform = UniformTabularMdp::new(3, 2).unwrap();
            uniform.seed_task(Some(9));
            let sampled = uniform.sample_task_state().unwrap();
            base.set_task_state(sampled.clone()).unwrap();
            assert_eq!(base.get_task_state().unwrap(), sampled);
            assert!(matches!(
                base.reset_task_state(),
                Err(EnvError::Unsupported(_))
            ));
            assert_eq!(base.get_task_state().unwrap(), sampled);
            sampled
        };
        env.set_task_state(task.clone()).unwrap();
        assert_eq!(env.get_task_state().unwrap(), task);
    }

    #[test]
    fn sampled_transitions_are_distributions() {
        let mut env = ready(4, 3);
        let task = env.sample_task_state().unwrap();
        for row in task.transitions.rows() {
            assert_relative_eq!(row.sum(), 1.0, epsilon = 1e-9);
            assert!(row.iter().all(|p| *p > 0.0));
        }
        assert!(task.rewards.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn malformed_tasks_are_rejected() {
        let mut env = TabularMdp::new(3, 2).unwrap();
        let wrong_shape = TabularTask {
            rewards: Array2::zeros((2, 2)),
            transitions: Array3::zeros((3, 2, 3)),
        };
        assert!(matches!(
            env.set_task_state(wrong_shape),
            Err(EnvError::Validation(_))
        ));
        let unnormalized = TabularTask {
            rewards: Array2::zeros((3, 2)),
            transitions: Array3::zeros((3, 2, 3)),
        };
        assert!(matches!(
            env.set_task_state(unnormalized),
            Err(EnvError::Validation(_))
        ));
    }

    #[test]
    fn observations_are_one_hot_with_reward_channel() {
        let mut env = ready(3, 2);
        let obs = env.reset().unwrap();
        assert_eq!(obs.env_obs.len(), 4);
        assert_relative_eq!(obs.env_obs[..3].iter().sum::<f64>(), 1.0);
        assert_eq!(obs.env_obs[3], 0.0);
        assert!(env.observation_space().contains(&obs));
        let step = env.step(Action::Index(1)).unwrap();
        assert_relative_eq!(step.observation.env_obs[..3].iter().sum::<f64>(), 1.0);
        assert_eq!(step.observation.env_obs[3], step.reward);
        assert!(env.observation_space().contains(&step.observation));
    }

    #[test]
    fn episodes_replay_under_equal_seeds() {
        let mut a = ready(4, 3);
        let mut b = ready(4, 3);
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        for i in 0..20 {
            assert_eq!(
                a.step(Action::Index(i % 3)).unwrap(),
                b.step(Action::Index(i % 3)).unwrap()
            );
        }
    }
}
