//! Cart-pole balancing with task-dependent physics
//!
//! The task state is a five-dimensional vector in `[-1, 1]^5` mapped onto
//! gravity, cart mass, pole mass, pole half-length and force magnitude.
//! Dynamics follow the classic Sutton pole-balancing equations with Euler
//! integration.

use std::f64::consts::PI;

use rand::Rng;

use polytask_core::seeding::{StreamRole, StreamSlot};
use polytask_core::{
    Action, EnvError, MultiTaskEnv, Observation, ObservationSpace, Result, Space, Step, StepInfo,
    TaskObs,
};

const TASK_DIM: usize = 5;
const TAU: f64 = 0.02;
const X_THRESHOLD: f64 = 2.4;
const THETA_THRESHOLD: f64 = 12.0 * 2.0 * PI / 360.0;

/// Physical parameters derived from the active task vector
#[derive(Debug, Clone)]
struct CartPoleParams {
    gravity: f64,
    mass_cart: f64,
    mass_pole: f64,
    length: f64,
    force_mag: f64,
}

impl CartPoleParams {
    fn from_task(mu: &[f64]) -> Self {
        let force_mag = if mu[4] == 0.0 { 10.0 } else { 10.0 * mu[4] };
        Self {
            gravity: 9.8 + mu[0] * 5.0,
            mass_cart: 1.0 + mu[1] * 0.5,
            mass_pole: 0.1 + mu[2] * 0.09,
            length: 0.5 + mu[3] * 0.3,
            force_mag,
        }
    }

    fn total_mass(&self) -> f64 {
        self.mass_cart + self.mass_pole
    }

    fn polemass_length(&self) -> f64 {
        self.mass_pole * self.length
    }
}

/// Cart-pole with per-task physics.
///
/// Observations are `[x, x_dot, theta, theta_dot]`; the episode ends when
/// the cart leaves `±2.4` or the pole tips past `±12°`. Reward is `1.0` per
/// step until failure; stepping a finished episode is flagged with a
/// warning and pays `0.0`.
pub struct MultiTaskCartPole {
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<Vec<f64>>,
    params: Option<CartPoleParams>,
    state: [f64; 4],
    steps_beyond_done: Option<usize>,
    started: bool,
}

impl MultiTaskCartPole {
    /// Cart-pole with tasks drawn uniformly from `[-1, 1]^5`
    pub fn new() -> Result<Self> {
        let obs_high = vec![
            X_THRESHOLD * 2.0,
            f64::INFINITY,
            THETA_THRESHOLD * 2.0,
            f64::INFINITY,
        ];
        let obs_low = obs_high.iter().map(|&x| -x).collect();
        Ok(Self {
            observation_space: ObservationSpace::new(
                Space::bounded(obs_low, obs_high)?,
                Space::uniform_box(-1.0, 1.0, TASK_DIM)?,
            ),
            action_space: Space::discrete(2)?,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            params: None,
            state: [0.0; 4],
            steps_beyond_done: None,
            started: false,
        })
    }

    fn params(&self) -> Result<&CartPoleParams> {
        self.params.as_ref().ok_or(EnvError::TaskNotSet)
    }

    fn is_done(&self) -> bool {
        let [x, _, theta, _] = self.state;
        !(-X_THRESHOLD..=X_THRESHOLD).contains(&x)
            || !(-THETA_THRESHOLD..=THETA_THRESHOLD).contains(&theta)
    }

    fn integrate(&mut self, action: usize) -> Result<()> {
        let params = self.params()?.clone();
        let [x, x_dot, theta, theta_dot] = self.state;
        let force = if action == 1 {
            params.force_mag
        } else {
            -params.force_mag
        };
        let cos_theta = theta.cos();
        let sin_theta = theta.sin();
        let temp = (force + params.polemass_length() * theta_dot * theta_dot * sin_theta)
            / params.total_mass();
        let theta_acc = (params.gravity * sin_theta - cos_theta * temp)
            / (params.length
                * (4.0 / 3.0 - params.mass_pole * cos_theta * cos_theta / params.total_mass()));
        let x_acc = temp - params.polemass_length() * theta_acc * cos_theta / params.total_mass();
        self.state = [
            x + TAU * x_dot,
            x_dot + TAU * x_acc,
            theta + TAU * theta_dot,
            theta_dot + TAU * theta_acc,
        ];
        Ok(())
    }
}

impl MultiTaskEnv for MultiTaskCartPole {
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
        Ok((0..TASK_DIM).map(|_| rng.gen_range(-1.0..1.0)).collect())
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
                "task state {state:?} outside [-1, 1]^{TASK_DIM}"
            )));
        }
        self.params = Some(CartPoleParams::from_task(&state));
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let task_obs = self.get_task_obs()?;
        {
            let rng = self.env_slot.stream()?;
            for value in &mut self.state {
                *value = rng.gen_range(-0.05..0.05);
            }
        }
        self.steps_beyond_done = None;
        self.started = true;
        Ok(Observation::compose(self.state.to_vec(), task_obs))
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
        self.integrate(action)?;
        let done = self.is_done();
        let reward = if !done {
            1.0
        } else if self.steps_beyond_done.is_none() {
            // Pole just fell
            self.steps_beyond_done = Some(0);
            1.0
        } else {
            let extra = self.steps_beyond_done.unwrap_or(0);
            if extra == 0 {
                tracing::warn!(
                    "step called on an episode that already returned done, call reset instead"
                );
            }
            self.steps_beyond_done = Some(extra + 1);
            0.0
        };
        Ok(Step {
            observation: Observation::compose(self.state.to_vec(), self.get_task_obs()?),
            reward,
            done,
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

/// Cart-pole with the classic fixed physics.
///
/// Same dynamics as [`MultiTaskCartPole`] with the task distribution
/// collapsed to the zero vector, which maps to the textbook constants.
pub struct CartPole {
    env: MultiTaskCartPole,
}

impl CartPole {
    /// Cart-pole with the textbook physical constants
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: MultiTaskCartPole::new()?,
        })
    }
}

impl MultiTaskEnv for CartPole {
    type TaskState = Vec<f64>;

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

    fn sample_task_state(&mut self) -> Result<Vec<f64>> {
        self.env.assert_task_seed_is_set()?;
        Ok(vec![0.0; TASK_DIM])
    }

    fn get_task_state(&self) -> Result<Vec<f64>> {
        self.env.get_task_state()
    }

    fn set_task_state(&mut self, state: Vec<f64>) -> Result<()> {
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
