//! Acrobot swing-up with task-dependent physics
//!
//! Double-pendulum swing-up from the RLPy domain. The task state is a
//! seven-dimensional vector in `[-1, 1]^7`: the first four entries scale the
//! link lengths and masses, the last flips the torque direction. Dynamics
//! integrate with a fourth-order Runge-Kutta step.

use std::f64::consts::PI;

use rand::Rng;

use polytask_core::seeding::{StreamRole, StreamSlot};
use polytask_core::{
    Action, EnvError, MultiTaskEnv, Observation, ObservationSpace, Result, Space, Step, StepInfo,
    TaskObs,
};

const TASK_DIM: usize = 7;
const DT: f64 = 0.2;
const GRAVITY: f64 = 9.8;
const LINK_COM: f64 = 0.5;
const LINK_MOI: f64 = 1.0;
const MAX_VEL_1: f64 = 4.0 * PI + PI;
const MAX_VEL_2: f64 = 9.0 * PI + 2.0 * PI;

/// Physical parameters derived from the active task vector
#[derive(Debug, Clone)]
struct AcrobotParams {
    link_length_1: f64,
    link_length_2: f64,
    link_mass_1: f64,
    link_mass_2: f64,
    torques: [f64; 3],
}

impl AcrobotParams {
    fn from_task(mu: &[f64]) -> Self {
        let torques = if mu[6] > 0.0 {
            [-1.0, 0.0, 1.0]
        } else {
            [1.0, 0.0, -1.0]
        };
        Self {
            link_length_1: 1.0 + mu[0] * 0.5,
            link_length_2: 1.0 + mu[1] * 0.5,
            link_mass_1: 1.0 + mu[2] * 0.5,
            link_mass_2: 1.0 + mu[3] * 0.5,
            torques,
        }
    }

    /// Time derivative of `[theta1, theta2, dtheta1, dtheta2]` under `torque`
    fn dsdt(&self, s: [f64; 4], torque: f64) -> [f64; 4] {
        let m1 = self.link_mass_1;
        let m2 = self.link_mass_2;
        let l1 = self.link_length_1;
        let lc1 = LINK_COM;
        let lc2 = LINK_COM;
        let (i1, i2) = (LINK_MOI, LINK_MOI);
        let [theta1, theta2, dtheta1, dtheta2] = s;

        let d1 = m1 * lc1 * lc1
            + m2 * (l1 * l1 + lc2 * lc2 + 2.0 * l1 * lc2 * theta2.cos())
            + i1
            + i2;
        let d2 = m2 * (lc2 * lc2 + l1 * lc2 * theta2.cos()) + i2;
        let phi2 = m2 * lc2 * GRAVITY * (theta1 + theta2 - PI / 2.0).cos();
        let phi1 = -m2 * l1 * lc2 * dtheta2 * dtheta2 * theta2.sin()
            - 2.0 * m2 * l1 * lc2 * dtheta2 * dtheta1 * theta2.sin()
            + (m1 * lc1 + m2 * l1) * GRAVITY * (theta1 - PI / 2.0).cos()
            + phi2;
        let ddtheta2 = (torque + d2 / d1 * phi1
            - m2 * l1 * lc2 * dtheta1 * dtheta1 * theta2.sin()
            - phi2)
            / (m2 * lc2 * lc2 + i2 - d2 * d2 / d1);
        let ddtheta1 = -(d2 * ddtheta2 + phi1) / d1;
        [dtheta1, dtheta2, ddtheta1, ddtheta2]
    }

    /// One Runge-Kutta step of size `dt`
    fn rk4(&self, s: [f64; 4], torque: f64, dt: f64) -> [f64; 4] {
        let add = |a: [f64; 4], b: [f64; 4], scale: f64| {
            let mut out = [0.0; 4];
            for i in 0..4 {
                out[i] = a[i] + b[i] * scale;
            }
            out
        };
        let k1 = self.dsdt(s, torque);
        let k2 = self.dsdt(add(s, k1, dt / 2.0), torque);
        let k3 = self.dsdt(add(s, k2, dt / 2.0), torque);
        let k4 = self.dsdt(add(s, k3, dt), torque);
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = s[i] + dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
        out
    }
}

/// Wrap `x` into `[low, high]` by shifting whole periods
fn wrap(mut x: f64, low: f64, high: f64) -> f64 {
    let diff = high - low;
    while x > high {
        x -= diff;
    }
    while x < low {
        x += diff;
    }
    x
}

/// Acrobot with per-task physics.
///
/// Observations are `[cos t1, sin t1, cos t2, sin t2, dt1, dt2]`; reward is
/// `-1.0` per step until the free end swings above the bar, which ends the
/// episode with reward `0.0`.
pub struct MultiTaskAcrobot {
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<Vec<f64>>,
    params: Option<AcrobotParams>,
    state: [f64; 4],
    done: bool,
    warned_stale: bool,
    started: bool,
}

impl MultiTaskAcrobot {
    /// Acrobot with tasks drawn uniformly from `[-1, 1]^7`
    pub fn new() -> Result<Self> {
        let obs_high = vec![1.5, 1.5, 1.5, 1.5, MAX_VEL_1, MAX_VEL_2];
        let obs_low = obs_high.iter().map(|&x| -x).collect();
        Ok(Self {
            observation_space: ObservationSpace::new(
                Space::bounded(obs_low, obs_high)?,
                Space::uniform_box(-1.0, 1.0, TASK_DIM)?,
            ),
            action_space: Space::discrete(3)?,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            params: None,
            state: [0.0; 4],
            done: false,
            warned_stale: false,
            started: false,
        })
    }

    fn observe(&self) -> Vec<f64> {
        let [theta1, theta2, dtheta1, dtheta2] = self.state;
        vec![
            theta1.cos(),
            theta1.sin(),
            theta2.cos(),
            theta2.sin(),
            dtheta1,
            dtheta2,
        ]
    }

    fn is_terminal(&self) -> bool {
        let [theta1, theta2, _, _] = self.state;
        -theta1.cos() - (theta1 + theta2).cos() > 1.0
    }
}

impl MultiTaskEnv for MultiTaskAcrobot {
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
        self.params = Some(AcrobotParams::from_task(&state));
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        let task_obs = self.get_task_obs()?;
        {
            let rng = self.env_slot.stream()?;
            for value in &mut self.state {
                *value = rng.gen_range(-0.1..0.1);
            }
        }
        self.done = false;
        self.warned_stale = false;
        self.started = true;
        Ok(Observation::compose(self.observe(), task_obs))
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
        if self.done && !self.warned_stale {
            tracing::warn!(
                "step called on an episode that already returned done, call reset instead"
            );
            self.warned_stale = true;
        }
        let params = self.params.as_ref().ok_or(EnvError::TaskNotSet)?;
        let torque = params.torques[action];
        let mut next = params.rk4(self.state, torque, DT);
        next[0] = wrap(next[0], -PI, PI);
        next[1] = wrap(next[1], -PI, PI);
        next[2] = next[2].clamp(-MAX_VEL_1, MAX_VEL_1);
        next[3] = next[3].clamp(-MAX_VEL_2, MAX_VEL_2);
        self.state = next;
        let terminal = self.is_terminal();
        self.done = self.done || terminal;
        let reward = if terminal { 0.0 } else { -1.0 };
        Ok(Step {
            observation: Observation::compose(self.observe(), self.get_task_obs()?),
            reward,
            done: self.done,
            info: StepInfo::new(),
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        let task = self.task.as_ref().ok_or(EnvError::TaskNotSet)?;
        Ok(TaskObs::Vector(task.clone()))
    }

    fn reward_range(&self) -> (f64, f64) {
        (-1.0, 0.0)
    }
}

/// Acrobot with the classic fixed physics.
pub struct Acrobot {
    env: MultiTaskAcrobot,
}

impl Acrobot {
    /// Acrobot with the RLPy physical constants
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: MultiTaskAcrobot::new()?,
        })
    }
}

impl MultiTaskEnv for Acrobot {
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

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ready() -> MultiTaskAcrobot {
        let mut env = MultiTaskAcrobot::new().unwrap();
        env.seed(Some(5));
        env.seed_task(Some(15));
        env.reset_task_state().unwrap();
        env
    }

    #[test]
    fn wrap_shifts_whole_periods() {
        assert_relative_eq!(wrap(2.0 * PI, -PI, PI), 0.0);
        assert_relative_eq!(wrap(PI / 2.0, -PI, PI), PI / 2.0);
        assert_relative_eq!(wrap(-3.0 * PI, -PI, PI), -PI);
    }

    #[test]
    fn task_dimensionality_matches_the_declared_space() {
        let mut env = ready();
        let task = env.sample_task_state().unwrap();
        assert_eq!(task.len(), TASK_DIM);
        assert!(env
            .observation_space()
            .task_obs
            .contains(&TaskObs::Vector(task)));
    }

    #[test]
    fn torque_direction_follows_the_last_task_entry() {
        let forward = AcrobotParams::from_task(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(forward.torques, [-1.0, 0.0, 1.0]);
        let flipped = AcrobotParams::from_task(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
        assert_eq!(flipped.torques, [1.0, 0.0, -1.0]);
    }

    #[test]
    fn observations_stay_in_the_declared_space() {
        let mut env = ready();
        let obs = env.reset().unwrap();
        assert!(env.observation_space().contains(&obs));
        for i in 0..100 {
            let step = env.step(Action::Index(i % 3)).unwrap();
            assert!(env.observation_space().contains(&step.observation));
            assert_eq!(step.observation.task_obs, env.get_task_obs().unwrap());
            assert!(step.reward == -1.0 || step.reward == 0.0);
            if step.done {
                break;
            }
        }
    }

    #[test]
    fn reward_is_negative_until_terminal() {
        let mut env = ready();
        env.reset().unwrap();
        let step = env.step(Action::Index(0)).unwrap();
        if !step.done {
            assert_eq!(step.reward, -1.0);
        }
    }

    #[test]
    fn episodes_replay_under_equal_seeds() {
        let mut a = ready();
        let mut b = ready();
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
        for i in 0..50 {
            let sa = a.step(Action::Index(i % 3)).unwrap();
            let sb = b.step(Action::Index(i % 3)).unwrap();
            assert_eq!(sa, sb);
            if sa.done {
                break;
            }
        }
    }

    #[test]
    fn fixed_variant_always_samples_zeros() {
        let mut env = Acrobot::new().unwrap();
        env.seed(Some(3));
        env.seed_task(Some(4));
        env.reset_task_state().unwrap();
        assert_eq!(env.get_task_state().unwrap(), vec![0.0; TASK_DIM]);
    }
}
