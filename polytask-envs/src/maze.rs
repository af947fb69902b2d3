//! Two-goal maze navigation
//!
//! A flat rectangular room with two goal markers. The task picks which of
//! the two pays `+1`; touching the other pays `-1`, and either ends the
//! episode. The agent turns in 45-degree increments and moves forward in
//! fixed strides. No rendering; the observation is the pose plus a facing
//! hint and the running reward total.

use std::f64::consts::PI;

use rand::Rng;

use polytask_core::seeding::{RngStream, StreamRole, StreamSlot};
use polytask_core::{
    Action, EnvError, MultiTaskEnv, Observation, ObservationSpace, Result, Space, Step, StepInfo,
    TaskObs,
};

const GOAL_RADIUS: f64 = 2.0;
const FORWARD_STRIDE: f64 = 0.51;
const TURN_INCREMENT: f64 = PI / 4.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Point {
    x: f64,
    y: f64,
}

impl Point {
    fn distance(self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Maze with two goals, one rewarding and one punishing per task.
///
/// Actions are `Discrete(3)`: turn left, turn right, move forward. The
/// observation is `[x, y, heading, hint, total_reward]` with positions
/// normalized by the room size; `hint` is `±1` when the agent faces the
/// hint direction (sign encodes the paying goal) and `0` otherwise. The
/// task observation is the paying goal's index, `Discrete(2)`.
pub struct TwoGoalMaze {
    size_x: f64,
    size_y: f64,
    observation_space: ObservationSpace,
    action_space: Space,
    env_slot: StreamSlot,
    task_slot: StreamSlot,
    task: Option<usize>,
    agent: Point,
    heading: f64,
    goals: [Point; 2],
    total_reward: f64,
    done: bool,
    warned_stale: bool,
    started: bool,
}

impl TwoGoalMaze {
    /// Maze spanning `[-size_x, size_x] x [-size_y, size_y]`
    pub fn new(size_x: usize, size_y: usize) -> Result<Self> {
        if size_x == 0 || size_y == 0 {
            return Err(EnvError::Validation(
                "maze half-extents must be at least one".into(),
            ));
        }
        let env_space = Space::bounded(
            vec![f64::NEG_INFINITY; 5],
            vec![f64::INFINITY; 5],
        )?;
        Ok(Self {
            size_x: size_x as f64,
            size_y: size_y as f64,
            observation_space: ObservationSpace::new(env_space, Space::discrete(2)?),
            action_space: Space::discrete(3)?,
            env_slot: StreamSlot::new(StreamRole::Env),
            task_slot: StreamSlot::new(StreamRole::Task),
            task: None,
            agent: Point { x: 0.0, y: 0.0 },
            heading: 0.0,
            goals: [Point { x: 0.0, y: 0.0 }; 2],
            total_reward: 0.0,
            done: false,
            warned_stale: false,
            started: false,
        })
    }

    fn random_point(size_x: f64, size_y: f64, rng: &mut RngStream) -> Point {
        Point {
            x: rng.gen_range(-size_x..size_x),
            y: rng.gen_range(-size_y..size_y),
        }
    }

    fn paying_goal(&self) -> Result<usize> {
        self.task.ok_or(EnvError::TaskNotSet)
    }

    fn facing_hint(&self) -> Result<f64> {
        let heading = self.heading;
        // The hint is visible only from a narrow facing band.
        if (-1.7..-1.5).contains(&heading) {
            Ok(if self.paying_goal()? == 0 { -1.0 } else { 1.0 })
        } else {
            Ok(0.0)
        }
    }

    fn observe(&self) -> Result<Vec<f64>> {
        Ok(vec![
            (self.agent.x / self.size_x) * 2.1 - 1.0,
            (self.agent.y / self.size_y) * 2.1 - 1.0,
            self.heading,
            self.facing_hint()?,
            self.total_reward,
        ])
    }
}

impl MultiTaskEnv for TwoGoalMaze {
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
        Ok(self.task_slot.stream()?.gen_range(0..2))
    }

    fn get_task_state(&self) -> Result<usize> {
        self.paying_goal()
    }

    fn set_task_state(&mut self, state: usize) -> Result<()> {
        if state >= 2 {
            return Err(EnvError::Validation(format!(
                "goal index {state} out of range for two goals"
            )));
        }
        self.task = Some(state);
        Ok(())
    }

    fn reset(&mut self) -> Result<Observation> {
        self.assert_env_seed_is_set()?;
        self.paying_goal()?;
        let (size_x, size_y) = (self.size_x, self.size_y);
        let (goals, agent, heading) = {
            let rng = self.env_slot.stream()?;
            let goals = [
                Self::random_point(size_x, size_y, rng),
                Self::random_point(size_x, size_y, rng),
            ];
            let heading = f64::from(rng.gen_range(0_u8..8)) * TURN_INCREMENT - PI;
            // Spawn away from both goals so no episode ends at step zero.
            let mut agent = Self::random_point(size_x, size_y, rng);
            while goals
                .iter()
                .any(|goal| agent.distance(*goal) < GOAL_RADIUS)
            {
                agent = Self::random_point(size_x, size_y, rng);
            }
            (goals, agent, heading)
        };
        self.goals = goals;
        self.agent = agent;
        self.heading = heading;
        self.total_reward = 0.0;
        self.done = false;
        self.warned_stale = false;
        self.started = true;
        let env_obs = self.observe()?;
        Ok(Observation::compose(env_obs, self.get_task_obs()?))
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
        match action {
            0 => self.heading = wrap_angle(self.heading + TURN_INCREMENT),
            1 => self.heading = wrap_angle(self.heading - TURN_INCREMENT),
            _ => {
                self.agent.x = (self.agent.x + FORWARD_STRIDE * self.heading.cos())
                    .clamp(-self.size_x, self.size_x);
                self.agent.y = (self.agent.y + FORWARD_STRIDE * self.heading.sin())
                    .clamp(-self.size_y, self.size_y);
            }
        }

        let paying = self.paying_goal()?;
        let mut reward = 0.0;
        let mut done = self.done;
        if self.agent.distance(self.goals[paying]) < GOAL_RADIUS {
            reward = 1.0;
            done = true;
        }
        if self.agent.distance(self.goals[1 - paying]) < GOAL_RADIUS {
            reward = -1.0;
            done = true;
        }
        self.total_reward += reward;
        self.done = done;
        Ok(Step {
            observation: Observation::compose(self.observe()?, self.get_task_obs()?),
            reward,
            done,
            info: StepInfo::new(),
        })
    }

    fn get_task_obs(&self) -> Result<TaskObs> {
        Ok(TaskObs::Index(self.paying_goal()?))
    }

    fn reward_range(&self) -> (f64, f64) {
        (-1.0, 1.0)
    }
}

fn wrap_angle(x: f64) -> f64 {
    let mut x = x;
    while x > PI {
        x -= 2.0 * PI;
    }
    while x < -PI {
        x += 2.0 * PI;
    }
    x
}
