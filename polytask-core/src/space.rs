//! Observation and action spaces

use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

use crate::error::{EnvError, Result};
use crate::observation::Observation;
use crate::seeding::RngStream;
use crate::types::SpaceValue;

/// A space of values an environment draws from or validates against
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    /// Finitely many choices `0..n`
    Discrete {
        /// Number of values
        n: usize,
    },
    /// Axis-aligned box with inclusive bounds, possibly infinite
    Box {
        /// Lower bound per dimension
        low: Vec<f64>,
        /// Upper bound per dimension
        high: Vec<f64>,
    },
}

impl Space {
    /// Discrete space over `0..n`; `n` must be positive
    pub fn discrete(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(EnvError::Validation(
                "discrete space needs at least one value".into(),
            ));
        }
        Ok(Self::Discrete { n })
    }

    /// Box space with per-dimension bounds
    pub fn bounded(low: Vec<f64>, high: Vec<f64>) -> Result<Self> {
        if low.len() != high.len() {
            return Err(EnvError::Validation(format!(
                "bound lengths differ: {} vs {}",
                low.len(),
                high.len()
            )));
        }
        if let Some(i) = low.iter().zip(&high).position(|(l, h)| l > h) {
            return Err(EnvError::Validation(format!(
                "lower bound exceeds upper bound at dimension {i}"
            )));
        }
        Ok(Self::Box { low, high })
    }

    /// Box space with the same bounds in every dimension
    pub fn uniform_box(low: f64, high: f64, dim: usize) -> Result<Self> {
        Self::bounded(vec![low; dim], vec![high; dim])
    }

    /// Draw a uniform value using the caller's stream.
    ///
    /// Box dimensions follow the usual gym rules: bounded intervals draw
    /// uniformly, unbounded dimensions draw from a standard normal, and
    /// half-bounded dimensions draw a shifted exponential.
    pub fn sample(&self, rng: &mut RngStream) -> SpaceValue {
        match self {
            Self::Discrete { n } => SpaceValue::Index(rng.gen_range(0..*n)),
            Self::Box { low, high } => SpaceValue::Vector(
                low.iter()
                    .zip(high)
                    .map(|(&l, &h)| sample_dimension(l, h, rng))
                    .collect(),
            ),
        }
    }

    /// Whether `value` lies inside the space
    #[must_use]
    pub fn contains(&self, value: &SpaceValue) -> bool {
        match (self, value) {
            (Self::Discrete { n }, SpaceValue::Index(i)) => i < n,
            (Self::Box { low, high }, SpaceValue::Vector(v)) => {
                v.len() == low.len()
                    && v.iter()
                        .zip(low)
                        .zip(high)
                        .all(|((x, l), h)| x >= l && x <= h)
            }
            _ => false,
        }
    }

    /// Whether a raw numeric vector lies inside the space
    #[must_use]
    pub fn contains_vec(&self, values: &[f64]) -> bool {
        match self {
            Self::Discrete { n } => {
                values.len() == 1
                    && values[0] >= 0.0
                    && values[0].fract() == 0.0
                    && (values[0] as usize) < *n
            }
            Self::Box { .. } => self.contains(&SpaceValue::Vector(values.to_vec())),
        }
    }

    /// Number of scalar entries in a flattened value
    #[must_use]
    pub fn flat_dim(&self) -> usize {
        match self {
            Self::Discrete { .. } => 1,
            Self::Box { low, .. } => low.len(),
        }
    }
}

fn sample_dimension(low: f64, high: f64, rng: &mut RngStream) -> f64 {
    match (low.is_finite(), high.is_finite()) {
        (true, true) => {
            if low == high {
                low
            } else {
                rng.gen_range(low..high)
            }
        }
        (true, false) => low + rng.sample::<f64, _>(Exp1),
        (false, true) => high - rng.sample::<f64, _>(Exp1),
        (false, false) => rng.sample(StandardNormal),
    }
}

/// Composite space for multi-task observations
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSpace {
    /// Space of the raw environment observation
    pub env_obs: Space,
    /// Space of the task observation
    pub task_obs: Space,
}

impl ObservationSpace {
    /// Compose the two component spaces
    #[must_use]
    pub fn new(env_obs: Space, task_obs: Space) -> Self {
        Self { env_obs, task_obs }
    }

    /// Whether a composed observation lies inside both components
    #[must_use]
    pub fn contains(&self, obs: &Observation) -> bool {
        self.env_obs.contains_vec(&obs.env_obs) && self.task_obs.contains(&obs.task_obs)
    }

    /// Draw one observation using the caller's stream
    pub fn sample(&self, rng: &mut RngStream) -> Observation {
        Observation {
            env_obs: self.env_obs.sample(rng).to_vec(),
            task_obs: self.task_obs.sample(rng),
        }
    }
}
