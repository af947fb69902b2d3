//! Shared value types crossing the environment contract

use serde::{Deserialize, Serialize};

/// Scalar reward signal
pub type Reward = f64;

/// Numeric environment observation vector
pub type EnvObs = Vec<f64>;

/// A value drawn from or validated against a [`Space`](crate::Space)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpaceValue {
    /// An index into a discrete space
    Index(usize),
    /// A point inside a box space
    Vector(Vec<f64>),
}

impl SpaceValue {
    /// The discrete index, if this value is one
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => Some(*i),
            Self::Vector(_) => None,
        }
    }

    /// The vector payload, if this value is one
    #[must_use]
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Self::Index(_) => None,
            Self::Vector(v) => Some(v),
        }
    }

    /// Flatten to a numeric vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Self::Index(i) => vec![*i as f64],
            Self::Vector(v) => v.clone(),
        }
    }
}

impl From<usize> for SpaceValue {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl From<Vec<f64>> for SpaceValue {
    fn from(values: Vec<f64>) -> Self {
        Self::Vector(values)
    }
}

/// Action submitted to `step`
pub type Action = SpaceValue;

/// Task-observation component of an [`Observation`](crate::Observation)
pub type TaskObs = SpaceValue;

/// Static, declarative environment properties
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Additional information attached to a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    /// Custom fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl StepInfo {
    /// An empty info map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether there are no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Insert a field
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.fields.insert(key.into(), value);
    }

    /// Look up a field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.fields.get(key)
    }
}
