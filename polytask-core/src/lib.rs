//! Core multi-task reinforcement learning contract
//!
//! This crate defines the contract multi-task environments and their
//! wrappers implement: two explicitly seeded random streams per environment,
//! an opaque task state switched through `set_task_state`, and observations
//! composed from an environment component and a task component. Concrete
//! environments live in companion crates and implement [`MultiTaskEnv`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod env;
pub mod erased;
pub mod error;
pub mod multitask;
pub mod observation;
pub mod seeding;
pub mod space;
pub mod types;
pub mod wrappers;

// Re-export core traits and types
pub use env::{Env, EnvStep};
pub use erased::DynMultiTaskEnv;
pub use error::{EnvError, Result};
pub use multitask::{MultiTaskEnv, TaskState};
pub use observation::{Observation, Step};
pub use seeding::{derive_stream, RngStream, StreamRole, StreamSlot};
pub use space::{ObservationSpace, Space};
pub use types::{Action, EnvObs, Metadata, Reward, SpaceValue, StepInfo, TaskObs};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Action, DynMultiTaskEnv, Env, EnvError, EnvObs, MultiTaskEnv, Observation,
        ObservationSpace, Result, RngStream, Space, SpaceValue, Step, StepInfo, TaskObs,
    };
    pub use crate::wrappers::{
        EnvToMultiTask, FixedTaskSet, FixedTaskSetWithId, MultiEnvWrapper, ResampleOnReset,
        TaskAdapter,
    };
}
