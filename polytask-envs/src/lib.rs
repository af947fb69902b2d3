//! Multi-task reinforcement learning environments
//!
//! Concrete consumers of the `polytask-core` contract: bandits, classic
//! control (cart-pole, acrobot), tabular MDPs and a two-goal maze, plus an
//! explicit registry mapping string ids to boxed environments.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod acrobot;
pub mod bandit;
pub mod cartpole;
pub mod maze;
pub mod registry;
pub mod tabular;

pub use acrobot::{Acrobot, MultiTaskAcrobot};
pub use bandit::{BanditEnv, BanditTaskAdapter, FiniteMultiTaskBandit, MultiTaskBandit};
pub use cartpole::{CartPole, MultiTaskCartPole};
pub use maze::TwoGoalMaze;
pub use registry::{default_registry, EnvArgs, EnvRegistry, EnvSpec, TestArgs};
pub use tabular::{TabularMdp, TabularTask, UniformTabularMdp};
