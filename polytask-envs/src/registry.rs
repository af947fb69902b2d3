//! Explicit environment registry
//!
//! Maps string ids to boxed multi-task environments. The registry is a
//! plain value constructed at startup and passed by reference; nothing in
//! the environments depends on it. Each spec carries default construction
//! arguments plus valid and invalid argument lists for automated tests.

use std::collections::BTreeMap;

use serde_json::Value;

use polytask_core::{DynMultiTaskEnv, EnvError, Result};

use crate::acrobot::MultiTaskAcrobot;
use crate::bandit::{FiniteMultiTaskBandit, MultiTaskBandit};
use crate::cartpole::MultiTaskCartPole;
use crate::maze::TwoGoalMaze;
use crate::tabular::UniformTabularMdp;

/// Named construction arguments for a registered environment
pub type EnvArgs = serde_json::Map<String, Value>;

/// Constructor stored in an [`EnvSpec`]
pub type EnvConstructor = Box<dyn Fn(&EnvArgs) -> Result<Box<dyn DynMultiTaskEnv>> + Send + Sync>;

/// Argument lists driving automated conformance tests
#[derive(Debug, Clone, Default)]
pub struct TestArgs {
    /// Argument sets that must construct successfully
    pub valid: Vec<EnvArgs>,
    /// Argument sets that must fail construction
    pub invalid: Vec<EnvArgs>,
}

/// Registered environment: id, constructor, defaults and test metadata
pub struct EnvSpec {
    id: String,
    constructor: EnvConstructor,
    default_args: EnvArgs,
    test_args: TestArgs,
}

impl EnvSpec {
    /// Spec for `id` built by `constructor`
    pub fn new(
        id: impl Into<String>,
        constructor: EnvConstructor,
        default_args: EnvArgs,
        test_args: TestArgs,
    ) -> Self {
        Self {
            id: id.into(),
            constructor,
            default_args,
            test_args,
        }
    }

    /// The environment id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Default construction arguments
    #[must_use]
    pub fn default_args(&self) -> &EnvArgs {
        &self.default_args
    }

    /// Valid/invalid argument lists for tests
    #[must_use]
    pub fn test_args(&self) -> &TestArgs {
        &self.test_args
    }

    /// Construct the environment with defaults overridden by `overrides`
    pub fn make(&self, overrides: &EnvArgs) -> Result<Box<dyn DynMultiTaskEnv>> {
        let mut args = self.default_args.clone();
        for (key, value) in overrides {
            args.insert(key.clone(), value.clone());
        }
        (self.constructor)(&args)
    }
}

impl std::fmt::Debug for EnvSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSpec").field("id", &self.id).finish()
    }
}

/// Explicit id-to-spec mapping.
///
/// Never global: construct one (usually via [`default_registry`]) and pass
/// it to whatever needs lookup.
#[derive(Debug, Default)]
pub struct EnvRegistry {
    specs: BTreeMap<String, EnvSpec>,
}

impl EnvRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spec; duplicate ids are rejected
    pub fn register(&mut self, spec: EnvSpec) -> Result<()> {
        if self.specs.contains_key(spec.id()) {
            return Err(EnvError::Validation(format!(
                "cannot re-register id {}",
                spec.id()
            )));
        }
        self.specs.insert(spec.id().to_owned(), spec);
        Ok(())
    }

    /// Look up a spec by id
    pub fn spec(&self, id: &str) -> Result<&EnvSpec> {
        self.specs
            .get(id)
            .ok_or_else(|| EnvError::Validation(format!("unknown environment id {id}")))
    }

    /// Construct the environment registered under `id` with default arguments
    pub fn make(&self, id: &str) -> Result<Box<dyn DynMultiTaskEnv>> {
        self.make_with(id, &EnvArgs::new())
    }

    /// Construct with defaults overridden by `overrides`
    pub fn make_with(&self, id: &str, overrides: &EnvArgs) -> Result<Box<dyn DynMultiTaskEnv>> {
        self.spec(id)?.make(overrides)
    }

    /// Registered ids, sorted
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }
}

fn usize_arg(args: &EnvArgs, key: &str) -> Result<usize> {
    let value = args
        .get(key)
        .ok_or_else(|| EnvError::Validation(format!("missing argument {key}")))?;
    value
        .as_u64()
        .map(|v| v as usize)
        .ok_or_else(|| EnvError::Validation(format!("argument {key} must be a non-negative integer, got {value}")))
}

fn args(entries: &[(&str, u64)]) -> EnvArgs {
    entries
        .iter()
        .map(|(key, value)| ((*key).to_owned(), Value::from(*value)))
        .collect()
}

/// Registry with every environment this crate ships
pub fn default_registry() -> EnvRegistry {
    let mut registry = EnvRegistry::new();

    let specs = vec![
        EnvSpec::new(
            "MT-Bandit-v0",
            Box::new(|args: &EnvArgs| {
                let n_arms = usize_arg(args, "n_arms")?;
                Ok(Box::new(MultiTaskBandit::new(n_arms)?) as Box<dyn DynMultiTaskEnv>)
            }),
            args(&[("n_arms", 5)]),
            TestArgs {
                valid: vec![args(&[("n_arms", 1)]), args(&[("n_arms", 10)])],
                invalid: vec![args(&[("n_arms", 0)])],
            },
        ),
        EnvSpec::new(
            "MT-FiniteBandit-v0",
            Box::new(|args: &EnvArgs| {
                let n_tasks = usize_arg(args, "n_tasks")?;
                let n_arms = usize_arg(args, "n_arms")?;
                Ok(Box::new(FiniteMultiTaskBandit::new(n_tasks, n_arms)?)
                    as Box<dyn DynMultiTaskEnv>)
            }),
            args(&[("n_tasks", 10), ("n_arms", 5)]),
            TestArgs {
                valid: vec![args(&[("n_tasks", 1), ("n_arms", 2)])],
                invalid: vec![
                    args(&[("n_tasks", 0), ("n_arms", 5)]),
                    args(&[("n_tasks", 10), ("n_arms", 0)]),
                ],
            },
        ),
        EnvSpec::new(
            "MT-CartPole-v0",
            Box::new(|_: &EnvArgs| {
                Ok(Box::new(MultiTaskCartPole::new()?) as Box<dyn DynMultiTaskEnv>)
            }),
            EnvArgs::new(),
            TestArgs::default(),
        ),
        EnvSpec::new(
            "MT-Acrobot-v0",
            Box::new(|_: &EnvArgs| {
                Ok(Box::new(MultiTaskAcrobot::new()?) as Box<dyn DynMultiTaskEnv>)
            }),
            EnvArgs::new(),
            TestArgs::default(),
        ),
        EnvSpec::new(
            "MT-TabularMDP-v0",
            Box::new(|args: &EnvArgs| {
                let n_states = usize_arg(args, "n_states")?;
                let n_actions = usize_arg(args, "n_actions")?;
                Ok(Box::new(UniformTabularMdp::new(n_states, n_actions)?)
                    as Box<dyn DynMultiTaskEnv>)
            }),
            args(&[("n_states", 4), ("n_actions", 5)]),
            TestArgs {
                valid: vec![args(&[("n_states", 3), ("n_actions", 2)])],
                invalid: vec![args(&[("n_states", 0), ("n_actions", 2)])],
            },
        ),
        EnvSpec::new(
            "MT-TwoGoalMaze-v0",
            Box::new(|args: &EnvArgs| {
                let size_x = usize_arg(args, "size_x")?;
                let size_y = usize_arg(args, "size_y")?;
                Ok(Box::new(TwoGoalMaze::new(size_x, size_y)?) as Box<dyn DynMultiTaskEnv>)
            }),
            args(&[("size_x", 3), ("size_y", 3)]),
            TestArgs {
                valid: vec![args(&[("size_x", 5), ("size_y", 5)])],
                invalid: vec![args(&[("size_x", 0), ("size_y", 3)])],
            },
        ),
    ];

    for spec in specs {
        registry
            .register(spec)
            .unwrap_or_else(|_| unreachable!("default ids are distinct"));
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_lists_all_ids() {
        let registry = default_registry();
        assert_eq!(
            registry.ids(),
            vec![
                "MT-Acrobot-v0",
                "MT-Bandit-v0",
                "MT-CartPole-v0",
                "MT-FiniteBandit-v0",
                "MT-TabularMDP-v0",
                "MT-TwoGoalMaze-v0",
            ]
        );
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = EnvRegistry::new();
        let make_spec = || {
            EnvSpec::new(
                "MT-Bandit-v0",
                Box::new(|_: &EnvArgs| {
                    Ok(Box::new(MultiTaskBandit::new(2)?) as Box<dyn DynMultiTaskEnv>)
                }) as EnvConstructor,
                EnvArgs::new(),
                TestArgs::default(),
            )
        };
        registry.register(make_spec()).unwrap();
        assert!(matches!(
            registry.register(make_spec()),
            Err(EnvError::Validation(_))
        ));
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let registry = default_registry();
        assert!(matches!(
            registry.make("MT-Missing-v0"),
            Err(EnvError::Validation(_))
        ));
    }

    #[test]
    fn overrides_replace_defaults() {
        let registry = default_registry();
        let mut env = registry
            .make_with("MT-Bandit-v0", &args(&[("n_arms", 3)]))
            .unwrap();
        assert!(env.action_space().contains(&polytask_core::Action::Index(2)));
        assert!(!env.action_space().contains(&polytask_core::Action::Index(3)));
        env.seed_task(Some(1));
        let task = env.sample_task_state().unwrap();
        let task: Vec<f64> = serde_json::from_value(task).unwrap();
        assert_eq!(task.len(), 3);
    }

    #[test]
    fn malformed_arguments_are_rejected() {
        let registry = default_registry();
        let mut overrides = EnvArgs::new();
        overrides.insert("n_arms".into(), Value::from(-3));
        assert!(matches!(
            registry.make_with("MT-Bandit-v0", &overrides),
            Err(EnvError::Validation(_))
        ));
    }
}
