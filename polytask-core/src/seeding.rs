//! Deterministic random streams and seed bookkeeping
//!
//! Every random draw in the crate goes through an explicitly seeded
//! [`RngStream`]. Environments hold one stream for dynamics and one for task
//! sampling, wrapped in [`StreamSlot`]s so that drawing before seeding is a
//! contract violation instead of a silent fresh seed.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::error::{EnvError, Result};

/// Reproducible PRNG stream used across the crate
pub type RngStream = ChaCha8Rng;

/// Create a stream from an optional seed, returning the seed actually used.
///
/// Equal seeds yield bit-identical streams. When no seed is supplied one is
/// drawn from OS entropy and returned, so the caller can still log and
/// replay it.
#[must_use]
pub fn derive_stream(seed: Option<u64>) -> (RngStream, u64) {
    let seed = seed.unwrap_or_else(rand::random);
    (RngStream::seed_from_u64(seed), seed)
}

/// Which contract stream a slot backs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamRole {
    /// Environment dynamics stream, seeded by `seed`
    Env,
    /// Task sampling stream, seeded by `seed_task`
    Task,
}

impl StreamRole {
    fn missing(self) -> EnvError {
        match self {
            Self::Env => EnvError::EnvSeedNotSet,
            Self::Task => EnvError::TaskSeedNotSet,
        }
    }
}

/// Holder for an explicitly seeded stream plus the seed in use.
///
/// A slot starts empty. `reseed` replaces the stream wholesale (each call
/// restarts the sequence, draws are not cumulative across calls); touching an
/// empty slot fails with the precondition error for the slot's role.
#[derive(Debug, Clone)]
pub struct StreamSlot {
    role: StreamRole,
    stream: Option<RngStream>,
    seed: Option<u64>,
}

impl StreamSlot {
    /// Create an unseeded slot for the given role
    #[must_use]
    pub fn new(role: StreamRole) -> Self {
        Self {
            role,
            stream: None,
            seed: None,
        }
    }

    /// Replace the stream with one derived from `seed`; returns the seed used
    pub fn reseed(&mut self, seed: Option<u64>) -> u64 {
        let (stream, seed) = derive_stream(seed);
        self.stream = Some(stream);
        self.seed = Some(seed);
        seed
    }

    /// Whether the slot has been seeded
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.stream.is_some()
    }

    /// The seed in use, if any
    #[must_use]
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Fail with the role's precondition error unless the slot is seeded
    pub fn assert_seeded(&self) -> Result<()> {
        if self.is_seeded() {
            Ok(())
        } else {
            Err(self.role.missing())
        }
    }

    /// Mutable access to the stream; fails when the slot is unseeded
    pub fn stream(&mut self) -> Result<&mut RngStream> {
        let role = self.role;
        self.stream.as_mut().ok_or_else(|| role.missing())
    }
}
