#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Engine configuration.
//!
//! Two things about the engine are tunable: which clauses `revoke_unit` visits, and the order
//! in which queued units are drained. The former is a runtime setting carried by [`CnfConfig`];
//! the latter selects the unit queue type and is exposed as [`QueueOrder`] so the command line
//! can pick a monomorphised engine.

use clap::ValueEnum;
use std::fmt::{Display, Formatter};

/// Clauses visited when an atom is revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum RevokeStrategy {
    /// Only the clauses on the atom's watch list.
    #[default]
    Watched,
    /// Every registered clause, in registration order.
    FullScan,
}

impl Display for RevokeStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Watched => write!(f, "watched"),
            Self::FullScan => write!(f, "full-scan"),
        }
    }
}

/// Drain order of the unit queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum QueueOrder {
    /// Most recently discovered unit first.
    #[default]
    Lifo,
    /// Oldest unit first.
    Fifo,
}

impl Display for QueueOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lifo => write!(f, "lifo"),
            Self::Fifo => write!(f, "fifo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CnfConfig {
    pub revoke: RevokeStrategy,
}

impl CnfConfig {
    #[must_use]
    pub const fn with_revoke(mut self, revoke: RevokeStrategy) -> Self {
        self.revoke = revoke;
        self
    }
}
