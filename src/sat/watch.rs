#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
use crate::sat::clause::Clause;
use crate::sat::literal::{AtomKey, Literal};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::ops::Index;

/// Position of a clause in the engine's clause store.
pub type ClauseRef = usize;

/// Per-atom index of the clauses that mention the atom, in either polarity.
///
/// Every literal of a registered clause is watched, so propagating or restoring an atom
/// only has to visit the clauses listed here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WatchList(FxHashMap<AtomKey, SmallVec<[ClauseRef; 6]>>);

impl WatchList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clause(&mut self, clause: &Clause, idx: ClauseRef) {
        for lit in clause.iter() {
            self.0.entry(lit.atom()).or_default().push(idx);
        }
    }

    #[must_use]
    pub fn watchers(&self, atom: AtomKey) -> &[ClauseRef] {
        self.0.get(&atom).map(|w| w.as_slice()).unwrap_or_default()
    }

    /// Number of atoms with at least one watching clause.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Index<AtomKey> for WatchList {
    type Output = [ClauseRef];

    fn index(&self, index: AtomKey) -> &Self::Output {
        self.watchers(index)
    }
}

impl Index<Literal> for WatchList {
    type Output = [ClauseRef];

    fn index(&self, index: Literal) -> &Self::Output {
        self.watchers(index.atom())
    }
}
