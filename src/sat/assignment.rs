#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
use crate::sat::literal::{AtomKey, Literal};
use rustc_hash::FxHashMap;

/// Three-valued state of an atom or of a literal slot inside a clause.
#[derive(Debug, Clone, PartialEq, Eq, Copy, Default, Hash, PartialOrd, Ord)]
pub enum VarState {
    #[default]
    Unassigned,
    Assigned(bool),
}

impl VarState {
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        matches!(self, Self::Assigned(_))
    }

    #[must_use]
    pub const fn is_unassigned(self) -> bool {
        !self.is_assigned()
    }

    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::Assigned(true))
    }

    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::Assigned(false))
    }
}

impl From<Option<bool>> for VarState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unassigned, Self::Assigned)
    }
}

/// Global truth values of the atoms forced so far. Absent means unassigned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment(FxHashMap<AtomKey, bool>);

impl Assignment {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, atom: AtomKey) -> Option<bool> {
        self.0.get(&atom).copied()
    }

    #[must_use]
    pub fn state(&self, atom: AtomKey) -> VarState {
        self.get(atom).into()
    }

    #[must_use]
    pub fn is_assigned(&self, atom: AtomKey) -> bool {
        self.0.contains_key(&atom)
    }

    /// Truth value of `lit` under the current assignment.
    #[must_use]
    pub fn literal_value(&self, lit: Literal) -> Option<bool> {
        self.get(lit.atom()).map(|b| b == lit.polarity())
    }

    pub fn assign(&mut self, lit: Literal) {
        self.0.insert(lit.atom(), lit.polarity());
    }

    /// Clears the atom, returning the polarity it was forced to.
    pub fn unassign(&mut self, atom: AtomKey) -> Option<bool> {
        self.0.remove(&atom)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The assigned atoms as literals of their forced polarity, in no particular order.
    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.0
            .iter()
            .map(|(&atom, &polarity)| Literal::from_atom(atom, polarity))
    }
}
