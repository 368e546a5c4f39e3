#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Clauses with incremental bookkeeping.
//!
//! A [`Clause`] owns its literal instances together with a clause-local
//! [`VarState`] for each of them, and keeps three derived values up to date as
//! atoms are propagated and restored:
//!
//! - the number of satisfied literals,
//! - the number of still undefined literals,
//! - the index of the unit literal, i.e. the sole undefined literal of a clause
//!   that is not yet satisfied.
//!
//! All updates are O(clause length) and fully reversible through [`Clause::restore`].

use crate::sat::assignment::VarState;
use crate::sat::literal::Literal;
use core::ops::Index;
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

/// Storage used for the literals of a clause. Most Sudoku clauses are binary.
pub type ClauseLiterals = SmallVec<[Literal; 4]>;

/// Structural identity of a clause: the packed literal ids in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClauseKey(SmallVec<[u32; 4]>);

/// Rejection raised while building a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ClauseError {
    /// The clause already holds the same atom with the other polarity.
    #[display("clause already contains the opposite of {literal}")]
    OppositePolarity { literal: Literal },
}

/// Outcome of propagating one literal into a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseUpdate {
    /// The clause does not mention the atom.
    NotPresent,
    /// The atom was recorded but the clause neither became satisfied nor unsatisfied.
    Unchanged,
    /// The last undefined literal became false and nothing satisfies the clause.
    Unsatisfied,
    /// The clause gained its first satisfied literal.
    Satisfied,
}

/// Coarse status of a clause under its current literal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseStatus {
    Satisfied,
    Unsatisfied,
    Unit(Literal),
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Clause {
    literals: ClauseLiterals,
    states: SmallVec<[VarState; 4]>,
    satisfied: usize,
    undef: usize,
    unit: Option<usize>,
}

impl Clause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a clause from literals, in order.
    ///
    /// # Errors
    ///
    /// [`ClauseError::OppositePolarity`] if two literals share an atom with different polarities.
    pub fn from_literals<I: IntoIterator<Item = Literal>>(literals: I) -> Result<Self, ClauseError> {
        let mut clause = Self::new();
        for literal in literals {
            clause.add(literal)?;
        }
        Ok(clause)
    }

    /// Adds `literal`, keeping atoms distinct.
    ///
    /// Adding a literal that is already present is a no-op.
    ///
    /// # Errors
    ///
    /// [`ClauseError::OppositePolarity`] if the atom is present with the other polarity.
    pub fn add(&mut self, literal: Literal) -> Result<(), ClauseError> {
        if let Some(idx) = self.position(literal) {
            if self.literals[idx].polarity() == literal.polarity() {
                return Ok(());
            }
            return Err(ClauseError::OppositePolarity { literal });
        }

        self.literals.push(literal);
        self.states.push(VarState::Unassigned);
        self.undef += 1;
        self.refresh_unit();

        Ok(())
    }

    /// Index of the literal over the same atom as `literal`, if any.
    #[must_use]
    pub fn position(&self, literal: Literal) -> Option<usize> {
        self.literals.iter().position(|l| l.same_atom(literal))
    }

    #[must_use]
    pub fn contains_atom(&self, literal: Literal) -> bool {
        self.position(literal).is_some()
    }

    /// Records that `literal` is now true and updates the clause.
    ///
    /// # Panics
    ///
    /// If the atom is already assigned within this clause; it has to be restored first.
    pub fn propagate(&mut self, literal: Literal) -> ClauseUpdate {
        let Some(idx) = self.position(literal) else {
            return ClauseUpdate::NotPresent;
        };

        assert!(
            self.states[idx].is_unassigned(),
            "literal {} is already assigned to {:?} in clause {}",
            self.literals[idx],
            self.states[idx],
            self.describe()
        );

        self.undef -= 1;

        if self.literals[idx].polarity() == literal.polarity() {
            self.states[idx] = VarState::Assigned(true);
            self.satisfied += 1;
            self.unit = None;

            if self.satisfied == 1 {
                ClauseUpdate::Satisfied
            } else {
                ClauseUpdate::Unchanged
            }
        } else {
            self.states[idx] = VarState::Assigned(false);
            self.refresh_unit();

            if self.is_unsatisfied() {
                ClauseUpdate::Unsatisfied
            } else {
                ClauseUpdate::Unchanged
            }
        }
    }

    /// Resets the atom of `literal` to undefined.
    ///
    /// Returns `true` if the clause left the satisfied or unsatisfied status as a result.
    /// A clause that does not mention the atom is left alone and reports `false`.
    ///
    /// # Panics
    ///
    /// If the atom is present but not assigned.
    pub fn restore(&mut self, literal: Literal) -> bool {
        let Some(idx) = self.position(literal) else {
            return false;
        };

        let state = self.states[idx];
        assert!(
            state.is_assigned(),
            "literal {} is not assigned in clause {}",
            self.literals[idx],
            self.describe()
        );

        let was_satisfied = self.is_satisfied();
        let was_unsatisfied = self.is_unsatisfied();

        if state.is_true() {
            self.satisfied -= 1;
        }
        self.states[idx] = VarState::Unassigned;
        self.undef += 1;
        self.refresh_unit();

        was_satisfied != self.is_satisfied() || was_unsatisfied != self.is_unsatisfied()
    }

    fn refresh_unit(&mut self) {
        self.unit = if self.satisfied == 0 && self.undef == 1 {
            self.states.iter().position(|s| s.is_unassigned())
        } else {
            None
        };
    }

    #[must_use]
    pub const fn satisfied_count(&self) -> usize {
        self.satisfied
    }

    #[must_use]
    pub const fn undef_count(&self) -> usize {
        self.undef
    }

    /// Index of the unit literal, present only while the clause is a unit.
    #[must_use]
    pub const fn unit_index(&self) -> Option<usize> {
        self.unit
    }

    #[must_use]
    pub fn unit_literal(&self) -> Option<Literal> {
        self.unit.map(|idx| self.literals[idx])
    }

    #[must_use]
    pub const fn is_satisfied(&self) -> bool {
        self.satisfied > 0
    }

    #[must_use]
    pub const fn is_unsatisfied(&self) -> bool {
        self.satisfied == 0 && self.undef == 0
    }

    #[must_use]
    pub const fn is_unit(&self) -> bool {
        self.unit.is_some()
    }

    #[must_use]
    pub fn status(&self) -> ClauseStatus {
        if self.is_satisfied() {
            ClauseStatus::Satisfied
        } else if self.is_unsatisfied() {
            ClauseStatus::Unsatisfied
        } else if let Some(lit) = self.unit_literal() {
            ClauseStatus::Unit(lit)
        } else {
            ClauseStatus::Pending
        }
    }

    #[must_use]
    pub fn state(&self, idx: usize) -> VarState {
        self.states[idx]
    }

    #[must_use]
    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.literals.iter()
    }

    /// Literals whose atom is still undefined in this clause.
    pub fn undefined(&self) -> impl Iterator<Item = Literal> + '_ {
        self.literals
            .iter()
            .zip(&self.states)
            .filter(|(_, s)| s.is_unassigned())
            .map(|(&l, _)| l)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.literals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    #[must_use]
    pub fn key(&self) -> ClauseKey {
        ClauseKey(self.literals.iter().map(|l| l.packed()).collect())
    }

    /// All literals, ignoring their current state.
    #[must_use]
    pub fn describe(&self) -> String {
        let inner = self.literals.iter().map(ToString::to_string).collect::<Vec<_>>();
        format!("[{}]", inner.join(","))
    }
}

impl Index<usize> for Clause {
    type Output = Literal;

    fn index(&self, index: usize) -> &Self::Output {
        &self.literals[index]
    }
}

impl Display for Clause {
    /// `true` once satisfied, otherwise the literals that are still undefined.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_satisfied() {
            return write!(f, "true");
        }

        write!(f, "[")?;
        for (i, lit) in self.undefined().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{lit}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual() -> Clause {
        Clause::from_literals([Literal::negative(0, 0, 1), Literal::negative(0, 1, 1)]).unwrap()
    }

    fn cell(values: &[usize]) -> Clause {
        Clause::from_literals(values.iter().map(|&v| Literal::positive(2, 2, v))).unwrap()
    }

    #[test]
    fn test_add_keeps_atoms_distinct() {
        let mut clause = Clause::new();
        assert_eq!(clause.add(Literal::positive(0, 0, 0)), Ok(()));
        assert_eq!(clause.unit_index(), Some(0));
        assert_eq!(clause.add(Literal::positive(0, 0, 0)), Ok(()));
        assert_eq!(clause.len(), 1);
        assert_eq!(
            clause.add(Literal::negative(0, 0, 0)),
            Err(ClauseError::OppositePolarity {
                literal: Literal::negative(0, 0, 0)
            })
        );
        assert_eq!(clause.add(Literal::positive(0, 0, 1)), Ok(()));
        assert_eq!(clause.undef_count(), 2);
        assert_eq!(clause.unit_index(), None);
    }

    #[test]
    fn test_propagate_not_present() {
        let mut clause = dual();
        assert_eq!(clause.propagate(Literal::positive(5, 5, 5)), ClauseUpdate::NotPresent);
        assert_eq!(clause.undef_count(), 2);
    }

    #[test]
    fn test_propagate_false_literal_creates_unit() {
        let mut clause = dual();
        assert_eq!(clause.propagate(Literal::positive(0, 0, 1)), ClauseUpdate::Unchanged);
        assert_eq!(clause.undef_count(), 1);
        assert_eq!(clause.unit_literal(), Some(Literal::negative(0, 1, 1)));
        assert_eq!(clause.status(), ClauseStatus::Unit(Literal::negative(0, 1, 1)));
    }

    #[test]
    fn test_propagate_to_unsatisfied() {
        let mut clause = dual();
        clause.propagate(Literal::positive(0, 0, 1));
        assert_eq!(clause.propagate(Literal::positive(0, 1, 1)), ClauseUpdate::Unsatisfied);
        assert!(clause.is_unsatisfied());
        assert_eq!(clause.unit_index(), None);
    }

    #[test]
    fn test_propagate_satisfies_once() {
        let mut clause = dual();
        assert_eq!(clause.propagate(Literal::negative(0, 0, 1)), ClauseUpdate::Satisfied);
        assert_eq!(clause.propagate(Literal::negative(0, 1, 1)), ClauseUpdate::Unchanged);
        assert_eq!(clause.satisfied_count(), 2);
        assert_eq!(clause.to_string(), "true");
    }

    #[test]
    fn test_satisfied_clause_has_no_unit() {
        let mut clause = cell(&[0, 1, 2]);
        clause.propagate(Literal::positive(2, 2, 0));
        clause.propagate(Literal::negative(2, 2, 1));
        assert_eq!(clause.undef_count(), 1);
        assert_eq!(clause.unit_index(), None);
        assert_eq!(clause.status(), ClauseStatus::Satisfied);
    }

    #[test]
    #[should_panic(expected = "already assigned")]
    fn test_double_propagate_panics() {
        let mut clause = dual();
        clause.propagate(Literal::positive(0, 0, 1));
        clause.propagate(Literal::positive(0, 0, 1));
    }

    #[test]
    fn test_restore_reports_status_changes() {
        let mut clause = dual();
        clause.propagate(Literal::positive(0, 0, 1));
        clause.propagate(Literal::positive(0, 1, 1));

        assert!(clause.restore(Literal::positive(0, 1, 1)));
        assert_eq!(clause.unit_literal(), Some(Literal::negative(0, 1, 1)));
        assert!(!clause.restore(Literal::positive(0, 0, 1)));
        assert_eq!(clause.undef_count(), 2);
        assert_eq!(clause.unit_index(), None);
        assert!(!clause.restore(Literal::positive(7, 7, 7)));
    }

    #[test]
    fn test_restore_unsatisfies() {
        let mut clause = cell(&[0, 1]);
        clause.propagate(Literal::positive(2, 2, 1));
        assert!(clause.restore(Literal::positive(2, 2, 1)));
        assert!(!clause.is_satisfied());
        assert_eq!(clause.undef_count(), 2);
    }

    #[test]
    #[should_panic(expected = "not assigned")]
    fn test_restore_unassigned_panics() {
        let mut clause = dual();
        clause.restore(Literal::negative(0, 0, 1));
    }

    #[test]
    fn test_display_lists_undefined_literals() {
        let mut clause = cell(&[0, 1, 2]);
        clause.propagate(Literal::negative(2, 2, 1));
        assert_eq!(clause.to_string(), "[(3,3) = 1,(3,3) = 3]");
        assert_eq!(clause.describe(), "[(3,3) = 1,(3,3) = 2,(3,3) = 3]");
    }

    #[test]
    fn test_key_is_structural() {
        assert_eq!(dual().key(), dual().key());
        assert_ne!(dual().key(), cell(&[1]).key());
    }
}
