#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The propagation engine.
//!
//! [`SudokuCnf`] encodes a [`Board`] as CNF and performs incremental unit propagation over it.
//!
//! The encoding has two kinds of clauses:
//!
//! - one *at-least-one* clause per free cell, over the cell's candidates;
//! - one *dual* clause `¬(a = v) ∨ ¬(b = v)` for every pair of cells `a`, `b` sharing a row,
//!   a column or a block, and every value `v`.
//!
//! Predefined cells get no clause; their positive literal is queued as a top-level unit.
//! Structurally identical clauses (a pair sharing both a row and a block, say) are stored once.
//!
//! Every clause is watched on all of its atoms. [`SudokuCnf::propagate_unit`] and
//! [`SudokuCnf::revoke_unit`] only visit the watchers of the atom involved, and clauses that
//! become units on the way push their remaining literal onto the unit queue, which
//! [`SudokuCnf::propagate_all`] drains to a fixed point.
//!
//! The engine never holds on to the board. Everything it has to say goes through a
//! [`CnfObserver`] passed to each operation.

use crate::sat::assignment::Assignment;
use crate::sat::clause::{Clause, ClauseKey, ClauseUpdate};
use crate::sat::configs::{CnfConfig, RevokeStrategy};
use crate::sat::literal::{AtomKey, Literal};
use crate::sat::propagation::{PropagationStack, PropagationStructure};
use crate::sat::watch::{ClauseRef, WatchList};
use crate::sudoku::board::{Board, Group};
use itertools::Itertools;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};

/// Outcome of [`SudokuCnf::propagate_unit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropagationStatus {
    /// The atom already holds this polarity. Nothing changed.
    AlreadySet,
    /// The atom holds the opposite polarity. Nothing changed.
    Contradiction,
    Pending,
    Sat,
    Unsat,
}

impl PropagationStatus {
    /// The literal was applied and the engine is not UNSAT.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Pending | Self::Sat)
    }
}

impl From<EngineState> for PropagationStatus {
    fn from(state: EngineState) -> Self {
        match state {
            EngineState::Pending => Self::Pending,
            EngineState::Sat => Self::Sat,
            EngineState::Unsat => Self::Unsat,
        }
    }
}

/// Global state of the clause set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum EngineState {
    /// No clause is unsatisfied and at least one is still open.
    #[display("PENDING")]
    Pending,
    /// Every clause is satisfied.
    #[display("SAT")]
    Sat,
    /// At least one clause has no satisfied and no undefined literal left.
    #[display("UNSAT")]
    Unsat,
}

/// Counters kept by the engine over its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropagationStats {
    /// Literals applied by `propagate_unit`.
    pub propagations: usize,
    pub revocations: usize,
    /// `propagate_unit` calls rejected because the atom held the opposite polarity.
    pub contradictions: usize,
    /// Queued units removed because nothing forces them anymore.
    pub dropped_units: usize,
}

/// Receives the engine's notifications. Every method defaults to doing nothing.
pub trait CnfObserver {
    /// A clause was touched by a propagation or a revocation.
    fn clause_changed(&mut self, _idx: ClauseRef, _clause: &Clause) {}

    /// A literal was applied while propagating the units found at construction.
    fn forced_unit(&mut self, _literal: Literal) {}

    /// A literal was applied by [`SudokuCnf::propagate_all`].
    fn propagated_unit(&mut self, _literal: Literal) {}
}

impl CnfObserver for () {}

/// A recorded [`CnfObserver`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CnfEvent {
    ClauseChanged(ClauseRef),
    Forced(Literal),
    Propagated(Literal),
}

impl CnfObserver for Vec<CnfEvent> {
    fn clause_changed(&mut self, idx: ClauseRef, _clause: &Clause) {
        self.push(CnfEvent::ClauseChanged(idx));
    }

    fn forced_unit(&mut self, literal: Literal) {
        self.push(CnfEvent::Forced(literal));
    }

    fn propagated_unit(&mut self, literal: Literal) {
        self.push(CnfEvent::Propagated(literal));
    }
}

#[derive(Debug, Clone)]
pub struct SudokuCnf<P: PropagationStructure = PropagationStack> {
    clauses: Vec<Clause>,
    keys: FxHashMap<ClauseKey, ClauseRef>,
    watches: WatchList,
    assignment: Assignment,
    units: P,
    sat_count: usize,
    unsat_count: usize,
    config: CnfConfig,
    stats: PropagationStats,
}

impl<P: PropagationStructure> SudokuCnf<P> {
    /// Encodes the board without propagating anything. The units found while encoding are
    /// left on the queue for [`Self::propagate_forced`].
    #[must_use]
    pub fn encode(board: &Board, config: CnfConfig) -> Self {
        let mut cnf = Self {
            clauses: Vec::new(),
            keys: FxHashMap::default(),
            watches: WatchList::new(),
            assignment: Assignment::new(),
            units: P::default(),
            sat_count: 0,
            unsat_count: 0,
            config,
            stats: PropagationStats::default(),
        };

        for (row, col, cell) in board.cells() {
            if let Some(value) = cell.fixed_value() {
                cnf.units.push(Literal::positive(row, col, value));
                continue;
            }

            let mut clause = Clause::new();
            for value in cell.candidate_values() {
                // distinct atoms of one polarity, cannot be rejected
                let _ = clause.add(Literal::positive(row, col, value));
            }
            cnf.register(clause);
        }

        let full_size = board.full_size();
        for group in Group::ALL {
            for index in 0..full_size {
                let pairs = board
                    .group_cells(group, index)
                    .into_iter()
                    .tuple_combinations()
                    .collect::<Vec<_>>();

                for value in 0..full_size {
                    for &((r1, c1), (r2, c2)) in &pairs {
                        cnf.add_dual_clause(
                            Literal::negative(r1, c1, value),
                            Literal::negative(r2, c2, value),
                        );
                    }
                }
            }
        }

        log::debug!(
            "Encoded {}x{} board: {} clauses, {} watched atoms, {} queued units",
            full_size,
            full_size,
            cnf.clauses.len(),
            cnf.watches.len(),
            cnf.units.len()
        );

        cnf
    }

    /// Encodes the board and propagates every unit found on the way to a fixed point,
    /// reporting each applied literal through [`CnfObserver::forced_unit`].
    pub fn build<O: CnfObserver + ?Sized>(
        board: &Board,
        config: CnfConfig,
        observer: &mut O,
    ) -> Self {
        let mut cnf = Self::encode(board, config);
        cnf.propagate_forced(observer);
        cnf
    }

    fn add_dual_clause(&mut self, a: Literal, b: Literal) {
        let mut clause = Clause::new();
        let _ = clause.add(a);
        let _ = clause.add(b);
        self.register(clause);
    }

    fn register(&mut self, clause: Clause) {
        let key = clause.key();
        if self.keys.contains_key(&key) {
            return;
        }

        let idx = self.clauses.len();
        self.watches.add_clause(&clause, idx);

        if clause.is_unsatisfied() {
            self.unsat_count += 1;
        }
        if let Some(unit) = clause.unit_literal() {
            self.units.push(unit);
        }

        self.keys.insert(key, idx);
        self.clauses.push(clause);
    }

    /// Applies one literal.
    ///
    /// Every clause watching the atom is propagated, the satisfied and unsatisfied counters are
    /// updated, and clauses that became units queue their remaining literal. A clause that was
    /// a unit and became unsatisfied takes its queued literal with it.
    ///
    /// # Returns
    ///
    /// `AlreadySet` or `Contradiction` without touching anything if the atom is assigned,
    /// otherwise the global state after the propagation.
    pub fn propagate_unit<O: CnfObserver + ?Sized>(
        &mut self,
        literal: Literal,
        observer: &mut O,
    ) -> PropagationStatus {
        if let Some(polarity) = self.assignment.get(literal.atom()) {
            if polarity == literal.polarity() {
                return PropagationStatus::AlreadySet;
            }
            self.stats.contradictions += 1;
            log::trace!("Rejected {literal}: atom is assigned {polarity}");
            return PropagationStatus::Contradiction;
        }

        for &idx in self.watches.watchers(literal.atom()) {
            let clause = &mut self.clauses[idx];
            let previous_unit = clause.unit_literal();

            match clause.propagate(literal) {
                ClauseUpdate::NotPresent => continue,
                ClauseUpdate::Satisfied => self.sat_count += 1,
                ClauseUpdate::Unsatisfied => {
                    self.unsat_count += 1;
                    if let Some(stale) = previous_unit {
                        self.stats.dropped_units += self.units.remove(stale);
                    }
                }
                ClauseUpdate::Unchanged => {
                    if let Some(unit) = clause.unit_literal() {
                        self.units.push(unit);
                    }
                }
            }

            observer.clause_changed(idx, clause);
        }

        self.assignment.assign(literal);
        self.stats.propagations += 1;

        let state = self.state();
        log::trace!("Propagated {literal}: {state}");
        state.into()
    }

    /// Takes back the assignment of the literal's atom, whatever its polarity.
    ///
    /// Every clause mentioning the atom is restored. A queued unit whose clause stopped being a
    /// unit is dropped, unless some other clause still forces it; a clause that became a unit
    /// again queues its literal.
    ///
    /// # Returns
    ///
    /// `false` without touching anything if the atom is not assigned.
    pub fn revoke_unit<O: CnfObserver + ?Sized>(&mut self, literal: Literal, observer: &mut O) -> bool {
        let atom = literal.atom();
        if !self.assignment.is_assigned(atom) {
            return false;
        }

        let targets = match self.config.revoke {
            RevokeStrategy::Watched => self.watches.watchers(atom).to_vec(),
            RevokeStrategy::FullScan => (0..self.clauses.len())
                .filter(|&idx| self.clauses[idx].contains_atom(literal))
                .collect(),
        };

        let mut stale = SmallVec::<[Literal; 8]>::new();
        let mut fresh = SmallVec::<[Literal; 8]>::new();

        for idx in targets {
            let clause = &mut self.clauses[idx];
            let was_satisfied = clause.is_satisfied();
            let was_unsatisfied = clause.is_unsatisfied();
            let previous_unit = clause.unit_literal();

            if clause.restore(literal) {
                if was_satisfied && !clause.is_satisfied() {
                    self.sat_count -= 1;
                }
                if was_unsatisfied && !clause.is_unsatisfied() {
                    self.unsat_count -= 1;
                }
            }

            let unit = clause.unit_literal();
            if unit != previous_unit {
                stale.extend(previous_unit);
                fresh.extend(unit);
            }

            observer.clause_changed(idx, clause);
        }

        self.assignment.unassign(atom);

        for unit in stale {
            let still_forced = self
                .watches
                .watchers(unit.atom())
                .iter()
                .any(|&idx| self.clauses[idx].unit_literal() == Some(unit));

            if !still_forced {
                let dropped = self.units.remove(unit);
                if dropped > 0 {
                    log::trace!("Dropped stale unit {unit}");
                }
                self.stats.dropped_units += dropped;
            }
        }

        for unit in fresh {
            self.units.push(unit);
        }

        self.stats.revocations += 1;
        log::trace!("Revoked {}", Literal::from_atom(atom, true));
        true
    }

    /// Drains the unit queue, reporting each applied literal through
    /// [`CnfObserver::propagated_unit`].
    ///
    /// # Returns
    ///
    /// `false` as soon as a propagation leaves the engine UNSAT, or immediately if it already
    /// is. The literal that caused it stays applied but is not reported.
    ///
    /// # Panics
    ///
    /// If a queued literal contradicts the assignment of its atom.
    pub fn propagate_all<O: CnfObserver + ?Sized>(&mut self, observer: &mut O) -> bool {
        self.drain(observer, false)
    }

    /// [`Self::propagate_all`] for the units found at construction; applied literals go to
    /// [`CnfObserver::forced_unit`] instead.
    ///
    /// # Panics
    ///
    /// If a queued literal contradicts the assignment of its atom.
    pub fn propagate_forced<O: CnfObserver + ?Sized>(&mut self, observer: &mut O) -> bool {
        let done = self.drain(observer, true);
        log::debug!(
            "Forced propagation finished: {} ({} of {} clauses satisfied, {} atoms assigned)",
            self.state(),
            self.sat_count,
            self.clauses.len(),
            self.assignment.len()
        );
        done
    }

    fn drain<O: CnfObserver + ?Sized>(&mut self, observer: &mut O, forced: bool) -> bool {
        if self.unsat_count > 0 {
            return false;
        }

        while let Some(unit) = self.units.pop() {
            match self.assignment.get(unit.atom()) {
                Some(polarity) if polarity == unit.polarity() => continue,
                Some(polarity) => panic!(
                    "queued unit {unit} contradicts the assignment {polarity} of its atom"
                ),
                None => {}
            }

            let status = self.propagate_unit(unit, observer);
            if !status.is_applied() {
                log::debug!("Stopped propagation at {unit}: {status:?}");
                return false;
            }

            if forced {
                observer.forced_unit(unit);
            } else {
                observer.propagated_unit(unit);
            }
        }

        true
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        if self.unsat_count > 0 {
            EngineState::Unsat
        } else if self.sat_count == self.clauses.len() {
            EngineState::Sat
        } else {
            EngineState::Pending
        }
    }

    #[must_use]
    pub const fn is_unsat(&self) -> bool {
        self.unsat_count > 0
    }

    #[must_use]
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[must_use]
    pub fn clause(&self, idx: ClauseRef) -> &Clause {
        &self.clauses[idx]
    }

    /// Index of a clause with exactly these literals, in this order.
    #[must_use]
    pub fn find_clause(&self, literals: &[Literal]) -> Option<ClauseRef> {
        let clause = Clause::from_literals(literals.iter().copied()).ok()?;
        self.keys.get(&clause.key()).copied()
    }

    #[must_use]
    pub const fn watches(&self) -> &WatchList {
        &self.watches
    }

    #[must_use]
    pub const fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    /// Recorded polarity of the atom, if any.
    #[must_use]
    pub fn value(&self, atom: AtomKey) -> Option<bool> {
        self.assignment.get(atom)
    }

    /// Queued units in the order they would be propagated.
    #[must_use]
    pub fn queued_units(&self) -> Vec<Literal> {
        self.units.to_vec()
    }

    #[must_use]
    pub const fn sat_count(&self) -> usize {
        self.sat_count
    }

    #[must_use]
    pub const fn unsat_count(&self) -> usize {
        self.unsat_count
    }

    #[must_use]
    pub const fn config(&self) -> CnfConfig {
        self.config
    }

    #[must_use]
    pub const fn stats(&self) -> PropagationStats {
        self.stats
    }
}

impl<P: PropagationStructure> Display for SudokuCnf<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, clause) in self.clauses.iter().enumerate() {
            writeln!(f, "{idx}: {clause}")?;
        }
        Ok(())
    }
}
