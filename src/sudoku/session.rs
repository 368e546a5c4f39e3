//! A puzzle session: one board, the engine built from it, and the rules that keep them in step.
//!
//! The engine only knows about atoms. Whenever it applies a positive literal the session fixes
//! the value on the board; during construction such cells are also locked so they behave like
//! the puzzle's own givens. Every user-facing rejection is a [`SessionError`], never a panic.

use crate::sat::clause::Clause;
use crate::sat::cnf::{CnfEvent, CnfObserver, EngineState, PropagationStatus, SudokuCnf};
use crate::sat::configs::CnfConfig;
use crate::sat::literal::{AtomKey, Literal};
use crate::sat::propagation::{PropagationStack, PropagationStructure};
use crate::sat::watch::ClauseRef;
use crate::sudoku::board::{Board, BoardObserver, CellEvent, ConsistencyError};
use crate::sudoku::parse::PuzzleError;

/// Receives both board and engine notifications.
pub trait SessionObserver: BoardObserver + CnfObserver {}

impl<T: BoardObserver + CnfObserver + ?Sized> SessionObserver for T {}

/// Records everything a session reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    pub cells: Vec<CellEvent>,
    pub cnf: Vec<CnfEvent>,
}

impl BoardObserver for EventLog {
    fn cell_changed(&mut self, row: usize, col: usize, was_unfixed: bool) {
        self.cells.cell_changed(row, col, was_unfixed);
    }
}

impl CnfObserver for EventLog {
    fn clause_changed(&mut self, idx: ClauseRef, clause: &Clause) {
        self.cnf.clause_changed(idx, clause);
    }

    fn forced_unit(&mut self, literal: Literal) {
        self.cnf.forced_unit(literal);
    }

    fn propagated_unit(&mut self, literal: Literal) {
        self.cnf.propagated_unit(literal);
    }
}

/// Rejected session operations. Rows, columns and values are shown 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum SessionError {
    #[display("at least one clause is not satisfiable")]
    Unsat,

    #[display("unit {literal} is already set")]
    AlreadySet { literal: Literal },

    #[display("unit {literal} contradicts the current assignment")]
    Contradiction { literal: Literal },

    #[display("cell ({}, {}) is predefined and cannot be changed", row + 1, col + 1)]
    Locked { row: usize, col: usize },

    #[display("unit {literal} is not assigned")]
    NotAssigned { literal: Literal },

    #[display("cell ({}, {}) has no fixed value", row + 1, col + 1)]
    Empty { row: usize, col: usize },

    #[display("{} is not a candidate of cell ({}, {})", value + 1, row + 1, col + 1)]
    NotACandidate { row: usize, col: usize, value: usize },
}

/// Mirrors applied literals onto the board and forwards everything to the listener.
struct Coordinator<'a, L: ?Sized> {
    board: &'a mut Board,
    listener: &'a mut L,
    lock: bool,
}

impl<L: SessionObserver + ?Sized> Coordinator<'_, L> {
    fn mirror(&mut self, literal: Literal) {
        if !literal.polarity() {
            return;
        }

        let (row, col, value) = (literal.row(), literal.col(), literal.value());
        match self.board.cell(row, col).fixed_value() {
            Some(fixed) if fixed == value => {}
            None if self.board.option_available(row, col, value) => {
                self.board.set_fixed_value(row, col, value, &mut *self.listener);
            }
            fixed => {
                log::warn!("Cannot mirror {literal} onto the board (cell holds {fixed:?})");
                return;
            }
        }

        if self.lock {
            self.board.lock(row, col);
        }
    }
}

impl<L: SessionObserver + ?Sized> CnfObserver for Coordinator<'_, L> {
    fn clause_changed(&mut self, idx: ClauseRef, clause: &Clause) {
        self.listener.clause_changed(idx, clause);
    }

    fn forced_unit(&mut self, literal: Literal) {
        self.mirror(literal);
        self.listener.forced_unit(literal);
    }

    fn propagated_unit(&mut self, literal: Literal) {
        self.mirror(literal);
        self.listener.propagated_unit(literal);
    }
}

#[derive(Debug, Clone)]
pub struct Session<P: PropagationStructure = PropagationStack> {
    board: Board,
    cnf: SudokuCnf<P>,
}

impl<P: PropagationStructure> Session<P> {
    /// Builds the engine from the board and propagates the forced units, fixing and locking
    /// every cell they determine.
    pub fn new<L: SessionObserver + ?Sized>(board: Board, config: CnfConfig, listener: &mut L) -> Self {
        let mut board = board;
        let mut cnf = SudokuCnf::encode(&board, config);

        cnf.propagate_forced(&mut Coordinator {
            board: &mut board,
            listener,
            lock: true,
        });

        log::debug!(
            "Session ready: {} of {} cells fixed, engine {}",
            board.fixed_count(),
            board.full_size() * board.full_size(),
            cnf.state()
        );

        Self { board, cnf }
    }

    /// # Errors
    ///
    /// Any [`PuzzleError`] from parsing the puzzle.
    pub fn parse<L: SessionObserver + ?Sized>(
        size: usize,
        text: &str,
        config: CnfConfig,
        listener: &mut L,
    ) -> Result<Self, PuzzleError> {
        let board = Board::parse(size, text)?;
        Ok(Self::new(board, config, listener))
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn cnf(&self) -> &SudokuCnf<P> {
        &self.cnf
    }

    #[must_use]
    pub fn state(&self) -> EngineState {
        self.cnf.state()
    }

    const fn check_unsat(&self) -> Result<(), SessionError> {
        if self.cnf.is_unsat() {
            Err(SessionError::Unsat)
        } else {
            Ok(())
        }
    }

    fn coordinator<'a, L: SessionObserver + ?Sized>(
        board: &'a mut Board,
        listener: &'a mut L,
    ) -> Coordinator<'a, L> {
        Coordinator {
            board,
            listener,
            lock: false,
        }
    }

    /// Picks `value` for the cell: propagates the positive literal and fixes it on the board.
    ///
    /// # Errors
    ///
    /// `Unsat` while the engine is UNSAT, `AlreadySet` or `Contradiction` if the cell is
    /// already fixed or the engine rejects the literal, `NotACandidate` if the value has been
    /// eliminated from the cell.
    pub fn fix_option<L: SessionObserver + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        value: usize,
        listener: &mut L,
    ) -> Result<PropagationStatus, SessionError> {
        self.check_unsat()?;
        let literal = Literal::positive(row, col, value);

        match self.board.cell(row, col).fixed_value() {
            Some(fixed) if fixed == value => return Err(SessionError::AlreadySet { literal }),
            Some(_) => return Err(SessionError::Contradiction { literal }),
            None => {}
        }

        if !self.board.cell(row, col).has_candidate(value) || !self.board.option_available(row, col, value) {
            return Err(SessionError::NotACandidate { row, col, value });
        }

        let status = self
            .cnf
            .propagate_unit(literal, &mut Self::coordinator(&mut self.board, listener));

        match status {
            PropagationStatus::AlreadySet => Err(SessionError::AlreadySet { literal }),
            PropagationStatus::Contradiction => Err(SessionError::Contradiction { literal }),
            _ => {
                self.board.set_fixed_value(row, col, value, listener);
                Ok(status)
            }
        }
    }

    /// Propagates a single literal picked by the user. Positive literals go through
    /// [`Self::fix_option`].
    ///
    /// # Errors
    ///
    /// As [`Self::fix_option`], and `Locked` for negative literals on predefined cells.
    pub fn user_propagation<L: SessionObserver + ?Sized>(
        &mut self,
        literal: Literal,
        listener: &mut L,
    ) -> Result<PropagationStatus, SessionError> {
        if literal.polarity() {
            return self.fix_option(literal.row(), literal.col(), literal.value(), listener);
        }

        self.check_unsat()?;

        let (row, col) = (literal.row(), literal.col());
        if self.board.cell(row, col).is_predefined() {
            return Err(SessionError::Locked { row, col });
        }

        let status = self
            .cnf
            .propagate_unit(literal, &mut Self::coordinator(&mut self.board, listener));

        match status {
            PropagationStatus::AlreadySet => Err(SessionError::AlreadySet { literal }),
            PropagationStatus::Contradiction => Err(SessionError::Contradiction { literal }),
            _ => Ok(status),
        }
    }

    /// Drains the engine's unit queue, fixing every cell a positive unit determines.
    ///
    /// Returns `false` if propagation ran into UNSAT.
    ///
    /// # Errors
    ///
    /// `Unsat` if the engine is already UNSAT.
    pub fn propagate_all<L: SessionObserver + ?Sized>(&mut self, listener: &mut L) -> Result<bool, SessionError> {
        self.check_unsat()?;
        Ok(self
            .cnf
            .propagate_all(&mut Self::coordinator(&mut self.board, listener)))
    }

    /// Takes back the assignment of the literal's atom. If the atom was true and the cell holds
    /// that value, the cell is unfixed as well.
    ///
    /// # Errors
    ///
    /// `Locked` for predefined cells, `NotAssigned` if the atom has no assignment.
    pub fn revoke<L: SessionObserver + ?Sized>(&mut self, literal: Literal, listener: &mut L) -> Result<(), SessionError> {
        let (row, col, value) = (literal.row(), literal.col(), literal.value());

        if self.board.cell(row, col).is_predefined() {
            return Err(SessionError::Locked { row, col });
        }

        let Some(previous) = self.cnf.value(literal.atom()) else {
            return Err(SessionError::NotAssigned { literal });
        };

        self.cnf
            .revoke_unit(literal, &mut Self::coordinator(&mut self.board, listener));

        if previous && self.board.cell(row, col).fixed_value() == Some(value) {
            self.board.unset_fixed_value(row, col, listener);
        }

        Ok(())
    }

    /// Revokes the fixed value of a cell.
    ///
    /// # Errors
    ///
    /// `Empty` if the cell has no fixed value, otherwise as [`Self::revoke`].
    pub fn delete_fixed<L: SessionObserver + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        listener: &mut L,
    ) -> Result<(), SessionError> {
        let Some(value) = self.board.cell(row, col).fixed_value() else {
            return Err(SessionError::Empty { row, col });
        };
        self.revoke(Literal::positive(row, col, value), listener)
    }

    /// The value is eliminated from a free cell by the engine, though the board may still list
    /// it as a candidate.
    #[must_use]
    pub fn is_hidden(&self, row: usize, col: usize, value: usize) -> bool {
        self.board.cell(row, col).fixed_value().is_none()
            && self.cnf.value(AtomKey::new(row, col, value)) == Some(false)
    }

    /// Candidates of the cell the engine has not eliminated.
    #[must_use]
    pub fn visible_candidates(&self, row: usize, col: usize) -> Vec<usize> {
        self.board
            .cell(row, col)
            .candidate_values()
            .filter(|&value| !self.is_hidden(row, col, value))
            .collect()
    }

    /// Checks the board's exclusivity invariant, then that every fixed cell is true in the
    /// engine. Returns the cells whose fixed value the engine does not hold.
    ///
    /// # Errors
    ///
    /// The board's [`ConsistencyError`].
    pub fn verify(&self) -> Result<Vec<(usize, usize)>, ConsistencyError> {
        self.board.check_consistency()?;

        Ok(self
            .board
            .cells()
            .filter_map(|(row, col, cell)| {
                let value = cell.fixed_value()?;
                (self.cnf.value(AtomKey::new(row, col, value)) != Some(true)).then_some((row, col))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOUR: &str = "1 _ _ _\n_ _ 1 _\n_ 1 _ _\n_ _ _ 1\n";
    const SOLVED_BUT_ONE: &str = "1 2 3 4\n3 4 1 2\n2 1 4 3\n4 3 2 _\n";

    fn session(text: &str) -> Session {
        Session::parse(2, text, CnfConfig::default(), &mut ()).unwrap()
    }

    #[test]
    fn test_forced_cells_are_locked() {
        let mut log = EventLog::default();
        let s: Session = Session::parse(2, SOLVED_BUT_ONE, CnfConfig::default(), &mut log).unwrap();

        let cell = s.board().cell(3, 3);
        assert_eq!(cell.fixed_value(), Some(0));
        assert!(cell.is_predefined());
        assert!(s.board().is_complete());
        assert_eq!(s.state(), EngineState::Sat);
        assert!(log.cnf.contains(&CnfEvent::Forced(Literal::positive(3, 3, 0))));
        assert!(log.cells.contains(&CellEvent {
            row: 3,
            col: 3,
            was_unfixed: false
        }));
        assert_eq!(s.verify(), Ok(vec![]));
    }

    #[test]
    fn test_fix_option() {
        let mut s = session(FOUR);
        let status = s.fix_option(0, 1, 1, &mut ()).unwrap();

        assert_eq!(status, PropagationStatus::Pending);
        assert_eq!(s.board().cell(0, 1).fixed_value(), Some(1));
        assert!(!s.board().cell(0, 2).has_candidate(1));
        assert_eq!(
            s.fix_option(0, 1, 1, &mut ()),
            Err(SessionError::AlreadySet {
                literal: Literal::positive(0, 1, 1)
            })
        );
        assert_eq!(s.verify(), Ok(vec![]));
    }

    #[test]
    fn test_fix_option_rejects_eliminated_values() {
        let mut s = session(FOUR);
        assert_eq!(
            s.fix_option(0, 1, 0, &mut ()),
            Err(SessionError::NotACandidate {
                row: 0,
                col: 1,
                value: 0
            })
        );
    }

    #[test]
    fn test_fix_option_rejects_hidden_candidate() {
        let mut s = session(FOUR);
        s.user_propagation(Literal::negative(0, 1, 1), &mut ()).unwrap();

        assert!(s.is_hidden(0, 1, 1));
        assert!(s.board().cell(0, 1).has_candidate(1));
        assert_eq!(s.visible_candidates(0, 1), vec![2, 3]);
        assert_eq!(
            s.fix_option(0, 1, 1, &mut ()),
            Err(SessionError::Contradiction {
                literal: Literal::positive(0, 1, 1)
            })
        );
        assert_eq!(s.board().cell(0, 1).fixed_value(), None);
    }

    #[test]
    fn test_revoke_unfixes_cell() {
        let mut s = session(FOUR);
        s.fix_option(0, 1, 1, &mut ()).unwrap();

        let mut log = EventLog::default();
        s.delete_fixed(0, 1, &mut log).unwrap();

        assert_eq!(s.board().cell(0, 1).fixed_value(), None);
        assert!(s.board().cell(0, 2).has_candidate(1));
        assert!(log.cells.contains(&CellEvent {
            row: 0,
            col: 1,
            was_unfixed: true
        }));
        assert_eq!(s.cnf().value(AtomKey::new(0, 1, 1)), None);
    }

    #[test]
    fn test_revoke_rejections() {
        let mut s = session(FOUR);
        assert_eq!(
            s.revoke(Literal::positive(0, 0, 0), &mut ()),
            Err(SessionError::Locked { row: 0, col: 0 })
        );
        assert_eq!(
            s.revoke(Literal::positive(0, 1, 1), &mut ()),
            Err(SessionError::NotAssigned {
                literal: Literal::positive(0, 1, 1)
            })
        );
        assert_eq!(
            s.delete_fixed(0, 1, &mut ()),
            Err(SessionError::Empty { row: 0, col: 1 })
        );
    }

    #[test]
    fn test_unsat_blocks_forward_operations() {
        let mut s = session(FOUR);
        s.user_propagation(Literal::negative(0, 1, 1), &mut ()).unwrap();
        s.user_propagation(Literal::negative(0, 1, 2), &mut ()).unwrap();
        let status = s.user_propagation(Literal::negative(0, 1, 3), &mut ()).unwrap();

        // (1,2) has no value left
        assert_eq!(status, PropagationStatus::Unsat);
        assert_eq!(s.propagate_all(&mut ()), Err(SessionError::Unsat));
        assert_eq!(s.fix_option(1, 1, 1, &mut ()), Err(SessionError::Unsat));

        s.revoke(Literal::negative(0, 1, 3), &mut ()).unwrap();
        assert_eq!(s.state(), EngineState::Pending);
    }

    #[test]
    fn test_propagate_all_fixes_forced_cells() {
        let mut s = session("1 2 3 _\n_ _ _ _\n_ _ _ _\n_ _ _ _\n");
        assert_eq!(s.board().cell(0, 3).fixed_value(), Some(3));
        assert!(s.board().cell(0, 3).is_predefined());

        s.fix_option(1, 0, 2, &mut ()).unwrap();
        let mut log = EventLog::default();
        assert_eq!(s.propagate_all(&mut log), Ok(true));

        // block 0 now holds 1, 2 and 3, leaving 4 for (2,2)
        assert_eq!(s.board().cell(1, 1).fixed_value(), Some(3));
        assert!(!s.board().cell(1, 1).is_predefined());
        assert!(log.cnf.contains(&CnfEvent::Propagated(Literal::positive(1, 1, 3))));
        assert_eq!(s.verify(), Ok(vec![]));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SessionError::Locked { row: 0, col: 2 }.to_string(),
            "cell (1, 3) is predefined and cannot be changed"
        );
        assert_eq!(
            SessionError::AlreadySet {
                literal: Literal::negative(1, 1, 1)
            }
            .to_string(),
            "unit not (2,2) = 2 is already set"
        );
    }
}
