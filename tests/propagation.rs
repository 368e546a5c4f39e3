//! End-to-end behaviour of sessions built from puzzle files.

use sudoku_cnf::sat::cnf::{CnfEvent, EngineState, PropagationStatus, SudokuCnf};
use sudoku_cnf::sat::configs::{CnfConfig, RevokeStrategy};
use sudoku_cnf::sat::literal::{AtomKey, Literal};
use sudoku_cnf::sat::propagation::PropagationQueue;
use sudoku_cnf::sudoku::board::{Board, Group};
use sudoku_cnf::sudoku::parse::infer_block_size;
use sudoku_cnf::sudoku::session::{EventLog, Session};

const FOUR: &str = include_str!("../data/four.sudoku");
const LAST_CELL: &str = include_str!("../data/last_cell.sudoku");
const NINE: &str = include_str!("../data/nine.sudoku");

#[test]
fn test_last_free_cell_is_forced() {
    let mut log = EventLog::default();
    let session: Session = Session::parse(2, LAST_CELL, CnfConfig::default(), &mut log).unwrap();

    assert!(log.cnf.contains(&CnfEvent::Forced(Literal::positive(3, 3, 0))));
    assert_eq!(session.board().cell(3, 3).fixed_value(), Some(0));
    assert!(session.board().cell(3, 3).is_predefined());
    assert_eq!(session.state(), EngineState::Sat);
}

#[test]
fn test_predefined_values_leave_their_groups() {
    let session: Session = Session::parse(3, NINE, CnfConfig::default(), &mut ()).unwrap();
    let board = session.board();

    assert_ne!(session.state(), EngineState::Unsat);
    assert_eq!(board.check_consistency(), Ok(()));

    for (row, col, cell) in board.cells().filter(|(_, _, c)| c.is_predefined()) {
        let value = cell.fixed_value().unwrap();
        assert_eq!(session.cnf().value(AtomKey::new(row, col, value)), Some(true));

        for group in Group::ALL {
            let index = match group {
                Group::Row => row,
                Group::Column => col,
                Group::Block => board.block_id(row, col),
            };
            for (r, c) in board.group_cells(group, index) {
                if (r, c) != (row, col) {
                    assert!(!board.cell(r, c).has_candidate(value), "({r}, {c}) still lists {value}");
                }
            }
        }
    }
}

#[test]
fn test_fixing_a_value_strips_peers() {
    let mut session: Session = Session::new(Board::new(3).unwrap(), CnfConfig::default(), &mut ());
    assert!(session.board().cell(0, 0).has_candidate(1));

    let status = session
        .user_propagation(Literal::positive(0, 0, 1), &mut ())
        .unwrap();

    assert!(matches!(status, PropagationStatus::Pending | PropagationStatus::Sat));
    for (row, col, cell) in session.board().cells() {
        let peer = row == 0 || col == 0 || session.board().block_id(row, col) == 0;
        if peer && (row, col) != (0, 0) {
            assert!(!cell.has_candidate(1), "({row}, {col}) still lists 1");
        }
    }
    assert!(session.board().cell(4, 4).has_candidate(1));
}

#[test]
fn test_revoking_unassigned_literal_changes_nothing() {
    let board = Board::parse(2, FOUR).unwrap();
    let mut cnf: SudokuCnf = SudokuCnf::build(&board, CnfConfig::default(), &mut ());
    let clauses = cnf.clauses().to_vec();
    let counters = (cnf.sat_count(), cnf.unsat_count());
    let queued = cnf.queued_units();

    let mut events = Vec::new();
    assert!(!cnf.revoke_unit(Literal::positive(0, 1, 1), &mut events));

    assert!(events.is_empty());
    assert_eq!(cnf.clauses(), clauses.as_slice());
    assert_eq!((cnf.sat_count(), cnf.unsat_count()), counters);
    assert_eq!(cnf.queued_units(), queued);
}

#[test]
fn test_decisions_solve_the_small_puzzle() {
    let size = infer_block_size(FOUR).unwrap();
    let mut session: Session<PropagationQueue> = Session::parse(
        size,
        FOUR,
        CnfConfig::default().with_revoke(RevokeStrategy::FullScan),
        &mut (),
    )
    .unwrap();

    session.fix_option(0, 1, 1, &mut ()).unwrap();
    assert_eq!(session.propagate_all(&mut ()), Ok(true));

    // the remaining free cells follow from the first decision
    assert!(session.board().is_complete());
    assert_eq!(session.state(), EngineState::Sat);
    assert_eq!(session.verify(), Ok(vec![]));
    assert_eq!(
        session.board().to_string(),
        "1 2 | 3 4\n3 4 | 1 2\n+----+----\n2 1 | 4 3\n4 3 | 2 1\n"
    );

    session.delete_fixed(0, 1, &mut ()).unwrap();
    assert_eq!(session.board().cell(0, 1).fixed_value(), None);
    assert_eq!(session.state(), EngineState::Pending);
}

mod properties {
    use super::*;
    use proptest::prelude::*;

    fn literal(full_size: usize) -> impl Strategy<Value = Literal> {
        (0..full_size, 0..full_size, 0..full_size, any::<bool>())
            .prop_map(|(row, col, value, polarity)| Literal::new(row, col, value, polarity))
    }

    #[derive(Debug, Clone)]
    enum Op {
        Decide(Literal),
        Revoke(Literal),
        PropagateAll,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => literal(4).prop_map(Op::Decide),
            2 => literal(4).prop_map(Op::Revoke),
            1 => Just(Op::PropagateAll),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn propagate_then_revoke_restores_clauses(
            prefix in prop::collection::vec(literal(4), 0..12),
            probe in literal(4),
        ) {
            let mut cnf: SudokuCnf = SudokuCnf::encode(&Board::new(2).unwrap(), CnfConfig::default());
            for lit in prefix {
                cnf.propagate_unit(lit, &mut ());
            }
            prop_assume!(cnf.value(probe.atom()).is_none());

            let clauses = cnf.clauses().to_vec();
            let counters = (cnf.sat_count(), cnf.unsat_count());

            cnf.propagate_unit(probe, &mut ());
            prop_assert!(cnf.revoke_unit(probe, &mut ()));

            prop_assert_eq!(cnf.clauses(), clauses.as_slice());
            prop_assert_eq!((cnf.sat_count(), cnf.unsat_count()), counters);
            prop_assert_eq!(cnf.value(probe.atom()), None);
        }

        #[test]
        fn sessions_keep_board_and_engine_consistent(ops in prop::collection::vec(op(), 0..24)) {
            let mut session: Session = Session::parse(2, FOUR, CnfConfig::default(), &mut ()).unwrap();

            for op in ops {
                match op {
                    Op::Decide(lit) => {
                        let _ = session.user_propagation(lit, &mut ());
                    }
                    Op::Revoke(lit) => {
                        let _ = session.revoke(lit, &mut ());
                    }
                    Op::PropagateAll => {
                        let _ = session.propagate_all(&mut ());
                    }
                }

                prop_assert_eq!(session.verify(), Ok(vec![]));
            }
        }
    }
}
