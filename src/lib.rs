//! This crate models Sudoku puzzles as CNF and performs incremental unit propagation over them.
//!
//! Decisions on the board become clause simplifications, and units derived from the clauses
//! become fixed or eliminated values on the board.

/// The `sat` module implements literals, clauses, watch lists and the propagation engine.
pub mod sat;

/// The `sudoku` module implements the candidate board, the puzzle format and the session
/// coordinating board and engine.
pub mod sudoku;
