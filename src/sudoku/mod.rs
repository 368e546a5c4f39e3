#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! The Sudoku side of the model: the candidate board, its textual format and the session that
//! keeps the board and the propagation engine in step.

/// Cells, candidates and the row/column/block availability tables.
pub mod board;
/// Parsing of the textual puzzle format.
pub mod parse;
/// The coordinator owning a board and its engine.
pub mod session;
