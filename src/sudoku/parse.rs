//! Textual puzzle format.
//!
//! A puzzle is a block size `n` and a grid of `n² × n²` tokens:
//!
//! - a number `k` fixes the cell to value `k - 1` (a predefined cell),
//! - a token starting with `_` leaves the cell free,
//! - a lone `|` is decoration and is skipped,
//! - lines starting with `+` are separator lines and are skipped, as are blank lines.
//!
//! ```text
//! 1 _ | _ 4
//! _ 4 | 1 _
//! +---+----
//! _ 1 | 4 _
//! 4 _ | _ 1
//! ```

use crate::sudoku::board::{Board, Group};

/// Largest supported block size. Coordinates and values must fit in a packed atom key.
pub const MAX_BLOCK_SIZE: usize = 15;

/// Parsed grid: `Some(value)` for predefined cells (0-based value), `None` for free cells.
pub type Grid = Vec<Vec<Option<usize>>>;

/// Reasons a puzzle description is rejected. Rows, columns and values are reported 1-based.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum PuzzleError {
    #[display("block size {size} is not supported (expected 1..={max})")]
    UnsupportedSize { size: usize, max: usize },

    #[display("invalid token {token:?} at row {row}, column {col}")]
    InvalidToken { row: usize, col: usize, token: String },

    #[display("value {value} at row {row}, column {col} is outside 1..={max}")]
    ValueOutOfRange {
        row: usize,
        col: usize,
        value: usize,
        max: usize,
    },

    #[display("row {row} has {found} cells, expected {expected}")]
    RowLength {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[display("puzzle has {found} rows, expected {expected}")]
    RowCount { found: usize, expected: usize },

    #[display("value {value} at row {row}, column {col} is already used in its {group}")]
    DuplicateValue {
        row: usize,
        col: usize,
        value: usize,
        group: Group,
    },
}

/// Checks that `size` is a usable block size.
///
/// # Errors
///
/// [`PuzzleError::UnsupportedSize`] outside `1..=MAX_BLOCK_SIZE`.
pub fn check_block_size(size: usize) -> Result<(), PuzzleError> {
    if size == 0 || size > MAX_BLOCK_SIZE {
        return Err(PuzzleError::UnsupportedSize {
            size,
            max: MAX_BLOCK_SIZE,
        });
    }
    Ok(())
}

fn grid_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('+'))
}

/// Parses the grid of a puzzle with block size `size`.
///
/// # Errors
///
/// Any [`PuzzleError`] except `DuplicateValue`, which is detected when the board is built.
pub fn parse_grid(size: usize, text: &str) -> Result<Grid, PuzzleError> {
    check_block_size(size)?;
    let full_size = size * size;

    let grid = grid_lines(text)
        .enumerate()
        .map(|(row, line)| parse_row(row, line, full_size))
        .collect::<Result<Grid, _>>()?;

    if grid.len() != full_size {
        return Err(PuzzleError::RowCount {
            found: grid.len(),
            expected: full_size,
        });
    }

    Ok(grid)
}

fn parse_row(row: usize, line: &str, full_size: usize) -> Result<Vec<Option<usize>>, PuzzleError> {
    let mut cells = Vec::with_capacity(full_size);

    for token in line.split_whitespace().filter(|&t| t != "|") {
        let col = cells.len();

        if token.starts_with('_') {
            cells.push(None);
            continue;
        }

        let value = token.parse::<usize>().map_err(|_| PuzzleError::InvalidToken {
            row: row + 1,
            col: col + 1,
            token: token.to_string(),
        })?;

        if value == 0 || value > full_size {
            return Err(PuzzleError::ValueOutOfRange {
                row: row + 1,
                col: col + 1,
                value,
                max: full_size,
            });
        }

        cells.push(Some(value - 1));
    }

    if cells.len() != full_size {
        return Err(PuzzleError::RowLength {
            row: row + 1,
            found: cells.len(),
            expected: full_size,
        });
    }

    Ok(cells)
}

/// Guesses the block size from the number of grid rows.
///
/// # Errors
///
/// [`PuzzleError::RowCount`] if the row count is not the square of a supported block size.
pub fn infer_block_size(text: &str) -> Result<usize, PuzzleError> {
    let rows = grid_lines(text).count();

    (1..=MAX_BLOCK_SIZE)
        .find(|&n| n * n == rows)
        .ok_or(PuzzleError::RowCount {
            found: rows,
            expected: rows.isqrt().max(1).pow(2),
        })
}

impl Board {
    /// Parses a puzzle and builds its board.
    ///
    /// # Errors
    ///
    /// Any [`PuzzleError`], including two predefined cells sharing a value within a group.
    pub fn parse(size: usize, text: &str) -> Result<Self, PuzzleError> {
        let grid = parse_grid(size, text)?;
        Self::from_grid(size, &grid)
    }
}
