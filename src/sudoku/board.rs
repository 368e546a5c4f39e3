//! The candidate board.
//!
//! [`Board`] is the domain-filtering side of the model. For every cell it records the fixed
//! value (if any) and the set of values that are still possible; for every row, column and
//! block it records which values are still available, i.e. not fixed anywhere in the group.
//!
//! Fixing or unfixing a value updates the three availability tables of the cell and then
//! walks the cells of those groups, toggling the candidate bit for that value. Removing a
//! candidate is unconditional. Re-adding one requires the value to be available in the row,
//! the column and the block of the cell, so a value forbidden by any one dimension stays out.
//!
//! Preconditions of [`Board::set_fixed_value`] and [`Board::unset_fixed_value`] are invariants
//! of the caller; violating them panics.

use crate::sudoku::parse::{PuzzleError, check_block_size};
use bit_vec::BitVec;
use std::fmt::{Display, Formatter};

/// Receives a notification whenever a cell's fixed value or candidates change.
pub trait BoardObserver {
    fn cell_changed(&mut self, _row: usize, _col: usize, _was_unfixed: bool) {}
}

impl BoardObserver for () {}

/// A recorded [`BoardObserver::cell_changed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellEvent {
    pub row: usize,
    pub col: usize,
    pub was_unfixed: bool,
}

impl BoardObserver for Vec<CellEvent> {
    fn cell_changed(&mut self, row: usize, col: usize, was_unfixed: bool) {
        self.push(CellEvent {
            row,
            col,
            was_unfixed,
        });
    }
}

/// The three kinds of exclusivity groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum Group {
    #[display("row")]
    Row,
    #[display("column")]
    Column,
    #[display("block")]
    Block,
}

impl Group {
    pub const ALL: [Self; 3] = [Self::Row, Self::Column, Self::Block];
}

/// A violation found by [`Board::check_consistency`]. Coordinates and values are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConsistencyError {
    #[display("value {value} is fixed {count} times in {group} {index}")]
    FixedTwice {
        group: Group,
        index: usize,
        value: usize,
        count: usize,
    },

    #[display("availability of value {value} in {group} {index} disagrees with the fixed cells")]
    Availability {
        group: Group,
        index: usize,
        value: usize,
    },

    #[display("cell ({row}, {col}) still lists value {value} fixed in its {group}")]
    StaleCandidate {
        row: usize,
        col: usize,
        value: usize,
        group: Group,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    fixed_value: Option<usize>,
    is_predefined: bool,
    candidates: BitVec,
}

impl Cell {
    fn free(full_size: usize) -> Self {
        Self {
            fixed_value: None,
            is_predefined: false,
            candidates: BitVec::from_elem(full_size, false),
        }
    }

    #[must_use]
    pub const fn fixed_value(&self) -> Option<usize> {
        self.fixed_value
    }

    #[must_use]
    pub const fn is_fixed(&self) -> bool {
        self.fixed_value.is_some()
    }

    /// Fixed by the puzzle, or locked because the engine forced it while building.
    #[must_use]
    pub const fn is_predefined(&self) -> bool {
        self.is_predefined
    }

    #[must_use]
    pub fn has_candidate(&self, value: usize) -> bool {
        self.candidates.get(value).unwrap_or(false)
    }

    #[must_use]
    pub const fn candidates(&self) -> &BitVec {
        &self.candidates
    }

    pub fn candidate_values(&self) -> impl Iterator<Item = usize> + '_ {
        self.candidates
            .iter()
            .enumerate()
            .filter_map(|(value, set)| set.then_some(value))
    }

    #[must_use]
    pub fn candidate_count(&self) -> usize {
        self.candidates.iter().filter(|&set| set).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    full_size: usize,
    cells: Vec<Cell>,
    rows: Vec<BitVec>,
    cols: Vec<BitVec>,
    blocks: Vec<BitVec>,
}

impl Board {
    /// An empty board with block size `size`: nothing fixed, every value possible everywhere.
    ///
    /// # Errors
    ///
    /// [`PuzzleError::UnsupportedSize`] if the block size is out of range.
    pub fn new(size: usize) -> Result<Self, PuzzleError> {
        check_block_size(size)?;
        let full_size = size * size;
        let grid = vec![vec![None; full_size]; full_size];
        Self::from_grid(size, &grid)
    }

    /// Builds the board from a parsed grid.
    ///
    /// Predefined cells keep their own value as sole candidate; free cells get the
    /// intersection of their row, column and block availability.
    ///
    /// # Errors
    ///
    /// A [`PuzzleError`] if the grid does not have the right shape, or if two predefined
    /// cells of one group hold the same value.
    pub fn from_grid(size: usize, grid: &[Vec<Option<usize>>]) -> Result<Self, PuzzleError> {
        check_block_size(size)?;
        let full_size = size * size;

        if grid.len() != full_size {
            return Err(PuzzleError::RowCount {
                found: grid.len(),
                expected: full_size,
            });
        }

        let table = || vec![BitVec::from_elem(full_size, true); full_size];
        let mut board = Self {
            size,
            full_size,
            cells: vec![Cell::free(full_size); full_size * full_size],
            rows: table(),
            cols: table(),
            blocks: table(),
        };

        for (row, cells) in grid.iter().enumerate() {
            if cells.len() != full_size {
                return Err(PuzzleError::RowLength {
                    row: row + 1,
                    found: cells.len(),
                    expected: full_size,
                });
            }

            for (col, value) in cells.iter().enumerate() {
                let Some(value) = *value else { continue };

                if value >= full_size {
                    return Err(PuzzleError::ValueOutOfRange {
                        row: row + 1,
                        col: col + 1,
                        value: value + 1,
                        max: full_size,
                    });
                }

                if let Some(group) = board.unavailable_group(row, col, value) {
                    return Err(PuzzleError::DuplicateValue {
                        row: row + 1,
                        col: col + 1,
                        value: value + 1,
                        group,
                    });
                }

                board.set_availability(row, col, value, false);

                let idx = board.index(row, col);
                let cell = &mut board.cells[idx];
                cell.fixed_value = Some(value);
                cell.is_predefined = true;
                cell.candidates.set(value, true);
            }
        }

        for row in 0..full_size {
            for col in 0..full_size {
                let idx = board.index(row, col);
                if board.cells[idx].is_fixed() {
                    continue;
                }
                for value in 0..full_size {
                    let available = board.option_available(row, col, value);
                    board.cells[idx].candidates.set(value, available);
                }
            }
        }

        Ok(board)
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub const fn full_size(&self) -> usize {
        self.full_size
    }

    const fn index(&self, row: usize, col: usize) -> usize {
        row * self.full_size + col
    }

    #[must_use]
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        &self.cells[self.index(row, col)]
    }

    /// All cells with their coordinates, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (i / self.full_size, i % self.full_size, cell))
    }

    #[must_use]
    pub const fn block_id(&self, row: usize, col: usize) -> usize {
        (row / self.size) * self.size + col / self.size
    }

    /// Cells of one group, in row-major order.
    #[must_use]
    pub fn group_cells(&self, group: Group, index: usize) -> Vec<(usize, usize)> {
        let n = self.full_size;
        match group {
            Group::Row => (0..n).map(|col| (index, col)).collect(),
            Group::Column => (0..n).map(|row| (row, index)).collect(),
            Group::Block => {
                let row0 = (index / self.size) * self.size;
                let col0 = (index % self.size) * self.size;
                (row0..row0 + self.size)
                    .flat_map(|row| (col0..col0 + self.size).map(move |col| (row, col)))
                    .collect()
            }
        }
    }

    fn group_index(&self, group: Group, row: usize, col: usize) -> usize {
        match group {
            Group::Row => row,
            Group::Column => col,
            Group::Block => self.block_id(row, col),
        }
    }

    fn table(&self, group: Group) -> &[BitVec] {
        match group {
            Group::Row => &self.rows,
            Group::Column => &self.cols,
            Group::Block => &self.blocks,
        }
    }

    /// `value` is not fixed anywhere in the group.
    #[must_use]
    pub fn is_available(&self, group: Group, index: usize, value: usize) -> bool {
        self.table(group)[index].get(value).unwrap_or(false)
    }

    /// `value` is available in the row, the column and the block of the cell.
    #[must_use]
    pub fn option_available(&self, row: usize, col: usize, value: usize) -> bool {
        self.unavailable_group(row, col, value).is_none()
    }

    fn unavailable_group(&self, row: usize, col: usize, value: usize) -> Option<Group> {
        Group::ALL
            .into_iter()
            .find(|&group| !self.is_available(group, self.group_index(group, row, col), value))
    }

    fn set_availability(&mut self, row: usize, col: usize, value: usize, available: bool) {
        let block = self.block_id(row, col);
        self.rows[row].set(value, available);
        self.cols[col].set(value, available);
        self.blocks[block].set(value, available);
    }

    /// Every cell sharing a row, column or block with `(row, col)`, the cell itself excluded.
    /// Cells in two of the groups appear twice.
    fn peers(&self, row: usize, col: usize) -> Vec<(usize, usize)> {
        Group::ALL
            .into_iter()
            .flat_map(|group| self.group_cells(group, self.group_index(group, row, col)))
            .filter(|&cell| cell != (row, col))
            .collect()
    }

    /// Fixes `value` in the cell and strips it from the candidates of every peer.
    ///
    /// # Panics
    ///
    /// If the value is already fixed somewhere in the row, column or block, or if the cell
    /// already holds a fixed value.
    pub fn set_fixed_value<O: BoardObserver + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        value: usize,
        observer: &mut O,
    ) {
        if let Some(group) = self.unavailable_group(row, col, value) {
            panic!(
                "value {value} is already set in {group} {} (cell ({row}, {col}))",
                self.group_index(group, row, col)
            );
        }

        let idx = self.index(row, col);
        assert!(
            self.cells[idx].fixed_value.is_none(),
            "cell ({row}, {col}) is already assigned to {:?}",
            self.cells[idx].fixed_value
        );

        self.cells[idx].fixed_value = Some(value);
        self.set_availability(row, col, value, false);
        self.update_cell_options(row, col, value, false, observer);

        observer.cell_changed(row, col, false);
    }

    /// Removes the fixed value of the cell and gives it back, as a candidate, to every peer
    /// where it is allowed again. Returns the value that was fixed.
    ///
    /// # Panics
    ///
    /// If the cell has no fixed value or is predefined.
    pub fn unset_fixed_value<O: BoardObserver + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        observer: &mut O,
    ) -> usize {
        let idx = self.index(row, col);
        let cell = &self.cells[idx];

        let Some(value) = cell.fixed_value else {
            panic!("cell ({row}, {col}) is not assigned to a value");
        };
        assert!(!cell.is_predefined, "cell ({row}, {col}) is predefined");

        for group in Group::ALL {
            assert!(
                !self.is_available(group, self.group_index(group, row, col), value),
                "value {value} is not set in {group} {}",
                self.group_index(group, row, col)
            );
        }

        let cell = &mut self.cells[idx];
        cell.fixed_value = None;
        cell.candidates.set(value, true);

        self.set_availability(row, col, value, true);
        self.update_cell_options(row, col, value, true, observer);

        observer.cell_changed(row, col, true);
        value
    }

    /// Fixes `value`, or unfixes the cell when `value` is `None`.
    pub fn set_cell<O: BoardObserver + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        value: Option<usize>,
        observer: &mut O,
    ) {
        match value {
            Some(value) => self.set_fixed_value(row, col, value, observer),
            None => {
                self.unset_fixed_value(row, col, observer);
            }
        }
    }

    /// Marks a fixed cell as predefined so it can no longer be unfixed.
    ///
    /// # Panics
    ///
    /// If the cell is not fixed.
    pub fn lock(&mut self, row: usize, col: usize) {
        let idx = self.index(row, col);
        assert!(
            self.cells[idx].is_fixed(),
            "cannot lock unassigned cell ({row}, {col})"
        );
        self.cells[idx].is_predefined = true;
    }

    fn update_cell_options<O: BoardObserver + ?Sized>(
        &mut self,
        row: usize,
        col: usize,
        value: usize,
        state: bool,
        observer: &mut O,
    ) {
        for (r, c) in self.peers(row, col) {
            let idx = self.index(r, c);
            if self.cells[idx].candidates[value] == state {
                continue;
            }
            if state && (self.cells[idx].is_predefined || !self.option_available(r, c, value)) {
                continue;
            }

            self.cells[idx].candidates.set(value, state);
            observer.cell_changed(r, c, false);
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(Cell::is_fixed)
    }

    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_fixed()).count()
    }

    /// Verifies the exclusivity invariant: in every group each value is fixed at most once,
    /// the availability table is false exactly when it is fixed once, and no peer of a fixed
    /// cell still lists its value as a candidate.
    ///
    /// # Errors
    ///
    /// The first [`ConsistencyError`] found.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        for group in Group::ALL {
            for index in 0..self.full_size {
                let cells = self.group_cells(group, index);

                for value in 0..self.full_size {
                    let holders = cells
                        .iter()
                        .filter(|&&(r, c)| self.cell(r, c).fixed_value == Some(value))
                        .collect::<Vec<_>>();

                    if holders.len() > 1 {
                        return Err(ConsistencyError::FixedTwice {
                            group,
                            index,
                            value,
                            count: holders.len(),
                        });
                    }

                    if self.is_available(group, index, value) == (holders.len() == 1) {
                        return Err(ConsistencyError::Availability {
                            group,
                            index,
                            value,
                        });
                    }

                    if let Some(&&holder) = holders.first() {
                        if let Some(&(row, col)) = cells
                            .iter()
                            .find(|&&cell| cell != holder && self.cell(cell.0, cell.1).has_candidate(value))
                        {
                            return Err(ConsistencyError::StaleCandidate {
                                row,
                                col,
                                value,
                                group,
                            });
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl Display for Board {
    /// Writes the board in the puzzle input format, `_` for free cells.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self.full_size.to_string().len();

        for row in 0..self.full_size {
            if row > 0 && row % self.size == 0 {
                let dashes = "-".repeat((width + 1) * self.size);
                writeln!(f, "+{}", vec![dashes; self.size].join("+"))?;
            }

            for col in 0..self.full_size {
                if col > 0 {
                    write!(f, " ")?;
                    if col % self.size == 0 {
                        write!(f, "| ")?;
                    }
                }
                match self.cell(row, col).fixed_value {
                    Some(value) => write!(f, "{:>width$}", value + 1)?,
                    None => write!(f, "{:>width$}", "_")?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
