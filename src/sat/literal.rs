#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Literals over the Sudoku atoms.
//!
//! An atom is the proposition "cell (`row`, `col`) holds `value`". A literal is an
//! atom together with a polarity. Both are packed into a single `u32` in the same
//! way as a packed SAT literal: the low 24 bits hold the atom key
//! (`row << 16 | col << 8 | value`) and bit 31 holds the polarity.

use core::ops::{Neg, Not};
use std::fmt::{Display, Formatter};

/// Largest coordinate or value representable in an atom key.
pub const MAX_COORDINATE: usize = 0xFF;

const ATOM_MASK: u32 = 0x00FF_FFFF;
const POLARITY_BIT: u32 = 1 << 31;

/// Packed identity of a `(row, col, value)` triple, independent of polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AtomKey(u32);

impl AtomKey {
    /// Packs a cell coordinate and a value.
    ///
    /// # Panics
    ///
    /// If any component exceeds [`MAX_COORDINATE`]; the key would no longer be injective.
    #[must_use]
    pub fn new(row: usize, col: usize, value: usize) -> Self {
        assert!(
            row <= MAX_COORDINATE && col <= MAX_COORDINATE && value <= MAX_COORDINATE,
            "atom ({row}, {col}, {value}) does not fit in a packed key"
        );

        #[allow(clippy::cast_possible_truncation)]
        Self(((row as u32) << 16) | ((col as u32) << 8) | value as u32)
    }

    #[must_use]
    pub const fn row(self) -> usize {
        ((self.0 >> 16) & 0xFF) as usize
    }

    #[must_use]
    pub const fn col(self) -> usize {
        ((self.0 >> 8) & 0xFF) as usize
    }

    #[must_use]
    pub const fn value(self) -> usize {
        (self.0 & 0xFF) as usize
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// An atom plus a polarity: "(row, col) = value" or "not (row, col) = value".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Literal(u32);

impl Literal {
    #[must_use]
    pub fn new(row: usize, col: usize, value: usize, polarity: bool) -> Self {
        Self::from_atom(AtomKey::new(row, col, value), polarity)
    }

    #[must_use]
    pub fn positive(row: usize, col: usize, value: usize) -> Self {
        Self::new(row, col, value, true)
    }

    #[must_use]
    pub fn negative(row: usize, col: usize, value: usize) -> Self {
        Self::new(row, col, value, false)
    }

    #[must_use]
    pub const fn from_atom(atom: AtomKey, polarity: bool) -> Self {
        if polarity {
            Self(atom.0 | POLARITY_BIT)
        } else {
            Self(atom.0)
        }
    }

    #[must_use]
    pub const fn atom(self) -> AtomKey {
        AtomKey(self.0 & ATOM_MASK)
    }

    #[must_use]
    pub const fn row(self) -> usize {
        self.atom().row()
    }

    #[must_use]
    pub const fn col(self) -> usize {
        self.atom().col()
    }

    #[must_use]
    pub const fn value(self) -> usize {
        self.atom().value()
    }

    #[must_use]
    pub const fn polarity(self) -> bool {
        self.0 & POLARITY_BIT != 0
    }

    #[must_use]
    pub const fn is_negated(self) -> bool {
        !self.polarity()
    }

    #[must_use]
    pub const fn negated(self) -> Self {
        Self(self.0 ^ POLARITY_BIT)
    }

    /// Both literals talk about the same `(row, col, value)`, whatever their polarity.
    #[must_use]
    pub const fn same_atom(self, other: Self) -> bool {
        self.atom().0 == other.atom().0
    }

    /// The packed representation, used as the literal's hash identity in clause keys.
    #[must_use]
    pub const fn packed(self) -> u32 {
        self.0
    }
}

impl Display for Literal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_negated() {
            write!(f, "not ")?;
        }
        write!(
            f,
            "({},{}) = {}",
            self.row() + 1,
            self.col() + 1,
            self.value() + 1
        )
    }
}

impl Neg for Literal {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negated()
    }
}

impl Not for Literal {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negated()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atom_key_layout() {
        let atom = AtomKey::new(3, 7, 8);
        assert_eq!(atom.raw(), 3 << 16 | 7 << 8 | 8);
        assert_eq!(atom.row(), 3);
        assert_eq!(atom.col(), 7);
        assert_eq!(atom.value(), 8);
    }

    #[test]
    fn test_literal_neg() {
        assert_eq!(Literal::positive(1, 2, 3).negated(), Literal::negative(1, 2, 3));
        assert_eq!(!Literal::negative(1, 2, 3), Literal::positive(1, 2, 3));
        assert_eq!(-Literal::positive(0, 0, 0), Literal::negative(0, 0, 0));
    }

    #[test]
    fn test_same_atom_ignores_polarity() {
        let a = Literal::positive(4, 4, 1);
        assert!(a.same_atom(a.negated()));
        assert!(!a.same_atom(Literal::positive(4, 4, 2)));
        assert_ne!(a, a.negated());
        assert_eq!(a.atom(), a.negated().atom());
    }

    #[test]
    fn test_atom_keys_are_injective() {
        let mut seen = std::collections::HashSet::new();
        for row in 0..16 {
            for col in 0..16 {
                for value in 0..16 {
                    assert!(seen.insert(AtomKey::new(row, col, value)));
                }
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Literal::positive(0, 1, 2).to_string(), "(1,2) = 3");
        assert_eq!(Literal::negative(8, 8, 8).to_string(), "not (9,9) = 9");
    }

    #[test]
    #[should_panic(expected = "does not fit")]
    fn test_oversized_atom_panics() {
        let _ = AtomKey::new(256, 0, 0);
    }
}
