#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
//! Unit queues.
//!
//! Literals discovered as units are parked here until [`crate::sat::cnf::SudokuCnf::propagate_all`]
//! drains them. The order in which they are drained is the only "heuristic" the engine has,
//! so it is a type parameter: [`PropagationStack`] (LIFO, the default) or
//! [`PropagationQueue`] (FIFO).

use crate::sat::literal::Literal;
use std::collections::VecDeque;
use std::fmt::Debug;

pub trait PropagationStructure: Debug + Clone + Default {
    fn push(&mut self, lit: Literal);

    fn pop(&mut self) -> Option<Literal>;

    /// Drops every queued copy of `lit`, returning how many were removed.
    fn remove(&mut self, lit: Literal) -> usize;

    fn contains(&self, lit: Literal) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    /// Queued literals in the order `pop` would return them.
    fn to_vec(&self) -> Vec<Literal>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
pub struct PropagationQueue(VecDeque<Literal>);

impl PropagationStructure for PropagationQueue {
    fn push(&mut self, lit: Literal) {
        self.0.push_back(lit);
    }

    fn pop(&mut self) -> Option<Literal> {
        self.0.pop_front()
    }

    fn remove(&mut self, lit: Literal) -> usize {
        let before = self.0.len();
        self.0.retain(|&l| l != lit);
        before - self.0.len()
    }

    fn contains(&self, lit: Literal) -> bool {
        self.0.contains(&lit)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn to_vec(&self) -> Vec<Literal> {
        self.0.iter().copied().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, PartialOrd, Ord)]
pub struct PropagationStack(Vec<Literal>);

impl PropagationStructure for PropagationStack {
    fn push(&mut self, lit: Literal) {
        self.0.push(lit);
    }

    fn pop(&mut self) -> Option<Literal> {
        self.0.pop()
    }

    fn remove(&mut self, lit: Literal) -> usize {
        let before = self.0.len();
        self.0.retain(|&l| l != lit);
        before - self.0.len()
    }

    fn contains(&self, lit: Literal) -> bool {
        self.0.contains(&lit)
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn clear(&mut self) {
        self.0.clear();
    }

    fn to_vec(&self) -> Vec<Literal> {
        self.0.iter().rev().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill<P: PropagationStructure>() -> P {
        let mut p = P::default();
        p.push(Literal::positive(0, 0, 1));
        p.push(Literal::positive(0, 0, 2));
        p.push(Literal::positive(0, 0, 3));
        p
    }

    #[test]
    fn test_propagation_queue() {
        let mut q: PropagationQueue = fill();

        assert_eq!(q.pop(), Some(Literal::positive(0, 0, 1)));
        assert_eq!(q.pop(), Some(Literal::positive(0, 0, 2)));
        assert_eq!(q.pop(), Some(Literal::positive(0, 0, 3)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_propagation_stack() {
        let mut q: PropagationStack = fill();

        assert_eq!(q.to_vec()[0], Literal::positive(0, 0, 3));
        assert_eq!(q.pop(), Some(Literal::positive(0, 0, 3)));
        assert_eq!(q.pop(), Some(Literal::positive(0, 0, 2)));
        assert_eq!(q.pop(), Some(Literal::positive(0, 0, 1)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_remove_drops_every_copy() {
        let mut q: PropagationStack = fill();
        q.push(Literal::positive(0, 0, 2));

        assert_eq!(q.remove(Literal::positive(0, 0, 2)), 2);
        assert_eq!(q.remove(Literal::negative(0, 0, 1)), 0);
        assert!(!q.contains(Literal::positive(0, 0, 2)));
        assert_eq!(q.len(), 2);
    }
}
