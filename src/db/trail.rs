//! The trail: literals assigned true, in assignment order, partitioned into decision levels.

use crate::structures::literal::Lit;

/// The index of a decision level.
pub type LevelIndex = u32;

/// The trail of assignments.
#[derive(Default)]
pub struct Trail {
    /// The literals assigned true, in assignment order.
    pub lits: Vec<Lit>,

    /// `lim[d]` is the index into `lits` at which level `d + 1` begins.
    pub lim: Vec<usize>,

    /// The propagation head: literals before this index have been propagated.
    pub q_head: usize,
}

impl Trail {
    /// The current decision level.
    pub fn level(&self) -> LevelIndex {
        self.lim.len() as LevelIndex
    }

    /// Opens a fresh decision level.
    pub fn new_level(&mut self) {
        self.lim.push(self.lits.len());
    }

    /// Stores a literal at the current level.
    pub fn push(&mut self, literal: Lit) {
        self.lits.push(literal);
    }

    /// The assignments of the current top level, in order of assignment.
    pub fn top_level_assignments(&self) -> &[Lit] {
        match self.lim.last() {
            Some(&start) => &self.lits[start..],
            None => &[],
        }
    }

    /// Removes levels above `level`, returning the literals cleared.
    ///
    /// # Soundness
    /// Does not clear the *valuation* of the cleared literals; the propagation engine does so.
    pub fn clear_above(&mut self, level: LevelIndex) -> Vec<Lit> {
        match self.lim.get(level as usize) {
            Some(&start) => {
                self.lim.truncate(level as usize);
                self.q_head = std::cmp::min(self.q_head, start);
                self.lits.split_off(start)
            }
            None => Vec::default(),
        }
    }

    /// The next literal awaiting propagation, advancing the head.
    pub fn next_to_propagate(&mut self) -> Option<Lit> {
        let literal = self.lits.get(self.q_head).copied();
        if literal.is_some() {
            self.q_head += 1;
        }
        literal
    }

    /// Whether every assignment has been propagated.
    pub fn fully_propagated(&self) -> bool {
        self.q_head == self.lits.len()
    }

    /// A count of assignments.
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }
}
