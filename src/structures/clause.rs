//! Clauses, their metadata, and parity (XOR) constraints.
//!
//! A stored clause is a sorted, duplicate-free sequence of at least three literals.
//! Shorter clauses never reach storage: unit clauses are installed directly on the trail, and
//! binary clauses live only in the watch lists.
//!
//! Alongside its literals a stored clause carries the metadata the reducer and the watch lists
//! need: whether the clause is redundant, its glue, an activity score, which redundant tier it
//! sits in, and a strengthened-generation counter.
//! The generation counter increases whenever the literals of the clause change in place
//! (strengthening, renumbering), which lets watch lists lazily discard entries installed against
//! an older shape of the clause.

use crate::structures::literal::{Lit, Var};

/// Glue (literal block distance): the number of distinct decision levels in a learnt clause.
pub type Glue = u32;

/// Clause activity, for the reduction heuristic.
pub type Activity = f64;

/// The redundant tier a learnt clause is kept in.
///
/// Tier 0 holds the clauses believed most useful (lowest glue) and is never reduced; tier 2 is
/// reduced most aggressively.
pub type Tier = usize;

/// A clause of at least three literals, together with its metadata.
#[derive(Clone, Debug)]
pub struct StoredClause {
    /// The literals, sorted and duplicate free.
    lits: Vec<Lit>,

    /// Whether the clause is redundant (learnt or otherwise implied).
    pub redundant: bool,

    /// The glue of the clause, if learnt.
    pub glue: Glue,

    /// Activity, bumped on use and decayed by the reducer.
    pub activity: Activity,

    /// Which redundant tier the clause sits in. Meaningless for irredundant clauses.
    pub tier: Tier,

    /// Incremented whenever the literals change in place.
    ///
    /// Watch entries record the generation they were installed against, so stale entries can be
    /// discarded without eagerly walking every watch list.
    pub generation: u32,
}

impl StoredClause {
    /// A fresh stored clause over the given literals.
    ///
    /// The literals are expected to be duplicate free and at least three in number; the
    /// ingestion pipeline establishes this before allocation.
    /// Order is not an invariant of storage --- ingestion sorts, but propagation swaps watched
    /// literals to the front.
    pub fn new(lits: Vec<Lit>, redundant: bool) -> Self {
        debug_assert!(lits.len() >= 3);

        StoredClause {
            lits,
            redundant,
            glue: 0,
            activity: 0.0,
            tier: 0,
            generation: 0,
        }
    }

    /// The literals of the clause.
    pub fn lits(&self) -> &[Lit] {
        &self.lits
    }

    /// The count of literals in the clause.
    pub fn len(&self) -> usize {
        self.lits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lits.is_empty()
    }

    /// Replaces the literals of the clause, bumping the generation.
    ///
    /// The caller re-establishes watches; any watch entry recorded against the old generation
    /// is discarded lazily.
    pub fn set_lits(&mut self, mut lits: Vec<Lit>) {
        lits.sort_unstable();
        lits.dedup();
        self.lits = lits;
        self.generation += 1;
    }

    /// Swaps the literals at the two positions.
    ///
    /// Positions 0 and 1 are the watched positions, so this is how propagation moves watches
    /// within the clause.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.lits.swap(a, b);
    }

    /// The literal at the given position.
    ///
    /// # Safety
    /// No check is made that the position is within the clause.
    pub unsafe fn get_unchecked(&self, position: usize) -> Lit {
        *self.lits.get_unchecked(position)
    }

    /// The clause as space-separated integers with a closing zero, DIMACS style.
    pub fn as_dimacs(&self) -> String {
        let mut s = String::new();
        for literal in &self.lits {
            s.push_str(&format!("{literal} "));
        }
        s.push('0');
        s
    }
}

/// A parity constraint: the variables XOR to the right-hand side.
///
/// Stored only for constraints of three or more variables; shorter residues are handled during
/// ingestion (see [add_xor_clause](crate::solver::Solver::add_xor_clause)).
///
/// Between simplification passes a parity constraint may retain variables which have since been
/// replaced; the Gaussian pass refreshes constraints through the equivalence table before use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct XorClause {
    /// The variables of the constraint, sorted.
    pub vars: Vec<Var>,

    /// The parity the variables must sum to.
    pub rhs: bool,
}

impl XorClause {
    pub fn new(mut vars: Vec<Var>, rhs: bool) -> Self {
        vars.sort_unstable();
        XorClause { vars, rhs }
    }

    /// Whether the constraint holds under the given (total) valuation.
    pub fn satisfied_by(&self, value_of: impl Fn(Var) -> Option<bool>) -> bool {
        let mut parity = false;
        for &var in &self.vars {
            match value_of(var) {
                Some(value) => parity ^= value,
                None => return false,
            }
        }
        parity == self.rhs
    }
}

impl std::fmt::Display for XorClause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x")?;
        for var in &self.vars {
            write!(f, " {}", var + 1)?;
        }
        write!(f, " = {}", self.rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_bumps_on_rewrite() {
        let lits = vec![Lit::new(0, true), Lit::new(1, true), Lit::new(2, true)];
        let mut clause = StoredClause::new(lits, false);
        assert_eq!(clause.generation, 0);

        clause.set_lits(vec![Lit::new(2, true), Lit::new(0, true), Lit::new(1, true)]);
        assert_eq!(clause.generation, 1);
        assert!(clause.lits().windows(2).all(|w| w[0] < w[1]), "set_lits sorts");
    }

    #[test]
    fn xor_satisfaction() {
        let xor = XorClause::new(vec![0, 1, 2], true);
        let model = [Some(true), Some(true), Some(true)];
        assert!(xor.satisfied_by(|v| model[v as usize]));

        let model = [Some(true), Some(true), Some(false)];
        assert!(!xor.satisfied_by(|v| model[v as usize]));
    }
}
