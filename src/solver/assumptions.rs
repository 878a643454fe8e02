/*!
Assumption handling.

Assumptions are unit constraints holding for a single solve.
They arrive in outside numbering and pass through the same translation as a clause (steps 1--6
of the [ingestion pipeline](crate::solver::Solver::add_clause), without creating a clause):
equivalence substitution, translation to inter, re-admission of decomposed variables, and
unelimination.

Each installed assumption is a pair of the translated inter literal and the caller's original
--- the original is what a conflict is reported in.
A membership bit per inter variable lets passes ask cheaply whether a variable may be
eliminated, decomposed, or undefined.
Equivalence replacement re-follows representatives through
[update_assumptions_after_varreplace](crate::solver::Solver::update_assumptions_after_varreplace),
shifting the membership bits along.
*/

use crate::{
    misc::log::targets,
    structures::literal::{Lit, Var},
    types::err::ErrorKind,
};

use super::Solver;

/// An installed assumption: the translated inter literal, and the caller's original.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssumptionPair {
    /// The literal as the searcher asserts it.
    pub inter: Lit,

    /// The literal as the caller gave it.
    pub outside: Lit,
}

impl Solver {
    /// Sets the assumptions for subsequent solves.
    ///
    /// An empty slice clears them.
    pub fn set_assumptions(&mut self, lits_outside: &[Lit]) -> Result<(), ErrorKind> {
        self.check_outside_bounds(lits_outside)?;
        self.outside_assumptions = lits_outside.to_vec();
        Ok(())
    }

    /// Translates and installs the stored assumptions for a solve.
    ///
    /// Unelimination or component re-admission during translation may establish
    /// unsatisfiability, left in the sticky `ok` flag.
    pub(crate) fn install_assumptions(&mut self) {
        self.conflict.clear();
        self.assumptions.clear();
        self.searcher.assumptions.clear();

        self.assumptions_set = vec![false; self.searcher.engine.cnf.var_count()];
        if self.outside_assumptions.is_empty() || !self.ok {
            return;
        }

        let outer: Vec<Lit> = self
            .outside_assumptions
            .iter()
            .map(|&l| self.maps.outer_from_outside_lit(l))
            .collect();

        let Some(inter) = self.ingest_to_inter(outer) else {
            return;
        };
        debug_assert_eq!(inter.len(), self.outside_assumptions.len());

        for (position, &inter_lit) in inter.iter().enumerate() {
            let pair = AssumptionPair {
                inter: inter_lit,
                outside: self.outside_assumptions[position],
            };
            log::debug!(target: targets::VALUATION, "Assumption {} as {}", pair.outside, pair.inter);
            self.assumptions.push(pair);
            self.assumptions_set[inter_lit.var() as usize] = true;
            self.searcher.assumptions.push(inter_lit);
        }
    }

    /// Clears the installed assumptions (the stored outside assumptions persist for the next
    /// solve).
    pub(crate) fn unfill_assumptions(&mut self) {
        for pair in &self.assumptions {
            if let Some(bit) = self.assumptions_set.get_mut(pair.inter.var() as usize) {
                *bit = false;
            }
        }
        self.searcher.assumptions.clear();
    }

    /// Whether an inter variable appears in the installed assumptions.
    pub(crate) fn var_inside_assumptions(&self, var: Var) -> bool {
        self.assumptions_set
            .get(var as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Re-follows equivalence representatives for every installed assumption, moving the
    /// membership bits along.
    pub(crate) fn update_assumptions_after_varreplace(&mut self) {
        for position in 0..self.assumptions.len() {
            let pair = self.assumptions[position];

            if let Some(bit) = self.assumptions_set.get_mut(pair.inter.var() as usize) {
                *bit = false;
            }

            let updated = self.lit_replaced_with_inter(pair.inter);
            self.assumptions[position].inter = updated;
            self.searcher.assumptions[position] = updated;

            if let Some(bit) = self.assumptions_set.get_mut(updated.var() as usize) {
                *bit = true;
            }
        }
    }

    /// Remaps installed assumptions under a renumbering, given the old-inter to new-inter
    /// literal map.
    pub(crate) fn renumber_assumptions(&mut self, map: impl Fn(Lit) -> Lit) {
        self.assumptions_set = vec![false; self.assumptions_set.len()];
        for position in 0..self.assumptions.len() {
            let updated = map(self.assumptions[position].inter);
            self.assumptions[position].inter = updated;
            self.searcher.assumptions[position] = updated;
            if let Some(bit) = self.assumptions_set.get_mut(updated.var() as usize) {
                *bit = true;
            }
        }
    }

    /// Translates the searcher's final conflict --- assumption literals in inter space --- back
    /// to the caller's originals.
    pub(crate) fn translate_final_conflict(&mut self) {
        self.conflict.clear();
        for &literal in &self.searcher.final_conflict {
            match self.assumptions.iter().find(|pair| pair.inter == literal) {
                Some(pair) => self.conflict.push(pair.outside),
                None => {
                    log::warn!(target: targets::ANALYSIS, "Conflict literal {literal} matches no assumption");
                }
            }
        }
    }
}
