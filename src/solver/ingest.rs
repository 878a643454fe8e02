/*!
The clause ingestion pipeline.

A clause arrives in outside numbering and passes through, in order:
1. A bounds check against the declared variable count.
2. Translation to outer numbering (auxiliaries made visible).
3. Equivalence substitution: every literal is replaced by its current class representative.
   Idempotent.
4. Translation to inter numbering.
5. Re-admission of decomposed variables: if a literal belongs to a detached component, the
   component's clauses are restored first.
6. Unelimination: if a literal belongs to an eliminated variable, the elimination is undone
   (which may itself establish unsatisfiability).
7. Sorting and cleaning: duplicates dropped, tautologies discarded, root-level values absorbed.
8. Installation by length: empty concludes unsatisfiability, units go to the trail, binaries to
   the watch lists, and longer clauses to the arena.
9. Proof emission: if the stored clause differs from the given clause, the cleaned form is
   recorded as an addition and the given form as a deletion, in that order.

After return, either the solver is in its sticky unsatisfiable state, or every coordinate and
clause-sanity invariant holds and the stored clause is a permutation-and-subset of the given
clause under the current substitutions.
*/

use crate::{
    db::{arena::ClauseOffset, variable::Removed},
    misc::log::targets,
    structures::{
        clause::{Glue, StoredClause},
        literal::Lit,
    },
    types::err::{ErrorKind, IngestError},
};

use super::Solver;

/// The residue of sorting and cleaning a clause at the root level.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum CleanOutcome {
    /// The remaining literals are worth storing.
    Keep,

    /// Some literal is true at the root; the clause is already satisfied.
    Satisfied,

    /// The clause contains a literal and its negation.
    Tautology,
}

impl Solver {
    /// Adds a clause to the formula, given in outside numbering.
    ///
    /// Returns the `ok` state of the solver: false once unsatisfiability is established.
    pub fn add_clause(&mut self, lits_outside: &[Lit]) -> Result<bool, ErrorKind> {
        self.add_clause_with(lits_outside, false)
    }

    /// Adds a clause, optionally marked redundant (in which case it may later be dropped by the
    /// reducer).
    pub fn add_clause_with(
        &mut self,
        lits_outside: &[Lit],
        redundant: bool,
    ) -> Result<bool, ErrorKind> {
        if !self.ok {
            return Ok(false);
        }

        if let Some(occ) = self.occ.as_ref() {
            if occ.anything_has_been_blocked() {
                log::error!(target: targets::INGEST, "Clause added after blocked clause elimination");
                return Err(IngestError::Blocking.into());
            }
        }

        self.check_outside_bounds(lits_outside)?;
        if lits_outside.len() >= (1 << 28) {
            return Err(IngestError::TooLongClause.into());
        }

        let outer: Vec<Lit> = lits_outside
            .iter()
            .map(|&l| self.maps.outer_from_outside_lit(l))
            .collect();

        let trail_before = self.searcher.engine.trail.len();

        let Some(mut inter) = self.ingest_to_inter(outer) else {
            return Ok(false);
        };
        inter.sort_unstable();

        let mut final_lits: Vec<Lit> = Vec::default();
        self.add_clause_int(
            inter.clone(),
            redundant,
            lits_outside.len() as Glue,
            false,
            Some(&mut final_lits),
        );

        // The stored clause differs from the given clause: record the rewrite.
        if self.proof.is_some() && final_lits != inter {
            if !final_lits.is_empty() {
                if let Some(trace) = self.proof.as_mut() {
                    trace.add_clause(&final_lits);
                }
            }
            // An empty clause was recorded by note_unsat, when relevant.
            if let Some(trace) = self.proof.as_mut() {
                trace.delete_clause(&inter);
            }
        }

        self.stats.zero_level_assigns_by_cnf +=
            (self.searcher.engine.trail.len() - trail_before) as u64;

        Ok(self.ok)
    }

    /// Checks every literal refers to a declared outside variable.
    pub(crate) fn check_outside_bounds(&self, lits: &[Lit]) -> Result<(), ErrorKind> {
        let limit = self.maps.n_outside() as u32;
        for literal in lits {
            if literal.var() >= limit {
                log::error!(target: targets::INGEST, "Variable {} above declared count {limit}", literal.var());
                return Err(IngestError::VarOutOfRange {
                    var: literal.var(),
                    limit,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Steps 3--6 of the pipeline: substitution, translation to inter, re-admission of
    /// decomposed variables, and unelimination.
    ///
    /// Returns `None` when unelimination establishes unsatisfiability.
    pub(crate) fn ingest_to_inter(&mut self, outer: Vec<Lit>) -> Option<Vec<Lit>> {
        // Equivalence substitution, in outer space.
        let substituted: Vec<Lit> = outer
            .iter()
            .map(|&l| self.replacer.lit_replaced_with_outer(l))
            .collect();

        let inter: Vec<Lit> = substituted
            .iter()
            .map(|&l| self.maps.inter_from_outer_lit(l))
            .collect();

        // Re-admit decomposed variables before anything else touches them.
        let any_decomposed = inter.iter().any(|l| {
            self.searcher.engine.cnf.var_data[l.var() as usize].removed == Removed::Decomposed
        });
        if any_decomposed {
            let mut comp = self.comp.take();
            if let Some(handler) = comp.as_mut() {
                handler.readd_removed_clauses(self);
            }
            self.comp = comp;
            if !self.ok {
                return None;
            }
        }

        // Undo eliminations.
        for literal in &inter {
            let var = literal.var();
            if self.searcher.engine.cnf.var_data[var as usize].removed == Removed::Elimed {
                let mut occ = self.occ.take();
                let restored = match occ.as_mut() {
                    Some(simplifier) => simplifier.uneliminate(var, self),
                    None => {
                        log::error!(target: targets::INGEST, "Eliminated variable {var} with no occurrence simplifier");
                        false
                    }
                };
                self.occ = occ;
                if !restored {
                    self.note_unsat();
                    return None;
                }
            }
        }

        Some(inter)
    }

    /// Sorts and cleans a clause at the root level: duplicates dropped, root-level false
    /// literals dropped, satisfied clauses and tautologies reported.
    ///
    /// A removed variable surviving to this point is a corrupt state, and fatal.
    pub(crate) fn sort_and_clean_clause(&self, lits: &mut Vec<Lit>) -> CleanOutcome {
        lits.sort_unstable();

        let mut kept = 0;
        let mut previous: Option<Lit> = None;

        for position in 0..lits.len() {
            let literal = lits[position];

            match self.searcher.engine.value_of_lit(literal) {
                Some(true) => return CleanOutcome::Satisfied,
                Some(false) => continue,
                None => {}
            }

            if previous == Some(literal) {
                continue;
            }
            if previous == Some(!literal) {
                return CleanOutcome::Tautology;
            }

            let removed = self.searcher.engine.cnf.var_data[literal.var() as usize].removed;
            if removed != Removed::None {
                panic!(
                    "corrupt state: literal {literal} of a clause refers to a {removed} variable"
                );
            }

            lits[kept] = literal;
            kept += 1;
            previous = Some(literal);
        }

        lits.truncate(kept);
        CleanOutcome::Keep
    }

    /// Adds a clause in inter numbering. Should ONLY be called internally.
    ///
    /// Must not be called with literals of replaced, eliminated, or decomposed variables, nor on
    /// an unsatisfiable solver; use is careful and internal, after the pipeline of
    /// [add_clause](Solver::add_clause) or a simplifier's own normalisation.
    ///
    /// If `emit_proof` is set the cleaned clause is recorded as an addition.
    /// If `final_out` is given it receives the cleaned literals (left empty when the clause was
    /// discarded).
    /// Returns the arena offset, for clauses long enough to be allocated.
    pub(crate) fn add_clause_int(
        &mut self,
        lits: Vec<Lit>,
        redundant: bool,
        glue: Glue,
        emit_proof: bool,
        final_out: Option<&mut Vec<Lit>>,
    ) -> Option<ClauseOffset> {
        debug_assert!(self.ok);
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        let mut ps = lits;
        match self.sort_and_clean_clause(&mut ps) {
            CleanOutcome::Keep => {}
            CleanOutcome::Satisfied | CleanOutcome::Tautology => {
                if let Some(out) = final_out {
                    out.clear();
                }
                return None;
            }
        }

        if let Some(out) = final_out {
            *out = ps.clone();
        }

        if emit_proof && !ps.is_empty() {
            if let Some(trace) = self.proof.as_mut() {
                trace.add_clause(&ps);
            }
        }

        match ps.len() {
            0 => {
                log::info!(target: targets::INGEST, "Clause emptied at the root level");
                self.note_unsat();
                None
            }

            1 => {
                self.fully_enqueue_this(ps[0]);
                None
            }

            2 => {
                self.searcher.engine.attach_binary(ps[0], ps[1], redundant);
                let outer_a = self.maps.outer_from_inter_lit(ps[0]);
                let outer_b = self.maps.outer_from_inter_lit(ps[1]);
                self.sync.signal_new_bin(outer_a, outer_b);
                None
            }

            _ => {
                let mut clause = StoredClause::new(ps, redundant);
                clause.glue = glue;

                let tier = self.searcher.engine.cnf.tier_for_glue(
                    glue,
                    self.config.clause_db.glue_put_lev0_if_below_or_eq.value,
                    self.config.clause_db.glue_put_lev1_if_below_or_eq.value,
                );
                clause.tier = tier;

                let offset = self.searcher.engine.cnf.arena.alloc(clause);
                self.searcher.engine.cnf.store_offset(offset, redundant, tier);
                self.searcher.engine.attach_clause(offset);
                Some(offset)
            }
        }
    }

    /// Detaches and frees the long clause at `offset`, recording the deletion.
    pub(crate) fn remove_long_clause(&mut self, offset: ClauseOffset) {
        self.searcher.engine.detach_clause(offset);
        self.searcher.engine.cnf.unstore_offset(offset);
        let clause = self.searcher.engine.cnf.arena.free(offset);
        if let Some(trace) = self.proof.as_mut() {
            trace.delete_clause(clause.lits());
        }
    }

    /// Removes a literal from the long clause at `offset`, rewatching or demoting the clause as
    /// its length requires. The strengthened form is recorded before the old form is deleted.
    pub(crate) fn strengthen_long_clause(&mut self, offset: ClauseOffset, pivot: Lit) {
        let clause = self.searcher.engine.cnf.arena.get(offset);
        let old_lits = clause.lits().to_vec();
        let redundant = clause.redundant;
        let glue = clause.glue;

        let new_lits: Vec<Lit> = old_lits.iter().copied().filter(|&l| l != pivot).collect();
        debug_assert!(new_lits.len() < old_lits.len());

        if let Some(trace) = self.proof.as_mut() {
            trace.add_clause(&new_lits);
            trace.delete_clause(&old_lits);
        }

        self.searcher.engine.detach_clause(offset);

        if new_lits.len() >= 3 {
            // Rewritten in place; the generation bump invalidates any remaining watcher.
            self.searcher.engine.cnf.arena.get_mut(offset).set_lits(new_lits);
            self.searcher.engine.attach_clause(offset);
        } else {
            self.searcher.engine.cnf.unstore_offset(offset);
            self.searcher.engine.cnf.arena.free(offset);
            self.add_clause_int(new_lits, redundant, glue, false, None);
        }
    }
}
