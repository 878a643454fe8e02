/*!
Distillation (vivification) of long clauses.

The literals of a clause are asserted false one at a time at a private decision level, with
propagation between.
- A conflict before the clause is exhausted shows the prefix alone is contradictory: the clause
  shrinks to the prefix.
- A literal found true under the prefix shows the clause is entailed by prefix-plus-literal:
  the rest of the clause is dropped.
- A literal found false is simply redundant in the clause.

Anything learnt this way is a strengthening of an existing clause, so the new form is recorded
to the proof before the old is deleted.
*/

use crate::{misc::log::targets, solver::Solver, structures::literal::Lit};

impl Solver {
    /// Distills long irredundant clauses, within a budget.
    pub(crate) fn distill_clauses(&mut self) {
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        let mut budget =
            (30_000.0 * self.config.simplify.global_timeout_multiplier) as usize;
        let mut shrunk = 0;

        let offsets: Vec<_> = self.searcher.engine.cnf.long_irred.clone();
        for offset in offsets {
            if budget == 0 || !self.okay() || self.interrupt_requested() {
                break;
            }
            if !self.searcher.engine.cnf.arena.is_allocated(offset) {
                continue;
            }

            let lits = self.searcher.engine.cnf.arena.get(offset).lits().to_vec();
            budget = budget.saturating_sub(lits.len());

            // Assert the negation of each literal in turn.
            self.searcher.engine.new_decision_level();
            let mut kept: Vec<Lit> = Vec::with_capacity(lits.len());

            for &literal in &lits {
                match self.searcher.engine.value_of_lit(literal) {
                    Some(true) => {
                        // Implied by the kept prefix: the clause reduces to prefix + literal.
                        kept.push(literal);
                        break;
                    }
                    Some(false) => {
                        // Falsified by the kept prefix alone: redundant in this clause.
                        continue;
                    }
                    None => {
                        self.searcher.engine.enqueue(
                            !literal,
                            crate::propagation::Reason::Free,
                        );
                        kept.push(literal);
                        if self.searcher.engine.propagate().is_err() {
                            // The prefix up to this literal is already contradictory.
                            break;
                        }
                    }
                }
            }

            self.searcher.engine.cancel_until(0);

            if kept.len() < lits.len() {
                log::trace!(target: targets::DISTILL, "Clause at {offset} shrunk from {} to {}", lits.len(), kept.len());
                shrunk += 1;
                self.replace_long_clause_lits(offset, kept);
                if !self.okay() {
                    return;
                }
            }
        }

        if shrunk > 0 {
            log::info!(target: targets::DISTILL, "{shrunk} clauses distilled");
        }
    }

    /// Replaces the literals of the long clause at `offset`, demoting it on shrinking below
    /// three literals. The new form is recorded before the old is deleted.
    pub(crate) fn replace_long_clause_lits(
        &mut self,
        offset: crate::db::arena::ClauseOffset,
        new_lits: Vec<Lit>,
    ) {
        let clause = self.searcher.engine.cnf.arena.get(offset);
        let old_lits = clause.lits().to_vec();
        let redundant = clause.redundant;
        let glue = clause.glue;

        if let Some(trace) = self.proof.as_mut() {
            trace.add_clause(&new_lits);
            trace.delete_clause(&old_lits);
        }

        self.searcher.engine.detach_clause(offset);

        if new_lits.len() >= 3 {
            self.searcher
                .engine
                .cnf
                .arena
                .get_mut(offset)
                .set_lits(new_lits);
            self.searcher.engine.attach_clause(offset);
        } else {
            self.searcher.engine.cnf.unstore_offset(offset);
            self.searcher.engine.cnf.arena.free(offset);
            self.add_clause_int(new_lits, redundant, glue, false, None);
        }
    }
}
