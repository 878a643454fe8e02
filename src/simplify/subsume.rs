/*!
Subsumption and strengthening with implicit (binary) clauses.

Binary clauses exist only in the watch lists, so subsumption against them is a matter of
scanning watchers rather than occurrence lists:
- `sub-impl` deduplicates the binary clauses themselves, and drops redundant binaries
  duplicated by irredundant ones.
- `sub-str-cls-with-bin` walks long clauses: a clause containing both literals of some binary
  is subsumed by it, and a clause containing one literal and the negation of the other loses
  the negation by self-subsuming resolution.
*/

use crate::{
    db::watches::Watcher,
    misc::log::targets,
    solver::Solver,
    structures::literal::Lit,
};

impl Solver {
    /// Deduplicates binary clauses.
    ///
    /// An irredundant copy wins over a redundant one.
    pub(crate) fn subsume_implicit(&mut self) {
        let mut binaries: Vec<(Lit, Lit, bool)> = self
            .searcher
            .engine
            .cnf
            .watches
            .binary_clauses()
            .collect();

        // Sort so duplicates are adjacent, irredundant first.
        binaries.sort_unstable_by_key(|&(a, b, red)| (a, b, red));

        let mut removed = 0;
        let mut previous: Option<(Lit, Lit)> = None;
        for (a, b, redundant) in binaries {
            if previous == Some((a, b)) {
                self.searcher.engine.detach_binary(a, b, redundant);
                if let Some(trace) = self.proof.as_mut() {
                    trace.delete_clause(&[a, b]);
                }
                removed += 1;
            } else {
                previous = Some((a, b));
            }
        }

        if removed > 0 {
            log::info!(target: targets::SUBSUMPTION, "{removed} duplicate binaries removed");
        }
    }

    /// Subsumes and strengthens long clauses with binary clauses.
    pub(crate) fn sub_str_cls_with_bin(&mut self) {
        let mut budget =
            (60_000.0 * self.config.simplify.global_timeout_multiplier) as usize;
        let mut subsumed = 0;
        let mut strengthened = 0;

        let offsets: Vec<_> = self.searcher.engine.cnf.all_long_offsets().collect();
        'clause_loop: for offset in offsets {
            if budget == 0 || !self.okay() {
                break;
            }
            if !self.searcher.engine.cnf.arena.is_allocated(offset) {
                continue;
            }

            let lits = self.searcher.engine.cnf.arena.get(offset).lits().to_vec();

            for &u in &lits {
                let partners: Vec<Lit> = self
                    .searcher
                    .engine
                    .cnf
                    .watches
                    .of(u)
                    .iter()
                    .filter_map(|w| match w {
                        Watcher::Binary { other, .. } => Some(*other),
                        _ => None,
                    })
                    .collect();

                for other in partners {
                    budget = budget.saturating_sub(1);

                    // u ∨ other subsumes any clause holding both.
                    if lits.contains(&other) {
                        log::trace!(target: targets::SUBSUMPTION, "Clause at {offset} subsumed by {u} ∨ {other}");
                        self.remove_long_clause(offset);
                        subsumed += 1;
                        continue 'clause_loop;
                    }

                    // Resolving on ¬other removes it from the clause.
                    if lits.contains(&!other) {
                        let pivot = !other;
                        log::trace!(target: targets::SUBSUMPTION, "Removing {pivot} from clause at {offset}");
                        self.strengthen_long_clause(offset, pivot);
                        strengthened += 1;
                        if !self.okay() {
                            return;
                        }
                        continue 'clause_loop;
                    }
                }
            }
        }

        if subsumed + strengthened > 0 {
            log::info!(target: targets::SUBSUMPTION, "{subsumed} subsumed, {strengthened} strengthened with binaries");
        }
    }
}
