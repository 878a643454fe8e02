/*!
Variable renumbering.

Simplification leaves the inter space ragged: valued, eliminated, replaced, and decomposed
variables scattered among the interesting ones.
Renumbering permutes the inter space so the interesting variables (no value, not removed)
occupy the low indices in their current order, with everything else behind them.

The permutation touches everything holding inter indices: long clauses, parity constraints,
the valuation and variable metadata, reasons and levels, watch lists, the trail, the searcher's
activity heap, the stamps, the implication cache, the installed assumptions, and the coordinate
maps themselves.
The proof trace is *not* touched: records are whatever numbering was current when they were
emitted, which is how DRAT traces of renumbering solvers read.

The pass runs when forced, or when the saving --- the share of the inter space which is no
longer interesting --- reaches one fifth.
*/

use crate::{
    db::variable::Removed,
    misc::log::targets,
    structures::literal::{Lit, Var},
};

use super::Solver;

impl Solver {
    /// The share of inter variables which are no longer interesting.
    fn renumber_saving(&self) -> f64 {
        let n = self.searcher.engine.cnf.var_count();
        if n == 0 {
            return 0.0;
        }
        let used = self.searcher.engine.cnf.free_var_count();
        1.0 - (used as f64 / n as f64)
    }

    /// Renumbers the inter space, unless the saving is too small and the caller does not
    /// insist.
    pub(crate) fn renumber_variables(&mut self, must_renumber: bool) {
        if self.searcher.engine.cnf.var_count() == 0 || !self.ok {
            return;
        }
        if !must_renumber && self.renumber_saving() < 0.2 {
            log::debug!(target: targets::RENUMBER, "Saving below threshold, skipping");
            return;
        }
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        self.clean_clauses_at_level0();
        if !self.ok {
            return;
        }

        let n = self.searcher.engine.cnf.var_count();

        // The permutation: old inter index → new inter index, interesting variables first in
        // their current order.
        let mut old_to_new: Vec<Var> = vec![0; n];
        let mut new_to_old: Vec<Var> = vec![0; n];
        let mut at: usize = 0;

        for old in 0..n {
            if self.searcher.engine.cnf.var_is_free(old as Var) {
                old_to_new[old] = at as Var;
                new_to_old[at] = old as Var;
                at += 1;
            }
        }
        let n_effective = at;

        for old in 0..n {
            if !self.searcher.engine.cnf.var_is_free(old as Var) {
                old_to_new[old] = at as Var;
                new_to_old[at] = old as Var;
                at += 1;
            }
        }
        debug_assert_eq!(at, n);

        let lit_map = |l: Lit| l.retain_polarity(old_to_new[l.var() as usize]);

        // Clauses.
        for (_, clause) in self.searcher.engine.cnf.arena.iter_mut() {
            let mapped: Vec<Lit> = clause.lits().iter().map(|&l| lit_map(l)).collect();
            clause.set_lits(mapped);
        }
        for xor in self.searcher.engine.cnf.xors.iter_mut() {
            for var in xor.vars.iter_mut() {
                *var = old_to_new[*var as usize];
            }
            xor.vars.sort_unstable();
        }

        // Valuation, metadata, reasons, levels.
        let engine = &mut self.searcher.engine;
        permute(&mut engine.cnf.assigns, &old_to_new);
        permute(&mut engine.cnf.var_data, &old_to_new);
        permute(&mut engine.level, &old_to_new);

        let old_reasons = std::mem::take(&mut engine.reason);
        engine.reason = vec![crate::propagation::Reason::Free; n];
        for (old, reason) in old_reasons.into_iter().enumerate() {
            let mapped = match reason {
                crate::propagation::Reason::Binary(other) => {
                    crate::propagation::Reason::Binary(lit_map(other))
                }
                other => other,
            };
            engine.reason[old_to_new[old] as usize] = mapped;
        }

        // Watches, rebuilt wholesale under the literal map. Clause generations were bumped by
        // the rewrite above, so every watch entry is re-installed fresh.
        engine.cnf.watches.renumber(lit_map);
        let offsets: Vec<_> = engine.cnf.all_long_offsets().collect();
        for offset in offsets {
            engine.attach_clause(offset);
        }

        // Trail.
        for literal in engine.trail.lits.iter_mut() {
            *literal = lit_map(*literal);
        }

        // Searcher heuristics, stamps, cache, assumptions.
        self.searcher.renumber_heuristics(&old_to_new);
        if let Some(stamps) = self.stamps.as_mut() {
            stamps.permute(lit_map);
        }
        if let Some(cache) = self.cache.as_mut() {
            cache.permute(lit_map);
        }
        self.renumber_assumptions(lit_map);

        // The coordinate maps: compose the permutation onto outer→inter.
        let new_outer_to_inter: Vec<Var> = self
            .maps
            .outer_to_inter()
            .iter()
            .map(|&old_inter| old_to_new[old_inter as usize])
            .collect();
        let mut new_inter_to_outer: Vec<Var> = vec![0; n];
        for (outer, &inter) in new_outer_to_inter.iter().enumerate() {
            new_inter_to_outer[inter as usize] = outer as Var;
        }
        self.maps
            .set_permutation(new_outer_to_inter, new_inter_to_outer);

        self.stats.renumbers += 1;
        log::info!(target: targets::RENUMBER, "Renumbered; {n_effective} of {n} variables interesting");

        self.check_renumbering(n_effective);

        if self.config.subsystems.do_save_memory {
            self.save_on_var_memory(n_effective);
            self.searcher.truncate_heap(n_effective);
        }
    }

    /// The coordinate discipline: after a renumber, the interesting variables are exactly the
    /// prefix.
    fn check_renumbering(&self, n_effective: usize) {
        let mut uninteresting_seen = false;
        for var in 0..self.searcher.engine.cnf.var_count() as Var {
            let interesting = self.searcher.engine.cnf.value_of(var).is_none()
                && self.searcher.engine.cnf.var_data[var as usize].removed == Removed::None;

            if !interesting {
                uninteresting_seen = true;
            }
            assert!(
                !(interesting && uninteresting_seen),
                "corrupt state: variables renumbered out of order"
            );
            assert!(
                !(interesting && (var as usize) >= n_effective),
                "corrupt state: interesting variable above the effective bound"
            );
        }
    }

    /// Removes root-level satisfied clauses and root-level false literals from every store.
    pub(crate) fn clean_clauses_at_level0(&mut self) {
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        let offsets: Vec<_> = self.searcher.engine.cnf.all_long_offsets().collect();
        for offset in offsets {
            if !self.ok {
                return;
            }
            if !self.searcher.engine.cnf.arena.is_allocated(offset) {
                continue;
            }

            let lits = self.searcher.engine.cnf.arena.get(offset).lits();
            let satisfied = lits
                .iter()
                .any(|&l| self.searcher.engine.value_of_lit(l) == Some(true));
            if satisfied {
                self.remove_long_clause(offset);
                continue;
            }

            let falsified: Vec<Lit> = lits
                .iter()
                .copied()
                .filter(|&l| self.searcher.engine.value_of_lit(l) == Some(false))
                .collect();
            if !falsified.is_empty() {
                let kept: Vec<Lit> = self
                    .searcher
                    .engine
                    .cnf
                    .arena
                    .get(offset)
                    .lits()
                    .iter()
                    .copied()
                    .filter(|l| !falsified.contains(l))
                    .collect();
                self.replace_long_clause_lits(offset, kept);
            }
        }

        // Binaries.
        let binaries: Vec<_> = self
            .searcher
            .engine
            .cnf
            .watches
            .binary_clauses()
            .collect();
        for (a, b, redundant) in binaries {
            if !self.ok {
                return;
            }
            let value_a = self.searcher.engine.value_of_lit(a);
            let value_b = self.searcher.engine.value_of_lit(b);

            if value_a == Some(true) || value_b == Some(true) {
                self.searcher.engine.detach_binary(a, b, redundant);
                if let Some(trace) = self.proof.as_mut() {
                    trace.delete_clause(&[a, b]);
                }
            } else if value_a == Some(false) || value_b == Some(false) {
                let unit = if value_a == Some(false) { b } else { a };
                self.searcher.engine.detach_binary(a, b, redundant);
                if let Some(trace) = self.proof.as_mut() {
                    trace.add_clause(&[unit]);
                    trace.delete_clause(&[a, b]);
                }
                self.fully_enqueue_this(unit);
            }
        }

        // Parity constraints, through the same refresh the Gaussian pass uses.
        self.refresh_xors();
    }
}

/// Rebuilds a per-variable vector under a permutation.
fn permute<T: Clone>(values: &mut Vec<T>, old_to_new: &[Var]) {
    let old = std::mem::take(values);
    let mut fresh: Vec<Option<T>> = vec![None; old.len()];
    for (index, value) in old.into_iter().enumerate() {
        fresh[old_to_new[index] as usize] = Some(value);
    }
    *values = fresh.into_iter().map(|v| v.unwrap()).collect();
}
