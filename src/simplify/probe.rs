/*!
Failed-literal probing.

A literal is *failed* when assuming it and propagating yields a conflict; its negation then
holds at the root.
Probing tries candidate literals one at a time at a private decision level, enqueues the
negation of any that fail, and — when the implication cache is enabled — records everything
each probe reached, feeding the cache's later unit derivations.

The in-tree variant probes only the roots of the binary implication graph: anything a root
implies is reached through propagation anyway, so the roots cover the graph with far fewer
probes.
*/

use crate::{misc::log::targets, solver::Solver, structures::literal::Lit};

impl Solver {
    /// Classical failed-literal probing over free variables with binary occurrences.
    pub(crate) fn probe(&mut self) {
        let candidates = self.probe_candidates(false);
        self.probe_these(candidates);
    }

    /// In-tree probing: only the roots of the binary implication graph.
    pub(crate) fn intree_probe(&mut self) {
        let candidates = self.probe_candidates(true);
        self.probe_these(candidates);
    }

    /// Candidate literals for probing, roots only when `roots_only`.
    fn probe_candidates(&self, roots_only: bool) -> Vec<Lit> {
        let node_count = self.searcher.engine.cnf.var_count() * 2;
        let mut occurs = vec![false; node_count];
        let mut has_parent = vec![false; node_count];

        for (a, b, _) in self.searcher.engine.cnf.watches.binary_clauses() {
            // Edges ¬a → b and ¬b → a.
            occurs[a.index()] = true;
            occurs[b.index()] = true;
            occurs[(!a).index()] = true;
            occurs[(!b).index()] = true;
            has_parent[b.index()] = true;
            has_parent[a.index()] = true;
        }

        (0..node_count)
            .map(Lit::from_index)
            .filter(|l| {
                occurs[l.index()]
                    && self.searcher.engine.cnf.var_is_free(l.var())
                    && (!roots_only || !has_parent[l.index()])
            })
            .collect()
    }

    /// Probes each candidate in turn, within a budget.
    fn probe_these(&mut self, candidates: Vec<Lit>) {
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        let mut budget =
            (50_000.0 * self.config.simplify.global_timeout_multiplier) as usize;
        let mut failed = 0;

        for candidate in candidates {
            if budget == 0 || !self.okay() || self.interrupt_requested() {
                break;
            }
            if self.searcher.engine.value_of_lit(candidate).is_some() {
                continue;
            }

            self.searcher.engine.new_decision_level();
            self.searcher
                .engine
                .enqueue(candidate, crate::propagation::Reason::Free);

            let outcome = self.searcher.engine.propagate();
            let implied: Vec<Lit> = self.searcher.engine.trail.top_level_assignments()[1..].to_vec();
            budget = budget.saturating_sub(implied.len() + 1);

            self.searcher.engine.cancel_until(0);

            match outcome {
                Err(_) => {
                    log::debug!(target: targets::PROBE, "Failed literal {candidate}");
                    failed += 1;
                    if let Some(trace) = self.proof.as_mut() {
                        trace.add_clause(&[!candidate]);
                    }
                    if !self.fully_enqueue_this(!candidate) {
                        break;
                    }
                }
                Ok(()) => {
                    if let Some(cache) = self.cache.as_mut() {
                        cache.record(candidate, &implied);
                    }
                }
            }
        }

        if failed > 0 {
            log::info!(target: targets::PROBE, "{failed} failed literals");
        }
    }
}
