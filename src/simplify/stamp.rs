/*!
Stamping over the binary implication graph.

A depth-first search over the binary implication graph assigns each literal an entry and exit
time.
When the search reaches `w` while inside `u`, the interval of `w` nests inside the interval of
`u`, witnessing the implication `u → w` without storing the path.

The intervals strengthen long clauses:
- A clause containing `u` and `w` with `¬u → w` is subsumed (the implicit binary `u ∨ w` is
  stronger).
- A clause containing `u` and `w` with `¬u → ¬w` loses `w` by self-subsuming resolution.

Stamps are refreshed at the start of each strengthening run, and permuted on renumbering.
*/

use crate::{
    misc::log::targets,
    solver::{Solver, VarNotify},
    structures::literal::Lit,
};

/// Entry and exit times per literal, indexed by inter literal.
#[derive(Default)]
pub struct Stamps {
    start: Vec<u64>,
    end: Vec<u64>,
    clock: u64,
}

impl VarNotify for Stamps {
    fn on_new_vars(&mut self, n: usize) {
        for _ in 0..n {
            self.start.push(0);
            self.start.push(0);
            self.end.push(0);
            self.end.push(0);
        }
    }

    fn on_save_var_memory(&mut self, new_n: usize) {
        self.start.truncate(new_n * 2);
        self.end.truncate(new_n * 2);
    }
}

impl Stamps {
    /// Whether the stamps witness `from → to`.
    pub fn implies(&self, from: Lit, to: Lit) -> bool {
        let f = from.index();
        let t = to.index();
        self.start[f] < self.start[t] && self.end[t] <= self.end[f] && self.start[f] != 0
    }

    /// Applies a literal permutation to the stamps.
    pub fn permute(&mut self, map: impl Fn(Lit) -> Lit) {
        // The permutation may reach above a truncated table; grow to cover it.
        let width = (0..self.start.len())
            .map(|index| map(Lit::from_index(index)).index() + 1)
            .max()
            .unwrap_or(0)
            .max(self.start.len());

        let mut start = vec![0; width];
        let mut end = vec![0; width];
        for index in 0..self.start.len() {
            let new_index = map(Lit::from_index(index)).index();
            start[new_index] = self.start[index];
            end[new_index] = self.end[index];
        }
        self.start = start;
        self.end = end;
    }

    /// Restamps the binary implication graph of the solver.
    fn refresh(&mut self, solver: &Solver) {
        let node_count = solver.searcher.engine.cnf.var_count() * 2;
        self.start = vec![0; node_count];
        self.end = vec![0; node_count];
        self.clock = 1;

        let mut edges: Vec<Vec<u32>> = vec![Vec::default(); node_count];
        let mut has_parent: Vec<bool> = vec![false; node_count];
        for (a, b, _) in solver.searcher.engine.cnf.watches.binary_clauses() {
            edges[(!a).index()].push(b.index() as u32);
            edges[(!b).index()].push(a.index() as u32);
            has_parent[b.index()] = true;
            has_parent[a.index()] = true;
        }

        // Roots first, then anything unreached (cycles).
        for pass in 0..2 {
            for root in 0..node_count {
                if self.start[root] != 0 {
                    continue;
                }
                if pass == 0 && (has_parent[root] || edges[root].is_empty()) {
                    continue;
                }
                if pass == 1 && edges[root].is_empty() {
                    continue;
                }

                let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
                self.start[root] = self.clock;
                self.clock += 1;

                while let Some(&(node, edge_at)) = stack.last() {
                    if let Some(&successor) = edges[node].get(edge_at) {
                        stack.last_mut().unwrap().1 += 1;
                        let successor = successor as usize;
                        if self.start[successor] == 0 {
                            self.start[successor] = self.clock;
                            self.clock += 1;
                            stack.push((successor, 0));
                        }
                    } else {
                        self.end[node] = self.clock;
                        self.clock += 1;
                        stack.pop();
                    }
                }
            }
        }
    }
}

impl Solver {
    /// Strengthens long clauses with stamped binary implications.
    pub(crate) fn str_impl_with_stamps(&mut self) {
        let Some(mut stamps) = self.stamps.take() else {
            return;
        };

        stamps.refresh(self);

        let mut subsumed = 0;
        let mut strengthened = 0;
        let mut budget = (40_000.0 * self.config.simplify.global_timeout_multiplier) as usize;

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
                for &w in &lits {
                    if u == w {
                        continue;
                    }
                    budget = budget.saturating_sub(1);

                    // ¬u → w means u ∨ w holds, subsuming the clause.
                    if stamps.implies(!u, w) {
                        log::trace!(target: targets::STAMP, "Clause at {offset} subsumed by {u} ∨ {w}");
                        self.remove_long_clause(offset);
                        subsumed += 1;
                        continue 'clause_loop;
                    }

                    // ¬u → ¬w means u ∨ ¬w holds, removing w by resolution.
                    if stamps.implies(!u, !w) {
                        log::trace!(target: targets::STAMP, "Removing {w} from clause at {offset}");
                        self.strengthen_long_clause(offset, w);
                        strengthened += 1;
                        continue 'clause_loop;
                    }
                }
            }
        }

        if subsumed + strengthened > 0 {
            log::info!(target: targets::STAMP, "{subsumed} subsumed, {strengthened} strengthened");
        }

        self.stamps = Some(stamps);
    }
}
