/*!
Equivalent-literal discovery and replacement.

Two literals forced equal appear in a common strongly connected component of the binary
implication graph.
The pass computes components over the (doubled) literal graph, and for each component of two or
more literals merges every member into a representative: the member literals' variables are
marked replaced, clauses mentioning them are rewritten onto the representative, and the
equivalence is recorded in an outer-space table which survives renumbering.

A component containing both a literal and its negation is a contradiction, and establishes
unsatisfiability.

The table is consulted by clause ingestion (every incoming literal is substituted by its
representative) and by the [solution extender](crate::extend), which copies the
representative's value back onto the merged variables.

Parity constraints are *not* rewritten here; they may retain replaced variables between passes,
and the [Gaussian pass](crate::simplify::matrix) refreshes them before use.
*/

use crate::{
    db::variable::Removed,
    misc::log::targets,
    solver::{Solver, VarNotify},
    structures::literal::{Lit, Var},
};

/// The equivalence table, in outer space.
///
/// `table[v]` is the literal the positive literal of `v` is replaced with; an entry of the
/// variable itself means no replacement.
#[derive(Clone, Debug, Default)]
pub struct VarReplacer {
    table: Vec<Lit>,

    /// A count of variables currently replaced.
    pub replaced_count: usize,
}

impl VarNotify for VarReplacer {
    fn on_new_vars(&mut self, n: usize) {
        for _ in 0..n {
            let var = self.table.len() as Var;
            self.table.push(Lit::new(var, true));
        }
    }
    // The table is outer-indexed: renumbering and memory saving leave it alone.
}

impl VarReplacer {
    /// The current representative of an outer literal. Idempotent.
    pub fn lit_replaced_with_outer(&self, literal: Lit) -> Lit {
        let mut current = literal;
        loop {
            let entry = self.table[current.var() as usize];
            if entry.var() == current.var() {
                return current;
            }
            current = entry ^ !current.polarity();
        }
    }

    /// Records that `replaced` is equal to `representative`, both outer literals.
    fn record(&mut self, replaced: Lit, representative: Lit) {
        debug_assert_ne!(replaced.var(), representative.var());
        // Normalise onto the positive literal of the replaced variable.
        self.table[replaced.var() as usize] = representative ^ !replaced.polarity();
        self.replaced_count += 1;
    }

    /// The outer variables currently replaced by others.
    pub fn replaced_vars(&self) -> Vec<Var> {
        self.table
            .iter()
            .enumerate()
            .filter(|(var, entry)| entry.var() as usize != *var)
            .map(|(var, _)| var as Var)
            .collect()
    }

    /// The outer variables currently standing as representatives of others.
    pub fn replacing_vars(&self) -> Vec<Var> {
        let mut reps: Vec<Var> = self
            .table
            .iter()
            .enumerate()
            .filter(|(var, entry)| entry.var() as usize != *var)
            .map(|(_, entry)| entry.var())
            .collect();
        reps.sort_unstable();
        reps.dedup();
        reps
    }

    /// The outer variables replaced by `representative`, with the sign relating each to it.
    pub fn vars_replacing(&self, representative: Var) -> Vec<(Var, bool)> {
        self.table
            .iter()
            .enumerate()
            .filter(|(var, entry)| {
                entry.var() == representative && *var != representative as usize
            })
            .map(|(var, entry)| (var as Var, entry.polarity()))
            .collect()
    }

    /// Every current equivalence, as outer literal pairs `(replaced, representative)`.
    pub fn all_binary_xors_outer(&self) -> Vec<(Lit, Lit)> {
        self.table
            .iter()
            .enumerate()
            .filter(|(var, entry)| entry.var() as usize != *var)
            .map(|(var, entry)| (Lit::new(var as Var, true), *entry))
            .collect()
    }

    pub(crate) fn table(&self) -> &[Lit] {
        &self.table
    }

    pub(crate) fn set_table(&mut self, table: Vec<Lit>, replaced_count: usize) {
        self.table = table;
        self.replaced_count = replaced_count;
    }
}

impl Solver {
    /// Runs component discovery over the binary implication graph and merges what it finds,
    /// provided the gain reaches 0.1% of the free variables.
    pub(crate) fn scc_vrepl(&mut self) {
        if !self.config.subsystems.do_find_and_replace_eq_lits || !self.ok {
            return;
        }
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        let components = self.binary_implication_sccs();

        // Candidate merges, as (replaced, representative) inter literal pairs.
        let mut merges: Vec<(Lit, Lit)> = Vec::default();
        for component in &components {
            let mut members = component.clone();
            members.sort_unstable();

            for window in members.windows(2) {
                if window[0].var() == window[1].var() {
                    log::info!(target: targets::REPLACE, "Literal and negation in one component");
                    self.note_unsat();
                    return;
                }
            }

            let representative = members[0];
            for &member in &members[1..] {
                merges.push((member, representative));
            }
        }

        let required = (self.n_free_vars() as f64 * 0.001).floor() as usize;
        if merges.len() < required.max(1) {
            log::debug!(target: targets::REPLACE, "Only {} equivalences found, skipping", merges.len());
            return;
        }

        log::info!(target: targets::REPLACE, "Merging {} literals", merges.len());

        for (member, representative) in merges {
            if !self.ok {
                return;
            }
            // A variable merged earlier in this round resolves through the table.
            let member_outer = self.maps.outer_from_inter_lit(member);
            let rep_outer = self
                .replacer
                .lit_replaced_with_outer(self.maps.outer_from_inter_lit(representative));

            if self.replacer.lit_replaced_with_outer(member_outer) != member_outer
                || member_outer.var() == rep_outer.var()
            {
                continue;
            }

            // Valued variables are absorbed by root-level cleaning instead.
            if self.searcher.engine.cnf.value_of(member.var()).is_some()
                || self
                    .searcher
                    .engine
                    .cnf
                    .value_of(self.maps.inter_from_outer_lit(rep_outer).var())
                    .is_some()
            {
                continue;
            }

            self.replacer.record(member_outer, rep_outer);
            self.searcher.engine.cnf.var_data[member.var() as usize].removed = Removed::Replaced;
            self.stats.vars_replaced += 1;

            self.rewrite_clauses_of(member.var());
        }

        self.update_assumptions_after_varreplace();
    }

    /// Rewrites every clause mentioning the (inter) variable through the equivalence table.
    fn rewrite_clauses_of(&mut self, var: Var) {
        // Long clauses.
        let offsets: Vec<_> = self.searcher.engine.cnf.all_long_offsets().collect();
        for offset in offsets {
            if !self.ok {
                return;
            }
            if !self.searcher.engine.cnf.arena.is_allocated(offset) {
                continue;
            }
            let clause = self.searcher.engine.cnf.arena.get(offset);
            if !clause.lits().iter().any(|l| l.var() == var) {
                continue;
            }

            let old_lits = clause.lits().to_vec();
            let redundant = clause.redundant;
            let glue = clause.glue;
            let new_lits: Vec<Lit> = old_lits
                .iter()
                .map(|&l| self.lit_replaced_with_inter(l))
                .collect();

            if let Some(trace) = self.proof.as_mut() {
                trace.add_clause(&new_lits);
                trace.delete_clause(&old_lits);
            }

            self.searcher.engine.detach_clause(offset);
            self.searcher.engine.cnf.unstore_offset(offset);
            self.searcher.engine.cnf.arena.free(offset);

            let mut final_lits = Vec::default();
            self.add_clause_int(new_lits.clone(), redundant, glue, false, Some(&mut final_lits));
            if self.proof.is_some() && final_lits != new_lits {
                if !final_lits.is_empty() {
                    if let Some(trace) = self.proof.as_mut() {
                        trace.add_clause(&final_lits);
                    }
                }
                if let Some(trace) = self.proof.as_mut() {
                    trace.delete_clause(&new_lits);
                }
            }
        }

        // Binary clauses.
        let binaries: Vec<_> = self
            .searcher
            .engine
            .cnf
            .watches
            .binary_clauses()
            .filter(|(a, b, _)| a.var() == var || b.var() == var)
            .collect();

        for (a, b, redundant) in binaries {
            if !self.ok {
                return;
            }
            let new_a = self.lit_replaced_with_inter(a);
            let new_b = self.lit_replaced_with_inter(b);

            if let Some(trace) = self.proof.as_mut() {
                trace.add_clause(&[new_a, new_b]);
                trace.delete_clause(&[a, b]);
            }

            self.searcher.engine.detach_binary(a, b, redundant);
            self.add_clause_int(vec![new_a, new_b], redundant, 2, false, None);
        }
    }

    /// The current representative of an inter literal.
    pub(crate) fn lit_replaced_with_inter(&self, literal: Lit) -> Lit {
        let outer = self.maps.outer_from_inter_lit(literal);
        let replaced = self.replacer.lit_replaced_with_outer(outer);
        self.maps.inter_from_outer_lit(replaced)
    }

    /// Strongly connected components of the binary implication graph, over inter literals.
    /// Only components of two or more literals are returned.
    fn binary_implication_sccs(&self) -> Vec<Vec<Lit>> {
        let node_count = self.searcher.engine.cnf.var_count() * 2;

        // Edges ¬a → b and ¬b → a for each binary clause (a b).
        let mut edges: Vec<Vec<u32>> = vec![Vec::default(); node_count];
        for (a, b, _) in self.searcher.engine.cnf.watches.binary_clauses() {
            if self.searcher.engine.cnf.value_of(a.var()).is_some()
                || self.searcher.engine.cnf.value_of(b.var()).is_some()
            {
                continue;
            }
            edges[(!a).index()].push(b.index() as u32);
            edges[(!b).index()].push(a.index() as u32);
        }

        // Iterative Tarjan.
        let mut index_of: Vec<Option<u32>> = vec![None; node_count];
        let mut low: Vec<u32> = vec![0; node_count];
        let mut on_stack: Vec<bool> = vec![false; node_count];
        let mut stack: Vec<u32> = Vec::default();
        let mut next_index: u32 = 0;
        let mut components: Vec<Vec<Lit>> = Vec::default();

        for root in 0..node_count as u32 {
            if index_of[root as usize].is_some() || edges[root as usize].is_empty() {
                continue;
            }

            let mut call_stack: Vec<(u32, usize)> = vec![(root, 0)];

            while let Some(&(node, edge_at)) = call_stack.last() {
                if index_of[node as usize].is_none() {
                    index_of[node as usize] = Some(next_index);
                    low[node as usize] = next_index;
                    next_index += 1;
                    stack.push(node);
                    on_stack[node as usize] = true;
                }

                if let Some(&successor) = edges[node as usize].get(edge_at) {
                    call_stack.last_mut().unwrap().1 += 1;
                    match index_of[successor as usize] {
                        None => call_stack.push((successor, 0)),
                        Some(successor_index) => {
                            if on_stack[successor as usize] {
                                low[node as usize] =
                                    low[node as usize].min(successor_index);
                            }
                        }
                    }
                } else {
                    // Node complete.
                    if low[node as usize] == index_of[node as usize].unwrap() {
                        let mut component = Vec::default();
                        loop {
                            let member = stack.pop().unwrap();
                            on_stack[member as usize] = false;
                            component.push(Lit::from_index(member as usize));
                            if member == node {
                                break;
                            }
                        }
                        if component.len() >= 2 {
                            components.push(component);
                        }
                    }

                    call_stack.pop();
                    if let Some(&(parent, _)) = call_stack.last() {
                        low[parent as usize] = low[parent as usize].min(low[node as usize]);
                    }
                }
            }
        }

        components
    }
}
