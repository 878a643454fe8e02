/*!
Occurrence-based simplification: bounded variable elimination, backward subsumption and
strengthening, implicit-clause cleaning, and blocked clause elimination.

The simplifier holds the *elimination stack*: a record, in outer space, of every clause removed
by variable elimination or blocking, which the [solution extender](crate::extend) replays in
reverse to complete a model.
Outer space is used so that the records survive renumbering untouched.

Elimination is undone on demand: a fresh clause mentioning an eliminated variable causes
[uneliminate](OccSimplifier::uneliminate) to restore the variable's clauses before the fresh
clause proceeds.

Elimination and blocking are skipped while a proof trace is attached, as replaying their undo
steps cannot be expressed in DRAT.
*/

use crate::{
    db::{arena::ClauseOffset, variable::Removed},
    misc::log::targets,
    solver::{Solver, VarNotify},
    structures::literal::{Lit, Var},
};

/// A record of clauses removed from active solving, in outer space.
#[derive(Clone, Debug)]
pub enum ElimRecord {
    /// The clauses of an eliminated variable.
    Elimed {
        /// The eliminated variable.
        var: Var,
        /// Every removed clause; each mentions the variable.
        clauses: Vec<Vec<Lit>>,
    },

    /// A clause removed as blocked on a literal.
    Blocked {
        /// The blocking literal.
        on: Lit,
        /// The removed clause.
        clause: Vec<Lit>,
    },
}

/// The occurrence-based simplifier.
#[derive(Default)]
pub struct OccSimplifier {
    /// Clauses removed by elimination or blocking, in removal order.
    elim_stack: Vec<ElimRecord>,

    /// Whether blocked clause elimination has ever run.
    ///
    /// Once set, no further clauses may be added to the solver.
    blocked_has_run: bool,

    /// A count of variables currently eliminated.
    pub elimed_count: usize,
}

impl VarNotify for OccSimplifier {
    fn on_new_vars(&mut self, _n: usize) {}
    // Records are outer-space: renumbering and memory saving leave them alone.
}

impl OccSimplifier {
    /// Whether blocked clause elimination has ever run.
    pub fn anything_has_been_blocked(&self) -> bool {
        self.blocked_has_run
    }

    /// The elimination stack, oldest first.
    pub(crate) fn elim_stack(&self) -> &[ElimRecord] {
        &self.elim_stack
    }

    pub(crate) fn set_elim_stack(&mut self, stack: Vec<ElimRecord>, blocked: bool) {
        self.elimed_count = stack
            .iter()
            .filter(|r| matches!(r, ElimRecord::Elimed { .. }))
            .count();
        self.elim_stack = stack;
        self.blocked_has_run = blocked;
    }

    /// Dispatches a buffered run of `occ-` tokens.
    pub fn simplify(&mut self, _startup: bool, tokens: &str, solver: &mut Solver) {
        for token in tokens.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            if !solver.okay() {
                return;
            }

            match token {
                "occ-bve" => self.bounded_variable_elimination(solver),
                "occ-backw-sub-str" => self.backward_subsume_strengthen(solver),
                "occ-clean-implicit" => self.clean_implicit(solver),
                "occ-bce" => self.blocked_clause_elimination(solver),
                // occ-gauss is expanded by the scheduler into matrix rediscovery.
                "occ-gauss" => {}
                unknown => {
                    log::warn!(target: targets::OCCURRENCE, "Unhandled occ token '{unknown}'");
                }
            }
        }
    }

    /// Occurrence lists over the current long irredundant clauses, indexed by literal.
    fn build_occurrence(&self, solver: &Solver) -> Vec<Vec<ClauseOffset>> {
        let mut occur: Vec<Vec<ClauseOffset>> =
            vec![Vec::default(); solver.searcher.engine.cnf.var_count() * 2];

        for &offset in &solver.searcher.engine.cnf.long_irred {
            for literal in solver.searcher.engine.cnf.arena.get(offset).lits() {
                occur[literal.index()].push(offset);
            }
        }
        occur
    }

    /// Bounded variable elimination.
    ///
    /// A variable is eliminated when the non-tautological resolvents of its positive and
    /// negative occurrences number no more than the occurrences themselves.
    /// The removed clauses are recorded for the extender, and the variable marked.
    fn bounded_variable_elimination(&mut self, solver: &mut Solver) {
        if solver.proof.is_some() {
            log::info!(target: targets::OCCURRENCE, "Elimination skipped: proof trace attached");
            return;
        }

        const MAX_OCCURRENCES: usize = 20;

        let occur = self.build_occurrence(solver);
        let var_count = solver.searcher.engine.cnf.var_count();

        // Candidates by product of occurrence counts, cheapest first.
        let mut candidates: Vec<(usize, Var)> = (0..var_count as Var)
            .filter(|&v| {
                solver.searcher.engine.cnf.var_is_free(v)
                    && !solver.var_inside_assumptions(v)
            })
            .map(|v| {
                let pos = occur[Lit::new(v, true).index()].len();
                let neg = occur[Lit::new(v, false).index()].len();
                (pos * neg, v)
            })
            .collect();
        candidates.sort_unstable();

        let budget = ((candidates.len() as f64)
            * solver.config.simplify.var_elim_ratio_per_iter
            * solver.config.simplify.global_timeout_multiplier) as usize;

        let mut eliminated = 0;
        for (_, var) in candidates.into_iter().take(budget.max(16)) {
            if !solver.okay() {
                return;
            }
            if !solver.searcher.engine.cnf.var_is_free(var) {
                continue;
            }
            if self.try_eliminate(var, solver, MAX_OCCURRENCES) {
                eliminated += 1;
            }
        }

        log::info!(target: targets::OCCURRENCE, "Eliminated {eliminated} variables");
    }

    /// Attempts to eliminate a single variable. Returns true on elimination.
    fn try_eliminate(&mut self, var: Var, solver: &mut Solver, max_occ: usize) -> bool {
        let pos_lit = Lit::new(var, true);
        let neg_lit = Lit::new(var, false);

        // Gather irredundant occurrences: long clauses and binaries.
        let mut pos: Vec<Vec<Lit>> = Vec::default();
        let mut neg: Vec<Vec<Lit>> = Vec::default();
        let mut pos_offsets: Vec<ClauseOffset> = Vec::default();
        let mut neg_offsets: Vec<ClauseOffset> = Vec::default();

        for &offset in &solver.searcher.engine.cnf.long_irred {
            let clause = solver.searcher.engine.cnf.arena.get(offset);
            if clause.lits().contains(&pos_lit) {
                pos.push(clause.lits().to_vec());
                pos_offsets.push(offset);
            } else if clause.lits().contains(&neg_lit) {
                neg.push(clause.lits().to_vec());
                neg_offsets.push(offset);
            }
        }

        let mut pos_bins: Vec<(Lit, Lit)> = Vec::default();
        let mut neg_bins: Vec<(Lit, Lit)> = Vec::default();
        for (a, b, redundant) in solver.searcher.engine.cnf.watches.binary_clauses() {
            if redundant {
                continue;
            }
            if a == pos_lit || b == pos_lit {
                pos.push(vec![a, b]);
                pos_bins.push((a, b));
            } else if a == neg_lit || b == neg_lit {
                neg.push(vec![a, b]);
                neg_bins.push((a, b));
            }
        }

        if pos.len() + neg.len() > max_occ || pos.is_empty() && neg.is_empty() {
            return false;
        }

        // Resolve each positive occurrence against each negative.
        let mut resolvents: Vec<Vec<Lit>> = Vec::default();
        for p in &pos {
            for n in &neg {
                if let Some(resolvent) = resolve_on(p, n, var) {
                    resolvents.push(resolvent);
                }
            }
        }

        if resolvents.len() > pos.len() + neg.len() {
            return false;
        }

        log::debug!(target: targets::OCCURRENCE, "Eliminating {var}: {} occurrences, {} resolvents", pos.len() + neg.len(), resolvents.len());

        // Record the removed clauses in outer space before anything changes.
        let to_outer = |lits: &[Lit]| -> Vec<Lit> {
            lits.iter()
                .map(|&l| solver.maps.outer_from_inter_lit(l))
                .collect()
        };
        let record = ElimRecord::Elimed {
            var: solver.maps.outer_from_inter(var),
            clauses: pos.iter().chain(neg.iter()).map(|c| to_outer(c)).collect(),
        };

        // Add resolvents, then remove the originals.
        for resolvent in resolvents {
            solver.add_clause_int(resolvent, false, 0, true, None);
            if !solver.okay() {
                return false;
            }
        }

        // A unit resolvent may have propagated a value onto the variable through its own
        // clauses; root-level cleaning absorbs those clauses instead.
        if !solver.searcher.engine.cnf.var_is_free(var) {
            return false;
        }

        for offset in pos_offsets.into_iter().chain(neg_offsets) {
            solver.remove_long_clause(offset);
        }
        for (a, b) in pos_bins.into_iter().chain(neg_bins) {
            solver.searcher.engine.detach_binary(a, b, false);
        }

        // Redundant clauses of the variable are dropped without record.
        let red_offsets: Vec<ClauseOffset> = solver
            .searcher
            .engine
            .cnf
            .long_red
            .iter()
            .flatten()
            .copied()
            .filter(|&o| {
                solver
                    .searcher
                    .engine
                    .cnf
                    .arena
                    .get(o)
                    .lits()
                    .iter()
                    .any(|l| l.var() == var)
            })
            .collect();
        for offset in red_offsets {
            solver.remove_long_clause(offset);
        }
        let red_bins: Vec<(Lit, Lit)> = solver
            .searcher
            .engine
            .cnf
            .watches
            .binary_clauses()
            .filter(|(a, b, red)| *red && (a.var() == var || b.var() == var))
            .map(|(a, b, _)| (a, b))
            .collect();
        for (a, b) in red_bins {
            solver.searcher.engine.detach_binary(a, b, true);
        }

        self.elim_stack.push(record);
        self.elimed_count += 1;
        solver.searcher.engine.cnf.var_data[var as usize].removed = Removed::Elimed;
        solver.stats.vars_eliminated += 1;

        true
    }

    /// Undoes the elimination of an (inter) variable, restoring its clauses.
    ///
    /// Returns false if restoration establishes unsatisfiability.
    pub fn uneliminate(&mut self, var: Var, solver: &mut Solver) -> bool {
        let outer_var = solver.maps.outer_from_inter(var);
        log::debug!(target: targets::OCCURRENCE, "Unelimination of {outer_var}");

        solver.searcher.engine.cnf.var_data[var as usize].removed = Removed::None;
        self.elimed_count = self.elimed_count.saturating_sub(1);

        let mut restored: Vec<Vec<Lit>> = Vec::default();
        self.elim_stack.retain(|record| match record {
            ElimRecord::Elimed { var: v, clauses } if *v == outer_var => {
                restored.extend(clauses.iter().cloned());
                false
            }
            _ => true,
        });

        for clause in restored {
            if !self.readd_outer_clause(clause, solver) {
                return false;
            }
        }
        solver.okay()
    }

    /// Re-adds a stored outer-space clause, following the ingestion pipeline from the
    /// substitution step onwards. Nested eliminated variables are restored recursively.
    fn readd_outer_clause(&mut self, outer: Vec<Lit>, solver: &mut Solver) -> bool {
        let substituted: Vec<Lit> = outer
            .iter()
            .map(|&l| solver.replacer.lit_replaced_with_outer(l))
            .collect();
        let inter: Vec<Lit> = substituted
            .iter()
            .map(|&l| solver.maps.inter_from_outer_lit(l))
            .collect();

        let any_decomposed = inter.iter().any(|l| {
            solver.searcher.engine.cnf.var_data[l.var() as usize].removed == Removed::Decomposed
        });
        if any_decomposed {
            let mut comp = solver.comp.take();
            if let Some(handler) = comp.as_mut() {
                handler.readd_removed_clauses(solver);
            }
            solver.comp = comp;
        }

        for literal in &inter {
            if solver.searcher.engine.cnf.var_data[literal.var() as usize].removed
                == Removed::Elimed
            {
                if !self.uneliminate(literal.var(), solver) {
                    return false;
                }
            }
        }

        if !solver.okay() {
            return false;
        }
        solver.add_clause_int(inter, false, 0, true, None);
        solver.okay()
    }

    /// Backward subsumption and (single-literal) strengthening among long irredundant clauses.
    fn backward_subsume_strengthen(&mut self, solver: &mut Solver) {
        let mut budget =
            (80_000.0 * solver.config.simplify.global_timeout_multiplier) as usize;

        let offsets: Vec<ClauseOffset> = solver.searcher.engine.cnf.long_irred.clone();

        for &offset in &offsets {
            if budget == 0 || !solver.okay() {
                break;
            }
            if !solver.searcher.engine.cnf.arena.is_allocated(offset) {
                continue;
            }

            let lits = solver.searcher.engine.cnf.arena.get(offset).lits().to_vec();

            for &other_offset in &offsets {
                budget = budget.saturating_sub(1);
                if budget == 0 {
                    break;
                }
                if other_offset == offset
                    || !solver.searcher.engine.cnf.arena.is_allocated(other_offset)
                    || !solver.searcher.engine.cnf.arena.is_allocated(offset)
                {
                    continue;
                }

                let other = solver.searcher.engine.cnf.arena.get(other_offset).lits();

                if subsumes(&lits, other) {
                    log::trace!(target: targets::SUBSUMPTION, "Clause at {offset} subsumes {other_offset}");
                    solver.remove_long_clause(other_offset);
                    continue;
                }

                // Self-subsuming resolution: all of `lits` in `other` except one, negated.
                if let Some(pivot) = strengthening_pivot(&lits, other) {
                    log::trace!(target: targets::SUBSUMPTION, "Strengthening {other_offset} by removing {pivot}");
                    solver.strengthen_long_clause(other_offset, pivot);
                    if !solver.okay() {
                        return;
                    }
                }
            }
        }
    }

    /// Removes root-satisfied binaries, binaries with root-false literals, and duplicates.
    fn clean_implicit(&mut self, solver: &mut Solver) {
        let binaries: Vec<(Lit, Lit, bool)> = solver
            .searcher
            .engine
            .cnf
            .watches
            .binary_clauses()
            .collect();

        let mut seen: std::collections::HashSet<(Lit, Lit)> = std::collections::HashSet::new();

        for (a, b, redundant) in binaries {
            if !solver.okay() {
                return;
            }

            let value_a = solver.searcher.engine.value_of_lit(a);
            let value_b = solver.searcher.engine.value_of_lit(b);

            if value_a == Some(true) || value_b == Some(true) {
                solver.searcher.engine.detach_binary(a, b, redundant);
                if let Some(trace) = solver.proof.as_mut() {
                    trace.delete_clause(&[a, b]);
                }
                continue;
            }

            if value_a == Some(false) || value_b == Some(false) {
                let unit = if value_a == Some(false) { b } else { a };
                solver.searcher.engine.detach_binary(a, b, redundant);
                if let Some(trace) = solver.proof.as_mut() {
                    trace.add_clause(&[unit]);
                    trace.delete_clause(&[a, b]);
                }
                solver.fully_enqueue_this(unit);
                continue;
            }

            if !seen.insert((a, b)) {
                solver.searcher.engine.detach_binary(a, b, redundant);
                if let Some(trace) = solver.proof.as_mut() {
                    trace.delete_clause(&[a, b]);
                }
            }
        }
    }

    /// Blocked clause elimination over long irredundant clauses.
    ///
    /// A clause is blocked on one of its literals when every resolution on that literal is a
    /// tautology; such a clause can be removed, with the extender repairing the model later.
    fn blocked_clause_elimination(&mut self, solver: &mut Solver) {
        if !solver.config.subsystems.do_blocked_clause {
            return;
        }
        if solver.proof.is_some() {
            log::info!(target: targets::OCCURRENCE, "Blocking skipped: proof trace attached");
            return;
        }

        let occur = self.build_occurrence(solver);
        let offsets: Vec<ClauseOffset> = solver.searcher.engine.cnf.long_irred.clone();
        let mut blocked = 0;

        'clause_loop: for offset in offsets {
            if !solver.searcher.engine.cnf.arena.is_allocated(offset) {
                continue;
            }
            let lits = solver.searcher.engine.cnf.arena.get(offset).lits().to_vec();

            if lits.iter().any(|l| solver.var_inside_assumptions(l.var())) {
                continue;
            }

            for &candidate in &lits {
                // Binary occurrences spoil blocking cheaply, check them first.
                let mut all_tautological = true;
                for watcher in solver.searcher.engine.cnf.watches.of(!candidate) {
                    if let crate::db::watches::Watcher::Binary { other, redundant } = watcher {
                        if *redundant {
                            continue;
                        }
                        if !lits.contains(&!*other) {
                            all_tautological = false;
                            break;
                        }
                    }
                }
                if !all_tautological {
                    continue;
                }

                for &other_offset in &occur[(!candidate).index()] {
                    if !solver.searcher.engine.cnf.arena.is_allocated(other_offset)
                        || other_offset == offset
                    {
                        continue;
                    }
                    let other = solver.searcher.engine.cnf.arena.get(other_offset).lits();
                    let tautological = other
                        .iter()
                        .any(|&l| l.var() != candidate.var() && lits.contains(&!l));
                    if !tautological {
                        all_tautological = false;
                        break;
                    }
                }

                if all_tautological {
                    let record = ElimRecord::Blocked {
                        on: solver.maps.outer_from_inter_lit(candidate),
                        clause: lits
                            .iter()
                            .map(|&l| solver.maps.outer_from_inter_lit(l))
                            .collect(),
                    };
                    self.elim_stack.push(record);
                    self.blocked_has_run = true;
                    blocked += 1;

                    solver.searcher.engine.detach_clause(offset);
                    solver.searcher.engine.cnf.unstore_offset(offset);
                    solver.searcher.engine.cnf.arena.free(offset);
                    continue 'clause_loop;
                }
            }
        }

        if blocked > 0 {
            log::info!(target: targets::OCCURRENCE, "Blocked {blocked} clauses");
        }
    }
}

/// The resolvent of two clauses on `var`, or `None` when tautological.
fn resolve_on(p: &[Lit], n: &[Lit], var: Var) -> Option<Vec<Lit>> {
    let mut resolvent: Vec<Lit> = p
        .iter()
        .chain(n.iter())
        .copied()
        .filter(|l| l.var() != var)
        .collect();
    resolvent.sort_unstable();
    resolvent.dedup();

    for window in resolvent.windows(2) {
        if window[0].var() == window[1].var() {
            return None;
        }
    }
    Some(resolvent)
}

/// Whether `a` subsumes `b`: every literal of `a` appears in `b`.
fn subsumes(a: &[Lit], b: &[Lit]) -> bool {
    a.len() <= b.len() && a.iter().all(|l| b.contains(l))
}

/// If all of `a` appears in `b` except one literal appearing negated, that negated literal ---
/// the literal resolution would remove from `b`.
fn strengthening_pivot(a: &[Lit], b: &[Lit]) -> Option<Lit> {
    if a.len() > b.len() {
        return None;
    }

    let mut pivot: Option<Lit> = None;
    for literal in a {
        if b.contains(literal) {
            continue;
        }
        if b.contains(&!*literal) {
            match pivot {
                None => pivot = Some(!*literal),
                Some(_) => return None,
            }
        } else {
            return None;
        }
    }
    pivot
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lits(ints: &[i32]) -> Vec<Lit> {
        ints.iter()
            .map(|&i| Lit::new((i.unsigned_abs() - 1) as Var, i > 0))
            .collect()
    }

    #[test]
    fn resolvents() {
        let p = lits(&[1, 2, 3]);
        let n = lits(&[-1, 4]);
        assert_eq!(resolve_on(&p, &n, 0), Some(lits(&[2, 3, 4])));

        let taut = lits(&[-1, -2]);
        assert_eq!(resolve_on(&p, &taut, 0), None);
    }

    #[test]
    fn subsumption_check() {
        assert!(subsumes(&lits(&[1, 2]), &lits(&[1, 2, 3])));
        assert!(!subsumes(&lits(&[1, 4]), &lits(&[1, 2, 3])));
    }

    #[test]
    fn strengthening_check() {
        assert_eq!(
            strengthening_pivot(&lits(&[1, 2]), &lits(&[-1, 2, 3])),
            Some(Lit::new(0, false))
        );
        assert_eq!(strengthening_pivot(&lits(&[1, 4]), &lits(&[-1, 2, 3])), None);
    }
}
