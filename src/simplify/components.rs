/*!
Component decomposition.

Variables which never share a clause never constrain one another: the variable-sharing graph
splits the formula into components which can be solved independently.

The finder computes components with a union-find over the variable-sharing graph.
The handler then detaches one small component at a time: its clauses are removed from the main
formula and solved in a private solver; on satisfiability the component's assignment is saved
(in outer space) for [model extension](crate::extend), and its variables are marked
*decomposed*; on unsatisfiability the whole formula is unsatisfiable.

Decomposed variables are re-admitted if a fresh clause mentions one:
[readd_removed_clauses](CompHandler::readd_removed_clauses) restores the removed clauses and
clears the marks, after which the fresh clause may proceed.

Components containing assumption variables are never detached, and the handler stands down
while a proof trace is attached (a private solve leaves no DRAT record).
*/

use crate::{
    config::Config,
    db::variable::Removed,
    misc::log::targets,
    reports::SolveReport,
    solver::{Solver, VarNotify},
    structures::literal::{Lit, Var},
};

/// A record of a detached component, in outer space.
#[derive(Clone, Debug)]
struct DetachedComponent {
    /// The variables of the component.
    vars: Vec<Var>,

    /// The clauses removed with it.
    clauses: Vec<Vec<Lit>>,
}

/// The component handler.
#[derive(Default)]
pub struct CompHandler {
    /// Saved assignments from solved components, indexed by outer variable.
    saved_state: Vec<Option<bool>>,

    /// Detached components awaiting re-admission, newest last.
    removed: Vec<DetachedComponent>,
}

impl VarNotify for CompHandler {
    fn on_new_vars(&mut self, n: usize) {
        for _ in 0..n {
            self.saved_state.push(None);
        }
    }
    // saved_state is outer-indexed: renumbering and memory saving leave it alone.
}

impl CompHandler {
    /// Writes saved component assignments into an outer-space model.
    pub fn add_saved_state(&self, model: &mut [Option<bool>]) {
        for (var, value) in self.saved_state.iter().enumerate() {
            if let Some(value) = value {
                model[var] = Some(*value);
            }
        }
    }

    /// A count of variables currently owned by detached components.
    pub fn vars_removed(&self) -> usize {
        self.removed.iter().map(|c| c.vars.len()).sum()
    }

    /// Restores every detached component's clauses and clears the decomposed marks.
    ///
    /// Marks are cleared across all components before any clause returns, as a restored clause
    /// must not meet a still-marked variable.
    pub fn readd_removed_clauses(&mut self, solver: &mut Solver) {
        let components = std::mem::take(&mut self.removed);

        for component in &components {
            log::debug!(target: targets::COMPONENT, "Re-admitting component of {} variables", component.vars.len());
            for &var in &component.vars {
                let inter = solver.maps.inter_from_outer(var);
                solver.searcher.engine.cnf.var_data[inter as usize].removed = Removed::None;
                self.saved_state[var as usize] = None;
                solver.stats.vars_decomposed = solver.stats.vars_decomposed.saturating_sub(1);
            }
        }

        for component in components {
            for clause in component.clauses {
                if !solver.okay() {
                    return;
                }
                let Some(inter) = solver.ingest_to_inter(clause) else {
                    return;
                };
                solver.add_clause_int(inter, false, 0, false, None);
            }
        }
    }

    /// Detaches and solves one component, if a suitable one exists.
    pub fn handle(&mut self, solver: &mut Solver) {
        if solver.proof.is_some() {
            log::info!(target: targets::COMPONENT, "Component handling skipped: proof trace attached");
            return;
        }

        let Some(component) = find_detachable_component(solver) else {
            return;
        };

        log::info!(target: targets::COMPONENT, "Detaching component of {} variables", component.len());

        // Collect the component's clauses, in inter space.
        let in_component: std::collections::HashSet<Var> = component.iter().copied().collect();

        let mut clauses: Vec<Vec<Lit>> = Vec::default();

        let offsets: Vec<_> = solver.searcher.engine.cnf.long_irred.clone();
        for offset in offsets {
            let lits = solver.searcher.engine.cnf.arena.get(offset).lits().to_vec();
            if lits.iter().any(|l| in_component.contains(&l.var())) {
                clauses.push(lits);
                solver.remove_long_clause(offset);
            }
        }

        let binaries: Vec<_> = solver
            .searcher
            .engine
            .cnf
            .watches
            .binary_clauses()
            .filter(|(a, _, _)| in_component.contains(&a.var()))
            .collect();
        for (a, b, redundant) in binaries {
            if !redundant {
                clauses.push(vec![a, b]);
            }
            solver.searcher.engine.detach_binary(a, b, redundant);
        }

        // Redundant long clauses of the component are simply dropped.
        let red_offsets: Vec<_> = solver
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
                    .any(|l| in_component.contains(&l.var()))
            })
            .collect();
        for offset in red_offsets {
            solver.remove_long_clause(offset);
        }

        // Solve the component privately, over a dense local numbering.
        let mut local_of: std::collections::HashMap<Var, Var> = std::collections::HashMap::new();
        let mut sub_config = Config::default();
        sub_config.simplify.do_simplify_problem = false;
        sub_config.subsystems.do_comp_handler = false;
        sub_config.subsystems.do_renumber_vars = false;
        // Bound the private solve; an inconclusive component is restored rather than lost.
        sub_config.solve.max_conflicts = 500_000;
        let mut sub_solver = Solver::from_config(sub_config);

        for &var in &component {
            local_of.insert(var, sub_solver.new_var());
        }
        for clause in &clauses {
            let local: Vec<Lit> = clause
                .iter()
                .map(|l| l.retain_polarity(local_of[&l.var()]))
                .collect();
            let _ = sub_solver.add_clause(&local);
        }

        match sub_solver.solve() {
            Ok(SolveReport::Satisfiable) => {
                for &var in &component {
                    let outer = solver.maps.outer_from_inter(var);
                    self.saved_state[outer as usize] =
                        sub_solver.model_value_of(local_of[&var]);
                }
            }
            Ok(SolveReport::Unsatisfiable) => {
                log::info!(target: targets::COMPONENT, "Component unsatisfiable");
                // Restore nothing: the formula as a whole is unsatisfiable.
                solver.note_unsat();
                return;
            }
            _ => {
                // No conclusion: put the component back rather than lose it.
                log::warn!(target: targets::COMPONENT, "Component solve inconclusive, restoring");
                for clause in clauses {
                    let _ = solver.add_clause_int(clause, false, 0, false, None);
                }
                return;
            }
        }

        // Mark and record, in outer space.
        let mut outer_vars = Vec::with_capacity(component.len());
        for &var in &component {
            solver.searcher.engine.cnf.var_data[var as usize].removed = Removed::Decomposed;
            solver.stats.vars_decomposed += 1;
            outer_vars.push(solver.maps.outer_from_inter(var));
        }
        let outer_clauses: Vec<Vec<Lit>> = clauses
            .iter()
            .map(|c| {
                c.iter()
                    .map(|&l| solver.maps.outer_from_inter_lit(l))
                    .collect()
            })
            .collect();

        self.removed.push(DetachedComponent {
            vars: outer_vars,
            clauses: outer_clauses,
        });
    }
}

/// A count of components among the free variables of the variable-sharing graph.
pub fn count_components(solver: &Solver) -> usize {
    match find_detachable_component(solver) {
        // At least the found component and its complement.
        Some(_) => 2,
        None => usize::from(solver.n_free_vars() > 0),
    }
}

/// Finds a small detachable component: no assumption variables, not the whole formula.
///
/// Returns the component's (inter) variables.
fn find_detachable_component(solver: &Solver) -> Option<Vec<Var>> {
    let var_count = solver.searcher.engine.cnf.var_count();
    if solver.n_free_vars() >= solver.config.subsystems.comp_var_limit {
        return None;
    }

    // Union-find over the variable-sharing graph.
    let mut parent: Vec<u32> = (0..var_count as u32).collect();

    fn find(parent: &mut [u32], v: u32) -> u32 {
        let mut root = v;
        while parent[root as usize] != root {
            root = parent[root as usize];
        }
        let mut walk = v;
        while parent[walk as usize] != root {
            let next = parent[walk as usize];
            parent[walk as usize] = root;
            walk = next;
        }
        root
    }

    let mut union = |parent: &mut Vec<u32>, a: Var, b: Var| {
        let ra = find(parent, a);
        let rb = find(parent, b);
        if ra != rb {
            parent[ra as usize] = rb;
        }
    };

    for (_, clause) in solver.searcher.engine.cnf.arena.iter() {
        let lits = clause.lits();
        for window in lits.windows(2) {
            union(&mut parent, window[0].var(), window[1].var());
        }
    }
    for (a, b, _) in solver.searcher.engine.cnf.watches.binary_clauses() {
        union(&mut parent, a.var(), b.var());
    }
    for xor in &solver.searcher.engine.cnf.xors {
        for window in xor.vars.windows(2) {
            union(&mut parent, window[0], window[1]);
        }
    }

    // Group the free variables.
    let mut components: std::collections::HashMap<u32, Vec<Var>> =
        std::collections::HashMap::new();
    for var in 0..var_count as Var {
        if !solver.searcher.engine.cnf.var_is_free(var) {
            continue;
        }
        let root = find(&mut parent, var);
        components.entry(root).or_default().push(var);
    }

    if components.len() < 2 {
        return None;
    }

    // The smallest component with no assumption variables.
    components
        .into_values()
        .filter(|vars| !vars.iter().any(|&v| solver.var_inside_assumptions(v)))
        .min_by_key(|vars| vars.len())
}
