/*!
Model extraction, verification, and optional undefining.

On a satisfiable conclusion the trail's valuation covers only the inter variables still in
play; everything simplification removed is reconstructed:
1. The valuation is translated to outer numbering.
2. Saved component assignments are written in.
3. The [extender](crate::extend) reverses eliminations and blockings in reverse order, and
   copies representatives onto replaced variables.
4. Auxiliary variables are hidden, projecting to the outside model.
5. The model is verified against every clause tier, the binaries, the parity constraints, and
   the assumptions. Verification failure is a corrupt state, and fatal.

[undefine](crate::solver::Solver::undefine) is an optional post-processor which greedily clears
variables whose values are not needed: a variable is flippable iff no clause is satisfied only
through it.
*/

use crate::{
    db::variable::Removed,
    extend,
    misc::log::targets,
    structures::literal::{Lit, Var},
};

use super::Solver;

impl Solver {
    /// Builds, extends, verifies, and publishes the model. See the module documentation.
    pub(crate) fn extend_solution(&mut self) {
        let n_outer = self.maps.n_outer();

        // Inter valuation → outer model.
        let mut outer_model: Vec<Option<bool>> = vec![None; n_outer];
        for inter in 0..self.searcher.engine.cnf.var_count() {
            if let Some(value) = self.searcher.engine.cnf.assigns[inter] {
                let outer = self.maps.outer_from_inter(inter as Var);
                outer_model[outer as usize] = Some(value);
            }
        }

        if let Some(comp) = self.comp.as_ref() {
            comp.add_saved_state(&mut outer_model);
        }

        let empty: &[crate::simplify::occurrence::ElimRecord] = &[];
        let elim_stack = match self.occ.as_ref() {
            Some(occ) => occ.elim_stack(),
            None => empty,
        };
        extend::extend_model(&mut outer_model, elim_stack, &self.replacer);

        self.full_model = outer_model;

        // Hide the auxiliaries.
        self.model = (0..self.maps.n_outside() as Var)
            .map(|outside| self.full_model[self.maps.outer_from_outside(outside) as usize])
            .collect();

        self.verify_model();
    }

    /// The model value of an outer literal, against the full (outer) model.
    fn full_model_value(&self, literal: Lit) -> Option<bool> {
        self.full_model[literal.var() as usize].map(|value| value == literal.polarity())
    }

    /// Every clause, binary, parity constraint, and assumption must hold on the model.
    fn verify_model(&self) {
        let inter_satisfied = |lits: &[Lit]| {
            lits.iter().any(|&l| {
                self.full_model_value(self.maps.outer_from_inter_lit(l)) == Some(true)
            })
        };

        for (offset, clause) in self.searcher.engine.cnf.arena.iter() {
            assert!(
                inter_satisfied(clause.lits()),
                "corrupt state: unsatisfied clause at {offset}: {}",
                clause.as_dimacs()
            );
        }

        for (a, b, _) in self.searcher.engine.cnf.watches.binary_clauses() {
            assert!(
                inter_satisfied(&[a, b]),
                "corrupt state: unsatisfied binary {a} {b}"
            );
        }

        for xor in &self.searcher.engine.cnf.xors {
            let holds = xor.satisfied_by(|v| {
                let outer = self.maps.outer_from_inter(v);
                self.full_model[outer as usize]
            });
            assert!(holds, "corrupt state: unsatisfied parity constraint {xor}");
        }

        for pair in &self.assumptions {
            assert!(
                self.model_value_of_lit(pair.outside) == Some(true),
                "corrupt state: assumption {} does not hold on the model",
                pair.outside
            );
        }

        log::info!(target: targets::EXTEND, "Model verified");
    }

    /// Greedily clears model values which no clause depends on.
    ///
    /// `candidate_vars` are outside variables assigned above the root level (typically the
    /// decision variables of the final trail).
    /// When an independent-variables set was supplied, only candidates in it survive: a
    /// candidate earns one mark from the trail and one from the set, and only doubly-marked
    /// variables may be unset.
    /// Variables standing as equivalence representatives are never unset.
    ///
    /// Returns the count of variables unset.
    pub fn undefine(&mut self, candidate_vars: &[Var]) -> u32 {
        let n_outer = self.maps.n_outer();

        // Marks: 1 from the trail, +1 from the independent set; 2 survives the filter.
        let mut can_be_unset: Vec<u8> = vec![0; n_outer];
        let mut unset_budget: u32 = 0;

        for &outside in candidate_vars {
            let outer = self.maps.outer_from_outside(outside);
            if self.full_model[outer as usize].is_some()
                && !self.var_inside_assumptions(self.maps.inter_from_outer(outer))
            {
                can_be_unset[outer as usize] += 1;
                if self.independent_vars.is_none() {
                    unset_budget += 1;
                }
            }
        }

        if let Some(independent) = self.independent_vars.clone() {
            for outside in independent {
                if (outside as usize) >= self.maps.n_outside() {
                    log::warn!(target: targets::EXTEND, "Independent variable {outside} was never declared");
                    continue;
                }
                let outer = self.maps.outer_from_outside(outside);
                can_be_unset[outer as usize] += 1;
                if can_be_unset[outer as usize] == 2 {
                    unset_budget += 1;
                }
            }

            // Only those marked from both sides remain candidates.
            for mark in can_be_unset.iter_mut() {
                if *mark < 2 {
                    *mark = 0;
                }
            }
        }

        for representative in self.replacer.replacing_vars() {
            if can_be_unset[representative as usize] != 0 {
                can_be_unset[representative as usize] = 0;
                unset_budget = unset_budget.saturating_sub(1);
            }
        }

        // Clauses in outer space, irredundant only: redundant clauses are implied.
        let mut clauses: Vec<Vec<Lit>> = Vec::default();
        for &offset in &self.searcher.engine.cnf.long_irred {
            clauses.push(
                self.searcher
                    .engine
                    .cnf
                    .arena
                    .get(offset)
                    .lits()
                    .iter()
                    .map(|&l| self.maps.outer_from_inter_lit(l))
                    .collect(),
            );
        }
        for (a, b, redundant) in self.searcher.engine.cnf.watches.binary_clauses() {
            if !redundant {
                clauses.push(vec![
                    self.maps.outer_from_inter_lit(a),
                    self.maps.outer_from_inter_lit(b),
                ]);
            }
        }

        // Greedy fixing: while some clause is satisfied only through unset candidates, fix the
        // candidate satisfying the most such clauses.
        let mut satisfies: Vec<u32> = vec![0; n_outer];
        loop {
            if unset_budget == 0 {
                break;
            }

            satisfies.iter_mut().for_each(|s| *s = 0);
            let mut must_fix = false;

            for clause in &clauses {
                let mut sole_support: Vec<Var> = Vec::default();
                let mut safely_satisfied = false;

                for &literal in clause {
                    if self.full_model_value(literal) == Some(true) {
                        if can_be_unset[literal.var() as usize] != 0 {
                            sole_support.push(literal.var());
                        } else {
                            safely_satisfied = true;
                            break;
                        }
                    }
                }

                if safely_satisfied {
                    continue;
                }

                match sole_support.len() {
                    0 => {}
                    1 => {
                        // The lone supporter is pinned.
                        can_be_unset[sole_support[0] as usize] = 0;
                        unset_budget = unset_budget.saturating_sub(1);
                    }
                    _ => {
                        must_fix = true;
                        for var in sole_support {
                            satisfies[var as usize] += 1;
                        }
                    }
                }
            }

            if !must_fix {
                break;
            }

            // Fix the candidate carrying the most clauses.
            let mut best: Option<Var> = None;
            for var in 0..n_outer as Var {
                if can_be_unset[var as usize] != 0
                    && best.map_or(true, |b| satisfies[var as usize] >= satisfies[b as usize])
                {
                    best = Some(var);
                }
            }
            match best {
                Some(var) => {
                    can_be_unset[var as usize] = 0;
                    unset_budget = unset_budget.saturating_sub(1);
                }
                None => break,
            }
        }

        // Whatever survived is unset.
        let mut cleared = 0;
        for outer in 0..n_outer {
            if can_be_unset[outer] != 0 {
                self.full_model[outer] = None;
                cleared += 1;
            }
        }

        self.model = (0..self.maps.n_outside() as Var)
            .map(|outside| self.full_model[self.maps.outer_from_outside(outside) as usize])
            .collect();

        log::info!(target: targets::EXTEND, "{cleared} variables unset");
        cleared
    }

    /// The literals proven at the root level, in outside numbering.
    ///
    /// Replaced variables mirror their representative's value, and auxiliaries are hidden.
    pub fn get_zero_assigned_lits(&self) -> Vec<Lit> {
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        let mut lits: Vec<Lit> = Vec::default();

        for inter in 0..self.searcher.engine.cnf.var_count() as Var {
            let Some(value) = self.searcher.engine.cnf.value_of(inter) else {
                continue;
            };
            let outer_lit = self.maps.outer_from_inter_lit(Lit::new(inter, value));

            if let Some(outside) = self.maps.outside_from_outer(outer_lit.var()) {
                lits.push(outer_lit.retain_polarity(outside));
            }

            // Everything the variable replaces has also been decided.
            for (replaced, polarity) in self.replacer.vars_replacing(outer_lit.var()) {
                if let Some(outside) = self.maps.outside_from_outer(replaced) {
                    let value_of_replaced = outer_lit.polarity() == polarity;
                    lits.push(Lit::new(outside, value_of_replaced));
                }
            }
        }

        lits.sort_unstable();
        lits.dedup();
        lits
    }

    /// Every equivalence the replacer holds, as outside literal pairs.
    pub fn get_all_binary_xors(&self) -> Vec<(Lit, Lit)> {
        self.replacer
            .all_binary_xors_outer()
            .iter()
            .filter_map(|&(replaced, representative)| {
                let r = self.maps.outside_from_outer(replaced.var())?;
                let s = self.maps.outside_from_outer(representative.var())?;
                Some((
                    replaced.retain_polarity(r),
                    representative.retain_polarity(s),
                ))
            })
            .collect()
    }

    /// Whether the variable is currently eliminated, replaced, or decomposed.
    pub fn var_is_removed(&self, outside: Var) -> bool {
        let inter = self
            .maps
            .inter_from_outer(self.maps.outer_from_outside(outside));
        self.searcher.engine.cnf.var_data[inter as usize].removed != Removed::None
    }
}
