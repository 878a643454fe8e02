/*!
The solution extender.

Simplification removes variables in ways the searcher never sees again: elimination by
resolution, blocking, and merging into an equivalence representative.
Given a model of the simplified formula, the extender reconstructs a model of the original:

1. Elimination and blocking records are replayed newest first.
   For an eliminated variable, a polarity is chosen satisfying every one of its removed clauses
   --- one exists, as the model satisfies all their resolvents.
   For a blocked clause, the blocking literal is asserted if the clause is otherwise
   unsatisfied.
2. Any variable still without a value receives a default.
3. Replaced variables copy their representative's value, with the recorded sign.

Everything here is in outer numbering, which the records were stored in.
*/

use crate::{
    misc::log::targets,
    simplify::{occurrence::ElimRecord, scc::VarReplacer},
    structures::literal::Lit,
};

/// Whether a clause holds on the (partial) model; an unvalued literal does not satisfy.
fn satisfied(model: &[Option<bool>], clause: &[Lit]) -> bool {
    clause
        .iter()
        .any(|l| model[l.var() as usize] == Some(l.polarity()))
}

/// Extends an outer-space model over removed variables. See the module documentation.
pub fn extend_model(
    model: &mut [Option<bool>],
    elim_stack: &[ElimRecord],
    replacer: &VarReplacer,
) {
    // Newest first: a record's clauses may mention variables of older records, which remain
    // free to repair their own clauses afterwards.
    for record in elim_stack.iter().rev() {
        match record {
            ElimRecord::Elimed { var, clauses } => {
                let mut require_true = false;
                let mut require_false = false;

                for clause in clauses {
                    if satisfied(model, clause) {
                        continue;
                    }
                    match clause.iter().find(|l| l.var() == *var) {
                        Some(own) => match own.polarity() {
                            true => require_true = true,
                            false => require_false = true,
                        },
                        None => {
                            log::warn!(target: targets::EXTEND, "Record of {var} holds a clause without it");
                        }
                    }
                }

                debug_assert!(
                    !(require_true && require_false),
                    "elimination left no consistent polarity for {var}"
                );

                if require_true || require_false {
                    model[*var as usize] = Some(require_true);
                } else if model[*var as usize].is_none() {
                    model[*var as usize] = Some(false);
                }
            }

            ElimRecord::Blocked { on, clause } => {
                if !satisfied(model, clause) {
                    model[on.var() as usize] = Some(on.polarity());
                }
            }
        }
    }

    // Defaults for anything untouched, so representatives are valued before they are copied.
    let replaced = replacer.replaced_vars();
    for var in 0..model.len() {
        if model[var].is_none() && !replaced.contains(&(var as u32)) {
            model[var] = Some(false);
        }
    }

    // Replaced variables mirror their representative.
    for var in replaced {
        let representative = replacer.lit_replaced_with_outer(Lit::new(var, true));
        let value = model[representative.var() as usize].map(|v| v == representative.polarity());
        model[var as usize] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eliminated_variable_repairs_its_clauses() {
        // Clauses (1 ∨ 2) and (¬1 ∨ 3) removed with variable 1; the model falsifies 2.
        let mut model = vec![None, Some(false), Some(true)];
        let stack = vec![ElimRecord::Elimed {
            var: 0,
            clauses: vec![
                vec![Lit::new(0, true), Lit::new(1, true)],
                vec![Lit::new(0, false), Lit::new(2, true)],
            ],
        }];

        extend_model(&mut model, &stack, &VarReplacer::default());
        assert_eq!(model[0], Some(true));
    }

    #[test]
    fn blocked_clause_asserts_its_literal() {
        let mut model = vec![None, Some(false)];
        let stack = vec![ElimRecord::Blocked {
            on: Lit::new(0, true),
            clause: vec![Lit::new(0, true), Lit::new(1, true)],
        }];

        extend_model(&mut model, &stack, &VarReplacer::default());
        assert_eq!(model[0], Some(true));
    }
}
