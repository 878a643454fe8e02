/*!
XOR ingestion, and cutting into CNF.

A parity constraint arrives as a set of outside variables and a right-hand side.
Normalisation folds signs and root-level values into the right-hand side, cancels duplicate
pairs, and sorts.
The residue is handled by size: empty is a parity check (unsatisfiable iff the side is true), a
single variable is a unit, two variables become the pair of binaries encoding (in)equality, and
three or more are retained as an [XorClause](crate::structures::clause::XorClause) for algebraic
reasoning *and* expanded to CNF.

Expansion is by *linear cutting*: the constraint `x₁ ⊕ … ⊕ xₖ = r` is written as a chain of
three-input XORs over fresh auxiliary variables `y₁ … y_{k−3}`,

```none
x₁⊕x₂⊕y₁ = 0,  y₁⊕x₃⊕y₂ = 0,  …,  y_{k−3}⊕x_{k−1}⊕xₖ = r
```

and each link is expanded to its `2^{n−1}` clauses, one for each even-parity assignment to
falsify.
The auxiliaries are bounded-variable-addition variables: they exist in outer and inter
numbering, and are hidden from the caller.
*/

use crate::{
    misc::log::targets,
    structures::{
        clause::{Glue, XorClause},
        literal::{Lit, Var},
    },
    types::err::{ErrorKind, IngestError},
};

use super::Solver;

impl Solver {
    /// Adds a parity constraint over the given outside variables.
    ///
    /// Returns the `ok` state of the solver: false once unsatisfiability is established.
    pub fn add_xor_clause(&mut self, vars_outside: &[Var], rhs: bool) -> Result<bool, ErrorKind> {
        if !self.ok {
            return Ok(false);
        }

        let as_lits: Vec<Lit> = vars_outside.iter().map(|&v| Lit::new(v, true)).collect();
        self.check_outside_bounds(&as_lits)?;
        if as_lits.len() >= (1 << 28) {
            return Err(IngestError::TooLongClause.into());
        }

        let outer: Vec<Lit> = as_lits
            .iter()
            .map(|&l| self.maps.outer_from_outside_lit(l))
            .collect();

        // Substitution may flip polarities; translation to inter follows.
        let Some(inter) = self.ingest_to_inter(outer) else {
            return Ok(false);
        };

        self.add_xor_clause_inter(inter, rhs);
        Ok(self.ok)
    }

    /// Normalises and installs a parity constraint given in inter numbering.
    pub(crate) fn add_xor_clause_inter(&mut self, lits: Vec<Lit>, mut rhs: bool) {
        debug_assert!(self.ok);
        debug_assert_eq!(self.searcher.engine.current_level(), 0);

        // Fold polarities into the right-hand side, leaving positive literals.
        let mut vars: Vec<Var> = Vec::with_capacity(lits.len());
        for literal in lits {
            if !literal.polarity() {
                rhs ^= true;
            }
            vars.push(literal.var());
        }
        vars.sort_unstable();

        // Cancel duplicate pairs, and absorb root-level values.
        let mut cleaned: Vec<Var> = Vec::with_capacity(vars.len());
        for var in vars {
            if cleaned.last() == Some(&var) {
                // A duplicated variable cancels: x ⊕ x = 0.
                cleaned.pop();
                continue;
            }
            match self.searcher.engine.cnf.value_of(var) {
                Some(value) => rhs ^= value,
                None => cleaned.push(var),
            }
        }

        log::debug!(target: targets::XOR, "XOR residue of {} variables, rhs {rhs}", cleaned.len());

        match cleaned.len() {
            0 => {
                if rhs {
                    self.note_unsat();
                }
            }

            1 => {
                self.fully_enqueue_this(Lit::new(cleaned[0], rhs));
            }

            2 => {
                // Two binaries encode equivalence (rhs false) or difference (rhs true).
                let a = cleaned[0];
                let b = cleaned[1];
                self.add_clause_int(
                    vec![Lit::new(a, true), Lit::new(b, rhs)],
                    false,
                    2 as Glue,
                    true,
                    None,
                );
                if self.ok {
                    self.add_clause_int(
                        vec![Lit::new(a, false), Lit::new(b, !rhs)],
                        false,
                        2 as Glue,
                        true,
                        None,
                    );
                }
            }

            _ => {
                self.searcher
                    .engine
                    .cnf
                    .xors
                    .push(XorClause::new(cleaned.clone(), rhs));
                self.cut_xor_to_cnf(&cleaned, rhs);
            }
        }
    }

    /// Cuts a parity constraint of three or more variables into chained three-input XORs, each
    /// expanded to CNF.
    fn cut_xor_to_cnf(&mut self, vars: &[Var], rhs: bool) {
        debug_assert!(vars.len() >= 3);

        if vars.len() <= 3 {
            self.expand_xor_chunk(&[vars[0], vars[1], vars[2]], rhs);
            return;
        }

        // x₁⊕x₂⊕y₁ = 0, then yᵢ⊕xᵢ₊₂⊕yᵢ₊₁ = 0, closing with y⊕x⊕x = rhs.
        let mut connector = match self.new_var_internal(true) {
            Ok(fresh) => {
                let fresh_inter = self.maps.inter_from_outer(fresh);
                self.expand_xor_chunk(&[vars[0], vars[1], fresh_inter], false);
                fresh_inter
            }
            Err(_) => {
                log::error!(target: targets::XOR, "Variable limit reached during XOR cutting");
                self.note_unsat();
                return;
            }
        };

        let mut at = 2;
        while self.ok && at < vars.len() {
            let remaining = vars.len() - at;
            if remaining == 2 {
                self.expand_xor_chunk(&[connector, vars[at], vars[at + 1]], rhs);
                at += 2;
            } else {
                match self.new_var_internal(true) {
                    Ok(fresh) => {
                        let fresh_inter = self.maps.inter_from_outer(fresh);
                        self.expand_xor_chunk(&[connector, vars[at], fresh_inter], false);
                        connector = fresh_inter;
                        at += 1;
                    }
                    Err(_) => {
                        log::error!(target: targets::XOR, "Variable limit reached during XOR cutting");
                        self.note_unsat();
                        return;
                    }
                }
            }
        }
    }

    /// Expands a three-input XOR to its four clauses: one for each assignment of the wrong
    /// parity, forbidden by the clause of its negations.
    fn expand_xor_chunk(&mut self, vars: &[Var; 3], rhs: bool) {
        for mask in 0_u32..(1 << 3) {
            let parity = (mask.count_ones() & 1) == 1;
            if parity == rhs {
                continue;
            }

            let clause: Vec<Lit> = (0..3)
                .map(|position| {
                    let value = (mask >> position) & 1 == 1;
                    Lit::new(vars[position], !value)
                })
                .collect();

            self.add_clause_int(clause, false, 3 as Glue, true, None);
            if !self.ok {
                return;
            }
        }
    }
}
