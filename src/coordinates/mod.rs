/*!
The three variable numbering spaces, and the bijections among them.

- *Outside*: what the caller sees. Dense over `[0, n_outside)`. Auxiliary variables introduced
  by bounded variable addition (XOR cutting) do not exist here.
- *Outer*: outside extended with the auxiliaries. Dense over `[0, n_outer)`. The space in which
  equivalence classes, elimination records, and persisted state are expressed, as it never
  changes shape under renumbering.
- *Inter*: a permutation of outer used internally, so that interesting variables (no value, not
  removed) occupy the low indices. The space of the clause database, trail, and watch lists.

Two permutation vectors, outer→inter and inter→outer, are maintained as mutual inverses.
Each is doubled into a literal variant (`2·var + polarity`) so literals translate with a single
lookup.

The outside↔outer relation is an injection which hides the auxiliaries.
It is maintained as a vector of the outer indices of non-auxiliary variables, with the reverse
direction rebuilt on demand --- auxiliaries only appear at the end of ingestion, so a rebuild
per solve suffices.

Equivalence classes are tracked by the [replacer](crate::simplify::scc), never here: the maps
relate *names*, not values.
*/

use crate::structures::literal::{Lit, Var};

/// The coordinate maps.
#[derive(Clone, Debug, Default)]
pub struct VarMaps {
    /// outer→inter, as a permutation of `[0, n_outer)`.
    outer_to_inter: Vec<Var>,

    /// inter→outer, the inverse permutation.
    inter_to_outer: Vec<Var>,

    /// The doubled variant of outer→inter, indexed by literal.
    outer_to_inter_lits: Vec<Lit>,

    /// The doubled variant of inter→outer, indexed by literal.
    inter_to_outer_lits: Vec<Lit>,

    /// The outer index of each outside variable, in outside order.
    without_bva_to_outer: Vec<Var>,

    /// The outside index of each outer variable, rebuilt by [rebuild_bva_map](VarMaps::rebuild_bva_map).
    outer_to_without_bva: Vec<Option<Var>>,
}

impl VarMaps {
    /// A count of outer variables.
    pub fn n_outer(&self) -> usize {
        self.outer_to_inter.len()
    }

    /// A count of outside variables.
    pub fn n_outside(&self) -> usize {
        self.without_bva_to_outer.len()
    }

    /// Registers a fresh variable, appended identically to every space.
    ///
    /// Returns the outer (and, initially, inter) index of the variable.
    pub fn push_var(&mut self, is_bva: bool) -> Var {
        let var = self.n_outer() as Var;
        self.outer_to_inter.push(var);
        self.inter_to_outer.push(var);
        self.outer_to_inter_lits.push(Lit::new(var, false));
        self.outer_to_inter_lits.push(Lit::new(var, true));
        self.inter_to_outer_lits.push(Lit::new(var, false));
        self.inter_to_outer_lits.push(Lit::new(var, true));

        if !is_bva {
            self.without_bva_to_outer.push(var);
        }
        var
    }

    /// The outer variable of an outside variable.
    pub fn outer_from_outside(&self, var: Var) -> Var {
        self.without_bva_to_outer[var as usize]
    }

    /// The outer literal of an outside literal.
    pub fn outer_from_outside_lit(&self, literal: Lit) -> Lit {
        literal.retain_polarity(self.outer_from_outside(literal.var()))
    }

    /// The outside variable of an outer variable, if the variable is not an auxiliary.
    ///
    /// Meaningful only after [rebuild_bva_map](VarMaps::rebuild_bva_map).
    pub fn outside_from_outer(&self, var: Var) -> Option<Var> {
        self.outer_to_without_bva.get(var as usize).copied().flatten()
    }

    /// The inter variable of an outer variable.
    pub fn inter_from_outer(&self, var: Var) -> Var {
        self.outer_to_inter[var as usize]
    }

    /// The outer variable of an inter variable.
    pub fn outer_from_inter(&self, var: Var) -> Var {
        self.inter_to_outer[var as usize]
    }

    /// The inter literal of an outer literal.
    pub fn inter_from_outer_lit(&self, literal: Lit) -> Lit {
        self.outer_to_inter_lits[literal.index()]
    }

    /// The outer literal of an inter literal.
    pub fn outer_from_inter_lit(&self, literal: Lit) -> Lit {
        self.inter_to_outer_lits[literal.index()]
    }

    /// Rebuilds the outer→outside direction of the auxiliary-hiding injection.
    pub fn rebuild_bva_map(&mut self) {
        self.outer_to_without_bva = vec![None; self.n_outer()];
        for (outside, &outer) in self.without_bva_to_outer.iter().enumerate() {
            self.outer_to_without_bva[outer as usize] = Some(outside as Var);
        }
    }

    /// Installs a fresh outer↔inter permutation.
    ///
    /// The two vectors must be mutual inverses over `[0, n_outer)`; the doubled literal
    /// variants are rebuilt from them.
    pub fn set_permutation(&mut self, outer_to_inter: Vec<Var>, inter_to_outer: Vec<Var>) {
        debug_assert_eq!(outer_to_inter.len(), self.n_outer());
        debug_assert_eq!(inter_to_outer.len(), self.n_outer());
        debug_assert!((0..self.n_outer())
            .all(|v| inter_to_outer[outer_to_inter[v] as usize] as usize == v));

        self.outer_to_inter_lits.clear();
        for &inter in &outer_to_inter {
            self.outer_to_inter_lits.push(Lit::new(inter, false));
            self.outer_to_inter_lits.push(Lit::new(inter, true));
        }

        self.inter_to_outer_lits.clear();
        for &outer in &inter_to_outer {
            self.inter_to_outer_lits.push(Lit::new(outer, false));
            self.inter_to_outer_lits.push(Lit::new(outer, true));
        }

        self.outer_to_inter = outer_to_inter;
        self.inter_to_outer = inter_to_outer;
    }

    /// The current outer→inter permutation.
    pub fn outer_to_inter(&self) -> &[Var] {
        &self.outer_to_inter
    }

    /// The current inter→outer permutation.
    pub fn inter_to_outer(&self) -> &[Var] {
        &self.inter_to_outer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_on_creation() {
        let mut maps = VarMaps::default();
        for _ in 0..4 {
            maps.push_var(false);
        }
        for v in 0..4 {
            assert_eq!(maps.inter_from_outer(v), v);
            assert_eq!(maps.outer_from_inter(v), v);
        }
    }

    #[test]
    fn permutation_round_trip() {
        let mut maps = VarMaps::default();
        for _ in 0..4 {
            maps.push_var(false);
        }
        maps.set_permutation(vec![2, 0, 3, 1], vec![1, 3, 0, 2]);

        for v in 0..4 {
            assert_eq!(maps.outer_from_inter(maps.inter_from_outer(v)), v);
            assert_eq!(maps.inter_from_outer(maps.outer_from_inter(v)), v);

            for polarity in [true, false] {
                let literal = Lit::new(v, polarity);
                assert_eq!(
                    maps.outer_from_inter_lit(maps.inter_from_outer_lit(literal)),
                    literal
                );
            }
        }
    }

    #[test]
    fn bva_variables_are_hidden() {
        let mut maps = VarMaps::default();
        maps.push_var(false);
        maps.push_var(true);
        maps.push_var(false);
        maps.rebuild_bva_map();

        assert_eq!(maps.n_outside(), 2);
        assert_eq!(maps.n_outer(), 3);
        assert_eq!(maps.outer_from_outside(1), 2);
        assert_eq!(maps.outside_from_outer(2), Some(1));
        assert_eq!(maps.outside_from_outer(1), None);
    }
}
