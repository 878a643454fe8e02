/*!
The clause database and its parts.

A formula is stored across a handful of structures, distinguished by clause length:
- Unit clauses are installed directly on the [trail](trail) at decision level zero, and exist
  only as the valuation.
- Binary clauses live only in the [watch lists](watches), mirrored on both literals.
- Ternary and longer clauses are allocated in the [arena](arena) and referred to by offset from
  the irredundant store or one of three redundant tiers.
- Parity constraints of three or more variables are kept separately, for algebraic reasoning.

All literal and variable indices held by the database are in the *inter* numbering space; see
[coordinates](crate::coordinates).
*/

pub mod arena;
pub mod trail;
pub mod variable;
pub mod watches;

use crate::structures::{
    clause::{StoredClause, Tier, XorClause},
    literal::{Lit, Var},
};

use arena::{Arena, ClauseOffset};
use variable::{Removed, VarData};
use watches::WatchLists;

/// Counts of binary clauses, which exist only in the watch lists.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryCounts {
    pub irredundant: u64,
    pub redundant: u64,
}

/// The clause database: arena, clause stores, watch lists, valuation, and variable metadata.
pub struct Cnf {
    /// The arena backing ternary and longer clauses.
    pub arena: Arena,

    /// Offsets of irredundant long clauses.
    pub long_irred: Vec<ClauseOffset>,

    /// Offsets of redundant long clauses, in three tiers keyed by glue cutoffs.
    pub long_red: [Vec<ClauseOffset>; 3],

    /// Parity constraints of three or more variables.
    pub xors: Vec<XorClause>,

    /// Watch lists, indexed by literal.
    pub watches: WatchLists,

    /// The current (often partial) valuation, indexed by variable.
    pub assigns: Vec<Option<bool>>,

    /// Per-variable metadata, indexed by variable.
    pub var_data: Vec<VarData>,

    /// Counts of binary clauses.
    pub binary: BinaryCounts,
}

impl Default for Cnf {
    fn default() -> Self {
        Cnf {
            arena: Arena::default(),
            long_irred: Vec::default(),
            long_red: [Vec::default(), Vec::default(), Vec::default()],
            xors: Vec::default(),
            watches: WatchLists::default(),
            assigns: Vec::default(),
            var_data: Vec::default(),
            binary: BinaryCounts::default(),
        }
    }
}

impl Cnf {
    /// A count of variables in the database.
    pub fn var_count(&self) -> usize {
        self.assigns.len()
    }

    /// The value of a variable on the current valuation.
    pub fn value_of(&self, var: Var) -> Option<bool> {
        self.assigns[var as usize]
    }

    /// The value of a literal on the current valuation.
    pub fn value_of_lit(&self, literal: Lit) -> Option<bool> {
        self.assigns[literal.var() as usize].map(|value| value == literal.polarity())
    }

    /// Extends every per-variable structure with a fresh variable.
    pub fn on_new_var(&mut self, is_bva: bool) {
        self.assigns.push(None);
        self.var_data.push(VarData {
            removed: Removed::None,
            saved_polarity: false,
            is_bva,
        });
        self.watches.on_new_var();
    }

    /// Whether the variable is free: no value, and not removed.
    pub fn var_is_free(&self, var: Var) -> bool {
        self.assigns[var as usize].is_none()
            && self.var_data[var as usize].removed == Removed::None
    }

    /// A count of free variables.
    pub fn free_var_count(&self) -> usize {
        (0..self.var_count() as Var)
            .filter(|&v| self.var_is_free(v))
            .count()
    }

    /// The redundant tier a learnt clause of the given glue belongs to.
    pub fn tier_for_glue(
        &self,
        glue: u32,
        lev0_cutoff: u32,
        lev1_cutoff: u32,
    ) -> Tier {
        if glue <= lev0_cutoff {
            0
        } else if lev1_cutoff != 0 && glue <= lev1_cutoff {
            1
        } else {
            2
        }
    }

    /// An iterator over the offsets of all long clauses, irredundant first.
    pub fn all_long_offsets(&self) -> impl Iterator<Item = ClauseOffset> + '_ {
        self.long_irred
            .iter()
            .chain(self.long_red.iter().flatten())
            .copied()
    }

    /// Stores the offset of a freshly allocated clause in the appropriate store.
    pub fn store_offset(&mut self, offset: ClauseOffset, redundant: bool, tier: Tier) {
        if redundant {
            self.long_red[tier].push(offset);
        } else {
            self.long_irred.push(offset);
        }
    }

    /// Removes an offset from whichever store holds it.
    pub fn unstore_offset(&mut self, offset: ClauseOffset) {
        if let Some(at) = self.long_irred.iter().position(|&o| o == offset) {
            self.long_irred.swap_remove(at);
            return;
        }
        for tier in self.long_red.iter_mut() {
            if let Some(at) = tier.iter().position(|&o| o == offset) {
                tier.swap_remove(at);
                return;
            }
        }
    }

    /// A count of all stored long clauses.
    pub fn long_clause_count(&self) -> usize {
        self.long_irred.len() + self.long_red.iter().map(Vec::len).sum::<usize>()
    }

    /// The clause at the given offset.
    pub fn clause(&self, offset: ClauseOffset) -> &StoredClause {
        self.arena.get(offset)
    }

    /// The clause at the given offset, mutably.
    pub fn clause_mut(&mut self, offset: ClauseOffset) -> &mut StoredClause {
        self.arena.get_mut(offset)
    }
}
