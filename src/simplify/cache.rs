/*!
The implication cache.

For each literal the cache keeps the literals reached from it during probing --- a transitive
summary of propagation which outlives the probe itself.

Two operations consume the cache:
- [clean](ImplCache::clean) rewrites entries through the equivalence table, drops removed or
  valued literals, and surfaces entries whose reach sets have become contradictory (a literal
  reaching both `x` and `¬x` is itself false).
  Cleaning repeats until stable before renumbering, as renumbering invalidates literal identity
  inside the cache.
- [try_both](crate::solver::Solver::cache_try_both) intersects the reach sets of a literal and
  its negation: anything implied either way is a unit.

The cache is a single-writer structure: only probing fills it, only the scheduler's tokens
mutate it otherwise.
*/

use crate::{
    misc::log::targets,
    solver::{Solver, VarNotify},
    structures::literal::Lit,
};

/// The implication cache: per-literal reach sets, indexed by inter literal.
#[derive(Default)]
pub struct ImplCache {
    entries: Vec<Vec<Lit>>,
}

impl VarNotify for ImplCache {
    fn on_new_vars(&mut self, n: usize) {
        for _ in 0..n {
            self.entries.push(Vec::default());
            self.entries.push(Vec::default());
        }
    }

    fn on_save_var_memory(&mut self, new_n: usize) {
        self.entries.truncate(new_n * 2);
    }

    fn on_renumber(&mut self, outer_to_inter: &[u32], inter_to_outer: &[u32]) {
        let _ = inter_to_outer;
        // Entries were indexed by the old inter numbering, which renumbering composes with
        // outer→inter'. An old inter literal maps through old-inter→outer→new-inter; the solver
        // performs this composition and calls [permute](ImplCache::permute) with the result.
        let _ = outer_to_inter;
    }
}

impl ImplCache {
    /// Records the literals reached while probing `from`.
    ///
    /// A literal beyond the entry table (possible after memory saving re-admits a variable) is
    /// ignored until the next renumber restores the width.
    pub fn record(&mut self, from: Lit, reached: &[Lit]) {
        let Some(entry) = self.entries.get_mut(from.index()) else {
            return;
        };
        entry.extend_from_slice(reached);
        entry.sort_unstable();
        entry.dedup();
    }

    /// The reach set of a literal.
    pub fn of(&self, literal: Lit) -> &[Lit] {
        match self.entries.get(literal.index()) {
            Some(entry) => entry,
            None => &[],
        }
    }

    /// Applies a literal permutation to the cache, reindexing entries and rewriting their
    /// contents.
    pub fn permute(&mut self, map: impl Fn(Lit) -> Lit) {
        // The permutation may reach above a truncated table; grow to cover it.
        let width = (0..self.entries.len())
            .map(|index| map(Lit::from_index(index)).index() + 1)
            .max()
            .unwrap_or(0)
            .max(self.entries.len());

        let mut fresh: Vec<Vec<Lit>> = vec![Vec::default(); width];
        for (index, entry) in self.entries.iter_mut().enumerate() {
            let new_index = map(Lit::from_index(index)).index();
            fresh[new_index] = entry.drain(..).map(&map).collect();
        }
        self.entries = fresh;
    }

    /// Drops every entry.
    pub fn free(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = Vec::default();
        }
    }

    /// An estimate of heap memory used, in bytes.
    pub fn mem_used(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.capacity() * std::mem::size_of::<Lit>())
            .sum::<usize>()
            + self.entries.capacity() * std::mem::size_of::<Vec<Lit>>()
    }

    /// Cleans the cache against the solver's current state.
    ///
    /// Returns true if cleaning derived something (a unit was enqueued), in which case another
    /// round may make further progress.
    pub fn clean(&mut self, solver: &mut Solver) -> bool {
        let mut derived_units: Vec<Lit> = Vec::default();

        for index in 0..self.entries.len() {
            let owner = Lit::from_index(index);

            if solver.searcher.engine.cnf.value_of(owner.var()).is_some()
                || !solver.searcher.engine.cnf.var_is_free(owner.var())
            {
                self.entries[index] = Vec::default();
                continue;
            }

            let entry = std::mem::take(&mut self.entries[index]);
            let mut cleaned: Vec<Lit> = entry
                .into_iter()
                .map(|l| solver.lit_replaced_with_inter(l))
                .filter(|l| {
                    (l.var() as usize) < solver.searcher.engine.cnf.var_count()
                        && solver.searcher.engine.cnf.var_is_free(l.var())
                })
                .collect();
            cleaned.sort_unstable();
            cleaned.dedup();

            // A literal reaching both polarities of some variable is itself false.
            let contradictory = cleaned
                .windows(2)
                .any(|w| w[0].var() == w[1].var());
            if contradictory {
                log::debug!(target: targets::CACHE, "{owner} reaches a contradiction");
                derived_units.push(!owner);
                self.entries[index] = Vec::default();
                continue;
            }

            self.entries[index] = cleaned;
        }

        let derived = !derived_units.is_empty();
        for unit in derived_units {
            if !solver.okay() {
                break;
            }
            if let Some(trace) = solver.proof.as_mut() {
                trace.add_clause(&[unit]);
            }
            solver.fully_enqueue_this(unit);
        }
        derived
    }
}

impl Solver {
    /// Derives units from the intersection of each variable's two reach sets.
    pub(crate) fn cache_try_both(&mut self) {
        let Some(cache) = self.cache.take() else {
            return;
        };

        let mut units: Vec<Lit> = Vec::default();
        for var in 0..self.searcher.engine.cnf.var_count() as u32 {
            if !self.searcher.engine.cnf.var_is_free(var) {
                continue;
            }

            let positive = cache.of(Lit::new(var, true));
            let negative = cache.of(Lit::new(var, false));
            if positive.is_empty() || negative.is_empty() {
                continue;
            }

            for literal in positive {
                if negative.contains(literal) {
                    units.push(*literal);
                }
            }
        }

        units.sort_unstable();
        units.dedup();
        if !units.is_empty() {
            log::info!(target: targets::CACHE, "{} units from both polarities", units.len());
        }

        for unit in units {
            if !self.okay() {
                break;
            }
            if self.searcher.engine.value_of_lit(unit).is_some() {
                continue;
            }
            if let Some(trace) = self.proof.as_mut() {
                trace.add_clause(&[unit]);
            }
            self.fully_enqueue_this(unit);
        }

        self.cache = Some(cache);
    }

    /// Cleans the cache until no further units surface.
    pub(crate) fn cache_clean_until_stable(&mut self) {
        let Some(mut cache) = self.cache.take() else {
            return;
        };
        while self.okay() && cache.clean(self) {}
        self.cache = Some(cache);
    }
}
