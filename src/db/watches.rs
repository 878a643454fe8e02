/*!
Watch lists.

Each literal has a list of watchers: things to re-examine when the literal becomes false.

A binary watcher carries the other literal of its clause directly, so binary propagation never
touches the arena --- binary clauses exist *only* as their two watchers.

A long watcher carries the arena offset of its clause, a blocker literal (any literal of the
clause; if the blocker is true the clause is satisfied and need not be read), and the clause
generation it was installed against.
When a clause is strengthened or renumbered its generation is bumped, and watchers recorded
against the old generation are discarded lazily during propagation rather than eagerly hunted
down.
*/

use crate::{
    db::arena::ClauseOffset,
    structures::literal::Lit,
};

/// Something to re-examine when a watched literal becomes false.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Watcher {
    /// A binary clause, represented by its other literal.
    Binary {
        /// The other literal of the clause.
        other: Lit,
        /// Whether the clause is redundant.
        redundant: bool,
    },

    /// A long clause, referred to by offset.
    Long {
        /// The arena offset of the clause.
        offset: ClauseOffset,
        /// Some literal of the clause; if true, the clause is satisfied.
        blocker: Lit,
        /// The clause generation the watcher was installed against.
        generation: u32,
    },
}

/// Watch lists, indexed by literal.
#[derive(Default)]
pub struct WatchLists {
    lists: Vec<Vec<Watcher>>,
}

impl WatchLists {
    /// Extends the lists with (both polarities of) a fresh variable.
    pub fn on_new_var(&mut self) {
        self.lists.push(Vec::default());
        self.lists.push(Vec::default());
    }

    /// The watchers of the given literal.
    pub fn of(&self, literal: Lit) -> &[Watcher] {
        &self.lists[literal.index()]
    }

    /// The watchers of the given literal, as a raw pointer.
    ///
    /// Used by propagation, which must mutate the list while also reading the valuation and
    /// other watch lists. See [propagate](crate::propagation::PropEngine::propagate) for why
    /// no alias to the returned list is created.
    pub(crate) fn of_mut_ptr(&mut self, literal: Lit) -> *mut Vec<Watcher> {
        &mut self.lists[literal.index()]
    }

    /// Installs a binary clause by watching each literal for the other.
    pub fn attach_binary(&mut self, a: Lit, b: Lit, redundant: bool) {
        self.lists[a.index()].push(Watcher::Binary { other: b, redundant });
        self.lists[b.index()].push(Watcher::Binary { other: a, redundant });
    }

    /// Removes a binary clause from both its lists. Returns true if found.
    pub fn detach_binary(&mut self, a: Lit, b: Lit) -> bool {
        let mut found = false;
        for (this, other) in [(a, b), (b, a)] {
            let list = &mut self.lists[this.index()];
            if let Some(at) = list
                .iter()
                .position(|w| matches!(w, Watcher::Binary { other: o, .. } if *o == other))
            {
                list.swap_remove(at);
                found = true;
            }
        }
        found
    }

    /// Watches `literal` for the long clause at `offset`.
    pub fn attach_long(&mut self, literal: Lit, offset: ClauseOffset, blocker: Lit, generation: u32) {
        self.lists[literal.index()].push(Watcher::Long {
            offset,
            blocker,
            generation,
        });
    }

    /// Removes the watcher of `literal` for the long clause at `offset`, if present.
    pub fn detach_long(&mut self, literal: Lit, offset: ClauseOffset) {
        let list = &mut self.lists[literal.index()];
        if let Some(at) = list
            .iter()
            .position(|w| matches!(w, Watcher::Long { offset: o, .. } if *o == offset))
        {
            list.swap_remove(at);
        }
    }

    /// An iterator over every binary clause, each reported once (on its lesser literal).
    pub fn binary_clauses(&self) -> impl Iterator<Item = (Lit, Lit, bool)> + '_ {
        self.lists.iter().enumerate().flat_map(|(index, list)| {
            let this = Lit::from_index(index);
            list.iter().filter_map(move |w| match w {
                Watcher::Binary { other, redundant } if this < *other => {
                    Some((this, *other, *redundant))
                }
                _ => None,
            })
        })
    }

    /// Rebuilds the lists under a permutation of literal indices.
    ///
    /// `map` takes an old-space literal to its new-space literal.
    /// Binary watchers are carried across; long watchers are dropped, as renumbering rewrites
    /// every long clause in place (bumping its generation) and the caller re-installs their
    /// watches afterwards.
    pub fn renumber(&mut self, map: impl Fn(Lit) -> Lit) {
        let mut fresh: Vec<Vec<Watcher>> = (0..self.lists.len()).map(|_| Vec::new()).collect();

        for (index, list) in self.lists.iter_mut().enumerate() {
            let new_index = map(Lit::from_index(index)).index();
            for watcher in list.drain(..) {
                match watcher {
                    Watcher::Binary { other, redundant } => {
                        fresh[new_index].push(Watcher::Binary {
                            other: map(other),
                            redundant,
                        });
                    }
                    Watcher::Long { .. } => {}
                }
            }
        }

        self.lists = fresh;
    }

    /// Empties the list of a literal, returning its watchers.
    pub fn clear_of(&mut self, literal: Lit) -> Vec<Watcher> {
        std::mem::take(&mut self.lists[literal.index()])
    }

    /// Releases the spare capacity of every list.
    ///
    /// Called after a simplification schedule, when lists of removed variables have emptied.
    pub fn reclaim(&mut self) {
        for list in self.lists.iter_mut() {
            list.shrink_to_fit();
        }
    }

    /// Drops the lists of all variables at or above `bound`.
    pub fn truncate(&mut self, bound: usize) {
        self.lists.truncate(bound * 2);
    }

    /// A count of lists (twice the variable count).
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_mirrored_on_both_literals() {
        let mut watches = WatchLists::default();
        watches.on_new_var();
        watches.on_new_var();

        let a = Lit::new(0, true);
        let b = Lit::new(1, false);
        watches.attach_binary(a, b, false);

        assert_eq!(watches.of(a).len(), 1);
        assert_eq!(watches.of(b).len(), 1);
        assert_eq!(watches.binary_clauses().count(), 1);

        assert!(watches.detach_binary(a, b));
        assert_eq!(watches.binary_clauses().count(), 0);
    }
}
